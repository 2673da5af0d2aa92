use console::{strip_ansi_codes, Term};
use owo_colors::OwoColorize;
use unicode_width::UnicodeWidthStr;

use carin_protocol::{RouteStatus, VehicleStatus};

/// Terminal output helpers for the CLI
pub struct UI {
    term: Term,
}

impl UI {
    pub fn new() -> Self {
        Self {
            term: Term::stdout(),
        }
    }

    /// Helper method to conditionally apply color based on terminal support
    fn colorize<F>(&self, text: &str, color_fn: F) -> String
    where
        F: FnOnce(&str) -> String,
    {
        if self.supports_color() {
            color_fn(text)
        } else {
            text.to_string()
        }
    }

    /// Print a success message (color only if supported)
    pub fn success(&self, message: &str) {
        let output = self.colorize(message, |m| m.green().bold().to_string());
        println!("{}", output);
    }

    /// Print a warning message (color only if supported)
    pub fn warning(&self, message: &str) {
        let output = self.colorize(message, |m| m.yellow().bold().to_string());
        println!("{}", output);
    }

    /// Print an info message (color only if supported)
    pub fn info(&self, message: &str) {
        let output = self.colorize(message, |m| m.blue().bold().to_string());
        println!("{}", output);
    }

    /// Session state: signed in, renewal due, or signed out
    pub fn format_auth_status(&self, authenticated: bool, renewal_due: bool) -> String {
        let text = match (authenticated, renewal_due) {
            (true, false) => "Authenticated",
            (true, true) => "Authenticated (renewal due)",
            (false, _) => "Not authenticated",
        };

        if !self.supports_color() {
            return text.to_string();
        }
        match (authenticated, renewal_due) {
            (true, false) => text.green().to_string(),
            (true, true) => text.yellow().to_string(),
            (false, _) => text.red().to_string(),
        }
    }

    pub fn format_vehicle_status(&self, status: VehicleStatus) -> String {
        let text = status.to_string();
        if !self.supports_color() {
            return text;
        }
        match status {
            VehicleStatus::Available => text.green().to_string(),
            VehicleStatus::InUse => text.blue().to_string(),
            VehicleStatus::Repairing => text.yellow().to_string(),
            VehicleStatus::Unknown => text.dimmed().to_string(),
        }
    }

    pub fn format_route_status(&self, status: RouteStatus) -> String {
        let text = status.to_string();
        if !self.supports_color() {
            return text;
        }
        match status {
            RouteStatus::Pending => text.yellow().to_string(),
            RouteStatus::InProgress => text.blue().to_string(),
            RouteStatus::Completed => text.green().to_string(),
            RouteStatus::Cancelled => text.red().to_string(),
            RouteStatus::Unknown => text.dimmed().to_string(),
        }
    }

    /// Format optional field with fallback for missing data
    pub fn format_field(&self, value: Option<String>) -> String {
        value.unwrap_or_else(|| "-".to_string())
    }

    /// Create a card-style display for information
    pub fn card(&self, title: &str, content: Vec<(&str, String)>) {
        let card_width = self
            .width()
            .saturating_sub(4) // Leave more space for terminal margins
            .clamp(50, 80);

        let supports_color = self.supports_color();

        println!("╭{}╮", "─".repeat(card_width - 2));
        let title_spaces = card_width.saturating_sub(title.width() + 4);
        if supports_color {
            println!("│ {} {}│", title.cyan().bold(), " ".repeat(title_spaces));
        } else {
            println!("│ {} {}│", title, " ".repeat(title_spaces));
        }
        println!("├{}┤", "─".repeat(card_width - 2));

        for (label, value) in content {
            // Strip ANSI codes for width calculations
            let content_width = display_width(label) + display_width(&value) + 4;

            let spaces = if content_width < card_width - 1 {
                card_width - content_width - 1
            } else {
                1
            };

            if supports_color {
                println!("│ {}: {}{}│", label.dimmed(), value, " ".repeat(spaces));
            } else {
                println!("│ {}: {}{}│", label, value, " ".repeat(spaces));
            }
        }

        println!("╰{}╯", "─".repeat(card_width - 2));
        println!();
    }

    /// Print rows under a header, columns padded to their widest cell
    pub fn table(&self, headers: &[&str], rows: &[Vec<String>]) {
        let widths = column_widths(headers, rows);
        let supports_color = self.supports_color();

        let header_line = headers
            .iter()
            .zip(&widths)
            .map(|(h, w)| pad_cell(h, *w))
            .collect::<Vec<_>>()
            .join("  ");
        if supports_color {
            println!("{}", header_line.bold());
        } else {
            println!("{}", header_line);
        }

        let rule = widths
            .iter()
            .map(|w| "─".repeat(*w))
            .collect::<Vec<_>>()
            .join("  ");
        if supports_color {
            println!("{}", rule.dimmed());
        } else {
            println!("{}", rule);
        }

        for row in rows {
            let line = row
                .iter()
                .zip(&widths)
                .map(|(cell, w)| pad_cell(cell, *w))
                .collect::<Vec<_>>()
                .join("  ");
            println!("{}", line.trim_end());
        }
    }

    /// Page footer for list commands
    pub fn page_footer(&self, page: u32, page_count: u64, total_items: u64) {
        let text = format!("Page {} of {} ({} total)", page, page_count.max(1), total_items);
        if self.supports_color() {
            println!("{}", text.dimmed());
        } else {
            println!("{}", text);
        }
    }

    /// Get terminal width for responsive layout
    pub fn width(&self) -> usize {
        self.term.size().1 as usize
    }

    /// Check if terminal supports color
    pub fn supports_color(&self) -> bool {
        self.term.features().colors_supported()
    }
}

impl Default for UI {
    fn default() -> Self {
        Self::new()
    }
}

fn display_width(text: &str) -> usize {
    strip_ansi_codes(text).width()
}

fn column_widths(headers: &[&str], rows: &[Vec<String>]) -> Vec<usize> {
    let mut widths: Vec<usize> = headers.iter().map(|h| display_width(h)).collect();
    for row in rows {
        for (i, cell) in row.iter().enumerate().take(widths.len()) {
            widths[i] = widths[i].max(display_width(cell));
        }
    }
    widths
}

fn pad_cell(cell: &str, width: usize) -> String {
    let padding = width.saturating_sub(display_width(cell));
    format!("{}{}", cell, " ".repeat(padding))
}

/// Human-readable token lifetime, e.g. `14m 05s` or `expired 2m 10s ago`
pub fn format_remaining(secs: i64) -> String {
    let abs = secs.unsigned_abs();
    let body = if abs >= 3600 {
        format!("{}h {:02}m", abs / 3600, (abs % 3600) / 60)
    } else if abs >= 60 {
        format!("{}m {:02}s", abs / 60, abs % 60)
    } else {
        format!("{}s", abs)
    };

    if secs < 0 {
        format!("expired {} ago", body)
    } else {
        body
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_remaining() {
        assert_eq!(format_remaining(42), "42s");
        assert_eq!(format_remaining(845), "14m 05s");
        assert_eq!(format_remaining(7260), "2h 01m");
        assert_eq!(format_remaining(-130), "expired 2m 10s ago");
    }

    #[test]
    fn test_column_widths_ignore_ansi_and_count_wide_chars() {
        let rows = vec![
            vec!["\u{1b}[32mAvailable\u{1b}[0m".to_string(), "João".to_string()],
            vec!["In Use".to_string(), "Ana".to_string()],
        ];
        assert_eq!(column_widths(&["Status", "Driver"], &rows), vec![9, 6]);
        assert_eq!(pad_cell("João", 6), "João  ");
    }
}
