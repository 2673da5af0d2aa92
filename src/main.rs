use chrono::{DateTime, NaiveDate, Utc};
use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

use carin_protocol::{FuelType, RouteStatus, VehicleStatus};
use carin::version::CURRENT_VERSION;

mod cli;
mod ui;

use cli::CliHandler;

#[derive(Parser)]
#[command(
    name = "carin",
    about = "CarIn fleet administration from the terminal",
    long_about = "CarIn - fleet administration client

OVERVIEW:
  Manage the users, vehicles and routes of a CarIn fleet through the CarIn
  API gateway. Your session is kept between runs and renewed automatically
  shortly before it expires.

QUICK START:
  carin login                            # Sign in with email and password
  carin vehicles list --status inUse     # Vehicles currently on the road
  carin routes list --search Porto       # Routes touching Porto
  carin routes total                     # Number of routes
  carin status                           # Who is signed in and for how long",
    version = CURRENT_VERSION,
    author = "CarIn Team",
    arg_required_else_help = true
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Use this config file instead of the default one
    #[arg(long, global = true, env = "CARIN_CONFIG")]
    pub config: Option<PathBuf>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Sign in with email and password
    Login(LoginArgs),

    /// Forget the stored session
    Logout,

    /// Show session and endpoint status
    #[command(aliases = &["st"])]
    Status,

    /// Browse fleet users
    Users(UsersArgs),

    /// Manage vehicles
    #[command(aliases = &["v"])]
    Vehicles(VehiclesArgs),

    /// Manage routes
    #[command(aliases = &["r"])]
    Routes(RoutesArgs),

    /// Configure settings
    #[command(aliases = &["cfg"])]
    Config(ConfigArgs),
}

#[derive(Args)]
pub struct LoginArgs {
    #[arg(short, long)]
    pub email: Option<String>,
}

#[derive(Args, Clone)]
pub struct ListArgs {
    #[arg(short, long)]
    pub search: Option<String>,

    #[arg(short, long, default_value_t = 1)]
    pub page: u32,

    #[arg(long, default_value_t = 10)]
    pub per_page: u32,
}

#[derive(Args)]
pub struct UsersArgs {
    #[command(subcommand)]
    pub command: UsersCommand,
}

#[derive(Subcommand)]
pub enum UsersCommand {
    /// List users
    #[command(aliases = &["ls"])]
    List {
        #[command(flatten)]
        list: ListArgs,

        /// Only users with this role; `all` for everyone
        #[arg(long)]
        role: Option<String>,
    },
    /// Show one user
    Get { id: String },
}

#[derive(Args)]
pub struct VehiclesArgs {
    #[command(subcommand)]
    pub command: VehiclesCommand,
}

#[derive(Subcommand)]
pub enum VehiclesCommand {
    /// List vehicles
    #[command(aliases = &["ls"])]
    List {
        #[command(flatten)]
        list: ListArgs,

        /// none, inUse, repairing or all
        #[arg(long)]
        status: Option<String>,
    },
    /// Show one vehicle
    Get { id: String },
    /// Number of vehicles in the fleet
    Total,
    /// Register a vehicle
    Create(CreateVehicleArgs),
    /// Change fields of a vehicle
    Update(UpdateVehicleArgs),
}

#[derive(Args)]
pub struct CreateVehicleArgs {
    #[arg(long)]
    pub brand: String,

    #[arg(long)]
    pub model: String,

    #[arg(long)]
    pub license_plate: String,

    #[arg(long)]
    pub vin: String,

    #[arg(long)]
    pub color: String,

    /// YYYY-MM-DD or RFC 3339
    #[arg(long, value_parser = parse_date)]
    pub register_date: DateTime<Utc>,

    #[arg(long, value_parser = parse_date)]
    pub acquisition_date: DateTime<Utc>,

    #[arg(long)]
    pub category: String,

    #[arg(long, default_value_t = 0.0)]
    pub kms: f64,

    #[arg(long)]
    pub capacity: u32,

    /// diesel, petrol or electric
    #[arg(long)]
    pub fuel_type: FuelType,

    #[arg(long)]
    pub average_fuel_consumption: f64,
}

#[derive(Args)]
pub struct UpdateVehicleArgs {
    pub id: String,

    #[arg(long)]
    pub status: Option<VehicleStatus>,

    #[arg(long)]
    pub kms: Option<f64>,

    #[arg(long)]
    pub color: Option<String>,

    #[arg(long)]
    pub license_plate: Option<String>,

    #[arg(long)]
    pub category: Option<String>,

    #[arg(long)]
    pub average_fuel_consumption: Option<f64>,
}

#[derive(Args)]
pub struct RoutesArgs {
    #[command(subcommand)]
    pub command: RoutesCommand,
}

#[derive(Subcommand)]
pub enum RoutesCommand {
    /// List routes
    #[command(aliases = &["ls"])]
    List {
        #[command(flatten)]
        list: ListArgs,

        /// pending, inProgress, completed, cancelled or all
        #[arg(long)]
        status: Option<String>,
    },
    /// Show one route
    Get { id: String },
    /// Number of routes
    Total,
    /// Plan a route; it starts as pending
    Create(CreateRouteArgs),
    /// Change fields of a route
    Update(UpdateRouteArgs),
    /// Delete a route
    #[command(aliases = &["rm"])]
    Delete {
        id: String,

        /// Skip the confirmation prompt
        #[arg(short, long)]
        force: bool,
    },
}

#[derive(Args)]
pub struct CreateRouteArgs {
    #[arg(long)]
    pub user: String,

    #[arg(long)]
    pub vehicle: String,

    #[arg(long)]
    pub from_city: String,

    #[arg(long)]
    pub from_country: String,

    #[arg(long)]
    pub to_city: String,

    #[arg(long)]
    pub to_country: String,

    /// YYYY-MM-DD or RFC 3339
    #[arg(long, value_parser = parse_date)]
    pub start_date: DateTime<Utc>,

    #[arg(long)]
    pub avoid_tolls: bool,

    #[arg(long)]
    pub avoid_highways: bool,
}

#[derive(Args)]
pub struct UpdateRouteArgs {
    pub id: String,

    #[arg(long)]
    pub status: Option<RouteStatus>,

    #[arg(long)]
    pub vehicle: Option<String>,

    #[arg(long)]
    pub user: Option<String>,

    #[arg(long, value_parser = parse_date)]
    pub start_date: Option<DateTime<Utc>>,

    #[arg(long)]
    pub avoid_tolls: Option<bool>,

    #[arg(long)]
    pub avoid_highways: Option<bool>,
}

#[derive(Args)]
pub struct ConfigArgs {
    #[command(subcommand)]
    pub command: ConfigCommand,
}

#[derive(Subcommand)]
pub enum ConfigCommand {
    Show,
    SetEndpoint { url: String },
    SetTimeout { seconds: u64 },
    SetMapsKey { key: String },
    Reset,
}

fn parse_date(value: &str) -> Result<DateTime<Utc>, String> {
    if let Ok(date_time) = DateTime::parse_from_rfc3339(value) {
        return Ok(date_time.with_timezone(&Utc));
    }
    NaiveDate::parse_from_str(value, "%Y-%m-%d")
        .ok()
        .and_then(|date| date.and_hms_opt(0, 0, 0))
        .map(|naive| naive.and_utc())
        .ok_or_else(|| format!("'{}' is not a date (use YYYY-MM-DD)", value))
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let log_level = if cli.verbose { "debug" } else { "info" };
    let subscriber = tracing_subscriber::fmt()
        .with_env_filter(format!("carin={}", log_level))
        .with_target(false);
    subscriber.init();

    let mut handler = CliHandler::with_config_path(cli.config);

    if let Err(e) = handler.execute(cli.command).await {
        eprintln!("Error: {}", e);
        if e.requires_logout() {
            eprintln!("Your session has ended. Run 'carin login' to sign in again.");
        }
        std::process::exit(1);
    }
}
