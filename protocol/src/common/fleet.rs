//! Fleet resources: users, vehicles and routes
//!
//! Field names follow the gateway's camelCase JSON; identifiers arrive as `_id`.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

// ============================================================================
// Users
// ============================================================================

/// Company user as returned by `GET /users`
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    #[serde(rename = "_id")]
    pub id: String,
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub role: String,
    #[serde(default)]
    pub image_url: Option<String>,
}

impl User {
    pub fn full_name(&self) -> String {
        format!("{} {}", self.first_name, self.last_name)
    }
}

// ============================================================================
// Vehicles
// ============================================================================

/// Vehicle availability
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum VehicleStatus {
    #[serde(rename = "none")]
    Available,
    #[serde(rename = "inUse", alias = "inUser")]
    InUse,
    #[serde(rename = "repairing")]
    Repairing,
    #[serde(other)]
    Unknown,
}

impl VehicleStatus {
    pub fn as_wire(&self) -> &'static str {
        match self {
            VehicleStatus::Available => "none",
            VehicleStatus::InUse => "inUse",
            VehicleStatus::Repairing => "repairing",
            VehicleStatus::Unknown => "unknown",
        }
    }
}

impl fmt::Display for VehicleStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            VehicleStatus::Available => "None",
            VehicleStatus::InUse => "In Use",
            VehicleStatus::Repairing => "Repairing",
            VehicleStatus::Unknown => "Unknown",
        };
        f.write_str(text)
    }
}

impl FromStr for VehicleStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "none" => Ok(VehicleStatus::Available),
            "inUse" => Ok(VehicleStatus::InUse),
            "repairing" => Ok(VehicleStatus::Repairing),
            other => Err(format!(
                "unknown vehicle status '{}' (expected none, inUse or repairing)",
                other
            )),
        }
    }
}

/// Vehicle fuel type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FuelType {
    Diesel,
    Petrol,
    Electric,
}

impl fmt::Display for FuelType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            FuelType::Diesel => "diesel",
            FuelType::Petrol => "petrol",
            FuelType::Electric => "electric",
        };
        f.write_str(text)
    }
}

impl FromStr for FuelType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "diesel" => Ok(FuelType::Diesel),
            "petrol" => Ok(FuelType::Petrol),
            "electric" => Ok(FuelType::Electric),
            other => Err(format!(
                "unknown fuel type '{}' (expected diesel, petrol or electric)",
                other
            )),
        }
    }
}

/// Fleet vehicle
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Vehicle {
    #[serde(rename = "_id")]
    pub id: String,
    pub model: String,
    pub brand: String,
    #[serde(default)]
    pub email: Option<String>,
    pub license_plate: String,
    pub vin: String,
    pub color: String,
    pub register_date: DateTime<Utc>,
    pub acquisition_date: DateTime<Utc>,
    pub category: String,
    pub kms: f64,
    pub capacity: u32,
    pub fuel_type: String,
    pub average_fuel_consumption: f64,
    pub status: VehicleStatus,
    #[serde(default)]
    pub is_deleted: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

// ============================================================================
// Routes
// ============================================================================

/// Route lifecycle status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum RouteStatus {
    Pending,
    InProgress,
    Completed,
    Cancelled,
    #[serde(other)]
    Unknown,
}

impl RouteStatus {
    pub fn as_wire(&self) -> &'static str {
        match self {
            RouteStatus::Pending => "pending",
            RouteStatus::InProgress => "inProgress",
            RouteStatus::Completed => "completed",
            RouteStatus::Cancelled => "cancelled",
            RouteStatus::Unknown => "unknown",
        }
    }
}

impl fmt::Display for RouteStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            RouteStatus::Pending => "Pending",
            RouteStatus::InProgress => "In Progress",
            RouteStatus::Completed => "Completed",
            RouteStatus::Cancelled => "Cancelled",
            RouteStatus::Unknown => "Unknown",
        };
        f.write_str(text)
    }
}

impl FromStr for RouteStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(RouteStatus::Pending),
            "inProgress" => Ok(RouteStatus::InProgress),
            "completed" => Ok(RouteStatus::Completed),
            "cancelled" => Ok(RouteStatus::Cancelled),
            other => Err(format!(
                "unknown route status '{}' (expected pending, inProgress, completed or cancelled)",
                other
            )),
        }
    }
}

/// Route endpoint. `coordinates` are filled in by the gateway.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Location {
    pub city: String,
    pub country: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub coordinates: Option<[f64; 2]>,
}

impl fmt::Display for Location {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}, {}", self.city, self.country)
    }
}

/// Planned or completed trip of one vehicle and driver
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Route {
    #[serde(rename = "_id")]
    pub id: String,
    pub user_id: String,
    pub vehicle_id: String,
    pub start_point: Location,
    pub end_point: Location,
    pub start_date: DateTime<Utc>,
    #[serde(default)]
    pub estimated_end_date: Option<DateTime<Utc>>,
    #[serde(default)]
    pub distance: f64,
    #[serde(default)]
    pub duration: String,
    pub status: RouteStatus,
    #[serde(default)]
    pub avoid_tolls: bool,
    #[serde(default)]
    pub avoid_highways: bool,
    #[serde(default)]
    pub is_deleted: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_vehicle_status_wire_names() {
        let status: VehicleStatus = serde_json::from_value(json!("inUse")).unwrap();
        assert_eq!(status, VehicleStatus::InUse);
        let legacy: VehicleStatus = serde_json::from_value(json!("inUser")).unwrap();
        assert_eq!(legacy, VehicleStatus::InUse);
        let other: VehicleStatus = serde_json::from_value(json!("scrapped")).unwrap();
        assert_eq!(other, VehicleStatus::Unknown);
        assert_eq!(VehicleStatus::Available.to_string(), "None");
        assert_eq!(VehicleStatus::InUse.to_string(), "In Use");
    }

    #[test]
    fn test_route_status_display() {
        assert_eq!(RouteStatus::InProgress.to_string(), "In Progress");
        assert_eq!("cancelled".parse::<RouteStatus>(), Ok(RouteStatus::Cancelled));
        assert!("done".parse::<RouteStatus>().is_err());
    }

    #[test]
    fn test_route_deserialize() {
        let route: Route = serde_json::from_value(json!({
            "_id": "r1",
            "userId": "u1",
            "vehicleId": "v1",
            "startPoint": {"city": "Porto", "country": "Portugal", "coordinates": [41.15, -8.61]},
            "endPoint": {"city": "Lisbon", "country": "Portugal"},
            "startDate": "2024-05-01T08:00:00.000Z",
            "distance": 313.4,
            "duration": "3h 5m",
            "status": "inProgress",
            "createdAt": "2024-04-30T10:00:00Z",
            "updatedAt": "2024-04-30T10:00:00Z"
        }))
        .unwrap();

        assert_eq!(route.status, RouteStatus::InProgress);
        assert_eq!(route.end_point.coordinates, None);
        assert_eq!(route.start_point.to_string(), "Porto, Portugal");
        assert!(!route.avoid_tolls);
    }
}
