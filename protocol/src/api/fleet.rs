//! Fleet API DTOs
//!
//! List queries and create/update bodies for the users, vehicles and routes
//! endpoints. Create requests carry the same constraints the admin forms
//! enforce before anything is sent.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::common::{FuelType, Location, RouteStatus, VehicleStatus};

/// Filter value meaning "no filter"
pub const FILTER_ALL: &str = "all";

// ============================================================================
// List Queries
// ============================================================================

/// Paged, searchable list query shared by every list endpoint
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListQuery {
    pub search: Option<String>,
    /// Role for users, status for vehicles and routes
    pub filter: Option<String>,
    pub page: u32,
    pub per_page: u32,
}

impl Default for ListQuery {
    fn default() -> Self {
        Self {
            search: None,
            filter: None,
            page: 1,
            per_page: 10,
        }
    }
}

impl ListQuery {
    pub fn page(page: u32, per_page: u32) -> Self {
        Self {
            page,
            per_page,
            ..Self::default()
        }
    }

    pub fn with_search(mut self, search: impl Into<String>) -> Self {
        self.search = Some(search.into());
        self
    }

    pub fn with_filter(mut self, filter: impl Into<String>) -> Self {
        self.filter = Some(filter.into());
        self
    }

    /// Query string pairs. Empty searches and the `all` filter are omitted.
    pub fn to_params(&self, filter_key: &str) -> Vec<(String, String)> {
        let mut params = vec![
            ("page".to_string(), self.page.to_string()),
            ("perPage".to_string(), self.per_page.to_string()),
        ];

        if let Some(search) = self.search.as_deref().filter(|s| !s.is_empty()) {
            params.push(("search".to_string(), search.to_string()));
        }

        if let Some(filter) = self
            .filter
            .as_deref()
            .filter(|f| !f.is_empty() && *f != FILTER_ALL)
        {
            params.push((filter_key.to_string(), filter.to_string()));
        }

        params
    }
}

// ============================================================================
// Vehicle DTOs
// ============================================================================

/// Create vehicle request for `POST /vehicles`
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CreateVehicleRequest {
    #[validate(length(min = 1, message = "Brand is required"))]
    pub brand: String,
    #[validate(length(min = 1, message = "Model is required"))]
    pub model: String,
    #[validate(length(min = 1, message = "License Plate is required"))]
    pub license_plate: String,
    #[validate(length(equal = 17, message = "VIN needs to be exactly 17 characters long."))]
    pub vin: String,
    #[validate(length(min = 1, message = "Color is required"))]
    pub color: String,
    pub register_date: DateTime<Utc>,
    pub acquisition_date: DateTime<Utc>,
    #[validate(length(min = 1, message = "Category is required"))]
    pub category: String,
    #[validate(range(min = 0.0))]
    pub kms: f64,
    pub capacity: u32,
    pub fuel_type: FuelType,
    #[validate(range(min = 0.0))]
    pub average_fuel_consumption: f64,
}

/// Partial vehicle update for `PATCH /vehicles/{id}`
#[derive(Debug, Clone, Default, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct UpdateVehicleRequest {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub brand: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub license_plate: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    #[validate(length(equal = 17, message = "VIN needs to be exactly 17 characters long."))]
    pub vin: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub color: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    #[validate(range(min = 0.0))]
    pub kms: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub capacity: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fuel_type: Option<FuelType>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub average_fuel_consumption: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<VehicleStatus>,
}

impl UpdateVehicleRequest {
    pub fn is_empty(&self) -> bool {
        self.brand.is_none()
            && self.model.is_none()
            && self.license_plate.is_none()
            && self.vin.is_none()
            && self.color.is_none()
            && self.category.is_none()
            && self.kms.is_none()
            && self.capacity.is_none()
            && self.fuel_type.is_none()
            && self.average_fuel_consumption.is_none()
            && self.status.is_none()
    }
}

// ============================================================================
// Route DTOs
// ============================================================================

/// Create route request for `POST /routes`
///
/// New routes always start as `pending`; distance and duration are computed
/// by the gateway.
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CreateRouteRequest {
    #[validate(length(min = 1, message = "User is required"))]
    pub user_id: String,
    #[validate(length(min = 1, message = "Vehicle is required"))]
    pub vehicle_id: String,
    #[validate(custom(function = "validate_location"))]
    pub start_point: Location,
    #[validate(custom(function = "validate_location"))]
    pub end_point: Location,
    pub start_date: DateTime<Utc>,
    pub status: RouteStatus,
    pub avoid_tolls: bool,
    pub avoid_highways: bool,
}

impl CreateRouteRequest {
    pub fn new(
        user_id: impl Into<String>,
        vehicle_id: impl Into<String>,
        start_point: Location,
        end_point: Location,
        start_date: DateTime<Utc>,
    ) -> Self {
        Self {
            user_id: user_id.into(),
            vehicle_id: vehicle_id.into(),
            start_point,
            end_point,
            start_date,
            status: RouteStatus::Pending,
            avoid_tolls: false,
            avoid_highways: false,
        }
    }
}

/// Partial route update for `PATCH /routes/{id}`
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateRouteRequest {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub vehicle_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub start_point: Option<Location>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub end_point: Option<Location>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub start_date: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<RouteStatus>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub avoid_tolls: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub avoid_highways: Option<bool>,
}

impl UpdateRouteRequest {
    pub fn is_empty(&self) -> bool {
        self.user_id.is_none()
            && self.vehicle_id.is_none()
            && self.start_point.is_none()
            && self.end_point.is_none()
            && self.start_date.is_none()
            && self.status.is_none()
            && self.avoid_tolls.is_none()
            && self.avoid_highways.is_none()
    }
}

fn validate_location(location: &Location) -> Result<(), validator::ValidationError> {
    if location.city.trim().is_empty() {
        return Err(validator::ValidationError::new("city_required"));
    }
    if location.country.trim().is_empty() {
        return Err(validator::ValidationError::new("country_required"));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn location(city: &str, country: &str) -> Location {
        Location {
            city: city.to_string(),
            country: country.to_string(),
            coordinates: None,
        }
    }

    #[test]
    fn test_list_query_omits_all_filter_and_empty_search() {
        let query = ListQuery::page(2, 25).with_search("").with_filter("all");
        assert_eq!(
            query.to_params("status"),
            vec![
                ("page".to_string(), "2".to_string()),
                ("perPage".to_string(), "25".to_string()),
            ]
        );
    }

    #[test]
    fn test_list_query_includes_filter_under_key() {
        let params = ListQuery::default()
            .with_search("Porto")
            .with_filter("admin")
            .to_params("role");
        assert!(params.contains(&("search".to_string(), "Porto".to_string())));
        assert!(params.contains(&("role".to_string(), "admin".to_string())));
    }

    #[test]
    fn test_create_route_defaults_and_wire_format() {
        let start = "2024-05-01T08:00:00Z".parse().unwrap();
        let request = CreateRouteRequest::new(
            "u1",
            "v1",
            location("Porto", "Portugal"),
            location("Lisbon", "Portugal"),
            start,
        );
        assert!(request.validate().is_ok());

        let value = serde_json::to_value(&request).unwrap();
        assert_eq!(value["status"], json!("pending"));
        assert_eq!(value["avoidTolls"], json!(false));
        assert_eq!(value["startPoint"], json!({"city": "Porto", "country": "Portugal"}));
    }

    #[test]
    fn test_create_route_rejects_blank_city() {
        let start = "2024-05-01T08:00:00Z".parse().unwrap();
        let request = CreateRouteRequest::new(
            "u1",
            "v1",
            location(" ", "Portugal"),
            location("Lisbon", "Portugal"),
            start,
        );
        assert!(request.validate().is_err());
    }

    #[test]
    fn test_update_vehicle_serializes_only_set_fields() {
        let update = UpdateVehicleRequest {
            kms: Some(120_000.0),
            status: Some(VehicleStatus::Repairing),
            ..Default::default()
        };
        assert!(!update.is_empty());
        assert_eq!(
            serde_json::to_value(&update).unwrap(),
            json!({"kms": 120000.0, "status": "repairing"})
        );
        assert!(UpdateVehicleRequest::default().is_empty());
    }
}
