//! Vehicle endpoints

use tracing::info;
use validator::Validate;

use carin_protocol::{
    CreateVehicleRequest, ListQuery, Paginated, UpdateVehicleRequest, Vehicle,
};

use crate::client::ApiClient;
use crate::error::{CarinError, Result};
use crate::transport::Transport;

const VEHICLES: &str = "/vehicles";

/// Vehicles list filter key; values are `VehicleStatus` wire names
pub const STATUS_FILTER: &str = "status";

#[derive(Debug, Clone)]
pub struct VehicleService<T> {
    client: ApiClient<T>,
}

impl<T: Transport> VehicleService<T> {
    pub fn new(client: &ApiClient<T>) -> Self {
        Self {
            client: client.clone(),
        }
    }

    pub async fn list(&self, query: &ListQuery) -> Result<Paginated<Vehicle>> {
        self.client
            .get_json(VEHICLES, query.to_params(STATUS_FILTER))
            .await
    }

    pub async fn get(&self, id: &str) -> Result<Vehicle> {
        self.client.get_json(&item_path(id)?, Vec::new()).await
    }

    /// Fleet size, read from the metadata of a one-item page
    pub async fn total(&self) -> Result<u64> {
        let page: Paginated<Vehicle> = self.list(&ListQuery::page(1, 1)).await?;
        Ok(page.meta.total_items)
    }

    pub async fn create(&self, request: &CreateVehicleRequest) -> Result<Vehicle> {
        request.validate()?;
        let vehicle: Vehicle = self.client.post_json(VEHICLES, request).await?;
        info!(id = %vehicle.id, plate = %vehicle.license_plate, "vehicle created");
        Ok(vehicle)
    }

    pub async fn update(&self, id: &str, request: &UpdateVehicleRequest) -> Result<Vehicle> {
        if request.is_empty() {
            return Err(CarinError::invalid_input("Nothing to update"));
        }
        request.validate()?;
        let vehicle: Vehicle = self.client.patch_json(&item_path(id)?, request).await?;
        info!(id = %vehicle.id, "vehicle updated");
        Ok(vehicle)
    }
}

fn item_path(id: &str) -> Result<String> {
    let id = id.trim();
    if id.is_empty() {
        return Err(CarinError::invalid_input("Vehicle id cannot be empty"));
    }
    Ok(format!("{}/{}", VEHICLES, id))
}
