//! Route endpoints

use std::future::Future;
use tracing::{info, warn};
use validator::Validate;

use carin_protocol::{
    CreateRouteRequest, ListQuery, Paginated, Route, UpdateRouteRequest, User, Vehicle,
};

use crate::client::ApiClient;
use crate::error::{CarinError, Result};
use crate::transport::Transport;
use crate::users::UserService;
use crate::vehicles::VehicleService;

const ROUTES: &str = "/routes";

/// Routes list filter key; values are `RouteStatus` wire names
pub const STATUS_FILTER: &str = "status";

/// A route with its driver and vehicle looked up
#[derive(Debug, Clone)]
pub struct RouteDetails {
    pub route: Route,
    /// `None` when the route has no driver or the user no longer exists
    pub driver: Option<User>,
    pub vehicle: Option<Vehicle>,
}

#[derive(Debug, Clone)]
pub struct RouteService<T> {
    client: ApiClient<T>,
}

impl<T: Transport> RouteService<T> {
    pub fn new(client: &ApiClient<T>) -> Self {
        Self {
            client: client.clone(),
        }
    }

    pub async fn list(&self, query: &ListQuery) -> Result<Paginated<Route>> {
        self.client
            .get_json(ROUTES, query.to_params(STATUS_FILTER))
            .await
    }

    pub async fn get(&self, id: &str) -> Result<Route> {
        self.client.get_json(&item_path(id)?, Vec::new()).await
    }

    /// The route plus its driver and vehicle, fetched side by side
    pub async fn details(&self, id: &str) -> Result<RouteDetails> {
        let route = self.get(id).await?;
        let users = UserService::new(&self.client);
        let vehicles = VehicleService::new(&self.client);

        let (driver, vehicle) = tokio::join!(
            related("driver", &route.user_id, users.get(&route.user_id)),
            related("vehicle", &route.vehicle_id, vehicles.get(&route.vehicle_id)),
        );

        Ok(RouteDetails {
            driver: driver?,
            vehicle: vehicle?,
            route,
        })
    }

    pub async fn total(&self) -> Result<u64> {
        let page: Paginated<Route> = self.list(&ListQuery::page(1, 1)).await?;
        Ok(page.meta.total_items)
    }

    pub async fn create(&self, request: &CreateRouteRequest) -> Result<Route> {
        request.validate()?;
        let route: Route = self.client.post_json(ROUTES, request).await?;
        info!(
            id = %route.id,
            from = %route.start_point,
            to = %route.end_point,
            "route created"
        );
        Ok(route)
    }

    pub async fn update(&self, id: &str, request: &UpdateRouteRequest) -> Result<Route> {
        if request.is_empty() {
            return Err(CarinError::invalid_input("Nothing to update"));
        }
        let route: Route = self.client.patch_json(&item_path(id)?, request).await?;
        info!(id = %route.id, status = %route.status, "route updated");
        Ok(route)
    }

    pub async fn delete(&self, id: &str) -> Result<()> {
        let path = item_path(id)?;
        self.client.delete(&path).await?;
        info!(id = %id.trim(), "route deleted");
        Ok(())
    }
}

/// Gateway rejections of a referenced record leave it out; session errors propagate
async fn related<R>(
    kind: &str,
    id: &str,
    fetch: impl Future<Output = Result<R>>,
) -> Result<Option<R>> {
    if id.trim().is_empty() {
        return Ok(None);
    }
    match fetch.await {
        Ok(record) => Ok(Some(record)),
        Err(err @ CarinError::Api { .. }) => {
            warn!(kind, id, error = %err, "could not load route reference");
            Ok(None)
        }
        Err(err) => Err(err),
    }
}

fn item_path(id: &str) -> Result<String> {
    let id = id.trim();
    if id.is_empty() {
        return Err(CarinError::invalid_input("Route id cannot be empty"));
    }
    Ok(format!("{}/{}", ROUTES, id))
}
