//! Vehicle lookup over HTTP

use crate::client::ApiClient;
use allocation_core::environment::{BoxFuture, VehicleCatalog};
use allocation_core::error::CatalogError;
use allocation_core::types::{Vehicle, VehicleStatus};
use reqwest::Method;
use serde::Deserialize;

/// Vehicle list as served by the backend, bare or wrapped in `data`
#[derive(Deserialize)]
#[serde(untagged)]
enum VehicleList {
    Bare(Vec<Vehicle>),
    Envelope { data: Vec<Vehicle> },
}

impl VehicleList {
    fn into_vehicles(self) -> Vec<Vehicle> {
        match self {
            Self::Bare(vehicles) | Self::Envelope { data: vehicles } => vehicles,
        }
    }
}

/// [`VehicleCatalog`] backed by `GET {base}/vehicles`
#[derive(Clone, Debug)]
pub struct HttpVehicleCatalog {
    client: ApiClient,
}

impl HttpVehicleCatalog {
    /// Creates a catalog over the given client
    #[must_use]
    pub const fn new(client: ApiClient) -> Self {
        Self { client }
    }
}

impl VehicleCatalog for HttpVehicleCatalog {
    fn search(
        &self,
        term: &str,
        status: Option<VehicleStatus>,
    ) -> BoxFuture<Result<Vec<Vehicle>, CatalogError>> {
        let mut query = vec![("search", term.to_string())];
        if let Some(status) = status {
            query.push(("status", status.as_str().to_string()));
        }
        let request = self.client.request(Method::GET, "vehicles").query(&query);

        Box::pin(async move {
            let response = request
                .send()
                .await
                .map_err(|e| CatalogError::Transport(e.to_string()))?;

            let status = response.status();
            if !status.is_success() {
                tracing::warn!(status = status.as_u16(), "Vehicle search rejected");
                return Err(CatalogError::Status(status.as_u16()));
            }

            let vehicles = response
                .json::<VehicleList>()
                .await
                .map_err(|e| CatalogError::Parse(e.to_string()))?
                .into_vehicles();

            tracing::debug!(count = vehicles.len(), "Vehicle search completed");
            Ok(vehicles)
        })
    }
}
