//! # Allocation HTTP
//!
//! reqwest-backed collaborators for the allocation engine:
//!
//! - [`HttpVehicleCatalog`]: `GET {base}/vehicles?search=..&status=..`
//! - [`HttpCommitGateway`]: `POST`/`PUT {base}/allocations`
//!
//! Both share an [`ApiClient`] built from [`HttpConfig`].
//!
//! ## Example
//!
//! ```ignore
//! let client = ApiClient::new(HttpConfig::from_env()?)?;
//! let env = SessionEnvironment::new(
//!     Arc::new(SystemClock),
//!     Arc::new(HttpVehicleCatalog::new(client.clone())),
//!     CommitService::new(Arc::new(HttpCommitGateway::new(client))),
//!     Arc::new(NoopObserver),
//!     SessionConfig::from_env()?,
//! );
//! ```

pub mod catalog;
pub mod client;
pub mod config;
pub mod error;
pub mod gateway;

pub use catalog::HttpVehicleCatalog;
pub use client::ApiClient;
pub use config::HttpConfig;
pub use error::ConfigError;
pub use gateway::HttpCommitGateway;
