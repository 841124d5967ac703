//! GCP API interaction module
//!
//! # Module Structure
//!
//! - [`auth`] - Service-account keys and token sources
//! - [`client`] - Client bound to a project and region
//! - [`http`] - HTTP utilities for REST API calls
//!
//! # Example
//!
//! ```ignore
//! use veoscan::gcp::client::GcpClient;
//!
//! fn example(key: &ServiceAccountKey, settings: &Settings) -> anyhow::Result<()> {
//!     let client = GcpClient::from_settings(key, "my-project", settings)?;
//!     let url = client.aiplatform_url("v1beta1/publishers/google/models")?;
//!     Ok(())
//! }
//! ```

pub mod auth;
pub mod client;
pub mod http;
