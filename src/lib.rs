//! # veoscan
//!
//! Finds video-generation models in the Vertex AI Model Garden.
//!
//! The service-account key and project id are read from `.env.local`:
//!
//! ```text
//! GOOGLE_SERVICE_ACCOUNT_JSON='{"type": "service_account", "project_id": "my-project", ...}'
//! GOOGLE_CLOUD_PROJECT_ID=my-project
//! ```
//!
//! The publisher catalog is then listed and every model whose name mentions
//! `video`, `veo`, `move` or `motion` is printed. When nothing matches, the
//! first few models are printed instead so the connection can be checked.
//!
//! With the same credential, [`run_generate`] sends a prompt (and optional
//! reference images) to a Veo model and prints where the video ended up.
//!
//! ```rust,no_run
//! use veoscan::{run, GcpClient, Settings};
//!
//! # async fn example() -> std::io::Result<()> {
//! let settings = Settings::default();
//! let mut stdout = std::io::stdout();
//! run(
//!     &settings,
//!     |key, project| GcpClient::from_settings(key, project, &settings),
//!     &mut stdout,
//! )
//! .await
//! # }
//! ```

pub mod app;
pub mod catalog;
pub mod config;
pub mod envfile;
pub mod error;
pub mod gcp;
pub mod generate;
pub mod report;

/// Version injected at compile time via VEOSCAN_VERSION env var (set by CI/CD),
/// or "dev" for local builds.
pub const VERSION: &str = match option_env!("VEOSCAN_VERSION") {
    Some(v) => v,
    None => "dev",
};

pub use app::{run, run_generate, GenerateOptions};
pub use catalog::CatalogEntry;
pub use config::Settings;
pub use gcp::auth::{AccessTokenSource, ServiceAccountKey};
pub use gcp::client::GcpClient;
pub use generate::PredictRequest;
