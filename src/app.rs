//! The scan and generate flows
//!
//! Both read the env file, build the client and make their remote calls.
//! Every failure is written to `out` and the flow returns normally.

use crate::config::{self, Settings, CREDENTIAL_KEY};
use crate::error::ConfigError;
use crate::gcp::auth::{is_valid_project_id, ServiceAccountKey};
use crate::gcp::client::GcpClient;
use crate::generate::{self, PredictRequest};
use crate::report::{self, KeywordScan, VIDEO_KEYWORDS};
use futures::TryStreamExt;
use std::io::{self, Write};
use std::path::PathBuf;

/// What to ask a video model for
#[derive(Debug, Clone)]
pub struct GenerateOptions {
    pub prompt: String,
    /// Image files sent as references
    pub images: Vec<PathBuf>,
    pub model: String,
}

/// Read the env file and settle on a credential and project.
///
/// Returns `None` once a reason to stop has been written to `out`.
fn load_credential<W: Write>(
    settings: &Settings,
    out: &mut W,
) -> io::Result<Option<(ServiceAccountKey, String)>> {
    let content = match config::read_env_file(&settings.env_file) {
        Ok(content) => content,
        Err(e) => {
            tracing::error!("{}", e);
            writeln!(out, "{}", e)?;
            return Ok(None);
        }
    };

    let extraction = config::extract(&content);
    for diagnostic in &extraction.diagnostics {
        writeln!(out, "{}", diagnostic)?;
    }

    if extraction.credential.is_none() {
        let parse_failed = extraction
            .diagnostics
            .iter()
            .any(|d| matches!(d, ConfigError::CredentialParse(_)));
        if !parse_failed {
            let missing = ConfigError::MissingCredential {
                key: CREDENTIAL_KEY.to_string(),
                file: settings.env_file.clone(),
            };
            writeln!(out, "{}", missing)?;
        }
        return Ok(None);
    }

    let project_id = match extraction.resolve_project() {
        Ok(project_id) => project_id,
        Err(e) => {
            writeln!(out, "{}", e)?;
            return Ok(None);
        }
    };
    if !is_valid_project_id(&project_id) {
        tracing::warn!("Project id {:?} does not look like a GCP project id", project_id);
    }

    writeln!(out, "Authenticating with project: {}", project_id)?;
    tracing::info!("Using project: {}, region: {}", project_id, settings.region);

    Ok(extraction.credential.map(|key| (key, project_id)))
}

/// Run one scan.
///
/// `connect` builds the client from the credential and resolved project. It is
/// only called once both are known.
///
/// Only failures writing to `out` are returned.
pub async fn run<C, W>(settings: &Settings, connect: C, out: &mut W) -> io::Result<()>
where
    C: FnOnce(&ServiceAccountKey, &str) -> anyhow::Result<GcpClient>,
    W: Write,
{
    const ACTION: &str = "listing models";

    let Some((credential, project_id)) = load_credential(settings, out)? else {
        return Ok(());
    };

    let client = match connect(&credential, &project_id) {
        Ok(client) => client,
        Err(e) => {
            tracing::error!("Failed to build client: {:#}", e);
            return report::write_remote_error(out, ACTION, &e);
        }
    };

    writeln!(out, "\nAttempting to list video models in Model Garden...")?;

    let mut scan = KeywordScan::new(VIDEO_KEYWORDS, settings.preview_limit);
    scan.start(out)?;

    let models = client.list_publisher_models(&settings.publisher, settings.page_size);
    futures::pin_mut!(models);

    loop {
        match models.try_next().await {
            Ok(Some(entry)) => {
                scan.observe(entry, out)?;
            }
            Ok(None) => break,
            Err(e) => {
                tracing::error!("Listing failed after {} models: {:#}", scan.scanned(), e);
                return report::write_remote_error(out, ACTION, &e);
            }
        }
    }

    scan.finish(out)
}

/// Request one video.
///
/// The prompt and images are checked before the env file is read; `connect`
/// is called only for a usable request.
pub async fn run_generate<C, W>(
    settings: &Settings,
    options: &GenerateOptions,
    connect: C,
    out: &mut W,
) -> io::Result<()>
where
    C: FnOnce(&ServiceAccountKey, &str) -> anyhow::Result<GcpClient>,
    W: Write,
{
    const ACTION: &str = "generating video";

    let mut images = Vec::with_capacity(options.images.len());
    for path in &options.images {
        match generate::encode_image_file(path) {
            Ok(encoded) => images.push(encoded),
            Err(e) => return writeln!(out, "Error: {:#}", e),
        }
    }

    let request = match PredictRequest::new(&options.prompt, &images) {
        Ok(request) => request,
        Err(e) => return writeln!(out, "Error: {}", e),
    };

    let Some((credential, project_id)) = load_credential(settings, out)? else {
        return Ok(());
    };

    let client = match connect(&credential, &project_id) {
        Ok(client) => client,
        Err(e) => {
            tracing::error!("Failed to build client: {:#}", e);
            return report::write_remote_error(out, ACTION, &e);
        }
    };

    writeln!(
        out,
        "\nGenerating video: Prompt=\"{}\", Images={}",
        request.prompt(),
        request.image_count()
    )?;

    match client
        .generate_video(&settings.publisher, &options.model, &request)
        .await
    {
        Ok(prediction) => report::write_prediction(out, &prediction),
        Err(e) => {
            tracing::error!("Prediction failed: {:#}", e);
            report::write_remote_error(out, ACTION, &e)
        }
    }
}
