//! Keyword filter and report
//!
//! Scans catalog entries for video-generation models and writes the
//! human-readable report.

use crate::catalog::CatalogEntry;
use crate::generate::video_uri;
use serde_json::Value;
use std::io::{self, Write};

/// Keywords marking a video-generation model, lowercase
pub const VIDEO_KEYWORDS: &[&str] = &["video", "veo", "move", "motion"];

/// Printed after any remote failure
pub const REMEDIATION_HINT: &str =
    "Tip: Ensure the 'Vertex AI API' is enabled in your Google Cloud Project.";

/// Case-insensitive substring match of any keyword in `text`
pub fn matches_any(text: &str, keywords: &[&str]) -> bool {
    let text = text.to_lowercase();
    keywords
        .iter()
        .any(|k| text.contains(k.to_lowercase().as_str()))
}

/// Whether an entry's name or resource name mentions one of the keywords
pub fn is_match(entry: &CatalogEntry, keywords: &[&str]) -> bool {
    matches_any(&entry.name, keywords) || matches_any(&entry.resource_name, keywords)
}

/// Single-pass scan state.
///
/// Matches are written as they are observed. The first `preview_limit`
/// entries are kept so the no-match fallback does not need a second pass.
pub struct KeywordScan<'k> {
    keywords: &'k [&'k str],
    preview_limit: usize,
    preview: Vec<CatalogEntry>,
    scanned: usize,
    matched: usize,
}

impl<'k> KeywordScan<'k> {
    pub fn new(keywords: &'k [&'k str], preview_limit: usize) -> Self {
        Self {
            keywords,
            preview_limit,
            preview: Vec::with_capacity(preview_limit),
            scanned: 0,
            matched: 0,
        }
    }

    /// Write the scan banner
    pub fn start(&self, out: &mut impl Write) -> io::Result<()> {
        let quoted: Vec<String> = self.keywords.iter().map(|k| format!("'{}'", k)).collect();
        writeln!(out, "\nScanning models for {}...", quoted.join(", "))
    }

    /// Look at one entry, writing it if it matches
    pub fn observe(&mut self, entry: CatalogEntry, out: &mut impl Write) -> io::Result<bool> {
        self.scanned += 1;

        let matched = is_match(&entry, self.keywords);
        if matched {
            self.matched += 1;
            writeln!(out, " - Found: {} (ID: {})", entry.name, entry.model_id)?;
        }

        if self.preview.len() < self.preview_limit {
            self.preview.push(entry);
        }

        Ok(matched)
    }

    /// Write the fallback listing when nothing matched
    pub fn finish(self, out: &mut impl Write) -> io::Result<()> {
        tracing::info!(
            "Scanned {} models, {} matched",
            self.scanned,
            self.matched
        );

        if self.matched > 0 {
            return Ok(());
        }

        writeln!(
            out,
            "No models found matching 'video' or 'veo'. Listing first {} generic models to verify connection:",
            self.preview_limit
        )?;
        for entry in &self.preview {
            writeln!(out, " - {}", entry.model_id)?;
        }
        Ok(())
    }

    pub fn scanned(&self) -> usize {
        self.scanned
    }

    pub fn matched(&self) -> usize {
        self.matched
    }
}

/// Write a remote failure and the fixed hint. `action` names what failed,
/// e.g. "listing models".
pub fn write_remote_error(
    out: &mut impl Write,
    action: &str,
    error: &anyhow::Error,
) -> io::Result<()> {
    writeln!(out, "\nError {}: {:#}", action, error)?;
    writeln!(out, "{}", REMEDIATION_HINT)
}

/// Write a prediction: its video location when it names one, else the JSON
pub fn write_prediction(out: &mut impl Write, prediction: &Value) -> io::Result<()> {
    if let Some(uri) = video_uri(prediction) {
        return writeln!(out, "Video: {}", uri);
    }
    let pretty = serde_json::to_string_pretty(prediction).map_err(io::Error::other)?;
    writeln!(out, "Prediction:\n{}", pretty)
}
