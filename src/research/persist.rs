use std::path::{Path, PathBuf};

use chrono::{DateTime, Local};
use serde::Serialize;
use serde_json::ser::{PrettyFormatter, Serializer};
use tracing::{error, info};

use super::state::ResearchState;

pub const REPORT_BANNER: &str = "==================== GENERATED REPORT ====================";
pub const REPORT_SUFFIX: &str = "_report.txt";
pub const DATA_SUFFIX: &str = ".json";
const MAX_NAME_CHARS: usize = 50;
const TIMESTAMP_FORMAT: &str = "%Y%m%d_%H%M%S";

#[derive(Debug, thiserror::Error)]
pub enum PersistError {
    #[error("failed to write {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to encode research data: {0}")]
    Encode(#[from] serde_json::Error),
}

/// Paths of the artifacts that were written.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Artifacts {
    pub json_path: Option<PathBuf>,
    pub report_path: Option<PathBuf>,
}

/// Lowercase, spaces to `_`, only alphanumerics and `_`, at most 50 chars.
pub fn sanitize_query(query: &str) -> String {
    query
        .to_lowercase()
        .replace(' ', "_")
        .chars()
        .filter(|c| c.is_alphanumeric() || *c == '_')
        .take(MAX_NAME_CHARS)
        .collect()
}

pub fn base_name(query: &str, at: &DateTime<Local>) -> String {
    format!("{}_{}", sanitize_query(query), at.format(TIMESTAMP_FORMAT))
}

/// Writes `<base>.json` and `<base>_report.txt` under `dir`.
///
/// Each write is independent: a failure is logged and leaves that path unset.
pub async fn save(dir: &Path, state: &ResearchState, base: &str) -> Artifacts {
    if let Err(e) = tokio::fs::create_dir_all(dir).await {
        error!(dir = %dir.display(), error = %e, "cannot create output directory");
    }

    let json_path = dir.join(format!("{base}{DATA_SUFFIX}"));
    let json_path = match write_json(&json_path, state).await {
        Ok(()) => {
            info!(path = %json_path.display(), "research data saved");
            Some(json_path)
        }
        Err(e) => {
            error!(error = %e, "saving research data failed");
            None
        }
    };

    let report_path = dir.join(format!("{base}{REPORT_SUFFIX}"));
    let report_path = match write(&report_path, render_report(state).into_bytes()).await {
        Ok(()) => {
            info!(path = %report_path.display(), "report saved");
            Some(report_path)
        }
        Err(e) => {
            error!(error = %e, "saving report failed");
            None
        }
    };

    Artifacts {
        json_path,
        report_path,
    }
}

pub fn render_report(state: &ResearchState) -> String {
    format!(
        "Original Query: {}\n\n{REPORT_BANNER}\n\n{}",
        state.user_query(),
        state.report
    )
}

/// Pretty-printed with a four-space indent; non-ASCII is written as-is.
pub fn encode_json(state: &ResearchState) -> Result<Vec<u8>, serde_json::Error> {
    let mut buf = Vec::new();
    let formatter = PrettyFormatter::with_indent(b"    ");
    let mut serializer = Serializer::with_formatter(&mut buf, formatter);
    state.snapshot().serialize(&mut serializer)?;
    Ok(buf)
}

async fn write_json(path: &Path, state: &ResearchState) -> Result<(), PersistError> {
    write(path, encode_json(state)?).await
}

async fn write(path: &Path, bytes: Vec<u8>) -> Result<(), PersistError> {
    tokio::fs::write(path, bytes)
        .await
        .map_err(|source| PersistError::Io {
            path: path.to_path_buf(),
            source,
        })
}
