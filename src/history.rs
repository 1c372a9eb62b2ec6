//! Past research sessions found in the output directory.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use tracing::debug;

use crate::research::persist::{DATA_SUFFIX, REPORT_SUFFIX};

/// Artifacts sharing one `<query>_<timestamp>` base name.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Session {
    pub base_name: String,
    pub reports: Vec<PathBuf>,
    pub data: Vec<PathBuf>,
}

impl Session {
    pub fn title(&self) -> String {
        self.base_name.replace('_', " ")
    }
}

/// Groups report and data files under `dir` by base name, newest first.
///
/// The directory is created when missing.
pub async fn list_sessions(dir: &Path) -> std::io::Result<Vec<Session>> {
    tokio::fs::create_dir_all(dir).await?;

    let mut sessions: BTreeMap<String, Session> = BTreeMap::new();
    let mut entries = tokio::fs::read_dir(dir).await?;
    while let Some(entry) = entries.next_entry().await? {
        let file_name = entry.file_name();
        let Some(name) = file_name.to_str() else {
            continue;
        };
        let Some((base, is_report)) = classify(name) else {
            continue;
        };

        let session = sessions.entry(base.to_string()).or_insert_with(|| Session {
            base_name: base.to_string(),
            ..Session::default()
        });
        if is_report {
            session.reports.push(entry.path());
        } else {
            session.data.push(entry.path());
        }
    }

    debug!(dir = %dir.display(), sessions = sessions.len(), "history scanned");
    Ok(sessions.into_values().rev().collect())
}

/// `(base name, is report)` for research artifacts, `None` for anything else.
fn classify(file_name: &str) -> Option<(&str, bool)> {
    if let Some(base) = file_name.strip_suffix(REPORT_SUFFIX) {
        return Some((base, true));
    }
    file_name.strip_suffix(DATA_SUFFIX).map(|base| (base, false))
}
