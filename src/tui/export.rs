use crate::model::Measurement;
use crate::storage::HistoryList;
use anyhow::{Context, Result};
use std::path::PathBuf;

/// Default export file name, e.g. `freefall-depth-history-2024-01-15_14-30-45.json`.
pub fn export_file_name(extension: &str) -> String {
    let stamp = time::OffsetDateTime::now_local()
        .unwrap_or_else(|_| time::OffsetDateTime::now_utc())
        .format(time::macros::format_description!(
            "[year]-[month]-[day]_[hour]-[minute]-[second]"
        ))
        .unwrap_or_else(|_| "now".into());
    format!("freefall-depth-history-{stamp}.{extension}")
}

fn export_path(extension: &str) -> Result<PathBuf> {
    let current_dir = std::env::current_dir().context("get current directory")?;
    Ok(current_dir.join(export_file_name(extension)))
}

/// Export the whole history as JSON into the current directory.
/// Returns the absolute path of the exported file.
pub fn export_history_json(history: &[Measurement]) -> Result<PathBuf> {
    let path = export_path("json")?;
    crate::storage::export_json(&path, &HistoryList::from(history.to_vec()))?;
    Ok(path)
}

/// Export the whole history as CSV into the current directory.
/// Returns the absolute path of the exported file.
pub fn export_history_csv(history: &[Measurement]) -> Result<PathBuf> {
    let path = export_path("csv")?;
    crate::storage::export_csv(&path, &HistoryList::from(history.to_vec()))?;
    Ok(path)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn file_name_carries_extension() {
        let name = export_file_name("csv");
        assert!(name.starts_with("freefall-depth-history-"));
        assert!(name.ends_with(".csv"));
        assert!(!name.contains(':'));
    }
}
