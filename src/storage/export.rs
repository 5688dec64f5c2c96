use super::HistoryList;
use anyhow::{Context, Result};
use std::path::Path;

/// Write the history as pretty-printed JSON in the persisted layout.
pub fn export_json(path: &Path, history: &HistoryList) -> Result<()> {
    let out = serde_json::to_string_pretty(history).context("serialize history")?;
    write_file(path, &out)
}

/// Write the history as CSV with a header row.
pub fn export_csv(path: &Path, history: &HistoryList) -> Result<()> {
    let mut out = String::from("name,depth_m,elapsed_s\n");
    for m in history {
        out.push_str(&format!(
            "{},{:.2},{:.2}\n",
            csv_field(&m.name),
            m.depth,
            m.elapsed_time
        ));
    }
    write_file(path, &out)
}

fn write_file(path: &Path, contents: &str) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("create {}", parent.display()))?;
    }
    std::fs::write(path, contents).with_context(|| format!("write {}", path.display()))
}

fn csv_field(s: &str) -> String {
    if s.contains([',', '"', '\n', '\r']) {
        format!("\"{}\"", s.replace('"', "\"\""))
    } else {
        s.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Measurement;

    #[test]
    fn quotes_names_that_need_it() {
        assert_eq!(csv_field("plain"), "plain");
        assert_eq!(csv_field("a,b"), "\"a,b\"");
        assert_eq!(csv_field("say \"hi\""), "\"say \"\"hi\"\"\"");
    }

    #[test]
    fn csv_has_header_and_rows() {
        let path = std::env::temp_dir()
            .join(format!("freefall-depth-export-{}", rand::random::<u64>()))
            .join("history.csv");
        let history = HistoryList::from(vec![Measurement {
            depth: 19.6,
            elapsed_time: 2.0,
            name: "Well, deep".into(),
        }]);
        export_csv(&path, &history).unwrap();
        let text = std::fs::read_to_string(&path).unwrap();
        assert_eq!(text, "name,depth_m,elapsed_s\n\"Well, deep\",19.60,2.00\n");
        if let Some(dir) = path.parent() {
            let _ = std::fs::remove_dir_all(dir);
        }
    }
}
