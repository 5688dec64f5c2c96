//! Text summary builder for CLI output.
//!
//! Formats human-readable lines for text mode and history listings.

use crate::model::{Measurement, Sample};
use crate::storage::HistoryList;

/// Pre-formatted lines for text output.
pub(crate) struct TextSummary {
    pub lines: Vec<String>,
}

/// Render a depth readout the way the dashboard does; `0` before any sample.
pub fn format_depth(readout: Option<Sample>) -> String {
    readout
        .map(|s| format!("{:.2}", s.depth))
        .unwrap_or_else(|| "0".to_string())
}

/// Render an elapsed-time readout; `-` before any sample.
pub fn format_time(readout: Option<Sample>) -> String {
    readout
        .map(|s| format!("{:.2}", s.elapsed_time))
        .unwrap_or_else(|| "-".to_string())
}

/// Summary of a finished run in text mode.
pub(crate) fn build_run_summary(
    readout: Option<Sample>,
    committed: Option<&Measurement>,
    history_len: usize,
) -> TextSummary {
    let mut lines = vec![format!(
        "Depth: {} m   Time: {} s",
        format_depth(readout),
        format_time(readout)
    )];
    match committed {
        Some(m) => lines.push(format!(
            "Recorded \"{}\" as entry #{} of the history",
            m.name, history_len
        )),
        None => lines.push("Stopped before the first sample; nothing recorded".to_string()),
    }
    TextSummary { lines }
}

/// One line per history entry, numbered from 1.
pub(crate) fn build_history_lines(history: &HistoryList) -> TextSummary {
    if history.is_empty() {
        return TextSummary {
            lines: vec!["No measurements yet.".to_string()],
        };
    }
    let name_width = history
        .iter()
        .map(|m| m.name.chars().count())
        .max()
        .unwrap_or(4)
        .max(4);
    let mut lines = vec![format!(
        "{:>3}  {:<name_width$}  {:>10}  {:>9}",
        "#", "Name", "Depth (m)", "Time (s)"
    )];
    for (i, m) in history.iter().enumerate() {
        lines.push(format!(
            "{:>3}  {:<name_width$}  {:>10.2}  {:>9.2}",
            i + 1,
            m.name,
            m.depth,
            m.elapsed_time
        ));
    }
    TextSummary { lines }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sentinels_before_first_sample() {
        assert_eq!(format_depth(None), "0");
        assert_eq!(format_time(None), "-");
        let s = Sample::at(2.0);
        assert_eq!(format_depth(Some(s)), "19.60");
        assert_eq!(format_time(Some(s)), "2.00");
    }

    #[test]
    fn history_lines_are_numbered_from_one() {
        let history = HistoryList::from(vec![
            Measurement::from_sample(Sample::at(1.0)),
            Measurement::from_sample(Sample::at(2.0)),
        ]);
        let summary = build_history_lines(&history);
        assert_eq!(summary.lines.len(), 3);
        assert!(summary.lines[1].trim_start().starts_with("1  Measurement"));
        assert!(summary.lines[2].ends_with("2.00"));
    }

    #[test]
    fn empty_run_summary_says_nothing_recorded() {
        let summary = build_run_summary(None, None, 0);
        assert_eq!(summary.lines[0], "Depth: 0 m   Time: - s");
        assert!(summary.lines[1].contains("nothing recorded"));
    }
}
