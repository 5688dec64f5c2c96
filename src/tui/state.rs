use crate::model::{Measurement, RunPhase, Sample};

pub const TAB_DASHBOARD: usize = 0;
pub const TAB_HISTORY: usize = 1;
pub const TAB_HELP: usize = 2;
pub const TAB_COUNT: usize = 3;

pub struct UiState {
    pub tab: usize,
    pub phase: RunPhase,
    pub readout: Option<Sample>,
    pub info: String,

    // Samples of the current (or last) run for the chart: (seconds, meters)
    pub run_points: Vec<(f64, f64)>,

    pub history: Vec<Measurement>,
    pub history_selected: usize,
    pub history_scroll_offset: usize,
    /// Rows the history list showed at the last draw.
    pub history_page_rows: usize,
    /// Some while the selected entry's name is being edited.
    pub rename_buffer: Option<String>,
    pub last_exported_path: Option<String>,
    pub storage_path: String,
}

impl Default for UiState {
    fn default() -> Self {
        Self {
            tab: TAB_DASHBOARD,
            phase: RunPhase::Idle,
            readout: None,
            info: String::new(),
            run_points: Vec::new(),
            history: Vec::new(),
            history_selected: 0,
            history_scroll_offset: 0,
            history_page_rows: 1,
            rename_buffer: None,
            last_exported_path: None,
            storage_path: String::new(),
        }
    }
}

impl UiState {
    pub fn push_point(points: &mut Vec<(f64, f64)>, x: f64, y: f64) {
        const MAX: usize = 6000; // ~10 min at 10Hz
        points.push((x, y));
        if points.len() > MAX {
            let _ = points.drain(0..(points.len() - MAX));
        }
    }

    /// Keep selection and scroll inside the list after it changed size.
    /// Positions are re-resolved, not identities: after a delete the selection
    /// lands on whatever entry moved into that slot.
    pub fn clamp_history_selection(&mut self) {
        if self.history.is_empty() {
            self.history_selected = 0;
            self.history_scroll_offset = 0;
            self.rename_buffer = None;
            return;
        }
        if self.history_selected >= self.history.len() {
            self.history_selected = self.history.len() - 1;
        }
        if self.history_scroll_offset > self.history_selected {
            self.history_scroll_offset = self.history_selected;
        }
    }

    /// Move the stored scroll offset just far enough to show the selection.
    pub fn scroll_to_selection(&mut self) {
        let rows = self.history_page_rows.max(1);
        if self.history_selected < self.history_scroll_offset {
            self.history_scroll_offset = self.history_selected;
        } else if self.history_selected >= self.history_scroll_offset + rows {
            self.history_scroll_offset = self.history_selected + 1 - rows;
        }
    }

    pub fn selected_measurement(&self) -> Option<&Measurement> {
        self.history.get(self.history_selected)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn state_with(n: usize) -> UiState {
        UiState {
            history: (0..n)
                .map(|i| Measurement::from_sample(Sample::at(i as f64)))
                .collect(),
            ..Default::default()
        }
    }

    #[test]
    fn selection_follows_shrinking_list() {
        let mut state = state_with(3);
        state.history_selected = 2;
        state.history_scroll_offset = 2;
        state.history.remove(2);
        state.clamp_history_selection();
        assert_eq!(state.history_selected, 1);
        assert_eq!(state.history_scroll_offset, 1);
    }

    #[test]
    fn empty_history_resets_selection_and_rename() {
        let mut state = state_with(1);
        state.rename_buffer = Some("x".into());
        state.history.clear();
        state.clamp_history_selection();
        assert_eq!(state.history_selected, 0);
        assert!(state.rename_buffer.is_none());
    }

    #[test]
    fn scroll_offset_follows_selection_both_ways() {
        let mut state = state_with(10);
        state.history_page_rows = 3;
        for _ in 0..5 {
            state.history_selected += 1;
            state.scroll_to_selection();
        }
        assert_eq!(state.history_scroll_offset, 3);

        // Moving back within the page keeps the page where it is.
        state.history_selected = 3;
        state.scroll_to_selection();
        assert_eq!(state.history_scroll_offset, 3);

        state.history_selected = 2;
        state.scroll_to_selection();
        assert_eq!(state.history_scroll_offset, 2);
    }

    #[test]
    fn points_are_capped() {
        let mut points = Vec::new();
        for i in 0..6100 {
            UiState::push_point(&mut points, i as f64, 0.0);
        }
        assert_eq!(points.len(), 6000);
        assert_eq!(points[0].0, 100.0);
    }
}
