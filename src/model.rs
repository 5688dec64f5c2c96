use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

/// Label given to a freshly committed measurement.
pub const DEFAULT_MEASUREMENT_NAME: &str = "Measurement";

/// Storage slot holding the persisted history.
pub const DEFAULT_STORAGE_KEY: &str = "measurementHistory";

/// Sampling cadence while a run is active.
pub const DEFAULT_TICK_INTERVAL: Duration = Duration::from_millis(100);

/// Effective settings of one invocation; `--print-config` dumps it as JSON.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunConfig {
    #[serde(with = "humantime_serde")]
    pub tick_interval: Duration,
    pub data_dir: PathBuf,
    pub storage_key: String,
    #[serde(default, with = "humantime_serde")]
    pub auto_stop: Option<Duration>,
}

/// One published readout of a run.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Sample {
    pub depth: f64,
    pub elapsed_time: f64,
}

impl Sample {
    /// Derive the readout for `elapsed_time` seconds of free fall.
    pub fn at(elapsed_time: f64) -> Self {
        Self {
            depth: crate::physics::depth(elapsed_time),
            elapsed_time,
        }
    }
}

/// A completed run. Only `name` changes after creation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Measurement {
    pub depth: f64,
    pub elapsed_time: f64,
    pub name: String,
}

impl Measurement {
    pub fn from_sample(sample: Sample) -> Self {
        Self {
            depth: sample.depth,
            elapsed_time: sample.elapsed_time,
            name: DEFAULT_MEASUREMENT_NAME.to_string(),
        }
    }

    /// Both derived values are finite and non-negative.
    pub fn is_well_formed(&self) -> bool {
        self.depth.is_finite()
            && self.depth >= 0.0
            && self.elapsed_time.is_finite()
            && self.elapsed_time >= 0.0
    }
}

/// Coarse run state shared with presentation layers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunPhase {
    Idle,
    Running,
}

impl RunPhase {
    /// Label of the single control offered in this state.
    pub fn action_label(self) -> &'static str {
        match self {
            RunPhase::Idle => "Start",
            RunPhase::Running => "Stop",
        }
    }
}

#[derive(Debug, Clone)]
pub enum TimerEvent {
    Started,
    Readout(Sample),
    Stopped {
        readout: Option<Sample>,
        committed: Option<Measurement>,
    },
    HistoryChanged {
        history: Vec<Measurement>,
    },
    Info(InfoEvent),
}

/// Structured info events emitted by the controller and consumed by UI/CLI layers.
#[derive(Debug, Clone)]
pub enum InfoEvent {
    NoSample,
    IndexOutOfRange { index: usize, len: usize },
    StorageFailed(String),
}

impl InfoEvent {
    /// Render a human-readable message for UI/CLI layers.
    pub fn to_message(&self) -> String {
        match self {
            InfoEvent::NoSample => "Stopped before the first sample; nothing recorded".to_string(),
            InfoEvent::IndexOutOfRange { index, len } => {
                format!("No history entry #{} ({} entries)", index + 1, len)
            }
            InfoEvent::StorageFailed(err) => format!("Saving history failed: {}", err),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn measurement_uses_camel_case_layout() {
        let m = Measurement {
            depth: 19.6,
            elapsed_time: 2.0,
            name: "Well".into(),
        };
        let v = serde_json::to_value(&m).unwrap();
        assert_eq!(
            v,
            serde_json::json!({ "depth": 19.6, "elapsedTime": 2.0, "name": "Well" })
        );
    }

    #[test]
    fn from_sample_uses_default_name() {
        let m = Measurement::from_sample(Sample::at(1.0));
        assert_eq!(m.name, DEFAULT_MEASUREMENT_NAME);
        assert_eq!(m.elapsed_time, 1.0);
        assert!((m.depth - 4.9).abs() < 1e-9);
    }

    #[test]
    fn run_config_uses_human_durations() {
        let cfg = RunConfig {
            tick_interval: DEFAULT_TICK_INTERVAL,
            data_dir: PathBuf::from("/tmp/ff"),
            storage_key: DEFAULT_STORAGE_KEY.to_string(),
            auto_stop: Some(Duration::from_secs(2)),
        };
        let v = serde_json::to_value(&cfg).unwrap();
        assert_eq!(v["tick_interval"], "100ms");
        assert_eq!(v["auto_stop"], "2s");

        let back: RunConfig = serde_json::from_value(v).unwrap();
        assert_eq!(back, cfg);
    }

    #[test]
    fn missing_auto_stop_reads_as_none() {
        let cfg: RunConfig = serde_json::from_str(
            r#"{"tick_interval":"250ms","data_dir":"/tmp/ff","storage_key":"k"}"#,
        )
        .unwrap();
        assert_eq!(cfg.tick_interval, Duration::from_millis(250));
        assert!(cfg.auto_stop.is_none());
    }

    #[test]
    fn negative_values_are_not_well_formed() {
        let mut m = Measurement::from_sample(Sample::at(1.0));
        assert!(m.is_well_formed());
        m.depth = -1.0;
        assert!(!m.is_well_formed());
    }
}
