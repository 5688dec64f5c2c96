//! Post-run processing: commit the stopped run and tell presentation layers.

use crate::model::{InfoEvent, Measurement, Sample, TimerEvent};
use crate::storage::{HistoryStore, KeyValueStore};
use tokio::sync::mpsc::UnboundedSender;
use tracing::warn;

/// Append the measurement of a stopped run (if any) and emit the resulting events.
pub(crate) fn commit_run<K: KeyValueStore>(
    store: &mut HistoryStore<K>,
    readout: Option<Sample>,
    committed: Option<Measurement>,
    event_tx: &UnboundedSender<TimerEvent>,
) {
    let Some(measurement) = committed else {
        let _ = event_tx.send(TimerEvent::Stopped {
            readout,
            committed: None,
        });
        let _ = event_tx.send(TimerEvent::Info(InfoEvent::NoSample));
        return;
    };

    if let Err(e) = store.append(measurement.clone()) {
        warn!("saving measurement failed: {e:#}");
        let _ = event_tx.send(TimerEvent::Info(InfoEvent::StorageFailed(format!("{e:#}"))));
    }
    let _ = event_tx.send(TimerEvent::Stopped {
        readout,
        committed: Some(measurement),
    });
    let _ = event_tx.send(TimerEvent::HistoryChanged {
        history: store.list().to_vec(),
    });
}
