use super::ChangeSink;
use crate::model::ChangeRecord;
use crate::store::ChangeStore;
use std::sync::{Arc, Mutex};
use tokio::sync::mpsc::{self, error::TrySendError};
use tokio::task::JoinHandle;

/// Bounded queue in front of a [`ChangeStore`].
///
/// A full or closed queue drops the record with a warning and a
/// `warden_change_records_dropped_total` increment.
pub struct QueuedChangeSink {
    sender: Mutex<Option<mpsc::Sender<ChangeRecord>>>,
    worker: Mutex<Option<JoinHandle<()>>>,
}

impl QueuedChangeSink {
    /// Spawns the drain task. Must be called inside a Tokio runtime.
    pub fn spawn(store: Arc<dyn ChangeStore>, capacity: usize) -> Self {
        let (sender, mut receiver) = mpsc::channel::<ChangeRecord>(capacity.max(1));
        let worker = tokio::spawn(async move {
            while let Some(record) = receiver.recv().await {
                let action = record.action;
                let target_key = record.target_key.clone();
                if let Err(err) = store.append_change(record).await {
                    metrics::counter!("warden_change_records_dropped_total", "reason" => "store")
                        .increment(1);
                    tracing::warn!(%action, %target_key, error = %err, "failed to persist change record");
                }
            }
        });
        Self {
            sender: Mutex::new(Some(sender)),
            worker: Mutex::new(Some(worker)),
        }
    }

    /// Stops accepting records and waits until queued ones are written.
    pub async fn close(&self) {
        if let Ok(mut sender) = self.sender.lock() {
            sender.take();
        }
        let worker = self.worker.lock().ok().and_then(|mut worker| worker.take());
        if let Some(worker) = worker {
            let _ = worker.await;
        }
    }
}

impl ChangeSink for QueuedChangeSink {
    fn record(&self, record: ChangeRecord) {
        let Ok(guard) = self.sender.lock() else {
            return;
        };
        let Some(sender) = guard.as_ref() else {
            metrics::counter!("warden_change_records_dropped_total", "reason" => "closed")
                .increment(1);
            return;
        };
        match sender.try_send(record) {
            Ok(()) => {}
            Err(TrySendError::Full(record)) => {
                metrics::counter!("warden_change_records_dropped_total", "reason" => "full")
                    .increment(1);
                tracing::warn!(action = %record.action, target_key = %record.target_key, "change queue full; record dropped");
            }
            Err(TrySendError::Closed(_)) => {
                metrics::counter!("warden_change_records_dropped_total", "reason" => "closed")
                    .increment(1);
            }
        }
    }
}
