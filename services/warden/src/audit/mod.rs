//! Change-history sinks.
//!
//! # Purpose
//! Every accepted grant or menu mutation emits a [`ChangeRecord`]. Emission
//! is fire-and-forget: [`ChangeSink::record`] never blocks on I/O and never
//! fails, so a broken history pipeline cannot fail the mutation itself.
//!
//! # Notes
//! - [`QueuedChangeSink`] hands records to a bounded queue drained by a
//!   background task into a [`ChangeStore`](crate::store::ChangeStore).
//! - [`TracingChangeSink`] only emits a structured log event.
mod queue;

pub use queue::QueuedChangeSink;

use crate::model::ChangeRecord;

pub trait ChangeSink: Send + Sync {
    fn record(&self, record: ChangeRecord);
}

#[derive(Debug, Clone, Copy, Default)]
pub struct TracingChangeSink;

impl ChangeSink for TracingChangeSink {
    fn record(&self, record: ChangeRecord) {
        tracing::info!(
            actor_id = %record.actor_id,
            actor_type = %record.actor_type,
            action = %record.action,
            target_type = %record.target_type,
            target_key = %record.target_key,
            status = %record.status,
            "change recorded"
        );
    }
}
