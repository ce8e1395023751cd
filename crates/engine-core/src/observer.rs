use model::events::ProgressEvent;
use tracing::{debug, info, warn};

/// Receives progress notifications from the pipeline components.
pub trait Observer: Send + Sync {
    fn on_event(&self, event: &ProgressEvent);
}

/// Discards every event.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopObserver;

impl Observer for NoopObserver {
    fn on_event(&self, _event: &ProgressEvent) {}
}

/// Turns events into `tracing` records.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingObserver;

impl Observer for TracingObserver {
    fn on_event(&self, event: &ProgressEvent) {
        let kind = event.event_type();
        match event {
            ProgressEvent::PhaseStarted { phase } => info!(%phase, "Phase started"),
            ProgressEvent::PhaseFinished {
                phase,
                records,
                duration_ms,
            } => info!(%phase, records, duration_ms, "Phase finished"),
            ProgressEvent::PhaseFailed { phase, error } => warn!(%phase, %error, "Phase failed"),
            ProgressEvent::EntityStarted { phase, entity } => {
                debug!(%phase, entity = %entity, "Entity started")
            }
            ProgressEvent::EntityProgress {
                phase,
                entity,
                processed,
            } => debug!(%phase, entity = %entity, processed, "Entity progress"),
            ProgressEvent::EntityFinished {
                phase,
                entity,
                records,
            } => info!(%phase, entity = %entity, records, "Entity finished"),
            ProgressEvent::EntitySkipped {
                phase,
                entity,
                reason,
            } => warn!(%phase, entity = %entity, %reason, "Entity skipped"),
            ProgressEvent::FileWritten { phase, path } => {
                debug!(%phase, path = %path.display(), "File written")
            }
            ProgressEvent::AssetCopied { key } => debug!(event = kind, %key, "Asset copied"),
            ProgressEvent::AssetSkipped { key } => debug!(event = kind, %key, "Asset skipped"),
        }
    }
}
