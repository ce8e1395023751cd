use serde::Serialize;
use std::{fmt, path::PathBuf};

/// The four data-moving phases of a pipeline run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Phase {
    Extract,
    Transform,
    Load,
    Assets,
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Phase::Extract => f.write_str("extract"),
            Phase::Transform => f.write_str("transform"),
            Phase::Load => f.write_str("load"),
            Phase::Assets => f.write_str("assets"),
        }
    }
}

/// Progress notifications emitted by the engine. Consumers decide how to surface them.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum ProgressEvent {
    PhaseStarted {
        phase: Phase,
    },
    PhaseFinished {
        phase: Phase,
        records: u64,
        duration_ms: u64,
    },
    PhaseFailed {
        phase: Phase,
        error: String,
    },
    EntityStarted {
        phase: Phase,
        entity: String,
    },
    EntityProgress {
        phase: Phase,
        entity: String,
        processed: u64,
    },
    EntityFinished {
        phase: Phase,
        entity: String,
        records: u64,
    },
    EntitySkipped {
        phase: Phase,
        entity: String,
        reason: String,
    },
    FileWritten {
        phase: Phase,
        path: PathBuf,
    },
    AssetCopied {
        key: String,
    },
    AssetSkipped {
        key: String,
    },
}

impl ProgressEvent {
    pub fn event_type(&self) -> &'static str {
        match self {
            ProgressEvent::PhaseStarted { .. } => "phase.started",
            ProgressEvent::PhaseFinished { .. } => "phase.finished",
            ProgressEvent::PhaseFailed { .. } => "phase.failed",
            ProgressEvent::EntityStarted { .. } => "entity.started",
            ProgressEvent::EntityProgress { .. } => "entity.progress",
            ProgressEvent::EntityFinished { .. } => "entity.finished",
            ProgressEvent::EntitySkipped { .. } => "entity.skipped",
            ProgressEvent::FileWritten { .. } => "file.written",
            ProgressEvent::AssetCopied { .. } => "asset.copied",
            ProgressEvent::AssetSkipped { .. } => "asset.skipped",
        }
    }
}
