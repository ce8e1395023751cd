use crate::records::{
    kind::SourceKind,
    results::{ExtractResult, LoadResult, TransformResult},
};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Stages a full pipeline run moves through.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PipelineStage {
    Idle,
    Extracting,
    Transforming,
    Loading,
    MirroringAssets,
    Done,
    Failed,
}

impl PipelineStage {
    pub fn as_str(&self) -> &'static str {
        match self {
            PipelineStage::Idle => "Idle",
            PipelineStage::Extracting => "Extracting",
            PipelineStage::Transforming => "Transforming",
            PipelineStage::Loading => "Loading",
            PipelineStage::MirroringAssets => "MirroringAssets",
            PipelineStage::Done => "Done",
            PipelineStage::Failed => "Failed",
        }
    }
}

impl fmt::Display for PipelineStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Output of a single phase: the per-entity results plus totals.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PhaseReport<R> {
    pub results: Vec<R>,
    pub total_records: u64,
    pub duration_ms: u64,
}

impl<R> PhaseReport<R> {
    pub fn new(results: Vec<R>, total_records: u64, duration_ms: u64) -> Self {
        Self {
            results,
            total_records,
            duration_ms,
        }
    }

    pub fn empty() -> Self {
        Self::new(Vec::new(), 0, 0)
    }
}

pub type ExtractSummary = PhaseReport<ExtractResult>;
pub type TransformSummary = PhaseReport<TransformResult>;
pub type LoadSummary = PhaseReport<LoadResult>;

/// Condensed view of a phase as it appears in [`PipelineSummary`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PhaseSummary {
    pub total_records: u64,
    pub duration_ms: u64,
    /// Files (extract/transform) or entities written.
    pub count: usize,
}

impl From<&ExtractSummary> for PhaseSummary {
    fn from(report: &ExtractSummary) -> Self {
        Self {
            total_records: report.total_records,
            duration_ms: report.duration_ms,
            count: report.results.len(),
        }
    }
}

impl From<&TransformSummary> for PhaseSummary {
    fn from(report: &TransformSummary) -> Self {
        Self {
            total_records: report.total_records,
            duration_ms: report.duration_ms,
            count: report.results.len(),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LoadPhaseSummary {
    pub total_records: u64,
    pub duration_ms: u64,
    pub collections: usize,
    pub tables: usize,
}

impl From<&LoadSummary> for LoadPhaseSummary {
    fn from(report: &LoadSummary) -> Self {
        let count_of = |kind: SourceKind| report.results.iter().filter(|r| r.source == kind).count();
        Self {
            total_records: report.total_records,
            duration_ms: report.duration_ms,
            collections: count_of(SourceKind::Document),
            tables: count_of(SourceKind::Relational),
        }
    }
}

/// Counters returned by the asset mirror.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MirrorReport {
    pub listed: u64,
    pub copied: u64,
    pub skipped: u64,
}

/// Terminal result of one full pipeline invocation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PipelineSummary {
    pub extract: PhaseSummary,
    pub transform: PhaseSummary,
    pub load: LoadPhaseSummary,
    pub assets: MirrorReport,
    pub total_duration_ms: u64,
    pub success: bool,
    /// Stage that failed, when `success` is false.
    pub failed_stage: Option<PipelineStage>,
    pub error: Option<String>,
}

impl PipelineSummary {
    /// A summary with every phase zeroed.
    pub fn zeroed(total_duration_ms: u64) -> Self {
        Self {
            extract: PhaseSummary::default(),
            transform: PhaseSummary::default(),
            load: LoadPhaseSummary::default(),
            assets: MirrorReport::default(),
            total_duration_ms,
            success: false,
            failed_stage: None,
            error: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::records::results::LoadOperation;
    use chrono::Utc;

    fn load_result(source: SourceKind, count: u64) -> LoadResult {
        LoadResult {
            source,
            entity: "users".into(),
            record_count: count,
            operation: LoadOperation::Upsert,
            loaded_at: Utc::now(),
        }
    }

    #[test]
    fn load_summary_splits_collections_and_tables() {
        let report = LoadSummary::new(
            vec![
                load_result(SourceKind::Document, 3),
                load_result(SourceKind::Relational, 4),
                load_result(SourceKind::Relational, 5),
            ],
            12,
            40,
        );

        let summary = LoadPhaseSummary::from(&report);
        assert_eq!(summary.collections, 1);
        assert_eq!(summary.tables, 2);
        assert_eq!(summary.total_records, 12);
    }

    #[test]
    fn zeroed_summary_is_unsuccessful() {
        let summary = PipelineSummary::zeroed(15);
        assert!(!summary.success);
        assert_eq!(summary.extract, PhaseSummary::default());
        assert_eq!(summary.total_duration_ms, 15);
    }
}
