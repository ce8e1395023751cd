use crate::{
    error::PipelineError,
    execution::{extract::ExtractionCoordinator, mirror::AssetMirror},
};
use chrono::{DateTime, Utc};
use connectors::file::layout::IntermediateLayout;
use engine_core::{observer::Observer, watermark::WatermarkStore};
use engine_processing::{load::LoadEngine, transform::TransformEngine};
use model::{
    events::{Phase, ProgressEvent},
    records::{kind::SourceKind, stats::DestinationStats},
    summary::{
        ExtractSummary, LoadPhaseSummary, LoadSummary, MirrorReport, PhaseSummary,
        PipelineStage, PipelineSummary, TransformSummary,
    },
};
use std::{sync::Arc, time::Instant};
use tokio::sync::{Mutex, MutexGuard, watch};
use tracing::{error, info, warn};

type StageFailure = (PipelineStage, PipelineError);

/// Drives Extract → Transform → Load → Assets and owns the watermark.
///
/// Not reentrant: a second run, or a phase started while a run is active,
/// fails with [`PipelineError::AlreadyRunning`].
pub struct Orchestrator {
    extractor: ExtractionCoordinator,
    transformer: TransformEngine,
    loader: LoadEngine,
    mirror: Option<AssetMirror>,
    watermark: Arc<dyn WatermarkStore>,
    layout: IntermediateLayout,
    cleanup: bool,
    observer: Arc<dyn Observer>,
    stage: watch::Sender<PipelineStage>,
    run_lock: Mutex<()>,
}

impl Orchestrator {
    pub fn new(
        extractor: ExtractionCoordinator,
        transformer: TransformEngine,
        loader: LoadEngine,
        watermark: Arc<dyn WatermarkStore>,
        layout: IntermediateLayout,
        observer: Arc<dyn Observer>,
    ) -> Self {
        Self {
            extractor,
            transformer,
            loader,
            mirror: None,
            watermark,
            layout,
            cleanup: false,
            observer,
            stage: watch::Sender::new(PipelineStage::Idle),
            run_lock: Mutex::new(()),
        }
    }

    pub fn with_mirror(mut self, mirror: AssetMirror) -> Self {
        self.mirror = Some(mirror);
        self
    }

    /// Delete intermediate files after a fully successful run.
    pub fn with_cleanup(mut self, cleanup: bool) -> Self {
        self.cleanup = cleanup;
        self
    }

    pub fn stage(&self) -> PipelineStage {
        *self.stage.borrow()
    }

    pub fn subscribe(&self) -> watch::Receiver<PipelineStage> {
        self.stage.subscribe()
    }

    fn lock(&self) -> Result<MutexGuard<'_, ()>, PipelineError> {
        self.run_lock
            .try_lock()
            .map_err(|_| PipelineError::AlreadyRunning)
    }

    /// Runs every phase in order. Phase failures never escape as errors: they
    /// produce a zeroed summary with `success == false`, and the watermark stays
    /// where it was.
    pub async fn run_full_pipeline(&self) -> Result<PipelineSummary, PipelineError> {
        let _guard = self.lock()?;
        let started = Instant::now();
        let run_started_at = Utc::now();
        info!(%run_started_at, "Starting full pipeline");

        let mut summary = PipelineSummary::zeroed(0);
        let outcome = self.run_phases(&mut summary).await;
        let total_duration_ms = started.elapsed().as_millis() as u64;

        match outcome {
            Ok(()) => {
                self.commit(run_started_at).await;
                self.stage.send_replace(PipelineStage::Done);

                summary.total_duration_ms = total_duration_ms;
                summary.success = true;
                info!(
                    records = summary.load.total_records,
                    collections = summary.load.collections,
                    tables = summary.load.tables,
                    assets_copied = summary.assets.copied,
                    total_duration_ms,
                    "Pipeline completed"
                );
                Ok(summary)
            }
            Err((stage, err)) => {
                error!(%stage, error = %err, "Pipeline failed");
                if let Some(phase) = phase_of(stage) {
                    self.observer.on_event(&ProgressEvent::PhaseFailed {
                        phase,
                        error: err.to_string(),
                    });
                }
                self.stage.send_replace(PipelineStage::Failed);

                Ok(PipelineSummary {
                    failed_stage: Some(stage),
                    error: Some(err.to_string()),
                    ..PipelineSummary::zeroed(total_duration_ms)
                })
            }
        }
    }

    async fn run_phases(&self, summary: &mut PipelineSummary) -> Result<(), StageFailure> {
        self.stage.send_replace(PipelineStage::Extracting);
        let since = self
            .watermark
            .get_last()
            .await
            .map_err(at(PipelineStage::Extracting))?;
        let extract = self
            .extractor
            .run(since)
            .await
            .map_err(at(PipelineStage::Extracting))?;
        summary.extract = PhaseSummary::from(&extract);

        self.stage.send_replace(PipelineStage::Transforming);
        let transform = self
            .transformer
            .run()
            .await
            .map_err(at(PipelineStage::Transforming))?;
        summary.transform = PhaseSummary::from(&transform);

        self.stage.send_replace(PipelineStage::Loading);
        let load = self
            .loader
            .run()
            .await
            .map_err(at(PipelineStage::Loading))?;
        summary.load = LoadPhaseSummary::from(&load);

        self.stage.send_replace(PipelineStage::MirroringAssets);
        match &self.mirror {
            Some(mirror) => {
                summary.assets = mirror
                    .migrate_assets()
                    .await
                    .map_err(at(PipelineStage::MirroringAssets))?;
            }
            None => info!("No asset buckets configured, skipping asset mirroring"),
        }

        Ok(())
    }

    // A failed watermark write only means the next run re-extracts this window.
    async fn commit(&self, run_started_at: DateTime<Utc>) {
        match self.watermark.save(run_started_at).await {
            Ok(()) => info!(watermark = %run_started_at, "Advanced watermark"),
            Err(err) => error!(error = %err, "Failed to advance watermark"),
        }

        if self.cleanup {
            match self.layout.clean().await {
                Ok(()) => info!(root = %self.layout.root().display(), "Removed intermediate files"),
                Err(err) => warn!(error = %err, "Failed to remove intermediate files"),
            }
        }
    }

    /// On-demand extraction from the current watermark. Does not advance it.
    pub async fn extract(&self) -> Result<ExtractSummary, PipelineError> {
        let _guard = self.lock()?;
        let since = self.watermark.get_last().await?;
        Ok(self.extractor.run(since).await?)
    }

    pub async fn transform(&self) -> Result<TransformSummary, PipelineError> {
        let _guard = self.lock()?;
        Ok(self.transformer.run().await?)
    }

    pub async fn load(&self) -> Result<LoadSummary, PipelineError> {
        let _guard = self.lock()?;
        Ok(self.loader.run().await?)
    }

    pub async fn migrate_assets(&self) -> Result<MirrorReport, PipelineError> {
        let _guard = self.lock()?;
        let mirror = self
            .mirror
            .as_ref()
            .ok_or(PipelineError::AssetsNotConfigured)?;
        Ok(mirror.migrate_assets().await?)
    }

    /// Counts and sizes of destination collections and tables. Empty lists mean
    /// everything in the store.
    pub async fn destination_stats(
        &self,
        collections: &[String],
        tables: &[String],
    ) -> Result<Vec<DestinationStats>, PipelineError> {
        let (documents, relational) = tokio::join!(
            self.loader.stats(SourceKind::Document, collections),
            self.loader.stats(SourceKind::Relational, tables)
        );
        let mut stats = documents?;
        stats.extend(relational?);
        Ok(stats)
    }
}

fn at<E: Into<PipelineError>>(stage: PipelineStage) -> impl FnOnce(E) -> StageFailure {
    move |err| (stage, err.into())
}

fn phase_of(stage: PipelineStage) -> Option<Phase> {
    match stage {
        PipelineStage::Extracting => Some(Phase::Extract),
        PipelineStage::Transforming => Some(Phase::Transform),
        PipelineStage::Loading => Some(Phase::Load),
        PipelineStage::MirroringAssets => Some(Phase::Assets),
        PipelineStage::Idle | PipelineStage::Done | PipelineStage::Failed => None,
    }
}
