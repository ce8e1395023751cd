//! Load phase: writes transformed files into the destination stores.

pub mod document;
pub mod relational;

use crate::error::LoadError;
use async_trait::async_trait;
use connectors::{
    error::ConnectorError,
    file::layout::{IntermediateLayout, entity_name},
};
use engine_core::{observer::Observer, retry::RetryPolicy};
use model::{
    events::{Phase, ProgressEvent},
    records::{
        kind::SourceKind,
        results::LoadResult,
        stats::{DestinationStats, EntityStats},
    },
    summary::LoadSummary,
};
use std::{path::Path, sync::Arc, time::Instant};
use tracing::{info, warn};

/// A destination store that accepts transformed files.
///
/// Like source connectors, loaders keep their connection internally so the
/// engine can retry `connect` through a shared reference.
#[async_trait]
pub trait EntityLoader: Send + Sync {
    fn kind(&self) -> SourceKind;

    async fn connect(&self) -> Result<(), ConnectorError>;

    async fn list_entities(&self) -> Result<Vec<String>, LoadError>;

    /// Loads one transformed file into `entity`. Re-loading the same file must
    /// not duplicate records when the destination has a usable key.
    async fn load_file(
        &self,
        entity: &str,
        path: &Path,
        observer: &dyn Observer,
    ) -> Result<LoadResult, LoadError>;

    async fn stats(&self, entity: &str) -> Result<EntityStats, LoadError>;

    async fn disconnect(&self);
}

pub struct LoadEngine {
    layout: IntermediateLayout,
    document: Arc<dyn EntityLoader>,
    relational: Arc<dyn EntityLoader>,
    observer: Arc<dyn Observer>,
    retry: RetryPolicy,
}

impl LoadEngine {
    pub fn new(
        layout: IntermediateLayout,
        document: Arc<dyn EntityLoader>,
        relational: Arc<dyn EntityLoader>,
        observer: Arc<dyn Observer>,
        retry: RetryPolicy,
    ) -> Self {
        Self {
            layout,
            document,
            relational,
            observer,
            retry,
        }
    }

    fn loader(&self, kind: SourceKind) -> &dyn EntityLoader {
        match kind {
            SourceKind::Document => self.document.as_ref(),
            SourceKind::Relational => self.relational.as_ref(),
        }
    }

    /// Loads both kinds concurrently. A connection failure in one kind fails the
    /// phase, but only after the other kind has finished.
    pub async fn run(&self) -> Result<LoadSummary, LoadError> {
        let started = Instant::now();
        self.observer.on_event(&ProgressEvent::PhaseStarted { phase: Phase::Load });

        let (documents, tables) = tokio::join!(
            self.load_kind(SourceKind::Document),
            self.load_kind(SourceKind::Relational)
        );
        let mut results = documents?;
        results.extend(tables?);

        let total_records = results.iter().map(|r| r.record_count).sum();
        let duration_ms = started.elapsed().as_millis() as u64;
        self.observer.on_event(&ProgressEvent::PhaseFinished {
            phase: Phase::Load,
            records: total_records,
            duration_ms,
        });

        Ok(LoadSummary::new(results, total_records, duration_ms))
    }

    async fn load_kind(&self, kind: SourceKind) -> Result<Vec<LoadResult>, LoadError> {
        let files = self.layout.list_transformed(kind).await?;
        if files.is_empty() {
            info!(source = %kind, "No transformed files to load");
            return Ok(Vec::new());
        }

        let loader = self.loader(kind);
        self.retry
            .connect(&format!("{kind} destination"), || loader.connect())
            .await?;

        let outcome = self.load_files(loader, &files).await;
        loader.disconnect().await;
        outcome
    }

    async fn load_files(
        &self,
        loader: &dyn EntityLoader,
        files: &[std::path::PathBuf],
    ) -> Result<Vec<LoadResult>, LoadError> {
        let mut results = Vec::with_capacity(files.len());

        for path in files {
            let Some(entity) = entity_name(path) else {
                warn!(file = %path.display(), "Skipping file with unrecognized name");
                continue;
            };

            self.observer.on_event(&ProgressEvent::EntityStarted {
                phase: Phase::Load,
                entity: entity.clone(),
            });

            match loader.load_file(&entity, path, self.observer.as_ref()).await {
                Ok(result) => {
                    info!(
                        source = %result.source,
                        entity = %entity,
                        records = result.record_count,
                        operation = %result.operation,
                        "Loaded file"
                    );
                    self.observer.on_event(&ProgressEvent::EntityFinished {
                        phase: Phase::Load,
                        entity,
                        records: result.record_count,
                    });
                    results.push(result);
                }
                Err(err) if err.is_connection() => return Err(err),
                Err(err) => {
                    warn!(file = %path.display(), error = %err, "Skipping file that failed to load");
                    self.observer.on_event(&ProgressEvent::EntitySkipped {
                        phase: Phase::Load,
                        entity,
                        reason: err.to_string(),
                    });
                }
            }
        }

        Ok(results)
    }

    /// Row/document counts and sizes for destination entities. An empty
    /// `entities` list means every entity in the store.
    pub async fn stats(
        &self,
        kind: SourceKind,
        entities: &[String],
    ) -> Result<Vec<DestinationStats>, LoadError> {
        let loader = self.loader(kind);
        self.retry
            .connect(&format!("{kind} destination"), || loader.connect())
            .await?;

        let outcome = async {
            let names = if entities.is_empty() {
                loader.list_entities().await?
            } else {
                entities.to_vec()
            };

            let mut stats = Vec::with_capacity(names.len());
            for entity in names {
                match loader.stats(&entity).await {
                    Ok(entity_stats) => stats.push(DestinationStats {
                        source: kind,
                        entity,
                        stats: entity_stats,
                    }),
                    Err(err) => warn!(source = %kind, entity = %entity, error = %err, "Stats unavailable"),
                }
            }
            Ok::<_, LoadError>(stats)
        }
        .await;

        loader.disconnect().await;
        outcome
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use engine_core::observer::NoopObserver;
    use model::records::results::LoadOperation;
    use std::{
        sync::{
            Mutex,
            atomic::{AtomicUsize, Ordering},
        },
        time::Duration,
    };

    struct MockLoader {
        kind: SourceKind,
        fail_entity: Option<&'static str>,
        refuse_connect: bool,
        connects: AtomicUsize,
        disconnects: AtomicUsize,
        loaded: Mutex<Vec<String>>,
    }

    impl MockLoader {
        fn new(kind: SourceKind) -> Self {
            Self {
                kind,
                fail_entity: None,
                refuse_connect: false,
                connects: AtomicUsize::new(0),
                disconnects: AtomicUsize::new(0),
                loaded: Mutex::new(Vec::new()),
            }
        }
    }

    #[async_trait]
    impl EntityLoader for MockLoader {
        fn kind(&self) -> SourceKind {
            self.kind
        }

        async fn connect(&self) -> Result<(), ConnectorError> {
            self.connects.fetch_add(1, Ordering::SeqCst);
            if self.refuse_connect {
                return Err(ConnectorError::InvalidUrl("unreachable".into()));
            }
            Ok(())
        }

        async fn list_entities(&self) -> Result<Vec<String>, LoadError> {
            Ok(vec!["a".into(), "b".into()])
        }

        async fn load_file(
            &self,
            entity: &str,
            _path: &Path,
            _observer: &dyn Observer,
        ) -> Result<LoadResult, LoadError> {
            if self.fail_entity == Some(entity) {
                return Err(LoadError::NoMatchingColumns(entity.to_string()));
            }
            self.loaded.lock().unwrap().push(entity.to_string());
            Ok(LoadResult {
                source: self.kind,
                entity: entity.to_string(),
                record_count: 2,
                operation: LoadOperation::Upsert,
                loaded_at: Utc::now(),
            })
        }

        async fn stats(&self, entity: &str) -> Result<EntityStats, LoadError> {
            if entity == "b" {
                return Err(LoadError::Task("gone".into()));
            }
            Ok(EntityStats { count: 5, size: 512 })
        }

        async fn disconnect(&self) {
            self.disconnects.fetch_add(1, Ordering::SeqCst);
        }
    }

    async fn seed(layout: &IntermediateLayout, kind: SourceKind, entities: &[&str]) {
        layout.ensure_dirs().await.unwrap();
        for entity in entities {
            let extracted = layout.extracted_path(kind, entity, Utc::now());
            let path = layout.transformed_path(kind, &extracted).unwrap();
            std::fs::write(path, "").unwrap();
        }
    }

    fn engine(
        layout: IntermediateLayout,
        document: Arc<MockLoader>,
        relational: Arc<MockLoader>,
    ) -> LoadEngine {
        LoadEngine::new(
            layout,
            document,
            relational,
            Arc::new(NoopObserver),
            RetryPolicy::new(2, Duration::ZERO, Duration::ZERO),
        )
    }

    #[tokio::test]
    async fn failing_file_is_skipped() {
        let dir = tempfile::tempdir().unwrap();
        let layout = IntermediateLayout::new(dir.path());
        seed(&layout, SourceKind::Relational, &["orders", "payments", "users"]).await;

        let document = Arc::new(MockLoader::new(SourceKind::Document));
        let mut relational = MockLoader::new(SourceKind::Relational);
        relational.fail_entity = Some("payments");
        let relational = Arc::new(relational);

        let summary = engine(layout, document.clone(), relational.clone())
            .run()
            .await
            .unwrap();

        let loaded: Vec<&str> = summary.results.iter().map(|r| r.entity.as_str()).collect();
        assert_eq!(loaded, ["orders", "users"]);
        assert_eq!(summary.total_records, 4);
        // Nothing to load means no connection at all.
        assert_eq!(document.connects.load(Ordering::SeqCst), 0);
        assert_eq!(relational.disconnects.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn connection_failure_fails_phase_after_other_kind_finishes() {
        let dir = tempfile::tempdir().unwrap();
        let layout = IntermediateLayout::new(dir.path());
        seed(&layout, SourceKind::Document, &["users"]).await;
        seed(&layout, SourceKind::Relational, &["orders"]).await;

        let mut document = MockLoader::new(SourceKind::Document);
        document.refuse_connect = true;
        let document = Arc::new(document);
        let relational = Arc::new(MockLoader::new(SourceKind::Relational));

        let err = engine(layout, document.clone(), relational.clone())
            .run()
            .await
            .unwrap_err();

        assert!(err.is_connection());
        assert_eq!(document.connects.load(Ordering::SeqCst), 1);
        assert_eq!(*relational.loaded.lock().unwrap(), ["orders"]);
    }

    #[tokio::test]
    async fn stats_skip_unavailable_entities() {
        let dir = tempfile::tempdir().unwrap();
        let document = Arc::new(MockLoader::new(SourceKind::Document));
        let relational = Arc::new(MockLoader::new(SourceKind::Relational));
        let engine = engine(IntermediateLayout::new(dir.path()), document.clone(), relational);

        let stats = engine.stats(SourceKind::Document, &[]).await.unwrap();
        assert_eq!(stats.len(), 1);
        assert_eq!(stats[0].entity, "a");
        assert_eq!(stats[0].stats, EntityStats { count: 5, size: 512 });
        assert_eq!(document.disconnects.load(Ordering::SeqCst), 1);
    }
}
