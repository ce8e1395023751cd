use crate::error::ExtractError;
use chrono::{DateTime, Utc};
use connectors::{file::layout::IntermediateLayout, source::SourceConnector};
use engine_core::{observer::Observer, retry::RetryPolicy};
use model::{
    events::{Phase, ProgressEvent},
    records::{kind::SourceKind, results::ExtractResult},
    summary::ExtractSummary,
};
use std::{sync::Arc, time::Instant};
use tracing::{info, warn};

/// Runs both source connectors and writes one extracted file per entity.
pub struct ExtractionCoordinator {
    layout: IntermediateLayout,
    document: Arc<dyn SourceConnector>,
    relational: Arc<dyn SourceConnector>,
    collections: Vec<String>,
    tables: Vec<String>,
    observer: Arc<dyn Observer>,
    retry: RetryPolicy,
}

impl ExtractionCoordinator {
    pub fn new(
        layout: IntermediateLayout,
        document: Arc<dyn SourceConnector>,
        relational: Arc<dyn SourceConnector>,
        observer: Arc<dyn Observer>,
        retry: RetryPolicy,
    ) -> Self {
        Self {
            layout,
            document,
            relational,
            collections: Vec::new(),
            tables: Vec::new(),
            observer,
            retry,
        }
    }

    /// Restricts extraction to the named collections and tables. Empty lists mean all.
    pub fn with_allow_lists(mut self, collections: Vec<String>, tables: Vec<String>) -> Self {
        self.collections = collections;
        self.tables = tables;
        self
    }

    /// Extracts every selected entity changed after `since` (relational only;
    /// collections are always extracted in full).
    pub async fn run(&self, since: Option<DateTime<Utc>>) -> Result<ExtractSummary, ExtractError> {
        let started = Instant::now();
        self.observer.on_event(&ProgressEvent::PhaseStarted {
            phase: Phase::Extract,
        });
        match since {
            Some(since) => info!(%since, "Extracting changes since last successful run"),
            None => info!("No watermark found, extracting everything"),
        }

        self.layout.ensure_dirs().await?;

        let (documents, tables) = tokio::join!(
            self.extract_kind(self.document.as_ref(), &self.collections, since),
            self.extract_kind(self.relational.as_ref(), &self.tables, since)
        );
        let mut results = documents?;
        results.extend(tables?);

        let total_records = results.iter().map(|r| r.record_count).sum();
        let duration_ms = started.elapsed().as_millis() as u64;
        self.observer.on_event(&ProgressEvent::PhaseFinished {
            phase: Phase::Extract,
            records: total_records,
            duration_ms,
        });

        Ok(ExtractSummary::new(results, total_records, duration_ms))
    }

    async fn extract_kind(
        &self,
        connector: &dyn SourceConnector,
        allow: &[String],
        since: Option<DateTime<Utc>>,
    ) -> Result<Vec<ExtractResult>, ExtractError> {
        let kind = connector.kind();
        self.retry
            .connect(&format!("{kind} source"), || connector.connect())
            .await?;

        let outcome = self.extract_entities(connector, kind, allow, since).await;
        connector.disconnect().await;
        outcome
    }

    async fn extract_entities(
        &self,
        connector: &dyn SourceConnector,
        kind: SourceKind,
        allow: &[String],
        since: Option<DateTime<Utc>>,
    ) -> Result<Vec<ExtractResult>, ExtractError> {
        let available = connector.list_entities().await?;
        let entities = select_entities(kind, &available, allow);
        info!(source = %kind, entities = entities.len(), "Extracting");

        let mut results = Vec::with_capacity(entities.len());
        for entity in entities {
            self.observer.on_event(&ProgressEvent::EntityStarted {
                phase: Phase::Extract,
                entity: entity.clone(),
            });

            let extracted_at = Utc::now();
            let file_path = self.layout.extracted_path(kind, &entity, extracted_at);
            match connector.extract_entity(&entity, since, &file_path).await {
                Ok(record_count) => {
                    self.observer.on_event(&ProgressEvent::FileWritten {
                        phase: Phase::Extract,
                        path: file_path.clone(),
                    });
                    self.observer.on_event(&ProgressEvent::EntityFinished {
                        phase: Phase::Extract,
                        entity: entity.clone(),
                        records: record_count,
                    });
                    results.push(ExtractResult {
                        source: kind,
                        entity,
                        record_count,
                        file_path,
                        extracted_at,
                    });
                }
                Err(source) => {
                    let err = ExtractError::Entity {
                        entity: entity.clone(),
                        source,
                    };
                    warn!(source = %kind, error = %err, "Skipping entity");
                    self.observer.on_event(&ProgressEvent::EntitySkipped {
                        phase: Phase::Extract,
                        entity,
                        reason: err.to_string(),
                    });
                }
            }
        }

        Ok(results)
    }
}

/// Applies an allow-list to the entities a store reports, keeping allow-list order.
/// Names the store does not have are reported and dropped.
pub fn select_entities(kind: SourceKind, available: &[String], allow: &[String]) -> Vec<String> {
    if allow.is_empty() {
        return available.to_vec();
    }

    allow
        .iter()
        .filter(|name| {
            let present = available.contains(name);
            if !present {
                warn!(source = %kind, entity = %name, "Configured entity not found in source");
            }
            present
        })
        .cloned()
        .collect()
}
