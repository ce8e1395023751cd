//! Transform phase: anonymizes every extracted file into its transformed counterpart.

pub mod file;

use crate::{
    anonymize::{Anonymizer, FieldClassifier},
    error::TransformError,
};
use chrono::Utc;
use connectors::file::layout::{IntermediateLayout, entity_name};
use engine_core::observer::Observer;
use futures::{StreamExt, stream};
use model::{
    events::{Phase, ProgressEvent},
    records::{kind::SourceKind, results::TransformResult},
    summary::TransformSummary,
};
use rand::{SeedableRng, rngs::StdRng};
use std::{path::PathBuf, sync::Arc, time::Instant};
use tracing::{info, warn};

pub struct TransformEngine {
    layout: IntermediateLayout,
    classifier: Arc<FieldClassifier>,
    concurrency: usize,
    observer: Arc<dyn Observer>,
}

impl TransformEngine {
    pub fn new(
        layout: IntermediateLayout,
        classifier: Arc<FieldClassifier>,
        concurrency: usize,
        observer: Arc<dyn Observer>,
    ) -> Self {
        Self {
            layout,
            classifier,
            concurrency: concurrency.max(1),
            observer,
        }
    }

    /// Anonymizes all extracted files of both kinds, at most `concurrency` at a time.
    ///
    /// A file that fails is reported and skipped; only directory-level failures
    /// fail the phase. Results are ordered by source file.
    pub async fn run(&self) -> Result<TransformSummary, TransformError> {
        let started = Instant::now();
        self.observer.on_event(&ProgressEvent::PhaseStarted {
            phase: Phase::Transform,
        });

        self.layout.ensure_dirs().await?;

        let mut jobs = Vec::new();
        for kind in SourceKind::ALL {
            for input in self.layout.list_extracted(kind).await? {
                let output = self.layout.transformed_path(kind, &input)?;
                jobs.push((kind, input, output));
            }
        }

        info!(files = jobs.len(), concurrency = self.concurrency, "Transforming extracted files");

        let mut results: Vec<TransformResult> = stream::iter(jobs)
            .map(|(kind, input, output)| self.transform_file(kind, input, output))
            .buffer_unordered(self.concurrency)
            .filter_map(|result| async move { result })
            .collect()
            .await;
        results.sort_by(|a, b| a.original_file.cmp(&b.original_file));

        let total_records = results.iter().map(|r| r.record_count).sum();
        let duration_ms = started.elapsed().as_millis() as u64;
        self.observer.on_event(&ProgressEvent::PhaseFinished {
            phase: Phase::Transform,
            records: total_records,
            duration_ms,
        });

        Ok(TransformSummary::new(results, total_records, duration_ms))
    }

    async fn transform_file(
        &self,
        kind: SourceKind,
        input: PathBuf,
        output: PathBuf,
    ) -> Option<TransformResult> {
        let entity = entity_name(&input).unwrap_or_else(|| input.display().to_string());
        self.observer.on_event(&ProgressEvent::EntityStarted {
            phase: Phase::Transform,
            entity: entity.clone(),
        });

        let classifier = self.classifier.clone();
        let observer = self.observer.clone();
        let (task_entity, task_input, task_output) = (entity.clone(), input.clone(), output.clone());

        let outcome = tokio::task::spawn_blocking(move || {
            let mut anonymizer = Anonymizer::new(classifier, StdRng::from_entropy());
            let progress = |processed| {
                observer.on_event(&ProgressEvent::EntityProgress {
                    phase: Phase::Transform,
                    entity: task_entity.clone(),
                    processed,
                })
            };
            match kind {
                SourceKind::Document => {
                    file::anonymize_json_file(&mut anonymizer, &task_input, &task_output, progress)
                }
                SourceKind::Relational => {
                    file::anonymize_csv_file(&mut anonymizer, &task_input, &task_output, progress)
                }
            }
        })
        .await
        .map_err(|err| TransformError::Task(err.to_string()))
        .and_then(|result| result);

        match outcome {
            Ok(record_count) => {
                self.observer.on_event(&ProgressEvent::FileWritten {
                    phase: Phase::Transform,
                    path: output.clone(),
                });
                self.observer.on_event(&ProgressEvent::EntityFinished {
                    phase: Phase::Transform,
                    entity,
                    records: record_count,
                });
                Some(TransformResult {
                    source: kind,
                    original_file: input,
                    transformed_file: output,
                    record_count,
                    transformed_at: Utc::now(),
                })
            }
            Err(err) => {
                warn!(file = %input.display(), error = %err, "Skipping file that failed to transform");
                self.observer.on_event(&ProgressEvent::EntitySkipped {
                    phase: Phase::Transform,
                    entity,
                    reason: err.to_string(),
                });
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use engine_core::observer::NoopObserver;
    use serde_json::{Value, json};

    fn engine(root: &std::path::Path) -> TransformEngine {
        TransformEngine::new(
            IntermediateLayout::new(root),
            Arc::new(FieldClassifier::default()),
            2,
            Arc::new(NoopObserver),
        )
    }

    #[tokio::test]
    async fn transforms_both_kinds_and_skips_broken_files() {
        let dir = tempfile::tempdir().unwrap();
        let layout = IntermediateLayout::new(dir.path());
        layout.ensure_dirs().await.unwrap();
        let at = Utc::now();

        let users = layout.extracted_path(SourceKind::Document, "users", at);
        std::fs::write(
            &users,
            json!([{"_id": "1", "name": "Jane"}, {"_id": "2", "name": "John"}]).to_string(),
        )
        .unwrap();
        let broken = layout.extracted_path(SourceKind::Document, "broken", at);
        std::fs::write(&broken, "[{").unwrap();
        let orders = layout.extracted_path(SourceKind::Relational, "orders", at);
        std::fs::write(&orders, "id,email\n7,a@corp.io\n").unwrap();

        let summary = engine(dir.path()).run().await.unwrap();

        assert_eq!(summary.results.len(), 2);
        assert_eq!(summary.total_records, 3);
        let originals: Vec<&PathBuf> = summary.results.iter().map(|r| &r.original_file).collect();
        assert!(originals.contains(&&users));
        assert!(originals.contains(&&orders));

        for result in &summary.results {
            assert!(result.transformed_file.exists());
        }
        let transformed = layout.transformed_path(SourceKind::Document, &users).unwrap();
        let written: Value = serde_json::from_slice(&std::fs::read(transformed).unwrap()).unwrap();
        assert_eq!(written[0]["_id"], json!("1"));
        assert_ne!(written[0]["name"], json!("Jane"));
    }

    #[tokio::test]
    async fn empty_workspace_yields_empty_summary() {
        let dir = tempfile::tempdir().unwrap();
        let summary = engine(dir.path()).run().await.unwrap();
        assert!(summary.results.is_empty());
        assert_eq!(summary.total_records, 0);
    }
}
