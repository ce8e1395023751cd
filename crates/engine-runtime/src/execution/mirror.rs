use crate::error::MirrorError;
use connectors::storage::bucket::AssetBucket;
use engine_core::observer::Observer;
use model::{
    events::{Phase, ProgressEvent},
    summary::MirrorReport,
};
use std::{sync::Arc, time::Instant};
use tracing::{debug, info};

/// Copies objects missing from the destination bucket. Never overwrites or deletes,
/// so a re-run after a failure only copies what is still missing.
pub struct AssetMirror {
    source: Arc<dyn AssetBucket>,
    destination: Arc<dyn AssetBucket>,
    page_size: usize,
    observer: Arc<dyn Observer>,
}

impl AssetMirror {
    pub fn new(
        source: Arc<dyn AssetBucket>,
        destination: Arc<dyn AssetBucket>,
        page_size: usize,
        observer: Arc<dyn Observer>,
    ) -> Self {
        Self {
            source,
            destination,
            page_size: page_size.max(1),
            observer,
        }
    }

    pub async fn migrate_assets(&self) -> Result<MirrorReport, MirrorError> {
        let started = Instant::now();
        self.observer.on_event(&ProgressEvent::PhaseStarted {
            phase: Phase::Assets,
        });
        info!(
            source = self.source.name(),
            destination = self.destination.name(),
            "Mirroring assets"
        );

        let mut report = MirrorReport::default();
        let mut token: Option<String> = None;
        loop {
            let page = self
                .source
                .list_page(token.as_deref(), self.page_size)
                .await?;
            debug!(keys = page.keys.len(), "Listed page");

            for key in page.keys {
                report.listed += 1;

                if self.destination.exists(&key).await? {
                    report.skipped += 1;
                    self.observer.on_event(&ProgressEvent::AssetSkipped { key });
                    continue;
                }

                let body = self.source.open(&key).await?;
                let bytes = self.destination.upload(&key, body).await?;
                report.copied += 1;
                debug!(key = %key, bytes, "Copied object");
                self.observer.on_event(&ProgressEvent::AssetCopied { key });
            }

            match page.next_token {
                Some(next) => token = Some(next),
                None => break,
            }
        }

        let duration_ms = started.elapsed().as_millis() as u64;
        info!(
            listed = report.listed,
            copied = report.copied,
            skipped = report.skipped,
            duration_ms,
            "Asset mirroring finished"
        );
        self.observer.on_event(&ProgressEvent::PhaseFinished {
            phase: Phase::Assets,
            records: report.copied,
            duration_ms,
        });

        Ok(report)
    }
}
