//! Builds live components from [`Settings`].

use crate::{
    error::PipelineError,
    execution::{extract::ExtractionCoordinator, mirror::AssetMirror, orchestrator::Orchestrator},
};
use connectors::{
    document::source::MongoSource,
    file::layout::IntermediateLayout,
    sql::postgres::source::PgSource,
    storage::bucket::{AssetBucket, ObjectStoreBucket},
};
use engine_config::settings::{AssetSettings, BucketSettings, Settings};
use engine_core::{
    observer::Observer,
    retry::RetryPolicy,
    watermark::{WatermarkStore, file_store::FileWatermarkStore},
};
use engine_processing::{
    anonymize::FieldClassifier,
    load::{LoadEngine, document::DocumentLoader, relational::RelationalLoader},
    transform::TransformEngine,
};
use std::sync::Arc;

pub fn layout(settings: &Settings) -> IntermediateLayout {
    IntermediateLayout::new(&settings.pipeline.output_dir)
}

pub fn watermark_store(settings: &Settings) -> Arc<dyn WatermarkStore> {
    Arc::new(FileWatermarkStore::new(&settings.pipeline.watermark_file))
}

pub fn retry_policy(settings: &Settings) -> RetryPolicy {
    RetryPolicy::for_connections(settings.pipeline.connect_max_attempts)
}

pub fn extraction_coordinator(settings: &Settings, observer: Arc<dyn Observer>) -> ExtractionCoordinator {
    ExtractionCoordinator::new(
        layout(settings),
        Arc::new(MongoSource::new(
            &settings.mongo.source_uri,
            settings.mongo.extract_batch_size,
        )),
        Arc::new(PgSource::new(
            &settings.pg.source_url,
            settings.pg.extract_batch_size,
        )),
        observer,
        retry_policy(settings),
    )
    .with_allow_lists(settings.mongo.collections.clone(), settings.pg.tables.clone())
}

pub fn transform_engine(settings: &Settings, observer: Arc<dyn Observer>) -> TransformEngine {
    TransformEngine::new(
        layout(settings),
        Arc::new(FieldClassifier::new(&settings.pipeline.preserve_fields)),
        settings.pipeline.transform_concurrency,
        observer,
    )
}

pub fn load_engine(settings: &Settings, observer: Arc<dyn Observer>) -> LoadEngine {
    LoadEngine::new(
        layout(settings),
        Arc::new(DocumentLoader::new(
            &settings.mongo.destination_uri,
            settings.mongo.load_batch_size,
        )),
        Arc::new(RelationalLoader::new(
            &settings.pg.destination_url,
            settings.pg.load_batch_size,
        )),
        observer,
        retry_policy(settings),
    )
}

fn bucket(settings: &BucketSettings) -> Result<Arc<dyn AssetBucket>, PipelineError> {
    Ok(Arc::new(ObjectStoreBucket::s3(
        &settings.endpoint,
        &settings.region,
        &settings.access_key_id,
        &settings.secret_access_key,
        &settings.bucket,
    )?))
}

pub fn asset_mirror(
    settings: &AssetSettings,
    observer: Arc<dyn Observer>,
) -> Result<AssetMirror, PipelineError> {
    Ok(AssetMirror::new(
        bucket(&settings.source)?,
        bucket(&settings.destination)?,
        settings.page_size,
        observer,
    ))
}

/// Wires every phase. The asset phase is only present when buckets are configured.
pub fn build_orchestrator(
    settings: &Settings,
    observer: Arc<dyn Observer>,
) -> Result<Orchestrator, PipelineError> {
    let mut orchestrator = Orchestrator::new(
        extraction_coordinator(settings, observer.clone()),
        transform_engine(settings, observer.clone()),
        load_engine(settings, observer.clone()),
        watermark_store(settings),
        layout(settings),
        observer.clone(),
    )
    .with_cleanup(settings.pipeline.cleanup_intermediate);

    if let Some(assets) = &settings.assets {
        orchestrator = orchestrator.with_mirror(asset_mirror(assets, observer)?);
    }

    Ok(orchestrator)
}
