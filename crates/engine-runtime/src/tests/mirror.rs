use crate::execution::mirror::AssetMirror;
use bytes::Bytes;
use connectors::storage::bucket::{AssetBucket, ObjectStoreBucket};
use engine_core::observer::NoopObserver;
use model::summary::MirrorReport;
use object_store::{ObjectStore, PutPayload, memory::InMemory, path::Path};
use std::sync::Arc;

async fn store_with(keys: &[&str]) -> Arc<InMemory> {
    let store = Arc::new(InMemory::new());
    for key in keys {
        store
            .put(&Path::from(*key), PutPayload::from(Bytes::from(format!("body of {key}"))))
            .await
            .unwrap();
    }
    store
}

fn mirror(source: Arc<InMemory>, destination: Arc<InMemory>) -> AssetMirror {
    let source: Arc<dyn AssetBucket> = Arc::new(ObjectStoreBucket::new("prod", source));
    let destination: Arc<dyn AssetBucket> = Arc::new(ObjectStoreBucket::new("qa", destination));
    AssetMirror::new(source, destination, 2, Arc::new(NoopObserver))
}

#[tokio::test]
async fn copies_only_missing_objects() {
    let source = store_with(&["img/a.png", "img/b.png", "img/c.png", "pdf/d.pdf"]).await;
    let destination = store_with(&["img/b.png"]).await;
    destination
        .put(&Path::from("img/b.png"), PutPayload::from(Bytes::from_static(b"qa copy")))
        .await
        .unwrap();

    let report = mirror(source, destination.clone()).migrate_assets().await.unwrap();
    assert_eq!(
        report,
        MirrorReport {
            listed: 4,
            copied: 3,
            skipped: 1
        }
    );

    let copied = destination.get(&Path::from("pdf/d.pdf")).await.unwrap().bytes().await.unwrap();
    assert_eq!(copied, Bytes::from("body of pdf/d.pdf"));
    // Existing objects are never overwritten.
    let kept = destination.get(&Path::from("img/b.png")).await.unwrap().bytes().await.unwrap();
    assert_eq!(kept, Bytes::from_static(b"qa copy"));
}

#[tokio::test]
async fn second_run_copies_nothing() {
    let source = store_with(&["a", "b", "c"]).await;
    let destination = store_with(&[]).await;
    let mirror = mirror(source, destination);

    let first = mirror.migrate_assets().await.unwrap();
    assert_eq!(first.copied, 3);

    let second = mirror.migrate_assets().await.unwrap();
    assert_eq!(second.copied, 0);
    assert_eq!(second.skipped, 3);
}

#[tokio::test]
async fn empty_source_is_a_no_op() {
    let report = mirror(store_with(&[]).await, store_with(&[]).await)
        .migrate_assets()
        .await
        .unwrap();
    assert_eq!(report, MirrorReport::default());
}
