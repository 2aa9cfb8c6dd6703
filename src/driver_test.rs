use std::path::{Path, PathBuf};

use featurecollection::{EncodeMode, EncoderOptions, FeatureCollectionEncoder, WofFeature};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use super::{IndexStats, index_paths, is_principal};

fn write_feature(dir: &Path, name: &str, id: i64) {
    let body = format!(
        r#"{{"type":"Feature","properties":{{"wof:id":{id},"wof:name":"n{id}","wof:placetype":"locality"}},"geometry":{{"type":"Point","coordinates":[1.0,2.0]}}}}"#
    );
    std::fs::write(dir.join(name), body).unwrap();
}

/// 1.geojson, 1-alt-quattroshapes.geojson, notes.txt, broken/3.geojson (invalid),
/// sub/2.geojson
fn fixture() -> tempfile::TempDir {
    let dir = tempfile::TempDir::new().unwrap();
    write_feature(dir.path(), "1.geojson", 1);
    write_feature(dir.path(), "1-alt-quattroshapes.geojson", 1);
    std::fs::write(dir.path().join("notes.txt"), "hello").unwrap();

    std::fs::create_dir(dir.path().join("broken")).unwrap();
    std::fs::write(dir.path().join("broken").join("3.geojson"), "{oops").unwrap();

    std::fs::create_dir(dir.path().join("sub")).unwrap();
    write_feature(&dir.path().join("sub"), "2.geojson", 2);
    dir
}

async fn collect(paths: &[PathBuf]) -> anyhow::Result<(IndexStats, Vec<i64>)> {
    let (tx, mut rx) = mpsc::channel::<WofFeature>(64);
    let stats = index_paths(paths, &tx, &CancellationToken::new()).await?;
    drop(tx);

    let mut ids = Vec::new();
    while let Some(f) = rx.recv().await {
        ids.push(f.id().unwrap());
    }
    Ok((stats, ids))
}

#[test]
fn test_is_principal() {
    assert!(is_principal(Path::new("data/101/736/545/101736545.geojson")));
    assert!(!is_principal(Path::new("101736545-alt-quattroshapes.geojson")));
    assert!(!is_principal(Path::new("101736545.json")));
    assert!(!is_principal(Path::new("README.md")));
    assert!(!is_principal(Path::new(".geojson")));
}

#[tokio::test]
async fn test_index_directory() -> anyhow::Result<()> {
    let dir = fixture();

    let (stats, ids) = collect(&[dir.path().to_path_buf()]).await?;

    assert_eq!(ids, vec![1, 2]);
    assert_eq!(
        stats,
        IndexStats {
            sent: 2,
            skipped: 2,
            failed: 1,
        }
    );
    Ok(())
}

#[tokio::test]
async fn test_index_single_file() -> anyhow::Result<()> {
    let dir = fixture();

    let (stats, ids) = collect(&[dir.path().join("sub").join("2.geojson")]).await?;

    assert_eq!(ids, vec![2]);
    assert_eq!(stats.sent, 1);
    Ok(())
}

#[tokio::test]
async fn test_index_missing_path() {
    let dir = fixture();
    let result = collect(&[dir.path().join("nope")]).await;
    assert!(result.is_err());
}

#[tokio::test]
async fn test_index_cancelled() -> anyhow::Result<()> {
    let dir = fixture();
    let (tx, _rx) = mpsc::channel::<WofFeature>(64);
    let cancel = CancellationToken::new();
    cancel.cancel();

    let stats = index_paths(&[dir.path().to_path_buf()], &tx, &cancel).await?;

    assert_eq!(stats, IndexStats::default());
    Ok(())
}

#[tokio::test]
async fn test_index_into_file() -> anyhow::Result<()> {
    let dir = fixture();
    let out = dir.path().join("collection.geojson");

    let file = tokio::fs::File::create(&out).await?;
    let encoder =
        FeatureCollectionEncoder::new(EncoderOptions::new(EncodeMode::Summary, file)).await?;
    let channels = encoder.listen();

    let stats = index_paths(
        &[dir.path().to_path_buf()],
        &channels.features,
        &CancellationToken::new(),
    )
    .await?;
    let errors = channels.finish().await;

    assert!(errors.is_empty());
    assert_eq!(stats.sent, 2);

    let doc: serde_json::Value = serde_json::from_slice(&std::fs::read(&out)?)?;
    assert_eq!(doc["type"], "FeatureCollection");
    let features = doc["features"].as_array().unwrap();
    assert_eq!(features.len(), 2);
    assert_eq!(features[0]["wof:id"], 1);
    assert_eq!(features[1]["wof:name"], "n2");
    assert_eq!(features[1]["wof:path"], "2/2.geojson");
    Ok(())
}

#[cfg(unix)]
#[tokio::test]
async fn test_index_symlink_loop() -> anyhow::Result<()> {
    let dir = fixture();
    std::os::unix::fs::symlink(dir.path(), dir.path().join("sub").join("loop"))?;

    let (stats, ids) = collect(&[dir.path().to_path_buf()]).await?;

    assert_eq!(ids, vec![1, 2]);
    assert_eq!(stats.sent, 2);
    Ok(())
}

#[cfg(unix)]
#[tokio::test]
async fn test_index_same_directory_twice() -> anyhow::Result<()> {
    let dir = fixture();
    let alias = dir.path().join("alias");
    std::os::unix::fs::symlink(dir.path().join("sub"), &alias)?;

    let (_, ids) = collect(&[dir.path().join("sub"), alias]).await?;

    assert_eq!(ids, vec![2]);
    Ok(())
}
