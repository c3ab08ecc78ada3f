mod common;

use std::sync::Arc;

use provenance_core::fingerprint::Fingerprinter;
use provenance_core::index::{FingerprintIndex, PreloadOrigin, ReferenceSet, ReferenceSources};
use provenance_core::policy::VisualPolicy;
use provenance_core::visual::VisualSimilarityScorer;

fn sources(root: &std::path::Path) -> ReferenceSources {
    ReferenceSources {
        real_dir: root.join("hash-db/real"),
        ai_dir: root.join("hash-db/ai"),
        cache_path: root.join("hash_cache.json"),
    }
}

fn seed_reference_dirs(src: &ReferenceSources) {
    common::write(&src.real_dir.join("camera.png"), &common::left_right_png());
    common::write(&src.ai_dir.join("generated.png"), &common::top_bottom_png());
    // 扩展名是图片但内容损坏：跳过
    common::write(&src.ai_dir.join("broken.png"), b"not really a png");
    // 非图片扩展名：忽略
    common::write(&src.ai_dir.join("notes.txt"), b"readme");
}

#[test]
fn first_preload_scans_and_writes_cache() {
    let dir = tempfile::tempdir().unwrap();
    let src = sources(dir.path());
    seed_reference_dirs(&src);

    let (index, origin) = FingerprintIndex::preload(&Fingerprinter::default(), &src);

    assert_eq!(origin, PreloadOrigin::Scanned);
    assert_eq!(index.set(ReferenceSet::Real).len(), 1);
    assert_eq!(index.set(ReferenceSet::Ai).len(), 1);
    assert!(src.cache_path.exists());

    let cache: serde_json::Value =
        serde_json::from_slice(&std::fs::read(&src.cache_path).unwrap()).unwrap();
    assert_eq!(cache["real"].as_array().unwrap().len(), 1);
    assert_eq!(cache["ai"].as_array().unwrap().len(), 1);
    assert_eq!(cache["ai"][0].as_str().unwrap().len(), 64);
}

#[test]
fn second_preload_uses_cache_without_rescanning() {
    let dir = tempfile::tempdir().unwrap();
    let src = sources(dir.path());
    seed_reference_dirs(&src);
    let fingerprinter = Fingerprinter::default();

    let (first, _) = FingerprintIndex::preload(&fingerprinter, &src);

    // 目录删掉后仍能得到相同内容，说明没有重新扫描
    std::fs::remove_dir_all(dir.path().join("hash-db")).unwrap();
    let (second, origin) = FingerprintIndex::preload(&fingerprinter, &src);

    assert_eq!(origin, PreloadOrigin::Cache);
    assert_eq!(first, second);
}

#[test]
fn unreadable_cache_is_rebuilt() {
    let dir = tempfile::tempdir().unwrap();
    let src = sources(dir.path());
    seed_reference_dirs(&src);
    common::write(&src.cache_path, b"{ this is not json");

    let (index, origin) = FingerprintIndex::preload(&Fingerprinter::default(), &src);

    assert_eq!(origin, PreloadOrigin::Scanned);
    assert_eq!(index.len(), 2);
    let (_, again) = FingerprintIndex::preload(&Fingerprinter::default(), &src);
    assert_eq!(again, PreloadOrigin::Cache);
}

#[test]
fn missing_directories_yield_empty_index() {
    let dir = tempfile::tempdir().unwrap();
    let src = sources(dir.path());

    let (index, origin) = FingerprintIndex::preload(&Fingerprinter::default(), &src);

    assert_eq!(origin, PreloadOrigin::Scanned);
    assert!(index.is_empty());

    let scorer = VisualSimilarityScorer::new(
        Arc::new(index),
        Fingerprinter::default(),
        VisualPolicy::default(),
    );
    assert_eq!(scorer.score(&common::left_right_png()).unwrap(), 50.0);
}

#[test]
fn preloaded_index_drives_visual_scores() {
    let dir = tempfile::tempdir().unwrap();
    let src = sources(dir.path());
    seed_reference_dirs(&src);
    let fingerprinter = Fingerprinter::default();

    let (index, _) = FingerprintIndex::preload(&fingerprinter, &src);
    let scorer = VisualSimilarityScorer::new(Arc::new(index), fingerprinter, VisualPolicy::default());

    assert_eq!(scorer.score(&common::top_bottom_png()).unwrap(), 80.0);
    assert_eq!(scorer.score(&common::left_right_png()).unwrap(), 10.0);
    assert!(scorer.score(b"garbage").is_err());
}
