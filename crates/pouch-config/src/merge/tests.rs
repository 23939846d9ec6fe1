//! Unit tests for configuration layering

use super::*;
use pouch_cache::{FsStorage, MemoryStorage};
use tempfile::TempDir;

fn vars(pairs: &[(&str, &str)]) -> Vec<(String, String)> {
    pairs
        .iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect()
}

#[test]
fn test_defaults() {
    let config = ConfigLayering::new().resolve().unwrap();

    assert_eq!(config.registry.as_str(), "https://registry.npmjs.org/");
    assert_eq!(config.max_workers, None);
    assert!(config.worker_count() >= 1);
    assert!(config.continue_on_error);
    assert_eq!(config.skip_packages, vec!["fsevents"]);
    assert_eq!(config.skip_packages, DEFAULT_SKIP_PACKAGES);
    assert_eq!(config.membership_capacity, DEFAULT_MEMBERSHIP_CAPACITY);
    assert_eq!(config.request_timeout(), Duration::from_secs(30));
    assert_eq!(config.max_retries, 3);
    assert_eq!(config.auth_token, None);
}

#[test]
fn test_precedence_file_env_cli() {
    let file = InstallSection {
        max_workers: Some(8),
        max_retries: Some(5),
        request_timeout_secs: Some(60),
        ..Default::default()
    };
    let env = ConfigLayering::env_overrides(vars(&[
        ("POUCH_MAX_WORKERS", "6"),
        ("POUCH_MAX_RETRIES", "1"),
    ]))
    .unwrap();
    let cli = InstallSection {
        max_workers: Some(2),
        ..Default::default()
    };

    let config = ConfigLayering::new()
        .with_file(file)
        .with_env(env)
        .with_cli(cli)
        .resolve()
        .unwrap();

    assert_eq!(config.max_workers, Some(2));
    assert_eq!(config.worker_count(), 2);
    assert_eq!(config.max_retries, 1);
    assert_eq!(config.request_timeout_secs, 60);
}

#[test]
fn test_env_overrides_parse_every_key() {
    let layer = ConfigLayering::env_overrides(vars(&[
        ("POUCH_REGISTRY", "http://localhost:4873"),
        ("POUCH_CONTINUE_ON_ERROR", "No"),
        ("POUCH_SKIP_PACKAGES", "fsevents, -win32-, ,"),
        ("POUCH_MEMBERSHIP_CAPACITY", "64"),
        ("POUCH_REQUEST_TIMEOUT_SECS", "5"),
        ("POUCH_AUTH_TOKEN", "npm_secret"),
        ("POUCH_UNKNOWN", "whatever"),
        ("POUCH_MAX_WORKERS", ""),
        ("PATH", "/usr/bin"),
    ]))
    .unwrap();

    assert_eq!(layer.registry.unwrap().as_str(), "http://localhost:4873/");
    assert_eq!(layer.continue_on_error, Some(false));
    assert_eq!(
        layer.skip_packages,
        Some(vec!["fsevents".to_string(), "-win32-".to_string()])
    );
    assert_eq!(layer.membership_capacity, Some(64));
    assert_eq!(layer.request_timeout_secs, Some(5));
    assert_eq!(layer.auth_token.as_deref(), Some("npm_secret"));
    assert_eq!(layer.max_workers, None);
}

#[test]
fn test_invalid_env_values() {
    let err = ConfigLayering::env_overrides(vars(&[("POUCH_MAX_WORKERS", "many")])).unwrap_err();
    match err {
        PouchError::ConfigValidation { field, .. } => assert_eq!(field, "POUCH_MAX_WORKERS"),
        other => panic!("expected ConfigValidation, got {:?}", other),
    }
    assert!(ConfigLayering::env_overrides(vars(&[("POUCH_CONTINUE_ON_ERROR", "maybe")])).is_err());
    assert!(ConfigLayering::env_overrides(vars(&[("POUCH_REGISTRY", "::")])).is_err());
}

#[test]
fn test_validation() {
    let zero_workers = InstallSection {
        max_workers: Some(0),
        ..Default::default()
    };
    assert!(InstallConfig::from_layer(zero_workers).is_err());

    let tiny_set = InstallSection {
        membership_capacity: Some(1),
        ..Default::default()
    };
    assert!(InstallConfig::from_layer(tiny_set).is_err());

    let ftp = InstallSection {
        registry: Some(Url::parse("ftp://mirror.example.com").unwrap()),
        ..Default::default()
    };
    match InstallConfig::from_layer(ftp).unwrap_err() {
        PouchError::ConfigValidation { field, .. } => assert_eq!(field, "registry"),
        other => panic!("expected ConfigValidation, got {:?}", other),
    }
}

#[test]
fn test_empty_auth_token_is_unset() {
    let layer = InstallSection {
        auth_token: Some(String::new()),
        ..Default::default()
    };
    assert_eq!(InstallConfig::from_layer(layer).unwrap().auth_token, None);
}

mod property_tests {
    use super::*;
    use proptest::prelude::*;

    proptest! {
        #[test]
        fn env_numbers_round_trip(workers in 1usize..4096, retries in 0u32..100) {
            let layer = ConfigLayering::env_overrides(vars(&[
                ("POUCH_MAX_WORKERS", workers.to_string().as_str()),
                ("POUCH_MAX_RETRIES", retries.to_string().as_str()),
            ]))
            .unwrap();
            prop_assert_eq!(layer.max_workers, Some(workers));
            prop_assert_eq!(layer.max_retries, Some(retries));
        }

        #[test]
        fn merging_an_empty_layer_changes_nothing(
            workers in proptest::option::of(1usize..64),
            token in proptest::option::of("[a-z]{1,12}"),
        ) {
            let layer = InstallSection {
                max_workers: workers,
                auth_token: token,
                ..Default::default()
            };
            prop_assert_eq!(layer.clone().merge(InstallSection::default()), layer.clone());
            prop_assert_eq!(InstallSection::default().merge(layer.clone()), layer);
        }
    }
}

#[tokio::test]
async fn test_loader_reads_manifest_and_file_layer() {
    let storage = Arc::new(MemoryStorage::new());
    storage.mkdir("/app", true).await.unwrap();
    storage
        .write_file(
            "/app/package.json",
            br#"{"name":"app","dependencies":{"react":"^18.2.0"}}"#,
        )
        .await
        .unwrap();
    storage
        .write_file(
            "/app/pouch.toml",
            b"[install]\nmax_workers = 3\ncontinue_on_error = false\n",
        )
        .await
        .unwrap();

    let loader = ConfigLoader::new(storage, "/app");
    let manifest = loader.load_manifest().await.unwrap();
    assert_eq!(manifest.dependencies.len(), 1);

    let cli = InstallSection {
        continue_on_error: Some(true),
        ..Default::default()
    };
    let config = loader.load(InstallSection::default(), cli).await.unwrap();
    assert_eq!(config.max_workers, Some(3));
    assert!(config.continue_on_error);
}

#[tokio::test]
async fn test_loader_without_config_file_uses_defaults() {
    let temp_dir = TempDir::new().unwrap();
    let root = temp_dir.path().to_str().unwrap().to_string();
    let loader = ConfigLoader::new(Arc::new(FsStorage::new(root.as_str())), "");

    assert!(loader.load_file_layer().await.unwrap().is_empty());
    let config = loader
        .load(InstallSection::default(), InstallSection::default())
        .await
        .unwrap();
    assert_eq!(config.membership_capacity, DEFAULT_MEMBERSHIP_CAPACITY);
}

#[tokio::test]
async fn test_loader_surfaces_toml_errors() {
    let storage = Arc::new(MemoryStorage::new());
    storage.write_file("pouch.toml", b"[install\n").await.unwrap();

    let err = ConfigLoader::new(storage, "")
        .load(InstallSection::default(), InstallSection::default())
        .await
        .unwrap_err();
    assert!(matches!(err, PouchError::TomlParse { line: 1, .. }));
}
