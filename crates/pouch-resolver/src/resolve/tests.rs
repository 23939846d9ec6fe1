//! Unit tests for version resolution

use super::*;

use pouch_registry::{ClientOptions, RetryConfig};
use std::time::Duration;
use url::Url;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn resolver_for(server: &MockServer) -> VersionResolver {
    let mut options = ClientOptions::new(Url::parse(&server.uri()).unwrap());
    options.retry = RetryConfig {
        max_retries: 0,
        initial_delay: Duration::from_millis(1),
        max_delay: Duration::from_millis(1),
        multiplier: 1.0,
    };
    let client = Arc::new(RegistryClient::with_options(options).unwrap());
    VersionResolver::new(client, Arc::new(MetadataCache::new()))
}

fn version_doc(name: &str, version: &str) -> serde_json::Value {
    serde_json::json!({
        "name": name,
        "version": version,
        "dependencies": {},
        "dist": { "tarball": format!("https://r/{name}/-/{name}-{version}.tgz") }
    })
}

async fn mount_lodash(server: &MockServer, expected_calls: u64) {
    Mock::given(method("GET"))
        .and(path("/lodash"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "name": "lodash",
            "dist-tags": { "latest": "4.17.21" },
            "versions": {
                "4.16.0": version_doc("lodash", "4.16.0"),
                "4.17.20": version_doc("lodash", "4.17.20"),
                "4.17.21": version_doc("lodash", "4.17.21")
            }
        })))
        .expect(expected_calls)
        .mount(server)
        .await;
}

#[test]
fn test_range_spec_classification() {
    assert_eq!(RangeSpec::parse("latest").unwrap(), RangeSpec::Tag("latest".into()));
    assert_eq!(RangeSpec::parse("next").unwrap(), RangeSpec::Tag("next".into()));
    assert_eq!(RangeSpec::parse("1.2.3").unwrap(), RangeSpec::Exact("1.2.3".into()));
    assert_eq!(RangeSpec::parse("=1.2.3").unwrap(), RangeSpec::Exact("1.2.3".into()));
    assert!(matches!(RangeSpec::parse("^1.2.3").unwrap(), RangeSpec::Range(_)));
    assert!(matches!(RangeSpec::parse("").unwrap(), RangeSpec::Range(_)));
    assert!(matches!(RangeSpec::parse("1.x || >=2.5.0").unwrap(), RangeSpec::Range(_)));

    assert!(RangeSpec::parse("file:../local").is_err());
    assert!(RangeSpec::parse("git+https://github.com/a/b.git").is_err());
}

#[tokio::test]
async fn test_caret_range_resolves_to_highest_match() {
    let mock_server = MockServer::start().await;
    mount_lodash(&mock_server, 1).await;

    let resolver = resolver_for(&mock_server);
    let resolved = resolver.resolve("lodash", "^4.17.0").await.unwrap();
    assert_eq!(resolved.name, "lodash");
    assert_eq!(resolved.version, "4.17.21");
    assert_eq!(resolved.tarball_url, "https://r/lodash/-/lodash-4.17.21.tgz");
}

#[tokio::test]
async fn test_package_document_is_cached_between_ranges() {
    let mock_server = MockServer::start().await;
    mount_lodash(&mock_server, 1).await;

    let resolver = resolver_for(&mock_server);
    assert_eq!(resolver.resolve("lodash", "~4.16.0").await.unwrap().version, "4.16.0");
    assert_eq!(
        resolver.resolve("lodash", ">=4.17.0 <4.17.21").await.unwrap().version,
        "4.17.20"
    );
}

#[tokio::test]
async fn test_unsatisfiable_range() {
    let mock_server = MockServer::start().await;
    mount_lodash(&mock_server, 1).await;

    let resolver = resolver_for(&mock_server);
    match resolver.resolve("lodash", "^5.0.0").await.unwrap_err() {
        PouchError::UnsatisfiableRange { package, range } => {
            assert_eq!(package, "lodash");
            assert_eq!(range, "^5.0.0");
        },
        other => panic!("expected UnsatisfiableRange, got {:?}", other),
    }
}

#[tokio::test]
async fn test_latest_uses_per_version_endpoint() {
    let mock_server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/react/latest"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "name": "react",
            "version": "18.2.0",
            "dependencies": { "loose-envify": "^1.1.0" },
            "dist": { "tarball": "https://r/react/-/react-18.2.0.tgz" }
        })))
        .expect(1)
        .mount(&mock_server)
        .await;

    let resolver = resolver_for(&mock_server);
    let resolved = resolver.resolve("react", "latest").await.unwrap();
    assert_eq!(resolved.version, "18.2.0");
    assert_eq!(
        resolved.dependencies,
        vec![("loose-envify".to_string(), "^1.1.0".to_string())]
    );
}

#[tokio::test]
async fn test_exact_version_uses_per_version_endpoint() {
    let mock_server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/left-pad/1.3.0"))
        .respond_with(ResponseTemplate::new(200).set_body_json(version_doc("left-pad", "1.3.0")))
        .expect(1)
        .mount(&mock_server)
        .await;

    let resolver = resolver_for(&mock_server);
    assert_eq!(resolver.resolve("left-pad", "1.3.0").await.unwrap().version, "1.3.0");
}

#[tokio::test]
async fn test_registry_failure_is_registry_unavailable() {
    let mock_server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&mock_server)
        .await;

    let resolver = resolver_for(&mock_server);
    for range in ["^1.0.0", "latest"] {
        let err = resolver.resolve("missing", range).await.unwrap_err();
        assert!(
            matches!(err, PouchError::RegistryUnavailable { status: Some(404), .. }),
            "{}: {:?}",
            range,
            err
        );
    }
}
