//! Common utilities for benchmarks

use criterion::Criterion;
use pouch_core::types::Version;

/// Criterion settings shared by every bench target
pub fn criterion_config() -> Criterion {
    Criterion::default()
        .warm_up_time(std::time::Duration::from_secs(3))
        .measurement_time(std::time::Duration::from_secs(10))
        .sample_size(100)
}

/// `count` distinct package-like names
pub fn package_names(count: usize) -> Vec<String> {
    (0..count)
        .map(|i| match i % 3 {
            0 => format!("package-{}", i),
            1 => format!("@scope-{}/lib-{}", i % 17, i),
            _ => format!("util.{}-js", i),
        })
        .collect()
}

/// A release history of `count` versions, with a prerelease every tenth entry
pub fn version_history(count: usize) -> Vec<Version> {
    (0..count)
        .map(|i| {
            let major = (i / 100) as u64;
            let minor = ((i / 10) % 10) as u64;
            let patch = (i % 10) as u64;
            if i % 10 == 9 {
                format!("{}.{}.{}-beta.{}", major, minor, patch, i)
            } else {
                format!("{}.{}.{}", major, minor, patch)
            }
        })
        .filter_map(|raw| raw.parse().ok())
        .collect()
}

/// package.json content with `count` dependencies
pub fn package_json_content(count: usize) -> String {
    let dependencies: serde_json::Map<String, serde_json::Value> = package_names(count)
        .into_iter()
        .enumerate()
        .map(|(i, name)| (name, serde_json::Value::String(format!("^{}.{}.0", i % 5, i % 7))))
        .collect();

    serde_json::json!({
        "name": "bench-app",
        "version": "1.0.0",
        "dependencies": dependencies,
    })
    .to_string()
}
