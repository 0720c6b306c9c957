//! Source-mode mockgen: a cache save followed by a restore should hand back
//! the exact bytes that were saved, and the cache directory should be keyed
//! off the fingerprint produced by [`gencache::fingerprint::compute`].

use gencache::cache;
use gencache::options::GenerateOptions;
use gencache::plugin::{InputOutputFiles, Registry};
use gencache::plugins::mockgen::MockgenPlugin;

use crate::with_cwd;

fn directive_opts(dir: &std::path::Path) -> GenerateOptions {
    GenerateOptions {
        path: dir.join("doc.go"),
        words: vec![
            "mockgen".to_string(),
            "-source=iface.go".to_string(),
            "-destination=iface_mock.go".to_string(),
        ],
        executable_name: "mockgen".to_string(),
        executable_path: Some(dir.join("mockgen")),
        go_package: None,
        go_package_version: None,
        sanitized_args: vec!["-source=iface.go".to_string(), "-destination=iface_mock.go".to_string()],
        extra_input_patterns: vec![],
        extra_output_patterns: vec![],
    }
}

#[test]
fn round_trips_generated_mock_through_cache() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(dir.path().join("mockgen"), b"fake mockgen binary").unwrap();
    std::fs::write(dir.path().join("iface.go"), "package demo\n\ntype Iface interface{ Do() }\n").unwrap();

    let opts = directive_opts(dir.path());
    let mut registry = Registry::new();
    registry.register(Box::new(MockgenPlugin));
    let cache_dir = dir.path().join("cache");

    with_cwd(dir.path(), || {
        let first = cache::verify(&opts, &registry, &cache_dir).unwrap();
        assert!(!first.cache_hit, "nothing saved yet");
        assert_eq!(first.plugin_name, Some("mockgen"));

        // Pretend the generator ran and wrote its destination file.
        std::fs::write(dir.path().join("iface_mock.go"), "package demo\n\n// generated mock\n").unwrap();
        cache::save(&first).unwrap();

        // A second verify against the same source sees the saved entry.
        let second = cache::verify(&opts, &registry, &cache_dir).unwrap();
        assert!(second.cache_hit);
        assert_eq!(second.cache_hit_dir, first.cache_hit_dir);

        // Corrupt the destination, then restore to prove the cache wins
        // back the original bytes.
        std::fs::write(dir.path().join("iface_mock.go"), "clobbered").unwrap();
        cache::restore(&second).unwrap();
        let restored = std::fs::read_to_string(dir.path().join("iface_mock.go")).unwrap();
        assert_eq!(restored, "package demo\n\n// generated mock\n");
    });
}

#[test]
fn changing_source_invalidates_the_cache_entry() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(dir.path().join("mockgen"), b"fake mockgen binary").unwrap();
    std::fs::write(dir.path().join("iface.go"), "package demo\n\ntype Iface interface{ Do() }\n").unwrap();

    let opts = directive_opts(dir.path());
    let mut registry = Registry::new();
    registry.register(Box::new(MockgenPlugin));
    let cache_dir = dir.path().join("cache");

    with_cwd(dir.path(), || {
        let before = cache::verify(&opts, &registry, &cache_dir).unwrap();
        std::fs::write(dir.path().join("iface_mock.go"), "package demo\n").unwrap();
        cache::save(&before).unwrap();

        std::fs::write(dir.path().join("iface.go"), "package demo\n\ntype Iface interface{ Do(); Other() }\n").unwrap();
        let after = cache::verify(&opts, &registry, &cache_dir).unwrap();

        assert_ne!(before.cache_hit_dir, after.cache_hit_dir);
        assert!(!after.cache_hit);
    });
}

/// A directive with no matching plugin and no `//go:generate_input`/
/// `//go:generate_output` annotations has nothing to cache.
#[test]
fn unmatched_plugin_without_annotations_cannot_save() {
    let dir = tempfile::tempdir().unwrap();
    let mut opts = directive_opts(dir.path());
    opts.executable_name = "some-unregistered-tool".to_string();
    let registry = Registry::new();
    let cache_dir = dir.path().join("cache");

    with_cwd(dir.path(), || {
        let result = cache::verify(&opts, &registry, &cache_dir).unwrap();
        assert!(!result.can_save);
        assert_eq!(result.io_files, InputOutputFiles::default());
    });
}
