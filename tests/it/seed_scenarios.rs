//! Scenarios that exercise the scanner and cache store together, without a
//! plugin in the loop: annotation-driven caching (`//go:generate_input`/
//! `//go:generate_output`) is the one path available to directives whose
//! generator shape none of the built-in plugins recognize.

use std::path::Path;

use gencache::cache;
use gencache::options::GenerateOptions;
use gencache::plugin::Registry;
use gencache::scanner::{self, ScanFilter};

use crate::with_cwd;

fn scan_one(path: &std::path::Path, runtime_root: &std::path::Path) -> scanner::Directive {
    let directives = scanner::scan_file(path, "demo", runtime_root, &ScanFilter::default()).unwrap();
    assert_eq!(directives.len(), 1);
    directives.into_iter().next().unwrap()
}

fn opts_from(directive: &scanner::Directive) -> GenerateOptions {
    GenerateOptions {
        path: directive.path.clone(),
        words: directive.words.clone(),
        executable_name: std::path::Path::new(&directive.words[0])
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or(&directive.words[0])
            .to_string(),
        executable_path: Some(directive.path.parent().unwrap().join(&directive.words[0])),
        go_package: None,
        go_package_version: None,
        sanitized_args: directive.words[1..].to_vec(),
        extra_input_patterns: directive.extra_input_patterns.clone(),
        extra_output_patterns: directive.extra_output_patterns.clone(),
    }
}

/// Re-scanning and re-fingerprinting an unchanged directive must always land
/// on the same cache shard, regardless of how many times it's done.
#[test]
fn fingerprint_is_stable_across_repeated_scans() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(dir.path().join("custom-gen"), b"binary").unwrap();
    std::fs::write(dir.path().join("schema.txt"), b"field: value\n").unwrap();
    std::fs::write(
        dir.path().join("gen.go"),
        "package demo\n\n//go:generate_input schema.txt\n//go:generate_output out.go\n//go:generate ./custom-gen\n",
    )
    .unwrap();

    let path = dir.path().join("gen.go");
    let registry = Registry::new();
    let cache_dir = dir.path().join("cache");

    with_cwd(dir.path(), || {
        let mut shards = Vec::new();
        for _ in 0..3 {
            let directive = scan_one(&path, Path::new("/goroot"));
            let opts = opts_from(&directive);
            let result = cache::verify(&opts, &registry, &cache_dir).unwrap();
            shards.push(result.cache_hit_dir);
        }

        assert_eq!(shards[0], shards[1]);
        assert_eq!(shards[1], shards[2]);
    });
}

/// An extra-input annotation with no matching extra-output annotation
/// leaves a no-plugin directive uncacheable, same as having neither.
#[test]
fn extra_input_without_extra_output_is_not_cacheable() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(dir.path().join("schema.txt"), b"field: value\n").unwrap();
    std::fs::write(
        dir.path().join("gen.go"),
        "package demo\n\n//go:generate_input schema.txt\n//go:generate ./custom-gen\n",
    )
    .unwrap();
    std::fs::write(dir.path().join("custom-gen"), b"binary").unwrap();

    let path = dir.path().join("gen.go");
    let registry = Registry::new();
    let cache_dir = dir.path().join("cache");

    with_cwd(dir.path(), || {
        let directive = scan_one(&path, Path::new("/goroot"));
        let opts = opts_from(&directive);
        let result = cache::verify(&opts, &registry, &cache_dir).unwrap();
        assert!(!result.can_save);
    });
}

/// An output glob pattern (from `//go:generate_output`) should be expanded
/// at save time to whatever files the generator actually produced, then
/// restored as a full set on the next hit — even files the directive never
/// named individually.
#[test]
fn glob_output_pattern_captures_every_generated_file() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(dir.path().join("custom-gen"), b"binary").unwrap();
    std::fs::write(
        dir.path().join("gen.go"),
        "package demo\n\n//go:generate_input custom-gen\n//go:generate_output gen/*.go\n//go:generate ./custom-gen\n",
    )
    .unwrap();

    let path = dir.path().join("gen.go");
    let registry = Registry::new();
    let cache_dir = dir.path().join("cache");

    with_cwd(dir.path(), || {
        let directive = scan_one(&path, Path::new("/goroot"));
        let opts = opts_from(&directive);
        let result = cache::verify(&opts, &registry, &cache_dir).unwrap();
        assert_eq!(result.io_files.output_patterns, vec!["gen/*.go"]);

        std::fs::create_dir(dir.path().join("gen")).unwrap();
        std::fs::write(dir.path().join("gen/a.go"), "package gen\n// a\n").unwrap();
        std::fs::write(dir.path().join("gen/b.go"), "package gen\n// b\n").unwrap();
        cache::save(&result).unwrap();

        std::fs::write(dir.path().join("gen/a.go"), "clobbered").unwrap();
        std::fs::remove_file(dir.path().join("gen/b.go")).unwrap();

        // A glob-backed result can't validate the expected output set up
        // front (new files may not exist yet locally), so restoring it just
        // replays every file the manifest recorded.
        let second = cache::verify(&opts, &registry, &cache_dir).unwrap();
        cache::restore(&second).unwrap();

        assert_eq!(std::fs::read_to_string(dir.path().join("gen/a.go")).unwrap(), "package gen\n// a\n");
        assert_eq!(std::fs::read_to_string(dir.path().join("gen/b.go")).unwrap(), "package gen\n// b\n");
    });
}
