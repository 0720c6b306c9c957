//! A `.proto` file importing another `.proto` should pull both into the
//! fingerprint, so editing either one invalidates the cache entry — even
//! though only the importing file is named on the directive line.

use gencache::cache;
use gencache::options::GenerateOptions;
use gencache::plugin::Registry;
use gencache::plugins::protoc::ProtocPlugin;

use crate::with_cwd;

fn write_protos(dir: &std::path::Path) {
    std::fs::write(
        dir.join("service.proto"),
        "syntax = \"proto3\";\noption go_package = \"example.com/svc;svcpb\";\nimport \"common.proto\";\n",
    )
    .unwrap();
    std::fs::write(dir.join("common.proto"), "syntax = \"proto3\";\nmessage Empty {}\n").unwrap();
}

fn directive_opts(dir: &std::path::Path) -> GenerateOptions {
    GenerateOptions {
        path: dir.join("doc.go"),
        words: vec!["protoc".to_string(), "service.proto".to_string()],
        executable_name: "protoc".to_string(),
        executable_path: Some(dir.join("protoc")),
        go_package: None,
        go_package_version: None,
        sanitized_args: vec!["service.proto".to_string()],
        extra_input_patterns: vec![],
        extra_output_patterns: vec![],
    }
}

#[test]
fn imported_proto_is_folded_into_the_fingerprint() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(dir.path().join("protoc"), b"fake protoc").unwrap();
    write_protos(dir.path());

    let opts = directive_opts(dir.path());
    let mut registry = Registry::new();
    registry.register(Box::new(ProtocPlugin));
    let cache_dir = dir.path().join("cache");

    with_cwd(dir.path(), || {
        let before = cache::verify(&opts, &registry, &cache_dir).unwrap();
        assert_eq!(before.io_files.input_files.len(), 2, "service.proto and its import");

        // Editing only the imported file (not the one named on the
        // directive) must still change the fingerprint.
        std::fs::write(dir.path().join("common.proto"), "syntax = \"proto3\";\nmessage Empty {}\nmessage Extra {}\n").unwrap();
        let after = cache::verify(&opts, &registry, &cache_dir).unwrap();

        assert_ne!(before.cache_hit_dir, after.cache_hit_dir);
    });
}

#[test]
fn output_path_follows_go_package_option() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(dir.path().join("protoc"), b"fake protoc").unwrap();
    write_protos(dir.path());

    let opts = directive_opts(dir.path());
    let mut registry = Registry::new();
    registry.register(Box::new(ProtocPlugin));
    let cache_dir = dir.path().join("cache");

    with_cwd(dir.path(), || {
        let result = cache::verify(&opts, &registry, &cache_dir).unwrap();
        assert_eq!(result.io_files.output_files.len(), 1);
        assert!(result.io_files.output_files[0].ends_with("service.pb.go"));
        assert!(result.io_files.output_files[0].contains("example.com/svc"));
    });
}
