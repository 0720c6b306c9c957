//! CRD/deepcopy/RBAC generator plugin (controller-gen-shaped): resolves a
//! handful of `+marker=value` expressions against a static marker table
//! instead of the full upstream markers framework.

use crate::external::{self, PackageFile};
use crate::options::GenerateOptions;
use crate::plugin::{InputOutputFiles, Plugin};

const HEADER_FILE_GENERATORS: &[&str] = &["crd", "rbac", "object", "webhook"];

pub struct CrdGenPlugin;

impl Plugin for CrdGenPlugin {
    fn name(&self) -> &'static str {
        "crd_gen"
    }

    fn matches(&self, opts: &GenerateOptions) -> bool {
        opts.executable_name == "controller-gen"
    }

    fn infer(&self, opts: &GenerateOptions) -> Option<InputOutputFiles> {
        let mut io = InputOutputFiles::default();
        let mut input_paths = vec!["./...".to_string()];

        for raw in &opts.sanitized_args {
            let marker = raw.strip_prefix('+').unwrap_or(raw);

            if let Some(rule) = marker.strip_prefix("output:") {
                apply_output_rule(rule, &mut io);
                continue;
            }

            if let Some(value) = marker.strip_prefix("paths=") {
                input_paths = value.split(',').map(String::from).collect();
                continue;
            }

            let Some((generator, rest)) = marker.split_once(':') else {
                tracing::error!(marker, "unknown controller-gen marker");
                return None;
            };
            if !HEADER_FILE_GENERATORS.contains(&generator) && generator != "schemapatch" {
                tracing::error!(marker, "unknown controller-gen generator");
                return None;
            }

            if let Some(header) = rest.strip_prefix("headerFile=") {
                io.input_files.push(header.to_string());
            } else if generator == "schemapatch" {
                if let Some(manifests) = rest.strip_prefix("manifests=") {
                    let Ok(entries) = std::fs::read_dir(manifests) else {
                        return None;
                    };
                    for entry in entries.flatten() {
                        let path = entry.path();
                        if path.extension().is_some_and(|e| e == "yaml") {
                            io.input_files.push(path.display().to_string());
                        }
                    }
                }
            }
        }

        for file in external::list_modules_and_errors(&input_paths).ok()? {
            match file {
                PackageFile::File(path) => io.input_files.push(path.display().to_string()),
                PackageFile::Error(err) => tracing::error!(err, "cannot get input path"),
            }
        }

        Some(io)
    }
}

fn apply_output_rule(rule: &str, io: &mut InputOutputFiles) {
    let parts: Vec<&str> = rule.split(':').collect();
    let Some(last) = parts.last() else { return };

    if let Some(dir) = last.strip_prefix("dir=") {
        io.output_patterns.push(format!("{dir}/**"));
    } else if let Some(config) = last.strip_prefix("config=") {
        io.output_patterns.push(format!("{config}/**"));
    }
    // `none` and `stdout` output rules produce nothing to cache.
}
