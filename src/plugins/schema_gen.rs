//! Schema-driven resolver/model generator plugin (gqlgen-shaped): reads the
//! tool's own YAML config to discover schema files and the output files its
//! model/resolver/exec/federation layouts will produce.

use std::path::{Path, PathBuf};

use serde::Deserialize;

use crate::options::GenerateOptions;
use crate::plugin::{InputOutputFiles, Plugin};

use super::parse_args;

const CONFIG_NAMES: &[&str] = &[".gqlgen.yml", "gqlgen.yml", "gqlgen.yaml"];

pub struct SchemaGenPlugin;

impl Plugin for SchemaGenPlugin {
    fn name(&self) -> &'static str {
        "schema_gen"
    }

    fn matches(&self, opts: &GenerateOptions) -> bool {
        opts.executable_name == "gqlgen" || opts.go_package.as_deref() == Some("github.com/99designs/gqlgen")
    }

    fn infer(&self, opts: &GenerateOptions) -> Option<InputOutputFiles> {
        let parsed = parse_args(&opts.sanitized_args, &["config", "c"]);

        if let Some(cmd) = parsed.positionals.first() {
            if cmd != "generate" {
                tracing::info!("gqlgen only supports the generate command");
                return None;
            }
        }

        let explicit_config = parsed
            .get("config")
            .or_else(|| parsed.get("c"))
            .filter(|s| !s.is_empty());

        let (cfg_file, base_dir) = match explicit_config {
            Some(path) => (opts.dir().join(path), opts.dir().to_path_buf()),
            None => {
                let found = find_config(opts.dir())?;
                let dir = found.parent()?.to_path_buf();
                (found, dir)
            }
        };

        let text = std::fs::read_to_string(&cfg_file).ok()?;
        let cfg: GqlgenConfig = serde_yaml::from_str(&text).ok()?;

        let mut schema_files = Vec::new();
        for pattern in &cfg.schema {
            let full_pattern = base_dir.join(pattern);
            let Ok(matches) = glob::glob(&full_pattern.display().to_string()) else {
                continue;
            };
            schema_files.extend(matches.flatten());
        }

        let mut io = InputOutputFiles::default();
        io.input_files.push(cfg_file.display().to_string());
        io.input_files
            .extend(schema_files.iter().map(|p| p.display().to_string()));

        if let Some(filename) = cfg.model.filename.filter(|s| !s.is_empty()) {
            io.output_files.push(base_dir.join(filename).display().to_string());
        }

        // TODO: hand-written resolver bodies sitting under these paths get
        // clobbered by a cache restore the same as a fresh generation would.
        if let Some(filename) = cfg.resolver.filename.filter(|s| !s.is_empty()) {
            match cfg.resolver.layout.as_deref() {
                Some("follow-schema") => {
                    let dirname = cfg.resolver.dirname.unwrap_or_default();
                    for schema_file in &schema_files {
                        let name = filename_for(schema_file, cfg.resolver.filename_template.as_deref());
                        io.output_files.push(base_dir.join(&dirname).join(name).display().to_string());
                    }
                }
                Some("single-file") | None => {
                    io.output_files.push(base_dir.join(filename).display().to_string());
                }
                Some(other) => tracing::error!(layout = other, "unknown gqlgen resolver layout"),
            }
        }

        if let Some(filename) = cfg.exec.filename.filter(|s| !s.is_empty()) {
            match cfg.exec.layout.as_deref() {
                Some("follow-schema") => {
                    let dirname = cfg.exec.dirname.unwrap_or_default();
                    io.output_files
                        .push(base_dir.join(&dirname).join("root_.generated.go").display().to_string());
                    for schema_file in &schema_files {
                        let name = filename_for(schema_file, cfg.exec.filename_template.as_deref());
                        io.output_files.push(base_dir.join(&dirname).join(name).display().to_string());
                    }
                }
                Some("single-file") | None => {
                    io.output_files.push(base_dir.join(filename).display().to_string());
                }
                Some(other) => tracing::error!(layout = other, "unknown gqlgen exec layout"),
            }
        }

        if let Some(filename) = cfg.federation.filename.filter(|s| !s.is_empty()) {
            io.output_files.push(base_dir.join(filename).display().to_string());
        }

        Some(io)
    }
}

fn filename_for(schema_file: &Path, template: Option<&str>) -> String {
    let stem = schema_file.file_stem().and_then(|s| s.to_str()).unwrap_or("schema");
    let template = template.filter(|s| !s.is_empty()).unwrap_or("{name}.generated.go");
    template.replace("{name}", stem)
}

fn find_config(start: &Path) -> Option<PathBuf> {
    let mut dir = start.to_path_buf();
    loop {
        for name in CONFIG_NAMES {
            let candidate = dir.join(name);
            if candidate.is_file() {
                return Some(candidate);
            }
        }
        let Some(parent) = dir.parent() else { return None };
        if parent == dir {
            return None;
        }
        dir = parent.to_path_buf();
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct GqlgenConfig {
    schema: Vec<String>,
    model: ModelConfig,
    resolver: ResolverConfig,
    exec: ExecConfig,
    federation: FederationConfig,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct ModelConfig {
    filename: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct ResolverConfig {
    filename: Option<String>,
    layout: Option<String>,
    dirname: Option<String>,
    #[serde(rename = "filename_template")]
    filename_template: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct ExecConfig {
    filename: Option<String>,
    layout: Option<String>,
    dirname: Option<String>,
    #[serde(rename = "filename_template")]
    filename_template: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct FederationConfig {
    filename: Option<String>,
}
