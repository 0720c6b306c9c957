//! Proto compiler plugin: parses `.proto` files well enough to resolve
//! their own imports and `go_package` option, without invoking `protoc`.

use std::path::{Path, PathBuf};

use regex::Regex;

use crate::options::GenerateOptions;
use crate::plugin::{InputOutputFiles, Plugin};

use super::parse_args;

pub struct ProtocPlugin;

impl Plugin for ProtocPlugin {
    fn name(&self) -> &'static str {
        "protoc"
    }

    fn matches(&self, opts: &GenerateOptions) -> bool {
        opts.executable_name == "protoc"
    }

    fn infer(&self, opts: &GenerateOptions) -> Option<InputOutputFiles> {
        let parsed = parse_args(&opts.sanitized_args, &[]);

        let mut include_dirs: Vec<String> = parsed
            .flags
            .iter()
            .filter(|(k, _)| k == "I" || k == "proto_path")
            .map(|(_, v)| v.clone())
            .collect();
        if include_dirs.is_empty() {
            include_dirs.push(opts.dir().display().to_string());
        }

        let go_opts: Vec<&str> = parsed.get_all("go_opt");
        let paths_mode = go_opts
            .iter()
            .find_map(|opt| opt.strip_prefix("paths="))
            .unwrap_or("import");

        let mut io = InputOutputFiles::default();

        for input_file in &parsed.positionals {
            if !input_file.ends_with(".proto") {
                continue;
            }

            let input_path = if Path::new(input_file).is_absolute() {
                PathBuf::from(input_file)
            } else {
                match search_file(input_file, &include_dirs, opts.dir()) {
                    Some(path) => path,
                    None => continue,
                }
            };
            let input_dir = input_path.parent().unwrap_or_else(|| Path::new(".")).to_path_buf();
            let base_name = input_path.file_name()?.to_str()?.to_string();

            io.input_files.push(input_path.display().to_string());

            let Some(proto) = parse_proto_file(&input_path) else {
                continue;
            };

            let output_dir = match paths_mode {
                "import" => {
                    let mut go_package = proto.go_package.clone();
                    for opt in &go_opts {
                        if let Some(rest) = opt.strip_prefix('M') {
                            if let Some((file, pkg)) = rest.split_once('=') {
                                if file == input_file {
                                    go_package = Some(pkg.to_string());
                                }
                            }
                        }
                    }
                    let go_package = go_package.unwrap_or_default();
                    let go_package = go_package.split(';').next().unwrap_or("");
                    opts.dir().join(go_package)
                }
                "source_relative" => input_dir.clone(),
                other => {
                    tracing::error!(mode = other, "unknown protoc paths mode");
                    return None;
                }
            };

            let stem = base_name.trim_end_matches(".proto");
            io.output_files
                .push(output_dir.join(format!("{stem}.pb.go")).display().to_string());

            for import in &proto.imports {
                if let Some(path) = search_file(import, &include_dirs, &input_dir) {
                    io.input_files.push(path.display().to_string());
                }
            }
        }

        Some(io)
    }
}

/// Search for `file_path` within `include_dirs`, resolved relative to
/// `base_dir` when an include dir is itself relative.
fn search_file(file_path: &str, include_dirs: &[String], base_dir: &Path) -> Option<PathBuf> {
    for include_dir in include_dirs {
        let include_dir = Path::new(include_dir);
        let include_dir = if include_dir.is_absolute() {
            include_dir.to_path_buf()
        } else {
            base_dir.join(include_dir)
        };
        let candidate = include_dir.join(file_path);
        if candidate.exists() {
            return Some(candidate);
        }
    }
    None
}

struct ProtoFile {
    imports: Vec<String>,
    go_package: Option<String>,
}

fn parse_proto_file(path: &Path) -> Option<ProtoFile> {
    let content = std::fs::read_to_string(path).ok()?;
    let import_re = Regex::new(r#"^\s*import\s+"(.*)""#).unwrap();
    let go_package_re = Regex::new(r#"^\s*option\s+go_package\s*=\s*"(.*)""#).unwrap();

    let mut imports = Vec::new();
    let mut go_package = None;
    for line in content.lines() {
        if let Some(c) = import_re.captures(line) {
            imports.push(c[1].to_string());
        }
        if let Some(c) = go_package_re.captures(line) {
            go_package = Some(c[1].to_string());
        }
    }
    Some(ProtoFile { imports, go_package })
}
