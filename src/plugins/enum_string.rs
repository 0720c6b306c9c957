//! Enumeration-to-string generator plugin (stringer-shaped): resolves the
//! package backing the `-type` flag to its compiled source files.

use std::path::Path;

use crate::external;
use crate::options::GenerateOptions;
use crate::plugin::{InputOutputFiles, Plugin};

use super::parse_args;

pub struct EnumStringPlugin;

impl Plugin for EnumStringPlugin {
    fn name(&self) -> &'static str {
        "enum_string"
    }

    fn matches(&self, opts: &GenerateOptions) -> bool {
        opts.executable_name == "stringer"
    }

    fn infer(&self, opts: &GenerateOptions) -> Option<InputOutputFiles> {
        let parsed = parse_args(
            &opts.sanitized_args,
            &["type", "output", "trimprefix", "tags"],
        );

        let tags: Vec<String> = parsed
            .get("tags")
            .filter(|s| !s.is_empty())
            .map(|s| s.split(',').map(String::from).collect())
            .unwrap_or_default();

        let args = if parsed.positionals.is_empty() {
            vec![".".to_string()]
        } else {
            parsed.positionals.clone()
        };

        let dir = if args.len() == 1 && Path::new(&args[0]).is_dir() {
            Path::new(&args[0]).to_path_buf()
        } else {
            if !tags.is_empty() {
                tracing::error!("-tags option applies only to directories, not when files are specified");
                return None;
            }
            Path::new(&args[0]).parent().unwrap_or(opts.dir()).to_path_buf()
        };

        let pattern = if args.len() == 1 { args[0].clone() } else { ".".to_string() };
        let files = external::load_compiled_go_files(&dir, &pattern, &tags)?;

        let mut io = InputOutputFiles {
            input_files: files.into_iter().map(|p| p.display().to_string()).collect(),
            ..Default::default()
        };

        let types: Vec<&str> = parsed.get("type").unwrap_or("").split(',').collect();
        let output_name = parsed
            .get("output")
            .filter(|s| !s.is_empty())
            .map(String::from)
            .unwrap_or_else(|| format!("{}_string.go", types[0].to_lowercase()));
        io.output_files.push(output_name);

        Some(io)
    }
}
