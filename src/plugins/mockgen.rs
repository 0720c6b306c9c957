//! Mock generator plugin (source and reflect modes in one plugin, matching
//! the reference toolchain's single `mockgen` handler).

use crate::external;
use crate::options::GenerateOptions;
use crate::plugin::{InputOutputFiles, Plugin};

use super::parse_args;

pub struct MockgenPlugin;

impl Plugin for MockgenPlugin {
    fn name(&self) -> &'static str {
        "mockgen"
    }

    fn matches(&self, opts: &GenerateOptions) -> bool {
        opts.executable_name == "mockgen"
            || matches!(
                opts.go_package.as_deref(),
                Some("go.uber.org/mock/mockgen") | Some("github.com/golang/mock/mockgen")
            )
    }

    fn infer(&self, opts: &GenerateOptions) -> Option<InputOutputFiles> {
        let parsed = parse_args(
            &opts.sanitized_args,
            &[
                "source",
                "destination",
                "mock_names",
                "package",
                "self_package",
                "copyright_file",
                "imports",
                "aux_files",
                "exclude_interfaces",
            ],
        );

        let mut io = InputOutputFiles::default();

        for aux in parsed.get("aux_files").unwrap_or_default().split(',') {
            if let Some((_, path)) = aux.split_once('=') {
                io.input_files.push(path.to_string());
            }
        }

        if let Some(copyright) = parsed.get("copyright_file").filter(|s| !s.is_empty()) {
            io.input_files.push(copyright.to_string());
        }

        if let Some(dest) = parsed.get("destination").filter(|s| !s.is_empty()) {
            io.output_files.push(dest.to_string());
        }

        for imp in parsed.get("imports").unwrap_or_default().split(',') {
            if let Some((_, path)) = imp.split_once('=') {
                io.input_files.push(path.to_string());
            }
        }

        if let Some(source) = parsed.get("source").filter(|s| !s.is_empty()) {
            io.input_files.push(source.to_string());
        } else if parsed.positionals.len() == 2 {
            // Reflect mode: <package> <comma-separated interfaces>.
            let files =
                external::load_compiled_go_files(opts.dir(), &parsed.positionals[0], &[])?;
            io.input_files
                .extend(files.into_iter().map(|p| p.display().to_string()));
        }

        Some(io)
    }
}
