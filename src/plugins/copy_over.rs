//! Copy/mock-over-interface generator plugin (moq-shaped): resolves the
//! target package's compiled sources as input, refusing stdout mode since
//! there would be no output file to cache.

use crate::external;
use crate::options::GenerateOptions;
use crate::plugin::{InputOutputFiles, Plugin};

use super::parse_args;

pub struct CopyOverPlugin;

impl Plugin for CopyOverPlugin {
    fn name(&self) -> &'static str {
        "copy_over"
    }

    fn matches(&self, opts: &GenerateOptions) -> bool {
        opts.executable_name == "moq"
    }

    fn infer(&self, opts: &GenerateOptions) -> Option<InputOutputFiles> {
        let parsed = parse_args(
            &opts.sanitized_args,
            &["out", "pkg", "fmt"],
        );

        if parsed.has_bool("version") {
            return None;
        }

        let out_file = parsed.get("out").filter(|s| !s.is_empty())?;

        let target = parsed.positionals.first()?;
        let files = external::load_compiled_go_files(opts.dir(), target, &[])?;

        Some(InputOutputFiles {
            input_files: files.into_iter().map(|p| p.display().to_string()).collect(),
            output_files: vec![out_file.to_string()],
            ..Default::default()
        })
    }
}

#[cfg(test)]
mod tests {
    use std::path::PathBuf;

    use super::*;

    fn opts(args: &[&str]) -> GenerateOptions {
        GenerateOptions {
            path: PathBuf::from("/pkg/doc.go"),
            words: vec!["moq".to_string()],
            executable_name: "moq".to_string(),
            executable_path: None,
            go_package: None,
            go_package_version: None,
            sanitized_args: args.iter().map(|s| s.to_string()).collect(),
            extra_input_patterns: vec![],
            extra_output_patterns: vec![],
        }
    }

    #[test]
    fn refuses_version_flag() {
        assert!(CopyOverPlugin.infer(&opts(&["-version"])).is_none());
    }

    #[test]
    fn refuses_stdout_mode() {
        assert!(CopyOverPlugin.infer(&opts(&[".", "Fooer"])).is_none());
    }
}
