//! Generic-by-codegen template plugin (genny-shaped): requires an explicit
//! `-in`/`-out` pair since stdin/stdout modes leave nothing to cache.

use regex::Regex;

use crate::options::GenerateOptions;
use crate::plugin::{InputOutputFiles, Plugin};

use super::parse_args;

pub struct TemplateGenPlugin;

impl Plugin for TemplateGenPlugin {
    fn name(&self) -> &'static str {
        "template_gen"
    }

    fn matches(&self, opts: &GenerateOptions) -> bool {
        opts.executable_name == "genny" || opts.go_package.as_deref() == Some("github.com/cheekybits/genny")
    }

    fn infer(&self, opts: &GenerateOptions) -> Option<InputOutputFiles> {
        let parsed = parse_args(&opts.sanitized_args, &["in", "out", "pkg", "tag"]);

        if parsed.positionals.len() < 2 {
            tracing::debug!("genny invocation missing command or type set");
            return None;
        }

        let command = parsed.positionals[0].to_lowercase();
        if command != "gen" {
            tracing::debug!(command, "genny get/unknown command not supported");
            return None;
        }

        let type_set = &parsed.positionals[1];
        if !is_valid_type_set(type_set) {
            tracing::debug!(type_set, "invalid genny type set");
            return None;
        }

        let out = parsed.get("out").filter(|s| !s.is_empty())?;
        let input = parsed.get("in").filter(|s| !s.is_empty())?;

        Some(InputOutputFiles {
            input_files: vec![input.to_string()],
            output_files: vec![out.to_string()],
            ..Default::default()
        })
    }
}

/// A type set is a comma-separated list of `KeyType=ValueType` pairs, e.g.
/// `KeyType=string,ValueType=int`.
fn is_valid_type_set(set: &str) -> bool {
    let pair = Regex::new(r"^[A-Za-z_][A-Za-z0-9_]*=[A-Za-z_][A-Za-z0-9_.*\[\]]*$").unwrap();
    !set.is_empty() && set.split(',').all(|pair_str| pair.is_match(pair_str))
}

#[cfg(test)]
mod tests {
    use std::path::PathBuf;

    use super::*;

    fn opts(args: &[&str]) -> GenerateOptions {
        GenerateOptions {
            path: PathBuf::from("/pkg/doc.go"),
            words: vec!["genny".to_string()],
            executable_name: "genny".to_string(),
            executable_path: None,
            go_package: None,
            go_package_version: None,
            sanitized_args: args.iter().map(|s| s.to_string()).collect(),
            extra_input_patterns: vec![],
            extra_output_patterns: vec![],
        }
    }

    #[test]
    fn requires_in_and_out() {
        assert!(TemplateGenPlugin.infer(&opts(&["gen", "KeyType=string,ValueType=int"])).is_none());
    }

    #[test]
    fn resolves_input_and_output_from_flags() {
        let io = TemplateGenPlugin
            .infer(&opts(&[
                "-in=list.gotmpl",
                "-out=stringlist.go",
                "gen",
                "KeyType=string,ValueType=int",
            ]))
            .unwrap();
        assert_eq!(io.input_files, vec!["list.gotmpl"]);
        assert_eq!(io.output_files, vec!["stringlist.go"]);
    }

    #[test]
    fn rejects_get_command() {
        assert!(TemplateGenPlugin
            .infer(&opts(&["-in=a", "-out=b", "get", "KeyType=string"]))
            .is_none());
    }

    #[test]
    fn validates_type_set_shape() {
        assert!(is_valid_type_set("KeyType=string,ValueType=int"));
        assert!(!is_valid_type_set("not a typeset"));
    }
}
