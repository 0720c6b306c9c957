//! Scans a Go source file for `//go:generate` directives and the two
//! auxiliary annotations that extend a directive's declared input/output
//! set.

mod env;
mod lexer;

use std::path::{Path, PathBuf};

use color_eyre::Result;
use color_eyre::eyre::{Context as _, bail};
use regex::Regex;

pub use env::DirectiveEnv;
pub use lexer::{parse_go_run, parse_tool_name, strip_env_prefix};

/// The literal marker the reference toolchain recognizes. Kept as a named
/// constant because the whole point of this module is bit-for-bit
/// compatibility with directives that marker already appears in.
pub const MARK: &str = "//go:generate";
const EXTRA_INPUT_PREFIX: &str = "//go:generate_input ";
const EXTRA_OUTPUT_PREFIX: &str = "//go:generate_output ";

/// Matches the reference toolchain's scanner buffer size. Ordinary lines
/// longer than this are tolerated and skipped; a directive line that
/// overruns it is a fatal error on that file.
const MAX_LINE_LEN: usize = 64 * 1024;

/// One directive, fully resolved: words after shorthand/env expansion, and
/// the extra input/output glob patterns contributed by annotations on the
/// lines immediately preceding it.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Directive {
    pub path: PathBuf,
    pub line: usize,
    pub words: Vec<String>,
    pub extra_input_patterns: Vec<String>,
    pub extra_output_patterns: Vec<String>,
}

/// Filters applied while scanning, mirroring the `-run`/`-skip` CLI flags.
#[derive(Default)]
pub struct ScanFilter<'a> {
    pub run: Option<&'a Regex>,
    pub skip: Option<&'a Regex>,
}

/// Scan `path` for directives belonging to package `package`, resolving
/// shorthand commands and environment expansion as they're encountered, and
/// applying `filter`.
///
/// `runtime_root` is the directory containing `bin/`, prepended to `PATH`
/// in each directive's environment (see [`DirectiveEnv`]).
pub fn scan_file(
    path: &Path,
    package: &str,
    runtime_root: &Path,
    filter: &ScanFilter,
) -> Result<Vec<Directive>> {
    let contents = std::fs::read_to_string(path).with_context(|| format!("read {path:?}"))?;
    let mut directives = Vec::new();
    let mut shorthands = lexer::Shorthands::new();
    let mut extra_inputs = Vec::new();
    let mut extra_outputs = Vec::new();

    let ends_with_newline = contents.ends_with('\n');
    let lines: Vec<&str> = contents.lines().collect();

    for (idx, raw_line) in lines.iter().enumerate() {
        let line_num = idx + 1;
        let is_last = idx + 1 == lines.len();

        if !raw_line.starts_with(MARK) {
            continue;
        }
        if raw_line.len() > MAX_LINE_LEN {
            bail!(
                "{}:{line_num}: directive line exceeds {MAX_LINE_LEN}-byte scanner buffer",
                path.display()
            );
        }
        if is_last && !ends_with_newline {
            bail!("{}:{line_num}: directive at EOF without trailing newline", path.display());
        }

        if let Some(rest) = raw_line.strip_prefix(EXTRA_INPUT_PREFIX) {
            extra_inputs.extend(lexer::split_words(rest)?);
            continue;
        }
        if let Some(rest) = raw_line.strip_prefix(EXTRA_OUTPUT_PREFIX) {
            extra_outputs.extend(lexer::split_words(rest)?);
            continue;
        }
        let Some(rest) = raw_line
            .strip_prefix("//go:generate ")
            .or_else(|| raw_line.strip_prefix("//go:generate\t"))
        else {
            continue;
        };

        if filter.run.is_some_and(|re| !re.is_match(raw_line)) {
            continue;
        }
        if filter.skip.is_some_and(|re| re.is_match(raw_line)) {
            continue;
        }

        let raw_words = lexer::split_words(rest)
            .with_context(|| format!("{}:{line_num}: parse directive", path.display()))?;
        if raw_words.is_empty() {
            bail!("{}:{line_num}: no arguments to directive", path.display());
        }

        if raw_words[0] == "-command" {
            shorthands
                .define(&raw_words)
                .with_context(|| format!("{}:{line_num}", path.display()))?;
            continue;
        }

        let env = DirectiveEnv::new(path, line_num, package, runtime_root);
        let words = shorthands.expand(raw_words, &env);

        directives.push(Directive {
            path: path.to_path_buf(),
            line: line_num,
            words,
            extra_input_patterns: std::mem::take(&mut extra_inputs),
            extra_output_patterns: std::mem::take(&mut extra_outputs),
        });
    }

    Ok(directives)
}
