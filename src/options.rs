//! The data a directive hands to plugin matching and inference.

use std::path::{Path, PathBuf};

/// Everything a plugin needs to know about one `//go:generate` directive.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct GenerateOptions {
    /// Full path of the file the directive was found in.
    pub path: PathBuf,
    /// Words of the directive line, after quote/env expansion and shorthand
    /// substitution. The first word is the command.
    pub words: Vec<String>,
    /// Name of the executable being run (the base name, or the tool name
    /// when the directive is a `go run <pkg>` invocation).
    pub executable_name: String,
    /// Resolved absolute path of the executable, when it could be found.
    pub executable_path: Option<PathBuf>,
    /// Set when `words` is a `go run <pkg>[@version]` invocation.
    pub go_package: Option<String>,
    /// The `@version` suffix of a `go run` invocation, if any.
    pub go_package_version: Option<String>,
    /// Arguments passed to the target executable, with the command name and
    /// (for `go run`) the package argument stripped off.
    pub sanitized_args: Vec<String>,
    /// Glob patterns from preceding `//go:generate_input` annotations.
    pub extra_input_patterns: Vec<String>,
    /// Glob patterns from preceding `//go:generate_output` annotations.
    pub extra_output_patterns: Vec<String>,
}

impl GenerateOptions {
    /// Base name of the file containing the directive.
    pub fn file(&self) -> &str {
        self.path
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or_default()
    }

    /// Directory the directive runs in: the directory of [`Self::path`].
    /// This is the current directory while the directive executes, so
    /// plugins may assume relative paths are relative to it.
    pub fn dir(&self) -> &Path {
        self.path.parent().unwrap_or_else(|| Path::new("."))
    }

    /// The directive's words joined with spaces, for display and hashing.
    pub fn command(&self) -> String {
        self.words.join(" ")
    }
}
