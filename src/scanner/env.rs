//! Per-directive environment used for `$VAR` expansion inside directive
//! words, and exported to the generator subprocess when it runs.

use std::path::Path;

/// Environment variables bound while scanning and executing one directive.
///
/// Mirrors the reference toolchain's `setEnv`: a fixed handful of
/// `GO*`-prefixed variables plus `PATH`/`PWD`, all available for `$NAME`
/// expansion in directive words and for the subprocess environment.
#[derive(Clone, Debug)]
pub struct DirectiveEnv {
    pairs: Vec<(String, String)>,
}

impl DirectiveEnv {
    /// Build the environment for a directive at `line` within `file`,
    /// belonging to package `package`, with the executable search path
    /// rooted at `runtime_root`.
    pub fn new(file: &Path, line: usize, package: &str, runtime_root: &Path) -> Self {
        let mut pairs = vec![
            ("GOROOT".to_string(), runtime_root.display().to_string()),
            ("GOARCH".to_string(), std::env::consts::ARCH.to_string()),
            ("GOOS".to_string(), std::env::consts::OS.to_string()),
            (
                "GOFILE".to_string(),
                file.file_name()
                    .and_then(|n| n.to_str())
                    .unwrap_or_default()
                    .to_string(),
            ),
            ("GOLINE".to_string(), line.to_string()),
            ("GOPACKAGE".to_string(), package.to_string()),
            ("DOLLAR".to_string(), "$".to_string()),
        ];

        let bin = runtime_root.join("bin");
        let path_var = if cfg!(target_os = "plan9") { "path" } else { "PATH" };
        let existing = std::env::var(path_var).unwrap_or_default();
        let joined = if existing.is_empty() {
            bin.display().to_string()
        } else {
            format!(
                "{}{}{}",
                bin.display(),
                if cfg!(windows) { ';' } else { ':' },
                existing
            )
        };
        pairs.push((path_var.to_string(), joined));

        let dir = file.parent().unwrap_or_else(|| Path::new("."));
        pairs.push(("PWD".to_string(), dir.display().to_string()));

        Self { pairs }
    }

    /// Look up a variable by name, as bound in this directive's environment.
    pub fn get(&self, name: &str) -> Option<&str> {
        self.pairs
            .iter()
            .find(|(k, _)| k == name)
            .map(|(_, v)| v.as_str())
    }

    /// Iterate the bound pairs, for exporting into a subprocess environment.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.pairs.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    /// Expand `$NAME`/`${NAME}` references in `word`, falling back to the
    /// process environment when `name` isn't one of the bound variables.
    pub fn expand(&self, word: &str) -> String {
        shell_expand(word, |name| {
            self.get(name)
                .map(str::to_string)
                .or_else(|| std::env::var(name).ok())
                .unwrap_or_default()
        })
    }
}

/// A minimal `os.Expand`-style substitution: replaces `$name` and `${name}`
/// references using `lookup`, leaving anything else (including a bare `$`
/// at end of string) untouched.
fn shell_expand(input: &str, lookup: impl Fn(&str) -> String) -> String {
    let mut out = String::with_capacity(input.len());
    let bytes = input.as_bytes();
    let mut i = 0;
    while i < bytes.len() {
        if bytes[i] == b'$' && i + 1 < bytes.len() {
            if bytes[i + 1] == b'{' {
                if let Some(end) = input[i + 2..].find('}') {
                    let name = &input[i + 2..i + 2 + end];
                    out.push_str(&lookup(name));
                    i += 2 + end + 1;
                    continue;
                }
            } else if is_ident_start(bytes[i + 1]) {
                let start = i + 1;
                let mut end = start;
                while end < bytes.len() && is_ident_continue(bytes[end]) {
                    end += 1;
                }
                out.push_str(&lookup(&input[start..end]));
                i = end;
                continue;
            }
        }
        out.push(bytes[i] as char);
        i += 1;
    }
    out
}

fn is_ident_start(b: u8) -> bool {
    b.is_ascii_alphabetic() || b == b'_'
}

fn is_ident_continue(b: u8) -> bool {
    b.is_ascii_alphanumeric() || b == b'_'
}
