//! Splits one directive line into words, honoring quoted strings, and
//! performs `-command` shorthand substitution and environment expansion.

use std::collections::HashMap;

use color_eyre::Result;
use color_eyre::eyre::bail;

use super::env::DirectiveEnv;

/// Split `line` (with the marker prefix of length `strip_prefix_len` and
/// its trailing newline already accounted for by the caller) into words.
///
/// Ported from the reference toolchain's directive splitter: double-quoted
/// words may contain backslash escapes, unquoted words break on
/// space/tab, and a trailing carriage return is trimmed.
pub fn split_words(line: &str) -> Result<Vec<String>> {
    let line = line.strip_suffix('\r').unwrap_or(line);
    let mut words = Vec::new();
    let mut rest = line;

    loop {
        rest = rest.trim_start_matches([' ', '\t']);
        if rest.is_empty() {
            break;
        }

        if rest.starts_with('"') {
            let (word, remainder) = split_quoted(rest)?;
            words.push(word);
            rest = remainder;
            if !rest.is_empty() && !rest.starts_with([' ', '\t']) {
                bail!("expect space after quoted argument");
            }
            continue;
        }

        let end = rest.find([' ', '\t']).unwrap_or(rest.len());
        words.push(rest[..end].to_string());
        rest = &rest[end..];
    }

    Ok(words)
}

/// Parse one double-quoted Go string literal at the start of `input`,
/// returning the unescaped word and the remainder of the input after the
/// closing quote.
fn split_quoted(input: &str) -> Result<(String, &str)> {
    let bytes = input.as_bytes();
    let mut i = 1;
    let mut word = String::new();
    while i < bytes.len() {
        match bytes[i] {
            b'\\' => {
                if i + 1 == bytes.len() {
                    bail!("bad backslash");
                }
                word.push(unescape(bytes[i + 1])?);
                i += 2;
            }
            b'"' => {
                return Ok((word, &input[i + 1..]));
            }
            c => {
                word.push(c as char);
                i += 1;
            }
        }
    }
    bail!("mismatched quoted string")
}

fn unescape(c: u8) -> Result<char> {
    Ok(match c {
        b'n' => '\n',
        b't' => '\t',
        b'r' => '\r',
        b'\\' => '\\',
        b'"' => '"',
        other => other as char,
    })
}

/// `-command` shorthand definitions accumulated while scanning one file.
#[derive(Debug, Default)]
pub struct Shorthands {
    commands: HashMap<String, Vec<String>>,
}

impl Shorthands {
    pub fn new() -> Self {
        Self::default()
    }

    /// Install a new shorthand from a `-command name expansion...` directive.
    pub fn define(&mut self, words: &[String]) -> Result<()> {
        if words.len() < 2 {
            bail!("no command specified for -command");
        }
        let name = words[1].clone();
        if self.commands.contains_key(&name) {
            bail!("command {name:?} multiply defined");
        }
        self.commands.insert(name, words[2..].to_vec());
        Ok(())
    }

    /// Substitute the leading word if it names a shorthand, and then expand
    /// `$NAME` references against `env` in every resulting word.
    pub fn expand(&self, words: Vec<String>, env: &DirectiveEnv) -> Vec<String> {
        let substituted = match words.first().and_then(|w| self.commands.get(w)) {
            Some(expansion) => {
                let mut out = expansion.clone();
                out.extend(words.into_iter().skip(1));
                out
            }
            None => words,
        };
        substituted.into_iter().map(|w| env.expand(&w)).collect()
    }
}

/// Parse a `go run <pkg>[@version] [args...]` directive, splitting out the
/// package and optional version so the fingerprint can key off the package
/// identity instead of a resolved executable path.
pub fn parse_go_run(words: &[String]) -> Option<(String, Option<String>, Vec<String>)> {
    if words.len() < 3 || words[0] != "go" || words[1] != "run" {
        return None;
    }
    let mut flag_end = 2;
    while flag_end < words.len() && words[flag_end].starts_with('-') {
        flag_end += 1;
    }
    let target = words.get(flag_end)?;
    let (pkg, version) = match target.split_once('@') {
        Some((pkg, version)) => (pkg.to_string(), Some(version.to_string())),
        None => (target.clone(), None),
    };
    let args = words.get(flag_end + 1..).unwrap_or_default().to_vec();
    Some((pkg, version, args))
}

/// Strip a leading `env VAR=val...` prefix and return the words of the
/// command that follows it. Returns `None` when the directive doesn't begin
/// with `env`, and an empty slice when the directive is `env` followed only
/// by assignments (no command).
pub fn strip_env_prefix(words: &[String]) -> Option<&[String]> {
    if words.first().map(String::as_str) != Some("env") {
        return None;
    }
    let mut idx = 1;
    while idx < words.len() && is_env_assignment(&words[idx]) {
        idx += 1;
    }
    Some(&words[idx..])
}

fn is_env_assignment(word: &str) -> bool {
    match word.split_once('=') {
        Some((name, _)) => {
            !name.is_empty()
                && name
                    .chars()
                    .next()
                    .is_some_and(|c| c.is_ascii_alphabetic() || c == '_')
                && name.chars().all(|c| c.is_ascii_alphanumeric() || c == '_')
        }
        None => false,
    }
}

/// Parse a `<tool> tool <name> [args...]` directive, such as `go tool yacc`,
/// returning the tool's own name so it (not `go`) is used for plugin lookup.
pub fn parse_tool_name(words: &[String]) -> Option<&str> {
    if words.len() >= 3 && words[1] == "tool" {
        Some(&words[2])
    } else {
        None
    }
}
