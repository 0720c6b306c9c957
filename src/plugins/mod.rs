//! Built-in plugins, one per supported generator shape, plus the tolerant
//! flag parser they all share.

pub mod copy_over;
pub mod crd_gen;
pub mod enum_string;
pub mod mockgen;
pub mod protoc;
pub mod schema_gen;
pub mod static_assets;
pub mod template_gen;

use crate::plugin::Registry;

/// Register every built-in plugin. Order matches the reference toolchain's
/// registration order; since plugins are matched on disjoint executable
/// names this doesn't usually matter, but it's kept deterministic anyway.
pub fn register_all(registry: &mut Registry) {
    registry.register(Box::new(mockgen::MockgenPlugin));
    registry.register(Box::new(protoc::ProtocPlugin));
    registry.register(Box::new(static_assets::StaticAssetsPlugin));
    registry.register(Box::new(enum_string::EnumStringPlugin));
    registry.register(Box::new(copy_over::CopyOverPlugin));
    registry.register(Box::new(crd_gen::CrdGenPlugin));
    registry.register(Box::new(schema_gen::SchemaGenPlugin));
    registry.register(Box::new(template_gen::TemplateGenPlugin));
}

/// A `-flag=value`/`-flag value`/`--flag` argument parser that never
/// aborts on an argument it doesn't recognize: unrecognized flags and bare
/// positional arguments are simply collected into `positionals` so callers
/// can decide what to do with them. This matches generator CLIs (most of
/// which are built on Go's standard `flag` package) more closely than a
/// parser that errors out on the first unknown flag.
#[derive(Debug, Default)]
pub struct ParsedArgs {
    pub flags: Vec<(String, String)>,
    pub bool_flags: Vec<String>,
    pub positionals: Vec<String>,
}

impl ParsedArgs {
    /// Last value bound to `name`, if any occurrence was seen.
    pub fn get(&self, name: &str) -> Option<&str> {
        self.flags
            .iter()
            .rev()
            .find(|(k, _)| k == name)
            .map(|(_, v)| v.as_str())
    }

    /// All values bound to `name`, in first-seen order.
    pub fn get_all<'a>(&'a self, name: &str) -> Vec<&'a str> {
        self.flags
            .iter()
            .filter(|(k, _)| k == name)
            .map(|(_, v)| v.as_str())
            .collect()
    }

    pub fn has_bool(&self, name: &str) -> bool {
        self.bool_flags.iter().any(|f| f == name)
    }
}

/// Parse `args`, splitting `-name=value` and `--name=value` at the `=`, and
/// treating a bare `-name`/`--name` as a boolean flag unless `name` is
/// listed in `value_flags`, in which case the following argument (if any)
/// is consumed as its value.
pub fn parse_args(args: &[String], value_flags: &[&str]) -> ParsedArgs {
    let mut parsed = ParsedArgs::default();
    let mut iter = args.iter().peekable();

    while let Some(arg) = iter.next() {
        let Some(stripped) = arg.strip_prefix('-') else {
            parsed.positionals.push(arg.clone());
            continue;
        };
        let stripped = stripped.strip_prefix('-').unwrap_or(stripped);

        if let Some((name, value)) = stripped.split_once('=') {
            parsed.flags.push((name.to_string(), value.to_string()));
            continue;
        }

        if value_flags.contains(&stripped) {
            if let Some(next) = iter.peek() {
                if !next.starts_with('-') {
                    parsed.flags.push((stripped.to_string(), next.to_string()));
                    iter.next();
                    continue;
                }
            }
        }

        parsed.bool_flags.push(stripped.to_string());
    }

    parsed
}
