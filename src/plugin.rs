//! The plugin contract and the global registry dispatched against it.

use std::collections::HashMap;

use crate::options::GenerateOptions;

/// The input/output file set a plugin infers for one directive, without
/// ever running the underlying generator.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct InputOutputFiles {
    pub input_files: Vec<String>,
    pub output_files: Vec<String>,
    /// Output glob patterns, resolved to concrete files only after the
    /// generator actually runs (so cache save can pick up files the
    /// generator created that weren't named explicitly).
    pub output_patterns: Vec<String>,
    /// Extra data folded into the fingerprint but not itself a file (e.g.
    /// directory names an asset packager walked).
    pub extra: Vec<String>,
}

/// A per-generator plugin: recognizes directives that invoke its generator
/// and infers the files such a directive reads and writes.
pub trait Plugin: Send + Sync {
    /// Stable identifier, used only for logging and registry bookkeeping.
    fn name(&self) -> &'static str;

    /// Report whether this plugin handles the directive described by `opts`.
    fn matches(&self, opts: &GenerateOptions) -> bool;

    /// Infer the input/output file set for a directive this plugin matched.
    /// Returns `None` when the directive's arguments can't be parsed or
    /// resolved, in which case the driver falls back to no-plugin mode.
    fn infer(&self, opts: &GenerateOptions) -> Option<InputOutputFiles>;
}

/// The set of registered plugins, matched in registration order.
#[derive(Default)]
pub struct Registry {
    plugins: Vec<Box<dyn Plugin>>,
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a plugin. Panics if a plugin with the same name is already
    /// registered, matching the reference toolchain's "already registered"
    /// guard.
    pub fn register(&mut self, plugin: Box<dyn Plugin>) {
        let name = plugin.name();
        if self.plugins.iter().any(|p| p.name() == name) {
            panic!("plugin already registered: {name}");
        }
        self.plugins.push(plugin);
    }

    /// Find the first registered plugin that matches `opts`.
    pub fn matching(&self, opts: &GenerateOptions) -> Option<&dyn Plugin> {
        self.plugins
            .iter()
            .find(|p| p.matches(opts))
            .map(|p| p.as_ref())
    }

    /// The default registry: every built-in plugin, registered once.
    pub fn with_builtins() -> Self {
        let mut registry = Self::new();
        crate::plugins::register_all(&mut registry);
        registry
    }
}

/// A static table used by a couple of plugins (e.g. `crd_gen`) to look up
/// per-marker behavior without a generic markers framework.
pub type MarkerTable = HashMap<&'static str, &'static str>;
