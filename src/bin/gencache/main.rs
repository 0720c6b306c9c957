//! The binary entrypoint for `gencache`, a cache that skips re-running
//! `//go:generate` directives whose inputs haven't changed.

use clap::Parser;
use color_eyre::Result;
use color_eyre::eyre::Context as _;
use regex::Regex;
use tracing_subscriber::util::SubscriberInitExt;

use gencache::config::Config;
use gencache::driver::{self, RunOptions};
use gencache::plugin::Registry;

mod log;

#[derive(Debug, Parser)]
#[command(name = "gencache", about = "Content-addressed cache for go:generate")]
struct Args {
    /// Package patterns to scan, e.g. `./...` or `./internal/foo`.
    #[arg(default_values_t = vec!["./...".to_string()])]
    patterns: Vec<String>,

    /// Print commands but do not run them.
    #[arg(short = 'n')]
    dry_run: bool,

    /// Print commands as they are run.
    #[arg(short = 'v')]
    verbose: bool,

    /// Print commands as they are run (alias kept for parity with `go generate -x`).
    #[arg(short = 'x')]
    print_commands: bool,

    /// Only run directives whose line matches this regexp.
    #[arg(long = "run")]
    run: Option<String>,

    /// Skip directives whose line matches this regexp.
    #[arg(long = "skip")]
    skip: Option<String>,
}

/// clap's derive only recognizes `-run`/`-skip` as bundled short flags
/// (`-r -u -n`), but the documented invocation is Go `flag`-style, where a
/// single dash and a double dash are interchangeable for any flag name.
/// Rewrite the two long-named flags to their double-dash form before clap
/// ever sees them.
fn normalize_go_style_flags(args: impl Iterator<Item = String>) -> Vec<String> {
    args.map(|arg| {
        for name in ["run", "skip"] {
            if arg == format!("-{name}") {
                return format!("--{name}");
            }
            if let Some(value) = arg.strip_prefix(&format!("-{name}=")) {
                return format!("--{name}={value}");
            }
        }
        arg
    })
    .collect()
}

fn main() -> Result<()> {
    color_eyre::install()?;
    let args = Args::parse_from(normalize_go_style_flags(std::env::args()));

    let config = Config::load().context("load configuration")?;
    log::make_logger(config.debug || args.verbose).init();

    let run_regex = args.run.as_deref().map(Regex::new).transpose().context("parse -run regexp")?;
    let skip_regex = args.skip.as_deref().map(Regex::new).transpose().context("parse -skip regexp")?;

    let run_opts = RunOptions {
        patterns: args.patterns,
        run_filter: run_regex.as_ref(),
        skip_filter: skip_regex.as_ref(),
        dry_run: args.dry_run,
        print_commands: args.dry_run || args.print_commands,
    };

    let registry = Registry::with_builtins();
    let ok = driver::run(&run_opts, &config, &registry)?;

    if !ok {
        std::process::exit(1);
    }
    Ok(())
}
