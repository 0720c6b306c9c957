//! Thin wrappers around the external collaborators this crate interfaces
//! with but never reimplements: package listing, executable resolution,
//! and generator execution.

use std::path::{Path, PathBuf};
use std::process::Command;

use color_eyre::Result;
use color_eyre::eyre::{Context as _, bail};
use serde::Deserialize;
use tracing::{debug, instrument, trace};

use crate::fs;

/// One record from `go list -e -json=...`: either a successfully listed
/// package's `.go` files, or an error string to surface to the user.
#[derive(Debug, Clone, Deserialize)]
struct ListedPackage {
    #[serde(default)]
    #[serde(rename = "Dir")]
    dir: String,
    #[serde(default)]
    #[serde(rename = "GoFiles")]
    go_files: Vec<String>,
    #[serde(rename = "Error")]
    error: Option<ListedPackageError>,
}

#[derive(Debug, Clone, Deserialize)]
struct ListedPackageError {
    #[serde(default, rename = "Pos")]
    pos: String,
    #[serde(default, rename = "Err")]
    err: String,
}

/// A listed file, or an error that occurred listing its package.
#[derive(Debug, Clone)]
pub enum PackageFile {
    File(PathBuf),
    Error(String),
}

/// Run `go list -e -json=...` over `patterns`, flattening every listed
/// package's `.go` files into absolute paths. Errors encountered loading
/// individual packages are reported as [`PackageFile::Error`] rather than
/// failing the whole listing, mirroring the reference toolchain's
/// `ModulesAndErrors`.
#[instrument]
pub fn list_modules_and_errors(patterns: &[String]) -> Result<Vec<PackageFile>> {
    let patterns: Vec<String> = if patterns.is_empty() {
        vec!["./...".to_string()]
    } else {
        patterns.to_vec()
    };

    let output = Command::new("go")
        .arg("list")
        .arg("-e")
        .arg("-json=GoFiles,Dir,Incomplete,Error,DepsErrors")
        .args(&patterns)
        .output()
        .context("run go list")?;

    if !output.status.success() && output.stdout.is_empty() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        bail!("go list failed: {stderr}");
    }

    let text = String::from_utf8_lossy(&output.stdout);
    let mut results = Vec::new();
    for pkg in serde_json::Deserializer::from_str(&text).into_iter::<ListedPackage>() {
        let pkg = pkg.context("parse go list output")?;
        if let Some(err) = pkg.error {
            results.push(PackageFile::Error(format!("{} {}", err.pos, err.err)));
            continue;
        }
        for file in pkg.go_files {
            results.push(PackageFile::File(Path::new(&pkg.dir).join(file)));
        }
    }
    Ok(results)
}

/// The compiled Go files of the single package matching `pattern`, loaded
/// from `dir`. Returns `None` when the pattern doesn't resolve to exactly
/// one package or resolution otherwise fails, mirroring the reference
/// toolchain's `pkg.LoadPackages` returning `nil` on any such failure.
#[instrument]
pub fn load_compiled_go_files(dir: &Path, pattern: &str, tags: &[String]) -> Option<Vec<PathBuf>> {
    let mut cmd = Command::new("go");
    cmd.current_dir(dir).arg("list").arg("-json=CompiledGoFiles,Dir");
    if !tags.is_empty() {
        cmd.arg(format!("-tags={}", tags.join(" ")));
    }
    cmd.arg(pattern);

    let output = cmd.output().ok()?;
    if !output.status.success() {
        debug!(?pattern, "go list failed while loading compiled files");
        return None;
    }

    #[derive(Deserialize)]
    struct Listed {
        #[serde(rename = "Dir")]
        dir: String,
        #[serde(rename = "CompiledGoFiles")]
        compiled_go_files: Vec<String>,
    }

    let text = String::from_utf8_lossy(&output.stdout);
    let mut packages = serde_json::Deserializer::from_str(&text).into_iter::<Listed>();
    let first = packages.next()?.ok()?;
    if packages.next().is_some() {
        debug!(?pattern, "expected exactly one package");
        return None;
    }

    Some(
        first
            .compiled_go_files
            .into_iter()
            .map(|f| {
                let p = PathBuf::from(&f);
                if p.is_absolute() { p } else { Path::new(&first.dir).join(f) }
            })
            .collect(),
    )
}

/// Resolve the toolchain root used to search `bin/` ahead of `PATH`.
///
/// Honors a `GOROOT` environment variable override; otherwise asks the
/// toolchain itself via `go env GOROOT`.
#[instrument]
pub fn runtime_root() -> Result<PathBuf> {
    if let Some(root) = std::env::var_os("GOROOT") {
        return Ok(PathBuf::from(root));
    }

    let output = Command::new("go")
        .arg("env")
        .arg("GOROOT")
        .output()
        .context("run go env GOROOT")?;
    if !output.status.success() {
        bail!("go env GOROOT failed");
    }
    let root = String::from_utf8_lossy(&output.stdout).trim().to_string();
    Ok(PathBuf::from(root))
}

/// Resolve an executable name, preferring `<runtime_root>/bin` over `PATH`.
#[instrument]
pub fn find_executable(name: &str, runtime_root: &Path) -> Option<PathBuf> {
    if name.contains(std::path::MAIN_SEPARATOR) {
        return fs::find_in_path(name);
    }
    let goroot_bin = runtime_root.join("bin").join(name);
    if fs::is_executable(&goroot_bin) {
        return Some(goroot_bin);
    }
    fs::find_in_path(name)
}

/// Spawn the resolved executable directly, inheriting stdio, running in
/// `dir`, and exporting `env` on top of the inherited process environment.
#[instrument(skip(env))]
pub fn run_generator(
    executable: &Path,
    args: &[String],
    dir: &Path,
    env: impl IntoIterator<Item = (String, String)>,
) -> Result<bool> {
    let mut cmd = Command::new(executable);
    cmd.args(args).current_dir(dir);
    for (k, v) in env {
        cmd.env(k, v);
    }

    let status = cmd.status().with_context(|| format!("run {executable:?}"))?;
    trace!(?executable, ?status, "ran generator");
    Ok(status.success())
}
