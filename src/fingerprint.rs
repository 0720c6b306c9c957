//! Content-addressed fingerprint computation: the digest that decides where
//! a directive's cache entry lives.

use std::path::Path;

use color_eyre::Result;
use color_eyre::eyre::{Context as _, eyre};
use time::OffsetDateTime;
use time::format_description::well_known::Rfc3339;
use tracing::{debug, instrument};

use crate::fs;
use crate::hash::Fingerprint;
use crate::options::GenerateOptions;
use crate::plugin::InputOutputFiles;

/// Compute the fingerprint for one directive's resolved input/output file
/// set, folding in either the generator executable's identity or a
/// versioned package digest. `executable_path` must be `Some` whenever
/// `opts.go_package` is `None`; the reference toolchain treats a bare
/// directive with no resolvable executable as uncacheable.
#[instrument(skip(io_files))]
pub fn compute(
    opts: &GenerateOptions,
    io_files: &InputOutputFiles,
    executable_path: Option<&Path>,
) -> Result<Fingerprint> {
    let mut fields: Vec<String> = vec![
        opts.dir().display().to_string(),
        opts.words.join("\n"),
        io_files.input_files.join("\n"),
        io_files.output_files.join("\n"),
        io_files.output_patterns.join("\n"),
        io_files.extra.join("\n"),
    ];

    for file in &io_files.input_files {
        let digest = Fingerprint::from_file(file).with_context(|| format!("cannot hash file '{file}'"))?;
        fields.push(digest.as_str().to_string());
    }

    match &opts.go_package {
        None => {
            let path = executable_path
                .ok_or_else(|| eyre!("cannot get path for executable '{}'", opts.executable_name))?;
            fields.push(executable_identity(path)?);
        }
        Some(package) => {
            if let Some(version) = opts.go_package_version.as_deref() {
                if version != "latest" {
                    let digest = Fingerprint::from_buffer(format!("{package}/{version}").as_bytes());
                    fields.push(digest.as_str().to_string());
                }
            }
        }
    }

    let fingerprint = Fingerprint::from_fields(&fields);
    debug!(?fingerprint, dir = %opts.dir().display(), "computed fingerprint");
    Ok(fingerprint)
}

/// An executable's identity for fingerprinting purposes: its resolved path,
/// zero-padded size, and RFC3339 modification time. Two builds of the same
/// generator that differ in any of these produce different fingerprints.
fn executable_identity(path: &Path) -> Result<String> {
    let size = fs::size(path)?;
    let mtime = fs::mtime(path)?;
    let mtime: OffsetDateTime = mtime.into();
    let formatted = mtime.format(&Rfc3339).context("format executable mtime")?;
    Ok(format!("{}{size:019}{formatted}", path.display()))
}
