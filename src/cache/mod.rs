//! The cache store: verifying whether a directive's inputs are already
//! cached, saving a fresh generation's outputs, and restoring a hit.

use std::collections::HashSet;
use std::path::{Path, PathBuf};

use color_eyre::Result;
use color_eyre::eyre::{Context as _, bail};
use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use tracing::{debug, instrument};

use crate::fingerprint;
use crate::fs;
use crate::options::GenerateOptions;
use crate::plugin::{InputOutputFiles, Registry};

/// The outcome of resolving a directive against the plugin registry and
/// cache store, carrying everything [`save`] and [`restore`] need.
#[derive(Debug, Clone)]
pub struct VerifyResult {
    pub plugin_name: Option<&'static str>,
    pub cache_hit: bool,
    pub cache_hit_dir: PathBuf,
    pub can_save: bool,
    pub io_files: InputOutputFiles,
}

impl VerifyResult {
    pub(crate) fn unresolved() -> Self {
        Self {
            plugin_name: None,
            cache_hit: false,
            cache_hit_dir: PathBuf::new(),
            can_save: false,
            io_files: InputOutputFiles::default(),
        }
    }
}

/// Resolve a plugin for `opts`, infer its input/output files, and check
/// whether a cache entry already exists for the resulting fingerprint.
///
/// Returns a [`VerifyResult`] with `can_save = false` when no plugin
/// matches and no `//go:generate_input`/`//go:generate_output` annotations
/// were present either — there's nothing to cache in that case.
#[instrument(skip(registry))]
pub fn verify(opts: &GenerateOptions, registry: &Registry, cache_dir: &Path) -> Result<VerifyResult> {
    let mut result = VerifyResult::unresolved();

    let mut io_files = match registry.matching(opts) {
        Some(plugin) => {
            result.plugin_name = Some(plugin.name());
            debug!(plugin = plugin.name(), "matched plugin");
            match plugin.infer(opts) {
                Some(io) => io,
                None => {
                    debug!("no input output files, skipping cache");
                    return Ok(result);
                }
            }
        }
        None => {
            debug!("no plugin was found to handle command");
            if opts.extra_input_patterns.is_empty() || opts.extra_output_patterns.is_empty() {
                return Ok(result);
            }
            InputOutputFiles::default()
        }
    };

    for pattern in &opts.extra_input_patterns {
        match glob::glob(pattern) {
            Ok(matches) => io_files
                .input_files
                .extend(matches.flatten().map(|p| p.display().to_string())),
            Err(err) => tracing::error!(%err, pattern, "cannot get extra input files"),
        }
    }
    io_files.output_patterns.extend(opts.extra_output_patterns.iter().cloned());

    dedup_sorted(&mut io_files.input_files);
    dedup_sorted(&mut io_files.output_files);
    to_relative(&mut io_files.input_files, opts.dir());
    to_relative(&mut io_files.output_files, opts.dir());

    debug!(
        inputs = io_files.input_files.len(),
        outputs = io_files.output_files.len(),
        patterns = io_files.output_patterns.len(),
        "resolved input/output files"
    );

    let fingerprint = fingerprint::compute(opts, &io_files, opts.executable_path.as_deref())?;
    let (a, b, c) = fingerprint.shard();
    let cache_hit_dir = cache_dir.join(a).join(b).join(c);
    debug!(?cache_hit_dir, "cache hit dir");

    result.cache_hit = fs::is_dir(&cache_hit_dir);
    result.cache_hit_dir = cache_hit_dir;
    result.io_files = io_files;
    result.can_save = true;
    Ok(result)
}

/// Save a directive's generated output files into the cache entry named by
/// `result.cache_hit_dir`, expanding `output_patterns` to concrete files
/// first since the generator may not have created them at predictable names.
#[instrument(skip(result))]
pub fn save(result: &VerifyResult) -> Result<()> {
    let mut output_files = result.io_files.output_files.clone();
    for pattern in &result.io_files.output_patterns {
        match glob::glob(pattern) {
            Ok(matches) => output_files.extend(
                matches
                    .flatten()
                    .filter(|p| p.is_file())
                    .map(|p| p.display().to_string()),
            ),
            Err(err) => tracing::error!(%err, pattern, "cannot get extra output files"),
        }
    }

    fs::create_dir_all(&result.cache_hit_dir)?;

    let tmp = result.cache_hit_dir.join("file.swp");
    let mut manifest = CacheManifest::default();
    for file in &output_files {
        let hash = fs::copy_hash_file(file, &tmp).context("cannot copy file to cache")?;
        let dst = result.cache_hit_dir.join(hash.as_str());
        std::fs::rename(&tmp, &dst).context("rename file to be cached")?;

        let mtime: OffsetDateTime = fs::mtime(file).context("cannot stat cached file")?.into();
        manifest.output_files.push(CacheEntry {
            hash: hash.as_str().to_string(),
            path: file.clone(),
            mod_time: mtime,
        });
    }

    save_manifest(&manifest, &result.cache_hit_dir)?;
    debug!(dir = ?result.cache_hit_dir, "saved cache");
    Ok(())
}

/// Restore a directive's output files from a cache hit, skipping files
/// whose destination already has the recorded modification time.
#[instrument(skip(result))]
pub fn restore(result: &VerifyResult) -> Result<()> {
    debug!("restoring cache");
    let manifest = load_manifest(&result.cache_hit_dir).context("cannot read cache config")?;

    // We can only confirm the expected output set when there are no globs;
    // a glob-produced file legitimately won't appear in `output_files`.
    if result.io_files.output_patterns.is_empty()
        && !outputs_matching(&manifest.output_files, &result.io_files.output_files)
    {
        bail!("expected output files differ");
    }

    for entry in &manifest.output_files {
        let src = result.cache_hit_dir.join(&entry.hash);
        let dst = Path::new(&entry.path);

        if let Ok(existing) = fs::mtime(dst) {
            let existing: OffsetDateTime = existing.into();
            if existing == entry.mod_time {
                debug!(path = %entry.path, "skipping copy of file with same modtime");
                continue;
            }
        }

        if let Some(parent) = dst.parent() {
            fs::create_dir_all(parent).context("cannot create destination directory")?;
        }

        let hash = fs::copy_hash_file(&src, dst).context("cannot copy file from cache")?;
        debug!(path = %entry.path, "copied file from cache");

        fs::set_mtime(dst, entry.mod_time.into()).context("cannot restore times for destination file")?;

        if hash.as_str() != entry.hash {
            bail!("file hash is different, corruption");
        }
    }

    Ok(())
}

fn outputs_matching(output_files: &[CacheEntry], result_files: &[String]) -> bool {
    let result_set: HashSet<&str> = result_files.iter().map(String::as_str).collect();
    output_files.iter().all(|entry| result_set.contains(entry.path.as_str()))
}

fn dedup_sorted(items: &mut Vec<String>) {
    items.sort();
    items.dedup();
}

fn to_relative(items: &mut [String], base: &Path) {
    for item in items.iter_mut() {
        let path = Path::new(item.as_str());
        if path.is_absolute() {
            *item = fs::relative_to(path, base).display().to_string();
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct CacheEntry {
    #[serde(rename = "Hash")]
    hash: String,
    #[serde(rename = "Path")]
    path: String,
    #[serde(rename = "ModTime")]
    #[serde(with = "time::serde::rfc3339")]
    mod_time: OffsetDateTime,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
struct CacheManifest {
    #[serde(rename = "OutputFiles")]
    output_files: Vec<CacheEntry>,
}

fn config_file_path(cache_hit_dir: &Path) -> PathBuf {
    cache_hit_dir.join("cache.json")
}

fn save_manifest(manifest: &CacheManifest, cache_hit_dir: &Path) -> Result<()> {
    let json = serde_json::to_vec(manifest).context("cannot marshal cache config file")?;
    fs::write(config_file_path(cache_hit_dir), json).context("cannot write cache config file")
}

fn load_manifest(cache_hit_dir: &Path) -> Result<CacheManifest> {
    let bytes = fs::read_buffered(config_file_path(cache_hit_dir)).context("cannot read cache config file")?;
    serde_json::from_slice(&bytes).context("cannot unmarshal cache config file")
}
