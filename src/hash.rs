//! Hashing operations and types.

use std::fs::File;
use std::io::BufReader;
use std::path::Path;

use blake2::Blake2b;
use blake2::digest::consts::U32;
use blake2::digest::{Digest, FixedOutput};
use color_eyre::Result;
use color_eyre::eyre::Context as _;
use derive_more::Display;
use serde::{Deserialize, Serialize};
use tracing::{instrument, trace};

type Blake2b256 = Blake2b<U32>;

/// A BLAKE2b-256 digest, rendered as lowercase hex.
///
/// The reference toolchain this cache is compatible with hashes with
/// BLAKE2b-256 rather than a faster modern hash, so cache directories
/// computed by either implementation land at the same path for the same
/// inputs.
#[derive(Clone, Eq, PartialEq, Ord, PartialOrd, Hash, Debug, Display, Serialize, Deserialize)]
pub struct Fingerprint(String);

impl Fingerprint {
    /// Hash the contents of the file at the specified path.
    #[instrument(name = "Fingerprint::from_file")]
    pub fn from_file(path: impl AsRef<Path> + std::fmt::Debug) -> Result<Self> {
        let path = path.as_ref();
        let file = File::open(path).with_context(|| format!("open {path:?} for hashing"))?;

        let mut reader = BufReader::new(file);
        let mut hasher = Blake2b256::new();
        let bytes = std::io::copy(&mut reader, &mut hasher)
            .with_context(|| format!("hash {path:?}"))?;

        let hash = hex::encode(hasher.finalize_fixed());
        trace!(?path, ?hash, ?bytes, "hash file");
        Ok(Self(hash))
    }

    /// Hash the contents of a buffer.
    #[instrument(skip_all, name = "Fingerprint::from_buffer")]
    pub fn from_buffer(buffer: impl AsRef<[u8]>) -> Self {
        let buffer = buffer.as_ref();
        let mut hasher = Blake2b256::new();
        hasher.update(buffer);

        let hash = hex::encode(hasher.finalize_fixed());
        trace!(?hash, bytes = ?buffer.len(), "hash buffer");
        Self(hash)
    }

    /// Hash the concatenation of a sequence of fields, in order.
    ///
    /// This does not delimit fields from each other; callers that need
    /// unambiguous framing must embed separators in the fields themselves.
    #[instrument(skip_all, name = "Fingerprint::from_fields")]
    pub fn from_fields(fields: impl IntoIterator<Item = impl AsRef<[u8]>>) -> Self {
        let mut hasher = Blake2b256::new();
        let mut bytes = 0;

        for field in fields {
            let field = field.as_ref();
            bytes += field.len();
            hasher.update(field);
        }

        let hash = hex::encode(hasher.finalize_fixed());
        trace!(?hash, ?bytes, "hash fields");
        Self(hash)
    }

    /// Wrap an already-computed lowercase hex digest.
    pub fn from_hex(hex: impl Into<String>) -> Self {
        Self(hex.into())
    }

    /// View the hash as a string.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Split the hash into the three path components used to shard the
    /// cache directory: the first hex digit, the next two, and the rest.
    pub fn shard(&self) -> (&str, &str, &str) {
        (&self.0[0..1], &self.0[1..3], &self.0[3..])
    }
}

impl From<&Fingerprint> for Fingerprint {
    fn from(hash: &Fingerprint) -> Self {
        hash.clone()
    }
}

impl AsRef<str> for Fingerprint {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl AsRef<[u8]> for Fingerprint {
    fn as_ref(&self) -> &[u8] {
        self.0.as_bytes()
    }
}
