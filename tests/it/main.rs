//! Integration tests exercising the scan -> plugin -> fingerprint -> cache
//! pipeline end to end, without invoking the `go` toolchain: each scenario
//! builds its own temporary package directory and drives the library
//! directly rather than going through [`gencache::driver::run`], which
//! shells out to `go list` to enumerate packages.

use std::path::Path;
use std::sync::Mutex;

pub mod mockgen_roundtrip;
pub mod protoc_with_import;
pub mod seed_scenarios;

static CWD_LOCK: Mutex<()> = Mutex::new(());

/// Run `f` with the process working directory set to `dir`, restoring the
/// original directory afterward. `cache::verify`/`save`/`restore` resolve
/// relativized paths against the process cwd, mirroring the driver always
/// chdir-ing into the directive's directory first, so tests that exercise
/// those functions need the same chdir. Serialized with a lock since cwd is
/// process-global and this test binary runs its tests concurrently.
#[track_caller]
pub fn with_cwd<R>(dir: &Path, f: impl FnOnce() -> R) -> R {
    let _guard = CWD_LOCK.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
    let original = std::env::current_dir().expect("get current dir");
    std::env::set_current_dir(dir).expect("chdir to fixture dir");
    let result = f();
    std::env::set_current_dir(original).expect("restore current dir");
    result
}
