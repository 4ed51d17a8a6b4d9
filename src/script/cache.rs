// src/script/cache.rs

//! Compiled-artifact cache layout and validity checks.
//!
//! Validity is decided on two levels:
//! - per artifact: the source must be strictly older than the artifact;
//! - per directory: the `version.txt` stamp must match the running engine,
//!   otherwise the whole directory is wiped before anything is compiled.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use tracing::{debug, info, warn};

use crate::fs::FileSystem;
use crate::script::ScriptSource;

/// Main compiled artifact for a script.
pub const MAIN_ARTIFACT: &str = "buildScript.jar";
/// Artifact compiled from the extracted directives only.
pub const BOOTSTRAP_ARTIFACT: &str = "preBuildScript.jar";
/// Plain-text engine version stamp.
pub const VERSION_FILE: &str = "version.txt";

/// Subdirectory of the cache root that holds per-script directories.
const SCRIPTS_DIR: &str = "scripts";

/// Per-script cache directory and the files inside it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CacheLayout {
    dir: PathBuf,
}

impl CacheLayout {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// Deterministic cache directory for `source` below `cache_root`.
    ///
    /// The directory name is derived from a BLAKE3 hash of the script path,
    /// so two scripts never share a directory and the same script always
    /// maps to the same one.
    pub fn for_script(cache_root: &Path, source: &ScriptSource) -> Self {
        let hash = blake3::hash(source.path().to_string_lossy().as_bytes())
            .to_hex()
            .to_string();
        Self::new(cache_root.join(SCRIPTS_DIR).join(&hash[..16]))
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn main_artifact(&self) -> PathBuf {
        self.dir.join(MAIN_ARTIFACT)
    }

    pub fn bootstrap_artifact(&self) -> PathBuf {
        self.dir.join(BOOTSTRAP_ARTIFACT)
    }

    pub fn version_file(&self) -> PathBuf {
        self.dir.join(VERSION_FILE)
    }
}

/// Result of comparing a cache directory's stamp with the engine version.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VersionCheck {
    /// Stamp present and equal.
    Matches,
    /// No readable stamp; treated like a match.
    Unstamped,
    /// Stamp differed; this many files were removed.
    Wiped(usize),
}

/// Decides whether previously compiled artifacts may be reused.
#[derive(Debug, Clone)]
pub struct CacheGuard {
    fs: Arc<dyn FileSystem>,
    engine_version: String,
}

impl CacheGuard {
    pub fn new(fs: Arc<dyn FileSystem>, engine_version: impl Into<String>) -> Self {
        Self {
            fs,
            engine_version: engine_version.into(),
        }
    }

    pub fn engine_version(&self) -> &str {
        &self.engine_version
    }

    /// `true` iff both files exist and the source is strictly older than the
    /// artifact. Any metadata failure counts as stale.
    pub fn is_fresh(&self, source: &ScriptSource, artifact: &Path) -> bool {
        if !self.fs.exists(source.path()) || !self.fs.is_file(artifact) {
            return false;
        }

        match self.fs.modified(artifact) {
            Ok(artifact_time) => {
                let fresh = source.modified() < artifact_time;
                debug!(
                    script = %source.name(),
                    artifact = ?artifact,
                    fresh,
                    "artifact freshness check"
                );
                fresh
            }
            Err(e) => {
                warn!(artifact = ?artifact, error = %e, "cannot read artifact mtime; treating as stale");
                false
            }
        }
    }

    /// Compare the directory's stamp with the engine version and wipe every
    /// file in the directory on mismatch.
    ///
    /// The wipe is not atomic; an interrupted wipe is simply repeated on the
    /// next call because the stamp is removed along with everything else.
    pub fn check_version(&self, layout: &CacheLayout) -> Result<VersionCheck> {
        let stamp = match self.fs.read_to_string(&layout.version_file()) {
            Ok(s) => s,
            Err(_) => return Ok(VersionCheck::Unstamped),
        };

        if stamp == self.engine_version {
            return Ok(VersionCheck::Matches);
        }

        info!(
            dir = ?layout.dir(),
            found = %stamp,
            expected = %self.engine_version,
            "engine version changed; clearing script cache directory"
        );

        let mut removed = 0;
        for entry in self.fs.read_dir(layout.dir())? {
            if self.fs.is_file(&entry) {
                self.fs
                    .remove_file(&entry)
                    .with_context(|| format!("clearing stale cache entry {:?}", entry))?;
                removed += 1;
            }
        }
        Ok(VersionCheck::Wiped(removed))
    }

    /// Create the cache directory so the toolchain can write into it.
    pub fn prepare(&self, layout: &CacheLayout) -> Result<()> {
        self.fs
            .create_dir_all(layout.dir())
            .with_context(|| format!("preparing cache directory {:?}", layout.dir()))
    }

    /// Persist the engine version after a successful compilation.
    pub fn write_stamp(&self, layout: &CacheLayout) -> Result<()> {
        self.fs
            .write(&layout.version_file(), self.engine_version.as_bytes())
            .with_context(|| format!("writing version stamp in {:?}", layout.dir()))
    }
}
