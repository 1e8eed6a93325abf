use std::path::{Path, PathBuf};
use std::time::SystemTime;

use anyhow::Context;

/// Whether a pipeline's sources changed since it was built.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum Freshness {
    Fresh,
    Stale,
}

/// Source files of a pipeline and their latest modification time at build.
#[derive(Debug, Clone)]
pub struct SourceSet {
    paths: Vec<PathBuf>,
    built_at: SystemTime,
}

impl SourceSet {
    /// Records `paths` (duplicates dropped, order kept) and stamps the set
    /// with their newest modification time. Every path must exist.
    pub fn capture<I, P>(paths: I) -> anyhow::Result<Self>
    where
        I: IntoIterator<Item = P>,
        P: Into<PathBuf>,
    {
        let mut unique: Vec<PathBuf> = Vec::new();
        for path in paths {
            let path = path.into();
            if !unique.contains(&path) {
                unique.push(path);
            }
        }
        anyhow::ensure!(!unique.is_empty(), "a pipeline needs at least one source");

        let mut built_at = SystemTime::UNIX_EPOCH;
        for path in &unique {
            let modified = modified(path)
                .with_context(|| format!("cannot stat shader source {}", path.display()))?;
            built_at = built_at.max(modified);
        }

        Ok(Self {
            paths: unique,
            built_at,
        })
    }

    pub fn paths(&self) -> &[PathBuf] {
        &self.paths
    }

    /// Newest source modification time at capture.
    pub fn built_at(&self) -> SystemTime {
        self.built_at
    }

    /// Newest modification time among sources that can be stat'ed now.
    pub fn latest_modification(&self) -> Option<SystemTime> {
        self.paths
            .iter()
            .filter_map(|path| match modified(path) {
                Ok(time) => Some(time),
                Err(err) => {
                    log::debug!("skipping {} in staleness check: {err}", path.display());
                    None
                }
            })
            .max()
    }

    /// `Stale` once any source is newer than the build stamp. Sources that
    /// vanished do not count as changes.
    pub fn freshness(&self) -> Freshness {
        match self.latest_modification() {
            Some(latest) if latest > self.built_at => Freshness::Stale,
            _ => Freshness::Fresh,
        }
    }
}

fn modified(path: &Path) -> std::io::Result<SystemTime> {
    std::fs::metadata(path)?.modified()
}
