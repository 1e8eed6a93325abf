//! Test fixtures.

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::{Duration, SystemTime};

use crate::pipeline::{HatchConfig, PipelineConfig};

const SHADERS: [(&str, &str); 6] = [
    ("gbuffer.vert", include_str!("../shaders/gbuffer.vert")),
    ("gbuffer.frag", include_str!("../shaders/gbuffer.frag")),
    ("render_buffer.vert", include_str!("../shaders/render_buffer.vert")),
    ("deferred_ssao.frag", include_str!("../shaders/deferred_ssao.frag")),
    ("deferred_hatched.frag", include_str!("../shaders/deferred_hatched.frag")),
    ("deferred_dirlight.frag", include_str!("../shaders/deferred_dirlight.frag")),
];

const ATLAS: &[u8] = include_bytes!("../assets/tiled_hatches.png");

static NEXT: AtomicUsize = AtomicUsize::new(0);

/// Private copy of the shipped shaders and atlas, removed on drop.
///
/// Tests touch modification times, so each one gets its own directory.
pub(crate) struct ShaderDir {
    root: PathBuf,
}

impl ShaderDir {
    pub(crate) fn new() -> Self {
        let root = std::env::temp_dir().join(format!(
            "crosshatch_test_{}_{}",
            std::process::id(),
            NEXT.fetch_add(1, Ordering::Relaxed)
        ));
        let _ = std::fs::remove_dir_all(&root);
        std::fs::create_dir_all(&root).unwrap();

        let dir = Self { root };
        for (name, source) in SHADERS {
            dir.write(name, source);
        }
        std::fs::write(dir.file("tiled_hatches.png"), ATLAS).unwrap();
        dir
    }

    pub(crate) fn path(&self) -> &Path {
        &self.root
    }

    pub(crate) fn file(&self, name: &str) -> PathBuf {
        self.root.join(name)
    }

    pub(crate) fn write(&self, name: &str, contents: &str) {
        std::fs::write(self.file(name), contents).unwrap();
    }

    /// Moves the modification time of `name` a minute past `after`.
    pub(crate) fn touch_after(&self, name: &str, after: SystemTime) {
        let file = std::fs::File::options()
            .write(true)
            .open(self.file(name))
            .unwrap();
        file.set_modified(after + Duration::from_secs(60)).unwrap();
    }

    /// Pipeline config reading shaders from this directory.
    pub(crate) fn config(&self) -> PipelineConfig {
        PipelineConfig {
            shader_dir: self.root.clone(),
            width: 256,
            height: 256,
            ..PipelineConfig::default()
        }
    }

    pub(crate) fn hatch(&self) -> HatchConfig {
        HatchConfig {
            atlas: self.file("tiled_hatches.png"),
            ..HatchConfig::default()
        }
    }
}

impl Drop for ShaderDir {
    fn drop(&mut self) {
        let _ = std::fs::remove_dir_all(&self.root);
    }
}
