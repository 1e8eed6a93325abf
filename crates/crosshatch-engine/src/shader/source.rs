use std::path::{Path, PathBuf};

use super::ShaderError;

/// Paths of a vertex/fragment source pair.
#[derive(Debug, Clone, Eq, PartialEq, Hash)]
pub struct ShaderPair {
    pub vertex: PathBuf,
    pub fragment: PathBuf,
}

impl ShaderPair {
    pub fn new(vertex: impl Into<PathBuf>, fragment: impl Into<PathBuf>) -> Self {
        Self {
            vertex: vertex.into(),
            fragment: fragment.into(),
        }
    }

    /// Pair of file names resolved against `dir`.
    pub fn in_dir(dir: &Path, vertex: &str, fragment: &str) -> Self {
        Self::new(dir.join(vertex), dir.join(fragment))
    }

    pub fn paths(&self) -> [&Path; 2] {
        [&self.vertex, &self.fragment]
    }

    /// Reads both sources.
    pub fn read(&self) -> Result<(String, String), ShaderError> {
        Ok((read_source(&self.vertex)?, read_source(&self.fragment)?))
    }
}

fn read_source(path: &Path) -> Result<String, ShaderError> {
    std::fs::read_to_string(path).map_err(|source| ShaderError::Read {
        path: path.to_path_buf(),
        source,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::ShaderDir;

    #[test]
    fn in_dir_joins_names() {
        let pair = ShaderPair::in_dir(Path::new("/shaders"), "a.vert", "b.frag");
        assert_eq!(pair.vertex, Path::new("/shaders/a.vert"));
        assert_eq!(pair.fragment, Path::new("/shaders/b.frag"));
    }

    #[test]
    fn read_reports_missing_path() {
        let dir = ShaderDir::new();
        let pair = ShaderPair::in_dir(dir.path(), "gbuffer.vert", "absent.frag");
        match pair.read() {
            Err(ShaderError::Read { path, .. }) => assert!(path.ends_with("absent.frag")),
            other => panic!("expected read error, got {other:?}"),
        }
    }

    #[test]
    fn read_returns_both_sources() {
        let dir = ShaderDir::new();
        let pair = ShaderPair::in_dir(dir.path(), "gbuffer.vert", "gbuffer.frag");
        let (vs, fs) = pair.read().unwrap();
        assert!(vs.contains("unifModelTrans"));
        assert!(fs.contains("void main"));
    }
}
