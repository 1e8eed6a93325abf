use std::fmt;
use std::io;
use std::path::PathBuf;

use crate::device::ShaderStage;

/// Failure to turn shader sources into a linked program.
#[derive(Debug)]
pub enum ShaderError {
    /// A source file could not be read.
    Read { path: PathBuf, source: io::Error },
    /// A stage failed to compile; `log` is the driver's info log.
    Compile { stage: ShaderStage, log: String },
    /// The stages compiled but did not link.
    Link { log: String },
}

impl fmt::Display for ShaderError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ShaderError::Read { path, .. } => {
                write!(f, "cannot read shader source {}", path.display())
            }
            ShaderError::Compile { stage, log } => {
                write!(f, "{stage} shader failed to compile: {}", log.trim_end())
            }
            ShaderError::Link { log } => {
                write!(f, "program failed to link: {}", log.trim_end())
            }
        }
    }
}

impl std::error::Error for ShaderError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ShaderError::Read { source, .. } => Some(source),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn compile_error_names_stage() {
        let err = ShaderError::Compile {
            stage: ShaderStage::Fragment,
            log: "0:3(1): error: syntax error\n".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "fragment shader failed to compile: 0:3(1): error: syntax error"
        );
    }

    #[test]
    fn read_error_exposes_io_source() {
        use std::error::Error;

        let err = ShaderError::Read {
            path: PathBuf::from("missing.vert"),
            source: io::Error::from(io::ErrorKind::NotFound),
        };
        assert!(err.to_string().contains("missing.vert"));
        assert!(err.source().is_some());
    }
}
