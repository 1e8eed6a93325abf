use std::fmt;

use super::Gl;

/// Failure to create a driver object (context lost, out of names).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeviceError(pub String);

impl DeviceError {
    pub(crate) fn new(msg: impl Into<String>) -> Self {
        Self(msg.into())
    }
}

impl fmt::Display for DeviceError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "graphics device error: {}", self.0)
    }
}

impl std::error::Error for DeviceError {}

/// Error code polled from the driver after an operation.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum DriverError {
    InvalidEnum,
    InvalidValue,
    InvalidOperation,
    OutOfMemory,
    InvalidFramebufferOperation,
    Unknown(u32),
}

impl DriverError {
    /// Maps a raw `glGetError` code. `GL_NO_ERROR` maps to `None`.
    pub fn from_code(code: u32) -> Option<Self> {
        match code {
            ::glow::NO_ERROR => None,
            ::glow::INVALID_ENUM => Some(DriverError::InvalidEnum),
            ::glow::INVALID_VALUE => Some(DriverError::InvalidValue),
            ::glow::INVALID_OPERATION => Some(DriverError::InvalidOperation),
            ::glow::OUT_OF_MEMORY => Some(DriverError::OutOfMemory),
            ::glow::INVALID_FRAMEBUFFER_OPERATION => Some(DriverError::InvalidFramebufferOperation),
            other => Some(DriverError::Unknown(other)),
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            DriverError::InvalidEnum => "INVALID_ENUM",
            DriverError::InvalidValue => "INVALID_VALUE",
            DriverError::InvalidOperation => "INVALID_OPERATION",
            DriverError::OutOfMemory => "OUT_OF_MEMORY",
            DriverError::InvalidFramebufferOperation => "INVALID_FRAMEBUFFER_OPERATION",
            DriverError::Unknown(_) => "UNKNOWN_ERROR",
        }
    }
}

impl fmt::Display for DriverError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DriverError::Unknown(code) => write!(f, "GL_{} ({code:#x})", self.name()),
            _ => write!(f, "GL_{}", self.name()),
        }
    }
}

/// Drains every pending driver error, logging each with the caller's location.
///
/// Returns `true` if anything was pending. Never fatal: this surfaces
/// programmer mistakes during development.
#[track_caller]
pub fn check_errors(gl: &mut dyn Gl) -> bool {
    let site = std::panic::Location::caller();
    let mut any = false;
    while let Some(err) = gl.poll_error() {
        log::error!("{err} - {}:{}", site.file(), site.line());
        any = true;
    }
    any
}
