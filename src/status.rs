//! Status codes shared by every public entry point.
//!
//! `Status` doubles as the severity tag handed to the library message
//! callback (where [`Status::Ok`] marks informational messages) and as the
//! typed error payload carried inside [`anyhow::Error`]. Callers that need
//! to react to a particular failure downcast:
//!
//! ```
//! use tessella::Status;
//!
//! let err = anyhow::Error::new(Status::NoValue);
//! assert_eq!(err.downcast_ref::<Status>(), Some(&Status::NoValue));
//! ```

use std::fmt;

/// Outcome code for library operations.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Status {
    /// Success; also the severity of informational log messages.
    Ok,
    /// Unspecified internal failure (including contained panics in
    /// release builds).
    Error,
    /// No accelerator is configured or the backend cannot serve the
    /// request.
    NoAcceleration,
    /// The requested accelerator platform does not exist.
    PlatformNotFound,
    /// The requested device index is out of range.
    DeviceNotFound,
    /// An object was used in a state that forbids the operation
    /// (e.g. resubmitting an evaluated expression).
    InvalidState,
    /// A programmer error surfaced through the public API: null-like
    /// argument, dimension mismatch, type mismatch, wrong arity.
    InvalidArgument,
    /// A scalar read found no stored value.
    NoValue,
    /// Device program compilation failed (cached negatively).
    CompilationError,
    /// No algorithm or conversion path is registered for the request.
    NotImplemented,
}

impl Status {
    /// Stable lower-case name used in log lines and reports.
    pub fn as_str(self) -> &'static str {
        match self {
            Status::Ok => "ok",
            Status::Error => "error",
            Status::NoAcceleration => "no_acceleration",
            Status::PlatformNotFound => "platform_not_found",
            Status::DeviceNotFound => "device_not_found",
            Status::InvalidState => "invalid_state",
            Status::InvalidArgument => "invalid_argument",
            Status::NoValue => "no_value",
            Status::CompilationError => "compilation_error",
            Status::NotImplemented => "not_implemented",
        }
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::error::Error for Status {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_travels_through_anyhow() {
        let err = anyhow::Error::new(Status::NotImplemented);
        assert_eq!(err.downcast_ref::<Status>(), Some(&Status::NotImplemented));
        assert_eq!(format!("{}", Status::NoValue), "no_value");
    }
}
