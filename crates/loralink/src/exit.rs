use std::fmt;
use std::io;

use loralink_frame::FrameError;
use loralink_session::SessionError;
use loralink_signals::LoadError;
use loralink_transport::TransportError;

pub const SUCCESS: i32 = 0;
pub const FAILURE: i32 = 1;
pub const TRANSPORT_ERROR: i32 = 3;
pub const PERMISSION_DENIED: i32 = 50;
pub const DATA_INVALID: i32 = 60;
pub const USAGE: i32 = 64;
pub const TIMEOUT: i32 = 124;
pub const INTERNAL: i32 = 125;

pub type CliResult<T> = Result<T, CliError>;

#[derive(Debug)]
pub struct CliError {
    pub code: i32,
    pub message: String,
}

impl CliError {
    pub fn new(code: i32, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }
}

impl fmt::Display for CliError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::error::Error for CliError {}

pub fn io_error(context: &str, err: io::Error) -> CliError {
    let code = match err.kind() {
        io::ErrorKind::PermissionDenied => PERMISSION_DENIED,
        io::ErrorKind::TimedOut | io::ErrorKind::WouldBlock => TIMEOUT,
        io::ErrorKind::NotFound => FAILURE,
        _ => INTERNAL,
    };
    CliError::new(code, format!("{context}: {err}"))
}

pub fn transport_error(context: &str, err: TransportError) -> CliError {
    match err {
        TransportError::Io(source) => io_error(context, source),
        TransportError::Closed => CliError::new(FAILURE, format!("{context}: {err}")),
        other => CliError::new(TRANSPORT_ERROR, format!("{context}: {other}")),
    }
}

pub fn frame_error(context: &str, err: FrameError) -> CliError {
    match err {
        FrameError::Transport(err) => transport_error(context, err),
        FrameError::MarkerInBody { .. } => {
            CliError::new(DATA_INVALID, format!("{context}: {err}"))
        }
        other => CliError::new(INTERNAL, format!("{context}: {other}")),
    }
}

pub fn session_error(context: &str, err: SessionError) -> CliError {
    match err {
        SessionError::Transport(err) => transport_error(context, err),
        SessionError::Frame(err) => frame_error(context, err),
        SessionError::StreamUnavailable => {
            CliError::new(TRANSPORT_ERROR, format!("{context}: {err}"))
        }
        other => CliError::new(INTERNAL, format!("{context}: {other}")),
    }
}

pub fn load_error(context: &str, err: LoadError) -> CliError {
    match err {
        LoadError::Io { source, .. } => io_error(context, source),
        LoadError::UnsupportedFormat(_) => CliError::new(USAGE, format!("{context}: {err}")),
        other => CliError::new(DATA_INVALID, format!("{context}: {other}")),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn io_kinds_map_to_codes() {
        let denied = io_error("open", io::Error::from(io::ErrorKind::PermissionDenied));
        assert_eq!(denied.code, PERMISSION_DENIED);
        let timed_out = io_error("read", io::Error::from(io::ErrorKind::TimedOut));
        assert_eq!(timed_out.code, TIMEOUT);
        assert!(timed_out.message.starts_with("read: "));
    }

    #[test]
    fn session_errors_unwrap_to_transport_codes() {
        let err = session_error("send failed", SessionError::StreamUnavailable);
        assert_eq!(err.code, TRANSPORT_ERROR);

        let closed = session_error(
            "send failed",
            SessionError::Frame(FrameError::Transport(TransportError::Closed)),
        );
        assert_eq!(closed.code, FAILURE);
    }

    #[test]
    fn load_errors_are_data_invalid() {
        let err = load_error(
            "load failed",
            LoadError::Dbc {
                line: 3,
                message: "bad".to_string(),
            },
        );
        assert_eq!(err.code, DATA_INVALID);

        let err = load_error("load failed", LoadError::UnsupportedFormat("xml".into()));
        assert_eq!(err.code, USAGE);
    }
}
