use std::{error::Error, fmt, io};

pub type GenericError = Box<dyn Error + Send + Sync + 'static>;

pub type PingResult<T> = std::result::Result<T, PingError>;

/// Errors that abort a session. Send and receive problems while packets are flowing are
/// transient and never surface as a `PingError`.
#[derive(Debug)]
pub enum PingError {
    Resolution { host: String, message: String },
    PacketTooLarge { size: usize, capacity: usize },
    /// Socket acquisition or console output failed.
    Io(io::Error),
}

impl fmt::Display for PingError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> Result<(), fmt::Error> {
        match self {
            PingError::Resolution { host, message } => {
                write!(f, "failed to resolve host {host}")?;
                if !message.is_empty() {
                    write!(f, ": {message}")?;
                }
                Ok(())
            }
            PingError::PacketTooLarge { size, capacity } => {
                write!(f, "packet size {size} exceeds buffer capacity {capacity}")
            }
            PingError::Io(e) => write!(f, "I/O error: {e}"),
        }
    }
}

impl Error for PingError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            PingError::Io(e) => Some(e),
            _ => None,
        }
    }
}

impl From<io::Error> for PingError {
    fn from(error: io::Error) -> PingError {
        PingError::Io(error)
    }
}
