use std::fmt;
use std::io;

/// Failure of a rewrite run.
///
/// Markup problems never surface here; only the byte source or the sink can fail.
#[derive(Debug)]
pub enum RewriteError {
    Io(io::Error),
}

impl fmt::Display for RewriteError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Io(err) => write!(f, "I/O error: {err}"),
        }
    }
}

impl std::error::Error for RewriteError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Io(err) => Some(err),
        }
    }
}

impl From<io::Error> for RewriteError {
    fn from(err: io::Error) -> Self {
        Self::Io(err)
    }
}
