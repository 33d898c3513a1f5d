use thiserror::Error;

/// Errors reported by the registry and the dispatcher.
#[derive(Debug, Error)]
pub enum Error {
    /// Two commands were registered under one name.
    #[error("{0}: duplicate")]
    Duplicate(String),

    #[error("{0}: command not found")]
    NotFound(String),

    /// A non-daemon command failed.
    #[error("{name}: {error:#}")]
    Execution { name: String, error: anyhow::Error },

    /// A daemon returned an error. Reported as-is.
    #[error("{0:#}")]
    Daemon(anyhow::Error),

    #[error("missing arguments")]
    MissingArguments,

    #[error("signal handler: {0}")]
    Signal(#[from] ctrlc::Error),

    #[error("stdout: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T, E = Error> = std::result::Result<T, E>;

/// End-of-stream sentinel.
///
/// Commands that read input until exhausted return this to say "no more
/// input"; the dispatcher reports it as success.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Error)]
#[error("end of input")]
pub struct Eof;

/// Whether `err` is, or wraps, the [`Eof`] sentinel.
pub fn is_eof(err: &anyhow::Error) -> bool {
    err.downcast_ref::<Eof>().is_some()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_messages() {
        assert_eq!(Error::NotFound("frob".into()).to_string(), "frob: command not found");
        assert_eq!(Error::Duplicate("echo".into()).to_string(), "echo: duplicate");
        assert_eq!(Error::MissingArguments.to_string(), "missing arguments");
        let err = Error::Execution {
            name: "cat".into(),
            error: anyhow::anyhow!("no such file"),
        };
        assert_eq!(err.to_string(), "cat: no such file");
        assert_eq!(Error::Daemon(anyhow::anyhow!("bind failed")).to_string(), "bind failed");
        let err = Error::from(std::io::Error::from(std::io::ErrorKind::BrokenPipe));
        assert!(err.to_string().starts_with("stdout: "));
    }

    #[test]
    fn test_is_eof() {
        assert!(is_eof(&anyhow::Error::new(Eof)));
        assert!(!is_eof(&anyhow::anyhow!("end of input")));
    }
}
