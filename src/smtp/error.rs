//! Error types for the SMTP server

use std::net::SocketAddr;

use thiserror::Error;

/// Errors surfaced by the server.
///
/// Out-of-order or unknown commands are never errors: they are answered
/// with 500/503 replies and the session carries on.
#[derive(Error, Debug)]
pub enum SmtpError {
    #[error("Failed to bind SMTP listener on {addr}: {source}")]
    Bind {
        addr: SocketAddr,
        #[source]
        source: std::io::Error,
    },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Listener thread exited before reporting its bind outcome")]
    StartupAborted,

    #[error("Failed to parse message: {0}")]
    Mime(#[from] mailparse::MailParseError),
}

impl SmtpError {
    /// Whether the error was raised while setting up the listener
    pub fn is_bind_error(&self) -> bool {
        matches!(self, SmtpError::Bind { .. } | SmtpError::StartupAborted)
    }
}
