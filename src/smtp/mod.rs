//! SMTP server implementation

pub mod commands;
pub mod config;
pub mod error;
pub mod mailbox;
pub mod message;
pub mod response;
pub mod server;
pub mod session;

pub use commands::{SmtpCommand, SmtpRequest, StatefulCommand, StatelessCommand};
pub use config::{DEFAULT_LINE_SEPARATOR, DEFAULT_SMTP_PORT, STOP_TIMEOUT, SmtpConfig};
pub use error::SmtpError;
pub use mailbox::Mailbox;
pub use message::Message;
pub use response::SmtpResponse;
pub use server::{ServerHandle, SmtpServer, StopHandle, start};
pub use session::{SmtpSession, SmtpState};
