//! # mailcatch
//!
//! mailcatch is a disposable, in-process SMTP server for tests.
//!
//! Point the code under test at it as if it were a real relay, then inspect
//! what was "sent". Nothing ever leaves the host.
//!
//! ## Quick Start
//!
//! ```rust
//! use mailcatch::SmtpServer;
//! use std::net::Ipv4Addr;
//!
//! // Port 0 picks a free port
//! let mut server = SmtpServer::new()
//!     .host(Ipv4Addr::LOCALHOST.into())
//!     .port(0)
//!     .start()
//!     .unwrap();
//!
//! // Application sends email to 127.0.0.1:<server.port()>
//! // ...
//!
//! for message in server.received_messages() {
//!     println!("Received: {:?}", message.subject());
//! }
//!
//! server.stop();
//! ```
//!
//! ## Supported SMTP commands
//!
//! - `EHLO` / `HELO` - Identify the sender
//! - `MAIL FROM:` - Specify the sender's address
//! - `RCPT TO:` - Specify a destination (may be repeated)
//! - `DATA` - Send the message, ended by a line holding a single `.`
//! - `RSET` - Return to the post-greeting state
//! - `NOOP`, `VRFY`, `EXPN`, `HELP` - Answered without changing state
//! - `QUIT` - Close the session
//!
//! Commands must arrive in order (`EHLO`, `MAIL`, `RCPT`, `DATA`); anything
//! out of sequence gets a `503` and the session carries on.
//!
//! ## Notes
//!
//! - Connections are served one at a time.
//! - Addresses are not validated and mail is never delivered.
//! - Messages live in memory only.
//! - SMTP extensions, authentication and TLS are not supported.
//!
//! ## Inspecting messages
//!
//! Each [`Message`] exposes its headers (ordered, duplicates kept), its body,
//! and the raw bytes as received. [`Message::parse`] hands the raw bytes to
//! `mailparse` for MIME parts and attachments.

mod smtp;

pub use smtp::{
    DEFAULT_LINE_SEPARATOR, DEFAULT_SMTP_PORT, Mailbox, Message, STOP_TIMEOUT, ServerHandle,
    SmtpCommand, SmtpConfig, SmtpError, SmtpRequest, SmtpResponse, SmtpServer, SmtpSession,
    SmtpState, StatefulCommand, StatelessCommand, StopHandle, start,
};
