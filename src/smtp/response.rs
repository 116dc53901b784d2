//! SMTP response handling

use crate::smtp::session::SmtpState;

/// Outcome of executing one command: the reply to send and the state to move to
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SmtpResponse {
    /// The SMTP reply code; zero or negative means nothing is sent
    pub code: i32,
    /// The human-readable message
    pub message: String,
    /// State the session moves to once the command has been executed
    pub next_state: SmtpState,
}

impl SmtpResponse {
    /// Create a new SMTP response
    pub fn new(code: i32, message: &str, next_state: SmtpState) -> Self {
        Self {
            code,
            message: message.to_owned(),
            next_state,
        }
    }

    /// Create a success response (250 OK)
    pub fn ok(next_state: SmtpState) -> Self {
        Self::new(250, "OK", next_state)
    }

    /// Create a greeting response (220)
    pub fn greeting() -> Self {
        Self::new(220, "localhost mailcatch SMTP service ready", SmtpState::Greet)
    }

    /// Create a DATA intermediate response (354)
    pub fn data_start() -> Self {
        Self::new(
            354,
            "Start mail input; end with <CRLF>.<CRLF>",
            SmtpState::DataHeader,
        )
    }

    /// Create a QUIT response (221)
    pub fn quit() -> Self {
        Self::new(
            221,
            "localhost mailcatch service closing transmission channel",
            SmtpState::Connect,
        )
    }

    /// Reply for a command that is valid but not allowed in the current state
    pub fn bad_sequence(command: impl std::fmt::Display, state: SmtpState) -> Self {
        Self::new(503, &format!("Bad sequence of commands: {command}"), state)
    }

    pub fn unrecognized(state: SmtpState) -> Self {
        Self::new(500, "Command not recognized", state)
    }

    /// A line consumed during DATA that gets no reply
    pub fn silent(next_state: SmtpState) -> Self {
        Self::new(-1, "", next_state)
    }

    /// Whether this response is written to the client at all
    pub fn is_silent(&self) -> bool {
        self.code <= 0
    }

    /// Format the response for sending over the wire
    pub fn format(&self) -> String {
        format!("{} {}\r\n", self.code, self.message)
    }

    /// Check if this is a success response (2xx)
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.code)
    }

    /// Check if this is an error response (4xx or 5xx)
    pub fn is_error(&self) -> bool {
        (400..600).contains(&self.code)
    }
}
