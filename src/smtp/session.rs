//! SMTP session state management

use std::fmt;
use std::mem;

use crate::smtp::commands::{SmtpCommand, SmtpRequest, StatefulCommand};
use crate::smtp::message::Message;
use crate::smtp::response::SmtpResponse;

/// Represents the current state of an SMTP session
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SmtpState {
    /// Initial state, also reached again after QUIT
    Connect,
    /// Greeting sent - waiting for EHLO/HELO
    Greet,
    /// EHLO received - ready for MAIL command
    Mail,
    /// MAIL FROM received - ready for RCPT or DATA
    Rcpt,
    /// DATA accepted - reading header lines
    DataHeader,
    /// Blank line seen - reading body lines
    DataBody,
    /// Message complete - waiting for QUIT or another MAIL
    Quit,
}

impl SmtpState {
    /// Whether the session is capturing message data
    pub fn in_data(self) -> bool {
        matches!(self, SmtpState::DataHeader | SmtpState::DataBody)
    }
}

impl fmt::Display for SmtpState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            SmtpState::Connect => "CONNECT",
            SmtpState::Greet => "GREET",
            SmtpState::Mail => "MAIL",
            SmtpState::Rcpt => "RCPT",
            SmtpState::DataHeader => "DATA_HDR",
            SmtpState::DataBody => "DATA_BODY",
            SmtpState::Quit => "QUIT",
        };
        f.write_str(name)
    }
}

/// Drives one connection's dialog, line by line, without touching the socket.
///
/// The caller writes the returned responses and stores the returned messages.
#[derive(Debug)]
pub struct SmtpSession {
    state: SmtpState,
    message: Message,
    line_separator: String,
}

impl SmtpSession {
    /// Create a new SMTP session in the `Connect` state
    pub fn new(line_separator: &str) -> Self {
        Self {
            state: SmtpState::Connect,
            message: Message::new(line_separator),
            line_separator: line_separator.to_owned(),
        }
    }

    pub fn state(&self) -> SmtpState {
        self.state
    }

    /// Execute the connect pseudo-command and return the greeting
    pub fn greet(&mut self) -> SmtpResponse {
        let response = SmtpCommand::Stateful(StatefulCommand::Connect).execute(self.state);
        self.state = response.next_state;
        response
    }

    /// Feed one input line (without its terminator).
    ///
    /// Returns the response and, when the line terminated DATA, the finished
    /// message. The message must be stored before the response is sent.
    pub fn process_line(&mut self, line: &str) -> (SmtpResponse, Option<Message>) {
        self.process_bytes(line.as_bytes())
    }

    /// Like [`process_line`](Self::process_line) for a line as read from the
    /// wire. The line is classified on its UTF-8 text; DATA lines reach the
    /// message byte for byte.
    pub fn process_bytes(&mut self, line: &[u8]) -> (SmtpResponse, Option<Message>) {
        let request = SmtpRequest::parse(&String::from_utf8_lossy(line), self.state);
        let response = request.execute();
        let previous = mem::replace(&mut self.state, response.next_state);

        // In DATA the parameter is the whole line
        self.message.store(&response, request.params.is_some().then_some(line));

        let completed = if previous.in_data() && self.state == SmtpState::Quit {
            Some(self.take_message())
        } else {
            if self.state == SmtpState::Connect {
                self.message = Message::new(&self.line_separator);
            }
            None
        };

        (response, completed)
    }

    /// Whether a partially received message would be lost if the client left now
    pub fn has_pending_message(&self) -> bool {
        self.state.in_data()
    }

    fn take_message(&mut self) -> Message {
        mem::replace(&mut self.message, Message::new(&self.line_separator))
    }
}

impl Default for SmtpSession {
    fn default() -> Self {
        Self::new(crate::smtp::config::DEFAULT_LINE_SEPARATOR)
    }
}
