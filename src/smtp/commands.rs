//! Command classification and the SMTP state machine

use std::fmt;

use crate::smtp::response::SmtpResponse;
use crate::smtp::session::SmtpState;

/// Commands whose reply does not depend on the session state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatelessCommand {
    Rset,
    Vrfy,
    Expn,
    Help,
    Noop,
}

/// Commands whose reply and next state depend on the session state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatefulCommand {
    /// Pseudo-command executed when a client connects
    Connect,
    /// `EHLO` or `HELO`
    Ehlo,
    Mail,
    Rcpt,
    Data,
    /// The lone `.` line ending DATA
    DataEnd,
    Quit,
    /// Anything else, including header and body lines during DATA
    Unrecognized,
    /// Empty line separating headers from body
    BlankLine,
}

/// A classified client command
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SmtpCommand {
    Stateless(StatelessCommand),
    Stateful(StatefulCommand),
}

impl SmtpCommand {
    /// Every command, used to walk the transition table
    pub const ALL: [SmtpCommand; 14] = [
        SmtpCommand::Stateless(StatelessCommand::Rset),
        SmtpCommand::Stateless(StatelessCommand::Vrfy),
        SmtpCommand::Stateless(StatelessCommand::Expn),
        SmtpCommand::Stateless(StatelessCommand::Help),
        SmtpCommand::Stateless(StatelessCommand::Noop),
        SmtpCommand::Stateful(StatefulCommand::Connect),
        SmtpCommand::Stateful(StatefulCommand::Ehlo),
        SmtpCommand::Stateful(StatefulCommand::Mail),
        SmtpCommand::Stateful(StatefulCommand::Rcpt),
        SmtpCommand::Stateful(StatefulCommand::Data),
        SmtpCommand::Stateful(StatefulCommand::DataEnd),
        SmtpCommand::Stateful(StatefulCommand::Quit),
        SmtpCommand::Stateful(StatefulCommand::Unrecognized),
        SmtpCommand::Stateful(StatefulCommand::BlankLine),
    ];

    /// Run the state machine for this command in `state`.
    ///
    /// Pure: the outcome depends only on the command and the state.
    pub fn execute(self, state: SmtpState) -> SmtpResponse {
        use SmtpState::*;
        use StatefulCommand as C;

        match self {
            SmtpCommand::Stateless(command) => match command {
                StatelessCommand::Rset => SmtpResponse::ok(Greet),
                StatelessCommand::Vrfy | StatelessCommand::Expn => {
                    SmtpResponse::new(252, "Not supported", state)
                }
                StatelessCommand::Help => SmtpResponse::new(211, "No help available", state),
                StatelessCommand::Noop => SmtpResponse::ok(state),
            },
            SmtpCommand::Stateful(command) => match (command, state) {
                (C::Connect, Connect) => SmtpResponse::greeting(),
                (C::Ehlo, Greet) => SmtpResponse::ok(Mail),
                (C::Mail, Mail | Quit) => SmtpResponse::ok(Rcpt),
                (C::Rcpt, Rcpt) => SmtpResponse::ok(Rcpt),
                (C::Data, Rcpt) => SmtpResponse::data_start(),
                (C::Unrecognized, DataHeader | DataBody) => SmtpResponse::silent(state),
                (C::Unrecognized, _) => SmtpResponse::unrecognized(state),
                (C::DataEnd, DataHeader | DataBody) => SmtpResponse::ok(Quit),
                (C::BlankLine, DataHeader | DataBody) => SmtpResponse::silent(DataBody),
                (C::Quit, Quit) => SmtpResponse::quit(),
                _ => SmtpResponse::bad_sequence(self, state),
            },
        }
    }
}

impl fmt::Display for SmtpCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            SmtpCommand::Stateless(StatelessCommand::Rset) => "RSET",
            SmtpCommand::Stateless(StatelessCommand::Vrfy) => "VRFY",
            SmtpCommand::Stateless(StatelessCommand::Expn) => "EXPN",
            SmtpCommand::Stateless(StatelessCommand::Help) => "HELP",
            SmtpCommand::Stateless(StatelessCommand::Noop) => "NOOP",
            SmtpCommand::Stateful(StatefulCommand::Connect) => "Connect",
            SmtpCommand::Stateful(StatefulCommand::Ehlo) => "EHLO",
            SmtpCommand::Stateful(StatefulCommand::Mail) => "MAIL",
            SmtpCommand::Stateful(StatefulCommand::Rcpt) => "RCPT",
            SmtpCommand::Stateful(StatefulCommand::Data) => "DATA",
            SmtpCommand::Stateful(StatefulCommand::DataEnd) => ".",
            SmtpCommand::Stateful(StatefulCommand::Quit) => "QUIT",
            SmtpCommand::Stateful(StatefulCommand::Unrecognized) => "Unrecognized command",
            SmtpCommand::Stateful(StatefulCommand::BlankLine) => "Blank line",
        };
        f.write_str(name)
    }
}

/// Keyword prefixes tried in order outside of DATA, with the parameter offset
/// for the ones that carry one.
const KEYWORDS: [(&str, SmtpCommand, Option<usize>); 11] = [
    ("EHLO ", SmtpCommand::Stateful(StatefulCommand::Ehlo), Some(5)),
    ("HELO", SmtpCommand::Stateful(StatefulCommand::Ehlo), Some(5)),
    ("MAIL FROM:", SmtpCommand::Stateful(StatefulCommand::Mail), Some(10)),
    ("RCPT TO:", SmtpCommand::Stateful(StatefulCommand::Rcpt), Some(8)),
    ("DATA", SmtpCommand::Stateful(StatefulCommand::Data), None),
    ("QUIT", SmtpCommand::Stateful(StatefulCommand::Quit), None),
    ("RSET", SmtpCommand::Stateless(StatelessCommand::Rset), None),
    ("NOOP", SmtpCommand::Stateless(StatelessCommand::Noop), None),
    ("EXPN", SmtpCommand::Stateless(StatelessCommand::Expn), None),
    ("VRFY", SmtpCommand::Stateless(StatelessCommand::Vrfy), None),
    ("HELP", SmtpCommand::Stateless(StatelessCommand::Help), None),
];

/// One client line classified under the state it arrived in
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SmtpRequest {
    pub command: SmtpCommand,
    /// Remainder of the line after the keyword, or the whole line during DATA
    pub params: Option<String>,
    pub state: SmtpState,
}

impl SmtpRequest {
    pub fn new(command: SmtpCommand, params: Option<String>, state: SmtpState) -> Self {
        Self {
            command,
            params,
            state,
        }
    }

    /// Classify a line (without its line terminator) received in `state`.
    ///
    /// Parameters are not validated.
    pub fn parse(line: &str, state: SmtpState) -> Self {
        let (command, params) = match state {
            SmtpState::DataHeader => match line {
                "." => (SmtpCommand::Stateful(StatefulCommand::DataEnd), None),
                "" => (SmtpCommand::Stateful(StatefulCommand::BlankLine), None),
                _ => (
                    SmtpCommand::Stateful(StatefulCommand::Unrecognized),
                    Some(line.to_owned()),
                ),
            },
            SmtpState::DataBody => match line {
                "." => (SmtpCommand::Stateful(StatefulCommand::DataEnd), None),
                _ => (
                    SmtpCommand::Stateful(StatefulCommand::Unrecognized),
                    Some(line.to_owned()),
                ),
            },
            _ => Self::parse_keyword(line),
        };

        Self::new(command, params, state)
    }

    fn parse_keyword(line: &str) -> (SmtpCommand, Option<String>) {
        let upper = line.to_ascii_uppercase();

        KEYWORDS
            .iter()
            .find(|(keyword, _, _)| upper.starts_with(keyword))
            .map(|&(_, command, offset)| {
                // HELO with no argument is shorter than the offset
                let params = offset.map(|at| line.get(at..).unwrap_or_default().to_owned());
                (command, params)
            })
            .unwrap_or((SmtpCommand::Stateful(StatefulCommand::Unrecognized), None))
    }

    /// Execute the classified command against the state it arrived in
    pub fn execute(&self) -> SmtpResponse {
        self.command.execute(self.state)
    }
}
