//! Received message data structures

use std::fmt;

use mailparse::ParsedMail;

use crate::smtp::error::SmtpError;
use crate::smtp::response::SmtpResponse;
use crate::smtp::session::SmtpState;

/// A message received by the server: headers, body and the raw lines as sent
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Message {
    /// Header name/value pairs in the order received, duplicates kept
    headers: Vec<(String, String)>,
    body: String,
    body_line_count: usize,
    raw: Vec<u8>,
    line_separator: String,
}

impl Message {
    pub(crate) fn new(line_separator: &str) -> Self {
        Self {
            headers: Vec::new(),
            body: String::new(),
            body_line_count: 0,
            raw: Vec::new(),
            line_separator: line_separator.to_owned(),
        }
    }

    /// Update headers or body from one DATA line.
    ///
    /// `params` is the line as received, without its terminator; lines that
    /// carry no parameter (such as the terminator or the header/body blank
    /// line) change nothing. Header and body text are decoded lossily, the
    /// raw message keeps the bytes untouched.
    pub(crate) fn store(&mut self, response: &SmtpResponse, params: Option<&[u8]>) {
        let Some(line) = params else {
            return;
        };

        match response.next_state {
            SmtpState::DataHeader => {
                self.raw.extend_from_slice(line);
                self.raw.extend_from_slice(self.line_separator.as_bytes());

                // Lines without a colon are kept in the raw message only
                let text = String::from_utf8_lossy(line);
                if let Some((name, value)) = text.split_once(':') {
                    self.headers.push((name.trim().to_owned(), value.trim().to_owned()));
                }
            }
            SmtpState::DataBody => {
                // Before the first body line this is the header/body blank line
                self.raw.extend_from_slice(self.line_separator.as_bytes());
                if self.body_line_count > 0 {
                    self.body.push_str(&self.line_separator);
                }
                self.raw.extend_from_slice(line);
                self.body.push_str(&String::from_utf8_lossy(line));
                self.body_line_count += 1;
            }
            _ => {}
        }
    }

    /// All headers in the order received
    pub fn headers(&self) -> &[(String, String)] {
        &self.headers
    }

    /// First value of the named header, matched case-insensitively
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(key, _)| key.eq_ignore_ascii_case(name))
            .map(|(_, value)| value.as_str())
    }

    /// Every value of the named header, in the order received
    pub fn header_values(&self, name: &str) -> Vec<&str> {
        self.headers
            .iter()
            .filter(|(key, _)| key.eq_ignore_ascii_case(name))
            .map(|(_, value)| value.as_str())
            .collect()
    }

    pub fn subject(&self) -> Option<&str> {
        self.header("Subject")
    }

    /// Whether the Content-Type header announces a multipart message
    pub fn is_multipart(&self) -> bool {
        self.header("Content-Type")
            .is_some_and(|value| value.to_ascii_lowercase().contains("multipart"))
    }

    /// Body lines joined with the configured line separator
    pub fn body(&self) -> &str {
        &self.body
    }

    pub fn body_line_count(&self) -> usize {
        self.body_line_count
    }

    /// Header and body lines exactly as received, for a MIME parser
    pub fn raw_bytes(&self) -> &[u8] {
        &self.raw
    }

    /// The raw message as text, invalid UTF-8 replaced
    pub fn raw_message(&self) -> String {
        String::from_utf8_lossy(&self.raw).into_owned()
    }

    /// Parse the raw message into its MIME structure (parts, attachments)
    pub fn parse(&self) -> Result<ParsedMail<'_>, SmtpError> {
        Ok(mailparse::parse_mail(&self.raw)?)
    }
}

impl fmt::Display for Message {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (name, value) in &self.headers {
            writeln!(f, "{name}: {value}")?;
        }
        writeln!(f)?;
        writeln!(f, "{}", self.body)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mailparse::MailHeaderMap;

    fn header_line(message: &mut Message, line: &str) {
        message.store(&SmtpResponse::silent(SmtpState::DataHeader), Some(line.as_bytes()));
    }

    fn body_line(message: &mut Message, line: &str) {
        body_bytes(message, line.as_bytes());
    }

    fn body_bytes(message: &mut Message, line: &[u8]) {
        message.store(&SmtpResponse::silent(SmtpState::DataBody), Some(line));
    }

    #[test]
    fn test_headers_keep_order_and_duplicates() {
        let mut message = Message::new("\r\n");
        header_line(&mut message, "foo: 1");
        header_line(&mut message, "Subject:  spaced  ");
        header_line(&mut message, "foo: 2");

        assert_eq!(message.header_values("foo"), vec!["1", "2"]);
        assert_eq!(message.header("FOO"), Some("1"));
        assert_eq!(message.subject(), Some("spaced"));
        assert_eq!(message.headers()[1], ("Subject".to_owned(), "spaced".to_owned()));
    }

    #[test]
    fn test_header_value_split_on_first_colon() {
        let mut message = Message::new("\r\n");
        header_line(&mut message, "X-Time: 12:30:00");
        assert_eq!(message.header("X-Time"), Some("12:30:00"));
    }

    #[test]
    fn test_malformed_header_kept_in_raw_only() {
        let mut message = Message::new("\n");
        header_line(&mut message, "no colon here");

        assert!(message.headers().is_empty());
        assert_eq!(message.raw_bytes(), b"no colon here\n");
    }

    #[test]
    fn test_body_joined_with_separator() {
        let mut message = Message::new("\n");
        for line in ["first", "", "", "last"] {
            body_line(&mut message, line);
        }

        assert_eq!(message.body(), "first\n\n\nlast");
        assert_eq!(message.body_line_count(), 4);
    }

    #[test]
    fn test_raw_bytes_mark_header_body_boundary() {
        let mut message = Message::new("\r\n");
        header_line(&mut message, "Subject: hi");
        body_line(&mut message, "line one");
        body_line(&mut message, "line two");

        assert_eq!(
            message.raw_message(),
            "Subject: hi\r\n\r\nline one\r\nline two"
        );
    }

    #[test]
    fn test_missing_params_change_nothing() {
        let mut message = Message::new("\r\n");
        message.store(&SmtpResponse::ok(SmtpState::Quit), None);
        message.store(&SmtpResponse::silent(SmtpState::DataBody), None);

        assert_eq!(message, Message::new("\r\n"));
    }

    #[test]
    fn test_lines_outside_data_are_ignored() {
        let mut message = Message::new("\r\n");
        message.store(&SmtpResponse::ok(SmtpState::Rcpt), Some(b"<c@d.com>".as_slice()));
        assert!(message.raw_bytes().is_empty());
        assert!(message.headers().is_empty());
    }

    #[test]
    fn test_is_multipart() {
        let mut message = Message::new("\r\n");
        assert!(!message.is_multipart());
        header_line(&mut message, "Content-Type: Multipart/Mixed; boundary=\"b\"");
        assert!(message.is_multipart());
    }

    #[test]
    fn test_display() {
        let mut message = Message::new("\n");
        header_line(&mut message, "To: a@b.com");
        header_line(&mut message, "Subject: hi");
        body_line(&mut message, "body");

        assert_eq!(message.to_string(), "To: a@b.com\nSubject: hi\n\nbody\n");
    }

    #[test]
    fn test_parse_raw_message() {
        let mut message = Message::new("\r\n");
        header_line(&mut message, "Subject: parsed");
        header_line(&mut message, "Content-Type: text/plain");
        body_line(&mut message, "plain body");

        let parsed = message.parse().unwrap();
        assert_eq!(
            parsed.headers.get_first_value("Subject"),
            Some("parsed".to_owned())
        );
        assert_eq!(parsed.get_body().unwrap().trim_end(), "plain body");
    }

    #[test]
    fn test_raw_bytes_keep_eight_bit_body() {
        let mut message = Message::new("\r\n");
        header_line(&mut message, "Content-Type: text/plain; charset=iso-8859-1");
        header_line(&mut message, "Content-Transfer-Encoding: 8bit");
        body_bytes(&mut message, b"caf\xe9");

        assert!(message.raw_bytes().ends_with(b"\r\n\r\ncaf\xe9"));
        assert_eq!(message.body(), "caf\u{fffd}");

        let parsed = message.parse().unwrap();
        assert_eq!(parsed.get_body().unwrap(), "caf\u{e9}");
    }
}
