//! Server configuration

use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::time::Duration;

/// Well-known SMTP port
pub const DEFAULT_SMTP_PORT: u16 = 25;

/// Line separator used to join body lines unless configured otherwise
pub const DEFAULT_LINE_SEPARATOR: &str = "\r\n";

/// How long `stop` waits for the listener thread to acknowledge shutdown
pub const STOP_TIMEOUT: Duration = Duration::from_secs(5);

/// Settings for one server instance
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SmtpConfig {
    /// Address to listen on
    pub host: IpAddr,
    /// Port to listen on; 0 lets the OS pick a free one
    pub port: u16,
    /// Separator placed between body lines of received messages
    pub line_separator: String,
    /// When false, dropping the server handle waits for the listener thread
    /// instead of stopping it
    pub background: bool,
    pub stop_timeout: Duration,
}

impl SmtpConfig {
    pub fn socket_addr(&self) -> SocketAddr {
        SocketAddr::new(self.host, self.port)
    }
}

impl Default for SmtpConfig {
    fn default() -> Self {
        Self {
            host: IpAddr::V4(Ipv4Addr::UNSPECIFIED),
            port: DEFAULT_SMTP_PORT,
            line_separator: DEFAULT_LINE_SEPARATOR.to_owned(),
            background: true,
            stop_timeout: STOP_TIMEOUT,
        }
    }
}
