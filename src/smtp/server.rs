//! SMTP server implementation

use crate::smtp::config::SmtpConfig;
use crate::smtp::error::SmtpError;
use crate::smtp::mailbox::Mailbox;
use crate::smtp::message::Message;
use crate::smtp::response::SmtpResponse;
use crate::smtp::session::{SmtpSession, SmtpState};

use std::io::{BufRead, BufReader, Write};
use std::net::{IpAddr, Ipv4Addr, Ipv6Addr, Shutdown, SocketAddr, TcpListener, TcpStream};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, mpsc};
use std::thread::{self, JoinHandle};
use std::time::Duration;

use tracing::{debug, info, trace, warn};

/// How long `stop` spends trying to wake a listener blocked in `accept`
const WAKE_TIMEOUT: Duration = Duration::from_secs(1);

/// A configured server that has not been started yet
#[derive(Debug, Clone, Default)]
pub struct SmtpServer {
    config: SmtpConfig,
}

impl SmtpServer {
    /// Create a server with the default configuration (port 25, all interfaces)
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_config(config: SmtpConfig) -> Self {
        Self { config }
    }

    pub fn host(mut self, host: IpAddr) -> Self {
        self.config.host = host;
        self
    }

    pub fn port(mut self, port: u16) -> Self {
        self.config.port = port;
        self
    }

    pub fn line_separator(mut self, separator: &str) -> Self {
        self.config.line_separator = separator.to_owned();
        self
    }

    pub fn background(mut self, background: bool) -> Self {
        self.config.background = background;
        self
    }

    pub fn stop_timeout(mut self, timeout: Duration) -> Self {
        self.config.stop_timeout = timeout;
        self
    }

    pub fn config(&self) -> &SmtpConfig {
        &self.config
    }

    /// Bind the listener and start serving on a dedicated thread.
    ///
    /// Blocks until the bind has either succeeded or failed; a bind failure
    /// is returned here.
    pub fn start(self) -> Result<ServerHandle, SmtpError> {
        let addr = self.config.socket_addr();
        let mailbox = Mailbox::new();
        let shared = Arc::new(Shared::default());
        let (ready_tx, ready_rx) = mpsc::sync_channel(1);
        let (done_tx, done_rx) = mpsc::channel::<()>();

        let thread = thread::Builder::new()
            .name("mailcatch-listener".to_owned())
            .spawn({
                let mailbox = mailbox.clone();
                let shared = Arc::clone(&shared);
                let separator = self.config.line_separator.clone();
                move || {
                    run_listener(addr, ready_tx, &shared, &mailbox, &separator);
                    shared.stopped.store(true, Ordering::SeqCst);
                    // Closing the channel tells `stop` the loop has exited
                    drop(done_tx);
                }
            })?;

        match ready_rx.recv() {
            Ok(Ok(local_addr)) => Ok(ServerHandle {
                local_addr,
                mailbox,
                shared,
                done: Some(done_rx),
                thread: Some(thread),
                background: self.config.background,
                stop_timeout: self.config.stop_timeout,
            }),
            Ok(Err(source)) => {
                let _ = thread.join();
                Err(SmtpError::Bind { addr, source })
            }
            Err(_) => Err(SmtpError::StartupAborted),
        }
    }
}

/// Start a background server on `port` with the default settings
pub fn start(port: u16) -> Result<ServerHandle, SmtpError> {
    SmtpServer::new().port(port).start()
}

/// State shared between the handle and the listener thread
#[derive(Debug, Default)]
struct Shared {
    shutdown: AtomicBool,
    stopped: AtomicBool,
    /// The connection currently being served, so `stop` can unblock its read
    active: Mutex<Option<TcpStream>>,
}

impl Shared {
    fn active(&self) -> MutexGuard<'_, Option<TcpStream>> {
        self.active.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// A running server. Stopped explicitly with [`ServerHandle::stop`], or on
/// drop when configured to run in the background.
#[derive(Debug)]
pub struct ServerHandle {
    local_addr: SocketAddr,
    mailbox: Mailbox,
    shared: Arc<Shared>,
    done: Option<mpsc::Receiver<()>>,
    thread: Option<JoinHandle<()>>,
    background: bool,
    stop_timeout: Duration,
}

impl ServerHandle {
    /// Address the listener is bound to
    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    pub fn port(&self) -> u16 {
        self.local_addr.port()
    }

    /// Shared handle to the store of received messages
    pub fn mailbox(&self) -> Mailbox {
        self.mailbox.clone()
    }

    /// Snapshot of the messages received so far
    pub fn received_messages(&self) -> Vec<Arc<Message>> {
        self.mailbox.snapshot()
    }

    pub fn received_count(&self) -> usize {
        self.mailbox.count()
    }

    pub fn clear_received_messages(&self) {
        self.mailbox.clear();
    }

    /// Whether the listener thread has exited
    pub fn is_stopped(&self) -> bool {
        self.shared.stopped.load(Ordering::SeqCst)
    }

    /// A handle that can stop this server from another thread, for example
    /// while this one is blocked in [`wait`](Self::wait)
    pub fn stop_handle(&self) -> StopHandle {
        StopHandle {
            local_addr: self.local_addr,
            shared: Arc::clone(&self.shared),
        }
    }

    /// Stop accepting connections and close the listener.
    ///
    /// Waits up to the configured stop timeout for the listener thread;
    /// received messages are kept.
    pub fn stop(&mut self) {
        let Some(done) = self.done.take() else {
            return;
        };

        self.stop_handle().stop();

        match done.recv_timeout(self.stop_timeout) {
            Err(mpsc::RecvTimeoutError::Timeout) => {
                warn!(addr = %self.local_addr, "SMTP listener did not stop in time");
            }
            _ => {
                if let Some(thread) = self.thread.take() {
                    let _ = thread.join();
                }
            }
        }
    }

    /// Block until the listener thread exits
    pub fn wait(mut self) {
        if let Some(thread) = self.thread.take() {
            let _ = thread.join();
        }
        self.done = None;
    }
}

/// Stops a running server without owning its [`ServerHandle`]
#[derive(Debug, Clone)]
pub struct StopHandle {
    local_addr: SocketAddr,
    shared: Arc<Shared>,
}

impl StopHandle {
    /// Ask the listener to exit and drop the connection being served.
    ///
    /// Returns without waiting; the thread holding the [`ServerHandle`]
    /// sees the exit through `wait`, `stop` or drop.
    pub fn stop(&self) {
        self.shared.shutdown.store(true, Ordering::SeqCst);
        if let Some(stream) = self.shared.active().as_ref() {
            let _ = stream.shutdown(Shutdown::Both);
        }
        self.wake_listener();
    }

    pub fn is_stopped(&self) -> bool {
        self.shared.stopped.load(Ordering::SeqCst)
    }

    // Unblocks a pending `accept` so the loop can see the shutdown flag
    fn wake_listener(&self) {
        let mut addr = self.local_addr;
        if addr.ip().is_unspecified() {
            let loopback: IpAddr = match addr {
                SocketAddr::V4(_) => Ipv4Addr::LOCALHOST.into(),
                SocketAddr::V6(_) => Ipv6Addr::LOCALHOST.into(),
            };
            addr.set_ip(loopback);
        }
        let _ = TcpStream::connect_timeout(&addr, WAKE_TIMEOUT);
    }
}

impl Drop for ServerHandle {
    fn drop(&mut self) {
        if self.background {
            self.stop();
        } else if let Some(thread) = self.thread.take() {
            let _ = thread.join();
        }
    }
}

fn run_listener(
    addr: SocketAddr,
    ready: mpsc::SyncSender<std::io::Result<SocketAddr>>,
    shared: &Shared,
    mailbox: &Mailbox,
    line_separator: &str,
) {
    let listener = match TcpListener::bind(addr).and_then(|listener| {
        let local_addr = listener.local_addr()?;
        Ok((listener, local_addr))
    }) {
        Ok((listener, local_addr)) => {
            info!(addr = %local_addr, "SMTP server listening");
            let _ = ready.send(Ok(local_addr));
            listener
        }
        Err(e) => {
            let _ = ready.send(Err(e));
            return;
        }
    };

    for stream in listener.incoming() {
        let stream = match stream {
            Ok(stream) => stream,
            Err(e) => {
                if shared.shutdown.load(Ordering::SeqCst) {
                    break;
                }
                warn!(error = %e, "Error accepting connection");
                continue;
            }
        };

        {
            let mut active = shared.active();
            if shared.shutdown.load(Ordering::SeqCst) {
                break;
            }
            *active = stream.try_clone().ok();
        }

        debug!(peer = ?stream.peer_addr().ok(), "Accepted connection");
        if let Err(e) = handle_client(stream, mailbox, line_separator) {
            warn!(error = %e, "Error handling client");
        }
        shared.active().take();
    }

    info!(addr = %addr, "SMTP server stopped");
}

/// Serve one connection until QUIT or end of stream
fn handle_client(
    mut stream: TcpStream,
    mailbox: &Mailbox,
    line_separator: &str,
) -> Result<(), SmtpError> {
    let mut session = SmtpSession::new(line_separator);
    let mut reader = BufReader::new(stream.try_clone()?);

    send_response(&mut stream, &session.greet())?;

    let mut line_buffer = Vec::new();
    while session.state() != SmtpState::Connect {
        line_buffer.clear();
        if reader.read_until(b'\n', &mut line_buffer)? == 0 {
            if session.has_pending_message() {
                debug!("Client disconnected during DATA, message discarded");
            } else {
                debug!("Client disconnected");
            }
            return Ok(());
        }

        let line = line_buffer.strip_suffix(b"\n").unwrap_or(&line_buffer);
        let line = line.strip_suffix(b"\r").unwrap_or(line);

        let state = session.state();
        let (response, message) = session.process_bytes(line);
        trace!(
            %state,
            next = %response.next_state,
            code = response.code,
            line = %String::from_utf8_lossy(line),
            "Processed line"
        );

        // Stored before replying, so the client sees it once its send returns
        if let Some(message) = message {
            mailbox.append(message);
            debug!(count = mailbox.count(), "Stored message");
        }

        if !response.is_silent() {
            send_response(&mut stream, &response)?;
        }
    }

    debug!("Session closed");
    Ok(())
}

/// Send a response to the client
fn send_response(stream: &mut TcpStream, response: &SmtpResponse) -> Result<(), SmtpError> {
    stream.write_all(response.format().as_bytes())?;
    stream.flush()?;
    Ok(())
}
