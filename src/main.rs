use mailcatch::{DEFAULT_LINE_SEPARATOR, DEFAULT_SMTP_PORT, SmtpServer};
use std::env;
use std::thread;
use std::time::Duration;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

const POLL_INTERVAL: Duration = Duration::from_millis(100);

fn main() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    let args: Vec<String> = env::args().collect();

    let port = match args.get(1).map(|arg| arg.parse::<u16>()) {
        Some(Ok(port)) => port,
        Some(Err(e)) => {
            error!("Invalid port {:?}: {e}", args[1]);
            std::process::exit(2);
        }
        None => DEFAULT_SMTP_PORT,
    };

    let separator = match args.get(2).map(String::as_str) {
        Some("lf") => "\n",
        Some("crlf") | None => DEFAULT_LINE_SEPARATOR,
        Some(other) => other,
    };

    let server = match SmtpServer::new()
        .port(port)
        .line_separator(separator)
        .background(false)
        .start()
    {
        Ok(server) => server,
        Err(e) => {
            error!("Failed to start server: {e}");
            std::process::exit(1);
        }
    };

    info!(addr = %server.local_addr(), "Waiting for mail");

    let mailbox = server.mailbox();
    let printer = thread::Builder::new()
        .name("mailcatch-printer".to_owned())
        .spawn(move || {
            loop {
                thread::sleep(POLL_INTERVAL);
                for message in mailbox.take() {
                    println!("{}", "-".repeat(64));
                    println!();
                    println!("{message}");
                }
            }
        });
    if let Err(e) = printer {
        error!("Failed to start printer thread: {e}");
        std::process::exit(1);
    }

    // Runs until the listener thread exits
    server.wait();
    info!("Server stopped");
}
