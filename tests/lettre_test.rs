use lettre::message::Mailbox;
use lettre::{SmtpTransport, Transport};
use mailcatch::SmtpServer;
use std::error::Error;
use std::net::Ipv4Addr;

#[test]
fn basic_lettre_send() -> Result<(), Box<dyn Error>> {
    let mut server = SmtpServer::new()
        .host(Ipv4Addr::LOCALHOST.into())
        .port(0)
        .start()?;

    let message = lettre::Message::builder()
        .from("Sender <sender@example.com>".parse::<Mailbox>()?)
        .to("Recipient <recipient@example.com>".parse::<Mailbox>()?)
        .subject("Hello from lettre")
        .body("Sent through mailcatch".to_owned())?;

    let mailer = SmtpTransport::builder_dangerous("127.0.0.1")
        .port(server.port())
        .build();

    mailer.send(&message)?;

    // The server stores the message before acknowledging the terminator
    assert_eq!(server.received_count(), 1);

    let received = &server.received_messages()[0];
    assert_eq!(received.subject(), Some("Hello from lettre"));
    assert!(received.header("From").unwrap().contains("sender@example.com"));
    assert!(received.header("To").unwrap().contains("recipient@example.com"));
    assert_eq!(received.body().trim_end(), "Sent through mailcatch");

    // Also closes the connection lettre keeps pooled
    server.stop();
    Ok(())
}
