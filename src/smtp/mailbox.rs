//! Thread-safe store of received messages

use std::mem;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use crate::smtp::message::Message;

/// Append-only collection of completed messages shared between the server
/// thread and any number of readers.
///
/// Cloning yields another handle to the same store. Messages are shared, so
/// a snapshot only copies pointers while the lock is held.
#[derive(Debug, Clone, Default)]
pub struct Mailbox {
    messages: Arc<Mutex<Vec<Arc<Message>>>>,
}

impl Mailbox {
    pub fn new() -> Self {
        Self::default()
    }

    // The vector is never left half-updated, so a poisoned lock is still usable
    fn lock(&self) -> MutexGuard<'_, Vec<Arc<Message>>> {
        self.messages.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Store a completed message
    pub fn append(&self, message: Message) {
        let message = Arc::new(message);
        self.lock().push(message);
    }

    /// Point-in-time copy of every stored message, in arrival order
    pub fn snapshot(&self) -> Vec<Arc<Message>> {
        self.lock().clone()
    }

    pub fn count(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    /// Remove every stored message; snapshots already taken are unaffected
    pub fn clear(&self) {
        self.lock().clear();
    }

    /// Remove and return every stored message in one step
    pub fn take(&self) -> Vec<Arc<Message>> {
        mem::take(&mut *self.lock())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::smtp::response::SmtpResponse;
    use crate::smtp::session::SmtpState;
    use std::thread;

    fn message_with_subject(subject: &str) -> Message {
        let mut message = Message::new("\r\n");
        message.store(
            &SmtpResponse::silent(SmtpState::DataHeader),
            Some(format!("Subject: {subject}").as_bytes()),
        );
        message
    }

    #[test]
    fn test_append_and_snapshot_in_order() {
        let mailbox = Mailbox::new();
        assert!(mailbox.is_empty());

        mailbox.append(message_with_subject("one"));
        mailbox.append(message_with_subject("two"));

        let snapshot = mailbox.snapshot();
        assert_eq!(mailbox.count(), 2);
        assert_eq!(snapshot[0].subject(), Some("one"));
        assert_eq!(snapshot[1].subject(), Some("two"));
    }

    #[test]
    fn test_snapshot_is_stable() {
        let mailbox = Mailbox::new();
        mailbox.append(message_with_subject("one"));

        let snapshot = mailbox.snapshot();
        mailbox.append(message_with_subject("two"));
        assert_eq!(snapshot.len(), 1);

        // Both snapshots point at the same stored message
        assert!(Arc::ptr_eq(&snapshot[0], &mailbox.snapshot()[0]));

        mailbox.clear();
        assert_eq!(mailbox.count(), 0);
        assert_eq!(snapshot.len(), 1);
        assert_eq!(snapshot[0].subject(), Some("one"));
    }

    #[test]
    fn test_clones_share_storage() {
        let mailbox = Mailbox::new();
        let other = mailbox.clone();

        other.append(message_with_subject("shared"));
        assert_eq!(mailbox.count(), 1);
    }

    #[test]
    fn test_take_drains() {
        let mailbox = Mailbox::new();
        mailbox.append(message_with_subject("one"));
        mailbox.append(message_with_subject("two"));

        let taken = mailbox.take();
        assert_eq!(taken.len(), 2);
        assert!(mailbox.is_empty());
    }

    #[test]
    fn test_concurrent_appends_and_reads() {
        let mailbox = Mailbox::new();

        let writers: Vec<_> = (0..4)
            .map(|writer| {
                let mailbox = mailbox.clone();
                thread::spawn(move || {
                    for i in 0..50 {
                        mailbox.append(message_with_subject(&format!("{writer}-{i}")));
                    }
                })
            })
            .collect();

        let reader = {
            let mailbox = mailbox.clone();
            thread::spawn(move || {
                for _ in 0..100 {
                    let snapshot = mailbox.snapshot();
                    assert!(snapshot.len() <= mailbox.count());
                }
            })
        };

        for writer in writers {
            writer.join().unwrap();
        }
        reader.join().unwrap();

        assert_eq!(mailbox.count(), 200);
        assert_eq!(mailbox.snapshot().len(), 200);
    }
}
