//! LIST command handler.
//!
//! Responds with one `* LIST` line per folder, followed by the tagged
//! OK (RFC 3501 Section 7.2.2):
//!
//! ```text
//! * LIST (\HasNoChildren) "/" "INBOX"
//! * LIST (\HasNoChildren) "/" "Sent"
//! A0002 OK LIST completed
//! ```

use crate::fake_imap::io::{respond, write_line};
use crate::fake_imap::mailbox::Mailbox;
use tokio::io::{AsyncRead, AsyncWrite, BufReader};

/// Handle the LIST command. Emits one `* LIST` line per folder.
pub async fn handle_list<S: AsyncRead + AsyncWrite + Unpin>(
    tag: &str,
    mailbox: &Mailbox,
    stream: &mut BufReader<S>,
) {
    for folder in &mailbox.folders {
        let line = format!("* LIST (\\HasNoChildren) \"/\" \"{}\"\r\n", folder.name);
        if write_line(stream, &line).await.is_err() {
            return;
        }
    }
    let _ = respond(stream, tag, "OK LIST completed").await;
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fake_imap::io::capture;
    use crate::fake_imap::mailbox::MailboxBuilder;

    async fn run(tag: &str, mailbox: &Mailbox) -> String {
        capture(|mut stream| async move {
            handle_list(tag, mailbox, &mut stream).await;
            (stream, ())
        })
        .await
        .0
    }

    #[tokio::test]
    async fn lists_all_folders_then_ok() {
        let mailbox = MailboxBuilder::new().folder("INBOX").folder("Sent").build();
        let output = run("T1", &mailbox).await;

        assert!(output.starts_with("* LIST (\\HasNoChildren) \"/\" \"INBOX\"\r\n"));
        assert!(output.contains("\"Sent\""));
        assert!(output.ends_with("T1 OK LIST completed\r\n"));
    }

    #[tokio::test]
    async fn empty_mailbox_returns_only_ok() {
        let output = run("T2", &MailboxBuilder::new().build()).await;
        assert_eq!(output, "T2 OK LIST completed\r\n");
    }
}
