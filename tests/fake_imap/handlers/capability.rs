//! CAPABILITY command handler.
//!
//! Advertises `IMAP4rev1 STARTTLS AUTH=ANONYMOUS` plus whatever the
//! test mailbox adds (e.g. `UNSELECT`, RFC 3691).

use crate::fake_imap::io::{respond, write_line};
use crate::fake_imap::mailbox::Mailbox;
use tokio::io::{AsyncRead, AsyncWrite, BufReader};

/// Handle the CAPABILITY command.
pub async fn handle_capability<S: AsyncRead + AsyncWrite + Unpin>(
    tag: &str,
    mailbox: &Mailbox,
    stream: &mut BufReader<S>,
) {
    let mut line = String::from("* CAPABILITY IMAP4rev1 STARTTLS AUTH=ANONYMOUS");
    for capability in &mailbox.capabilities {
        line.push(' ');
        line.push_str(capability);
    }
    line.push_str("\r\n");

    let _ = write_line(stream, &line).await;
    let _ = respond(stream, tag, "OK CAPABILITY completed").await;
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fake_imap::io::capture;
    use crate::fake_imap::mailbox::MailboxBuilder;

    async fn run(tag: &str, mailbox: &Mailbox) -> String {
        capture(|mut stream| async move {
            handle_capability(tag, mailbox, &mut stream).await;
            (stream, ())
        })
        .await
        .0
    }

    #[tokio::test]
    async fn sends_base_capabilities() {
        let output = run("A1", &MailboxBuilder::new().build()).await;
        assert!(output.contains("* CAPABILITY IMAP4rev1 STARTTLS AUTH=ANONYMOUS\r\n"));
        assert!(output.contains("A1 OK CAPABILITY completed"));
    }

    #[tokio::test]
    async fn appends_mailbox_capabilities() {
        let mailbox = MailboxBuilder::new().capability("UNSELECT").build();
        let output = run("A2", &mailbox).await;
        assert!(output.contains("AUTH=ANONYMOUS UNSELECT\r\n"));
    }
}
