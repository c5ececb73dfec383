#![deny(clippy::all)]
#![warn(clippy::pedantic)]
#![warn(clippy::nursery)]
#![allow(clippy::missing_errors_doc, clippy::missing_panics_doc)]

//! CLI for inspecting mailbox folders over a single IMAP session

use clap::{Parser, Subcommand};
use mailbox_session::{
    FolderSession, FolderStatus, ImapConnector, ImapStore, MailFolder, OpenMode, SessionConfig,
};
use serde::Serialize;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "mailbox-cli")]
#[command(about = "Inspect mailbox folders over a single IMAP session")]
struct Args {
    #[command(subcommand)]
    command: Command,

    /// Output as JSON
    #[arg(long, global = true)]
    json: bool,
}

#[derive(Subcommand)]
enum Command {
    /// List available folders
    Folders,

    /// Open one or more folders in turn and show their status
    Status {
        /// Folders to open, in order
        #[arg(required = true)]
        folders: Vec<String>,

        /// Open with SELECT instead of EXAMINE
        #[arg(long)]
        read_write: bool,
    },

    /// Open a folder read-write and close it
    Close {
        /// Folder to close
        folder: String,

        /// Permanently remove messages marked as deleted
        #[arg(long)]
        expunge: bool,
    },
}

#[derive(Serialize)]
struct StatusReport<'a> {
    folder: &'a str,
    mode: OpenMode,
    #[serde(flatten)]
    status: &'a FolderStatus,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let args = Args::parse();
    let config = SessionConfig::from_env()?;
    let session = FolderSession::connect(&ImapConnector, &config).await?;

    let result = match &args.command {
        Command::Folders => cmd_folders(&session, &args).await,
        Command::Status {
            folders,
            read_write,
        } => {
            let mode = if *read_write {
                OpenMode::ReadWrite
            } else {
                OpenMode::ReadOnly
            };
            cmd_status(&session, &args, folders, mode).await
        }
        Command::Close { folder, expunge } => cmd_close(&session, folder, *expunge).await,
    };

    session.disconnect().await;
    result
}

async fn cmd_folders(session: &FolderSession<ImapStore>, args: &Args) -> anyhow::Result<()> {
    let folders = session.list_folders().await?;

    if args.json {
        println!("{}", serde_json::to_string_pretty(&folders)?);
    } else {
        for folder in &folders {
            println!("{folder}");
        }
    }

    Ok(())
}

async fn cmd_status(
    session: &FolderSession<ImapStore>,
    args: &Args,
    folders: &[String],
    mode: OpenMode,
) -> anyhow::Result<()> {
    for name in folders {
        let folder = session.get_folder(name, mode).await?;
        let report = StatusReport {
            folder: folder.name(),
            mode,
            status: folder.status(),
        };

        if args.json {
            println!("{}", serde_json::to_string(&report)?);
        } else {
            print_status(&report);
        }
    }

    Ok(())
}

async fn cmd_close(
    session: &FolderSession<ImapStore>,
    folder: &str,
    expunge: bool,
) -> anyhow::Result<()> {
    drop(session.get_folder(folder, OpenMode::ReadWrite).await?);
    session.close_folder(expunge).await?;

    if expunge {
        println!("Closed {folder} and expunged deleted messages");
    } else {
        println!("Closed {folder}");
    }

    Ok(())
}

fn print_status(report: &StatusReport<'_>) {
    println!("Folder:       {} ({})", report.folder, report.mode);
    println!("Messages:     {}", report.status.exists);
    println!("Recent:       {}", report.status.recent);
    println!("First unseen: {}", optional(report.status.unseen));
    println!("UIDVALIDITY:  {}", optional(report.status.uid_validity));
    println!("UIDNEXT:      {}", optional(report.status.uid_next));
    println!();
}

fn optional(value: Option<u32>) -> String {
    value.map_or_else(|| "-".to_string(), |v| v.to_string())
}
