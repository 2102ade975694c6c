//! Terminal rendering of snapshots.
use std::io::Write;

use anyhow::Result;

use crate::Client;
use crate::chat::{ExchangeHandle, ExchangeOutcome, Message, MessageState, Role};
use crate::core::Snapshot;
use crate::session::Session;

pub fn format_session(session: &Session, active: bool) -> String {
    format!(
        "{} {}  {}  {}",
        if active { "*" } else { " " },
        session.id,
        session.file_name,
        session.created_at.format("%Y-%m-%d %H:%M")
    )
}

pub fn format_message(msg: &Message) -> String {
    match (msg.role, msg.state) {
        (Role::User, _) => format!("you> {}", msg.content),
        (Role::Assistant, _) => msg.content.clone(),
        (Role::System, MessageState::Failed) => format!("[error] {}", msg.content),
        (Role::System, _) => format!("[{}]", msg.content),
    }
}

pub fn print_sessions(sessions: &[Session], active_id: Option<&str>) {
    if sessions.is_empty() {
        println!("No sessions yet. Upload a document to start one.");
        return;
    }
    for session in sessions {
        println!(
            "{}",
            format_session(session, active_id == Some(session.id.as_str()))
        );
    }
}

pub fn print_transcript(messages: &[Message]) {
    for msg in messages {
        println!("{}", format_message(msg));
    }
}

/// Tracks how much of the answer being streamed has been printed
#[derive(Debug, Default)]
pub struct AnswerPrinter {
    printed: usize,
}

impl AnswerPrinter {
    /// The characters of the latest answer not yet printed
    pub fn next_chunk(&mut self, snapshot: &Snapshot) -> Option<String> {
        let last = snapshot.transcript.last()?;
        if last.role != Role::Assistant {
            return None;
        }
        let count = last.content.chars().count();
        if count <= self.printed {
            return None;
        }
        let chunk = last.content.chars().skip(self.printed).collect();
        self.printed = count;
        Some(chunk)
    }
}

/// Print the answer as it streams in. Ctrl-C cancels the exchange.
pub async fn stream_answer(client: &Client, handle: ExchangeHandle) -> Result<ExchangeOutcome> {
    let mut rx = client.subscribe();
    let mut printer = AnswerPrinter::default();
    let mut stdout = std::io::stdout();

    let wait = handle.wait();
    tokio::pin!(wait);

    let outcome = loop {
        tokio::select! {
            outcome = &mut wait => break outcome,
            changed = rx.changed() => {
                if changed.is_err() {
                    break (&mut wait).await;
                }
                let chunk = printer.next_chunk(&rx.borrow_and_update());
                if let Some(chunk) = chunk {
                    write!(stdout, "{}", chunk)?;
                    stdout.flush()?;
                }
            }
            _ = tokio::signal::ctrl_c() => {
                client.chat().cancel();
            }
        }
    };

    // Whatever arrived between the last change and completion
    if let Some(chunk) = printer.next_chunk(&client.snapshot()) {
        write!(stdout, "{}", chunk)?;
    }
    writeln!(stdout)?;

    match &outcome {
        ExchangeOutcome::Completed(_) => {}
        ExchangeOutcome::Failed(e) => eprintln!("[error] {}", e.user_message()),
        ExchangeOutcome::Cancelled => eprintln!("[cancelled]"),
    }
    Ok(outcome)
}
