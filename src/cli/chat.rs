use anyhow::Result;
use rustyline::DefaultEditor;
use rustyline::error::ReadlineError;

use super::render::{print_sessions, print_transcript, stream_answer};
use crate::Client;
use crate::api::Document;
use crate::core::{AppConfig, ClientError};
use crate::session::SessionState;

const HELP: &str = "\
/sessions         list sessions
/switch <id>      open another session
/new              leave the current session
/upload <path>    start a new session from a document
/add <path>       add a document to the current session
/delete <id>      delete a session
/help             show this message
/quit             exit
Anything else is sent as a question to the current session.";

#[derive(Debug, PartialEq)]
pub enum ReplCommand {
    Sessions,
    Switch(String),
    New,
    Upload(String),
    Add(String),
    Delete(String),
    Help,
    Quit,
    Ask(String),
    Invalid(String),
}

impl ReplCommand {
    pub fn parse(line: &str) -> Self {
        let line = line.trim();
        if !line.starts_with('/') {
            return Self::Ask(line.to_string());
        }

        let (cmd, arg) = match line.split_once(char::is_whitespace) {
            Some((cmd, arg)) => (cmd, arg.trim()),
            None => (line, ""),
        };
        let with_arg = |f: fn(String) -> Self| {
            if arg.is_empty() {
                Self::Invalid(format!("{} needs an argument", cmd))
            } else {
                f(arg.to_string())
            }
        };

        match cmd {
            "/sessions" => Self::Sessions,
            "/switch" => with_arg(Self::Switch),
            "/new" => Self::New,
            "/upload" => with_arg(Self::Upload),
            "/add" => with_arg(Self::Add),
            "/delete" => with_arg(Self::Delete),
            "/help" => Self::Help,
            "/quit" | "/exit" => Self::Quit,
            _ => Self::Invalid(format!("Unknown command {}", cmd)),
        }
    }
}

fn report(err: &ClientError) {
    eprintln!("[error] {}", err.user_message());
}

fn prompt(client: &Client) -> String {
    match client.sessions().state() {
        SessionState::Active(session) => format!("{}> ", session.file_name),
        SessionState::Uploading => "uploading> ".to_string(),
        SessionState::Idle => ">>> ".to_string(),
    }
}

async fn handle(client: &Client, command: ReplCommand) -> Result<bool> {
    let sessions = client.sessions();
    let result = match command {
        ReplCommand::Quit => return Ok(false),
        ReplCommand::Help => {
            println!("{}", HELP);
            Ok(())
        }
        ReplCommand::Invalid(reason) => {
            eprintln!("{}", reason);
            Ok(())
        }
        ReplCommand::Sessions => sessions.refresh().await.map(|listing| {
            let active = sessions.active().map(|s| s.id);
            print_sessions(&listing, active.as_deref());
        }),
        ReplCommand::Switch(id) => sessions.switch(&id).await.map(|()| {
            print_transcript(&client.snapshot().transcript);
        }),
        ReplCommand::New => {
            sessions.new_chat();
            println!("Upload a document with /upload <path> to start a new chat.");
            Ok(())
        }
        ReplCommand::Upload(path) => match Document::from_path(&path).await {
            Ok(doc) => sessions.create(&doc).await.map(|_| {
                print_transcript(&client.snapshot().transcript);
            }),
            Err(e) => Err(e),
        },
        ReplCommand::Add(path) => match Document::from_path(&path).await {
            Ok(doc) => sessions.augment(&doc).await.map(|()| {
                if let Some(msg) = client.snapshot().transcript.last() {
                    println!("{}", super::render::format_message(msg));
                }
            }),
            Err(e) => Err(e),
        },
        ReplCommand::Delete(id) => sessions.delete(&id).await.map(|()| {
            println!("Deleted session {}", id);
        }),
        ReplCommand::Ask(question) => match client.chat().send(&question) {
            Ok(exchange) => {
                stream_answer(client, exchange).await?;
                Ok(())
            }
            Err(e) => Err(e),
        },
    };

    if let Err(e) = result {
        report(&e);
    }
    Ok(true)
}

pub async fn run(config: &AppConfig, session_id: Option<&str>) -> Result<()> {
    let client = Client::from_config(config);
    let mut rl = DefaultEditor::new()?;

    match client.sessions().refresh().await {
        Ok(listing) => print_sessions(&listing, None),
        Err(e) => report(&e),
    }
    if let Some(id) = session_id {
        handle(&client, ReplCommand::Switch(id.to_string())).await?;
    }
    println!("Type /help for commands.");

    loop {
        let readline = rl.readline(&prompt(&client));
        match readline {
            Ok(line) => {
                if line.trim().is_empty() {
                    continue;
                }
                rl.add_history_entry(line.as_str())?;
                if !handle(&client, ReplCommand::parse(&line)).await? {
                    break;
                }
            }
            Err(ReadlineError::Interrupted) => break,
            Err(ReadlineError::Eof) => break,
            Err(err) => {
                println!("Error: {:?}", err);
                break;
            }
        }
    }

    Ok(())
}
