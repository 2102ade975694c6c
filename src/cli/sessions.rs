use std::path::Path;

use anyhow::Result;

use super::render::{print_sessions, print_transcript};
use crate::Client;
use crate::api::Document;
use crate::core::AppConfig;

pub async fn list(config: &AppConfig) -> Result<()> {
    let client = Client::from_config(config);
    let sessions = client.sessions().refresh().await?;
    print_sessions(&sessions, None);
    Ok(())
}

pub async fn upload(config: &AppConfig, file: &Path, session_id: Option<&str>) -> Result<()> {
    let client = Client::from_config(config);
    let doc = Document::from_path(file).await?;
    client.sessions().refresh().await?;

    match session_id {
        Some(id) => {
            client.sessions().switch(id).await?;
            client.sessions().augment(&doc).await?;
            println!("Added {} to session {}", doc.file_name, id);
        }
        None => {
            let session = client.sessions().create(&doc).await?;
            println!("Created session {} for {}", session.id, session.file_name);
        }
    }
    Ok(())
}

pub async fn messages(config: &AppConfig, id: &str) -> Result<()> {
    let client = Client::from_config(config);
    client.sessions().refresh().await?;
    client.sessions().switch(id).await?;
    print_transcript(&client.snapshot().transcript);
    Ok(())
}

pub async fn delete(config: &AppConfig, id: &str) -> Result<()> {
    let client = Client::from_config(config);
    client.sessions().delete(id).await?;
    println!("Deleted session {}", id);
    Ok(())
}
