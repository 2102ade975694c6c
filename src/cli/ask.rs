use anyhow::{Result, bail};

use super::render::stream_answer;
use crate::Client;
use crate::chat::ExchangeOutcome;
use crate::core::AppConfig;

pub async fn run(config: &AppConfig, session_id: &str, question: &str) -> Result<()> {
    let client = Client::from_config(config);
    client.sessions().refresh().await?;
    client.sessions().switch(session_id).await?;

    let handle = client.chat().send(question)?;
    match stream_answer(&client, handle).await? {
        ExchangeOutcome::Completed(_) => Ok(()),
        ExchangeOutcome::Failed(e) => bail!(e),
        ExchangeOutcome::Cancelled => bail!("Cancelled"),
    }
}
