use anyhow::{Context, Result};
use rustytranslate::{
    app, config, logging,
    metrics::PipelineMetrics,
    translation::{ChatSession, TurnReply},
};
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};

#[tokio::main]
async fn main() {
    if let Err(err) = run().await {
        eprintln!("error: {err:#}");
        std::process::exit(1);
    }
}

async fn run() -> Result<()> {
    let config = config::load_config().context("failed to load configuration")?;
    logging::init_tracing("warn");

    let metrics = Arc::new(PipelineMetrics::new());
    let pipeline = app::build_pipeline(&config, metrics)
        .await
        .context("failed to start the translation assistant")?;
    let mut session = ChatSession::new(Arc::new(pipeline));

    let mut stdout = tokio::io::stdout();
    stdout
        .write_all(
            format!(
                "Rusty Translate ({} <-> {}). Type a sentence, Ctrl-D to quit.\n> ",
                config.languages.source_name, config.languages.target_name
            )
            .as_bytes(),
        )
        .await?;
    stdout.flush().await?;

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    while let Some(line) = lines.next_line().await? {
        let input = line.trim();
        if !input.is_empty() {
            let reply = session.handle_turn(input).await;
            let rendered = match &reply {
                TurnReply::Translated(outcome) => format!("{}\n", outcome.translation),
                TurnReply::Failed { message, .. } => format!("{message}\n"),
            };
            stdout.write_all(rendered.as_bytes()).await?;
        }
        stdout.write_all(b"> ").await?;
        stdout.flush().await?;
    }

    stdout.write_all(b"\n").await?;
    stdout.flush().await?;
    tracing::info!(turns = session.transcript().len() / 2, "Session ended");
    Ok(())
}
