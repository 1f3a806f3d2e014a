use std::sync::Arc;

use anyhow::{Context, Result};
use empathlens::config::Settings;
use empathlens::services::Responder;
use empathlens::triage::{CheckInRequest, InferRequest, TriageReply, TriageService};
use serde::Deserialize;
use serde_json::{json, Value};
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing_subscriber::EnvFilter;

/// One request per stdin line.
#[derive(Debug, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
enum Command {
    Infer(InferRequest),
    CheckIn(CheckInRequest),
    Stop { chat_id: String },
    End { chat_id: String },
    Poll { chat_id: String },
    CanIntervene { chat_id: String },
    Health,
}

#[tokio::main]
async fn main() -> Result<()> {
    // stdout carries replies, so logs go to stderr
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(std::io::stderr)
        .init();

    let settings = Settings::from_env().context("invalid EMPATHLENS_* configuration")?;
    let sweep_every = settings.sweep_interval();
    let responder = Responder::new(&settings);
    let service = Arc::new(TriageService::new(settings)?);

    tracing::info!("empathlens ready, reading JSON lines from stdin");

    let shutdown = CancellationToken::new();
    let sweeper = tokio::spawn(sweep_loop(service.clone(), sweep_every, shutdown.clone()));

    let (line_tx, mut line_rx) = mpsc::channel::<String>(100);
    let reader = tokio::spawn(async move {
        let mut lines = BufReader::new(tokio::io::stdin()).lines();
        while let Ok(Some(line)) = lines.next_line().await {
            if line_tx.send(line).await.is_err() {
                break;
            }
        }
    });

    let mut stdout = tokio::io::stdout();
    loop {
        tokio::select! {
            line = line_rx.recv() => {
                let Some(line) = line else { break };
                if line.trim().is_empty() {
                    continue;
                }
                let out = handle_line(&service, &responder, &line).await;
                stdout.write_all(out.to_string().as_bytes()).await?;
                stdout.write_all(b"\n").await?;
                stdout.flush().await?;
            }
            _ = tokio::signal::ctrl_c() => {
                tracing::info!("interrupt received, shutting down");
                break;
            }
        }
    }

    shutdown.cancel();
    reader.abort();
    sweeper.await.context("sweeper task panicked")?;
    tracing::info!(active_sessions = service.active_sessions(), "empathlens stopped");
    Ok(())
}

async fn sweep_loop(service: Arc<TriageService>, every: std::time::Duration, shutdown: CancellationToken) {
    let mut ticker = tokio::time::interval(every);
    ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
    // the first tick fires immediately
    ticker.tick().await;

    loop {
        tokio::select! {
            _ = ticker.tick() => {
                let removed = service.sweep_expired();
                if removed > 0 {
                    tracing::debug!(removed, "sweeper evicted idle sessions");
                }
            }
            _ = shutdown.cancelled() => break,
        }
    }
}

async fn handle_line(service: &TriageService, responder: &Responder, line: &str) -> Value {
    let command: Command = match serde_json::from_str(line) {
        Ok(command) => command,
        Err(err) => return json!({ "error": format!("malformed request: {err}"), "client_error": true }),
    };

    let result = match command {
        Command::Infer(request) => match service.infer(&request) {
            Ok(reply) => Ok(deliver(service, responder, reply).await),
            Err(err) => Err(err),
        },
        Command::CheckIn(request) => match service.check_in(&request) {
            Ok(reply) => Ok(deliver(service, responder, reply).await),
            Err(err) => Err(err),
        },
        Command::Stop { chat_id } => match service.stop(&chat_id) {
            Ok(reply) => Ok(deliver(service, responder, reply).await),
            Err(err) => Err(err),
        },
        Command::End { chat_id } => service
            .end_session(&chat_id)
            .map(|ended| json!({ "chat_id": chat_id, "ended": ended })),
        Command::Poll { chat_id } => match service.poll_check_in(&chat_id) {
            Ok(Some(reply)) => Ok(deliver(service, responder, reply).await),
            Ok(None) => Ok(json!({ "chat_id": chat_id, "check_in": null })),
            Err(err) => Err(err),
        },
        Command::CanIntervene { chat_id } => service
            .can_intervene(&chat_id)
            .map(|allowed| json!({ "chat_id": chat_id, "can_intervene": allowed })),
        Command::Health => Ok(json!(service.health())),
    };

    result.unwrap_or_else(|err| json!({ "error": err.to_string(), "client_error": err.is_client_error() }))
}

async fn deliver(service: &TriageService, responder: &Responder, reply: TriageReply) -> Value {
    let delivery = responder.deliver(reply).await;
    for collaborator in delivery.fallbacks {
        service.record_fallback(collaborator);
    }
    json!(delivery.reply)
}
