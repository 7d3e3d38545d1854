//! Tails a chat room: joins it, then prints every message and presence
//! change until Ctrl-C.
//!
//! Configuration comes from the environment:
//!
//! | Variable             | Default     |
//! |----------------------|-------------|
//! | `RALLYPOINT_HOST`    | `127.0.0.1` |
//! | `RALLYPOINT_PORT`    | `7350`      |
//! | `RALLYPOINT_SSL`     | `false`     |
//! | `RALLYPOINT_TOKEN`   | (required)  |
//! | `RALLYPOINT_CHANNEL` | `lobby`     |
//!
//! Log verbosity follows `RUST_LOG` (default `info`).

use std::collections::HashMap;

use futures_util::StreamExt;
use rallypoint::prelude::*;
use tracing_subscriber::EnvFilter;

fn env_or(name: &str, default: &str) -> String {
    std::env::var(name).unwrap_or_else(|_| default.to_string())
}

fn config_from_env() -> Result<ClientConfig, Box<dyn std::error::Error>> {
    Ok(ClientConfig {
        host: env_or("RALLYPOINT_HOST", "127.0.0.1"),
        port: env_or("RALLYPOINT_PORT", "7350").parse()?,
        ssl: env_or("RALLYPOINT_SSL", "false").parse()?,
        ..ClientConfig::default()
    })
}

/// Renders the JSON object carried in a chat message's content.
fn render_content(content: &str) -> String {
    match serde_json::from_str::<HashMap<String, serde_json::Value>>(content) {
        Ok(fields) => match fields.get("message").or_else(|| fields.get("text")) {
            Some(serde_json::Value::String(text)) => text.clone(),
            _ => content.to_string(),
        },
        Err(_) => content.to_string(),
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let token = std::env::var("RALLYPOINT_TOKEN").map_err(|_| "RALLYPOINT_TOKEN is not set")?;
    let room = env_or("RALLYPOINT_CHANNEL", "lobby");

    let client = ClientBuilder::from_config(config_from_env()?)
        .on_disconnect(|reason| tracing::info!(%reason, "disconnected"))
        .connect(&token)
        .await?;

    // Subscribe before joining so the join's own presence event is seen.
    let mut messages = client.subscribe::<ChannelMessage>().await?;
    let mut presence = client.subscribe::<ChannelPresenceEvent>().await?;

    let channel = client.join_channel(&room, ChannelType::Room, false, false).await?;
    tracing::info!(channel = %channel.id, present = channel.presences.len(), "joined");

    loop {
        tokio::select! {
            Some(message) = messages.next() => {
                if message.channel_id == channel.id {
                    println!("<{}> {}", message.username, render_content(&message.content));
                }
            }
            Some(event) = presence.next() => {
                for user in &event.joins {
                    println!("* {} joined", user.username);
                }
                for user in &event.leaves {
                    println!("* {} left", user.username);
                }
            }
            _ = tokio::signal::ctrl_c() => {
                tracing::info!("leaving");
                if let Err(e) = client.leave_channel(&channel.id).await {
                    tracing::warn!(error = %e, "leave failed");
                }
                client.close().await;
                break;
            }
            reason = client.closed() => {
                tracing::warn!(%reason, "server went away");
                break;
            }
        }
    }

    Ok(())
}
