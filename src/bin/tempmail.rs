//! Terminal client for the disposable-mailbox service.
//!
//! Mints `<name>@<domain>`, then keeps a 1-second countdown and a 5-second
//! inbox poll running until the mailbox expires or Ctrl-C releases it.

use std::collections::HashSet;
use std::time::Duration;

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use uuid::Uuid;

use lorza_mail::services::lifecycle::{format_countdown, MailboxLifecycle, Tick};
use lorza_mail::storage::api::ApiStore;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "warn".into()),
        ))
        .with(tracing_subscriber::fmt::layer())
        .init();

    let Some(local_part) = std::env::args().nth(1) else {
        eprintln!("usage: tempmail <name>");
        eprintln!("       mints <name>@<domain> on the server and watches the inbox");
        std::process::exit(2);
    };

    let base_url = std::env::var("TEMPMAIL_SERVER")
        .unwrap_or_else(|_| "http://127.0.0.1:3000".to_string());

    let store = std::sync::Arc::new(ApiStore::new(base_url)?);
    let mut lifecycle = MailboxLifecycle::new(store, 600);

    let mailbox = lifecycle.generate(&local_part).await?;
    println!("📬 Your temporary address: {}", mailbox.address);
    println!("   Valid for {}. Waiting for mail...", format_countdown(600));

    let mut seen: HashSet<Uuid> = HashSet::new();

    // Both timers live exactly as long as the session: they start here and
    // die together when the loop exits.
    let mut countdown = tokio::time::interval(Duration::from_secs(1));
    let mut poller = tokio::time::interval(Duration::from_secs(5));
    countdown.tick().await;
    poller.tick().await;

    loop {
        tokio::select! {
            _ = countdown.tick() => {
                match lifecycle.tick().await {
                    Tick::Expired => {
                        println!("⏰ Your temporary mail expired and was removed.");
                        break;
                    }
                    Tick::Running(left) => {
                        if left % 60 == 0 || left <= 10 {
                            println!("   {} left", format_countdown(left));
                        }
                    }
                    Tick::Idle => break,
                }
            }
            _ = poller.tick() => {
                match lifecycle.poll().await {
                    Ok(messages) => {
                        for message in messages.iter().rev() {
                            if seen.insert(message.id) {
                                let sender = message
                                    .sender_name
                                    .as_deref()
                                    .unwrap_or(&message.sender_email);
                                println!();
                                println!("✉️  From: {} <{}>", sender, message.sender_email);
                                println!("   Subject: {}", message.subject);
                                println!("   Received: {}", message.format_received());
                                println!("   {}", message.preview());
                            }
                        }
                    }
                    Err(e) => {
                        tracing::warn!("Inbox poll failed: {}", e);
                    }
                }
            }
            _ = tokio::signal::ctrl_c() => {
                lifecycle.regenerate().await;
                println!();
                println!("👋 Address released.");
                break;
            }
        }
    }

    Ok(())
}
