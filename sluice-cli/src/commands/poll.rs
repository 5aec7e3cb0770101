//! Poll command handler
//!
//! Runs a poller that prints every message it receives and acknowledges it,
//! then stops gracefully on Ctrl-C.

use anyhow::{Context, Result};
use clap::Args;
use colored::*;
use sluice_client::SqsQueueClient;
use sluice_core::Message;
use sluice_poller::{HandlerResult, Handlers, Poller, PollerError, TracingObserver};
use std::sync::Arc;
use tokio::sync::broadcast::{Receiver, error::RecvError};
use tracing::{info, warn};

use crate::config::QueueArgs;

#[derive(Debug, Clone, Copy, Args)]
pub struct PollArgs {
    /// Hand whole batches to the handler instead of single messages
    #[arg(long)]
    batch: bool,

    /// Print message bodies as JSON documents
    #[arg(long)]
    json: bool,

    /// Log every lifecycle event at debug level
    #[arg(long)]
    trace_events: bool,
}

/// Consume the queue until Ctrl-C
pub async fn handle_poll_command(args: PollArgs, queue: &QueueArgs) -> Result<()> {
    let client = SqsQueueClient::connect(&queue.sqs_options()).await;

    let mut builder = queue.poller_builder().client(Arc::new(client));
    if args.trace_events {
        builder = builder.observer(TracingObserver);
    }
    let poller = builder.build().context("Failed to create poller")?;

    let errors = tokio::spawn(report_errors(poller.subscribe_errors()));

    poller
        .start(handlers(args))
        .context("Failed to start poller")?;

    println!(
        "{} {} {}",
        "Polling".green().bold(),
        poller.config().queue_url.cyan(),
        "(Ctrl-C to stop)".dimmed()
    );

    tokio::signal::ctrl_c()
        .await
        .context("Failed to listen for Ctrl-C")?;

    info!("Interrupt received, stopping poller");
    let drained = poller.stop().await;
    errors.abort();

    if drained {
        println!("{}", "Stopped.".green());
    } else {
        println!(
            "{}",
            format!(
                "Stopped with {} message(s) still in flight; they will be redelivered.",
                poller.in_flight()
            )
            .yellow()
        );
    }

    Ok(())
}

fn handlers(args: PollArgs) -> Handlers {
    let json = args.json;

    if args.batch {
        Handlers::new().each_batch(move |messages: Vec<Message>| async move {
            println!(
                "{}",
                format!("Batch of {} message(s)", messages.len()).bold()
            );
            for message in &messages {
                print_message(message, json)?;
            }
            HandlerResult::Ok(())
        })
    } else {
        Handlers::new().each_message(move |message: Message| async move {
            print_message(&message, json)?;
            HandlerResult::Ok(())
        })
    }
}

fn print_message(message: &Message, json: bool) -> serde_json::Result<()> {
    if json {
        println!("{}", serde_json::to_string(message)?);
        return Ok(());
    }

    println!("  {} Message {}", "▸".cyan(), message.message_id.bold());
    match &message.body {
        Some(body) => println!("    {}", body),
        None => println!("    {}", "(no body)".dimmed()),
    }

    Ok(())
}

/// Print every error the poller publishes until the channel closes
async fn report_errors(mut errors: Receiver<Arc<PollerError>>) {
    loop {
        match errors.recv().await {
            Ok(error) => eprintln!("{} {}", "error:".red().bold(), error),
            Err(RecvError::Lagged(skipped)) => {
                warn!(skipped, "Error reporter fell behind");
            }
            Err(RecvError::Closed) => break,
        }
    }
}
