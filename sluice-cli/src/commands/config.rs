//! Config command handler

use anyhow::{Context, Result};
use colored::*;
use sluice_poller::PollerConfig;

use crate::config::QueueArgs;

/// Print the configuration the poller would run with
pub fn handle_config_command(queue: &QueueArgs, json: bool) -> Result<()> {
    let config = queue
        .poller_builder()
        .config()
        .context("Invalid poller configuration")?;

    if json {
        let rendered =
            serde_json::to_string_pretty(queue).context("Failed to serialize configuration")?;
        println!("{}", rendered);
        return Ok(());
    }

    print_config(&config, queue);
    Ok(())
}

fn print_config(config: &PollerConfig, queue: &QueueArgs) {
    println!("{}", "Poller configuration".bold());
    println!("  Queue URL:          {}", config.queue_url.cyan());
    println!(
        "  Endpoint:           {}",
        queue.endpoint.as_deref().unwrap_or("(AWS default)").dimmed()
    );
    println!(
        "  Region:             {}",
        queue.region.as_deref().unwrap_or("(AWS default)").dimmed()
    );
    println!("  Max messages:       {}", config.max_messages);
    println!("  Attribute names:    {}", config.attribute_names.join(", "));
    println!("  Visibility timeout: {}s", config.visibility_timeout);
    println!("  Wait time:          {}s", config.wait_time_seconds);
    println!("  Polling delay:      {:?}", config.polling_delay);
    println!("  Shutdown timeout:   {:?}", config.shutdown_timeout);
}
