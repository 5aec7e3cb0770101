//! Configuration module
//!
//! Queue and poller options shared by every command. Each flag falls back to
//! the same environment variable `PollerBuilder::from_env` reads.

use clap::Args;
use serde::Serialize;
use sluice_client::SqsOptions;
use sluice_poller::PollerBuilder;
use std::time::Duration;

/// Queue connection and poller options
#[derive(Debug, Clone, Args, Serialize)]
pub struct QueueArgs {
    /// URL of the queue to consume
    #[arg(long, global = true, env = "SLUICE_QUEUE_URL")]
    pub queue_url: Option<String>,

    /// Custom SQS endpoint, e.g. a local SQS-compatible service
    #[arg(long, global = true, env = "SLUICE_ENDPOINT")]
    pub endpoint: Option<String>,

    /// AWS region; defaults to the AWS environment
    #[arg(long, global = true, env = "SLUICE_REGION")]
    pub region: Option<String>,

    /// Maximum number of messages per receive call
    #[arg(long, global = true, env = "SLUICE_MAX_MESSAGES", default_value_t = 10)]
    pub max_messages: u32,

    /// Message attribute names requested with each message
    #[arg(
        long,
        global = true,
        env = "SLUICE_ATTRIBUTE_NAMES",
        value_delimiter = ',',
        default_value = "All"
    )]
    pub attribute_names: Vec<String>,

    /// Seconds a received message stays hidden from other consumers
    #[arg(long, global = true, env = "SLUICE_VISIBILITY_TIMEOUT", default_value_t = 20)]
    pub visibility_timeout: u32,

    /// Long-polling wait in seconds
    #[arg(long, global = true, env = "SLUICE_WAIT_TIME_SECONDS", default_value_t = 10)]
    pub wait_time_seconds: u32,

    /// Pause between poll iterations in milliseconds
    #[arg(long, global = true, env = "SLUICE_POLLING_DELAY_MS", default_value_t = 0)]
    pub polling_delay_ms: u64,

    /// How long to wait for in-flight messages on shutdown, in milliseconds
    #[arg(long, global = true, env = "SLUICE_SHUTDOWN_TIMEOUT_MS", default_value_t = 5000)]
    pub shutdown_timeout_ms: u64,
}

impl QueueArgs {
    /// Poller builder carrying every option except the client
    pub fn poller_builder(&self) -> PollerBuilder {
        let mut builder = PollerBuilder::new()
            .max_messages(self.max_messages)
            .attribute_names(self.attribute_names.iter().cloned())
            .visibility_timeout(self.visibility_timeout)
            .wait_time_seconds(self.wait_time_seconds)
            .polling_delay(Duration::from_millis(self.polling_delay_ms))
            .shutdown_timeout(Duration::from_millis(self.shutdown_timeout_ms));

        if let Some(queue_url) = &self.queue_url {
            builder = builder.queue_url(queue_url.clone());
        }

        builder
    }

    pub fn sqs_options(&self) -> SqsOptions {
        SqsOptions {
            region: self.region.clone(),
            endpoint: self.endpoint.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;

    #[derive(Parser)]
    struct TestCli {
        #[command(flatten)]
        queue: QueueArgs,
    }

    #[test]
    fn test_defaults_match_poller_defaults() {
        let cli =
            TestCli::try_parse_from(["sluice", "--queue-url", "https://example.com/q"]).unwrap();
        let config = cli.queue.poller_builder().config().unwrap();

        assert_eq!(
            config,
            sluice_poller::PollerConfig::new("https://example.com/q")
        );
    }

    #[test]
    fn test_flags_flow_into_builder() {
        let cli = TestCli::try_parse_from([
            "sluice",
            "--queue-url",
            "https://example.com/q",
            "--max-messages",
            "5",
            "--attribute-names",
            "tenant,trace_id",
            "--polling-delay-ms",
            "250",
            "--region",
            "eu-west-1",
        ])
        .unwrap();

        let config = cli.queue.poller_builder().config().unwrap();
        assert_eq!(config.max_messages, 5);
        assert_eq!(
            config.attribute_names,
            vec!["tenant", "trace_id"]
        );
        assert_eq!(config.polling_delay, Duration::from_millis(250));

        let options = cli.queue.sqs_options();
        assert_eq!(options.region.as_deref(), Some("eu-west-1"));
        assert_eq!(options.endpoint, None);
    }
}
