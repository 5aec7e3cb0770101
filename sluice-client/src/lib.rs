//! Sluice SQS Client
//!
//! A [`QueueClient`] backed by Amazon SQS through `aws-sdk-sqs`. Credentials,
//! region and endpoint come from the standard AWS environment unless
//! overridden with [`SqsOptions`].
//!
//! # Example
//!
//! ```no_run
//! use sluice_client::{SqsOptions, SqsQueueClient};
//!
//! # async fn example() {
//! // Local SQS-compatible endpoint, e.g. LocalStack or ElasticMQ
//! let options = SqsOptions::new()
//!     .region("us-east-1")
//!     .endpoint("http://localhost:4566");
//!
//! let client = SqsQueueClient::connect(&options).await;
//! # }
//! ```

mod delete;
pub mod error;
mod receive;

// Re-export commonly used types
pub use error::{ClientError, Result};

use async_trait::async_trait;
use aws_config::BehaviorVersion;
use aws_sdk_sqs::config::Region;
use sluice_core::{Message, QueueClient, ReceiveRequest, TransportError};
use tracing::debug;

/// Overrides applied on top of the AWS environment configuration
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SqsOptions {
    /// AWS region, e.g. "eu-west-1"
    pub region: Option<String>,
    /// Custom endpoint URL for SQS-compatible services
    pub endpoint: Option<String>,
}

impl SqsOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn region(mut self, region: impl Into<String>) -> Self {
        self.region = Some(region.into());
        self
    }

    pub fn endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = Some(endpoint.into());
        self
    }
}

/// SQS implementation of [`QueueClient`]
///
/// Cheap to clone; clones share the underlying connection pool.
#[derive(Debug, Clone)]
pub struct SqsQueueClient {
    client: aws_sdk_sqs::Client,
}

impl SqsQueueClient {
    /// Wrap an already configured SDK client
    pub fn new(client: aws_sdk_sqs::Client) -> Self {
        Self { client }
    }

    /// Build a client from the default AWS environment
    pub async fn from_env() -> Self {
        Self::connect(&SqsOptions::default()).await
    }

    /// Build a client from the AWS environment with the given overrides
    ///
    /// Loading the configuration does not contact SQS; credentials are
    /// resolved lazily on the first request.
    pub async fn connect(options: &SqsOptions) -> Self {
        let mut loader = aws_config::defaults(BehaviorVersion::latest());

        if let Some(region) = &options.region {
            loader = loader.region(Region::new(region.clone()));
        }
        if let Some(endpoint) = &options.endpoint {
            loader = loader.endpoint_url(endpoint);
        }

        let config = loader.load().await;
        debug!(
            region = ?config.region(),
            endpoint = ?options.endpoint,
            "Loaded AWS configuration"
        );

        Self::new(aws_sdk_sqs::Client::new(&config))
    }

    /// The underlying SDK client
    pub fn inner(&self) -> &aws_sdk_sqs::Client {
        &self.client
    }
}

#[async_trait]
impl QueueClient for SqsQueueClient {
    async fn receive(
        &self,
        request: &ReceiveRequest,
    ) -> std::result::Result<Vec<Message>, TransportError> {
        Ok(self.receive_messages(request).await?)
    }

    async fn delete(
        &self,
        queue_url: &str,
        message: &Message,
    ) -> std::result::Result<(), TransportError> {
        Ok(self.delete_message(queue_url, message).await?)
    }

    async fn delete_batch(
        &self,
        queue_url: &str,
        messages: &[Message],
    ) -> std::result::Result<(), TransportError> {
        Ok(self.delete_messages(queue_url, messages).await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_options_builder() {
        let options = SqsOptions::new()
            .region("eu-west-1")
            .endpoint("http://localhost:9324");

        assert_eq!(options.region.as_deref(), Some("eu-west-1"));
        assert_eq!(options.endpoint.as_deref(), Some("http://localhost:9324"));
        assert_eq!(SqsOptions::default(), SqsOptions::new());
    }

    #[tokio::test]
    async fn test_connect_applies_overrides() {
        let options = SqsOptions::new()
            .region("eu-west-1")
            .endpoint("http://localhost:9324");

        let client = SqsQueueClient::connect(&options).await;
        let config = client.inner().config();

        assert_eq!(config.region().map(|r| r.as_ref()), Some("eu-west-1"));
    }
}
