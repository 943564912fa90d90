// Error types for Transit Gateway route resolution and path walking

use std::net::IpAddr;
use thiserror::Error;

/// Main error type for the crate
#[derive(Error, Debug)]
pub enum RouterError {
    #[error("Failed to parse CIDR {cidr:?}: {source}")]
    Parse {
        cidr: String,
        #[source]
        source: ipnet::AddrParseError,
    },

    #[error("No route to {destination} in route table {route_table}")]
    RouteNotFound {
        route_table: String,
        destination: IpAddr,
    },

    #[error("No attachment found for {0}")]
    NoAttachmentFound(IpAddr),

    #[error("Attachment {0} is already in the path")]
    AttachmentAlreadyInPath(String),

    #[error("Route table not found: {0}")]
    RouteTableNotFound(String),

    #[error("Topology source error: {0}")]
    Source(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Configuration error: {0}")]
    Config(String),
}

/// Result type alias using RouterError
pub type RouterResult<T> = Result<T, RouterError>;

impl RouterError {
    /// Convert error to user-friendly message
    pub fn user_message(&self) -> String {
        match self {
            RouterError::Parse { cidr, .. } => {
                format!("Route data contains an invalid CIDR ({}). Re-sync the topology.", cidr)
            }
            RouterError::RouteNotFound { destination, .. } => {
                format!("No route covers {}. The packet would be dropped inside the gateway.", destination)
            }
            RouterError::NoAttachmentFound(ip) => {
                format!("No attachment is directly connected to {}. Check the address belongs to an attached network.", ip)
            }
            RouterError::AttachmentAlreadyInPath(id) => {
                format!("Routing loop detected at attachment {}.", id)
            }
            RouterError::RouteTableNotFound(id) => {
                format!("Could not resolve the route table for {}. The attachment may be unassociated.", id)
            }
            RouterError::Source(_) => {
                "Failed to read topology data. Check the topology source and try again.".to_string()
            }
            RouterError::Io(_) => {
                "File system error. Check permissions and disk space.".to_string()
            }
            RouterError::Serialization(_) => {
                "Data format error. The snapshot or topology file may be corrupt.".to_string()
            }
            RouterError::Config(_) => {
                "Configuration error. Check your config file or command-line arguments.".to_string()
            }
        }
    }

    /// Check if error is retryable
    pub fn is_retryable(&self) -> bool {
        matches!(self, RouterError::Source(_))
    }
}

/// Retry configuration
#[derive(Debug, Clone)]
pub struct RetryConfig {
    pub max_attempts: u32,
    pub initial_delay_ms: u64,
    pub max_delay_ms: u64,
    pub backoff_multiplier: f64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        RetryConfig {
            max_attempts: 3,
            initial_delay_ms: 100,
            max_delay_ms: 5000,
            backoff_multiplier: 2.0,
        }
    }
}

impl RetryConfig {
    /// Calculate delay for a given attempt number
    pub fn delay_for_attempt(&self, attempt: u32) -> u64 {
        let delay = (self.initial_delay_ms as f64)
            * self.backoff_multiplier.powi(attempt as i32);
        delay.min(self.max_delay_ms as f64) as u64
    }
}

/// Retry a fallible operation with exponential backoff.
///
/// Only errors for which `RouterError::is_retryable` holds are retried;
/// anything else is returned on the first failure.
pub async fn retry_with_backoff<F, Fut, T>(
    mut operation: F,
    config: &RetryConfig,
    operation_name: &str,
) -> RouterResult<T>
where
    F: FnMut() -> Fut,
    Fut: std::future::Future<Output = RouterResult<T>>,
{
    let mut attempt = 0;

    loop {
        match operation().await {
            Ok(result) => {
                if attempt > 0 {
                    tracing::info!(
                        "{} succeeded after {} attempt(s)",
                        operation_name,
                        attempt + 1
                    );
                }
                return Ok(result);
            }
            Err(e) => {
                attempt += 1;

                if !e.is_retryable() || attempt >= config.max_attempts {
                    tracing::error!(
                        "{} failed after {} attempt(s): {}",
                        operation_name,
                        attempt,
                        e
                    );
                    return Err(e);
                }

                let delay = config.delay_for_attempt(attempt - 1);
                tracing::warn!(
                    "{} failed (attempt {}/{}): {}. Retrying in {}ms...",
                    operation_name,
                    attempt,
                    config.max_attempts,
                    e,
                    delay
                );

                tokio::time::sleep(tokio::time::Duration::from_millis(delay)).await;
            }
        }
    }
}
