// Retrying wrapper around any topology source

use async_trait::async_trait;

use super::{
    AttachmentFilter, AttachmentSummary, GatewayFilter, GatewaySummary, RouteFilter,
    RouteTableSummary, TopologySource,
};
use crate::error::{RetryConfig, RouterResult, retry_with_backoff};
use crate::routes::Route;

/// Retries retryable source failures with exponential backoff.
pub struct RetryingSource<S> {
    inner: S,
    config: RetryConfig,
}

impl<S: TopologySource> RetryingSource<S> {
    pub fn new(inner: S, config: RetryConfig) -> Self {
        RetryingSource { inner, config }
    }

    pub fn inner(&self) -> &S {
        &self.inner
    }
}

#[async_trait]
impl<S: TopologySource> TopologySource for RetryingSource<S> {
    async fn list_gateways(&self, filter: &GatewayFilter) -> RouterResult<Vec<GatewaySummary>> {
        retry_with_backoff(|| self.inner.list_gateways(filter), &self.config, "list gateways").await
    }

    async fn list_route_tables(&self, gateway_ids: &[String]) -> RouterResult<Vec<RouteTableSummary>> {
        retry_with_backoff(
            || self.inner.list_route_tables(gateway_ids),
            &self.config,
            "list route tables",
        )
        .await
    }

    async fn search_routes(
        &self,
        route_table_id: &str,
        filter: &RouteFilter,
    ) -> RouterResult<Vec<Route>> {
        let operation = format!("search routes in {}", route_table_id);
        retry_with_backoff(
            || self.inner.search_routes(route_table_id, filter),
            &self.config,
            &operation,
        )
        .await
    }

    async fn list_attachments(&self, filter: &AttachmentFilter) -> RouterResult<Vec<AttachmentSummary>> {
        retry_with_backoff(
            || self.inner.list_attachments(filter),
            &self.config,
            "list attachments",
        )
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::RouterError;
    use std::sync::atomic::{AtomicU32, Ordering};

    /// Fails the first `failures` calls to `list_gateways`.
    struct FlakySource {
        failures: u32,
        calls: AtomicU32,
    }

    #[async_trait]
    impl TopologySource for FlakySource {
        async fn list_gateways(&self, _filter: &GatewayFilter) -> RouterResult<Vec<GatewaySummary>> {
            let call = self.calls.fetch_add(1, Ordering::SeqCst);
            if call < self.failures {
                return Err(RouterError::Source("throttled".to_string()));
            }
            Ok(vec![GatewaySummary {
                id: "tgw-1".to_string(),
                tags: vec![],
            }])
        }

        async fn list_route_tables(&self, _gateway_ids: &[String]) -> RouterResult<Vec<RouteTableSummary>> {
            Ok(vec![])
        }

        async fn search_routes(
            &self,
            route_table_id: &str,
            _filter: &RouteFilter,
        ) -> RouterResult<Vec<Route>> {
            Err(RouterError::RouteTableNotFound(route_table_id.to_string()))
        }

        async fn list_attachments(&self, _filter: &AttachmentFilter) -> RouterResult<Vec<AttachmentSummary>> {
            Ok(vec![])
        }
    }

    fn fast_retry(max_attempts: u32) -> RetryConfig {
        RetryConfig {
            max_attempts,
            initial_delay_ms: 1,
            max_delay_ms: 2,
            backoff_multiplier: 2.0,
        }
    }

    #[tokio::test]
    async fn test_retries_transient_failures() {
        let source = RetryingSource::new(
            FlakySource {
                failures: 2,
                calls: AtomicU32::new(0),
            },
            fast_retry(3),
        );

        let gateways = source.list_gateways(&GatewayFilter::all()).await.unwrap();
        assert_eq!(gateways.len(), 1);
        assert_eq!(source.inner().calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_gives_up_after_max_attempts() {
        let source = RetryingSource::new(
            FlakySource {
                failures: 5,
                calls: AtomicU32::new(0),
            },
            fast_retry(2),
        );

        assert!(source.list_gateways(&GatewayFilter::all()).await.is_err());
        assert_eq!(source.inner().calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_does_not_retry_permanent_errors() {
        let source = RetryingSource::new(
            FlakySource {
                failures: 0,
                calls: AtomicU32::new(0),
            },
            fast_retry(5),
        );

        let result = source.search_routes("tgw-rtb-1", &RouteFilter::default()).await;
        assert!(matches!(result, Err(RouterError::RouteTableNotFound(_))));
    }
}
