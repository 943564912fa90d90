// Concurrent route fetcher: one task per route table, joined before returning

use std::sync::Arc;

use super::Gateway;
use crate::error::{RouterError, RouterResult};
use crate::topology::{RouteFilter, TopologySource};

/// Outcome of a route fetch over every route table of a gateway.
#[derive(Debug, Default)]
pub struct RouteFetchReport {
    /// Route tables whose routes were populated
    pub populated: Vec<String>,
    /// Route tables whose fetch failed, with the error each one hit
    pub failures: Vec<(String, RouterError)>,
}

impl RouteFetchReport {
    pub fn is_complete(&self) -> bool {
        self.failures.is_empty()
    }

    /// Collapse into a single result naming every failed route table.
    pub fn into_result(self) -> RouterResult<()> {
        if self.failures.is_empty() {
            return Ok(());
        }
        let details: Vec<String> = self
            .failures
            .iter()
            .map(|(id, e)| format!("{}: {}", id, e))
            .collect();
        Err(RouterError::Source(format!(
            "failed to fetch routes for {} route table(s): {}",
            self.failures.len(),
            details.join("; ")
        )))
    }
}

impl Gateway {
    /// Phase 2: fetch the routes of every route table concurrently.
    ///
    /// All tasks are spawned before any is awaited. Each task only reads its
    /// table id; its result is written back to that one table after the
    /// join. A failed table is left with no routes and
    /// `routes_loaded == false`, even if an earlier fetch had loaded it,
    /// without affecting its siblings.
    pub async fn update_routes(
        &mut self,
        source: &Arc<dyn TopologySource>,
        filter: &RouteFilter,
    ) -> RouteFetchReport {
        let handles: Vec<_> = self
            .route_tables
            .iter()
            .map(|rt| {
                let source = Arc::clone(source);
                let filter = filter.clone();
                let id = rt.id.clone();
                tokio::spawn(async move { source.search_routes(&id, &filter).await })
            })
            .collect();

        let mut report = RouteFetchReport::default();
        for (rt, handle) in self.route_tables.iter_mut().zip(handles) {
            let result = match handle.await {
                Ok(result) => result,
                Err(e) => Err(RouterError::Source(format!("route fetch task failed: {}", e))),
            };

            match result {
                Ok(routes) => {
                    tracing::debug!("{}: fetched {} route(s)", rt.id, routes.len());
                    rt.routes = routes;
                    rt.routes_loaded = true;
                    report.populated.push(rt.id.clone());
                }
                Err(e) => {
                    tracing::warn!("Failed to fetch routes for {}: {}", rt.id, e);
                    rt.routes.clear();
                    rt.routes_loaded = false;
                    report.failures.push((rt.id.clone(), e));
                }
            }
        }

        report
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::routes::{AttachmentRef, Route, RouteState};
    use crate::topology::{GatewayFilter, InMemoryTopology};
    use crate::gateway::discover_gateways;

    fn topology(tables: usize) -> InMemoryTopology {
        let mut topology = InMemoryTopology::new().with_gateway("tgw-1", "core");
        for i in 0..tables {
            let id = format!("tgw-rtb-{i}");
            topology = topology
                .with_route_table("tgw-1", &id, &format!("rt{i}"))
                .with_route(
                    &id,
                    Route::propagated(
                        format!("10.{i}.0.0/16"),
                        AttachmentRef::new(format!("att-{i}"), format!("vpc-{i}"), "vpc"),
                    ),
                )
                .with_route(
                    &id,
                    Route::propagated(
                        format!("172.16.{i}.0/24"),
                        AttachmentRef::new(format!("att-{i}"), format!("vpc-{i}"), "vpc"),
                    )
                    .with_state(RouteState::Pending),
                );
        }
        topology
    }

    async fn gateway_with_tables(source: &Arc<dyn TopologySource>) -> Gateway {
        let mut gateways = discover_gateways(source.as_ref(), &GatewayFilter::all())
            .await
            .unwrap();
        let mut gw = gateways.remove(0);
        gw.update_route_tables(source.as_ref()).await.unwrap();
        gw
    }

    #[tokio::test]
    async fn test_every_table_populated() {
        let source: Arc<dyn TopologySource> = Arc::new(topology(8));
        let mut gw = gateway_with_tables(&source).await;

        let report = gw.update_routes(&source, &RouteFilter::default()).await;
        assert!(report.is_complete());
        assert_eq!(report.populated.len(), 8);

        for (i, rt) in gw.route_tables.iter().enumerate() {
            assert!(rt.routes_loaded);
            // pending route filtered out by the default filter
            assert_eq!(rt.routes.len(), 1);
            assert_eq!(rt.routes[0].destination.as_deref(), Some(format!("10.{i}.0.0/16").as_str()));
        }
        assert!(report.into_result().is_ok());
    }

    #[tokio::test]
    async fn test_failures_are_isolated_and_all_reported() {
        let source: Arc<dyn TopologySource> = Arc::new(
            topology(4)
                .fail_routes_for("tgw-rtb-0")
                .fail_routes_for("tgw-rtb-2"),
        );
        let mut gw = gateway_with_tables(&source).await;

        let report = gw.update_routes(&source, &RouteFilter::default()).await;
        assert!(!report.is_complete());
        let failed: Vec<&str> = report.failures.iter().map(|(id, _)| id.as_str()).collect();
        assert_eq!(failed, vec!["tgw-rtb-0", "tgw-rtb-2"]);
        assert_eq!(report.populated, vec!["tgw-rtb-1", "tgw-rtb-3"]);

        let loaded: Vec<bool> = gw.route_tables.iter().map(|rt| rt.routes_loaded).collect();
        assert_eq!(loaded, vec![false, true, false, true]);
        assert!(gw.route_tables[0].routes.is_empty());

        match report.into_result() {
            Err(RouterError::Source(msg)) => {
                assert!(msg.contains("tgw-rtb-0"));
                assert!(msg.contains("tgw-rtb-2"));
            }
            other => panic!("expected aggregate error, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_failed_refresh_drops_stale_routes() {
        let healthy: Arc<dyn TopologySource> = Arc::new(topology(2));
        let mut gw = gateway_with_tables(&healthy).await;
        assert!(gw.update_routes(&healthy, &RouteFilter::default()).await.is_complete());
        assert!(gw.route_tables[0].routes_loaded);
        assert_eq!(gw.route_tables[0].routes.len(), 1);

        let failing: Arc<dyn TopologySource> = Arc::new(topology(2).fail_routes_for("tgw-rtb-0"));
        let report = gw.update_routes(&failing, &RouteFilter::default()).await;
        let failed: Vec<&str> = report.failures.iter().map(|(id, _)| id.as_str()).collect();
        assert_eq!(failed, vec!["tgw-rtb-0"]);

        assert!(!gw.route_tables[0].routes_loaded);
        assert!(gw.route_tables[0].routes.is_empty());
        assert!(gw.route_tables[1].routes_loaded);
        assert_eq!(gw.route_tables[1].routes.len(), 1);
    }

    #[tokio::test]
    async fn test_empty_gateway() {
        let source: Arc<dyn TopologySource> = Arc::new(InMemoryTopology::new());
        let mut gw = Gateway::new("tgw-1", "empty");
        let report = gw.update_routes(&source, &RouteFilter::default()).await;
        assert!(report.is_complete());
        assert!(report.populated.is_empty());
    }
}
