// In-memory topology source, used for fixtures and JSON topology files

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use std::path::Path;

use super::{
    AttachmentFilter, AttachmentSummary, GatewayFilter, GatewaySummary, RouteFilter,
    RouteTableSummary, Tag, TopologySource,
};
use crate::error::{RouterError, RouterResult};
use crate::routes::Route;

/// Static topology held in memory.
///
/// Built per test with the `with_*` methods, or loaded from a JSON file
/// with the same shape as the serialized struct.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct InMemoryTopology {
    #[serde(default)]
    gateways: Vec<GatewaySummary>,
    #[serde(default)]
    route_tables: Vec<RouteTableSummary>,
    /// Routes keyed by route table id, in source order
    #[serde(default)]
    routes: HashMap<String, Vec<Route>>,
    #[serde(default)]
    attachments: Vec<AttachmentSummary>,
    #[serde(skip)]
    failing_route_tables: HashSet<String>,
}

impl InMemoryTopology {
    pub fn new() -> Self {
        InMemoryTopology::default()
    }

    pub fn from_json(json: &str) -> RouterResult<Self> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn from_json_file(path: &Path) -> RouterResult<Self> {
        let content = std::fs::read_to_string(path)?;
        let topology = Self::from_json(&content)?;
        tracing::info!(
            "Loaded topology from {}: {} gateway(s), {} route table(s), {} attachment(s)",
            path.display(),
            topology.gateways.len(),
            topology.route_tables.len(),
            topology.attachments.len()
        );
        Ok(topology)
    }

    pub fn with_gateway(mut self, id: &str, name: &str) -> Self {
        self.gateways.push(GatewaySummary {
            id: id.to_string(),
            tags: vec![Tag::name(name)],
        });
        self
    }

    pub fn with_route_table(mut self, gateway_id: &str, id: &str, name: &str) -> Self {
        self.route_tables.push(RouteTableSummary {
            id: id.to_string(),
            gateway_id: gateway_id.to_string(),
            tags: vec![Tag::name(name)],
        });
        self
    }

    pub fn with_route(mut self, route_table_id: &str, route: Route) -> Self {
        self.routes
            .entry(route_table_id.to_string())
            .or_default()
            .push(route);
        self
    }

    pub fn with_attachment(mut self, attachment: AttachmentSummary) -> Self {
        self.attachments.push(attachment);
        self
    }

    /// Make `search_routes` fail for this route table.
    pub fn fail_routes_for(mut self, route_table_id: &str) -> Self {
        self.failing_route_tables.insert(route_table_id.to_string());
        self
    }
}

#[async_trait]
impl TopologySource for InMemoryTopology {
    async fn list_gateways(&self, filter: &GatewayFilter) -> RouterResult<Vec<GatewaySummary>> {
        Ok(self
            .gateways
            .iter()
            .filter(|gw| filter.matches(gw))
            .cloned()
            .collect())
    }

    async fn list_route_tables(&self, gateway_ids: &[String]) -> RouterResult<Vec<RouteTableSummary>> {
        Ok(self
            .route_tables
            .iter()
            .filter(|rt| gateway_ids.is_empty() || gateway_ids.contains(&rt.gateway_id))
            .cloned()
            .collect())
    }

    async fn search_routes(
        &self,
        route_table_id: &str,
        filter: &RouteFilter,
    ) -> RouterResult<Vec<Route>> {
        if self.failing_route_tables.contains(route_table_id) {
            return Err(RouterError::Source(format!(
                "search routes failed for {}",
                route_table_id
            )));
        }
        if !self.route_tables.iter().any(|rt| rt.id == route_table_id) {
            return Err(RouterError::Source(format!(
                "unknown route table {}",
                route_table_id
            )));
        }

        Ok(self
            .routes
            .get(route_table_id)
            .map(|routes| routes.iter().filter(|r| filter.matches(r)).cloned().collect())
            .unwrap_or_default())
    }

    async fn list_attachments(&self, filter: &AttachmentFilter) -> RouterResult<Vec<AttachmentSummary>> {
        Ok(self
            .attachments
            .iter()
            .filter(|att| filter.matches(att))
            .cloned()
            .collect())
    }
}
