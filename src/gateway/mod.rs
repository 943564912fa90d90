// Gateway module - the Transit Gateway aggregate and its update phases

pub mod fetch;

use futures::future::join_all;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::net::IpAddr;
use std::sync::Arc;

use crate::error::{RouterError, RouterResult};
use crate::routes::{
    AttachmentRef, RouteKind, RouteTable, filter_route_tables_by_prefix, find_best_route_prefix,
};
use crate::topology::{
    AttachmentFilter, GatewayFilter, GatewaySummary, RouteFilter, TopologySource, name_from_tags,
};

pub use fetch::RouteFetchReport;

/// A Transit Gateway and the route tables it owns.
///
/// Built empty from a summary, then enriched in phases: route tables
/// (`update_route_tables`), routes (`update_routes`) and attachment
/// associations (`update_attachments`). Every intermediate state is a valid
/// `Gateway`, but only a fully enriched one can be walked.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Gateway {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub route_tables: Vec<RouteTable>,
}

impl Gateway {
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Gateway {
            id: id.into(),
            name: name.into(),
            route_tables: Vec::new(),
        }
    }

    pub fn from_summary(summary: &GatewaySummary) -> Self {
        Gateway::new(summary.id.clone(), name_from_tags(&summary.tags, &summary.id))
    }

    pub fn with_route_tables(mut self, route_tables: Vec<RouteTable>) -> Self {
        self.route_tables = route_tables;
        self
    }

    pub fn route_table_by_id(&self, id: &str) -> RouterResult<&RouteTable> {
        self.route_tables
            .iter()
            .find(|rt| rt.id == id)
            .ok_or_else(|| RouterError::RouteTableNotFound(id.to_string()))
    }

    /// Route table the attachment is associated with, if any
    pub fn route_table_for_attachment(&self, attachment_id: &str) -> Option<&RouteTable> {
        self.route_tables
            .iter()
            .find(|rt| rt.is_associated_with(attachment_id))
    }

    /// Attachment most likely to be directly connected to `ip`, and the route
    /// table that attachment is associated with.
    ///
    /// Looks for the most specific route to `ip` in any route table and takes
    /// the attachments of the first propagated one. Static routes are not
    /// resolved. With ECMP the caller gets every attachment of that route,
    /// but the route table returned belongs to the first.
    pub fn directly_connected_attachment(
        &self,
        ip: IpAddr,
    ) -> RouterResult<(&RouteTable, Vec<AttachmentRef>)> {
        let prefix = find_best_route_prefix(&self.route_tables, ip)?
            .ok_or(RouterError::NoAttachmentFound(ip))?;
        let candidates = filter_route_tables_by_prefix(&self.route_tables, prefix)?;

        let attachments = directly_connected_from_candidates(&candidates);
        let first = attachments
            .first()
            .ok_or(RouterError::NoAttachmentFound(ip))?;

        let route_table = self
            .route_table_for_attachment(&first.id)
            .ok_or_else(|| RouterError::RouteTableNotFound(first.id.clone()))?;

        tracing::debug!(
            "{} is directly connected to {} via {} ({})",
            ip,
            first.id,
            route_table.id,
            prefix
        );
        Ok((route_table, attachments))
    }

    /// Names of every named attachment in this gateway, by attachment id
    pub fn attachment_names(&self) -> HashMap<String, String> {
        self.route_tables
            .iter()
            .flat_map(|rt| rt.attachments.iter())
            .filter_map(|att| att.name.as_ref().map(|name| (att.id.clone(), name.clone())))
            .collect()
    }

    /// Phase 1: discover the route tables of this gateway.
    pub async fn update_route_tables(&mut self, source: &dyn TopologySource) -> RouterResult<()> {
        let summaries = source
            .list_route_tables(std::slice::from_ref(&self.id))
            .await?;
        self.route_tables = summaries.iter().map(RouteTable::from_summary).collect();
        tracing::debug!("{} has {} route table(s)", self.id, self.route_tables.len());
        Ok(())
    }

    /// Phase 3: refresh which attachments are associated with each route table.
    pub async fn update_attachments(&mut self, source: &dyn TopologySource) -> RouterResult<()> {
        let results = join_all(
            self.route_tables
                .iter_mut()
                .map(|rt| rt.update_attachments(source)),
        )
        .await;
        results.into_iter().collect()
    }
}

impl RouteTable {
    pub async fn update_attachments(&mut self, source: &dyn TopologySource) -> RouterResult<()> {
        let associations = source
            .list_attachments(&AttachmentFilter::associated_with(&self.id))
            .await?;
        self.attachments = associations.iter().map(AttachmentRef::from_summary).collect();

        for att in self.attachments.iter().filter(|a| a.name.is_some()) {
            tracing::debug!("Attachment {} has name {}", att.id, att.display_name());
        }
        Ok(())
    }
}

/// Attachments of the first propagated route among single-route `candidates`.
fn directly_connected_from_candidates(candidates: &[RouteTable]) -> Vec<AttachmentRef> {
    for rt in candidates {
        let Some(route) = rt.routes.first() else {
            continue;
        };
        match route.kind {
            RouteKind::Propagated => return route.attachments.clone(),
            RouteKind::Static => {
                tracing::warn!(
                    "Static route {} in {} is not resolved to a directly connected attachment",
                    route.destination.as_deref().unwrap_or("-"),
                    rt.id
                );
            }
        }
    }
    Vec::new()
}

/// List the gateways matching `filter`, without route tables.
pub async fn discover_gateways(
    source: &dyn TopologySource,
    filter: &GatewayFilter,
) -> RouterResult<Vec<Gateway>> {
    let summaries = source.list_gateways(filter).await?;
    Ok(summaries.iter().map(Gateway::from_summary).collect())
}

/// Fully enrich every gateway matching `filter`.
///
/// Failing to list gateways, route tables or attachments aborts. Failing to
/// fetch the routes of a table does not: the table is left unloaded and
/// the failure is logged.
pub async fn update_routing(
    source: &Arc<dyn TopologySource>,
    filter: &GatewayFilter,
) -> RouterResult<Vec<Gateway>> {
    let mut gateways = discover_gateways(source.as_ref(), filter).await?;
    tracing::info!("Found {} transit gateway(s)", gateways.len());

    for gateway in &mut gateways {
        gateway.update_route_tables(source.as_ref()).await?;
    }

    for gateway in &mut gateways {
        let report = gateway.update_routes(source, &RouteFilter::default()).await;
        if !report.is_complete() {
            tracing::warn!(
                "{}: routes missing for {} of {} route table(s)",
                gateway.id,
                report.failures.len(),
                gateway.route_tables.len()
            );
        }
        gateway.update_attachments(source.as_ref()).await?;
    }

    Ok(gateways)
}
