// Topology source - the capability every piece of gateway data is read through

pub mod memory;
pub mod retry;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::RouterResult;
use crate::routes::{Route, RouteState};

pub use memory::InMemoryTopology;
pub use retry::RetryingSource;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Tag {
    pub key: String,
    pub value: String,
}

impl Tag {
    pub fn name(value: impl Into<String>) -> Self {
        Tag {
            key: "Name".to_string(),
            value: value.into(),
        }
    }
}

/// Value of the `Name` tag, if any
pub fn name_tag(tags: &[Tag]) -> Option<&str> {
    tags.iter()
        .find(|tag| tag.key == "Name")
        .map(|tag| tag.value.as_str())
}

/// Value of the `Name` tag, falling back to `id`
pub fn name_from_tags(tags: &[Tag], id: &str) -> String {
    name_tag(tags).unwrap_or(id).to_string()
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GatewaySummary {
    pub id: String,
    #[serde(default)]
    pub tags: Vec<Tag>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RouteTableSummary {
    pub id: String,
    pub gateway_id: String,
    #[serde(default)]
    pub tags: Vec<Tag>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AssociationSummary {
    pub route_table_id: String,
    #[serde(default = "default_association_state")]
    pub state: String,
}

fn default_association_state() -> String {
    "associated".to_string()
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AttachmentSummary {
    pub id: String,
    pub gateway_id: String,
    pub resource_id: String,
    pub resource_type: String,
    #[serde(default)]
    pub association: Option<AssociationSummary>,
    #[serde(default)]
    pub tags: Vec<Tag>,
}

impl AttachmentSummary {
    pub fn new(
        id: impl Into<String>,
        gateway_id: impl Into<String>,
        resource_id: impl Into<String>,
        resource_type: impl Into<String>,
    ) -> Self {
        AttachmentSummary {
            id: id.into(),
            gateway_id: gateway_id.into(),
            resource_id: resource_id.into(),
            resource_type: resource_type.into(),
            association: None,
            tags: Vec::new(),
        }
    }

    pub fn associated_with(mut self, route_table_id: impl Into<String>) -> Self {
        self.association = Some(AssociationSummary {
            route_table_id: route_table_id.into(),
            state: default_association_state(),
        });
        self
    }

    pub fn named(mut self, name: impl Into<String>) -> Self {
        self.tags.push(Tag::name(name));
        self
    }
}

/// Gateways to list. No ids means every gateway.
#[derive(Debug, Clone, Default)]
pub struct GatewayFilter {
    pub gateway_ids: Vec<String>,
}

impl GatewayFilter {
    pub fn all() -> Self {
        GatewayFilter::default()
    }

    pub fn by_ids(ids: impl IntoIterator<Item = impl Into<String>>) -> Self {
        GatewayFilter {
            gateway_ids: ids.into_iter().map(Into::into).collect(),
        }
    }

    pub fn matches(&self, gateway: &GatewaySummary) -> bool {
        self.gateway_ids.is_empty() || self.gateway_ids.contains(&gateway.id)
    }
}

/// Routes to return from `search_routes`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RouteFilter {
    pub states: Vec<RouteState>,
}

impl Default for RouteFilter {
    /// Active and blackhole routes: everything that affects forwarding.
    fn default() -> Self {
        RouteFilter {
            states: vec![RouteState::Active, RouteState::Blackhole],
        }
    }
}

impl RouteFilter {
    pub fn matches(&self, route: &Route) -> bool {
        self.states.contains(&route.state)
    }
}

/// Attachment selection. Every non-empty criterion must match.
#[derive(Debug, Clone, Default)]
pub struct AttachmentFilter {
    pub attachment_ids: Vec<String>,
    pub resource_ids: Vec<String>,
    pub gateway_ids: Vec<String>,
    pub route_table_id: Option<String>,
}

impl AttachmentFilter {
    pub fn by_id(attachment_id: impl Into<String>) -> Self {
        AttachmentFilter {
            attachment_ids: vec![attachment_id.into()],
            ..Default::default()
        }
    }

    pub fn associated_with(route_table_id: impl Into<String>) -> Self {
        AttachmentFilter {
            route_table_id: Some(route_table_id.into()),
            ..Default::default()
        }
    }

    pub fn matches(&self, attachment: &AttachmentSummary) -> bool {
        (self.attachment_ids.is_empty() || self.attachment_ids.contains(&attachment.id))
            && (self.resource_ids.is_empty() || self.resource_ids.contains(&attachment.resource_id))
            && (self.gateway_ids.is_empty() || self.gateway_ids.contains(&attachment.gateway_id))
            && self.route_table_id.as_ref().is_none_or(|rt| {
                attachment
                    .association
                    .as_ref()
                    .is_some_and(|assoc| &assoc.route_table_id == rt)
            })
    }
}

/// Read access to gateway topology.
///
/// The core never talks to a cloud API itself: gateways, route tables,
/// routes and attachment associations all come through these four calls.
/// `InMemoryTopology` serves fixtures and JSON files; `RetryingSource`
/// wraps another source with backoff retries.
#[async_trait]
pub trait TopologySource: Send + Sync {
    async fn list_gateways(&self, filter: &GatewayFilter) -> RouterResult<Vec<GatewaySummary>>;

    /// Route tables of the given gateways. No ids means every route table.
    async fn list_route_tables(&self, gateway_ids: &[String]) -> RouterResult<Vec<RouteTableSummary>>;

    async fn search_routes(
        &self,
        route_table_id: &str,
        filter: &RouteFilter,
    ) -> RouterResult<Vec<Route>>;

    async fn list_attachments(&self, filter: &AttachmentFilter) -> RouterResult<Vec<AttachmentSummary>>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::routes::AttachmentRef;

    #[test]
    fn test_name_from_tags() {
        let tags = vec![
            Tag {
                key: "Env".to_string(),
                value: "prod".to_string(),
            },
            Tag::name("core-tgw"),
        ];
        assert_eq!(name_from_tags(&tags, "tgw-1"), "core-tgw");
        assert_eq!(name_from_tags(&[], "tgw-1"), "tgw-1");
    }

    #[test]
    fn test_default_route_filter() {
        let filter = RouteFilter::default();
        let active = Route::propagated("10.0.0.0/16", AttachmentRef::new("a", "vpc-a", "vpc"));
        assert!(filter.matches(&active));
        assert!(filter.matches(&active.clone().with_state(RouteState::Blackhole)));
        assert!(!filter.matches(&active.with_state(RouteState::Deleted)));
    }

    #[test]
    fn test_attachment_filter() {
        let att = AttachmentSummary::new("tgw-attach-1", "tgw-1", "vpc-1", "vpc")
            .associated_with("tgw-rtb-1");

        assert!(AttachmentFilter::default().matches(&att));
        assert!(AttachmentFilter::by_id("tgw-attach-1").matches(&att));
        assert!(!AttachmentFilter::by_id("tgw-attach-2").matches(&att));
        assert!(AttachmentFilter::associated_with("tgw-rtb-1").matches(&att));
        assert!(!AttachmentFilter::associated_with("tgw-rtb-2").matches(&att));

        let unassociated = AttachmentSummary::new("tgw-attach-3", "tgw-1", "vpc-3", "vpc");
        assert!(!AttachmentFilter::associated_with("tgw-rtb-1").matches(&unassociated));

        let filter = AttachmentFilter {
            resource_ids: vec!["vpc-1".to_string()],
            gateway_ids: vec!["tgw-2".to_string()],
            ..Default::default()
        };
        assert!(!filter.matches(&att));
    }
}
