// Routes module - route table model, longest prefix matching and cross-table selection

pub mod lookup;
pub mod selector;

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::topology::{AttachmentSummary, RouteTableSummary, name_from_tags, name_tag};

pub use lookup::parse_cidr;
pub use selector::{filter_route_tables_by_prefix, find_best_route_prefix, find_most_specific_route};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RouteState {
    Active,
    Blackhole,
    Pending,
    Deleting,
    Deleted,
}

impl fmt::Display for RouteState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            RouteState::Active => "active",
            RouteState::Blackhole => "blackhole",
            RouteState::Pending => "pending",
            RouteState::Deleting => "deleting",
            RouteState::Deleted => "deleted",
        };
        f.write_str(s)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RouteKind {
    Static,
    Propagated,
}

impl fmt::Display for RouteKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RouteKind::Static => f.write_str("static"),
            RouteKind::Propagated => f.write_str("propagated"),
        }
    }
}

/// A gateway attachment: the connection to a VPC, VPN, peering link, ...
///
/// Identity is `id`. The name comes from the `Name` tag and is only known
/// once the attachment refresh phase has run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AttachmentRef {
    pub id: String,
    pub resource_id: String,
    pub resource_type: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
}

impl AttachmentRef {
    pub fn new(
        id: impl Into<String>,
        resource_id: impl Into<String>,
        resource_type: impl Into<String>,
    ) -> Self {
        AttachmentRef {
            id: id.into(),
            resource_id: resource_id.into(),
            resource_type: resource_type.into(),
            name: None,
        }
    }

    pub fn from_summary(summary: &AttachmentSummary) -> Self {
        AttachmentRef {
            id: summary.id.clone(),
            resource_id: summary.resource_id.clone(),
            resource_type: summary.resource_type.clone(),
            name: name_tag(&summary.tags).map(str::to_string),
        }
    }

    /// Name if known, id otherwise
    pub fn display_name(&self) -> &str {
        self.name.as_deref().unwrap_or(&self.id)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Route {
    /// Destination CIDR as stored by the source. `None` for prefix-list routes.
    pub destination: Option<String>,
    pub state: RouteState,
    pub kind: RouteKind,
    #[serde(default)]
    pub attachments: Vec<AttachmentRef>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub prefix_list_id: Option<String>,
}

impl Route {
    pub fn new(destination: impl Into<String>, kind: RouteKind) -> Self {
        Route {
            destination: Some(destination.into()),
            state: RouteState::Active,
            kind,
            attachments: Vec::new(),
            prefix_list_id: None,
        }
    }

    pub fn propagated(destination: impl Into<String>, attachment: AttachmentRef) -> Self {
        Route::new(destination, RouteKind::Propagated).via(attachment)
    }

    pub fn static_route(destination: impl Into<String>, attachment: AttachmentRef) -> Self {
        Route::new(destination, RouteKind::Static).via(attachment)
    }

    pub fn via(mut self, attachment: AttachmentRef) -> Self {
        self.attachments.push(attachment);
        self
    }

    pub fn with_state(mut self, state: RouteState) -> Self {
        self.state = state;
        self
    }

    /// Next hop. ECMP routes only ever resolve to their first attachment.
    pub fn first_attachment(&self) -> Option<&AttachmentRef> {
        self.attachments.first()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RouteTable {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub routes: Vec<Route>,
    #[serde(default)]
    pub attachments: Vec<AttachmentRef>,
    /// Set once the route fetcher has populated `routes` for this table.
    #[serde(default)]
    pub routes_loaded: bool,
}

impl RouteTable {
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        RouteTable {
            id: id.into(),
            name: name.into(),
            routes: Vec::new(),
            attachments: Vec::new(),
            routes_loaded: false,
        }
    }

    pub fn from_summary(summary: &RouteTableSummary) -> Self {
        RouteTable::new(summary.id.clone(), name_from_tags(&summary.tags, &summary.id))
    }

    pub fn with_routes(mut self, routes: Vec<Route>) -> Self {
        self.routes = routes;
        self.routes_loaded = true;
        self
    }

    pub fn with_attachments(mut self, attachments: Vec<AttachmentRef>) -> Self {
        self.attachments = attachments;
        self
    }

    pub fn is_associated_with(&self, attachment_id: &str) -> bool {
        self.attachments.iter().any(|a| a.id == attachment_id)
    }

    /// Shallow copy of this table holding only `route`.
    pub(crate) fn with_single_route(&self, route: &Route) -> RouteTable {
        RouteTable {
            id: self.id.clone(),
            name: self.name.clone(),
            routes: vec![route.clone()],
            attachments: Vec::new(),
            routes_loaded: true,
        }
    }
}
