// Path walker - follows a packet hop by hop through one Transit Gateway

use std::collections::HashSet;
use std::fmt;
use std::net::IpAddr;

use crate::error::{RouterError, RouterResult};
use crate::gateway::Gateway;
use crate::routes::{AttachmentRef, RouteTable};
use crate::topology::{AttachmentFilter, TopologySource};

/// Upper bound on route table lookups per walk
pub const MAX_HOPS: usize = 10;

/// How a successful walk ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WalkOutcome {
    Reached,
    HopLimit,
}

enum Step<'a> {
    Continue(&'a RouteTable),
    Reached,
}

/// Ordered attachments from source to destination inside one gateway.
///
/// No attachment appears twice; `hops` and `visited` are only ever changed
/// together through `push`.
#[derive(Debug)]
pub struct Path<'a> {
    gateway: &'a Gateway,
    hops: Vec<AttachmentRef>,
    visited: HashSet<String>,
    source_route_table: Option<&'a RouteTable>,
    destination_route_table: Option<&'a RouteTable>,
}

impl<'a> Path<'a> {
    pub fn new(gateway: &'a Gateway) -> Self {
        Path {
            gateway,
            hops: Vec::new(),
            visited: HashSet::new(),
            source_route_table: None,
            destination_route_table: None,
        }
    }

    pub fn gateway(&self) -> &'a Gateway {
        self.gateway
    }

    pub fn hops(&self) -> &[AttachmentRef] {
        &self.hops
    }

    pub fn len(&self) -> usize {
        self.hops.len()
    }

    pub fn is_empty(&self) -> bool {
        self.hops.is_empty()
    }

    pub fn contains(&self, attachment_id: &str) -> bool {
        self.visited.contains(attachment_id)
    }

    pub fn source_route_table(&self) -> Option<&'a RouteTable> {
        self.source_route_table
    }

    pub fn destination_route_table(&self) -> Option<&'a RouteTable> {
        self.destination_route_table
    }

    fn push(&mut self, attachment: AttachmentRef) -> RouterResult<()> {
        if self.visited.contains(&attachment.id) {
            return Err(RouterError::AttachmentAlreadyInPath(attachment.id));
        }
        self.visited.insert(attachment.id.clone());
        self.hops.push(attachment);
        Ok(())
    }

    fn reset(&mut self) {
        self.hops.clear();
        self.visited.clear();
        self.source_route_table = None;
        self.destination_route_table = None;
    }

    /// Walk from `src` to `dst`, replacing any previous walk.
    ///
    /// Starts at the attachment directly connected to `src`, then looks up
    /// `dst` in the current route table, hops to the attachment that route
    /// points at and continues in the table associated with it. Stops when
    /// the next hop is the attachment just added, when the next hop's table
    /// is the current one, or after `MAX_HOPS` lookups (partial path, no
    /// error). A route miss, a repeated attachment or an unresolvable
    /// association is an error.
    pub async fn walk(
        &mut self,
        source: &dyn TopologySource,
        src: IpAddr,
        dst: IpAddr,
    ) -> RouterResult<WalkOutcome> {
        self.reset();

        let (src_rt, src_atts) = self.gateway.directly_connected_attachment(src)?;
        let first = src_atts
            .into_iter()
            .next()
            .ok_or(RouterError::NoAttachmentFound(src))?;
        self.push(first)?;
        self.source_route_table = Some(src_rt);
        tracing::debug!("Walk {} -> {} starts in {}", src, dst, src_rt.id);

        let mut current = src_rt;
        for _ in 0..MAX_HOPS {
            match self.step(source, current, dst).await? {
                Step::Continue(next) => current = next,
                Step::Reached => {
                    self.destination_route_table = Some(current);
                    tracing::debug!("Walk reached {} in {} hop(s): {}", dst, self.len(), self);
                    return Ok(WalkOutcome::Reached);
                }
            }
        }

        tracing::warn!(
            "Walk {} -> {} stopped after {} lookups without reaching the destination",
            src,
            dst,
            MAX_HOPS
        );
        Ok(WalkOutcome::HopLimit)
    }

    async fn step(
        &mut self,
        source: &dyn TopologySource,
        current: &'a RouteTable,
        dst: IpAddr,
    ) -> RouterResult<Step<'a>> {
        let not_found = || RouterError::RouteNotFound {
            route_table: current.id.clone(),
            destination: dst,
        };
        let route = current.best_route_to_ip(dst)?.ok_or_else(not_found)?;
        // Blackhole routes have no attachment: nowhere to go.
        let next_hop = route.first_attachment().ok_or_else(not_found)?.clone();

        if self.hops.last().is_some_and(|last| last.id == next_hop.id) {
            return Ok(Step::Reached);
        }

        let next_hop_id = next_hop.id.clone();
        self.push(next_hop)?;

        let next_rt = self.associated_route_table(source, &next_hop_id).await?;
        if next_rt.id == current.id {
            return Ok(Step::Reached);
        }
        tracing::trace!("{} -> {} via {}", current.id, next_rt.id, next_hop_id);
        Ok(Step::Continue(next_rt))
    }

    /// Route table `attachment_id` is associated with, as reported by the source.
    async fn associated_route_table(
        &self,
        source: &dyn TopologySource,
        attachment_id: &str,
    ) -> RouterResult<&'a RouteTable> {
        let attachments = source
            .list_attachments(&AttachmentFilter::by_id(attachment_id))
            .await?;
        let [attachment] = attachments.as_slice() else {
            return Err(RouterError::RouteTableNotFound(attachment_id.to_string()));
        };
        let association = attachment
            .association
            .as_ref()
            .ok_or_else(|| RouterError::RouteTableNotFound(attachment_id.to_string()))?;
        self.gateway.route_table_by_id(&association.route_table_id)
    }
}

impl fmt::Display for Path<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let ids: Vec<&str> = self.hops.iter().map(|a| a.id.as_str()).collect();
        f.write_str(&ids.join(" -> "))
    }
}
