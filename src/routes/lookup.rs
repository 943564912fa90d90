// Route lookup engine with longest prefix matching

use super::{Route, RouteTable};
use crate::error::{RouterError, RouterResult};
use ipnet::IpNet;
use std::net::IpAddr;

/// Parse a stored destination CIDR, clearing any host bits.
pub fn parse_cidr(cidr: &str) -> RouterResult<IpNet> {
    cidr.trim()
        .parse::<IpNet>()
        .map(|net| net.trunc())
        .map_err(|source| RouterError::Parse {
            cidr: cidr.to_string(),
            source,
        })
}

impl Route {
    /// Parsed destination prefix, `None` when the route has no destination CIDR.
    pub fn prefix(&self) -> RouterResult<Option<IpNet>> {
        self.destination.as_deref().map(parse_cidr).transpose()
    }
}

impl RouteTable {
    /// Find the best matching route for `ip` using longest prefix matching.
    ///
    /// Routes of equal prefix length keep the first one seen. Route state is
    /// not considered, a blackhole route matches like any other. Any route
    /// with an unparsable destination fails the whole lookup.
    pub fn best_route_to_ip(&self, ip: IpAddr) -> RouterResult<Option<&Route>> {
        let mut best_match: Option<(&Route, u8)> = None;

        for route in &self.routes {
            let Some(prefix) = route.prefix()? else {
                continue;
            };
            if !prefix.contains(&ip) {
                continue;
            }

            let prefix_len = prefix.prefix_len();
            match best_match {
                None => best_match = Some((route, prefix_len)),
                Some((_, current_len)) if prefix_len > current_len => {
                    best_match = Some((route, prefix_len));
                }
                _ => {}
            }
        }

        Ok(best_match.map(|(route, _)| route))
    }
}
