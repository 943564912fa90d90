// Cross-table route selection: which route tables own the most specific route to an address

use super::RouteTable;
use crate::error::RouterResult;
use ipnet::IpNet;
use std::net::IpAddr;

/// Narrowest prefix covering `ip` across all `tables`.
///
/// Each table contributes its own best route; a candidate replaces the
/// running best when the running best network contains it. Returns `None`
/// when no table has a route to `ip`.
pub fn find_best_route_prefix(tables: &[RouteTable], ip: IpAddr) -> RouterResult<Option<IpNet>> {
    let mut best: Option<IpNet> = None;

    for table in tables {
        let Some(route) = table.best_route_to_ip(ip)? else {
            continue;
        };
        let Some(current) = route.prefix()? else {
            continue;
        };

        match best {
            None => best = Some(current),
            Some(running) if running.contains(&current) => best = Some(current),
            _ => {}
        }
    }

    Ok(best)
}

/// Copies of every table holding a route for exactly `prefix`.
///
/// Each returned table carries that single route and nothing else; the
/// input tables are left untouched. A table with several routes for the
/// same prefix yields one copy per route.
pub fn filter_route_tables_by_prefix(
    tables: &[RouteTable],
    prefix: IpNet,
) -> RouterResult<Vec<RouteTable>> {
    let prefix = prefix.trunc();
    let mut result = Vec::new();

    for table in tables {
        for route in &table.routes {
            if route.prefix()? == Some(prefix) {
                result.push(table.with_single_route(route));
            }
        }
    }

    Ok(result)
}

/// Single pass variant of `find_best_route_prefix` + `filter_route_tables_by_prefix`.
///
/// The returned tables only ever hold the overall best prefix: a strictly
/// longer match discards everything collected so far, an equal match is
/// appended.
pub fn find_most_specific_route(
    tables: &[RouteTable],
    ip: IpAddr,
) -> RouterResult<(Option<IpNet>, Vec<RouteTable>)> {
    let mut best: Option<IpNet> = None;
    let mut owners: Vec<RouteTable> = Vec::new();

    for table in tables {
        let Some(route) = table.best_route_to_ip(ip)? else {
            continue;
        };
        let Some(current) = route.prefix()? else {
            continue;
        };

        match best {
            Some(running) if running == current => {
                owners.push(table.with_single_route(route));
            }
            Some(running) if current.prefix_len() <= running.prefix_len() => {}
            _ => {
                best = Some(current);
                owners.clear();
                owners.push(table.with_single_route(route));
            }
        }
    }

    Ok((best, owners))
}
