// Terminal rendering of route tables and walked paths

use comfy_table::{Attribute, Cell, Color, ContentArrangement, Table, presets};
use std::collections::HashMap;

use crate::path::Path;
use crate::routes::{Route, RouteState, RouteTable};

fn create_table() -> Table {
    let mut table = Table::new();
    table
        .load_preset(presets::UTF8_FULL)
        .set_content_arrangement(ContentArrangement::Dynamic);
    table
}

fn header(titles: &[&str]) -> Vec<Cell> {
    titles
        .iter()
        .map(|t| Cell::new(t).fg(Color::Cyan).add_attribute(Attribute::Bold))
        .collect()
}

fn state_cell(state: RouteState) -> Cell {
    let cell = Cell::new(state);
    match state {
        RouteState::Active => cell.fg(Color::Green),
        RouteState::Blackhole => cell.fg(Color::Red).add_attribute(Attribute::Bold),
        _ => cell.fg(Color::Yellow),
    }
}

/// Attachment column: names from `names` where known, ids otherwise.
fn attachment_label(route: &Route, names: &HashMap<String, String>) -> String {
    if route.attachments.is_empty() {
        return "-".to_string();
    }
    route
        .attachments
        .iter()
        .map(|att| {
            names
                .get(&att.id)
                .map(String::as_str)
                .unwrap_or_else(|| att.display_name())
                .to_string()
        })
        .collect::<Vec<_>>()
        .join(", ")
}

/// Render every route of `rt`, followed by a footer line naming the table.
pub fn route_table(rt: &RouteTable, names: &HashMap<String, String>) -> String {
    let mut table = create_table();
    table.set_header(header(&["Destination", "State", "Type", "PrefixList", "Attachment"]));

    for route in &rt.routes {
        table.add_row(vec![
            Cell::new(route.destination.as_deref().unwrap_or("-")),
            state_cell(route.state),
            Cell::new(route.kind),
            Cell::new(route.prefix_list_id.as_deref().unwrap_or("-")).fg(Color::DarkGrey),
            Cell::new(attachment_label(route, names)),
        ]);
    }

    let loaded = if rt.routes_loaded { "" } else { " (routes not loaded)" };
    format!("{}\n{} ({}){}", table, rt.name, rt.id, loaded)
}

/// Render the hops of a walked path, one row per attachment.
///
/// Hops come from route targets, which carry no names; names are taken
/// from the gateway's route table associations.
pub fn path(path: &Path<'_>) -> String {
    let mut table = create_table();
    table.set_header(header(&["#", "Attachment", "Name", "Resource", "Route table"]));

    let gateway = path.gateway();
    let names = gateway.attachment_names();
    for (i, hop) in path.hops().iter().enumerate() {
        let route_table = gateway
            .route_table_for_attachment(&hop.id)
            .map(|rt| rt.name.as_str())
            .unwrap_or("-");
        let name = names
            .get(&hop.id)
            .map(String::as_str)
            .or(hop.name.as_deref())
            .unwrap_or("-");
        table.add_row(vec![
            Cell::new(i + 1),
            Cell::new(&hop.id).add_attribute(Attribute::Bold),
            Cell::new(name),
            Cell::new(format!("{} ({})", hop.resource_id, hop.resource_type)),
            Cell::new(route_table),
        ]);
    }

    format!("{}\n{}: {}", table, gateway.name, path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gateway::Gateway;
    use crate::routes::AttachmentRef;
    use crate::topology::{AttachmentSummary, InMemoryTopology};

    fn table() -> RouteTable {
        let vpc = AttachmentRef::new("tgw-attach-1", "vpc-1", "vpc");
        let mut blackhole = Route::static_route("10.9.0.0/16", vpc.clone()).with_state(RouteState::Blackhole);
        blackhole.attachments.clear();
        let mut pl = Route::static_route("0.0.0.0/0", AttachmentRef::new("tgw-attach-2", "vpn-1", "vpn"));
        pl.destination = None;
        pl.prefix_list_id = Some("pl-123".to_string());

        RouteTable::new("tgw-rtb-1", "prod").with_routes(vec![
            Route::propagated("10.0.0.0/16", vpc),
            blackhole,
            pl,
        ])
    }

    #[test]
    fn test_route_table_rows_and_footer() {
        let names = HashMap::from([("tgw-attach-1".to_string(), "app-vpc".to_string())]);
        let out = route_table(&table(), &names);

        assert!(out.contains("Destination"));
        assert!(out.contains("10.0.0.0/16"));
        assert!(out.contains("app-vpc"));
        assert!(out.contains("blackhole"));
        assert!(out.contains("pl-123"));
        // unnamed attachment falls back to its id
        assert!(out.contains("tgw-attach-2"));
        assert!(out.trim_end().ends_with("prod (tgw-rtb-1)"));
    }

    #[test]
    fn test_route_table_not_loaded() {
        let out = route_table(&RouteTable::new("tgw-rtb-2", "edge"), &HashMap::new());
        assert!(out.trim_end().ends_with("edge (tgw-rtb-2) (routes not loaded)"));
    }

    #[tokio::test]
    async fn test_path() {
        let s = AttachmentRef::new("S", "vpc-s", "vpc");
        let x = AttachmentRef::new("X", "vpn-x", "vpn");
        let gw = Gateway::new("tgw-1", "core").with_route_tables(vec![
            RouteTable::new("rtb-a", "spokes")
                .with_routes(vec![
                    Route::propagated("10.0.0.0/16", s.clone()),
                    Route::propagated("10.1.0.0/16", x.clone()),
                ])
                .with_attachments(vec![AttachmentRef {
                    name: Some("app-vpc".to_string()),
                    ..s
                }]),
            RouteTable::new("rtb-b", "vpn")
                .with_routes(vec![Route::propagated("10.1.0.0/16", x.clone())])
                .with_attachments(vec![AttachmentRef {
                    name: Some("branch-vpn".to_string()),
                    ..x
                }]),
        ]);
        let source = InMemoryTopology::new()
            .with_attachment(AttachmentSummary::new("S", "tgw-1", "vpc-s", "vpc").associated_with("rtb-a"))
            .with_attachment(AttachmentSummary::new("X", "tgw-1", "vpn-x", "vpn").associated_with("rtb-b"));

        let mut walked = Path::new(&gw);
        walked
            .walk(&source, "10.0.0.1".parse().unwrap(), "10.1.0.1".parse().unwrap())
            .await
            .unwrap();

        // hops are the unnamed route targets
        assert!(walked.hops().iter().all(|hop| hop.name.is_none()));

        let out = path(&walked);
        assert!(out.contains("app-vpc"));
        assert!(out.contains("branch-vpn"));
        assert!(out.contains("vpn-x (vpn)"));
        assert!(out.contains("spokes"));
        assert!(out.trim_end().ends_with("core: S -> X"));
    }
}
