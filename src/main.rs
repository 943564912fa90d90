use std::sync::Arc;

use anyhow::Context;
use tracing_subscriber::EnvFilter;

use tgw_path_walker::config::{Command, Config};
use tgw_path_walker::topology::GatewayFilter;
use tgw_path_walker::{
    Gateway, InMemoryTopology, Path, RetryingSource, SnapshotStore, TopologySource, WalkOutcome,
    render, update_routing,
};

fn init_logging(config: &Config) -> anyhow::Result<()> {
    // RUST_LOG wins over the configured level
    let level = config.log_level.as_str().to_lowercase();
    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(format!("tgw_path_walker={}", level)))?;

    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_writer(std::io::stderr)
        .init();
    Ok(())
}

/// Topology file behind retries, or the last snapshot when offline.
fn load_source(config: &Config, store: &SnapshotStore) -> anyhow::Result<Arc<dyn TopologySource>> {
    if config.offline {
        let snapshot = store
            .load()
            .with_context(|| format!("Failed to load snapshot {}", store.path().display()))?;
        tracing::info!(
            "Using snapshot taken at {} ({} gateway(s))",
            snapshot.taken_at.to_rfc3339(),
            snapshot.gateways.len()
        );
        return Ok(Arc::new(snapshot.to_topology()));
    }

    let file = config
        .topology_file
        .as_deref()
        .context("No topology file configured")?;
    let topology = InMemoryTopology::from_json_file(file)
        .with_context(|| format!("Failed to load topology {}", file.display()))?;
    Ok(Arc::new(RetryingSource::new(topology, config.retry.clone())))
}

fn gateway_filter(ids: &[String]) -> GatewayFilter {
    if ids.is_empty() {
        GatewayFilter::all()
    } else {
        GatewayFilter::by_ids(ids.iter().cloned())
    }
}

fn print_routes(gateways: &[Gateway]) {
    for gw in gateways {
        println!("== {} ({}) ==", gw.name, gw.id);
        let names = gw.attachment_names();
        for rt in &gw.route_tables {
            println!("{}\n", render::route_table(rt, &names));
        }
    }
}

async fn print_paths(
    gateways: &[Gateway],
    source: &dyn TopologySource,
    src: std::net::IpAddr,
    dst: std::net::IpAddr,
) {
    for gw in gateways {
        let mut path = Path::new(gw);
        match path.walk(source, src, dst).await {
            Ok(outcome) => {
                println!("{}", render::path(&path));
                if outcome == WalkOutcome::HopLimit {
                    println!("(stopped after {} lookups, path is partial)", tgw_path_walker::MAX_HOPS);
                }

                let names = gw.attachment_names();
                if let Some(rt) = path.source_route_table() {
                    println!("\nSource route table\n{}", render::route_table(rt, &names));
                }
                if let Some(rt) = path.destination_route_table() {
                    println!("\nDestination route table\n{}", render::route_table(rt, &names));
                }
            }
            Err(e) => {
                tracing::debug!("Walk through {} failed: {}", gw.id, e);
                println!("{} ({}): {}", gw.name, gw.id, e.user_message());
                if !path.is_empty() {
                    println!("Partial path: {}", path);
                }
            }
        }
        println!();
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = Config::load()?;
    init_logging(&config)?;
    tracing::info!("tgw-path-walker starting...");

    let store = SnapshotStore::new(&config.data_dir, &config.db_name);
    let source = load_source(&config, &store)?;

    match &config.command {
        Command::Routes { gateways } => {
            let gateways = update_routing(&source, &gateway_filter(gateways)).await?;
            print_routes(&gateways);
        }
        Command::Path { src, dst, gateways } => {
            let gateways = update_routing(&source, &gateway_filter(gateways)).await?;
            if gateways.is_empty() {
                anyhow::bail!("No transit gateway matched");
            }
            print_paths(&gateways, source.as_ref(), *src, *dst).await;
        }
        Command::Sync => {
            let gateways = update_routing(&source, &GatewayFilter::all()).await?;
            let path = store.save(&gateways)?;
            println!("Saved {} gateway(s) to {}", gateways.len(), path.display());
        }
    }

    Ok(())
}
