use std::path::PathBuf;
use std::time::{SystemTime, UNIX_EPOCH};

use anyhow::{Context, Result};
use clap::Parser;
use ledger_lights::LightsConfig;
use ledger_lights::sim::{Simulation, VirtualClock, WallClock};
use ledger_lights::util::format_amount;

#[derive(Debug, Parser)]
#[command(author, version, about)]
struct Args {
    #[arg(long)]
    config: Option<PathBuf>,

    #[arg(long)]
    seed: Option<u64>,

    #[arg(long, default_value_t = 30_000)]
    duration_ms: u64,

    #[arg(long, default_value_t = 0)]
    burst: usize,

    #[arg(long, default_value_t = 200)]
    burst_interval_ms: u64,

    #[arg(long)]
    min_interval_ms: Option<u64>,

    #[arg(long)]
    max_interval_ms: Option<u64>,

    #[arg(long)]
    max_nodes: Option<usize>,

    /// Print the final frame snapshot as JSON instead of a summary.
    #[arg(long)]
    json: bool,

    /// Wait on the wall clock between timers instead of skipping ahead.
    #[arg(long)]
    realtime: bool,

    #[arg(long, short)]
    verbose: bool,
}

impl Args {
    fn resolve_config(&self) -> Result<LightsConfig> {
        let mut config = match &self.config {
            Some(path) => LightsConfig::load(path)
                .with_context(|| format!("failed to load config from {}", path.display()))?,
            None => LightsConfig::default(),
        };

        if let Some(seed) = self.seed {
            config.seed = Some(seed);
        }
        if let Some(min_interval_ms) = self.min_interval_ms {
            config.feed.min_interval_ms = min_interval_ms;
        }
        if let Some(max_interval_ms) = self.max_interval_ms {
            config.feed.max_interval_ms = max_interval_ms;
        }
        if let Some(max_nodes) = self.max_nodes {
            config.graph.max_nodes = max_nodes;
        }

        config.validate().context("invalid configuration")?;
        Ok(config)
    }
}

fn main() -> Result<()> {
    let args = Args::parse();
    let default_filter = if args.verbose { "info" } else { "warn" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_filter))
        .init();

    let config = args.resolve_config()?;
    let start_ms = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .context("system clock is before the unix epoch")?
        .as_millis() as u64;

    let mut simulation = Simulation::new(&config, start_ms).context("failed to build simulation")?;
    simulation.start();
    if args.burst > 0 {
        simulation.burst(args.burst, args.burst_interval_ms);
    }

    let end_ms = start_ms.saturating_add(args.duration_ms);
    let stats = if args.realtime {
        simulation.run_until(end_ms, &mut WallClock::starting_at(start_ms))
    } else {
        simulation.run_until(end_ms, &mut VirtualClock)
    };
    simulation.stop();

    let graph = simulation.graph();
    if args.json {
        let snapshot = serde_json::to_string_pretty(&graph.snapshot())
            .context("failed to serialize frame snapshot")?;
        println!("{snapshot}");
        return Ok(());
    }

    let live_volume = graph
        .store()
        .transaction_nodes()
        .iter()
        .filter_map(|node| node.amount())
        .sum::<f64>();

    println!("transactions      {} ({} from bursts)", stats.events, stats.burst_events);
    println!(
        "nodes             {} base + {} transaction",
        graph.store().base_node_count(),
        graph.store().transaction_node_count()
    );
    println!(
        "connections       {} ({} events left isolated)",
        graph.selector().len(),
        stats.isolated
    );
    println!(
        "evictions         {} ({} connections dropped)",
        stats.evicted, stats.dropped_connections
    );
    println!("scale             {:.4}", graph.scale());
    println!("camera distance   {:.2}", graph.camera_distance());
    println!("live volume       {}", format_amount(live_volume));

    Ok(())
}
