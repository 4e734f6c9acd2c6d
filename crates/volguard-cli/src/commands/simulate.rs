//! Simulated tabs against a live aggregator.
//!
//! Each tab gets an in-memory page with a player shell (an element with a
//! shadow root) and a page agent on its own thread. The aggregator runs on
//! another thread; this thread plays the status surface.

use std::collections::BTreeMap;
use std::path::PathBuf;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use clap::Args;
use volguard_agent::PageAgent;
use volguard_aggregator::Aggregator;
use volguard_config::{ConfigStore, LimiterConfig, MemoryStore, TabId, Tuning};
use volguard_discovery::sim::{MemoryDocument, SimulatedGraph};
use volguard_discovery::{ElementId, GraphError, MediaKind};
use volguard_protocol::{Postbox, PushUpdate, bus};

use super::common::{load_tuning, open_store};
use crate::status::StatusLine;

#[derive(Args)]
pub struct SimulateArgs {
    /// Number of tabs
    #[arg(long, default_value = "2")]
    tabs: u32,

    /// How long to run, in seconds
    #[arg(long, default_value = "3")]
    seconds: f32,

    /// Ceiling in dBFS for every tab
    #[arg(long, default_value = "-20", allow_hyphen_values = true)]
    limit: f32,

    /// Turn limiting on
    #[arg(long)]
    enable: bool,

    /// Mount each player this many milliseconds after start, inside its
    /// shadow root where the mutation observer cannot see it
    #[arg(long)]
    late_ms: Option<u64>,

    /// Use a config store file instead of an in-memory one
    #[arg(long)]
    store: Option<PathBuf>,

    /// Tuning file
    #[arg(long)]
    tuning: Option<PathBuf>,

    /// Status refresh interval in milliseconds
    #[arg(long, default_value = "500")]
    refresh_ms: u64,
}

struct Tab {
    id: TabId,
    doc: MemoryDocument,
    shadow: ElementId,
    graph: SimulatedGraph,
    player: Option<ElementId>,
    amplitude: f32,
    agent: JoinHandle<AgentSummary>,
}

struct AgentSummary {
    ticks: u64,
    bound: usize,
    gain: f32,
}

pub fn run(args: SimulateArgs) -> anyhow::Result<()> {
    if args.tabs == 0 {
        anyhow::bail!("--tabs must be at least 1");
    }
    let total = Duration::try_from_secs_f32(args.seconds)
        .ok()
        .filter(|d| !d.is_zero())
        .ok_or_else(|| anyhow::anyhow!("--seconds must be positive and fit in a duration"))?;
    let config = LimiterConfig::new(args.enable, args.limit).validated()?;
    let tuning = load_tuning(args.tuning.clone())?;

    match args.store.clone() {
        Some(path) => simulate(&args, total, config, tuning, open_store(Some(path))?),
        None => simulate(&args, total, config, tuning, MemoryStore::new()),
    }
}

fn simulate<S>(
    args: &SimulateArgs,
    total: Duration,
    config: LimiterConfig,
    tuning: Tuning,
    store: S,
) -> anyhow::Result<()>
where
    S: ConfigStore + Clone + 'static,
{
    for id in 1..=args.tabs {
        store.set(TabId(id), config)?;
    }

    let (inbox, postbox) = bus();
    let aggregator = Aggregator::new(store.clone(), &tuning);
    let server = thread::spawn(move || aggregator.run(inbox));
    let client = postbox.connect_client()?;

    println!(
        "simulating {} tab(s) for {:.1}s, limiter {} at {:.1} dBFS",
        args.tabs,
        args.seconds,
        if config.enabled { "on" } else { "off" },
        config.limit_db
    );

    let mut tabs = Vec::new();
    for id in 1..=args.tabs {
        tabs.push(open_tab(TabId(id), &postbox, &tuning, args.late_ms.is_none())?);
    }

    let start = Instant::now();
    let refresh = Duration::from_millis(args.refresh_ms.max(10));
    let mut latest: BTreeMap<TabId, PushUpdate> = BTreeMap::new();
    let mut next_refresh = refresh;

    while start.elapsed() < total {
        if let Some(late) = args.late_ms
            && start.elapsed() >= Duration::from_millis(late)
        {
            for tab in tabs.iter_mut().filter(|t| t.player.is_none()) {
                tab.player = Some(mount_player(&tab.doc, tab.shadow, tab.amplitude));
                tracing::info!(tab = %tab.id, "player mounted");
            }
        }

        for update in client.updates().try_iter() {
            latest.insert(update.tab, update);
        }
        if start.elapsed() >= next_refresh {
            print_status(&latest, &store);
            next_refresh += refresh;
        }
        thread::sleep(Duration::from_millis(10));
    }

    for update in client.updates().try_iter() {
        latest.insert(update.tab, update);
    }

    println!("summary:");
    for tab in tabs {
        postbox.close_tab(tab.id)?;
        let summary = tab
            .agent
            .join()
            .map_err(|_| anyhow::anyhow!("agent thread for tab {} panicked", tab.id))?;
        let applied = tab
            .player
            .and_then(|p| tab.graph.element_gain(p))
            .unwrap_or(1.0);
        let line = latest.get(&tab.id).map(|u| StatusLine {
            tab: tab.id,
            stats: u.stats,
            limit_db: config.limit_db,
        });
        match line {
            Some(line) => println!("  {line}"),
            None => println!("  tab {} reported nothing", tab.id),
        }
        println!(
            "    bound {} element(s), gain {:.3} (node {:.3}), {} ticks",
            summary.bound, summary.gain, applied, summary.ticks
        );
    }

    drop(client);
    drop(postbox);
    let aggregator = server
        .join()
        .map_err(|_| anyhow::anyhow!("aggregator thread panicked"))?;
    let leftover = aggregator.store().entries()?.len();
    println!("closed all tabs; {leftover} stored config(s) remain");
    Ok(())
}

fn open_tab(id: TabId, postbox: &Postbox, tuning: &Tuning, mount_now: bool) -> anyhow::Result<Tab> {
    let (doc, body) = MemoryDocument::with_body();
    let shell = doc.create_element();
    doc.append(body, shell);
    let shadow = doc
        .attach_shadow(shell)
        .ok_or_else(|| anyhow::anyhow!("cannot attach shadow root"))?;

    // tab 1 is loudest
    let amplitude = 0.9 / id.0 as f32;
    let player = mount_now.then(|| mount_player(&doc, shadow, amplitude));
    doc.finish_loading();

    let graph = SimulatedGraph::new(doc.clone());
    let (link, commands) = postbox.connect_agent(id)?;

    let agent = {
        let doc = doc.clone();
        let graph = graph.clone();
        let tuning = tuning.clone();
        thread::Builder::new()
            .name(format!("agent-{id}"))
            .spawn(move || {
                let factory = move || Ok::<_, GraphError>(graph.clone());
                let mut agent = PageAgent::new(doc, factory, link, commands, tuning);
                let ticks = agent.run();
                AgentSummary {
                    ticks,
                    bound: agent.engine().registry().len(),
                    gain: agent.gain(),
                }
            })?
    };

    Ok(Tab {
        id,
        doc,
        shadow,
        graph,
        player,
        amplitude,
        agent,
    })
}

fn mount_player(doc: &MemoryDocument, shadow: ElementId, amplitude: f32) -> ElementId {
    let video = doc.create_media(MediaKind::Video, true, amplitude);
    doc.append(shadow, video);
    video
}

fn print_status<S: ConfigStore>(latest: &BTreeMap<TabId, PushUpdate>, store: &S) {
    for update in latest.values() {
        let limit_db = store
            .get_or_default(update.tab)
            .map(|c| c.limit_db)
            .unwrap_or(volguard_core::DEFAULT_LIMIT_DB);
        let line = StatusLine {
            tab: update.tab,
            stats: update.stats,
            limit_db,
        };
        println!("{line}");
    }
}
