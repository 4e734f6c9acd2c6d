//! Page agent against an in-memory page and a stand-in aggregator.

use std::thread::{self, JoinHandle};
use std::time::Duration;

use crossbeam_channel::Sender;
use volguard_agent::{AgentError, PageAgent, TickOutcome};
use volguard_config::{ConfigPatch, LimiterConfig, TabId, Tuning};
use volguard_core::AgentPhase;
use volguard_discovery::sim::{MemoryDocument, SimulatedGraph};
use volguard_discovery::{AudioGraph, ElementId, GraphError, MediaKind};
use volguard_protocol::{AgentCommand, AgentMessage, Inbound, Inbox, Reply, bus};

type Factory = Box<dyn FnMut() -> Result<SimulatedGraph, GraphError> + Send>;
type Agent = PageAgent<MemoryDocument, SimulatedGraph, Factory>;

const TAB: TabId = TabId(11);

fn ms(v: u64) -> Duration {
    Duration::from_millis(v)
}

/// Answer the agent's `getConfig`, then hand back the inbox and the agent's
/// command sender.
fn serve_config(inbox: Inbox, config: LimiterConfig) -> JoinHandle<(Inbox, Sender<AgentCommand>)> {
    thread::spawn(move || {
        let mut commands = None;
        loop {
            let env = inbox.recv().unwrap();
            match &env.body {
                Inbound::Register { commands: tx, .. } => commands = Some(tx.clone()),
                Inbound::Agent {
                    tab,
                    message: AgentMessage::GetConfig,
                } => {
                    env.respond(Reply::Config { tab: *tab, config });
                    break;
                }
                _ => {}
            }
        }
        (inbox, commands.unwrap())
    })
}

struct Page {
    doc: MemoryDocument,
    body: ElementId,
    graph: SimulatedGraph,
}

fn page() -> Page {
    let (doc, body) = MemoryDocument::with_body();
    let graph = SimulatedGraph::new(doc.clone());
    Page { doc, body, graph }
}

fn agent_on(page: &Page, tuning: Tuning) -> (Agent, Inbox) {
    let (inbox, postbox) = bus();
    let (link, commands) = postbox.connect_agent(TAB).unwrap();
    let graph = page.graph.clone();
    let factory: Factory = Box::new(move || Ok(graph.clone()));
    (
        PageAgent::new(page.doc.clone(), factory, link, commands, tuning),
        inbox,
    )
}

fn started(page: &Page, config: LimiterConfig) -> (Agent, Inbox, Sender<AgentCommand>) {
    let (mut agent, inbox) = agent_on(page, Tuning::default());
    let server = serve_config(inbox, config);
    agent.init(Duration::ZERO).unwrap();
    let (inbox, commands) = server.join().unwrap();
    (agent, inbox, commands)
}

fn reports(inbox: &Inbox) -> Vec<f32> {
    let mut out = Vec::new();
    while let Some(env) = inbox.try_recv().unwrap() {
        if let Inbound::Agent {
            message: AgentMessage::UpdateDb { db },
            ..
        } = env.body
        {
            out.push(db);
        }
    }
    out
}

#[test]
fn init_applies_stored_config() {
    let page = page();
    let (mut agent, inbox) = agent_on(&page, Tuning::default());
    let server = serve_config(inbox, LimiterConfig::new(true, -18.0));

    let report = agent.init(Duration::ZERO).unwrap();
    server.join().unwrap();

    assert!(report.config_from_store);
    assert_eq!(agent.phase(), AgentPhase::Ready);
    assert_eq!(agent.config(), LimiterConfig::new(true, -18.0));
    assert!(agent.engine().is_observing());
}

#[test]
fn unanswered_config_falls_back_to_defaults() {
    let page = page();
    let tuning = Tuning {
        config_timeout_ms: 20,
        ..Tuning::default()
    };
    let (mut agent, _inbox) = agent_on(&page, tuning);

    let report = agent.init(Duration::ZERO).unwrap();
    assert!(!report.config_from_store);
    assert_eq!(report.config, LimiterConfig::default());
    assert_eq!(agent.phase(), AgentPhase::Ready);
}

#[test]
fn graph_failure_is_terminal() {
    let page = page();
    let (_inbox, postbox) = bus();
    let (link, commands) = postbox.connect_agent(TAB).unwrap();
    let factory: Factory = Box::new(|| Err(GraphError::unavailable("denied")));
    let tuning = Tuning {
        config_timeout_ms: 20,
        ..Tuning::default()
    };
    let mut agent: Agent = PageAgent::new(page.doc.clone(), factory, link, commands, tuning);

    let err = agent.init(Duration::ZERO).unwrap_err();
    assert!(matches!(err, AgentError::Graph(_)));
    assert_eq!(agent.phase(), AgentPhase::Failed);

    page.doc.user_gesture();
    assert_eq!(agent.tick(ms(10)), TickOutcome::Idle);
    assert!(agent.graph().is_none());
    assert!(matches!(
        agent.init(ms(20)),
        Err(AgentError::AlreadyStarted(AgentPhase::Failed))
    ));
}

#[test]
fn loud_media_is_limited_and_reported() {
    let page = page();
    let video = page.doc.create_media(MediaKind::Video, true, 1.0);
    page.doc.append(page.body, video);
    let (mut agent, inbox, _commands) = started(&page, LimiterConfig::new(true, -20.0));

    let TickOutcome::Ran(tick) = agent.tick(Duration::ZERO) else {
        panic!("agent should be running");
    };
    let expected = 0.1 / tick.reading.rms;
    assert!((tick.gain - expected).abs() < 1e-4);
    assert_eq!(tick.applied, 1);
    assert!(tick.reported);
    assert_eq!(page.graph.element_gain(video), Some(tick.gain));

    let sent = reports(&inbox);
    assert_eq!(sent.len(), 1);
    assert!((sent[0] - tick.reading.db).abs() < 1e-6);
}

#[test]
fn disabled_limiter_applies_unity() {
    let page = page();
    let video = page.doc.create_media(MediaKind::Video, true, 1.0);
    page.doc.append(page.body, video);
    let (mut agent, _inbox, _commands) = started(&page, LimiterConfig::new(false, -40.0));

    let TickOutcome::Ran(tick) = agent.tick(Duration::ZERO) else {
        panic!("agent should be running");
    };
    assert_eq!(tick.gain, 1.0);
    assert_eq!(page.graph.element_gain(video), Some(1.0));
}

#[test]
fn set_config_takes_effect_next_tick() {
    let page = page();
    let video = page.doc.create_media(MediaKind::Video, true, 1.0);
    page.doc.append(page.body, video);
    let (mut agent, _inbox, commands) = started(&page, LimiterConfig::default());

    agent.tick(Duration::ZERO);
    assert_eq!(agent.gain(), 1.0);

    commands
        .send(AgentCommand::SetConfig(
            ConfigPatch::empty().with_enabled(true).with_limit_db(-30.0),
        ))
        .unwrap();
    agent.tick(ms(33));
    assert!(agent.config().enabled);
    assert_eq!(agent.config().limit_db, -30.0);
    assert!(agent.gain() < 0.1);

    commands
        .send(AgentCommand::SetConfig(ConfigPatch::empty().with_enabled(false)))
        .unwrap();
    agent.tick(ms(66));
    assert_eq!(agent.gain(), 1.0);
    assert_eq!(page.graph.element_gain(video), Some(1.0));
}

#[test]
fn reports_are_throttled() {
    let page = page();
    let (mut agent, inbox, _commands) = started(&page, LimiterConfig::default());

    let flags: Vec<bool> = [0, 33, 66, 99, 132]
        .into_iter()
        .map(|t| match agent.tick(ms(t)) {
            TickOutcome::Ran(r) => r.reported,
            other => panic!("unexpected {other:?}"),
        })
        .collect();
    assert_eq!(flags, vec![true, false, true, false, true]);

    let sent = reports(&inbox);
    assert_eq!(sent.len(), 3);
    assert!(sent.iter().all(|db| *db == f32::NEG_INFINITY));
}

#[test]
fn aggregator_teardown_stops_the_loop() {
    let page = page();
    let (mut agent, inbox, commands) = started(&page, LimiterConfig::default());
    drop(inbox);
    assert_eq!(agent.tick(Duration::ZERO), TickOutcome::Stop);
    drop(commands);
}

#[test]
fn closed_command_channel_stops_the_loop() {
    let page = page();
    let (mut agent, _inbox, commands) = started(&page, LimiterConfig::default());
    drop(commands);
    assert_eq!(agent.tick(Duration::ZERO), TickOutcome::Stop);
}

#[test]
fn gesture_resumes_suspended_context() {
    let (doc, body) = MemoryDocument::with_body();
    let audio = doc.create_media(MediaKind::Audio, true, 0.5);
    doc.append(body, audio);
    let graph = SimulatedGraph::suspended(doc.clone());
    let page = Page { doc, body, graph };
    let (mut agent, _inbox, _commands) = started(&page, LimiterConfig::default());

    let TickOutcome::Ran(quiet) = agent.tick(Duration::ZERO) else {
        panic!("agent should be running");
    };
    assert_eq!(quiet.reading.rms, 0.0);

    page.doc.user_gesture();
    let TickOutcome::Ran(loud) = agent.tick(ms(33)) else {
        panic!("agent should be running");
    };
    assert!(!page.graph.is_suspended());
    assert!(loud.reading.rms > 0.3);
}

#[test]
fn page_load_schedules_a_rescan() {
    let page = page();
    let tuning = Tuning {
        retry_max_attempts: 0,
        ..Tuning::default()
    };
    // player shell exists at load; its shadow tree is invisible to the observer
    let host = page.doc.create_element();
    page.doc.append(page.body, host);
    let shadow = page.doc.attach_shadow(host).unwrap();

    let (mut agent, inbox) = agent_on(&page, tuning);
    let server = serve_config(inbox, LimiterConfig::default());
    agent.init(Duration::ZERO).unwrap();
    let (_inbox, _commands) = server.join().unwrap();

    page.doc.finish_loading();
    agent.tick(Duration::ZERO);

    let video = page.doc.create_media(MediaKind::Video, true, 0.5);
    page.doc.append(shadow, video);

    agent.tick(ms(1999));
    assert!(!agent.engine().registry().contains(video));
    agent.tick(ms(2000));
    assert!(agent.engine().registry().contains(video));
}
