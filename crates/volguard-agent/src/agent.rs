//! The page agent.

use std::thread;
use std::time::{Duration, Instant};

use crossbeam_channel::{Receiver, TryRecvError};
use volguard_config::{ConfigPatch, LimiterConfig, TabId, Tuning};
use volguard_core::{AgentPhase, GainController, LevelMeter, LevelReading, ReportThrottle};
use volguard_discovery::{
    AudioGraph, DiscoveryEngine, DiscoverySettings, DomHost, GraphError, HostEvent, ScanReport,
};
use volguard_protocol::{AgentCommand, AgentLink};

use crate::AgentError;
use crate::rescan::RescanQueue;

/// What a successful [`PageAgent::init`] did.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct InitReport {
    /// Config in effect after start-up.
    pub config: LimiterConfig,
    /// Whether the config came from the aggregator (`false`: defaults).
    pub config_from_store: bool,
    /// The initial document scan.
    pub scan: ScanReport,
}

/// One tick's work.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TickReport {
    /// Analyser measurement.
    pub reading: LevelReading,
    /// Gain applied this tick.
    pub gain: f32,
    /// Gain nodes updated.
    pub applied: usize,
    /// Whether a level report went out.
    pub reported: bool,
}

/// Result of [`PageAgent::tick`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum TickOutcome {
    /// Not `Ready`; nothing measured.
    Idle,
    /// Ran normally.
    Ran(TickReport),
    /// The aggregator is gone. Stop ticking.
    Stop,
}

/// Per-page limiter.
///
/// Owns discovery, the meter and the gain controller for one page. Built
/// explicitly and driven by [`tick`](Self::tick) (or [`run`](Self::run));
/// there is no global instance.
pub struct PageAgent<H, G, F> {
    engine: DiscoveryEngine<H>,
    graph: Option<G>,
    graph_factory: F,
    meter: LevelMeter,
    gain: GainController,
    config: LimiterConfig,
    phase: AgentPhase,
    throttle: ReportThrottle,
    rescans: RescanQueue,
    link: AgentLink,
    commands: Receiver<AgentCommand>,
    tuning: Tuning,
}

impl<H, G, F> PageAgent<H, G, F>
where
    H: DomHost,
    G: AudioGraph,
    F: FnMut() -> Result<G, GraphError>,
{
    /// Assemble an agent. Nothing runs until [`init`](Self::init).
    pub fn new(
        host: H,
        graph_factory: F,
        link: AgentLink,
        commands: Receiver<AgentCommand>,
        tuning: Tuning,
    ) -> Self {
        let config = LimiterConfig::default();
        Self {
            engine: DiscoveryEngine::new(host, DiscoverySettings::from(&tuning)),
            graph: None,
            graph_factory,
            meter: LevelMeter::new(tuning.analysis_buffer_len),
            gain: GainController::with_config(config.enabled, config.limit_db),
            config,
            phase: AgentPhase::Idle,
            throttle: ReportThrottle::new(tuning.report_interval()),
            rescans: RescanQueue::new(),
            link,
            commands,
            tuning,
        }
    }

    /// Tab this agent runs in.
    pub fn tab(&self) -> TabId {
        self.link.tab()
    }

    /// Lifecycle phase.
    pub fn phase(&self) -> AgentPhase {
        self.phase
    }

    /// Config in effect.
    pub fn config(&self) -> LimiterConfig {
        self.config
    }

    /// Gain from the last tick.
    pub fn gain(&self) -> f32 {
        self.gain.gain()
    }

    /// Discovery state.
    pub fn engine(&self) -> &DiscoveryEngine<H> {
        &self.engine
    }

    /// The audio graph, once built.
    pub fn graph(&self) -> Option<&G> {
        self.graph.as_ref()
    }

    /// Fetch config, build the graph, scan, and start observing.
    ///
    /// A missing or failed config reply falls back to defaults. A graph that
    /// cannot be built moves the agent to `Failed` for good.
    pub fn init(&mut self, now: Duration) -> Result<InitReport, AgentError> {
        if !self.phase.begin_init() {
            return Err(AgentError::AlreadyStarted(self.phase));
        }
        let tab = self.tab();

        let config_from_store = match self.link.request_config(self.tuning.config_timeout()) {
            Ok(config) => {
                self.apply_patch(ConfigPatch::from(config));
                true
            }
            Err(e) => {
                tracing::warn!(%tab, error = %e, "config unavailable; using defaults");
                false
            }
        };

        let mut graph = match self.graph.take() {
            Some(graph) => graph,
            None => match (self.graph_factory)() {
                Ok(graph) => graph,
                Err(e) => {
                    self.phase.mark_failed();
                    tracing::error!(%tab, error = %e, "audio graph unavailable; limiter inactive");
                    return Err(e.into());
                }
            },
        };

        let scan = self.engine.scan_document(&mut graph, now);
        self.engine.watch(now);
        self.graph = Some(graph);
        self.phase.mark_ready();

        tracing::info!(
            %tab,
            enabled = self.config.enabled,
            limit_db = self.config.limit_db,
            bound = scan.newly_bound,
            "page agent ready"
        );
        Ok(InitReport {
            config: self.config,
            config_from_store,
            scan,
        })
    }

    fn apply_patch(&mut self, patch: ConfigPatch) {
        patch.apply_to(&mut self.config);
        self.gain.set_enabled(self.config.enabled);
        self.gain.set_limit_db(self.config.limit_db);
    }

    /// React to a host notification.
    pub fn handle_event(&mut self, event: &HostEvent, now: Duration) {
        match event {
            HostEvent::PageLoaded => {
                self.rescans.schedule(now + self.tuning.rescan_after_load());
            }
            HostEvent::UserGesture => {
                self.on_gesture();
                self.rescans.schedule(now + self.tuning.rescan_after_gesture());
            }
            _ => {
                if let Some(graph) = self.graph.as_mut() {
                    self.engine.handle_event(graph, event, now);
                }
            }
        }
    }

    fn on_gesture(&mut self) {
        if self.phase.is_terminal() {
            return;
        }
        if self.graph.is_none() {
            match (self.graph_factory)() {
                Ok(graph) => self.graph = Some(graph),
                Err(e) => {
                    tracing::warn!(tab = %self.tab(), error = %e, "graph creation on gesture failed");
                    return;
                }
            }
        }
        if let Some(graph) = self.graph.as_mut()
            && graph.is_suspended()
        {
            match graph.resume() {
                Ok(()) => tracing::info!(tab = %self.link.tab(), "audio context resumed"),
                Err(e) => tracing::warn!(tab = %self.link.tab(), error = %e, "resume failed"),
            }
        }
    }

    /// Drain pending `setConfig` commands. Returns `false` once the
    /// aggregator has dropped the command channel.
    fn drain_commands(&mut self) -> bool {
        loop {
            match self.commands.try_recv() {
                Ok(AgentCommand::SetConfig(patch)) => {
                    self.apply_patch(patch);
                    tracing::debug!(
                        tab = %self.tab(),
                        enabled = self.config.enabled,
                        limit_db = self.config.limit_db,
                        "config updated"
                    );
                }
                Err(TryRecvError::Empty) => return true,
                Err(TryRecvError::Disconnected) => return false,
            }
        }
    }

    /// One pass of the loop: config, host events, discovery housekeeping,
    /// measure, gain, apply, and a throttled report.
    pub fn tick(&mut self, now: Duration) -> TickOutcome {
        if !self.drain_commands() {
            tracing::info!(tab = %self.tab(), "command channel closed; stopping");
            return TickOutcome::Stop;
        }

        for event in self.engine.host_mut().drain_events() {
            self.handle_event(&event, now);
        }

        if !self.phase.is_running() {
            return TickOutcome::Idle;
        }
        let Some(graph) = self.graph.as_mut() else {
            return TickOutcome::Idle;
        };

        if self.rescans.take_due(now) {
            self.engine.scan_document(graph, now);
        }
        self.engine.retry_tick(graph, now);

        let reading = self.meter.measure(graph);
        let gain = self.gain.tick(reading.rms);
        let applied = self.engine.apply_gain(graph, gain);

        let mut reported = false;
        if self.throttle.should_report(now) {
            match self.link.report(reading.db) {
                Ok(()) => reported = true,
                Err(e) if e.is_teardown() => {
                    tracing::info!(tab = %self.link.tab(), "aggregator gone; stopping");
                    return TickOutcome::Stop;
                }
                Err(e) => tracing::warn!(tab = %self.link.tab(), error = %e, "report failed"),
            }
        }

        TickOutcome::Ran(TickReport {
            reading,
            gain,
            applied,
            reported,
        })
    }

    /// Initialize if needed, then tick on the configured interval until the
    /// aggregator goes away. Returns the number of ticks run.
    pub fn run(&mut self) -> u64 {
        let start = Instant::now();
        if self.phase == AgentPhase::Idle
            && let Err(e) = self.init(Duration::ZERO)
        {
            tracing::warn!(tab = %self.tab(), error = %e, "page agent not started");
        }

        let interval = self.tuning.tick_interval();
        let mut ticks = 0;
        loop {
            if self.tick(start.elapsed()) == TickOutcome::Stop {
                break;
            }
            ticks += 1;
            thread::sleep(interval);
        }
        tracing::debug!(tab = %self.tab(), ticks, "page agent stopped");
        ticks
    }
}
