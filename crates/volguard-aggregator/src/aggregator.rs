//! The aggregator actor.

use std::collections::{BTreeMap, BTreeSet};

use crossbeam_channel::{Receiver, Sender, never, select};
use volguard_config::{ConfigChange, ConfigPatch, ConfigStore, TabId, Tuning};
use volguard_protocol::{
    AgentCommand, AgentMessage, ClientRequest, Envelope, Inbound, Inbox, LevelStats, PushUpdate,
    Reply,
};

use crate::TabStateRecord;

/// Owns every tab's statistics and relays config to page agents.
///
/// Single-threaded: all mutation happens inside [`handle`](Self::handle),
/// [`on_config_change`](Self::on_config_change) and
/// [`on_tab_removed`](Self::on_tab_removed), which [`run`](Self::run) calls
/// from one loop.
pub struct Aggregator<S> {
    store: S,
    changes: Receiver<ConfigChange>,
    records: BTreeMap<TabId, TabStateRecord>,
    agents: BTreeMap<TabId, Sender<AgentCommand>>,
    closed: BTreeSet<TabId>,
    clients: Vec<Sender<PushUpdate>>,
    history_capacity: usize,
    ema_alpha: f32,
}

impl<S: ConfigStore> Aggregator<S> {
    /// Create an aggregator over `store`, subscribing to its changes.
    pub fn new(store: S, tuning: &Tuning) -> Self {
        let changes = store.subscribe();
        Self {
            store,
            changes,
            records: BTreeMap::new(),
            agents: BTreeMap::new(),
            closed: BTreeSet::new(),
            clients: Vec::new(),
            history_capacity: tuning.history_capacity,
            ema_alpha: tuning.ema_alpha,
        }
    }

    /// The config store.
    pub fn store(&self) -> &S {
        &self.store
    }

    /// Stats for `tab`, if it has reported.
    pub fn stats(&self, tab: TabId) -> Option<LevelStats> {
        self.records.get(&tab).map(TabStateRecord::stats)
    }

    /// Full record for `tab`.
    pub fn record(&self, tab: TabId) -> Option<&TabStateRecord> {
        self.records.get(&tab)
    }

    /// Tabs with a record.
    pub fn tabs(&self) -> Vec<TabId> {
        self.records.keys().copied().collect()
    }

    /// Connected agents.
    pub fn agent_count(&self) -> usize {
        self.agents.len()
    }

    /// Live push subscribers.
    pub fn client_count(&self) -> usize {
        self.clients.len()
    }

    /// Dispatch one envelope, answering it if the sender waits.
    pub fn handle(&mut self, envelope: Envelope) {
        let reply = match envelope.body {
            Inbound::Register { tab, ref commands } => {
                self.agents.insert(tab, commands.clone());
                self.closed.remove(&tab);
                tracing::debug!(%tab, "agent registered");
                None
            }
            Inbound::Agent { tab, message } => Some(self.handle_agent(tab, message)),
            Inbound::Client(request) => Some(self.handle_client(request)),
            Inbound::Subscribe(ref tx) => {
                self.clients.push(tx.clone());
                None
            }
            Inbound::TabClosed(tab) => {
                self.on_tab_removed(tab);
                None
            }
        };
        if let Some(reply) = reply {
            // requester may have timed out already
            envelope.respond(reply);
        }
    }

    /// `getConfig` / `updateDB` from a page agent.
    pub fn handle_agent(&mut self, tab: TabId, message: AgentMessage) -> Reply {
        match message {
            AgentMessage::GetConfig => match self.store.get_or_default(tab) {
                Ok(config) => Reply::Config { tab, config },
                Err(e) => {
                    tracing::warn!(%tab, error = %e, "config lookup failed");
                    Reply::Error("config store unavailable")
                }
            },
            AgentMessage::UpdateDb { .. } if self.closed.contains(&tab) => {
                tracing::debug!(%tab, "dropping report from closed tab");
                Reply::Error("tab closed")
            }
            AgentMessage::UpdateDb { db } => {
                let (capacity, alpha) = (self.history_capacity, self.ema_alpha);
                let record = self
                    .records
                    .entry(tab)
                    .or_insert_with(|| TabStateRecord::new(capacity, alpha));
                record.ingest(db);
                let stats = record.stats();
                self.push(PushUpdate { tab, stats });
                Reply::Success
            }
        }
    }

    /// `getCurrentDB` / `resetPeak` from a status client.
    pub fn handle_client(&mut self, request: ClientRequest) -> Reply {
        match request {
            ClientRequest::GetCurrentDb { tab } => {
                Reply::Levels(self.stats(tab).unwrap_or(LevelStats::SILENT))
            }
            ClientRequest::ResetPeak { tab } => {
                if let Some(record) = self.records.get_mut(&tab) {
                    record.reset_peak();
                }
                Reply::Success
            }
        }
    }

    fn push(&mut self, update: PushUpdate) {
        let before = self.clients.len();
        self.clients.retain(|tx| tx.send(update).is_ok());
        let dropped = before - self.clients.len();
        if dropped > 0 {
            tracing::debug!(dropped, "status clients gone");
        }
    }

    /// Relay a stored change to the affected tab only. Removals are not
    /// relayed.
    pub fn on_config_change(&mut self, change: ConfigChange) {
        let Some(config) = change.new_value else {
            return;
        };
        let tab = change.tab;
        let Some(agent) = self.agents.get(&tab) else {
            tracing::debug!(%tab, "config changed for tab without agent");
            return;
        };
        if agent
            .send(AgentCommand::SetConfig(ConfigPatch::from(config)))
            .is_err()
        {
            tracing::debug!(%tab, "agent gone; dropping its command channel");
            self.agents.remove(&tab);
        }
    }

    /// Tab closed: forget its stats, disconnect its agent, erase its config.
    /// Reports still in flight from that tab are dropped until an agent
    /// registers under the same id again.
    pub fn on_tab_removed(&mut self, tab: TabId) {
        self.closed.insert(tab);
        self.records.remove(&tab);
        self.agents.remove(&tab);
        if let Err(e) = self.store.remove(tab) {
            tracing::warn!(%tab, error = %e, "failed to erase config for closed tab");
        }
        tracing::info!(%tab, "tab closed");
    }

    /// Serve the inbox and store changes until every postbox is dropped.
    pub fn run(mut self, inbox: Inbox) -> Self {
        let mut changes = self.changes.clone();
        loop {
            select! {
                recv(inbox.receiver()) -> msg => match msg {
                    Ok(envelope) => self.handle(envelope),
                    Err(_) => break,
                },
                recv(changes) -> change => match change {
                    Ok(change) => self.on_config_change(change),
                    Err(_) => changes = never(),
                },
            }
        }
        tracing::info!(tabs = self.records.len(), "aggregator stopped");
        self
    }
}
