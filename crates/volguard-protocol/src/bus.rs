//! In-process message bus.
//!
//! One [`Inbox`] belongs to the aggregator. Everyone else holds a [`Postbox`]
//! (cheap to clone) and upgrades it into a typed link: an [`AgentLink`] for a
//! page agent or a [`ClientLink`] for a status surface.

use std::time::Duration;

use crossbeam_channel::{Receiver, RecvTimeoutError, Sender, TryRecvError, bounded, unbounded};
use volguard_config::{LimiterConfig, TabId};

use crate::ProtocolError;
use crate::message::{
    AgentCommand, AgentMessage, ClientRequest, Inbound, LevelStats, PushUpdate, Reply,
};

/// A message plus the channel its answer goes to, if the sender wants one.
#[derive(Debug)]
pub struct Envelope {
    /// The message.
    pub body: Inbound,
    /// Reply slot. `None` for fire-and-forget sends.
    pub reply: Option<Sender<Reply>>,
}

impl Envelope {
    /// Answer the sender. Returns `false` if nobody is waiting any more.
    pub fn respond(&self, reply: Reply) -> bool {
        match &self.reply {
            Some(tx) => tx.send(reply).is_ok(),
            None => false,
        }
    }
}

/// Create a connected inbox/postbox pair.
pub fn bus() -> (Inbox, Postbox) {
    let (tx, rx) = unbounded();
    (Inbox { rx }, Postbox { tx })
}

/// Receiving end, owned by the aggregator.
#[derive(Debug)]
pub struct Inbox {
    rx: Receiver<Envelope>,
}

impl Inbox {
    /// Block until a message arrives.
    ///
    /// Fails with [`ProtocolError::LinkClosed`] once every postbox is gone.
    pub fn recv(&self) -> Result<Envelope, ProtocolError> {
        self.rx.recv().map_err(|_| ProtocolError::LinkClosed)
    }

    /// Take a message if one is queued.
    pub fn try_recv(&self) -> Result<Option<Envelope>, ProtocolError> {
        match self.rx.try_recv() {
            Ok(env) => Ok(Some(env)),
            Err(TryRecvError::Empty) => Ok(None),
            Err(TryRecvError::Disconnected) => Err(ProtocolError::LinkClosed),
        }
    }

    /// Wait up to `timeout` for a message.
    pub fn recv_timeout(&self, timeout: Duration) -> Result<Option<Envelope>, ProtocolError> {
        match self.rx.recv_timeout(timeout) {
            Ok(env) => Ok(Some(env)),
            Err(RecvTimeoutError::Timeout) => Ok(None),
            Err(RecvTimeoutError::Disconnected) => Err(ProtocolError::LinkClosed),
        }
    }

    /// Raw receiver, for use in `select!`.
    pub fn receiver(&self) -> &Receiver<Envelope> {
        &self.rx
    }
}

/// Sending end. Clone freely.
#[derive(Debug, Clone)]
pub struct Postbox {
    tx: Sender<Envelope>,
}

impl Postbox {
    /// Register a page agent for `tab`.
    ///
    /// Returns the agent's link and the receiver its `setConfig` commands
    /// arrive on.
    pub fn connect_agent(
        &self,
        tab: TabId,
    ) -> Result<(AgentLink, Receiver<AgentCommand>), ProtocolError> {
        let (commands_tx, commands_rx) = unbounded();
        self.send(Inbound::Register {
            tab,
            commands: commands_tx,
        })?;
        tracing::debug!(%tab, "agent connected");
        Ok((
            AgentLink {
                tab,
                postbox: self.clone(),
            },
            commands_rx,
        ))
    }

    /// Register a status client that receives `updatePopup` pushes.
    pub fn connect_client(&self) -> Result<ClientLink, ProtocolError> {
        let (tx, rx) = unbounded();
        self.send(Inbound::Subscribe(tx))?;
        Ok(ClientLink {
            postbox: self.clone(),
            updates: rx,
        })
    }

    /// Tell the aggregator a tab is gone.
    pub fn close_tab(&self, tab: TabId) -> Result<(), ProtocolError> {
        self.send(Inbound::TabClosed(tab))
    }

    /// Fire-and-forget send.
    pub fn send(&self, body: Inbound) -> Result<(), ProtocolError> {
        self.tx
            .send(Envelope { body, reply: None })
            .map_err(|_| ProtocolError::LinkClosed)
    }

    /// Send and wait up to `timeout` for the answer.
    pub fn request(&self, body: Inbound, timeout: Duration) -> Result<Reply, ProtocolError> {
        let (reply_tx, reply_rx) = bounded(1);
        self.tx
            .send(Envelope {
                body,
                reply: Some(reply_tx),
            })
            .map_err(|_| ProtocolError::LinkClosed)?;
        match reply_rx.recv_timeout(timeout) {
            Ok(reply) => Ok(reply),
            Err(RecvTimeoutError::Timeout) => Err(ProtocolError::Timeout(timeout)),
            Err(RecvTimeoutError::Disconnected) => Err(ProtocolError::LinkClosed),
        }
    }
}

/// A page agent's view of the bus. Every message is stamped with its tab.
#[derive(Debug, Clone)]
pub struct AgentLink {
    tab: TabId,
    postbox: Postbox,
}

impl AgentLink {
    /// The tab this agent runs in.
    pub fn tab(&self) -> TabId {
        self.tab
    }

    /// `getConfig`: ask for this tab's stored config.
    pub fn request_config(&self, timeout: Duration) -> Result<LimiterConfig, ProtocolError> {
        let reply = self.postbox.request(
            Inbound::Agent {
                tab: self.tab,
                message: AgentMessage::GetConfig,
            },
            timeout,
        )?;
        match reply {
            Reply::Config { config, .. } => Ok(config),
            Reply::Error(reason) => Err(ProtocolError::Rejected(reason.to_string())),
            _ => Err(ProtocolError::UnexpectedReply("getConfig")),
        }
    }

    /// `updateDB`: report a level without waiting for the acknowledgement.
    pub fn report(&self, db: f32) -> Result<(), ProtocolError> {
        self.postbox.send(Inbound::Agent {
            tab: self.tab,
            message: AgentMessage::UpdateDb { db },
        })
    }
}

/// A status surface's view of the bus.
#[derive(Debug)]
pub struct ClientLink {
    postbox: Postbox,
    updates: Receiver<PushUpdate>,
}

impl ClientLink {
    /// `getCurrentDB`.
    pub fn current_levels(
        &self,
        tab: TabId,
        timeout: Duration,
    ) -> Result<LevelStats, ProtocolError> {
        match self
            .postbox
            .request(Inbound::Client(ClientRequest::GetCurrentDb { tab }), timeout)?
        {
            Reply::Levels(stats) => Ok(stats),
            Reply::Error(reason) => Err(ProtocolError::Rejected(reason.to_string())),
            _ => Err(ProtocolError::UnexpectedReply("getCurrentDB")),
        }
    }

    /// `resetPeak`.
    pub fn reset_peak(&self, tab: TabId, timeout: Duration) -> Result<(), ProtocolError> {
        match self
            .postbox
            .request(Inbound::Client(ClientRequest::ResetPeak { tab }), timeout)?
        {
            Reply::Success => Ok(()),
            Reply::Error(reason) => Err(ProtocolError::Rejected(reason.to_string())),
            _ => Err(ProtocolError::UnexpectedReply("resetPeak")),
        }
    }

    /// `updatePopup` pushes for every tab.
    pub fn updates(&self) -> &Receiver<PushUpdate> {
        &self.updates
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread;

    const WAIT: Duration = Duration::from_millis(500);

    #[test]
    fn agent_registers_before_reporting() {
        let (inbox, postbox) = bus();
        let (link, _commands) = postbox.connect_agent(TabId(7)).unwrap();
        link.report(-3.0).unwrap();

        match inbox.recv().unwrap().body {
            Inbound::Register { tab, .. } => assert_eq!(tab, TabId(7)),
            other => panic!("expected Register, got {other:?}"),
        }
        let env = inbox.recv().unwrap();
        assert!(env.reply.is_none());
        match env.body {
            Inbound::Agent { tab, message } => {
                assert_eq!(tab, TabId(7));
                assert_eq!(message, AgentMessage::UpdateDb { db: -3.0 });
            }
            other => panic!("expected Agent, got {other:?}"),
        }
    }

    #[test]
    fn request_config_round_trip() {
        let (inbox, postbox) = bus();
        let (link, _commands) = postbox.connect_agent(TabId(2)).unwrap();

        let server = thread::spawn(move || {
            let _register = inbox.recv().unwrap();
            let env = inbox.recv().unwrap();
            let Inbound::Agent { tab, .. } = env.body else {
                panic!("expected agent message");
            };
            env.respond(Reply::Config {
                tab,
                config: LimiterConfig::new(true, -12.0),
            });
        });

        let config = link.request_config(WAIT).unwrap();
        assert!(config.enabled);
        assert_eq!(config.limit_db, -12.0);
        server.join().unwrap();
    }

    #[test]
    fn request_times_out_when_nobody_answers() {
        let (_inbox, postbox) = bus();
        let (link, _commands) = postbox.connect_agent(TabId(1)).unwrap();
        let err = link.request_config(Duration::from_millis(20)).unwrap_err();
        assert!(matches!(err, ProtocolError::Timeout(_)));
    }

    #[test]
    fn dropped_inbox_is_link_closed() {
        let (inbox, postbox) = bus();
        drop(inbox);
        assert!(matches!(
            postbox.connect_agent(TabId(1)),
            Err(ProtocolError::LinkClosed)
        ));
        assert!(postbox.close_tab(TabId(1)).unwrap_err().is_teardown());
    }

    #[test]
    fn unanswered_envelope_is_link_closed() {
        let (inbox, postbox) = bus();
        let client = postbox.connect_client().unwrap();
        let server = thread::spawn(move || {
            let _subscribe = inbox.recv().unwrap();
            // dropped without responding
            let _env = inbox.recv().unwrap();
        });
        let err = client.current_levels(TabId(1), WAIT).unwrap_err();
        assert!(err.is_teardown());
        server.join().unwrap();
    }

    #[test]
    fn wrong_reply_kind_is_reported() {
        let (inbox, postbox) = bus();
        let client = postbox.connect_client().unwrap();
        let server = thread::spawn(move || {
            let _subscribe = inbox.recv().unwrap();
            let env = inbox.recv().unwrap();
            env.respond(Reply::Success);
        });
        let err = client.current_levels(TabId(1), WAIT).unwrap_err();
        assert!(matches!(err, ProtocolError::UnexpectedReply("getCurrentDB")));
        server.join().unwrap();
    }

    #[test]
    fn fire_and_forget_respond_is_false() {
        let env = Envelope {
            body: Inbound::TabClosed(TabId(1)),
            reply: None,
        };
        assert!(!env.respond(Reply::Success));
    }

    #[test]
    fn try_recv_empty_then_disconnected() {
        let (inbox, postbox) = bus();
        assert!(inbox.try_recv().unwrap().is_none());
        drop(postbox);
        assert!(inbox.try_recv().is_err());
    }
}
