//! Message protocol between page agents, the aggregator, and status clients.
//!
//! Three kinds of context talk to each other, always asynchronously and always
//! best-effort:
//!
//! | Message | Direction | Reply |
//! |---|---|---|
//! | `getConfig` | agent → aggregator | [`Reply::Config`] |
//! | `updateDB` | agent → aggregator | [`Reply::Success`] (agents never wait for it) |
//! | `setConfig` | aggregator → agent | none |
//! | `getCurrentDB` | client → aggregator | [`Reply::Levels`] |
//! | `resetPeak` | client → aggregator | [`Reply::Success`] |
//! | `updatePopup` | aggregator → clients | none |
//!
//! [`bus`] wires these up in-process over crossbeam channels; [`codec`]
//! encodes them as JSON for hosts that cross a process boundary.
//!
//! # Example
//!
//! ```rust
//! use volguard_protocol::{AgentMessage, Inbound, bus};
//! use volguard_config::TabId;
//!
//! let (inbox, postbox) = bus();
//! let (link, _commands) = postbox.connect_agent(TabId(1)).unwrap();
//! link.report(-12.0).unwrap();
//!
//! // aggregator side: a registration, then the report
//! assert!(matches!(inbox.recv().unwrap().body, Inbound::Register { .. }));
//! let env = inbox.recv().unwrap();
//! assert!(matches!(env.body, Inbound::Agent { message: AgentMessage::UpdateDb { .. }, .. }));
//! ```

mod bus;
pub mod codec;
mod error;
pub mod level;
mod message;

pub use bus::{AgentLink, ClientLink, Envelope, Inbox, Postbox, bus};
pub use error::ProtocolError;
pub use message::{
    AgentCommand, AgentMessage, ClientRequest, Inbound, LevelStats, PushUpdate, Reply,
};
pub use volguard_config::{ConfigPatch, LimiterConfig, TabId};
