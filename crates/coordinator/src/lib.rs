//! In-memory coordination of multi-party signing sessions.
//!
//! Parties never talk to each other directly. They register with a session,
//! push opaque per-round payloads through the relay, and poll for the
//! messages addressed to them. The coordinator stores bytes and enforces
//! quorum shape; it never interprets protocol payloads.

pub mod battle;
pub mod config;
pub mod error;
pub mod registry;
pub mod service;
pub mod session;
pub mod sweeper;

pub use battle::{BattleSession, BattleSignatures};
pub use config::{CoordinatorConfig, CoordinatorConfigBuilder};
pub use error::{Result, SessionError};
pub use registry::{IdleTracked, SessionRegistry};
pub use service::{
    BattleCreated, BattleOutcome, Coordinator, FinalizeSummary, JoinedParty, SessionKind,
};
pub use session::Session;
pub use sweeper::{TtlSweeper, TtlSweeperBuilder};
