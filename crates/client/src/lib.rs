//! Party-side client for the signing session relay.
//!
//! [`CoordinatorClient`] wraps the HTTP surface; [`run_rounds`] and
//! [`run_battle`] drive a whole session for one party, with the protocol
//! cryptography supplied through the [`RoundDriver`] and [`BattleSigner`]
//! traits.

pub mod client;
pub mod driver;
pub mod error;

pub use client::{
    BattleHandle, BattleResult, CoordinatorClient, FinalizeReport, JoinedSession,
    OutboundMessage, SessionKind,
};
pub use driver::{run_battle, run_rounds, BattleSigner, RoundDriver};
pub use error::{ClientError, Result};
