//! Client-side synchronization of one server-owned chess game.
//!
//! [`GameClient`] is the entry point for front ends: it wraps a
//! [`GameSessionController`] in a worker task, performs the calls the
//! controller asks for through a [`GameApi`], and forwards push notifications
//! from a [`PushConnector`]. Everything observable comes out as
//! [`ClientEvent`]s on a broadcast channel.

pub mod client;
pub mod controller;
pub mod error;
pub mod events;
pub mod push;
pub mod quality;
pub mod session;
pub mod transport;

pub use client::GameClient;
pub use controller::{
    ApiOutcome, Effect, GameSessionController, SessionView, UserCommand, DEFAULT_DIFFICULTY,
};
pub use error::{ClientError, ErrorCategory, ErrorContext, SurfacedError};
pub use events::{ClientEvent, GameOutcome};
pub use push::{NoPushChannel, PushConnector, PushSubscription, WsPushConnector};
pub use quality::{FixedScorer, MoveQuality, MoveScorer, RandomBucketScorer};
pub use session::{GameSession, SessionPhase};
pub use transport::{ApiReply, ApiRequest, GameApi, HttpGameApi};

#[cfg(test)]
#[path = "tests/lib_tests.rs"]
mod tests;
