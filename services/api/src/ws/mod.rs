//! WebSocket Relay
//!
//! This module contains the realtime path of the gateway. It is structured
//! into submodules for clarity:
//!
//! - `protocol`: wire types for upstream events and gateway-originated messages.
//! - `session`: connection lifecycle, persona selection, and teardown.
//! - `upstream`: the single per-session connection to the realtime peer.
//! - `relay`: the two message pumps and tool-call interception.

pub mod protocol;
pub mod relay;
pub mod session;
pub mod upstream;

pub use session::ws_handler;
