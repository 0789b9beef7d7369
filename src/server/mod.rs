//! OSC transport server.
//!
//! Binds one endpoint, decodes inbound frames and dispatches packets to
//! registered [`Listener`](crate::core::Listener)s.

mod dispatch;
#[allow(clippy::module_inception)]
mod server;
mod session;

pub use dispatch::*;
pub use server::*;
pub use session::*;
