//! OSC core - constants, top-level errors and capability traits.
//!
//! This module has no I/O dependencies. The traits defined here are the
//! seams host applications plug into: [`Listener`] for receiving decoded
//! packets and [`PacketFactory`] for substituting packet construction.

mod constants;
mod error;
mod traits;

pub use constants::*;
pub use error::*;
pub use traits::*;
