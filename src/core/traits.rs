//! Capability traits host applications implement.

use crate::packet::{Argument, Bundle, Message, Packet, TimeTag};

/// Receiver of decoded OSC packets.
///
/// Registered with a server and invoked synchronously, in arrival order, for
/// every decoded packet. Listeners are shared across the server's I/O tasks,
/// hence `Send + Sync`.
///
/// # Example
///
/// ```
/// use osc_protocol::core::Listener;
/// use osc_protocol::packet::Message;
///
/// struct Printer;
///
/// impl Listener for Printer {
///     fn on_message(&self, message: &Message) {
///         println!("{} {}", message.address(), message.type_tags());
///     }
/// }
/// ```
pub trait Listener: Send + Sync {
    /// Handle a single message.
    fn on_message(&self, message: &Message);

    /// Handle a bundle.
    ///
    /// The default unpacks the bundle into its leaf messages depth-first,
    /// preserving child order. See [`unpack_bundle`].
    fn on_bundle(&self, bundle: &Bundle) {
        unpack_bundle(self, bundle);
    }
}

/// Visit every leaf message of `bundle` depth-first, in original order.
///
/// Nested bundles are routed through [`Listener::on_bundle`], so a listener
/// that overrides bundle handling still sees inner bundles.
pub fn unpack_bundle<L: Listener + ?Sized>(listener: &L, bundle: &Bundle) {
    for packet in bundle.packets() {
        match packet {
            Packet::Message(message) => listener.on_message(message),
            Packet::Bundle(inner) => listener.on_bundle(inner),
        }
    }
}

/// Construction seam used by the decoder.
///
/// Lets a host application shape decoded packets (address rewriting,
/// argument representation) without touching codec internals. Every method
/// has a default, so `impl PacketFactory for MyFactory {}` is the identity.
pub trait PacketFactory: Send + Sync {
    /// Create the message that decoded arguments are appended to.
    fn create_message(&self, address: &str) -> Message {
        Message::new(address)
    }

    /// Create the bundle that decoded children are appended to.
    fn create_bundle(&self, timetag: TimeTag) -> Bundle {
        Bundle::with_timetag(timetag)
    }

    /// Convert one decoded top-level argument before it is appended.
    fn map_argument(&self, argument: Argument) -> Argument {
        argument
    }
}

/// Factory producing plain [`Message`] and [`Bundle`] values.
#[derive(Debug, Clone, Copy, Default)]
pub struct BasicPacketFactory;

impl PacketFactory for BasicPacketFactory {}
