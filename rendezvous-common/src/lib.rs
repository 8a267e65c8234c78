//! Rendezvous Common Types
//!
//! Shared types used by both the model-executor and the rendezvous-collector:
//! the message envelope that travels over the bus, the transport port used to
//! consume and publish envelopes, and the delivery port used to hand responses
//! back to waiting callers.

pub mod guard;
pub mod message;
pub mod messaging;
pub mod sockets;

pub use guard::catch_panic;
pub use message::{DecodeError, RendezvousMessage};
pub use messaging::{Consumer, MessagingConfig, MessagingError, Producer, REQUEST_TOPIC, RESPONSE_TOPIC};
pub use sockets::{is_valid_socket_id, socket_address, SocketError, SocketWriter, DEFAULT_SOCKET_DIR};
