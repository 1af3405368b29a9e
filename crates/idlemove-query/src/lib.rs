//! idlemove-query: ServerQuery IO boundary.
//! Provides the wire codec, a mock-injectable transport trait, the real TCP
//! transport, and a typed client over the commands the poller consumes.
//! No decision logic — pure IO boundary.

pub mod client;
pub mod error;
pub mod transport;
pub mod wire;

pub use client::{ClientEntry, ClientStatus, QueryClient, WhoAmI};
pub use error::QueryError;
pub use transport::{QueryTransport, TcpTransport};
pub use wire::{CommandStatus, escape, parse_fields, parse_status_line, unescape};
