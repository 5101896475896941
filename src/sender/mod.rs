//! Batch delivery over HTTP.
//!
//! The sender depends only on the narrow [`Transport`] capability, so tests
//! can swap the real `reqwest`-backed transport for doubles.

pub mod http;
pub mod transport;

pub use http::{HttpSender, SendError};
pub use transport::{ReqwestTransport, Transport, TransportError};
