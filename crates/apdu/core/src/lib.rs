//! Core traits and types for APDU (Application Protocol Data Unit) operations
//!
//! This crate provides the foundational types and traits for working with smart card
//! APDU commands and responses according to ISO/IEC 7816-4.
//!
//! ## Overview
//!
//! - [`Command`]: a short command APDU (header, optional data, optional Le)
//! - [`Response`]: a response APDU split into payload and [`StatusWord`]
//! - [`CardTransport`]: the two-operation contract every card link implements,
//!   whether it talks to a reader directly or wraps another transport in a
//!   protected channel
#![cfg_attr(not(test), warn(unused_crate_dependencies))]
#![forbid(unsafe_code)]
#![warn(missing_docs, rustdoc::missing_crate_level_docs)]

// Re-export bytes for convenience
pub use bytes::{Bytes, BytesMut};

pub mod command;
pub mod error;
pub mod response;
pub mod transport;

pub use command::{Command, ExpectedLength, MAX_SHORT_DATA_LEN};
pub use error::TransportError;
pub use response::{Response, StatusWord};
pub use transport::CardTransport;

/// Prelude module containing commonly used traits and types
pub mod prelude {
    pub use crate::{Bytes, BytesMut};

    pub use crate::command::{Command, ExpectedLength};
    pub use crate::error::TransportError;
    pub use crate::response::{Response, StatusWord};
    pub use crate::transport::CardTransport;
}
