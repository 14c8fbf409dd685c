//! PACE (Password Authenticated Connection Establishment) for eID cards
//!
//! Implements the ECDH Generic Mapping variant on NIST P-256 with AES-256
//! (`id-PACE-ECDH-GM-AES-CBC-CMAC-256`) and the secure messaging channel it
//! establishes. Everything runs over any [`apdu_core::CardTransport`].
//!
//! ```no_run
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! use apdu_transport_pcsc::{ConnectStrategy, PcscConfig, PcscDeviceManager};
//! use eid_pace::{PasswordType, open_secure_channel, read_binary, select_file};
//!
//! let manager = PcscDeviceManager::new()?;
//! let transport = manager.connect_strategy(ConnectStrategy::AnyCard, PcscConfig::default())?;
//!
//! let mut channel = open_secure_channel(transport, b"123456", PasswordType::Can)?;
//! select_file(&mut channel, &[0x50, 0x00])?;
//! select_file(&mut channel, &[0x50, 0x01])?;
//! let surname = read_binary(&mut channel)?;
//! # Ok(())
//! # }
//! ```
#![cfg_attr(not(test), warn(unused_crate_dependencies))]
#![forbid(unsafe_code)]
#![warn(missing_docs)]

mod card_access;
pub mod constants;
pub mod crypto;
pub mod ec;
mod error;
mod file;
pub mod kdf;
mod pace;
mod secure_messaging;
mod tlv;
pub mod token;

pub use card_access::{CardAccessInfo, read_card_access};
pub use error::{Error, Result, Step};
pub use file::{read_binary, select_application, select_file};
pub use kdf::SessionKeys;
pub use pace::{PasswordType, establish, open_secure_channel, set_authentication_template};
pub use secure_messaging::{SecureMessaging, UnprotectedResponse};
