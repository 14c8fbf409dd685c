//! File and application selection helpers, usable on any transport
//!
//! The same calls work on a plain reader connection and on a
//! [`SecureMessaging`](crate::SecureMessaging) channel.

use apdu_core::{Bytes, CardTransport};
use tracing::debug;

use crate::constants::{READ_BINARY, SELECT_APPLICATION, SELECT_FILE};
use crate::error::Error;

/// SELECT FILE by file identifier under the current DF
pub fn select_file<T: CardTransport>(card: &mut T, file_id: &[u8]) -> Result<(), Error>
where
    Error: From<T::Error>,
{
    debug!(file = %hex::encode_upper(file_id), "Selecting file");
    card.transmit(&SELECT_FILE.with_data(file_id.to_vec()))?;
    Ok(())
}

/// READ BINARY of the currently selected file
pub fn read_binary<T: CardTransport>(card: &mut T) -> Result<Bytes, Error>
where
    Error: From<T::Error>,
{
    Ok(card.transmit(&READ_BINARY)?)
}

/// SELECT an application by its AID, returning the FCI if the card sends one
pub fn select_application<T: CardTransport>(card: &mut T, aid: &[u8]) -> Result<Bytes, Error>
where
    Error: From<T::Error>,
{
    debug!(aid = %hex::encode_upper(aid), "Selecting application");
    Ok(card.transmit(&SELECT_APPLICATION.with_data(aid.to_vec()).with_le(0x00))?)
}
