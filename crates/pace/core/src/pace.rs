//! The PACE handshake: ECDH Generic Mapping on P-256 with AES-256
//!
//! [`establish`] runs the full exchange over a plain transport and returns
//! the session keys; [`open_secure_channel`] additionally wraps the
//! transport in [`SecureMessaging`]. Every failure is reported as
//! [`Error::Step`] naming the round trip it happened in. A failed attempt
//! leaves no state behind, so the caller may simply try again; each attempt
//! draws fresh ephemeral keys.

use std::fmt;

use apdu_core::{CardTransport, Command, TransportError};
use tracing::{debug, info};

use crate::card_access::read_card_access;
use crate::constants::{GENERAL_AUTHENTICATE, GENERAL_AUTHENTICATE_CHAINED, MSE_SET_AT, tags};
use crate::ec::{self, CurvePoint};
use crate::error::{Error, Result, Step, StepExt};
use crate::kdf::{SessionKeys, decrypt_nonce};
use crate::secure_messaging::SecureMessaging;
use crate::tlv;
use crate::token;

/// Which password the handshake is run with
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum PasswordType {
    /// Card access number, printed on the card
    #[default]
    Can,
    /// Personal identification number
    Pin,
    /// PIN unblocking key
    Puk,
}

impl PasswordType {
    /// Password reference sent in MSE:SET AT
    pub const fn reference(self) -> u8 {
        match self {
            Self::Can => 0x02,
            Self::Pin => 0x03,
            Self::Puk => 0x04,
        }
    }
}

impl fmt::Display for PasswordType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Can => f.write_str("CAN"),
            Self::Pin => f.write_str("PIN"),
            Self::Puk => f.write_str("PUK"),
        }
    }
}

/// Run PACE over a plain transport and return the agreed session keys
///
/// An empty `password` runs the handshake in demonstration mode: the card
/// will normally reject it, but every step up to that point is exercised.
pub fn establish<T: CardTransport>(
    card: &mut T,
    password: &[u8],
    password_type: PasswordType,
) -> Result<SessionKeys>
where
    Error: From<T::Error>,
{
    if password.is_empty() {
        info!("No password supplied, running PACE in demonstration mode");
    }
    info!(password = %password_type, "Starting PACE");

    let card_access = read_card_access(card)
        .and_then(|info| info.validate().map(|()| info))
        .during(Step::ReadCardAccess)?;
    let protocol = card_access.protocol();

    set_authentication_template(card, protocol, password_type)
        .during(Step::SetAuthenticationTemplate)?;

    let encrypted_nonce = general_authenticate(
        card,
        GENERAL_AUTHENTICATE_CHAINED,
        None,
        tags::ENCRYPTED_NONCE,
    )
    .during(Step::GetNonce)?;
    let nonce = decrypt_nonce(password, &encrypted_nonce)
        .and_then(|nonce| ec::scalar_from_bytes(&nonce))
        .during(Step::DecryptNonce)?;
    debug!("Decrypted nonce");

    let generator = map_nonce(card, &nonce).during(Step::MapNonce)?;
    let (terminal_key, card_key, keys) =
        agree_keys(card, &generator).during(Step::KeyAgreement)?;

    mutual_authentication(card, &keys, protocol, &terminal_key, &card_key)
        .during(Step::MutualAuthentication)?;

    info!("PACE established");
    Ok(keys)
}

/// Run PACE and wrap the transport in a secure messaging channel
pub fn open_secure_channel<T: CardTransport<Error = TransportError>>(
    mut transport: T,
    password: &[u8],
    password_type: PasswordType,
) -> Result<SecureMessaging<T>> {
    let keys = establish(&mut transport, password, password_type)?;
    Ok(SecureMessaging::new(transport, keys))
}

/// MSE:SET AT selecting the protocol and password for mutual authentication
pub fn set_authentication_template<T: CardTransport>(
    card: &mut T,
    protocol: &[u8],
    password_type: PasswordType,
) -> Result<()>
where
    Error: From<T::Error>,
{
    let mut data = tlv::primitive(tags::CRYPTOGRAPHIC_MECHANISM, protocol.to_vec())?.to_vec();
    data.extend(
        tlv::primitive(tags::PASSWORD_REFERENCE, vec![password_type.reference()])?.to_vec(),
    );

    debug!(data = %hex::encode(&data), "MSE:SET AT");
    card.transmit(&MSE_SET_AT.with_data(data))?;
    Ok(())
}

/// Generic Mapping: H = s·G + sk1·P1c
fn map_nonce<T: CardTransport>(card: &mut T, nonce: &p256::Scalar) -> Result<CurvePoint>
where
    Error: From<T::Error>,
{
    let secret = ec::random_scalar();
    let terminal_key = ec::scalar_base_multiply(&secret)?;

    let response = general_authenticate(
        card,
        GENERAL_AUTHENTICATE_CHAINED,
        Some((tags::MAPPING_DATA_TERMINAL, &terminal_key.encode()[..])),
        tags::MAPPING_DATA_CARD,
    )?;
    let card_key = ec::decode_point(&response)?;
    if card_key == terminal_key {
        return Err(Error::protocol("card mapping key equals the terminal key"));
    }

    let shared = ec::scalar_multiply(&card_key, &secret)?;
    let generator = ec::add_points(&ec::scalar_base_multiply(nonce)?, &shared)?;
    debug!("Mapped generator computed");
    Ok(generator)
}

/// Ephemeral ECDH on the mapped generator, returning both public keys and the session keys
fn agree_keys<T: CardTransport>(
    card: &mut T,
    generator: &CurvePoint,
) -> Result<(CurvePoint, CurvePoint, SessionKeys)>
where
    Error: From<T::Error>,
{
    let secret = ec::random_scalar();
    let terminal_key = ec::scalar_multiply(generator, &secret)?;

    let response = general_authenticate(
        card,
        GENERAL_AUTHENTICATE_CHAINED,
        Some((tags::EPHEMERAL_KEY_TERMINAL, &terminal_key.encode()[..])),
        tags::EPHEMERAL_KEY_CARD,
    )?;
    let card_key = ec::decode_point(&response)?;
    if card_key == terminal_key {
        return Err(Error::protocol("card ephemeral key equals the terminal key"));
    }

    let shared = ec::scalar_multiply(&card_key, &secret)?;
    debug!("Shared secret agreed");
    Ok((terminal_key, card_key, SessionKeys::derive(&shared.x())))
}

fn mutual_authentication<T: CardTransport>(
    card: &mut T,
    keys: &SessionKeys,
    protocol: &[u8],
    terminal_key: &CurvePoint,
    card_key: &CurvePoint,
) -> Result<()>
where
    Error: From<T::Error>,
{
    let terminal_token = token::compute_token(keys.mac(), protocol, card_key)?;
    let card_token = general_authenticate(
        card,
        GENERAL_AUTHENTICATE,
        Some((tags::AUTH_TOKEN_TERMINAL, &terminal_token[..])),
        tags::AUTH_TOKEN_CARD,
    )?;
    token::verify_token(keys.mac(), protocol, terminal_key, &card_token)
}

/// Send `7C { tag value }` (or an empty `7C`) and return the value of
/// `expected` from the `7C` template in the response
fn general_authenticate<T: CardTransport>(
    card: &mut T,
    command: Command,
    request: Option<(u8, &[u8])>,
    expected: u8,
) -> Result<Vec<u8>>
where
    Error: From<T::Error>,
{
    let template = tlv::tag(tags::DYNAMIC_AUTHENTICATION_DATA)?;
    let children = match request {
        Some((tag, value)) => vec![tlv::primitive(tag, value.to_vec())?],
        None => Vec::new(),
    };
    let data = tlv::constructed(template.clone(), children)?.to_vec();

    let response = card.transmit(&command.with_data(data))?;
    let response = tlv::parse_single(&response)?;
    let objects = tlv::constructed_value(&response, &template)?;

    let expected = tlv::tag(expected)?;
    let object = objects
        .iter()
        .find(|object| object.tag() == &expected)
        .ok_or_else(|| {
            Error::protocol(format!(
                "response lacks dynamic authentication object {}",
                tlv::tag_name(&expected)
            ))
        })?;
    Ok(tlv::primitive_value(object, &expected)?.to_vec())
}
