//! Run the PACE handshake and report the outcome

use apdu_transport_pcsc::PcscTransport;
use eid_pace::{PasswordType, open_secure_channel, select_application};
use std::error::Error;
use tracing::info;

use crate::utils::display;

/// Select the application and establish a secure channel
///
/// Without a password the handshake runs in demonstration mode and the card
/// is expected to refuse the final step.
pub(crate) fn pace_command(
    mut transport: PcscTransport,
    aid: &[u8],
    password: Option<&[u8]>,
    password_type: PasswordType,
) -> Result<(), Box<dyn Error>> {
    select_application(&mut transport, aid)?;
    info!(aid = %hex::encode_upper(aid), "Application selected");

    let password = password.unwrap_or_default();
    if password.is_empty() {
        println!(
            "{}",
            display::warning("No password given, the card will reject the handshake")
        );
    }

    let channel = open_secure_channel(transport, password, password_type)?;

    println!("{}", display::success("Secure channel established"));
    println!(
        "{}",
        display::key_value_box(
            "Channel",
            &[
                ("Reader", channel.transport().reader_name().to_string()),
                ("Password", password_type.to_string()),
                ("Send sequence counter", channel.send_sequence_counter().to_string()),
            ],
        )
    );

    Ok(())
}
