//! Read the EstEID personal data file over secure messaging

use apdu_transport_pcsc::PcscTransport;
use colored::Colorize;
use eid_pace::{PasswordType, open_secure_channel, select_application};
use std::error::Error;

use crate::esteid;
use crate::utils::display;

/// Establish a secure channel and print every personal data entry
pub(crate) fn read_personal_data_command(
    mut transport: PcscTransport,
    aid: &[u8],
    password: &[u8],
    password_type: PasswordType,
) -> Result<(), Box<dyn Error>> {
    select_application(&mut transport, aid)?;

    let mut channel = open_secure_channel(transport, password, password_type)?;
    let entries = esteid::read_personal_data(&mut channel)?;

    let items: Vec<(&str, String)> = entries
        .iter()
        .filter(|entry| !entry.value.is_empty())
        .map(|entry| (entry.label, entry.value.clone()))
        .collect();
    println!("{}", display::key_value_box("Personal data", &items));

    let empty = entries.len() - items.len();
    if empty > 0 {
        println!("  {}", format!("({empty} empty entries)").dimmed());
    }
    println!("{}", display::success("Personal data read"));

    Ok(())
}
