//! Estonian ID card personal data file

use apdu_core::CardTransport;
use eid_pace::{Error, read_binary, select_file};
use tracing::debug;

/// AID of the EstEID application
pub(crate) const ESTEID_AID: [u8; 15] = [
    0xA0, 0x00, 0x00, 0x00, 0x77, 0x01, 0x08, 0x00, 0x07, 0x00, 0x00, 0xFE, 0x00, 0x00, 0x01,
];

/// DF holding the personal data entries
const PERSONAL_DF: [u8; 2] = [0x50, 0x00];

/// Labels of the entries 50 01 to 50 0F
const FIELDS: [&str; 15] = [
    "Surname",
    "First name",
    "Sex",
    "Citizenship",
    "Date and place of birth",
    "Personal code",
    "Document number",
    "Expiry date",
    "Date and place of issuance",
    "Residence permit type",
    "Notes line 1",
    "Notes line 2",
    "Notes line 3",
    "Notes line 4",
    "Notes line 5",
];

/// One entry of the personal data file
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct PersonalDataEntry {
    pub(crate) label: &'static str,
    pub(crate) value: String,
}

/// Read every entry of the personal data file
pub(crate) fn read_personal_data<T: CardTransport>(
    card: &mut T,
) -> Result<Vec<PersonalDataEntry>, Error>
where
    Error: From<T::Error>,
{
    select_file(card, &PERSONAL_DF)?;

    let mut entries = Vec::with_capacity(FIELDS.len());
    for (index, label) in (1u8..).zip(FIELDS) {
        select_file(card, &[PERSONAL_DF[0], index])?;
        let content = read_binary(card)?;
        debug!(entry = index, len = content.len(), "Read personal data entry");

        entries.push(PersonalDataEntry {
            label,
            value: String::from_utf8_lossy(&content).trim().to_string(),
        });
    }
    Ok(entries)
}
