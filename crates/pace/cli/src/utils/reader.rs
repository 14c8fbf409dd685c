use apdu_transport_pcsc::PcscDeviceManager;

/// List all available readers
pub(crate) fn list_readers(manager: &PcscDeviceManager) -> Result<(), Box<dyn std::error::Error>> {
    let readers = manager.list_readers()?;

    println!("Available readers:");
    for (i, reader) in readers.iter().enumerate() {
        let status = if reader.has_card() {
            "card present"
        } else {
            "no card"
        };
        println!("{}. {} ({})", i + 1, reader.name(), status);
        if let Some(atr) = reader.atr() {
            println!("   ATR: {}", hex::encode_upper(atr));
        }
    }

    Ok(())
}
