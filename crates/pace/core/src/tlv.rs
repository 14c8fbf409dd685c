//! Small helpers over `iso7816_tlv` BER objects

use iso7816_tlv::ber::{Tag, Tlv, Value};

use crate::error::{Error, Result};

pub(crate) fn tag_name(tag: &Tag) -> String {
    hex::encode_upper(tag.to_bytes())
}

pub(crate) fn tag(tag: u8) -> Result<Tag> {
    Ok(Tag::try_from(tag)?)
}

pub(crate) fn primitive(tag_value: u8, data: impl Into<Vec<u8>>) -> Result<Tlv> {
    Ok(Tlv::new(tag(tag_value)?, Value::Primitive(data.into()))?)
}

pub(crate) fn constructed(tag: Tag, children: Vec<Tlv>) -> Result<Tlv> {
    Ok(Tlv::new(tag, Value::Constructed(children))?)
}

/// Parse exactly one TLV object spanning the whole input
pub(crate) fn parse_single(data: &[u8]) -> Result<Tlv> {
    let (tlv, rest) = Tlv::parse(data);
    let tlv = tlv?;
    if !rest.is_empty() {
        return Err(Error::protocol(format!(
            "{} unexpected bytes after TLV object",
            rest.len()
        )));
    }
    Ok(tlv)
}

/// Value of a primitive object with the expected tag
pub(crate) fn primitive_value<'a>(tlv: &'a Tlv, expected: &Tag) -> Result<&'a [u8]> {
    if tlv.tag() != expected {
        return Err(Error::protocol(format!(
            "expected tag {}, found {}",
            tag_name(expected),
            tag_name(tlv.tag())
        )));
    }
    match tlv.value() {
        Value::Primitive(bytes) => Ok(bytes),
        Value::Constructed(_) => Err(Error::protocol(format!(
            "expected primitive value for tag {}",
            tag_name(expected)
        ))),
    }
}

/// Children of a constructed object with the expected tag
pub(crate) fn constructed_value<'a>(tlv: &'a Tlv, expected: &Tag) -> Result<&'a [Tlv]> {
    if tlv.tag() != expected {
        return Err(Error::protocol(format!(
            "expected tag {}, found {}",
            tag_name(expected),
            tag_name(tlv.tag())
        )));
    }
    match tlv.value() {
        Value::Constructed(children) => Ok(children),
        Value::Primitive(_) => Err(Error::protocol(format!(
            "expected constructed value for tag {}",
            tag_name(expected)
        ))),
    }
}
