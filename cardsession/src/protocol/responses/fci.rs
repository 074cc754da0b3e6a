// cardsession/src/protocol/responses/fci.rs

use iso7816_tlv::ber::{Tag, Tlv, Value};

use crate::constants::{
    TAG_DF_NAME, TAG_DISCRETIONARY, TAG_FCI_TEMPLATE, TAG_PROPRIETARY, TAG_SERIAL_NUMBER,
    TAG_STARTUP_INFO,
};
use crate::types::SerialNumber;
use crate::{Error, Result};

/// File Control Information returned by a successful SELECT.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Fci {
    pub df_name: Vec<u8>,
    pub serial_number: SerialNumber,
    pub startup_info: Option<Vec<u8>>,
}

/// Depth-first search for the first primitive TLV tagged `tag`.
fn find_primitive<'a>(tlv: &'a Tlv, tag: &Tag) -> Option<&'a [u8]> {
    match tlv.value() {
        Value::Primitive(bytes) if tlv.tag() == tag => Some(bytes.as_slice()),
        Value::Primitive(_) => None,
        Value::Constructed(children) => children.iter().find_map(|c| find_primitive(c, tag)),
    }
}

/// Decode the FCI template. DF name and serial number are mandatory.
pub fn decode_fci(data: &[u8]) -> Result<Fci> {
    let fci = Tlv::from_bytes(data)?;
    if fci.tag() != &Tag::try_from(TAG_FCI_TEMPLATE)? {
        return Err(Error::MalformedResponse("response is not an FCI template".into()));
    }
    let df_name = find_primitive(&fci, &Tag::try_from(TAG_DF_NAME)?)
        .ok_or_else(|| Error::MalformedResponse("FCI without DF name".into()))?
        .to_vec();
    let serial = find_primitive(&fci, &Tag::try_from(TAG_SERIAL_NUMBER)?)
        .ok_or_else(|| Error::MalformedResponse("FCI without serial number".into()))?;
    let serial_number = SerialNumber::try_from(serial)?;
    let startup_info = find_primitive(&fci, &Tag::try_from(TAG_STARTUP_INFO)?).map(<[u8]>::to_vec);
    Ok(Fci {
        df_name,
        serial_number,
        startup_info,
    })
}

/// Build an FCI template; the inverse of [`decode_fci`], used by simulated cards.
pub fn encode_fci(df_name: &[u8], serial: &SerialNumber, startup_info: &[u8]) -> Result<Vec<u8>> {
    let discretionary = Tlv::new(
        Tag::try_from(u16::from_be_bytes(TAG_DISCRETIONARY))?,
        Value::Constructed(vec![
            Tlv::new(
                Tag::try_from(TAG_SERIAL_NUMBER)?,
                Value::Primitive(serial.as_bytes().to_vec()),
            )?,
            Tlv::new(
                Tag::try_from(TAG_STARTUP_INFO)?,
                Value::Primitive(startup_info.to_vec()),
            )?,
        ]),
    )?;
    let fci = Tlv::new(
        Tag::try_from(TAG_FCI_TEMPLATE)?,
        Value::Constructed(vec![
            Tlv::new(Tag::try_from(TAG_DF_NAME)?, Value::Primitive(df_name.to_vec()))?,
            Tlv::new(
                Tag::try_from(TAG_PROPRIETARY)?,
                Value::Constructed(vec![discretionary]),
            )?,
        ]),
    )?;
    Ok(fci.to_vec())
}
