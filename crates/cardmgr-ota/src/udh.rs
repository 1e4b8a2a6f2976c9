//! User Data Header assembly (spec.md §4.7 step 3): a single information
//! element, IEI `0x70` ("SMS-PP command"), IEDL = length of the following
//! secured payload.

/// IEI for a 3GPP TS 23.048 SIM/USIM OTA command packet carried over SMS-PP.
const IEI_SMS_PP_COMMAND: u8 = 0x70;

/// Build the 2-byte UDH descriptor (`IEI | IEDL`) for a secured payload of
/// `payload_len` bytes. The payload itself is stored and transmitted as a
/// separate field (`user_data`), not appended here — see
/// [`crate::builder`] and [`cardmgr_store::OtaMessage`].
pub fn build(payload_len: usize) -> Vec<u8> {
    vec![IEI_SMS_PP_COMMAND, payload_len as u8]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn descriptor_carries_iei_and_payload_length() {
        let udh = build(42);
        assert_eq!(udh, vec![0x70, 42]);
    }
}
