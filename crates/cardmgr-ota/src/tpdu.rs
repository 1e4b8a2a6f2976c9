//! SMS-DELIVER TPDU assembly (spec.md §4.7 step 4).

/// Placeholder originating-address digits. The bearer-side delivery
/// mechanism (not this crate's concern, spec.md §1) is responsible for
/// routing to the actual OTA platform short number; this keeps the TPDU
/// structurally complete without inventing carrier configuration here.
const PLACEHOLDER_ORIGIN_DIGITS: &str = "1234567890";

/// TP-PID: USIM application toolkit download.
const PID_USIM_DOWNLOAD: u8 = 0x7F;
/// TP-DCS: no special coding.
const DCS_DEFAULT: u8 = 0x00;

fn encode_bcd_digits(digits: &str) -> Vec<u8> {
    let nibbles: Vec<u8> = digits.bytes().map(|b| b - b'0').collect();
    nibbles
        .chunks(2)
        .map(|pair| {
            let low = pair[0];
            let high = pair.get(1).copied().unwrap_or(0x0F);
            (high << 4) | low
        })
        .collect()
}

fn build_address_tlv() -> Vec<u8> {
    let bcd = encode_bcd_digits(PLACEHOLDER_ORIGIN_DIGITS);
    let mut out = Vec::with_capacity(2 + bcd.len());
    out.push(PLACEHOLDER_ORIGIN_DIGITS.len() as u8);
    out.push(0x91); // type-of-address: international, ISDN numbering plan
    out.extend_from_slice(&bcd);
    out
}

/// Assemble the full SMS-DELIVER TPDU carrying `udh` (the 2-byte
/// `IEI|IEDL` descriptor) immediately followed by `user_data` (the
/// secured OTA packet).
pub fn build(udh: &[u8], user_data: &[u8]) -> Vec<u8> {
    let mut tpdu = Vec::with_capacity(16 + udh.len() + user_data.len());
    tpdu.push(0x44); // SMS-DELIVER, UDHI=1
    tpdu.extend(build_address_tlv());
    tpdu.push(PID_USIM_DOWNLOAD);
    tpdu.push(DCS_DEFAULT);
    tpdu.extend([0u8; 7]); // SCTS, unset

    let udhl = udh.len() as u8;
    let udl = udhl as usize + 1 + user_data.len();
    tpdu.push(udl as u8);
    tpdu.push(udhl);
    tpdu.extend_from_slice(udh);
    tpdu.extend_from_slice(user_data);
    tpdu
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn starts_with_sms_deliver_udhi_byte() {
        let tpdu = build(&[0x70, 0x08], &[0u8; 8]);
        assert_eq!(tpdu[0], 0x44);
    }

    #[test]
    fn contains_udh_immediately_followed_by_payload() {
        let udh = [0x70, 0x05];
        let payload = [0xAA; 5];
        let tpdu = build(&udh, &payload);
        let pos = tpdu
            .windows(2)
            .position(|w| w == udh)
            .expect("udh descriptor present");
        assert_eq!(&tpdu[pos..pos + 2], &udh);
        assert_eq!(&tpdu[pos + 2..pos + 7], &payload);
    }

    #[test]
    fn udl_accounts_for_udhl_byte_and_payload() {
        let udh = [0x70, 0x05];
        let payload = [0xAAu8; 5];
        let tpdu = build(&udh, &payload);
        // Byte layout: 0x44, address TLV, PID, DCS, 7xSCTS, UDL, UDHL, UDH, payload.
        let udl_index = 1 + build_address_tlv().len() + 1 + 1 + 7;
        let expected_udl = udh.len() as u8 + 1 + payload.len() as u8;
        assert_eq!(tpdu[udl_index], expected_udl);
    }
}
