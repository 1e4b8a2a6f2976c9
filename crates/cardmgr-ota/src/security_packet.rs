//! ETSI TS 102.225 security packet: the 11-byte command header (SPI, KIc,
//! KID, TAR, CNTR, PCNTR) plus the optionally-encrypted, optionally-MACed
//! command payload (spec.md §4.7 step 2).

use cardmgr_crypto::{scp02, scp03, Key};
use cardmgr_store::{OtaTemplate, Protocol};
use rand::RngCore;

use crate::error::Result;

/// SPI bit marking the payload as encrypted.
const SPI_CIPHERED: u8 = 0x02;
/// SPI bit marking an integrity check (MAC) as required.
const SPI_MACED: u8 = 0x01;

/// Build the 11-byte fixed header: `SPI(2) | KIc(1) | KID(1) | TAR(3) |
/// CNTR(3) | PCNTR(1)`. `counter` is the value to embed (the builder has
/// already read-and-advanced the template's stored counter by this point).
fn build_header(template: &OtaTemplate, counter: u32) -> [u8; 11] {
    let mut header = [0u8; 11];
    header[0..2].copy_from_slice(&template.spi);
    header[2] = template.kic;
    header[3] = template.kid;
    header[4..7].copy_from_slice(&template.tar);
    let counter_bytes = counter.to_be_bytes();
    header[7..10].copy_from_slice(&counter_bytes[1..]);
    header[10] = template.pcounter;
    header
}

fn encrypt_command(
    protocol: Protocol,
    enc_key_bytes: &[u8],
    command: &[u8],
) -> Result<Vec<u8>> {
    let enc_key = Key::try_from(enc_key_bytes)?;
    match protocol {
        Protocol::Scp03 => {
            let mut iv = [0u8; 16];
            rand::rng().fill_bytes(&mut iv);
            let padded = scp03::pad(command);
            let ciphertext = scp03::encrypt_cbc(&enc_key, &iv, &padded)?;
            let mut out = Vec::with_capacity(iv.len() + ciphertext.len());
            out.extend_from_slice(&iv);
            out.extend_from_slice(&ciphertext);
            Ok(out)
        }
        Protocol::Scp02 => {
            let ciphertext = scp02::encrypt_data(&enc_key, &[0u8; 8], command)?;
            Ok(ciphertext)
        }
    }
}

fn compute_mac(protocol: Protocol, mac_key_bytes: &[u8], data: &[u8]) -> Result<[u8; 8]> {
    let mac_key = Key::try_from(mac_key_bytes)?;
    match protocol {
        Protocol::Scp03 => {
            let full = scp03::cmac_chained(&mac_key, &[0u8; 16], data);
            let mut out = [0u8; 8];
            out.copy_from_slice(&full[..8]);
            Ok(out)
        }
        Protocol::Scp02 => scp02::mac_full_3des(&mac_key, &[0u8; 8], data).map_err(Into::into),
    }
}

/// Assemble the full secured packet (header, optionally-ciphered command,
/// optional trailing MAC) described by spec.md §4.7 step 2.
pub fn build(
    template: &OtaTemplate,
    protocol: Protocol,
    enc_key: &[u8],
    mac_key: &[u8],
    counter: u32,
    command: &[u8],
) -> Result<Vec<u8>> {
    let header = build_header(template, counter);
    let spi0 = template.spi[0];

    let payload = if spi0 & SPI_CIPHERED != 0 {
        encrypt_command(protocol, enc_key, command)?
    } else {
        command.to_vec()
    };

    let mut packet = Vec::with_capacity(header.len() + payload.len() + 8);
    packet.extend_from_slice(&header);
    packet.extend_from_slice(&payload);

    if spi0 & SPI_MACED != 0 {
        let mac = compute_mac(protocol, mac_key, &packet)?;
        packet.extend_from_slice(&mac);
    }

    Ok(packet)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_template() -> OtaTemplate {
        OtaTemplate {
            id: 1,
            name: "clfdb_lock".to_string(),
            template_type: "CLFDB".to_string(),
            spi: [0x02, 0x00],
            kic: 0x01,
            kid: 0x01,
            tar: [0x00, 0x00, 0x00],
            counter: 1,
            pcounter: 0x00,
            template: "80F040{lifecycle}{aid_length}{aid}".to_string(),
            created_at: String::new(),
            updated_at: String::new(),
        }
    }

    #[test]
    fn header_is_eleven_bytes_and_matches_scenario_s6_fields() {
        let template = sample_template();
        let header = build_header(&template, 1);
        assert_eq!(header.len(), 11);
        assert_eq!(&header[0..2], &[0x02, 0x00]);
        assert_eq!(header[2], 0x01);
        assert_eq!(header[3], 0x01);
        assert_eq!(&header[4..7], &[0x00, 0x00, 0x00]);
        assert_eq!(&header[7..10], &[0x00, 0x00, 0x01]);
        assert_eq!(header[10], 0x00);
    }

    #[test]
    fn unciphered_unmaced_packet_is_header_plus_plaintext() {
        let mut template = sample_template();
        template.spi = [0x00, 0x00];
        let command = hex::decode("80F0408708A000000001510000").unwrap();
        let packet = build(&template, Protocol::Scp03, &[0u8; 16], &[0u8; 16], 1, &command).unwrap();
        assert_eq!(packet.len(), 11 + command.len());
        assert_eq!(&packet[11..], command.as_slice());
    }

    #[test]
    fn maced_packet_appends_eight_byte_mac() {
        let mut template = sample_template();
        template.spi = [0x01, 0x00];
        let command = hex::decode("80F0408708A000000001510000").unwrap();
        let packet = build(&template, Protocol::Scp03, &[0u8; 16], &[0u8; 16], 1, &command).unwrap();
        assert_eq!(packet.len(), 11 + command.len() + 8);
    }

    #[test]
    fn ciphered_scp03_packet_prepends_iv_and_grows() {
        let mut template = sample_template();
        template.spi = [0x02, 0x00];
        let command = hex::decode("80F0408708A000000001510000").unwrap();
        let packet = build(&template, Protocol::Scp03, &[0u8; 16], &[0u8; 16], 1, &command).unwrap();
        // 16-byte IV + ISO-7816-4 padded ciphertext (rounds up to a 16-byte
        // block boundary).
        assert!(packet.len() > 11 + command.len());
    }

    #[test]
    fn ciphered_scp02_packet_has_no_iv_prefix() {
        let mut template = sample_template();
        template.spi = [0x02, 0x00];
        let command = hex::decode("80F0408708A000000001510000").unwrap();
        let packet = build(&template, Protocol::Scp02, &[0u8; 16], &[0u8; 16], 1, &command).unwrap();
        // 3DES-CBC padded ciphertext only, no prepended IV (unlike SCP03).
        let expected_ciphertext_len = ((command.len() / 8) + 1) * 8;
        assert_eq!(packet.len(), 11 + expected_ciphertext_len);
    }
}
