use hmac::{Hmac, Mac};
use sha1::Sha1;

use super::{Digits, HotpError};

type HmacSha1 = Hmac<Sha1>;

fn sha1_hmac(key: &[u8], message: &[u8]) -> Result<[u8; 20], HotpError> {
    let mut mac =
        HmacSha1::new_from_slice(key).map_err(|err| HotpError::Hmac(err.to_string()))?;
    mac.update(message);

    let mut res = [0u8; 20];
    res.copy_from_slice(mac.finalize().into_bytes().as_slice());

    Ok(res)
}

fn extract31(mac: &[u8; 20], offset: u8) -> u32 {
    let offset = offset as usize;
    let mut word = [0u8; 4];
    word.copy_from_slice(&mac[offset..offset + 4]);

    u32::from_be_bytes(word) & 0x7fff_ffff
}

pub fn get_hotp(key: &[u8], counter: u64, digits: Digits) -> Result<u32, HotpError> {
    if key.is_empty() {
        return Err(HotpError::EmptyKey);
    }

    let mac = sha1_hmac(key, &counter.to_be_bytes())?;

    // low nibble is at most 15, so offset + 4 stays inside the 20 byte digest
    let offset = mac[mac.len() - 1] & 0b1111;
    let truncated = extract31(&mac, offset);

    Ok(truncated % 10u32.pow(digits.get() as u32))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rfc2202_hmac_sha1() {
        let mac = sha1_hmac(&[0x0b; 20], b"Hi There").unwrap();
        assert_eq!(
            mac,
            [
                0xb6, 0x17, 0x31, 0x86, 0x55, 0x05, 0x72, 0x64, 0xe2, 0x8b, 0xc0, 0xb6, 0xfb,
                0x37, 0x8c, 0x8e, 0xf1, 0x46, 0xbe, 0x00
            ]
        );
    }

    #[test]
    fn truncation_masks_sign_bit() {
        let mut mac = [0xffu8; 20];
        mac[19] = 0x00;
        assert_eq!(extract31(&mac, 0), 0x7fff_ffff);

        mac[19] = 0x0a;
        mac[10..14].copy_from_slice(&[0x50, 0xef, 0x7f, 0x19]);
        assert_eq!(extract31(&mac, 10), 0x50ef_7f19);
    }

    #[test]
    fn empty_key_is_rejected() {
        assert_eq!(get_hotp(&[], 0, Digits::default()), Err(HotpError::EmptyKey));
    }
}
