//! Cashaddr address encoding
//!
//! Bitcoin Cash replaced base58check with a bech32-like base32 format
//! carrying a 40-bit BCH checksum. Only P2PKH payloads over 160-bit
//! hashes are needed here; the payload is the same HASH160 the legacy
//! encoding uses.

const CHARSET: &[u8; 32] = b"qpzry9x8gf2tvdw0s3jn54khce6mua7l";

/// Cashaddr checksum generator (BCH code over GF(32))
fn polymod(values: &[u8]) -> u64 {
    let mut c: u64 = 1;
    for &d in values {
        let c0 = (c >> 35) as u8;
        c = ((c & 0x0007_ffff_ffff) << 5) ^ u64::from(d);
        if c0 & 0x01 != 0 {
            c ^= 0x98f2bc8e61;
        }
        if c0 & 0x02 != 0 {
            c ^= 0x79b76d99e2;
        }
        if c0 & 0x04 != 0 {
            c ^= 0xf33e5fb3c4;
        }
        if c0 & 0x08 != 0 {
            c ^= 0xae2eabe2a8;
        }
        if c0 & 0x10 != 0 {
            c ^= 0x1e4f43e470;
        }
    }
    c ^ 1
}

/// Regroup 8-bit bytes into 5-bit symbols, padding the tail
fn convert_bits(data: &[u8]) -> Vec<u8> {
    let mut acc: u32 = 0;
    let mut bits: u32 = 0;
    let mut out = Vec::with_capacity(data.len() * 8 / 5 + 1);
    for &b in data {
        acc = (acc << 8) | u32::from(b);
        bits += 8;
        while bits >= 5 {
            bits -= 5;
            out.push(((acc >> bits) & 0x1f) as u8);
        }
    }
    if bits > 0 {
        out.push(((acc << (5 - bits)) & 0x1f) as u8);
    }
    out
}

/// Encode a P2PKH cashaddr for a 20-byte public key hash
///
/// `prefix` is the human-readable network prefix ("bitcoincash" or
/// "bchtest") and is included in the returned address.
pub fn encode_p2pkh(prefix: &str, pubkey_hash: &[u8; 20]) -> String {
    // Version byte: type 0 (P2PKH) << 3 | size bits 0 (160-bit hash)
    let mut payload = vec![0u8];
    payload.extend_from_slice(pubkey_hash);
    let data = convert_bits(&payload);

    let mut checksum_input: Vec<u8> = prefix.bytes().map(|b| b & 0x1f).collect();
    checksum_input.push(0);
    checksum_input.extend_from_slice(&data);
    checksum_input.extend_from_slice(&[0u8; 8]);

    let pm = polymod(&checksum_input);
    let checksum: Vec<u8> = (0..8).map(|i| ((pm >> (5 * (7 - i))) & 0x1f) as u8).collect();

    let mut addr = String::with_capacity(prefix.len() + 1 + data.len() + 8);
    addr.push_str(prefix);
    addr.push(':');
    for d in data.iter().chain(checksum.iter()) {
        addr.push(CHARSET[*d as usize] as char);
    }
    addr
}
