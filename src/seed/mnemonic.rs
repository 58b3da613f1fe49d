//! BIP39 mnemonic to seed derivation
//!
//! PBKDF2-HMAC-SHA512 with 2048 rounds over the phrase, salted with
//! "mnemonic" plus an optional passphrase. Word-list validation is the
//! operator's concern; any phrase derives deterministically.

use pbkdf2::pbkdf2_hmac;
use sha2::Sha512;

const PBKDF2_ROUNDS: u32 = 2048;

/// Derive the 64-byte master seed for a mnemonic phrase
pub fn mnemonic_to_seed(phrase: &str, passphrase: &str) -> [u8; 64] {
    let salt = format!("mnemonic{}", passphrase);
    let mut seed = [0u8; 64];
    pbkdf2_hmac::<Sha512>(
        phrase.as_bytes(),
        salt.as_bytes(),
        PBKDF2_ROUNDS,
        &mut seed,
    );
    seed
}
