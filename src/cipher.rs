//! Fixed-key AES-128-CBC codec for the SWS wire format.
//!
//! The sockets encrypt every command payload and every reply body with
//! AES-128 in CBC mode, using a key and an initialization vector that are
//! both fixed to the same well-known 16-byte constant. This is a vendor
//! design choice: the scheme provides obfuscation of the wire format, not
//! confidentiality, and has to be replicated byte-for-byte for the firmware
//! to accept a frame.
//!
//! There is no padding layer. Each command template carries its own
//! trailing filler bytes which bring the plaintext (including the 7-byte
//! encrypted preamble) to a 16-byte multiple, so the codec rejects any
//! input that is not already block aligned.
//!
//! # Example
//!
//! ```
//! use silvercrest_sws::cipher::{decrypt, encrypt};
//!
//! let plaintext = [0x42u8; 32];
//! let ciphertext = encrypt(&plaintext).unwrap();
//! assert_eq!(decrypt(&ciphertext).unwrap(), plaintext);
//! ```

use aes::cipher::{BlockDecrypt, BlockEncrypt, KeyInit};
use aes::Aes128;

use crate::error::{Result, SwsError};

/// AES block size in bytes.
pub const BLOCK_SIZE: usize = 16;

/// Fixed AES-128 key shared by all known firmware families.
pub const PASSKEY: [u8; BLOCK_SIZE] = *b"0123456789abcdef";

/// Fixed initialization vector; the vendor reuses the key bytes.
pub const INITIALIZATION_VECTOR: [u8; BLOCK_SIZE] = PASSKEY;

fn check_alignment(data: &[u8], direction: &str) -> Result<()> {
    if data.is_empty() {
        return Err(SwsError::cipher(format!("empty {direction} input")));
    }
    if data.len() % BLOCK_SIZE != 0 {
        return Err(SwsError::cipher(format!(
            "{direction} input length {} is not a multiple of {}",
            data.len(),
            BLOCK_SIZE
        )));
    }
    Ok(())
}

/// Encrypts a block-aligned plaintext with the fixed key and IV.
///
/// # Errors
///
/// Returns `SwsError::Cipher` if the plaintext is empty or not a multiple
/// of 16 bytes.
pub fn encrypt(plaintext: &[u8]) -> Result<Vec<u8>> {
    check_alignment(plaintext, "encrypt")?;

    let cipher = Aes128::new(&PASSKEY.into());
    let mut output = plaintext.to_vec();
    let mut chain = INITIALIZATION_VECTOR;

    for block in output.chunks_mut(BLOCK_SIZE) {
        for (byte, prev) in block.iter_mut().zip(chain.iter()) {
            *byte ^= prev;
        }
        cipher.encrypt_block(block.into());
        chain.copy_from_slice(block);
    }

    Ok(output)
}

/// Decrypts a block-aligned ciphertext with the fixed key and IV.
///
/// # Errors
///
/// Returns `SwsError::Cipher` if the ciphertext is empty or not a multiple
/// of 16 bytes, which indicates a corrupted or foreign reply.
pub fn decrypt(ciphertext: &[u8]) -> Result<Vec<u8>> {
    check_alignment(ciphertext, "decrypt")?;

    let cipher = Aes128::new(&PASSKEY.into());
    let mut output = ciphertext.to_vec();
    let mut chain = INITIALIZATION_VECTOR;

    for (block, source) in output
        .chunks_mut(BLOCK_SIZE)
        .zip(ciphertext.chunks(BLOCK_SIZE))
    {
        cipher.decrypt_block(block.into());
        for (byte, prev) in block.iter_mut().zip(chain.iter()) {
            *byte ^= prev;
        }
        chain.copy_from_slice(source);
    }

    Ok(output)
}
