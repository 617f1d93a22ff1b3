//! Wire frame assembly and reply unwrapping.
//!
//! # Frame structure
//!
//! An outbound datagram is an unencrypted header followed by the AES-CBC
//! ciphertext of the command plaintext:
//!
//! | Bytes | Field | Description |
//! |-------|-------|-------------|
//! | 0 | magic | Always `0x01` |
//! | 1 | marker | `0x40` for commands, `0x42` in replies |
//! | 2-7 | MAC | Destination MAC (all-ones for broadcast search) |
//! | 8 | length | Ciphertext length in bytes |
//! | 9.. | ciphertext | Encrypted preamble + command payload |
//!
//! The encrypted plaintext starts with a 7-byte preamble: a `0x00` literal,
//! the 2-byte big-endian packet number, and the 4-byte device code. Every
//! command template's filler bytes bring preamble + payload to an exact
//! 16-byte multiple, so no extra padding is applied.
//!
//! Replies carry a 9-byte unencrypted header with the marker at byte 1;
//! everything after it is ciphertext.
//!
//! # Example
//!
//! ```
//! use silvercrest_sws::command::{Command, StateQueryCommand};
//! use silvercrest_sws::frame::CommandFrame;
//! use silvercrest_sws::{DeviceProfile, MacAddress};
//!
//! let profile = DeviceProfile::default();
//! let mac = MacAddress::parse("00aa11bb22cc").unwrap();
//! let frame = CommandFrame::assemble(&profile, &mac, &StateQueryCommand::new().payload()).unwrap();
//! let wire = frame.to_bytes();
//! assert_eq!(wire[0], 0x01);
//! assert_eq!(wire[1], 0x40);
//! ```

use crate::cipher;
use crate::device::{DeviceProfile, MacAddress};
use crate::error::{Result, SwsError};

/// Leading literal of every frame.
pub const FRAME_MAGIC: u8 = 0x01;

/// Marker byte identifying an outbound command.
pub const MARKER_COMMAND: u8 = 0x40;

/// Marker byte identifying a device reply.
pub const MARKER_REPLY: u8 = 0x42;

/// Unencrypted header size of a command frame (magic + marker + MAC).
pub const COMMAND_HEADER_SIZE: usize = 8;

/// Unencrypted header size of a reply datagram.
pub const REPLY_HEADER_SIZE: usize = 9;

/// Size of the encrypted preamble (literal + packet number + device code).
pub const PREAMBLE_SIZE: usize = 7;

/// A complete outbound frame: unencrypted header plus ciphertext.
///
/// Transient; built and consumed per call.
#[derive(Debug, Clone)]
pub struct CommandFrame {
    header: [u8; COMMAND_HEADER_SIZE],
    ciphertext: Vec<u8>,
}

impl CommandFrame {
    /// Assembles a frame from a command payload.
    ///
    /// Prepends the encrypted preamble drawn from the profile, encrypts,
    /// and builds the unencrypted MAC header.
    ///
    /// # Errors
    ///
    /// Returns `SwsError::Cipher` if preamble + payload is not a 16-byte
    /// multiple (which would indicate a malformed command template).
    pub fn assemble(profile: &DeviceProfile, mac: &MacAddress, payload: &[u8]) -> Result<Self> {
        let mut plaintext = Vec::with_capacity(PREAMBLE_SIZE + payload.len());
        plaintext.push(0x00);
        plaintext.extend_from_slice(&profile.packet_seed.to_be_bytes());
        plaintext.extend_from_slice(&profile.device_code);
        plaintext.extend_from_slice(payload);

        let ciphertext = cipher::encrypt(&plaintext)?;

        let mut header = [0u8; COMMAND_HEADER_SIZE];
        header[0] = FRAME_MAGIC;
        header[1] = MARKER_COMMAND;
        header[2..].copy_from_slice(mac.as_bytes());

        Ok(Self { header, ciphertext })
    }

    /// Serializes the frame to its wire bytes.
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut bytes = Vec::with_capacity(COMMAND_HEADER_SIZE + 1 + self.ciphertext.len());
        bytes.extend_from_slice(&self.header);
        bytes.push(self.ciphertext.len() as u8);
        bytes.extend_from_slice(&self.ciphertext);
        bytes
    }

    /// Returns the encrypted portion of the frame.
    pub fn ciphertext(&self) -> &[u8] {
        &self.ciphertext
    }
}

/// Validates a reply datagram's unencrypted header and returns its
/// ciphertext body.
///
/// # Errors
///
/// Returns `MalformedReply` if the datagram is shorter than header plus
/// one cipher block or does not carry the reply marker.
pub fn strip_reply(datagram: &[u8]) -> Result<&[u8]> {
    if datagram.len() < REPLY_HEADER_SIZE + cipher::BLOCK_SIZE {
        return Err(SwsError::malformed_reply(format!(
            "datagram of {} bytes is too short for a reply",
            datagram.len()
        )));
    }
    if datagram[1] != MARKER_REPLY {
        return Err(SwsError::malformed_reply(format!(
            "marker byte 0x{:02X} is not a reply",
            datagram[1]
        )));
    }
    Ok(&datagram[REPLY_HEADER_SIZE..])
}

/// Strips and decrypts a reply datagram in one step.
///
/// # Errors
///
/// `MalformedReply` for a bad header, `SwsError::Cipher` when the body is
/// not block aligned (corrupted or foreign datagram).
pub fn open_reply(datagram: &[u8]) -> Result<Vec<u8>> {
    cipher::decrypt(strip_reply(datagram)?)
}
