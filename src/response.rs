//! Reply decoding.
//!
//! Replies do not self-describe their message type: the same opcode family
//! decodes differently depending on what was asked. Decoding is therefore
//! a dispatch keyed by the [`CommandKind`] that produced the request, not
//! by any reply-side tag.
//!
//! All functions here operate on the *decrypted* reply body as returned by
//! [`crate::frame::open_reply`]; the first 7 bytes mirror the encrypted
//! preamble of a command (literal + packet number + device code) and the
//! command-specific body starts at byte 7.
//!
//! # Example
//!
//! ```
//! use silvercrest_sws::command::CommandKind;
//! use silvercrest_sws::response::{decode, Reply};
//! use silvercrest_sws::timecodec::TimeBasis;
//!
//! let mut plaintext = vec![0u8; 16];
//! plaintext[7] = 0x02; // state query echo
//! plaintext[10] = 0xFF; // relay on
//! let reply = decode(CommandKind::StateQuery, &plaintext, &TimeBasis::local()).unwrap();
//! assert!(matches!(reply, Reply::SwitchState(_)));
//! ```

use std::net::{IpAddr, SocketAddr};

use crate::command::CommandKind;
use crate::device::{
    AbsenceWindow, DeviceIdentity, MacAddress, SwitchState, TimerNumber, TimerProgram, TimerSlot,
    TimerTime,
};
use crate::error::{Result, SwsError};
use crate::frame::PREAMBLE_SIZE;
use crate::timecodec::{
    countdown_remaining, from_device_time, unpack_repeat_mask, unpack_timestamp, TimeBasis,
};

/// Offset of the timer table inside the decrypted reply body.
const TIMER_TABLE_OFFSET: usize = 9;

/// Width of one timer record on the wire.
const TIMER_RECORD_SIZE: usize = 8;

/// Number of timer slots a query reply always carries.
pub const TIMER_SLOT_COUNT: usize = 11;

/// Hour byte marking an unprogrammed timer slot.
const EMPTY_SLOT_HOUR: u8 = 0xFF;

/// Decoded reply, tagged by what the request asked for.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Reply {
    /// The device accepted the command.
    Ack,
    /// Current relay state.
    SwitchState(SwitchState),
    /// All 11 timer slots, numbered slots first, countdown last.
    Timers(Vec<TimerSlot>),
    /// The absence-mode window, or `None` when never programmed.
    Absence(Option<AbsenceWindow>),
    /// The device answered the liveness probe.
    Heartbeat,
    /// Raw firmware version/name bytes.
    Version(Vec<u8>),
}

/// Decodes a decrypted reply body according to the command that was sent.
///
/// Discovery replies are decoded by [`decode_identity`] instead, because
/// pairing an identity requires the datagram's source address.
///
/// # Errors
///
/// `MalformedReply` when the body does not match the expected shape for
/// `kind`; `DeviceRejected` when an acknowledgement explicitly encodes
/// failure.
pub fn decode(kind: CommandKind, plaintext: &[u8], basis: &TimeBasis) -> Result<Reply> {
    match kind {
        CommandKind::Switch
        | CommandKind::SlaveSwitch
        | CommandKind::SetTimer
        | CommandKind::DeleteTimer
        | CommandKind::SetAbsence
        | CommandKind::DeleteAbsence => decode_ack(kind, plaintext),
        CommandKind::StateQuery => decode_switch_state(plaintext),
        CommandKind::TimerQuery => decode_timers(plaintext, basis),
        CommandKind::AbsenceQuery => decode_absence(plaintext),
        CommandKind::Heartbeat => decode_heartbeat(plaintext),
        CommandKind::Version => decode_version(plaintext),
        CommandKind::Search => Err(SwsError::malformed_reply(
            "search replies are decoded with their source address",
        )),
    }
}

fn body_byte(plaintext: &[u8], index: usize) -> Result<u8> {
    plaintext.get(index).copied().ok_or_else(|| {
        SwsError::malformed_reply(format!(
            "reply body of {} bytes is shorter than expected",
            plaintext.len()
        ))
    })
}

/// Acknowledgement replies echo the command opcode at the start of the
/// body. A zeroed opcode field is the firmware's refusal; any other value
/// is a foreign or corrupted reply.
fn decode_ack(kind: CommandKind, plaintext: &[u8]) -> Result<Reply> {
    let echoed = body_byte(plaintext, PREAMBLE_SIZE)?;
    if echoed == kind.opcode() {
        Ok(Reply::Ack)
    } else if echoed == 0x00 {
        Err(SwsError::DeviceRejected)
    } else {
        Err(SwsError::malformed_reply(format!(
            "expected opcode echo 0x{:02X}, got 0x{echoed:02X}",
            kind.opcode()
        )))
    }
}

fn decode_switch_state(plaintext: &[u8]) -> Result<Reply> {
    let echoed = body_byte(plaintext, PREAMBLE_SIZE)?;
    if echoed != CommandKind::StateQuery.opcode() {
        return Err(SwsError::malformed_reply(format!(
            "state reply echoes opcode 0x{echoed:02X}"
        )));
    }
    match body_byte(plaintext, 10)? {
        0x00 => Ok(Reply::SwitchState(SwitchState::Off)),
        0xFF => Ok(Reply::SwitchState(SwitchState::On)),
        other => Err(SwsError::malformed_reply(format!(
            "switch state byte 0x{other:02X} is neither on nor off"
        ))),
    }
}

fn decode_heartbeat(plaintext: &[u8]) -> Result<Reply> {
    let echoed = body_byte(plaintext, PREAMBLE_SIZE)?;
    if echoed == CommandKind::Heartbeat.opcode() {
        Ok(Reply::Heartbeat)
    } else {
        Err(SwsError::malformed_reply(format!(
            "heartbeat reply echoes opcode 0x{echoed:02X}"
        )))
    }
}

fn decode_version(plaintext: &[u8]) -> Result<Reply> {
    if plaintext.len() <= PREAMBLE_SIZE {
        return Err(SwsError::malformed_reply("version reply has no body"));
    }
    Ok(Reply::Version(plaintext[PREAMBLE_SIZE..].to_vec()))
}

/// Decodes the fixed-width timer table into exactly 11 ordered slots.
///
/// Slots are numbered by their position; the 11th is the countdown. An
/// empty slot (hour byte `0xFF`) is a valid decoded value, never an error.
fn decode_timers(plaintext: &[u8], basis: &TimeBasis) -> Result<Reply> {
    let table_end = TIMER_TABLE_OFFSET + TIMER_SLOT_COUNT * TIMER_RECORD_SIZE;
    let table = plaintext
        .get(TIMER_TABLE_OFFSET..table_end)
        .ok_or_else(|| {
            SwsError::malformed_reply(format!(
                "timer reply body of {} bytes cannot hold {TIMER_SLOT_COUNT} records",
                plaintext.len()
            ))
        })?;

    let mut slots = Vec::with_capacity(TIMER_SLOT_COUNT);
    for (index, record) in table.chunks_exact(TIMER_RECORD_SIZE).enumerate() {
        let number = if index + 1 == TIMER_SLOT_COUNT {
            TimerNumber::Countdown
        } else {
            TimerNumber::Slot(index as u8 + 1)
        };
        slots.push(decode_timer_record(number, record, basis)?);
    }
    Ok(Reply::Timers(slots))
}

fn decode_timer_record(
    number: TimerNumber,
    record: &[u8],
    basis: &TimeBasis,
) -> Result<TimerSlot> {
    if record[2] == EMPTY_SLOT_HOUR {
        return Ok(TimerSlot {
            number,
            program: None,
        });
    }

    let active = record[1] & 0x80 != 0;
    let repeat = unpack_repeat_mask(record[1]);
    let local = from_device_time(record[2], record[3], basis.delta_seconds)?;
    let time = match number {
        TimerNumber::Countdown => TimerTime::In(countdown_remaining(local, basis.now.time())),
        TimerNumber::Slot(_) => TimerTime::At(local),
    };
    let action = SwitchState::from_flag_bytes(&record[4..8]);

    Ok(TimerSlot {
        number,
        program: Some(TimerProgram {
            active,
            repeat,
            time,
            action,
        }),
    })
}

/// Decodes the absence-mode window; the all-zero encoding reads as "no
/// window set". Epoch timestamps carry no hour offset, so no time basis
/// is involved.
fn decode_absence(plaintext: &[u8]) -> Result<Reply> {
    let body = plaintext
        .get(PREAMBLE_SIZE..PREAMBLE_SIZE + 10)
        .ok_or_else(|| SwsError::malformed_reply("absence reply body too short"))?;

    if body[1..10].iter().all(|&b| b == 0x00) {
        return Ok(Reply::Absence(None));
    }

    let active = body[1] == 0x80;
    let from = unpack_timestamp([body[2], body[3], body[4], body[5]])?;
    let to = unpack_timestamp([body[6], body[7], body[8], body[9]])?;
    Ok(Reply::Absence(Some(AbsenceWindow { active, from, to })))
}

/// Decodes a discovery reply into a device identity.
///
/// The MAC is embedded in the reply; the IP is taken from the datagram's
/// source address, which is authoritative over the address bytes the
/// firmware embeds.
///
/// # Errors
///
/// `MalformedReply` if the body cannot hold an identity or the sender is
/// not an IPv4 peer.
pub fn decode_identity(plaintext: &[u8], sender: SocketAddr) -> Result<DeviceIdentity> {
    let mac_bytes = plaintext
        .get(12..18)
        .ok_or_else(|| SwsError::malformed_reply("search reply too short for an identity"))?;
    let mut mac = [0u8; 6];
    mac.copy_from_slice(mac_bytes);

    match sender.ip() {
        IpAddr::V4(ip) => Ok(DeviceIdentity::new(MacAddress::new(mac), ip)),
        IpAddr::V6(_) => Err(SwsError::malformed_reply(
            "search reply arrived from a non-IPv4 sender",
        )),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{NaiveDate, NaiveTime};
    use std::net::Ipv4Addr;

    fn utc_basis() -> TimeBasis {
        TimeBasis {
            delta_seconds: 0,
            now: NaiveDate::from_ymd_opt(2030, 1, 15)
                .unwrap()
                .and_hms_opt(10, 0, 0)
                .unwrap(),
        }
    }

    fn ack_body(opcode: u8) -> Vec<u8> {
        let mut body = vec![0u8; 16];
        body[7] = opcode;
        body
    }

    #[test]
    fn test_ack_accepted() {
        let reply = decode(CommandKind::Switch, &ack_body(0x01), &utc_basis()).unwrap();
        assert_eq!(reply, Reply::Ack);
    }

    #[test]
    fn test_ack_rejected() {
        let result = decode(CommandKind::Switch, &ack_body(0x00), &utc_basis());
        assert!(matches!(result, Err(SwsError::DeviceRejected)));
    }

    #[test]
    fn test_ack_foreign_opcode() {
        let result = decode(CommandKind::Switch, &ack_body(0x05), &utc_basis());
        assert!(matches!(result, Err(SwsError::MalformedReply { .. })));
    }

    #[test]
    fn test_ack_short_body() {
        let result = decode(CommandKind::DeleteTimer, &[0u8; 4], &utc_basis());
        assert!(matches!(result, Err(SwsError::MalformedReply { .. })));
    }

    #[test]
    fn test_absence_delete_shares_opcode_echo() {
        let reply = decode(CommandKind::DeleteAbsence, &ack_body(0x09), &utc_basis()).unwrap();
        assert_eq!(reply, Reply::Ack);
    }

    #[test]
    fn test_switch_state_on_off() {
        let mut body = ack_body(0x02);
        body[10] = 0xFF;
        assert_eq!(
            decode(CommandKind::StateQuery, &body, &utc_basis()).unwrap(),
            Reply::SwitchState(SwitchState::On)
        );

        body[10] = 0x00;
        assert_eq!(
            decode(CommandKind::StateQuery, &body, &utc_basis()).unwrap(),
            Reply::SwitchState(SwitchState::Off)
        );
    }

    #[test]
    fn test_switch_state_invalid_byte() {
        let mut body = ack_body(0x02);
        body[10] = 0x7F;
        assert!(matches!(
            decode(CommandKind::StateQuery, &body, &utc_basis()),
            Err(SwsError::MalformedReply { .. })
        ));
    }

    #[test]
    fn test_heartbeat() {
        let reply = decode(CommandKind::Heartbeat, &ack_body(0x61), &utc_basis()).unwrap();
        assert_eq!(reply, Reply::Heartbeat);
    }

    #[test]
    fn test_version_passthrough() {
        let mut body = ack_body(0x62);
        body[8..12].copy_from_slice(b"v1.2");
        match decode(CommandKind::Version, &body, &utc_basis()).unwrap() {
            Reply::Version(bytes) => {
                assert_eq!(bytes[0], 0x62);
                assert_eq!(&bytes[1..5], b"v1.2");
            }
            other => panic!("expected version, got {other:?}"),
        }
    }

    fn timer_body() -> Vec<u8> {
        // 7-block reply: preamble + echo + 11 records + trailing padding.
        vec![0u8; 112]
    }

    #[test]
    fn test_timers_all_sentinel_decode_empty() {
        let mut body = timer_body();
        for byte in body[TIMER_TABLE_OFFSET..TIMER_TABLE_OFFSET + 88].iter_mut() {
            *byte = 0xFF;
        }
        match decode(CommandKind::TimerQuery, &body, &utc_basis()).unwrap() {
            Reply::Timers(slots) => {
                assert_eq!(slots.len(), TIMER_SLOT_COUNT);
                assert!(slots.iter().all(TimerSlot::is_empty));
                assert_eq!(slots[10].number, TimerNumber::Countdown);
            }
            other => panic!("expected timers, got {other:?}"),
        }
    }

    #[test]
    fn test_timers_programmed_slot() {
        let mut body = timer_body();
        // Mark every slot empty except slot 3.
        for record in 0..TIMER_SLOT_COUNT {
            body[TIMER_TABLE_OFFSET + record * TIMER_RECORD_SIZE + 2] = 0xFF;
        }
        let offset = TIMER_TABLE_OFFSET + 2 * TIMER_RECORD_SIZE;
        body[offset] = 3;
        body[offset + 1] = 0x80 | 0b0001_1111; // active, Mon-Fri
        body[offset + 2] = 12;
        body[offset + 3] = 25;
        body[offset + 4..offset + 8].copy_from_slice(&[0x00, 0x00, 0xFF, 0xFF]);

        match decode(CommandKind::TimerQuery, &body, &utc_basis()).unwrap() {
            Reply::Timers(slots) => {
                let program = slots[2].program.expect("slot 3 is programmed");
                assert_eq!(slots[2].number, TimerNumber::Slot(3));
                assert!(program.active);
                assert_eq!(
                    program.repeat,
                    [true, true, true, true, true, false, false]
                );
                assert_eq!(
                    program.time,
                    TimerTime::At(NaiveTime::from_hms_opt(12, 25, 0).unwrap())
                );
                assert_eq!(program.action, SwitchState::On);
                assert!(slots[0].is_empty());
                assert!(slots[10].is_empty());
            }
            other => panic!("expected timers, got {other:?}"),
        }
    }

    #[test]
    fn test_timers_countdown_remaining() {
        let basis = utc_basis(); // now = 10:00
        let mut body = timer_body();
        for record in 0..TIMER_SLOT_COUNT {
            body[TIMER_TABLE_OFFSET + record * TIMER_RECORD_SIZE + 2] = 0xFF;
        }
        let offset = TIMER_TABLE_OFFSET + 10 * TIMER_RECORD_SIZE;
        body[offset] = 11;
        body[offset + 1] = 0x80;
        body[offset + 2] = 11; // fires at 11:30 device == local time
        body[offset + 3] = 30;
        body[offset + 4..offset + 8].copy_from_slice(&[0x00, 0x00, 0x00, 0xFF]);

        match decode(CommandKind::TimerQuery, &body, &basis).unwrap() {
            Reply::Timers(slots) => {
                let program = slots[10].program.expect("countdown is programmed");
                assert_eq!(slots[10].number, TimerNumber::Countdown);
                assert_eq!(program.time, TimerTime::In(chrono::Duration::minutes(90)));
                assert_eq!(program.action, SwitchState::Off);
            }
            other => panic!("expected timers, got {other:?}"),
        }
    }

    #[test]
    fn test_timers_short_reply() {
        assert!(matches!(
            decode(CommandKind::TimerQuery, &[0u8; 32], &utc_basis()),
            Err(SwsError::MalformedReply { .. })
        ));
    }

    #[test]
    fn test_absence_all_zero_is_unset() {
        // Real absence replies span two cipher blocks.
        let mut body = vec![0u8; 32];
        body[7] = 0x0A;
        assert_eq!(
            decode(CommandKind::AbsenceQuery, &body, &utc_basis()).unwrap(),
            Reply::Absence(None)
        );
    }

    #[test]
    fn test_absence_short_body() {
        assert!(matches!(
            decode(CommandKind::AbsenceQuery, &[0u8; 16], &utc_basis()),
            Err(SwsError::MalformedReply { .. })
        ));
    }

    #[test]
    fn test_absence_window_roundtrip() {
        use crate::timecodec::pack_timestamp;

        let from = NaiveDate::from_ymd_opt(2030, 1, 20)
            .unwrap()
            .and_hms_opt(22, 0, 0)
            .unwrap();
        let to = NaiveDate::from_ymd_opt(2030, 1, 27)
            .unwrap()
            .and_hms_opt(6, 0, 0)
            .unwrap();

        let mut body = vec![0u8; 32];
        body[7] = 0x0A;
        body[8] = 0x80;
        body[9..13].copy_from_slice(&pack_timestamp(from).unwrap());
        body[13..17].copy_from_slice(&pack_timestamp(to).unwrap());

        match decode(CommandKind::AbsenceQuery, &body, &utc_basis()).unwrap() {
            Reply::Absence(Some(window)) => {
                assert!(window.active);
                assert_eq!(window.from, from);
                assert_eq!(window.to, to);
            }
            other => panic!("expected a window, got {other:?}"),
        }
    }

    #[test]
    fn test_identity_uses_sender_address() {
        let mut body = vec![0u8; 32];
        // Firmware embeds its own (possibly stale) notion of the IP.
        body[8..12].copy_from_slice(&[10, 0, 0, 99]);
        body[12..18].copy_from_slice(&[0xAC, 0xBC, 0xDE, 0x01, 0x02, 0x03]);

        let sender: SocketAddr = "192.168.0.15:8530".parse().unwrap();
        let identity = decode_identity(&body, sender).unwrap();
        assert_eq!(identity.mac.to_string(), "acbcde010203");
        assert_eq!(identity.ip, Ipv4Addr::new(192, 168, 0, 15));
    }

    #[test]
    fn test_identity_short_reply() {
        let sender: SocketAddr = "192.168.0.15:8530".parse().unwrap();
        assert!(matches!(
            decode_identity(&[0u8; 16], sender),
            Err(SwsError::MalformedReply { .. })
        ));
    }
}
