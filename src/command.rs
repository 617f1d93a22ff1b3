//! Command structures and plaintext serialization.
//!
//! Each command kind has a fixed-shape byte template: an opcode byte, the
//! substituted fields, and literal filler bytes unique to that command.
//! The filler both pads the plaintext toward AES block alignment and is
//! recognized by the firmware as framing, so it must be reproduced exactly.
//!
//! Commands serialize to the plaintext that follows the 7-byte encrypted
//! preamble (`00` + packet number + device code); [`crate::frame`] adds the
//! preamble, encrypts, and prepends the unencrypted header.
//!
//! # Example
//!
//! ```
//! use silvercrest_sws::command::{Command, SwitchCommand};
//! use silvercrest_sws::SwitchState;
//!
//! let cmd = SwitchCommand::new(SwitchState::On);
//! assert_eq!(cmd.payload()[0], 0x01);
//! ```

use crate::device::{MacAddress, SlaveAddress, SwitchState, TimerNumber};
use crate::timecodec::pack_repeat_mask;

/// Switch relay opcode.
pub(crate) const OP_SWITCH: u8 = 0x01;
/// Switch state query opcode.
pub(crate) const OP_STATE_QUERY: u8 = 0x02;
/// Timer programming opcode.
pub(crate) const OP_SET_TIMER: u8 = 0x03;
/// Timer query opcode.
pub(crate) const OP_TIMER_QUERY: u8 = 0x04;
/// Timer deletion opcode.
pub(crate) const OP_DELETE_TIMER: u8 = 0x05;
/// Radio slave switch opcode.
pub(crate) const OP_SLAVE_SWITCH: u8 = 0x08;
/// Absence mode set/delete opcode (shared).
pub(crate) const OP_ABSENCE: u8 = 0x09;
/// Absence mode query opcode.
pub(crate) const OP_ABSENCE_QUERY: u8 = 0x0A;
/// Broadcast search opcode.
pub(crate) const OP_SEARCH: u8 = 0x23;
/// Heartbeat opcode.
pub(crate) const OP_HEARTBEAT: u8 = 0x61;
/// Firmware version query opcode.
pub(crate) const OP_VERSION: u8 = 0x62;

/// Kind of an issued command.
///
/// The wire format does not self-describe its replies; the kind that
/// produced a request determines how [`crate::response::decode`]
/// interprets the reply bytes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CommandKind {
    /// Broadcast identity search.
    Search,
    /// Switch the relay on or off.
    Switch,
    /// Query the relay state.
    StateQuery,
    /// Switch a 433 MHz slave socket.
    SlaveSwitch,
    /// Query all 11 timer slots.
    TimerQuery,
    /// Program a timer or countdown slot.
    SetTimer,
    /// Delete a timer slot.
    DeleteTimer,
    /// Query the absence-mode window.
    AbsenceQuery,
    /// Program the absence-mode window.
    SetAbsence,
    /// Clear the absence-mode window.
    DeleteAbsence,
    /// Liveness probe.
    Heartbeat,
    /// Query firmware version/name.
    Version,
}

impl CommandKind {
    /// Opcode the device echoes back in its reply to this command.
    pub(crate) fn opcode(self) -> u8 {
        match self {
            CommandKind::Search => OP_SEARCH,
            CommandKind::Switch => OP_SWITCH,
            CommandKind::StateQuery => OP_STATE_QUERY,
            CommandKind::SlaveSwitch => OP_SLAVE_SWITCH,
            CommandKind::TimerQuery => OP_TIMER_QUERY,
            CommandKind::SetTimer => OP_SET_TIMER,
            CommandKind::DeleteTimer => OP_DELETE_TIMER,
            CommandKind::AbsenceQuery => OP_ABSENCE_QUERY,
            CommandKind::SetAbsence | CommandKind::DeleteAbsence => OP_ABSENCE,
            CommandKind::Heartbeat => OP_HEARTBEAT,
            CommandKind::Version => OP_VERSION,
        }
    }
}

/// A buildable command: a kind plus the plaintext bytes it serializes to.
pub trait Command {
    /// The kind used to decode this command's reply.
    fn kind(&self) -> CommandKind;

    /// Plaintext bytes following the encrypted preamble.
    fn payload(&self) -> Vec<u8>;
}

/// Broadcast search for socket identities.
///
/// Carries the target MAC; the all-ones [`MacAddress::BROADCAST`] asks
/// every listening socket to answer.
#[derive(Debug, Clone)]
pub struct SearchCommand {
    mac: MacAddress,
}

impl SearchCommand {
    /// Creates a search for the given MAC (broadcast for all devices).
    pub fn new(mac: MacAddress) -> Self {
        Self { mac }
    }
}

impl Command for SearchCommand {
    fn kind(&self) -> CommandKind {
        CommandKind::Search
    }

    fn payload(&self) -> Vec<u8> {
        let mut bytes = Vec::with_capacity(9);
        bytes.push(OP_SEARCH);
        bytes.extend_from_slice(self.mac.as_bytes());
        bytes.extend_from_slice(&[0x02, 0x02]);
        bytes
    }
}

/// Switches the relay on or off.
#[derive(Debug, Clone)]
pub struct SwitchCommand {
    state: SwitchState,
}

impl SwitchCommand {
    /// Creates a switch command for the requested state.
    pub fn new(state: SwitchState) -> Self {
        Self { state }
    }
}

impl Command for SwitchCommand {
    fn kind(&self) -> CommandKind {
        CommandKind::Switch
    }

    fn payload(&self) -> Vec<u8> {
        let mut bytes = Vec::with_capacity(9);
        bytes.push(OP_SWITCH);
        bytes.extend_from_slice(&self.state.flag_bytes());
        bytes.extend_from_slice(&[0x04; 4]);
        bytes
    }
}

/// Queries the current relay state.
#[derive(Debug, Clone, Default)]
pub struct StateQueryCommand;

impl StateQueryCommand {
    /// Creates a state query.
    pub fn new() -> Self {
        Self
    }
}

impl Command for StateQueryCommand {
    fn kind(&self) -> CommandKind {
        CommandKind::StateQuery
    }

    fn payload(&self) -> Vec<u8> {
        let mut bytes = vec![OP_STATE_QUERY, 0x00, 0x00, 0x00, 0x00];
        bytes.extend_from_slice(&[0x04; 4]);
        bytes
    }
}

/// Switches a radio-controlled 433 MHz slave socket.
#[derive(Debug, Clone)]
pub struct SlaveSwitchCommand {
    slave: SlaveAddress,
    state: SwitchState,
}

impl SlaveSwitchCommand {
    /// Creates a slave switch command.
    pub fn new(slave: SlaveAddress, state: SwitchState) -> Self {
        Self { slave, state }
    }
}

impl Command for SlaveSwitchCommand {
    fn kind(&self) -> CommandKind {
        CommandKind::SlaveSwitch
    }

    fn payload(&self) -> Vec<u8> {
        let mut bytes = Vec::with_capacity(9);
        bytes.push(OP_SLAVE_SWITCH);
        bytes.extend_from_slice(self.slave.as_bytes());
        bytes.push(self.state.slave_code());
        bytes.extend_from_slice(&[0x04; 4]);
        bytes
    }
}

/// Queries all 11 timer slots.
#[derive(Debug, Clone, Default)]
pub struct TimerQueryCommand;

impl TimerQueryCommand {
    /// Creates a timer query.
    pub fn new() -> Self {
        Self
    }
}

impl Command for TimerQueryCommand {
    fn kind(&self) -> CommandKind {
        CommandKind::TimerQuery
    }

    fn payload(&self) -> Vec<u8> {
        let mut bytes = vec![OP_TIMER_QUERY, 0x00, 0x00];
        bytes.extend_from_slice(&[0x06; 6]);
        bytes
    }
}

/// Programs a timer slot or the countdown.
///
/// Takes the hour/minute already converted to the device clock via
/// [`crate::timecodec::to_device_time`]. For the countdown slot the
/// repeat byte is forced to "active, non-repeating" regardless of the
/// supplied cycle, matching firmware expectations.
#[derive(Debug, Clone)]
pub struct SetTimerCommand {
    number: TimerNumber,
    repeat_byte: u8,
    hour: u8,
    minute: u8,
    action: SwitchState,
}

impl SetTimerCommand {
    /// Creates a timer-programming command.
    pub fn new(
        number: TimerNumber,
        active: bool,
        repeat: [bool; 7],
        hour: u8,
        minute: u8,
        action: SwitchState,
    ) -> Self {
        let repeat_byte = match number {
            // Countdowns are always active and never repeat.
            TimerNumber::Countdown => 0x80,
            TimerNumber::Slot(_) => {
                let active_bit = if active { 0x80 } else { 0x00 };
                active_bit | pack_repeat_mask(repeat)
            }
        };
        Self {
            number,
            repeat_byte,
            hour,
            minute,
            action,
        }
    }
}

impl Command for SetTimerCommand {
    fn kind(&self) -> CommandKind {
        CommandKind::SetTimer
    }

    fn payload(&self) -> Vec<u8> {
        let mut bytes = Vec::with_capacity(25);
        bytes.push(OP_SET_TIMER);
        bytes.push(0x00);
        bytes.push(self.number.code());
        bytes.push(self.repeat_byte);
        bytes.push(self.hour);
        bytes.push(self.minute);
        bytes.extend_from_slice(&self.action.flag_bytes());
        bytes.extend_from_slice(&[0x0F; 15]);
        bytes
    }
}

/// Deletes a timer slot; its settings are lost.
#[derive(Debug, Clone)]
pub struct DeleteTimerCommand {
    number: TimerNumber,
}

impl DeleteTimerCommand {
    /// Creates a timer-deletion command.
    pub fn new(number: TimerNumber) -> Self {
        Self { number }
    }
}

impl Command for DeleteTimerCommand {
    fn kind(&self) -> CommandKind {
        CommandKind::DeleteTimer
    }

    fn payload(&self) -> Vec<u8> {
        let mut bytes = vec![OP_DELETE_TIMER, 0x00, self.number.code()];
        bytes.extend_from_slice(&[0x06; 6]);
        bytes
    }
}

/// Queries the absence-mode window.
#[derive(Debug, Clone, Default)]
pub struct AbsenceQueryCommand;

impl AbsenceQueryCommand {
    /// Creates an absence-mode query.
    pub fn new() -> Self {
        Self
    }
}

impl Command for AbsenceQueryCommand {
    fn kind(&self) -> CommandKind {
        CommandKind::AbsenceQuery
    }

    fn payload(&self) -> Vec<u8> {
        let mut bytes = vec![OP_ABSENCE_QUERY];
        bytes.extend_from_slice(&[0x08; 8]);
        bytes
    }
}

/// Programs the absence-mode window.
///
/// Takes timestamps already packed via
/// [`crate::timecodec::pack_timestamp`].
#[derive(Debug, Clone)]
pub struct SetAbsenceCommand {
    active: bool,
    from: [u8; 4],
    to: [u8; 4],
}

impl SetAbsenceCommand {
    /// Creates an absence-programming command.
    pub fn new(active: bool, from: [u8; 4], to: [u8; 4]) -> Self {
        Self { active, from, to }
    }
}

impl Command for SetAbsenceCommand {
    fn kind(&self) -> CommandKind {
        CommandKind::SetAbsence
    }

    fn payload(&self) -> Vec<u8> {
        let mut bytes = Vec::with_capacity(25);
        bytes.push(OP_ABSENCE);
        bytes.push(if self.active { 0x80 } else { 0x00 });
        bytes.extend_from_slice(&self.from);
        bytes.extend_from_slice(&self.to);
        bytes.push(0x1E);
        bytes.extend_from_slice(&[0x0E; 14]);
        bytes
    }
}

/// Clears the absence-mode window with the sentinel all-zero encoding.
#[derive(Debug, Clone, Default)]
pub struct DeleteAbsenceCommand;

impl DeleteAbsenceCommand {
    /// Creates an absence-deletion command.
    pub fn new() -> Self {
        Self
    }
}

impl Command for DeleteAbsenceCommand {
    fn kind(&self) -> CommandKind {
        CommandKind::DeleteAbsence
    }

    fn payload(&self) -> Vec<u8> {
        let mut bytes = Vec::with_capacity(25);
        bytes.push(OP_ABSENCE);
        bytes.extend_from_slice(&[0x00; 9]);
        bytes.extend_from_slice(&[0x0E; 15]);
        bytes
    }
}

/// Asks the socket for a liveness reply.
#[derive(Debug, Clone, Default)]
pub struct HeartbeatCommand;

impl HeartbeatCommand {
    /// Creates a heartbeat probe.
    pub fn new() -> Self {
        Self
    }
}

impl Command for HeartbeatCommand {
    fn kind(&self) -> CommandKind {
        CommandKind::Heartbeat
    }

    fn payload(&self) -> Vec<u8> {
        // The vendor app sends a timestamp here; the fixed bytes below are
        // accepted by all known firmware.
        let mut bytes = vec![OP_HEARTBEAT, 0x55, 0x93, 0x26, 0x54];
        bytes.extend_from_slice(&[0x04; 4]);
        bytes
    }
}

/// Queries the firmware version/name string.
#[derive(Debug, Clone, Default)]
pub struct VersionCommand;

impl VersionCommand {
    /// Creates a version query.
    pub fn new() -> Self {
        Self
    }
}

impl Command for VersionCommand {
    fn kind(&self) -> CommandKind {
        CommandKind::Version
    }

    fn payload(&self) -> Vec<u8> {
        let mut bytes = vec![OP_VERSION];
        bytes.extend_from_slice(&[0x08; 8]);
        bytes
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::timecodec::{ONCE, WEEKDAYS};

    // Plaintexts are 7 bytes short of a block multiple; the encrypted
    // preamble added by the frame layer brings them to alignment.
    fn assert_preamble_aligned(payload: &[u8]) {
        assert_eq!((payload.len() + 7) % 16, 0, "payload {payload:02X?}");
    }

    #[test]
    fn test_search_payload() {
        let mac = MacAddress::new([0x00, 0xAA, 0x11, 0xBB, 0x22, 0xCC]);
        let payload = SearchCommand::new(mac).payload();
        assert_eq!(
            payload,
            [0x23, 0x00, 0xAA, 0x11, 0xBB, 0x22, 0xCC, 0x02, 0x02]
        );
        assert_preamble_aligned(&payload);
    }

    #[test]
    fn test_switch_payload_on_off() {
        let on = SwitchCommand::new(SwitchState::On).payload();
        assert_eq!(on, [0x01, 0x00, 0x00, 0xFF, 0xFF, 0x04, 0x04, 0x04, 0x04]);
        let off = SwitchCommand::new(SwitchState::Off).payload();
        assert_eq!(off, [0x01, 0x00, 0x00, 0x00, 0xFF, 0x04, 0x04, 0x04, 0x04]);
        assert_preamble_aligned(&on);
    }

    #[test]
    fn test_state_query_payload() {
        let payload = StateQueryCommand::new().payload();
        assert_eq!(
            payload,
            [0x02, 0x00, 0x00, 0x00, 0x00, 0x04, 0x04, 0x04, 0x04]
        );
        assert_preamble_aligned(&payload);
    }

    #[test]
    fn test_slave_switch_payload() {
        let slave = SlaveAddress::new([0x78, 0xFB, 0x12]);
        let payload = SlaveSwitchCommand::new(slave, SwitchState::On).payload();
        assert_eq!(
            payload,
            [0x08, 0x78, 0xFB, 0x12, 0x60, 0x04, 0x04, 0x04, 0x04]
        );
        let off = SlaveSwitchCommand::new(slave, SwitchState::Off).payload();
        assert_eq!(off[4], 0x70);
        assert_preamble_aligned(&payload);
    }

    #[test]
    fn test_timer_query_payload() {
        let payload = TimerQueryCommand::new().payload();
        assert_eq!(
            payload,
            [0x04, 0x00, 0x00, 0x06, 0x06, 0x06, 0x06, 0x06, 0x06]
        );
        assert_preamble_aligned(&payload);
    }

    #[test]
    fn test_set_timer_payload() {
        let cmd = SetTimerCommand::new(
            TimerNumber::Slot(3),
            true,
            WEEKDAYS,
            12,
            25,
            SwitchState::On,
        );
        let payload = cmd.payload();
        assert_eq!(payload.len(), 25);
        assert_eq!(payload[0], 0x03);
        assert_eq!(payload[2], 3);
        assert_eq!(payload[3], 0x80 | 0b0001_1111);
        assert_eq!(payload[4], 12);
        assert_eq!(payload[5], 25);
        assert_eq!(&payload[6..10], &[0x00, 0x00, 0xFF, 0xFF]);
        assert_eq!(&payload[10..], &[0x0F; 15]);
        assert_preamble_aligned(&payload);
    }

    #[test]
    fn test_set_timer_inactive_keeps_repeat() {
        let cmd = SetTimerCommand::new(
            TimerNumber::Slot(1),
            false,
            WEEKDAYS,
            6,
            0,
            SwitchState::Off,
        );
        assert_eq!(cmd.payload()[3], 0b0001_1111);
    }

    #[test]
    fn test_set_timer_countdown_forces_repeat_byte() {
        let cmd = SetTimerCommand::new(
            TimerNumber::Countdown,
            false,
            WEEKDAYS,
            1,
            30,
            SwitchState::On,
        );
        let payload = cmd.payload();
        assert_eq!(payload[2], 11);
        assert_eq!(payload[3], 0x80);
    }

    #[test]
    fn test_delete_timer_payload() {
        let payload = DeleteTimerCommand::new(TimerNumber::Slot(7)).payload();
        assert_eq!(payload, [0x05, 0x00, 7, 0x06, 0x06, 0x06, 0x06, 0x06, 0x06]);
        let countdown = DeleteTimerCommand::new(TimerNumber::Countdown).payload();
        assert_eq!(countdown[2], 11);
        assert_preamble_aligned(&payload);
    }

    #[test]
    fn test_absence_query_payload() {
        let payload = AbsenceQueryCommand::new().payload();
        assert_eq!(payload[0], 0x0A);
        assert_eq!(&payload[1..], &[0x08; 8]);
        assert_preamble_aligned(&payload);
    }

    #[test]
    fn test_set_absence_payload() {
        let cmd = SetAbsenceCommand::new(true, [0x63, 0xCA, 0x00, 0x10], [0x63, 0xCB, 0x00, 0x10]);
        let payload = cmd.payload();
        assert_eq!(payload.len(), 25);
        assert_eq!(payload[0], 0x09);
        assert_eq!(payload[1], 0x80);
        assert_eq!(&payload[2..6], &[0x63, 0xCA, 0x00, 0x10]);
        assert_eq!(&payload[6..10], &[0x63, 0xCB, 0x00, 0x10]);
        assert_eq!(payload[10], 0x1E);
        assert_eq!(&payload[11..], &[0x0E; 14]);
        assert_preamble_aligned(&payload);
    }

    #[test]
    fn test_delete_absence_payload() {
        let payload = DeleteAbsenceCommand::new().payload();
        assert_eq!(payload.len(), 25);
        assert_eq!(payload[0], 0x09);
        assert_eq!(&payload[1..10], &[0x00; 9]);
        assert_eq!(&payload[10..], &[0x0E; 15]);
        assert_preamble_aligned(&payload);
    }

    #[test]
    fn test_heartbeat_payload() {
        let payload = HeartbeatCommand::new().payload();
        assert_eq!(
            payload,
            [0x61, 0x55, 0x93, 0x26, 0x54, 0x04, 0x04, 0x04, 0x04]
        );
        assert_preamble_aligned(&payload);
    }

    #[test]
    fn test_version_payload() {
        let payload = VersionCommand::new().payload();
        assert_eq!(payload[0], 0x62);
        assert_eq!(&payload[1..], &[0x08; 8]);
        assert_preamble_aligned(&payload);
    }

    #[test]
    fn test_absence_kinds_share_opcode() {
        assert_eq!(CommandKind::SetAbsence.opcode(), 0x09);
        assert_eq!(CommandKind::DeleteAbsence.opcode(), 0x09);
        assert_ne!(CommandKind::AbsenceQuery.opcode(), 0x09);
    }

    #[test]
    fn test_set_timer_once_repeat() {
        let cmd = SetTimerCommand::new(
            TimerNumber::Slot(2),
            true,
            ONCE,
            8,
            15,
            SwitchState::On,
        );
        assert_eq!(cmd.payload()[3], 0x80);
    }
}
