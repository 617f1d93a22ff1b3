//! Device identities, addressing, and the domain records decoded from
//! replies.
//!
//! A socket is durably identified by its MAC address; the IP address is
//! assigned by the local network and may change, so it is re-resolved via
//! discovery when stale. The [`DeviceProfile`] carries the process-wide
//! transport and firmware-family configuration that every operation reads.
//!
//! # Example
//!
//! ```
//! use silvercrest_sws::{DeviceIdentity, DeviceProfile, MacAddress};
//! use std::net::Ipv4Addr;
//!
//! let mac: MacAddress = "00 aa 11 bb 22 cc".parse().unwrap();
//! let identity = DeviceIdentity::new(mac, Ipv4Addr::new(192, 168, 0, 15));
//!
//! let profile = DeviceProfile::default()
//!     .with_device_code(silvercrest_sws::device::DIS_120);
//! # let _ = (identity, profile);
//! ```

use std::fmt;
use std::net::Ipv4Addr;
use std::str::FromStr;
use std::time::Duration;

use chrono::{NaiveDateTime, NaiveTime};

use crate::error::{Result, SwsError};
use crate::transport::{DEFAULT_RETRY_BUDGET, DEFAULT_TIMEOUT, DEFAULT_UDP_PORT};

/// Device code of the Silvercrest SWS-A1 (sold by Lidl).
pub const SWS_A1: [u8; 4] = [0xC1, 0x11, 0x71, 0x50];

/// Device code of the Aldi Easy Home DIS-120.
pub const DIS_120: [u8; 4] = [0xC2, 0x11, 0x92, 0xDD];

/// Device code observed in the wild on an unidentified firmware family.
pub const U_DEVICE: [u8; 4] = [0xCA, 0xA1, 0x88, 0x98];

/// Sequence-counter sentinel accepted by all known firmware.
///
/// Devices are documented to require an increasing packet number but in
/// practice accept any value; the wrap sentinel avoids per-call state.
pub const PACKET_WRAP: u16 = 0xFFFF;

fn parse_hex_address(s: &str, parameter: &str, width: usize) -> Result<Vec<u8>> {
    let compact: String = s.chars().filter(|c| !matches!(c, ' ' | ':')).collect();
    let bytes = hex::decode(&compact).map_err(|e| {
        SwsError::invalid_parameter(parameter, format!("not a hex string: {e}"))
    })?;
    if bytes.len() != width {
        return Err(SwsError::invalid_parameter(
            parameter,
            format!("must decode to exactly {width} bytes, got {}", bytes.len()),
        ));
    }
    Ok(bytes)
}

/// 6-byte MAC address of a socket.
///
/// Parses hex with or without space/colon separators: `"00aa11bb22cc"`,
/// `"00 aa 11 bb 22 cc"`, and `"00:aa:11:bb:22:cc"` are all accepted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct MacAddress([u8; 6]);

impl MacAddress {
    /// The all-ones address used by the broadcast search command.
    pub const BROADCAST: MacAddress = MacAddress([0xFF; 6]);

    /// Creates a MAC address from raw bytes.
    pub fn new(bytes: [u8; 6]) -> Self {
        Self(bytes)
    }

    /// Parses a MAC address from a hex string.
    ///
    /// # Errors
    ///
    /// Returns `InvalidParameter` if the string does not decode to exactly
    /// 6 bytes.
    ///
    /// # Example
    ///
    /// ```
    /// use silvercrest_sws::MacAddress;
    ///
    /// let mac = MacAddress::parse("ac bc de 01 02 03").unwrap();
    /// assert_eq!(mac.to_string(), "acbcde010203");
    /// ```
    pub fn parse(s: &str) -> Result<Self> {
        let bytes = parse_hex_address(s, "mac", 6)?;
        let mut mac = [0u8; 6];
        mac.copy_from_slice(&bytes);
        Ok(Self(mac))
    }

    /// Returns the raw address bytes.
    pub fn as_bytes(&self) -> &[u8; 6] {
        &self.0
    }
}

impl FromStr for MacAddress {
    type Err = SwsError;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

impl fmt::Display for MacAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", hex::encode(self.0))
    }
}

/// 3-byte address of a radio-controlled 433 MHz slave socket.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SlaveAddress([u8; 3]);

impl SlaveAddress {
    /// Creates a slave address from raw bytes.
    pub fn new(bytes: [u8; 3]) -> Self {
        Self(bytes)
    }

    /// Parses a slave address from a hex string like `"78fb12"`.
    ///
    /// # Errors
    ///
    /// Returns `InvalidParameter` if the string does not decode to exactly
    /// 3 bytes.
    pub fn parse(s: &str) -> Result<Self> {
        let bytes = parse_hex_address(s, "slave", 3)?;
        let mut slave = [0u8; 3];
        slave.copy_from_slice(&bytes);
        Ok(Self(slave))
    }

    /// Returns the raw address bytes.
    pub fn as_bytes(&self) -> &[u8; 3] {
        &self.0
    }
}

impl FromStr for SlaveAddress {
    type Err = SwsError;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

impl fmt::Display for SlaveAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", hex::encode(self.0))
    }
}

/// Resolved identity of a socket: durable MAC plus current IP.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct DeviceIdentity {
    /// Fixed hardware address, encoded into every command header.
    pub mac: MacAddress,
    /// Network address the command datagram is sent to; may go stale.
    pub ip: Ipv4Addr,
}

impl DeviceIdentity {
    /// Pairs a MAC with its current IP address.
    pub fn new(mac: MacAddress, ip: Ipv4Addr) -> Self {
        Self { mac, ip }
    }
}

impl fmt::Display for DeviceIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} at {}", self.mac, self.ip)
    }
}

/// Read-only per-call configuration for every transport operation.
///
/// Mirrors the app defaults: SWS-A1 device code, wrap packet number,
/// UDP port 8530, 2 second timeout, 2 retries after the first attempt.
#[derive(Debug, Clone)]
pub struct DeviceProfile {
    /// 4-byte vendor/model/authentication code sent inside the ciphertext.
    pub device_code: [u8; 4],
    /// Sequence marker; firmware accepts the [`PACKET_WRAP`] sentinel.
    pub packet_seed: u16,
    /// UDP port commands are sent to and replies arrive on.
    pub port: u16,
    /// Local port the per-call socket binds to. The vendor app sources
    /// every datagram from the command port itself, which is the only
    /// behavior verified against hardware; `0` asks the OS for an
    /// ephemeral port instead.
    pub source_port: u16,
    /// How long a call waits for a single reply.
    pub timeout: Duration,
    /// Additional send attempts after the first one times out.
    pub retry_budget: u32,
    /// Local address the per-call socket binds to.
    pub bind_addr: Ipv4Addr,
}

impl Default for DeviceProfile {
    fn default() -> Self {
        Self {
            device_code: SWS_A1,
            packet_seed: PACKET_WRAP,
            port: DEFAULT_UDP_PORT,
            source_port: DEFAULT_UDP_PORT,
            timeout: DEFAULT_TIMEOUT,
            retry_budget: DEFAULT_RETRY_BUDGET,
            bind_addr: Ipv4Addr::UNSPECIFIED,
        }
    }
}

impl DeviceProfile {
    /// Sets the firmware family code (default is [`SWS_A1`]).
    pub fn with_device_code(mut self, code: [u8; 4]) -> Self {
        self.device_code = code;
        self
    }

    /// Sets the sequence marker (default is [`PACKET_WRAP`]).
    pub fn with_packet_seed(mut self, seed: u16) -> Self {
        self.packet_seed = seed;
        self
    }

    /// Sets a custom UDP port (default is 8530).
    pub fn with_port(mut self, port: u16) -> Self {
        self.port = port;
        self
    }

    /// Sets the local source port (default is 8530, matching the vendor
    /// app; `0` binds an ephemeral port).
    pub fn with_source_port(mut self, source_port: u16) -> Self {
        self.source_port = source_port;
        self
    }

    /// Sets a custom per-reply timeout (default is 2 seconds).
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Sets how many times a timed-out send is repeated (default is 2).
    pub fn with_retry_budget(mut self, retry_budget: u32) -> Self {
        self.retry_budget = retry_budget;
        self
    }

    /// Sets the local bind address (default is `0.0.0.0`).
    pub fn with_bind_addr(mut self, bind_addr: Ipv4Addr) -> Self {
        self.bind_addr = bind_addr;
        self
    }
}

/// Requested or reported on/off state of a switch relay.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SwitchState {
    /// Relay closed, power delivered.
    On,
    /// Relay open.
    Off,
}

impl SwitchState {
    /// 4-byte wire flag used by the switch and timer commands.
    pub(crate) fn flag_bytes(self) -> [u8; 4] {
        match self {
            SwitchState::On => [0x00, 0x00, 0xFF, 0xFF],
            SwitchState::Off => [0x00, 0x00, 0x00, 0xFF],
        }
    }

    /// Decodes the 4-byte wire flag; anything that is not the on pattern
    /// reads as off, matching firmware behavior.
    pub(crate) fn from_flag_bytes(bytes: &[u8]) -> Self {
        if bytes == [0x00, 0x00, 0xFF, 0xFF] {
            SwitchState::On
        } else {
            SwitchState::Off
        }
    }

    /// 1-byte code used by the slave-switch command.
    pub(crate) fn slave_code(self) -> u8 {
        match self {
            SwitchState::On => 0x60,
            SwitchState::Off => 0x70,
        }
    }
}

impl fmt::Display for SwitchState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SwitchState::On => write!(f, "on"),
            SwitchState::Off => write!(f, "off"),
        }
    }
}

/// Identifies one of the ten numbered timer slots or the countdown slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TimerNumber {
    /// Numbered slot 1 through 10.
    Slot(u8),
    /// The 11th slot, which encodes a duration-until-switch.
    Countdown,
}

impl TimerNumber {
    /// Wire code of the countdown slot.
    pub(crate) const COUNTDOWN_CODE: u8 = 11;

    /// Creates a timer number from its 1-based index; 11 is the countdown.
    ///
    /// # Errors
    ///
    /// Returns `InvalidParameter` for anything outside 1..=11.
    pub fn new(index: u8) -> Result<Self> {
        match index {
            1..=10 => Ok(TimerNumber::Slot(index)),
            Self::COUNTDOWN_CODE => Ok(TimerNumber::Countdown),
            _ => Err(SwsError::invalid_parameter(
                "timer",
                format!("must be 1-10 or {} (countdown), got {index}", Self::COUNTDOWN_CODE),
            )),
        }
    }

    /// Returns the wire code of this slot.
    pub fn code(self) -> u8 {
        match self {
            TimerNumber::Slot(n) => n,
            TimerNumber::Countdown => Self::COUNTDOWN_CODE,
        }
    }
}

impl fmt::Display for TimerNumber {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TimerNumber::Slot(n) => write!(f, "{n}"),
            TimerNumber::Countdown => write!(f, "Countdown"),
        }
    }
}

/// Firing time of a programmed timer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimerTime {
    /// Numbered slots fire at a local time of day.
    At(NaiveTime),
    /// The countdown slot fires after a duration.
    In(chrono::Duration),
}

/// Programmed contents of a timer slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimerProgram {
    /// Whether the program is armed; a disarmed program keeps its settings.
    pub active: bool,
    /// Weekly repeat cycle, Monday first. All-false fires once.
    pub repeat: [bool; 7],
    /// When the slot fires.
    pub time: TimerTime,
    /// What the slot does when it fires.
    pub action: SwitchState,
}

/// One of the 11 timer slots as reported by the device.
///
/// A slot is either fully programmed or fully empty; the wire format
/// cannot express a partially filled slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimerSlot {
    /// Which slot this record describes.
    pub number: TimerNumber,
    /// `None` for an empty slot.
    pub program: Option<TimerProgram>,
}

impl TimerSlot {
    /// Returns whether the slot holds no program.
    pub fn is_empty(&self) -> bool {
        self.program.is_none()
    }
}

/// Absence ("antithief") mode window: the socket cycles on and off at a
/// fixed interval between the two instants.
///
/// Device-side singleton; any set operation overwrites it wholesale.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AbsenceWindow {
    /// Whether the window is armed.
    pub active: bool,
    /// Local start of the window.
    pub from: NaiveDateTime,
    /// Local end of the window.
    pub to: NaiveDateTime,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mac_parse_formats() {
        let plain = MacAddress::parse("00aa11bb22cc").unwrap();
        let spaced = MacAddress::parse("00 aa 11 bb 22 cc").unwrap();
        let colons = MacAddress::parse("00:aa:11:bb:22:cc").unwrap();
        assert_eq!(plain, spaced);
        assert_eq!(plain, colons);
        assert_eq!(plain.as_bytes(), &[0x00, 0xAA, 0x11, 0xBB, 0x22, 0xCC]);
    }

    #[test]
    fn test_mac_parse_rejects_wrong_width() {
        assert!(MacAddress::parse("00aa11bb22").is_err());
        assert!(MacAddress::parse("00aa11bb22ccdd").is_err());
        assert!(MacAddress::parse("zz aa 11 bb 22 cc").is_err());
    }

    #[test]
    fn test_mac_display_roundtrip() {
        let mac: MacAddress = "ACBCDE010203".parse().unwrap();
        assert_eq!(mac.to_string(), "acbcde010203");
        assert_eq!(mac.to_string().parse::<MacAddress>().unwrap(), mac);
    }

    #[test]
    fn test_broadcast_mac() {
        assert_eq!(MacAddress::BROADCAST.as_bytes(), &[0xFF; 6]);
    }

    #[test]
    fn test_slave_parse() {
        let slave = SlaveAddress::parse("78fb12").unwrap();
        assert_eq!(slave.as_bytes(), &[0x78, 0xFB, 0x12]);
        assert!(SlaveAddress::parse("78fb").is_err());
        assert!(SlaveAddress::parse("78fb1234").is_err());
    }

    #[test]
    fn test_profile_defaults() {
        let profile = DeviceProfile::default();
        assert_eq!(profile.device_code, SWS_A1);
        assert_eq!(profile.packet_seed, PACKET_WRAP);
        assert_eq!(profile.port, 8530);
        assert_eq!(profile.source_port, 8530);
        assert_eq!(profile.timeout, Duration::from_secs(2));
        assert_eq!(profile.retry_budget, 2);
        assert_eq!(profile.bind_addr, Ipv4Addr::UNSPECIFIED);
    }

    #[test]
    fn test_profile_builder() {
        let profile = DeviceProfile::default()
            .with_device_code(DIS_120)
            .with_packet_seed(0x0001)
            .with_port(9000)
            .with_source_port(0)
            .with_timeout(Duration::from_millis(500))
            .with_retry_budget(0)
            .with_bind_addr(Ipv4Addr::LOCALHOST);
        assert_eq!(profile.device_code, DIS_120);
        assert_eq!(profile.packet_seed, 0x0001);
        assert_eq!(profile.port, 9000);
        assert_eq!(profile.source_port, 0);
        assert_eq!(profile.timeout, Duration::from_millis(500));
        assert_eq!(profile.retry_budget, 0);
        assert_eq!(profile.bind_addr, Ipv4Addr::LOCALHOST);
    }

    #[test]
    fn test_switch_flag_bytes() {
        assert_eq!(SwitchState::On.flag_bytes(), [0x00, 0x00, 0xFF, 0xFF]);
        assert_eq!(SwitchState::Off.flag_bytes(), [0x00, 0x00, 0x00, 0xFF]);
        assert_eq!(
            SwitchState::from_flag_bytes(&[0x00, 0x00, 0xFF, 0xFF]),
            SwitchState::On
        );
        assert_eq!(
            SwitchState::from_flag_bytes(&[0x00, 0x00, 0x00, 0xFF]),
            SwitchState::Off
        );
    }

    #[test]
    fn test_timer_number_range() {
        assert_eq!(TimerNumber::new(1).unwrap(), TimerNumber::Slot(1));
        assert_eq!(TimerNumber::new(10).unwrap(), TimerNumber::Slot(10));
        assert_eq!(TimerNumber::new(11).unwrap(), TimerNumber::Countdown);
        assert!(TimerNumber::new(0).is_err());
        assert!(TimerNumber::new(12).is_err());
    }

    #[test]
    fn test_timer_number_codes() {
        assert_eq!(TimerNumber::Slot(7).code(), 7);
        assert_eq!(TimerNumber::Countdown.code(), 11);
        assert_eq!(TimerNumber::Countdown.to_string(), "Countdown");
    }

    #[test]
    fn test_identity_display() {
        let identity = DeviceIdentity::new(
            MacAddress::new([0xAC, 0xBC, 0xDE, 0x01, 0x02, 0x03]),
            Ipv4Addr::new(192, 168, 0, 15),
        );
        assert_eq!(identity.to_string(), "acbcde010203 at 192.168.0.15");
    }
}
