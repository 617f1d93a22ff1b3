//! High-level operations on Silvercrest-style Wi-Fi sockets.
//!
//! [`SocketClient`] is the entry point: it owns a [`DeviceProfile`] and
//! drives one encrypt-send-receive-decode exchange per operation. The
//! client is stateless apart from its configuration, so a single instance
//! can address any number of devices.
//!
//! # Example
//!
//! ```no_run
//! use silvercrest_sws::{SocketClient, SwitchState};
//!
//! fn main() -> silvercrest_sws::Result<()> {
//!     let client = SocketClient::with_defaults();
//!     for device in client.discover()? {
//!         println!("found {device}");
//!         client.switch(&device, SwitchState::On)?;
//!     }
//!     Ok(())
//! }
//! ```

use std::net::{Ipv4Addr, SocketAddr};
use std::thread;
use std::time::{Duration, Instant};

use crate::command::{
    AbsenceQueryCommand, Command, DeleteAbsenceCommand, DeleteTimerCommand, HeartbeatCommand,
    SearchCommand, SetAbsenceCommand, SetTimerCommand, SlaveSwitchCommand, StateQueryCommand,
    SwitchCommand, TimerQueryCommand, VersionCommand,
};
use crate::device::{
    AbsenceWindow, DeviceIdentity, DeviceProfile, MacAddress, SlaveAddress, SwitchState,
    TimerNumber, TimerProgram, TimerSlot, TimerTime,
};
use crate::error::{Result, SwsError};
use crate::frame::{open_reply, CommandFrame};
use crate::response::{decode, decode_identity, Reply};
use crate::timecodec::{pack_timestamp, to_device_time, TimeBasis, ONCE};
use crate::transport::UdpTransport;

/// UDP port a factory-reset socket listens on for Wi-Fi credentials.
pub const PAIRING_PORT: u16 = 49999;

/// How long [`SocketClient::send_password`] keeps transmitting by default.
pub const PAIRING_WINDOW: Duration = Duration::from_secs(30);

/// Client for every operation the sockets support.
#[derive(Debug, Clone)]
pub struct SocketClient {
    profile: DeviceProfile,
    delta_seconds: Option<i32>,
}

impl SocketClient {
    /// Creates a client with the given profile.
    pub fn new(profile: DeviceProfile) -> Self {
        Self {
            profile,
            delta_seconds: None,
        }
    }

    /// Creates a client with the default profile (SWS-A1 family, port
    /// 8530, 2 second timeout, 2 retries).
    pub fn with_defaults() -> Self {
        Self::new(DeviceProfile::default())
    }

    /// Overrides the local-to-device clock offset in seconds.
    ///
    /// The firmware keeps UTC, so by default the offset is derived from
    /// the local time zone. Use this for devices whose clock was set to
    /// some other convention.
    pub fn with_delta_seconds(mut self, delta_seconds: i32) -> Self {
        self.delta_seconds = Some(delta_seconds);
        self
    }

    /// Returns the profile this client was built with.
    pub fn profile(&self) -> &DeviceProfile {
        &self.profile
    }

    fn basis(&self) -> TimeBasis {
        match self.delta_seconds {
            Some(delta) => TimeBasis::with_delta(delta),
            None => TimeBasis::local(),
        }
    }

    fn exchange(&self, device: &DeviceIdentity, command: &dyn Command) -> Result<Reply> {
        let frame = CommandFrame::assemble(&self.profile, &device.mac, &command.payload())?;
        let destination = SocketAddr::from((device.ip, self.profile.port));
        let transport = UdpTransport::unicast(&self.profile, destination)?;
        let (datagram, _) = transport.send_receive(&frame.to_bytes())?;
        let plaintext = open_reply(&datagram)?;
        decode(command.kind(), &plaintext, &self.basis())
    }

    fn expect_ack(&self, device: &DeviceIdentity, command: &dyn Command) -> Result<()> {
        match self.exchange(device, command)? {
            Reply::Ack => Ok(()),
            other => Err(SwsError::malformed_reply(format!(
                "expected an acknowledgement, decoded {other:?}"
            ))),
        }
    }

    /// Decodes every well-formed search reply, silently skipping foreign
    /// or corrupted datagrams the way the devices' own app does.
    fn collect_identities(
        &self,
        transport: &UdpTransport,
        mac: MacAddress,
    ) -> Result<Vec<DeviceIdentity>> {
        let frame = CommandFrame::assemble(&self.profile, &mac, &SearchCommand::new(mac).payload())?;
        let mut identities = Vec::new();
        for (datagram, source) in transport.send_collect(&frame.to_bytes())? {
            let plaintext = match open_reply(&datagram) {
                Ok(plaintext) => plaintext,
                Err(e) => {
                    tracing::debug!(%source, error = %e, "ignoring unreadable search reply");
                    continue;
                }
            };
            match decode_identity(&plaintext, source) {
                // Devices may answer a broadcast more than once within the
                // window; each identity is reported a single time.
                Ok(identity) if identities.contains(&identity) => {
                    tracing::debug!(%identity, "ignoring repeated search reply");
                }
                Ok(identity) => identities.push(identity),
                Err(e) => {
                    tracing::debug!(%source, error = %e, "ignoring malformed search reply");
                }
            }
        }
        Ok(identities)
    }

    /// Broadcasts a search and returns every socket that answered within
    /// one reply window. An empty network yields an empty list, not an
    /// error.
    pub fn discover(&self) -> Result<Vec<DeviceIdentity>> {
        let transport = UdpTransport::broadcast(&self.profile)?;
        self.collect_identities(&transport, MacAddress::BROADCAST)
    }

    /// Resolves the current IP address of the socket with the given MAC.
    ///
    /// Returns `Ok(None)` when no such socket answered.
    pub fn find_by_mac(&self, mac: MacAddress) -> Result<Option<DeviceIdentity>> {
        let transport = UdpTransport::broadcast(&self.profile)?;
        let identities = self.collect_identities(&transport, mac)?;
        Ok(identities.into_iter().find(|identity| identity.mac == mac))
    }

    /// Resolves the MAC address of the socket at the given IP.
    ///
    /// Returns `Ok(None)` when nothing at that address answered.
    pub fn find_by_ip(&self, ip: Ipv4Addr) -> Result<Option<DeviceIdentity>> {
        let destination = SocketAddr::from((ip, self.profile.port));
        let transport = UdpTransport::unicast(&self.profile, destination)?;
        let identities = self.collect_identities(&transport, MacAddress::BROADCAST)?;
        Ok(identities.into_iter().next())
    }

    /// Switches the socket's relay on or off.
    ///
    /// Switching to the state the relay is already in is acknowledged
    /// like any other switch.
    pub fn switch(&self, device: &DeviceIdentity, state: SwitchState) -> Result<()> {
        self.expect_ack(device, &SwitchCommand::new(state))
    }

    /// Reads the current relay state.
    pub fn switch_state(&self, device: &DeviceIdentity) -> Result<SwitchState> {
        match self.exchange(device, &StateQueryCommand::new())? {
            Reply::SwitchState(state) => Ok(state),
            other => Err(SwsError::malformed_reply(format!(
                "expected a switch state, decoded {other:?}"
            ))),
        }
    }

    /// Switches a 433 MHz radio slave paired with the socket.
    pub fn switch_slave(
        &self,
        device: &DeviceIdentity,
        slave: SlaveAddress,
        state: SwitchState,
    ) -> Result<()> {
        self.expect_ack(device, &SlaveSwitchCommand::new(slave, state))
    }

    /// Reads all 11 timer slots: the ten numbered slots followed by the
    /// countdown.
    pub fn timers(&self, device: &DeviceIdentity) -> Result<Vec<TimerSlot>> {
        match self.exchange(device, &TimerQueryCommand::new())? {
            Reply::Timers(slots) => Ok(slots),
            other => Err(SwsError::malformed_reply(format!(
                "expected the timer table, decoded {other:?}"
            ))),
        }
    }

    /// Reads a single timer slot.
    pub fn timer(&self, device: &DeviceIdentity, number: TimerNumber) -> Result<TimerSlot> {
        let slots = self.timers(device)?;
        Ok(slots[usize::from(number.code()) - 1])
    }

    /// Programs a timer slot.
    ///
    /// Numbered slots take a [`TimerTime::At`] time of day; the countdown
    /// takes a [`TimerTime::In`] duration. Setting a slot overwrites its
    /// previous program wholesale.
    ///
    /// # Errors
    ///
    /// `InvalidParameter` when the firing time does not match the slot
    /// kind, or when a countdown duration falls outside 0-24 hours.
    pub fn set_timer(
        &self,
        device: &DeviceIdentity,
        number: TimerNumber,
        program: TimerProgram,
    ) -> Result<()> {
        let basis = self.basis();
        let (hour, minute) = match (number, program.time) {
            (TimerNumber::Slot(_), TimerTime::At(at)) => to_device_time(at, basis.delta_seconds),
            (TimerNumber::Countdown, TimerTime::In(duration)) => {
                if duration < chrono::Duration::zero() || duration >= chrono::Duration::hours(24) {
                    return Err(SwsError::invalid_parameter(
                        "duration",
                        "countdown must run between 0 and 24 hours",
                    ));
                }
                let expiry = basis.now + duration;
                to_device_time(expiry.time(), basis.delta_seconds)
            }
            (TimerNumber::Slot(_), TimerTime::In(_)) => {
                return Err(SwsError::invalid_parameter(
                    "time",
                    "numbered slots fire at a time of day, not after a duration",
                ));
            }
            (TimerNumber::Countdown, TimerTime::At(_)) => {
                return Err(SwsError::invalid_parameter(
                    "time",
                    "the countdown fires after a duration, not at a time of day",
                ));
            }
        };

        let command = SetTimerCommand::new(
            number,
            program.active,
            program.repeat,
            hour,
            minute,
            program.action,
        );
        self.expect_ack(device, &command)
    }

    /// Starts the countdown: after `duration` the relay switches to
    /// `action`.
    pub fn set_countdown(
        &self,
        device: &DeviceIdentity,
        duration: chrono::Duration,
        action: SwitchState,
    ) -> Result<()> {
        self.set_timer(
            device,
            TimerNumber::Countdown,
            TimerProgram {
                active: true,
                repeat: ONCE,
                time: TimerTime::In(duration),
                action,
            },
        )
    }

    /// Arms or disarms an already programmed timer, keeping its settings.
    ///
    /// Reads the slot back first because the wire format has no
    /// activate-only command; the full program is re-sent with the new
    /// active flag.
    ///
    /// # Errors
    ///
    /// `InvalidParameter` when the slot is the countdown or holds no
    /// program.
    pub fn activate_timer(
        &self,
        device: &DeviceIdentity,
        number: TimerNumber,
        activate: bool,
    ) -> Result<()> {
        if number == TimerNumber::Countdown {
            return Err(SwsError::invalid_parameter(
                "timer",
                "the countdown cannot be re-armed, set it again instead",
            ));
        }
        let slot = self.timer(device, number)?;
        let mut program = slot.program.ok_or_else(|| {
            SwsError::invalid_parameter("timer", format!("slot {number} holds no program"))
        })?;
        program.active = activate;
        self.set_timer(device, number, program)
    }

    /// Deletes a timer slot; its settings are lost.
    pub fn delete_timer(&self, device: &DeviceIdentity, number: TimerNumber) -> Result<()> {
        self.expect_ack(device, &DeleteTimerCommand::new(number))
    }

    /// Reads the absence-mode window, or `None` when none was ever set.
    pub fn absence_window(&self, device: &DeviceIdentity) -> Result<Option<AbsenceWindow>> {
        match self.exchange(device, &AbsenceQueryCommand::new())? {
            Reply::Absence(window) => Ok(window),
            other => Err(SwsError::malformed_reply(format!(
                "expected an absence window, decoded {other:?}"
            ))),
        }
    }

    /// Programs the absence-mode window, overwriting any previous one.
    ///
    /// While the window is active the socket cycles its relay every
    /// 30 minutes.
    ///
    /// # Errors
    ///
    /// `InvalidParameter` when the window ends before it starts;
    /// `TimeOutOfRange` when an instant cannot be carried in the 4-byte
    /// wire timestamp.
    pub fn set_absence_window(&self, device: &DeviceIdentity, window: AbsenceWindow) -> Result<()> {
        if window.to <= window.from {
            return Err(SwsError::invalid_parameter(
                "window",
                "absence window must end after it starts",
            ));
        }
        let command = SetAbsenceCommand::new(
            window.active,
            pack_timestamp(window.from)?,
            pack_timestamp(window.to)?,
        );
        self.expect_ack(device, &command)
    }

    /// Clears the absence-mode window.
    pub fn delete_absence_window(&self, device: &DeviceIdentity) -> Result<()> {
        self.expect_ack(device, &DeleteAbsenceCommand::new())
    }

    /// Probes whether the socket is alive and answering.
    pub fn heartbeat(&self, device: &DeviceIdentity) -> Result<()> {
        match self.exchange(device, &HeartbeatCommand::new())? {
            Reply::Heartbeat => Ok(()),
            other => Err(SwsError::malformed_reply(format!(
                "expected a heartbeat, decoded {other:?}"
            ))),
        }
    }

    /// Reads the raw firmware version/name bytes.
    pub fn version(&self, device: &DeviceIdentity) -> Result<Vec<u8>> {
        match self.exchange(device, &VersionCommand::new())? {
            Reply::Version(bytes) => Ok(bytes),
            other => Err(SwsError::malformed_reply(format!(
                "expected version bytes, decoded {other:?}"
            ))),
        }
    }

    /// Transmits the Wi-Fi password to a socket in pairing mode.
    ///
    /// Hold the on/off button for 5 seconds until the LED flashes red,
    /// then call this. The password travels unencrypted as a sequence of
    /// broadcast datagrams whose *lengths* carry the data, repeated for
    /// the whole `window` (the LED turns blue once the socket has joined).
    ///
    /// # Errors
    ///
    /// `InvalidParameter` for an empty or non-ASCII password; `Io` when
    /// the broadcast socket cannot be used.
    pub fn send_password(&self, password: &str, window: Duration) -> Result<()> {
        if password.is_empty() {
            return Err(SwsError::invalid_parameter("password", "must not be empty"));
        }
        if !password.is_ascii() {
            return Err(SwsError::invalid_parameter(
                "password",
                "must be ASCII, the pairing encoding cannot carry other characters",
            ));
        }

        let transport = UdpTransport::broadcast_to(&self.profile, PAIRING_PORT)?;
        let beacon = |length: usize, pause_ms: u64| -> Result<()> {
            transport.send_and_forget(&vec![0x05; length])?;
            thread::sleep(Duration::from_millis(pause_ms));
            Ok(())
        };

        tracing::info!(len = password.len(), "transmitting pairing beacons");
        let deadline = Instant::now() + window;
        while Instant::now() < deadline {
            for _ in 0..60 {
                beacon(76, 10)?;
            }
            for _ in 0..5 {
                beacon(89, 50)?;
                beacon(89, 50)?;
                beacon(89, 100)?;
                for letter in password.bytes() {
                    beacon(usize::from(letter) + 76, 100)?;
                }
                beacon(86, 50)?;
                beacon(86, 50)?;
                beacon(86, 200)?;
                beacon(password.len() + 256 + 76, 50)?;
                beacon(password.len() + 256 + 76, 50)?;
                beacon(password.len() + 256 + 76, 500)?;
            }
        }
        Ok(())
    }
}

impl Default for SocketClient {
    fn default() -> Self {
        Self::with_defaults()
    }
}
