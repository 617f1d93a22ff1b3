//! # Silvercrest SWS Wi-Fi Socket Library
//!
//! A Rust library for controlling Silvercrest SWS-A1 style Wi-Fi power
//! sockets (sold by Lidl; the Aldi Easy Home DIS-120 speaks the same
//! protocol) over the local network.
//!
//! The sockets listen on UDP port 8530 for AES-128-CBC encrypted command
//! frames with a well-known fixed key. This library implements the full
//! command set: discovery, switching, the 10 weekly timers plus countdown,
//! absence ("antithief") mode, liveness probing, and the unencrypted
//! pairing broadcast that enrolls a factory-reset socket into the Wi-Fi.
//!
//! Each call produces one request/reply exchange over a short-lived
//! socket; lost datagrams are re-sent within a configurable retry budget,
//! and every other failure is surfaced as an explicit [`SwsError`].
//!
//! ## Quick Start
//!
//! ```no_run
//! use silvercrest_sws::{SocketClient, SwitchState};
//!
//! fn main() -> silvercrest_sws::Result<()> {
//!     let client = SocketClient::with_defaults();
//!
//!     // Find every socket in the local network.
//!     let devices = client.discover()?;
//!     for device in &devices {
//!         println!("found {device}");
//!     }
//!
//!     // Switch the first one on and read the state back.
//!     if let Some(device) = devices.first() {
//!         client.switch(device, SwitchState::On)?;
//!         println!("state: {}", client.switch_state(device)?);
//!     }
//!     Ok(())
//! }
//! ```
//!
//! ## Addressing
//!
//! A socket is durably identified by its MAC address; its IP is assigned
//! by the network and may change. [`DeviceIdentity`] pairs the two, and
//! [`SocketClient::find_by_mac`] re-resolves a stale IP:
//!
//! ```no_run
//! # use silvercrest_sws::SocketClient;
//! # let client = SocketClient::with_defaults();
//! let mac = "ac bc de 01 02 03".parse()?;
//! if let Some(device) = client.find_by_mac(mac)? {
//!     println!("socket {} is now at {}", device.mac, device.ip);
//! }
//! # Ok::<(), silvercrest_sws::SwsError>(())
//! ```
//!
//! ## Timers
//!
//! Each socket has ten numbered weekly timer slots and one countdown
//! slot. Numbered slots fire at a local time of day on a weekly repeat
//! cycle; the countdown fires once after a duration:
//!
//! ```no_run
//! use chrono::NaiveTime;
//! use silvercrest_sws::timecodec::WEEKDAYS;
//! use silvercrest_sws::{
//!     SocketClient, SwitchState, TimerNumber, TimerProgram, TimerTime,
//! };
//!
//! # let client = SocketClient::with_defaults();
//! # let device = client.discover()?.remove(0);
//! // Off at 23:30, Monday through Friday.
//! client.set_timer(
//!     &device,
//!     TimerNumber::Slot(1),
//!     TimerProgram {
//!         active: true,
//!         repeat: WEEKDAYS,
//!         time: TimerTime::At(NaiveTime::from_hms_opt(23, 30, 0).unwrap()),
//!         action: SwitchState::Off,
//!     },
//! )?;
//!
//! // Off in 90 minutes.
//! client.set_countdown(&device, chrono::Duration::minutes(90), SwitchState::Off)?;
//! # Ok::<(), silvercrest_sws::SwsError>(())
//! ```
//!
//! The firmware keeps its clock in UTC; conversions to and from local
//! time happen in [`timecodec`] and can be overridden with
//! [`SocketClient::with_delta_seconds`] for devices set up differently.
//!
//! ## Pairing
//!
//! A factory-reset socket (LED flashing red) learns the Wi-Fi password
//! from a plaintext broadcast where the datagram *lengths* carry the
//! data:
//!
//! ```no_run
//! use silvercrest_sws::client::PAIRING_WINDOW;
//! use silvercrest_sws::SocketClient;
//!
//! # let client = SocketClient::with_defaults();
//! client.send_password("my-wifi-password", PAIRING_WINDOW)?;
//! # Ok::<(), silvercrest_sws::SwsError>(())
//! ```
//!
//! ## Error Handling
//!
//! All operations return [`Result<T, SwsError>`]. The library never
//! panics in public code.
//!
//! ```no_run
//! use silvercrest_sws::{SocketClient, SwsError, SwitchState};
//!
//! # let client = SocketClient::with_defaults();
//! # let device = client.discover()?.remove(0);
//! match client.switch(&device, SwitchState::On) {
//!     Ok(()) => println!("switched on"),
//!     Err(SwsError::Timeout) => println!("socket did not answer"),
//!     Err(SwsError::DeviceRejected) => println!("firmware refused the command"),
//!     Err(e) => println!("error: {e}"),
//! }
//! # Ok::<(), SwsError>(())
//! ```
//!
//! ## Configuration
//!
//! ```no_run
//! use silvercrest_sws::{DeviceProfile, SocketClient};
//! use silvercrest_sws::device::DIS_120;
//! use std::time::Duration;
//!
//! let profile = DeviceProfile::default()
//!     .with_device_code(DIS_120)                  // Aldi family code
//!     .with_timeout(Duration::from_secs(5))       // Reply window (default: 2s)
//!     .with_retry_budget(0);                      // No re-sends on timeout
//! let client = SocketClient::new(profile);
//! # let _ = client;
//! ```

#![warn(clippy::all)]
#![warn(missing_docs)]
#![warn(rust_2018_idioms)]

pub mod cipher;
pub mod client;
pub mod command;
pub mod device;
mod error;
pub mod frame;
pub mod response;
pub mod timecodec;
mod transport;

// Public re-exports
pub use client::SocketClient;
pub use device::{
    AbsenceWindow, DeviceIdentity, DeviceProfile, MacAddress, SlaveAddress, SwitchState,
    TimerNumber, TimerProgram, TimerSlot, TimerTime,
};
pub use error::{Result, SwsError};
pub use response::Reply;
pub use transport::{DEFAULT_RETRY_BUDGET, DEFAULT_TIMEOUT, DEFAULT_UDP_PORT};
