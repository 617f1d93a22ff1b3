//! UDP transport with timeout-driven retries.
//!
//! The devices speak plain datagrams on port 8530 with no delivery
//! guarantee, so every request/reply exchange is governed by a read
//! timeout and a retry budget: the frame is re-sent only when a reply
//! window elapses with nothing received. A lost datagram is the *only*
//! condition that triggers a resend; malformed replies are surfaced to
//! the caller immediately because re-sending would not fix them.
//!
//! Each operation opens a short-lived socket of its own; no session
//! state is kept between calls. The socket sources its datagrams from
//! the profile's fixed source port (the command port itself by default,
//! which is how the vendor app behaves and the only pattern verified
//! against hardware).

use std::io;
use std::net::{Ipv4Addr, SocketAddr, UdpSocket};
use std::time::{Duration, Instant};

use crate::device::DeviceProfile;
use crate::error::{Result, SwsError};

/// UDP port the sockets listen on.
pub const DEFAULT_UDP_PORT: u16 = 8530;

/// Default reply window for a single send attempt.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(2);

/// Default number of re-sends after the first attempt times out.
pub const DEFAULT_RETRY_BUDGET: u32 = 2;

/// Largest datagram any known firmware sends back.
const RECV_BUFFER_SIZE: usize = 1024;

fn is_timeout(error: &io::Error) -> bool {
    matches!(
        error.kind(),
        io::ErrorKind::WouldBlock | io::ErrorKind::TimedOut
    )
}

/// A per-call UDP endpoint bound for one exchange with one destination.
#[derive(Debug)]
pub(crate) struct UdpTransport {
    socket: UdpSocket,
    destination: SocketAddr,
    timeout: Duration,
    retry_budget: u32,
}

impl UdpTransport {
    /// Binds a per-call socket for a unicast exchange with `destination`.
    pub(crate) fn unicast(profile: &DeviceProfile, destination: SocketAddr) -> Result<Self> {
        let socket = UdpSocket::bind((profile.bind_addr, profile.source_port))?;
        socket.set_read_timeout(Some(profile.timeout))?;
        Ok(Self {
            socket,
            destination,
            timeout: profile.timeout,
            retry_budget: profile.retry_budget,
        })
    }

    /// Binds a per-call socket for a subnet broadcast on the profile's
    /// port.
    pub(crate) fn broadcast(profile: &DeviceProfile) -> Result<Self> {
        Self::broadcast_to(profile, profile.port)
    }

    /// Binds a per-call socket for a subnet broadcast on an arbitrary
    /// port (the pairing listener does not use the command port).
    pub(crate) fn broadcast_to(profile: &DeviceProfile, port: u16) -> Result<Self> {
        let socket = UdpSocket::bind((profile.bind_addr, profile.source_port))?;
        socket.set_broadcast(true)?;
        socket.set_read_timeout(Some(profile.timeout))?;
        Ok(Self {
            socket,
            destination: SocketAddr::from((Ipv4Addr::BROADCAST, port)),
            timeout: profile.timeout,
            retry_budget: profile.retry_budget,
        })
    }

    /// Sends `frame` and waits for a single reply, re-sending on each
    /// timeout until the retry budget is spent.
    ///
    /// # Errors
    ///
    /// `Timeout` when every attempt elapses without a reply; `Io` for any
    /// other socket failure.
    pub(crate) fn send_receive(&self, frame: &[u8]) -> Result<(Vec<u8>, SocketAddr)> {
        let attempts = self.retry_budget + 1;
        let mut buffer = [0u8; RECV_BUFFER_SIZE];

        for attempt in 1..=attempts {
            tracing::debug!(
                destination = %self.destination,
                attempt,
                len = frame.len(),
                "sending frame"
            );
            self.socket.send_to(frame, self.destination)?;

            match self.socket.recv_from(&mut buffer) {
                Ok((received, source)) => {
                    tracing::debug!(%source, len = received, "reply received");
                    return Ok((buffer[..received].to_vec(), source));
                }
                Err(e) if is_timeout(&e) => {
                    if attempt < attempts {
                        tracing::warn!(
                            destination = %self.destination,
                            attempt,
                            "no reply within {:?}, re-sending",
                            self.timeout
                        );
                    }
                }
                Err(e) => return Err(SwsError::Io(e)),
            }
        }

        Err(SwsError::Timeout)
    }

    /// Sends `frame` once and collects every reply that arrives within
    /// one reply window.
    ///
    /// Used by discovery, where any number of devices (including none)
    /// may answer; an empty collection is a normal outcome, so timeouts
    /// end the window instead of being retried.
    pub(crate) fn send_collect(&self, frame: &[u8]) -> Result<Vec<(Vec<u8>, SocketAddr)>> {
        self.socket.send_to(frame, self.destination)?;

        let deadline = Instant::now() + self.timeout;
        let mut buffer = [0u8; RECV_BUFFER_SIZE];
        let mut replies = Vec::new();

        loop {
            let remaining = deadline.saturating_duration_since(Instant::now());
            if remaining.is_zero() {
                break;
            }
            self.socket.set_read_timeout(Some(remaining))?;

            match self.socket.recv_from(&mut buffer) {
                Ok((received, source)) => {
                    tracing::debug!(%source, len = received, "collected reply");
                    replies.push((buffer[..received].to_vec(), source));
                }
                Err(e) if is_timeout(&e) => break,
                Err(e) => return Err(SwsError::Io(e)),
            }
        }

        Ok(replies)
    }

    /// Sends `frame` without waiting for any reply.
    pub(crate) fn send_and_forget(&self, frame: &[u8]) -> Result<()> {
        self.socket.send_to(frame, self.destination)?;
        Ok(())
    }
}
