use std::io::ErrorKind;
use std::net::UdpSocket;
use std::time::Duration;

use anyhow::{anyhow, Result};
use log::{debug, warn};

use super::{CancelToken, Transport, TransportError};
use crate::device::Transductor;
use crate::protocol::SerialCodec;

pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);
pub const DEFAULT_PORT: u16 = 1001;
pub const DEFAULT_MAX_RECEIVE_ATTEMPTS: u32 = 3;

/// Largest datagram a transductor sends back.
const MAX_RESPONSE_LEN: usize = 256;

/// One UDP polling session. Owns at most one socket, created on first
/// use with the configured receive timeout and reused across calls.
/// Not safe for concurrent use; poll distinct devices from distinct
/// sessions.
pub struct UdpTransport {
    socket: Option<UdpSocket>,
    timeout: Duration,
    port: u16,
    receive_attempts: u32,
    max_receive_attempts: u32,
    cancel: CancelToken,
}

impl UdpTransport {
    pub fn new() -> Self {
        Self::with_config(DEFAULT_TIMEOUT, DEFAULT_PORT, DEFAULT_MAX_RECEIVE_ATTEMPTS)
    }

    pub fn with_config(timeout: Duration, port: u16, max_receive_attempts: u32) -> Self {
        Self {
            socket: None,
            timeout,
            port,
            receive_attempts: 0,
            max_receive_attempts,
            cancel: CancelToken::new(),
        }
    }

    /// Token the owner can trip to stop a poll at the next frame
    /// boundary.
    pub fn cancel_token(&self) -> CancelToken {
        self.cancel.clone()
    }

    fn ensure_socket(&mut self) -> Result<()> {
        if self.socket.is_none() {
            let socket = UdpSocket::bind(("0.0.0.0", 0))?;
            socket.set_read_timeout(Some(self.timeout))?;
            debug!("udp socket open, read timeout {:?}", self.timeout);
            self.socket = Some(socket);
        }
        Ok(())
    }

    /// One full send/receive pass over the whole request batch.
    ///
    /// `Ok(None)` means the pass failed and the batch should be retried
    /// from the first frame: a receive timeout aborts immediately, and
    /// any other socket error skips that frame's slot, which discards
    /// the pass at the end. A pass is accepted only when it collected
    /// exactly one payload per request, so a short or misaligned list
    /// never reaches the caller.
    fn run_pass(
        &self,
        transductor: &Transductor,
        requests: &[Vec<u8>],
    ) -> Result<Option<Vec<Vec<u8>>>> {
        let socket = self
            .socket
            .as_ref()
            .ok_or_else(|| anyhow!("socket not created"))?;

        let mut responses: Vec<Vec<u8>> = Vec::with_capacity(requests.len());

        for request in requests {
            if self.cancel.is_cancelled() {
                return Err(TransportError::Cancelled.into());
            }

            debug!("send {:02X?}", request);
            if let Err(e) = socket.send_to(request, (transductor.ip_address.as_str(), self.port))
            {
                warn!("send to {} failed, skipping frame: {}", transductor.ip_address, e);
                continue;
            }

            let mut buffer = [0u8; MAX_RESPONSE_LEN];
            match socket.recv_from(&mut buffer) {
                Ok((received, _)) => {
                    debug!("recv {:02X?}", &buffer[..received]);
                    responses.push(buffer[..received].to_vec());
                }
                Err(e) if matches!(e.kind(), ErrorKind::WouldBlock | ErrorKind::TimedOut) => {
                    debug!("receive timed out, abandoning pass");
                    return Ok(None);
                }
                Err(e) => {
                    warn!("receive from {} failed, skipping frame: {}", transductor.ip_address, e);
                }
            }
        }

        if !responses.is_empty() && responses.len() == requests.len() {
            Ok(Some(responses))
        } else {
            Ok(None)
        }
    }
}

impl Default for UdpTransport {
    fn default() -> Self {
        Self::new()
    }
}

impl Transport for UdpTransport {
    fn communicate(
        &mut self,
        transductor: &Transductor,
        codec: &dyn SerialCodec,
    ) -> Result<Vec<Vec<u8>>> {
        self.ensure_socket()?;

        // A malformed register map is a configuration error; it fails
        // the whole batch up front and is never retried.
        let requests = codec.build_requests(&transductor.registers)?;

        self.receive_attempts = 0;
        let mut responses: Vec<Vec<u8>> = Vec::new();

        while responses.is_empty() && self.receive_attempts < self.max_receive_attempts {
            match self.run_pass(transductor, &requests)? {
                Some(collected) => responses = collected,
                None => self.receive_attempts += 1,
            }
        }

        if self.receive_attempts == self.max_receive_attempts && !transductor.broken {
            return Err(TransportError::BrokenTransductor(transductor.ip_address.clone()).into());
        }

        Ok(responses)
    }
}
