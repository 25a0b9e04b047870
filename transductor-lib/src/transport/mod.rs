mod udp;

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use anyhow::Result;
use thiserror::Error;

use crate::device::Transductor;
use crate::protocol::SerialCodec;

pub use udp::{UdpTransport, DEFAULT_MAX_RECEIVE_ATTEMPTS, DEFAULT_PORT, DEFAULT_TIMEOUT};

#[derive(Error, Debug)]
pub enum TransportError {
    #[error("transductor {0} is broken")]
    BrokenTransductor(String),
    #[error("poll cancelled")]
    Cancelled,
}

/// Cooperative cancellation flag shared with whoever owns the poll
/// loop. The transport checks it between frames and between retry
/// passes, so a slow device cannot block past the next frame boundary.
#[derive(Clone, Debug, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::Relaxed);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::Relaxed)
    }
}

/// Datagram transport driving one poll at a time. One variant today
/// (UDP); the seam mirrors the codec's so future transports slot in
/// without touching the retry state machine.
pub trait Transport: Send {
    /// Poll every register of the transductor once. On success the
    /// returned payloads match the request frames one to one, in
    /// register-map order.
    fn communicate(
        &mut self,
        transductor: &Transductor,
        codec: &dyn SerialCodec,
    ) -> Result<Vec<Vec<u8>>>;
}
