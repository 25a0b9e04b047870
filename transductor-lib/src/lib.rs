//! Polling core for remote electrical measurement devices
//! ("transductors"): Modbus RTU request framing tunnelled inside UDP
//! datagrams, CRC16 frame integrity, typed decoding of the returned
//! registers, and a bounded-retry transport that reports devices as
//! broken once the retries are exhausted.
//!
//! Persistence of devices and readings, scheduling of polls and the
//! administrative surfaces all live with the caller; the library only
//! needs a [`device::Transductor`] handle per device.

pub mod device;
pub mod protocol;
pub mod sim;
pub mod transport;
