//! Start/stop bracketing shared by the bus protocol layers.

use crate::error::Result;

/// A bus whose transfers are framed by start and stop conditions.
///
/// Implemented by the engine and by both device types. [`transaction`]
/// brackets a closure with `start()` and `stop()`; `stop()` runs exactly once
/// on every exit path, including when `start()` or the body fails. Explicit
/// `start()`/`stop()` calls inside the body are allowed and come in addition
/// to the bracketing.
///
/// [`transaction`]: SerialProtocol::transaction
pub trait SerialProtocol {
    /// Begin a transfer.
    fn start(&mut self) -> Result<()>;

    /// End a transfer.
    fn stop(&mut self) -> Result<()>;

    /// Run `body` between `start()` and `stop()`.
    ///
    /// When both the body and `stop()` fail, the body's error is returned.
    fn transaction<R, F>(&mut self, body: F) -> Result<R>
    where
        Self: Sized,
        F: FnOnce(&mut Self) -> Result<R>,
    {
        let result = self.start().and_then(|()| body(self));
        let stopped = self.stop();
        match result {
            Ok(value) => stopped.map(|()| value),
            Err(err) => {
                if let Err(stop_err) = stopped {
                    log::debug!("stop after failed transaction also failed: {stop_err}");
                }
                Err(err)
            }
        }
    }
}

/// Data accepted by the write operations: a single value or a byte sequence.
///
/// Integer values are truncated to their low 8 bits; byte sequences are sent
/// unmodified.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Payload<'a> {
    /// One byte.
    Byte(u8),
    /// A sequence of bytes, in order.
    Bytes(&'a [u8]),
}

impl Payload<'_> {
    /// Append the payload bytes to `buf`.
    pub fn extend_into(&self, buf: &mut Vec<u8>) {
        match *self {
            Self::Byte(b) => buf.push(b),
            Self::Bytes(bytes) => buf.extend_from_slice(bytes),
        }
    }

    /// The payload as an owned byte vector.
    pub fn to_vec(&self) -> Vec<u8> {
        let mut buf = Vec::new();
        self.extend_into(&mut buf);
        buf
    }
}

impl From<u8> for Payload<'_> {
    fn from(value: u8) -> Self {
        Self::Byte(value)
    }
}

impl From<u16> for Payload<'_> {
    fn from(value: u16) -> Self {
        Self::Byte((value & 0xFF) as u8)
    }
}

impl From<u32> for Payload<'_> {
    fn from(value: u32) -> Self {
        Self::Byte((value & 0xFF) as u8)
    }
}

impl From<i32> for Payload<'_> {
    fn from(value: i32) -> Self {
        Self::Byte((value & 0xFF) as u8)
    }
}

impl<'a> From<&'a [u8]> for Payload<'a> {
    fn from(bytes: &'a [u8]) -> Self {
        Self::Bytes(bytes)
    }
}

impl<'a, const N: usize> From<&'a [u8; N]> for Payload<'a> {
    fn from(bytes: &'a [u8; N]) -> Self {
        Self::Bytes(bytes)
    }
}

impl<'a> From<&'a Vec<u8>> for Payload<'a> {
    fn from(bytes: &'a Vec<u8>) -> Self {
        Self::Bytes(bytes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;

    #[derive(Default)]
    struct Bus {
        events: Vec<&'static str>,
        fail_start: bool,
        fail_stop: bool,
    }

    impl SerialProtocol for Bus {
        fn start(&mut self) -> Result<()> {
            self.events.push("start");
            if self.fail_start {
                return Err(Error::InvalidArgument("start"));
            }
            Ok(())
        }

        fn stop(&mut self) -> Result<()> {
            self.events.push("stop");
            if self.fail_stop {
                return Err(Error::InvalidArgument("stop"));
            }
            Ok(())
        }
    }

    #[test]
    fn brackets_body() {
        let mut bus = Bus::default();
        let value = bus
            .transaction(|b| {
                b.events.push("body");
                Ok(7)
            })
            .unwrap();
        assert_eq!(value, 7);
        assert_eq!(bus.events, ["start", "body", "stop"]);
    }

    #[test]
    fn stops_when_body_fails() {
        let mut bus = Bus::default();
        let err = bus
            .transaction(|_| -> Result<()> { Err(Error::NoAckReceived) })
            .unwrap_err();
        assert!(matches!(err, Error::NoAckReceived));
        assert_eq!(bus.events, ["start", "stop"]);
    }

    #[test]
    fn stops_when_start_fails_and_skips_body() {
        let mut bus = Bus {
            fail_start: true,
            ..Default::default()
        };
        let err = bus
            .transaction(|b| {
                b.events.push("body");
                Ok(())
            })
            .unwrap_err();
        assert!(matches!(err, Error::InvalidArgument("start")));
        assert_eq!(bus.events, ["start", "stop"]);
    }

    #[test]
    fn body_error_wins_over_stop_error() {
        let mut bus = Bus {
            fail_stop: true,
            ..Default::default()
        };
        let err = bus
            .transaction(|_| -> Result<()> { Err(Error::NoAckReceived) })
            .unwrap_err();
        assert!(matches!(err, Error::NoAckReceived));
    }

    #[test]
    fn stop_error_reported_after_successful_body() {
        let mut bus = Bus {
            fail_stop: true,
            ..Default::default()
        };
        let err = bus.transaction(|_| Ok(())).unwrap_err();
        assert!(matches!(err, Error::InvalidArgument("stop")));
    }

    #[test]
    fn nested_start_stop_are_additional() {
        let mut bus = Bus::default();
        bus.transaction(|b| {
            b.stop()?;
            b.start()
        })
        .unwrap();
        assert_eq!(bus.events, ["start", "stop", "start", "stop"]);
    }

    #[test]
    fn payload_masks_integers() {
        assert_eq!(Payload::from(0x1234u16), Payload::Byte(0x34));
        assert_eq!(Payload::from(0x1FFi32), Payload::Byte(0xFF));
        assert_eq!(Payload::from(0xDEADBEEFu32).to_vec(), vec![0xEF]);
    }

    #[test]
    fn payload_keeps_sequences() {
        let data = [0xDE, 0xAD, 0xBE, 0xEF];
        assert_eq!(Payload::from(&data).to_vec(), data.to_vec());
    }
}
