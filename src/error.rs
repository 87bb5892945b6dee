//! Error types for the mpsse crate.

use crate::types::{ChipType, Mode};

/// The error type for MPSSE operations.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// An error from the nusb USB layer.
    #[error("USB error: {0}")]
    Usb(#[from] nusb::Error),

    /// A USB transfer error.
    #[error("USB transfer error: {0}")]
    Transfer(#[from] nusb::transfer::TransferError),

    /// No matching device was found.
    #[error("device not found")]
    DeviceNotFound,

    /// The USB device is unavailable (not opened or disconnected).
    #[error("USB device unavailable")]
    DeviceUnavailable,

    /// The device could not be opened or claimed.
    ///
    /// Raised when constructing an engine from a context whose open sequence
    /// failed. It is never retried.
    #[error("cannot open MPSSE device")]
    CannotOpen,

    /// A native operation returned something other than the OK status.
    #[error("{code}: {message}")]
    StatusCode {
        /// The status code returned by the transport.
        code: i32,
        /// The transport's error string, fetched when the failure happened.
        message: String,
    },

    /// A mode-gated operation was called while the context is in another mode.
    #[error("this method is for {required:?} only, current mode is {current:?}")]
    InvalidMode {
        /// The mode the context is configured for.
        current: Mode,
        /// The mode the operation requires.
        required: Mode,
    },

    /// The I2C slave did not acknowledge an address or register write.
    #[error("no ack from slave")]
    NoAckReceived,

    /// Invalid argument(s) were provided.
    #[error("invalid argument: {0}")]
    InvalidArgument(&'static str),

    /// The operation is not supported for this chip type.
    #[error("unsupported operation for chip type {0:?}")]
    UnsupportedChip(ChipType),

    /// A write operation completed with zero bytes transferred.
    #[error("write returned zero bytes")]
    WriteZero,
}

/// A specialized `Result` type for MPSSE operations.
pub type Result<T> = std::result::Result<T, Error>;
