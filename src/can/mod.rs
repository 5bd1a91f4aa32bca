//! CAN bus logging types.
//!
//! [`CanMessage`] is what a bus logger stores per frame and what
//! [`crate::CanBusObserver`] rebuilds when reading. With the `can` feature it
//! converts from and to any [`embedded-can`](https://crates.io/crates/embedded-can)
//! frame, so frames from hardware drivers can be logged directly.

mod fd;
mod message;

pub use fd::{MAX_CLASSIC_DATA_LEN, MAX_FD_DATA_LEN, dlc_to_len, len_to_dlc};
pub use message::{CAN_EXTENDED_FLAG, CAN_ID_MASK, CanErrorType, CanMessage};
