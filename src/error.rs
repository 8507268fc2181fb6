use thiserror::Error;

use crate::frame::Field;


/// reasons a frame pass was aborted
///
/// each error only concerns the frame in progress, the bus is released and the next pass starts clean
#[derive(Error, Copy, Clone, Debug, PartialEq, Eq)]
pub enum Error {
    /// received parity bit does not match the field
    #[error("parity error @ {0}")]
    Parity(Field),
    /// the slave did not stretch the acknowledge bit after this field
    #[error("no acknowledge @ {0}")]
    NoAcknowledge(Field),
    /// first pulse of a frame did not have the length of a start bit
    #[error("malformed start bit")]
    MalformedStart,
    /// someone else is talking, only reported by non blocking sends
    #[error("bus busy")]
    BusBusy,
    /// payload of the given size does not fit in a frame
    #[error("payload of {0} bytes exceeds frame capacity")]
    Oversize(usize),
}
