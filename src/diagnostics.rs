use core::fmt;
use log::*;

use crate::frame::Frame;


/// whether a dumped frame was sent or received
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Direction {
    Incoming,
    Outgoing,
}
impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Incoming => "IN ",
            Self::Outgoing => "OUT",
        })
    }
}

/**
    sink for frame dumps

    called after every completed transmission and every received frame handed to the caller, never in the middle of a frame, so it is allowed to be slow
*/
pub trait Diagnostics {
    fn frame(&mut self, direction: Direction, frame: &Frame);
}

/// dumps frames through the `log` facade at info level
#[derive(Copy, Clone, Debug, Default)]
pub struct LogDiagnostics;

impl Diagnostics for LogDiagnostics {
    fn frame(&mut self, direction: Direction, frame: &Frame) {
        info!("{} {}", direction, frame);
    }
}

/// discards dumps
impl Diagnostics for () {
    fn frame(&mut self, _direction: Direction, _frame: &Frame) {}
}
