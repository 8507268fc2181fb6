/*!
    bit-banged driver for IEBus, also known as AVC-LAN, the control bus between Subaru and Toyota head units and their peripherals

    the bus is a single differential line where bits are told apart by the length of their driven pulse. This crate times those pulses against a hardware counter to send and receive whole frames, takes part in acknowledges and bus arbitration, and answers the head unit's liveness probe as a display unit would.

    - [Node] is the entry point, sending and receiving frames over a [Port]
    - [gpio::GpioPort] implements [Port] over `embedded-hal` pins
    - [sim::SimBus] (feature `sim`) simulates the bus line for host side tests
*/

#![no_std]
#[cfg(any(test, feature = "std"))]
extern crate std;

pub mod timing;
pub mod port;
pub mod frame;
pub mod error;
pub mod codec;
pub mod arbitration;
pub mod acknowledge;
pub mod diagnostics;
pub mod config;
pub mod responder;
pub mod node;
pub mod gpio;
#[cfg(any(test, feature = "sim"))]
pub mod sim;

pub use port::Port;
pub use frame::{Frame, Field, Mode, Address, Control};
pub use error::Error;
pub use config::Config;
pub use diagnostics::{Diagnostics, Direction, LogDiagnostics};
pub use responder::Template;
pub use node::{Node, Reception, Connection};
