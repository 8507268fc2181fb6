/*!
    frame content as exchanged on the bus

    ```text
    start | mode | master(12) | p | slave(12) | p | ack | control(4) | p | ack | length(8) | p | ack | { data(8) | p | ack } x length
    ```

    parity bits and acknowledges are not stored, they are produced and checked while the frame is on the wire
*/

use core::fmt;
use bilge::prelude::*;

use crate::error::Error;


/// maximum payload of a frame this driver can hold
pub const MAX_DATA: usize = 32;

/// 12 bit node address
pub type Address = u12;
/// 4 bit control field
pub type Control = u4;
/// frame payload
pub type Payload = heapless::Vec<u8, MAX_DATA>;

/// transmission mode, first bit after the start bit
#[bitsize(1)]
#[derive(Copy, Clone, FromBits, Debug, PartialEq, Eq)]
pub enum Mode {
    /// every node may listen, fields are not acknowledged
    Broadcast = 0,
    /// point to point, the slave acknowledges every field after its address
    Normal = 1,
}

/// frame field, used to locate errors
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Field {
    MasterAddress,
    SlaveAddress,
    Control,
    Length,
    /// payload byte at the given index
    Data(u8),
}
impl fmt::Display for Field {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::MasterAddress => f.write_str("master address"),
            Self::SlaveAddress => f.write_str("slave address"),
            Self::Control => f.write_str("control"),
            Self::Length => f.write_str("length"),
            Self::Data(index) => write!(f, "data[{}]", index),
        }
    }
}

/// one bus message
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Frame {
    pub mode: Mode,
    /// sender
    pub master: Address,
    /// receiver, or the broadcast address
    pub slave: Address,
    pub control: Control,
    /// the length field is the size of this payload
    pub data: Payload,
}
impl Frame {
    /// build a frame, failing if the payload does not fit in [MAX_DATA]
    pub fn new(mode: Mode, master: Address, slave: Address, control: Control, data: &[u8]) -> Result<Self, Error> {
        let data = Payload::from_slice(data)
            .map_err(|_| Error::Oversize(data.len()))?;
        Ok(Self {mode, master, slave, control, data})
    }
    /// value of the length field
    pub fn length(&self) -> u8 {
        // payload capacity is below 256
        self.data.len() as u8
    }
}
/// serial console dump of a frame, mode as its wire bit, numbers in unpadded `0X` hexadecimal
impl fmt::Display for Frame {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "B:{} M:0X{:X} S:0X{:X} CB:0X{:X} L:{} DATA:",
            u1::from(self.mode).value(),
            self.master.value(),
            self.slave.value(),
            self.control.value(),
            self.length(),
            )?;
        for byte in &self.data {
            write!(f, " 0X{:X}", byte)?;
        }
        Ok(())
    }
}


#[cfg(test)]
mod tests {
    use super::*;
    use std::string::ToString;

    #[test]
    fn dump() {
        let frame = Frame::new(Mode::Normal, u12::new(0x140), u12::new(0x130), u4::new(0xE), &[0x1F, 0x02]).unwrap();
        assert_eq!(frame.to_string(), "B:1 M:0X140 S:0X130 CB:0XE L:2 DATA: 0X1F 0X2");
        let frame = Frame::new(Mode::Broadcast, u12::new(0x140), u12::new(0xFFF), u4::new(0xE), &[]).unwrap();
        assert_eq!(frame.to_string(), "B:0 M:0X140 S:0XFFF CB:0XE L:0 DATA:");
    }

    #[test]
    fn oversize() {
        let data = [0u8; MAX_DATA + 1];
        let frame = Frame::new(Mode::Normal, u12::new(1), u12::new(2), u4::new(0), &data);
        assert_eq!(frame, Err(Error::Oversize(MAX_DATA + 1)));
        let frame = Frame::new(Mode::Normal, u12::new(1), u12::new(2), u4::new(0), &data[.. MAX_DATA]).unwrap();
        assert_eq!(frame.length(), 32);
    }

    #[test]
    fn mode_bit() {
        // broadcast really is the zero bit
        assert_eq!(u1::from(Mode::Broadcast).value(), 0);
        assert_eq!(u1::from(Mode::Normal).value(), 1);
        assert_eq!(Mode::from(u1::new(1)), Mode::Normal);
    }

    #[test]
    fn field_names() {
        assert_eq!(Field::Data(3).to_string(), "data[3]");
        assert_eq!(Field::SlaveAddress.to_string(), "slave address");
    }
}
