/*!
    bit level encoding: every value is a sequence of pulses, most significant bit first

    the bit rate is constant, only the duty cycle carries the value (see [crate::timing]).
    Multi-bit words also produce their parity, which the frame layer sends right after as a single bit.
*/

use bilge::prelude::*;

use crate::{
    port::{self, Port},
    timing::*,
    frame::Mode,
    };


/// fixed width value that can be put on the bus
pub trait Word: Copy {
    /// number of bits on the wire
    const BITS: u8;
    /// value right aligned in a u16
    fn to_bits(self) -> u16;
    /// value from right aligned bits, extra bits are ignored
    fn from_bits(bits: u16) -> Self;
}

impl Word for bool {
    const BITS: u8 = 1;
    fn to_bits(self) -> u16 {u16::from(self)}
    fn from_bits(bits: u16) -> Self {bits & 1 != 0}
}
impl Word for Mode {
    const BITS: u8 = 1;
    fn to_bits(self) -> u16 {u16::from(u1::from(self).value())}
    fn from_bits(bits: u16) -> Self {Mode::from(u1::new((bits & 1) as u8))}
}
impl Word for u4 {
    const BITS: u8 = 4;
    fn to_bits(self) -> u16 {u16::from(self.value())}
    fn from_bits(bits: u16) -> Self {u4::new((bits & 0xf) as u8)}
}
impl Word for u8 {
    const BITS: u8 = 8;
    fn to_bits(self) -> u16 {u16::from(self)}
    fn from_bits(bits: u16) -> Self {(bits & 0xff) as u8}
}
impl Word for u12 {
    const BITS: u8 = 12;
    fn to_bits(self) -> u16 {self.value()}
    fn from_bits(bits: u16) -> Self {u12::new(bits & 0xfff)}
}

/// parity of a word: xor of all its value bits
pub fn parity<W: Word>(value: W) -> bool {
    let bits = value.to_bits() & (u16::MAX >> (16 - W::BITS));
    bits.count_ones() % 2 == 1
}


/// drive one bit, holding the bus for exactly one bit period
pub fn send_bit<P: Port>(port: &mut P, bit: bool) {
    port.reset_counter();
    port.set_level(true);
    port::hold(port, hold(bit));
    port.set_level(false);
    port::hold(port, BIT_PERIOD);
}

/// drive a word most significant bit first, returning its parity
pub fn send_word<P: Port, W: Word>(port: &mut P, value: W) -> bool {
    let bits = value.to_bits();
    let mut parity = false;
    for shift in (0 .. W::BITS).rev() {
        let bit = (bits >> shift) & 1 != 0;
        parity ^= bit;
        send_bit(port, bit);
    }
    parity
}

/// drive a start bit, marking the beginning of a frame
pub fn send_start<P: Port>(port: &mut P) {
    port.reset_counter();
    port.set_level(true);
    port::hold(port, START_HOLD);
    port.set_level(false);
    port::hold(port, START_PERIOD);
}

/// measure the next bit on the bus
pub fn read_bit<P: Port>(port: &mut P) -> bool {
    port::wait_rising(port);
    port.reset_counter();
    port::wait_falling(port);
    let bit = classify_bit(port.elapsed());
    // a dominant writer may still be stretching the pulse, resync on its nominal end
    if ! bit {
        port::hold(port, BIT_0_HOLD);
    }
    bit
}

/// measure a word on the bus, returning it with the parity of the received bits
pub fn read_word<P: Port, W: Word>(port: &mut P) -> (W, bool) {
    let mut bits = 0u16;
    let mut parity = false;
    for _ in 0 .. W::BITS {
        let bit = read_bit(port);
        parity ^= bit;
        bits = (bits << 1) | u16::from(bit);
    }
    (W::from_bits(bits), parity)
}

/// wait for the next pulse and tell whether it is a start bit
///
/// anything else is noise or a collision, and the caller should give up on this frame
pub fn read_start<P: Port>(port: &mut P) -> bool {
    port::wait_rising(port);
    port.reset_counter();
    port::wait_falling(port);
    is_start(port.elapsed())
}


#[cfg(test)]
mod tests {
    use super::*;
    use crate::sim::{SimBus, Script};

    #[test]
    fn parity_is_xor_of_bits() {
        assert!(! parity(0u8));
        assert!(parity(1u8));
        assert!(! parity(0x03u8));
        assert!(parity(0x07u8));
        assert!(! parity(u12::new(0x140)));
        assert!(parity(u12::new(0x130)));
        assert!(parity(u4::new(0xE)));
        assert!(parity(true));
        assert!(! parity(Mode::Broadcast));
        // independent of width
        assert_eq!(parity(0x1Fu8), parity(u12::new(0x01F)));
    }

    #[test]
    fn send_bit_pulses() {
        let mut bus = SimBus::new();
        send_bit(&mut bus, true);
        send_bit(&mut bus, false);
        assert_eq!(bus.pulses(), [5, 9]);
        // constant bit rate
        let edges = bus.rising_edges();
        assert_eq!(edges[1] - edges[0], u32::from(BIT_PERIOD));
    }

    #[test]
    fn send_start_pulse() {
        let mut bus = SimBus::new();
        send_start(&mut bus);
        send_bit(&mut bus, true);
        assert_eq!(bus.pulses(), [42, 5]);
        let edges = bus.rising_edges();
        assert_eq!(edges[1] - edges[0], u32::from(START_PERIOD));
    }

    #[test]
    fn send_word_msb_first() {
        let mut bus = SimBus::new();
        let parity = send_word(&mut bus, u4::new(0b1000));
        assert!(parity);
        assert_eq!(bus.pulses(), [5, 9, 9, 9]);
    }

    #[test]
    fn round_trip() {
        // every width, encoded by the scripted peer and decoded by the engine
        let mut bus = SimBus::new();
        bus.send(Script::new()
            .word(true)
            .word(u4::new(0xA))
            .word(0x5Cu8)
            .word(u12::new(0x9F3))
            .word(Mode::Normal)
            );
        assert_eq!(read_word::<_, bool>(&mut bus), (true, true));
        assert_eq!(read_word::<_, u4>(&mut bus), (u4::new(0xA), false));
        assert_eq!(read_word::<_, u8>(&mut bus), (0x5C, parity(0x5Cu8)));
        assert_eq!(read_word::<_, u12>(&mut bus), (u12::new(0x9F3), parity(u12::new(0x9F3))));
        assert_eq!(read_word::<_, Mode>(&mut bus).0, Mode::Normal);
    }

    #[test]
    fn engine_round_trip() {
        // what the engine sends, the engine reads back
        let mut bus = SimBus::new();
        for value in [0u16, 1, 0x140, 0x130, 0xFFF, 0x800, 0x555] {
            bus.clear();
            let sent = send_word(&mut bus, u12::new(value));
            bus.replay();
            let (received, parity) = read_word::<_, u12>(&mut bus);
            assert_eq!(received.value(), value);
            assert_eq!(parity, sent);
        }
    }

    #[test]
    fn start_classification() {
        let mut bus = SimBus::new();
        bus.send(Script::new().start());
        assert!(read_start(&mut bus));

        // a normal bit is not a start
        let mut bus = SimBus::new();
        bus.send(Script::new().word(false));
        assert!(! read_start(&mut bus));

        // too long, typically two colliding frames
        let mut bus = SimBus::new();
        bus.send(Script::new().pulse(60, 80));
        assert!(! read_start(&mut bus));
    }

    #[test]
    fn watchdog_kicked_while_idle() {
        let mut bus = SimBus::new();
        bus.send(Script::new().idle(200).word(true));
        assert!(read_bit(&mut bus));
        assert!(bus.kicks() > 100);
    }
}
