/*!
    acknowledge slot following the slave address, the control, the length and each data byte

    the sender drives a '1' and listens, the addressed receiver takes over the line before the sender releases it and holds it until the pulse has the length of a '0'. So on the wire a '0' means acknowledged, a '1' means nobody took it. Broadcast frames are never acknowledged.
*/

use crate::{
    port::{self, Port},
    timing::*,
    frame::Mode,
    codec,
    };


/// sender side: emit the acknowledge slot and tell whether the receiver stretched it
///
/// in broadcast the slot is emitted as a '0' without listening, and is always considered acknowledged
pub fn await_ack<P: Port>(port: &mut P, mode: Mode) -> bool {
    if mode == Mode::Broadcast {
        codec::send_bit(port, false);
        return true;
    }
    port.reset_counter();
    port.set_level(true);
    port::hold(port, BIT_1_HOLD);
    port.set_level(false);
    // measure how long the receiver keeps it driven
    port::wait_falling(port);
    let acknowledged = is_acknowledged(port.elapsed());
    // keep the bit period whatever happened
    port::hold(port, BIT_PERIOD);
    acknowledged
}

/// receiver side: stretch the sender's acknowledge pulse into a '0'
pub fn send_ack<P: Port>(port: &mut P) {
    port::wait_rising(port);
    port.reset_counter();
    port::hold(port, ACK_LEAD);
    port.set_level(true);
    port::hold(port, BIT_0_HOLD);
    port.set_level(false);
}

/// bystander side: let the acknowledge slot pass without touching the line
pub fn skip_ack<P: Port>(port: &mut P) {
    codec::read_bit(port);
}


#[cfg(test)]
mod tests {
    use super::*;
    use crate::sim::{SimBus, Script};

    #[test]
    fn acknowledged_when_stretched() {
        let mut bus = SimBus::new().acknowledging();
        // let the simulated receiver see a frame start, then reach the slave address acknowledge slot
        codec::send_start(&mut bus);
        for _ in 0 .. 27 {
            codec::send_bit(&mut bus, true);
        }
        assert!(await_ack(&mut bus, Mode::Normal));
    }

    #[test]
    fn not_acknowledged_on_silent_bus() {
        let mut bus = SimBus::new();
        assert!(! await_ack(&mut bus, Mode::Normal));
        // the slot still lasted a full bit
        assert_eq!(bus.pulses(), [BIT_1_HOLD]);
        assert!(bus.ticks() >= u32::from(BIT_PERIOD));
    }

    #[test]
    fn broadcast_always_acknowledged() {
        // nobody stretches
        let mut bus = SimBus::new();
        assert!(await_ack(&mut bus, Mode::Broadcast));
        // even with a line held by someone else
        let mut bus = SimBus::new();
        bus.send(Script::new().pulse(200, 300));
        assert!(await_ack(&mut bus, Mode::Broadcast));
    }

    #[test]
    fn stretch_as_receiver() {
        let mut bus = SimBus::new();
        bus.send(Script::new().ack());
        send_ack(&mut bus);
        // the sender saw its '1' turned into a '0'
        assert_eq!(bus.acks(), [true]);
        assert_eq!(bus.pulses().len(), 1);
        assert!(bus.pulses()[0] >= BIT_0_HOLD - ACK_LEAD - 1);
    }

    #[test]
    fn skip_as_bystander() {
        let mut bus = SimBus::new();
        bus.send(Script::new().ack());
        skip_ack(&mut bus);
        while bus.sending() {
            bus.level();
        }
        assert_eq!(bus.acks(), [false]);
        assert!(bus.pulses().is_empty());
    }
}
