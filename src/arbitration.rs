/*!
    bus access

    there is no master or token on the bus: a node waits for the line to stay idle for one bit period and starts talking. Contention between nodes starting together is resolved physically afterwards, the dominant '0' pulses of the lowest address covering the others.
*/

use crate::{
    port::Port,
    timing::BIT_PERIOD,
    };


/// whether the line stays idle for at least one full bit period
///
/// returns as soon as the line is driven, the caller shall measure again from scratch
pub fn bus_free<P: Port>(port: &mut P) -> bool {
    // idle time counts from the first released sample, not from the last driven one
    if port.level()
        {return false}
    port.reset_counter();
    while ! port.level() {
        if port.elapsed() >= BIT_PERIOD
            {return true}
    }
    false
}

/// spin until the bus is free, with no bound and no backoff
pub fn acquire<P: Port>(port: &mut P) {
    while ! bus_free(port) {}
}


#[cfg(test)]
mod tests {
    use super::*;
    use crate::sim::{SimBus, Script};

    #[test]
    fn idle_bus_is_free() {
        let mut bus = SimBus::new();
        assert!(bus_free(&mut bus));
        // it took a whole bit period to tell
        assert!(bus.ticks() >= u32::from(BIT_PERIOD));
    }

    #[test]
    fn driven_bus_is_busy() {
        let mut bus = SimBus::new();
        bus.send(Script::new().pulse(30, 40));
        assert!(! bus_free(&mut bus));
    }

    #[test]
    fn short_gaps_are_busy() {
        // idle gaps of 8 ticks between pulses never make the bus free
        let mut bus = SimBus::new();
        let mut script = Script::new();
        for _ in 0 .. 5 {
            script = script.pulse(2, 10);
        }
        bus.send(script);
        acquire(&mut bus);
        // last pulse ends at 42, then a full idle period is needed
        assert!(bus.ticks() >= 42 + u32::from(BIT_PERIOD));
        assert!(! bus.sending());
    }

    #[test]
    fn idle_measured_from_falling_edge() {
        let mut bus = SimBus::new();
        bus.send(Script::new().pulse(3, 3));
        assert!(! bus_free(&mut bus));
        acquire(&mut bus);
        assert!(bus.ticks() >= 3 + u32::from(BIT_PERIOD));
    }

    #[test]
    fn free_after_traffic() {
        let mut bus = SimBus::new();
        bus.send(Script::new().start().word(0xA5u8));
        acquire(&mut bus);
        assert!(bus.ticks() >= 47 + 80);
    }
}
