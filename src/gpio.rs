/*!
    [Port] over `embedded-hal` digital pins

    the bus transceiver is wired to one input pin reporting the line state and one output pin driving it, both active high. Timing comes from a free running hardware timer, seen through [Counter], that must tick at 2 ticks per microsecond.
*/

use core::convert::Infallible;
use embedded_hal::digital::{self, InputPin, OutputPin};

use crate::port::Port;


/// free running timer the bus timing is measured with
pub trait Counter {
    /// restart counting from zero
    fn reset(&mut self);
    /// ticks since the last reset, at 2 ticks/us, saturating
    fn ticks(&mut self) -> u16;
    /// milliseconds since startup
    fn millis(&mut self) -> u32;
    /// reset the hardware watchdog, if any
    fn kick_watchdog(&mut self) {}
}

/// placeholder for a missing activity led
#[derive(Copy, Clone, Debug, Default)]
pub struct NoLed;
impl digital::ErrorType for NoLed {
    type Error = Infallible;
}
impl OutputPin for NoLed {
    fn set_low(&mut self) -> Result<(), Self::Error> {Ok(())}
    fn set_high(&mut self) -> Result<(), Self::Error> {Ok(())}
}

/**
    bus port on gpio pins

    pin errors cannot be recovered in the middle of a bit: a failed input read counts as an idle line and failed writes are ignored
*/
pub struct GpioPort<I, O, C, L = NoLed> {
    input: I,
    output: O,
    counter: C,
    led: L,
}

impl<I: InputPin, O: OutputPin, C: Counter> GpioPort<I, O, C> {
    /// port with the output released
    pub fn new(input: I, mut output: O, counter: C) -> Self {
        let _ = output.set_low();
        Self {input, output, counter, led: NoLed}
    }
}
impl<I: InputPin, O: OutputPin, C: Counter, L: OutputPin> GpioPort<I, O, C, L> {
    /// same port, lighting `led` during every frame
    pub fn with_led<N: OutputPin>(self, mut led: N) -> GpioPort<I, O, C, N> {
        let _ = led.set_low();
        GpioPort {
            input: self.input,
            output: self.output,
            counter: self.counter,
            led,
        }
    }
    /// give the pins and counter back
    pub fn release(self) -> (I, O, C, L) {
        (self.input, self.output, self.counter, self.led)
    }
}

impl<I: InputPin, O: OutputPin, C: Counter, L: OutputPin> Port for GpioPort<I, O, C, L> {
    fn level(&mut self) -> bool {
        self.input.is_high().unwrap_or(false)
    }
    fn set_level(&mut self, driven: bool) {
        let _ = if driven {self.output.set_high()} else {self.output.set_low()};
    }
    fn reset_counter(&mut self) {
        self.counter.reset();
    }
    fn elapsed(&mut self) -> u16 {
        self.counter.ticks()
    }
    fn uptime_ms(&mut self) -> u32 {
        self.counter.millis()
    }
    fn kick_watchdog(&mut self) {
        self.counter.kick_watchdog();
    }
    fn activity(&mut self, active: bool) {
        let _ = if active {self.led.set_high()} else {self.led.set_low()};
    }
}


#[cfg(test)]
mod tests {
    use super::*;
    use embedded_hal_mock::eh1::digital::{Mock as PinMock, State as PinState, Transaction as PinTransaction};

    /// counter advancing one tick per read
    #[derive(Default)]
    struct Stepping {
        ticks: u16,
        kicks: usize,
    }
    impl Counter for Stepping {
        fn reset(&mut self) {self.ticks = 0}
        fn ticks(&mut self) -> u16 {
            self.ticks += 1;
            self.ticks
        }
        fn millis(&mut self) -> u32 {42}
        fn kick_watchdog(&mut self) {self.kicks += 1}
    }

    #[test]
    fn drive_and_sample() {
        let input = PinMock::new(&[
            PinTransaction::get(PinState::Low),
            PinTransaction::get(PinState::High),
            ]);
        let output = PinMock::new(&[
            PinTransaction::set(PinState::Low),
            PinTransaction::set(PinState::High),
            PinTransaction::set(PinState::Low),
            ]);
        let mut port = GpioPort::new(input, output, Stepping::default());
        assert!(! port.level());
        assert!(port.level());
        port.set_level(true);
        port.set_level(false);
        assert_eq!(port.uptime_ms(), 42);

        let (mut input, mut output, _, _) = port.release();
        input.done();
        output.done();
    }

    #[test]
    fn counter_passthrough() {
        let mut port = GpioPort::new(PinMock::new(&[]), PinMock::new(&[PinTransaction::set(PinState::Low)]), Stepping::default());
        port.reset_counter();
        crate::port::hold(&mut port, 5);
        assert_eq!(port.elapsed(), 6);
        port.reset_counter();
        assert_eq!(port.elapsed(), 1);
        port.kick_watchdog();

        let (mut input, mut output, counter, _) = port.release();
        assert_eq!(counter.kicks, 1);
        input.done();
        output.done();
    }

    #[test]
    fn activity_led() {
        let output = PinMock::new(&[PinTransaction::set(PinState::Low)]);
        let led = PinMock::new(&[
            PinTransaction::set(PinState::Low),
            PinTransaction::set(PinState::High),
            PinTransaction::set(PinState::Low),
            ]);
        let mut port = GpioPort::new(PinMock::new(&[]), output, Stepping::default())
            .with_led(led);
        port.activity(true);
        port.activity(false);

        let (mut input, mut output, _, mut led) = port.release();
        input.done();
        output.done();
        led.done();
    }
}
