/*!
    hardware capabilities the protocol engine runs on

    the engine never touches registers itself, everything goes through a [Port]: a bus output that can be driven or released, the bus input, and a free running counter that the engine resets at the start of each measurement. See [crate::gpio] for an implementation over `embedded-hal` pins.
*/

/// bus access and timing used by the bit engine
pub trait Port {
    /// sample the bus input, `true` when the line is driven
    fn level(&mut self) -> bool;
    /// drive (`true`) or release (`false`) the bus output
    fn set_level(&mut self, driven: bool);
    /// restart the tick counter from zero
    fn reset_counter(&mut self);
    /// ticks elapsed since the last [Port::reset_counter], at 2 ticks/us
    fn elapsed(&mut self) -> u16;
    /// milliseconds since startup, only used to timestamp registration
    fn uptime_ms(&mut self) -> u32;
    /// called repeatedly while waiting for bus activity, which can last forever on a silent bus
    fn kick_watchdog(&mut self) {}
    /// a frame pass starts (`true`) or ends (`false`), typically to drive a led
    fn activity(&mut self, _active: bool) {}
}


/// spin until the counter reaches `ticks`
pub(crate) fn hold<P: Port>(port: &mut P, ticks: u16) {
    while port.elapsed() < ticks {}
}

/// spin until the line is driven, kicking the watchdog meanwhile
pub(crate) fn wait_rising<P: Port>(port: &mut P) {
    while ! port.level() {
        port.kick_watchdog();
    }
}

/// spin until the line is released
pub(crate) fn wait_falling<P: Port>(port: &mut P) {
    while port.level() {}
}
