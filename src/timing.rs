/*!
    bus timing, in ticks of the port counter (2 ticks per microsecond)

    ```text
                      |<---- bit '0' ---->|<---- bit '1' ---->|
    driven            ,---------------,   ,---------,         ,------
                      ^               |   ^         |         ^
    idle         -----'               '---'         '---------'------
    ```

    every bit starts on a rising edge and lasts the same period, only the driven part varies.
    A '0' is dominant: its longer pulse covers a concurrent '1', which is how arbitration and acknowledges work.
*/

/// total length of a normal bit, also the idle time after which the bus is considered free
pub const BIT_PERIOD: u16 = 10;
/// driven duration of a '1'
pub const BIT_1_HOLD: u16 = 5;
/// driven duration of a '0'
pub const BIT_0_HOLD: u16 = 9;
/// decision point between a '1' and a '0'
pub const BIT_HALF_PERIOD: u16 = 7;

/// total length of a start bit
pub const START_PERIOD: u16 = 47;
/// driven duration of a start bit
pub const START_HOLD: u16 = 42;
/// tolerance below [START_HOLD] still accepted as a start bit
pub const START_MARGIN: u16 = 2;

/// delay between the sender's rising edge and the receiver taking over the line for an acknowledge
pub const ACK_LEAD: u16 = 1;


/// driven duration used to send the given bit value
pub const fn hold(bit: bool) -> u16 {
    if bit {BIT_1_HOLD} else {BIT_0_HOLD}
}

/// value of a bit from its measured driven duration
pub const fn classify_bit(high: u16) -> bool {
    high <= BIT_HALF_PERIOD
}

/// whether a measured driven duration is a start bit
pub const fn is_start(high: u16) -> bool {
    high >= START_HOLD - START_MARGIN && high < START_PERIOD
}

/// whether the line stayed driven long enough after our '1' to have been stretched by a receiver
pub const fn is_acknowledged(high: u16) -> bool {
    high > BIT_HALF_PERIOD
}


#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bit_boundaries() {
        assert!(classify_bit(BIT_1_HOLD));
        assert!(! classify_bit(BIT_0_HOLD));
        // the threshold itself is still a '1'
        assert!(classify_bit(BIT_HALF_PERIOD));
        assert!(! classify_bit(BIT_HALF_PERIOD + 1));
        assert!(classify_bit(0));
    }

    #[test]
    fn start_window() {
        for high in 40 .. 47 {
            assert!(is_start(high), "{high} ticks should be a start bit");
        }
        assert!(! is_start(39));
        assert!(! is_start(47));
        assert!(! is_start(BIT_0_HOLD));
        assert!(! is_start(u16::MAX));
    }

    #[test]
    fn acknowledge_threshold() {
        assert!(! is_acknowledged(BIT_1_HOLD));
        assert!(! is_acknowledged(BIT_HALF_PERIOD));
        assert!(is_acknowledged(BIT_HALF_PERIOD + 1));
        assert!(is_acknowledged(BIT_0_HOLD));
    }

    #[test]
    fn holds_fit_in_period() {
        assert_eq!(hold(true), BIT_1_HOLD);
        assert_eq!(hold(false), BIT_0_HOLD);
        assert!(hold(false) < BIT_PERIOD);
        assert!(START_HOLD < START_PERIOD);
    }
}
