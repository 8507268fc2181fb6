use bilge::prelude::*;

use crate::frame::{Address, Control};


/**
    runtime settings of a node

    defaults are those of a display unit on a Subaru head unit bus
*/
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct Config {
    /// our own address, frames to this slave address are acknowledged
    pub address: Address,
    /// head unit, slave of our normal frames
    pub head_unit: Address,
    /// slave address of broadcast frames
    pub broadcast: Address,
    /// control field of every frame we send
    pub control: Control,
    /// only hand over frames for our address or broadcast to everyone, instead of everything heard on the bus
    pub only_mine: bool,
    /// log frame errors, they are frequent on a busy bus and logging is slow
    pub log_errors: bool,
    /// milliseconds after which a registration without traffic is considered lost
    pub reconnect_timeout: u32,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            address: u12::new(0x140),
            head_unit: u12::new(0x130),
            broadcast: u12::new(0xFFF),
            control: u4::new(0xE),
            only_mine: true,
            log_errors: false,
            reconnect_timeout: 5000,
        }
    }
}

impl Config {
    pub fn with_address(self, address: Address) -> Self {
        Self {address, .. self}
    }
    pub fn with_head_unit(self, head_unit: Address) -> Self {
        Self {head_unit, .. self}
    }
    pub fn with_broadcast(self, broadcast: Address) -> Self {
        Self {broadcast, .. self}
    }
    pub fn with_control(self, control: Control) -> Self {
        Self {control, .. self}
    }
    pub fn with_only_mine(self, only_mine: bool) -> Self {
        Self {only_mine, .. self}
    }
    pub fn with_log_errors(self, log_errors: bool) -> Self {
        Self {log_errors, .. self}
    }
    pub fn with_reconnect_timeout(self, reconnect_timeout: u32) -> Self {
        Self {reconnect_timeout, .. self}
    }
}
