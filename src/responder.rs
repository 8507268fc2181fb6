/*!
    canned frames of a display unit, and its answer to the head unit's liveness probe

    the head unit periodically polls the units it knows with `[0x10, token, 0x01]`, a unit that does not echo the token back is dropped from its list
*/

use crate::{
    config::Config,
    frame::{Frame, Mode, Payload, MAX_DATA},
    };


/// immutable outgoing frame, addressed when loaded
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct Template {
    pub mode: Mode,
    pub data: &'static [u8],
    /// human readable name for logs
    pub label: &'static str,
}

pub const PING: Template = Template {
    mode: Mode::Normal,
    data: &[0x1F],
    label: "display ping",
};
/// announces the display to every node
pub const REGISTER: Template = Template {
    mode: Mode::Broadcast,
    data: &[0x12],
    label: "display register",
};
pub const REGISTER_PING: Template = Template {
    mode: Mode::Normal,
    data: &[0x1F],
    label: "display register ping",
};
/// answer to a status query
pub const STATUS_REPLY: Template = Template {
    mode: Mode::Normal,
    data: &[0x11, 0x00, 0x01, 0x01, 0x85],
    label: "display status reply",
};
/// answer to the liveness probe, the token is substituted at [PROBE_TOKEN_OFFSET]
pub const PROBE_REPLY: Template = Template {
    mode: Mode::Normal,
    data: &[0x11, 0x00, 0x01, 0x02, 0x85, 0x93],
    label: "display probe reply",
};

/// every template, for lookups by label
pub const TEMPLATES: [Template; 5] = [PING, REGISTER, REGISTER_PING, STATUS_REPLY, PROBE_REPLY];

/// position of the echoed token in [PROBE_REPLY]
pub const PROBE_TOKEN_OFFSET: usize = 5;

/// liveness probe opcode
const PROBE_OPCODE: u8 = 0x10;
/// liveness probe terminator
const PROBE_END: u8 = 0x01;


impl Template {
    /// fresh frame from this template, sent by us to the head unit or to everyone
    pub fn load(&self, config: &Config) -> Frame {
        let slave = match self.mode {
            Mode::Broadcast => config.broadcast,
            Mode::Normal => config.head_unit,
        };
        Frame {
            mode: self.mode,
            master: config.address,
            slave,
            control: config.control,
            data: self.data.iter().copied().take(MAX_DATA).collect::<Payload>(),
        }
    }
    /// find a template by its label
    pub fn named(label: &str) -> Option<&'static Template> {
        TEMPLATES.iter().find(|template| template.label == label)
    }
}

/// token of a liveness probe payload, if it is one
pub fn probe_token(data: &[u8]) -> Option<u8> {
    match data {
        &[PROBE_OPCODE, token, PROBE_END] => Some(token),
        _ => None,
    }
}

/// reply to a liveness probe carrying `token`
pub fn probe_reply(config: &Config, token: u8) -> Frame {
    let mut frame = PROBE_REPLY.load(config);
    if let Some(byte) = frame.data.get_mut(PROBE_TOKEN_OFFSET) {
        *byte = token;
    }
    frame
}
