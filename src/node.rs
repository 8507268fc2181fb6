/*!
    frame level state machines of a bus node

    a [Node] owns the bus port and sends or receives one whole frame per pass. The frame in progress lives on the stack of the pass, only the registration of this node by the head unit survives from one frame to the next.
*/

use log::*;

use crate::{
    port::Port,
    codec::{self, Word},
    arbitration,
    acknowledge,
    config::Config,
    diagnostics::{Diagnostics, Direction, LogDiagnostics},
    error::Error,
    frame::{Frame, Field, Mode, Address, Control, Payload, MAX_DATA},
    responder::{self, Template},
    };


/// outcome of a successful receive pass
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Reception {
    /// nothing on the bus, nothing done
    Idle,
    /// complete frame passing the address filter
    Delivered(Frame),
    /// liveness probe, already answered
    Answered,
    /// complete frame dropped by the address filter
    Filtered,
}

/// whether the head unit currently knows this node
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub struct Connection {
    registered: bool,
    registered_at: u32,
}
impl Connection {
    pub fn is_registered(&self) -> bool {self.registered}
    /// port uptime in milliseconds of the last registration
    pub fn registered_at(&self) -> u32 {self.registered_at}
    /// registered, and not for longer than `timeout` milliseconds at time `now`
    pub fn is_fresh(&self, now: u32, timeout: u32) -> bool {
        self.registered && now.wrapping_sub(self.registered_at) < timeout
    }
    pub(crate) fn register(&mut self, now: u32) {
        self.registered = true;
        self.registered_at = now;
    }
    pub(crate) fn lose(&mut self) {
        self.registered = false;
    }
}

/**
    bus node sending and receiving whole frames

    all methods busy-wait on the port, a pass started on the bus runs until the frame ends or fails. Received frames are only handed over once their pass completed.
*/
pub struct Node<P, D = LogDiagnostics> {
    port: P,
    config: Config,
    diagnostics: D,
    connection: Connection,
    losses: u32,
}

impl<P: Port> Node<P> {
    /// node dumping frames to the log
    pub fn with_logging(port: P, config: Config) -> Self {
        Self::new(port, config, LogDiagnostics)
    }
}

impl<P: Port, D: Diagnostics> Node<P, D> {
    pub fn new(port: P, config: Config, diagnostics: D) -> Self {
        Self {
            port,
            config,
            diagnostics,
            connection: Connection::default(),
            losses: 0,
        }
    }
    pub fn config(&self) -> &Config {&self.config}
    pub fn connection(&self) -> &Connection {&self.connection}
    pub fn port(&self) -> &P {&self.port}
    pub fn port_mut(&mut self) -> &mut P {&mut self.port}
    pub fn diagnostics(&self) -> &D {&self.diagnostics}
    /// number of received frames aborted on error so far
    pub fn losses(&self) -> u32 {self.losses}
    /// whether the registration is recent enough to consider the head unit still knows us
    pub fn is_online(&mut self) -> bool {
        let now = self.port.uptime_ms();
        self.connection.is_fresh(now, self.config.reconnect_timeout)
    }

    /// wait for the bus to be free and send a frame, failing on the first field not acknowledged
    pub fn send_frame(&mut self, frame: &Frame) -> Result<(), Error> {
        arbitration::acquire(&mut self.port);
        self.transmit(frame)
    }
    /// send a frame if the bus is free right now, [Error::BusBusy] otherwise
    pub fn try_send_frame(&mut self, frame: &Frame) -> Result<(), Error> {
        if ! arbitration::bus_free(&mut self.port)
            {return Err(Error::BusBusy)}
        self.transmit(frame)
    }
    /// send a canned frame
    pub fn send_template(&mut self, template: &Template) -> Result<(), Error> {
        debug!("send {}", template.label);
        let frame = template.load(&self.config);
        self.send_frame(&frame)
    }
    /// broadcast our presence, so the head unit starts polling us
    pub fn announce(&mut self) -> Result<(), Error> {
        self.send_template(&responder::REGISTER)
    }

    /**
        receive one frame if one is starting on the bus

        returns immediately with [Reception::Idle] on an idle bus. Liveness probes are answered before returning, whatever their address. A frame failing to decode is skipped up to its end before the error is returned.
    */
    pub fn receive_frame(&mut self) -> Result<Reception, Error> {
        if ! self.port.level()
            {return Ok(Reception::Idle)}

        self.port.activity(true);
        let received = self.read_frame();
        if received.is_err() {
            // let the rest of the aborted frame pass, its bits are no start bits
            arbitration::acquire(&mut self.port);
        }
        self.port.activity(false);

        let (frame, for_me) = match received {
            Ok(received) => received,
            Err(error) => {
                if self.config.log_errors {
                    warn!("receive: {}", error);
                }
                return Err(error);
            },
        };
        if let Some(token) = responder::probe_token(&frame.data) {
            debug!("liveness probe {:#04X}", token);
            let now = self.port.uptime_ms();
            self.connection.register(now);
            let reply = responder::probe_reply(&self.config, token);
            self.send_frame(&reply)?;
            return Ok(Reception::Answered);
        }
        if self.surfaced(&frame, for_me) {
            self.diagnostics.frame(Direction::Incoming, &frame);
            Ok(Reception::Delivered(frame))
        }
        else {
            Ok(Reception::Filtered)
        }
    }
    /// one receive pass, counting losses, returning the frame to hand over if any
    pub fn poll(&mut self) -> Option<Frame> {
        match self.receive_frame() {
            Ok(Reception::Delivered(frame)) => Some(frame),
            Ok(Reception::Idle) => {
                self.port.kick_watchdog();
                None
            },
            Ok(_) => None,
            Err(_) => {
                self.losses = self.losses.saturating_add(1);
                None
            },
        }
    }
    /// receive forever, calling `on_frame` with every frame delivered
    pub fn run(&mut self, mut on_frame: impl FnMut(&Frame)) -> ! {
        loop {
            if let Some(frame) = self.poll() {
                on_frame(&frame);
            }
        }
    }

    fn transmit(&mut self, frame: &Frame) -> Result<(), Error> {
        self.port.activity(true);
        let result = self.write_frame(frame);
        // never leave the line driven after an aborted frame
        self.port.set_level(false);
        self.port.activity(false);

        match result {
            Ok(()) => self.diagnostics.frame(Direction::Outgoing, frame),
            Err(error) => if self.config.log_errors {
                warn!("send: {}, {}", error, frame);
            },
        }
        result
    }
    fn write_frame(&mut self, frame: &Frame) -> Result<(), Error> {
        debug!("sending frame");
        codec::send_start(&mut self.port);
        codec::send_word(&mut self.port, frame.mode);
        let parity = codec::send_word(&mut self.port, frame.master);
        codec::send_bit(&mut self.port, parity);
        self.write_field(frame.mode, Field::SlaveAddress, frame.slave)?;
        self.write_field(frame.mode, Field::Control, frame.control)?;
        self.write_field(frame.mode, Field::Length, frame.length())?;
        for (i, &byte) in frame.data.iter().enumerate() {
            self.write_field(frame.mode, Field::Data(i as u8), byte)?;
        }
        Ok(())
    }
    /// field, parity, and acknowledge
    fn write_field<W: Word>(&mut self, mode: Mode, field: Field, value: W) -> Result<(), Error> {
        let parity = codec::send_word(&mut self.port, value);
        codec::send_bit(&mut self.port, parity);
        if acknowledge::await_ack(&mut self.port, mode)
            {Ok(())}
        else
            {Err(Error::NoAcknowledge(field))}
    }

    /// frame after the start edge already seen on the line, and whether it is addressed to us
    fn read_frame(&mut self) -> Result<(Frame, bool), Error> {
        if ! codec::read_start(&mut self.port)
            {return Err(Error::MalformedStart)}
        let (mode, _) = codec::read_word::<_, Mode>(&mut self.port);
        let master = self.read_field::<Address>(Field::MasterAddress, false)?;
        let slave = self.read_field::<Address>(Field::SlaveAddress, false)?;
        let for_me = slave == self.config.address;
        debug!("receiving frame {:#X} -> {:#X}", master.value(), slave.value());
        self.answer_ack(for_me);

        let control = self.read_field::<Control>(Field::Control, for_me)?;
        self.answer_ack(for_me);

        let length = self.read_field::<u8>(Field::Length, for_me)?;
        if usize::from(length) > MAX_DATA
            {return Err(Error::Oversize(length.into()))}
        self.answer_ack(for_me);

        let mut data = Payload::new();
        for i in 0 .. length {
            let byte = self.read_field::<u8>(Field::Data(i), for_me)?;
            self.answer_ack(for_me);
            data.push(byte).map_err(|_| Error::Oversize(length.into()))?;
        }

        if for_me {
            let now = self.port.uptime_ms();
            self.connection.register(now);
        }
        Ok((Frame {mode, master, slave, control, data}, for_me))
    }
    /// field and its parity check, a mismatch on our frames loses the registration if `unregister`
    fn read_field<W: Word>(&mut self, field: Field, unregister: bool) -> Result<W, Error> {
        let (value, parity) = codec::read_word::<_, W>(&mut self.port);
        if codec::read_bit(&mut self.port) != parity {
            if unregister && self.connection.registered {
                debug!("registration lost");
                self.connection.lose();
            }
            return Err(Error::Parity(field));
        }
        Ok(value)
    }
    fn answer_ack(&mut self, for_me: bool) {
        if for_me
            {acknowledge::send_ack(&mut self.port)}
        else
            {acknowledge::skip_ack(&mut self.port)}
    }
    /// address filter
    fn surfaced(&self, frame: &Frame, for_me: bool) -> bool {
        ! self.config.only_mine
        || for_me
        || frame.mode == Mode::Broadcast && frame.slave == self.config.broadcast
    }
}
