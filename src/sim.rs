/*!
    simulated bus line, to run the engine without hardware

    [SimBus] implements [Port] over a virtual clock. Every sample of the line or of the counter costs a fraction of a tick, so busy waits progress and measured durations stay exact to the tick.

    two peers can share the line with the engine:

    - a scripted sender, replaying pulses built with [Script], typically a whole frame. On acknowledge slots it releases the line after a '1' and waits for the engine to release it too, recording whether the slot was stretched.
    - an acknowledging receiver, enabled once the sender is done, which stretches the acknowledge slots of frames sent by the engine

    the engine's own output is recorded, and can be decoded back into pulses, bits and frames
*/

use std::{
    vec::Vec,
    string::{String, ToString},
    collections::VecDeque,
    };
use bilge::prelude::*;

use crate::{
    port::Port,
    timing::*,
    codec::{Word, parity},
    frame::{Frame, Field, Mode, MAX_DATA},
    diagnostics::{Diagnostics, Direction},
    };


/// virtual clock steps per counter tick
pub const SUBTICKS: u32 = 4;
/// virtual clock steps per millisecond, at 2 ticks/us
const SUBTICKS_PER_MS: u32 = 2_000 * SUBTICKS;
/// a test spinning longer than this is stuck
const RUNAWAY: u32 = 20_000_000;

const fn span(ticks: u16) -> u32 {ticks as u32 * SUBTICKS}


/// element of a sender script
#[derive(Copy, Clone, Debug, PartialEq)]
enum Segment {
    /// driven for `high` then released until `period`, in ticks
    Pulse {high: u16, period: u16},
    /// a '1' for which the sender listens for a receiver stretching it
    Ack,
    /// released for the given ticks
    Idle(u16),
}

/// sequence of pulses to be driven by the simulated sender
#[derive(Clone, Debug, Default)]
pub struct Script {
    segments: Vec<Segment>,
    /// position of each field's parity bit
    parities: Vec<(Field, usize)>,
}
impl Script {
    pub fn new() -> Self {Self::default()}
    /// complete frame as a sender puts it on the wire
    pub fn frame(frame: &Frame) -> Self {
        let mut script = Self::new()
            .start()
            .word(frame.mode)
            .field(Field::MasterAddress, frame.master)
            .field(Field::SlaveAddress, frame.slave).ack()
            .field(Field::Control, frame.control).ack()
            .field(Field::Length, frame.length()).ack();
        for (i, &byte) in frame.data.iter().enumerate() {
            script = script.field(Field::Data(i as u8), byte).ack();
        }
        script
    }
    pub fn start(self) -> Self {
        self.pulse(START_HOLD, START_PERIOD)
    }
    pub fn bit(self, bit: bool) -> Self {
        self.pulse(hold(bit), BIT_PERIOD)
    }
    /// word most significant bit first, without parity
    pub fn word<W: Word>(mut self, value: W) -> Self {
        let bits = value.to_bits();
        for shift in (0 .. W::BITS).rev() {
            self = self.bit((bits >> shift) & 1 != 0);
        }
        self
    }
    /// word followed by its parity
    pub fn field<W: Word>(mut self, field: Field, value: W) -> Self {
        self = self.word(value);
        self.parities.push((field, self.segments.len()));
        self.bit(parity(value))
    }
    pub fn ack(mut self) -> Self {
        self.segments.push(Segment::Ack);
        self
    }
    pub fn pulse(mut self, high: u16, period: u16) -> Self {
        self.segments.push(Segment::Pulse {high, period});
        self
    }
    pub fn idle(mut self, ticks: u16) -> Self {
        self.segments.push(Segment::Idle(ticks));
        self
    }
    /// invert the parity bit sent after the given field
    pub fn corrupt_parity(mut self, field: Field) -> Self {
        let Some(&(_, index)) = self.parities.iter().find(|(f, _)| *f == field)
            else {panic!("no parity for {field} in script")};
        if let Segment::Pulse {high, ..} = &mut self.segments[index] {
            *high = if *high == BIT_1_HOLD {BIT_0_HOLD} else {BIT_1_HOLD};
        }
        self
    }
}


/// simulated node replaying scripts
#[derive(Default)]
struct Sender {
    segments: VecDeque<Segment>,
    /// start of the current segment
    start: u32,
    /// whether the current acknowledge slot was already sampled
    sampled: bool,
    acks: Vec<bool>,
}
impl Sender {
    fn busy(&self) -> bool {!self.segments.is_empty()}
    /// level driven by the sender at `now`, given the level driven by the engine
    fn step(&mut self, now: u32, engine: bool) -> bool {
        while let Some(&segment) = self.segments.front() {
            let t = now - self.start;
            match segment {
                Segment::Pulse {high, period} => {
                    if t < span(high) {return true}
                    if t < span(period) {return false}
                },
                Segment::Idle(ticks) => {
                    if t < span(ticks) {return false}
                },
                Segment::Ack => {
                    if t < span(BIT_1_HOLD) {return true}
                    if t >= span(BIT_HALF_PERIOD + 1) && ! self.sampled {
                        self.acks.push(engine);
                        self.sampled = true;
                    }
                    if t < span(BIT_PERIOD) || engine {return false}
                },
            }
            self.segments.pop_front();
            self.start = now;
            self.sampled = false;
        }
        false
    }
}

/// simulated receiver acknowledging the engine's frames
struct Acker {
    /// number of acknowledge slots granted per frame, all when `None`
    limit: Option<usize>,
    /// index of the next pulse since the last start bit, ignoring pulses before any start
    index: Option<usize>,
    granted: usize,
    rise: u32,
    until: u32,
    previous: bool,
}
impl Acker {
    fn new(limit: Option<usize>) -> Self {
        Self {limit, index: None, granted: 0, rise: 0, until: 0, previous: false}
    }
    fn step(&mut self, now: u32, engine: bool) -> bool {
        if engine && ! self.previous {
            self.rise = now;
            if let Some(index) = self.index {
                if is_ack_slot(index) {
                    if self.limit.map_or(true, |limit| self.granted < limit) {
                        self.until = now + span(BIT_0_HOLD);
                    }
                    self.granted += 1;
                }
            }
        }
        else if ! engine && self.previous {
            if now - self.rise >= span(START_HOLD - START_MARGIN) {
                self.index = Some(0);
                self.granted = 0;
            }
            else {
                self.index = self.index.map(|index| index + 1);
            }
        }
        self.previous = engine;
        now < self.until
    }
}

/// whether a bit index after the start bit is an acknowledge slot
pub fn is_ack_slot(index: usize) -> bool {
    matches!(index, 27 | 33 | 43) || index >= 44 && (index - 44) % 10 == 9
}


/// simulated bus line shared by the engine and its peers
pub struct SimBus {
    now: u32,
    origin: u32,
    base: u32,
    output: bool,
    transitions: Vec<(u32, bool)>,
    sender: Sender,
    sender_level: bool,
    acker: Option<Acker>,
    acker_level: bool,
    kicks: usize,
    activity: Vec<bool>,
}
impl SimBus {
    pub fn new() -> Self {
        Self::at_ms(0)
    }
    /// bus whose clock starts at the given uptime
    pub fn at_ms(ms: u32) -> Self {
        let now = ms * SUBTICKS_PER_MS;
        Self {
            now,
            origin: now,
            base: now,
            output: false,
            transitions: Vec::new(),
            sender: Sender::default(),
            sender_level: false,
            acker: None,
            acker_level: false,
            kicks: 0,
            activity: Vec::new(),
        }
    }
    /// acknowledge every field of frames sent by the engine
    pub fn acknowledging(mut self) -> Self {
        self.acker = Some(Acker::new(None));
        self
    }
    /// acknowledge only the first `count` fields of each frame sent by the engine
    pub fn refusing_after(mut self, count: usize) -> Self {
        self.acker = Some(Acker::new(Some(count)));
        self
    }
    /// queue a script after the ones already playing
    pub fn send(&mut self, script: Script) {
        if ! self.sender.busy() {
            self.sender.start = self.now;
            self.sender.sampled = false;
        }
        self.sender.segments.extend(script.segments);
        self.sender_level = self.sender.step(self.now, self.output);
    }
    /// replay the engine's recorded output as a script, clearing the record
    pub fn replay(&mut self) {
        let pulses = self.timed_pulses();
        let mut script = Script::new();
        for (i, &(rise, high)) in pulses.iter().enumerate() {
            let period = match pulses.get(i+1) {
                Some(&(next, _)) => (next - rise) as u16,
                None => high.max(BIT_PERIOD),
            };
            script = script.pulse(high, period);
        }
        self.clear();
        self.send(script);
    }
    /// forget the engine's recorded output
    pub fn clear(&mut self) {
        self.transitions.clear();
    }

    /// current time in ticks
    pub fn ticks(&self) -> u32 {(self.now - self.origin) / SUBTICKS}
    /// number of watchdog kicks so far
    pub fn kicks(&self) -> usize {self.kicks}
    /// activity notifications so far
    pub fn activity(&self) -> &[bool] {&self.activity}
    /// whether the scripted sender saw each acknowledge slot stretched
    pub fn acks(&self) -> &[bool] {&self.sender.acks}
    /// whether the scripted sender is still playing
    pub fn sending(&self) -> bool {self.sender.busy()}

    /// driven durations of the engine's output, in ticks
    pub fn pulses(&self) -> Vec<u16> {
        self.timed_pulses().into_iter().map(|(_, high)| high).collect()
    }
    /// rising edges of the engine's output, in ticks
    pub fn rising_edges(&self) -> Vec<u32> {
        self.transitions.iter()
            .filter(|(_, level)| *level)
            .map(|&(time, _)| (time - self.origin) / SUBTICKS)
            .collect()
    }
    /// bits sent by the engine after each of its start bits, acknowledge slots included
    pub fn sent_bits(&self) -> Vec<Vec<bool>> {
        let mut frames: Vec<Vec<bool>> = Vec::new();
        let mut current = None;
        for high in self.pulses() {
            if is_start(high) {
                if let Some(bits) = current.take() {
                    frames.push(bits);
                }
                current = Some(Vec::new());
            }
            else if let Some(bits) = current.as_mut() {
                bits.push(classify_bit(high));
            }
        }
        frames.extend(current);
        frames
    }
    /// complete frames sent by the engine
    pub fn sent_frames(&self) -> Vec<Frame> {
        self.sent_bits().iter().filter_map(|bits| decode(bits)).collect()
    }

    /// (rise, duration) of each engine pulse, in ticks
    fn timed_pulses(&self) -> Vec<(u32, u16)> {
        self.transitions.chunks(2)
            .filter_map(|edges| match edges {
                &[(rise, true), (fall, false)] => Some((
                    (rise - self.origin) / SUBTICKS,
                    ((fall - rise) / SUBTICKS) as u16,
                    )),
                _ => None,
            })
            .collect()
    }
    fn advance(&mut self) {
        self.now += 1;
        assert!(self.now - self.origin < RUNAWAY, "simulation ran away, engine stuck waiting on the bus");
        self.sender_level = self.sender.step(self.now, self.output);
        let receiving = ! self.sender.busy();
        self.acker_level = match self.acker.as_mut() {
            Some(acker) if receiving => acker.step(self.now, self.output),
            _ => false,
        };
    }
    fn line(&self) -> bool {
        self.output || self.sender_level || self.acker_level
    }
}

impl Port for SimBus {
    fn level(&mut self) -> bool {
        self.advance();
        self.line()
    }
    fn set_level(&mut self, driven: bool) {
        if driven != self.output {
            self.output = driven;
            self.transitions.push((self.now, driven));
        }
    }
    fn reset_counter(&mut self) {
        self.base = self.now;
    }
    fn elapsed(&mut self) -> u16 {
        self.advance();
        u16::try_from((self.now - self.base) / SUBTICKS).unwrap_or(u16::MAX)
    }
    fn uptime_ms(&mut self) -> u32 {
        self.now / SUBTICKS_PER_MS
    }
    fn kick_watchdog(&mut self) {
        self.kicks += 1;
    }
    fn activity(&mut self, active: bool) {
        self.activity.push(active);
    }
}

/// frame from the bits following a start bit, `None` if incomplete
fn decode(bits: &[bool]) -> Option<Frame> {
    let read = |range: core::ops::Range<usize>| -> Option<u16> {
        bits.get(range).map(|bits| bits.iter().fold(0, |acc, &bit| (acc << 1) | u16::from(bit)))
    };
    let mode = Mode::from_bits(read(0 .. 1)?);
    let master = u12::new(read(1 .. 13)?);
    let slave = u12::new(read(14 .. 26)?);
    let control = u4::new(read(28 .. 32)? as u8);
    let length = usize::from(read(34 .. 42)?);
    if length > MAX_DATA
        {return None}
    let mut data = Vec::new();
    for i in 0 .. length {
        let start = 44 + 10*i;
        data.push(read(start .. start + 8)? as u8);
    }
    Frame::new(mode, master, slave, control, &data).ok()
}


/// diagnostics sink keeping every dump
#[derive(Default)]
pub struct Transcript {
    pub dumps: Vec<(Direction, String)>,
}
impl Diagnostics for Transcript {
    fn frame(&mut self, direction: Direction, frame: &Frame) {
        self.dumps.push((direction, frame.to_string()));
    }
}
