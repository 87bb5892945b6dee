//! Recording fake transport shared by the integration tests.

#![allow(dead_code)]

use std::cell::RefCell;
use std::collections::VecDeque;
use std::rc::Rc;

use mpsse::constants::{MPSSE_FAIL, MPSSE_OK};
use mpsse::{ClockRate, DeviceFilter, Endianness, Interface, Level, Mode, Status, Transport};

/// One call made on the fake, in order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Call {
    OpenDefault(Mode, ClockRate, Endianness),
    OpenIndexed {
        vendor_id: u16,
        product_id: u16,
        interface: Interface,
        index: usize,
    },
    Close,
    Start,
    Stop,
    Write(Vec<u8>),
    Read(usize),
    ReadBits(u8),
    Transfer(Vec<u8>),
    GetAck,
    SetAck(u8),
    SendAcks,
    SendNacks,
    Tristate,
    SetDirection(u8),
    PinHigh(u8),
    PinLow(u8),
    WritePins(u8),
    ReadPins,
    PinState(u8, Option<u8>),
    SetLoopback(bool),
    SetCsIdle(Level),
}

/// Scripted responses and the call log.
#[derive(Debug)]
pub struct State {
    pub calls: Vec<Call>,
    pub open_succeeds: bool,
    /// ACK bits returned by successive `get_ack` calls; ACK when empty.
    pub acks: VecDeque<u8>,
    /// Bytes handed out by `read`.
    pub read_data: VecDeque<u8>,
    pub start_status: Status,
    pub stop_status: Status,
    pub write_status: Status,
    pub tristate_status: Status,
    pub read_fails: bool,
    /// Low byte plus the GPIOH bank in bits 8-15.
    pub pins: u16,
    pub error_string: String,
}

impl Default for State {
    fn default() -> Self {
        Self {
            calls: Vec::new(),
            open_succeeds: true,
            acks: VecDeque::new(),
            read_data: VecDeque::new(),
            start_status: MPSSE_OK,
            stop_status: MPSSE_OK,
            write_status: MPSSE_OK,
            tristate_status: MPSSE_OK,
            read_fails: false,
            pins: 0,
            error_string: String::new(),
        }
    }
}

/// A handle that stays usable after the transport is moved into a device.
#[derive(Debug, Clone, Default)]
pub struct Handle(Rc<RefCell<State>>);

impl Handle {
    pub fn calls(&self) -> Vec<Call> {
        self.0.borrow().calls.clone()
    }

    pub fn count(&self, wanted: &Call) -> usize {
        self.0.borrow().calls.iter().filter(|c| *c == wanted).count()
    }

    pub fn writes(&self) -> Vec<Vec<u8>> {
        self.0
            .borrow()
            .calls
            .iter()
            .filter_map(|c| match c {
                Call::Write(data) => Some(data.clone()),
                _ => None,
            })
            .collect()
    }

    pub fn clear_calls(&self) {
        self.0.borrow_mut().calls.clear();
    }

    pub fn with<R>(&self, f: impl FnOnce(&mut State) -> R) -> R {
        f(&mut self.0.borrow_mut())
    }

    pub fn queue_acks(&self, acks: &[u8]) {
        self.0.borrow_mut().acks.extend(acks);
    }

    pub fn queue_read(&self, data: &[u8]) {
        self.0.borrow_mut().read_data.extend(data);
    }
}

/// Transport that records every call and answers from [`State`].
#[derive(Debug, Default)]
pub struct FakeTransport {
    state: Handle,
}

impl FakeTransport {
    pub fn new() -> (Self, Handle) {
        let state = Handle::default();
        (
            Self {
                state: state.clone(),
            },
            state,
        )
    }

    fn log(&self, call: Call) {
        self.state.0.borrow_mut().calls.push(call);
    }
}

impl Transport for FakeTransport {
    fn open_default(&mut self, mode: Mode, clock: ClockRate, endianness: Endianness) -> bool {
        self.log(Call::OpenDefault(mode, clock, endianness));
        self.state.0.borrow().open_succeeds
    }

    fn open_indexed(
        &mut self,
        filter: &DeviceFilter,
        interface: Interface,
        _mode: Mode,
        _clock: ClockRate,
        _endianness: Endianness,
    ) -> bool {
        self.log(Call::OpenIndexed {
            vendor_id: filter.vendor_id,
            product_id: filter.product_id,
            interface,
            index: filter.index,
        });
        self.state.0.borrow().open_succeeds
    }

    fn close(&mut self) {
        self.log(Call::Close);
    }

    fn start(&mut self) -> Status {
        self.log(Call::Start);
        self.state.0.borrow().start_status
    }

    fn stop(&mut self) -> Status {
        self.log(Call::Stop);
        self.state.0.borrow().stop_status
    }

    fn write(&mut self, data: &[u8]) -> Status {
        self.log(Call::Write(data.to_vec()));
        self.state.0.borrow().write_status
    }

    fn read(&mut self, size: usize) -> Option<Vec<u8>> {
        self.log(Call::Read(size));
        let mut state = self.state.0.borrow_mut();
        if state.read_fails {
            return None;
        }
        let n = size.min(state.read_data.len());
        Some(state.read_data.drain(..n).collect())
    }

    fn read_bits(&mut self, size: u8) -> Option<u8> {
        self.log(Call::ReadBits(size));
        let mut state = self.state.0.borrow_mut();
        state.read_data.pop_front()
    }

    fn transfer(&mut self, data: &[u8]) -> Option<Vec<u8>> {
        self.log(Call::Transfer(data.to_vec()));
        // Loopback: echo what was sent.
        Some(data.to_vec())
    }

    fn get_ack(&mut self) -> u8 {
        self.log(Call::GetAck);
        self.state.0.borrow_mut().acks.pop_front().unwrap_or(0)
    }

    fn set_ack(&mut self, ack: u8) {
        self.log(Call::SetAck(ack));
    }

    fn send_acks(&mut self) {
        self.log(Call::SendAcks);
    }

    fn send_nacks(&mut self) {
        self.log(Call::SendNacks);
    }

    fn tristate(&mut self) -> Status {
        self.log(Call::Tristate);
        self.state.0.borrow().tristate_status
    }

    fn set_direction(&mut self, direction: u8) -> Status {
        self.log(Call::SetDirection(direction));
        MPSSE_OK
    }

    fn pin_high(&mut self, pin: u8) -> Status {
        self.log(Call::PinHigh(pin));
        self.state.0.borrow_mut().pins |= 1u16 << pin;
        MPSSE_OK
    }

    fn pin_low(&mut self, pin: u8) -> Status {
        self.log(Call::PinLow(pin));
        self.state.0.borrow_mut().pins &= !(1u16 << pin);
        MPSSE_OK
    }

    fn write_pins(&mut self, value: u8) -> Status {
        self.log(Call::WritePins(value));
        let mut state = self.state.0.borrow_mut();
        state.pins = (state.pins & 0xFF00) | u16::from(value);
        MPSSE_OK
    }

    fn read_pins(&mut self) -> Option<u8> {
        self.log(Call::ReadPins);
        Some(self.state.0.borrow().pins as u8)
    }

    fn pin_state(&mut self, pin: u8, state: Option<u8>) -> Option<bool> {
        self.log(Call::PinState(pin, state));
        let pins = state.map_or(self.state.0.borrow().pins, u16::from);
        Some(pins & (1u16 << pin) != 0)
    }

    fn set_loopback(&mut self, enable: bool) -> Status {
        self.log(Call::SetLoopback(enable));
        MPSSE_OK
    }

    fn set_cs_idle(&mut self, idle: Level) {
        self.log(Call::SetCsIdle(idle));
    }

    fn description(&self) -> String {
        "Fake MPSSE".to_string()
    }

    fn version(&self) -> String {
        "fake-1".to_string()
    }

    fn error_string(&self) -> String {
        self.state.0.borrow().error_string.clone()
    }
}

/// A status other than OK, for failure scripting.
pub const FAIL: Status = MPSSE_FAIL;
