//! Engine behaviour against a recording transport.

mod common;

use common::{Call, FakeTransport, FAIL};
use mpsse::{
    DeviceContext, DeviceSelector, Error, Interface, Level, Loopback, Mode, Mpsse, OpenParams,
    SerialProtocol, SpiDevice,
};

fn open(mode: Mode) -> (Mpsse<'static, FakeTransport>, common::Handle) {
    let (fake, handle) = FakeTransport::new();
    let mpsse = Mpsse::open(fake, &OpenParams::new(mode)).unwrap();
    (mpsse, handle)
}

#[test]
fn failed_open_is_cannot_open() {
    let (fake, handle) = FakeTransport::new();
    handle.with(|s| s.open_succeeds = false);
    let err = Mpsse::open(fake, &OpenParams::new(Mode::Spi0)).unwrap_err();
    assert!(matches!(err, Error::CannotOpen));
    // A context that never opened is never closed.
    assert_eq!(handle.count(&Call::Close), 0);
}

#[test]
fn default_selector_uses_default_open() {
    let (_mpsse, handle) = open(Mode::Spi1);
    assert!(matches!(handle.calls()[0], Call::OpenDefault(Mode::Spi1, _, _)));
}

#[test]
fn any_selector_field_uses_indexed_open() {
    let (fake, handle) = FakeTransport::new();
    let params = OpenParams::new(Mode::Spi0).device(DeviceSelector::new().index(2));
    let _mpsse = Mpsse::open(fake, &params).unwrap();
    assert_eq!(
        handle.calls()[0],
        Call::OpenIndexed {
            vendor_id: 0x0403,
            product_id: 0x6010,
            interface: Interface::Any,
            index: 2,
        }
    );
}

#[test]
fn i2c_mode_enables_tristate() {
    let (_mpsse, handle) = open(Mode::I2c);
    assert_eq!(handle.count(&Call::Tristate), 1);

    let (_mpsse, handle) = open(Mode::Spi0);
    assert_eq!(handle.count(&Call::Tristate), 0);
}

#[test]
fn tristate_failure_fails_construction() {
    let (fake, handle) = FakeTransport::new();
    handle.with(|s| {
        s.tristate_status = FAIL;
        s.error_string = "open drain not supported".into();
    });
    let err = Mpsse::open(fake, &OpenParams::new(Mode::I2c)).unwrap_err();
    assert!(matches!(err, Error::StatusCode { code: -1, .. }));
}

#[test]
fn start_failure_carries_code_and_current_message() {
    let (mut mpsse, handle) = open(Mode::Spi0);
    handle.with(|s| {
        s.start_status = 7;
        s.error_string = "USB transfer error: stall".into();
    });
    match mpsse.start().unwrap_err() {
        Error::StatusCode { code, message } => {
            assert_eq!(code, 7);
            assert_eq!(message, "USB transfer error: stall");
        }
        other => panic!("expected status error, got {other:?}"),
    }
    // No retry.
    assert_eq!(handle.count(&Call::Start), 1);
}

#[test]
fn stop_failure_message_is_fetched_at_failure_time() {
    let (mut mpsse, handle) = open(Mode::Spi0);
    handle.with(|s| {
        s.stop_status = FAIL;
        s.error_string = "first".into();
    });
    let first = mpsse.stop().unwrap_err();
    handle.with(|s| s.error_string = "second".into());
    let second = mpsse.stop().unwrap_err();
    assert_eq!(first.to_string(), "-1: first");
    assert_eq!(second.to_string(), "-1: second");
}

#[test]
fn bitbang_only_operations_are_gated() {
    for mode in [Mode::I2c, Mode::Spi0, Mode::Spi3, Mode::Gpio] {
        let (mut mpsse, handle) = open(mode);
        handle.clear_calls();

        let err = mpsse.direction(0xFF).unwrap_err();
        assert!(matches!(
            err,
            Error::InvalidMode {
                current,
                required: Mode::Bitbang
            } if current == mode
        ));
        assert!(matches!(mpsse.write_pins(0x0F), Err(Error::InvalidMode { .. })));
        assert!(matches!(mpsse.read_pins(), Err(Error::InvalidMode { .. })));

        assert!(handle.calls().is_empty(), "transport touched in {mode:?}");
    }
}

#[test]
fn bitbang_pin_io() {
    let (mut mpsse, handle) = open(Mode::Bitbang);
    mpsse.direction(0xF0).unwrap();
    mpsse.write_pins(0xA0).unwrap();
    assert_eq!(mpsse.read_pins().unwrap(), 0xA0);
    assert_eq!(mpsse.pin_state(5, None).unwrap(), Level::High);
    assert_eq!(mpsse.pin_state(6, Some(0xA0)).unwrap(), Level::Low);
    assert_eq!(handle.count(&Call::SetDirection(0xF0)), 1);
    assert_eq!(handle.count(&Call::WritePins(0xA0)), 1);
}

#[test]
fn pin_mode_dispatches_on_level() {
    let (mut mpsse, handle) = open(Mode::Gpio);
    mpsse.pin_mode(3, Level::High).unwrap();
    mpsse.pin_mode(3, Level::Low).unwrap();
    assert_eq!(handle.count(&Call::PinHigh(3)), 1);
    assert_eq!(handle.count(&Call::PinLow(3)), 1);
}

#[test]
fn pin_numbers_are_range_checked() {
    let (mut mpsse, handle) = open(Mode::Bitbang);
    handle.clear_calls();
    assert!(matches!(
        mpsse.pin_mode(8, Level::High),
        Err(Error::InvalidArgument(_))
    ));
    let (mut gpio, _) = open(Mode::Gpio);
    assert!(matches!(gpio.pin_state(12, None), Err(Error::InvalidArgument(_))));
    assert!(handle.calls().is_empty());
}

#[test]
fn high_bank_pins_are_driven() {
    let (mut gpio, handle) = open(Mode::Gpio);
    gpio.pin_mode(9, Level::High).unwrap();
    gpio.pin_mode(11, Level::High).unwrap();
    gpio.pin_mode(11, Level::Low).unwrap();
    assert_eq!(gpio.pin_state(9, None).unwrap(), Level::High);
    assert_eq!(gpio.pin_state(11, None).unwrap(), Level::Low);
    assert_eq!(gpio.pin_state(3, None).unwrap(), Level::Low);
    assert_eq!(handle.count(&Call::PinHigh(9)), 1);
    assert_eq!(handle.count(&Call::PinLow(11)), 1);
}

#[test]
fn read_returns_exact_size() {
    let (mut mpsse, handle) = open(Mode::Spi0);
    handle.queue_read(&[1, 2, 3]);
    assert_eq!(mpsse.read(3).unwrap(), vec![1, 2, 3]);
}

#[test]
fn short_read_is_an_error() {
    let (mut mpsse, handle) = open(Mode::Spi0);
    handle.queue_read(&[1]);
    assert!(matches!(mpsse.read(2), Err(Error::StatusCode { .. })));
}

#[test]
fn failed_read_is_an_error() {
    let (mut mpsse, handle) = open(Mode::Spi0);
    handle.with(|s| {
        s.read_fails = true;
        s.error_string = "timeout".into();
    });
    match mpsse.read(4).unwrap_err() {
        Error::StatusCode { message, .. } => assert_eq!(message, "timeout"),
        other => panic!("unexpected {other:?}"),
    }
}

#[test]
fn read_bits_validates_size() {
    let (mut mpsse, handle) = open(Mode::Spi0);
    handle.queue_read(&[0b101]);
    assert!(mpsse.read_bits(0).is_err());
    assert!(mpsse.read_bits(9).is_err());
    assert_eq!(mpsse.read_bits(3).unwrap(), 0b101);
}

#[test]
fn set_ack_accepts_only_ack_or_nack() {
    let (mut mpsse, handle) = open(Mode::I2c);
    mpsse.set_ack(1).unwrap();
    assert!(matches!(mpsse.set_ack(2), Err(Error::InvalidArgument(_))));
    assert_eq!(handle.count(&Call::SetAck(1)), 1);
    assert_eq!(handle.count(&Call::SetAck(2)), 0);
}

#[test]
fn configuration_toggles_forward() {
    let (mut mpsse, handle) = open(Mode::Spi0);
    mpsse.loopback(Loopback::Enabled).unwrap();
    mpsse.loopback("disable".parse().unwrap()).unwrap();
    mpsse.cs_idle(Level::Low).unwrap();
    assert_eq!(handle.count(&Call::SetLoopback(true)), 1);
    assert_eq!(handle.count(&Call::SetLoopback(false)), 1);
    assert_eq!(handle.count(&Call::SetCsIdle(Level::Low)), 1);
}

#[test]
fn diagnostics_come_from_transport() {
    let (mpsse, _) = open(Mode::Spi0);
    assert_eq!(mpsse.description(), "Fake MPSSE");
    assert_eq!(mpsse.version(), "fake-1");
    assert_eq!(mpsse.clock(), mpsse::ClockRate::Khz400);
}

#[test]
fn owned_engine_closes_once() {
    let (mpsse, handle) = open(Mode::Spi0);
    mpsse.close();
    assert_eq!(handle.count(&Call::Close), 1);
}

#[test]
fn dropping_owned_engine_closes() {
    let (mpsse, handle) = open(Mode::Spi0);
    drop(mpsse);
    assert_eq!(handle.count(&Call::Close), 1);
}

#[test]
fn borrowed_engine_does_not_close() {
    let (fake, handle) = FakeTransport::new();
    let mut ctx = DeviceContext::open(fake, &OpenParams::new(Mode::Spi0));
    {
        let mut mpsse = Mpsse::borrowed(&mut ctx).unwrap();
        mpsse.start().unwrap();
        mpsse.stop().unwrap();
    }
    assert_eq!(handle.count(&Call::Close), 0);
    assert!(ctx.is_open());
    drop(ctx);
    assert_eq!(handle.count(&Call::Close), 1);
}

#[test]
fn closing_borrowed_engine_leaves_context_open() {
    let (fake, handle) = FakeTransport::new();
    let ctx: &'static mut DeviceContext<FakeTransport> =
        Box::leak(Box::new(DeviceContext::open(fake, &OpenParams::new(Mode::Spi0))));
    let mpsse = Mpsse::borrowed(ctx).unwrap();
    mpsse.close();
    assert_eq!(handle.count(&Call::Close), 0);
}

#[test]
fn device_over_borrowed_engine_does_not_close() {
    let (fake, handle) = FakeTransport::new();
    let ctx: &'static mut DeviceContext<FakeTransport> =
        Box::leak(Box::new(DeviceContext::open(fake, &OpenParams::new(Mode::Spi0))));
    let dev = SpiDevice::from_engine(Mpsse::borrowed(ctx).unwrap()).unwrap();
    dev.into_mpsse().close();
    assert_eq!(handle.count(&Call::Close), 0);
}

#[test]
fn context_close_is_idempotent() {
    let (fake, handle) = FakeTransport::new();
    let mut ctx = DeviceContext::open(fake, &OpenParams::new(Mode::Gpio));
    ctx.close();
    ctx.close();
    drop(ctx);
    assert_eq!(handle.count(&Call::Close), 1);
}

#[test]
fn closed_context_refuses_operations() {
    let (fake, _) = FakeTransport::new();
    let mut ctx = DeviceContext::open(fake, &OpenParams::new(Mode::Spi0));
    ctx.close();
    assert!(matches!(Mpsse::borrowed(&mut ctx), Err(Error::CannotOpen)));
}

#[test]
fn engine_transaction_always_stops() {
    let (mut mpsse, handle) = open(Mode::Spi0);
    let err = mpsse
        .transaction(|m| {
            m.write(&[0x01])?;
            Err::<(), _>(Error::InvalidArgument("body failed"))
        })
        .unwrap_err();
    assert!(matches!(err, Error::InvalidArgument("body failed")));
    assert_eq!(handle.count(&Call::Start), 1);
    assert_eq!(handle.count(&Call::Stop), 1);
}
