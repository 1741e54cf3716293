//! Controller behaviour against the simulated chip
//!
//! Every procedure is checked for its bus traffic (order, framing, lengths)
//! and for the state it leaves in the chip model.

use pca9685_driver::record::ChannelRecord;
use pca9685_driver::regs::{self, mode1, mode2, CHANNELS};
use pca9685_driver::{
    addr, CountPolicy, DriverConfig, Pca9685, PwmError, RegisterDump, SimulatedBus, Transaction,
};
use std::time::{Duration, Instant};

fn pwm_with(config: DriverConfig) -> Pca9685<SimulatedBus> {
    Pca9685::new(SimulatedBus::new(addr::DEFAULT), addr::DEFAULT, config).unwrap()
}

fn pwm() -> Pca9685<SimulatedBus> {
    pwm_with(DriverConfig::default())
}

fn initialized(frequency: f64) -> Pca9685<SimulatedBus> {
    let mut pwm = pwm();
    pwm.initialize(frequency).unwrap();
    pwm.bus_mut().clear_log();
    pwm
}

fn write(address: u8, bytes: &[u8]) -> Transaction {
    Transaction::Write {
        address,
        bytes: bytes.to_vec(),
        ok: true,
    }
}

fn mode1_writes(log: &[Transaction]) -> Vec<u8> {
    log.iter()
        .filter(|t| !t.is_read() && t.register() == Some(regs::MODE1))
        .map(|t| t.payload()[0])
        .collect()
}

// ── initialize ──────────────────────────────────────────────────────────────

#[test]
fn initialize_transaction_sequence() {
    let mut pwm = pwm();
    pwm.initialize(200.0).unwrap();

    let log = pwm.bus().log();
    assert_eq!(log.len(), 9, "{log:#?}");
    assert_eq!(log[0], write(addr::GENERAL_CALL, &[addr::SWRST]));
    assert_eq!(log[1], write(addr::DEFAULT, &[regs::MODE1, 0x31]));
    assert_eq!(log[2], write(addr::DEFAULT, &[regs::ALL_LED_ON_L, 0, 0, 0, 0]));
    assert!(log[3].is_read());
    assert_eq!(log[3].register(), Some(regs::MODE1));
    assert_eq!(log[4], write(addr::DEFAULT, &[regs::MODE1, 0x31]));
    assert_eq!(log[5], write(addr::DEFAULT, &[regs::PRE_SCALE, 30]));
    assert_eq!(log[6], write(addr::DEFAULT, &[regs::MODE1, 0x21]));
    assert_eq!(log[7], write(addr::DEFAULT, &[regs::MODE1, 0xA1]));
    assert_eq!(
        log[8],
        write(addr::DEFAULT, &[regs::MODE1, mode1::AI | mode1::ALLCALL])
    );

    assert_eq!(pwm.bus().register(regs::PRE_SCALE), 30);
    assert_eq!(pwm.bus().register(regs::MODE1), mode1::AI | mode1::ALLCALL);
}

#[test]
fn initialize_clears_every_channel() {
    let mut pwm = initialized(200.0);
    pwm.set_all_channels(0x123, 0x456).unwrap();
    pwm.set_channel(9, 4095, 0x1000).unwrap();

    pwm.initialize(200.0).unwrap();

    assert_eq!(
        pwm.get_all_channels_bulk().unwrap(),
        ([0; CHANNELS], [0; CHANNELS])
    );
    for ch in 0..CHANNELS as u8 {
        assert_eq!(
            pwm.bus().channel(ch),
            ChannelRecord::new(0, 0),
            "channel {ch}"
        );
    }
}

#[test]
fn initialize_clears_power_on_full_off() {
    let mut pwm = pwm();
    assert_eq!(pwm.bus().channel(0), ChannelRecord::FULL_OFF);

    pwm.initialize(50.0).unwrap();
    for ch in 0..CHANNELS as u8 {
        assert_eq!(
            pwm.bus().channel(ch),
            ChannelRecord::new(0, 0),
            "channel {ch}"
        );
    }
}

#[test]
fn reset_failure_aborts_initialize() {
    let mut pwm = pwm();
    pwm.bus_mut().fail_transaction(0);

    let err = pwm.initialize(200.0).unwrap_err();
    match err {
        PwmError::Transaction {
            address,
            register,
            len,
            ref source,
        } => {
            assert_eq!(address, addr::GENERAL_CALL);
            assert_eq!(register, None);
            assert_eq!(len, 1);
            assert_eq!(source.raw_os_error(), Some(libc::EIO));
        }
        other => panic!("expected transaction error, got {other}"),
    }
    assert_eq!(pwm.bus().log().len(), 1);
}

#[test]
fn absent_chip_fails_after_reset() {
    // Reset goes to the general call, which the bus acknowledges even if
    // nothing answers at the target address.
    let bus = SimulatedBus::new(0x40);
    let mut pwm = Pca9685::new(bus, 0x41, DriverConfig::default()).unwrap();

    let err = pwm.initialize(200.0).unwrap_err();
    assert!(matches!(
        err,
        PwmError::Transaction {
            address: 0x41,
            register: Some(regs::MODE1),
            len: 1,
            ..
        }
    ));
    assert_eq!(pwm.bus().log().len(), 2);
}

#[test]
fn mode2_written_only_when_requested() {
    let default = initialized(200.0);
    assert_eq!(default.bus().register(regs::MODE2), mode2::RESET_VALUE);

    let mut pwm = pwm();
    pwm.initialize(200.0).unwrap();
    assert!(pwm
        .bus()
        .log()
        .iter()
        .all(|t| t.register() != Some(regs::MODE2)));

    let mut open_drain = pwm_with(DriverConfig::default().with_open_drain_outputs(true));
    open_drain.initialize(200.0).unwrap();
    let last = open_drain.bus().log().last().cloned().unwrap();
    assert_eq!(last, write(addr::DEFAULT, &[regs::MODE2, 0x00]));
    assert_eq!(open_drain.bus().register(regs::MODE2), 0x00);

    let mut inverted = pwm_with(DriverConfig::default().with_inverted_outputs(true));
    inverted.initialize(200.0).unwrap();
    let modes = inverted.get_mode_registers().unwrap();
    assert!(modes.inverted());
    assert!(modes.totem_pole());
}

#[test]
fn sub_addresses_enabled_by_config() {
    let mut pwm = pwm_with(
        DriverConfig::default()
            .with_all_call(false)
            .with_sub_address(1, true),
    );
    pwm.initialize(100.0).unwrap();

    let modes = pwm.get_mode_registers().unwrap();
    assert!(!modes.all_call());
    assert!(modes.sub_address(1));

    pwm.at(addr::SUB_ADDRESSES[1])
        .unwrap()
        .set_channel(4, 10, 20)
        .unwrap();
    assert_eq!(pwm.get_channel(4).unwrap(), (10, 20));
    assert!(pwm.at(addr::ALL_CALL).unwrap().set_channel(4, 0, 0).is_err());
}

#[test]
fn mode_registers_after_initialize() {
    let mut pwm = initialized(200.0);
    let modes = pwm.get_mode_registers().unwrap();

    assert_eq!(modes.mode1, mode1::AI | mode1::ALLCALL);
    assert_eq!(modes.mode2, mode2::RESET_VALUE);
    assert!(!modes.sleeping());
    assert!(!modes.restart());

    let log = pwm.bus().log();
    assert_eq!(log.len(), 1);
    assert_eq!(
        log[0],
        Transaction::WriteRead {
            address: addr::DEFAULT,
            write: vec![regs::MODE1],
            read_len: 2,
            ok: true,
        }
    );
}

// ── set_frequency ───────────────────────────────────────────────────────────

#[test]
fn boundary_prescales() {
    let mut pwm = initialized(200.0);
    assert_eq!(pwm.set_frequency(40.0).unwrap(), 152);
    assert_eq!(pwm.set_frequency(1000.0).unwrap(), 6);
    assert_eq!(pwm.set_frequency(200.0).unwrap(), 30);
    assert_eq!(pwm.bus().register(regs::PRE_SCALE), 30);
}

#[test]
fn out_of_range_frequency_is_clamped() {
    let mut pwm = initialized(200.0);

    assert_eq!(pwm.set_frequency(10.0).unwrap(), 152);
    assert_eq!(pwm.set_frequency(0.0).unwrap(), 152);
    assert_eq!(pwm.set_frequency(-50.0).unwrap(), 152);
    assert_eq!(pwm.set_frequency(5000.0).unwrap(), 6);
    assert_eq!(pwm.set_frequency(f64::INFINITY).unwrap(), 6);
    assert_eq!(pwm.bus().register(regs::PRE_SCALE), 6);
}

#[test]
fn prescale_written_while_asleep() {
    let mut pwm = initialized(200.0);
    pwm.set_frequency(50.0).unwrap();

    let log = pwm.bus().log();
    let pre = log
        .iter()
        .position(|t| t.register() == Some(regs::PRE_SCALE))
        .unwrap();
    let before = log[pre - 1].payload()[0];
    let after = log[pre + 1].payload()[0];

    assert_eq!(log[pre - 1].register(), Some(regs::MODE1));
    assert_ne!(before & mode1::SLEEP, 0);
    assert_eq!(before & mode1::RESTART, 0);
    assert_eq!(log[pre + 1].register(), Some(regs::MODE1));
    assert_eq!(after & mode1::SLEEP, 0);

    assert_eq!(pwm.bus().ignored_prescale_writes(), 0);
    assert_eq!(pwm.bus().register(regs::PRE_SCALE), 122);

    // Final write sets RESTART, and auto-increment survives the cycle.
    let writes = mode1_writes(log);
    let last = *writes.last().unwrap();
    assert_ne!(last & mode1::RESTART, 0);
    assert_ne!(last & mode1::AI, 0);
    assert_eq!(pwm.bus().register(regs::MODE1) & mode1::RESTART, 0);
}

#[test]
fn set_frequency_waits_for_oscillator() {
    let mut pwm = initialized(200.0);
    let start = Instant::now();
    pwm.set_frequency(300.0).unwrap();
    assert!(start.elapsed() >= Duration::from_micros(500));
}

#[test]
fn failed_prescale_write_leaves_chip_asleep() {
    let mut pwm = initialized(200.0);
    // read, sleep write, prescale write
    pwm.bus_mut().fail_transaction(2);

    let err = pwm.set_frequency(100.0).unwrap_err();
    assert!(matches!(
        err,
        PwmError::Transaction {
            register: Some(regs::PRE_SCALE),
            len: 1,
            ..
        }
    ));
    assert_eq!(pwm.bus().log().len(), 3);
    assert_ne!(pwm.bus().register(regs::MODE1) & mode1::SLEEP, 0);

    // Recoverable by re-initializing.
    pwm.initialize(100.0).unwrap();
    assert_eq!(pwm.bus().register(regs::MODE1) & mode1::SLEEP, 0);
}

#[test]
fn effective_frequency_reads_prescale() {
    let mut pwm = initialized(200.0);
    let f = pwm.frequency().unwrap();
    assert!((f - 196.9).abs() < 0.1, "got {f}");
}

// ── channels ────────────────────────────────────────────────────────────────

#[test]
fn channel_round_trip_all_channels() {
    let mut pwm = initialized(200.0);

    for ch in 0..CHANNELS as u8 {
        let step = u16::from(ch) * 256;
        let samples = [
            (0, 0),
            (0, 4095),
            (4095, 0),
            (4095, 4095),
            (1234, 2345),
            (step, 4095 - step),
        ];
        for (on, off) in samples {
            pwm.set_channel(ch, on, off).unwrap();
            assert_eq!(pwm.get_channel(ch).unwrap(), (on, off), "channel {ch}");
        }
    }
}

#[test]
fn set_channel_is_one_transaction() {
    let mut pwm = initialized(200.0);
    pwm.set_channel(3, 0x0123, 0x0456).unwrap();

    assert_eq!(
        pwm.bus().log(),
        &[write(addr::DEFAULT, &[0x12, 0x23, 0x01, 0x56, 0x04])]
    );
}

#[test]
fn scenario_half_duty_on_channel_zero() {
    let mut pwm = Pca9685::new(SimulatedBus::new(0x40), 0x40, DriverConfig::default()).unwrap();
    pwm.initialize(200.0).unwrap();
    pwm.set_channel(0, 0, 2048).unwrap();
    assert_eq!(pwm.get_channel(0).unwrap(), (0, 2048));
}

#[test]
fn set_all_replicates_to_every_channel() {
    let mut pwm = initialized(200.0);
    pwm.set_all_channels(100, 3000).unwrap();

    let (on, off) = pwm.get_all_channels_bulk().unwrap();
    assert_eq!(on, [100; CHANNELS]);
    assert_eq!(off, [3000; CHANNELS]);
}

#[test]
fn bulk_round_trip() {
    let mut pwm = initialized(200.0);

    let mut on = [0u16; CHANNELS];
    let mut off = [0u16; CHANNELS];
    for i in 0..CHANNELS {
        on[i] = i as u16 * 17;
        off[i] = 4095 - i as u16 * 100;
    }
    pwm.set_all_channels_bulk(&on, &off).unwrap();

    let log = pwm.bus().log();
    assert_eq!(log.len(), 1);
    assert_eq!(log[0].register(), Some(regs::LED0_ON_L));
    assert_eq!(log[0].payload().len(), 64);

    assert_eq!(pwm.get_all_channels_bulk().unwrap(), (on, off));
    let read = &pwm.bus().log()[1];
    assert!(matches!(read, Transaction::WriteRead { read_len: 64, .. }));
}

#[test]
fn full_on_full_off_and_duty() {
    let mut pwm = initialized(200.0);

    pwm.set_channel_full_on(5).unwrap();
    assert_eq!(pwm.bus().channel(5), ChannelRecord::FULL_ON);

    pwm.set_channel_full_off(5).unwrap();
    assert_eq!(pwm.bus().channel(5), ChannelRecord::FULL_OFF);

    pwm.set_channel_duty(5, 0.25).unwrap();
    assert_eq!(pwm.get_channel(5).unwrap(), (0, 1024));

    assert!(matches!(
        pwm.set_channel_duty(16, 0.5),
        Err(PwmError::InvalidChannel { channel: 16 })
    ));
}

#[test]
fn count_policies_shape_written_values() {
    let mut passthrough = initialized(200.0);
    passthrough.set_channel(0, 0x1000, 0).unwrap();
    assert!(passthrough.bus().channel(0).is_full_on());

    let mut masked = pwm_with(DriverConfig::default().with_count_policy(CountPolicy::Mask));
    masked.initialize(200.0).unwrap();
    masked.set_channel(0, 0x1800, 0xFFFF).unwrap();
    assert_eq!(masked.get_channel(0).unwrap(), (0x0800, 0x0FFF));

    let mut strict = pwm_with(DriverConfig::default().with_count_policy(CountPolicy::Reject));
    strict.initialize(200.0).unwrap();
    strict.bus_mut().clear_log();
    assert!(matches!(
        strict.set_all_channels(0, 4096),
        Err(PwmError::CountOutOfRange { value: 4096 })
    ));
    assert!(strict.bus().log().is_empty());
}

#[test]
fn channel_failure_reports_register() {
    let mut pwm = initialized(200.0);
    pwm.bus_mut().fail_transaction(0);

    let err = pwm.get_channel(15).unwrap_err();
    assert!(err.is_transaction());
    assert!(matches!(
        err,
        PwmError::Transaction {
            register: Some(0x42),
            len: 4,
            ..
        }
    ));
}

// ── diagnostics ─────────────────────────────────────────────────────────────

#[test]
fn dump_reads_two_blocks() {
    let mut pwm = initialized(200.0);
    pwm.set_channel(7, 100, 200).unwrap();
    pwm.bus_mut().clear_log();

    let dump = pwm.dump_registers().unwrap();

    let log = pwm.bus().log();
    assert_eq!(log.len(), 2);
    let lens: Vec<(Option<u8>, usize)> = log
        .iter()
        .map(|t| match t {
            Transaction::WriteRead { read_len, .. } => (t.register(), *read_len),
            Transaction::Write { .. } => panic!("unexpected write"),
        })
        .collect();
    assert_eq!(
        lens,
        [(Some(regs::MODE1), 70), (Some(regs::ALL_LED_ON_L), 6)]
    );
    assert_eq!(lens.iter().map(|(_, n)| n).sum::<usize>(), RegisterDump::TOTAL_LEN);

    assert_eq!(dump.prescale(), 30);
    assert_eq!(dump.channel(7), Some(ChannelRecord::new(100, 200)));
    assert_eq!(dump.modes().mode1, mode1::AI | mode1::ALLCALL);
    assert_eq!(dump.register(regs::SUBADR1), Some(0xE2));
    assert!(dump.to_string().contains(" 7    64   00    c8    00    100    200"));
}

#[test]
fn dump_aborts_after_failed_first_read() {
    let mut pwm = initialized(200.0);
    pwm.bus_mut().fail_transaction(0);

    let err = pwm.dump_registers().unwrap_err();
    assert!(matches!(
        err,
        PwmError::Transaction {
            register: Some(regs::MODE1),
            len: 70,
            ..
        }
    ));
    assert_eq!(pwm.bus().log().len(), 1);
}
