//! Tests against a real PCA9685
//!
//! Expects a chip at 0x40 on `/dev/i2c-1`. Outputs are driven, so disconnect
//! anything that should not move.

use pca9685_driver::prelude::*;

const ADAPTER: u32 = 1;

fn open() -> Pca9685<I2cDevice> {
    let bus = I2cDevice::open(ADAPTER, addr::DEFAULT).expect("open /dev/i2c-1");
    Pca9685::new(bus, addr::DEFAULT, DriverConfig::default()).expect("driver")
}

#[test]
#[ignore] // Requires hardware
fn test_initialize_and_read_modes() {
    let mut pwm = open();
    pwm.initialize(200.0).expect("initialize");

    let modes = pwm.get_mode_registers().expect("modes");
    println!("{modes}");
    assert!(modes.auto_increment());
    assert!(!modes.sleeping());
}

#[test]
#[ignore] // Requires hardware
fn test_channel_round_trip() {
    let mut pwm = open();
    pwm.initialize(200.0).expect("initialize");

    for ch in 0..16 {
        pwm.set_channel(ch, 0, 2048).expect("set");
        assert_eq!(pwm.get_channel(ch).expect("get"), (0, 2048));
    }
    pwm.set_all_channels(0, 0).expect("all off");
}

#[test]
#[ignore] // Requires hardware
fn test_prescale_read_back() {
    let mut pwm = open();
    pwm.initialize(50.0).expect("initialize");

    let dump = pwm.dump_registers().expect("dump");
    println!("{dump}");
    assert_eq!(dump.prescale(), 122);
}
