//! `pwmctl`: command-line control of a PCA9685 PWM controller.
//!
//! ```text
//! USAGE:
//!   pwmctl [OPTIONS] init [--freq HZ]     Reset, all outputs off, program frequency
//!   pwmctl [OPTIONS] freq <HZ>            Reprogram the PWM frequency
//!   pwmctl [OPTIONS] set <CH> <ON> <OFF>  Write one channel
//!   pwmctl [OPTIONS] set-all <ON> <OFF>   Write every channel
//!   pwmctl [OPTIONS] duty <CH> <FRACTION> Set a duty cycle in 0.0..=1.0
//!   pwmctl [OPTIONS] get <CH>             Read one channel
//!   pwmctl [OPTIONS] get-all              Read every channel
//!   pwmctl [OPTIONS] modes                Decode MODE1/MODE2
//!   pwmctl [OPTIONS] dump                 Register table
//! ```
//!
//! Driver options can also come from `PCA9685_DEBUG`, `PCA9685_INVERT`,
//! `PCA9685_OPEN_DRAIN` and `PCA9685_STRICT_COUNTS`.

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use pca9685_driver::{
    addr, osc, CountPolicy, DriverConfig, I2cBus, I2cDevice, Pca9685, SimulatedBus,
};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "pwmctl", about = "PCA9685 16-channel PWM controller CLI", version)]
struct Cli {
    /// I²C adapter number (/dev/i2c-N).
    #[arg(long, default_value_t = 1)]
    bus: u32,

    /// 7-bit slave address (decimal or 0x-prefixed hex).
    #[arg(long, default_value = "0x40", value_parser = parse_address)]
    address: u8,

    /// Run against an in-memory chip and print the bus transactions.
    #[arg(long)]
    simulate: bool,

    /// Invert output logic at init.
    #[arg(long)]
    invert: bool,

    /// Open-drain outputs at init.
    #[arg(long)]
    open_drain: bool,

    /// Reject ON/OFF counts above 4095 instead of passing them through.
    #[arg(long)]
    strict_counts: bool,

    /// Debug logging, including transaction payloads.
    #[arg(long)]
    debug: bool,

    #[command(subcommand)]
    command: Cmd,
}

#[derive(Subcommand)]
enum Cmd {
    /// Reset the chip, turn every output off and program the frequency.
    Init {
        /// PWM frequency in Hz (clamped to 40..=1000).
        #[arg(long, default_value_t = 200.0)]
        freq: f64,
    },
    /// Reprogram the PWM frequency.
    Freq {
        /// PWM frequency in Hz (clamped to 40..=1000).
        hz: f64,
    },
    /// Write ON/OFF counts to one channel.
    Set {
        /// Channel 0..=15.
        channel: u8,
        /// Count at which the output turns on.
        on: u16,
        /// Count at which the output turns off.
        off: u16,
    },
    /// Write the same ON/OFF counts to every channel.
    SetAll {
        /// Count at which the outputs turn on.
        on: u16,
        /// Count at which the outputs turn off.
        off: u16,
    },
    /// Set a channel's duty cycle as a fraction.
    Duty {
        /// Channel 0..=15.
        channel: u8,
        /// Duty cycle in 0.0..=1.0.
        fraction: f64,
    },
    /// Read one channel's ON/OFF counts.
    Get {
        /// Channel 0..=15.
        channel: u8,
    },
    /// Read every channel.
    GetAll,
    /// Decode MODE1 and MODE2.
    Modes,
    /// Print both register blocks as a table.
    Dump,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let filter = if cli.debug {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| "warn".into())
    };
    tracing_subscriber::fmt().with_env_filter(filter).init();

    let config = driver_config(&cli);
    tracing::debug!("Driver config: {config:?}");

    if cli.simulate {
        let mut pwm = Pca9685::new(SimulatedBus::new(cli.address), cli.address, config)?;
        let outcome = run(&mut pwm, &cli.command);
        for t in pwm.bus().log() {
            eprintln!("sim: {t:?}");
        }
        outcome
    } else {
        let bus = I2cDevice::open(cli.bus, cli.address).with_context(|| {
            format!("opening PCA9685 at {:#04x} on /dev/i2c-{}", cli.address, cli.bus)
        })?;
        let mut pwm = Pca9685::new(bus, cli.address, config)?;
        run(&mut pwm, &cli.command)
    }
}

fn driver_config(cli: &Cli) -> DriverConfig {
    let mut config = DriverConfig::from_env();
    if cli.debug {
        config = config.with_debug_logging(true);
    }
    if cli.invert {
        config = config.with_inverted_outputs(true);
    }
    if cli.open_drain {
        config = config.with_open_drain_outputs(true);
    }
    if cli.strict_counts {
        config = config.with_count_policy(CountPolicy::Reject);
    }
    config
}

fn run<B: I2cBus>(pwm: &mut Pca9685<B>, command: &Cmd) -> Result<()> {
    match *command {
        Cmd::Init { freq } => cmd_init(pwm, freq)?,
        Cmd::Freq { hz } => cmd_freq(pwm, hz)?,
        Cmd::Set { channel, on, off } => {
            pwm.set_channel(channel, on, off)
                .with_context(|| format!("setting channel {channel}"))?;
        }
        Cmd::SetAll { on, off } => pwm.set_all_channels(on, off)?,
        Cmd::Duty { channel, fraction } => {
            pwm.set_channel_duty(channel, fraction)
                .with_context(|| format!("setting duty on channel {channel}"))?;
        }
        Cmd::Get { channel } => {
            let (on, off) = pwm.get_channel(channel)?;
            println!("CH{channel:<2}  on {on:>5}  off {off:>5}");
        }
        Cmd::GetAll => cmd_get_all(pwm)?,
        Cmd::Modes => println!("{}", pwm.get_mode_registers()?),
        Cmd::Dump => println!("{}", pwm.dump_registers()?),
    }
    Ok(())
}

fn cmd_init<B: I2cBus>(pwm: &mut Pca9685<B>, freq: f64) -> Result<()> {
    pwm.initialize(freq)
        .with_context(|| format!("initializing PCA9685 at {:#04x}", pwm.address()))?;
    println!(
        "Initialized {:#04x}: {:.1} Hz",
        pwm.address(),
        pwm.frequency()?
    );
    Ok(())
}

fn cmd_freq<B: I2cBus>(pwm: &mut Pca9685<B>, hz: f64) -> Result<()> {
    let prescale = pwm.set_frequency(hz)?;
    println!(
        "Prescale {prescale} ({:.1} Hz)",
        osc::frequency_for_prescale(prescale)
    );
    Ok(())
}

fn cmd_get_all<B: I2cBus>(pwm: &mut Pca9685<B>) -> Result<()> {
    let (on, off) = pwm.get_all_channels_bulk()?;
    println!("CH      ON    OFF");
    for (ch, (on, off)) in on.iter().zip(off.iter()).enumerate() {
        println!("{ch:>2}   {on:>5}  {off:>5}");
    }
    Ok(())
}

fn parse_address(s: &str) -> std::result::Result<u8, String> {
    let value = match s.strip_prefix("0x").or_else(|| s.strip_prefix("0X")) {
        Some(hex) => u8::from_str_radix(hex, 16),
        None => s.parse(),
    }
    .map_err(|e| format!("invalid address {s:?}: {e}"))?;

    if addr::is_valid(value) {
        Ok(value)
    } else {
        Err(format!("{value:#04x} is not a 7-bit address"))
    }
}
