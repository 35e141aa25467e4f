use std::path::PathBuf;
use std::time::Duration;

use clap::Parser;

use chip8vm::constants::{CPU_HZ, TIMER_HZ};

/// Run a Chip-8 ROM in a window.
///
/// Keys 1-4, Q-R, A-F and Z-V form the hex keypad. Hold space to fast forward, escape quits.
#[derive(Parser, Debug)]
#[command(name = "chip8")]
pub struct Config {
    /// ROM image to load at 0x200
    #[arg(value_name = "ROM")]
    pub rom: PathBuf,

    /// Window pixels per Chip-8 pixel
    #[arg(long, default_value_t = 10, value_parser = clap::value_parser!(u32).range(1..=64))]
    pub scale: u32,

    /// Instructions executed per second
    #[arg(long, default_value_t = CPU_HZ, value_parser = clap::value_parser!(u64).range(1..=1_000_000))]
    pub cpu_hz: u64,

    /// Delay and sound timer decrements per second
    #[arg(long, default_value_t = TIMER_HZ, value_parser = clap::value_parser!(u64).range(1..=1_000_000))]
    pub timer_hz: u64,
}

impl Config {
    /// Time between two instruction cycles
    pub fn cycle_time(&self) -> Duration {
        Duration::from_micros(1_000_000 / self.cpu_hz)
    }

    /// Time between two timer decrements
    pub fn timer_time(&self) -> Duration {
        Duration::from_micros(1_000_000 / self.timer_hz)
    }
}
