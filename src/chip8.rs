use log::{trace, warn};

use crate::error::Chip8Error;
use crate::instruction::from_op;
use crate::state::{FrameBuffer, State};

/// # Chip-8
/// Chip-8 is a virtual machine and corresponding interpreted language.
///
/// Tracks:
///  - current `state`
///  - the fatal `fault` that stopped execution, if any
///
/// Supplies interfaces for:
/// - loading roms
/// - pressing and releasing keys
/// - advancing the CPU one instruction at a time
/// - advancing its timers, independently of the CPU
/// - taking its frame buffer for rendering by some display
///
/// Nothing here sleeps or blocks; the caller decides how often to `step` and `tick`.
pub struct Chip8 {
    state: State,
    fault: Option<Chip8Error>,
}

impl Chip8 {
    pub fn new() -> Self {
        Chip8 {
            state: State::new(),
            fault: None,
        }
    }

    /// Replace the running program with `rom`.
    /// On failure the current program keeps its state.
    ///
    /// # Arguments
    /// * `rom` the raw program image, loaded at 0x200
    pub fn load_rom(&mut self, rom: &[u8]) -> Result<(), Chip8Error> {
        self.state.load(rom)?;
        self.fault = None;
        Ok(())
    }

    /// Returns the machine to power-on state, clearing any fault.
    /// Memory above the sprite sheet is zeroed so a program has to be loaded again.
    pub fn reset(&mut self) {
        self.state.reset();
        self.fault = None;
    }

    /// Returns the FrameBuffer if the display should be redrawn
    pub fn take_frame(&mut self) -> Option<FrameBuffer> {
        self.state.take_frame()
    }

    /// Set the pressed status of key
    ///
    /// # Arguments
    /// * `key` the 8-bit representation of the key that was pressed
    pub fn key_press(&mut self, key: u8) -> Result<(), Chip8Error> {
        self.state.set_key(key, true)
    }

    /// Unset the pressed status of key
    ///
    /// # Arguments
    /// * `key` the 8-bit representation of the key that was released
    pub fn key_release(&mut self, key: u8) -> Result<(), Chip8Error> {
        self.state.set_key(key, false)
    }

    /// Advances the CPU by a single cycle
    /// - does nothing while awaiting a keypress
    /// - refuses to run once a fatal fault has occurred
    /// - otherwise fetches and executes the next opcode
    ///
    /// Unknown opcodes are skipped over and reported; stack faults halt the machine.
    pub fn step(&mut self) -> Result<(), Chip8Error> {
        if self.fault.is_some() {
            return Err(Chip8Error::Halted);
        }
        if self.state.awaiting_key().is_some() {
            return Ok(());
        }

        let op = self.state.fetch();
        trace!(
            "{:04X} v{:02X?} i{:04X} pc{:04X}",
            op,
            self.state.v,
            self.state.i,
            self.state.pc
        );

        let operation = match from_op(&op) {
            Some(operation) => operation,
            None => {
                let pc = self.state.pc;
                warn!("skipping unknown opcode {:04X} at {:04X}", op, pc);
                self.state.pc = pc.wrapping_add(0x2);
                return Err(Chip8Error::UnknownOpcode { opcode: op, pc });
            }
        };

        match operation(&op, &self.state) {
            Ok(state) => {
                self.state = state;
                Ok(())
            }
            Err(e) => {
                if e.is_fatal() {
                    self.fault = Some(e);
                }
                Err(e)
            }
        }
    }

    /// Counts both timers down by one, stopping at zero.
    /// Runs regardless of whether the CPU is waiting on a key.
    pub fn tick(&mut self) {
        self.state.delay_timer = self.state.delay_timer.saturating_sub(1);
        self.state.sound_timer = self.state.sound_timer.saturating_sub(1);
    }

    /// Whether the sound timer is running; no tone is generated
    pub fn sound_active(&self) -> bool {
        self.state.sound_timer > 0
    }

    /// The fault that halted execution, if any
    pub fn fault(&self) -> Option<Chip8Error> {
        self.fault
    }

    pub fn state(&self) -> &State {
        &self.state
    }
}

impl Default for Chip8 {
    fn default() -> Self {
        Self::new()
    }
}
