use log::debug;

use crate::constants::{
    DISPLAY_HEIGHT, DISPLAY_WIDTH, MAX_ROM_SIZE, MEMORY_SIZE, PROGRAM_START, SPRITE_SHEET,
    STACK_SIZE,
};
use crate::error::Chip8Error;

/// The FrameBuffer is indexed as [y][x]
pub type FrameBuffer = [[bool; DISPLAY_WIDTH]; DISPLAY_HEIGHT];

/// Addresses are 12 bits wide; anything above wraps back into memory.
const ADDRESS_MASK: u16 = (MEMORY_SIZE - 1) as u16;

/// A snapshot of the Chip-8 internal state
///
/// ## CPU
/// Registers
/// - (v) 16 primary 8-bit registers (V0..VF)
///     - VF doubles as the carry/borrow/collision flag
/// - (i) a 16-bit memory address register, only the low 12 bits are meaningful
///
/// Counter
/// - (pc) a 16-bit program counter pointing at the next instruction
///
/// Stack
/// - (stack) 16 return addresses
/// - (sp) the number of addresses currently on the stack
///
/// Timers
/// - 2 8-bit timers (delay & sound), counting down to 0 at 60Hz
///
/// ## Memory
/// - 4096 bytes; the sprite sheet lives at 0x000, programs at 0x200
/// - 64x32 frame buffer plus a flag recording whether it changed since the last read
///
/// ## Input
/// - the pressed status of keys 0..F
/// - the register awaiting a key press, if any; execution stalls until one arrives
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct State {
    pub v: [u8; 16],
    pub i: u16,
    pub pc: u16,
    pub sp: usize,
    pub stack: [u16; STACK_SIZE],
    pub delay_timer: u8,
    pub sound_timer: u8,
    pub memory: [u8; MEMORY_SIZE],
    pub frame_buffer: FrameBuffer,
    pub draw_flag: bool,
    pub pressed_keys: [bool; 16],
    pub register_needing_key: Option<usize>,
}

impl State {
    pub fn new() -> Self {
        let mut memory = [0; MEMORY_SIZE];
        memory[..SPRITE_SHEET.len()].copy_from_slice(&SPRITE_SHEET);

        State {
            v: [0; 16],
            i: 0,
            pc: PROGRAM_START as u16,
            sp: 0,
            stack: [0; STACK_SIZE],
            delay_timer: 0,
            sound_timer: 0,
            memory,
            frame_buffer: [[false; DISPLAY_WIDTH]; DISPLAY_HEIGHT],
            draw_flag: false,
            pressed_keys: [false; 16],
            register_needing_key: None,
        }
    }

    /// Returns to the power-on configuration: zeroed memory apart from the sprite sheet,
    /// zeroed registers and timers, an empty stack and the PC at the program start.
    pub fn reset(&mut self) {
        *self = State::new();
        debug!("state reset");
    }

    /// Resets the state and copies `rom` into memory starting at 0x200.
    /// The state is left untouched if the ROM doesn't fit.
    ///
    /// # Arguments
    /// * `rom` the raw program image
    pub fn load(&mut self, rom: &[u8]) -> Result<(), Chip8Error> {
        if rom.len() > MAX_ROM_SIZE {
            return Err(Chip8Error::RomTooLarge {
                size: rom.len(),
                max: MAX_ROM_SIZE,
            });
        }
        self.reset();
        self.memory[PROGRAM_START..PROGRAM_START + rom.len()].copy_from_slice(rom);
        debug!("loaded {} byte ROM at {:#05X}", rom.len(), PROGRAM_START);
        Ok(())
    }

    /// Set the pressed status of a key.
    /// A press while an instruction is waiting for input is written to the waiting register
    /// and resumes execution; later presses are ordinary key state again.
    ///
    /// # Arguments
    /// * `key` the keypad code, 0x0..=0xF
    /// * `pressed` whether the key went down or up
    pub fn set_key(&mut self, key: u8, pressed: bool) -> Result<(), Chip8Error> {
        let slot = self
            .pressed_keys
            .get_mut(usize::from(key))
            .ok_or(Chip8Error::InvalidKey(key))?;
        *slot = pressed;

        if pressed {
            if let Some(register) = self.register_needing_key.take() {
                self.v[register] = key;
            }
        }
        Ok(())
    }

    /// Returns the FrameBuffer if it changed since the last call
    pub fn take_frame(&mut self) -> Option<FrameBuffer> {
        if self.draw_flag {
            self.draw_flag = false;
            Some(self.frame_buffer)
        } else {
            None
        }
    }

    /// The register that will receive the next key press, if execution is stalled on input
    pub fn awaiting_key(&self) -> Option<usize> {
        self.register_needing_key
    }

    pub fn is_pressed(&self, key: u8) -> bool {
        self.pressed_keys[usize::from(key & 0xF)]
    }

    /// Reads the byte at `address`, wrapping into the 4K address space
    pub fn read(&self, address: u16) -> u8 {
        self.memory[usize::from(address & ADDRESS_MASK)]
    }

    /// Writes `value` at `address`, wrapping into the 4K address space
    pub fn write(&mut self, address: u16, value: u8) {
        self.memory[usize::from(address & ADDRESS_MASK)] = value;
    }

    /// Gets the opcode currently pointed at by the pc.
    /// Memory is stored as bytes, but opcodes are 16 bits so we combine two subsequent bytes.
    pub fn fetch(&self) -> u16 {
        u16::from_be_bytes([self.read(self.pc), self.read(self.pc.wrapping_add(1))])
    }
}

impl Default for State {
    fn default() -> Self {
        Self::new()
    }
}
