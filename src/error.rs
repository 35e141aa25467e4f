use thiserror::Error;

/// Everything that can go wrong while loading or running a program.
///
/// Only the stack faults stop the machine. The rest are reported to the caller
/// and execution carries on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum Chip8Error {
    #[error("ROM is {size} bytes but at most {max} bytes fit in memory")]
    RomTooLarge { size: usize, max: usize },

    #[error("call at {pc:#05X} with a full stack")]
    StackOverflow { pc: u16 },

    #[error("return at {pc:#05X} with an empty stack")]
    StackUnderflow { pc: u16 },

    #[error("unknown opcode {opcode:#06X} at {pc:#05X}")]
    UnknownOpcode { opcode: u16, pc: u16 },

    #[error("key {0:#04X} is not on the keypad")]
    InvalidKey(u8),

    #[error("machine halted after a fatal fault; load a ROM or reset to continue")]
    Halted,
}

impl Chip8Error {
    /// Whether the running program can't continue after this error
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            Chip8Error::StackOverflow { .. }
                | Chip8Error::StackUnderflow { .. }
                | Chip8Error::Halted
        )
    }
}
