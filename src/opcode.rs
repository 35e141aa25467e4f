/// # Opcodes
///
/// Instructions are 16-bit big-endian words. The high nibble picks the family,
/// families `0`, `8`, `E` and `F` are further split on the low nibble or low byte.
///
/// Fields that don't select the operation carry its operands:
/// - `[_nnn]` a 12-bit address
/// - `[__nn]` an immediate byte
/// - `[___n]` a 4-bit count (sprite height)
/// - `[_x__]` register Vx, or the last register of the range V0..=Vx
/// - `[__y_]` register Vy
pub trait Opcode {
    /// All four nibbles, most significant first.
    fn nibbles(&self) -> (u8, u8, u8, u8);

    /// `[x___]`
    fn family(&self) -> u8;

    /// `[_x__]`
    fn x(&self) -> usize;

    /// `[__y_]`
    fn y(&self) -> usize;

    /// `[___n]`
    fn n(&self) -> u8;

    /// `[__nn]`
    fn nn(&self) -> u8;

    /// `[_nnn]`
    fn nnn(&self) -> u16;
}

impl Opcode for u16 {
    fn nibbles(&self) -> (u8, u8, u8, u8) {
        (self.family(), self.x() as u8, self.y() as u8, self.n())
    }

    fn family(&self) -> u8 {
        (self >> 12) as u8
    }

    fn x(&self) -> usize {
        usize::from((self >> 8) & 0xF)
    }

    fn y(&self) -> usize {
        usize::from((self >> 4) & 0xF)
    }

    fn n(&self) -> u8 {
        (self & 0xF) as u8
    }

    fn nn(&self) -> u8 {
        (self & 0xFF) as u8
    }

    fn nnn(&self) -> u16 {
        self & 0xFFF
    }
}
