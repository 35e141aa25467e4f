use crate::error::Chip8Error;
use crate::opcode::Opcode;
use crate::operations::*;
use crate::state::State;

/// Executes a single decoded instruction against a state, producing the next state
pub type Operation = fn(op: &dyn Opcode, state: &State) -> Result<State, Chip8Error>;

/// Selects the correct Operation for a given Opcode.
/// Returns None for words that aren't part of the instruction set.
pub fn from_op(op: &dyn Opcode) -> Option<Operation> {
    let operation: Operation = match op.nibbles() {
        (0x0, 0x0, 0xE, 0x0) => cls,
        (0x0, 0x0, 0xE, 0xE) => ret,
        (0x1, ..) => jump,
        (0x2, ..) => call,
        (0x3, ..) => ske,
        (0x4, ..) => skne,
        (0x5, .., 0x0) => skre,
        (0x6, ..) => load,
        (0x7, ..) => add,
        (0x8, .., 0x0) => mv,
        (0x8, .., 0x1) => or,
        (0x8, .., 0x2) => and,
        (0x8, .., 0x3) => xor,
        (0x8, .., 0x4) => addr,
        (0x8, .., 0x5) => sub,
        (0x8, .., 0x6) => shr,
        (0x8, .., 0x7) => subn,
        (0x8, .., 0xE) => shl,
        (0x9, .., 0x0) => skrne,
        (0xA, ..) => loadi,
        (0xB, ..) => jumpi,
        (0xC, ..) => rand,
        (0xD, ..) => draw,
        (0xE, _, 0x9, 0xE) => skpr,
        (0xE, _, 0xA, 0x1) => skup,
        (0xF, _, 0x0, 0x7) => moved,
        (0xF, _, 0x0, 0xA) => keyd,
        (0xF, _, 0x1, 0x5) => loads,
        (0xF, _, 0x1, 0x8) => ld,
        (0xF, _, 0x1, 0xE) => addi,
        (0xF, _, 0x2, 0x9) => ldspr,
        (0xF, _, 0x3, 0x3) => bcd,
        (0xF, _, 0x5, 0x5) => stor,
        (0xF, _, 0x6, 0x5) => read,
        _ => return None,
    };
    Some(operation)
}

#[cfg(test)]
mod test_instruction {
    use super::*;
    use crate::constants::{DISPLAY_HEIGHT, DISPLAY_WIDTH};
    use crate::state::FrameBuffer;

    fn execute(op: u16, state: &State) -> Result<State, Chip8Error> {
        let operation = from_op(&op).expect("opcode should decode");
        operation(&op, state)
    }

    fn run(op: u16, state: &State) -> State {
        execute(op, state).expect("opcode should execute")
    }

    #[test]
    fn test_unknown_opcodes_dont_decode() {
        let unknown: [u16; 9] = [
            0x0000, 0x0123, 0x00E1, 0x5121, 0x8128, 0x912F, 0xE100, 0xF100, 0xFFFF,
        ];
        for op in unknown.iter() {
            assert!(from_op(op).is_none(), "{:#06X} decoded", op);
        }
    }

    #[test]
    fn test_00e0_cls() {
        let mut state = State::new();
        state.frame_buffer[0][0] = true;
        let state = run(0x00E0, &state);
        assert!(!state.frame_buffer[0][0]);
        assert!(state.draw_flag);
        assert_eq!(state.pc, 0x202);
    }

    #[test]
    fn test_00ee_ret() {
        let mut state = State::new();
        state.sp = 0x1;
        state.stack[0x0] = 0x0ABC;
        let state = run(0x00EE, &state);
        assert_eq!(state.sp, 0x0);
        assert_eq!(state.pc, 0x0ABC);
    }

    #[test]
    fn test_00ee_ret_underflows() {
        let state = State::new();
        assert_eq!(execute(0x00EE, &state), Err(Chip8Error::StackUnderflow { pc: 0x200 }));
    }

    #[test]
    fn test_1nnn_jp() {
        let state = run(0x1ABC, &State::new());
        assert_eq!(state.pc, 0x0ABC);
    }

    #[test]
    fn test_2nnn_call() {
        let mut state = State::new();
        state.pc = 0x0ABC;
        let state = run(0x2123, &state);
        assert_eq!(state.sp, 0x1);
        assert_eq!(state.stack[0x0], 0x0ABE);
        assert_eq!(state.pc, 0x0123);
    }

    #[test]
    fn test_2nnn_call_overflows() {
        let mut state = State::new();
        state.sp = 16;
        assert_eq!(execute(0x2123, &state), Err(Chip8Error::StackOverflow { pc: 0x200 }));
    }

    #[test]
    fn test_2nnn_call_fills_stack() {
        let mut state = State::new();
        for depth in 0..16 {
            state = run(0x2200, &state);
            assert_eq!(state.sp, depth + 1);
        }
        assert!(execute(0x2200, &state).is_err());
    }

    #[test]
    fn test_3xnn_se_skips() {
        let mut state = State::new();
        state.v[0x1] = 0x11;
        assert_eq!(run(0x3111, &state).pc, 0x0204);
    }

    #[test]
    fn test_3xnn_se_doesntskip() {
        assert_eq!(run(0x3111, &State::new()).pc, 0x0202);
    }

    #[test]
    fn test_4xnn_sne_skips() {
        assert_eq!(run(0x4111, &State::new()).pc, 0x0204);
    }

    #[test]
    fn test_4xnn_sne_doesntskip() {
        let mut state = State::new();
        state.v[0x1] = 0x11;
        assert_eq!(run(0x4111, &state).pc, 0x0202);
    }

    #[test]
    fn test_5xy0_se_skips() {
        let mut state = State::new();
        state.v[0x1] = 0x11;
        state.v[0x2] = 0x11;
        assert_eq!(run(0x5120, &state).pc, 0x0204);
    }

    #[test]
    fn test_5xy0_se_doesntskip() {
        let mut state = State::new();
        state.v[0x1] = 0x11;
        assert_eq!(run(0x5120, &state).pc, 0x0202);
    }

    #[test]
    fn test_6xnn_ld() {
        let state = run(0x6122, &State::new());
        assert_eq!(state.v[0x1], 0x22);
        assert_eq!(state.pc, 0x0202);
    }

    #[test]
    fn test_7xnn_add_wraps_without_flag() {
        let mut state = State::new();
        state.v[0x1] = 0xFF;
        state.v[0xF] = 0x7;
        let state = run(0x7102, &state);
        assert_eq!(state.v[0x1], 0x01);
        assert_eq!(state.v[0xF], 0x7);
    }

    #[test]
    fn test_8xy0_ld() {
        let mut state = State::new();
        state.v[0x2] = 0x1;
        assert_eq!(run(0x8120, &state).v[0x1], 0x1);
    }

    #[test]
    fn test_8xy1_or() {
        let mut state = State::new();
        state.v[0x1] = 0x6;
        state.v[0x2] = 0x3;
        assert_eq!(run(0x8121, &state).v[0x1], 0x7);
    }

    #[test]
    fn test_8xy2_and() {
        let mut state = State::new();
        state.v[0x1] = 0x6;
        state.v[0x2] = 0x3;
        assert_eq!(run(0x8122, &state).v[0x1], 0x2);
    }

    #[test]
    fn test_8xy3_xor() {
        let mut state = State::new();
        state.v[0x1] = 0x6;
        state.v[0x2] = 0x3;
        state.v[0xF] = 0x9;
        let state = run(0x8123, &state);
        assert_eq!(state.v[0x1], 0x5);
        assert_eq!(state.v[0xF], 0x9);
    }

    #[test]
    fn test_8xy4_add_nocarry() {
        let mut state = State::new();
        state.v[0x1] = 0xEE;
        state.v[0x2] = 0x11;
        let state = run(0x8124, &state);
        assert_eq!(state.v[0x1], 0xFF);
        assert_eq!(state.v[0xF], 0x0);
    }

    #[test]
    fn test_8xy4_add_carry() {
        let mut state = State::new();
        state.v[0x1] = 0xFF;
        state.v[0x2] = 0x11;
        let state = run(0x8124, &state);
        assert_eq!(state.v[0x1], 0x10);
        assert_eq!(state.v[0xF], 0x1);
    }

    #[test]
    fn test_8xf4_flag_wins_over_result() {
        let mut state = State::new();
        state.v[0xF] = 0xFF;
        state.v[0x1] = 0x01;
        let state = run(0x8F14, &state);
        assert_eq!(state.v[0xF], 0x1);
    }

    #[test]
    fn test_8xy5_sub_noborrow() {
        let mut state = State::new();
        state.v[0x1] = 0x33;
        state.v[0x2] = 0x11;
        let state = run(0x8125, &state);
        assert_eq!(state.v[0x1], 0x22);
        assert_eq!(state.v[0xF], 0x1);
    }

    #[test]
    fn test_8xy5_sub_equal_is_noborrow() {
        let mut state = State::new();
        state.v[0x1] = 0x33;
        state.v[0x2] = 0x33;
        let state = run(0x8125, &state);
        assert_eq!(state.v[0x1], 0x0);
        assert_eq!(state.v[0xF], 0x1);
    }

    #[test]
    fn test_8xy5_sub_borrow() {
        let mut state = State::new();
        state.v[0x1] = 0x11;
        state.v[0x2] = 0x12;
        let state = run(0x8125, &state);
        assert_eq!(state.v[0x1], 0xFF);
        assert_eq!(state.v[0xF], 0x0);
    }

    #[test]
    fn test_8xy6_shr_lsb() {
        let mut state = State::new();
        state.v[0x1] = 0x5;
        let state = run(0x8106, &state);
        assert_eq!(state.v[0x1], 0x2);
        assert_eq!(state.v[0xF], 0x1);
    }

    #[test]
    fn test_8xy6_shr_nolsb() {
        let mut state = State::new();
        state.v[0x1] = 0x4;
        let state = run(0x8106, &state);
        assert_eq!(state.v[0x1], 0x2);
        assert_eq!(state.v[0xF], 0x0);
    }

    #[test]
    fn test_8xy7_subn_noborrow() {
        let mut state = State::new();
        state.v[0x1] = 0x11;
        state.v[0x2] = 0x33;
        let state = run(0x8127, &state);
        assert_eq!(state.v[0x1], 0x22);
        assert_eq!(state.v[0xF], 0x1);
    }

    #[test]
    fn test_8xy7_subn_borrow() {
        let mut state = State::new();
        state.v[0x1] = 0x12;
        state.v[0x2] = 0x11;
        let state = run(0x8127, &state);
        assert_eq!(state.v[0x1], 0xFF);
        assert_eq!(state.v[0xF], 0x0);
    }

    #[test]
    fn test_8xye_shl_msb() {
        let mut state = State::new();
        state.v[0x1] = 0xFF;
        let state = run(0x810E, &state);
        assert_eq!(state.v[0x1], 0xFE);
        assert_eq!(state.v[0xF], 0x1);
    }

    #[test]
    fn test_8xye_shl_nomsb() {
        let mut state = State::new();
        state.v[0x1] = 0x4;
        let state = run(0x810E, &state);
        assert_eq!(state.v[0x1], 0x8);
        assert_eq!(state.v[0xF], 0x0);
    }

    #[test]
    fn test_9xy0_sne_skips() {
        let mut state = State::new();
        state.v[0x1] = 0x11;
        assert_eq!(run(0x9120, &state).pc, 0x0204);
    }

    #[test]
    fn test_9xy0_sne_doesntskip() {
        let mut state = State::new();
        state.v[0x1] = 0x11;
        state.v[0x2] = 0x11;
        assert_eq!(run(0x9120, &state).pc, 0x0202);
    }

    #[test]
    fn test_annn_ld() {
        assert_eq!(run(0xAABC, &State::new()).i, 0xABC);
    }

    #[test]
    fn test_bnnn_jp() {
        let mut state = State::new();
        state.v[0x0] = 0x2;
        assert_eq!(run(0xBABC, &state).pc, 0xABE);
    }

    #[test]
    fn test_cxnn_rnd_masks() {
        for _ in 0..32 {
            let state = run(0xC10F, &State::new());
            assert_eq!(state.v[0x1] & 0xF0, 0x0);
        }
        assert_eq!(run(0xC100, &State::new()).v[0x1], 0x0);
    }

    #[test]
    fn test_dxyn_drw_draws() {
        let mut state = State::new();
        state.v[0x0] = 0x1;
        // Draw the 0x0 glyph with a 1x 1y offset
        let state = run(0xD005, &state);
        let mut expected: FrameBuffer = [[false; DISPLAY_WIDTH]; DISPLAY_HEIGHT];
        let glyph = [
            [true, true, true, true],
            [true, false, false, true],
            [true, false, false, true],
            [true, false, false, true],
            [true, true, true, true],
        ];
        for (row, pixels) in glyph.iter().enumerate() {
            expected[row + 1][1..5].copy_from_slice(pixels);
        }
        assert_eq!(state.frame_buffer, expected);
        assert_eq!(state.v[0xF], 0x0);
        assert!(state.draw_flag);
    }

    #[test]
    fn test_dxyn_drw_collides() {
        let mut state = State::new();
        state.frame_buffer[0][0] = true;
        let state = run(0xD001, &state);
        assert_eq!(state.v[0xF], 0x1);
        assert!(!state.frame_buffer[0][0]);
    }

    #[test]
    fn test_dxyn_drw_xors() {
        let mut state = State::new();
        state.memory[0x300] = 0b0011_0000;
        state.i = 0x300;
        state.frame_buffer[0][0..4].copy_from_slice(&[false, true, false, true]);
        let state = run(0xD001, &state);
        assert_eq!(state.frame_buffer[0][0..4], [false, true, true, false]);
        assert_eq!(state.v[0xF], 0x1);
    }

    #[test]
    fn test_dxyn_drw_wraps() {
        let mut state = State::new();
        state.memory[0x300] = 0xFF;
        state.memory[0x301] = 0x80;
        state.i = 0x300;
        state.v[0x1] = 60;
        state.v[0x2] = 31;
        let state = run(0xD122, &state);
        assert!(state.frame_buffer[31][60..64].iter().all(|&p| p));
        assert!(state.frame_buffer[31][0..4].iter().all(|&p| p));
        assert!(state.frame_buffer[0][60]);
        assert!(!state.frame_buffer[0][61]);
    }

    #[test]
    fn test_dxyn_drw_blank_sprite_isnt_dirty() {
        let mut state = State::new();
        state.i = 0x300;
        let state = run(0xD005, &state);
        assert!(!state.draw_flag);
        assert_eq!(state.v[0xF], 0x0);
    }

    #[test]
    fn test_ex9e_skp_skips() {
        let mut state = State::new();
        state.pressed_keys[0xE] = true;
        state.v[0x1] = 0xE;
        assert_eq!(run(0xE19E, &state).pc, 0x0204);
    }

    #[test]
    fn test_ex9e_skp_doesntskip() {
        assert_eq!(run(0xE19E, &State::new()).pc, 0x0202);
    }

    #[test]
    fn test_ex9e_skp_masks_high_vx() {
        let mut state = State::new();
        state.pressed_keys[0xE] = true;
        // Only the low nibble selects the key
        state.v[0x1] = 0x1E;
        assert_eq!(run(0xE19E, &state).pc, 0x0204);
    }

    #[test]
    fn test_exa1_sknp_skips() {
        assert_eq!(run(0xE1A1, &State::new()).pc, 0x0204);
    }

    #[test]
    fn test_exa1_sknp_doesntskip() {
        let mut state = State::new();
        state.pressed_keys[0xE] = true;
        state.v[0x1] = 0xE;
        assert_eq!(run(0xE1A1, &state).pc, 0x0202);
    }

    #[test]
    fn test_exa1_sknp_masks_high_vx() {
        let mut state = State::new();
        state.pressed_keys[0xE] = true;
        state.v[0x1] = 0x1E;
        assert_eq!(run(0xE1A1, &state).pc, 0x0202);
    }

    #[test]
    fn test_fx07_ld() {
        let mut state = State::new();
        state.delay_timer = 0xF;
        assert_eq!(run(0xF107, &state).v[0x1], 0xF);
    }

    #[test]
    fn test_fx0a_ld_setsregisterneedingkey() {
        let state = run(0xF10A, &State::new());
        assert_eq!(state.register_needing_key, Some(0x1));
        assert_eq!(state.pc, 0x0202);
    }

    #[test]
    fn test_fx15_ld() {
        let mut state = State::new();
        state.v[0x1] = 0xF;
        assert_eq!(run(0xF115, &state).delay_timer, 0xF);
    }

    #[test]
    fn test_fx18_ld() {
        let mut state = State::new();
        state.v[0x1] = 0xF;
        assert_eq!(run(0xF118, &state).sound_timer, 0xF);
    }

    #[test]
    fn test_fx1e_add() {
        let mut state = State::new();
        state.i = 0x1;
        state.v[0x1] = 0x1;
        state.v[0xF] = 0x3;
        let state = run(0xF11E, &state);
        assert_eq!(state.i, 0x2);
        assert_eq!(state.v[0xF], 0x3);
    }

    #[test]
    fn test_fx1e_add_doesnt_mask_i() {
        let mut state = State::new();
        state.i = 0xFFF;
        state.v[0x0] = 0x5;
        assert_eq!(run(0xF01E, &state).i, 0x1004);
    }

    #[test]
    fn test_fx29_ld() {
        let mut state = State::new();
        state.v[0x1] = 0xA;
        assert_eq!(run(0xF129, &state).i, 0x32);
    }

    #[test]
    fn test_fx33_ld() {
        let mut state = State::new();
        state.v[0x1] = 157;
        state.i = 0x300;
        let state = run(0xF133, &state);
        assert_eq!(state.memory[0x300..0x303], [0x1, 0x5, 0x7]);
        assert_eq!(state.i, 0x300);
    }

    #[test]
    fn test_fx55_ld() {
        let mut state = State::new();
        state.i = 0x300;
        state.v[0x0..0x5].copy_from_slice(&[0x1, 0x2, 0x3, 0x4, 0x5]);
        let state = run(0xF455, &state);
        assert_eq!(state.memory[0x300..0x306], [0x1, 0x2, 0x3, 0x4, 0x5, 0x0]);
        assert_eq!(state.i, 0x305);
    }

    #[test]
    fn test_fx65_ld() {
        let mut state = State::new();
        state.i = 0x300;
        state.memory[0x300..0x306].copy_from_slice(&[0x1, 0x2, 0x3, 0x4, 0x5, 0x6]);
        let state = run(0xF465, &state);
        assert_eq!(state.v[0x0..0x6], [0x1, 0x2, 0x3, 0x4, 0x5, 0x0]);
        assert_eq!(state.i, 0x305);
    }
}
