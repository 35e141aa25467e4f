use log::error;

use crate::constants::{DISPLAY_HEIGHT, DISPLAY_WIDTH, FONT_SPRITE_SIZE, STACK_SIZE};
use crate::error::Chip8Error;
use crate::opcode::Opcode;
use crate::state::{FrameBuffer, State};

/// The address of the instruction following the current one
fn next(state: &State) -> u16 {
    state.pc.wrapping_add(0x2)
}

/// Steps over the following instruction when `condition` holds
fn skip_if(state: &State, condition: bool) -> Result<State, Chip8Error> {
    let pc = if condition {
        state.pc.wrapping_add(0x4)
    } else {
        next(state)
    };
    Ok(State { pc, ..*state })
}

/// Writes `value` to Vx and moves on
fn set_vx(op: &dyn Opcode, state: &State, value: u8) -> Result<State, Chip8Error> {
    let mut v = state.v;
    v[op.x()] = value;
    Ok(State {
        pc: next(state),
        v,
        ..*state
    })
}

/// Writes `value` to Vx, then `flag` to VF
fn set_vx_with_flag(
    op: &dyn Opcode,
    state: &State,
    value: u8,
    flag: bool,
) -> Result<State, Chip8Error> {
    let mut v = state.v;
    v[op.x()] = value;
    v[0xF] = u8::from(flag);
    Ok(State {
        pc: next(state),
        v,
        ..*state
    })
}

/// clear
pub fn cls(_op: &dyn Opcode, state: &State) -> Result<State, Chip8Error> {
    Ok(State {
        pc: next(state),
        frame_buffer: [[false; DISPLAY_WIDTH]; DISPLAY_HEIGHT],
        draw_flag: true,
        ..*state
    })
}

/// PC = STACK.pop()
pub fn ret(_op: &dyn Opcode, state: &State) -> Result<State, Chip8Error> {
    if state.sp == 0 {
        error!("stack underflow at {:#05X}", state.pc);
        return Err(Chip8Error::StackUnderflow { pc: state.pc });
    }
    let sp = state.sp - 1;
    Ok(State {
        pc: state.stack[sp],
        sp,
        ..*state
    })
}

/// PC = addr
pub fn jump(op: &dyn Opcode, state: &State) -> Result<State, Chip8Error> {
    Ok(State {
        pc: op.nnn(),
        ..*state
    })
}

/// STACK.push(PC + 2); PC = addr
pub fn call(op: &dyn Opcode, state: &State) -> Result<State, Chip8Error> {
    if state.sp >= STACK_SIZE {
        error!("stack overflow at {:#05X}", state.pc);
        return Err(Chip8Error::StackOverflow { pc: state.pc });
    }
    let mut stack = state.stack;
    stack[state.sp] = next(state);
    Ok(State {
        pc: op.nnn(),
        sp: state.sp + 1,
        stack,
        ..*state
    })
}

/// if Vx == nn then skip
pub fn ske(op: &dyn Opcode, state: &State) -> Result<State, Chip8Error> {
    skip_if(state, state.v[op.x()] == op.nn())
}

/// if Vx != nn then skip
pub fn skne(op: &dyn Opcode, state: &State) -> Result<State, Chip8Error> {
    skip_if(state, state.v[op.x()] != op.nn())
}

/// if Vx == Vy then skip
pub fn skre(op: &dyn Opcode, state: &State) -> Result<State, Chip8Error> {
    skip_if(state, state.v[op.x()] == state.v[op.y()])
}

/// if Vx != Vy then skip
pub fn skrne(op: &dyn Opcode, state: &State) -> Result<State, Chip8Error> {
    skip_if(state, state.v[op.x()] != state.v[op.y()])
}

/// Vx = nn
pub fn load(op: &dyn Opcode, state: &State) -> Result<State, Chip8Error> {
    set_vx(op, state, op.nn())
}

/// Vx += nn; VF untouched
pub fn add(op: &dyn Opcode, state: &State) -> Result<State, Chip8Error> {
    set_vx(op, state, state.v[op.x()].wrapping_add(op.nn()))
}

/// Vx = Vy
pub fn mv(op: &dyn Opcode, state: &State) -> Result<State, Chip8Error> {
    set_vx(op, state, state.v[op.y()])
}

/// Vx |= Vy
pub fn or(op: &dyn Opcode, state: &State) -> Result<State, Chip8Error> {
    set_vx(op, state, state.v[op.x()] | state.v[op.y()])
}

/// Vx &= Vy
pub fn and(op: &dyn Opcode, state: &State) -> Result<State, Chip8Error> {
    set_vx(op, state, state.v[op.x()] & state.v[op.y()])
}

/// Vx ^= Vy
pub fn xor(op: &dyn Opcode, state: &State) -> Result<State, Chip8Error> {
    set_vx(op, state, state.v[op.x()] ^ state.v[op.y()])
}

/// Vx += Vy; VF = carry
pub fn addr(op: &dyn Opcode, state: &State) -> Result<State, Chip8Error> {
    let (res, carry) = state.v[op.x()].overflowing_add(state.v[op.y()]);
    set_vx_with_flag(op, state, res, carry)
}

/// Vx -= Vy; VF = !borrow
pub fn sub(op: &dyn Opcode, state: &State) -> Result<State, Chip8Error> {
    let (res, borrow) = state.v[op.x()].overflowing_sub(state.v[op.y()]);
    set_vx_with_flag(op, state, res, !borrow)
}

/// Vx >>= 1; VF = shifted out bit
pub fn shr(op: &dyn Opcode, state: &State) -> Result<State, Chip8Error> {
    let vx = state.v[op.x()];
    set_vx_with_flag(op, state, vx >> 1, vx & 0x1 == 0x1)
}

/// Vx = Vy - Vx; VF = !borrow
pub fn subn(op: &dyn Opcode, state: &State) -> Result<State, Chip8Error> {
    let (res, borrow) = state.v[op.y()].overflowing_sub(state.v[op.x()]);
    set_vx_with_flag(op, state, res, !borrow)
}

/// Vx <<= 1; VF = shifted out bit
pub fn shl(op: &dyn Opcode, state: &State) -> Result<State, Chip8Error> {
    let vx = state.v[op.x()];
    set_vx_with_flag(op, state, vx << 1, vx >> 7 == 0x1)
}

/// I = addr
pub fn loadi(op: &dyn Opcode, state: &State) -> Result<State, Chip8Error> {
    Ok(State {
        pc: next(state),
        i: op.nnn(),
        ..*state
    })
}

/// PC = V0 + addr
pub fn jumpi(op: &dyn Opcode, state: &State) -> Result<State, Chip8Error> {
    Ok(State {
        pc: op.nnn() + u16::from(state.v[0x0]),
        ..*state
    })
}

/// Vx = rand_byte & nn
pub fn rand(op: &dyn Opcode, state: &State) -> Result<State, Chip8Error> {
    let rand_byte: u8 = rand::random();
    set_vx(op, state, rand_byte & op.nn())
}

/// draw_sprite(x=Vx y=Vy height=n)
/// XORs the sprite stored at I..I+n onto the FrameBuffer at (Vx, Vy).
/// Pixels running off an edge wrap around to the opposite one.
/// VF is set if any lit pixel was erased.
pub fn draw(op: &dyn Opcode, state: &State) -> Result<State, Chip8Error> {
    let mut frame_buffer: FrameBuffer = state.frame_buffer;
    let origin_x = usize::from(state.v[op.x()]);
    let origin_y = usize::from(state.v[op.y()]);
    let mut collision = false;
    let mut changed = false;

    for row in 0..op.n() {
        let sprite_row = state.read(state.i.wrapping_add(u16::from(row)));
        let y = (origin_y + usize::from(row)) % DISPLAY_HEIGHT;
        for bit in 0..8 {
            if (sprite_row >> (7 - bit)) & 0x1 == 0 {
                continue;
            }
            let x = (origin_x + bit) % DISPLAY_WIDTH;
            collision |= frame_buffer[y][x];
            frame_buffer[y][x] ^= true;
            changed = true;
        }
    }

    let mut v = state.v;
    v[0xF] = u8::from(collision);
    Ok(State {
        pc: next(state),
        v,
        frame_buffer,
        draw_flag: state.draw_flag || changed,
        ..*state
    })
}

/// if Vx.pressed then skip
pub fn skpr(op: &dyn Opcode, state: &State) -> Result<State, Chip8Error> {
    skip_if(state, state.is_pressed(state.v[op.x()]))
}

/// if !Vx.pressed then skip
pub fn skup(op: &dyn Opcode, state: &State) -> Result<State, Chip8Error> {
    skip_if(state, !state.is_pressed(state.v[op.x()]))
}

/// Vx = DT
pub fn moved(op: &dyn Opcode, state: &State) -> Result<State, Chip8Error> {
    set_vx(op, state, state.delay_timer)
}

/// await keypress for Vx
/// The pc moves on straight away; execution is held back by `register_needing_key`.
pub fn keyd(op: &dyn Opcode, state: &State) -> Result<State, Chip8Error> {
    Ok(State {
        pc: next(state),
        register_needing_key: Some(op.x()),
        ..*state
    })
}

/// DT = Vx
pub fn loads(op: &dyn Opcode, state: &State) -> Result<State, Chip8Error> {
    Ok(State {
        pc: next(state),
        delay_timer: state.v[op.x()],
        ..*state
    })
}

/// ST = Vx
pub fn ld(op: &dyn Opcode, state: &State) -> Result<State, Chip8Error> {
    Ok(State {
        pc: next(state),
        sound_timer: state.v[op.x()],
        ..*state
    })
}

/// I += Vx
pub fn addi(op: &dyn Opcode, state: &State) -> Result<State, Chip8Error> {
    Ok(State {
        pc: next(state),
        i: state.i.wrapping_add(u16::from(state.v[op.x()])),
        ..*state
    })
}

/// I = Vx * 5
/// Set I to the address of the sprite sheet glyph for Vx
pub fn ldspr(op: &dyn Opcode, state: &State) -> Result<State, Chip8Error> {
    Ok(State {
        pc: next(state),
        i: u16::from(state.v[op.x()]) * FONT_SPRITE_SIZE,
        ..*state
    })
}

/// mem[I..I+3] = bcd(Vx)
/// Store the decimal digits of Vx, most significant first, starting at address I
pub fn bcd(op: &dyn Opcode, state: &State) -> Result<State, Chip8Error> {
    let vx = state.v[op.x()];
    let mut next_state = State {
        pc: next(state),
        ..*state
    };
    for (offset, digit) in [vx / 100, vx / 10 % 10, vx % 10].iter().enumerate() {
        next_state.write(state.i.wrapping_add(offset as u16), *digit);
    }
    Ok(next_state)
}

/// mem[I..=I+x] = V0..=Vx; I += x + 1
pub fn stor(op: &dyn Opcode, state: &State) -> Result<State, Chip8Error> {
    let mut next_state = State {
        pc: next(state),
        ..*state
    };
    for (offset, value) in state.v[..=op.x()].iter().enumerate() {
        next_state.write(state.i.wrapping_add(offset as u16), *value);
    }
    next_state.i = state.i.wrapping_add(op.x() as u16 + 1);
    Ok(next_state)
}

/// V0..=Vx = mem[I..=I+x]; I += x + 1
pub fn read(op: &dyn Opcode, state: &State) -> Result<State, Chip8Error> {
    let mut v = state.v;
    for (offset, register) in v[..=op.x()].iter_mut().enumerate() {
        *register = state.read(state.i.wrapping_add(offset as u16));
    }
    Ok(State {
        pc: next(state),
        i: state.i.wrapping_add(op.x() as u16 + 1),
        v,
        ..*state
    })
}
