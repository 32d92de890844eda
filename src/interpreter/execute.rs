use rand::{Rng, RngCore};

use super::operation::{Operation, RegistersOp};
use super::state::{
    MachineState, FLAG_REGISTER, FONT_GLYPH_SIZE, KEY_COUNT, MEMORY_SIZE, SCREEN_HEIGHT,
    SCREEN_WIDTH, STACK_SIZE,
};
use crate::error::EngineError;

/// Width of one instruction in memory.
const INSTRUCTION_SIZE: u16 = 2;

/// Apply one decoded operation to `state`.
///
/// Every check that can fail runs before the first write, so an `Err`
/// leaves `state` exactly as it was handed in.
pub fn execute<R>(op: Operation, state: &mut MachineState, rng: &mut R) -> Result<(), EngineError>
where
    R: RngCore + ?Sized,
{
    match op {
        Operation::ClearScreen => {
            state.screen.fill(false);
            advance(state);
        }
        Operation::JumpToAddress(addr) => {
            state.pc = addr;
        }
        Operation::JumpToAddressPlusV0(addr) => {
            state.pc = addr.wrapping_add(state.registers[0] as u16);
        }
        Operation::CallSubroutine(addr) => {
            if state.call_stack_pointer >= STACK_SIZE {
                return Err(EngineError::StackOverflow { pc: state.pc });
            }
            state.call_stack[state.call_stack_pointer] = state.pc.wrapping_add(INSTRUCTION_SIZE);
            state.call_stack_pointer += 1;
            state.pc = addr;
        }
        Operation::ReturnFromSubroutine => {
            if state.call_stack_pointer == 0 {
                return Err(EngineError::StackUnderflow { pc: state.pc });
            }
            if state.call_stack_pointer > STACK_SIZE {
                return Err(EngineError::StackPointerOutOfRange {
                    pc: state.pc,
                    pointer: state.call_stack_pointer,
                });
            }
            state.call_stack_pointer -= 1;
            state.pc = state.call_stack[state.call_stack_pointer];
            state.call_stack[state.call_stack_pointer] = 0;
        }
        Operation::ConditionalSkipRegisterValue { register, value, is_equal } => {
            let holds = (state.registers[register] == value) == is_equal;
            skip_if(state, holds);
        }
        Operation::ConditionalSkipRegisters { x, y, is_equal } => {
            let holds = (state.registers[x] == state.registers[y]) == is_equal;
            skip_if(state, holds);
        }
        Operation::ConditionalSkipKeyDown { register, expect_down } => {
            let value = state.registers[register];
            if value as usize >= KEY_COUNT {
                return Err(EngineError::InvalidKeyIndex { register, value });
            }
            let holds = state.keys[value as usize] == expect_down;
            skip_if(state, holds);
        }
        Operation::ConditionalPauseUntilKeyTap(register) => wait_for_key_tap(state, register),
        Operation::SetValueToRegister { register, value } => {
            state.registers[register] = value;
            advance(state);
        }
        Operation::AddValueToRegister { register, value } => {
            state.registers[register] = state.registers[register].wrapping_add(value);
            advance(state);
        }
        Operation::SetValueToIndexRegister(addr) => {
            state.index_register = addr;
            advance(state);
        }
        Operation::SetValueToRegisterWithRandomness { register, value } => {
            let random: u8 = rng.gen();
            state.registers[register] = value & random;
            advance(state);
        }
        Operation::AddRegisterValueToIndexRegister(register) => {
            state.index_register = state
                .index_register
                .wrapping_add(state.registers[register] as u16);
            advance(state);
        }
        Operation::SetFontCharacterAddressToIndexRegister(register) => {
            let glyph = state.registers[register] as u16;
            state.index_register = state.font_base.wrapping_add(glyph * FONT_GLYPH_SIZE);
            advance(state);
        }
        Operation::RegistersOperation { x, y, op } => {
            registers_operation(state, x, y, op);
            advance(state);
        }
        Operation::RegistersStorage { max_register, is_restoring } => {
            let start = state.index_register as usize;
            let count = max_register + 1;
            check_memory_range(start, count)?;
            if is_restoring {
                state.registers[..count].copy_from_slice(&state.memory[start..start + count]);
            } else {
                state.memory[start..start + count].copy_from_slice(&state.registers[..count]);
            }
            advance(state);
        }
        Operation::RegisterStoreDecimalDigits(register) => {
            let start = state.index_register as usize;
            check_memory_range(start, 3)?;
            let value = state.registers[register];
            state.memory[start] = value / 100;
            state.memory[start + 1] = (value / 10) % 10;
            state.memory[start + 2] = value % 10;
            advance(state);
        }
        Operation::DelayTimerStore(register) => {
            state.registers[register] = state.delay_timer;
            advance(state);
        }
        Operation::DelayTimerSet(register) => {
            state.delay_timer = state.registers[register];
            advance(state);
        }
        Operation::SoundTimerSet(register) => {
            state.sound_timer = state.registers[register];
            advance(state);
        }
        Operation::DrawSprite { height, x, y } => {
            draw_sprite(state, height as usize, x, y)?;
            advance(state);
        }
        Operation::Unknown(code) => return Err(EngineError::UnknownOpcode(code)),
    }
    Ok(())
}

fn advance(state: &mut MachineState) {
    state.pc = state.pc.wrapping_add(INSTRUCTION_SIZE);
}

fn skip_if(state: &mut MachineState, condition: bool) {
    let step = if condition { 2 * INSTRUCTION_SIZE } else { INSTRUCTION_SIZE };
    state.pc = state.pc.wrapping_add(step);
}

fn check_memory_range(start: usize, len: usize) -> Result<(), EngineError> {
    if start + len > MEMORY_SIZE {
        return Err(EngineError::MemoryOutOfBounds { address: start.max(MEMORY_SIZE) });
    }
    Ok(())
}

/// FX0A, polled once per cycle. `pc` only moves once a key has gone down
/// and come back up.
fn wait_for_key_tap(state: &mut MachineState, register: usize) {
    match state.pending_release_key {
        Some(key) => {
            let still_down = state.keys.get(key as usize).copied().unwrap_or(false);
            if !still_down {
                state.registers[register] = key;
                state.pending_release_key = None;
                advance(state);
            }
        }
        None => {
            if let Some(key) = state.keys.iter().position(|down| *down) {
                state.pending_release_key = Some(key as u8);
            }
        }
    }
}

/// Operands are read up front so VF can be an operand and still receive
/// the flag last.
fn registers_operation(state: &mut MachineState, x: usize, y: usize, op: RegistersOp) {
    let vx = state.registers[x];
    let vy = state.registers[y];

    let (result, flag) = match op {
        RegistersOp::SetToSecond => (vy, None),
        RegistersOp::BitwiseOr => (vx | vy, None),
        RegistersOp::BitwiseAnd => (vx & vy, None),
        RegistersOp::BitwiseXor => (vx ^ vy, None),
        RegistersOp::Addition => {
            let (sum, carry) = vx.overflowing_add(vy);
            (sum, Some(carry as u8))
        }
        RegistersOp::SubtractSecondFromFirst => {
            let (difference, borrow) = vx.overflowing_sub(vy);
            (difference, Some(!borrow as u8))
        }
        RegistersOp::SubtractFirstFromSecond => {
            let (difference, borrow) = vy.overflowing_sub(vx);
            (difference, Some(!borrow as u8))
        }
        RegistersOp::ShiftRight => (vx >> 1, Some(vx & 0x01)),
        RegistersOp::ShiftLeft => (vx << 1, Some((vx & 0x80) >> 7)),
    };

    state.registers[x] = result;
    if let Some(flag) = flag {
        state.registers[FLAG_REGISTER] = flag;
    }
}

/// XOR an 8 pixel wide sprite onto the screen, clipping at the edges.
/// VF ends up 1 if any lit pixel was switched off.
fn draw_sprite(
    state: &mut MachineState,
    height: usize,
    x: usize,
    y: usize,
) -> Result<(), EngineError> {
    let sprite_start = state.index_register as usize;
    check_memory_range(sprite_start, height)?;

    let origin_x = state.registers[x] as usize;
    let origin_y = state.registers[y] as usize;
    let mut collision = false;

    for row in 0..height {
        let py = origin_y + row;
        if py >= SCREEN_HEIGHT {
            break;
        }
        let line = state.memory[sprite_start + row];
        for col in 0..8 {
            let px = origin_x + col;
            if px >= SCREEN_WIDTH {
                break;
            }
            if line & (0x80 >> col) == 0 {
                continue;
            }
            let pixel = &mut state.screen[px + py * SCREEN_WIDTH];
            collision |= *pixel;
            *pixel = !*pixel;
        }
    }

    state.registers[FLAG_REGISTER] = collision as u8;
    Ok(())
}
