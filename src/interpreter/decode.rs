use super::operation::{Operation, RegistersOp};

/// Split an instruction word into its four nibbles, high to low.
fn nibbles(word: u16) -> (u8, u8, u8, u8) {
    (
        ((word & 0xF000) >> 12) as u8,
        ((word & 0x0F00) >> 8) as u8,
        ((word & 0x00F0) >> 4) as u8,
        (word & 0x000F) as u8,
    )
}

fn nnn(word: u16) -> u16 {
    word & 0x0FFF
}

fn nn(word: u16) -> u8 {
    (word & 0x00FF) as u8
}

/// Decode a big-endian instruction word. Never fails: anything that is not
/// a known CHIP-8 instruction becomes `Operation::Unknown`.
pub fn decode(word: u16) -> Operation {
    // Zero-operand opcodes share the 0x0 nibble with 0NNN and must win.
    match word {
        0x00E0 => return Operation::ClearScreen,
        0x00EE => return Operation::ReturnFromSubroutine,
        _ => {}
    }

    let (x, y) = (((word & 0x0F00) >> 8) as usize, ((word & 0x00F0) >> 4) as usize);

    match nibbles(word) {
        (0x1, _, _, _) => Operation::JumpToAddress(nnn(word)),
        (0x2, _, _, _) => Operation::CallSubroutine(nnn(word)),
        (0x3, _, _, _) => Operation::ConditionalSkipRegisterValue {
            register: x,
            value: nn(word),
            is_equal: true,
        },
        (0x4, _, _, _) => Operation::ConditionalSkipRegisterValue {
            register: x,
            value: nn(word),
            is_equal: false,
        },
        (0x5, _, _, 0x0) => Operation::ConditionalSkipRegisters { x, y, is_equal: true },
        (0x6, _, _, _) => Operation::SetValueToRegister { register: x, value: nn(word) },
        (0x7, _, _, _) => Operation::AddValueToRegister { register: x, value: nn(word) },
        (0x8, _, _, n) => match n {
            0x0 => registers_op(x, y, RegistersOp::SetToSecond),
            0x1 => registers_op(x, y, RegistersOp::BitwiseOr),
            0x2 => registers_op(x, y, RegistersOp::BitwiseAnd),
            0x3 => registers_op(x, y, RegistersOp::BitwiseXor),
            0x4 => registers_op(x, y, RegistersOp::Addition),
            0x5 => registers_op(x, y, RegistersOp::SubtractSecondFromFirst),
            0x6 => registers_op(x, y, RegistersOp::ShiftRight),
            0x7 => registers_op(x, y, RegistersOp::SubtractFirstFromSecond),
            0xE => registers_op(x, y, RegistersOp::ShiftLeft),
            _ => Operation::Unknown(word),
        },
        (0x9, _, _, 0x0) => Operation::ConditionalSkipRegisters { x, y, is_equal: false },
        (0xA, _, _, _) => Operation::SetValueToIndexRegister(nnn(word)),
        (0xB, _, _, _) => Operation::JumpToAddressPlusV0(nnn(word)),
        (0xC, _, _, _) => Operation::SetValueToRegisterWithRandomness {
            register: x,
            value: nn(word),
        },
        (0xD, _, _, n) => Operation::DrawSprite { height: n, x, y },
        (0xE, _, 0x9, 0xE) => Operation::ConditionalSkipKeyDown { register: x, expect_down: true },
        (0xE, _, 0xA, 0x1) => Operation::ConditionalSkipKeyDown { register: x, expect_down: false },
        (0xF, _, 0x0, 0x7) => Operation::DelayTimerStore(x),
        (0xF, _, 0x0, 0xA) => Operation::ConditionalPauseUntilKeyTap(x),
        (0xF, _, 0x1, 0x5) => Operation::DelayTimerSet(x),
        (0xF, _, 0x1, 0x8) => Operation::SoundTimerSet(x),
        (0xF, _, 0x1, 0xE) => Operation::AddRegisterValueToIndexRegister(x),
        (0xF, _, 0x2, 0x9) => Operation::SetFontCharacterAddressToIndexRegister(x),
        (0xF, _, 0x3, 0x3) => Operation::RegisterStoreDecimalDigits(x),
        (0xF, _, 0x5, 0x5) => Operation::RegistersStorage { max_register: x, is_restoring: false },
        (0xF, _, 0x6, 0x5) => Operation::RegistersStorage { max_register: x, is_restoring: true },
        _ => Operation::Unknown(word),
    }
}

fn registers_op(x: usize, y: usize, op: RegistersOp) -> Operation {
    Operation::RegistersOperation { x, y, op }
}
