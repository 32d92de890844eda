use std::fmt;

/// Register-to-register ALU operations of the 8XYN family.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RegistersOp {
    /// 8XY0
    SetToSecond,
    /// 8XY1
    BitwiseOr,
    /// 8XY2
    BitwiseAnd,
    /// 8XY3
    BitwiseXor,
    /// 8XY4, VF = carry
    Addition,
    /// 8XY5, VX = VX - VY, VF = no borrow
    SubtractSecondFromFirst,
    /// 8XY7, VX = VY - VX, VF = no borrow
    SubtractFirstFromSecond,
    /// 8XY6, VF = bit shifted out
    ShiftRight,
    /// 8XYE, VF = bit shifted out
    ShiftLeft,
}

/// A decoded instruction. Operands are register indices (`0..16`),
/// immediates or 12-bit addresses; nothing about where it was fetched from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operation {
    /// 00E0
    ClearScreen,
    /// 1NNN
    JumpToAddress(u16),
    /// BNNN
    JumpToAddressPlusV0(u16),
    /// 2NNN
    CallSubroutine(u16),
    /// 00EE
    ReturnFromSubroutine,
    /// 3XNN (equal) / 4XNN (not equal)
    ConditionalSkipRegisterValue { register: usize, value: u8, is_equal: bool },
    /// 5XY0 (equal) / 9XY0 (not equal)
    ConditionalSkipRegisters { x: usize, y: usize, is_equal: bool },
    /// EX9E (expect down) / EXA1 (expect up)
    ConditionalSkipKeyDown { register: usize, expect_down: bool },
    /// FX0A
    ConditionalPauseUntilKeyTap(usize),
    /// 6XNN
    SetValueToRegister { register: usize, value: u8 },
    /// 7XNN
    AddValueToRegister { register: usize, value: u8 },
    /// ANNN
    SetValueToIndexRegister(u16),
    /// CXNN
    SetValueToRegisterWithRandomness { register: usize, value: u8 },
    /// FX1E
    AddRegisterValueToIndexRegister(usize),
    /// FX29
    SetFontCharacterAddressToIndexRegister(usize),
    /// 8XYN
    RegistersOperation { x: usize, y: usize, op: RegistersOp },
    /// FX55 (store) / FX65 (restore)
    RegistersStorage { max_register: usize, is_restoring: bool },
    /// FX33
    RegisterStoreDecimalDigits(usize),
    /// FX07
    DelayTimerStore(usize),
    /// FX15
    DelayTimerSet(usize),
    /// FX18
    SoundTimerSet(usize),
    /// DXYN
    DrawSprite { height: u8, x: usize, y: usize },
    Unknown(u16),
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match *self {
            Operation::ClearScreen => write!(f, "CLS"),
            Operation::JumpToAddress(addr) => write!(f, "JP {addr:#05X}"),
            Operation::JumpToAddressPlusV0(addr) => write!(f, "JP V0, {addr:#05X}"),
            Operation::CallSubroutine(addr) => write!(f, "CALL {addr:#05X}"),
            Operation::ReturnFromSubroutine => write!(f, "RET"),
            Operation::ConditionalSkipRegisterValue { register, value, is_equal } => {
                let mnemonic = if is_equal { "SE" } else { "SNE" };
                write!(f, "{mnemonic} V{register:X}, {value:#04X}")
            }
            Operation::ConditionalSkipRegisters { x, y, is_equal } => {
                let mnemonic = if is_equal { "SE" } else { "SNE" };
                write!(f, "{mnemonic} V{x:X}, V{y:X}")
            }
            Operation::ConditionalSkipKeyDown { register, expect_down } => {
                let mnemonic = if expect_down { "SKP" } else { "SKNP" };
                write!(f, "{mnemonic} V{register:X}")
            }
            Operation::ConditionalPauseUntilKeyTap(register) => write!(f, "LD V{register:X}, K"),
            Operation::SetValueToRegister { register, value } => {
                write!(f, "LD V{register:X}, {value:#04X}")
            }
            Operation::AddValueToRegister { register, value } => {
                write!(f, "ADD V{register:X}, {value:#04X}")
            }
            Operation::SetValueToIndexRegister(addr) => write!(f, "LD I, {addr:#05X}"),
            Operation::SetValueToRegisterWithRandomness { register, value } => {
                write!(f, "RND V{register:X}, {value:#04X}")
            }
            Operation::AddRegisterValueToIndexRegister(register) => write!(f, "ADD I, V{register:X}"),
            Operation::SetFontCharacterAddressToIndexRegister(register) => {
                write!(f, "LD F, V{register:X}")
            }
            Operation::RegistersOperation { x, y, op } => {
                let mnemonic = match op {
                    RegistersOp::SetToSecond => "LD",
                    RegistersOp::BitwiseOr => "OR",
                    RegistersOp::BitwiseAnd => "AND",
                    RegistersOp::BitwiseXor => "XOR",
                    RegistersOp::Addition => "ADD",
                    RegistersOp::SubtractSecondFromFirst => "SUB",
                    RegistersOp::SubtractFirstFromSecond => "SUBN",
                    RegistersOp::ShiftRight => "SHR",
                    RegistersOp::ShiftLeft => "SHL",
                };
                write!(f, "{mnemonic} V{x:X}, V{y:X}")
            }
            Operation::RegistersStorage { max_register, is_restoring: false } => {
                write!(f, "LD [I], V{max_register:X}")
            }
            Operation::RegistersStorage { max_register, is_restoring: true } => {
                write!(f, "LD V{max_register:X}, [I]")
            }
            Operation::RegisterStoreDecimalDigits(register) => write!(f, "LD B, V{register:X}"),
            Operation::DelayTimerStore(register) => write!(f, "LD V{register:X}, DT"),
            Operation::DelayTimerSet(register) => write!(f, "LD DT, V{register:X}"),
            Operation::SoundTimerSet(register) => write!(f, "LD ST, V{register:X}"),
            Operation::DrawSprite { height, x, y } => write!(f, "DRW V{x:X}, V{y:X}, {height}"),
            Operation::Unknown(word) => write!(f, "??? {word:#06X}"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_mnemonics() {
        assert_eq!(Operation::ClearScreen.to_string(), "CLS");
        assert_eq!(Operation::JumpToAddress(0x2A8).to_string(), "JP 0x2A8");
        assert_eq!(
            Operation::DrawSprite { height: 5, x: 1, y: 0xA }.to_string(),
            "DRW V1, VA, 5"
        );
        assert_eq!(
            Operation::RegistersOperation { x: 3, y: 4, op: RegistersOp::SubtractFirstFromSecond }
                .to_string(),
            "SUBN V3, V4"
        );
        assert_eq!(Operation::Unknown(0x5AB1).to_string(), "??? 0x5AB1");
    }
}
