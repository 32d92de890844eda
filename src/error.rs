use thiserror::Error;

/// Conditions that halt execution. The failing instruction leaves the
/// machine untouched, so the state seen afterwards is the state it failed in.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum EngineError {
    #[error("unrecognized opcode {0:#06X}")]
    UnknownOpcode(u16),
    #[error("instruction fetch at {address:#06X} is outside memory")]
    FetchOutOfBounds { address: u16 },
    #[error("call stack overflow at pc {pc:#05X}")]
    StackOverflow { pc: u16 },
    #[error("call stack underflow at pc {pc:#05X}")]
    StackUnderflow { pc: u16 },
    #[error("call stack pointer {pointer} is past the stack at pc {pc:#05X}")]
    StackPointerOutOfRange { pc: u16, pointer: usize },
    #[error("register V{register:X} holds {value:#04X}, which is not a key")]
    InvalidKeyIndex { register: usize, value: u8 },
    #[error("memory access at {address:#06X} is outside memory")]
    MemoryOutOfBounds { address: usize },
}

#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyError {
    #[error("key code {0:#04X} is outside 0x0..=0xF")]
    OutOfRange(u8),
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ProgramError {
    #[error("program is {size} bytes, at most {max} fit in memory")]
    TooLarge { size: usize, max: usize },
}

/// Reasons a scheduler could not be set up.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SetupError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error(transparent)]
    Program(#[from] ProgramError),
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    #[error("frame rate must be above zero")]
    ZeroFrameRate,
    #[error("clock rate {clock_rate} Hz is below the frame rate {frame_rate} Hz")]
    ClockBelowFrameRate { clock_rate: u32, frame_rate: u32 },
    #[error("font at {0:#05X} does not fit below the program area")]
    FontOutOfRange(u16),
}
