/// Addressable memory in bytes.
pub const MEMORY_SIZE: usize = 4096;
/// Highest valid memory address.
pub const MAX_ADDRESS: u16 = (MEMORY_SIZE - 1) as u16;
/// Where programs are loaded and where `pc` starts.
pub const PROGRAM_START: u16 = 0x200;
pub const DEFAULT_FONT_BASE: u16 = 0x50;

pub const REGISTER_COUNT: usize = 16;
/// VF doubles as carry, borrow, shift-out and collision flag.
pub const FLAG_REGISTER: usize = 0xF;
pub const STACK_SIZE: usize = 16;
pub const KEY_COUNT: usize = 16;

pub const SCREEN_WIDTH: usize = 64;
pub const SCREEN_HEIGHT: usize = 32;
pub const SCREEN_SIZE: usize = SCREEN_WIDTH * SCREEN_HEIGHT;

/// Bytes per font glyph.
pub const FONT_GLYPH_SIZE: u16 = 5;

/// 16 hexadecimal glyphs, 5 bytes each.
pub const FONT_SET: [u8; 80] = [
    0xF0, 0x90, 0x90, 0x90, 0xF0, // 0
    0x20, 0x60, 0x20, 0x20, 0x70, // 1
    0xF0, 0x10, 0xF0, 0x80, 0xF0, // 2
    0xF0, 0x10, 0xF0, 0x10, 0xF0, // 3
    0x90, 0x90, 0xF0, 0x10, 0x10, // 4
    0xF0, 0x80, 0xF0, 0x10, 0xF0, // 5
    0xF0, 0x80, 0xF0, 0x90, 0xF0, // 6
    0xF0, 0x10, 0x20, 0x40, 0x40, // 7
    0xF0, 0x90, 0xF0, 0x90, 0xF0, // 8
    0xF0, 0x90, 0xF0, 0x10, 0xF0, // 9
    0xF0, 0x90, 0xF0, 0x90, 0x90, // A
    0xE0, 0x90, 0xE0, 0x90, 0xE0, // B
    0xF0, 0x80, 0x80, 0x80, 0xF0, // C
    0xE0, 0x90, 0x90, 0x90, 0xE0, // D
    0xF0, 0x80, 0xF0, 0x80, 0xF0, // E
    0xF0, 0x80, 0xF0, 0x80, 0x80, // F
];

/// Row-major monochrome framebuffer, index = `x + y * SCREEN_WIDTH`.
pub type Screen = [bool; SCREEN_SIZE];

/// Everything the interpreter mutates while running a program.
///
/// Large buffers are boxed so a `MachineState` is cheap to move and a
/// `clone()` is always a deep, independent copy.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MachineState {
    pub memory: Box<[u8; MEMORY_SIZE]>,
    pub registers: [u8; REGISTER_COUNT],
    pub index_register: u16,
    pub pc: u16,
    pub call_stack: [u16; STACK_SIZE],
    /// Next free slot in `call_stack`, always within `0..=STACK_SIZE`.
    pub call_stack_pointer: usize,
    pub delay_timer: u8,
    pub sound_timer: u8,
    pub screen: Box<Screen>,
    pub keys: [bool; KEY_COUNT],
    /// Key seen pressed by FX0A, waiting to be released.
    pub pending_release_key: Option<u8>,
    pub font_base: u16,
}

impl MachineState {
    /// Fresh state with the font seeded at `font_base`.
    ///
    /// `font_base` must leave room for the 80 byte font below `MEMORY_SIZE`;
    /// `Config::validate` checks this for the scheduler.
    pub fn new(font_base: u16) -> MachineState {
        let mut memory = Box::new([0; MEMORY_SIZE]);
        let start = font_base as usize;
        memory[start..start + FONT_SET.len()].copy_from_slice(&FONT_SET);

        MachineState {
            memory,
            registers: [0; REGISTER_COUNT],
            index_register: 0,
            pc: PROGRAM_START,
            call_stack: [0; STACK_SIZE],
            call_stack_pointer: 0,
            delay_timer: 0,
            sound_timer: 0,
            screen: Box::new([false; SCREEN_SIZE]),
            keys: [false; KEY_COUNT],
            pending_release_key: None,
            font_base,
        }
    }

    pub fn pixel(&self, x: usize, y: usize) -> bool {
        x < SCREEN_WIDTH && y < SCREEN_HEIGHT && self.screen[x + y * SCREEN_WIDTH]
    }

    /// Whether the stack pointer and pending key are within their ranges.
    /// Only a state assembled by hand can break this.
    pub fn is_consistent(&self) -> bool {
        self.call_stack_pointer <= STACK_SIZE
            && self.pending_release_key.map_or(true, |key| (key as usize) < KEY_COUNT)
    }

    /// Decrement both timers by one, stopping at zero.
    pub fn tick_timers(&mut self) {
        self.delay_timer = self.delay_timer.saturating_sub(1);
        self.sound_timer = self.sound_timer.saturating_sub(1);
    }
}

impl Default for MachineState {
    fn default() -> Self {
        MachineState::new(DEFAULT_FONT_BASE)
    }
}
