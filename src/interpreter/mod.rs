pub mod decode;
pub mod execute;
pub mod operation;
pub mod state;

use log::{debug, trace};
use rand::rngs::StdRng;
use rand::{RngCore, SeedableRng};

use crate::error::{EngineError, ProgramError};
use crate::key::Key;

use self::decode::decode;
use self::execute::execute;
use self::operation::Operation;
use self::state::{MachineState, DEFAULT_FONT_BASE, MAX_ADDRESS, MEMORY_SIZE, PROGRAM_START};
use self::state::{SCREEN_HEIGHT, SCREEN_WIDTH};

/// Largest program that fits between `PROGRAM_START` and the end of memory.
pub const MAX_PROGRAM_SIZE: usize = MEMORY_SIZE - PROGRAM_START as usize;

/// A CHIP-8 machine: state plus the random source CXNN draws from.
pub struct Interpreter {
    state: MachineState,
    rng: Box<dyn RngCore + Send>,
    last_executed: Option<(u16, Operation)>,
}

impl Interpreter {
    pub fn new(font_base: u16) -> Interpreter {
        Interpreter {
            state: MachineState::new(font_base),
            rng: Box::new(StdRng::from_entropy()),
            last_executed: None,
        }
    }

    /// Replace the random source with a seeded one, for reproducible runs.
    pub fn with_rng_seed(mut self, seed: u64) -> Interpreter {
        self.rng = Box::new(StdRng::seed_from_u64(seed));
        self
    }

    /// Reset to a fresh machine and copy `rom` in at 0x200.
    pub fn load(&mut self, rom: &[u8]) -> Result<(), ProgramError> {
        self.load_with_font(rom, self.state.font_base)
    }

    /// Like `load`, seeding the font at `font_base` instead of the current one.
    /// On error the machine is left as it was.
    pub fn load_with_font(&mut self, rom: &[u8], font_base: u16) -> Result<(), ProgramError> {
        if rom.len() > MAX_PROGRAM_SIZE {
            return Err(ProgramError::TooLarge { size: rom.len(), max: MAX_PROGRAM_SIZE });
        }
        self.state = MachineState::new(font_base);
        let start = PROGRAM_START as usize;
        self.state.memory[start..start + rom.len()].copy_from_slice(rom);
        self.last_executed = None;
        debug!("loaded {} bytes at {:#05X}", rom.len(), PROGRAM_START);
        Ok(())
    }

    /// Read the big-endian word at `pc`.
    pub fn fetch(&self) -> Result<u16, EngineError> {
        let pc = self.state.pc;
        if pc >= MAX_ADDRESS {
            return Err(EngineError::FetchOutOfBounds { address: pc });
        }
        let high = self.state.memory[pc as usize];
        let low = self.state.memory[pc as usize + 1];
        Ok(u16::from_be_bytes([high, low]))
    }

    /// One fetch, decode, execute cycle. Returns the operation executed.
    pub fn step(&mut self) -> Result<Operation, EngineError> {
        let opcode = self.fetch()?;
        let operation = decode(opcode);
        trace!("{:#05X}: {:#06X} -> {}", self.state.pc, opcode, operation);

        execute(operation, &mut self.state, self.rng.as_mut())?;
        self.last_executed = Some((opcode, operation));
        Ok(operation)
    }

    pub fn tick_timers(&mut self) {
        self.state.tick_timers();
    }

    pub fn key_down(&mut self, key: Key) {
        self.state.keys[key.index()] = true;
    }

    pub fn key_up(&mut self, key: Key) {
        self.state.keys[key.index()] = false;
    }

    pub fn state(&self) -> &MachineState {
        &self.state
    }

    pub fn state_mut(&mut self) -> &mut MachineState {
        &mut self.state
    }

    /// Install a whole new state, e.g. from a snapshot.
    pub fn replace_state(&mut self, state: MachineState) {
        self.state = state;
        self.last_executed = None;
    }

    /// Opcode and operation of the last successfully executed cycle.
    pub fn last_executed(&self) -> Option<(u16, Operation)> {
        self.last_executed
    }

    /// Framebuffer as text, one line per row, for debugging.
    pub fn screen_to_string(&self) -> String {
        let mut output = String::with_capacity((SCREEN_WIDTH * 2 + 1) * SCREEN_HEIGHT * 3);
        for row in self.state.screen.chunks(SCREEN_WIDTH) {
            for pixel in row {
                output.push_str(if *pixel { "██" } else { "  " });
            }
            output.push('\n');
        }
        output
    }
}

impl Default for Interpreter {
    fn default() -> Self {
        Interpreter::new(DEFAULT_FONT_BASE)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::interpreter::state::FONT_SET;

    fn setup(rom: &[u8]) -> Interpreter {
        let mut interpreter = Interpreter::default().with_rng_seed(310349960114);
        interpreter.load(rom).unwrap();
        interpreter
    }

    #[test]
    fn test_program_load() {
        let interpreter = setup(&[0x00, 0x01]);
        let state = interpreter.state();
        assert_eq!(state.memory[0x200..0x202], [0x00, 0x01]);
        assert_eq!(state.memory[0x50..0xA0], FONT_SET);
        assert_eq!(state.memory.len(), 4096);
    }

    #[test]
    fn test_program_too_large() {
        let mut interpreter = Interpreter::default();
        let rom = vec![0xAA; MAX_PROGRAM_SIZE + 1];
        assert_eq!(
            interpreter.load(&rom),
            Err(ProgramError::TooLarge { size: MAX_PROGRAM_SIZE + 1, max: MAX_PROGRAM_SIZE })
        );
        assert!(interpreter.load(&rom[1..]).is_ok());
        assert_eq!(interpreter.state().memory[0xFFF], 0xAA);
    }

    #[test]
    fn test_load_resets_state() {
        let mut interpreter = setup(&[0x60, 0x05]);
        interpreter.step().unwrap();
        interpreter.load(&[0x00, 0xE0]).unwrap();
        assert_eq!(interpreter.state().registers[0], 0);
        assert_eq!(interpreter.state().pc, 0x200);
        assert_eq!(interpreter.last_executed(), None);
    }

    #[test]
    fn test_clear_screen_cycle() {
        let mut interpreter = setup(&[0x00, 0xE0]);
        assert_eq!(interpreter.fetch(), Ok(0x00E0));
        assert_eq!(interpreter.step(), Ok(Operation::ClearScreen));
        assert_eq!(interpreter.state().pc, 0x202);
        assert!(interpreter.state().screen.iter().all(|p| !p));
        assert_eq!(interpreter.fetch(), Ok(0x0000));
        assert_eq!(interpreter.last_executed(), Some((0x00E0, Operation::ClearScreen)));
    }

    #[test]
    fn test_set_then_add() {
        let mut interpreter = setup(&[0x60, 0x05, 0x70, 0x03]);
        interpreter.step().unwrap();
        interpreter.step().unwrap();
        assert_eq!(interpreter.state().registers[0], 8);
        assert_eq!(interpreter.state().pc, 0x204);
    }

    #[test]
    fn test_subroutine_round_trip() {
        let mut interpreter = setup(&[0x23, 0x00]);
        interpreter.state_mut().memory[0x300..0x302].copy_from_slice(&[0x00, 0xEE]);
        interpreter.step().unwrap();
        assert_eq!(interpreter.state().pc, 0x300);
        assert_eq!(interpreter.state().call_stack_pointer, 1);
        interpreter.step().unwrap();
        assert_eq!(interpreter.state().pc, 0x202);
        assert_eq!(interpreter.state().call_stack_pointer, 0);
    }

    #[test]
    fn test_key_tap_across_cycles() {
        let five = Key::try_from(5).unwrap();
        let mut interpreter = setup(&[0xF0, 0x0A]);
        interpreter.key_down(five);
        interpreter.step().unwrap();
        assert_eq!(interpreter.state().registers[0], 0);
        assert_eq!(interpreter.state().pc, 0x200);

        interpreter.key_up(five);
        interpreter.step().unwrap();
        assert_eq!(interpreter.state().registers[0], 5);
        assert_eq!(interpreter.state().pc, 0x202);
    }

    #[test]
    fn test_fetch_at_last_byte() {
        let mut interpreter = setup(&[]);
        interpreter.state_mut().pc = 0xFFF;
        assert_eq!(interpreter.fetch(), Err(EngineError::FetchOutOfBounds { address: 0xFFF }));
        assert_eq!(interpreter.step(), Err(EngineError::FetchOutOfBounds { address: 0xFFF }));
        assert_eq!(interpreter.state().pc, 0xFFF);

        interpreter.state_mut().pc = 0xFFE;
        interpreter.state_mut().memory[0xFFE..].copy_from_slice(&[0x12, 0x34]);
        assert_eq!(interpreter.fetch(), Ok(0x1234));
    }

    #[test]
    fn test_unknown_opcode_halts_in_place() {
        let mut interpreter = setup(&[0x01, 0x23]);
        let before = interpreter.state().clone();
        assert_eq!(interpreter.step(), Err(EngineError::UnknownOpcode(0x0123)));
        assert_eq!(interpreter.state(), &before);
    }

    #[test]
    fn test_seeded_rng_is_reproducible() {
        let rom = [0xC0, 0xFF, 0xC1, 0xFF];
        let mut a = setup(&rom);
        let mut b = setup(&rom);
        for _ in 0..2 {
            a.step().unwrap();
            b.step().unwrap();
        }
        assert_eq!(a.state().registers, b.state().registers);
    }

    #[test]
    fn test_screen_to_string() {
        let mut interpreter = setup(&[]);
        interpreter.state_mut().screen[1] = true;
        let text = interpreter.screen_to_string();
        assert_eq!(text.lines().count(), SCREEN_HEIGHT);
        assert!(text.starts_with("  ██  "));
    }
}
