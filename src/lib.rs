//! A CHIP-8 virtual machine: opcode decoder, execution engine and a frame
//! scheduler that paces execution, ticks the timers and publishes frames.
//!
//! Rendering, audio and keyboard mapping belong to the caller. The core
//! consumes program bytes, key events and a thread to run on, and hands
//! back a `Frame` per tick.

pub mod config;
pub mod error;
pub mod interpreter;
pub mod key;
pub mod program;
pub mod scheduler;
pub mod snapshot;

pub use config::Config;
pub use error::{ConfigError, EngineError, KeyError, ProgramError, SetupError};
pub use interpreter::decode::decode;
pub use interpreter::execute::execute;
pub use interpreter::operation::{Operation, RegistersOp};
pub use interpreter::state::MachineState;
pub use interpreter::Interpreter;
pub use key::{Key, KeyEvent};
pub use program::Program;
pub use scheduler::{CancellationToken, Frame, FrameObserver, Scheduler, SchedulerHandle};
pub use snapshot::Snapshot;
