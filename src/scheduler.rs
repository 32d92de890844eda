use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::Sender;
use std::sync::{Arc, Condvar, Mutex, MutexGuard, PoisonError};
use std::time::{Duration, Instant};

use log::{error, info, warn};

use crate::config::Config;
use crate::error::{EngineError, ProgramError, SetupError};
use crate::interpreter::operation::Operation;
use crate::interpreter::state::{MachineState, Screen};
use crate::interpreter::Interpreter;
use crate::key::{Key, KeyEvent};
use crate::program::Program;
use crate::snapshot::Snapshot;

/// What the scheduler publishes at the end of every frame.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    pub screen: Box<Screen>,
    /// The caller should sound a tone while this is above zero.
    pub sound_timer: u8,
    pub snapshot: Snapshot,
}

/// Receives a `Frame` once per frame from the run loop.
pub trait FrameObserver {
    fn publish(&mut self, frame: &Frame);
}

impl<F> FrameObserver for F
where
    F: FnMut(&Frame),
{
    fn publish(&mut self, frame: &Frame) {
        self(frame)
    }
}

impl FrameObserver for Sender<Frame> {
    fn publish(&mut self, frame: &Frame) {
        // a dropped receiver just means nobody is watching any more
        let _ = self.send(frame.clone());
    }
}

/// Cooperative stop flag whose waits wake up as soon as it is set.
#[derive(Debug, Clone, Default)]
pub struct CancellationToken {
    inner: Arc<(Mutex<bool>, Condvar)>,
}

impl CancellationToken {
    pub fn new() -> CancellationToken {
        CancellationToken::default()
    }

    pub fn cancel(&self) {
        let (flag, condvar) = &*self.inner;
        *flag.lock().unwrap_or_else(PoisonError::into_inner) = true;
        condvar.notify_all();
    }

    pub fn is_cancelled(&self) -> bool {
        *self.inner.0.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Sleep for `timeout` or until cancelled. Returns whether it was cancelled.
    pub fn wait_timeout(&self, timeout: Duration) -> bool {
        let (flag, condvar) = &*self.inner;
        let guard = flag.lock().unwrap_or_else(PoisonError::into_inner);
        let (guard, _) = condvar
            .wait_timeout_while(guard, timeout, |cancelled| !*cancelled)
            .unwrap_or_else(PoisonError::into_inner);
        *guard
    }
}

struct Session {
    interpreter: Interpreter,
    program: Program,
    halted: Option<EngineError>,
}

struct Shared {
    session: Mutex<Session>,
    font_base: u16,
    paused: AtomicBool,
    cancel: CancellationToken,
}

impl Shared {
    // Session data is consistent between cycles, so a panic elsewhere
    // holding the lock does not invalidate it.
    fn lock(&self) -> MutexGuard<'_, Session> {
        self.session.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Drives a machine: runs `instructions_per_frame` cycles, paces to the
/// frame rate, ticks the timers and publishes a `Frame`.
pub struct Scheduler {
    config: Config,
    shared: Arc<Shared>,
}

impl Scheduler {
    pub fn new(program: Program, config: Config) -> Result<Scheduler, SetupError> {
        Scheduler::with_interpreter(Interpreter::new(config.font_base), program, config)
    }

    /// Use a prepared interpreter (for instance one with a seeded random
    /// source). Its state is reset and `program` loaded into it.
    pub fn with_interpreter(
        mut interpreter: Interpreter,
        program: Program,
        config: Config,
    ) -> Result<Scheduler, SetupError> {
        config.validate()?;
        interpreter.load_with_font(program.rom(), config.font_base)?;
        info!("loaded {program}");

        Ok(Scheduler {
            config,
            shared: Arc::new(Shared {
                session: Mutex::new(Session { interpreter, program, halted: None }),
                font_base: config.font_base,
                paused: AtomicBool::new(false),
                cancel: CancellationToken::new(),
            }),
        })
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// A cloneable remote control for input, pause, cancel and snapshots.
    pub fn handle(&self) -> SchedulerHandle {
        SchedulerHandle { shared: Arc::clone(&self.shared) }
    }

    /// Run until cancelled or until the machine fails.
    ///
    /// Cancellation returns `Ok(())`. An engine failure ends the loop with
    /// that error; it is also kept for `SchedulerHandle::halt_error` and the
    /// machine stays exactly as it was when the instruction failed.
    pub fn run<O>(&mut self, observer: &mut O) -> Result<(), EngineError>
    where
        O: FrameObserver + ?Sized,
    {
        let frame_duration = self.config.frame_duration();
        let cancel = self.shared.cancel.clone();
        info!(
            "running at {} Hz, {} instructions per frame",
            self.config.clock_rate_hz,
            self.config.instructions_per_frame()
        );

        loop {
            if cancel.is_cancelled() {
                break;
            }
            if self.shared.paused.load(Ordering::Acquire) {
                if cancel.wait_timeout(frame_duration) {
                    break;
                }
                continue;
            }

            let started = Instant::now();
            self.run_cycles()?;
            let remaining = frame_duration.saturating_sub(started.elapsed());
            if !remaining.is_zero() && cancel.wait_timeout(remaining) {
                break;
            }

            let frame = self.finish_frame();
            observer.publish(&frame);
        }

        info!("run cancelled");
        Ok(())
    }

    /// One frame without pacing: the cycles, the timer tick and the frame
    /// that would be published.
    pub fn run_frame(&mut self) -> Result<Frame, EngineError> {
        self.run_cycles()?;
        Ok(self.finish_frame())
    }

    fn run_cycles(&self) -> Result<(), EngineError> {
        for _ in 0..self.config.instructions_per_frame() {
            // locked per cycle so key events land between instructions
            let mut session = self.shared.lock();
            if let Some(halted) = &session.halted {
                return Err(halted.clone());
            }
            if let Err(err) = session.interpreter.step() {
                error!("halted at pc {:#05X}: {err}", session.interpreter.state().pc);
                session.halted = Some(err.clone());
                return Err(err);
            }
        }
        Ok(())
    }

    fn finish_frame(&self) -> Frame {
        let mut session = self.shared.lock();
        session.interpreter.tick_timers();
        let state = session.interpreter.state().clone();
        Frame {
            screen: state.screen.clone(),
            sound_timer: state.sound_timer,
            snapshot: Snapshot::new(state, session.program.identity()),
        }
    }
}

/// Thread-safe access to a running `Scheduler`.
#[derive(Clone)]
pub struct SchedulerHandle {
    shared: Arc<Shared>,
}

impl SchedulerHandle {
    pub fn key_down(&self, key: Key) {
        self.shared.lock().interpreter.key_down(key);
    }

    pub fn key_up(&self, key: Key) {
        self.shared.lock().interpreter.key_up(key);
    }

    pub fn handle_key_event(&self, event: KeyEvent) {
        match event {
            KeyEvent::Down(key) => self.key_down(key),
            KeyEvent::Up(key) => self.key_up(key),
        }
    }

    pub fn pause(&self) {
        self.shared.paused.store(true, Ordering::Release);
        info!("paused");
    }

    pub fn resume(&self) {
        self.shared.paused.store(false, Ordering::Release);
        info!("resumed");
    }

    /// Flip the pause state, returning whether it is now paused.
    pub fn toggle_pause(&self) -> bool {
        let paused = !self.shared.paused.fetch_xor(true, Ordering::AcqRel);
        info!("{}", if paused { "paused" } else { "resumed" });
        paused
    }

    pub fn is_paused(&self) -> bool {
        self.shared.paused.load(Ordering::Acquire)
    }

    pub fn cancel(&self) {
        self.shared.cancel.cancel();
    }

    pub fn is_cancelled(&self) -> bool {
        self.shared.cancel.is_cancelled()
    }

    pub fn cancellation_token(&self) -> CancellationToken {
        self.shared.cancel.clone()
    }

    /// Copy of the current machine tagged with the running program.
    pub fn export_snapshot(&self) -> Snapshot {
        let session = self.shared.lock();
        Snapshot::new(session.interpreter.state().clone(), session.program.identity())
    }

    /// Install `snapshot` if it was taken from the running program and its
    /// state is consistent. Returns whether it was adopted; a rejected
    /// snapshot changes nothing.
    pub fn load_snapshot(&self, snapshot: &Snapshot) -> bool {
        let mut session = self.shared.lock();
        if !snapshot.is_for(session.program.identity()) {
            warn!(
                "ignoring snapshot for program {}, running {}",
                snapshot.program_identity,
                session.program.identity()
            );
            return false;
        }
        if !snapshot.state.is_consistent() {
            warn!(
                "ignoring inconsistent snapshot (stack pointer {}, pending key {:?})",
                snapshot.state.call_stack_pointer, snapshot.state.pending_release_key
            );
            return false;
        }
        session.interpreter.replace_state(snapshot.state.clone());
        session.halted = None;
        info!("snapshot loaded at pc {:#05X}", snapshot.state.pc);
        true
    }

    /// Start `program` from a fresh machine, clearing any recorded halt.
    pub fn load_program(&self, program: Program) -> Result<(), ProgramError> {
        let mut session = self.shared.lock();
        // a loaded snapshot may have moved the font
        session.interpreter.load_with_font(program.rom(), self.shared.font_base)?;
        info!("loaded {program}");
        session.program = program;
        session.halted = None;
        Ok(())
    }

    /// The failure that stopped the machine, if it has stopped.
    pub fn halt_error(&self) -> Option<EngineError> {
        self.shared.lock().halted.clone()
    }

    pub fn last_executed(&self) -> Option<(u16, Operation)> {
        self.shared.lock().interpreter.last_executed()
    }

    pub fn program_identity(&self) -> String {
        self.shared.lock().program.identity().to_owned()
    }

    pub fn state(&self) -> MachineState {
        self.shared.lock().interpreter.state().clone()
    }
}
