use std::sync::mpsc::{self, Receiver};
use std::thread;
use std::time::{Duration, Instant};

use chip8::{Config, EngineError, Frame, Interpreter, Key, Program, Scheduler};

fn fast_config() -> Config {
    Config::default().with_frame_rate(1000).with_clock_rate(10_000)
}

fn setup(rom: &[u8], config: Config) -> Scheduler {
    let interpreter = Interpreter::default().with_rng_seed(42);
    Scheduler::with_interpreter(interpreter, Program::new("test", rom.to_vec()), config).unwrap()
}

/// Wait for the first frame satisfying `predicate`.
fn wait_for(frames: &Receiver<Frame>, predicate: impl Fn(&Frame) -> bool) -> Frame {
    let deadline = Instant::now() + Duration::from_secs(5);
    loop {
        let remaining = deadline.saturating_duration_since(Instant::now());
        let frame = frames.recv_timeout(remaining).expect("no matching frame");
        if predicate(&frame) {
            return frame;
        }
    }
}

#[test]
fn run_publishes_until_cancelled() {
    // ADD V0, 1 ; JP 0x200
    let mut scheduler = setup(&[0x70, 0x01, 0x12, 0x00], fast_config());
    let handle = scheduler.handle();
    let mut published = Vec::new();

    let result = scheduler.run(&mut |frame: &Frame| {
        published.push(frame.snapshot.state.registers[0]);
        if published.len() == 5 {
            handle.cancel();
        }
    });

    assert_eq!(result, Ok(()));
    assert_eq!(published, vec![5, 10, 15, 20, 25]);
    assert!(handle.is_cancelled());
}

#[test]
fn run_stops_on_engine_error() {
    let mut scheduler = setup(&[0x60, 0x01, 0xFF, 0xFF], fast_config());
    let handle = scheduler.handle();
    let mut frames = 0;

    let result = scheduler.run(&mut |_: &Frame| frames += 1);

    assert_eq!(result, Err(EngineError::UnknownOpcode(0xFFFF)));
    assert_eq!(frames, 0);
    assert_eq!(handle.halt_error(), Some(EngineError::UnknownOpcode(0xFFFF)));
    let state = handle.state();
    assert_eq!(state.pc, 0x202);
    assert_eq!(state.registers[0], 1);
}

#[test]
fn stack_overflow_halts_run() {
    // CALL 0x200 forever
    let mut scheduler = setup(&[0x22, 0x00], fast_config());
    let handle = scheduler.handle();
    let result = scheduler.run(&mut |_: &Frame| {});
    assert_eq!(result, Err(EngineError::StackOverflow { pc: 0x200 }));
    assert_eq!(handle.state().call_stack_pointer, 16);
}

#[test]
fn pause_stops_cycles_timers_and_frames() {
    // LD V0, 0xFF ; LD DT, V0 ; ADD V1, 1 ; JP 0x204
    let mut scheduler = setup(&[0x60, 0xFF, 0xF0, 0x15, 0x71, 0x01, 0x12, 0x04], fast_config());
    let handle = scheduler.handle();
    handle.pause();

    let (tx, frames) = mpsc::channel();
    let runner = thread::spawn(move || {
        let mut tx = tx;
        scheduler.run(&mut tx)
    });

    thread::sleep(Duration::from_millis(50));
    assert!(frames.try_recv().is_err());
    let paused_state = handle.state();
    assert_eq!(paused_state.pc, 0x200);
    assert_eq!(paused_state.delay_timer, 0);

    handle.resume();
    let frame = wait_for(&frames, |_| true);
    assert!(frame.snapshot.state.registers[1] > 0);

    handle.pause();
    // drain whatever was in flight, then nothing more arrives
    thread::sleep(Duration::from_millis(20));
    while frames.try_recv().is_ok() {}
    let state = handle.state();
    thread::sleep(Duration::from_millis(30));
    assert!(frames.try_recv().is_err());
    assert_eq!(handle.state(), state);

    handle.cancel();
    assert_eq!(runner.join().unwrap(), Ok(()));
}

#[test]
fn cancel_interrupts_frame_sleep() {
    // one instruction per one second frame
    let config = Config::default().with_frame_rate(1).with_clock_rate(1);
    let mut scheduler = setup(&[0x12, 0x00], config);
    let handle = scheduler.handle();

    let started = Instant::now();
    let runner = thread::spawn(move || scheduler.run(&mut |_: &Frame| {}));
    thread::sleep(Duration::from_millis(50));
    handle.cancel();

    assert_eq!(runner.join().unwrap(), Ok(()));
    assert!(started.elapsed() < Duration::from_millis(900));
}

#[test]
fn key_tap_reaches_running_machine() {
    // LD V0, K ; JP 0x202
    let mut scheduler = setup(&[0xF0, 0x0A, 0x12, 0x02], fast_config());
    let handle = scheduler.handle();
    let (tx, frames) = mpsc::channel();
    let runner = thread::spawn(move || {
        let mut tx = tx;
        scheduler.run(&mut tx)
    });

    let seven = Key::try_from(7).unwrap();
    handle.key_down(seven);
    let frame = wait_for(&frames, |f| f.snapshot.state.pending_release_key == Some(7));
    assert_eq!(frame.snapshot.state.pc, 0x200);
    assert_eq!(frame.snapshot.state.registers[0], 0);

    handle.key_up(seven);
    let frame = wait_for(&frames, |f| f.snapshot.state.pc == 0x202);
    assert_eq!(frame.snapshot.state.registers[0], 7);
    assert_eq!(frame.snapshot.state.pending_release_key, None);

    handle.cancel();
    assert_eq!(runner.join().unwrap(), Ok(()));
}

#[test]
fn sound_timer_is_published() {
    // LD V0, 2 ; LD ST, V0 ; JP 0x204
    let mut scheduler = setup(&[0x60, 0x02, 0xF0, 0x18, 0x12, 0x04], fast_config());
    let handle = scheduler.handle();
    let mut sound = Vec::new();
    scheduler
        .run(&mut |frame: &Frame| {
            sound.push(frame.sound_timer);
            if sound.len() == 3 {
                handle.cancel();
            }
        })
        .unwrap();
    assert_eq!(sound, vec![1, 0, 0]);
}

#[test]
fn instances_are_isolated() {
    let rom = [0x12, 0x00];
    let a = setup(&rom, fast_config());
    let b = setup(&rom, fast_config());
    let (a, b) = (a.handle(), b.handle());

    a.key_down(Key::try_from(3).unwrap());
    a.pause();
    assert!(a.state().keys[3]);
    assert!(!b.state().keys[3]);
    assert!(!b.is_paused());

    a.cancel();
    assert!(!b.is_cancelled());
}

#[test]
fn snapshot_survives_further_execution() {
    // ADD V0, 1 ; JP 0x200
    let rom = [0x70, 0x01, 0x12, 0x00];
    let mut scheduler = setup(&rom, fast_config());
    let handle = scheduler.handle();
    scheduler.run_frame().unwrap();
    let snapshot = handle.export_snapshot();
    let copy = snapshot.clone();

    for _ in 0..3 {
        scheduler.run_frame().unwrap();
    }
    assert_eq!(snapshot, copy);
    assert_eq!(handle.state().registers[0], 20);

    // restore into a freshly reset machine running the same program
    handle.load_program(Program::new("test", rom.to_vec())).unwrap();
    assert!(handle.load_snapshot(&snapshot));
    assert_eq!(handle.state(), snapshot.state);
}
