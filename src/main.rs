use std::error::Error;
use std::path::Path;
use std::sync::mpsc::{self, Receiver};
use std::thread;
use std::time::Duration;

use chip8::config::DEFAULT_CLOCK_RATE_HZ;
use chip8::interpreter::state::{SCREEN_HEIGHT, SCREEN_WIDTH};
use chip8::{Config, Frame, Key, KeyEvent, Program, Scheduler, SchedulerHandle};
use chip8_base::{Display, Keys, Pixel};
use log::{error, info, warn};

/// Window side of the emulator: forwards key changes to the scheduler and
/// shows the newest published frame.
struct Frontend {
    handle: SchedulerHandle,
    frames: Receiver<Frame>,
    keys: Keys,
    buzzer: bool,
    refresh: Duration,
}

impl chip8_base::Interpreter for Frontend {
    fn step(&mut self, keys: &Keys) -> Option<Display> {
        for (code, (now, before)) in keys.iter().zip(self.keys.iter()).enumerate() {
            if now == before {
                continue;
            }
            if let Ok(key) = Key::try_from(code as u8) {
                let event = if *now { KeyEvent::Down(key) } else { KeyEvent::Up(key) };
                self.handle.handle_key_event(event);
            }
        }
        self.keys = *keys;

        let frame = self.frames.try_iter().last()?;
        self.buzzer = frame.sound_timer > 0;
        Some(to_display(&frame))
    }

    fn speed(&self) -> Duration {
        self.refresh
    }

    fn buzzer_active(&self) -> bool {
        self.buzzer
    }
}

fn to_display(frame: &Frame) -> Display {
    let mut display = [[Pixel::Black; SCREEN_WIDTH]; SCREEN_HEIGHT];
    for (y, row) in frame.screen.chunks(SCREEN_WIDTH).enumerate() {
        for (x, on) in row.iter().enumerate() {
            if *on {
                display[y][x] = Pixel::White;
            }
        }
    }
    display
}

#[allow(unreachable_code)]
fn main() -> Result<(), Box<dyn Error>> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let mut args = std::env::args().skip(1);
    let path = args.next().unwrap_or_else(|| "./roms/IBM Logo.ch8".to_owned());
    let clock_rate = match args.next() {
        Some(arg) => arg.parse()?,
        None => DEFAULT_CLOCK_RATE_HZ,
    };

    if Path::new(&path).extension().map_or(true, |ext| ext != Program::FILE_EXTENSION) {
        warn!("{path} does not have a .{} extension", Program::FILE_EXTENSION);
    }
    let rom = std::fs::read(&path)?;
    info!("read {} bytes from {path}", rom.len());
    let name = Path::new(&path)
        .file_stem()
        .map(|stem| stem.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.clone());

    let config = Config::default().with_clock_rate(clock_rate);
    let mut scheduler = Scheduler::new(Program::new(name, rom), config)?;
    let handle = scheduler.handle();
    let refresh = scheduler.config().frame_duration();

    let (frames_tx, frames) = mpsc::channel();
    thread::spawn(move || {
        let mut frames_tx = frames_tx;
        if let Err(err) = scheduler.run(&mut frames_tx) {
            error!("emulation stopped: {err}");
        }
    });

    chip8_base::run(Frontend {
        handle,
        frames,
        keys: [false; 16],
        buzzer: false,
        refresh,
    });
    Ok(())
}
