use std::time::Duration;

use crate::error::ConfigError;
use crate::interpreter::state::{DEFAULT_FONT_BASE, FONT_SET, PROGRAM_START};

pub const DEFAULT_CLOCK_RATE_HZ: u32 = 600;
pub const DEFAULT_FRAME_RATE_HZ: u32 = 60;

/// Run-time settings for a machine and its scheduler.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Config {
    /// Instructions executed per second.
    pub clock_rate_hz: u32,
    /// Frames per second; timers tick once per frame.
    pub frame_rate_hz: u32,
    /// Where the font glyphs are seeded.
    pub font_base: u16,
}

impl Config {
    pub fn with_clock_rate(mut self, hz: u32) -> Config {
        self.clock_rate_hz = hz;
        self
    }

    pub fn with_frame_rate(mut self, hz: u32) -> Config {
        self.frame_rate_hz = hz;
        self
    }

    pub fn with_font_base(mut self, address: u16) -> Config {
        self.font_base = address;
        self
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.frame_rate_hz == 0 {
            return Err(ConfigError::ZeroFrameRate);
        }
        if self.clock_rate_hz < self.frame_rate_hz {
            return Err(ConfigError::ClockBelowFrameRate {
                clock_rate: self.clock_rate_hz,
                frame_rate: self.frame_rate_hz,
            });
        }
        if self.font_base as usize + FONT_SET.len() > PROGRAM_START as usize {
            return Err(ConfigError::FontOutOfRange(self.font_base));
        }
        Ok(())
    }

    pub fn instructions_per_frame(&self) -> u32 {
        self.clock_rate_hz / self.frame_rate_hz.max(1)
    }

    pub fn frame_duration(&self) -> Duration {
        Duration::from_secs(1) / self.frame_rate_hz.max(1)
    }
}

impl Default for Config {
    fn default() -> Self {
        Config {
            clock_rate_hz: DEFAULT_CLOCK_RATE_HZ,
            frame_rate_hz: DEFAULT_FRAME_RATE_HZ,
            font_base: DEFAULT_FONT_BASE,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = Config::default();
        assert_eq!(config.validate(), Ok(()));
        assert_eq!(config.instructions_per_frame(), 10);
        assert_eq!(config.frame_duration(), Duration::from_nanos(16_666_666));
    }

    #[test]
    fn test_rejects_bad_rates() {
        assert_eq!(
            Config::default().with_frame_rate(0).validate(),
            Err(ConfigError::ZeroFrameRate)
        );
        assert_eq!(
            Config::default().with_clock_rate(30).validate(),
            Err(ConfigError::ClockBelowFrameRate { clock_rate: 30, frame_rate: 60 })
        );
    }

    #[test]
    fn test_font_must_fit_below_program() {
        assert!(Config::default().with_font_base(0x1B0).validate().is_ok());
        assert_eq!(
            Config::default().with_font_base(0x1B1).validate(),
            Err(ConfigError::FontOutOfRange(0x1B1))
        );
    }
}
