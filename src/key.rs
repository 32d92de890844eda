use std::fmt;

use crate::error::KeyError;

/// One of the 16 logical keys, `0x0..=0xF`.
///
/// The standard keypad layout is:
/// ```text
/// 1 2 3 C
/// 4 5 6 D
/// 7 8 9 E
/// A 0 B F
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Key(u8);

impl Key {
    pub fn code(self) -> u8 {
        self.0
    }

    pub fn index(self) -> usize {
        self.0 as usize
    }
}

impl TryFrom<u8> for Key {
    type Error = KeyError;

    fn try_from(code: u8) -> Result<Self, Self::Error> {
        if code < 16 {
            Ok(Key(code))
        } else {
            Err(KeyError::OutOfRange(code))
        }
    }
}

impl fmt::Display for Key {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:X}", self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyEvent {
    Down(Key),
    Up(Key),
}
