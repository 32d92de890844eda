use std::fmt;

use sha2::{Digest, Sha256};

/// A CHIP-8 program image and its content identity.
///
/// The identity is the lowercase hex SHA-256 of the ROM bytes; snapshots
/// carry it so they can only be restored into the program that made them.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Program {
    name: String,
    rom: Vec<u8>,
    identity: String,
}

impl Program {
    /// Conventional file extension for CHIP-8 ROMs.
    pub const FILE_EXTENSION: &'static str = "ch8";

    pub fn new(name: impl Into<String>, rom: Vec<u8>) -> Program {
        let identity = format!("{:x}", Sha256::digest(&rom));
        Program { name: name.into(), rom, identity }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn rom(&self) -> &[u8] {
        &self.rom
    }

    pub fn identity(&self) -> &str {
        &self.identity
    }
}

impl fmt::Display for Program {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({} bytes, {})", self.name, self.rom.len(), &self.identity[..12])
    }
}
