// SPDX-License-Identifier: MIT

pub mod acquisition;
pub mod arch;
pub mod bit;
pub mod identity;
pub mod init;
pub mod legacy;
pub mod locator;
pub mod model;
pub mod parser;
pub mod reader;
pub mod rom;
pub mod validator;
pub mod version;

pub use model::ParsedBios;
pub use parser::parse;
pub use rom::RomImage;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum Error {
    #[error("read at offset {offset} of length {len} exceeds rom_size {rom_size}")]
    Truncated {
        offset: usize,
        len: usize,
        rom_size: usize,
    },
    #[error("invalid signature: expected 55 AA, found {0:02X} {1:02X}")]
    InvalidSignature(u8, u8),
    #[error("rom size mismatch: declared {declared} vs confirmed {confirmed}")]
    SizeMismatch { declared: usize, confirmed: usize },
    #[error("PCIR vendor id 0x{0:04X} is not NVIDIA (0x10DE)")]
    ForeignVendor(u16),
    #[error("legacy BMP version byte {0} is below the supported minimum (5)")]
    UnsupportedGeneration(u8),
    #[error("required anchor `{0}` not found in image")]
    AnchorMissing(&'static str),
    #[error("unknown init-script opcode 0x{opcode:02X} at offset {offset}")]
    UnknownOpcode { opcode: u8, offset: usize },
    #[error("{table} table declares more entries than fit its fixed capacity")]
    TableOverflow { table: &'static str },
    #[error("rom checksum is non-zero")]
    ChecksumBad,
    #[error("rom capacity {0} exceeds the 64 KiB maximum")]
    CapacityExceeded(usize),
}

/// Diagnostics from sub-table parsers are recoverable: a corrupt table does not
/// abort the parse of its siblings, so each failure is attached to the output
/// instead of propagated with `?`.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize)]
pub struct Diagnostic {
    pub table: &'static str,
    pub error: String,
}

impl Diagnostic {
    pub fn new(table: &'static str, error: Error) -> Self {
        Diagnostic {
            table,
            error: error.to_string(),
        }
    }
}
