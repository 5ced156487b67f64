// SPDX-License-Identifier: MIT

//! The init-script walker. The init script is a byte-code language the
//! firmware executes at boot to program the card; this decoder never
//! executes it, it only walks past each opcode using the opcode's length
//! rule, so that any trailing BIT entries remain reachable. Along the way it
//! snapshots three register writes the rest of the decoder needs later.

use crate::model::RegisterCache;
use crate::reader::Reader;
use crate::{Diagnostic, Error};
use log::{trace, warn};

const OP_TERMINATE: u8 = b'q'; // 0x71

fn fixed_len(opcode: u8) -> Option<usize> {
    Some(match opcode {
        b'2' => 43,
        b'3' => 2,
        b'6' => 1,
        b'7' => 11,
        b'8' => 1,
        b'9' => 2,
        b'J' => 43,
        b'K' => 9,
        b'R' => 4,
        b'S' => 3,
        b'V' => 3,
        b'[' => 3,
        b'_' => 22,
        b'b' => 5,
        b'c' => 1,
        b'e' => 13,
        b'i' => 5,
        b'k' => 2,
        b'n' => 13,
        b'o' => 2,
        b'q' => 1,
        b'r' => 1,
        b't' => 3,
        b'u' => 2,
        b'v' => 2,
        b'x' => 6,
        b'y' => 7,
        b'z' => 9,
        0x8E => 1,
        0x90 => 9,
        0x91 => 18,
        0x97 => 13,
        _ => return None,
    })
}

/// Variable-length opcodes read a count byte at a fixed displacement from
/// the opcode and scale it; `offset` is the opcode's own position.
fn variable_len(r: &Reader<'_>, opcode: u8, offset: usize) -> crate::Result<Option<usize>> {
    Ok(Some(match opcode {
        0x4D /* 'M' */ => 4 + 2 * r.u8(offset + 3)? as usize,
        0x51 /* 'Q' */ => 5 + r.u8(offset + 4)? as usize,
        0x54 /* 'T' */ => 2 + 2 * r.u8(offset + 1)? as usize,
        0x58 /* 'X' */ => 6 + 4 * r.u8(offset + 5)? as usize,
        0x8F => 7 + 32 * r.u8(offset + 6)? as usize,
        _ => return Ok(None),
    }))
}

fn opcode_len(r: &Reader<'_>, opcode: u8, offset: usize) -> crate::Result<Option<usize>> {
    if let Some(len) = fixed_len(opcode) {
        return Ok(Some(len));
    }
    variable_len(r, opcode, offset)
}

/// Walks one init script starting at `offset`, returning the register
/// snapshot observed along the way. Stops at `'q'`, at an unknown opcode
/// (reported as a diagnostic, not fatal), or if a length would read past the
/// rom.
pub fn walk(r: &Reader<'_>, mut offset: usize) -> (RegisterCache, Vec<Diagnostic>) {
    let mut registers = RegisterCache::default();
    let mut diagnostics = Vec::new();

    loop {
        let opcode = match r.u8(offset) {
            Ok(b) => b,
            Err(e) => {
                diagnostics.push(Diagnostic::new("init_script", e));
                break;
            }
        };
        trace!("init script opcode {:#04x} at offset {}", opcode, offset);

        if opcode == b'z' {
            if let (Ok(reg), Ok(val)) = (r.u32_le(offset + 1), r.u32_le(offset + 5)) {
                match reg {
                    0x1540 => registers.pipe_cfg = Some(val),
                    0x4000 => registers.nvpll = Some(val),
                    0x4020 => registers.mpll = Some(val),
                    _ => {}
                }
            }
        }

        let len = match opcode_len(r, opcode, offset) {
            Ok(Some(len)) => len,
            Ok(None) => {
                warn!("unknown init-script opcode {:#04x} at {}", opcode, offset);
                diagnostics.push(Diagnostic::new(
                    "init_script",
                    Error::UnknownOpcode { opcode, offset },
                ));
                break;
            }
            Err(e) => {
                diagnostics.push(Diagnostic::new("init_script", e));
                break;
            }
        };

        if opcode == OP_TERMINATE {
            break;
        }
        offset += len;
    }

    (registers, diagnostics)
}

/// Walks the (up to `max_tables`) init scripts pointed to by consecutive u16
/// pointers starting at `ptr_table_offset`. Zero pointers are skipped.
/// Register snapshots from later scripts overwrite earlier ones.
pub fn run_tables(
    r: &Reader<'_>,
    ptr_table_offset: usize,
    max_tables: usize,
) -> (RegisterCache, Vec<Diagnostic>) {
    let mut registers = RegisterCache::default();
    let mut diagnostics = Vec::new();

    for i in 0..max_tables {
        let ptr = match r.u16_le(ptr_table_offset + 2 * i) {
            Ok(p) => p,
            Err(e) => {
                diagnostics.push(Diagnostic::new("init_script", e));
                break;
            }
        };
        if ptr == 0 {
            continue;
        }
        let (table_registers, mut table_diag) = walk(r, ptr as usize);
        if table_registers.pipe_cfg.is_some() {
            registers.pipe_cfg = table_registers.pipe_cfg;
        }
        if table_registers.nvpll.is_some() {
            registers.nvpll = table_registers.nvpll;
        }
        if table_registers.mpll.is_some() {
            registers.mpll = table_registers.mpll;
        }
        if table_registers.spll.is_some() {
            registers.spll = table_registers.spll;
        }
        diagnostics.append(&mut table_diag);
    }

    (registers, diagnostics)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reader::Reader;

    #[test]
    fn walks_to_terminator_and_caches_registers() {
        let mut buf = vec![0u8; 32];
        buf[0] = b'z';
        buf[1..5].copy_from_slice(&0x1540u32.to_le_bytes());
        buf[5..9].copy_from_slice(&0xDEADBEEFu32.to_le_bytes());
        buf[9] = b'q';
        let r = Reader::new(&buf, buf.len());
        let (registers, diagnostics) = walk(&r, 0);
        assert_eq!(registers.pipe_cfg, Some(0xDEADBEEF));
        assert!(diagnostics.is_empty());
    }

    #[test]
    fn unknown_opcode_halts_with_diagnostic() {
        let buf = vec![0xC3u8; 8];
        let r = Reader::new(&buf, buf.len());
        let (_, diagnostics) = walk(&r, 0);
        assert_eq!(diagnostics.len(), 1);
    }

    #[test]
    fn variable_length_opcode_m_scales_by_entries() {
        let mut buf = vec![0u8; 16];
        buf[0] = b'M';
        buf[3] = 2; // 4 + 2*2 = 8 bytes for this opcode
        buf[8] = b'q';
        let r = Reader::new(&buf, buf.len());
        let (_, diagnostics) = walk(&r, 0);
        assert!(diagnostics.is_empty());
    }
}
