// SPDX-License-Identifier: MIT

//! Performance table (BIT entry `'P'`, first sub-pointer). Field layout
//! shifts between ROM versions; see `SPEC_FULL.md` §4.7.2.

use crate::arch::{Architecture, Caps};
use crate::model::{PerformanceLevel, MAX_PERF_LVLS};
use crate::reader::Reader;
use crate::{Diagnostic, Error};

const END_MARKER: u32 = 0x04104B4D;

struct Header {
    version: u8,
    start: u8,
    num_active: u8,
    offset_inner: u8,
    entry_size: u8,
    num_entries: u8,
}

fn read_header(r: &Reader<'_>, offset: usize) -> crate::Result<Header> {
    Ok(Header {
        version: r.u8(offset)?,
        start: r.u8(offset + 1)?,
        num_active: r.u8(offset + 2)?,
        offset_inner: r.u8(offset + 3)?,
        entry_size: r.u8(offset + 4)?,
        num_entries: r.u8(offset + 5)?,
    })
}

struct Layout {
    fan: usize,
    volt: usize,
    nvclk: usize,
    shader: Option<usize>,
    memclk: usize,
    delta: Option<usize>,
    lock: Option<usize>,
}

/// Guarded ratio of the two bytes at `row+offset` / `row+offset+1`, left
/// unset when the divisor byte is zero — matches bios.c's
/// `if(rom[off]) delta = rom[off+1]/rom[off];`.
fn read_delta_ratio(r: &Reader<'_>, row: usize, offset: usize) -> crate::Result<Option<i32>> {
    let divisor = r.u8(row + offset)?;
    if divisor == 0 {
        return Ok(None);
    }
    let dividend = r.u8(row + offset + 1)?;
    Ok(Some((dividend / divisor) as i32))
}

fn layout_for_version(version: u8) -> Layout {
    match version {
        0x25 => Layout {
            fan: 4,
            volt: 5,
            nvclk: 8,
            shader: Some(10),
            memclk: 12,
            delta: None,
            lock: None,
        },
        0x30 | 0x35 => Layout {
            fan: 6,
            volt: 7,
            nvclk: 8,
            shader: Some(10),
            memclk: 12,
            delta: None,
            lock: None,
        },
        _ => Layout {
            fan: 4,
            volt: 5,
            nvclk: 6,
            shader: None,
            memclk: 11,
            delta: Some(7),
            lock: Some(13),
        },
    }
}

pub fn parse(
    r: &Reader<'_>,
    offset: usize,
    architecture: Architecture,
) -> (Vec<PerformanceLevel>, Caps, Vec<Diagnostic>) {
    let mut entries = Vec::new();
    let mut diagnostics = Vec::new();
    let caps = Caps::from_architecture(architecture);

    let header = match read_header(r, offset) {
        Ok(h) => h,
        Err(e) => {
            diagnostics.push(Diagnostic::new("performance", e));
            return (entries, caps, diagnostics);
        }
    };

    if header.num_entries as usize > MAX_PERF_LVLS {
        diagnostics.push(Diagnostic::new(
            "performance",
            Error::TableOverflow { table: "performance" },
        ));
    }

    let layout = layout_for_version(header.version);
    // The stride between rows is a single constant computed once, not
    // `header.entry_size` alone: offset_inner + entry_size * num_entries.
    let stride = header.offset_inner as usize
        + header.entry_size as usize * header.num_entries as usize;
    let mut row = offset + header.start as usize;
    let mut i = 0usize;

    loop {
        let marker = match r.u32_le(row) {
            Ok(m) => m,
            Err(e) => {
                diagnostics.push(Diagnostic::new("performance", e));
                break;
            }
        };
        if marker == END_MARKER {
            break;
        }
        if i == MAX_PERF_LVLS {
            diagnostics.push(Diagnostic::new(
                "performance",
                Error::TableOverflow {
                    table: "performance_excess",
                },
            ));
            break;
        }

        let first_byte = match r.u8(row) {
            Ok(b) => b,
            Err(e) => {
                diagnostics.push(Diagnostic::new("performance", e));
                break;
            }
        };
        if header.version != 0x35 && (first_byte & 0xF0) != 0x20 {
            diagnostics.push(Diagnostic::new(
                "performance",
                Error::TableOverflow {
                    table: "performance_alignment",
                },
            ));
            break;
        }

        let entry = (|| -> crate::Result<PerformanceLevel> {
            Ok(PerformanceLevel {
                nvclk_mhz: r.u16_le(row + layout.nvclk)? as u32,
                memclk_mhz: r.u16_le(row + layout.memclk)? as u32,
                shaderclk_mhz: if caps.contains(Caps::SHADER_CLK) {
                    match layout.shader {
                        Some(off) => Some(r.u16_le(row + off)? as u32),
                        None => None,
                    }
                } else {
                    None
                },
                voltage: r.u8(row + layout.volt)? as f32 / 100.0,
                fanspeed: r.u8(row + layout.fan)?,
                active: i < header.num_active as usize,
                lock: match layout.lock {
                    Some(off) if caps.contains(Caps::LOCK) => Some(r.u8(row + off)?),
                    _ => None,
                },
                delta: match layout.delta {
                    Some(off) if caps.contains(Caps::DELTA_CLK) => read_delta_ratio(r, row, off)?,
                    _ => None,
                },
            })
        })();

        match entry {
            Ok(e) => entries.push(e),
            Err(e) => {
                diagnostics.push(Diagnostic::new("performance", e));
                break;
            }
        }
        i += 1;
        row += stride;
    }

    (entries, caps, diagnostics)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_version_0x25_row() {
        let mut buf = vec![0u8; 64];
        buf[0] = 0x25;
        buf[1] = 6; // start
        buf[2] = 1; // num_active
        buf[3] = 0; // offset_inner
        buf[4] = 16; // entry_size
        buf[5] = 1; // num_entries -> stride = offset_inner + entry_size*num_entries = 16
        let row = 6;
        buf[row] = 0x20; // alignment nibble
        buf[row + 4] = 10; // fan
        buf[row + 5] = 110; // volt -> 1.10V
        buf[row + 8..row + 10].copy_from_slice(&500u16.to_le_bytes());
        buf[row + 12..row + 14].copy_from_slice(&800u16.to_le_bytes());
        // next row, one stride (16 bytes) further, is the end marker
        buf[row + 16..row + 20].copy_from_slice(&END_MARKER.to_le_bytes());
        let r = Reader::new(&buf, buf.len());
        let (entries, _, diagnostics) = parse(&r, 0, Architecture::NV5X);
        assert!(diagnostics.is_empty());
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].nvclk_mhz, 500);
        assert_eq!(entries[0].memclk_mhz, 800);
        assert!(entries[0].active);
    }

    #[test]
    fn stops_at_end_marker() {
        let mut buf = vec![0u8; 64];
        buf[0] = 0x25;
        buf[1] = 6;
        buf[2] = 1;
        buf[3] = 0;
        buf[4] = 16;
        buf[5] = 2;
        let row = 6;
        buf[row..row + 4].copy_from_slice(&END_MARKER.to_le_bytes());
        let r = Reader::new(&buf, buf.len());
        let (entries, _, _) = parse(&r, 0, Architecture::NV5X);
        assert!(entries.is_empty());
    }
}
