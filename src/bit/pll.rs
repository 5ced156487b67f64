// SPDX-License-Identifier: MIT

//! PLL-limits table (BIT entry `'C'`).

use crate::model::{PllLimit, Vco, MAX_PLL_ENTRIES};
use crate::reader::Reader;
use crate::{Diagnostic, Error};

struct Header {
    #[allow(dead_code)]
    version: u8,
    start: u8,
    entry_size: u8,
    num_entries: u8,
}

fn read_header(r: &Reader<'_>, offset: usize) -> crate::Result<Header> {
    Ok(Header {
        version: r.u8(offset)?,
        start: r.u8(offset + 1)?,
        entry_size: r.u8(offset + 2)?,
        num_entries: r.u8(offset + 3)?,
    })
}

fn read_vco(r: &Reader<'_>, row: usize, min_freq: usize, input_freq: usize, nm: usize) -> crate::Result<Vco> {
    Ok(Vco {
        min_freq_khz: r.u16_le(row + min_freq)? as u32 * 1000,
        max_freq_khz: r.u16_le(row + min_freq + 2)? as u32 * 1000,
        min_input_freq_khz: r.u16_le(row + input_freq)? as u32 * 1000,
        max_input_freq_khz: r.u16_le(row + input_freq + 2)? as u32 * 1000,
        min_n: r.u8(row + nm)?,
        max_n: r.u8(row + nm + 1)?,
        min_m: r.u8(row + nm + 2)?,
        max_m: r.u8(row + nm + 3)?,
    })
}

pub fn parse(r: &Reader<'_>, offset: usize) -> (Vec<PllLimit>, Vec<Diagnostic>) {
    let mut entries = Vec::new();
    let mut diagnostics = Vec::new();

    let header = match read_header(r, offset) {
        Ok(h) => h,
        Err(e) => {
            diagnostics.push(Diagnostic::new("pll", e));
            return (entries, diagnostics);
        }
    };

    if header.num_entries as usize > MAX_PLL_ENTRIES {
        diagnostics.push(Diagnostic::new(
            "pll",
            Error::TableOverflow { table: "pll" },
        ));
    }
    let num_entries = (header.num_entries as usize).min(MAX_PLL_ENTRIES);

    let mut row = offset + header.start as usize;
    for _ in 0..num_entries {
        let entry = (|| -> crate::Result<PllLimit> {
            Ok(PllLimit {
                reg: r.u32_le(row)?,
                vco1: read_vco(r, row, 0x4, 0xC, 0x14)?,
                vco2: read_vco(r, row, 0x8, 0x10, 0x18)?,
                var1d: r.u8(row + 0x1D)?,
                var1e: r.u8(row + 0x1E)?,
            })
        })();
        match entry {
            Ok(e) => entries.push(e),
            Err(e) => {
                diagnostics.push(Diagnostic::new("pll", e));
                break;
            }
        }
        row += header.entry_size as usize;
    }

    (entries, diagnostics)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_single_entry() {
        let mut buf = vec![0u8; 64];
        buf[0] = 0x01; // version
        buf[1] = 0x04; // start
        buf[2] = 0x1F; // entry_size
        buf[3] = 0x01; // num_entries
        let row = 4;
        buf[row..row + 4].copy_from_slice(&0x0010u32.to_le_bytes());
        buf[row + 4..row + 6].copy_from_slice(&100u16.to_le_bytes());
        buf[row + 6..row + 8].copy_from_slice(&400u16.to_le_bytes());
        let r = Reader::new(&buf, buf.len());
        let (entries, diagnostics) = parse(&r, 0);
        assert!(diagnostics.is_empty());
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].reg, 0x10);
        assert_eq!(entries[0].vco1.min_freq_khz, 100_000);
        assert_eq!(entries[0].vco1.max_freq_khz, 400_000);
    }
}
