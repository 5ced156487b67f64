// SPDX-License-Identifier: MIT

//! Voltage table (BIT entry `'P'`, third sub-pointer). The first byte picks
//! between two incompatible header layouts.

use crate::model::{VoltageLevel, MAX_VOLT_LVLS};
use crate::reader::Reader;
use crate::{Diagnostic, Error};

pub struct VoltageResult {
    pub entries: Vec<VoltageLevel>,
    pub volt_mask: u8,
}

pub fn parse(r: &Reader<'_>, offset: usize) -> (VoltageResult, Vec<Diagnostic>) {
    let mut diagnostics = Vec::new();
    let mut result = VoltageResult {
        entries: Vec::new(),
        volt_mask: 0,
    };

    let layout = match r.u8(offset) {
        Ok(b) => b,
        Err(e) => {
            diagnostics.push(Diagnostic::new("voltage", e));
            return (result, diagnostics);
        }
    };

    let parsed = (|| -> crate::Result<(usize, u8, u8, u8)> {
        if layout == 0x10 || layout == 0x12 {
            let entry_size = r.u8(offset + 1)?;
            let num_entries = r.u8(offset + 2)?;
            let volt_mask = r.u8(offset + 4)?;
            Ok((5, entry_size, num_entries, volt_mask))
        } else {
            let start = r.u8(offset + 1)?;
            let num_entries = r.u8(offset + 2)?;
            let entry_size = r.u8(offset + 3)?;
            let volt_mask = r.u8(offset + start as usize - 1)?;
            Ok((start as usize, entry_size, num_entries, volt_mask))
        }
    })();

    let (start, entry_size, num_entries, volt_mask) = match parsed {
        Ok(v) => v,
        Err(e) => {
            diagnostics.push(Diagnostic::new("voltage", e));
            return (result, diagnostics);
        }
    };
    result.volt_mask = volt_mask;

    if num_entries as usize > MAX_VOLT_LVLS {
        diagnostics.push(Diagnostic::new(
            "voltage",
            Error::TableOverflow { table: "voltage" },
        ));
    }
    let capped = (num_entries as usize).min(MAX_VOLT_LVLS);

    let mut row = offset + start;
    for _ in 0..capped {
        let entry = (|| -> crate::Result<VoltageLevel> {
            Ok(VoltageLevel {
                voltage: r.u8(row)? as f32 / 100.0,
                vid: r.u8(row + 1)?,
            })
        })();
        match entry {
            Ok(e) => result.entries.push(e),
            Err(e) => {
                diagnostics.push(Diagnostic::new("voltage", e));
                break;
            }
        }
        row += entry_size as usize;
    }

    (result, diagnostics)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_layout_0x12() {
        let mut buf = vec![0u8; 32];
        buf[0] = 0x12;
        buf[1] = 0x04; // entry_size
        buf[2] = 0x03; // num_entries
        buf[4] = 0x1F; // volt_mask
        let row = 5;
        let vals = [(0x6Eu8, 0x05u8), (0x78, 0x07), (0x82, 0x09)];
        for (i, (v, vid)) in vals.iter().enumerate() {
            buf[row + i * 4] = *v;
            buf[row + i * 4 + 1] = *vid;
        }
        let r = Reader::new(&buf, buf.len());
        let (result, diagnostics) = parse(&r, 0);
        assert!(diagnostics.is_empty());
        assert_eq!(result.volt_mask, 0x1F);
        assert_eq!(result.entries.len(), 3);
        assert!((result.entries[0].voltage - 1.10).abs() < 1e-3);
        assert_eq!(result.entries[0].vid, 5);
        assert_eq!(result.entries[2].vid, 9);
    }

    #[test]
    fn parses_default_layout() {
        let mut buf = vec![0u8; 32];
        buf[0] = 0x20;
        buf[1] = 0x05; // start
        buf[2] = 0x01; // num_entries
        buf[3] = 0x04; // entry_size
        buf[4] = 0x2A; // volt_mask at start-1
        let row = 5;
        buf[row] = 100;
        buf[row + 1] = 3;
        let r = Reader::new(&buf, buf.len());
        let (result, diagnostics) = parse(&r, 0);
        assert!(diagnostics.is_empty());
        assert_eq!(result.volt_mask, 0x2A);
        assert_eq!(result.entries.len(), 1);
        assert_eq!(result.entries[0].vid, 3);
    }
}
