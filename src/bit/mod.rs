// SPDX-License-Identifier: MIT

//! BIT directory decoder: walks the tagged-entry list that begins right
//! after the `"BIT\0"` anchor and dispatches each entry to its sub-table
//! parser.

pub mod perf;
pub mod pll;
pub mod strings;
pub mod thermal;
pub mod voltage;

use crate::arch::Architecture;
use crate::model::{
    CardIdentity, PerformanceLevel, PllLimit, RegisterCache, SensorConfig, Strings,
    ThermalThresholds, VoltageLevel,
};
use crate::reader::Reader;
use crate::{init, Diagnostic};
use log::{debug, warn};

const ENTRY_SIZE: usize = 6;

pub struct BitOutput {
    pub bios_version: Option<String>,
    pub bios_version_secondary: Option<String>,
    pub text_time_ms: Option<u16>,
    pub build_date: Option<String>,
    pub pll_limits: Vec<PllLimit>,
    pub performance: Vec<PerformanceLevel>,
    pub voltage: Vec<VoltageLevel>,
    pub volt_mask: u8,
    pub thermal: ThermalThresholds,
    pub sensor: SensorConfig,
    pub temp_correction: Option<i32>,
    pub strings: Strings,
    pub registers: RegisterCache,
    pub board_id: Option<u16>,
    pub hierarchy_raw: Option<u8>,
    pub diagnostics: Vec<Diagnostic>,
}

impl Default for BitOutput {
    fn default() -> Self {
        BitOutput {
            bios_version: None,
            bios_version_secondary: None,
            text_time_ms: None,
            build_date: None,
            pll_limits: Vec::new(),
            performance: Vec::new(),
            voltage: Vec::new(),
            volt_mask: 0,
            thermal: ThermalThresholds::default(),
            sensor: SensorConfig::default(),
            temp_correction: None,
            strings: Strings::default(),
            registers: RegisterCache::default(),
            board_id: None,
            hierarchy_raw: None,
            diagnostics: Vec::new(),
        }
    }
}

/// `entries_offset` is the first byte after the `"BIT\0"` marker.
pub fn decode(r: &Reader<'_>, entries_offset: usize, architecture: Architecture) -> BitOutput {
    let mut out = BitOutput::default();
    let mut offset = entries_offset;

    loop {
        let id0 = match r.u8(offset) {
            Ok(b) => b,
            Err(e) => {
                out.diagnostics.push(Diagnostic::new("bit", e));
                break;
            }
        };
        let id1 = r.u8(offset + 1).unwrap_or(0);
        if id0 == 0 && id1 == 0 {
            break;
        }
        let entry_len = r.u16_le(offset + 2).unwrap_or(0);
        let entry_offset = match r.u16_le(offset + 4) {
            Ok(o) => o as usize,
            Err(e) => {
                out.diagnostics.push(Diagnostic::new("bit", e));
                break;
            }
        };

        dispatch(r, id0, entry_offset, entry_len, architecture, &mut out);

        offset += ENTRY_SIZE;
    }

    out
}

fn dispatch(
    r: &Reader<'_>,
    id: u8,
    offset: usize,
    len: u16,
    architecture: Architecture,
    out: &mut BitOutput,
) {
    match id {
        0 => {
            debug!("bit table version entry at {:#x}", offset);
        }
        b'B' => {
            if let (Ok(version), Ok(text_time)) = (r.u32_le(offset), r.u16_le(offset + 0x0A)) {
                let extra = r.u8(offset + 4).unwrap_or(0);
                out.bios_version = Some(crate::version::format_bit(version, extra));
                out.text_time_ms = Some(text_time);
            }
        }
        b'C' => {
            if let Ok(pll_offset) = r.u16_le(offset + 0x08) {
                let (entries, mut diag) = pll::parse(r, pll_offset as usize);
                out.pll_limits = entries;
                out.diagnostics.append(&mut diag);
            }
        }
        b'I' => {
            if let Ok(init_offset) = r.u16_le(offset) {
                let max_tables = (len as usize / 2).max(1);
                let (registers, mut diag) = init::run_tables(r, init_offset as usize, max_tables);
                out.registers = registers;
                out.diagnostics.append(&mut diag);
            }
        }
        b'P' => {
            if let Ok(perf_offset) = r.u16_le(offset) {
                let (entries, _caps, mut diag) = perf::parse(r, perf_offset as usize, architecture);
                out.performance = entries;
                out.diagnostics.append(&mut diag);
            }
            if let Ok(temp_offset) = r.u16_le(offset + 0x0C) {
                let (result, mut diag) = thermal::parse(r, temp_offset as usize);
                out.thermal = result.thresholds;
                out.sensor = result.sensor;
                out.temp_correction = result.temp_correction;
                out.diagnostics.append(&mut diag);
            }
            if let Ok(volt_offset) = r.u16_le(offset + 0x10) {
                let (result, mut diag) = voltage::parse(r, volt_offset as usize);
                out.voltage = result.entries;
                out.volt_mask = result.volt_mask;
                out.diagnostics.append(&mut diag);
            }
        }
        b'S' => {
            let (strings, mut diag) = strings::parse(r, offset, len, architecture);
            out.strings = strings;
            out.diagnostics.append(&mut diag);
        }
        b'i' => {
            if let Ok(version) = r.u32_le(offset) {
                let extra = r.u8(offset + 4).unwrap_or(0);
                out.bios_version_secondary = Some(crate::version::format_bit(version, extra));
            }
            out.board_id = r.u16_le(offset + 0x0B).ok();
            out.build_date = r.read_cstr(offset + 0x0F, 9).ok();
            out.hierarchy_raw = r.u8(offset + 0x24).ok();
        }
        other => {
            warn!("unknown BIT entry id {:#04x} at offset {:#x}", other, offset);
        }
    }
}

/// Applies an `'i'` entry's board/hierarchy fields onto a `CardIdentity`.
pub fn apply_identity(identity: &mut CardIdentity, out: &BitOutput) {
    if let Some(board_id) = out.board_id {
        crate::identity::apply_bit_identity(identity, board_id, out.hierarchy_raw.unwrap_or(0));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn terminates_on_zero_id() {
        let buf = vec![0u8; 16];
        let r = Reader::new(&buf, buf.len());
        let out = decode(&r, 0, Architecture::NV4X);
        assert!(out.diagnostics.is_empty());
        assert!(out.pll_limits.is_empty());
    }

    #[test]
    fn dispatches_c_entry_to_pll() {
        let mut buf = vec![0u8; 128];
        // BIT entry: id='C', len=0, offset=40
        buf[0] = b'C';
        buf[1] = 0;
        buf[4..6].copy_from_slice(&40u16.to_le_bytes());
        // entry.offset+0x08 holds the pll table pointer
        let pll_table = 80usize;
        buf[40 + 0x08..40 + 0x0A].copy_from_slice(&(pll_table as u16).to_le_bytes());
        buf[pll_table] = 1; // version
        buf[pll_table + 1] = 4; // start
        buf[pll_table + 2] = 0x1F; // entry_size
        buf[pll_table + 3] = 0; // num_entries
        let r = Reader::new(&buf, buf.len());
        let out = decode(&r, 0, Architecture::NV4X);
        assert!(out.pll_limits.is_empty());
        assert!(out.diagnostics.is_empty());
    }
}
