// SPDX-License-Identifier: MIT

//! Legacy BMP decoder (§4.4) for NV5/NV3X ROMs, plus the NV3X-specific
//! performance table (§4.8) that only exists on that generation's legacy
//! layout.

use crate::arch::Architecture;
use crate::bit::voltage;
use crate::model::{PerformanceLevel, VersionInfo, VoltageLevel};
use crate::reader::Reader;
use crate::{Diagnostic, Error};

pub struct LegacyOutput {
    pub version: VersionInfo,
    pub sign_on: String,
    pub performance: Vec<PerformanceLevel>,
    pub voltage: Vec<VoltageLevel>,
    pub volt_mask: u8,
    pub diagnostics: Vec<Diagnostic>,
}

pub fn decode(r: &Reader<'_>, bmp_offset: usize, architecture: Architecture) -> LegacyOutput {
    let mut diagnostics = Vec::new();

    let major = r.u8(bmp_offset + 5).ok();
    let minor = r.u8(bmp_offset + 6).ok();
    let version_value = r.u32_le(bmp_offset + 10).unwrap_or(0);
    let sign_on_ptr = r.u16_le(bmp_offset + 30).unwrap_or(0) as usize;
    let sign_on = r.read_cstr(sign_on_ptr, 256).unwrap_or_default();

    let version = VersionInfo {
        bios_version: crate::version::format_legacy(version_value),
        bios_version_secondary: String::new(),
        mod_date: r.read_cstr(0x38, 9).unwrap_or_default(),
        build_date: String::new(),
        bmp_major: major,
        bmp_minor: minor,
        text_time_ms: None,
    };

    let mut performance = Vec::new();
    let mut voltage_entries = Vec::new();
    let mut volt_mask = 0u8;

    if architecture.contains(Architecture::NV3X) {
        if let Ok(perf_offset) = r.u16_le(bmp_offset + 0x94) {
            let (entries, mut diag) = parse_nv30_performance_table(r, perf_offset as usize);
            performance = entries;
            diagnostics.append(&mut diag);
        }
        if let Ok(volt_offset) = r.u16_le(bmp_offset + 0x98) {
            let (result, mut diag) = voltage::parse(r, volt_offset as usize);
            voltage_entries = result.entries;
            volt_mask = result.volt_mask;
            diagnostics.append(&mut diag);
        }
    }

    LegacyOutput {
        version,
        sign_on,
        performance,
        voltage: voltage_entries,
        volt_mask,
        diagnostics,
    }
}

/// NV3X-specific performance table: `start=rom[+0]`, `num_entries=rom[+2]`,
/// `size=rom[+3]`; rows begin at `offset+start+1`.
fn parse_nv30_performance_table(
    r: &Reader<'_>,
    offset: usize,
) -> (Vec<PerformanceLevel>, Vec<Diagnostic>) {
    let mut entries = Vec::new();
    let mut diagnostics = Vec::new();

    let header = (|| -> crate::Result<(u8, u8, u8)> {
        Ok((r.u8(offset)?, r.u8(offset + 2)?, r.u8(offset + 3)?))
    })();
    let (start, num_entries, size) = match header {
        Ok(h) => h,
        Err(e) => {
            diagnostics.push(Diagnostic::new("nv3x_performance", e));
            return (entries, diagnostics);
        }
    };

    if num_entries as usize > crate::model::MAX_PERF_LVLS {
        diagnostics.push(Diagnostic::new(
            "nv3x_performance",
            Error::TableOverflow {
                table: "nv3x_performance",
            },
        ));
    }
    let capped = (num_entries as usize).min(crate::model::MAX_PERF_LVLS);

    let mut row = offset + start as usize + 1;
    for _ in 0..capped {
        let entry = (|| -> crate::Result<PerformanceLevel> {
            Ok(PerformanceLevel {
                nvclk_mhz: r.u32_le(row)? / 100,
                memclk_mhz: r.u32_le(row + 4)? / 50,
                shaderclk_mhz: None,
                fanspeed: r.u8(row + 54)?,
                voltage: r.u8(row + 55)? as f32 / 100.0,
                active: true,
                lock: None,
                delta: None,
            })
        })();
        match entry {
            Ok(e) => entries.push(e),
            Err(e) => {
                diagnostics.push(Diagnostic::new("nv3x_performance", e));
                break;
            }
        }
        row += size as usize;
    }

    (entries, diagnostics)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_nv30_performance_row() {
        let mut buf = vec![0u8; 128];
        let offset = 0;
        buf[offset] = 0; // start
        buf[offset + 2] = 1; // num_entries
        buf[offset + 3] = 60; // size
        let row = offset + 1;
        buf[row..row + 4].copy_from_slice(&50000u32.to_le_bytes());
        buf[row + 4..row + 8].copy_from_slice(&40000u32.to_le_bytes());
        buf[row + 54] = 70;
        buf[row + 55] = 110;
        let r = Reader::new(&buf, buf.len());
        let (entries, diagnostics) = parse_nv30_performance_table(&r, offset);
        assert!(diagnostics.is_empty());
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].nvclk_mhz, 500);
        assert_eq!(entries[0].memclk_mhz, 800);
        assert_eq!(entries[0].fanspeed, 70);
    }
}
