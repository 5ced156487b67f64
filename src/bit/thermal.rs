// SPDX-License-Identifier: MIT

//! Temperature / threshold table (BIT entry `'P'`, second sub-pointer).

use crate::arch::Caps;
use crate::model::{SensorConfig, ThermalThresholds};
use crate::reader::Reader;
use crate::{Diagnostic, Error};
use log::warn;

pub struct ThermalResult {
    pub thresholds: ThermalThresholds,
    pub sensor: SensorConfig,
    pub temp_correction: Option<i32>,
}

fn threshold_value(raw: i16) -> u16 {
    ((raw as u16) >> 4) & 0x1FF
}

pub fn parse(r: &Reader<'_>, offset: usize) -> (ThermalResult, Vec<Diagnostic>) {
    let mut diagnostics = Vec::new();
    let mut thresholds = ThermalThresholds::default();
    let mut sensor = SensorConfig::default();
    let mut temp_correction = None;

    let version = r.u8(offset);
    let start = r.u8(offset + 1);
    let entry_size = r.u8(offset + 2);
    let num_entries = r.u8(offset + 3);
    let (version, start, entry_size, num_entries) = match (version, start, entry_size, num_entries)
    {
        (Ok(v), Ok(s), Ok(e), Ok(n)) => (v, s, e, n),
        _ => {
            diagnostics.push(Diagnostic::new(
                "thermal",
                Error::Truncated {
                    offset,
                    len: 4,
                    rom_size: r.rom_size(),
                },
            ));
            return (
                ThermalResult {
                    thresholds,
                    sensor,
                    temp_correction,
                },
                diagnostics,
            );
        }
    };
    let _ = version;

    let mut row = offset + start as usize;
    for _ in 0..num_entries {
        let id = match r.u8(row) {
            Ok(id) => id,
            Err(e) => {
                diagnostics.push(Diagnostic::new("thermal", e));
                break;
            }
        };
        let value = match r.i16_le(row + 1) {
            Ok(v) => v,
            Err(e) => {
                diagnostics.push(Diagnostic::new("thermal", e));
                break;
            }
        };

        match id {
            0x01 => {
                if (value & 0x8F) == 0 {
                    let corrected = (value >> 9) as i32;
                    temp_correction = Some(corrected);
                    sensor.temp_correction = corrected & 0x7F;
                }
            }
            0x04 => assign_threshold(
                &mut thresholds.crtcl_int,
                &mut thresholds.crtcl_ext,
                &mut thresholds.caps,
                Caps::CRTCL_THLD_1,
                Caps::CRTCL_THLD_2,
                threshold_value(value),
                "critical",
                &mut diagnostics,
            ),
            0x05 => assign_threshold(
                &mut thresholds.thrtl_int,
                &mut thresholds.thrtl_ext,
                &mut thresholds.caps,
                Caps::THRTL_THLD_1,
                Caps::THRTL_THLD_2,
                threshold_value(value),
                "throttle",
                &mut diagnostics,
            ),
            0x08 => assign_threshold(
                &mut thresholds.fnbst_int,
                &mut thresholds.fnbst_ext,
                &mut thresholds.caps,
                Caps::FNBST_THLD_1,
                Caps::FNBST_THLD_2,
                threshold_value(value),
                "fanboost",
                &mut diagnostics,
            ),
            0x10 => sensor.diode_offset_mult = value as i32,
            0x11 => sensor.diode_offset_div = value as i32,
            0x12 => sensor.slope_mult = value as i32,
            0x13 => sensor.slope_div = value as i32,
            other => {
                warn!("unknown temperature table id {:#04x}", other);
            }
        }

        row += entry_size as usize;
    }

    (
        ThermalResult {
            thresholds,
            sensor,
            temp_correction,
        },
        diagnostics,
    )
}

#[allow(clippy::too_many_arguments)]
fn assign_threshold(
    internal: &mut Option<u16>,
    external: &mut Option<u16>,
    caps: &mut Caps,
    first_flag: Caps,
    second_flag: Caps,
    value: u16,
    name: &'static str,
    diagnostics: &mut Vec<Diagnostic>,
) {
    if !caps.contains(first_flag) {
        *internal = Some(value);
        *caps |= first_flag;
    } else if !caps.contains(second_flag) {
        *external = Some(value);
        *caps |= second_flag;
    } else {
        warn!("unknown {} threshold occurrence ignored", name);
        diagnostics.push(Diagnostic::new(
            "thermal",
            Error::TableOverflow { table: name },
        ));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sensor_calibration_rows() {
        let mut buf = vec![0u8; 32];
        buf[0] = 1;
        buf[1] = 4; // start
        buf[2] = 3; // entry_size
        buf[3] = 4; // num_entries
        let mut row = 4;
        for (id, val) in [(0x10u8, 320i16), (0x11, 100), (0x12, 200), (0x13, 100)] {
            buf[row] = id;
            buf[row + 1..row + 3].copy_from_slice(&val.to_le_bytes());
            row += 3;
        }
        let r = Reader::new(&buf, buf.len());
        let (result, diagnostics) = parse(&r, 0);
        assert!(diagnostics.is_empty());
        assert_eq!(result.sensor.diode_offset_mult, 320);
        assert_eq!(result.sensor.diode_offset_div, 100);
        assert_eq!(result.sensor.slope_mult, 200);
        assert_eq!(result.sensor.slope_div, 100);
    }

    #[test]
    fn third_critical_threshold_is_ignored_with_diagnostic() {
        let mut buf = vec![0u8; 32];
        buf[0] = 1;
        buf[1] = 4;
        buf[2] = 3;
        buf[3] = 3;
        let mut row = 4;
        for val in [0x100i16, 0x200, 0x300] {
            buf[row] = 0x04;
            buf[row + 1..row + 3].copy_from_slice(&val.to_le_bytes());
            row += 3;
        }
        let r = Reader::new(&buf, buf.len());
        let (result, diagnostics) = parse(&r, 0);
        assert!(result.thresholds.crtcl_int.is_some());
        assert!(result.thresholds.crtcl_ext.is_some());
        assert_eq!(diagnostics.len(), 1);
    }
}
