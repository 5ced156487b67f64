// SPDX-License-Identifier: MIT

//! Top-level dispatcher: validates the image, then routes to the BIT or
//! legacy decoder depending on architecture, assembling the final
//! `ParsedBios`.

use crate::arch::Caps;
use crate::model::{
    ParsedBios, PerformanceLevel, PllLimit, RegisterCache, SensorConfig, Strings,
    ThermalThresholds, VersionInfo, VoltageLevel,
};
use crate::rom::RomImage;
use crate::{bit, identity, legacy, validator, Diagnostic, Error, Result};

struct Decoded {
    version: VersionInfo,
    strings: Strings,
    performance: Vec<PerformanceLevel>,
    voltage: Vec<VoltageLevel>,
    volt_mask: u8,
    pll_limits: Vec<PllLimit>,
    thermal: ThermalThresholds,
    sensor: SensorConfig,
    temp_correction: Option<i32>,
    registers: RegisterCache,
    diagnostics: Vec<Diagnostic>,
}

pub fn parse(rom: RomImage) -> Result<ParsedBios> {
    let validated = validator::validate(&rom)?;
    let r = rom.reader();

    let mut card_identity = identity::decode(
        &rom,
        validated.device_id,
        validated.architecture,
        identity::default_adapter_name,
        identity::default_vendor_name,
    )?;

    let decoded = if let Some(bit_offset) = validated.bit_offset {
        let out = bit::decode(&r, bit_offset, validated.architecture);
        bit::apply_identity(&mut card_identity, &out);
        Decoded {
            version: VersionInfo {
                bios_version: out.bios_version.unwrap_or_default(),
                bios_version_secondary: out.bios_version_secondary.unwrap_or_default(),
                mod_date: r.read_cstr(0x38, 9).unwrap_or_default(),
                build_date: out.build_date.unwrap_or_default(),
                bmp_major: None,
                bmp_minor: None,
                text_time_ms: out.text_time_ms,
            },
            strings: out.strings,
            performance: out.performance,
            voltage: out.voltage,
            volt_mask: out.volt_mask,
            pll_limits: out.pll_limits,
            thermal: out.thermal,
            sensor: out.sensor,
            temp_correction: out.temp_correction,
            registers: out.registers,
            diagnostics: out.diagnostics,
        }
    } else {
        let bmp_offset = validated.bmp_offset.expect("validator guarantees one anchor");
        let out = legacy::decode(&r, bmp_offset, validated.architecture);
        Decoded {
            version: out.version,
            strings: Strings {
                sign_on: out.sign_on,
                ..Strings::default()
            },
            performance: out.performance,
            voltage: out.voltage,
            volt_mask: out.volt_mask,
            pll_limits: Vec::new(),
            thermal: ThermalThresholds::default(),
            sensor: SensorConfig::default(),
            temp_correction: None,
            registers: RegisterCache::default(),
            diagnostics: out.diagnostics,
        }
    };

    let mut diagnostics = decoded.diagnostics;
    let caps = Caps::from_architecture(validated.architecture) | decoded.thermal.caps;

    if rom.checksum() != 0 {
        diagnostics.push(Diagnostic::new("checksum", Error::ChecksumBad));
    }

    Ok(ParsedBios {
        rom,
        identity: card_identity,
        version: decoded.version,
        strings: decoded.strings,
        performance: decoded.performance,
        voltage: decoded.voltage,
        volt_mask: decoded.volt_mask,
        pll_limits: decoded.pll_limits,
        thermal: decoded.thermal,
        sensor: decoded.sensor,
        temp_correction: decoded.temp_correction,
        registers: decoded.registers,
        caps,
        diagnostics,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rom::RomImage;

    fn minimal_nv3x_rom() -> RomImage {
        let size = 32768usize;
        let mut bytes = vec![0u8; size];
        bytes[0] = 0x55;
        bytes[1] = 0xAA;
        bytes[2] = (size >> 9) as u8;
        bytes[0x10] = (size as u16 & 0xFF) as u8;
        bytes[0x11] = (size >> 8) as u8;
        let pcir = 0x20;
        bytes[pcir..pcir + 4].copy_from_slice(b"PCIR");
        bytes[pcir + 4] = 0xDE;
        bytes[pcir + 5] = 0x10;
        bytes[pcir + 6] = 0x10;
        bytes[pcir + 7] = 0x01;
        let anchor = 0x40;
        bytes[anchor..anchor + 4].copy_from_slice(&[0xFF, 0x7F, b'N', b'V']);
        bytes[anchor + 5] = 5;
        bytes[anchor + 10..anchor + 14].copy_from_slice(&0x0004_0012u32.to_le_bytes());
        RomImage::new(&bytes, size).unwrap()
    }

    #[test]
    fn parses_minimal_nv3x_rom() {
        let rom = minimal_nv3x_rom();
        let parsed = parse(rom).unwrap();
        assert_eq!(parsed.version.bios_version, "00.04.00.12");
    }

    #[test]
    fn flags_nonzero_checksum_as_diagnostic() {
        let rom = minimal_nv3x_rom();
        let parsed = parse(rom).unwrap();
        assert!(parsed
            .diagnostics
            .iter()
            .any(|d| d.table == "checksum"));
    }
}
