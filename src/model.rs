// SPDX-License-Identifier: MIT

//! The aggregate output of a successful parse, and the nested table types
//! that populate it. Mirrors `struct nvbios` from the reference decoder,
//! minus the fields that exist only to support in-place hardware state
//! (the raw card handle, priority flags) rather than decoded ROM content.

use crate::arch::{Architecture, Caps, HierarchyId};
use crate::rom::RomImage;
use crate::Diagnostic;
use serde::Serialize;

pub const MAX_PERF_LVLS: usize = 4;
pub const MAX_VOLT_LVLS: usize = 8;
pub const MAX_PLL_ENTRIES: usize = 16;

#[derive(Debug, Clone, Serialize)]
pub struct CardIdentity {
    pub device_id: u16,
    pub subvendor_id: u16,
    pub subsystem_id: u16,
    pub board_id: u16,
    pub hierarchy_id: Option<HierarchyId>,
    /// The raw BIT `'i'` hierarchy byte, kept alongside `hierarchy_id` so a
    /// code outside 0..=5 is not lost to `None` (spec: "else raw").
    pub hierarchy_id_raw: u8,
    pub architecture: Architecture,
    pub adapter_name: String,
    pub vendor_name: String,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct VersionInfo {
    pub bios_version: String,
    pub bios_version_secondary: String,
    pub mod_date: String,
    pub build_date: String,
    pub bmp_major: Option<u8>,
    pub bmp_minor: Option<u8>,
    pub text_time_ms: Option<u16>,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct PerformanceLevel {
    pub nvclk_mhz: u32,
    pub memclk_mhz: u32,
    pub shaderclk_mhz: Option<u32>,
    pub voltage: f32,
    pub fanspeed: u8,
    pub active: bool,
    pub lock: Option<u8>,
    pub delta: Option<i32>,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct VoltageLevel {
    pub vid: u8,
    pub voltage: f32,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct Vco {
    pub min_input_freq_khz: u32,
    pub max_input_freq_khz: u32,
    pub min_freq_khz: u32,
    pub max_freq_khz: u32,
    pub min_n: u8,
    pub max_n: u8,
    pub min_m: u8,
    pub max_m: u8,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct PllLimit {
    pub reg: u32,
    pub var1d: u8,
    pub var1e: u8,
    pub vco1: Vco,
    pub vco2: Vco,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct SensorConfig {
    pub slope_div: i32,
    pub slope_mult: i32,
    pub diode_offset_div: i32,
    pub diode_offset_mult: i32,
    pub temp_correction: i32,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct ThermalThresholds {
    pub caps: Caps,
    pub fnbst_int: Option<u16>,
    pub fnbst_ext: Option<u16>,
    pub thrtl_int: Option<u16>,
    pub thrtl_ext: Option<u16>,
    pub crtcl_int: Option<u16>,
    pub crtcl_ext: Option<u16>,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct Strings {
    pub sign_on: String,
    pub version_string: String,
    pub copyright: String,
    pub oem: String,
    pub vesa_vendor: String,
    pub vesa_name: String,
    pub vesa_revision: String,
    pub engineering_release: String,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct RegisterCache {
    pub pipe_cfg: Option<u32>,
    pub nvpll: Option<u32>,
    pub mpll: Option<u32>,
    pub spll: Option<u32>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ParsedBios {
    #[serde(skip)]
    pub rom: RomImage,
    pub identity: CardIdentity,
    pub version: VersionInfo,
    pub strings: Strings,
    pub performance: Vec<PerformanceLevel>,
    pub voltage: Vec<VoltageLevel>,
    /// Selects which VID bits are significant; shared by every `VoltageLevel`.
    pub volt_mask: u8,
    pub pll_limits: Vec<PllLimit>,
    pub thermal: ThermalThresholds,
    pub sensor: SensorConfig,
    /// Set by temperature-table id `0x01` alongside `SensorConfig::temp_correction`;
    /// the original writes both fields under the same condition (see DESIGN.md).
    pub temp_correction: Option<i32>,
    pub registers: RegisterCache,
    pub caps: Caps,
    pub diagnostics: Vec<Diagnostic>,
}

impl ParsedBios {
    pub fn checksum_ok(&self) -> bool {
        self.rom.checksum() == 0
    }
}
