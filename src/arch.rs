// SPDX-License-Identifier: MIT

//! Architecture classification and the small capability bitset the
//! performance-table decoder derives from it.

use bitflags::bitflags;
use serde::Serialize;
use strum::{Display, FromRepr};

bitflags! {
    /// NV47 and NV49 are sub-flags within NV4X: a device whose architecture
    /// is NV47 or NV49 also carries the NV4X bit set.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
    pub struct Architecture: u32 {
        const NV5   = 0b0000001;
        const NV3X  = 0b0000010;
        const NV4X  = 0b0000100;
        const NV47  = 0b0001100;
        const NV49  = 0b0010100;
        const NV5X  = 0b0100000;
    }
}

impl Architecture {
    pub fn is_bit_generation(self) -> bool {
        self.intersects(Architecture::NV4X | Architecture::NV5X)
    }
}

bitflags! {
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
    pub struct Caps: u32 {
        const DELTA_CLK       = 1 << 0;
        const SHADER_CLK      = 1 << 1;
        const LOCK            = 1 << 2;
        const FNBST_THLD_1    = 1 << 3;
        const FNBST_THLD_2    = 1 << 4;
        const CRTCL_THLD_1    = 1 << 5;
        const CRTCL_THLD_2    = 1 << 6;
        const THRTL_THLD_1    = 1 << 7;
        const THRTL_THLD_2    = 1 << 8;
    }
}

impl Caps {
    pub fn from_architecture(arch: Architecture) -> Caps {
        let mut caps = Caps::empty();
        if arch.intersects(Architecture::NV47 | Architecture::NV49) {
            caps |= Caps::DELTA_CLK;
        }
        if arch.contains(Architecture::NV5X) {
            caps |= Caps::SHADER_CLK;
        }
        if arch.contains(Architecture::NV4X) {
            caps |= Caps::LOCK;
        }
        caps
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, FromRepr, Display, Serialize)]
#[repr(u8)]
pub enum HierarchyId {
    None = 0,
    Normal = 1,
    SwitchPort0 = 2,
    SwitchPort1 = 3,
    SwitchPort2 = 4,
    SwitchPort3 = 5,
}

impl HierarchyId {
    /// Recognizes only the documented codes (0..=5); callers that need the
    /// raw byte for unrecognized codes keep it separately
    /// (`CardIdentity::hierarchy_id_raw`) rather than folding it in here.
    pub fn from_raw(raw: u8) -> Option<HierarchyId> {
        HierarchyId::from_repr(raw)
    }
}

/// Maps a device-id to an architecture tag. Device-id ranges below follow the
/// generation boundaries used by the reference decoder: 0x0020-range parts
/// are NV5, 0x01xx/0x03xx are NV3X, 0x00Cx and most 0x01xx-0x02xx NV4x parts
/// are NV4X (with the 0x014x and 0x017x PCI-Express refresh ranges further
/// tagged NV47/NV49), and 0x04xx+ parts are NV5X.
pub fn architecture_for_device_id(device_id: u16) -> Architecture {
    match device_id {
        0x0090..=0x00FF => Architecture::NV47,
        0x0100..=0x01FF if (device_id & 0xFF00) == 0x0100 && device_id >= 0x0140 => {
            Architecture::NV49
        }
        0x0020..=0x002F => Architecture::NV5,
        0x0100..=0x0200 | 0x0300..=0x03FF => Architecture::NV3X,
        0x0040..=0x00CF => Architecture::NV4X,
        0x0400..=0xFFFF => Architecture::NV5X,
        _ => Architecture::NV4X,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn nv47_and_nv49_carry_nv4x_bit() {
        assert!(Architecture::NV47.contains(Architecture::NV4X));
        assert!(Architecture::NV49.contains(Architecture::NV4X));
    }

    #[test]
    fn caps_derivation_matches_architecture() {
        assert_eq!(
            Caps::from_architecture(Architecture::NV47),
            Caps::DELTA_CLK | Caps::LOCK
        );
        assert_eq!(
            Caps::from_architecture(Architecture::NV5X),
            Caps::SHADER_CLK
        );
    }

    #[test]
    fn hierarchy_id_roundtrips_known_values() {
        assert_eq!(HierarchyId::from_raw(2), Some(HierarchyId::SwitchPort0));
        assert_eq!(HierarchyId::from_raw(200), None);
    }
}
