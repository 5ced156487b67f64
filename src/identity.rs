// SPDX-License-Identifier: MIT

//! Card identity: ids read unconditionally from fixed offsets, plus the
//! hierarchy id and board id that only BIT entry `'i'` supplies.

use crate::arch::{Architecture, HierarchyId};
use crate::model::CardIdentity;
use crate::rom::RomImage;
use crate::Result;

pub type NameLookup = fn(u16) -> String;

pub fn default_adapter_name(_device_id: u16) -> String {
    String::new()
}

pub fn default_vendor_name(subvendor_id: u16) -> String {
    if subvendor_id == 0x10DE {
        "NVIDIA".to_string()
    } else {
        String::new()
    }
}

pub fn decode(
    rom: &RomImage,
    device_id: u16,
    architecture: Architecture,
    adapter_name: NameLookup,
    vendor_name: NameLookup,
) -> Result<CardIdentity> {
    let r = rom.reader();
    let subvendor_id = r.u16_le(0x54)?;
    let subsystem_id = r.u16_le(0x56)?;
    Ok(CardIdentity {
        device_id,
        subvendor_id,
        subsystem_id,
        board_id: 0,
        hierarchy_id: None,
        hierarchy_id_raw: 0,
        architecture,
        adapter_name: adapter_name(device_id),
        vendor_name: vendor_name(subvendor_id),
    })
}

/// Populated from BIT entry `'i'`: `board_id` and `hierarchy_id`. The raw
/// byte is kept in `hierarchy_id_raw` even when it falls outside the
/// recognized 0..=5 range, matching the original's `default: print raw` case.
pub fn apply_bit_identity(identity: &mut CardIdentity, board_id: u16, hierarchy_raw: u8) {
    identity.board_id = board_id;
    identity.hierarchy_id = HierarchyId::from_raw(hierarchy_raw);
    identity.hierarchy_id_raw = hierarchy_raw;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn vendor_name_known_id() {
        assert_eq!(default_vendor_name(0x10DE), "NVIDIA");
        assert_eq!(default_vendor_name(0x1043), "");
    }
}
