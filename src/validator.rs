// SPDX-License-Identifier: MIT

//! Validates a ROM image and resolves the anchor that the rest of the
//! decoder dispatches on. Every failure here is fatal: no `ParsedBios` is
//! produced.

use crate::arch::{architecture_for_device_id, Architecture};
use crate::locator::find;
use crate::rom::RomImage;
use crate::{Error, Result};
use log::debug;

const NVIDIA_VENDOR_ID: u16 = 0x10DE;
const BMP_ANCHOR: [u8; 4] = [0xFF, 0x7F, b'N', b'V'];
const BIT_ANCHOR: &[u8] = b"BIT\0";

pub struct ValidatedImage {
    pub device_id: u16,
    pub architecture: Architecture,
    pub pcir_offset: usize,
    /// Offset of the `BIT\0` anchor's first entry-table byte, for NV4X/NV5X images.
    pub bit_offset: Option<usize>,
    /// Offset of the legacy `FF 7F N V` anchor, for NV5/NV3X images.
    pub bmp_offset: Option<usize>,
}

pub fn validate(rom: &RomImage) -> Result<ValidatedImage> {
    let r = rom.reader();
    let sig0 = r.u8(0)?;
    let sig1 = r.u8(1)?;
    if sig0 != 0x55 || sig1 != 0xAA {
        return Err(Error::InvalidSignature(sig0, sig1));
    }

    let declared = (r.u8(2)? as usize) << 9;
    let size_ptr = r.u16_le(0x18)? as usize;
    let confirmed = r.u16_le(0x10 + size_ptr)? as usize;
    if declared != confirmed {
        return Err(Error::SizeMismatch { declared, confirmed });
    }
    if declared != rom.rom_size() {
        return Err(Error::SizeMismatch {
            declared,
            confirmed: rom.rom_size(),
        });
    }

    let pcir_offset =
        find(rom.logical_bytes(), b"PCIR", 0).ok_or(Error::AnchorMissing("PCIR"))?;
    let vendor_id = r.u16_le(pcir_offset + 4)?;
    if vendor_id != NVIDIA_VENDOR_ID {
        return Err(Error::ForeignVendor(vendor_id));
    }
    let device_id = r.u16_le(pcir_offset + 6)?;
    let architecture = architecture_for_device_id(device_id);
    debug!(
        "validated PCIR at {:#x}, device_id {:#06x}, architecture {:?}",
        pcir_offset, device_id, architecture
    );

    if architecture.is_bit_generation() {
        let bit_marker =
            find(rom.logical_bytes(), BIT_ANCHOR, pcir_offset).ok_or(Error::AnchorMissing("BIT"))?;
        Ok(ValidatedImage {
            device_id,
            architecture,
            pcir_offset,
            bit_offset: Some(bit_marker + BIT_ANCHOR.len()),
            bmp_offset: None,
        })
    } else {
        let bmp_offset =
            find(rom.logical_bytes(), &BMP_ANCHOR, pcir_offset).ok_or(Error::AnchorMissing("BMP"))?;
        let bmp_version = r.u8(bmp_offset + 5)?;
        if bmp_version < 5 {
            return Err(Error::UnsupportedGeneration(bmp_version));
        }
        Ok(ValidatedImage {
            device_id,
            architecture,
            pcir_offset,
            bit_offset: None,
            bmp_offset: Some(bmp_offset),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rom::RomImage;

    fn rom_with(mut bytes: Vec<u8>, rom_size: usize) -> RomImage {
        bytes.resize(rom_size, 0);
        RomImage::new(&bytes, rom_size).unwrap()
    }

    #[test]
    fn rejects_bad_signature() {
        let rom = rom_with(vec![0x55, 0xAB], 512);
        assert!(matches!(validate(&rom), Err(Error::InvalidSignature(_, _))));
    }

    #[test]
    fn rejects_size_mismatch() {
        let mut bytes = vec![0u8; 512];
        bytes[0] = 0x55;
        bytes[1] = 0xAA;
        bytes[2] = 2; // declares 1024 bytes, but rom_size is 512
        let rom = RomImage::new(&bytes, 512).unwrap();
        assert!(matches!(validate(&rom), Err(Error::SizeMismatch { .. })));
    }

    #[test]
    fn accepts_legacy_nv3x_image() {
        let size = 32768usize;
        let mut bytes = vec![0u8; size];
        bytes[0] = 0x55;
        bytes[1] = 0xAA;
        bytes[2] = (size >> 9) as u8;
        bytes[0x18] = 0x00;
        bytes[0x19] = 0x00;
        bytes[0x10] = (size as u16 & 0xFF) as u8;
        bytes[0x11] = (size >> 8) as u8;
        let pcir = 0x20;
        bytes[pcir..pcir + 4].copy_from_slice(b"PCIR");
        bytes[pcir + 4] = 0xDE;
        bytes[pcir + 5] = 0x10;
        bytes[pcir + 6] = 0x10; // device id -> NV3X
        bytes[pcir + 7] = 0x01;
        let anchor = 0x40;
        bytes[anchor..anchor + 4].copy_from_slice(&[0xFF, 0x7F, b'N', b'V']);
        bytes[anchor + 5] = 5;
        let rom = RomImage::new(&bytes, size).unwrap();
        let v = validate(&rom).unwrap();
        assert_eq!(v.bmp_offset, Some(anchor));
        assert!(v.bit_offset.is_none());
    }
}
