// SPDX-License-Identifier: MIT

//! Bounds-checked little-endian reads over a ROM buffer.
//!
//! Every read is checked against the image's logical `rom_size`, never its
//! full 64 KiB capacity: bytes past `rom_size` are padding the acquisition
//! backend left behind and must never be dereferenced.

use crate::{Error, Result};
use log::trace;

pub struct Reader<'a> {
    buf: &'a [u8],
    rom_size: usize,
}

impl<'a> Reader<'a> {
    pub fn new(buf: &'a [u8], rom_size: usize) -> Self {
        Reader { buf, rom_size }
    }

    fn check(&self, offset: usize, len: usize) -> Result<()> {
        if offset.checked_add(len).map_or(true, |end| end > self.rom_size) {
            trace!(
                "truncated read: offset {} len {} rom_size {}",
                offset,
                len,
                self.rom_size
            );
            return Err(Error::Truncated {
                offset,
                len,
                rom_size: self.rom_size,
            });
        }
        Ok(())
    }

    pub fn u8(&self, offset: usize) -> Result<u8> {
        self.check(offset, 1)?;
        Ok(self.buf[offset])
    }

    pub fn i8(&self, offset: usize) -> Result<i8> {
        Ok(self.u8(offset)? as i8)
    }

    pub fn u16_le(&self, offset: usize) -> Result<u16> {
        self.check(offset, 2)?;
        Ok(u16::from_le_bytes([self.buf[offset], self.buf[offset + 1]]))
    }

    pub fn i16_le(&self, offset: usize) -> Result<i16> {
        Ok(self.u16_le(offset)? as i16)
    }

    pub fn u32_le(&self, offset: usize) -> Result<u32> {
        self.check(offset, 4)?;
        Ok(u32::from_le_bytes([
            self.buf[offset],
            self.buf[offset + 1],
            self.buf[offset + 2],
            self.buf[offset + 3],
        ]))
    }

    pub fn bytes(&self, offset: usize, len: usize) -> Result<&'a [u8]> {
        self.check(offset, len)?;
        Ok(&self.buf[offset..offset + len])
    }

    /// Copies a zero-terminated string starting at `offset`, stopping at the
    /// first NUL or after `cap - 1` bytes, whichever comes first.
    pub fn read_cstr(&self, offset: usize, cap: usize) -> Result<String> {
        let mut out = Vec::with_capacity(cap);
        let mut pos = offset;
        while out.len() < cap.saturating_sub(1) {
            let b = self.u8(pos)?;
            if b == 0 {
                break;
            }
            out.push(b);
            pos += 1;
        }
        Ok(String::from_utf8_lossy(&out).into_owned())
    }

    /// Copies `n` bytes starting at `offset`, XOR-masking each with `mask`.
    pub fn read_masked(&self, offset: usize, n: usize, mask: u8) -> Result<String> {
        let raw = self.bytes(offset, n)?;
        let unmasked: Vec<u8> = raw
            .iter()
            .map(|b| b ^ mask)
            .take_while(|b| *b != 0)
            .collect();
        Ok(String::from_utf8_lossy(&unmasked).into_owned())
    }

    pub fn rom_size(&self) -> usize {
        self.rom_size
    }
}
