// SPDX-License-Identifier: MIT

//! String-reference table (BIT entry `'S'`). Seven plain strings plus an
//! obfuscated engineering-release string whose own offset is computed
//! differently depending on architecture.

use crate::arch::Architecture;
use crate::model::Strings;
use crate::reader::Reader;
use crate::{Diagnostic, Error};

const EXPECTED_LENGTH: u16 = 0x15;
const ENG_RELEASE_LEN: usize = 0x2E;
const ENG_RELEASE_MASK: u8 = 0xFF;

pub fn parse(
    r: &Reader<'_>,
    offset: usize,
    length: u16,
    architecture: Architecture,
) -> (Strings, Vec<Diagnostic>) {
    let mut strings = Strings::default();
    let mut diagnostics = Vec::new();

    if length != EXPECTED_LENGTH {
        diagnostics.push(Diagnostic::new(
            "strings",
            Error::TableOverflow { table: "strings" },
        ));
        return (strings, diagnostics);
    }

    let mut slots: [String; 7] = Default::default();
    for (i, slot) in slots.iter_mut().enumerate() {
        let read = (|| -> crate::Result<String> {
            let ptr = r.u16_le(offset + 3 * i)? as usize;
            let len = r.u8(offset + 2 + 3 * i)? as usize;
            r.read_masked(ptr, len, 0x00)
        })();
        match read {
            Ok(s) => *slot = s,
            Err(e) => diagnostics.push(Diagnostic::new("strings", e)),
        }
    }
    let [sign_on, version_string, copyright, oem, vesa_vendor, vesa_name, vesa_revision] = slots;
    strings.sign_on = sign_on;
    strings.version_string = version_string;
    strings.copyright = copyright;
    strings.oem = oem;
    strings.vesa_vendor = vesa_vendor;
    strings.vesa_name = vesa_name;
    strings.vesa_revision = vesa_revision;

    let eng_release_offset = (|| -> crate::Result<usize> {
        if architecture.contains(Architecture::NV5X) {
            let base = r.u16_le(offset + 0x12)? as usize;
            let extra = r.u8(offset + 0x14)? as usize;
            Ok(base + extra)
        } else {
            let base = r.u16_le(offset + 0x06)? as usize;
            let extra = r.u8(offset + 0x08)? as usize;
            Ok(base + extra + 1)
        }
    })();

    match eng_release_offset.and_then(|off| r.read_masked(off, ENG_RELEASE_LEN, ENG_RELEASE_MASK)) {
        Ok(s) => strings.engineering_release = s,
        Err(e) => diagnostics.push(Diagnostic::new("strings", e)),
    }

    (strings, diagnostics)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_unexpected_length() {
        let buf = vec![0u8; 64];
        let r = Reader::new(&buf, buf.len());
        let (_, diagnostics) = parse(&r, 0, 0x10, Architecture::NV4X);
        assert_eq!(diagnostics.len(), 1);
    }

    #[test]
    fn reads_plain_and_engineering_strings() {
        let mut buf = vec![0u8; 256];
        let table = 0usize;
        // sign-on string at ptr 100, length 5
        let sign_on_ptr = 100u16;
        buf[table..table + 2].copy_from_slice(&sign_on_ptr.to_le_bytes());
        buf[table + 2] = 5;
        buf[100..105].copy_from_slice(b"Hello");
        // remaining 6 plain slots point at zero-length empty strings at offset 0
        for i in 1..7 {
            buf[table + 3 * i..table + 3 * i + 2].copy_from_slice(&0u16.to_le_bytes());
            buf[table + 2 + 3 * i] = 0;
        }
        // NV4X engineering-release offset: base@+0x06 + rom[+0x08] + 1
        buf[table + 0x06..table + 0x08].copy_from_slice(&150u16.to_le_bytes());
        buf[table + 0x08] = 0;
        let eng_offset = 151usize;
        let masked: Vec<u8> = b"ENG-REL".iter().map(|b| b ^ 0xFF).collect();
        buf[eng_offset..eng_offset + masked.len()].copy_from_slice(&masked);
        let r = Reader::new(&buf, buf.len());
        let (strings, diagnostics) = parse(&r, 0, 0x15, Architecture::NV4X);
        assert!(diagnostics.is_empty());
        assert_eq!(strings.sign_on, "Hello");
        assert_eq!(strings.engineering_release, "ENG-REL");
    }
}
