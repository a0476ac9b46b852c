/*
Copyright 2025 Connor Nolan

Licensed under the Apache License, Version 2.0 (the "License");
you may not use this file except in compliance with the License.
You may obtain a copy of the License at

    http://www.apache.org/licenses/LICENSE-2.0

Unless required by applicable law or agreed to in writing, software
distributed under the License is distributed on an "AS IS" BASIS,
WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
See the License for the specific language governing permissions and
limitations under the License.
*/

use byteorder::{BigEndian, WriteBytesExt};
use std::io::{self, Write};

// Raw mode: every word big-endian, high byte first.
pub fn write_words<W: Write>(out: &mut W, words: &[u16]) -> io::Result<()> {
    for &word in words {
        out.write_u16::<BigEndian>(word)?;
    }
    Ok(())
}

// DC.L mode: four words per DW line, remainder one per line.
pub fn write_listing<W: Write>(out: &mut W, words: &[u16]) -> io::Result<()> {
    let mut chunks = words.chunks_exact(4);
    for chunk in chunks.by_ref() {
        writeln!(
            out,
            "DW {:#06x}, {:#06x}, {:#06x}, {:#06x}",
            chunk[0], chunk[1], chunk[2], chunk[3]
        )?;
    }
    for &word in chunks.remainder() {
        writeln!(out, "DW {:#06x}", word)?;
    }
    Ok(())
}
