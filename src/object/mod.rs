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

pub mod trie;

use crate::assembler::section::Section;
use crate::assembler::symbol_table::SymbolTable;
use crate::errors::AssemblyError;

// Object layout:
//
//   word 0   0xCB07 magic
//   word 1   self-relative offset to the export trie (patched last)
//   words..  object name, zero terminated
//   [ text section, including import stubs and library strings ]
//   word     data length (the %data descriptor)
//   [ data section ]
//   [ data->text reloc offsets ] 0xFFFF
//   [ data->data reloc offsets ] 0xFFFF
//   [ export trie ]

pub const OBJ_MAGIC: u16 = 0xCB07;
pub const EXPORT_PTR_OFFSET: usize = 1;
pub const RELOC_END: u16 = 0xFFFF;

// Relocation offsets into the data section, partitioned by the section the
// embedded address points into, so a loader can rebase each kind.
#[derive(Debug, Default, PartialEq, Eq)]
pub struct RelocationTables {
    pub data_text: Vec<usize>,
    pub data_data: Vec<usize>,
}

pub fn write_header(out: &mut Vec<u16>, obj_name: Option<&str>) {
    out.push(OBJ_MAGIC);
    out.push(0xFFFF); // export trie pointer slot
    if let Some(name) = obj_name {
        for c in name.chars() {
            out.push(c as u16);
        }
    }
    out.push(0);
}

pub fn write_reloc_trailer(out: &mut Vec<u16>, relocs: &RelocationTables) {
    for &offset in &relocs.data_text {
        out.push(offset as u16);
    }
    out.push(RELOC_END);
    for &offset in &relocs.data_data {
        out.push(offset as u16);
    }
    out.push(RELOC_END);
}

// Final stream index of a symbol, for self-relative trie leaf pointers.
pub(crate) fn symbol_final_offset(
    symbols: &SymbolTable,
    name: &str,
    text_offset_in_final: usize,
    data_offset_in_final: usize,
) -> Result<usize, AssemblyError> {
    let addr = symbols
        .label(name)
        .ok_or_else(|| AssemblyError::SemanticErrorNoLine {
            reason: format!("undefined symbol '{}' in export", name),
        })?;
    let section_offset = match addr.section {
        Section::Text => text_offset_in_final,
        Section::Data => data_offset_in_final,
    };
    Ok(addr.offset + section_offset)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_header_with_name() {
        let mut out = Vec::new();
        write_header(&mut out, Some("obj"));
        assert_eq!(out, vec![0xCB07, 0xFFFF, 0x6F, 0x62, 0x6A, 0]);
    }

    #[test]
    fn test_header_without_name() {
        let mut out = Vec::new();
        write_header(&mut out, None);
        assert_eq!(out, vec![0xCB07, 0xFFFF, 0]);
    }

    #[test]
    fn test_reloc_trailer_terminators() {
        let mut out = Vec::new();
        let relocs = RelocationTables {
            data_text: vec![1, 4],
            data_data: vec![],
        };
        write_reloc_trailer(&mut out, &relocs);
        assert_eq!(out, vec![1, 4, 0xFFFF, 0xFFFF]);
    }
}
