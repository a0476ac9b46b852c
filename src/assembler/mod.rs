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

pub mod encoder;
pub mod section;
pub mod symbol_table;

use crate::ast::{DataItem, Directive, PicMode, SourceLine, Statement};
use crate::errors::AssemblyError;
use crate::object;
use crate::object::RelocationTables;
use crate::object::trie::ExportTrie;
use encoder::constants::{API_GET_RELATIVE_OFFSET, API_GET_VAR};
use section::{Section, SectionData};
use symbol_table::{ImportEntry, SymbolAddr, SymbolTable};

const DEFAULT_ORG: u16 = 0x200;

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct Options {
    // PIC unless the CLI forces position-dependent code
    pub pic_default: bool,
    // emit the object wrapper (header, relocations, export trie)
    pub wrap_asm: bool,
}

impl Default for Options {
    fn default() -> Self {
        Self {
            pic_default: true,
            wrap_asm: true,
        }
    }
}

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum RefKind {
    // the word at `offset` gets the symbol address added in place
    Direct,
    // additionally, the call slot at `offset + 2` gets an API pointer
    // chosen from the symbol's section
    ApiDeferred,
}

// One unresolved word, drained by the fixup pass.
#[derive(Debug, Clone, PartialEq)]
pub struct SymbolRef {
    pub section: Section,
    pub offset: usize,
    pub symbol: String,
    pub kind: RefKind,
}

#[derive(Debug)]
pub struct Assembler {
    options: Options,
    pub(crate) pic_on: bool,
    obj_name: Option<String>,
    lib_name: Option<String>,
    org_value: u16,
    current: Section,
    pub(crate) text: SectionData,
    pub(crate) data: SectionData,
    pub(crate) symbols: SymbolTable,
    pub(crate) refs: Vec<SymbolRef>,
}

impl Assembler {
    pub fn new(options: Options) -> Self {
        // offset 0 of text is the entry point and must hold a real word
        // even in an otherwise empty program
        let text = SectionData {
            last_label_offset: Some(0),
            ..SectionData::default()
        };
        Self {
            options,
            pic_on: options.pic_default,
            obj_name: None,
            lib_name: None,
            org_value: DEFAULT_ORG,
            current: Section::Text,
            text,
            data: SectionData::default(),
            symbols: SymbolTable::new(),
            refs: Vec::new(),
        }
    }

    // The encode pass: walk every source line in order, defining symbols and
    // emitting words. Symbolic words are logged into `refs` for fixup.
    pub fn run(&mut self, lines: &[SourceLine]) -> Result<(), AssemblyError> {
        for line in lines {
            self.process_line(line)?;
        }
        Ok(())
    }

    fn process_line(&mut self, line: &SourceLine) -> Result<(), AssemblyError> {
        if let Some(label) = &line.label {
            self.section_mut(self.current).mark_label();
            let addr = SymbolAddr {
                section: self.current,
                offset: self.current_offset(),
            };
            self.symbols.define_label(label, addr, line.line_number)?;
        }

        match &line.statement {
            Some(Statement::Instruction(instruction)) => {
                self.encode_instruction(instruction, line.line_number)
            }
            Some(Statement::Directive(directive)) => {
                self.apply_directive(directive, line.line_number)
            }
            Some(Statement::Data(items)) => {
                for item in items {
                    self.process_data_item(item, line.line_number)?;
                }
                Ok(())
            }
            None => Ok(()),
        }
    }

    fn apply_directive(
        &mut self,
        directive: &Directive,
        line: usize,
    ) -> Result<(), AssemblyError> {
        match directive {
            Directive::Pic(mode) => {
                self.pic_on = match mode {
                    PicMode::On => true,
                    PicMode::Off => false,
                    PicMode::Default => self.options.pic_default,
                };
            }
            Directive::Name(name) => {
                if self.obj_name.is_some() {
                    return Err(AssemblyError::SemanticError {
                        line,
                        reason: "NAME directive used multiple times".to_string(),
                    });
                }
                self.obj_name = Some(name.clone());
            }
            Directive::ImportLib(library) => {
                self.lib_name = Some(library.clone());
            }
            Directive::Import { external, internal } => {
                let library =
                    self.lib_name
                        .clone()
                        .ok_or_else(|| AssemblyError::SemanticError {
                            line,
                            reason: format!(
                                "import '{}' before any importlib directive",
                                internal
                            ),
                        })?;
                self.symbols.define_import(
                    ImportEntry {
                        internal: internal.clone(),
                        library,
                        external: external.clone(),
                    },
                    line,
                )?;
            }
            Directive::Export { internal, external } => {
                self.symbols.define_export(
                    symbol_table::ExportEntry {
                        external: external.clone(),
                        internal: internal.clone(),
                    },
                    line,
                )?;
            }
            Directive::Equate { name, value } => {
                self.symbols.define_equate(name, *value, line)?;
            }
            Directive::Org(value) => {
                self.org_value = *value as u16;
            }
            Directive::Text => {
                self.current = Section::Text;
            }
            Directive::Data => {
                self.current = Section::Data;
            }
        }
        Ok(())
    }

    fn process_data_item(&mut self, item: &DataItem, line: usize) -> Result<(), AssemblyError> {
        match item {
            DataItem::Str(text) => {
                for c in text.chars() {
                    self.add_word(c as u16);
                }
            }
            DataItem::Dup { count, item } => {
                for _ in 0..*count {
                    self.process_data_item(item, line)?;
                }
            }
            DataItem::Value(value) => {
                self.add_word(*value as u16);
            }
            DataItem::Symbol(name) => {
                if let Some(value) = self.symbols.equate(name) {
                    self.add_word(value as u16);
                } else if self.symbols.is_import(name) {
                    return Err(AssemblyError::SemanticError {
                        line,
                        reason: "equates cannot contain imported symbols".to_string(),
                    });
                } else {
                    let offset = self.current_offset();
                    self.push_ref(offset, name.clone(), RefKind::Direct);
                    self.add_word(0);
                }
            }
        }
        Ok(())
    }

    // After all source is processed, the text section gains one
    // zero-terminated string per library plus one stub per import: a word
    // holding a self-relative pointer to the library string (completed by
    // fixup), followed by the zero-terminated external name. The import's
    // internal name resolves to the stub itself.
    fn emit_import_stubs(&mut self) {
        self.current = Section::Text;

        for library in self.symbols.libraries().to_vec() {
            let addr = SymbolAddr {
                section: Section::Text,
                offset: self.text.len(),
            };
            self.symbols.place_label(lib_label(&library), addr);
            for c in library.chars() {
                self.add_word(c as u16);
            }
            self.add_word(0);
        }

        for entry in self.symbols.imports().to_vec() {
            let fixup_pt = self.text.len();
            self.symbols.place_label(
                entry.internal.clone(),
                SymbolAddr {
                    section: Section::Text,
                    offset: fixup_pt,
                },
            );
            self.refs.push(SymbolRef {
                section: Section::Text,
                offset: fixup_pt,
                symbol: lib_label(&entry.library),
                kind: RefKind::Direct,
            });
            self.add_word((fixup_pt as u16).wrapping_neg());
            for c in entry.external.chars() {
                self.add_word(c as u16);
            }
            self.add_word(0);
        }
    }

    fn append_sentinels(&mut self) {
        if self.text.needs_sentinel() {
            self.text.push(0);
        }
        if self.data.needs_sentinel() {
            self.data.push(0);
        }
    }

    fn fix_reference(
        &mut self,
        reference: &SymbolRef,
        text_base: u16,
        data_base: u16,
        relocs: &mut RelocationTables,
    ) -> Result<(), AssemblyError> {
        let symbol =
            self.symbols
                .label(&reference.symbol)
                .ok_or_else(|| AssemblyError::SemanticErrorNoLine {
                    reason: format!("unresolved symbol '{}'", reference.symbol),
                })?;
        let base = match symbol.section {
            Section::Text => text_base,
            Section::Data => data_base,
        };
        let mut symbol_address = (symbol.offset as u16).wrapping_add(base);

        if reference.kind == RefKind::ApiDeferred {
            let api_choice = if symbol.section == Section::Text
                || reference.section == Section::Data
            {
                API_GET_RELATIVE_OFFSET
            } else {
                API_GET_VAR
            };
            if api_choice == API_GET_VAR && self.options.pic_default {
                // undo the PC-relative bias the PIC sequence embedded
                symbol_address = symbol_address
                    .wrapping_add(reference.offset as u16)
                    .wrapping_add(1);
            }
            self.section_mut(reference.section).words[reference.offset + 2] = api_choice;
        }

        let words = &mut self.section_mut(reference.section).words;
        words[reference.offset] = words[reference.offset].wrapping_add(symbol_address);

        if reference.section == Section::Data {
            match symbol.section {
                Section::Text => relocs.data_text.push(reference.offset),
                Section::Data => relocs.data_data.push(reference.offset),
            }
        }
        Ok(())
    }

    // The fixup phase and final layout: resolve every logged reference,
    // then produce the final word array (bare, or wrapped into an object
    // with header, data descriptor, relocation trailer and export trie).
    pub fn finish(mut self) -> Result<Vec<u16>, AssemblyError> {
        self.emit_import_stubs();
        self.append_sentinels();

        let mut final_words: Vec<u16> = Vec::new();
        let mut text_base = self.org_value;
        let mut data_base: u16 = 0;
        if self.options.wrap_asm {
            object::write_header(&mut final_words, self.obj_name.as_deref());
            text_base = text_base.wrapping_add(final_words.len() as u16);
        } else {
            data_base = text_base.wrapping_add(self.text.len() as u16);
        }
        if self.options.pic_default {
            // a relocating loader rebases everything at load time
            text_base = 0;
            data_base = 0;
        }

        let mut relocs = RelocationTables::default();
        let refs = std::mem::take(&mut self.refs);
        for reference in &refs {
            self.fix_reference(reference, text_base, data_base, &mut relocs)?;
        }

        if self.options.wrap_asm {
            // %data points at the data-length word so a loader can find the
            // data init descriptor
            self.symbols.place_label(
                "%data".to_string(),
                SymbolAddr {
                    section: Section::Text,
                    offset: self.text.len(),
                },
            );
            let data_len = self.data.len() as u16;
            self.text.push(data_len);
        }

        let text_offset_in_final = final_words.len();
        final_words.extend_from_slice(&self.text.words);
        let data_offset_in_final = final_words.len();
        final_words.extend_from_slice(&self.data.words);

        if self.options.wrap_asm {
            object::write_reloc_trailer(&mut final_words, &relocs);
            final_words[object::EXPORT_PTR_OFFSET] =
                (final_words.len() - object::EXPORT_PTR_OFFSET) as u16;
            let trie = ExportTrie::build(self.symbols.exports())?;
            trie.serialize(
                &mut final_words,
                &self.symbols,
                text_offset_in_final,
                data_offset_in_final,
            )?;
        }

        Ok(final_words)
    }

    pub(crate) fn add_word(&mut self, word: u16) {
        self.section_mut(self.current).push(word);
    }

    pub(crate) fn current_offset(&self) -> usize {
        self.section_ref(self.current).len()
    }

    pub(crate) fn push_ref(&mut self, offset: usize, symbol: String, kind: RefKind) {
        self.refs.push(SymbolRef {
            section: self.current,
            offset,
            symbol,
            kind,
        });
    }

    fn section_ref(&self, section: Section) -> &SectionData {
        match section {
            Section::Text => &self.text,
            Section::Data => &self.data,
        }
    }

    fn section_mut(&mut self, section: Section) -> &mut SectionData {
        match section {
            Section::Text => &mut self.text,
            Section::Data => &mut self.data,
        }
    }
}

// libraries get a '%' prefixed label so source identifiers cannot collide
fn lib_label(library: &str) -> String {
    format!("%lib_{}", library)
}
