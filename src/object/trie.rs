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

use crate::assembler::symbol_table::{ExportEntry, SymbolTable};
use crate::errors::AssemblyError;
use crate::object::symbol_final_offset;
use std::collections::BTreeMap;

// Character-indexed tree over exported names. Children are kept in a
// BTreeMap so the serialized order is lexical and stable across runs.
#[derive(Debug, Default)]
struct TrieNode {
    children: BTreeMap<u8, TrieNode>,
    value: Option<String>, // internal symbol the exported name resolves to
}

impl TrieNode {
    fn insert(&mut self, key: &[u8], value: String) -> Result<(), AssemblyError> {
        match key.split_first() {
            None => {
                if self.value.is_some() {
                    return Err(AssemblyError::SemanticErrorNoLine {
                        reason: "duplicate symbol definition".to_string(),
                    });
                }
                self.value = Some(value);
                Ok(())
            }
            Some((first, rest)) => self.children.entry(*first).or_default().insert(rest, value),
        }
    }
}

pub struct ExportTrie {
    root: TrieNode,
}

impl ExportTrie {
    // %data is always exported so a loader can locate the data descriptor.
    pub fn build(exports: &[ExportEntry]) -> Result<Self, AssemblyError> {
        let mut root = TrieNode::default();
        root.insert(b"%data", "%data".to_string())?;
        for entry in exports {
            root.insert(entry.external.as_bytes(), entry.internal.clone())?;
        }
        Ok(Self { root })
    }

    // Linear layout, appended to the final stream:
    //   leaf            0, 0, self-relative offset to the symbol
    //   single child    [0 sibling slot if chain head] continuation byte, ...
    //   multiple        children in sequence; each child's first word is
    //                   patched to the next sibling's self-relative offset,
    //                   zero on the last; a terminal node appends a
    //                   pseudo-sibling with an empty name and a leaf record
    pub fn serialize(
        &self,
        out: &mut Vec<u16>,
        symbols: &SymbolTable,
        text_offset_in_final: usize,
        data_offset_in_final: usize,
    ) -> Result<(), AssemblyError> {
        let ctx = LayoutContext {
            symbols,
            text_offset_in_final,
            data_offset_in_final,
        };
        layout(&self.root, false, out, &ctx)?;
        Ok(())
    }
}

struct LayoutContext<'a> {
    symbols: &'a SymbolTable,
    text_offset_in_final: usize,
    data_offset_in_final: usize,
}

impl LayoutContext<'_> {
    fn leaf_pointer(&self, symbol: &str, position: usize) -> Result<u16, AssemblyError> {
        let target = symbol_final_offset(
            self.symbols,
            symbol,
            self.text_offset_in_final,
            self.data_offset_in_final,
        )?;
        Ok((target as u16).wrapping_sub(position as u16))
    }
}

// Returns the node's base offset in the stream so siblings can be linked.
fn layout(
    node: &TrieNode,
    continues: bool,
    out: &mut Vec<u16>,
    ctx: &LayoutContext,
) -> Result<usize, AssemblyError> {
    let child_count = node.children.len();
    if continues && child_count > 1 {
        // a branch inside a continuation chain: no-sibling, single-child marker
        out.push(0);
        out.push(1);
    }
    let my_base = out.len();

    if child_count == 0 {
        let Some(value) = &node.value else {
            unreachable!("trie leaf without a value");
        };
        out.push(0); // end of name
        out.push(0); // leaf marker
        let pointer = ctx.leaf_pointer(value, out.len())?;
        out.push(pointer);
        return Ok(my_base);
    }

    if child_count == 1 {
        if !continues {
            out.push(0); // sibling slot, patched by the parent
        }
        let (key, child) = node
            .children
            .iter()
            .next()
            .expect("single-child node has a child");
        out.push(*key as u16);
        layout(child, true, out, ctx)?;
        return Ok(my_base);
    }

    let mut prev_offset: Option<usize> = None;
    for child in node.children.values() {
        let child_offset = layout(child, false, out, ctx)?;
        if let Some(prev) = prev_offset {
            out[prev] = (child_offset as u16).wrapping_sub(prev as u16);
        }
        prev_offset = Some(child_offset);
    }
    if let Some(value) = &node.value {
        if let Some(prev) = prev_offset {
            out[prev] = (out.len() as u16).wrapping_sub(prev as u16);
        }
        out.push(0); // no next entry
        out.push(0); // empty name string
        out.push(0); // leaf marker
        let pointer = ctx.leaf_pointer(value, out.len())?;
        out.push(pointer);
    }
    Ok(my_base)
}
