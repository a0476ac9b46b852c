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

use crate::assembler::section::Section;
use crate::errors::AssemblyError;
use std::collections::HashMap;

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct SymbolAddr {
    pub section: Section,
    pub offset: usize,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ImportEntry {
    pub internal: String,
    pub library: String,
    pub external: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ExportEntry {
    pub external: String,
    pub internal: String,
}

// Labels, equates, imports and exports are four namespaces sharing one flat
// name space for conflict detection: a name resolves to exactly one kind.
// Imports and libraries keep first-seen order so stub emission is stable.
#[derive(Debug, Default)]
pub struct SymbolTable {
    labels: HashMap<String, SymbolAddr>,
    equates: HashMap<String, i32>,
    imports: Vec<ImportEntry>,
    import_index: HashMap<String, usize>,
    libraries: Vec<String>,
    exports: Vec<ExportEntry>,
}

impl SymbolTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn define_label(
        &mut self,
        name: &str,
        addr: SymbolAddr,
        line: usize,
    ) -> Result<(), AssemblyError> {
        if self.labels.contains_key(name) {
            return Err(AssemblyError::SemanticError {
                line,
                reason: format!("label '{}' defined twice", name),
            });
        }
        self.check_foreign_kinds(name, "label", line)?;
        self.labels.insert(name.to_string(), addr);
        Ok(())
    }

    pub fn define_equate(
        &mut self,
        name: &str,
        value: i32,
        line: usize,
    ) -> Result<(), AssemblyError> {
        if self.equates.contains_key(name) {
            return Err(AssemblyError::SemanticError {
                line,
                reason: format!("equate '{}' defined twice", name),
            });
        }
        self.check_foreign_kinds(name, "equate", line)?;
        self.equates.insert(name.to_string(), value);
        Ok(())
    }

    pub fn define_import(
        &mut self,
        entry: ImportEntry,
        line: usize,
    ) -> Result<(), AssemblyError> {
        if self.import_index.contains_key(&entry.internal) {
            return Err(AssemblyError::SemanticError {
                line,
                reason: format!("import symbol '{}' defined twice", entry.internal),
            });
        }
        self.check_foreign_kinds(&entry.internal, "import", line)?;
        if !self.libraries.contains(&entry.library) {
            self.libraries.push(entry.library.clone());
        }
        self.import_index
            .insert(entry.internal.clone(), self.imports.len());
        self.imports.push(entry);
        Ok(())
    }

    pub fn define_export(
        &mut self,
        entry: ExportEntry,
        line: usize,
    ) -> Result<(), AssemblyError> {
        if self.exports.iter().any(|e| e.external == entry.external) {
            return Err(AssemblyError::SemanticError {
                line,
                reason: format!("export symbol '{}' defined twice", entry.external),
            });
        }
        self.exports.push(entry);
        Ok(())
    }

    // Places an assembler-internal label (import stub, %lib_ string, %data)
    // without the source-level namespace checks.
    pub fn place_label(&mut self, name: String, addr: SymbolAddr) {
        self.labels.insert(name, addr);
    }

    pub fn label(&self, name: &str) -> Option<SymbolAddr> {
        self.labels.get(name).copied()
    }

    pub fn equate(&self, name: &str) -> Option<i32> {
        self.equates.get(name).copied()
    }

    pub fn is_import(&self, name: &str) -> bool {
        self.import_index.contains_key(name)
    }

    pub fn imports(&self) -> &[ImportEntry] {
        &self.imports
    }

    pub fn libraries(&self) -> &[String] {
        &self.libraries
    }

    pub fn exports(&self) -> &[ExportEntry] {
        &self.exports
    }

    fn check_foreign_kinds(
        &self,
        name: &str,
        kind: &str,
        line: usize,
    ) -> Result<(), AssemblyError> {
        let other = if kind != "label" && self.labels.contains_key(name) {
            Some("label")
        } else if kind != "equate" && self.equates.contains_key(name) {
            Some("equate")
        } else if kind != "import" && self.import_index.contains_key(name) {
            Some("import")
        } else {
            None
        };
        match other {
            Some(other) => Err(AssemblyError::SemanticError {
                line,
                reason: format!("{} '{}' already defined as a {}", kind, name, other),
            }),
            None => Ok(()),
        }
    }
}
