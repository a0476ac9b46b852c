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

pub mod assembler;
pub mod ast;
pub mod errors;
pub mod object;
pub mod output;
pub mod parser;

use anyhow::{Context, Result};
use assembler::{Assembler, Options};

extern crate pest;
extern crate pest_derive;

// Assemble one source file into the final 16-bit word image: bare code, or
// an object with import stubs, relocation tables and an export trie.
pub fn assemble(source: &str, options: Options) -> Result<Vec<u16>> {
    let lines = parser::parse_source(source).context("Failed during parsing stage")?;

    let mut asm = Assembler::new(options);
    asm.run(&lines).context("Failed during encoding stage")?;

    asm.finish().context("Failed during fixup stage")
}
