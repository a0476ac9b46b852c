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

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum Register {
    A,
    B,
    C,
    D,
    X,
    Y,
    Sp,
    Bp,
}

impl Register {
    // Register operand-mode indices start at 1; 0 means "operand absent".
    pub fn index(self) -> u16 {
        match self {
            Register::A => 1,
            Register::B => 2,
            Register::C => 3,
            Register::D => 4,
            Register::X => 5,
            Register::Y => 6,
            Register::Sp => 7,
            Register::Bp => 8,
        }
    }

    pub fn from_name(name: &str) -> Option<Register> {
        match name.to_lowercase().as_str() {
            "a" => Some(Register::A),
            "b" => Some(Register::B),
            "c" => Some(Register::C),
            "d" => Some(Register::D),
            "x" => Some(Register::X),
            "y" => Some(Register::Y),
            "sp" => Some(Register::Sp),
            "bp" => Some(Register::Bp),
            _ => None,
        }
    }
}

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum Sign {
    Plus,
    Minus,
}

// One side of an operand: a register, a literal, or a name that is
// classified as equate/import/label when the instruction is encoded.
#[derive(Debug, Clone, PartialEq)]
pub enum Term {
    Register(Register),
    Immediate(i32),
    Symbol(String),
}

// Represents all possible forms an argument to an instruction can take.
#[derive(Debug, Clone, PartialEq)]
pub enum Operand {
    Direct(Term),                                          // a, 5, label
    Indirect { base: Term, index: Option<(Sign, Term)> },  // [a], [a+5], [label+a]
}

// One item of a DW list.
#[derive(Debug, Clone, PartialEq)]
pub enum DataItem {
    Str(String),                               // "text", one word per char
    Dup { count: i32, item: Box<DataItem> },   // N (EQU item)
    Value(i32),
    Symbol(String),
}

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum PicMode {
    On,
    Off,
    Default,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Directive {
    Pic(PicMode),                                    // pic on|off|default
    Name(String),                                    // name myobj
    ImportLib(String),                               // importlib mylib
    Import { external: String, internal: String },   // import foo [as bar]
    Export { internal: String, external: String },   // export foo [as bar]
    Equate { name: String, value: i32 },             // NAME EQU VALUE
    Org(i32),                                        // org 0x200
    Text,                                            // .text
    Data,                                            // .data
}

#[derive(Debug, Clone, PartialEq)]
pub struct Instruction {
    pub mnemonic: String, // lower-cased, validated against the opcode table
    pub operands: Vec<Operand>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Statement {
    Instruction(Instruction),
    Directive(Directive),
    Data(Vec<DataItem>),
}

// --- Assembly Line Structure ---

// Represents a single line of code, which can have a label, a statement, or both.
#[derive(Debug, Clone, Default)]
pub struct SourceLine {
    pub line_number: usize,
    pub label: Option<String>,
    pub statement: Option<Statement>,
}
