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

use crate::assembler::encoder::constants::{MODE_IMM, MODE_MEM_IMM};
use crate::assembler::symbol_table::SymbolTable;
use crate::ast::{Operand, Register, Sign, Term};
use crate::errors::AssemblyError;

// A fully classified operand, ready for mode packing and word emission.
// When `sym` is set, `imm` holds an addend folded into the placeholder word
// so the fixup pass lands on symbol + addend.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DecodedOperand {
    pub has_ptr: bool,
    pub reg: Option<Register>,
    pub imm: Option<u16>,
    pub sym: Option<String>,
}

impl DecodedOperand {
    pub fn absent() -> Self {
        Self::default()
    }

    pub fn is_present(&self) -> bool {
        self.has_ptr || self.reg.is_some() || self.imm.is_some() || self.sym.is_some()
    }

    // The 5-bit operand-mode field:
    //   0        absent
    //   1..8     register
    //   9..16    [register]
    //   17..24   [register + imm16]
    //   0x1E     [imm16]
    //   0x1F     imm16
    pub fn mode(&self) -> u16 {
        if let Some(reg) = self.reg {
            let mut mode = reg.index();
            if self.has_ptr {
                mode += 8;
                if self.imm.is_some() || self.sym.is_some() {
                    mode += 8;
                }
            }
            mode
        } else if self.imm.is_some() || self.sym.is_some() {
            if self.has_ptr { MODE_MEM_IMM } else { MODE_IMM }
        } else {
            0
        }
    }
}

enum ResolvedTerm {
    Reg(Register),
    Imm(u16),
    Sym(String),
}

// A name is a register first, then an equate, then an import or a (possibly
// forward) label; the last two both defer to the fixup pass.
fn resolve_term(term: &Term, symbols: &SymbolTable) -> ResolvedTerm {
    match term {
        Term::Register(reg) => ResolvedTerm::Reg(*reg),
        Term::Immediate(value) => ResolvedTerm::Imm(*value as u16),
        Term::Symbol(name) => match symbols.equate(name) {
            Some(value) => ResolvedTerm::Imm(value as u16),
            None => ResolvedTerm::Sym(name.clone()),
        },
    }
}

pub fn resolve_operand(
    operand: Option<&Operand>,
    symbols: &SymbolTable,
    line: usize,
) -> Result<DecodedOperand, AssemblyError> {
    let operand = match operand {
        Some(op) => op,
        None => return Ok(DecodedOperand::absent()),
    };

    match operand {
        Operand::Direct(term) => {
            let mut decoded = DecodedOperand::absent();
            apply_term(&mut decoded, resolve_term(term, symbols), Sign::Plus, line)?;
            Ok(decoded)
        }
        Operand::Indirect { base, index } => {
            let mut decoded = DecodedOperand {
                has_ptr: true,
                ..DecodedOperand::default()
            };
            apply_term(&mut decoded, resolve_term(base, symbols), Sign::Plus, line)?;
            if let Some((sign, term)) = index {
                apply_term(&mut decoded, resolve_term(term, symbols), *sign, line)?;
            }
            Ok(decoded)
        }
    }
}

fn apply_term(
    decoded: &mut DecodedOperand,
    term: ResolvedTerm,
    sign: Sign,
    line: usize,
) -> Result<(), AssemblyError> {
    match term {
        ResolvedTerm::Reg(reg) => {
            if decoded.reg.is_some() {
                return Err(AssemblyError::SemanticError {
                    line,
                    reason: "2 regs used in one operand".to_string(),
                });
            }
            if sign == Sign::Minus {
                return Err(AssemblyError::SemanticError {
                    line,
                    reason: "registers can only be added in [] constructs".to_string(),
                });
            }
            decoded.reg = Some(reg);
        }
        ResolvedTerm::Imm(value) => {
            let value = match sign {
                Sign::Plus => value,
                Sign::Minus => value.wrapping_neg(),
            };
            decoded.imm = Some(decoded.imm.unwrap_or(0).wrapping_add(value));
        }
        ResolvedTerm::Sym(name) => {
            if sign == Sign::Minus {
                return Err(AssemblyError::SemanticError {
                    line,
                    reason: "symbols can only be added in [] constructs".to_string(),
                });
            }
            if decoded.sym.is_some() {
                return Err(AssemblyError::SemanticError {
                    line,
                    reason: "2 symbols used in one operand".to_string(),
                });
            }
            decoded.sym = Some(name);
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn resolve(op: &Operand) -> Result<DecodedOperand, AssemblyError> {
        resolve_operand(Some(op), &SymbolTable::new(), 1)
    }

    #[test]
    fn test_register_direct() {
        let decoded = resolve(&Operand::Direct(Term::Register(Register::C))).unwrap();
        assert_eq!(decoded.mode(), 3);
        assert_eq!(decoded.imm, None);
    }

    #[test]
    fn test_register_indirect() {
        let decoded = resolve(&Operand::Indirect {
            base: Term::Register(Register::C),
            index: None,
        })
        .unwrap();
        assert_eq!(decoded.mode(), 11);
    }

    #[test]
    fn test_register_with_displacement() {
        let decoded = resolve(&Operand::Indirect {
            base: Term::Register(Register::Sp),
            index: Some((Sign::Minus, Term::Immediate(2))),
        })
        .unwrap();
        assert_eq!(decoded.mode(), 7 + 16);
        assert_eq!(decoded.imm, Some(0xFFFE));
    }

    #[test]
    fn test_immediate_modes() {
        let direct = resolve(&Operand::Direct(Term::Immediate(5))).unwrap();
        assert_eq!(direct.mode(), MODE_IMM);
        let indirect = resolve(&Operand::Indirect {
            base: Term::Immediate(5),
            index: None,
        })
        .unwrap();
        assert_eq!(indirect.mode(), MODE_MEM_IMM);
    }

    #[test]
    fn test_two_immediates_sum() {
        let decoded = resolve(&Operand::Indirect {
            base: Term::Immediate(5),
            index: Some((Sign::Minus, Term::Immediate(2))),
        })
        .unwrap();
        assert_eq!(decoded.imm, Some(3));
    }

    #[test]
    fn test_equate_resolves_to_immediate() {
        let mut symbols = SymbolTable::new();
        symbols.define_equate("myeq", 0xFF, 1).unwrap();
        let decoded = resolve_operand(
            Some(&Operand::Direct(Term::Symbol("myeq".to_string()))),
            &symbols,
            1,
        )
        .unwrap();
        assert_eq!(decoded.imm, Some(0xFF));
        assert_eq!(decoded.sym, None);
    }

    #[test]
    fn test_symbol_with_addend() {
        let decoded = resolve(&Operand::Indirect {
            base: Term::Symbol("table".to_string()),
            index: Some((Sign::Plus, Term::Immediate(4))),
        })
        .unwrap();
        assert_eq!(decoded.sym, Some("table".to_string()));
        assert_eq!(decoded.imm, Some(4));
        assert_eq!(decoded.mode(), MODE_MEM_IMM);
    }

    #[test]
    fn test_symbol_plus_register() {
        let decoded = resolve(&Operand::Indirect {
            base: Term::Symbol("table".to_string()),
            index: Some((Sign::Plus, Term::Register(Register::X))),
        })
        .unwrap();
        assert_eq!(decoded.sym, Some("table".to_string()));
        assert_eq!(decoded.mode(), 5 + 16);
    }

    #[test]
    fn test_two_registers_rejected() {
        let err = resolve(&Operand::Indirect {
            base: Term::Register(Register::A),
            index: Some((Sign::Plus, Term::Register(Register::B))),
        })
        .unwrap_err();
        assert_eq!(
            err,
            AssemblyError::SemanticError {
                line: 1,
                reason: "2 regs used in one operand".to_string(),
            }
        );
    }

    #[test]
    fn test_register_subtraction_rejected() {
        assert!(
            resolve(&Operand::Indirect {
                base: Term::Register(Register::A),
                index: Some((Sign::Minus, Term::Register(Register::B))),
            })
            .is_err()
        );
    }

    #[test]
    fn test_symbol_subtraction_rejected() {
        assert!(
            resolve(&Operand::Indirect {
                base: Term::Register(Register::A),
                index: Some((Sign::Minus, Term::Symbol("foo".to_string()))),
            })
            .is_err()
        );
    }

    #[test]
    fn test_absent_operand() {
        let decoded = resolve_operand(None, &SymbolTable::new(), 1).unwrap();
        assert!(!decoded.is_present());
        assert_eq!(decoded.mode(), 0);
    }
}
