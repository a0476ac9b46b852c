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

pub mod constants;
pub mod operands;
mod pic;

use crate::assembler::{Assembler, RefKind};
use crate::ast::Instruction;
use crate::errors::AssemblyError;
use constants::{API_PIC_TEMP, OperandProfile};
use operands::{DecodedOperand, resolve_operand};

impl Assembler {
    // Encode one instruction into the current section: decode the operands,
    // run the PIC rewrite over symbolic ones, validate against the mnemonic's
    // operand profiles, then pack and emit the word plus any inline words in
    // source-then-destination order.
    pub(crate) fn encode_instruction(
        &mut self,
        instruction: &Instruction,
        line: usize,
    ) -> Result<(), AssemblyError> {
        let spec = constants::instruction_spec(&instruction.mnemonic).ok_or_else(|| {
            AssemblyError::SemanticError {
                line,
                reason: format!("Unknown instruction '{}'", instruction.mnemonic),
            }
        })?;

        // one operand is a source; two are destination, source
        let (dst_ast, src_ast) = match instruction.operands.len() {
            0 => (None, None),
            1 => (None, Some(&instruction.operands[0])),
            _ => (Some(&instruction.operands[0]), Some(&instruction.operands[1])),
        };

        let src = resolve_operand(src_ast, &self.symbols, line)?;
        let dst = resolve_operand(dst_ast, &self.symbols, line)?;

        let (src, src_used_pic) = self.expand_pic_operand(src, false, false);
        let (dst, dst_used_pic) = self.expand_pic_operand(dst, src_used_pic, src.has_ptr);

        // with both operands rewritten, the source result now lives in the
        // scratch word, not in D
        let src = if src_used_pic && dst_used_pic {
            DecodedOperand {
                has_ptr: true,
                reg: None,
                imm: Some(API_PIC_TEMP),
                sym: None,
            }
        } else {
            src
        };

        validate_operand_mode(spec.src, &src, instruction, line)?;
        validate_operand_mode(spec.dst, &dst, instruction, line)?;

        let word = spec.opcode | (src.mode() << 11) | (dst.mode() << 6);
        self.add_word(word);
        self.emit_operand_words(&src);
        self.emit_operand_words(&dst);
        Ok(())
    }

    fn emit_operand_words(&mut self, operand: &DecodedOperand) {
        if let Some(symbol) = &operand.sym {
            let offset = self.current_offset();
            self.push_ref(offset, symbol.clone(), RefKind::Direct);
            self.add_word(operand.imm.unwrap_or(0));
        } else if let Some(imm) = operand.imm {
            self.add_word(imm);
        }
    }
}

fn validate_operand_mode(
    profile: OperandProfile,
    operand: &DecodedOperand,
    instruction: &Instruction,
    line: usize,
) -> Result<(), AssemblyError> {
    let present = operand.is_present();
    let bare_value = !operand.has_ptr
        && operand.reg.is_none()
        && (operand.imm.is_some() || operand.sym.is_some());
    let valid = match profile {
        OperandProfile::Source => present,
        OperandProfile::Dest => present && !bare_value,
        OperandProfile::Absent => !present,
        OperandProfile::OptionalImm => !present || bare_value,
    };
    if valid {
        Ok(())
    } else {
        Err(AssemblyError::SemanticError {
            line,
            reason: format!("invalid operand mode for '{}'", instruction.mnemonic),
        })
    }
}
