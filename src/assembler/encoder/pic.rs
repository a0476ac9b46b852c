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

use crate::assembler::encoder::constants::*;
use crate::assembler::encoder::operands::DecodedOperand;
use crate::assembler::{Assembler, RefKind};
use crate::ast::Register;

impl Assembler {
    // Rewrites a symbolic operand into a call against the runtime API.
    //
    // The emitted sequence loads D with a self-relative back-reference
    // (patched by fixup to symbol + addend - PC - 1) and calls the resolver:
    // APIGetSymbol for imports, or a slot the fixup pass fills with
    // APIGetRelativeOffset / APIGetVar depending on the symbol's section.
    // The operand itself collapses to D (or [D]). When the previous operand
    // of the same instruction already went through this rewrite, its result
    // is first spilled to the APIPICTemp scratch word.
    //
    // Returns the rewritten operand and whether the rewrite happened.
    pub(crate) fn expand_pic_operand(
        &mut self,
        operand: DecodedOperand,
        prev_used_pic: bool,
        prev_has_ptr: bool,
    ) -> (DecodedOperand, bool) {
        if !self.pic_on {
            return (operand, false);
        }
        let symbol = match operand.sym {
            Some(ref symbol) => symbol.clone(),
            None => return (operand, false),
        };

        if prev_used_pic {
            if prev_has_ptr {
                self.add_word(PIC_SPILL_D_INDIRECT);
            } else {
                self.add_word(PIC_SPILL_D);
            }
            self.add_word(API_PIC_TEMP);
        }

        self.add_word(PIC_LOAD_OFFSET);
        let fixup_pt = self.current_offset();
        let back_ref = (fixup_pt as u16).wrapping_add(1).wrapping_neg();
        self.add_word(back_ref.wrapping_add(operand.imm.unwrap_or(0)));
        self.add_word(PIC_CALL_API);
        if self.symbols.is_import(&symbol) {
            self.push_ref(fixup_pt, symbol, RefKind::Direct);
            self.add_word(API_GET_SYMBOL);
        } else {
            self.push_ref(fixup_pt, symbol, RefKind::ApiDeferred);
            self.add_word(0);
        }

        if let Some(reg) = operand.reg {
            // add d, reg folds the base register into the resolved address
            self.add_word(0x0002 | (reg.index() << 11) | (Register::D.index() << 6));
        }

        let rewritten = DecodedOperand {
            has_ptr: operand.has_ptr,
            reg: Some(Register::D),
            imm: None,
            sym: None,
        };
        (rewritten, true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::assembler::Options;
    use crate::parser::parse_source;

    fn assemble_text(source: &str, options: Options) -> Vec<u16> {
        let lines = parse_source(source).unwrap();
        let mut asm = Assembler::new(options);
        asm.run(&lines).unwrap();
        asm.text.words.clone()
    }

    #[test]
    fn test_label_operand_expands_to_api_call() {
        let text = assemble_text(
            "foo: nop\nmov a, foo\n",
            Options {
                pic_default: true,
                wrap_asm: false,
            },
        );
        assert_eq!(
            text,
            vec![
                0x003F,          // nop
                PIC_LOAD_OFFSET, // mov d, imm16
                0xFFFD,          // -(offset 2 + 1), patched by fixup
                PIC_CALL_API,    // call [imm16]
                0x0000,          // API slot chosen during fixup
                0x2041,          // mov a, d
            ]
        );
    }

    #[test]
    fn test_import_operand_calls_get_symbol() {
        let text = assemble_text(
            "importlib mylib\nimport foo\nmov a, foo\n",
            Options {
                pic_default: true,
                wrap_asm: false,
            },
        );
        assert_eq!(text[..5], [PIC_LOAD_OFFSET, 0xFFFE, PIC_CALL_API, API_GET_SYMBOL, 0x2041]);
    }

    #[test]
    fn test_symbol_plus_register_folds_with_add() {
        let text = assemble_text(
            "foo: nop\nmov a, [foo+x]\n",
            Options {
                pic_default: true,
                wrap_asm: false,
            },
        );
        assert_eq!(
            text,
            vec![
                0x003F,
                PIC_LOAD_OFFSET,
                0xFFFD,
                PIC_CALL_API,
                0x0000,
                0x0002 | (5 << 11) | (4 << 6), // add d, x
                0x6041,                        // mov a, [d]
            ]
        );
    }

    #[test]
    fn test_both_operands_symbolic_spills_to_scratch() {
        let text = assemble_text(
            "src_lab: nop\ndst_lab: nop\nmov dst_lab, src_lab\n",
            Options {
                pic_default: true,
                wrap_asm: false,
            },
        );
        assert_eq!(
            text,
            vec![
                0x003F, // src_lab: nop
                0x003F, // dst_lab: nop
                // source operand rewrite
                PIC_LOAD_OFFSET,
                0xFFFC, // -(offset 3 + 1)
                PIC_CALL_API,
                0x0000,
                // destination operand rewrite spills the source result first
                PIC_SPILL_D,
                API_PIC_TEMP,
                PIC_LOAD_OFFSET,
                0xFFF6, // -(offset 9 + 1)
                PIC_CALL_API,
                0x0000,
                // mov d, [APIPICTemp]
                0xF101,
                API_PIC_TEMP,
            ]
        );
    }

    #[test]
    fn test_pic_off_keeps_inline_reference() {
        let text = assemble_text(
            "pic off\nfoo: nop\nmov a, foo\n",
            Options {
                pic_default: true,
                wrap_asm: false,
            },
        );
        assert_eq!(text[..3], [0x003F, 0xF841, 0x0000]);
    }
}
