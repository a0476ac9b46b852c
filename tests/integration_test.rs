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

use picasm::assemble;
use picasm::assembler::Options;
use picasm::output;

fn raw_pic() -> Options {
    Options {
        pic_default: true,
        wrap_asm: false,
    }
}

fn raw_pdc() -> Options {
    Options {
        pic_default: false,
        wrap_asm: false,
    }
}

fn object_pic() -> Options {
    Options {
        pic_default: true,
        wrap_asm: true,
    }
}

fn to_bytes(words: &[u16]) -> Vec<u8> {
    let mut bytes = Vec::new();
    output::write_words(&mut bytes, words).unwrap();
    bytes
}

#[test]
fn test_empty_program_raw() {
    // the text entry word survives even in an empty program
    let words = assemble("", raw_pic()).unwrap();
    assert_eq!(to_bytes(&words), vec![0x00, 0x00]);
}

#[test]
fn test_nop_raw() {
    let words = assemble("nop\n", raw_pic()).unwrap();
    assert_eq!(to_bytes(&words), vec![0x00, 0x3F]);
}

#[test]
fn test_mov_immediate_raw() {
    let words = assemble("mov a, 5\n", raw_pic()).unwrap();
    assert_eq!(to_bytes(&words), vec![0xF8, 0x41, 0x00, 0x05]);
}

#[test]
fn test_label_jump_position_dependent() {
    let words = assemble("start: jmp start\n", raw_pdc()).unwrap();
    assert_eq!(to_bytes(&words), vec![0xF8, 0x0A, 0x02, 0x00]);
}

#[test]
fn test_import_object_file() {
    let source = "importlib mylib\nimport foo\nmov a, foo\n";
    let words = assemble(source, object_pic()).unwrap();

    // header: magic, trie pointer, empty object name
    assert_eq!(words[0], 0xCB07);
    assert_eq!(words[1], 21);
    assert_eq!(words[2], 0);

    // PIC sequence against APIGetSymbol; the back-reference resolves to the
    // import stub at text offset 11, two words past the mov d immediate
    assert_eq!(words[3], 0xF901); // mov d, imm16
    assert_eq!(words[4], 0x0009); // stub offset 11 - (offset 1 + 1)
    assert_eq!(words[5], 0xF015); // call [imm16]
    assert_eq!(words[6], 0x0006); // APIGetSymbol
    assert_eq!(words[7], 0x2041); // mov a, d

    // library string then the stub: self-relative pointer to %lib_mylib
    // followed by the zero-terminated external name
    let mylib: Vec<u16> = "mylib".chars().map(|c| c as u16).collect();
    assert_eq!(words[8..13], mylib[..]);
    assert_eq!(words[13], 0);
    assert_eq!(words[14], 0xFFFA); // text offset 5 - stub offset 11
    let foo: Vec<u16> = "foo".chars().map(|c| c as u16).collect();
    assert_eq!(words[15..18], foo[..]);
    assert_eq!(words[18], 0);

    // %data descriptor (no data), empty relocation lists
    assert_eq!(words[19], 0);
    assert_eq!(words[20], 0xFFFF);
    assert_eq!(words[21], 0xFFFF);

    // export trie holds only %data; trie pointer is self-relative
    assert_eq!((words[1] as usize) + 1, 22);
    let trie: Vec<u16> = vec![0, 0x25, 0x64, 0x61, 0x74, 0x61, 0, 0, 0xFFF5];
    assert_eq!(words[22..], trie[..]);
    assert_eq!(words.len(), 31);

    // walking the leaf pointer lands on %data's final position
    assert_eq!(words[30].wrapping_add(30), 19);
}

#[test]
fn test_dw_mixed_words() {
    let source = "myeq EQU 0xFF\ndw \"Hi\", 0x0A, 3 (equ myeq)\n";
    let words = assemble(source, raw_pic()).unwrap();
    assert_eq!(words, vec![0x48, 0x69, 0x0A, 0xFF, 0xFF, 0xFF]);
}

#[test]
fn test_pic_stream_has_no_inline_label_address() {
    let source = "mov a, target\ntarget: nop\n";
    let pic_words = assemble(source, raw_pic()).unwrap();
    // the expansion defers resolution to the runtime API
    assert_eq!(pic_words[0], 0xF901);
    assert_eq!(pic_words[2], 0xF015);
    assert_eq!(pic_words[3], 0x0002); // APIGetRelativeOffset
    assert_eq!(pic_words[4], 0x2041); // mov a, d

    // with PIC off the label address is inlined instead
    let pdc_words = assemble(source, raw_pdc()).unwrap();
    assert_eq!(pdc_words[0], 0xF841);
    assert_eq!(pdc_words[1], 0x0202); // org 0x200 + text offset 2
}

#[test]
fn test_output_is_deterministic() {
    let source = "export alpha\nexport beta\nalpha: nop\nbeta: nop\n.data\ndw alpha\n";
    let first = assemble(source, object_pic()).unwrap();
    let second = assemble(source, object_pic()).unwrap();
    assert_eq!(first, second);
}

#[test]
fn test_every_data_patch_lands_in_one_reloc_list() {
    let source = "\
.data
dptr: dw code_lab, dptr
.text
code_lab: nop
";
    let words = assemble(source, object_pic()).unwrap();
    // layout: header(3) + text(nop, data-length) + data(2 words) + relocs
    assert_eq!(words[3], 0x3F);
    assert_eq!(words[4], 2); // data length
    let trailer = 7;
    assert_eq!(words[trailer], 0); // data->text: offset 0 (code_lab ref)
    assert_eq!(words[trailer + 1], 0xFFFF);
    assert_eq!(words[trailer + 2], 1); // data->data: offset 1 (dptr ref)
    assert_eq!(words[trailer + 3], 0xFFFF);
}

#[test]
fn test_duplicate_symbols_are_errors() {
    for source in [
        "foo: nop\nfoo: nop\n",
        "foo EQU 1\nfoo EQU 2\n",
        "importlib l\nimport foo\nimport foo\n",
        "export foo\nexport foo\nfoo: nop\n",
        "foo EQU 1\nfoo: nop\n",
    ] {
        assert!(
            assemble(source, raw_pdc()).is_err(),
            "expected duplicate-symbol failure for {:?}",
            source
        );
    }
}

#[test]
fn test_invalid_operands_are_errors() {
    for source in [
        "mov 5, a\n",      // immediate destination
        "nop 5\n",         // operand on a nullary instruction
        "mov a, [a+b]\n",  // two registers in one operand
        "mov a, [a-b]\n",  // register subtraction
        "jmp\n",           // missing required operand
    ] {
        assert!(
            assemble(source, raw_pdc()).is_err(),
            "expected operand failure for {:?}",
            source
        );
    }
}

#[test]
fn test_unresolved_symbol_is_an_error() {
    assert!(assemble("jmp nowhere\n", raw_pdc()).is_err());
}

#[test]
fn test_exported_labels_reachable_through_trie() {
    let source = "\
name demo
export run_it
run_it: nop
";
    let words = assemble(source, object_pic()).unwrap();
    assert_eq!(words[0], 0xCB07);
    // object name "demo" sits between the trie pointer and the text section
    let demo: Vec<u16> = "demo".chars().map(|c| c as u16).collect();
    assert_eq!(words[2..6], demo[..]);
    assert_eq!(words[6], 0);

    // trie root: siblings '%data' and 'run_it' (branch bytes consumed by
    // the sibling table), each ending in a leaf record
    let trie_base = words[1] as usize + 1;
    let first = trie_base;
    let second = first + words[first] as usize;
    // first sibling continues "%data" with 'd'
    assert_eq!(words[first + 1], 0x64);
    // second sibling continues "run_it" with 'u'
    assert_eq!(words[second + 1], 0x75);
    assert_eq!(words[second], 0); // last sibling

    // run_it leaf pointer resolves to the nop at text offset 0
    let leaf = second + 6; // slot + "un_it"
    assert_eq!(words[leaf], 0);
    assert_eq!(words[leaf + 1], 0);
    let text_start = 7; // header is magic + pointer + "demo" + terminator
    assert_eq!(
        words[leaf + 2].wrapping_add((leaf + 2) as u16),
        text_start as u16
    );
}
