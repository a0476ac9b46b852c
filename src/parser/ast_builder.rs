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

use crate::assembler::encoder::constants::instruction_spec;
use crate::ast::*;
use crate::errors::AssemblyError;
use crate::parser::Rule;
use anyhow::Result;
use pest::iterators::Pair;

// pull the label name out of a `name:` pair
pub fn build_label(pair: Pair<Rule>) -> Result<String> {
    let line = pair.as_span().start_pos().line_col().0;
    let ident = pair
        .into_inner()
        .next()
        .ok_or_else(|| AssemblyError::StructuralError {
            line,
            reason: "Expected a label identifier.".to_string(),
        })?;
    Ok(ident.as_str().to_string())
}

pub fn build_instruction(pair: Pair<Rule>) -> Result<Instruction> {
    let line = pair.as_span().start_pos().line_col().0;
    let mut inner = pair.into_inner();
    let mnemonic_pair = inner
        .next()
        .ok_or_else(|| AssemblyError::StructuralError {
            line,
            reason: "Expected an instruction mnemonic.".to_string(),
        })?;
    let mnemonic = mnemonic_pair.as_str().to_lowercase();

    if instruction_spec(&mnemonic).is_none() {
        return Err(AssemblyError::StructuralError {
            line,
            reason: format!("Unknown instruction '{}'", mnemonic),
        }
        .into());
    }

    let mut operands = Vec::new();
    for op_pair in inner {
        operands.push(build_operand(op_pair)?);
    }

    Ok(Instruction { mnemonic, operands })
}

pub fn build_directive(pair: Pair<Rule>) -> Result<Directive> {
    let line = pair.as_span().start_pos().line_col().0;
    let inner = pair
        .into_inner()
        .next()
        .ok_or_else(|| AssemblyError::StructuralError {
            line,
            reason: "Expected an inner directive rule.".to_string(),
        })?;

    match inner.as_rule() {
        Rule::pic_directive => build_pic_directive(inner),
        Rule::name_directive => Ok(Directive::Name(single_identifier(inner)?)),
        Rule::importlib_directive => Ok(Directive::ImportLib(single_identifier(inner)?)),
        Rule::import_directive => {
            let (name, rename) = name_and_rename(inner)?;
            Ok(Directive::Import {
                internal: rename.unwrap_or_else(|| name.clone()),
                external: name,
            })
        }
        Rule::export_directive => {
            let (name, rename) = name_and_rename(inner)?;
            Ok(Directive::Export {
                external: rename.unwrap_or_else(|| name.clone()),
                internal: name,
            })
        }
        Rule::org_directive => {
            let line = inner.as_span().start_pos().line_col().0;
            let value_pair = inner
                .into_inner()
                .find(|p| p.as_rule() == Rule::int_literal)
                .ok_or_else(|| AssemblyError::StructuralError {
                    line,
                    reason: "Expected an address after org.".to_string(),
                })?;
            Ok(Directive::Org(pair_to_int(value_pair)?))
        }
        Rule::text_directive => Ok(Directive::Text),
        Rule::data_directive => Ok(Directive::Data),
        _ => unreachable!("Unknown directive rule: {:?}", inner.as_rule()),
    }
}

pub fn build_equate(pair: Pair<Rule>) -> Result<Directive> {
    let line = pair.as_span().start_pos().line_col().0;
    let mut inner = pair.into_inner();
    let name = inner
        .next()
        .ok_or_else(|| AssemblyError::StructuralError {
            line,
            reason: "Expected an equate name.".to_string(),
        })?
        .as_str()
        .to_string();
    // skip the EQU keyword
    inner.next();
    let value_pair = inner
        .next()
        .ok_or_else(|| AssemblyError::StructuralError {
            line,
            reason: "Expected an equate value.".to_string(),
        })?;
    Ok(Directive::Equate {
        name,
        value: pair_to_int(value_pair)?,
    })
}

pub fn build_data_items(pair: Pair<Rule>) -> Result<Vec<DataItem>> {
    let mut items = Vec::new();
    for item_pair in pair.into_inner() {
        if item_pair.as_rule() == Rule::dw_item {
            items.push(build_data_item(item_pair)?);
        }
    }
    Ok(items)
}

fn build_data_item(pair: Pair<Rule>) -> Result<DataItem> {
    let line = pair.as_span().start_pos().line_col().0;
    let inner = pair
        .into_inner()
        .next()
        .ok_or_else(|| AssemblyError::StructuralError {
            line,
            reason: "Expected a DW item.".to_string(),
        })?;

    match inner.as_rule() {
        Rule::str_literal => {
            let val = inner
                .into_inner()
                .next()
                .ok_or_else(|| AssemblyError::StructuralError {
                    line,
                    reason: "Expected a string body.".to_string(),
                })?;
            Ok(DataItem::Str(val.as_str().to_string()))
        }
        Rule::dup_item => {
            let mut dup_inner = inner.into_inner();
            let count_pair = dup_inner
                .next()
                .ok_or_else(|| AssemblyError::StructuralError {
                    line,
                    reason: "Expected a DUP count.".to_string(),
                })?;
            let count = pair_to_int(count_pair)?;
            if !(0..=0xFFFF).contains(&count) {
                return Err(AssemblyError::StructuralError {
                    line,
                    reason: "DUP count must be a non-negative 16 bit value.".to_string(),
                }
                .into());
            }
            // skip the EQU keyword
            dup_inner.next();
            let item_pair = dup_inner
                .next()
                .ok_or_else(|| AssemblyError::StructuralError {
                    line,
                    reason: "Expected a DUP value.".to_string(),
                })?;
            Ok(DataItem::Dup {
                count,
                item: Box::new(build_data_item(item_pair)?),
            })
        }
        Rule::int_literal => Ok(DataItem::Value(pair_to_int(inner)?)),
        Rule::identifier => Ok(DataItem::Symbol(inner.as_str().to_string())),
        _ => unreachable!("Unknown DW item rule: {:?}", inner.as_rule()),
    }
}

fn build_pic_directive(pair: Pair<Rule>) -> Result<Directive> {
    let line = pair.as_span().start_pos().line_col().0;
    let arg = pair
        .into_inner()
        .find(|p| p.as_rule() == Rule::identifier)
        .ok_or_else(|| AssemblyError::StructuralError {
            line,
            reason: "Expected an argument to pic.".to_string(),
        })?;
    match arg.as_str().to_lowercase().as_str() {
        "on" => Ok(Directive::Pic(PicMode::On)),
        "off" => Ok(Directive::Pic(PicMode::Off)),
        "default" => Ok(Directive::Pic(PicMode::Default)),
        other => Err(AssemblyError::StructuralError {
            line,
            reason: format!("'pic {}' is not a valid directive", other),
        }
        .into()),
    }
}

// Helper to build an Operand from a pest Pair
fn build_operand(pair: Pair<Rule>) -> Result<Operand> {
    let line = pair.as_span().start_pos().line_col().0;
    let inner_pair = pair
        .into_inner()
        .next()
        .ok_or_else(|| AssemblyError::StructuralError {
            line,
            reason: "Expected an inner operand rule.".to_string(),
        })?;
    match inner_pair.as_rule() {
        Rule::indirect => build_indirect(inner_pair),
        Rule::register | Rule::int_literal | Rule::identifier => {
            Ok(Operand::Direct(build_bare_term(inner_pair)?))
        }
        _ => unreachable!("Unknown operand rule: {:?}", inner_pair.as_rule()),
    }
}

fn build_indirect(pair: Pair<Rule>) -> Result<Operand> {
    let line = pair.as_span().start_pos().line_col().0;
    let mut inner = pair.into_inner();
    let base_pair = inner
        .next()
        .ok_or_else(|| AssemblyError::StructuralError {
            line,
            reason: "Expected a base term for indirect addressing.".to_string(),
        })?;
    let base = build_term(base_pair)?;

    let index = match inner.next() {
        Some(op_pair) => {
            let sign = match op_pair.as_str() {
                "+" => Sign::Plus,
                "-" => Sign::Minus,
                _ => unreachable!("Unknown additive operator"),
            };
            let term_pair = inner
                .next()
                .ok_or_else(|| AssemblyError::StructuralError {
                    line,
                    reason: "Expected a term after the additive operator.".to_string(),
                })?;
            Some((sign, build_term(term_pair)?))
        }
        None => None,
    };

    Ok(Operand::Indirect { base, index })
}

fn build_term(pair: Pair<Rule>) -> Result<Term> {
    let line = pair.as_span().start_pos().line_col().0;
    let inner = pair
        .into_inner()
        .next()
        .ok_or_else(|| AssemblyError::StructuralError {
            line,
            reason: "Expected an inner term rule.".to_string(),
        })?;
    build_bare_term(inner)
}

fn build_bare_term(pair: Pair<Rule>) -> Result<Term> {
    let line = pair.as_span().start_pos().line_col().0;
    match pair.as_rule() {
        Rule::register => {
            let reg = Register::from_name(pair.as_str()).ok_or_else(|| {
                AssemblyError::StructuralError {
                    line,
                    reason: format!("Invalid register identifier: {}", pair.as_str()),
                }
            })?;
            Ok(Term::Register(reg))
        }
        Rule::int_literal => Ok(Term::Immediate(pair_to_int(pair)?)),
        Rule::identifier => Ok(Term::Symbol(pair.as_str().to_string())),
        _ => unreachable!("Unknown term rule: {:?}", pair.as_rule()),
    }
}

fn single_identifier(pair: Pair<Rule>) -> Result<String> {
    let line = pair.as_span().start_pos().line_col().0;
    let ident = pair
        .into_inner()
        .find(|p| p.as_rule() == Rule::identifier)
        .ok_or_else(|| AssemblyError::StructuralError {
            line,
            reason: "Expected a directive argument.".to_string(),
        })?;
    Ok(ident.as_str().to_string())
}

fn name_and_rename(pair: Pair<Rule>) -> Result<(String, Option<String>)> {
    let line = pair.as_span().start_pos().line_col().0;
    let mut idents = pair
        .into_inner()
        .filter(|p| p.as_rule() == Rule::identifier);
    let name = idents
        .next()
        .ok_or_else(|| AssemblyError::StructuralError {
            line,
            reason: "Expected a symbol name.".to_string(),
        })?
        .as_str()
        .to_string();
    let rename = idents.next().map(|p| p.as_str().to_string());
    Ok((name, rename))
}

// translate an auto-base integer literal pair, with optional leading '-'
fn pair_to_int(pair: Pair<Rule>) -> Result<i32> {
    let line = pair.as_span().start_pos().line_col().0;
    let text = pair.as_str();
    let (negative, body) = match text.strip_prefix('-') {
        Some(rest) => (true, rest),
        None => (false, text),
    };

    let lowered = body.to_lowercase();
    let parsed = if let Some(digits) = lowered.strip_prefix("0x") {
        i64::from_str_radix(digits, 16)
    } else if let Some(digits) = lowered.strip_prefix("0o") {
        i64::from_str_radix(digits, 8)
    } else if let Some(digits) = lowered.strip_prefix("0b") {
        i64::from_str_radix(digits, 2)
    } else {
        lowered.parse::<i64>()
    };

    let value = parsed.map_err(|_| AssemblyError::StructuralError {
        line,
        reason: format!("Invalid integer literal: {}", text),
    })?;

    Ok(if negative { -value } else { value } as i32)
}
