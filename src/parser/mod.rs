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

mod ast_builder;

use crate::ast::*;
use anyhow::Result;
use pest::Parser;
use pest_derive::Parser;

// Derive the parser from our grammar file.
#[derive(Parser)]
#[grammar = "./grammar.pest"]
pub struct AsmParser;

// Main parsing function that takes the entire source code string.
pub fn parse_source(source: &str) -> Result<Vec<SourceLine>> {
    let pairs = AsmParser::parse(Rule::program, source)?;
    let mut ast = Vec::new();

    for line_pair in pairs
        .flatten()
        .filter(|p| p.as_rule() == Rule::line_content)
    {
        let mut source_line = SourceLine {
            line_number: line_pair.as_span().start_pos().line_col().0,
            ..SourceLine::default()
        };

        for pair in line_pair.into_inner() {
            match pair.as_rule() {
                Rule::label => {
                    source_line.label = Some(ast_builder::build_label(pair)?);
                }
                Rule::dw_statement => {
                    source_line.statement =
                        Some(Statement::Data(ast_builder::build_data_items(pair)?));
                }
                Rule::equate_statement => {
                    source_line.statement =
                        Some(Statement::Directive(ast_builder::build_equate(pair)?));
                }
                Rule::directive => {
                    source_line.statement =
                        Some(Statement::Directive(ast_builder::build_directive(pair)?));
                }
                Rule::instruction => {
                    source_line.statement =
                        Some(Statement::Instruction(ast_builder::build_instruction(pair)?));
                }
                _ => {}
            }
        }

        // Only add non-empty lines to our AST
        if source_line.label.is_some() || source_line.statement.is_some() {
            ast.push(source_line);
        }
    }

    Ok(ast)
}

// ------------- unit tests -------------
