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

use clap::CommandFactory;
use clap::Parser as clap_parser;
use picasm::assemble;
use picasm::assembler::Options;
use picasm::output;
use std::fs;
use std::io::{self, Write};
use std::path::PathBuf;
use std::process::ExitCode;

#[derive(clap_parser)]
#[clap(version = "0.1.0", about = "Assembler for the 16-bit word-addressed virtual CPU")]
struct Opts {
    /// Input assembly source file
    input: PathBuf,
    /// Force code to be position-dependent
    #[clap(long)]
    pdc: bool,
    /// Give output as DW statements instead of raw bytes
    #[clap(long)]
    dcl: bool,
    /// Disable the object file wrapper and output raw code
    #[clap(long = "raw_asm")]
    raw_asm: bool,
}

fn main() -> ExitCode {
    let opts: Opts = Opts::parse();

    let source = match fs::read_to_string(&opts.input) {
        Ok(source) => source,
        Err(err) => {
            eprintln!("Input file cannot be opened: {}: {}", opts.input.display(), err);
            eprintln!("{}", Opts::command().render_usage());
            return ExitCode::from(2);
        }
    };

    let options = Options {
        pic_default: !opts.pdc,
        wrap_asm: !opts.raw_asm,
    };

    let words = match assemble(&source, options) {
        Ok(words) => words,
        Err(err) => {
            eprintln!("error: {:#}", err);
            return ExitCode::from(1);
        }
    };

    let stdout = io::stdout();
    let mut out = stdout.lock();
    let written = if opts.dcl {
        output::write_listing(&mut out, &words)
    } else {
        output::write_words(&mut out, &words)
    };
    if let Err(err) = written.and_then(|_| out.flush()) {
        eprintln!("Cannot write output: {}", err);
        return ExitCode::from(2);
    }

    ExitCode::SUCCESS
}
