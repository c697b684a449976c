//! `braze-as` is the assembler executable: one eZ80 (ADL mode) source
//! file in, one `EZ8O` relocatable object out.

use std::{fs::File, path::PathBuf, process};

use argh::FromArgs;
use braze_asm::Assembler;
use braze_errors::Result;
use miette::IntoDiagnostic;

/// The `braze-as` command assembles an eZ80 (ADL mode) source file into
/// a relocatable EZ8O object file.
#[derive(Debug, FromArgs)]
struct BrazeAs {
    /// name and location of the output object. If not specified, the
    /// input name with its extension replaced by `.o` is used.
    #[argh(option, short = 'o')]
    output: Option<PathBuf>,

    /// print a section summary after assembly.
    #[argh(switch, short = 'v')]
    verbose: bool,

    /// the source file to assemble.
    #[argh(positional)]
    input: PathBuf,
}

fn main() -> Result<()> {
    braze_bin::install_error_handler()?;

    let arguments: BrazeAs = argh::from_env();
    let output = arguments.output.unwrap_or_else(|| arguments.input.with_extension("o"));

    let mut assembler = Assembler::new(arguments.verbose);
    assembler.assemble_file(&arguments.input)?;

    // Diagnostics already went to stderr, line by line; a failed run
    // leaves no object behind.
    if assembler.has_errors() {
        process::exit(1);
    }

    let mut sink = File::create(&output).into_diagnostic()?;
    assembler.write_object(&mut sink).into_diagnostic()?;

    Ok(())
}
