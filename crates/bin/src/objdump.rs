//! `braze-objdump` prints EZ8O objects in human-readable form. A
//! library is just a concatenation of objects, so it dumps those too,
//! member by member.

use std::path::PathBuf;

use argh::FromArgs;
use braze_errors::Result;
use braze_object::{
    errors::SingleError,
    ez8o::{Library, ObjectFile, RelocationTarget, Section},
};
use miette::{miette, IntoDiagnostic};

/// The `braze-objdump` command prints the contents of EZ8O object files
/// and libraries.
#[derive(Debug, FromArgs)]
struct BrazeObjdump {
    /// object or library files to print.
    #[argh(positional)]
    files: Vec<PathBuf>,
}

fn main() -> Result<()> {
    braze_bin::install_error_handler()?;

    let arguments: BrazeObjdump = argh::from_env();

    if arguments.files.is_empty() {
        return Err(miette!("no input files; try `braze-objdump <file…>`"));
    }

    for path in &arguments.files {
        let bytes = braze_file::read(path).into_diagnostic()?;

        let library = Library::scan(&bytes)
            .map_err(|error| miette!("{}: {error}", path.display()))?;

        for (index, _) in library.members().iter().enumerate() {
            if library.members().len() > 1 {
                println!("{}({index}):", path.display());
            } else {
                println!("{}:", path.display());
            }

            let member = library.member_bytes(index);
            let (_, mut object) = ObjectFile::read::<SingleError>(member)
                .map_err(|_| miette!("{}: invalid object", path.display()))?;
            object.fetch_names();

            dump(&object);
        }
    }

    Ok(())
}

fn dump(object: &ObjectFile<'_>) {
    let header = &object.header;

    println!(
        "  header: flags {:#04x}, code {:#x}, data {:#x}, bss {:#x}, strings {:#x}",
        header.flags, header.code_size, header.data_size, header.bss_size,
        header.string_table_size,
    );

    if !object.code.is_empty() {
        println!("  code:");
        hex_dump(object.code);
    }

    if !object.data.is_empty() {
        println!("  data:");
        hex_dump(object.data);
    }

    if !object.symbols.is_empty() {
        println!("  symbols:");

        for symbol in &object.symbols {
            println!(
                "    {:06x}  {:<5}  {}",
                symbol.value,
                section_name(symbol.section),
                symbol.name.map(|name| name.to_string()).unwrap_or_else(|| "?".to_owned()),
            );
        }
    }

    if !object.relocations.is_empty() {
        println!("  relocations:");

        for relocation in &object.relocations {
            let target = match relocation.target {
                RelocationTarget::External => {
                    let name = object
                        .externals
                        .get(relocation.external_index as usize)
                        .and_then(|external| external.name);

                    match name {
                        Some(name) => format!("external {name}"),
                        None => format!("external #{}", relocation.external_index),
                    }
                }
                RelocationTarget::Code => "code".to_owned(),
                RelocationTarget::Data => "data".to_owned(),
                RelocationTarget::Bss => "bss".to_owned(),
            };

            println!(
                "    {}+{:06x}  addr24  -> {target}",
                section_name(relocation.section),
                relocation.offset,
            );
        }
    }

    if !object.externals.is_empty() {
        println!("  externals:");

        for (index, external) in object.externals.iter().enumerate() {
            println!(
                "    [{index}] {}",
                external.name.map(|name| name.to_string()).unwrap_or_else(|| "?".to_owned()),
            );
        }
    }
}

fn section_name(section: Section) -> &'static str {
    match section {
        Section::Absolute => "abs",
        Section::Code => "code",
        Section::Data => "data",
        Section::Bss => "bss",
    }
}

fn hex_dump(bytes: &[u8]) {
    for (index, row) in bytes.chunks(16).enumerate() {
        print!("    {:06x} ", index * 16);

        for byte in row {
            print!(" {byte:02x}");
        }

        println!();
    }
}
