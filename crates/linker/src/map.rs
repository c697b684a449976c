//! The map-file writer: memory layout, per-object bases, and every
//! global symbol with its origin.

use std::{
    fs::File,
    io::{self, Write},
    path::Path,
};

use braze_object::ez8o::Section;

use crate::{linker::Layout, loader::InputObject, symbols::GlobalSymbols};

pub(crate) fn write_map(
    path: &Path,
    base: u32,
    layout: Layout,
    objects: &[InputObject],
    globals: &GlobalSymbols,
) -> io::Result<()> {
    let mut out = File::create(path)?;

    writeln!(out, "Memory layout")?;
    writeln!(out, "  code  {base:06x}  size {:06x}", layout.total_code)?;
    writeln!(out, "  data  {:06x}  size {:06x}", base + layout.total_code, layout.total_data)?;
    writeln!(
        out,
        "  bss   {:06x}  size {:06x}",
        base + layout.total_code + layout.total_data,
        layout.total_bss
    )?;
    writeln!(out)?;

    writeln!(out, "Objects")?;
    for object in objects {
        writeln!(
            out,
            "  {:<32}  code {:06x}+{:06x}  data {:06x}+{:06x}  bss {:06x}+{:06x}",
            object.name,
            object.code_base,
            object.code_size,
            object.data_base,
            object.data_size,
            object.bss_base,
            object.bss_size,
        )?;
    }
    writeln!(out)?;

    writeln!(out, "Symbols")?;
    let mut symbols: Vec<_> = globals.iter().collect();
    symbols.sort_by(|a, b| a.value.cmp(&b.value).then_with(|| a.name.cmp(&b.name)));

    for symbol in symbols {
        let origin = match symbol.object {
            Some(index) => objects[index].name.as_str(),
            None => "(linker)",
        };
        let kind = match symbol.section {
            Section::Absolute => "abs",
            Section::Code => "code",
            Section::Data => "data",
            Section::Bss => "bss",
        };

        writeln!(out, "  {:06x}  {kind:<4}  {:<24}  {origin}", symbol.value, symbol.name)?;
    }

    Ok(())
}
