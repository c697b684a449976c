//! The link driver: load, resolve, lay out, patch, write.

use std::{fs, path::PathBuf};

use braze_errors::Reporter;
use braze_object::ez8o::{LibraryError, Section};
use bstr::BStr;
use miette::Diagnostic;
use thiserror::Error as ThisError;

use crate::{
    configuration::Configuration,
    loader::{self, InputObject},
    map, relocate,
    symbols::GlobalSymbols,
};

/// Fatal linking errors. Resolution-phase problems (unresolved
/// externals, bad patch targets) are collected instead, so one run
/// reports them all; [`Error::ErrorsReported`] then carries the count.
#[derive(Debug, Diagnostic, ThisError)]
pub enum Error {
    /// The command line named no objects at all.
    #[error("I'm happy to link objects, but no objects were given")]
    #[diagnostic(help("add input object files: `braze-ld <objects…>`"))]
    NoInputFile,

    /// An input file that would not open.
    #[error("cannot open `{path}`: {source}")]
    CannotOpen {
        /// The path that failed.
        path: String,
        /// The underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// A file that does not parse as an `EZ8O` object.
    #[error("`{path}` is not a valid EZ8O object")]
    #[diagnostic(help("was this file produced by `braze-as`?"))]
    InvalidObject {
        /// The offending file or library member.
        path: String,
    },

    /// A library whose member walk broke down.
    #[error("invalid library `{path}`: {source}")]
    InvalidLibrary {
        /// The library file.
        path: String,
        /// What the member walk tripped over.
        #[source]
        source: LibraryError,
    },

    /// A `-l` name that resolved to nothing.
    #[error("cannot find library `{0}`")]
    #[diagnostic(help(
        "libraries are looked up as `lib<NAME>.a` in every `-L` directory, then as a literal path"
    ))]
    MissingLibrary(String),

    /// Two objects exporting the same name.
    #[error("duplicate global symbol `{name}` (while loading {object})")]
    DuplicateSymbol {
        /// The contested name.
        name: String,
        /// The object whose load surfaced the clash.
        object: String,
    },

    /// The output or map file would not write.
    #[error("cannot write `{path}`: {source}")]
    CannotWrite {
        /// The path that failed.
        path: String,
        /// The underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// Resolution-phase errors were collected; nothing was written.
    #[error("linking failed with {0} error(s)")]
    ErrorsReported(usize),
}

/// The linker context.
#[derive(Debug)]
pub struct Linker {
    configuration: Configuration,
}

/// Section totals, fixed after layout.
#[derive(Debug, Clone, Copy)]
pub(crate) struct Layout {
    pub total_code: u32,
    pub total_data: u32,
    pub total_bss: u32,
}

impl Linker {
    pub(crate) fn with_configuration(configuration: Configuration) -> Self {
        Self { configuration }
    }

    /// Run the whole link. The output file is only written when every
    /// phase finished without an error.
    pub fn link(self) -> Result<(), Error> {
        let configuration = self.configuration;

        if configuration.input_files.is_empty() {
            return Err(Error::NoInputFile);
        }

        let mut objects = Vec::new();
        let mut globals = GlobalSymbols::new();

        for path in &configuration.input_files {
            if configuration.verbose {
                eprintln!("loading {}", path.display());
            }

            loader::load_file(path, &mut objects, &mut globals)?;
        }

        let mut libraries = Vec::new();

        for name in &configuration.libraries {
            let path = resolve_library(name, &configuration.library_paths)?;
            libraries.push(loader::open_library(path)?);
        }

        loader::selective_load(
            &mut objects,
            &mut globals,
            &mut libraries,
            configuration.verbose,
        )?;

        let layout = assign_bases(&mut objects, &mut globals, configuration.base_address)?;

        let mut reporter = Reporter::new();
        let image = relocate::relocate(
            &objects,
            &libraries,
            &globals,
            layout,
            configuration.base_address,
            &mut reporter,
        )?;

        if reporter.has_errors() {
            return Err(Error::ErrorsReported(reporter.error_count()));
        }

        fs::write(&configuration.output_file, &image).map_err(|source| Error::CannotWrite {
            path: configuration.output_file.display().to_string(),
            source,
        })?;

        if let Some(map_path) = &configuration.map_file {
            map::write_map(map_path, configuration.base_address, layout, &objects, &globals)
                .map_err(|source| Error::CannotWrite {
                    path: map_path.display().to_string(),
                    source,
                })?;
        }

        if configuration.verbose {
            eprintln!(
                "wrote {} bytes to {}",
                image.len(),
                configuration.output_file.display()
            );
        }

        Ok(())
    }
}

/// `-lNAME` resolution: `lib<NAME>.a` under each `-L` directory, then
/// the literal name.
fn resolve_library(name: &str, directories: &[PathBuf]) -> Result<PathBuf, Error> {
    for directory in directories {
        let candidate = directory.join(format!("lib{name}.a"));

        if candidate.exists() {
            return Ok(candidate);
        }
    }

    let literal = PathBuf::from(name);

    if literal.exists() {
        return Ok(literal);
    }

    Err(Error::MissingLibrary(name.to_owned()))
}

/// Assign section bases in object order — all code first, then all
/// data, then all BSS — make the global symbols absolute, and inject
/// the linker-defined symbols.
fn assign_bases(
    objects: &mut [InputObject],
    globals: &mut GlobalSymbols,
    base: u32,
) -> Result<Layout, Error> {
    let mut address = base;

    for object in objects.iter_mut() {
        object.code_base = address;
        address = address.wrapping_add(object.code_size);
    }
    let total_code = address - base;

    for object in objects.iter_mut() {
        object.data_base = address;
        address = address.wrapping_add(object.data_size);
    }
    let total_data = address - base - total_code;

    for object in objects.iter_mut() {
        object.bss_base = address;
        address = address.wrapping_add(object.bss_size);
    }
    let total_bss = address - base - total_code - total_data;

    for symbol in globals.iter_mut() {
        if let Some(index) = symbol.object {
            let object = &objects[index];
            let section_base = match symbol.section {
                Section::Code => object.code_base,
                Section::Data => object.data_base,
                Section::Bss => object.bss_base,
                Section::Absolute => 0,
            };

            symbol.value = symbol.value.wrapping_add(section_base) & 0xff_ffff;
        }
    }

    let layout = Layout { total_code, total_data, total_bss };

    for (name, value) in [
        ("__low_code", base),
        ("__len_code", total_code),
        ("__low_data", base + total_code),
        ("__len_data", total_data),
        ("__low_bss", base + total_code + total_data),
        ("__len_bss", total_bss),
    ] {
        globals.insert(BStr::new(name), Section::Absolute, value & 0xff_ffff, None, "(linker)")?;
    }

    Ok(layout)
}
