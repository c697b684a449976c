//! Object loading and the selective library loader.

use std::{
    collections::HashSet,
    path::{Path, PathBuf},
};

use braze_object::{
    errors::SingleError,
    ez8o::{Library, Member, ObjectFile},
};
use bstr::BString;

use crate::{symbols::GlobalSymbols, Error};

/// One object taking part in the link.
///
/// Only the metadata needed for resolution lives here; the bytes are
/// streamed again during relocation.
#[derive(Debug)]
pub(crate) struct InputObject {
    /// Display name for diagnostics and the map file.
    pub name: String,
    /// Where the bytes come from.
    pub source: ObjectSource,
    /// Section sizes from the header.
    pub code_size: u32,
    /// Data section size.
    pub data_size: u32,
    /// BSS size.
    pub bss_size: u32,
    /// External names this object needs.
    pub externs: Vec<BString>,
    /// Assigned during layout.
    pub code_base: u32,
    /// Assigned during layout.
    pub data_base: u32,
    /// Assigned during layout.
    pub bss_base: u32,
}

/// Where an object's bytes live.
#[derive(Debug)]
pub(crate) enum ObjectSource {
    /// A file named on the command line.
    File(PathBuf),
    /// A member of a scanned library.
    Member {
        /// Index into the library list.
        library: usize,
        /// Index into that library's member catalog.
        member: usize,
    },
}

/// A library whose headers have been walked.
#[derive(Debug)]
pub(crate) struct LoadedLibrary {
    pub path: PathBuf,
    pub bytes: Vec<u8>,
    pub members: Vec<Member>,
    pub loaded: Vec<bool>,
}

fn lowered(name: &[u8]) -> Vec<u8> {
    name.to_ascii_lowercase()
}

/// Parse an object's metadata and merge its exports into the global
/// table.
fn register(
    bytes: &[u8],
    name: String,
    source: ObjectSource,
    objects: &mut Vec<InputObject>,
    globals: &mut GlobalSymbols,
) -> Result<(), Error> {
    let (_, mut object) = ObjectFile::read::<SingleError>(bytes)
        .map_err(|_| Error::InvalidObject { path: name.clone() })?;
    object.fetch_names();

    let index = objects.len();

    for symbol in &object.symbols {
        let symbol_name =
            symbol.name.ok_or_else(|| Error::InvalidObject { path: name.clone() })?;

        globals.insert(symbol_name, symbol.section, symbol.value, Some(index), &name)?;
    }

    let externs = object
        .externals
        .iter()
        .map(|external| {
            external
                .name
                .map(BString::from)
                .ok_or_else(|| Error::InvalidObject { path: name.clone() })
        })
        .collect::<Result<Vec<_>, _>>()?;

    objects.push(InputObject {
        name,
        source,
        code_size: object.header.code_size,
        data_size: object.header.data_size,
        bss_size: object.header.bss_size,
        externs,
        code_base: 0,
        data_base: 0,
        bss_base: 0,
    });

    Ok(())
}

/// Load an object named on the command line.
pub(crate) fn load_file(
    path: &Path,
    objects: &mut Vec<InputObject>,
    globals: &mut GlobalSymbols,
) -> Result<(), Error> {
    let bytes = braze_file::read(path).map_err(|source| Error::CannotOpen {
        path: path.display().to_string(),
        source,
    })?;

    register(
        &bytes,
        path.display().to_string(),
        ObjectSource::File(path.to_owned()),
        objects,
        globals,
    )
}

/// Walk a library's headers into a member catalog. Nothing is loaded
/// yet.
pub(crate) fn open_library(path: PathBuf) -> Result<LoadedLibrary, Error> {
    let bytes = braze_file::read(&path)
        .map_err(|source| Error::CannotOpen { path: path.display().to_string(), source })?
        .to_vec();

    let members = Library::scan(&bytes)
        .map_err(|source| Error::InvalidLibrary { path: path.display().to_string(), source })?
        .members()
        .to_vec();

    let loaded = vec![false; members.len()];

    Ok(LoadedLibrary { path, bytes, members, loaded })
}

/// Pull in library members until the undefined-externals set stops
/// moving. Each member is loaded at most once, which bounds the loop.
pub(crate) fn selective_load(
    objects: &mut Vec<InputObject>,
    globals: &mut GlobalSymbols,
    libraries: &mut [LoadedLibrary],
    verbose: bool,
) -> Result<(), Error> {
    loop {
        let mut undefined: HashSet<Vec<u8>> = HashSet::new();

        for object in objects.iter() {
            for name in &object.externs {
                if !globals.contains(name) {
                    undefined.insert(lowered(name));
                }
            }
        }

        if undefined.is_empty() {
            return Ok(());
        }

        let mut loaded_any = false;

        for library_index in 0..libraries.len() {
            for member_index in 0..libraries[library_index].members.len() {
                if libraries[library_index].loaded[member_index] {
                    continue;
                }

                let wanted = {
                    let library = Library::scan(&libraries[library_index].bytes)
                        .expect("the catalog was validated when the library was opened");
                    let exports =
                        library.member_exports(member_index).map_err(|source| {
                            Error::InvalidLibrary {
                                path: libraries[library_index].path.display().to_string(),
                                source,
                            }
                        })?;

                    exports.iter().any(|name| undefined.contains(&lowered(name)))
                };

                if !wanted {
                    continue;
                }

                libraries[library_index].loaded[member_index] = true;
                loaded_any = true;

                let member = libraries[library_index].members[member_index];
                let bytes = libraries[library_index].bytes
                    [member.offset..member.offset + member.size]
                    .to_vec();
                let name =
                    format!("{}({member_index})", libraries[library_index].path.display());

                if verbose {
                    eprintln!("loading {name}");
                }

                register(
                    &bytes,
                    name,
                    ObjectSource::Member { library: library_index, member: member_index },
                    objects,
                    globals,
                )?;

                // Keep the running set current: drop what the new member
                // satisfied, pick up what it needs itself.
                for extern_name in &objects.last().expect("just pushed").externs {
                    if !globals.contains(extern_name) {
                        undefined.insert(lowered(extern_name));
                    }
                }
                undefined.retain(|name| !globals.contains(name));
            }
        }

        if !loaded_any {
            return Ok(());
        }
    }
}
