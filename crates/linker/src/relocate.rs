//! The relocation pass.
//!
//! Every object is opened and streamed exactly once: its code and data
//! are copied to their laid-out positions in the image buffers, then
//! each `Addr24` record adds the right base (or an external's absolute
//! value) into the 24-bit little-endian field it points at.

use braze_errors::{Reporter, Severity};
use braze_object::{
    errors::SingleError,
    ez8o::{ObjectFile, RelocationTarget, Section},
};

use crate::{
    linker::{Error, Layout},
    loader::{InputObject, LoadedLibrary, ObjectSource},
    symbols::GlobalSymbols,
};

pub(crate) fn relocate(
    objects: &[InputObject],
    libraries: &[LoadedLibrary],
    globals: &GlobalSymbols,
    layout: Layout,
    base: u32,
    reporter: &mut Reporter,
) -> Result<Vec<u8>, Error> {
    let mut code_image = vec![0u8; layout.total_code as usize];
    let mut data_image = vec![0u8; layout.total_data as usize];

    for object in objects {
        let bytes: Vec<u8> = match &object.source {
            ObjectSource::File(path) => braze_file::read(path)
                .map_err(|source| Error::CannotOpen {
                    path: path.display().to_string(),
                    source,
                })?
                .to_vec(),
            ObjectSource::Member { library, member } => {
                let library = &libraries[*library];
                let member = library.members[*member];

                library.bytes[member.offset..member.offset + member.size].to_vec()
            }
        };

        let (_, mut parsed) = ObjectFile::read::<SingleError>(&bytes)
            .map_err(|_| Error::InvalidObject { path: object.name.clone() })?;
        parsed.fetch_names();

        // The sizes fed the layout; a mismatch means the file changed
        // under us.
        if parsed.header.code_size != object.code_size
            || parsed.header.data_size != object.data_size
        {
            return Err(Error::InvalidObject { path: object.name.clone() });
        }

        let code_at = (object.code_base - base) as usize;
        code_image[code_at..code_at + parsed.code.len()].copy_from_slice(parsed.code);

        let data_at = (object.data_base - base - layout.total_code) as usize;
        data_image[data_at..data_at + parsed.data.len()].copy_from_slice(parsed.data);

        for relocation in &parsed.relocations {
            let (image, section_at, section_size) = match relocation.section {
                Section::Code => (&mut code_image, code_at, parsed.code.len()),
                Section::Data => (&mut data_image, data_at, parsed.data.len()),
                _ => {
                    reporter.message(
                        Severity::Error,
                        format!("{}: relocation in a section without bytes", object.name),
                    );

                    continue;
                }
            };

            // Patch sites outside the section are skipped.
            let offset = relocation.offset as usize;
            if offset + 3 > section_size {
                continue;
            }

            let target_address = match relocation.target {
                RelocationTarget::External => {
                    let name = parsed
                        .externals
                        .get(relocation.external_index as usize)
                        .and_then(|external| external.name);

                    match name.and_then(|name| globals.lookup(name)) {
                        Some(symbol) => symbol.value,
                        None => {
                            let shown = name
                                .map(|name| name.to_string())
                                .unwrap_or_else(|| format!("#{}", relocation.external_index));
                            reporter.message(
                                Severity::Error,
                                format!("{}: unresolved external `{shown}`", object.name),
                            );

                            continue;
                        }
                    }
                }
                RelocationTarget::Code => object.code_base,
                RelocationTarget::Data => object.data_base,
                RelocationTarget::Bss => object.bss_base,
            };

            // The field holds the section-relative offset the assembler
            // left behind; add the target's absolute base.
            let site = section_at + offset;
            let existing = u32::from(image[site])
                | u32::from(image[site + 1]) << 8
                | u32::from(image[site + 2]) << 16;
            let patched = existing.wrapping_add(target_address) & 0xff_ffff;

            image[site] = patched as u8;
            image[site + 1] = (patched >> 8) as u8;
            image[site + 2] = (patched >> 16) as u8;
        }
    }

    let mut image = code_image;
    image.extend_from_slice(&data_image);

    Ok(image)
}
