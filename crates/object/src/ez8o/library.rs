use std::{error, fmt};

use bstr::BStr;

use super::{Binding, ExternalRecord, Header, RelocationRecord, StringTable, SymbolRecord};
use crate::errors::SingleError;

/// A library: a concatenation of complete object files.
///
/// Scanning only walks the headers; a member's records are read on demand
/// so the linker can decide whether a member is worth loading at all.
#[derive(Debug)]
pub struct Library<'a> {
    bytes: &'a [u8],
    members: Vec<Member>,
}

/// Placement of one member inside a library.
#[derive(Debug, Clone, Copy)]
pub struct Member {
    /// Byte offset of the member's header.
    pub offset: usize,
    /// Total byte length of the member.
    pub size: usize,
}

/// Errors produced while walking a library.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LibraryError {
    /// A member header had a bad magic or version.
    BadMagic {
        /// Offset of the offending header.
        offset: usize,
    },
    /// A member claims more bytes than the library holds.
    Truncated {
        /// Offset of the offending header.
        offset: usize,
    },
}

impl fmt::Display for LibraryError {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::BadMagic { offset } => {
                write!(formatter, "invalid object magic or version at library offset {offset:#x}")
            }
            Self::Truncated { offset } => {
                write!(formatter, "truncated library member at offset {offset:#x}")
            }
        }
    }
}

impl error::Error for LibraryError {}

impl<'a> Library<'a> {
    /// Walk the headers of `bytes`, recording each member's placement.
    pub fn scan(bytes: &'a [u8]) -> Result<Self, LibraryError> {
        let mut members = Vec::new();
        let mut offset = 0;

        while offset < bytes.len() {
            let rest = &bytes[offset..];

            let (_, header) = Header::read::<SingleError>(rest)
                .map_err(|_| LibraryError::BadMagic { offset })?;

            let size = header.object_size();

            if size > rest.len() {
                return Err(LibraryError::Truncated { offset });
            }

            members.push(Member { offset, size });
            offset += size;
        }

        Ok(Self { bytes, members })
    }

    /// The scanned members, in file order.
    pub fn members(&self) -> &[Member] {
        &self.members
    }

    /// The full byte range of one member, suitable for
    /// [`super::ObjectFile::read`].
    pub fn member_bytes(&self, index: usize) -> &'a [u8] {
        let member = self.members[index];

        &self.bytes[member.offset..member.offset + member.size]
    }

    /// The exported names of one member, read from the header, the symbol
    /// records and the string table only. Nothing else is parsed.
    pub fn member_exports(&self, index: usize) -> Result<Vec<&'a BStr>, LibraryError> {
        let member = self.members[index];
        let bytes = self.member_bytes(index);

        let (_, header) =
            Header::read::<SingleError>(bytes).map_err(|_| LibraryError::BadMagic {
                offset: member.offset,
            })?;

        let symbols_at =
            Header::SIZE + header.code_size as usize + header.data_size as usize;
        let strings_at = symbols_at
            + header.symbol_count as usize * SymbolRecord::SIZE
            + header.relocation_count as usize * RelocationRecord::SIZE
            + header.external_count as usize * ExternalRecord::SIZE;

        let strings = StringTable::new(
            &bytes[strings_at..strings_at + header.string_table_size as usize],
        );

        let mut exports = Vec::with_capacity(header.symbol_count as usize);

        for record in bytes[symbols_at..]
            .chunks_exact(SymbolRecord::SIZE)
            .take(header.symbol_count as usize)
        {
            let (_, mut symbol) = SymbolRecord::read::<SingleError>(record)
                .map_err(|_| LibraryError::BadMagic { offset: member.offset })?;

            if symbol.binding == Binding::Export {
                symbol.fetch_name(&strings);

                if let Some(name) = symbol.name {
                    exports.push(name);
                }
            }
        }

        Ok(exports)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ez8o::{ObjectBuilder, Section};

    fn object(name: &[u8], code: &[u8]) -> Vec<u8> {
        let mut builder = ObjectBuilder::new();
        builder.set_code(code.to_vec());
        builder.add_symbol(name, Section::Code, 0);

        let mut sink = std::io::Cursor::new(Vec::new());
        builder.write_to(&mut sink).unwrap();
        sink.into_inner()
    }

    #[test]
    fn test_scan_and_exports() {
        let mut library = object(b"alpha", &[1, 2]);
        library.extend_from_slice(&object(b"beta", &[3, 4, 5]));

        let library = Library::scan(&library).unwrap();

        assert_eq!(library.members().len(), 2);
        assert_eq!(library.member_exports(0).unwrap(), vec![BStr::new("alpha")]);
        assert_eq!(library.member_exports(1).unwrap(), vec![BStr::new("beta")]);
    }

    #[test]
    fn test_scan_rejects_garbage_between_members() {
        let mut library = object(b"alpha", &[1, 2]);
        library.extend_from_slice(b"not an object");

        let garbage_at = library.len() - 13;

        assert!(matches!(
            Library::scan(&library),
            Err(LibraryError::BadMagic { offset }) if offset == garbage_at
        ));
    }

    #[test]
    fn test_scan_rejects_truncated_member() {
        let mut bytes = object(b"alpha", &[1, 2, 3, 4]);
        bytes.truncate(bytes.len() - 2);

        assert!(matches!(Library::scan(&bytes), Err(LibraryError::Truncated { offset: 0 })));
    }
}
