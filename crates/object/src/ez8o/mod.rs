//! The `EZ8O` object format.

mod builder;
mod external;
mod file;
mod header;
mod library;
mod relocation;
mod strings;
mod symbol;

pub use builder::ObjectBuilder;
pub use external::ExternalRecord;
pub use file::ObjectFile;
pub use header::Header;
pub use library::{Library, LibraryError, Member};
pub use relocation::{RelocationKind, RelocationRecord, RelocationTarget};
pub use strings::{StringTable, StringTableBuilder};
pub use symbol::{Binding, SymbolRecord};

use crate::{
    combinators::{le_u8, Err, ErrorKind, ParseError},
    Input, Result,
};

/// A section of an object file.
///
/// Symbols live in exactly one section; `Absolute` holds constants that
/// are not moved by the linker.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum Section {
    /// Absolute values, never relocated.
    Absolute = 0,
    /// Executable code.
    Code = 1,
    /// Initialized data.
    Data = 2,
    /// Uninitialized storage; sized but never materialized in the output.
    Bss = 3,
}

impl Section {
    /// Parse a section byte.
    pub fn read<'a, E>(input: Input<'a>) -> Result<'a, Self, E>
    where
        E: ParseError<Input<'a>>,
    {
        let (rest, byte) = le_u8(input)?;

        Ok((
            rest,
            match byte {
                0 => Self::Absolute,
                1 => Self::Code,
                2 => Self::Data,
                3 => Self::Bss,
                _ => return Err(Err::Error(E::from_error_kind(input, ErrorKind::Alt))),
            },
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_section_read() {
        assert_eq!(Section::read::<()>(&[0]), Ok((&[][..], Section::Absolute)));
        assert_eq!(Section::read::<()>(&[1]), Ok((&[][..], Section::Code)));
        assert_eq!(Section::read::<()>(&[2]), Ok((&[][..], Section::Data)));
        assert_eq!(Section::read::<()>(&[3]), Ok((&[][..], Section::Bss)));
        assert!(Section::read::<()>(&[4]).is_err());
    }
}
