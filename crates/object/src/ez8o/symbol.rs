use bstr::BStr;

use super::{Section, StringTable};
use crate::{
    combinators::{le_u24, le_u8, skip, tuple, Err, ErrorKind, ParseError},
    Input, Result,
};

/// An exported-symbol record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SymbolRecord<'a> {
    /// Name of the symbol, fetched from the string table.
    pub name: Option<&'a BStr>,
    /// Offset of the name inside the string table.
    pub name_offset: u32,
    /// The section the symbol is defined in.
    pub section: Section,
    /// Visibility of the symbol.
    pub binding: Binding,
    /// Section-relative value (absolute after linking).
    pub value: u32,
}

impl<'a> SymbolRecord<'a> {
    /// Size of `Self` in the `EZ8O` format.
    pub const SIZE: usize = 10;

    /// Parse one symbol record. The name is fetched separately, see
    /// [`Self::fetch_name`].
    pub fn read<E>(input: Input<'a>) -> Result<'a, Self, E>
    where
        E: ParseError<Input<'a>>,
    {
        let (input, (name_offset, section, binding, value, _reserved)) =
            tuple((le_u24, Section::read, Binding::read, le_u24, skip(2usize)))(input)?;

        Ok((input, Self { name: None, name_offset, section, binding, value }))
    }

    /// Copy the name reference out of the string table.
    pub fn fetch_name(&mut self, strings: &StringTable<'a>) {
        self.name = strings.get(self.name_offset);
    }
}

/// Visibility of a symbol.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum Binding {
    /// Not visible outside the defining object. Local symbols never reach
    /// an object file; the value exists for completeness of the format.
    Local = 0,
    /// Exported, visible to the linker.
    Export = 1,
    /// Declared here, defined in another object.
    Extern = 2,
}

impl Binding {
    /// Parse a binding byte.
    pub fn read<'a, E>(input: Input<'a>) -> Result<'a, Self, E>
    where
        E: ParseError<Input<'a>>,
    {
        let (rest, byte) = le_u8(input)?;

        Ok((
            rest,
            match byte {
                0 => Self::Local,
                1 => Self::Export,
                2 => Self::Extern,
                _ => return Err(Err::Error(E::from_error_kind(input, ErrorKind::Alt))),
            },
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_read() {
        let bytes: &[u8] = &[
            0x05, 0x00, 0x00, // name offset
            0x01, // section: code
            0x01, // binding: export
            0x34, 0x12, 0x00, // value
            0x00, 0x00, // reserved
        ];

        let (rest, symbol) = SymbolRecord::read::<()>(bytes).unwrap();

        assert!(rest.is_empty());
        assert_eq!(symbol.name_offset, 5);
        assert_eq!(symbol.section, Section::Code);
        assert_eq!(symbol.binding, Binding::Export);
        assert_eq!(symbol.value, 0x1234);
        assert_eq!(symbol.name, None);
    }

    #[test]
    fn test_fetch_name() {
        let strings = StringTable::new(b"ab\0main\0");
        let bytes: &[u8] = &[0x03, 0x00, 0x00, 0x01, 0x01, 0x00, 0x00, 0x00, 0x00, 0x00];
        let (_, mut symbol) = SymbolRecord::read::<()>(bytes).unwrap();

        symbol.fetch_name(&strings);

        assert_eq!(symbol.name, Some(BStr::new("main")));
    }
}
