use bstr::BStr;

use super::StringTable;
use crate::{
    combinators::{le_u24, tuple, ParseError},
    Input, Result,
};

/// An external-symbol record.
///
/// The position of a record in the externals table is the `ext_index`
/// relocations refer to; the order is fixed by the assembler.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExternalRecord<'a> {
    /// Name of the external, fetched from the string table.
    pub name: Option<&'a BStr>,
    /// Offset of the name inside the string table.
    pub name_offset: u32,
    /// Ordinal of this external in the defining tool's symbol table.
    pub symbol_index: u32,
}

impl<'a> ExternalRecord<'a> {
    /// Size of `Self` in the `EZ8O` format.
    pub const SIZE: usize = 6;

    /// Parse one external record.
    pub fn read<E>(input: Input<'a>) -> Result<'a, Self, E>
    where
        E: ParseError<Input<'a>>,
    {
        let (input, (name_offset, symbol_index)) = tuple((le_u24, le_u24))(input)?;

        Ok((input, Self { name: None, name_offset, symbol_index }))
    }

    /// Copy the name reference out of the string table.
    pub fn fetch_name(&mut self, strings: &StringTable<'a>) {
        self.name = strings.get(self.name_offset);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_read() {
        let bytes: &[u8] = &[0x07, 0x00, 0x00, 0x01, 0x00, 0x00];

        let (rest, external) = ExternalRecord::read::<()>(bytes).unwrap();

        assert!(rest.is_empty());
        assert_eq!(external.name_offset, 7);
        assert_eq!(external.symbol_index, 1);
    }
}
