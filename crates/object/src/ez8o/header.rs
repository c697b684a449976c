use crate::{
    combinators::{le_u24, le_u8, tag, tuple, Err, ErrorKind, ParseError},
    Input, Result,
};

/// The fixed-size header at the start of every object.
///
/// Sizes and counts are 24-bit fields; together with the record sizes they
/// determine the byte length of the whole object, which is what the
/// library scanner walks on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Header {
    /// Format flags. Currently always zero.
    pub flags: u8,
    /// Size of the code section in bytes.
    pub code_size: u32,
    /// Size of the data section in bytes.
    pub data_size: u32,
    /// Size of the BSS section in bytes (no bytes are stored).
    pub bss_size: u32,
    /// Number of exported-symbol records.
    pub symbol_count: u32,
    /// Number of relocation records.
    pub relocation_count: u32,
    /// Number of external records.
    pub external_count: u32,
    /// Size of the string table in bytes.
    pub string_table_size: u32,
}

impl Header {
    /// Magic number of an `EZ8O` object file.
    pub const MAGIC: &'static [u8; 4] = b"EZ8O";

    /// Current format version.
    pub const VERSION: u8 = 3;

    /// Size of `Self` in the `EZ8O` format.
    pub const SIZE: usize = 27;

    /// Parse a header, validating magic and version.
    pub fn read<'a, E>(input: Input<'a>) -> Result<'a, Self, E>
    where
        E: ParseError<Input<'a>>,
    {
        let (input, _magic) = tag(Self::MAGIC)(input)?;
        let (input, version) = le_u8(input)?;

        if version != Self::VERSION {
            return Err(Err::Error(E::from_error_kind(input, ErrorKind::Verify)));
        }

        let (
            input,
            (
                flags,
                code_size,
                data_size,
                bss_size,
                symbol_count,
                relocation_count,
                external_count,
                string_table_size,
            ),
        ) = tuple((le_u8, le_u24, le_u24, le_u24, le_u24, le_u24, le_u24, le_u24))(input)?;

        Ok((
            input,
            Self {
                flags,
                code_size,
                data_size,
                bss_size,
                symbol_count,
                relocation_count,
                external_count,
                string_table_size,
            },
        ))
    }

    /// Total byte length of the object this header describes, header
    /// included.
    pub fn object_size(&self) -> usize {
        Self::SIZE
            + self.code_size as usize
            + self.data_size as usize
            + self.symbol_count as usize * super::SymbolRecord::SIZE
            + self.relocation_count as usize * super::RelocationRecord::SIZE
            + self.external_count as usize * super::ExternalRecord::SIZE
            + self.string_table_size as usize
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Vec<u8> {
        let mut bytes = Vec::new();
        bytes.extend_from_slice(Header::MAGIC);
        bytes.push(Header::VERSION);
        bytes.push(0); // flags
        bytes.extend_from_slice(&[0x02, 0x00, 0x00]); // code
        bytes.extend_from_slice(&[0x03, 0x00, 0x00]); // data
        bytes.extend_from_slice(&[0x10, 0x00, 0x00]); // bss
        bytes.extend_from_slice(&[0x01, 0x00, 0x00]); // symbols
        bytes.extend_from_slice(&[0x00, 0x00, 0x00]); // relocations
        bytes.extend_from_slice(&[0x00, 0x00, 0x00]); // externals
        bytes.extend_from_slice(&[0x04, 0x00, 0x00]); // strings
        bytes
    }

    #[test]
    fn test_read() {
        let bytes = sample();
        let (rest, header) = Header::read::<()>(&bytes).unwrap();

        assert!(rest.is_empty());
        assert_eq!(header.code_size, 2);
        assert_eq!(header.data_size, 3);
        assert_eq!(header.bss_size, 0x10);
        assert_eq!(header.symbol_count, 1);
        assert_eq!(header.string_table_size, 4);
        assert_eq!(header.object_size(), Header::SIZE + 2 + 3 + 10 + 4);
    }

    #[test]
    fn test_rejects_bad_magic() {
        let mut bytes = sample();
        bytes[0] = b'X';

        assert!(Header::read::<()>(&bytes).is_err());
    }

    #[test]
    fn test_rejects_bad_version() {
        let mut bytes = sample();
        bytes[4] = Header::VERSION + 1;

        assert!(Header::read::<()>(&bytes).is_err());
    }
}
