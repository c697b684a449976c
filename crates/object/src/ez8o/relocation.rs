use super::Section;
use crate::{
    combinators::{le_u16, le_u24, le_u8, tuple, Err, ErrorKind, ParseError},
    Input, Result,
};

/// A relocation record.
///
/// Tells the linker to add an absolute address into the 24-bit
/// little-endian field at `offset` within `section`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RelocationRecord {
    /// Patch-site offset within the source section's byte stream.
    pub offset: u32,
    /// The section the patch site lives in.
    pub section: Section,
    /// Kind of patch to apply.
    pub kind: RelocationKind,
    /// What the field refers to.
    pub target: RelocationTarget,
    /// Index into the externals table, meaningful only when `target` is
    /// [`RelocationTarget::External`].
    pub external_index: u16,
}

impl RelocationRecord {
    /// Size of `Self` in the `EZ8O` format.
    pub const SIZE: usize = 8;

    /// Parse one relocation record.
    pub fn read<'a, E>(input: Input<'a>) -> Result<'a, Self, E>
    where
        E: ParseError<Input<'a>>,
    {
        let (input, (offset, section, kind, target, external_index)) = tuple((
            le_u24,
            Section::read,
            RelocationKind::read,
            RelocationTarget::read,
            le_u16,
        ))(input)?;

        Ok((input, Self { offset, section, kind, target, external_index }))
    }
}

/// Kind of a relocation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum RelocationKind {
    /// Add an absolute address into a 24-bit field.
    Addr24 = 1,
}

impl RelocationKind {
    /// Parse a relocation-kind byte.
    pub fn read<'a, E>(input: Input<'a>) -> Result<'a, Self, E>
    where
        E: ParseError<Input<'a>>,
    {
        let (rest, byte) = le_u8(input)?;

        match byte {
            1 => Ok((rest, Self::Addr24)),
            _ => Err(Err::Error(E::from_error_kind(input, ErrorKind::Alt))),
        }
    }
}

/// What a relocated field refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum RelocationTarget {
    /// An external symbol, named via the externals table.
    External = 0,
    /// The code section of the defining object.
    Code = 1,
    /// The data section of the defining object.
    Data = 2,
    /// The BSS section of the defining object.
    Bss = 3,
}

impl RelocationTarget {
    /// Parse a relocation-target byte.
    pub fn read<'a, E>(input: Input<'a>) -> Result<'a, Self, E>
    where
        E: ParseError<Input<'a>>,
    {
        let (rest, byte) = le_u8(input)?;

        Ok((
            rest,
            match byte {
                0 => Self::External,
                1 => Self::Code,
                2 => Self::Data,
                3 => Self::Bss,
                _ => return Err(Err::Error(E::from_error_kind(input, ErrorKind::Alt))),
            },
        ))
    }

    /// The section this target names, if it is not external.
    pub fn section(self) -> Option<Section> {
        match self {
            Self::External => None,
            Self::Code => Some(Section::Code),
            Self::Data => Some(Section::Data),
            Self::Bss => Some(Section::Bss),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_read() {
        let bytes: &[u8] = &[
            0x08, 0x00, 0x00, // offset
            0x01, // section: code
            0x01, // kind: addr24
            0x00, // target: external
            0x02, 0x00, // external index
        ];

        let (rest, relocation) = RelocationRecord::read::<()>(bytes).unwrap();

        assert!(rest.is_empty());
        assert_eq!(relocation.offset, 8);
        assert_eq!(relocation.section, Section::Code);
        assert_eq!(relocation.kind, RelocationKind::Addr24);
        assert_eq!(relocation.target, RelocationTarget::External);
        assert_eq!(relocation.external_index, 2);
    }

    #[test]
    fn test_rejects_unknown_kind() {
        let bytes: &[u8] = &[0x00, 0x00, 0x00, 0x01, 0x07, 0x00, 0x00, 0x00];

        assert!(RelocationRecord::read::<()>(bytes).is_err());
    }
}
