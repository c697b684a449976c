//! Parser combinators shared by the `EZ8O` record readers.
//!
//! The format is strictly little-endian, so unlike a multi-endianness
//! reader there is no number-parser abstraction here: the 8-, 16- and
//! 24-bit readers are plain functions.

pub use nom::{
    bytes::complete::{tag, take},
    error::{ErrorKind, ParseError},
    number::complete::{le_u16, le_u8},
    sequence::tuple,
    Err,
};
use nom::{InputIter, ToUsize};

use crate::{Input, Result};

/// Like `take` but it “skips” the parsed value.
pub fn skip<'a, C, E>(count: C) -> impl Fn(Input<'a>) -> Result<'a, Input<'a>, E>
where
    C: ToUsize,
    E: ParseError<Input<'a>>,
{
    let count = count.to_usize();

    move |input: Input| match input.slice_index(count) {
        Err(_needed) => Err(Err::Error(E::from_error_kind(input, ErrorKind::Eof))),
        Ok(index) => Ok((&input[index..], &[])),
    }
}

/// Parse a little-endian 24-bit unsigned number, widened to `u32`.
pub fn le_u24<'a, E>(input: Input<'a>) -> Result<'a, u32, E>
where
    E: ParseError<Input<'a>>,
{
    let (input, bytes) = take(3usize)(input)?;

    Ok((input, u32::from(bytes[0]) | u32::from(bytes[1]) << 8 | u32::from(bytes[2]) << 16))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_skip() {
        let input: &[u8] = &[1, 2, 3, 4, 5];

        assert_eq!(skip::<_, ()>(2usize)(input), Ok((&[3, 4, 5][..], &[] as &[u8])));
    }

    #[test]
    fn test_le_u24() {
        let input: &[u8] = &[0x56, 0x34, 0x12, 0xff];

        assert_eq!(le_u24::<()>(input), Ok((&[0xff][..], 0x12_3456)));
    }

    #[test]
    fn test_le_u24_too_short() {
        let input: &[u8] = &[0x56, 0x34];

        assert!(le_u24::<()>(input).is_err());
    }
}
