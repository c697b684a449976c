//! `braze-object` reads and writes `EZ8O`, the relocatable object format
//! produced by the eZ80 (ADL mode) assembler and consumed by the linker.
//!
//! An `EZ8O` object is a little-endian stream: a 27-byte header, the code
//! bytes, the data bytes, the exported-symbol records, the relocation
//! records, the external records, and a NUL-terminated string table. All
//! 24-bit fields are three bytes, least significant first.

#![deny(unused)]
#![deny(warnings)]
// #![deny(missing_docs)]
#![deny(clippy::all)]
#![deny(rustdoc::broken_intra_doc_links)]
#![deny(rustdoc::private_intra_doc_links)]
#![deny(rustdoc::missing_crate_level_docs)]
#![deny(rustdoc::invalid_codeblock_attributes)]
#![deny(rustdoc::invalid_rust_codeblocks)]

pub mod combinators;
pub mod ez8o;

/// Represent the input type of the parsers.
pub type Input<'a> = &'a [u8];

/// Represent the result returned by the parsers.
pub type Result<'a, O, E> = nom::IResult<Input<'a>, O, E>;

/// Errors used by the parsing half of the crate.
pub mod errors {
    pub use nom::Err as Error;

    /// Represent an error that can be used by a parser, which doesn't
    /// accumulate multiple errors, but stores just one.
    pub type SingleError<'a> = nom::error::Error<super::Input<'a>>;

    pub use nom::error::ErrorKind;
}
