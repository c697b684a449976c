//! `braze-file` is a thin crate to read files.
//!
//! The toolchain reads whole inputs (sources, objects, libraries) and
//! never writes through this crate. Two readers exist: a plain
//! [`fs`]-based one and an `mmap(2)`-based one; the `auto` feature picks
//! the memory map.

#![deny(unused)]
#![deny(warnings)]
#![deny(missing_docs)]
#![deny(clippy::all)]
#![deny(rustdoc::broken_intra_doc_links)]
#![deny(rustdoc::private_intra_doc_links)]
#![deny(rustdoc::missing_crate_level_docs)]
#![deny(rustdoc::invalid_codeblock_attributes)]
#![deny(rustdoc::invalid_rust_codeblocks)]

use std::{io::Result, ops::Deref, path::Path};

pub mod fs;
#[cfg(feature = "mmap")]
pub mod mmap;

/// Define what a file reader should look like.
pub trait FileReader: Sized {
    /// The reader outputs bytes that implement `Deref<Target = [u8]>`.
    type Bytes: Deref<Target = [u8]>;

    /// Open a file.
    fn open<P>(path: P) -> Result<Self>
    where
        P: AsRef<Path>;

    /// Read the entire file content.
    fn read_as_bytes(self) -> Result<Self::Bytes>;
}

/// File picker.
///
/// This type opens a file path based on the file reader selected by a
/// Cargo feature (`mmap` when available, [`fs::File`] otherwise).
pub struct Picker;

impl Picker {
    /// Open a file by using [`mmap::Mmap`].
    #[cfg(feature = "mmap")]
    pub fn open<P>(path: P) -> Result<mmap::Mmap>
    where
        P: AsRef<Path>,
    {
        mmap::Mmap::open(path)
    }

    /// Open a file by using [`fs::File`].
    #[cfg(not(feature = "mmap"))]
    pub fn open<P>(path: P) -> Result<fs::File>
    where
        P: AsRef<Path>,
    {
        fs::File::open(path)
    }
}

/// Read a whole file through the picked reader.
pub fn read<P>(path: P) -> Result<impl Deref<Target = [u8]>>
where
    P: AsRef<Path>,
{
    Picker::open(path)?.read_as_bytes()
}
