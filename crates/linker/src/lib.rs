//! `braze-linker` combines `EZ8O` relocatable objects and library
//! archives into a flat binary image with a fixed base address.
//!
//! Linking runs in four phases: load the named objects, pull library
//! members in until the undefined-externals set stops moving, lay the
//! sections out (all code, then all data, then all BSS), and stream each
//! object once to patch its 24-bit relocations into the image.

#![deny(unused)]
#![deny(warnings)]
#![deny(missing_docs)]
#![deny(clippy::all)]
#![deny(rustdoc::broken_intra_doc_links)]
#![deny(rustdoc::private_intra_doc_links)]
#![deny(rustdoc::missing_crate_level_docs)]
#![deny(rustdoc::invalid_codeblock_attributes)]
#![deny(rustdoc::invalid_rust_codeblocks)]

mod configuration;
mod linker;
mod loader;
mod map;
mod relocate;
mod symbols;

pub use configuration::Configuration;
pub use linker::{Error, Linker};
