use std::path::PathBuf;

use crate::Linker;

/// Everything the command line decides.
#[derive(Debug)]
pub struct Configuration {
    /// Object files, in command-line order.
    pub input_files: Vec<PathBuf>,
    /// Library names given with `-l`, in command-line order.
    pub libraries: Vec<String>,
    /// Directories given with `-L`, searched for `lib<NAME>.a`.
    pub library_paths: Vec<PathBuf>,
    /// Where the image goes.
    pub output_file: PathBuf,
    /// Base address of the image.
    pub base_address: u32,
    /// Optional map-file path.
    pub map_file: Option<PathBuf>,
    /// Chatter about loaded objects on standard error.
    pub verbose: bool,
}

impl Configuration {
    /// A configuration with the conventional defaults: `a.out`, base 0.
    pub fn new(input_files: Vec<PathBuf>) -> Self {
        Self {
            input_files,
            libraries: Vec::new(),
            library_paths: Vec::new(),
            output_file: PathBuf::from("a.out"),
            base_address: 0,
            map_file: None,
            verbose: false,
        }
    }

    /// Hand the configuration to a linker.
    pub fn linker(self) -> Linker {
        Linker::with_configuration(self)
    }
}
