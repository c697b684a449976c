//! `braze-ld` is the linker executable: EZ8O objects and libraries in,
//! a flat binary image out.

use std::{env, path::PathBuf, process};

use argh::FromArgs;
use braze_errors::Result;
use braze_linker::Configuration;

fn default_output_file() -> PathBuf {
    PathBuf::from("a.out")
}

/// The `braze-ld` command combines EZ8O object files and libraries,
/// resolves symbols, and produces a flat binary image.
#[derive(Debug, FromArgs)]
struct BrazeLd {
    /// specify the name and location of the output file. If not
    /// specified, `a.out` is used.
    #[argh(option, short = 'o', default = "default_output_file()")]
    output: PathBuf,

    /// base address of the image, in hexadecimal (default 0).
    #[argh(option, short = 'b', default = "0", from_str_fn(braze_bin::parse_hex_address))]
    base: u32,

    /// write a map file (memory layout, objects, symbols) here.
    #[argh(option, short = 'm')]
    map: Option<PathBuf>,

    /// add a directory to the library search path. May be repeated.
    #[argh(option, short = 'L', long = "library-path")]
    library_path: Vec<PathBuf>,

    /// link against `lib<NAME>.a`. May be repeated, joined (`-lc`) or
    /// separated (`-l c`).
    #[argh(option, short = 'l', long = "library")]
    library: Vec<String>,

    /// chatter about loaded objects and the written image.
    #[argh(switch, short = 'v')]
    verbose: bool,

    /// input object files, in link order.
    #[argh(positional)]
    objects: Vec<PathBuf>,
}

impl BrazeLd {
    /// Build `Self` from `argv`, accepting the joined `-lNAME`/`-LDIR`
    /// spellings.
    fn new() -> Self {
        let mut arguments = env::args();
        let command = arguments
            .next()
            .map(|name| {
                PathBuf::from(name)
                    .file_name()
                    .map(|file_name| file_name.to_string_lossy().into_owned())
                    .unwrap_or_else(|| "braze-ld".to_owned())
            })
            .unwrap_or_else(|| "braze-ld".to_owned());

        let arguments = braze_bin::split_joined_flags(arguments);
        let arguments: Vec<&str> = arguments.iter().map(String::as_str).collect();

        match BrazeLd::from_args(&[&command], &arguments) {
            Ok(parsed) => parsed,
            Err(early_exit) => {
                // `--help` exits successfully with the usage text; a
                // parse failure exits with it on stderr.
                match early_exit.status {
                    Ok(()) => {
                        println!("{}", early_exit.output);
                        process::exit(0);
                    }
                    Err(()) => {
                        eprintln!("{}", early_exit.output.trim());
                        process::exit(1);
                    }
                }
            }
        }
    }
}

fn main() -> Result<()> {
    braze_bin::install_error_handler()?;

    let arguments = BrazeLd::new();

    let mut configuration = Configuration::new(arguments.objects);
    configuration.libraries = arguments.library;
    configuration.library_paths = arguments.library_path;
    configuration.output_file = arguments.output;
    configuration.base_address = arguments.base;
    configuration.map_file = arguments.map;
    configuration.verbose = arguments.verbose;

    // Take a deep breath, and here we are!
    configuration.linker().link()?;

    Ok(())
}
