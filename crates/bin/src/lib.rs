//! Shared plumbing of the `braze` executables: the miette report hook
//! and the argv pre-step that `argh` needs for joined short options.

#![deny(unused)]
#![deny(warnings)]
#![deny(missing_docs)]
#![deny(clippy::all)]
#![deny(rustdoc::broken_intra_doc_links)]
#![deny(rustdoc::private_intra_doc_links)]
#![deny(rustdoc::missing_crate_level_docs)]
#![deny(rustdoc::invalid_codeblock_attributes)]
#![deny(rustdoc::invalid_rust_codeblocks)]

use miette::Result;

/// Install the report handler used by all three tools.
pub fn install_error_handler() -> Result<()> {
    #[cfg(feature = "fancy-errors")]
    miette::set_hook(Box::new(|_| {
        Box::new(
            miette::MietteHandlerOpts::new()
                .with_cause_chain()
                .width(100)
                .terminal_links(false)
                .build(),
        )
    }))?;

    Ok(())
}

/// Split the historical joined spellings `-lNAME` and `-LDIR` into the
/// two-token form `argh` understands. `--long` options and the bare
/// `-l`/`-L` pass through untouched.
pub fn split_joined_flags(arguments: impl Iterator<Item = String>) -> Vec<String> {
    let mut result = Vec::new();

    for argument in arguments {
        if argument.starts_with("--") {
            result.push(argument);
            continue;
        }

        let mut split = false;

        for flag in ["-l", "-L"] {
            if let Some(rest) = argument.strip_prefix(flag) {
                if !rest.is_empty() {
                    result.push(flag.to_owned());
                    result.push(rest.to_owned());
                    split = true;
                }

                break;
            }
        }

        if !split {
            result.push(argument);
        }
    }

    result
}

/// Parse a (possibly `0x`-prefixed) hexadecimal address.
pub fn parse_hex_address(text: &str) -> std::result::Result<u32, String> {
    let digits = text
        .strip_prefix("0x")
        .or_else(|| text.strip_prefix("0X"))
        .unwrap_or(text);

    u32::from_str_radix(digits, 16).map_err(|_| format!("`{text}` is not a hex address"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_split_joined_flags() {
        let arguments =
            ["-lc", "-l", "m", "-L/usr/lib", "--library", "x", "-o", "out", "a.o"]
                .map(String::from);

        assert_eq!(
            split_joined_flags(arguments.into_iter()),
            ["-l", "c", "-l", "m", "-L", "/usr/lib", "--library", "x", "-o", "out", "a.o"]
                .map(String::from)
        );
    }

    #[test]
    fn test_parse_hex_address() {
        assert_eq!(parse_hex_address("0x40000"), Ok(0x40000));
        assert_eq!(parse_hex_address("ff"), Ok(0xff));
        assert!(parse_hex_address("zz").is_err());
    }
}
