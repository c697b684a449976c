//! The global symbol table.
//!
//! Keys are ASCII-lowercased byte strings: the assembler is
//! case-sensitive, but the linker matches names across objects
//! case-insensitively (legacy toolchain behavior, preserved on
//! purpose). The original spelling is kept for the map file.

use std::collections::HashMap;

use braze_object::ez8o::Section;
use bstr::{BStr, BString};

use crate::Error;

/// One global symbol.
#[derive(Debug)]
pub(crate) struct GlobalSymbol {
    /// Original spelling.
    pub name: BString,
    /// Section-relative value until layout, absolute afterwards.
    pub value: u32,
    /// Defining section.
    pub section: Section,
    /// Index of the defining object; `None` for linker-injected symbols.
    pub object: Option<usize>,
}

#[derive(Debug, Default)]
pub(crate) struct GlobalSymbols {
    symbols: Vec<GlobalSymbol>,
    index: HashMap<BString, usize>,
}

fn key(name: &[u8]) -> BString {
    let mut key = BString::from(name);
    key.make_ascii_lowercase();

    key
}

impl GlobalSymbols {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// Insert an export. Two objects exporting the same name (in any
    /// case mix) is a hard error.
    pub(crate) fn insert(
        &mut self,
        name: &BStr,
        section: Section,
        value: u32,
        object: Option<usize>,
        object_name: &str,
    ) -> Result<(), Error> {
        let key = key(name);

        if self.index.contains_key(&key) {
            return Err(Error::DuplicateSymbol {
                name: name.to_string(),
                object: object_name.to_owned(),
            });
        }

        self.index.insert(key, self.symbols.len());
        self.symbols.push(GlobalSymbol { name: BString::from(name), value, section, object });

        Ok(())
    }

    /// Case-insensitive lookup.
    pub(crate) fn lookup(&self, name: &[u8]) -> Option<&GlobalSymbol> {
        self.index.get(&key(name)).map(|&index| &self.symbols[index])
    }

    /// Whether `name` resolves.
    pub(crate) fn contains(&self, name: &[u8]) -> bool {
        self.index.contains_key(&key(name))
    }

    pub(crate) fn iter(&self) -> impl Iterator<Item = &GlobalSymbol> {
        self.symbols.iter()
    }

    pub(crate) fn iter_mut(&mut self) -> impl Iterator<Item = &mut GlobalSymbol> {
        self.symbols.iter_mut()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_case_insensitive_matching() {
        let mut globals = GlobalSymbols::new();

        globals.insert(BStr::new("PrintF"), Section::Code, 4, Some(0), "a.o").unwrap();

        assert!(globals.contains(b"printf"));
        assert!(globals.contains(b"PRINTF"));
        assert_eq!(globals.lookup(b"printf").unwrap().name, "PrintF");
    }

    #[test]
    fn test_duplicates_are_rejected_across_cases() {
        let mut globals = GlobalSymbols::new();

        globals.insert(BStr::new("main"), Section::Code, 0, Some(0), "a.o").unwrap();

        assert!(matches!(
            globals.insert(BStr::new("MAIN"), Section::Code, 0, Some(1), "b.o"),
            Err(Error::DuplicateSymbol { .. })
        ));
    }
}
