use std::collections::HashMap;

use bstr::{BStr, BString, ByteSlice};

/// A read-only view of an object's string table.
///
/// Names are NUL-terminated; records refer to them by byte offset.
#[derive(Debug, Clone, Copy)]
pub struct StringTable<'a> {
    bytes: &'a [u8],
}

impl<'a> StringTable<'a> {
    /// Wrap the string-table region of an object.
    pub fn new(bytes: &'a [u8]) -> Self {
        Self { bytes }
    }

    /// The raw table bytes.
    pub fn as_bytes(&self) -> &'a [u8] {
        self.bytes
    }

    /// The name starting at `offset`, up to its NUL terminator.
    pub fn get(&self, offset: u32) -> Option<&'a BStr> {
        let offset = offset as usize;

        if offset >= self.bytes.len() {
            return None;
        }

        let rest = &self.bytes[offset..];
        let end = rest.find_byte(0)?;

        Some(BStr::new(&rest[..end]))
    }
}

/// Builds a string table, interning each distinct name once.
///
/// Offsets are assigned in append order, which keeps object output a pure
/// function of the input.
#[derive(Debug, Default)]
pub struct StringTableBuilder {
    bytes: Vec<u8>,
    offsets: HashMap<BString, u32>,
}

impl StringTableBuilder {
    /// Create an empty builder.
    pub fn new() -> Self {
        Self::default()
    }

    /// Intern `name`, returning its offset.
    pub fn intern(&mut self, name: &[u8]) -> u32 {
        if let Some(&offset) = self.offsets.get(BStr::new(name)) {
            return offset;
        }

        let offset = self.bytes.len() as u32;
        self.bytes.extend_from_slice(name);
        self.bytes.push(0);
        self.offsets.insert(BString::from(name), offset);

        offset
    }

    /// Total size of the table in bytes.
    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    /// Whether nothing has been interned yet.
    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    /// The serialized table.
    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_intern_deduplicates() {
        let mut builder = StringTableBuilder::new();

        assert_eq!(builder.intern(b"main"), 0);
        assert_eq!(builder.intern(b"_printf"), 5);
        assert_eq!(builder.intern(b"main"), 0);
        assert_eq!(builder.len(), 13);
    }

    #[test]
    fn test_round_trip() {
        let mut builder = StringTableBuilder::new();
        let a = builder.intern(b"a");
        let b = builder.intern(b"bb");

        let table = StringTable::new(builder.as_bytes());

        assert_eq!(table.get(a), Some(BStr::new("a")));
        assert_eq!(table.get(b), Some(BStr::new("bb")));
        assert_eq!(table.get(100), None);
    }
}
