use std::io::{self, Seek, SeekFrom, Write};

use super::{Binding, Header, RelocationRecord, Section, StringTableBuilder};

/// Serializes an object file.
///
/// The header is written twice: a zeroed placeholder first, then the sink
/// is rewound and the placeholder is filled with the final sizes, so the
/// body can be streamed without pre-computing its length.
#[derive(Debug, Default)]
pub struct ObjectBuilder {
    flags: u8,
    code: Vec<u8>,
    data: Vec<u8>,
    bss_size: u32,
    symbols: Vec<OwnedSymbol>,
    relocations: Vec<RelocationRecord>,
    externals: Vec<OwnedExternal>,
    strings: StringTableBuilder,
}

#[derive(Debug)]
struct OwnedSymbol {
    name_offset: u32,
    section: Section,
    value: u32,
}

#[derive(Debug)]
struct OwnedExternal {
    name_offset: u32,
    symbol_index: u32,
}

impl ObjectBuilder {
    /// Create an empty builder.
    pub fn new() -> Self {
        Self::default()
    }

    /// Install the code section byte stream.
    pub fn set_code(&mut self, code: Vec<u8>) {
        self.code = code;
    }

    /// Install the data section byte stream.
    pub fn set_data(&mut self, data: Vec<u8>) {
        self.data = data;
    }

    /// Record the BSS size. No bytes are stored for BSS.
    pub fn set_bss_size(&mut self, size: u32) {
        self.bss_size = size & 0xff_ffff;
    }

    /// Append an exported symbol.
    pub fn add_symbol(&mut self, name: &[u8], section: Section, value: u32) {
        let name_offset = self.strings.intern(name);
        self.symbols.push(OwnedSymbol { name_offset, section, value: value & 0xff_ffff });
    }

    /// Append an external name, returning the `ext_index` relocations must
    /// use for it.
    pub fn add_external(&mut self, name: &[u8]) -> u16 {
        let index = self.externals.len() as u16;
        let name_offset = self.strings.intern(name);
        let symbol_index = u32::from(index);
        self.externals.push(OwnedExternal { name_offset, symbol_index });

        index
    }

    /// Append a relocation record.
    pub fn add_relocation(&mut self, relocation: RelocationRecord) {
        self.relocations.push(relocation);
    }

    /// Number of externals appended so far.
    pub fn external_count(&self) -> usize {
        self.externals.len()
    }

    /// Serialize the object in format order.
    pub fn write_to<W>(&self, sink: &mut W) -> io::Result<()>
    where
        W: Write + Seek,
    {
        let start = sink.stream_position()?;

        // Placeholder header.
        sink.write_all(&[0; Header::SIZE])?;

        sink.write_all(&self.code)?;
        sink.write_all(&self.data)?;

        for symbol in &self.symbols {
            write_u24(sink, symbol.name_offset)?;
            sink.write_all(&[symbol.section as u8, Binding::Export as u8])?;
            write_u24(sink, symbol.value)?;
            sink.write_all(&[0, 0])?;
        }

        for relocation in &self.relocations {
            write_u24(sink, relocation.offset)?;
            sink.write_all(&[
                relocation.section as u8,
                relocation.kind as u8,
                relocation.target as u8,
            ])?;
            sink.write_all(&relocation.external_index.to_le_bytes())?;
        }

        for external in &self.externals {
            write_u24(sink, external.name_offset)?;
            write_u24(sink, external.symbol_index)?;
        }

        sink.write_all(self.strings.as_bytes())?;

        // Rewind and fill the header in.
        let end = sink.stream_position()?;
        sink.seek(SeekFrom::Start(start))?;

        sink.write_all(Header::MAGIC)?;
        sink.write_all(&[Header::VERSION, self.flags])?;
        write_u24(sink, self.code.len() as u32)?;
        write_u24(sink, self.data.len() as u32)?;
        write_u24(sink, self.bss_size)?;
        write_u24(sink, self.symbols.len() as u32)?;
        write_u24(sink, self.relocations.len() as u32)?;
        write_u24(sink, self.externals.len() as u32)?;
        write_u24(sink, self.strings.len() as u32)?;

        sink.seek(SeekFrom::Start(end))?;

        Ok(())
    }
}

fn write_u24<W>(sink: &mut W, value: u32) -> io::Result<()>
where
    W: Write,
{
    let value = value & 0xff_ffff;

    sink.write_all(&[value as u8, (value >> 8) as u8, (value >> 16) as u8])
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ez8o::{ExternalRecord, RelocationKind, RelocationTarget, SymbolRecord};

    #[test]
    fn test_empty_object() {
        let builder = ObjectBuilder::new();
        let mut sink = std::io::Cursor::new(Vec::new());

        builder.write_to(&mut sink).unwrap();
        let bytes = sink.into_inner();

        assert_eq!(bytes.len(), Header::SIZE);
        assert_eq!(&bytes[..4], Header::MAGIC);
        assert_eq!(bytes[4], Header::VERSION);
    }

    #[test]
    fn test_record_sizes() {
        let mut builder = ObjectBuilder::new();
        builder.add_symbol(b"a", Section::Code, 1);
        let index = builder.add_external(b"b");
        builder.add_relocation(RelocationRecord {
            offset: 0,
            section: Section::Code,
            kind: RelocationKind::Addr24,
            target: RelocationTarget::External,
            external_index: index,
        });

        let mut sink = std::io::Cursor::new(Vec::new());
        builder.write_to(&mut sink).unwrap();
        let bytes = sink.into_inner();

        // "a\0" + "b\0" in the string table.
        assert_eq!(
            bytes.len(),
            Header::SIZE + SymbolRecord::SIZE + RelocationRecord::SIZE + ExternalRecord::SIZE + 4
        );
    }

    #[test]
    fn test_deterministic() {
        let build = || {
            let mut builder = ObjectBuilder::new();
            builder.set_code(vec![1, 2, 3]);
            builder.add_symbol(b"start", Section::Code, 0);
            let mut sink = std::io::Cursor::new(Vec::new());
            builder.write_to(&mut sink).unwrap();
            sink.into_inner()
        };

        assert_eq!(build(), build());
    }
}
