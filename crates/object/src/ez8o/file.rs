use super::{ExternalRecord, Header, RelocationRecord, StringTable, SymbolRecord};
use crate::{
    combinators::{take, ParseError},
    Input, Result,
};

/// A parsed object file, borrowing from the underlying bytes.
#[derive(Debug)]
pub struct ObjectFile<'a> {
    /// The object header.
    pub header: Header,
    /// The code section bytes.
    pub code: &'a [u8],
    /// The data section bytes.
    pub data: &'a [u8],
    /// Exported symbols.
    pub symbols: Vec<SymbolRecord<'a>>,
    /// Relocations, in emission order.
    pub relocations: Vec<RelocationRecord>,
    /// Externals, in `ext_index` order.
    pub externals: Vec<ExternalRecord<'a>>,
    /// The string table.
    pub strings: StringTable<'a>,
}

impl<'a> ObjectFile<'a> {
    /// Parse a whole object. Record names are not resolved yet, see
    /// [`Self::fetch_names`].
    pub fn read<E>(input: Input<'a>) -> Result<'a, Self, E>
    where
        E: ParseError<Input<'a>>,
    {
        let (input, header) = Header::read(input)?;
        let (input, code) = take(header.code_size as usize)(input)?;
        let (input, data) = take(header.data_size as usize)(input)?;

        let (input, symbol_region) =
            take(header.symbol_count as usize * SymbolRecord::SIZE)(input)?;
        let (input, relocation_region) =
            take(header.relocation_count as usize * RelocationRecord::SIZE)(input)?;
        let (input, external_region) =
            take(header.external_count as usize * ExternalRecord::SIZE)(input)?;
        let (input, string_region) = take(header.string_table_size as usize)(input)?;

        let mut symbols = Vec::with_capacity(header.symbol_count as usize);

        for record in symbol_region.chunks_exact(SymbolRecord::SIZE) {
            let (_, symbol) = SymbolRecord::read(record)?;
            symbols.push(symbol);
        }

        let mut relocations = Vec::with_capacity(header.relocation_count as usize);

        for record in relocation_region.chunks_exact(RelocationRecord::SIZE) {
            let (_, relocation) = RelocationRecord::read(record)?;
            relocations.push(relocation);
        }

        let mut externals = Vec::with_capacity(header.external_count as usize);

        for record in external_region.chunks_exact(ExternalRecord::SIZE) {
            let (_, external) = ExternalRecord::read(record)?;
            externals.push(external);
        }

        Ok((
            input,
            Self {
                header,
                code,
                data,
                symbols,
                relocations,
                externals,
                strings: StringTable::new(string_region),
            },
        ))
    }

    /// Fetch all symbol and external names from the string table.
    pub fn fetch_names(&mut self) {
        for symbol in &mut self.symbols {
            symbol.fetch_name(&self.strings);
        }

        for external in &mut self.externals {
            external.fetch_name(&self.strings);
        }
    }
}

#[cfg(test)]
mod tests {
    use bstr::BStr;

    use super::*;
    use crate::ez8o::{Binding, ObjectBuilder, RelocationKind, RelocationTarget, Section};

    #[test]
    fn test_round_trip() {
        let mut builder = ObjectBuilder::new();
        builder.set_code(vec![0x3e, 0x2a]);
        builder.set_data(vec![0x48, 0x69, 0x00]);
        builder.set_bss_size(0x20);
        builder.add_symbol(b"msg", Section::Data, 0);
        let printf = builder.add_external(b"_printf");
        builder.add_relocation(RelocationRecord {
            offset: 0,
            section: Section::Code,
            kind: RelocationKind::Addr24,
            target: RelocationTarget::External,
            external_index: printf,
        });

        let mut sink = std::io::Cursor::new(Vec::new());
        builder.write_to(&mut sink).unwrap();
        let bytes = sink.into_inner();

        let (rest, mut object) = ObjectFile::read::<()>(&bytes).unwrap();
        object.fetch_names();

        assert!(rest.is_empty());
        assert_eq!(object.header.object_size(), bytes.len());
        assert_eq!(object.code, &[0x3e, 0x2a]);
        assert_eq!(object.data, b"Hi\0");
        assert_eq!(object.header.bss_size, 0x20);
        assert_eq!(object.symbols.len(), 1);
        assert_eq!(object.symbols[0].name, Some(BStr::new("msg")));
        assert_eq!(object.symbols[0].binding, Binding::Export);
        assert_eq!(object.externals.len(), 1);
        assert_eq!(object.externals[0].name, Some(BStr::new("_printf")));
        assert_eq!(object.relocations.len(), 1);
        assert_eq!(object.relocations[0].target, RelocationTarget::External);
    }
}
