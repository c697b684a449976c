//! The two-pass driver.
//!
//! One `Assembler` value owns all shared state: the symbol table, the
//! section streams, the location counters and the diagnostics. Pass 1
//! sizes the sections and collects symbols, pass 2 replays the same
//! lines to emit bytes and relocations; the object writer consumes the
//! result.

use std::{
    io::{self, Cursor},
    path::Path,
};

use braze_errors::{Reporter, Severity};
use braze_object::ez8o::{Binding, ObjectBuilder, RelocationRecord, Section};

use crate::{
    emitter::SectionState,
    encoder::{self, expect_eol},
    error::AsmError,
    lexer::{Lexer, Token, MAX_LINE},
    symtab::SymbolTable,
};

/// Which of the two passes is running.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Pass {
    First,
    Second,
}

/// The assembler context, threaded through every operation.
pub struct Assembler {
    pub(crate) symbols: SymbolTable,
    pub(crate) code: SectionState,
    pub(crate) data: SectionState,
    pub(crate) bss: SectionState,
    pub(crate) current: Section,
    pub(crate) pass: Pass,
    pub(crate) relocations: Vec<RelocationRecord>,
    pub(crate) include_depth: usize,
    pub(crate) stop_file: bool,
    reporter: Reporter,
    pass1_sizes: [u32; 3],
    file: String,
    line: u32,
    verbose: bool,
}

impl Assembler {
    /// Create a fresh assembler.
    pub fn new(verbose: bool) -> Self {
        Self {
            symbols: SymbolTable::new(),
            code: SectionState::default(),
            data: SectionState::default(),
            bss: SectionState::default(),
            current: Section::Code,
            pass: Pass::First,
            relocations: Vec::new(),
            include_depth: 0,
            stop_file: false,
            reporter: Reporter::new(),
            pass1_sizes: [0; 3],
            file: String::new(),
            line: 0,
            verbose,
        }
    }

    /// Assemble one source file, both passes.
    pub fn assemble_file(&mut self, path: &Path) -> Result<(), AsmError> {
        let bytes = braze_file::read(path).map_err(|source| AsmError::CannotOpen {
            path: path.display().to_string(),
            source,
        })?;
        let text = String::from_utf8_lossy(&bytes).into_owned();
        drop(bytes);

        self.assemble_source(&path.display().to_string(), &text);

        Ok(())
    }

    /// Assemble in-memory source, both passes.
    pub fn assemble_source(&mut self, name: &str, text: &str) {
        self.begin_pass(Pass::First);
        self.process_source(name, text);
        self.pass1_sizes = [self.code.offset, self.data.offset, self.bss.offset];

        self.begin_pass(Pass::Second);
        self.process_source(name, text);
        self.finish();
    }

    fn begin_pass(&mut self, pass: Pass) {
        self.pass = pass;
        self.code.reset();
        self.data.reset();
        self.bss.reset();
        self.current = Section::Code;
        self.symbols.rewind_scope();
        self.relocations.clear();
        self.stop_file = false;
    }

    /// Run the current pass over one source text. `include` re-enters
    /// here with the included file.
    pub(crate) fn process_source(&mut self, file: &str, text: &str) {
        let saved_file = std::mem::replace(&mut self.file, file.to_owned());
        let saved_line = self.line;

        for (index, line) in text.lines().enumerate() {
            self.line = index as u32 + 1;

            if line.len() > MAX_LINE {
                self.report(AsmError::LineTooLong);
                continue;
            }

            let mut lexer = Lexer::new(line);

            if let Err(error) = self.process_line(&mut lexer) {
                self.report(error);
            }

            if self.stop_file {
                break;
            }
        }

        self.stop_file = false;
        self.file = saved_file;
        self.line = saved_line;
    }

    fn process_line(&mut self, lexer: &mut Lexer) -> Result<(), AsmError> {
        match lexer.next_token()? {
            Token::Eol => Ok(()),
            Token::Label(name) => {
                if self.equ_follows(lexer)? {
                    return self.define_equ(&name, lexer);
                }

                self.define_label(&name)?;
                self.statement_or_end(lexer)
            }
            Token::Ident(name) => {
                if self.equ_follows(lexer)? {
                    return self.define_equ(&name, lexer);
                }

                self.statement(&name, lexer)
            }
            _ => Err(AsmError::SyntaxError),
        }
    }

    /// Whether the next token spells a symbol definition: `=` or `equ`.
    fn equ_follows(&mut self, lexer: &mut Lexer) -> Result<bool, AsmError> {
        match lexer.peek()? {
            Token::Equals => {
                lexer.next_token()?;

                Ok(true)
            }
            Token::Ident(word)
                if word.eq_ignore_ascii_case("equ") || word.eq_ignore_ascii_case(".equ") =>
            {
                lexer.next_token()?;

                Ok(true)
            }
            _ => Ok(false),
        }
    }

    /// `label equ expr` and its spellings: an absolute constant.
    fn define_equ(&mut self, name: &str, lexer: &mut Lexer) -> Result<(), AsmError> {
        let expr = self.eval_expr(lexer)?;
        expect_eol(lexer)?;

        // Pass 1 can see a spurious relocation through a forward
        // reference; pass 2 is authoritative.
        if expr.is_relocatable() && self.pass == Pass::Second {
            return Err(AsmError::Relocatable("equ"));
        }

        self.symbols.define(name, expr.value(), Section::Absolute, self.pass)?;

        Ok(())
    }

    /// Define a label at the current location counter. A non-local label
    /// opens a fresh local scope after being defined.
    fn define_label(&mut self, name: &str) -> Result<(), AsmError> {
        let value = self.pc();
        let section = self.current;

        self.symbols.define(name, value, section, self.pass)?;

        if !name.starts_with('@') {
            self.symbols.open_scope();
        }

        Ok(())
    }

    fn statement_or_end(&mut self, lexer: &mut Lexer) -> Result<(), AsmError> {
        match lexer.next_token()? {
            Token::Eol => Ok(()),
            Token::Ident(name) => self.statement(&name, lexer),
            _ => Err(AsmError::SyntaxError),
        }
    }

    /// A directive or an instruction.
    fn statement(&mut self, name: &str, lexer: &mut Lexer) -> Result<(), AsmError> {
        let lower = name.to_ascii_lowercase();
        let bare = lower.strip_prefix('.').unwrap_or(&lower);

        if self.directive(bare, lexer)? {
            return expect_eol(lexer);
        }

        encoder::encode(self, &lower, lexer)
    }

    /// Report a recoverable error against the current line.
    ///
    /// Both passes replay the same lines, so printing in both would
    /// double every message: pass 2 prints everything, and conditions
    /// only pass 1 can detect print immediately.
    pub(crate) fn report(&mut self, error: AsmError) {
        let pass1_only = matches!(&error, AsmError::DuplicateDefinition(_));

        if self.pass == Pass::Second || pass1_only {
            self.reporter.diagnose(Severity::Error, &self.file, self.line, &error);
        }
    }

    /// Report a warning against the current line (pass 2 prints).
    pub(crate) fn warn(&mut self, message: impl std::fmt::Display) {
        if self.pass == Pass::Second {
            self.reporter.diagnose(Severity::Warning, &self.file, self.line, message);
        }
    }

    /// End-of-run bookkeeping: section-size stability and undefined
    /// exports.
    fn finish(&mut self) {
        // A line abandoned in only one of the passes already produced a
        // diagnostic; the size check is for silent drift.
        if !self.reporter.has_errors()
            && [self.code.offset, self.data.offset, self.bss.offset] != self.pass1_sizes
        {
            self.report(AsmError::PhaseError);
        }

        let undefined: Vec<String> = self
            .symbols
            .iter()
            .filter(|symbol| symbol.binding == Binding::Export && !symbol.defined)
            .map(|symbol| symbol.name.clone())
            .collect();

        for name in undefined {
            self.report(AsmError::ExportUndefined(name));
        }

        if self.verbose {
            eprintln!(
                "code {} bytes, data {} bytes, bss {} bytes, {} relocation(s), {} external(s)",
                self.code.offset,
                self.data.offset,
                self.bss.offset,
                self.relocations.len(),
                self.symbols.externals().count(),
            );
        }
    }

    /// Number of errors reported.
    pub fn error_count(&self) -> usize {
        self.reporter.error_count()
    }

    /// Number of warnings reported.
    pub fn warning_count(&self) -> usize {
        self.reporter.warning_count()
    }

    /// Whether any error was reported.
    pub fn has_errors(&self) -> bool {
        self.reporter.has_errors()
    }

    /// The assembled code stream.
    pub fn code_bytes(&self) -> &[u8] {
        &self.code.stream
    }

    /// The assembled data stream.
    pub fn data_bytes(&self) -> &[u8] {
        &self.data.stream
    }

    /// The reserved BSS size.
    pub fn bss_size(&self) -> u32 {
        self.bss.offset
    }

    /// The recorded relocations.
    pub fn relocation_records(&self) -> &[RelocationRecord] {
        &self.relocations
    }

    /// The symbol table.
    pub fn symbol_table(&self) -> &SymbolTable {
        &self.symbols
    }

    /// Pack the run into an object builder.
    pub fn build_object(&self) -> ObjectBuilder {
        let mut builder = ObjectBuilder::new();

        builder.set_code(self.code.stream.clone());
        builder.set_data(self.data.stream.clone());
        builder.set_bss_size(self.bss.offset);

        for symbol in self.symbols.iter() {
            if symbol.binding == Binding::Export && symbol.defined {
                builder.add_symbol(
                    symbol.name.as_bytes(),
                    symbol.section,
                    (symbol.value & 0xff_ffff) as u32,
                );
            }
        }

        for external in self.symbols.externals() {
            builder.add_external(external.name.as_bytes());
        }

        for &relocation in &self.relocations {
            builder.add_relocation(relocation);
        }

        builder
    }

    /// Serialize the object.
    pub fn write_object<W>(&self, sink: &mut W) -> io::Result<()>
    where
        W: io::Write + io::Seek,
    {
        self.build_object().write_to(sink)
    }

    /// The object as an in-memory byte vector.
    pub fn object_bytes(&self) -> io::Result<Vec<u8>> {
        let mut sink = Cursor::new(Vec::new());
        self.write_object(&mut sink)?;

        Ok(sink.into_inner())
    }
}

#[cfg(test)]
mod tests {
    //! End-to-end checks: source text in, exact bytes out.

    use braze_object::ez8o::{ObjectFile, RelocationTarget};

    use super::*;

    fn assemble(source: &str) -> Assembler {
        let mut assembler = Assembler::new(false);
        assembler.assemble_source("test.asm", source);

        assert_eq!(assembler.error_count(), 0, "unexpected diagnostics for:\n{source}");

        assembler
    }

    fn code(source: &str) -> Vec<u8> {
        assemble(source).code_bytes().to_vec()
    }

    fn errors(source: &str) -> usize {
        let mut assembler = Assembler::new(false);
        assembler.assemble_source("test.asm", source);

        assembler.error_count()
    }

    #[test]
    fn hello_opcode() {
        let assembler = assemble("assume adl=1\nld a, 42\n");

        assert_eq!(assembler.code_bytes(), &[0x3e, 0x2a]);
        assert!(assembler.relocation_records().is_empty());
    }

    #[test]
    fn immediate_24_bit() {
        assert_eq!(code("assume adl=1\nld hl, 0x123456\n"), vec![0x21, 0x56, 0x34, 0x12]);
    }

    #[test]
    fn data_defaults_to_current_section() {
        let assembler = assemble("assume adl=1\nxdef msg\nmsg: db \"Hi\", 0\nend\n");

        // `db` emits into the current section, code by default.
        assert_eq!(assembler.code_bytes(), b"Hi\0");
        assert!(assembler.data_bytes().is_empty());

        let bytes = assembler.object_bytes().unwrap();
        let (_, mut object) = ObjectFile::read::<()>(&bytes).unwrap();
        object.fetch_names();

        assert_eq!(object.symbols.len(), 1);
        assert_eq!(object.symbols[0].name.unwrap(), "msg");
        assert_eq!(object.symbols[0].section, Section::Code);
        assert_eq!(object.symbols[0].value, 0);
    }

    #[test]
    fn data_goes_to_the_data_section_when_selected() {
        let assembler = assemble("section data\nmsg: db \"Hi\", 0\n");

        assert!(assembler.code_bytes().is_empty());
        assert_eq!(assembler.data_bytes(), b"Hi\0");
    }

    #[test]
    fn forward_jr() {
        assert_eq!(
            code("assume adl=1\n jr later\n nop\nlater: nop\n"),
            vec![0x18, 0x01, 0x00, 0x00]
        );
    }

    #[test]
    fn backward_jr_on_dollar() {
        assert_eq!(code("jr c, $\n"), vec![0x38, 0xfe]);
    }

    #[test]
    fn jr_out_of_range_is_rejected() {
        assert_eq!(errors("x: nop\n ds 200\n djnz x\n"), 1);
    }

    #[test]
    fn jr_to_external_is_rejected() {
        assert_eq!(errors("xref far\n jr far\n"), 1);
    }

    #[test]
    fn pair_loads_via_hl() {
        let rows =
            [("bc", 0x07, 0x0f), ("de", 0x17, 0x1f), ("hl", 0x27, 0x2f), ("ix", 0x37, 0x3f), ("iy", 0x31, 0x3e)];

        for (name, load, store) in rows {
            assert_eq!(code(&format!("ld {name}, (hl)\n")), vec![0xed, load], "ld {name}, (hl)");
            assert_eq!(code(&format!("ld (hl), {name}\n")), vec![0xed, store], "ld (hl), {name}");
        }
    }

    #[test]
    fn pair_loads_via_ix() {
        let rows =
            [("bc", 0x07, 0x0f), ("de", 0x17, 0x1f), ("hl", 0x27, 0x2f), ("ix", 0x37, 0x3e), ("iy", 0x31, 0x3d)];

        for (name, load, store) in rows {
            assert_eq!(
                code(&format!("ld {name}, (ix+0)\n")),
                vec![0xdd, load, 0x00],
                "ld {name}, (ix+0)"
            );
            assert_eq!(
                code(&format!("ld (ix+0), {name}\n")),
                vec![0xdd, store, 0x00],
                "ld (ix+0), {name}"
            );
        }
    }

    #[test]
    fn pair_loads_via_iy() {
        let rows =
            [("bc", 0x07, 0x0f), ("de", 0x17, 0x1f), ("hl", 0x27, 0x2f), ("ix", 0x31, 0x3d), ("iy", 0x37, 0x3e)];

        for (name, load, store) in rows {
            assert_eq!(
                code(&format!("ld {name}, (iy+0)\n")),
                vec![0xfd, load, 0x00],
                "ld {name}, (iy+0)"
            );
            assert_eq!(
                code(&format!("ld (iy+0), {name}\n")),
                vec![0xfd, store, 0x00],
                "ld (iy+0), {name}"
            );
        }
    }

    #[test]
    fn eight_bit_loads() {
        assert_eq!(code("ld b, c\n"), vec![0x41]);
        assert_eq!(code("ld a, (hl)\n"), vec![0x7e]);
        assert_eq!(code("ld (hl), e\n"), vec![0x73]);
        assert_eq!(code("ld (hl), 7\n"), vec![0x36, 0x07]);
        assert_eq!(code("ld d, (ix+5)\n"), vec![0xdd, 0x56, 0x05]);
        assert_eq!(code("ld (iy-1), a\n"), vec![0xfd, 0x77, 0xff]);
        assert_eq!(code("ld (ix+2), 9\n"), vec![0xdd, 0x36, 0x02, 0x09]);
        assert_eq!(code("ld ixh, 3\n"), vec![0xdd, 0x26, 0x03]);
        assert_eq!(code("ld a, iyl\n"), vec![0xfd, 0x7d]);
        assert_eq!(code("ld a, (bc)\n"), vec![0x0a]);
        assert_eq!(code("ld (de), a\n"), vec![0x12]);
    }

    #[test]
    fn special_ld_pairs() {
        assert_eq!(code("ld sp, hl\n"), vec![0xf9]);
        assert_eq!(code("ld sp, ix\n"), vec![0xdd, 0xf9]);
        assert_eq!(code("ld i, a\n"), vec![0xed, 0x47]);
        assert_eq!(code("ld a, r\n"), vec![0xed, 0x5f]);
        assert_eq!(code("ld mb, a\n"), vec![0xed, 0x6d]);
        assert_eq!(code("ld a, mb\n"), vec![0xed, 0x6e]);
    }

    #[test]
    fn wide_absolute_loads() {
        assert_eq!(code("ld hl, (0x1234)\n"), vec![0x2a, 0x34, 0x12, 0x00]);
        assert_eq!(code("ld bc, (2)\n"), vec![0xed, 0x4b, 0x02, 0x00, 0x00]);
        assert_eq!(code("ld (2), sp\n"), vec![0xed, 0x73, 0x02, 0x00, 0x00]);
        assert_eq!(code("ld (0x40), iy\n"), vec![0xfd, 0x22, 0x40, 0x00, 0x00]);
        assert_eq!(code("ld a, (0x99)\n"), vec![0x3a, 0x99, 0x00, 0x00]);
        assert_eq!(code("ld (0x99), a\n"), vec![0x32, 0x99, 0x00, 0x00]);
    }

    #[test]
    fn index_half_conflicts_are_rejected() {
        assert_eq!(errors("ld ixh, iyl\n"), 1);
        assert_eq!(errors("ld h, ixl\n"), 1);
        assert_eq!(errors("add a, ixh\n"), 0);
    }

    #[test]
    fn alu_group() {
        assert_eq!(code("add a, b\n"), vec![0x80]);
        assert_eq!(code("or a\n"), vec![0xb7]);
        assert_eq!(code("xor a, 0x55\n"), vec![0xee, 0x55]);
        assert_eq!(code("cp (hl)\n"), vec![0xbe]);
        assert_eq!(code("sub (ix+1)\n"), vec![0xdd, 0x96, 0x01]);
        assert_eq!(code("and iyh\n"), vec![0xfd, 0xa4]);
        assert_eq!(code("add hl, bc\n"), vec![0x09]);
        assert_eq!(code("adc hl, de\n"), vec![0xed, 0x5a]);
        assert_eq!(code("sbc hl, sp\n"), vec![0xed, 0x72]);
        assert_eq!(code("add ix, ix\n"), vec![0xdd, 0x29]);
        assert_eq!(code("add iy, sp\n"), vec![0xfd, 0x39]);
        assert_eq!(errors("add ix, hl\n"), 1);
    }

    #[test]
    fn short_mode_suffix() {
        assert_eq!(code("add.s a, b\n"), vec![0x40, 0x80]);
        assert_eq!(code("sbc.s hl, de\n"), vec![0x40, 0xed, 0x52]);
        assert_eq!(errors("or.s a\n"), 1);
    }

    #[test]
    fn inc_dec_group() {
        assert_eq!(code("inc a\n"), vec![0x3c]);
        assert_eq!(code("dec (hl)\n"), vec![0x35]);
        assert_eq!(code("inc (ix+3)\n"), vec![0xdd, 0x34, 0x03]);
        assert_eq!(code("inc bc\n"), vec![0x03]);
        assert_eq!(code("dec sp\n"), vec![0x3b]);
        assert_eq!(code("inc ix\n"), vec![0xdd, 0x23]);
        assert_eq!(code("dec iy\n"), vec![0xfd, 0x2b]);
        assert_eq!(code("inc ixl\n"), vec![0xdd, 0x2c]);
    }

    #[test]
    fn bit_and_shift_group() {
        assert_eq!(code("bit 7, (hl)\n"), vec![0xcb, 0x7e]);
        assert_eq!(code("set 0, a\n"), vec![0xcb, 0xc7]);
        assert_eq!(code("res 1, (ix+2)\n"), vec![0xdd, 0xcb, 0x02, 0x8e]);
        assert_eq!(code("srl b\n"), vec![0xcb, 0x38]);
        assert_eq!(code("rlc (iy-1)\n"), vec![0xfd, 0xcb, 0xff, 0x06]);
        assert_eq!(code("sla (hl)\n"), vec![0xcb, 0x26]);
        assert_eq!(errors("bit 8, a\n"), 1);
    }

    #[test]
    fn jumps_and_calls() {
        assert_eq!(code("jp 0x123456\n"), vec![0xc3, 0x56, 0x34, 0x12]);
        assert_eq!(code("jp nz, 0\n"), vec![0xc2, 0x00, 0x00, 0x00]);
        assert_eq!(code("jp m, 1\n"), vec![0xfa, 0x01, 0x00, 0x00]);
        assert_eq!(code("jp (hl)\n"), vec![0xe9]);
        assert_eq!(code("jp (ix)\n"), vec![0xdd, 0xe9]);
        assert_eq!(code("call 2\n"), vec![0xcd, 0x02, 0x00, 0x00]);
        assert_eq!(code("call pe, 2\n"), vec![0xec, 0x02, 0x00, 0x00]);
        assert_eq!(code("ret\n"), vec![0xc9]);
        assert_eq!(code("ret c\n"), vec![0xd8]);
        assert_eq!(errors("jr po, 0\n"), 1);
    }

    #[test]
    fn rst_group() {
        assert_eq!(code("rst 3\n"), vec![0xdf]);
        assert_eq!(code("rst 0x18\n"), vec![0xdf]);
        assert_eq!(code("rst 0\n"), vec![0xc7]);
        assert_eq!(code("rst.lil 0x10\n"), vec![0x5b, 0xd7]);
        assert_eq!(errors("rst 9\n"), 1);
    }

    #[test]
    fn stack_and_exchange() {
        assert_eq!(code("push af\n"), vec![0xf5]);
        assert_eq!(code("pop de\n"), vec![0xd1]);
        assert_eq!(code("push ix\n"), vec![0xdd, 0xe5]);
        assert_eq!(code("pop iy\n"), vec![0xfd, 0xe1]);
        assert_eq!(code("ex de, hl\n"), vec![0xeb]);
        assert_eq!(code("ex af, af'\n"), vec![0x08]);
        assert_eq!(code("ex (sp), iy\n"), vec![0xfd, 0xe3]);
    }

    #[test]
    fn io_group() {
        assert_eq!(code("in a, (0x9a)\n"), vec![0xdb, 0x9a]);
        assert_eq!(code("in b, (c)\n"), vec![0xed, 0x40]);
        assert_eq!(code("out (c), e\n"), vec![0xed, 0x59]);
        assert_eq!(code("out (0x01), a\n"), vec![0xd3, 0x01]);
        assert_eq!(code("in0 d, (5)\n"), vec![0xed, 0x10, 0x05]);
        assert_eq!(code("out0 (5), d\n"), vec![0xed, 0x11, 0x05]);
    }

    #[test]
    fn ez80_address_group() {
        assert_eq!(code("lea hl, ix+3\n"), vec![0xed, 0x22, 0x03]);
        assert_eq!(code("lea iy, iy-1\n"), vec![0xed, 0x33, 0xff]);
        assert_eq!(code("lea ix, iy+2\n"), vec![0xed, 0x54, 0x02]);
        assert_eq!(code("pea ix+4\n"), vec![0xed, 0x65, 0x04]);
        assert_eq!(code("pea iy-2\n"), vec![0xed, 0x66, 0xfe]);
        assert_eq!(code("mlt bc\n"), vec![0xed, 0x4c]);
        assert_eq!(code("mlt sp\n"), vec![0xed, 0x7c]);
        assert_eq!(code("tst a, 0x0f\n"), vec![0xed, 0x64, 0x0f]);
        assert_eq!(code("tst (hl)\n"), vec![0xed, 0x34]);
        assert_eq!(code("im 2\n"), vec![0xed, 0x5e]);
    }

    #[test]
    fn simple_instructions() {
        assert_eq!(code("nop\n"), vec![0x00]);
        assert_eq!(code("halt\n"), vec![0x76]);
        assert_eq!(code("ldir\n"), vec![0xed, 0xb0]);
        assert_eq!(code("exx\n"), vec![0xd9]);
        assert_eq!(code("slp\n"), vec![0xed, 0x76]);
        assert_eq!(code("NOP\n"), vec![0x00]);
    }

    #[test]
    fn trailing_content_is_rejected() {
        assert_eq!(errors("nop nop\n"), 1);
        assert_eq!(errors("ld a, 1 2\n"), 1);
    }

    #[test]
    fn equ_and_infix_forms() {
        assert_eq!(code("five equ 5\nsix = 6\nseven: equ 7\n db five, six, seven\n"), vec![5, 6, 7]);
    }

    #[test]
    fn duplicate_definition_is_an_error() {
        assert_eq!(errors("x: nop\nx: nop\n"), 1);
    }

    #[test]
    fn relocatable_data_needs_dl() {
        assert_eq!(errors("x: nop\n db x\n"), 1);
        assert_eq!(errors("x: nop\n dw x\n"), 1);
        assert_eq!(errors("x: nop\n dl x\n"), 0);
    }

    #[test]
    fn dl_records_relocations() {
        let assembler = assemble("x: nop\n dl x\n");

        assert_eq!(assembler.code_bytes(), &[0x00, 0x00, 0x00, 0x00]);
        assert_eq!(assembler.relocation_records().len(), 1);

        let relocation = assembler.relocation_records()[0];
        assert_eq!(relocation.offset, 1);
        assert_eq!(relocation.section, Section::Code);
        assert_eq!(relocation.target, RelocationTarget::Code);
    }

    #[test]
    fn external_relocations_carry_their_index() {
        let assembler = assemble("xref putc, puts\n dl puts + 2\n");

        assert_eq!(assembler.code_bytes(), &[0x02, 0x00, 0x00]);

        let relocation = assembler.relocation_records()[0];
        assert_eq!(relocation.target, RelocationTarget::External);
        assert_eq!(relocation.external_index, 1);
    }

    #[test]
    fn same_section_difference_cancels() {
        let assembler = assemble("a1: nop\na2: nop\n dl a2 - a1\n");

        assert_eq!(assembler.code_bytes(), &[0x00, 0x00, 0x01, 0x00, 0x00]);
        assert!(assembler.relocation_records().is_empty());
    }

    #[test]
    fn external_difference_is_rejected() {
        assert_eq!(errors("xref a\nxref b\n dl a - b\n"), 1);
    }

    #[test]
    fn local_labels_scope_between_globals() {
        let assembler = assemble(
            "a:\n nop\n@loop:\n nop\n djnz @loop\nb:\n@loop:\n nop\n djnz @loop\n",
        );

        assert_eq!(
            assembler.code_bytes(),
            &[0x00, 0x00, 0x10, 0xfd, 0x00, 0x10, 0xfd]
        );
    }

    #[test]
    fn data_directives() {
        assert_eq!(code(" db 1, 2, 'A'\n"), vec![1, 2, 65]);
        assert_eq!(code(" dw 0x1234, 5\n"), vec![0x34, 0x12, 0x05, 0x00]);
        assert_eq!(code(" dl 0x123456\n"), vec![0x56, 0x34, 0x12]);
        assert_eq!(code(" ds 3\n"), vec![0, 0, 0]);
        assert_eq!(code(" ds 2, 0xaa\n"), vec![0xaa, 0xaa]);
        assert_eq!(code(" ascii \"AB\"\n"), vec![0x41, 0x42]);
        assert_eq!(code(" asciz \"AB\"\n"), vec![0x41, 0x42, 0x00]);
        assert_eq!(code(" byte 9\n"), vec![9]);
        assert_eq!(code(" .db 9\n"), vec![9]);
    }

    #[test]
    fn align_pads_with_zeros() {
        assert_eq!(code("nop\nalign 4\nnop\n"), vec![0x00, 0x00, 0x00, 0x00, 0x00]);
        assert_eq!(errors("align 3\n"), 1);
    }

    #[test]
    fn bss_reserves_without_bytes() {
        let assembler = assemble("section bss\nbuffer: ds 0x20\n");

        assert_eq!(assembler.bss_size(), 0x20);
        assert!(assembler.code_bytes().is_empty());
    }

    #[test]
    fn bss_rejects_bytes() {
        assert_eq!(errors("section bss\n db 1\n"), 1);
    }

    #[test]
    fn section_switch_restores_location_counters() {
        let assembler = assemble(
            "one: nop\nsection data\n db 5\nsection code\ntwo: nop\n dl two\n",
        );

        // `two` sits right after `one` in code.
        assert_eq!(assembler.code_bytes()[..2], [0x00, 0x00]);
        assert_eq!(assembler.data_bytes(), &[0x05]);
        assert_eq!(assembler.relocation_records()[0].offset, 2);
    }

    #[test]
    fn unknown_section_warns_and_uses_code() {
        let mut assembler = Assembler::new(false);
        assembler.assemble_source("test.asm", "section weird\n db 1\n");

        assert_eq!(assembler.error_count(), 0);
        assert_eq!(assembler.warning_count(), 1);
        assert_eq!(assembler.code_bytes(), &[0x01]);
    }

    #[test]
    fn assume_rejects_z80_mode() {
        assert_eq!(errors("assume adl=0\n"), 1);
        assert_eq!(errors("assume adl=1\n"), 0);
    }

    #[test]
    fn org_moves_the_location_counter() {
        let assembler = assemble("org 0x100\nstart: jp start\n");

        assert_eq!(assembler.code_bytes(), &[0xc3, 0x00, 0x01, 0x00]);
    }

    #[test]
    fn end_stops_the_file() {
        assert_eq!(code("nop\nend\ngarbage here\n"), vec![0x00]);
    }

    #[test]
    fn deterministic_output() {
        let source = "xdef main\nmain: ld a, 1\n call main\n dl main\nsection data\n db 1, 2\n";

        let first = assemble(source).object_bytes().unwrap();
        let second = assemble(source).object_bytes().unwrap();

        assert_eq!(first, second);
    }

    #[test]
    fn header_sizes_match_streams() {
        let assembler = assemble("xdef main\nmain: nop\nsection data\n db 1\nsection bss\n ds 4\n");
        let bytes = assembler.object_bytes().unwrap();

        let (rest, object) = ObjectFile::read::<()>(&bytes).unwrap();

        assert!(rest.is_empty());
        assert_eq!(object.header.code_size as usize, assembler.code_bytes().len());
        assert_eq!(object.header.data_size as usize, assembler.data_bytes().len());
        assert_eq!(object.header.bss_size, assembler.bss_size());
    }

    #[test]
    fn include_splices_a_file() {
        let dir = std::env::temp_dir();
        let path = dir.join("braze-asm-include-test.inc");
        std::fs::write(&path, "five equ 5\n db five\n").unwrap();

        let source = format!(" include \"{}\"\n nop\n", path.display());
        assert_eq!(code(&source), vec![0x05, 0x00]);

        std::fs::remove_file(&path).unwrap();
    }

    #[test]
    fn incbin_splices_bytes() {
        let dir = std::env::temp_dir();
        let path = dir.join("braze-asm-incbin-test.bin");
        std::fs::write(&path, [1u8, 2, 3]).unwrap();

        let source = format!(" incbin \"{}\"\n", path.display());
        assert_eq!(code(&source), vec![1, 2, 3]);

        std::fs::remove_file(&path).unwrap();
    }

    #[test]
    fn missing_include_is_reported() {
        assert_eq!(errors(" include \"/nonexistent/braze.inc\"\n"), 1);
    }

    #[test]
    fn undefined_symbol_is_reported() {
        assert_eq!(errors(" jp nowhere\n"), 1);
    }

    #[test]
    fn exported_but_undefined_symbol_is_reported() {
        assert_eq!(errors("xdef ghost\n"), 1);
    }
}
