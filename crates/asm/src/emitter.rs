//! Byte emission and relocation recording.
//!
//! Pass 1 runs the exact same emission calls as pass 2 against plain
//! counters; only pass 2 appends to the in-memory section streams and
//! records relocations. BSS never stores bytes, it only grows.

use braze_object::ez8o::{RelocationKind, RelocationRecord, RelocationTarget, Section};

use crate::{
    assembler::{Assembler, Pass},
    error::AsmError,
    expr::{Expr, Reloc},
};

/// Per-section emission state.
#[derive(Debug, Default)]
pub(crate) struct SectionState {
    /// The location counter, as seen by `$` and label definitions.
    /// `org` moves it independently of the stream.
    pub pc: i32,
    /// Bytes emitted (or, for BSS, reserved) so far.
    pub offset: u32,
    /// The byte stream, filled during pass 2 only.
    pub stream: Vec<u8>,
}

impl SectionState {
    pub(crate) fn reset(&mut self) {
        self.pc = 0;
        self.offset = 0;
        self.stream.clear();
    }
}

impl Assembler {
    pub(crate) fn section(&self, section: Section) -> &SectionState {
        match section {
            Section::Code => &self.code,
            Section::Data => &self.data,
            Section::Bss => &self.bss,
            Section::Absolute => unreachable!("the absolute section is never current"),
        }
    }

    pub(crate) fn section_mut(&mut self, section: Section) -> &mut SectionState {
        match section {
            Section::Code => &mut self.code,
            Section::Data => &mut self.data,
            Section::Bss => &mut self.bss,
            Section::Absolute => unreachable!("the absolute section is never current"),
        }
    }

    /// The location counter of the current section.
    pub(crate) fn pc(&self) -> i32 {
        self.section(self.current).pc
    }

    /// Move the location counter of the current section.
    pub(crate) fn set_pc(&mut self, pc: i32) {
        let current = self.current;
        self.section_mut(current).pc = pc & 0xff_ffff;
    }

    /// Switch sections, keeping each one's location counter.
    pub(crate) fn switch_section(&mut self, section: Section) {
        self.current = section;
    }

    /// Emit one byte into the current section.
    pub(crate) fn emit8(&mut self, byte: u8) -> Result<(), AsmError> {
        if self.current == Section::Bss {
            return Err(AsmError::BssEmit);
        }

        let pass = self.pass;
        let current = self.current;
        let state = self.section_mut(current);

        if pass == Pass::Second {
            state.stream.push(byte);
        }
        state.offset += 1;
        state.pc = (state.pc + 1) & 0xff_ffff;

        Ok(())
    }

    /// Emit an 8-bit value; relocatable values have nowhere to go in one
    /// byte.
    pub(crate) fn emit8_expr(&mut self, expr: Expr, what: &'static str) -> Result<(), AsmError> {
        if expr.is_relocatable() {
            return Err(AsmError::Relocatable(what));
        }

        self.emit8((expr.value() & 0xff) as u8)
    }

    /// Emit a 16-bit little-endian value, constants only.
    pub(crate) fn emit16_value(&mut self, value: i32) -> Result<(), AsmError> {
        let value = value & 0xffff;
        self.emit8((value & 0xff) as u8)?;
        self.emit8((value >> 8) as u8)
    }

    /// Emit a 24-bit little-endian value, recording a relocation first
    /// when the expression carries a symbol.
    pub(crate) fn emit24_expr(&mut self, expr: Expr) -> Result<(), AsmError> {
        if self.current == Section::Bss {
            return Err(AsmError::BssEmit);
        }

        if let (Expr::Rel(_, reloc), Pass::Second) = (expr, self.pass) {
            let (target, external_index) = match reloc {
                Reloc::Section(Section::Code) => (RelocationTarget::Code, 0),
                Reloc::Section(Section::Data) => (RelocationTarget::Data, 0),
                Reloc::Section(Section::Bss) => (RelocationTarget::Bss, 0),
                Reloc::Section(Section::Absolute) => {
                    unreachable!("absolute values are constants")
                }
                Reloc::External(index) => (RelocationTarget::External, index),
            };

            let offset = self.section(self.current).offset;
            let section = self.current;

            self.relocations.push(RelocationRecord {
                offset,
                section,
                kind: RelocationKind::Addr24,
                target,
                external_index,
            });
        }

        let value = expr.value() & 0xff_ffff;
        self.emit8((value & 0xff) as u8)?;
        self.emit8(((value >> 8) & 0xff) as u8)?;
        self.emit8((value >> 16) as u8)
    }

    /// Reserve `count` bytes: fill bytes outside BSS, a bare counter
    /// bump inside it.
    pub(crate) fn reserve(&mut self, count: u32, fill: u8) -> Result<(), AsmError> {
        if self.current == Section::Bss {
            let state = &mut self.bss;
            state.offset += count;
            state.pc = state.pc.wrapping_add(count as i32) & 0xff_ffff;

            return Ok(());
        }

        for _ in 0..count {
            self.emit8(fill)?;
        }

        Ok(())
    }

    /// Zero-fill until the location counter is a multiple of `alignment`
    /// (a power of two).
    pub(crate) fn align_to(&mut self, alignment: i32) -> Result<(), AsmError> {
        loop {
            if self.pc() % alignment == 0 {
                return Ok(());
            }

            self.reserve(1, 0)?;
        }
    }
}
