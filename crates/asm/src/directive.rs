//! The directive set.
//!
//! Every directive also answers to a `.`-prefixed alias; the driver
//! strips the dot before dispatching here.

use braze_object::ez8o::Section;

use crate::{
    assembler::Assembler,
    error::AsmError,
    lexer::{Lexer, Token},
};

/// Widths of the data directives.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Width {
    Byte,
    Word,
    Long,
}

impl Assembler {
    /// Try to process `name` as a directive. Returns `Ok(false)` when the
    /// name is not a directive, so the driver can try the instruction
    /// tables.
    pub(crate) fn directive(&mut self, name: &str, lexer: &mut Lexer) -> Result<bool, AsmError> {
        match name {
            "org" => {
                let expr = self.eval_expr(lexer)?;

                if expr.is_relocatable() {
                    return Err(AsmError::Relocatable("org"));
                }

                self.set_pc(expr.value());
            }
            "db" | "defb" | "byte" => self.data_values(lexer, Width::Byte)?,
            "dw" | "defw" | "word" => self.data_values(lexer, Width::Word)?,
            "dl" | "defl" | "long" | "dd" => self.data_values(lexer, Width::Long)?,
            "ds" | "defs" | "rmb" | "blkb" => self.define_storage(lexer)?,
            "ascii" => self.ascii(lexer, false)?,
            "asciz" | "asciiz" => self.ascii(lexer, true)?,
            "section" | "segment" => self.select_section(lexer)?,
            "xdef" | "public" | "global" => self.visibility(lexer, true)?,
            "xref" | "extern" | "external" => self.visibility(lexer, false)?,
            "assume" => self.assume(lexer)?,
            "align" => {
                let expr = self.eval_expr(lexer)?;

                if expr.is_relocatable() {
                    return Err(AsmError::Relocatable("align"));
                }

                let alignment = expr.value();

                if alignment <= 0 || alignment & (alignment - 1) != 0 {
                    return Err(AsmError::Alignment);
                }

                self.align_to(alignment)?;
            }
            "include" => self.include(lexer)?,
            "incbin" => self.incbin(lexer)?,
            "end" => self.stop_file = true,
            // `equ` only makes sense after a label; the driver handles
            // that form before getting here.
            "equ" => return Err(AsmError::EquWithoutLabel),
            _ => return Ok(false),
        }

        Ok(true)
    }

    /// `db`/`dw`/`dl` and friends: a comma-separated list of values.
    /// String operands of `db` emit one byte per character, without a
    /// terminator.
    fn data_values(&mut self, lexer: &mut Lexer, width: Width) -> Result<(), AsmError> {
        loop {
            if width == Width::Byte {
                if let Token::Str(text) = lexer.peek()? {
                    lexer.next_token()?;

                    for byte in text.bytes() {
                        self.emit8(byte)?;
                    }

                    if !self.next_comma(lexer)? {
                        return Ok(());
                    }

                    continue;
                }
            }

            let expr = self.eval_expr(lexer)?;

            // Only `dl` fields are wide enough for the linker to patch.
            if width != Width::Long && expr.is_relocatable() {
                return Err(AsmError::UseDl);
            }

            match width {
                Width::Byte => self.emit8((expr.value() & 0xff) as u8)?,
                Width::Word => self.emit16_value(expr.value())?,
                Width::Long => self.emit24_expr(expr)?,
            }

            if !self.next_comma(lexer)? {
                return Ok(());
            }
        }
    }

    fn next_comma(&mut self, lexer: &mut Lexer) -> Result<bool, AsmError> {
        if lexer.peek()? == Token::Comma {
            lexer.next_token()?;

            return Ok(true);
        }

        Ok(false)
    }

    /// `ds count [, fill]`.
    fn define_storage(&mut self, lexer: &mut Lexer) -> Result<(), AsmError> {
        let count = self.eval_expr(lexer)?;

        if count.is_relocatable() {
            return Err(AsmError::Relocatable("ds count"));
        }

        if count.value() < 0 {
            return Err(AsmError::NegativeCount);
        }

        let fill = if self.next_comma(lexer)? {
            let fill = self.eval_expr(lexer)?;

            if fill.is_relocatable() {
                return Err(AsmError::Relocatable("ds fill"));
            }

            (fill.value() & 0xff) as u8
        } else {
            0
        };

        self.reserve(count.value() as u32, fill)
    }

    /// `ascii`/`asciz`: as `db`, with a NUL appended to each string for
    /// `asciz`.
    fn ascii(&mut self, lexer: &mut Lexer, terminate: bool) -> Result<(), AsmError> {
        loop {
            if let Token::Str(text) = lexer.peek()? {
                lexer.next_token()?;

                for byte in text.bytes() {
                    self.emit8(byte)?;
                }

                if terminate {
                    self.emit8(0)?;
                }
            } else {
                let expr = self.eval_expr(lexer)?;

                if expr.is_relocatable() {
                    return Err(AsmError::UseDl);
                }

                self.emit8((expr.value() & 0xff) as u8)?;
            }

            if !self.next_comma(lexer)? {
                return Ok(());
            }
        }
    }

    /// `section name`: save the outgoing location counter, restore the
    /// incoming one.
    fn select_section(&mut self, lexer: &mut Lexer) -> Result<(), AsmError> {
        let name = match lexer.next_token()? {
            Token::Ident(name) => name,
            _ => return Err(AsmError::SyntaxError),
        };

        let section = match name.to_ascii_lowercase().as_str() {
            "code" | "text" | ".text" => Section::Code,
            "data" | ".data" => Section::Data,
            "bss" | ".bss" => Section::Bss,
            _ => {
                self.warn(format!("unknown section `{name}`, assuming code"));

                Section::Code
            }
        };

        self.switch_section(section);

        Ok(())
    }

    /// `xdef`/`xref` and their aliases: a comma-separated name list.
    fn visibility(&mut self, lexer: &mut Lexer, export: bool) -> Result<(), AsmError> {
        loop {
            let name = match lexer.next_token()? {
                Token::Ident(name) => name,
                _ => return Err(AsmError::SyntaxError),
            };

            if name.starts_with('@') {
                return Err(AsmError::LocalVisibility(name));
            }

            if export {
                self.symbols.set_export(&name)?;
            } else {
                self.symbols.set_extern(&name)?;
            }

            if !self.next_comma(lexer)? {
                return Ok(());
            }
        }
    }

    /// `assume ADL=1`. Anything else is refused: this assembler only
    /// speaks the 24-bit mode.
    fn assume(&mut self, lexer: &mut Lexer) -> Result<(), AsmError> {
        match lexer.next_token()? {
            Token::Ident(name) if name.eq_ignore_ascii_case("adl") => {}
            _ => return Err(AsmError::SyntaxError),
        }

        if lexer.next_token()? != Token::Equals {
            return Err(AsmError::SyntaxError);
        }

        let expr = self.eval_expr(lexer)?;

        if expr.is_relocatable() || expr.value() != 1 {
            return Err(AsmError::AdlMode);
        }

        Ok(())
    }

    /// `include "file"`: textual inclusion, both passes.
    fn include(&mut self, lexer: &mut Lexer) -> Result<(), AsmError> {
        let path = match lexer.next_token()? {
            Token::Str(path) => path,
            _ => return Err(AsmError::SyntaxError),
        };

        if self.include_depth >= 16 {
            return Err(AsmError::IncludeDepth);
        }

        let bytes = braze_file::read(&path)
            .map_err(|source| AsmError::CannotOpen { path: path.clone(), source })?;
        let text = String::from_utf8_lossy(&bytes).into_owned();
        drop(bytes);

        self.include_depth += 1;
        self.process_source(&path, &text);
        self.include_depth -= 1;

        Ok(())
    }

    /// `incbin "file"`: splice a file in as raw bytes.
    fn incbin(&mut self, lexer: &mut Lexer) -> Result<(), AsmError> {
        let path = match lexer.next_token()? {
            Token::Str(path) => path,
            _ => return Err(AsmError::SyntaxError),
        };

        let bytes = braze_file::read(&path)
            .map_err(|source| AsmError::CannotOpen { path: path.clone(), source })?;

        for &byte in bytes.iter() {
            self.emit8(byte)?;
        }

        Ok(())
    }
}
