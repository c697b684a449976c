//! Operand classification.
//!
//! One pass over the token stream turns the text of an operand into a
//! typed value the encoder can match on. Parentheses mean memory
//! indirection here; only inside an expression do they group.

use crate::{
    assembler::Assembler,
    error::AsmError,
    expr::Expr,
    lexer::{Lexer, Token},
};

/// A register name.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Reg {
    /// The accumulator.
    A,
    /// `B`.
    B,
    /// `C`.
    C,
    /// `D`.
    D,
    /// `E`.
    E,
    /// `H`.
    H,
    /// `L`.
    L,
    /// The upper half of IX.
    IxH,
    /// The lower half of IX.
    IxL,
    /// The upper half of IY.
    IyH,
    /// The lower half of IY.
    IyL,
    /// The interrupt vector base.
    I,
    /// The refresh counter.
    R,
    /// The memory base (eZ80, Z80-mode addressing).
    Mb,
    /// `AF`.
    Af,
    /// `AF'`, the alternate accumulator/flags pair.
    AfAlt,
    /// `BC`.
    Bc,
    /// `DE`.
    De,
    /// `HL`.
    Hl,
    /// The stack pointer.
    Sp,
    /// `IX`.
    Ix,
    /// `IY`.
    Iy,
}

impl Reg {
    /// Look a register name up, case-insensitively.
    pub fn from_name(name: &str) -> Option<Self> {
        Some(match name.to_ascii_lowercase().as_str() {
            "a" => Self::A,
            "b" => Self::B,
            "c" => Self::C,
            "d" => Self::D,
            "e" => Self::E,
            "h" => Self::H,
            "l" => Self::L,
            "ixh" => Self::IxH,
            "ixl" => Self::IxL,
            "iyh" => Self::IyH,
            "iyl" => Self::IyL,
            "i" => Self::I,
            "r" => Self::R,
            "mb" => Self::Mb,
            "af" => Self::Af,
            "af'" => Self::AfAlt,
            "bc" => Self::Bc,
            "de" => Self::De,
            "hl" => Self::Hl,
            "sp" => Self::Sp,
            "ix" => Self::Ix,
            "iy" => Self::Iy,
            _ => return None,
        })
    }

    /// The 3-bit register field for 8-bit operations. Index halves share
    /// the H/L codes; the DD/FD prefix tells them apart.
    pub fn code8(self) -> Option<u8> {
        Some(match self {
            Self::B => 0,
            Self::C => 1,
            Self::D => 2,
            Self::E => 3,
            Self::H | Self::IxH | Self::IyH => 4,
            Self::L | Self::IxL | Self::IyL => 5,
            Self::A => 7,
            _ => return None,
        })
    }

    /// The `dd` register-pair code.
    pub fn pair_dd(self) -> Option<u8> {
        Some(match self {
            Self::Bc => 0,
            Self::De => 1,
            Self::Hl => 2,
            Self::Sp => 3,
            _ => return None,
        })
    }

    /// The `qq` register-pair code, used by push/pop.
    pub fn pair_qq(self) -> Option<u8> {
        Some(match self {
            Self::Bc => 0,
            Self::De => 1,
            Self::Hl => 2,
            Self::Af => 3,
            _ => return None,
        })
    }

    /// Index into the 24-bit pair-load tables (BC, DE, HL, IX, IY).
    pub fn pair_load_index(self) -> Option<usize> {
        Some(match self {
            Self::Bc => 0,
            Self::De => 1,
            Self::Hl => 2,
            Self::Ix => 3,
            Self::Iy => 4,
            _ => return None,
        })
    }

    /// The DD/FD prefix this register drags into an encoding.
    pub fn index_prefix(self) -> Option<u8> {
        match self {
            Self::Ix | Self::IxH | Self::IxL => Some(0xdd),
            Self::Iy | Self::IyH | Self::IyL => Some(0xfd),
            _ => None,
        }
    }

    /// Whether this is one of the index-register halves.
    pub fn is_index_half(self) -> bool {
        matches!(self, Self::IxH | Self::IxL | Self::IyH | Self::IyL)
    }
}

/// A condition code.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Cond {
    /// Zero flag clear.
    Nz,
    /// Zero flag set.
    Z,
    /// Carry flag clear.
    Nc,
    /// Carry flag set.
    C,
    /// Parity odd (overflow clear).
    Po,
    /// Parity even (overflow set).
    Pe,
    /// Sign positive.
    P,
    /// Sign negative.
    M,
}

impl Cond {
    /// Look a condition name up, case-insensitively. `c` is missing on
    /// purpose: it lexes as the register, see [`Operand::RegC`].
    pub fn from_name(name: &str) -> Option<Self> {
        Some(match name.to_ascii_lowercase().as_str() {
            "nz" => Self::Nz,
            "z" => Self::Z,
            "nc" => Self::Nc,
            "po" => Self::Po,
            "pe" => Self::Pe,
            "p" => Self::P,
            "m" => Self::M,
            _ => return None,
        })
    }

    /// The 3-bit condition field.
    pub fn code(self) -> u8 {
        match self {
            Self::Nz => 0,
            Self::Z => 1,
            Self::Nc => 2,
            Self::C => 3,
            Self::Po => 4,
            Self::Pe => 5,
            Self::P => 6,
            Self::M => 7,
        }
    }
}

/// A register usable inside parentheses.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IndReg {
    /// `(BC)`.
    Bc,
    /// `(DE)`.
    De,
    /// `(HL)`.
    Hl,
    /// `(SP)`.
    Sp,
    /// `(C)`, the I/O port register.
    C,
    /// `(IX)`, a zero-displacement index.
    Ix,
    /// `(IY)`, a zero-displacement index.
    Iy,
}

impl IndReg {
    fn from_name(name: &str) -> Option<Self> {
        Some(match name.to_ascii_lowercase().as_str() {
            "bc" => Self::Bc,
            "de" => Self::De,
            "hl" => Self::Hl,
            "sp" => Self::Sp,
            "c" => Self::C,
            "ix" => Self::Ix,
            "iy" => Self::Iy,
            _ => return None,
        })
    }
}

/// A classified operand.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Operand {
    /// A bare register.
    Reg(Reg),
    /// The token `C`: the register, unless the instruction wants a
    /// condition there.
    RegC,
    /// A condition code.
    Cond(Cond),
    /// An immediate expression.
    Imm(Expr),
    /// A memory operand, `(expr)`.
    Addr(Expr),
    /// A register indirection, `(HL)`, `(BC)`, `(C)`, …
    IndReg(IndReg),
    /// `(IX+d)` or bare `IX±d`.
    IxOff(Expr),
    /// `(IY+d)` or bare `IY±d`.
    IyOff(Expr),
}

impl Operand {
    /// Read this operand as a condition, if the instruction admits one.
    pub fn condition(&self) -> Option<Cond> {
        match self {
            Self::Cond(cond) => Some(*cond),
            Self::RegC => Some(Cond::C),
            _ => None,
        }
    }
}

impl Assembler {
    /// Classify the operand starting at the current token. Returns
    /// `None` at end of line.
    pub(crate) fn classify_operand(
        &mut self,
        lexer: &mut Lexer,
    ) -> Result<Option<Operand>, AsmError> {
        match lexer.peek()? {
            Token::Eol => return Ok(None),
            Token::LParen => {
                lexer.next_token()?;

                return self.classify_indirect(lexer).map(Some);
            }
            Token::Ident(name) => {
                if let Some(reg) = Reg::from_name(&name) {
                    lexer.next_token()?;

                    return self.classify_register(reg, lexer).map(Some);
                }

                if let Some(cond) = Cond::from_name(&name) {
                    lexer.next_token()?;

                    return Ok(Some(Operand::Cond(cond)));
                }
            }
            _ => {}
        }

        Ok(Some(Operand::Imm(self.eval_expr(lexer)?)))
    }

    /// The interior of a `( … )` operand.
    fn classify_indirect(&mut self, lexer: &mut Lexer) -> Result<Operand, AsmError> {
        if let Token::Ident(name) = lexer.peek()? {
            if let Some(reg) = IndReg::from_name(&name) {
                lexer.next_token()?;

                let operand = match reg {
                    IndReg::Ix | IndReg::Iy => {
                        let displacement = self.displacement(lexer)?;

                        match (reg, displacement) {
                            (IndReg::Ix, Some(expr)) => Operand::IxOff(expr),
                            (IndReg::Iy, Some(expr)) => Operand::IyOff(expr),
                            _ => Operand::IndReg(reg),
                        }
                    }
                    reg => Operand::IndReg(reg),
                };

                return match lexer.next_token()? {
                    Token::RParen => Ok(operand),
                    _ => Err(AsmError::ExpectedParenthesis),
                };
            }
        }

        let expr = self.eval_expr(lexer)?;

        match lexer.next_token()? {
            Token::RParen => Ok(Operand::Addr(expr)),
            _ => Err(AsmError::ExpectedParenthesis),
        }
    }

    /// A register at the top level of an operand. `IX`/`IY` directly
    /// followed by a sign start a displacement, the LEA/PEA spelling.
    fn classify_register(&mut self, reg: Reg, lexer: &mut Lexer) -> Result<Operand, AsmError> {
        if matches!(reg, Reg::Ix | Reg::Iy) {
            if let Some(expr) = self.displacement(lexer)? {
                return Ok(match reg {
                    Reg::Ix => Operand::IxOff(expr),
                    _ => Operand::IyOff(expr),
                });
            }
        }

        if reg == Reg::C {
            return Ok(Operand::RegC);
        }

        Ok(Operand::Reg(reg))
    }

    /// `+expr` or `-expr` after an index register, if present.
    fn displacement(&mut self, lexer: &mut Lexer) -> Result<Option<Expr>, AsmError> {
        let negate = match lexer.peek()? {
            Token::Plus => false,
            Token::Minus => true,
            _ => return Ok(None),
        };
        lexer.next_token()?;

        let expr = self.eval_expr(lexer)?;

        if negate {
            return match expr {
                Expr::Const(value) => Ok(Some(Expr::Const(value.wrapping_neg()))),
                Expr::Rel(..) => Err(AsmError::Relocatable("index displacement")),
            };
        }

        Ok(Some(expr))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn classify(source: &str) -> Option<Operand> {
        let mut assembler = Assembler::new(false);
        let mut lexer = Lexer::new(source);

        assembler.classify_operand(&mut lexer).unwrap()
    }

    #[test]
    fn test_registers_and_conditions() {
        assert_eq!(classify("a"), Some(Operand::Reg(Reg::A)));
        assert_eq!(classify("IX"), Some(Operand::Reg(Reg::Ix)));
        assert_eq!(classify("af'"), Some(Operand::Reg(Reg::AfAlt)));
        assert_eq!(classify("c"), Some(Operand::RegC));
        assert_eq!(classify("nz"), Some(Operand::Cond(Cond::Nz)));
        assert_eq!(classify("m"), Some(Operand::Cond(Cond::M)));
    }

    #[test]
    fn test_indirection() {
        assert_eq!(classify("(hl)"), Some(Operand::IndReg(IndReg::Hl)));
        assert_eq!(classify("(c)"), Some(Operand::IndReg(IndReg::C)));
        assert_eq!(classify("(ix)"), Some(Operand::IndReg(IndReg::Ix)));
        assert_eq!(classify("(ix + 4)"), Some(Operand::IxOff(Expr::Const(4))));
        assert_eq!(classify("(iy - 2)"), Some(Operand::IyOff(Expr::Const(-2))));
        assert_eq!(classify("(0x500)"), Some(Operand::Addr(Expr::Const(0x500))));
    }

    #[test]
    fn test_bare_index_displacement() {
        assert_eq!(classify("ix + 3"), Some(Operand::IxOff(Expr::Const(3))));
        assert_eq!(classify("iy - 1"), Some(Operand::IyOff(Expr::Const(-1))));
    }

    #[test]
    fn test_immediate() {
        assert_eq!(classify("42"), Some(Operand::Imm(Expr::Const(42))));
        assert_eq!(classify("2 * 21"), Some(Operand::Imm(Expr::Const(42))));
    }

    #[test]
    fn test_end_of_line() {
        assert_eq!(classify(""), None);
        assert_eq!(classify("; comment"), None);
    }

    #[test]
    fn test_condition_code_values() {
        for (cond, code) in [
            (Cond::Nz, 0),
            (Cond::Z, 1),
            (Cond::Nc, 2),
            (Cond::C, 3),
            (Cond::Po, 4),
            (Cond::Pe, 5),
            (Cond::P, 6),
            (Cond::M, 7),
        ] {
            assert_eq!(cond.code(), code);
        }
    }
}
