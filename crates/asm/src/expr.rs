//! Expression evaluation.
//!
//! Recursive descent over `+`/`-` and `*`//` with unary sign, the only
//! operators of the source language. An expression result tracks at most
//! one relocatable reference; the arithmetic rules below are what keeps
//! that invariant.

use braze_object::ez8o::{Binding, Section};

use crate::{
    assembler::{Assembler, Pass},
    error::AsmError,
    lexer::{Lexer, Token},
};

/// What a relocatable value is relative to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Reloc {
    /// Relative to the start of a section of this object.
    Section(Section),
    /// An external symbol, by index into the externals table.
    External(u16),
}

/// The result of evaluating an expression.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Expr {
    /// A plain constant.
    Const(i32),
    /// A value that the linker must still displace.
    Rel(i32, Reloc),
}

impl Expr {
    /// The numeric part of the value.
    pub fn value(self) -> i32 {
        match self {
            Self::Const(value) | Self::Rel(value, _) => value,
        }
    }

    /// The relocation this value carries, if any.
    pub fn reloc(self) -> Option<Reloc> {
        match self {
            Self::Const(_) => None,
            Self::Rel(_, reloc) => Some(reloc),
        }
    }

    /// Whether the linker still has to displace this value.
    pub fn is_relocatable(self) -> bool {
        matches!(self, Self::Rel(..))
    }
}

fn add(lhs: Expr, rhs: Expr) -> Result<Expr, AsmError> {
    use Expr::*;

    match (lhs, rhs) {
        (Const(a), Const(b)) => Ok(Const(a.wrapping_add(b))),
        (Rel(a, reloc), Const(b)) | (Const(b), Rel(a, reloc)) => {
            Ok(Rel(a.wrapping_add(b), reloc))
        }
        (Rel(..), Rel(..)) => Err(AsmError::RelocatableSum),
    }
}

fn sub(lhs: Expr, rhs: Expr) -> Result<Expr, AsmError> {
    use Expr::*;

    match (lhs, rhs) {
        (Const(a), Const(b)) => Ok(Const(a.wrapping_sub(b))),
        (Rel(a, reloc), Const(b)) => Ok(Rel(a.wrapping_sub(b), reloc)),
        // Unusual, but preserved: the relocation of the right-hand side
        // flows into the result.
        (Const(a), Rel(b, reloc)) => Ok(Rel(a.wrapping_sub(b), reloc)),
        // Two symbols of the same section cancel to a constant.
        (Rel(a, Reloc::Section(x)), Rel(b, Reloc::Section(y))) if x == y => {
            Ok(Const(a.wrapping_sub(b)))
        }
        (Rel(_, Reloc::External(_)), Rel(_, Reloc::External(_))) => {
            Err(AsmError::DifferenceOfExternals)
        }
        (Rel(..), Rel(..)) => Err(AsmError::CrossSectionDifference),
    }
}

impl Assembler {
    /// Evaluate a full expression starting at the current token.
    pub(crate) fn eval_expr(&mut self, lexer: &mut Lexer) -> Result<Expr, AsmError> {
        let mut value = self.eval_term(lexer)?;

        loop {
            match lexer.peek()? {
                Token::Plus => {
                    lexer.next_token()?;
                    value = add(value, self.eval_term(lexer)?)?;
                }
                Token::Minus => {
                    lexer.next_token()?;
                    value = sub(value, self.eval_term(lexer)?)?;
                }
                _ => return Ok(value),
            }
        }
    }

    fn eval_term(&mut self, lexer: &mut Lexer) -> Result<Expr, AsmError> {
        let mut value = self.eval_factor(lexer)?;

        loop {
            let multiply = match lexer.peek()? {
                Token::Star => true,
                Token::Slash => false,
                _ => return Ok(value),
            };
            lexer.next_token()?;

            let rhs = self.eval_factor(lexer)?;

            // A section-relative address cannot be scaled at link time.
            if value.is_relocatable() || rhs.is_relocatable() {
                return Err(AsmError::RelocatableMulDiv);
            }

            value = if multiply {
                Expr::Const(value.value().wrapping_mul(rhs.value()))
            } else if rhs.value() == 0 {
                self.report(AsmError::DivisionByZero);

                Expr::Const(0)
            } else {
                Expr::Const(value.value().wrapping_div(rhs.value()))
            };
        }
    }

    fn eval_factor(&mut self, lexer: &mut Lexer) -> Result<Expr, AsmError> {
        match lexer.peek()? {
            Token::Plus => {
                lexer.next_token()?;
                self.eval_primary(lexer)
            }
            Token::Minus => {
                lexer.next_token()?;

                match self.eval_primary(lexer)? {
                    Expr::Const(value) => Ok(Expr::Const(value.wrapping_neg())),
                    Expr::Rel(..) => Err(AsmError::Relocatable("negation")),
                }
            }
            _ => self.eval_primary(lexer),
        }
    }

    fn eval_primary(&mut self, lexer: &mut Lexer) -> Result<Expr, AsmError> {
        match lexer.next_token()? {
            Token::Number(value) | Token::Char(value) => Ok(Expr::Const(value)),
            Token::Dollar => Ok(Expr::Rel(self.pc(), Reloc::Section(self.current))),
            Token::Ident(name) => self.symbol_ref(&name),
            Token::LParen => {
                let value = self.eval_expr(lexer)?;

                match lexer.next_token()? {
                    Token::RParen => Ok(value),
                    _ => Err(AsmError::ExpectedParenthesis),
                }
            }
            _ => Err(AsmError::SyntaxError),
        }
    }

    /// Resolve an identifier inside an expression.
    fn symbol_ref(&mut self, name: &str) -> Result<Expr, AsmError> {
        match self.symbols.find(name) {
            Some(id) => {
                let symbol = self.symbols.get(id);

                if symbol.binding == Binding::Extern {
                    let index = symbol.ext_index.expect("external symbols carry their index");

                    return Ok(Expr::Rel(0, Reloc::External(index)));
                }

                if symbol.defined {
                    return Ok(match symbol.section {
                        Section::Absolute => Expr::Const(symbol.value),
                        section => Expr::Rel(symbol.value, Reloc::Section(section)),
                    });
                }

                match self.pass {
                    // Known but not yet defined: a forward reference.
                    Pass::First => Ok(Expr::Rel(0, Reloc::Section(self.current))),
                    Pass::Second => Err(AsmError::UndefinedSymbol(name.to_owned())),
                }
            }
            None => match self.pass {
                // Forward references evaluate to a relocatable zero so
                // the location counter advances identically in pass 2.
                Pass::First => {
                    self.symbols.add(name);

                    Ok(Expr::Rel(0, Reloc::Section(self.current)))
                }
                Pass::Second => Err(AsmError::UndefinedSymbol(name.to_owned())),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn eval(source: &str) -> Result<Expr, AsmError> {
        let mut assembler = Assembler::new(false);
        let mut lexer = Lexer::new(source);

        assembler.eval_expr(&mut lexer)
    }

    #[test]
    fn test_precedence() {
        assert_eq!(eval("1 + 2 * 3").unwrap(), Expr::Const(7));
        assert_eq!(eval("(1 + 2) * 3").unwrap(), Expr::Const(9));
        assert_eq!(eval("10 / 2 - 3").unwrap(), Expr::Const(2));
        assert_eq!(eval("-2 + 5").unwrap(), Expr::Const(3));
    }

    #[test]
    fn test_characters_are_numbers() {
        assert_eq!(eval("'A' + 1").unwrap(), Expr::Const(66));
    }

    #[test]
    fn test_forward_reference_in_pass_one() {
        assert_eq!(eval("later").unwrap(), Expr::Rel(0, Reloc::Section(Section::Code)));
        assert_eq!(eval("later + 4").unwrap(), Expr::Rel(4, Reloc::Section(Section::Code)));
    }

    #[test]
    fn test_relocatable_rejected_under_scaling() {
        assert!(matches!(eval("later * 2"), Err(AsmError::RelocatableMulDiv)));
        assert!(matches!(eval("2 / later"), Err(AsmError::RelocatableMulDiv)));
    }

    #[test]
    fn test_dollar_is_section_relative() {
        assert_eq!(eval("$").unwrap(), Expr::Rel(0, Reloc::Section(Section::Code)));
    }

    #[test]
    fn test_division_by_zero_yields_zero() {
        assert_eq!(eval("7 / 0").unwrap(), Expr::Const(0));
    }
}
