//! The instruction encoder.
//!
//! Dispatch is two-tiered: a sorted table of simple no-operand
//! instructions, then a mnemonic enum whose decision functions match on
//! the classified operands. Case does not matter; the driver hands the
//! mnemonic in lowered down.

mod groups;
mod ld;
mod tables;

use crate::{
    assembler::{Assembler, Pass},
    error::AsmError,
    expr::Expr,
    lexer::{Lexer, Token},
    operand::{IndReg, Operand, Reg},
};
use tables::{SIMPLE, SUFFIX_LIL, SUFFIX_SIS};

/// An operand-taking mnemonic.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Mnemonic {
    Ld,
    Add,
    Adc,
    Sub,
    Sbc,
    And,
    Xor,
    Or,
    Cp,
    Tst,
    Inc,
    Dec,
    Jp,
    Jr,
    Djnz,
    Call,
    Ret,
    Rst,
    Push,
    Pop,
    Ex,
    In,
    Out,
    In0,
    Out0,
    Bit,
    Set,
    Res,
    Rlc,
    Rrc,
    Rl,
    Rr,
    Sla,
    Sra,
    Srl,
    Lea,
    Pea,
    Mlt,
    Im,
}

impl Mnemonic {
    fn from_name(name: &str) -> Option<Self> {
        Some(match name {
            "ld" => Self::Ld,
            "add" => Self::Add,
            "adc" => Self::Adc,
            "sub" => Self::Sub,
            "sbc" => Self::Sbc,
            "and" => Self::And,
            "xor" => Self::Xor,
            "or" => Self::Or,
            "cp" => Self::Cp,
            "tst" => Self::Tst,
            "inc" => Self::Inc,
            "dec" => Self::Dec,
            "jp" => Self::Jp,
            "jr" => Self::Jr,
            "djnz" => Self::Djnz,
            "call" => Self::Call,
            "ret" => Self::Ret,
            "rst" => Self::Rst,
            "push" => Self::Push,
            "pop" => Self::Pop,
            "ex" => Self::Ex,
            "in" => Self::In,
            "out" => Self::Out,
            "in0" => Self::In0,
            "out0" => Self::Out0,
            "bit" => Self::Bit,
            "set" => Self::Set,
            "res" => Self::Res,
            "rlc" => Self::Rlc,
            "rrc" => Self::Rrc,
            "rl" => Self::Rl,
            "rr" => Self::Rr,
            "sla" => Self::Sla,
            "sra" => Self::Sra,
            "srl" => Self::Srl,
            "lea" => Self::Lea,
            "pea" => Self::Pea,
            "mlt" => Self::Mlt,
            "im" => Self::Im,
            _ => return None,
        })
    }
}

/// Encode one instruction. The driver has already consumed the mnemonic.
pub(crate) fn encode(
    asm: &mut Assembler,
    mnemonic: &str,
    lexer: &mut Lexer,
) -> Result<(), AsmError> {
    let (base, suffix) = match mnemonic.split_once('.') {
        None => (mnemonic, None),
        Some((base, "s")) => (base, Some(SUFFIX_SIS)),
        Some((base, "lil")) => (base, Some(SUFFIX_LIL)),
        Some(_) => return Err(AsmError::UnknownMnemonic(mnemonic.to_owned())),
    };

    if suffix.is_none() {
        if let Ok(index) = SIMPLE.binary_search_by_key(&base, |&(name, _, _)| name) {
            let (_, prefix, opcode) = SIMPLE[index];

            if prefix != 0 {
                asm.emit8(prefix)?;
            }
            asm.emit8(opcode)?;

            return expect_eol(lexer);
        }
    }

    let mnemonic_enum = Mnemonic::from_name(base)
        .ok_or_else(|| AsmError::UnknownMnemonic(mnemonic.to_owned()))?;

    // Only `add`/`adc`/`sbc` take `.s`, only `rst` takes `.lil`.
    match suffix {
        Some(SUFFIX_SIS)
            if matches!(mnemonic_enum, Mnemonic::Add | Mnemonic::Adc | Mnemonic::Sbc) => {}
        Some(SUFFIX_LIL) if mnemonic_enum == Mnemonic::Rst => {}
        Some(_) => return Err(AsmError::UnknownMnemonic(mnemonic.to_owned())),
        None => {}
    }

    if let Some(byte) = suffix {
        asm.emit8(byte)?;
    }

    let (first, second) = parse_operands(asm, lexer)?;

    use Mnemonic::*;

    match mnemonic_enum {
        Ld => ld::ld(asm, first, second),
        Add => groups::add(asm, first, second),
        Adc => groups::adc(asm, first, second),
        Sub => groups::alu8(asm, "sub", 0x90, 0xd6, first, second),
        Sbc => groups::sbc(asm, first, second),
        And => groups::alu8(asm, "and", 0xa0, 0xe6, first, second),
        Xor => groups::alu8(asm, "xor", 0xa8, 0xee, first, second),
        Or => groups::alu8(asm, "or", 0xb0, 0xf6, first, second),
        Cp => groups::alu8(asm, "cp", 0xb8, 0xfe, first, second),
        Tst => groups::tst(asm, first, second),
        Inc => groups::inc_dec(asm, true, first, second),
        Dec => groups::inc_dec(asm, false, first, second),
        Jp => groups::jp(asm, first, second),
        Jr => groups::jr(asm, first, second),
        Djnz => groups::djnz(asm, first, second),
        Call => groups::call(asm, first, second),
        Ret => groups::ret(asm, first, second),
        Rst => groups::rst(asm, first, second),
        Push => groups::push_pop(asm, true, first, second),
        Pop => groups::push_pop(asm, false, first, second),
        Ex => groups::ex(asm, first, second),
        In => groups::port_in(asm, first, second),
        Out => groups::port_out(asm, first, second),
        In0 => groups::port_in0(asm, first, second),
        Out0 => groups::port_out0(asm, first, second),
        Bit => groups::bit_op(asm, "bit", 0x40, first, second),
        Set => groups::bit_op(asm, "set", 0xc0, first, second),
        Res => groups::bit_op(asm, "res", 0x80, first, second),
        Rlc => groups::shift(asm, "rlc", 0x00, first, second),
        Rrc => groups::shift(asm, "rrc", 0x08, first, second),
        Rl => groups::shift(asm, "rl", 0x10, first, second),
        Rr => groups::shift(asm, "rr", 0x18, first, second),
        Sla => groups::shift(asm, "sla", 0x20, first, second),
        Sra => groups::shift(asm, "sra", 0x28, first, second),
        Srl => groups::shift(asm, "srl", 0x38, first, second),
        Lea => groups::lea(asm, first, second),
        Pea => groups::pea(asm, first, second),
        Mlt => groups::mlt(asm, first, second),
        Im => groups::im(asm, first, second),
    }?;

    expect_eol(lexer)
}

/// Require the line to be exhausted.
pub(crate) fn expect_eol(lexer: &mut Lexer) -> Result<(), AsmError> {
    match lexer.next_token()? {
        Token::Eol => Ok(()),
        _ => Err(AsmError::TrailingTokens),
    }
}

/// Parse zero, one or two comma-separated operands.
fn parse_operands(
    asm: &mut Assembler,
    lexer: &mut Lexer,
) -> Result<(Option<Operand>, Option<Operand>), AsmError> {
    let first = match asm.classify_operand(lexer)? {
        None => return Ok((None, None)),
        Some(operand) => operand,
    };

    if lexer.peek()? != Token::Comma {
        return Ok((Some(first), None));
    }
    lexer.next_token()?;

    match asm.classify_operand(lexer)? {
        None => Err(AsmError::SyntaxError),
        Some(second) => Ok((Some(first), Some(second))),
    }
}

/// The 3-bit register field of an 8-bit operand, `(HL)` included.
fn reg8_code(operand: &Operand) -> Option<u8> {
    match operand {
        Operand::Reg(reg) => reg.code8(),
        Operand::RegC => Some(1),
        Operand::IndReg(IndReg::Hl) => Some(6),
        _ => None,
    }
}

/// The register an operand names, the `C` ambiguity resolved to the
/// register.
fn operand_reg(operand: &Operand) -> Option<Reg> {
    match operand {
        Operand::Reg(reg) => Some(*reg),
        Operand::RegC => Some(Reg::C),
        _ => None,
    }
}

/// Arbitrate the DD/FD prefix over the operands of one instruction.
///
/// Mixing IX with IY is an error, and so is an index half next to plain
/// H or L.
fn index_prefix(operands: &[&Operand]) -> Result<Option<u8>, AsmError> {
    let mut prefix = None;
    let mut has_half = false;
    let mut has_hl8 = false;

    for operand in operands {
        let (wants, half, hl8) = match operand {
            Operand::Reg(reg) => {
                (reg.index_prefix(), reg.is_index_half(), matches!(reg, Reg::H | Reg::L))
            }
            Operand::IxOff(_) | Operand::IndReg(IndReg::Ix) => {
                (Some(tables::PREFIX_IX), false, false)
            }
            Operand::IyOff(_) | Operand::IndReg(IndReg::Iy) => {
                (Some(tables::PREFIX_IY), false, false)
            }
            _ => (None, false, false),
        };

        if let Some(wanted) = wants {
            match prefix {
                None => prefix = Some(wanted),
                Some(previous) if previous != wanted => return Err(AsmError::IndexMix),
                Some(_) => {}
            }
        }

        has_half |= half;
        has_hl8 |= hl8;
    }

    if has_half && has_hl8 {
        return Err(AsmError::IndexHalfWithHl);
    }

    Ok(prefix)
}

/// Emit the signed 8-bit displacement that follows (or, under CB,
/// precedes) an indexed opcode.
fn emit_displacement(asm: &mut Assembler, expr: Expr) -> Result<(), AsmError> {
    match expr {
        Expr::Const(value) => {
            if !(-128..=127).contains(&value) {
                return Err(AsmError::DisplacementOutOfRange(value));
            }

            asm.emit8((value & 0xff) as u8)
        }
        Expr::Rel(..) => {
            // Report and keep emitting: aborting here would desync the
            // pass-1 sizes.
            if asm.pass == Pass::Second {
                asm.report(AsmError::Relocatable("index displacement"));
            }

            asm.emit8((expr.value() & 0xff) as u8)
        }
    }
}

/// Emit a relative-jump displacement. `disp = target - (pc + 2)`,
/// measured from the byte after the displacement.
fn emit_relative(asm: &mut Assembler, target: Expr) -> Result<(), AsmError> {
    if matches!(target, Expr::Rel(_, crate::expr::Reloc::External(_))) {
        return Err(AsmError::JumpToExternal);
    }

    // The opcode byte was already emitted, so the displacement base is
    // pc + 1.
    let displacement = target.value().wrapping_sub(asm.pc().wrapping_add(1)) & 0xff_ffff;
    // Sign-extend from 24 bits.
    let displacement = (displacement << 8) >> 8;

    // Report and keep emitting, so both passes stay in step.
    if asm.pass == Pass::Second && !(-128..=127).contains(&displacement) {
        asm.report(AsmError::JumpOutOfRange(displacement));
    }

    asm.emit8((displacement & 0xff) as u8)
}

/// `(IX)`/`(IY)` mean a zero displacement wherever a displacement is
/// legal.
fn normalize_index(operand: Operand) -> Operand {
    match operand {
        Operand::IndReg(IndReg::Ix) => Operand::IxOff(Expr::Const(0)),
        Operand::IndReg(IndReg::Iy) => Operand::IyOff(Expr::Const(0)),
        operand => operand,
    }
}
