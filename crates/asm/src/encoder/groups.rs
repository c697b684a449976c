//! Encoders for everything that is not `LD` or table-only.

use super::{
    emit_displacement, emit_relative, index_prefix, normalize_index, operand_reg, reg8_code,
    tables::{LEA_FROM_IX, LEA_FROM_IY, PREFIX_CB, PREFIX_ED, PREFIX_IX, PREFIX_IY},
};
use crate::{
    assembler::{Assembler, Pass},
    error::AsmError,
    expr::Expr,
    operand::{Cond, IndReg, Operand, Reg},
};

/// The single source of an ALU-style operation: either `op a, x` or the
/// implied-accumulator `op x`.
fn alu_source(
    name: &'static str,
    first: Option<Operand>,
    second: Option<Operand>,
) -> Result<Operand, AsmError> {
    match (first, second) {
        (Some(Operand::Reg(Reg::A)), Some(source)) => Ok(source),
        (Some(source), None) => Ok(source),
        _ => Err(AsmError::InvalidOperands(name)),
    }
}

/// The 8-bit ALU family: a register column, an `(IX+d)` column and an
/// immediate opcode.
pub(super) fn alu8(
    asm: &mut Assembler,
    name: &'static str,
    base: u8,
    immediate: u8,
    first: Option<Operand>,
    second: Option<Operand>,
) -> Result<(), AsmError> {
    let source = normalize_index(alu_source(name, first, second)?);

    match source {
        Operand::IxOff(offset) => {
            asm.emit8(PREFIX_IX)?;
            asm.emit8(base | 6)?;
            emit_displacement(asm, offset)
        }
        Operand::IyOff(offset) => {
            asm.emit8(PREFIX_IY)?;
            asm.emit8(base | 6)?;
            emit_displacement(asm, offset)
        }
        Operand::Imm(value) => {
            asm.emit8(immediate)?;
            asm.emit8_expr(value, "immediate operand")
        }
        ref source if reg8_code(source).is_some() => {
            if let Some(prefix) = index_prefix(&[source])? {
                asm.emit8(prefix)?;
            }

            asm.emit8(base | reg8_code(source).expect("guard checked the register"))
        }
        _ => Err(AsmError::InvalidOperands(name)),
    }
}

pub(super) fn add(
    asm: &mut Assembler,
    first: Option<Operand>,
    second: Option<Operand>,
) -> Result<(), AsmError> {
    if let (Some(Operand::Reg(dest)), Some(Operand::Reg(source))) = (first, second) {
        match dest {
            Reg::Hl => {
                let pair = source.pair_dd().ok_or(AsmError::InvalidOperands("add"))?;

                return asm.emit8(0x09 | pair << 4);
            }
            Reg::Ix | Reg::Iy => {
                // {BC, DE, SP, same-as-destination}; HL or the other
                // index register is invalid here.
                let pair = match source {
                    Reg::Bc => 0,
                    Reg::De => 1,
                    Reg::Sp => 3,
                    source if source == dest => 2,
                    _ => return Err(AsmError::InvalidOperands("add")),
                };

                asm.emit8(if dest == Reg::Ix { PREFIX_IX } else { PREFIX_IY })?;

                return asm.emit8(0x09 | pair << 4);
            }
            _ => {}
        }
    }

    alu8(asm, "add", 0x80, 0xc6, first, second)
}

pub(super) fn adc(
    asm: &mut Assembler,
    first: Option<Operand>,
    second: Option<Operand>,
) -> Result<(), AsmError> {
    if let (Some(Operand::Reg(Reg::Hl)), Some(Operand::Reg(source))) = (first, second) {
        let pair = source.pair_dd().ok_or(AsmError::InvalidOperands("adc"))?;

        asm.emit8(PREFIX_ED)?;

        return asm.emit8(0x4a | pair << 4);
    }

    alu8(asm, "adc", 0x88, 0xce, first, second)
}

pub(super) fn sbc(
    asm: &mut Assembler,
    first: Option<Operand>,
    second: Option<Operand>,
) -> Result<(), AsmError> {
    if let (Some(Operand::Reg(Reg::Hl)), Some(Operand::Reg(source))) = (first, second) {
        let pair = source.pair_dd().ok_or(AsmError::InvalidOperands("sbc"))?;

        asm.emit8(PREFIX_ED)?;

        return asm.emit8(0x42 | pair << 4);
    }

    alu8(asm, "sbc", 0x98, 0xde, first, second)
}

/// `TST A, x` (eZ80): register, `(HL)` or immediate. No index forms.
pub(super) fn tst(
    asm: &mut Assembler,
    first: Option<Operand>,
    second: Option<Operand>,
) -> Result<(), AsmError> {
    let source = alu_source("tst", first, second)?;

    if let Some(reg) = operand_reg(&source) {
        if reg.is_index_half() {
            return Err(AsmError::InvalidOperands("tst"));
        }
    }

    match source {
        Operand::Imm(value) => {
            asm.emit8(PREFIX_ED)?;
            asm.emit8(0x64)?;
            asm.emit8_expr(value, "immediate operand")
        }
        ref source if reg8_code(source).is_some() => {
            asm.emit8(PREFIX_ED)?;
            asm.emit8(0x04 | reg8_code(source).expect("guard checked the register") << 3)
        }
        _ => Err(AsmError::InvalidOperands("tst")),
    }
}

pub(super) fn inc_dec(
    asm: &mut Assembler,
    increment: bool,
    first: Option<Operand>,
    second: Option<Operand>,
) -> Result<(), AsmError> {
    let name = if increment { "inc" } else { "dec" };

    if second.is_some() {
        return Err(AsmError::InvalidOperands(name));
    }

    let operand = normalize_index(first.ok_or(AsmError::InvalidOperands(name))?);

    match operand {
        Operand::Reg(Reg::Ix) => {
            asm.emit8(PREFIX_IX)?;
            asm.emit8(if increment { 0x23 } else { 0x2b })
        }
        Operand::Reg(Reg::Iy) => {
            asm.emit8(PREFIX_IY)?;
            asm.emit8(if increment { 0x23 } else { 0x2b })
        }
        Operand::Reg(pair) if pair.pair_dd().is_some() => {
            let code = pair.pair_dd().expect("guard checked the pair");

            asm.emit8(if increment { 0x03 | code << 4 } else { 0x0b | code << 4 })
        }
        Operand::IxOff(offset) => {
            asm.emit8(PREFIX_IX)?;
            asm.emit8(if increment { 0x34 } else { 0x35 })?;
            emit_displacement(asm, offset)
        }
        Operand::IyOff(offset) => {
            asm.emit8(PREFIX_IY)?;
            asm.emit8(if increment { 0x34 } else { 0x35 })?;
            emit_displacement(asm, offset)
        }
        ref operand if reg8_code(operand).is_some() => {
            if let Some(prefix) = index_prefix(&[operand])? {
                asm.emit8(prefix)?;
            }

            let code = reg8_code(operand).expect("guard checked the register");

            asm.emit8(if increment { 0x04 | code << 3 } else { 0x05 | code << 3 })
        }
        _ => Err(AsmError::InvalidOperands(name)),
    }
}

/// Shared tail of the CB-prefixed operations. `column` already carries
/// the operation and, for bit ops, the bit number.
fn cb_encode(
    asm: &mut Assembler,
    name: &'static str,
    column: u8,
    operand: Operand,
) -> Result<(), AsmError> {
    match operand {
        Operand::IxOff(offset) => {
            asm.emit8(PREFIX_IX)?;
            asm.emit8(PREFIX_CB)?;
            // The displacement precedes the opcode under CB, a quirk
            // inherited from the Z80.
            emit_displacement(asm, offset)?;
            asm.emit8(column | 6)
        }
        Operand::IyOff(offset) => {
            asm.emit8(PREFIX_IY)?;
            asm.emit8(PREFIX_CB)?;
            emit_displacement(asm, offset)?;
            asm.emit8(column | 6)
        }
        ref operand if reg8_code(operand).is_some() => {
            if operand_reg(operand).is_some_and(Reg::is_index_half) {
                return Err(AsmError::InvalidOperands(name));
            }

            asm.emit8(PREFIX_CB)?;
            asm.emit8(column | reg8_code(operand).expect("guard checked the register"))
        }
        _ => Err(AsmError::InvalidOperands(name)),
    }
}

pub(super) fn shift(
    asm: &mut Assembler,
    name: &'static str,
    base: u8,
    first: Option<Operand>,
    second: Option<Operand>,
) -> Result<(), AsmError> {
    if second.is_some() {
        return Err(AsmError::InvalidOperands(name));
    }

    let operand = normalize_index(first.ok_or(AsmError::InvalidOperands(name))?);

    cb_encode(asm, name, base, operand)
}

pub(super) fn bit_op(
    asm: &mut Assembler,
    name: &'static str,
    base: u8,
    first: Option<Operand>,
    second: Option<Operand>,
) -> Result<(), AsmError> {
    let bit = match first {
        Some(Operand::Imm(Expr::Const(bit))) if (0..=7).contains(&bit) => bit as u8,
        // A forward reference sizes the same either way in pass 1.
        Some(Operand::Imm(Expr::Rel(..))) if asm.pass == Pass::First => 0,
        Some(Operand::Imm(_)) => return Err(AsmError::BitNumber),
        _ => return Err(AsmError::InvalidOperands(name)),
    };

    let operand = normalize_index(second.ok_or(AsmError::InvalidOperands(name))?);

    cb_encode(asm, name, base | bit << 3, operand)
}

pub(super) fn jp(
    asm: &mut Assembler,
    first: Option<Operand>,
    second: Option<Operand>,
) -> Result<(), AsmError> {
    match (first, second) {
        (Some(condition), Some(target)) => {
            let condition = condition.condition().ok_or(AsmError::InvalidOperands("jp"))?;
            let target = target_expr(target).ok_or(AsmError::InvalidOperands("jp"))?;

            asm.emit8(0xc2 | condition.code() << 3)?;
            asm.emit24_expr(target)
        }
        (Some(Operand::IndReg(IndReg::Hl)), None) => asm.emit8(0xe9),
        (Some(Operand::IndReg(IndReg::Ix)), None) => {
            asm.emit8(PREFIX_IX)?;
            asm.emit8(0xe9)
        }
        (Some(Operand::IndReg(IndReg::Iy)), None) => {
            asm.emit8(PREFIX_IY)?;
            asm.emit8(0xe9)
        }
        (Some(target), None) => {
            let target = target_expr(target).ok_or(AsmError::InvalidOperands("jp"))?;

            asm.emit8(0xc3)?;
            asm.emit24_expr(target)
        }
        _ => Err(AsmError::InvalidOperands("jp")),
    }
}

pub(super) fn call(
    asm: &mut Assembler,
    first: Option<Operand>,
    second: Option<Operand>,
) -> Result<(), AsmError> {
    match (first, second) {
        (Some(condition), Some(target)) => {
            let condition = condition.condition().ok_or(AsmError::InvalidOperands("call"))?;
            let target = target_expr(target).ok_or(AsmError::InvalidOperands("call"))?;

            asm.emit8(0xc4 | condition.code() << 3)?;
            asm.emit24_expr(target)
        }
        (Some(target), None) => {
            let target = target_expr(target).ok_or(AsmError::InvalidOperands("call"))?;

            asm.emit8(0xcd)?;
            asm.emit24_expr(target)
        }
        _ => Err(AsmError::InvalidOperands("call")),
    }
}

pub(super) fn jr(
    asm: &mut Assembler,
    first: Option<Operand>,
    second: Option<Operand>,
) -> Result<(), AsmError> {
    match (first, second) {
        (Some(condition), Some(target)) => {
            let condition = condition.condition().ok_or(AsmError::InvalidOperands("jr"))?;

            // `JR` only has the flag conditions.
            if !matches!(condition, Cond::Nz | Cond::Z | Cond::Nc | Cond::C) {
                return Err(AsmError::InvalidJrCondition);
            }

            let target = target_expr(target).ok_or(AsmError::InvalidOperands("jr"))?;

            asm.emit8(0x20 | condition.code() << 3)?;
            emit_relative(asm, target)
        }
        (Some(target), None) => {
            let target = target_expr(target).ok_or(AsmError::InvalidOperands("jr"))?;

            asm.emit8(0x18)?;
            emit_relative(asm, target)
        }
        _ => Err(AsmError::InvalidOperands("jr")),
    }
}

pub(super) fn djnz(
    asm: &mut Assembler,
    first: Option<Operand>,
    second: Option<Operand>,
) -> Result<(), AsmError> {
    match (first, second) {
        (Some(target), None) => {
            let target = target_expr(target).ok_or(AsmError::InvalidOperands("djnz"))?;

            asm.emit8(0x10)?;
            emit_relative(asm, target)
        }
        _ => Err(AsmError::InvalidOperands("djnz")),
    }
}

pub(super) fn ret(
    asm: &mut Assembler,
    first: Option<Operand>,
    second: Option<Operand>,
) -> Result<(), AsmError> {
    match (first, second) {
        (None, None) => asm.emit8(0xc9),
        (Some(condition), None) => {
            let condition = condition.condition().ok_or(AsmError::InvalidOperands("ret"))?;

            asm.emit8(0xc0 | condition.code() << 3)
        }
        _ => Err(AsmError::InvalidOperands("ret")),
    }
}

pub(super) fn rst(
    asm: &mut Assembler,
    first: Option<Operand>,
    second: Option<Operand>,
) -> Result<(), AsmError> {
    let value = match (first, second) {
        (Some(Operand::Imm(Expr::Const(value))), None) => value,
        (Some(Operand::Imm(Expr::Rel(..))), None) if asm.pass == Pass::First => 0,
        _ => return Err(AsmError::InvalidOperands("rst")),
    };

    // `0..7` selects a vector, anything else must be the pre-scaled
    // vector address itself.
    let vector = match value {
        0..=7 => value * 8,
        _ if value % 8 == 0 && (0..=0x38).contains(&value) => value,
        _ => return Err(AsmError::RstVector(value)),
    };

    asm.emit8(0xc7 | vector as u8)
}

pub(super) fn push_pop(
    asm: &mut Assembler,
    push: bool,
    first: Option<Operand>,
    second: Option<Operand>,
) -> Result<(), AsmError> {
    let name = if push { "push" } else { "pop" };

    let reg = match (first, second) {
        (Some(Operand::Reg(reg)), None) => reg,
        _ => return Err(AsmError::InvalidOperands(name)),
    };

    match reg {
        Reg::Ix => {
            asm.emit8(PREFIX_IX)?;
            asm.emit8(if push { 0xe5 } else { 0xe1 })
        }
        Reg::Iy => {
            asm.emit8(PREFIX_IY)?;
            asm.emit8(if push { 0xe5 } else { 0xe1 })
        }
        reg => {
            let pair = reg.pair_qq().ok_or(AsmError::InvalidOperands(name))?;

            asm.emit8(if push { 0xc5 | pair << 4 } else { 0xc1 | pair << 4 })
        }
    }
}

pub(super) fn ex(
    asm: &mut Assembler,
    first: Option<Operand>,
    second: Option<Operand>,
) -> Result<(), AsmError> {
    match (first, second) {
        (Some(Operand::Reg(Reg::De)), Some(Operand::Reg(Reg::Hl))) => asm.emit8(0xeb),
        (Some(Operand::Reg(Reg::Af)), Some(Operand::Reg(Reg::AfAlt))) => asm.emit8(0x08),
        (Some(Operand::IndReg(IndReg::Sp)), Some(Operand::Reg(Reg::Hl))) => asm.emit8(0xe3),
        (Some(Operand::IndReg(IndReg::Sp)), Some(Operand::Reg(Reg::Ix))) => {
            asm.emit8(PREFIX_IX)?;
            asm.emit8(0xe3)
        }
        (Some(Operand::IndReg(IndReg::Sp)), Some(Operand::Reg(Reg::Iy))) => {
            asm.emit8(PREFIX_IY)?;
            asm.emit8(0xe3)
        }
        _ => Err(AsmError::InvalidOperands("ex")),
    }
}

/// A plain 8-bit register for the I/O instructions.
fn io_reg(operand: &Operand) -> Option<u8> {
    match operand_reg(operand) {
        Some(reg) if !reg.is_index_half() => reg.code8(),
        _ => None,
    }
}

pub(super) fn port_in(
    asm: &mut Assembler,
    first: Option<Operand>,
    second: Option<Operand>,
) -> Result<(), AsmError> {
    match (first, second) {
        (Some(Operand::Reg(Reg::A)), Some(Operand::Addr(port))) => {
            asm.emit8(0xdb)?;
            asm.emit8_expr(port, "port")
        }
        (Some(ref reg), Some(Operand::IndReg(IndReg::C))) if io_reg(reg).is_some() => {
            asm.emit8(PREFIX_ED)?;
            asm.emit8(0x40 | io_reg(reg).expect("guard checked the register") << 3)
        }
        _ => Err(AsmError::InvalidOperands("in")),
    }
}

pub(super) fn port_out(
    asm: &mut Assembler,
    first: Option<Operand>,
    second: Option<Operand>,
) -> Result<(), AsmError> {
    match (first, second) {
        (Some(Operand::Addr(port)), Some(Operand::Reg(Reg::A))) => {
            asm.emit8(0xd3)?;
            asm.emit8_expr(port, "port")
        }
        (Some(Operand::IndReg(IndReg::C)), Some(ref reg)) if io_reg(reg).is_some() => {
            asm.emit8(PREFIX_ED)?;
            asm.emit8(0x41 | io_reg(reg).expect("guard checked the register") << 3)
        }
        _ => Err(AsmError::InvalidOperands("out")),
    }
}

pub(super) fn port_in0(
    asm: &mut Assembler,
    first: Option<Operand>,
    second: Option<Operand>,
) -> Result<(), AsmError> {
    match (first, second) {
        (Some(ref reg), Some(Operand::Addr(port))) if io_reg(reg).is_some() => {
            asm.emit8(PREFIX_ED)?;
            asm.emit8(io_reg(reg).expect("guard checked the register") << 3)?;
            asm.emit8_expr(port, "port")
        }
        _ => Err(AsmError::InvalidOperands("in0")),
    }
}

pub(super) fn port_out0(
    asm: &mut Assembler,
    first: Option<Operand>,
    second: Option<Operand>,
) -> Result<(), AsmError> {
    match (first, second) {
        (Some(Operand::Addr(port)), Some(ref reg)) if io_reg(reg).is_some() => {
            asm.emit8(PREFIX_ED)?;
            asm.emit8(0x01 | io_reg(reg).expect("guard checked the register") << 3)?;
            asm.emit8_expr(port, "port")
        }
        _ => Err(AsmError::InvalidOperands("out0")),
    }
}

pub(super) fn lea(
    asm: &mut Assembler,
    first: Option<Operand>,
    second: Option<Operand>,
) -> Result<(), AsmError> {
    let (dest, source) = match (first, second) {
        (Some(Operand::Reg(dest)), Some(source)) => (dest, normalize_index(source)),
        _ => return Err(AsmError::InvalidOperands("lea")),
    };

    let row = dest.pair_load_index().ok_or(AsmError::InvalidOperands("lea"))?;

    match source {
        Operand::IxOff(offset) => {
            asm.emit8(PREFIX_ED)?;
            asm.emit8(LEA_FROM_IX[row])?;
            emit_displacement(asm, offset)
        }
        Operand::IyOff(offset) => {
            asm.emit8(PREFIX_ED)?;
            asm.emit8(LEA_FROM_IY[row])?;
            emit_displacement(asm, offset)
        }
        _ => Err(AsmError::InvalidOperands("lea")),
    }
}

pub(super) fn pea(
    asm: &mut Assembler,
    first: Option<Operand>,
    second: Option<Operand>,
) -> Result<(), AsmError> {
    let source = match (first, second) {
        (Some(source), None) => normalize_index(source),
        _ => return Err(AsmError::InvalidOperands("pea")),
    };

    match source {
        Operand::IxOff(offset) => {
            asm.emit8(PREFIX_ED)?;
            asm.emit8(0x65)?;
            emit_displacement(asm, offset)
        }
        Operand::IyOff(offset) => {
            asm.emit8(PREFIX_ED)?;
            asm.emit8(0x66)?;
            emit_displacement(asm, offset)
        }
        _ => Err(AsmError::InvalidOperands("pea")),
    }
}

pub(super) fn mlt(
    asm: &mut Assembler,
    first: Option<Operand>,
    second: Option<Operand>,
) -> Result<(), AsmError> {
    match (first, second) {
        (Some(Operand::Reg(reg)), None) => {
            let pair = reg.pair_dd().ok_or(AsmError::InvalidOperands("mlt"))?;

            asm.emit8(PREFIX_ED)?;
            asm.emit8(0x4c | pair << 4)
        }
        _ => Err(AsmError::InvalidOperands("mlt")),
    }
}

pub(super) fn im(
    asm: &mut Assembler,
    first: Option<Operand>,
    second: Option<Operand>,
) -> Result<(), AsmError> {
    let mode = match (first, second) {
        (Some(Operand::Imm(Expr::Const(mode))), None) => mode,
        (Some(Operand::Imm(Expr::Rel(..))), None) if asm.pass == Pass::First => 0,
        _ => return Err(AsmError::InvalidOperands("im")),
    };

    let opcode = match mode {
        0 => 0x46,
        1 => 0x56,
        2 => 0x5e,
        _ => return Err(AsmError::InterruptMode),
    };

    asm.emit8(PREFIX_ED)?;
    asm.emit8(opcode)
}

/// The expression of a jump or call target: a bare expression, or one in
/// parentheses.
fn target_expr(operand: Operand) -> Option<Expr> {
    match operand {
        Operand::Imm(expr) | Operand::Addr(expr) => Some(expr),
        _ => None,
    }
}
