//! The `LD` decision tree.
//!
//! `LD` is the widest instruction of the family; the tree below is keyed
//! on the classified shapes of both operands. The eZ80 24-bit pair loads
//! through `(HL)`/`(IX+d)`/`(IY+d)` come out of fixed tables — the IX/IY
//! rows are irregular and cannot be computed.

use super::{
    emit_displacement, index_prefix, normalize_index, operand_reg, reg8_code,
    tables::{LD_SPECIAL, PAIR_VIA_HL, PAIR_VIA_IX, PAIR_VIA_IY, PREFIX_ED, PREFIX_IX, PREFIX_IY},
};
use crate::{
    assembler::Assembler,
    error::AsmError,
    operand::{IndReg, Operand, Reg},
};

fn is_wide(reg: Reg) -> bool {
    matches!(reg, Reg::Bc | Reg::De | Reg::Hl | Reg::Sp | Reg::Ix | Reg::Iy)
}

pub(super) fn ld(
    asm: &mut Assembler,
    first: Option<Operand>,
    second: Option<Operand>,
) -> Result<(), AsmError> {
    let (dest, src) = match (first, second) {
        (Some(dest), Some(src)) => (normalize_index(dest), normalize_index(src)),
        _ => return Err(AsmError::InvalidOperands("ld")),
    };

    // The fixed pairs first: `sp,hl`, `i,a`, `a,mb`, …
    if let (Some(d), Some(s)) = (operand_reg(&dest), operand_reg(&src)) {
        if let Some(&(_, _, prefix, opcode)) =
            LD_SPECIAL.iter().find(|&&(a, b, _, _)| a == d && b == s)
        {
            if prefix != 0 {
                asm.emit8(prefix)?;
            }

            return asm.emit8(opcode);
        }
    }

    match (dest, src) {
        // 24-bit register pairs through memory.
        (Operand::Reg(pair), Operand::IndReg(IndReg::Hl))
            if pair.pair_load_index().is_some() =>
        {
            let row = PAIR_VIA_HL[pair.pair_load_index().expect("guard checked the index")];
            asm.emit8(PREFIX_ED)?;
            asm.emit8(row.load)
        }
        (Operand::IndReg(IndReg::Hl), Operand::Reg(pair))
            if pair.pair_load_index().is_some() =>
        {
            let row = PAIR_VIA_HL[pair.pair_load_index().expect("guard checked the index")];
            asm.emit8(PREFIX_ED)?;
            asm.emit8(row.store)
        }
        (Operand::Reg(pair), Operand::IxOff(offset))
            if pair.pair_load_index().is_some() =>
        {
            let row = PAIR_VIA_IX[pair.pair_load_index().expect("guard checked the index")];
            asm.emit8(PREFIX_IX)?;
            asm.emit8(row.load)?;
            emit_displacement(asm, offset)
        }
        (Operand::Reg(pair), Operand::IyOff(offset))
            if pair.pair_load_index().is_some() =>
        {
            let row = PAIR_VIA_IY[pair.pair_load_index().expect("guard checked the index")];
            asm.emit8(PREFIX_IY)?;
            asm.emit8(row.load)?;
            emit_displacement(asm, offset)
        }
        (Operand::IxOff(offset), Operand::Reg(pair))
            if pair.pair_load_index().is_some() =>
        {
            let row = PAIR_VIA_IX[pair.pair_load_index().expect("guard checked the index")];
            asm.emit8(PREFIX_IX)?;
            asm.emit8(row.store)?;
            emit_displacement(asm, offset)
        }
        (Operand::IyOff(offset), Operand::Reg(pair))
            if pair.pair_load_index().is_some() =>
        {
            let row = PAIR_VIA_IY[pair.pair_load_index().expect("guard checked the index")];
            asm.emit8(PREFIX_IY)?;
            asm.emit8(row.store)?;
            emit_displacement(asm, offset)
        }

        // 16-bit (24 in ADL) immediates.
        (Operand::Reg(Reg::Ix), Operand::Imm(value)) => {
            asm.emit8(PREFIX_IX)?;
            asm.emit8(0x21)?;
            asm.emit24_expr(value)
        }
        (Operand::Reg(Reg::Iy), Operand::Imm(value)) => {
            asm.emit8(PREFIX_IY)?;
            asm.emit8(0x21)?;
            asm.emit24_expr(value)
        }
        (Operand::Reg(pair), Operand::Imm(value)) if pair.pair_dd().is_some() => {
            asm.emit8(0x01 | pair.pair_dd().expect("guard checked the pair") << 4)?;
            asm.emit24_expr(value)
        }

        // Wide loads and stores through an absolute address.
        (Operand::Reg(pair), Operand::Addr(address)) if is_wide(pair) => {
            match pair {
                Reg::Bc => {
                    asm.emit8(PREFIX_ED)?;
                    asm.emit8(0x4b)?;
                }
                Reg::De => {
                    asm.emit8(PREFIX_ED)?;
                    asm.emit8(0x5b)?;
                }
                Reg::Hl => asm.emit8(0x2a)?,
                Reg::Sp => {
                    asm.emit8(PREFIX_ED)?;
                    asm.emit8(0x7b)?;
                }
                Reg::Ix => {
                    asm.emit8(PREFIX_IX)?;
                    asm.emit8(0x2a)?;
                }
                _ => {
                    asm.emit8(PREFIX_IY)?;
                    asm.emit8(0x2a)?;
                }
            }

            asm.emit24_expr(address)
        }
        (Operand::Addr(address), Operand::Reg(pair)) if is_wide(pair) => {
            match pair {
                Reg::Bc => {
                    asm.emit8(PREFIX_ED)?;
                    asm.emit8(0x43)?;
                }
                Reg::De => {
                    asm.emit8(PREFIX_ED)?;
                    asm.emit8(0x53)?;
                }
                Reg::Hl => asm.emit8(0x22)?,
                Reg::Sp => {
                    asm.emit8(PREFIX_ED)?;
                    asm.emit8(0x73)?;
                }
                Reg::Ix => {
                    asm.emit8(PREFIX_IX)?;
                    asm.emit8(0x22)?;
                }
                _ => {
                    asm.emit8(PREFIX_IY)?;
                    asm.emit8(0x22)?;
                }
            }

            asm.emit24_expr(address)
        }

        // The accumulator's own memory forms.
        (Operand::Reg(Reg::A), Operand::Addr(address)) => {
            asm.emit8(0x3a)?;
            asm.emit24_expr(address)
        }
        (Operand::Addr(address), Operand::Reg(Reg::A)) => {
            asm.emit8(0x32)?;
            asm.emit24_expr(address)
        }
        (Operand::Reg(Reg::A), Operand::IndReg(IndReg::Bc)) => asm.emit8(0x0a),
        (Operand::Reg(Reg::A), Operand::IndReg(IndReg::De)) => asm.emit8(0x1a),
        (Operand::IndReg(IndReg::Bc), Operand::Reg(Reg::A)) => asm.emit8(0x02),
        (Operand::IndReg(IndReg::De), Operand::Reg(Reg::A)) => asm.emit8(0x12),

        // 8-bit loads through (IX+d)/(IY+d).
        (ref dest, Operand::IxOff(offset)) if byte_reg(dest).is_some() => {
            asm.emit8(PREFIX_IX)?;
            asm.emit8(0x46 | byte_reg(dest).expect("guard checked the register") << 3)?;
            emit_displacement(asm, offset)
        }
        (ref dest, Operand::IyOff(offset)) if byte_reg(dest).is_some() => {
            asm.emit8(PREFIX_IY)?;
            asm.emit8(0x46 | byte_reg(dest).expect("guard checked the register") << 3)?;
            emit_displacement(asm, offset)
        }
        (Operand::IxOff(offset), ref src) if byte_reg(src).is_some() => {
            asm.emit8(PREFIX_IX)?;
            asm.emit8(0x70 | byte_reg(src).expect("guard checked the register"))?;
            emit_displacement(asm, offset)
        }
        (Operand::IyOff(offset), ref src) if byte_reg(src).is_some() => {
            asm.emit8(PREFIX_IY)?;
            asm.emit8(0x70 | byte_reg(src).expect("guard checked the register"))?;
            emit_displacement(asm, offset)
        }
        (Operand::IxOff(offset), Operand::Imm(value)) => {
            asm.emit8(PREFIX_IX)?;
            asm.emit8(0x36)?;
            emit_displacement(asm, offset)?;
            asm.emit8_expr(value, "immediate operand")
        }
        (Operand::IyOff(offset), Operand::Imm(value)) => {
            asm.emit8(PREFIX_IY)?;
            asm.emit8(0x36)?;
            emit_displacement(asm, offset)?;
            asm.emit8_expr(value, "immediate operand")
        }

        // 8-bit immediate, `(HL)` included (`ld (hl), n` is 0x36).
        (ref dest, Operand::Imm(value)) if reg8_code(dest).is_some() => {
            if let Some(prefix) = index_prefix(&[dest])? {
                asm.emit8(prefix)?;
            }

            asm.emit8(0x06 | reg8_code(dest).expect("guard checked the register") << 3)?;
            asm.emit8_expr(value, "immediate operand")
        }

        // 8-bit register to register.
        (ref dest, ref src) if reg8_code(dest).is_some() && reg8_code(src).is_some() => {
            let d = reg8_code(dest).expect("guard checked the register");
            let s = reg8_code(src).expect("guard checked the register");

            // `ld (hl), (hl)` would collide with `halt`.
            if d == 6 && s == 6 {
                return Err(AsmError::InvalidOperands("ld"));
            }

            let prefix = index_prefix(&[dest, src])?;

            // An index half never combines with `(HL)`.
            if prefix.is_some() && (d == 6 || s == 6) {
                return Err(AsmError::InvalidOperands("ld"));
            }

            if let Some(prefix) = prefix {
                asm.emit8(prefix)?;
            }

            asm.emit8(0x40 | d << 3 | s)
        }

        _ => Err(AsmError::InvalidOperands("ld")),
    }
}

/// An 8-bit register field usable next to an index displacement: plain
/// registers only, no `(HL)`, no index halves.
fn byte_reg(operand: &Operand) -> Option<u8> {
    match operand_reg(operand) {
        Some(reg) if !reg.is_index_half() => reg.code8(),
        _ => None,
    }
}
