//! Fixed encoding tables.
//!
//! The simple-instruction table is sorted by mnemonic and searched with
//! a binary search over the lowercased name. The 24-bit pair-load rows
//! are irregular on the eZ80 and must come from a table, not a formula.

/// Prefix byte for ED-page opcodes.
pub(crate) const PREFIX_ED: u8 = 0xed;

/// Prefix byte selecting IX.
pub(crate) const PREFIX_IX: u8 = 0xdd;

/// Prefix byte selecting IY.
pub(crate) const PREFIX_IY: u8 = 0xfd;

/// Prefix byte for CB-page (bit/shift) opcodes.
pub(crate) const PREFIX_CB: u8 = 0xcb;

/// Suffix byte of the `.s` (short mode) instruction variants.
pub(crate) const SUFFIX_SIS: u8 = 0x40;

/// Suffix byte of the `.lil` (long mode) instruction variants.
pub(crate) const SUFFIX_LIL: u8 = 0x5b;

/// No-operand instructions: `(mnemonic, prefix, opcode)`, prefix 0 means
/// none. Sorted by mnemonic.
pub(crate) const SIMPLE: &[(&str, u8, u8)] = &[
    ("ccf", 0, 0x3f),
    ("cpd", PREFIX_ED, 0xa9),
    ("cpdr", PREFIX_ED, 0xb9),
    ("cpi", PREFIX_ED, 0xa1),
    ("cpir", PREFIX_ED, 0xb1),
    ("cpl", 0, 0x2f),
    ("daa", 0, 0x27),
    ("di", 0, 0xf3),
    ("ei", 0, 0xfb),
    ("exx", 0, 0xd9),
    ("halt", 0, 0x76),
    ("ind", PREFIX_ED, 0xaa),
    ("ind2", PREFIX_ED, 0x8c),
    ("ind2r", PREFIX_ED, 0x9c),
    ("indm", PREFIX_ED, 0x8a),
    ("indmr", PREFIX_ED, 0x9a),
    ("indr", PREFIX_ED, 0xba),
    ("ini", PREFIX_ED, 0xa2),
    ("ini2", PREFIX_ED, 0x84),
    ("ini2r", PREFIX_ED, 0x94),
    ("inim", PREFIX_ED, 0x82),
    ("inimr", PREFIX_ED, 0x92),
    ("inir", PREFIX_ED, 0xb2),
    ("ldd", PREFIX_ED, 0xa8),
    ("lddr", PREFIX_ED, 0xb8),
    ("ldi", PREFIX_ED, 0xa0),
    ("ldir", PREFIX_ED, 0xb0),
    ("neg", PREFIX_ED, 0x44),
    ("nop", 0, 0x00),
    ("otd2r", PREFIX_ED, 0xbc),
    ("otdm", PREFIX_ED, 0x8b),
    ("otdmr", PREFIX_ED, 0x9b),
    ("otdr", PREFIX_ED, 0xbb),
    ("oti2r", PREFIX_ED, 0xb4),
    ("otim", PREFIX_ED, 0x83),
    ("otimr", PREFIX_ED, 0x93),
    ("otir", PREFIX_ED, 0xb3),
    ("outd", PREFIX_ED, 0xab),
    ("outd2", PREFIX_ED, 0xac),
    ("outi", PREFIX_ED, 0xa3),
    ("outi2", PREFIX_ED, 0xa4),
    ("reti", PREFIX_ED, 0x4d),
    ("retn", PREFIX_ED, 0x45),
    ("rla", 0, 0x17),
    ("rlca", 0, 0x07),
    ("rld", PREFIX_ED, 0x6f),
    ("rra", 0, 0x1f),
    ("rrca", 0, 0x0f),
    ("rrd", PREFIX_ED, 0x67),
    ("rsmix", PREFIX_ED, 0x7e),
    ("scf", 0, 0x37),
    ("slp", PREFIX_ED, 0x76),
    ("stmix", PREFIX_ED, 0x7d),
];

/// One row of the 24-bit register-pair load tables.
#[derive(Debug, Clone, Copy)]
pub(crate) struct PairLoad {
    /// Opcode loading the pair from memory.
    pub load: u8,
    /// Opcode storing the pair to memory.
    pub store: u8,
}

/// Pair loads through `(HL)`, ED-prefixed. Rows: BC, DE, HL, IX, IY.
pub(crate) const PAIR_VIA_HL: [PairLoad; 5] = [
    PairLoad { load: 0x07, store: 0x0f },
    PairLoad { load: 0x17, store: 0x1f },
    PairLoad { load: 0x27, store: 0x2f },
    PairLoad { load: 0x37, store: 0x3f },
    PairLoad { load: 0x31, store: 0x3e },
];

/// Pair loads through `(IX+d)`, DD-prefixed. Rows: BC, DE, HL, IX, IY.
pub(crate) const PAIR_VIA_IX: [PairLoad; 5] = [
    PairLoad { load: 0x07, store: 0x0f },
    PairLoad { load: 0x17, store: 0x1f },
    PairLoad { load: 0x27, store: 0x2f },
    PairLoad { load: 0x37, store: 0x3e },
    PairLoad { load: 0x31, store: 0x3d },
];

/// Pair loads through `(IY+d)`, FD-prefixed. Rows: BC, DE, HL, IX, IY.
pub(crate) const PAIR_VIA_IY: [PairLoad; 5] = [
    PairLoad { load: 0x07, store: 0x0f },
    PairLoad { load: 0x17, store: 0x1f },
    PairLoad { load: 0x27, store: 0x2f },
    PairLoad { load: 0x31, store: 0x3d },
    PairLoad { load: 0x37, store: 0x3e },
];

/// `LEA rr, IX+d` opcodes (ED page). Rows: BC, DE, HL, IX, IY.
pub(crate) const LEA_FROM_IX: [u8; 5] = [0x02, 0x12, 0x22, 0x32, 0x55];

/// `LEA rr, IY+d` opcodes (ED page). Rows: BC, DE, HL, IX, IY.
pub(crate) const LEA_FROM_IY: [u8; 5] = [0x03, 0x13, 0x23, 0x54, 0x33];

/// `LD` pairs with one fixed encoding: `(dest, src, prefix, opcode)`,
/// prefix 0 means none.
pub(crate) const LD_SPECIAL: &[(crate::operand::Reg, crate::operand::Reg, u8, u8)] = {
    use crate::operand::Reg::*;

    &[
        (Sp, Hl, 0, 0xf9),
        (Sp, Ix, PREFIX_IX, 0xf9),
        (Sp, Iy, PREFIX_IY, 0xf9),
        (I, A, PREFIX_ED, 0x47),
        (R, A, PREFIX_ED, 0x4f),
        (A, I, PREFIX_ED, 0x57),
        (A, R, PREFIX_ED, 0x5f),
        (A, Mb, PREFIX_ED, 0x6e),
        (Mb, A, PREFIX_ED, 0x6d),
    ]
};

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_simple_table_is_sorted() {
        for pair in SIMPLE.windows(2) {
            assert!(pair[0].0 < pair[1].0, "{} must sort before {}", pair[0].0, pair[1].0);
        }
    }

    #[test]
    fn test_simple_lookup() {
        let find = |name: &str| {
            SIMPLE
                .binary_search_by_key(&name, |&(mnemonic, _, _)| mnemonic)
                .ok()
                .map(|index| (SIMPLE[index].1, SIMPLE[index].2))
        };

        assert_eq!(find("nop"), Some((0, 0x00)));
        assert_eq!(find("ldir"), Some((PREFIX_ED, 0xb0)));
        assert_eq!(find("halt"), Some((0, 0x76)));
        assert_eq!(find("ld"), None);
    }
}
