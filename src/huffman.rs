// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2025 Au-Zone Technologies. All Rights Reserved.

//! Canonical Huffman code generation for the encoder table memory.
//!
//! Tables are specified the way the JPEG standard describes them, as the
//! number of codes of each length plus the symbols in increasing code
//! order. The hardware instead wants a per-symbol lookup of (length, code)
//! pairs, directly indexed for the DC classes and indexed by the
//! nibble-swapped symbol for the AC classes, because the entropy stage
//! enumerates run/size pairs in swapped-nibble order.

/// Number of slots in a DC class lookup table.
pub const DC_TABLE_WIDTH: usize = 12;

/// Number of slots in an AC class lookup table.
pub const AC_TABLE_WIDTH: usize = 256;

/// Maximum number of symbols in an AC class specification.
pub const AC_MAX_SYMBOLS: usize = 162;

/// Huffman table specification: `counts[i]` is the number of codes of
/// length `i + 1`, and `symbols` lists the coded symbols in increasing
/// code order.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct HuffSpec {
    pub counts: [u8; 16],
    pub symbols: Vec<u8>,
}

/// Table class, deciding the lookup width and symbol indexing.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum TableClass {
    Dc,
    Ac,
}

/// Per-symbol (code length, code value) lookup in the layout the table
/// memory expects. Slots without a code are zero.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct HwHuffTable {
    class: TableClass,
    slots: Vec<(u16, u16)>,
}

impl HwHuffTable {
    /// Assigns canonical codes to the specification and scatters them into
    /// the hardware lookup layout.
    ///
    /// Codes are assigned walking lengths 1..15 in increasing order; within
    /// one length, codes are consecutive in symbol order, and each length
    /// starts at twice the sum of the previous start and count. Symbols must
    /// be valid for the class: below 12 for DC tables, any byte for AC
    /// tables. Codes longer than 15 bits are not representable in the table
    /// memory and their symbols are left without a code.
    pub fn build(spec: &HuffSpec, class: TableClass) -> Self {
        let width = match class {
            TableClass::Dc => DC_TABLE_WIDTH,
            TableClass::Ac => AC_TABLE_WIDTH,
        };

        let mut codes: Vec<(u16, u16)> = Vec::with_capacity(spec.symbols.len());
        let mut next: u16 = 0;
        for (length, count) in (1u16..16).zip(spec.counts) {
            let mut code = next;
            for _ in 0..count {
                codes.push((length, code));
                code += 1;
            }
            next = 2 * (next + count as u16);
        }

        let mut slots = vec![(0u16, 0u16); width];
        for (&symbol, &code) in spec.symbols.iter().zip(&codes) {
            let index = match class {
                TableClass::Dc => symbol as usize,
                TableClass::Ac => symbol.rotate_left(4) as usize,
            };
            slots[index] = code;
        }
        Self { class, slots }
    }

    pub fn class(&self) -> TableClass {
        self.class
    }

    /// All (length, code) slots in lookup order.
    pub fn slots(&self) -> &[(u16, u16)] {
        &self.slots
    }
}
