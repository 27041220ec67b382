//! Table-accelerated round transform.
//!
//! By linearity of `L`, `T(a0‖a1‖a2‖a3)` is the XOR of four lookups into
//! tables that precombine the S-box with `L` for each byte position. The
//! tables are built at compile time.

use crate::round::l;
use crate::sbox::SBOX;

use super::RoundTransform;

/// One 256-entry table: byte -> `L` applied to the substituted byte at its lane.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RoundTable {
    data: [u32; 256],
}

impl RoundTable {
    /// Builds the table for the byte lane starting at bit `shift`.
    const fn for_lane(shift: u32) -> Self {
        let mut data = [0u32; 256];
        let mut i = 0;
        while i < 256 {
            data[i] = l((SBOX[i] as u32) << shift);
            i += 1;
        }
        Self { data }
    }

    /// Reads the entry for `x`.
    #[inline]
    pub fn get(&self, x: u8) -> u32 {
        self.data[x as usize]
    }
}

/// The four lane tables, most significant byte first.
pub static ROUND_TABLES: [RoundTable; 4] = [
    RoundTable::for_lane(24),
    RoundTable::for_lane(16),
    RoundTable::for_lane(8),
    RoundTable::for_lane(0),
];

/// Round transform backed by [`ROUND_TABLES`].
#[derive(Clone, Copy, Debug, Default)]
pub struct TableAccelerated;

impl RoundTransform for TableAccelerated {
    #[inline]
    fn t(word: u32) -> u32 {
        let [a0, a1, a2, a3] = word.to_be_bytes();
        ROUND_TABLES[0].get(a0)
            ^ ROUND_TABLES[1].get(a1)
            ^ ROUND_TABLES[2].get(a2)
            ^ ROUND_TABLES[3].get(a3)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::round::t;

    #[test]
    fn lane_tables_are_rotations_of_each_other() {
        for x in 0..=255u8 {
            let base = ROUND_TABLES[0].get(x);
            assert_eq!(ROUND_TABLES[1].get(x), base.rotate_right(8));
            assert_eq!(ROUND_TABLES[2].get(x), base.rotate_right(16));
            assert_eq!(ROUND_TABLES[3].get(x), base.rotate_right(24));
        }
    }

    #[test]
    fn single_lane_inputs_match_direct_transform() {
        for lane in 0..4u32 {
            for x in 0..=255u32 {
                let word = x << (8 * lane);
                assert_eq!(TableAccelerated::t(word), t(word), "word = {word:#010x}");
            }
        }
    }
}
