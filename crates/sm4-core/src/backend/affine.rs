//! GF(2) 8×8 matrices and byte affine maps describing the SM4 S-box.
//!
//! The S-box factors as `S(x) = A · inv(A · x ⊕ c) ⊕ c`, where `inv` is
//! inversion in GF(2^8) modulo `x^8 + x^7 + x^6 + x^5 + x^4 + x^2 + 1` and
//! `A` is circulant. The vector backend evaluates this factorisation
//! lane-parallel instead of reading a table.

/// Low byte of the field polynomial `x^8 + x^7 + x^6 + x^5 + x^4 + x^2 + 1`.
pub const FIELD_POLY: u8 = 0xf5;

/// Affine map `x -> A · x ⊕ c` applied on both sides of the inversion.
pub const SBOX_AFFINE: Affine8 = Affine8::new(
    Matrix8::from_rows([0xa7, 0x4f, 0x9e, 0x3d, 0x7a, 0xf4, 0xe9, 0xd3]),
    0xd3,
);

/// 8×8 binary matrix over GF(2), stored row-major with each row packed into a `u8`.
///
/// Bit `j` of row `i` is the coefficient of input bit `j` in output bit `i`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Matrix8 {
    rows: [u8; 8],
}

impl Matrix8 {
    /// Builds a matrix from packed rows.
    pub const fn from_rows(rows: [u8; 8]) -> Self {
        Self { rows }
    }

    /// Applies the matrix to an 8-bit value, treating bits as a column vector.
    pub const fn apply(&self, value: u8) -> u8 {
        let mut out = 0u8;
        let mut row_idx = 0;
        while row_idx < 8 {
            let parity = (self.rows[row_idx] & value).count_ones() as u8 & 1;
            out |= parity << row_idx;
            row_idx += 1;
        }
        out
    }

    /// Packed columns: bit `i` of column `j` is row `i`, bit `j`.
    pub const fn columns(&self) -> [u8; 8] {
        let mut cols = [0u8; 8];
        let mut j = 0;
        while j < 8 {
            let mut i = 0;
            while i < 8 {
                cols[j] |= ((self.rows[i] >> j) & 1) << i;
                i += 1;
            }
            j += 1;
        }
        cols
    }
}

/// 8-bit affine map `x -> lin * x ⊕ bias`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Affine8 {
    /// Linear component.
    pub lin: Matrix8,
    /// Additive bias.
    pub bias: u8,
}

impl Affine8 {
    /// Constructs a new affine map from components.
    pub const fn new(lin: Matrix8, bias: u8) -> Self {
        Self { lin, bias }
    }

    /// Applies the affine map.
    pub const fn apply(&self, value: u8) -> u8 {
        self.lin.apply(value) ^ self.bias
    }
}

/// Multiplication in GF(2^8) modulo the S-box field polynomial.
pub const fn gf_mul(mut a: u8, mut b: u8) -> u8 {
    let mut product = 0u8;
    while b != 0 {
        if b & 1 != 0 {
            product ^= a;
        }
        let carry = a & 0x80;
        a <<= 1;
        if carry != 0 {
            a ^= FIELD_POLY;
        }
        b >>= 1;
    }
    product
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sbox::SBOX;

    fn gf_inv(x: u8) -> u8 {
        (1..=255u8).find(|&y| gf_mul(x, y) == 1).unwrap_or(0)
    }

    #[test]
    fn factorisation_reproduces_the_sbox() {
        for x in 0..=255u8 {
            let inner = SBOX_AFFINE.apply(x);
            let rebuilt = SBOX_AFFINE.apply(gf_inv(inner));
            assert_eq!(rebuilt, SBOX[x as usize], "x = {x:#04x}");
        }
    }

    #[test]
    fn sbox_affine_map_is_a_bijection() {
        let mut seen = [false; 256];
        for x in 0..=255u8 {
            let y = SBOX_AFFINE.apply(x) as usize;
            assert!(!seen[y], "two inputs map to {y:#04x}");
            seen[y] = true;
        }
        assert_eq!(SBOX_AFFINE.apply(0), SBOX_AFFINE.bias);
    }

    #[test]
    fn columns_agree_with_apply() {
        let cols = SBOX_AFFINE.lin.columns();
        for (j, col) in cols.iter().enumerate() {
            assert_eq!(SBOX_AFFINE.lin.apply(1 << j), *col);
        }
    }

    #[test]
    fn field_has_multiplicative_inverses() {
        for x in 1..=255u8 {
            assert_eq!(gf_mul(x, gf_inv(x)), 1);
        }
    }
}
