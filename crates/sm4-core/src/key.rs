//! Key types for SM4.

use zeroize::{Zeroize, ZeroizeOnDrop};

/// Number of rounds, and therefore of round keys.
pub const ROUNDS: usize = 32;

/// SM4 key size in bytes.
pub const KEY_SIZE: usize = 16;

/// SM4 key wrapper.
#[derive(Clone, PartialEq, Eq, Zeroize, ZeroizeOnDrop)]
pub struct Sm4Key(pub [u8; KEY_SIZE]);

impl From<[u8; KEY_SIZE]> for Sm4Key {
    fn from(value: [u8; KEY_SIZE]) -> Self {
        Self(value)
    }
}

impl TryFrom<&[u8]> for Sm4Key {
    type Error = crate::Error;

    fn try_from(value: &[u8]) -> crate::Result<Self> {
        let bytes: [u8; KEY_SIZE] = value.try_into().map_err(|_| crate::Error::InvalidLength {
            what: "key",
            expected: "exactly 16 bytes",
            actual: value.len(),
        })?;
        Ok(Self(bytes))
    }
}

impl core::fmt::Debug for Sm4Key {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str("Sm4Key(..)")
    }
}

/// Order in which a schedule applies its round keys.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Direction {
    /// Round keys in derivation order.
    Encrypt,
    /// Round keys reversed.
    Decrypt,
}

impl Direction {
    pub(crate) const fn name(self) -> &'static str {
        match self {
            Self::Encrypt => "encrypting",
            Self::Decrypt => "decrypting",
        }
    }
}

/// The 32 round keys derived from one key, in one direction.
#[derive(Clone, PartialEq, Eq, Zeroize, ZeroizeOnDrop)]
pub struct RoundKeys {
    words: [u32; ROUNDS],
    #[zeroize(skip)]
    direction: Direction,
}

impl RoundKeys {
    pub(crate) const fn new(words: [u32; ROUNDS], direction: Direction) -> Self {
        Self { words, direction }
    }

    /// Returns the round key at the requested index (0..32).
    #[inline]
    pub fn get(&self, round: usize) -> u32 {
        self.words[round]
    }

    /// All round keys in application order.
    #[inline]
    pub fn words(&self) -> &[u32; ROUNDS] {
        &self.words
    }

    /// Direction this schedule was derived for.
    #[inline]
    pub fn direction(&self) -> Direction {
        self.direction
    }
}

impl core::fmt::Debug for RoundKeys {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("RoundKeys")
            .field("direction", &self.direction)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn key_from_slice_checks_length() {
        assert!(Sm4Key::try_from(&[0u8; 16][..]).is_ok());
        let err = Sm4Key::try_from(&[0u8; 15][..]).unwrap_err();
        assert!(matches!(err, crate::Error::InvalidLength { actual: 15, .. }));
    }

    #[test]
    fn debug_output_hides_material() {
        let key = Sm4Key::from([0xab; 16]);
        assert_eq!(format!("{key:?}"), "Sm4Key(..)");
        let rks = RoundKeys::new([0xdead_beef; ROUNDS], Direction::Decrypt);
        let shown = format!("{rks:?}");
        assert!(!shown.contains("deadbeef") && !shown.contains("3735928559"));
    }
}
