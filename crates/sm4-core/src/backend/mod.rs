//! Round-transform backends and their selection.
//!
//! Every backend computes the same function `T`; they differ only in how the
//! S-box and the linear map are evaluated. An [`EncryptContext`] or
//! [`DecryptContext`] resolves its backend once at creation and keeps it by
//! value.
//!
//! [`EncryptContext`]: crate::EncryptContext
//! [`DecryptContext`]: crate::DecryptContext

pub mod affine;
mod detect;
mod table;
mod vector;

use core::fmt;
use core::str::FromStr;

use tracing::trace;

pub use detect::{detect, CapabilitySet};
pub use table::{RoundTable, TableAccelerated, ROUND_TABLES};
pub use vector::{tau_lanes, VectorAccelerated};

use crate::error::{Error, Result};

/// A way of computing the cipher round transform `T`.
pub trait RoundTransform {
    /// Computes `T(word) = L(τ(word))`.
    fn t(word: u32) -> u32;
}

/// Byte-wise S-box lookup followed by the rotation-XOR linear map.
#[derive(Clone, Copy, Debug, Default)]
pub struct Reference;

impl RoundTransform for Reference {
    #[inline]
    fn t(word: u32) -> u32 {
        crate::round::t(word)
    }
}

/// Identifies a backend.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum BackendId {
    /// Direct S-box lookup and rotations.
    Reference,
    /// Precombined substitution + rotation tables.
    TableAccelerated,
    /// Lane-parallel algebraic substitution.
    VectorAccelerated,
}

impl BackendId {
    /// Every backend, lowest preference first.
    pub const ALL: [BackendId; 3] = [
        BackendId::Reference,
        BackendId::TableAccelerated,
        BackendId::VectorAccelerated,
    ];

    /// Canonical lowercase name.
    pub const fn name(self) -> &'static str {
        match self {
            Self::Reference => "reference",
            Self::TableAccelerated => "table",
            Self::VectorAccelerated => "vector",
        }
    }
}

impl fmt::Display for BackendId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for BackendId {
    type Err = Error;

    fn from_str(name: &str) -> Result<Self> {
        match name.trim().to_ascii_lowercase().as_str() {
            "reference" | "basic" => Ok(Self::Reference),
            "table" | "t_table" | "t-table" => Ok(Self::TableAccelerated),
            "vector" | "simd" => Ok(Self::VectorAccelerated),
            _ => Err(Error::UnknownBackend(name.to_owned())),
        }
    }
}

/// Picks a backend from a capability set: vector > table > reference.
pub fn select(caps: &CapabilitySet) -> BackendId {
    if caps.has_wide_simd() {
        BackendId::VectorAccelerated
    } else if caps.any() {
        BackendId::TableAccelerated
    } else {
        BackendId::Reference
    }
}

/// Best backend for the running CPU.
pub fn best_backend() -> BackendId {
    select(&detect())
}

/// Backend choice passed into context creation.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum BackendConfig {
    /// Use [`best_backend`].
    #[default]
    Auto,
    /// Pin a specific backend regardless of detected capabilities.
    Forced(BackendId),
}

impl BackendConfig {
    /// Pins the backend called `name`.
    pub fn force(name: &str) -> Result<Self> {
        name.parse().map(Self::Forced)
    }

    /// Resolves the configuration to a concrete backend.
    pub fn resolve(&self) -> BackendId {
        let backend = match self {
            Self::Auto => best_backend(),
            Self::Forced(id) => *id,
        };
        trace!(config = ?self, %backend, "resolved backend");
        backend
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn names_round_trip_and_aliases_parse() {
        for id in BackendId::ALL {
            assert_eq!(id.name().parse::<BackendId>(), Ok(id));
        }
        assert_eq!("basic".parse::<BackendId>(), Ok(BackendId::Reference));
        assert_eq!("T_TABLE".parse::<BackendId>(), Ok(BackendId::TableAccelerated));
        assert_eq!(" simd ".parse::<BackendId>(), Ok(BackendId::VectorAccelerated));
    }

    #[test]
    fn unknown_names_are_rejected() {
        assert_eq!(
            BackendConfig::force("gfni"),
            Err(Error::UnknownBackend("gfni".into()))
        );
    }

    #[test]
    fn selection_prefers_vector_then_table() {
        assert_eq!(select(&CapabilitySet::default()), BackendId::Reference);
        let sse2_only = CapabilitySet {
            sse2: true,
            ..CapabilitySet::default()
        };
        assert_eq!(select(&sse2_only), BackendId::TableAccelerated);
        let avx2 = CapabilitySet {
            sse2: true,
            avx2: true,
            ..CapabilitySet::default()
        };
        assert_eq!(select(&avx2), BackendId::VectorAccelerated);
        let neon = CapabilitySet {
            neon: true,
            ..CapabilitySet::default()
        };
        assert_eq!(select(&neon), BackendId::VectorAccelerated);
    }

    #[test]
    fn forcing_overrides_and_auto_restores() {
        let forced = BackendConfig::force("reference").expect("known backend");
        assert_eq!(forced.resolve(), BackendId::Reference);
        assert_eq!(BackendConfig::Auto.resolve(), best_backend());
    }

    #[test]
    fn all_transforms_agree_on_structured_words() {
        for x in 0..=255u32 {
            for word in [x, x << 8, x << 16, x << 24, x * 0x0101_0101, !x] {
                let expected = Reference::t(word);
                assert_eq!(TableAccelerated::t(word), expected);
                assert_eq!(VectorAccelerated::t(word), expected);
            }
        }
    }
}
