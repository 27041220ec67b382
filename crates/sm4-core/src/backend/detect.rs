//! CPU capability detection.
//!
//! Detection runs once per process; every later call reads the published copy.

use std::sync::OnceLock;

use tracing::debug;

/// CPU features relevant to backend selection. Unsupported platforms report
/// every flag as `false`.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub struct CapabilitySet {
    /// x86 SSE2.
    pub sse2: bool,
    /// x86 SSSE3 (byte shuffles).
    pub ssse3: bool,
    /// x86 AES-NI.
    pub aesni: bool,
    /// x86 carry-less multiply.
    pub pclmulqdq: bool,
    /// x86 AVX.
    pub avx: bool,
    /// x86 AVX2.
    pub avx2: bool,
    /// x86 AVX-512 Foundation.
    pub avx512f: bool,
    /// x86 Galois-field new instructions.
    pub gfni: bool,
    /// x86 vector AES.
    pub vaes: bool,
    /// x86 vector carry-less multiply.
    pub vpclmulqdq: bool,
    /// aarch64 Advanced SIMD.
    pub neon: bool,
    /// aarch64 AES instructions.
    pub armv8_aes: bool,
    /// aarch64 polynomial multiply.
    pub pmull: bool,
}

impl CapabilitySet {
    /// True when a wide SIMD unit suitable for lane-parallel substitution exists.
    pub fn has_wide_simd(&self) -> bool {
        self.avx2 || self.ssse3 || self.neon
    }

    /// True when any flag is set.
    pub fn any(&self) -> bool {
        self.flags().iter().any(|(_, on)| *on)
    }

    /// Flag names paired with their values, in a stable order.
    pub fn flags(&self) -> [(&'static str, bool); 13] {
        [
            ("sse2", self.sse2),
            ("ssse3", self.ssse3),
            ("aesni", self.aesni),
            ("pclmulqdq", self.pclmulqdq),
            ("avx", self.avx),
            ("avx2", self.avx2),
            ("avx512f", self.avx512f),
            ("gfni", self.gfni),
            ("vaes", self.vaes),
            ("vpclmulqdq", self.vpclmulqdq),
            ("neon", self.neon),
            ("armv8_aes", self.armv8_aes),
            ("pmull", self.pmull),
        ]
    }
}

static CAPABILITIES: OnceLock<CapabilitySet> = OnceLock::new();

/// Returns the capabilities of the running CPU. Never fails.
pub fn detect() -> CapabilitySet {
    *CAPABILITIES.get_or_init(|| {
        let caps = read_cpu_features();
        debug!(?caps, "detected cpu capabilities");
        caps
    })
}

#[cfg(any(target_arch = "x86", target_arch = "x86_64"))]
fn read_cpu_features() -> CapabilitySet {
    use std::arch::is_x86_feature_detected;

    CapabilitySet {
        sse2: is_x86_feature_detected!("sse2"),
        ssse3: is_x86_feature_detected!("ssse3"),
        aesni: is_x86_feature_detected!("aes"),
        pclmulqdq: is_x86_feature_detected!("pclmulqdq"),
        avx: is_x86_feature_detected!("avx"),
        avx2: is_x86_feature_detected!("avx2"),
        avx512f: is_x86_feature_detected!("avx512f"),
        gfni: is_x86_feature_detected!("gfni"),
        vaes: is_x86_feature_detected!("vaes"),
        vpclmulqdq: is_x86_feature_detected!("vpclmulqdq"),
        ..CapabilitySet::default()
    }
}

#[cfg(target_arch = "aarch64")]
fn read_cpu_features() -> CapabilitySet {
    use std::arch::is_aarch64_feature_detected;

    CapabilitySet {
        neon: is_aarch64_feature_detected!("neon"),
        armv8_aes: is_aarch64_feature_detected!("aes"),
        pmull: is_aarch64_feature_detected!("pmull"),
        ..CapabilitySet::default()
    }
}

#[cfg(not(any(target_arch = "x86", target_arch = "x86_64", target_arch = "aarch64")))]
fn read_cpu_features() -> CapabilitySet {
    CapabilitySet::default()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn detection_is_stable_across_calls_and_threads() {
        let first = detect();
        let handles: Vec<_> = (0..4).map(|_| std::thread::spawn(detect)).collect();
        for handle in handles {
            assert_eq!(handle.join().expect("detect thread"), first);
        }
    }

    #[test]
    fn empty_set_has_nothing() {
        let caps = CapabilitySet::default();
        assert!(!caps.any());
        assert!(!caps.has_wide_simd());
    }

    #[cfg(target_arch = "x86_64")]
    #[test]
    fn x86_64_always_has_sse2() {
        assert!(detect().sse2);
    }
}
