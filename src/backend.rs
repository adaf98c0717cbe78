//! Lane backend selection.
//!
//! The portable backend is the [`crate::lane::Lane`] array code. On x86 with AVX2 the
//! lane-parallel strategy can instead run a hand-written intrinsics kernel. Setting
//! `ROW_ARGMAX_PORTABLE=1` forces the portable path, which is useful when comparing
//! the two or profiling auto-vectorized output.

use std::sync::OnceLock;

/// Environment variable that forces [`LaneBackend::Portable`].
pub const PORTABLE_ENV: &str = "ROW_ARGMAX_PORTABLE";

/// Implementation used for lane operations in the lane-parallel strategy.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum LaneBackend {
    /// Array code left to the compiler's auto-vectorizer.
    Portable,
    /// Explicit AVX2 intrinsics (32 byte lanes).
    Avx2,
}

impl LaneBackend {
    /// Best backend for this host, honoring [`PORTABLE_ENV`]. Cached per process.
    pub fn detect() -> Self {
        static DETECTED: OnceLock<LaneBackend> = OnceLock::new();
        *DETECTED.get_or_init(|| {
            if portable_forced() {
                LaneBackend::Portable
            } else if avx2_available() {
                LaneBackend::Avx2
            } else {
                LaneBackend::Portable
            }
        })
    }

    /// `self` if the host supports it, otherwise [`LaneBackend::Portable`].
    pub fn supported_or_portable(self) -> Self {
        match self {
            LaneBackend::Avx2 if !avx2_available() => {
                tracing::warn!("AVX2 backend requested but unavailable; using portable lanes");
                LaneBackend::Portable
            }
            other => other,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            LaneBackend::Portable => "portable",
            LaneBackend::Avx2 => "avx2",
        }
    }
}

fn portable_forced() -> bool {
    std::env::var(PORTABLE_ENV)
        .map(|v| parse_flag(&v))
        .unwrap_or(false)
}

/// Truthy spellings accepted for [`PORTABLE_ENV`]: `1`, `true`, `yes`, `on`, any case.
fn parse_flag(value: &str) -> bool {
    let value = value.trim().to_ascii_lowercase();
    matches!(value.as_str(), "1" | "true" | "yes" | "on")
}

/// Runtime detection for AVX2 support.
pub fn avx2_available() -> bool {
    #[cfg(any(target_arch = "x86", target_arch = "x86_64"))]
    {
        std::arch::is_x86_feature_detected!("avx2")
    }

    #[cfg(not(any(target_arch = "x86", target_arch = "x86_64")))]
    {
        false
    }
}

/// Runtime detection for AVX-512 support. Reported only; no kernel uses it.
pub fn avx512_available() -> bool {
    #[cfg(target_arch = "x86_64")]
    {
        std::arch::is_x86_feature_detected!("avx512f")
    }

    #[cfg(not(target_arch = "x86_64"))]
    {
        false
    }
}
