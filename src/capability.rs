//! Host identification printed once before any benchmark output.

use std::fmt;

use crate::backend::{LaneBackend, avx2_available, avx512_available};

/// Source of the startup identification line.
pub trait CapabilityReporter {
    /// One human-readable line describing the host.
    fn banner(&self) -> String;

    /// Prints [`Self::banner`] to stdout.
    fn report(&self) {
        println!("{}", self.banner());
    }
}

/// Facts about the running host relevant to the lane kernels.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct HostCapabilities {
    pub os: &'static str,
    pub arch: &'static str,
    pub avx2: bool,
    pub avx512f: bool,
    pub backend: LaneBackend,
    pub version: &'static str,
}

impl HostCapabilities {
    pub fn detect() -> Self {
        let caps = Self {
            os: std::env::consts::OS,
            arch: std::env::consts::ARCH,
            avx2: avx2_available(),
            avx512f: avx512_available(),
            backend: LaneBackend::detect(),
            version: env!("CARGO_PKG_VERSION"),
        };
        tracing::debug!(?caps, "host capabilities");
        caps
    }

    fn features(&self) -> String {
        let mut features = Vec::new();
        if self.avx2 {
            features.push("avx2");
        }
        if self.avx512f {
            features.push("avx512f");
        }
        if features.is_empty() {
            "none".to_string()
        } else {
            features.join(",")
        }
    }
}

impl fmt::Display for HostCapabilities {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "row-argmax {} on {}-{} (simd: {}, lanes: {})",
            self.version,
            self.arch,
            self.os,
            self.features(),
            self.backend.name()
        )
    }
}

impl CapabilityReporter for HostCapabilities {
    fn banner(&self) -> String {
        self.to_string()
    }
}
