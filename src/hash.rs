//! Reproduzierbarer String-Hash und Byte-Gleichheit fuer Lookup-Keys.
//!
//! Der djb-Hash (Seed 5381, `h * 33 + b`) ist bit-identisch auf allen
//! Plattformen: Arithmetik wrapping in `u32`, Bytes als vorzeichenlose Werte.
//! `ahash` bleibt fuer interne Maps ohne Reproduzierbarkeitsanforderung.

use core::hash::{BuildHasher, Hasher};

/// Startwert des djb-Hash.
pub const DJB_SEED: u32 = 5381;

/// djb-Hash ueber eine Bytefolge.
///
/// ```
/// assert_eq!(exigram::hash::djb_hash(b""), 5381);
/// assert_ne!(exigram::hash::djb_hash(b"ab"), exigram::hash::djb_hash(b"ba"));
/// ```
#[inline]
pub fn djb_hash(bytes: &[u8]) -> u32 {
    bytes.iter().fold(DJB_SEED, |h, &b| {
        h.wrapping_mul(33).wrapping_add(u32::from(b))
    })
}

/// Exakter Key-Vergleich.
///
/// - Unterschiedliche Laengen: ungleich.
/// - Zwei abwesende Keys (`None`) sind gleich.
/// - Zwei vorhandene Keys der Laenge 0 sind gleich.
/// - Ein abwesender Key ist nie gleich einem vorhandenen leeren Key.
/// - Sonst entscheidet der Bytevergleich.
pub fn key_equal(k1: Option<&[u8]>, k2: Option<&[u8]>) -> bool {
    match (k1, k2) {
        (None, None) => true,
        (Some(a), Some(b)) => a == b,
        _ => false,
    }
}

/// Packt zwei 32-Bit IDs in einen 64-Bit Lookup-Key (native Byte-Reihenfolge).
///
/// Nur als In-Memory-Key gedacht, nie persistieren.
#[inline]
pub fn composite64(a: u32, b: u32) -> u64 {
    let mut buf = [0u8; 8];
    buf[..4].copy_from_slice(&a.to_ne_bytes());
    buf[4..].copy_from_slice(&b.to_ne_bytes());
    u64::from_ne_bytes(buf)
}

/// `Hasher` mit der djb-Funktion, fuer `hashbrown`-Maps ueber Tabellen-Strings.
#[derive(Debug, Clone, Copy)]
pub struct DjbHasher {
    state: u32,
}

impl Default for DjbHasher {
    fn default() -> Self {
        Self { state: DJB_SEED }
    }
}

impl Hasher for DjbHasher {
    #[inline]
    fn write(&mut self, bytes: &[u8]) {
        for &b in bytes {
            self.state = self.state.wrapping_mul(33).wrapping_add(u32::from(b));
        }
    }

    #[inline]
    fn finish(&self) -> u64 {
        u64::from(self.state)
    }
}

/// `BuildHasher` fuer [`DjbHasher`].
#[derive(Debug, Clone, Copy, Default)]
pub struct DjbBuildHasher;

impl BuildHasher for DjbBuildHasher {
    type Hasher = DjbHasher;

    fn build_hasher(&self) -> DjbHasher {
        DjbHasher::default()
    }
}
