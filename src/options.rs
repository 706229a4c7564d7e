//! Compile options.
//!
//! # Beispiel
//!
//! ```
//! use exigram::options::CompileOptions;
//!
//! let opts = CompileOptions::default()
//!     .with_skip_unsupported()
//!     .with_sort_attributes();
//!
//! assert!(opts.skip_unsupported());
//! assert!(opts.sort_attributes());
//! ```

/// Options controlling schema compilation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct CompileOptions {
    pub(crate) skip_unsupported: bool,
    pub(crate) sort_attributes: bool,
}

impl CompileOptions {
    // --- Getter ---

    /// Nicht unterstuetzte Konstrukte mit Warnung ueberspringen statt abzubrechen.
    pub fn skip_unsupported(&self) -> bool { self.skip_unsupported }
    /// Attribute Uses lexikographisch (local-name, dann URI) statt in
    /// Deklarationsreihenfolge.
    pub fn sort_attributes(&self) -> bool { self.sort_attributes }

    // --- Builder ---

    pub fn with_skip_unsupported(mut self) -> Self { self.skip_unsupported = true; self }

    pub fn with_sort_attributes(mut self) -> Self { self.sort_attributes = true; self }

    // --- Setter ---

    pub fn set_skip_unsupported(&mut self, val: bool) { self.skip_unsupported = val; }

    pub fn set_sort_attributes(&mut self, val: bool) { self.sort_attributes = val; }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_strict_declaration_order() {
        let opts = CompileOptions::default();
        assert!(!opts.skip_unsupported());
        assert!(!opts.sort_attributes());
    }

    #[test]
    fn setters() {
        let mut opts = CompileOptions::default().with_sort_attributes();
        opts.set_sort_attributes(false);
        opts.set_skip_unsupported(true);
        assert!(!opts.sort_attributes());
        assert!(opts.skip_unsupported());
    }
}
