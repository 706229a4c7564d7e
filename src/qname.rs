//! Qualified names of schema components.

use core::fmt;
use std::rc::Rc;

/// Expanded name: namespace URI plus local name.
///
/// Ein leerer `uri` bedeutet "kein Namespace".
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct QName {
    /// The namespace URI. Empty string means no namespace.
    pub uri: Rc<str>,
    /// The local name.
    pub local_name: Rc<str>,
}

impl QName {
    pub fn new(uri: impl Into<Rc<str>>, local_name: impl Into<Rc<str>>) -> Self {
        Self {
            uri: uri.into(),
            local_name: local_name.into(),
        }
    }

    /// Parst Clark-Notation `{uri}local` oder einen bloßen Local-Name.
    pub fn from_clark(text: &str) -> Option<Self> {
        match text.strip_prefix('{') {
            Some(rest) => {
                let (uri, local) = rest.split_once('}')?;
                if local.is_empty() {
                    return None;
                }
                Some(Self::new(uri, local))
            }
            None if !text.is_empty() => Some(Self::new("", text)),
            None => None,
        }
    }
}

impl fmt::Display for QName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.uri.is_empty() {
            write!(f, "{}", self.local_name)
        } else {
            write!(f, "{{{}}}{}", self.uri, self.local_name)
        }
    }
}
