use serde::{Deserialize, Serialize};
use std::fmt;
use std::fmt::{Display, Formatter};
use std::hash::{Hash, Hasher};

/// A coordinate reference system descriptor, either WKT2 text or an
/// `EPSG:<code>` authority string.
///
/// Two descriptors are considered the same CRS when their text matches after
/// trimming surrounding whitespace. Interpreting the definition is left to the
/// raster collaborator.
#[derive(Debug, Clone, Eq, Serialize, Deserialize)]
pub struct Crs(String);

impl Crs {
    pub fn new(definition: impl Into<String>) -> Self {
        Self(definition.into())
    }

    pub fn epsg(code: u32) -> Self {
        Self(format!("EPSG:{code}"))
    }

    pub fn as_str(&self) -> &str {
        self.0.trim()
    }

    /// The numeric code of an `EPSG:<code>` descriptor; `None` for WKT.
    pub fn epsg_code(&self) -> Option<u32> {
        let (authority, code) = self.as_str().split_once(':')?;
        if !authority.eq_ignore_ascii_case("epsg") {
            return None;
        }
        code.trim().parse().ok()
    }
}

impl PartialEq for Crs {
    fn eq(&self, other: &Self) -> bool {
        self.as_str() == other.as_str()
    }
}

impl Hash for Crs {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.as_str().hash(state);
    }
}

impl Display for Crs {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        // WKT2 strings are long; keep log lines readable.
        let text = self.as_str();
        match text.char_indices().nth(60) {
            Some((idx, _)) => write!(f, "{}...", &text[..idx]),
            None => f.write_str(text),
        }
    }
}
