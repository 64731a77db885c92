//! Blob addressing: `(kind, app, stage)` triples joined into object paths

use std::fmt;

use crate::backend::{BackendError, BackendResult};

/// Separator between the segments of an object path
pub const SEPARATOR: char = '/';

/// Category of a stored blob
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum BlobKind {
    /// Encryption passphrase for an app/stage
    Passphrase,
    /// Serialized stack state
    App,
    /// Stored secret values
    Secret,
    /// Any other kind introduced by the caller
    Custom(String),
}

impl BlobKind {
    pub fn as_str(&self) -> &str {
        match self {
            BlobKind::Passphrase => "passphrase",
            BlobKind::App => "app",
            BlobKind::Secret => "secret",
            BlobKind::Custom(name) => name,
        }
    }

    /// Map a kind name onto the known vocabulary, falling back to `Custom`
    pub fn from_name(name: &str) -> Self {
        match name {
            "passphrase" => BlobKind::Passphrase,
            "app" => BlobKind::App,
            "secret" => BlobKind::Secret,
            other => BlobKind::Custom(other.to_string()),
        }
    }
}

impl fmt::Display for BlobKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Location of a blob inside the state bucket
///
/// Components are normalized on construction: surrounding separators are
/// stripped, and empty components, `.`/`..` or embedded separators are
/// rejected. Two addresses built from the same triple always render the
/// same [`path`](BlobAddress::path).
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct BlobAddress {
    kind: BlobKind,
    app: String,
    stage: String,
}

impl BlobAddress {
    pub fn new(kind: BlobKind, app: &str, stage: &str) -> BackendResult<Self> {
        let kind = BlobKind::from_name(&normalize_component("kind", kind.as_str())?);
        let app = normalize_component("app", app)?;
        let stage = normalize_component("stage", stage)?;
        Ok(Self { kind, app, stage })
    }

    /// Parse a joined `kind/app/stage` path, ignoring redundant separators
    pub fn parse(path: &str) -> BackendResult<Self> {
        let segments: Vec<&str> = path.split(SEPARATOR).filter(|s| !s.is_empty()).collect();
        match segments.as_slice() {
            [kind, app, stage] => Self::new(BlobKind::from_name(kind), app, stage),
            _ => Err(BackendError::InvalidAddress(format!(
                "expected kind{sep}app{sep}stage, got '{path}'",
                sep = SEPARATOR
            ))),
        }
    }

    pub fn kind(&self) -> &BlobKind {
        &self.kind
    }

    pub fn app(&self) -> &str {
        &self.app
    }

    pub fn stage(&self) -> &str {
        &self.stage
    }

    pub fn segments(&self) -> [&str; 3] {
        [self.kind.as_str(), &self.app, &self.stage]
    }

    pub fn path(&self) -> String {
        let separator = SEPARATOR.to_string();
        self.segments().join(separator.as_str())
    }
}

impl fmt::Display for BlobAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.path())
    }
}

fn normalize_component(label: &str, raw: &str) -> BackendResult<String> {
    let trimmed = raw.trim_matches(SEPARATOR);
    if trimmed.is_empty() {
        return Err(BackendError::InvalidAddress(format!(
            "{label} must not be empty"
        )));
    }
    if trimmed.contains(SEPARATOR) {
        return Err(BackendError::InvalidAddress(format!(
            "{label} '{trimmed}' must not contain '{SEPARATOR}'"
        )));
    }
    if trimmed == "." || trimmed == ".." {
        return Err(BackendError::InvalidAddress(format!(
            "{label} must not be '{trimmed}'"
        )));
    }
    Ok(trimmed.to_string())
}
