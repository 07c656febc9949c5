//! Recoverable warnings and the `Outcome` wrapper
//!
//! Parsers, exporters and the chain runner never rely on ambient logging to
//! report lossy decisions. Each run returns its product together with the
//! warnings it recorded, so the diff report can list them next to the
//! differences they explain. Warnings are also emitted through `tracing` the
//! moment they are recorded.

use std::fmt;

/// Category of a recoverable warning.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum WarningKind {
    /// A filename carried no usable identifier, so one was synthesized
    FallbackIdentifier,
    /// Two resources claimed the same identifier
    DuplicateIdentifier,
    /// A resource referenced a missing parent or formed a cycle
    OrphanedResource,
    /// An internal link could not be resolved in the export's identifier space
    UnresolvedLink,
    /// A callout marker was not recognized and defaulted to `note`
    UnknownCallout,
    /// An optional field was absent or malformed and was skipped
    MissingOptional,
    /// Several documents of one resource were merged into a single body
    FlattenedDocuments,
    /// An attachment's bytes could not be found on disk
    MissingAsset,
    /// Two siblings mapped to the same file name
    NameCollision,
}

impl WarningKind {
    pub fn label(&self) -> &'static str {
        match self {
            WarningKind::FallbackIdentifier => "fallback-identifier",
            WarningKind::DuplicateIdentifier => "duplicate-identifier",
            WarningKind::OrphanedResource => "orphaned-resource",
            WarningKind::UnresolvedLink => "unresolved-link",
            WarningKind::UnknownCallout => "unknown-callout",
            WarningKind::MissingOptional => "missing-optional",
            WarningKind::FlattenedDocuments => "flattened-documents",
            WarningKind::MissingAsset => "missing-asset",
            WarningKind::NameCollision => "name-collision",
        }
    }
}

impl fmt::Display for WarningKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// A recoverable problem: processing continued, but something was lost or guessed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Warning {
    pub kind: WarningKind,
    /// What the warning is about: a resource id, a file path, a table name
    pub subject: String,
    pub message: String,
}

impl fmt::Display for Warning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}: {}", self.kind, self.subject, self.message)
    }
}

/// Collects warnings during one parse or export.
#[derive(Debug, Default, Clone)]
pub struct Diagnostics {
    warnings: Vec<Warning>,
}

impl Diagnostics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn warn(
        &mut self,
        kind: WarningKind,
        subject: impl Into<String>,
        message: impl Into<String>,
    ) {
        let warning = Warning {
            kind,
            subject: subject.into(),
            message: message.into(),
        };
        tracing::warn!(kind = %warning.kind, subject = %warning.subject, "{}", warning.message);
        self.warnings.push(warning);
    }

    pub fn extend(&mut self, warnings: impl IntoIterator<Item = Warning>) {
        self.warnings.extend(warnings);
    }

    pub fn is_empty(&self) -> bool {
        self.warnings.is_empty()
    }

    pub fn len(&self) -> usize {
        self.warnings.len()
    }

    pub fn into_warnings(self) -> Vec<Warning> {
        self.warnings
    }

    /// Wrap a product together with everything recorded so far.
    pub fn finish<T>(self, value: T) -> Outcome<T> {
        Outcome {
            value,
            warnings: self.warnings,
        }
    }
}

/// A product plus the recoverable warnings recorded while producing it.
#[derive(Debug, Clone)]
pub struct Outcome<T> {
    pub value: T,
    pub warnings: Vec<Warning>,
}

impl<T> Outcome<T> {
    pub fn clean(value: T) -> Self {
        Outcome {
            value,
            warnings: Vec::new(),
        }
    }

    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> Outcome<U> {
        Outcome {
            value: f(self.value),
            warnings: self.warnings,
        }
    }

    pub fn into_parts(self) -> (T, Vec<Warning>) {
        (self.value, self.warnings)
    }
}
