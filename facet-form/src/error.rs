use alloc::string::String;
use alloc::vec::Vec;
use core::fmt;

use facet_value::ValueError;

use crate::KeyPathError;

/// A single problem found while binding, tied to the key path it concerns.
///
/// Binding errors are local: the property (or subtree) they name is left at
/// its default, and the rest of the graph is still bound.
#[derive(Debug, Clone, PartialEq)]
pub struct BindError {
    /// The offending key path, e.g. `Employee.Manager.Id`.
    pub path: String,
    /// What went wrong.
    pub kind: BindErrorKind,
}

impl BindError {
    /// Creates a new binding error.
    pub fn new(path: impl Into<String>, kind: BindErrorKind) -> Self {
        Self {
            path: path.into(),
            kind,
        }
    }
}

/// The kinds of binding errors.
#[derive(Debug, Clone, PartialEq)]
#[non_exhaustive]
pub enum BindErrorKind {
    /// A key under the bind prefix couldn't be parsed; it was skipped.
    MalformedKey(KeyPathError),

    /// A raw value didn't convert to the property's declared type.
    Conversion(ConversionError),

    /// An identity was supplied for an entity, but the lookup had no such record.
    IdentityNotFound {
        /// Type identifier of the entity.
        entity: &'static str,
        /// The identity token as submitted.
        identity: String,
    },

    /// The property's type has no binding strategy (maps, data-carrying enums, ...).
    UnsupportedPropertyKind {
        /// Type identifier of the property.
        type_identifier: &'static str,
    },

    /// The same type was about to be bound again at a prefix that is already open.
    Cycle {
        /// Type identifier of the frame that would have been re-entered.
        type_identifier: &'static str,
    },

    /// Binding went deeper than the configured maximum depth.
    RecursionLimit {
        /// The configured maximum.
        depth: usize,
    },
}

impl fmt::Display for BindErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BindErrorKind::MalformedKey(err) => write!(f, "{err}"),
            BindErrorKind::Conversion(err) => write!(f, "{err}"),
            BindErrorKind::IdentityNotFound { entity, identity } => {
                write!(f, "no {entity} with identity `{identity}`")
            }
            BindErrorKind::UnsupportedPropertyKind { type_identifier } => {
                write!(f, "cannot bind properties of type {type_identifier}")
            }
            BindErrorKind::Cycle { type_identifier } => {
                write!(f, "{type_identifier} is already being bound at this prefix")
            }
            BindErrorKind::RecursionLimit { depth } => {
                write!(f, "maximum binding depth of {depth} exceeded")
            }
        }
    }
}

impl fmt::Display for BindError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.path.is_empty() {
            write!(f, "{}", self.kind)
        } else {
            write!(f, "{}: {}", self.path, self.kind)
        }
    }
}

impl core::error::Error for BindError {
    fn source(&self) -> Option<&(dyn core::error::Error + 'static)> {
        match &self.kind {
            BindErrorKind::MalformedKey(err) => Some(err),
            BindErrorKind::Conversion(err) => Some(err),
            _ => None,
        }
    }
}

/// A raw string that didn't convert to a scalar type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConversionError {
    /// Type identifier of the target type.
    pub expected: &'static str,
    /// The raw value that was submitted.
    pub value: String,
    /// Why the conversion failed.
    pub reason: String,
}

impl fmt::Display for ConversionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "cannot convert `{}` to {}: {}",
            self.value, self.expected, self.reason
        )
    }
}

impl core::error::Error for ConversionError {}

/// Every error accumulated during one bind, in the order they were found.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BindErrors {
    errors: Vec<BindError>,
}

impl BindErrors {
    /// An empty error list.
    pub fn new() -> Self {
        Self::default()
    }

    pub(crate) fn push(&mut self, error: BindError) {
        tracing::warn!(path = %error.path, "{}", error.kind);
        self.errors.push(error);
    }

    /// Number of errors.
    pub fn len(&self) -> usize {
        self.errors.len()
    }

    /// Whether binding was clean.
    pub fn is_empty(&self) -> bool {
        self.errors.is_empty()
    }

    /// Iterate over the errors.
    pub fn iter(&self) -> core::slice::Iter<'_, BindError> {
        self.errors.iter()
    }

    /// Errors whose path is exactly `path`.
    pub fn for_path<'a>(&'a self, path: &'a str) -> impl Iterator<Item = &'a BindError> + 'a {
        self.errors.iter().filter(move |err| err.path == path)
    }

    /// Consume into the underlying list.
    pub fn into_vec(self) -> Vec<BindError> {
        self.errors
    }
}

impl IntoIterator for BindErrors {
    type Item = BindError;
    type IntoIter = alloc::vec::IntoIter<BindError>;

    fn into_iter(self) -> Self::IntoIter {
        self.errors.into_iter()
    }
}

impl<'a> IntoIterator for &'a BindErrors {
    type Item = &'a BindError;
    type IntoIter = core::slice::Iter<'a, BindError>;

    fn into_iter(self) -> Self::IntoIter {
        self.errors.iter()
    }
}

impl fmt::Display for BindErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.errors.len() {
            0 => write!(f, "no binding errors"),
            1 => write!(f, "{}", self.errors[0]),
            n => {
                write!(f, "{n} binding errors:")?;
                for err in &self.errors {
                    write!(f, "\n  - {err}")?;
                }
                Ok(())
            }
        }
    }
}

impl core::error::Error for BindErrors {}

/// A typed value couldn't be turned into its dynamic representation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EncodeError {
    /// Type identifier of the value that failed.
    pub type_identifier: &'static str,
    /// Why it failed.
    pub reason: String,
}

impl fmt::Display for EncodeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "cannot encode {}: {}", self.type_identifier, self.reason)
    }
}

impl core::error::Error for EncodeError {}

/// The bind could not produce a value of the target type at all.
#[derive(Debug)]
pub struct BindFailure {
    /// What failed.
    pub kind: BindFailureKind,
    /// Errors recorded before the failure.
    pub errors: BindErrors,
}

/// The ways a whole bind can fail.
#[derive(Debug)]
#[non_exhaustive]
pub enum BindFailureKind {
    /// The bound tree couldn't be materialized into the target type.
    ///
    /// This happens when a property was left unbound and its type has no
    /// default (a non-optional struct field whose type isn't `Default`).
    Materialize(ValueError),
    /// The instance passed to `bind_onto` couldn't be read.
    Encode(EncodeError),
}

impl fmt::Display for BindFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.kind {
            BindFailureKind::Materialize(err) => {
                write!(f, "could not build bound value: {err}")?
            }
            BindFailureKind::Encode(err) => write!(f, "could not read existing value: {err}")?,
        }
        if !self.errors.is_empty() {
            write!(f, " ({} binding errors)", self.errors.len())?;
        }
        Ok(())
    }
}

impl core::error::Error for BindFailure {
    fn source(&self) -> Option<&(dyn core::error::Error + 'static)> {
        match &self.kind {
            BindFailureKind::Materialize(err) => Some(err),
            BindFailureKind::Encode(err) => Some(err),
        }
    }
}
