//! Field storage and precondition checks shared by the header builders.
//!
//! Each scheme builder is a typestate machine: a hash step is only callable
//! once the stage that supplies its inputs has run. On top of that ordering,
//! every step declares a [`Relation`] naming the fields that must hold a
//! non-empty value in the builder's [`HeaderFields`] before it executes, and
//! calls [`HeaderFields::require`] to enforce it. A failed check is a
//! [`BuildError`], never an authentication failure.

use crate::error::BuildError;
use crate::header::AuthorizationHeader;

/// The fields an operation needs before it may run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Relation {
    /// Operation name, reported in [`BuildError::MissingField`].
    pub operation: &'static str,
    /// Fields that must be present and non-empty.
    pub requires: &'static [&'static str],
}

impl Relation {
    /// Declare a relation.
    #[must_use]
    pub const fn new(operation: &'static str, requires: &'static [&'static str]) -> Self {
        Self {
            operation,
            requires,
        }
    }
}

/// Ordered field storage for a header under construction.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HeaderFields {
    entries: Vec<(&'static str, String)>,
}

impl HeaderFields {
    /// Create empty storage.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set a field, replacing any previous value.
    pub fn set(&mut self, name: &'static str, value: impl Into<String>) {
        let value = value.into();
        match self.entries.iter_mut().find(|(key, _)| *key == name) {
            Some((_, existing)) => *existing = value,
            None => self.entries.push((name, value)),
        }
    }

    /// Get a field value.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&str> {
        self.entries
            .iter()
            .find(|(key, _)| *key == name)
            .map(|(_, value)| value.as_str())
    }

    /// Get a field value, or an empty string if unset.
    ///
    /// Only meaningful after [`require`](Self::require) has succeeded for the field.
    #[must_use]
    pub fn value(&self, name: &str) -> &str {
        self.get(name).unwrap_or_default()
    }

    /// Whether the field holds a non-empty value.
    #[must_use]
    pub fn has(&self, name: &str) -> bool {
        self.get(name).is_some_and(|value| !value.is_empty())
    }

    /// Check that every field in `relation` holds a non-empty value.
    ///
    /// # Errors
    ///
    /// Returns [`BuildError::MissingField`] naming the first missing field.
    pub fn require(&self, relation: &Relation) -> Result<(), BuildError> {
        match relation.requires.iter().copied().find(|name| !self.has(name)) {
            Some(field) => Err(BuildError::MissingField {
                operation: relation.operation,
                field,
            }),
            None => Ok(()),
        }
    }
}

/// The final stage of a scheme builder.
pub trait AuthorizationHeaderBuilder: Sized {
    /// The header produced.
    type Header: AuthorizationHeader;

    /// Fields required by [`build`](Self::build).
    const BUILD: Relation;

    /// The builder's field storage.
    fn fields(&self) -> &HeaderFields;

    /// Assemble the header from fields already validated against [`Self::BUILD`].
    fn assemble(self) -> Self::Header;

    /// Validate [`Self::BUILD`] and assemble the header.
    ///
    /// # Errors
    ///
    /// Returns a [`BuildError`] if a required field is missing.
    fn build(self) -> Result<Self::Header, BuildError> {
        self.fields().require(&Self::BUILD)?;
        Ok(self.assemble())
    }
}
