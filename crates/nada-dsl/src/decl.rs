use std::panic::Location;

use crate::{context::Context, source::SourceLocation, value::Value};

/// A participant that provides inputs or receives outputs.
///
/// Parties are identified by name.
#[derive(Clone, Debug)]
pub struct Party {
    pub(crate) name: String,
    pub(crate) location: SourceLocation,
}

impl Party {
    /// The party's name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Where the party was declared.
    pub fn location(&self) -> SourceLocation {
        self.location
    }
}

impl PartialEq for Party {
    fn eq(&self, other: &Self) -> bool {
        self.name == other.name
    }
}

impl Eq for Party {}

/// A named value delivered to a party.
#[derive(Clone, Debug)]
pub struct Output {
    pub(crate) value: Value,
    pub(crate) name: String,
    pub(crate) party: Party,
    pub(crate) location: SourceLocation,
}

impl Output {
    /// Declares that `value` is delivered to `party` as `name`.
    #[track_caller]
    pub fn new(cx: &Context, value: &Value, name: impl Into<String>, party: &Party) -> Self {
        let location = cx.capture(Location::caller());
        Self {
            value: value.clone(),
            name: name.into(),
            party: party.clone(),
            location,
        }
    }

    /// The delivered value.
    pub fn value(&self) -> &Value {
        &self.value
    }

    /// The output's name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The receiving party.
    pub fn party(&self) -> &Party {
        &self.party
    }

    /// Where the output was declared.
    pub fn location(&self) -> SourceLocation {
        self.location
    }
}
