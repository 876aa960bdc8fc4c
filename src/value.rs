//! The structured value domain settings are expressed in.

use std::collections::BTreeMap;

/// Represents a named integer, the unit of a symbolic choice.
///
/// The integer is what gets written to the device; the name is what a
/// presentation layer shows to the user.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Choice {
    /// The raw integer value the device understands.
    pub value: u32,

    /// The human-readable name of the choice.
    pub name: String,
}

impl Choice {
    /// Creates a new named integer.
    pub fn new(value: u32, name: impl Into<String>) -> Self {
        Self {
            value,
            name: name.into(),
        }
    }
}

/// Represents a decoded setting value.
///
/// Each setting produces and accepts exactly one of these shapes,
/// determined by its codec.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Value {
    /// An on/off toggle.
    Bool(bool),

    /// An integer inside an inclusive range.
    Int(i64),

    /// The integer value of one choice out of a finite set.
    Choice(u32),

    /// One chosen value per key, for map-shaped settings such as key
    /// remapping.
    Map(BTreeMap<u16, u32>),

    /// One boolean per declared flag of a bit field.
    Flags(BTreeMap<u32, bool>),

    /// Named numeric sub-fields grouped per parameter, for multi-range
    /// settings such as gesture parameters.
    Records(BTreeMap<u8, BTreeMap<&'static str, i64>>),
}

impl Value {
    /// Extracts the boolean if this value is a toggle.
    pub fn as_bool(&self) -> Option<bool> {
        match *self {
            Value::Bool(val) => Some(val),
            _ => None,
        }
    }

    /// Extracts the integer if this value is range-shaped.
    pub fn as_int(&self) -> Option<i64> {
        match *self {
            Value::Int(val) => Some(val),
            _ => None,
        }
    }

    /// Extracts the chosen integer if this value is choice-shaped.
    pub fn as_choice(&self) -> Option<u32> {
        match *self {
            Value::Choice(val) => Some(val),
            _ => None,
        }
    }
}
