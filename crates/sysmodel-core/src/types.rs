//! Plain value types carried by model elements.
//!
//! [`Visibility`] describes the direction of a port, [`EdgeKind`] how an
//! edge treats its contract, and [`Condition`] is an opaque boolean
//! expression in the automaton's condition language.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Direction of a port relative to its owning system.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum Visibility {
    /// Value flows into the system.
    Input,
    /// Value flows out of the system.
    Output,
    /// Internal state variable, visible only inside the system.
    #[default]
    State,
}

impl fmt::Display for Visibility {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Visibility::Input => write!(f, "input"),
            Visibility::Output => write!(f, "output"),
            Visibility::State => write!(f, "state"),
        }
    }
}

/// How an edge handles the contract it is annotated with.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum EdgeKind {
    /// Taken when the contract's precondition holds.
    #[default]
    Hit,
    /// Taken when the precondition does not hold.
    Miss,
    /// Taken when the precondition holds but the postcondition is violated.
    Fail,
}

impl fmt::Display for EdgeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EdgeKind::Hit => write!(f, "hit"),
            EdgeKind::Miss => write!(f, "miss"),
            EdgeKind::Fail => write!(f, "fail"),
        }
    }
}

/// A boolean expression kept as source text.
///
/// The model never evaluates conditions; it only combines them textually.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(transparent)]
pub struct Condition(pub String);

impl Condition {
    pub fn new(text: impl Into<String>) -> Self {
        Condition(text.into())
    }

    /// The always-true condition.
    pub fn truth() -> Self {
        Condition("true".to_string())
    }

    /// Conjunction `(self & other)`.
    pub fn and(&self, other: &Condition) -> Condition {
        Condition(format!("({} & {})", self.0, other.0))
    }

    /// Negation `!(self)`.
    pub fn not(&self) -> Condition {
        Condition(format!("!({})", self.0))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Condition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn condition_combinators_parenthesize() {
        let a = Condition::new("x > 0");
        let b = Condition::new("y");
        assert_eq!(a.and(&b).as_str(), "(x > 0 & y)");
        assert_eq!(a.not().as_str(), "!(x > 0)");
    }

    #[test]
    fn defaults_match_new_elements() {
        assert_eq!(Visibility::default(), Visibility::State);
        assert_eq!(EdgeKind::default(), EdgeKind::Hit);
        assert_eq!(Condition::default().as_str(), "");
    }

    #[test]
    fn condition_serializes_as_plain_string() {
        let json = serde_json::to_string(&Condition::new("a | b")).unwrap();
        assert_eq!(json, r#""a | b""#);
    }
}
