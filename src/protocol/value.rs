//! Key/value payloads.

use serde::{Deserialize, Serialize};

/// A message value.
///
/// The wire grammar only knows toggles, non-negative integers and integer
/// lists, so those are the only representable values.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Value {
    /// `on` / `off`
    Bool(bool),
    /// Bare decimal
    Int(u64),
    /// Comma-separated decimals
    List(Vec<u64>),
}

impl Value {
    /// Get the toggle, if this is one
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(b) => Some(*b),
            _ => None,
        }
    }

    /// Get the integer, if this is one
    pub fn as_int(&self) -> Option<u64> {
        match self {
            Value::Int(n) => Some(*n),
            _ => None,
        }
    }

    /// Get the list, if this is one
    pub fn as_list(&self) -> Option<&[u64]> {
        match self {
            Value::List(items) => Some(items),
            _ => None,
        }
    }
}

impl std::fmt::Display for Value {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&crate::codec::format_value(self))
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Bool(b)
    }
}

macro_rules! impl_from_unsigned {
    ($($t:ty),*) => {
        $(
            impl From<$t> for Value {
                fn from(n: $t) -> Self {
                    Value::Int(u64::from(n))
                }
            }

            impl From<Vec<$t>> for Value {
                fn from(items: Vec<$t>) -> Self {
                    Value::List(items.into_iter().map(u64::from).collect())
                }
            }

            impl From<&[$t]> for Value {
                fn from(items: &[$t]) -> Self {
                    Value::List(items.iter().copied().map(u64::from).collect())
                }
            }
        )*
    };
}

impl_from_unsigned!(u8, u16, u32, u64);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_conversions() {
        assert_eq!(Value::from(true), Value::Bool(true));
        assert_eq!(Value::from(255u8), Value::Int(255));
        assert_eq!(Value::from(vec![1u32, 2, 3]), Value::List(vec![1, 2, 3]));
        assert_eq!(Value::from(&[4u16, 5][..]), Value::List(vec![4, 5]));
    }

    #[test]
    fn test_accessors() {
        assert_eq!(Value::Int(7).as_int(), Some(7));
        assert_eq!(Value::Int(7).as_bool(), None);
        assert_eq!(Value::List(vec![1]).as_list(), Some(&[1u64][..]));
    }

    #[test]
    fn test_display_uses_wire_spelling() {
        assert_eq!(Value::Bool(false).to_string(), "off");
        assert_eq!(Value::List(vec![7, 8]).to_string(), "7,8");
    }
}
