use std::convert::Infallible;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::TypeError;

/// 2^63 as an `f64`; the first integral float that no longer fits in `i64`.
const I64_BOUND: f64 = 9_223_372_036_854_775_808.0;

/// Identifier of a stored item.
///
/// Ids are either strings or integers. Integer ids take part in
/// auto-allocation: the store never hands out an integer id that is lower
/// than or equal to one it has already seen. `Int(1)` and `Str("1")` are
/// different ids.
#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Id {
    Int(i64),
    Str(String),
}

impl Id {
    /// Convert a raw JSON value into an id.
    ///
    /// Strings are accepted as-is. Numbers must be finite integers that fit
    /// in `i64`; integral floats are folded to integers, which also turns
    /// `-0.0` into `0`. Anything else is [`TypeError::InvalidId`].
    pub fn from_value(value: &Value) -> Result<Self, TypeError> {
        match value {
            Value::String(s) => Ok(Self::Str(s.clone())),
            Value::Number(n) => {
                if let Some(i) = n.as_i64() {
                    return Ok(Self::Int(i));
                }
                if n.is_u64() {
                    return Err(TypeError::InvalidId);
                }
                match n.as_f64() {
                    Some(f) if f.is_finite() && f.fract() == 0.0 && (-I64_BOUND..I64_BOUND).contains(&f) => {
                        Ok(Self::Int(f as i64))
                    }
                    _ => Err(TypeError::InvalidId),
                }
            }
            _ => Err(TypeError::InvalidId),
        }
    }

    /// JSON form of this id, as written to the log.
    pub fn to_value(&self) -> Value {
        match self {
            Self::Int(i) => Value::from(*i),
            Self::Str(s) => Value::String(s.clone()),
        }
    }

    pub fn as_int(&self) -> Option<i64> {
        match self {
            Self::Int(i) => Some(*i),
            Self::Str(_) => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::Int(_) => None,
            Self::Str(s) => Some(s),
        }
    }

    pub fn is_int(&self) -> bool {
        matches!(self, Self::Int(_))
    }
}

impl fmt::Debug for Id {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Int(i) => write!(f, "Id({i})"),
            Self::Str(s) => write!(f, "Id({s:?})"),
        }
    }
}

/// Integers print bare, strings print quoted so `1` and `"1"` stay apart.
impl fmt::Display for Id {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Int(i) => write!(f, "{i}"),
            Self::Str(s) => write!(f, "{s:?}"),
        }
    }
}

/// Lenient parse for user-typed ids: anything that parses as `i64` is an
/// integer id, everything else is a string id.
impl FromStr for Id {
    type Err = Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(match s.parse::<i64>() {
            Ok(i) => Self::Int(i),
            Err(_) => Self::Str(s.to_string()),
        })
    }
}

impl From<i64> for Id {
    fn from(i: i64) -> Self {
        Self::Int(i)
    }
}

impl From<i32> for Id {
    fn from(i: i32) -> Self {
        Self::Int(i64::from(i))
    }
}

impl From<u32> for Id {
    fn from(i: u32) -> Self {
        Self::Int(i64::from(i))
    }
}

impl From<&str> for Id {
    fn from(s: &str) -> Self {
        Self::Str(s.to_string())
    }
}

impl From<String> for Id {
    fn from(s: String) -> Self {
        Self::Str(s)
    }
}

impl From<&Id> for Id {
    fn from(id: &Id) -> Self {
        id.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn strings_are_ids() {
        assert_eq!(Id::from_value(&json!("101")).unwrap(), Id::Str("101".into()));
        assert_eq!(Id::from_value(&json!("")).unwrap(), Id::Str(String::new()));
    }

    #[test]
    fn integers_are_ids() {
        assert_eq!(Id::from_value(&json!(0)).unwrap(), Id::Int(0));
        assert_eq!(Id::from_value(&json!(1)).unwrap(), Id::Int(1));
        assert_eq!(Id::from_value(&json!(-7)).unwrap(), Id::Int(-7));
        assert_eq!(Id::from_value(&json!(i64::MAX)).unwrap(), Id::Int(i64::MAX));
    }

    #[test]
    fn integral_floats_fold_to_integers() {
        assert_eq!(Id::from_value(&json!(1.0)).unwrap(), Id::Int(1));
        assert_eq!(Id::from_value(&json!(-0.0)).unwrap(), Id::Int(0));
    }

    #[test]
    fn negative_zero_from_json_text_is_zero() {
        let value: Value = serde_json::from_str("-0").unwrap();
        assert_eq!(Id::from_value(&value).unwrap(), Id::Int(0));
    }

    #[test]
    fn fractional_numbers_are_rejected() {
        assert_eq!(Id::from_value(&json!(1.1)), Err(TypeError::InvalidId));
        assert_eq!(Id::from_value(&json!(-0.5)), Err(TypeError::InvalidId));
    }

    #[test]
    fn out_of_range_integers_are_rejected() {
        assert_eq!(Id::from_value(&json!(u64::MAX)), Err(TypeError::InvalidId));
        assert_eq!(Id::from_value(&json!(1e300)), Err(TypeError::InvalidId));
    }

    #[test]
    fn non_scalar_values_are_rejected() {
        for value in [json!(null), json!(true), json!([1]), json!({"a": 1})] {
            assert_eq!(Id::from_value(&value), Err(TypeError::InvalidId), "{value}");
        }
    }

    #[test]
    fn int_and_str_are_distinct() {
        assert_ne!(Id::from(1), Id::from("1"));
    }

    #[test]
    fn display_quotes_strings() {
        assert_eq!(Id::from(42).to_string(), "42");
        assert_eq!(Id::from("42").to_string(), "\"42\"");
    }

    #[test]
    fn lenient_parse() {
        assert_eq!("12".parse::<Id>().unwrap(), Id::Int(12));
        assert_eq!("-3".parse::<Id>().unwrap(), Id::Int(-3));
        assert_eq!("abc".parse::<Id>().unwrap(), Id::Str("abc".into()));
        assert_eq!("1.5".parse::<Id>().unwrap(), Id::Str("1.5".into()));
    }

    #[test]
    fn serde_is_untagged() {
        assert_eq!(serde_json::to_string(&Id::from(5)).unwrap(), "5");
        assert_eq!(serde_json::to_string(&Id::from("x")).unwrap(), "\"x\"");
        let back: Id = serde_json::from_str("\"x\"").unwrap();
        assert_eq!(back, Id::from("x"));
    }
}
