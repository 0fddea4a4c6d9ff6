//! Runtime value representation.
//!
//! Values are immutable and `Send + Sync`: aggregate payloads sit behind
//! `Arc`, so a value stored in a process-wide cache can be handed to any
//! execution without copying.

use ahash::RandomState;
use hashbrown::HashMap;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::sync::Arc;

use strand_ir::NodeId;

pub type FastHashMap<K, V> = HashMap<K, V, RandomState>;

pub fn fast_map_new<K: Eq + Hash, V>() -> FastHashMap<K, V> {
    HashMap::with_hasher(RandomState::new())
}

pub fn fast_map_with_capacity<K: Eq + Hash, V>(cap: usize) -> FastHashMap<K, V> {
    HashMap::with_capacity_and_hasher(cap, RandomState::new())
}

#[derive(Clone, Debug, Default, PartialEq)]
pub enum Value {
    #[default]
    Unit,
    Bool(bool),
    Int(i64),
    Float(f64),
    Str(Arc<str>),
    List(Arc<[Value]>),
    /// Reference to a function definition node.
    Func(NodeId),
}

impl Value {
    pub fn str(s: &str) -> Self {
        Value::Str(Arc::from(s))
    }

    pub fn list(items: Vec<Value>) -> Self {
        Value::List(items.into())
    }

    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Unit => "unit",
            Value::Bool(_) => "bool",
            Value::Int(_) => "int",
            Value::Float(_) => "float",
            Value::Str(_) => "string",
            Value::List(_) => "list",
            Value::Func(_) => "func",
        }
    }

    pub fn is_truthy(&self) -> bool {
        match self {
            Value::Unit => false,
            Value::Bool(b) => *b,
            Value::Int(i) => *i != 0,
            Value::Float(f) => *f != 0.0,
            Value::Str(s) => !s.is_empty(),
            Value::List(items) => !items.is_empty(),
            Value::Func(_) => true,
        }
    }

    pub fn as_int(&self) -> Option<i64> {
        match self {
            Value::Int(i) => Some(*i),
            _ => None,
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Int(i) => Some(*i as f64),
            Value::Float(f) => Some(*f),
            _ => None,
        }
    }

    /// Equality consistent with `Hash`: floats compare by bit pattern, so
    /// `NaN` is identical to itself and `0.0` differs from `-0.0`.
    pub fn is_identical(&self, other: &Value) -> bool {
        match (self, other) {
            (Value::Float(a), Value::Float(b)) => a.to_bits() == b.to_bits(),
            (Value::List(a), Value::List(b)) => {
                a.len() == b.len() && a.iter().zip(b.iter()).all(|(x, y)| x.is_identical(y))
            }
            _ => self == other,
        }
    }
}

// Floats hash by bit pattern so that fingerprints are stable; `0.0` and
// `-0.0` therefore hash apart even though they compare equal.
impl Hash for Value {
    fn hash<H: Hasher>(&self, state: &mut H) {
        std::mem::discriminant(self).hash(state);
        match self {
            Value::Unit => {}
            Value::Bool(b) => b.hash(state),
            Value::Int(i) => i.hash(state),
            Value::Float(f) => f.to_bits().hash(state),
            Value::Str(s) => s.hash(state),
            Value::List(items) => {
                items.len().hash(state);
                for v in items.iter() {
                    v.hash(state);
                }
            }
            Value::Func(id) => id.hash(state),
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Unit => f.write_str("()"),
            Value::Bool(b) => write!(f, "{b}"),
            Value::Int(i) => write!(f, "{i}"),
            Value::Float(x) => {
                if x.fract() == 0.0 && x.is_finite() {
                    write!(f, "{x:.1}")
                } else {
                    write!(f, "{x}")
                }
            }
            Value::Str(s) => f.write_str(s),
            Value::List(items) => {
                f.write_str("[")?;
                for (i, v) in items.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{v}")?;
                }
                f.write_str("]")
            }
            Value::Func(id) => write!(f, "<func {id}>"),
        }
    }
}

impl From<i64> for Value {
    fn from(i: i64) -> Self {
        Value::Int(i)
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Bool(b)
    }
}

impl From<f64> for Value {
    fn from(x: f64) -> Self {
        Value::Float(x)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::str(s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::hash::BuildHasher;

    #[test]
    fn identity_follows_the_hash() {
        let nan = Value::Float(f64::NAN);
        assert!(nan.is_identical(&nan.clone()));
        assert!(!Value::Float(0.0).is_identical(&Value::Float(-0.0)));
        let a = Value::list(vec![Value::Int(1), nan.clone()]);
        let b = Value::list(vec![Value::Int(1), nan]);
        assert!(a.is_identical(&b));
        assert!(!Value::Int(1).is_identical(&Value::Float(1.0)));
    }

    fn digest(v: &Value) -> u64 {
        let rs = RandomState::with_seeds(1, 2, 3, 4);
        rs.hash_one(v)
    }

    #[test]
    fn display_formats() {
        assert_eq!(Value::list(vec![1.into(), "a".into(), 2.0.into()]).to_string(), "[1, a, 2.0]");
        assert_eq!(Value::Unit.to_string(), "()");
        assert_eq!(Value::Float(1.5).to_string(), "1.5");
    }

    #[test]
    fn int_and_float_hash_apart() {
        assert_ne!(digest(&Value::Int(1)), digest(&Value::Float(1.0)));
        assert_eq!(digest(&Value::str("k")), digest(&Value::str("k")));
    }

    #[test]
    fn truthiness() {
        assert!(!Value::Unit.is_truthy());
        assert!(!Value::Int(0).is_truthy());
        assert!(Value::str("x").is_truthy());
        assert!(!Value::list(vec![]).is_truthy());
    }
}
