//! Purpose: Dynamic value model produced and consumed by representations.
//! Exports: `Value`, `ValueMap`, `date_from_millis`, `date_to_millis`.
//! Role: Common currency between codecs, objects, and callers.
//! Invariants: `Eq`/`Hash` are total so any value can key a map (doubles compare by bits).
//! Invariants: No null variant; absence exists only at object member slots.
use std::collections::HashMap;
use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};

use time::OffsetDateTime;

use crate::core::class::Object;
use crate::core::error::{Error, ErrorKind};
use crate::core::types::{RawType, TypeRef};

pub type ValueMap = HashMap<Value, Value>;

#[derive(Clone, Debug)]
pub enum Value {
    Boolean(bool),
    Double(f64),
    Long(i64),
    String(String),
    Date(OffsetDateTime),
    List(Vec<Value>),
    Map(ValueMap),
    Structure(Object),
}

impl Value {
    pub fn kind_name(&self) -> &'static str {
        match self {
            Value::Boolean(_) => "Boolean",
            Value::Double(_) => "Double",
            Value::Long(_) => "Long",
            Value::String(_) => "String",
            Value::Date(_) => "Date",
            Value::List(_) => "List",
            Value::Map(_) => "Map",
            Value::Structure(_) => "Structure",
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Boolean(value) => Some(*value),
            _ => None,
        }
    }

    pub fn as_long(&self) -> Option<i64> {
        match self {
            Value::Long(value) => Some(*value),
            _ => None,
        }
    }

    pub fn as_double(&self) -> Option<f64> {
        match self {
            Value::Double(value) => Some(*value),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(value) => Some(value),
            _ => None,
        }
    }

    pub fn as_date(&self) -> Option<OffsetDateTime> {
        match self {
            Value::Date(value) => Some(*value),
            _ => None,
        }
    }

    pub fn as_list(&self) -> Option<&[Value]> {
        match self {
            Value::List(items) => Some(items),
            _ => None,
        }
    }

    pub fn as_map(&self) -> Option<&ValueMap> {
        match self {
            Value::Map(map) => Some(map),
            _ => None,
        }
    }

    pub fn as_object(&self) -> Option<&Object> {
        match self {
            Value::Structure(object) => Some(object),
            _ => None,
        }
    }

    /// Deep check that this value has the shape `ty` describes.
    pub fn conforms_to(&self, ty: &TypeRef) -> bool {
        match (self, ty.raw()) {
            (Value::Boolean(_), RawType::Boolean)
            | (Value::Double(_), RawType::Double)
            | (Value::Long(_), RawType::Long)
            | (Value::String(_), RawType::String)
            | (Value::Date(_), RawType::Date) => true,
            (Value::List(items), RawType::List) => match ty.args() {
                [element] => items.iter().all(|item| item.conforms_to(element)),
                _ => false,
            },
            (Value::Map(map), RawType::Map) => match ty.args() {
                [key_ty, val_ty] => map
                    .iter()
                    .all(|(key, val)| key.conforms_to(key_ty) && val.conforms_to(val_ty)),
                _ => false,
            },
            (Value::Structure(object), RawType::Named(name)) => object.class().name() == &**name,
            (Value::Structure(object), RawType::Structure) => match ty.args() {
                [class_ty] => class_ty.class_name() == Some(object.class().name()),
                _ => false,
            },
            _ => false,
        }
    }
}

impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Value::Boolean(a), Value::Boolean(b)) => a == b,
            (Value::Double(a), Value::Double(b)) => a.to_bits() == b.to_bits(),
            (Value::Long(a), Value::Long(b)) => a == b,
            (Value::String(a), Value::String(b)) => a == b,
            (Value::Date(a), Value::Date(b)) => a == b,
            (Value::List(a), Value::List(b)) => a == b,
            (Value::Map(a), Value::Map(b)) => a == b,
            (Value::Structure(a), Value::Structure(b)) => a == b,
            _ => false,
        }
    }
}

impl Eq for Value {}

impl Hash for Value {
    fn hash<H: Hasher>(&self, state: &mut H) {
        std::mem::discriminant(self).hash(state);
        match self {
            Value::Boolean(value) => value.hash(state),
            Value::Double(value) => value.to_bits().hash(state),
            Value::Long(value) => value.hash(state),
            Value::String(value) => value.hash(state),
            Value::Date(value) => value.hash(state),
            Value::List(items) => items.hash(state),
            Value::Map(map) => {
                // Entry order is unspecified, so fold entry hashes commutatively.
                let mut folded = 0u64;
                for entry in map {
                    let mut entry_hasher = DefaultHasher::new();
                    entry.hash(&mut entry_hasher);
                    folded = folded.wrapping_add(entry_hasher.finish());
                }
                map.len().hash(state);
                folded.hash(state);
            }
            Value::Structure(object) => object.hash(state),
        }
    }
}

impl From<bool> for Value {
    fn from(value: bool) -> Self {
        Value::Boolean(value)
    }
}

impl From<i64> for Value {
    fn from(value: i64) -> Self {
        Value::Long(value)
    }
}

impl From<f64> for Value {
    fn from(value: f64) -> Self {
        Value::Double(value)
    }
}

impl From<String> for Value {
    fn from(value: String) -> Self {
        Value::String(value)
    }
}

impl From<&str> for Value {
    fn from(value: &str) -> Self {
        Value::String(value.to_string())
    }
}

impl From<OffsetDateTime> for Value {
    fn from(value: OffsetDateTime) -> Self {
        Value::Date(value)
    }
}

impl From<Vec<Value>> for Value {
    fn from(items: Vec<Value>) -> Self {
        Value::List(items)
    }
}

impl From<ValueMap> for Value {
    fn from(map: ValueMap) -> Self {
        Value::Map(map)
    }
}

impl From<Object> for Value {
    fn from(object: Object) -> Self {
        Value::Structure(object)
    }
}

pub fn date_from_millis(millis: i64) -> Result<OffsetDateTime, Error> {
    OffsetDateTime::from_unix_timestamp_nanos(i128::from(millis) * 1_000_000).map_err(|err| {
        Error::new(ErrorKind::Semantic)
            .with_message(format!("{millis} is outside the supported date range"))
            .with_source(err)
    })
}

/// Truncates toward negative infinity, so sub-millisecond precision is dropped.
pub fn date_to_millis(date: &OffsetDateTime) -> i64 {
    date.unix_timestamp_nanos().div_euclid(1_000_000) as i64
}

#[cfg(test)]
mod tests {
    use super::{Value, ValueMap, date_from_millis, date_to_millis};
    use crate::core::types::TypeRef;

    #[test]
    fn doubles_compare_by_bits() {
        assert_eq!(Value::Double(f64::NAN), Value::Double(f64::NAN));
        assert_ne!(Value::Double(0.0), Value::Double(-0.0));
    }

    #[test]
    fn maps_can_key_maps() {
        let mut inner = ValueMap::new();
        inner.insert(Value::from("a"), Value::from(1i64));
        inner.insert(Value::from("b"), Value::from(2i64));
        let mut reordered = ValueMap::new();
        reordered.insert(Value::from("b"), Value::from(2i64));
        reordered.insert(Value::from("a"), Value::from(1i64));

        let mut outer = ValueMap::new();
        outer.insert(Value::Map(inner), Value::from(true));
        assert_eq!(outer.get(&Value::Map(reordered)), Some(&Value::from(true)));
    }

    #[test]
    fn conformance_checks_nested_shapes() {
        let ty = TypeRef::list(TypeRef::list(TypeRef::string()));
        let good = Value::List(vec![Value::List(vec![Value::from("x")])]);
        let bad = Value::List(vec![Value::List(vec![Value::from(1i64)])]);
        assert!(good.conforms_to(&ty));
        assert!(!bad.conforms_to(&ty));
        assert!(!Value::from(1i64).conforms_to(&TypeRef::double()));
    }

    #[test]
    fn date_millis_conversion() {
        let date = date_from_millis(1_700_000_000_123).expect("date");
        assert_eq!(date_to_millis(&date), 1_700_000_000_123);
        let before_epoch = date_from_millis(-1).expect("date");
        assert_eq!(date_to_millis(&before_epoch), -1);
    }
}
