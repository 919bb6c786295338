//! Purpose: Codec provider for `List<E>`.
//! Exports: `ListRepresentationProvider`, `ListRepresentation`.
//! Role: Composite codec; one cached representation per element type.
//! Invariants: The element codec is resolved once and shared by every list of that type.
//! Invariants: The cache lock is never held while resolving the element codec.
//! Invariants: A cached list whose element codec was rolled back is evicted and rebuilt.
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use parking_lot::Mutex;
use tracing::{debug, trace};

use crate::core::error::Error;
use crate::core::registry::Representations;
use crate::core::representation::{
    ARRAY, Representation, RepresentationProvider, SharedRepresentation, arity_error, evict,
    type_mismatch,
};
use crate::core::token::{JsonReader, JsonWriter};
use crate::core::types::{RawType, TypeRef};
use crate::core::value::Value;

#[derive(Default)]
pub struct ListRepresentationProvider {
    cache: Mutex<HashMap<TypeRef, SharedRepresentation>>,
}

impl ListRepresentationProvider {
    pub fn new() -> Self {
        Self::default()
    }
}

impl RepresentationProvider for ListRepresentationProvider {
    fn raw_type(&self) -> RawType {
        RawType::List
    }

    fn representation_for(
        &self,
        registry: &Representations,
        params: &[TypeRef],
    ) -> Result<SharedRepresentation, Error> {
        let [element_ty] = params else {
            return Err(arity_error(&RawType::List, 1, params));
        };
        let cached = self.cache.lock().get(element_ty).cloned();
        if let Some(cached) = cached {
            match cached.ensure_ready() {
                Ok(()) => {
                    trace!(element = %element_ty, "list representation cache hit");
                    return Ok(cached);
                }
                Err(err) => {
                    debug!(element = %element_ty, error = %err, "evicting stale list representation");
                    evict(&self.cache, element_ty, &cached);
                }
            }
        }

        let element = registry.for_type(element_ty)?;
        let mut cache = self.cache.lock();
        let representation = cache.entry(element_ty.clone()).or_insert_with(|| {
            let ty = TypeRef::list(element_ty.clone());
            debug!(ty = %ty, "constructed list representation");
            Arc::new(ListRepresentation { ty, element })
        });
        Ok(Arc::clone(representation))
    }
}

pub struct ListRepresentation {
    ty: TypeRef,
    element: SharedRepresentation,
}

impl ListRepresentation {
    pub fn element(&self) -> &SharedRepresentation {
        &self.element
    }
}

impl fmt::Debug for ListRepresentation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ListRepresentation")
            .field("ty", &format_args!("{}", self.ty))
            .finish()
    }
}

impl Representation for ListRepresentation {
    fn type_ref(&self) -> &TypeRef {
        &self.ty
    }

    fn ensure_ready(&self) -> Result<(), Error> {
        self.element.ensure_ready()
    }

    fn read(&self, reader: &mut JsonReader<'_>) -> Result<Value, Error> {
        let mut items = Vec::new();
        ARRAY.read_each(reader, |reader| {
            items.push(self.element.read(reader)?);
            Ok(())
        })?;
        Ok(Value::List(items))
    }

    fn write(&self, value: &Value, writer: &mut JsonWriter) -> Result<(), Error> {
        let Value::List(items) = value else {
            return Err(type_mismatch(&self.ty, value));
        };
        let mut seq = ARRAY.begin(writer);
        for item in items {
            seq.item(writer);
            self.element.write(item, writer)?;
        }
        seq.end(writer);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use crate::core::error::ErrorKind;
    use crate::core::registry::Representations;
    use crate::core::token::{JsonReader, JsonWriter};
    use crate::core::types::TypeRef;
    use crate::core::value::Value;

    #[test]
    fn decodes_and_reencodes_longs() {
        let registry = Representations::new();
        let list = registry
            .for_type(&TypeRef::list(TypeRef::long()))
            .expect("list");
        let value = list.read(&mut JsonReader::new("[1,2,3]")).expect("read");
        assert_eq!(
            value,
            Value::List(vec![Value::Long(1), Value::Long(2), Value::Long(3)])
        );
        let mut writer = JsonWriter::new();
        list.write(&value, &mut writer).expect("write");
        assert_eq!(writer.as_str(), "[1,2,3]");
    }

    #[test]
    fn empty_list_round_trips() {
        let registry = Representations::new();
        let ty = TypeRef::list(TypeRef::string());
        let value = registry.decode_str(&ty, " [ ] ").expect("decode");
        assert_eq!(value, Value::List(Vec::new()));
        assert_eq!(registry.encode_to_string(&ty, &value).expect("encode"), "[]");
    }

    #[test]
    fn element_codec_is_shared() {
        let registry = Representations::new();
        let outer = registry
            .for_type(&TypeRef::list(TypeRef::list(TypeRef::string())))
            .expect("outer");
        let inner = registry
            .for_type(&TypeRef::list(TypeRef::string()))
            .expect("inner");
        let again = registry
            .for_type(&TypeRef::list(TypeRef::list(TypeRef::string())))
            .expect("outer again");
        assert!(Arc::ptr_eq(&outer, &again));
        assert_eq!(inner.type_ref().to_string(), "List<String>");
    }

    #[test]
    fn arity_is_validated() {
        let registry = Representations::new();
        for ty in ["List", "List<String, Long>"] {
            let parsed: TypeRef = ty.parse().expect("parse");
            let err = registry.for_type(&parsed).expect_err(ty);
            assert_eq!(err.kind(), ErrorKind::Configuration, "{ty}");
        }
    }

    #[test]
    fn element_errors_propagate() {
        let registry = Representations::new();
        let ty = TypeRef::list(TypeRef::long());
        let err = registry.decode_str(&ty, "[1,\"x\"]").expect_err("mixed");
        assert_eq!(err.kind(), ErrorKind::Protocol);
    }
}
