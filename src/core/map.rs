//! Purpose: Codec provider for `Map<K, V>`.
//! Exports: `MapRepresentationProvider`, `MapRepresentation`, `MapFactory`.
//! Role: Composite codec keyed by the (key type, value type) pair.
//! Invariants: Wire shape is an array of two-element arrays, so keys may be any type.
//! Invariants: Decoded maps come from the provider's map factory (default: unordered hash map).
//! Notes: Entry order after a round trip is unspecified; compare maps as entry sets.
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
use crate::core::value::{Value, ValueMap};

/// Hook producing the empty map each decode fills.
pub type MapFactory = Arc<dyn Fn() -> ValueMap + Send + Sync>;

pub fn default_map_factory() -> MapFactory {
    Arc::new(ValueMap::new)
}

pub struct MapRepresentationProvider {
    cache: Mutex<HashMap<(TypeRef, TypeRef), SharedRepresentation>>,
    new_map: MapFactory,
}

impl MapRepresentationProvider {
    pub fn new() -> Self {
        Self::with_map_factory(default_map_factory())
    }

    pub fn with_map_factory(new_map: MapFactory) -> Self {
        Self {
            cache: Mutex::new(HashMap::new()),
            new_map,
        }
    }
}

impl Default for MapRepresentationProvider {
    fn default() -> Self {
        Self::new()
    }
}

impl RepresentationProvider for MapRepresentationProvider {
    fn raw_type(&self) -> RawType {
        RawType::Map
    }

    fn representation_for(
        &self,
        registry: &Representations,
        params: &[TypeRef],
    ) -> Result<SharedRepresentation, Error> {
        let [key_ty, val_ty] = params else {
            return Err(arity_error(&RawType::Map, 2, params));
        };
        let cache_key = (key_ty.clone(), val_ty.clone());
        let cached = self.cache.lock().get(&cache_key).cloned();
        if let Some(cached) = cached {
            match cached.ensure_ready() {
                Ok(()) => {
                    trace!(key = %key_ty, value = %val_ty, "map representation cache hit");
                    return Ok(cached);
                }
                Err(err) => {
                    debug!(key = %key_ty, value = %val_ty, error = %err, "evicting stale map representation");
                    evict(&self.cache, &cache_key, &cached);
                }
            }
        }

        let key = registry.for_type(key_ty)?;
        let value = registry.for_type(val_ty)?;
        let mut cache = self.cache.lock();
        let representation = cache.entry(cache_key).or_insert_with(|| {
            let ty = TypeRef::map(key_ty.clone(), val_ty.clone());
            debug!(ty = %ty, "constructed map representation");
            Arc::new(MapRepresentation {
                ty,
                key,
                value,
                new_map: Arc::clone(&self.new_map),
            })
        });
        Ok(Arc::clone(representation))
    }
}

pub struct MapRepresentation {
    ty: TypeRef,
    key: SharedRepresentation,
    value: SharedRepresentation,
    new_map: MapFactory,
}

impl fmt::Debug for MapRepresentation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MapRepresentation")
            .field("ty", &format_args!("{}", self.ty))
            .finish()
    }
}

impl Representation for MapRepresentation {
    fn type_ref(&self) -> &TypeRef {
        &self.ty
    }

    fn ensure_ready(&self) -> Result<(), Error> {
        self.key.ensure_ready()?;
        self.value.ensure_ready()
    }

    fn read(&self, reader: &mut JsonReader<'_>) -> Result<Value, Error> {
        let mut map = (self.new_map)();
        ARRAY.read_each(reader, |reader| {
            reader.skip_white_space().consume('[')?;
            let key = self.key.read(reader)?;
            reader.skip_white_space().consume(',')?;
            let value = self.value.read(reader)?;
            reader.skip_white_space().consume(']')?;
            map.insert(key, value);
            Ok(())
        })?;
        Ok(Value::Map(map))
    }

    fn write(&self, value: &Value, writer: &mut JsonWriter) -> Result<(), Error> {
        let Value::Map(map) = value else {
            return Err(type_mismatch(&self.ty, value));
        };
        let mut seq = ARRAY.begin(writer);
        for (key, val) in map {
            seq.item(writer);
            writer.append('[');
            self.key.write(key, writer)?;
            writer.append(',');
            self.value.write(val, writer)?;
            writer.append(']');
        }
        seq.end(writer);
        Ok(())
    }
}
