//! Purpose: Define the public Rust API boundary for representation resolution.
//! Exports: Registry, codec contracts, type/value/class models, and errors.
//! Role: Additive-only surface used by the CLI and integration tests.
//! Invariants: Callers resolve codecs through `Representations`; providers are pluggable.

#[doc(hidden)]
pub use crate::core::error::to_exit_code;
pub use crate::core::class::{Capability, Class, ClassBuilder, FieldDecl, Object};
pub use crate::core::error::{Error, ErrorKind};
pub use crate::core::list::{ListRepresentation, ListRepresentationProvider};
pub use crate::core::map::{MapFactory, MapRepresentation, MapRepresentationProvider};
pub use crate::core::primitive::PrimitiveProvider;
pub use crate::core::registry::{Representations, RepresentationsBuilder};
pub use crate::core::representation::{
    ARRAY, Delimited, OBJECT, Representation, RepresentationProvider, Sequence,
    SharedRepresentation,
};
pub use crate::core::structure::{
    StructureMember, StructureRepresentation, StructureRepresentationProvider,
};
pub use crate::core::token::{DEFAULT_MAX_DEPTH, JsonNumber, JsonReader, JsonWriter};
pub use crate::core::types::{RawType, TypeRef};
pub use crate::core::value::{Value, ValueMap, date_from_millis, date_to_millis};
