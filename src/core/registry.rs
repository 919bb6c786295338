//! Purpose: Registry mapping raw types to providers, plus the class catalog.
//! Exports: `Representations`, `RepresentationsBuilder`.
//! Role: Single entry point for resolving a representation from a type expression.
//! Invariants: Exactly one provider per raw type; later registrations replace earlier ones.
//! Invariants: Class names are unique within a registry.
//! Notes: Named class types dispatch by capability; only Structure classes have a codec.
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use tracing::debug;

use crate::core::class::{Capability, Class, FieldDecl};
use crate::core::error::{Error, ErrorKind};
use crate::core::list::ListRepresentationProvider;
use crate::core::map::{MapFactory, MapRepresentationProvider, default_map_factory};
use crate::core::primitive::PrimitiveProvider;
use crate::core::representation::{RepresentationProvider, SharedRepresentation};
use crate::core::structure::StructureRepresentationProvider;
use crate::core::token::{DEFAULT_MAX_DEPTH, JsonReader, JsonWriter};
use crate::core::types::{RawType, TypeRef};
use crate::core::value::Value;

pub struct Representations {
    providers: HashMap<RawType, Box<dyn RepresentationProvider>>,
    classes: HashMap<Arc<str>, Arc<Class>>,
    max_depth: usize,
}

impl Representations {
    /// Built-in providers and an empty class catalog.
    pub fn new() -> Self {
        let mut providers: HashMap<RawType, Box<dyn RepresentationProvider>> = HashMap::new();
        for provider in standard_providers(default_map_factory()) {
            providers.insert(provider.raw_type(), provider);
        }
        Self {
            providers,
            classes: HashMap::new(),
            max_depth: DEFAULT_MAX_DEPTH,
        }
    }

    pub fn builder() -> RepresentationsBuilder {
        RepresentationsBuilder::default()
    }

    pub fn class(&self, name: &str) -> Option<&Arc<Class>> {
        self.classes.get(name)
    }

    pub fn max_depth(&self) -> usize {
        self.max_depth
    }

    /// Resolves the shared representation for a fully parameterized type.
    pub fn for_type(&self, ty: &TypeRef) -> Result<SharedRepresentation, Error> {
        match ty.raw() {
            RawType::Named(name) => self.for_class(name, ty),
            raw => {
                let provider = self.providers.get(raw).ok_or_else(|| {
                    Error::new(ErrorKind::Configuration)
                        .with_message(format!("no representation provider for {raw}"))
                })?;
                provider.representation_for(self, ty.args())
            }
        }
    }

    /// Resolves the codec for a declared field; failures carry the field name.
    pub fn for_field(&self, field: &FieldDecl) -> Result<SharedRepresentation, Error> {
        self.for_type(field.ty())
            .map_err(|err| err.with_field(field.name()))
    }

    pub fn decode_str(&self, ty: &TypeRef, input: &str) -> Result<Value, Error> {
        let representation = self.for_type(ty)?;
        let mut reader = JsonReader::new(input).with_max_depth(self.max_depth);
        let value = representation.read(&mut reader)?;
        reader.expect_end()?;
        Ok(value)
    }

    pub fn encode_to_string(&self, ty: &TypeRef, value: &Value) -> Result<String, Error> {
        let representation = self.for_type(ty)?;
        let mut writer = JsonWriter::new();
        representation.write(value, &mut writer)?;
        Ok(writer.into_string())
    }

    fn for_class(&self, name: &str, ty: &TypeRef) -> Result<SharedRepresentation, Error> {
        if !ty.args().is_empty() {
            return Err(Error::new(ErrorKind::Configuration)
                .with_message(format!("class type {ty} cannot take type parameters")));
        }
        let class = self.class(name).ok_or_else(|| {
            Error::new(ErrorKind::Configuration)
                .with_message(format!("unknown type {name}"))
                .with_hint("Register the class on the registry builder.")
        })?;
        match class.capability() {
            Capability::Structure => {
                self.for_type(&TypeRef::new(RawType::Structure, vec![ty.clone()]))
            }
            Capability::Entity => Err(Error::new(ErrorKind::Configuration)
                .with_message(format!("entity {name} has no representation"))),
            Capability::Plain => Err(Error::new(ErrorKind::Configuration).with_message(format!(
                "class {name} lacks the Structure capability and has no representation"
            ))),
        }
    }
}

impl Default for Representations {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for Representations {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut providers: Vec<&str> = self.providers.keys().map(RawType::name).collect();
        providers.sort_unstable();
        let mut classes: Vec<&str> = self.classes.keys().map(|name| &**name).collect();
        classes.sort_unstable();
        f.debug_struct("Representations")
            .field("providers", &providers)
            .field("classes", &classes)
            .field("max_depth", &self.max_depth)
            .finish()
    }
}

fn standard_providers(new_map: MapFactory) -> Vec<Box<dyn RepresentationProvider>> {
    let mut providers: Vec<Box<dyn RepresentationProvider>> = PrimitiveProvider::all()
        .into_iter()
        .map(|provider| Box::new(provider) as Box<dyn RepresentationProvider>)
        .collect();
    providers.push(Box::new(ListRepresentationProvider::new()));
    providers.push(Box::new(MapRepresentationProvider::with_map_factory(new_map)));
    providers.push(Box::new(StructureRepresentationProvider::new()));
    providers
}

pub struct RepresentationsBuilder {
    classes: Vec<Arc<Class>>,
    new_map: MapFactory,
    max_depth: usize,
    overrides: Vec<Box<dyn RepresentationProvider>>,
}

impl Default for RepresentationsBuilder {
    fn default() -> Self {
        Self {
            classes: Vec::new(),
            new_map: default_map_factory(),
            max_depth: DEFAULT_MAX_DEPTH,
            overrides: Vec::new(),
        }
    }
}

impl RepresentationsBuilder {
    /// Registers the class and every ancestor.
    pub fn class(mut self, class: &Arc<Class>) -> Self {
        self.classes.push(Arc::clone(class));
        self
    }

    pub fn map_factory(mut self, new_map: MapFactory) -> Self {
        self.new_map = new_map;
        self
    }

    pub fn max_depth(mut self, max_depth: usize) -> Self {
        self.max_depth = max_depth;
        self
    }

    /// Replaces the provider for the provider's raw type.
    pub fn provider(mut self, provider: Box<dyn RepresentationProvider>) -> Self {
        self.overrides.push(provider);
        self
    }

    pub fn build(self) -> Result<Representations, Error> {
        if self.max_depth == 0 {
            return Err(Error::new(ErrorKind::Usage).with_message("max depth must be at least 1"));
        }
        let mut providers: HashMap<RawType, Box<dyn RepresentationProvider>> = HashMap::new();
        for provider in standard_providers(self.new_map)
            .into_iter()
            .chain(self.overrides)
        {
            let raw = provider.raw_type();
            if let RawType::Named(name) = &raw {
                return Err(Error::new(ErrorKind::Configuration)
                    .with_message(format!("providers cannot claim class type {name}")));
            }
            providers.insert(raw, provider);
        }

        let mut classes: HashMap<Arc<str>, Arc<Class>> = HashMap::new();
        for root in &self.classes {
            let mut current = Some(root);
            while let Some(class) = current {
                match classes.get(class.name()) {
                    Some(existing) if Arc::ptr_eq(existing, class) => break,
                    Some(_) => {
                        return Err(Error::new(ErrorKind::Configuration)
                            .with_message(format!("class name {} registered twice", class.name())));
                    }
                    None => {
                        classes.insert(Arc::from(class.name()), Arc::clone(class));
                    }
                }
                current = class.parent();
            }
        }
        debug!(
            providers = providers.len(),
            classes = classes.len(),
            max_depth = self.max_depth,
            "built representation registry"
        );
        Ok(Representations {
            providers,
            classes,
            max_depth: self.max_depth,
        })
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::Representations;
    use crate::core::class::Class;
    use crate::core::error::ErrorKind;
    use crate::core::primitive::PrimitiveProvider;
    use crate::core::types::{RawType, TypeRef};

    #[test]
    fn resolution_is_memoized_through_the_registry() {
        let registry = Representations::new();
        let ty: TypeRef = "Map<String, List<Long>>".parse().expect("parse");
        let first = registry.for_type(&ty).expect("first");
        let second = registry.for_type(&ty).expect("second");
        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(first.type_ref(), &ty);
    }

    #[test]
    fn field_resolution_names_the_field() {
        let class = Class::structure("Holder")
            .member("bad", TypeRef::named("Nowhere"))
            .build()
            .expect("class");
        let registry = Representations::builder().class(&class).build().expect("registry");
        let field = class.field("bad").expect("field");
        let err = registry.for_field(field).expect_err("unknown");
        assert_eq!(err.kind(), ErrorKind::Configuration);
        assert_eq!(err.field(), Some("bad"));
    }

    #[test]
    fn ancestors_are_registered_and_names_stay_unique() {
        let base = Class::structure("Base").build().expect("base");
        let child = Class::structure("Child").extends(&base).build().expect("child");
        let registry = Representations::builder().class(&child).build().expect("registry");
        assert!(registry.class("Base").is_some());

        let impostor = Class::plain("Base").build().expect("impostor");
        let err = Representations::builder()
            .class(&child)
            .class(&impostor)
            .build()
            .expect_err("duplicate name");
        assert_eq!(err.kind(), ErrorKind::Configuration);
    }

    #[test]
    fn entity_and_plain_classes_have_no_codec() {
        let entity = Class::entity("Account").build().expect("entity");
        let plain = Class::plain("Loose").build().expect("plain");
        let registry = Representations::builder()
            .class(&entity)
            .class(&plain)
            .build()
            .expect("registry");
        for name in ["Account", "Loose", "Unregistered"] {
            let err = registry.for_type(&TypeRef::named(name)).expect_err(name);
            assert_eq!(err.kind(), ErrorKind::Configuration, "{name}");
        }
    }

    #[test]
    fn provider_overrides_replace_builtins() {
        let registry = Representations::builder()
            .provider(Box::new(PrimitiveProvider::long()))
            .build()
            .expect("registry");
        assert!(registry.for_type(&TypeRef::long()).is_ok());
        assert_eq!(RawType::from_name("Long"), RawType::Long);
    }

    #[test]
    fn trailing_input_and_depth_limits_are_enforced() {
        let registry = Representations::builder()
            .max_depth(2)
            .build()
            .expect("registry");
        let ty: TypeRef = "List<List<List<Long>>>".parse().expect("parse");
        let err = registry.decode_str(&ty, "[[[1]]]").expect_err("too deep");
        assert_eq!(err.kind(), ErrorKind::Protocol);
        let shallow: TypeRef = "List<Long>".parse().expect("parse");
        let err = registry.decode_str(&shallow, "[1] 2").expect_err("trailing");
        assert_eq!(err.kind(), ErrorKind::Protocol);
        assert!(Representations::builder().max_depth(0).build().is_err());
    }
}
