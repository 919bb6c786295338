//! Purpose: Explicit class descriptors standing in for runtime reflection.
//! Exports: `Capability`, `Class`, `ClassBuilder`, `FieldDecl`, `Object`.
//! Role: Describes declared fields, member markers, ancestry, and construction.
//! Invariants: A class's slot layout is its parent's layout followed by its own fields.
//! Invariants: Objects only hold values that conform to the declared field type.
//! Notes: Field lookups by name resolve to the most-derived declaration.
use std::hash::{Hash, Hasher};
use std::sync::Arc;

use crate::core::error::{Error, ErrorKind};
use crate::core::types::TypeRef;
use crate::core::value::Value;

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Capability {
    /// Eligible for member-based object mapping.
    Structure,
    /// Identity-bearing; never serialized by value.
    Entity,
    Plain,
}

#[derive(Clone, Debug)]
pub struct FieldDecl {
    owner: Arc<str>,
    name: Arc<str>,
    ty: TypeRef,
    member: bool,
    default: Option<Value>,
    slot: usize,
}

impl FieldDecl {
    pub fn owner(&self) -> &str {
        &self.owner
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn ty(&self) -> &TypeRef {
        &self.ty
    }

    /// Whether the field carries the member marker.
    pub fn is_member(&self) -> bool {
        self.member
    }

    pub fn default_value(&self) -> Option<&Value> {
        self.default.as_ref()
    }

    pub(crate) fn slot(&self) -> usize {
        self.slot
    }

    pub(crate) fn name_arc(&self) -> Arc<str> {
        Arc::clone(&self.name)
    }
}

#[derive(Debug)]
pub struct Class {
    name: Arc<str>,
    capability: Capability,
    parent: Option<Arc<Class>>,
    fields: Vec<FieldDecl>,
    constructible: bool,
    slot_count: usize,
}

impl Class {
    pub fn structure(name: &str) -> ClassBuilder {
        ClassBuilder::new(name, Capability::Structure)
    }

    pub fn entity(name: &str) -> ClassBuilder {
        ClassBuilder::new(name, Capability::Entity)
    }

    pub fn plain(name: &str) -> ClassBuilder {
        ClassBuilder::new(name, Capability::Plain)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn capability(&self) -> Capability {
        self.capability
    }

    pub fn is_structure(&self) -> bool {
        self.capability == Capability::Structure
    }

    pub fn is_entity(&self) -> bool {
        self.capability == Capability::Entity
    }

    pub fn parent(&self) -> Option<&Arc<Class>> {
        self.parent.as_ref()
    }

    pub fn declared_fields(&self) -> &[FieldDecl] {
        &self.fields
    }

    pub fn has_default_constructor(&self) -> bool {
        self.constructible
    }

    /// This class followed by each ancestor, most-derived first.
    pub fn ancestry(&self) -> impl Iterator<Item = &Class> {
        std::iter::successors(Some(self), |class| class.parent.as_deref())
    }

    /// Most-derived declaration of `name` anywhere in the ancestry.
    pub fn field(&self, name: &str) -> Option<&FieldDecl> {
        self.ancestry()
            .find_map(|class| class.fields.iter().find(|field| &*field.name == name))
    }

    /// Runs the no-argument constructor: every slot starts at its declared default.
    pub fn instantiate(self: &Arc<Self>) -> Result<Object, Error> {
        if !self.constructible {
            return Err(Error::new(ErrorKind::Instantiation)
                .with_message(format!("class {} has no no-argument constructor", self.name))
                .with_hint("Declare a default constructor for classes decoded from JSON."));
        }
        let mut slots = vec![None; self.slot_count];
        for class in self.ancestry() {
            for field in &class.fields {
                slots[field.slot] = field.default.clone();
            }
        }
        Ok(Object {
            class: Arc::clone(self),
            slots,
        })
    }
}

pub struct ClassBuilder {
    name: Arc<str>,
    capability: Capability,
    parent: Option<Arc<Class>>,
    fields: Vec<(String, TypeRef, bool, Option<Value>)>,
    constructible: bool,
}

impl ClassBuilder {
    fn new(name: &str, capability: Capability) -> Self {
        Self {
            name: Arc::from(name),
            capability,
            parent: None,
            fields: Vec::new(),
            constructible: true,
        }
    }

    pub fn extends(mut self, parent: &Arc<Class>) -> Self {
        self.parent = Some(Arc::clone(parent));
        self
    }

    pub fn member(self, name: &str, ty: TypeRef) -> Self {
        self.declare(name, ty, true, None)
    }

    pub fn member_with_default(self, name: &str, ty: TypeRef, default: impl Into<Value>) -> Self {
        self.declare(name, ty, true, Some(default.into()))
    }

    /// A field without the member marker; it is never read or written.
    pub fn field(self, name: &str, ty: TypeRef) -> Self {
        self.declare(name, ty, false, None)
    }

    pub fn without_default_constructor(mut self) -> Self {
        self.constructible = false;
        self
    }

    pub fn build(self) -> Result<Arc<Class>, Error> {
        let slot_base = self.parent.as_ref().map_or(0, |parent| parent.slot_count);
        let mut fields: Vec<FieldDecl> = Vec::with_capacity(self.fields.len());
        for (idx, (name, ty, member, default)) in self.fields.into_iter().enumerate() {
            if fields.iter().any(|field| *field.name == *name) {
                return Err(Error::new(ErrorKind::Configuration)
                    .with_message(format!("duplicate field in class {}", self.name))
                    .with_field(name));
            }
            if let Some(value) = &default {
                if !value.conforms_to(&ty) {
                    return Err(Error::new(ErrorKind::Configuration)
                        .with_message(format!(
                            "default {} does not conform to declared type {ty}",
                            value.kind_name()
                        ))
                        .with_field(name));
                }
            }
            fields.push(FieldDecl {
                owner: Arc::clone(&self.name),
                name: Arc::from(name.as_str()),
                ty,
                member,
                default,
                slot: slot_base + idx,
            });
        }
        let slot_count = slot_base + fields.len();
        Ok(Arc::new(Class {
            name: self.name,
            capability: self.capability,
            parent: self.parent,
            fields,
            constructible: self.constructible,
            slot_count,
        }))
    }

    fn declare(mut self, name: &str, ty: TypeRef, member: bool, default: Option<Value>) -> Self {
        self.fields.push((name.to_string(), ty, member, default));
        self
    }
}

/// An instance of a `Class`; one optional value per field across the ancestry.
#[derive(Clone, Debug)]
pub struct Object {
    class: Arc<Class>,
    slots: Vec<Option<Value>>,
}

impl Object {
    pub fn class(&self) -> &Arc<Class> {
        &self.class
    }

    pub fn get(&self, name: &str) -> Result<Option<&Value>, Error> {
        let field = self.lookup(name)?;
        Ok(self.slots[field.slot].as_ref())
    }

    pub fn set(&mut self, name: &str, value: impl Into<Value>) -> Result<(), Error> {
        let field = self.lookup(name)?.clone();
        self.set_field(&field, Some(value.into()))
    }

    pub fn clear(&mut self, name: &str) -> Result<(), Error> {
        let field = self.lookup(name)?.clone();
        self.set_field(&field, None)
    }

    /// Chainable `set`, convenient when assembling fixtures.
    pub fn with(mut self, name: &str, value: impl Into<Value>) -> Result<Self, Error> {
        self.set(name, value)?;
        Ok(self)
    }

    pub(crate) fn get_field(&self, field: &FieldDecl) -> Result<Option<&Value>, Error> {
        self.check_owner(field)?;
        Ok(self.slots[field.slot].as_ref())
    }

    pub(crate) fn set_field(&mut self, field: &FieldDecl, value: Option<Value>) -> Result<(), Error> {
        self.check_owner(field)?;
        if let Some(value) = &value {
            if !value.conforms_to(&field.ty) {
                return Err(Error::new(ErrorKind::Semantic)
                    .with_message(format!(
                        "cannot assign {} to field of type {}",
                        value.kind_name(),
                        field.ty
                    ))
                    .with_field(field.name()));
            }
        }
        self.slots[field.slot] = value;
        Ok(())
    }

    fn lookup(&self, name: &str) -> Result<&FieldDecl, Error> {
        self.class.field(name).ok_or_else(|| {
            Error::new(ErrorKind::Semantic)
                .with_message(format!("class {} has no such field", self.class.name))
                .with_field(name)
        })
    }

    fn check_owner(&self, field: &FieldDecl) -> Result<(), Error> {
        let owned = self
            .class
            .ancestry()
            .any(|class| Arc::ptr_eq(&class.name, &field.owner));
        if owned {
            return Ok(());
        }
        Err(Error::new(ErrorKind::Semantic)
            .with_message(format!(
                "field declared on {} is not part of {}",
                field.owner, self.class.name
            ))
            .with_field(field.name()))
    }
}

impl PartialEq for Object {
    fn eq(&self, other: &Self) -> bool {
        self.class.name == other.class.name && self.slots == other.slots
    }
}

impl Eq for Object {}

impl Hash for Object {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.class.name.hash(state);
        self.slots.hash(state);
    }
}
