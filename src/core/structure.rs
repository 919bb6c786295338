//! Purpose: Member-based object codecs for classes with the Structure capability.
//! Exports: `StructureRepresentationProvider`, `StructureRepresentation`, `StructureMember`.
//! Role: Builds one member table per concrete class by walking its ancestry.
//! Invariants: The ancestry walk stops at the first ancestor lacking the Structure
//! capability; Structure ancestors above that gap contribute nothing.
//! Invariants: Member-name collisions resolve to the most-derived declaration.
//! Invariants: Configuration errors surface at resolution; missing constructors at first decode.
//! Notes: A class under construction is published as a placeholder so self-referential
//! members resolve on the constructing thread; other threads wait on the provider lock.
use std::cell::RefCell;
use std::collections::{HashMap, HashSet};
use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, OnceLock, Weak};

use parking_lot::ReentrantMutex;
use tracing::{debug, trace, warn};

use crate::core::class::{Class, FieldDecl, Object};
use crate::core::error::{Error, ErrorKind};
use crate::core::registry::Representations;
use crate::core::representation::{
    OBJECT, Representation, RepresentationProvider, Sequence, SharedRepresentation, arity_error,
    type_mismatch,
};
use crate::core::token::{JsonReader, JsonWriter};
use crate::core::types::{RawType, TypeRef};
use crate::core::value::Value;

/// One declared field bound to the codec for its type.
///
/// Fields without the member marker carry no codec and are excluded from I/O.
#[derive(Debug)]
pub struct StructureMember {
    field: FieldDecl,
    representation: Option<SharedRepresentation>,
}

impl StructureMember {
    pub fn new(registry: &Representations, field: &FieldDecl) -> Result<Self, Error> {
        if !field.is_member() {
            return Ok(Self {
                field: field.clone(),
                representation: None,
            });
        }
        let entity_typed = field
            .ty()
            .class_name()
            .and_then(|name| registry.class(name))
            .is_some_and(|class| class.is_entity());
        if entity_typed {
            return Err(Error::new(ErrorKind::Configuration)
                .with_message(format!(
                    "{}.{} is an entity and cannot be a member",
                    field.owner(),
                    field.name()
                ))
                .with_field(field.name())
                .with_hint("Entities carry identity; reference them by key instead."));
        }
        let representation = registry.for_field(field)?;
        Ok(Self {
            field: field.clone(),
            representation: Some(representation),
        })
    }

    pub fn is_member(&self) -> bool {
        self.representation.is_some()
    }

    pub fn name(&self) -> &str {
        self.field.name()
    }

    pub fn field(&self) -> &FieldDecl {
        &self.field
    }

    pub fn get_value<'o>(&self, instance: &'o Object) -> Result<Option<&'o Value>, Error> {
        instance.get_field(&self.field)
    }

    pub fn read_and_set(&self, reader: &mut JsonReader<'_>, instance: &mut Object) -> Result<(), Error> {
        let representation = self.codec()?;
        let value = representation
            .read(reader)
            .map_err(|err| err.with_field(self.name()))?;
        instance.set_field(&self.field, Some(value))
    }

    /// Emits `"name":value` when the current value is present; absent values emit nothing
    /// and leave the sequence's separator state untouched.
    pub fn write(&self, seq: &mut Sequence, writer: &mut JsonWriter, instance: &Object) -> Result<(), Error> {
        if !self.is_member() {
            return Ok(());
        }
        let Some(value) = self.get_value(instance)? else {
            return Ok(());
        };
        let representation = self.codec()?;
        seq.item(writer);
        writer.write_string(self.name())?;
        writer.append(':');
        representation
            .write(value, writer)
            .map_err(|err| err.with_field(self.name()))
    }

    fn codec(&self) -> Result<&SharedRepresentation, Error> {
        self.representation.as_ref().ok_or_else(|| {
            Error::new(ErrorKind::Semantic)
                .with_message("field is not a member")
                .with_field(self.name())
        })
    }
}

#[derive(Debug)]
struct MemberTable {
    /// Write order: outermost collected ancestor first, declaration order within a class.
    members: Vec<StructureMember>,
    by_name: HashMap<Arc<str>, usize>,
}

impl MemberTable {
    fn build(registry: &Representations, class: &Class) -> Result<Self, Error> {
        let levels: Vec<&Class> = class
            .ancestry()
            .take_while(|ancestor| ancestor.is_structure())
            .collect();

        let mut seen: HashSet<&str> = HashSet::new();
        let mut winners: Vec<Vec<&FieldDecl>> = Vec::with_capacity(levels.len());
        for level in &levels {
            let kept = level
                .declared_fields()
                .iter()
                .filter(|field| field.is_member() && seen.insert(field.name()))
                .collect();
            winners.push(kept);
        }

        let mut members = Vec::new();
        let mut by_name = HashMap::new();
        for fields in winners.into_iter().rev() {
            for field in fields {
                let member = StructureMember::new(registry, field)?;
                by_name.insert(field.name_arc(), members.len());
                members.push(member);
            }
        }
        Ok(Self { members, by_name })
    }

    fn get(&self, name: &str) -> Option<&StructureMember> {
        self.by_name.get(name).map(|idx| &self.members[*idx])
    }
}

pub struct StructureRepresentation {
    ty: TypeRef,
    class: Arc<Class>,
    members: OnceLock<MemberTable>,
    /// Set when the construction that published this placeholder was rolled back.
    abandoned: AtomicBool,
    /// Provider lock held for the whole outermost construction.
    gate: Weak<CacheLock>,
}

impl StructureRepresentation {
    fn placeholder(class: Arc<Class>, gate: Weak<CacheLock>) -> Self {
        Self {
            ty: TypeRef::named(class.name()),
            class,
            members: OnceLock::new(),
            abandoned: AtomicBool::new(false),
            gate,
        }
    }

    pub fn class(&self) -> &Arc<Class> {
        &self.class
    }

    /// Member names in write order.
    pub fn member_names(&self) -> Result<Vec<&str>, Error> {
        Ok(self.table()?.members.iter().map(StructureMember::name).collect())
    }

    pub fn member(&self, name: &str) -> Result<Option<&StructureMember>, Error> {
        Ok(self.table()?.get(name))
    }

    fn initialize(&self, registry: &Representations) -> Result<(), Error> {
        let table = MemberTable::build(registry, &self.class)?;
        self.members.set(table).map_err(|_| {
            Error::new(ErrorKind::Internal).with_message(format!(
                "structure {} was initialized twice",
                self.class.name()
            ))
        })
    }

    fn abandon(&self) {
        self.abandoned.store(true, Ordering::Release);
    }

    fn is_abandoned(&self) -> bool {
        self.abandoned.load(Ordering::Acquire)
    }

    fn abandoned_error(&self) -> Error {
        Error::new(ErrorKind::Configuration).with_message(format!(
            "structure {} failed to resolve its members",
            self.class.name()
        ))
    }

    /// Blocks while another thread holds the provider lock for a construction.
    fn wait_for_construction(&self) {
        if let Some(gate) = self.gate.upgrade() {
            drop(gate.lock());
        }
    }

    /// A placeholder reached from another thread waits for the constructing thread
    /// to finish; one still empty afterwards belongs to a rolled-back construction.
    fn table(&self) -> Result<&MemberTable, Error> {
        if let Some(table) = self.members.get() {
            return Ok(table);
        }
        if self.is_abandoned() {
            return Err(self.abandoned_error());
        }
        self.wait_for_construction();
        self.members.get().ok_or_else(|| {
            Error::new(ErrorKind::Configuration).with_message(format!(
                "structure {} did not finish resolving its members",
                self.class.name()
            ))
        })
    }
}

impl fmt::Debug for StructureRepresentation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StructureRepresentation")
            .field("ty", &format_args!("{}", self.ty))
            .field("ready", &self.members.get().is_some())
            .field("abandoned", &self.is_abandoned())
            .finish()
    }
}

impl Representation for StructureRepresentation {
    fn type_ref(&self) -> &TypeRef {
        &self.ty
    }

    /// A placeholder still under construction on the calling thread counts as ready,
    /// so recursive member resolution can reuse cached containers around it.
    fn ensure_ready(&self) -> Result<(), Error> {
        if self.is_abandoned() {
            return Err(self.abandoned_error());
        }
        if self.members.get().is_some() {
            return Ok(());
        }
        self.wait_for_construction();
        if self.is_abandoned() {
            return Err(self.abandoned_error());
        }
        Ok(())
    }

    fn read(&self, reader: &mut JsonReader<'_>) -> Result<Value, Error> {
        let table = self.table()?;
        let mut instance = self.class.instantiate()?;
        OBJECT.read_each(reader, |reader| {
            let offset = reader.skip_white_space().offset();
            let name = reader.read_string()?;
            reader.skip_white_space().consume(':')?;
            let member = table.get(&name).ok_or_else(|| {
                Error::new(ErrorKind::Semantic)
                    .with_message(format!("{} has no member with this name", self.class.name()))
                    .with_field(name.as_str())
                    .with_offset(offset)
            })?;
            member.read_and_set(reader, &mut instance)
        })?;
        Ok(Value::Structure(instance))
    }

    fn write(&self, value: &Value, writer: &mut JsonWriter) -> Result<(), Error> {
        let Value::Structure(instance) = value else {
            return Err(type_mismatch(&self.ty, value));
        };
        if instance.class().name() != self.class.name() {
            return Err(Error::new(ErrorKind::Semantic).with_message(format!(
                "expected instance of {}, found {}",
                self.class.name(),
                instance.class().name()
            )));
        }
        let table = self.table()?;
        let mut seq = OBJECT.begin(writer);
        for member in &table.members {
            member.write(&mut seq, writer, instance)?;
        }
        seq.end(writer);
        Ok(())
    }
}

#[derive(Default)]
struct StructureCache {
    entries: HashMap<Arc<str>, Arc<StructureRepresentation>>,
    /// Placeholders published during the current outermost construction.
    pending: Vec<Arc<StructureRepresentation>>,
    depth: usize,
}

type CacheLock = ReentrantMutex<RefCell<StructureCache>>;

#[derive(Default)]
pub struct StructureRepresentationProvider {
    cache: Arc<CacheLock>,
}

impl StructureRepresentationProvider {
    pub fn new() -> Self {
        Self::default()
    }

    fn resolve_class(
        registry: &Representations,
        params: &[TypeRef],
    ) -> Result<Arc<Class>, Error> {
        let [class_ty] = params else {
            return Err(arity_error(&RawType::Structure, 1, params));
        };
        let name = class_ty
            .class_name()
            .filter(|_| class_ty.args().is_empty())
            .ok_or_else(|| {
                Error::new(ErrorKind::Configuration)
                    .with_message(format!("Structure parameter must be a class, found {class_ty}"))
            })?;
        let class = registry.class(name).ok_or_else(|| {
            Error::new(ErrorKind::Configuration)
                .with_message(format!("unknown class {name}"))
                .with_hint("Register the class on the registry builder.")
        })?;
        if !class.is_structure() {
            return Err(Error::new(ErrorKind::Configuration)
                .with_message(format!("class {name} does not have the Structure capability")));
        }
        Ok(Arc::clone(class))
    }
}

impl RepresentationProvider for StructureRepresentationProvider {
    fn raw_type(&self) -> RawType {
        RawType::Structure
    }

    fn representation_for(
        &self,
        registry: &Representations,
        params: &[TypeRef],
    ) -> Result<SharedRepresentation, Error> {
        let class = Self::resolve_class(registry, params)?;
        let guard = self.cache.lock();
        if let Some(cached) = guard.borrow().entries.get(class.name()) {
            trace!(class = class.name(), "structure representation cache hit");
            return Ok(Arc::clone(cached) as SharedRepresentation);
        }

        let key: Arc<str> = Arc::from(class.name());
        let representation = Arc::new(StructureRepresentation::placeholder(
            class,
            Arc::downgrade(&self.cache),
        ));
        {
            let mut cache = guard.borrow_mut();
            cache.entries.insert(Arc::clone(&key), Arc::clone(&representation));
            cache.pending.push(Arc::clone(&representation));
            cache.depth += 1;
        }

        let outcome = representation.initialize(registry);

        let mut cache = guard.borrow_mut();
        cache.depth -= 1;
        let outermost = cache.depth == 0;
        match outcome {
            Ok(()) => {
                if outermost {
                    cache.pending.clear();
                }
                debug!(class = %key, "constructed structure representation");
                Ok(representation as SharedRepresentation)
            }
            Err(err) => {
                if outermost {
                    let pending = std::mem::take(&mut cache.pending);
                    for stale in &pending {
                        stale.abandon();
                        cache.entries.remove(stale.class.name());
                    }
                    warn!(class = %key, rolled_back = pending.len(), error = %err, "structure resolution failed");
                }
                Err(err)
            }
        }
    }
}
