//! Entity identity resolution: the lookup capability the binder calls, and the
//! stores that ship with the crate.

use alloc::boxed::Box;
use alloc::string::String;
use alloc::sync::Arc;
use core::fmt;
use std::collections::HashMap;

use facet_core::{ConstTypeId, Facet, Shape};
use facet_value::{Destructured, VObject, Value};

use crate::convert::convert;
use crate::encode::{identity_key, to_value};
use crate::schema::{self, EntityDescriptor};
use crate::{BinderConfig, ConversionError, EncodeError};

/// Fetches persisted entities by identity.
///
/// `entity` is the shape of the requested type and `identity` its identity
/// value, already converted to the identity property's type (a number for
/// integer ids, a string for strings and UUIDs). A hit returns the record as
/// an object keyed by serialized (renamed) field name, the layout
/// [`facet_value::from_value`] reads.
pub trait IdentityLookup {
    /// Return the record of type `entity` whose identity is `identity`.
    fn get_by_identity(&self, entity: &'static Shape, identity: &Value) -> Option<Value>;
}

impl<L: IdentityLookup + ?Sized> IdentityLookup for &L {
    fn get_by_identity(&self, entity: &'static Shape, identity: &Value) -> Option<Value> {
        (**self).get_by_identity(entity, identity)
    }
}

impl<L: IdentityLookup + ?Sized> IdentityLookup for Box<L> {
    fn get_by_identity(&self, entity: &'static Shape, identity: &Value) -> Option<Value> {
        (**self).get_by_identity(entity, identity)
    }
}

impl<L: IdentityLookup + ?Sized> IdentityLookup for Arc<L> {
    fn get_by_identity(&self, entity: &'static Shape, identity: &Value) -> Option<Value> {
        (**self).get_by_identity(entity, identity)
    }
}

/// A lookup that never finds anything.
///
/// Entity properties still bind from nested keys; a submitted identity token
/// is reported as [`IdentityNotFound`](crate::BindErrorKind::IdentityNotFound).
#[derive(Debug, Clone, Copy, Default)]
pub struct NoLookup;

impl IdentityLookup for NoLookup {
    fn get_by_identity(&self, _entity: &'static Shape, _identity: &Value) -> Option<Value> {
        None
    }
}

/// A lookup backed by a closure. Created by [`from_fn`].
#[derive(Clone, Copy)]
pub struct FnLookup<F>(F);

/// Use a closure as an [`IdentityLookup`].
///
/// ```
/// use facet_form::{IdentityLookup, lookup};
/// use facet_value::Value;
///
/// let lookup = lookup::from_fn(|_shape, id: &Value| (id == &Value::from(7u64)).then(|| Value::NULL));
/// assert!(lookup.get_by_identity(<u8 as facet::Facet>::SHAPE, &Value::from(7u64)).is_some());
/// ```
pub fn from_fn<F>(f: F) -> FnLookup<F>
where
    F: Fn(&'static Shape, &Value) -> Option<Value>,
{
    FnLookup(f)
}

impl<F> IdentityLookup for FnLookup<F>
where
    F: Fn(&'static Shape, &Value) -> Option<Value>,
{
    fn get_by_identity(&self, entity: &'static Shape, identity: &Value) -> Option<Value> {
        (self.0)(entity, identity)
    }
}

impl<F> fmt::Debug for FnLookup<F> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("FnLookup")
    }
}

/// An in-memory record store keyed by entity type and identity.
///
/// Identities are compared by their canonical string, so a record stored
/// under the number `12` is found by the token `"12"`.
#[derive(Debug, Clone, Default)]
pub struct InMemoryStore {
    records: HashMap<(ConstTypeId, String), Value>,
    config: BinderConfig,
}

impl InMemoryStore {
    /// An empty store that finds identity properties the way a default
    /// [`Binder`](crate::Binder) does.
    pub fn new() -> Self {
        Self::default()
    }

    /// An empty store that finds identity properties the way a binder with
    /// `config` does.
    pub fn with_config(config: BinderConfig) -> Self {
        Self {
            records: HashMap::new(),
            config,
        }
    }

    /// Store `record` under its own identity, replacing any earlier record
    /// with the same identity.
    pub fn insert<T: Facet<'static>>(&mut self, record: &T) -> Result<(), EncodeError> {
        let not_an_entity = || EncodeError {
            type_identifier: T::SHAPE.type_identifier,
            reason: "type has no identity property".into(),
        };
        let entity = schema::entity(T::SHAPE, &self.config).ok_or_else(not_an_entity)?;
        let value = to_value(record)?;
        let identity = value
            .as_object()
            .and_then(|object| object.get(entity.identity_name))
            .ok_or_else(not_an_entity)?;
        let key = identity_key(identity);
        tracing::trace!("storing {} with identity {key}", T::SHAPE);
        self.records.insert((T::SHAPE.id, key), value);
        Ok(())
    }

    /// Store a dynamic record for `entity` under `identity`.
    pub fn insert_value(&mut self, entity: &'static Shape, identity: &Value, record: Value) {
        self.records
            .insert((entity.id, identity_key(identity)), record);
    }

    /// Remove the record of type `entity` with `identity`.
    pub fn remove(&mut self, entity: &'static Shape, identity: &Value) -> Option<Value> {
        self.records.remove(&(entity.id, identity_key(identity)))
    }

    /// Number of stored records.
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// Whether the store is empty.
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

impl IdentityLookup for InMemoryStore {
    fn get_by_identity(&self, entity: &'static Shape, identity: &Value) -> Option<Value> {
        self.records
            .get(&(entity.id, identity_key(identity)))
            .cloned()
    }
}

/// A typed source of entities of one type.
///
/// ```
/// use facet::Facet;
/// use facet_form::lookup::{Repositories, Repository};
///
/// #[derive(Facet)]
/// struct Territory { id: u32, name: String }
///
/// struct Territories;
///
/// impl Repository for Territories {
///     type Entity = Territory;
///     type Id = u32;
///
///     fn get(&self, id: &u32) -> Option<Territory> {
///         (*id == 1).then(|| Territory { id: 1, name: "North".into() })
///     }
/// }
///
/// let repositories = Repositories::new().with(Territories);
/// assert_eq!(repositories.len(), 1);
/// ```
pub trait Repository {
    /// The entity type this repository returns.
    type Entity: Facet<'static>;
    /// The entity's identity type.
    type Id: Facet<'static>;

    /// Fetch the entity with identity `id`.
    fn get(&self, id: &Self::Id) -> Option<Self::Entity>;
}

trait ErasedRepository: Send + Sync {
    fn get_value(&self, identity: &Value) -> Option<Value>;
}

impl<R> ErasedRepository for R
where
    R: Repository + Send + Sync,
{
    fn get_value(&self, identity: &Value) -> Option<Value> {
        let id = match facet_value::from_value::<R::Id>(identity.clone()) {
            Ok(id) => id,
            Err(err) => {
                tracing::debug!(
                    "identity {identity:?} is not a valid {}: {err}",
                    <R::Id as Facet>::SHAPE
                );
                return None;
            }
        };
        let entity = self.get(&id)?;
        match to_value(&entity) {
            Ok(value) => Some(value),
            Err(err) => {
                tracing::warn!("{err}");
                None
            }
        }
    }
}

/// A registry of [`Repository`] implementations, one per entity type.
#[derive(Default)]
pub struct Repositories {
    by_entity: HashMap<ConstTypeId, Box<dyn ErasedRepository>>,
}

impl Repositories {
    /// An empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `repository` for its entity type, replacing any earlier one.
    pub fn register<R>(&mut self, repository: R) -> &mut Self
    where
        R: Repository + Send + Sync + 'static,
    {
        self.by_entity
            .insert(<R::Entity as Facet>::SHAPE.id, Box::new(repository));
        self
    }

    /// Builder-style [`register`](Self::register).
    pub fn with<R>(mut self, repository: R) -> Self
    where
        R: Repository + Send + Sync + 'static,
    {
        self.register(repository);
        self
    }

    /// Number of registered repositories.
    pub fn len(&self) -> usize {
        self.by_entity.len()
    }

    /// Whether no repository is registered.
    pub fn is_empty(&self) -> bool {
        self.by_entity.is_empty()
    }
}

impl fmt::Debug for Repositories {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Repositories")
            .field("len", &self.by_entity.len())
            .finish()
    }
}

impl IdentityLookup for Repositories {
    fn get_by_identity(&self, entity: &'static Shape, identity: &Value) -> Option<Value> {
        let Some(repository) = self.by_entity.get(&entity.id) else {
            tracing::debug!("no repository registered for {entity}");
            return None;
        };
        repository.get_value(identity)
    }
}

/// The outcome of resolving an identity token.
#[derive(Debug, Clone, PartialEq)]
pub enum Resolution {
    /// The lookup returned this record.
    Found(VObject),
    /// A token was supplied, but no record has that identity.
    NotFound,
    /// No token (or an empty one) was supplied.
    NoIdentitySupplied,
}

/// Turns identity tokens into records through an [`IdentityLookup`].
pub struct IdentityResolver<'a, L: ?Sized> {
    lookup: &'a L,
}

impl<'a, L: IdentityLookup + ?Sized> IdentityResolver<'a, L> {
    /// Resolve through `lookup`.
    pub fn new(lookup: &'a L) -> Self {
        Self { lookup }
    }

    /// Resolve `token` as the identity of `entity`.
    ///
    /// The token is converted to the identity property's type first; a token
    /// that doesn't convert is an error, never a miss.
    pub fn resolve(
        &self,
        entity: &EntityDescriptor,
        token: Option<&str>,
    ) -> Result<Resolution, ConversionError> {
        let token = match token {
            Some(token) if !token.is_empty() => token,
            _ => return Ok(Resolution::NoIdentitySupplied),
        };

        let identity = convert(token, &entity.identity, false)?;
        tracing::debug!("looking up {} with identity {token}", entity.shape);
        let Some(record) = self.lookup.get_by_identity(entity.shape, &identity) else {
            return Ok(Resolution::NotFound);
        };
        match record.destructure() {
            Destructured::Object(object) => Ok(Resolution::Found(object)),
            other => {
                tracing::warn!(
                    "lookup returned {other:?} for {}, expected an object",
                    entity.shape
                );
                Ok(Resolution::NotFound)
            }
        }
    }
}
