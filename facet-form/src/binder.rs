//! The binder: walks a target type's schema and fills a dynamic instance from
//! a [`FlatValueSet`], then materializes it.

use alloc::borrow::ToOwned;
use alloc::boxed::Box;
use alloc::rc::Rc;
use alloc::string::{String, ToString};
use alloc::sync::Arc;
use alloc::vec::Vec;
use std::collections::HashMap;

use facet_core::{ConstTypeId, Facet, Shape};
use facet_value::{Destructured, VObject};
use indexmap::IndexMap;

use crate::convert::{convert, zero};
use crate::encode::to_value;
use crate::guard::RecursionGuard;
use crate::lookup::{IdentityLookup, IdentityResolver, NoLookup, Resolution};
use crate::schema::{
    self, EntityDescriptor, PropertyDescriptor, PropertyKind, ScalarKind, TypeSchema,
};
use crate::{
    BindError, BindErrorKind, BindErrors, BindFailure, BindFailureKind, FlatValueSet, KeyPath,
};

/// Knobs for a [`Binder`].
///
/// ```
/// use facet_form::BinderConfig;
///
/// let config = BinderConfig::default()
///     .with_identity_property("Key")
///     .with_max_depth(8)
///     .with_resolve_root(true);
/// assert_eq!(config.identity_property, "Key");
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BinderConfig {
    /// Name of the identity property, compared ASCII-case-insensitively with
    /// field names. Fields marked `#[facet(form::id)]` take precedence.
    pub identity_property: String,
    /// Maximum number of nested frames, counting the root.
    pub max_depth: usize,
    /// Resolve the root's identity through the lookup instead of binding it
    /// as a plain scalar.
    pub resolve_root: bool,
    /// Report keys under the prefix that fail to parse.
    pub report_malformed_keys: bool,
}

impl Default for BinderConfig {
    fn default() -> Self {
        Self {
            identity_property: "Id".to_owned(),
            max_depth: 32,
            resolve_root: false,
            report_malformed_keys: true,
        }
    }
}

impl BinderConfig {
    /// Set the identity property name.
    pub fn with_identity_property(mut self, name: impl Into<String>) -> Self {
        self.identity_property = name.into();
        self
    }

    /// Set the maximum frame depth.
    pub fn with_max_depth(mut self, max_depth: usize) -> Self {
        self.max_depth = max_depth;
        self
    }

    /// Set whether the root frame resolves its identity.
    pub fn with_resolve_root(mut self, resolve_root: bool) -> Self {
        self.resolve_root = resolve_root;
        self
    }

    /// Set whether malformed keys are reported.
    pub fn with_report_malformed_keys(mut self, report: bool) -> Self {
        self.report_malformed_keys = report;
        self
    }
}

/// The result of a bind: the best-effort value and every error found on the way.
#[derive(Debug)]
pub struct Binding<T> {
    /// The bound value. Properties that failed are left at their default.
    pub value: T,
    /// Errors, in the order they were found.
    pub errors: BindErrors,
}

impl<T> Binding<T> {
    /// Whether binding produced no errors.
    pub fn is_valid(&self) -> bool {
        self.errors.is_empty()
    }

    /// The value if binding was clean, the errors otherwise.
    pub fn into_result(self) -> Result<T, BindErrors> {
        if self.errors.is_empty() {
            Ok(self.value)
        } else {
            Err(self.errors)
        }
    }

    /// Split into value and errors.
    pub fn into_parts(self) -> (T, BindErrors) {
        (self.value, self.errors)
    }
}

/// Binds flat form values onto typed object graphs, resolving entities
/// through `L`.
///
/// A binder holds no per-request state and can be shared between threads
/// when `L` can.
///
/// ```
/// use facet::Facet;
/// use facet_form::{Binder, FlatValueSet, NoLookup};
///
/// #[derive(Facet, Debug, Default)]
/// #[facet(rename_all = "PascalCase")]
/// struct Employee {
///     id: u32,
///     name: String,
/// }
///
/// let values = FlatValueSet::from_urlencoded("Employee.Id=2&Employee.Name=Michael");
/// let binding = Binder::new(NoLookup).bind::<Employee>("Employee", &values).unwrap();
/// assert!(binding.is_valid());
/// assert_eq!(binding.value.id, 2);
/// assert_eq!(binding.value.name, "Michael");
/// ```
#[derive(Debug, Clone, Default)]
pub struct Binder<L = NoLookup> {
    lookup: L,
    config: BinderConfig,
}

/// A binder with a type-erased lookup, shared by reference count.
pub type SharedBinder = Arc<Binder<Box<dyn IdentityLookup + Send + Sync>>>;

impl<L: IdentityLookup> Binder<L> {
    /// A binder with the default configuration.
    pub fn new(lookup: L) -> Self {
        Self::with_config(lookup, BinderConfig::default())
    }

    /// A binder with `config`.
    pub fn with_config(lookup: L, config: BinderConfig) -> Self {
        Self { lookup, config }
    }

    /// The configuration.
    pub fn config(&self) -> &BinderConfig {
        &self.config
    }

    /// The lookup entities are resolved through.
    pub fn lookup(&self) -> &L {
        &self.lookup
    }

    /// Bind a fresh `T` from the keys under `prefix`.
    ///
    /// An empty prefix reads keys relative to `T` itself (`Name`,
    /// `Manager.Name`). Properties without keys keep their default.
    pub fn bind<T: Facet<'static>>(
        &self,
        prefix: &str,
        values: &FlatValueSet,
    ) -> Result<Binding<T>, BindFailure> {
        self.bind_instance(prefix, values, VObject::new())
    }

    /// Bind onto an existing `T`: properties without keys keep their current
    /// value, collections with keys are replaced, and an entity property with
    /// a submitted identity is replaced by the record the lookup returns.
    pub fn bind_onto<T: Facet<'static>>(
        &self,
        prefix: &str,
        values: &FlatValueSet,
        existing: &T,
    ) -> Result<Binding<T>, BindFailure> {
        let instance = match to_value(existing) {
            Ok(value) => match value.destructure() {
                Destructured::Object(object) => object,
                _ => VObject::new(),
            },
            Err(err) => {
                return Err(BindFailure {
                    kind: BindFailureKind::Encode(err),
                    errors: BindErrors::new(),
                });
            }
        };
        self.bind_instance(prefix, values, instance)
    }

    fn bind_instance<T: Facet<'static>>(
        &self,
        prefix: &str,
        values: &FlatValueSet,
        instance: VObject,
    ) -> Result<Binding<T>, BindFailure> {
        let mut walk = Walk::new(&self.lookup, &self.config, values);
        let mut instance = match KeyPath::parse(prefix) {
            Ok(path) => {
                walk.collect_keys(&path);
                walk.bind_root(T::SHAPE, path, instance)
            }
            Err(err) => {
                walk.errors
                    .push(BindError::new(prefix, BindErrorKind::MalformedKey(err)));
                instance
            }
        };
        if let Some(schema) = walk.schema(T::SHAPE) {
            fill_zeros(&schema, &mut instance);
        }

        let errors = walk.errors;
        tracing::debug!("bound {} with {} error(s)", T::SHAPE, errors.len());
        match facet_value::from_value::<T>(instance.into()) {
            Ok(value) => Ok(Binding { value, errors }),
            Err(err) => Err(BindFailure {
                kind: BindFailureKind::Materialize(err),
                errors,
            }),
        }
    }
}

/// Bind a fresh `T` with a binder that has no lookup.
///
/// ```
/// use facet::Facet;
/// use facet_form::FlatValueSet;
///
/// #[derive(Facet, Debug, Default)]
/// struct Search {
///     q: String,
///     page: Option<u32>,
/// }
///
/// let values = FlatValueSet::from_urlencoded("q=rust&page=");
/// let search: Search = facet_form::bind("", &values).unwrap().value;
/// assert_eq!(search.q, "rust");
/// assert_eq!(search.page, None);
/// ```
pub fn bind<T: Facet<'static>>(
    prefix: &str,
    values: &FlatValueSet,
) -> Result<Binding<T>, BindFailure> {
    Binder::new(NoLookup).bind(prefix, values)
}

/// Decode an urlencoded body and bind a fresh `T` from it, with no lookup.
pub fn from_str<T: Facet<'static>>(prefix: &str, input: &str) -> Result<Binding<T>, BindFailure> {
    bind(prefix, &FlatValueSet::from_urlencoded(input))
}

/// An instance under construction, and where its keys live.
pub(crate) struct BindingFrame {
    pub(crate) shape: &'static Shape,
    pub(crate) prefix: KeyPath,
    pub(crate) instance: VObject,
}

/// The state of one bind call.
pub(crate) struct Walk<'a, L: ?Sized> {
    pub(crate) config: &'a BinderConfig,
    pub(crate) resolver: IdentityResolver<'a, L>,
    values: &'a FlatValueSet,
    /// Parsed keys under the prefix, with their raw values.
    pub(crate) entries: IndexMap<KeyPath, Vec<&'a str>>,
    schemas: HashMap<ConstTypeId, Rc<schema::TypeSchema>>,
    pub(crate) guard: RecursionGuard,
    pub(crate) errors: BindErrors,
}

impl<'a, L: IdentityLookup + ?Sized> Walk<'a, L> {
    fn new(lookup: &'a L, config: &'a BinderConfig, values: &'a FlatValueSet) -> Self {
        Self {
            config,
            resolver: IdentityResolver::new(lookup),
            values,
            entries: IndexMap::new(),
            schemas: HashMap::new(),
            guard: RecursionGuard::new(config.max_depth),
            errors: BindErrors::new(),
        }
    }

    fn collect_keys(&mut self, prefix: &KeyPath) {
        let values = self.values;
        for (key, raws) in values.iter() {
            match KeyPath::parse(key) {
                Ok(path) if path.starts_with(prefix) => {
                    self.entries
                        .entry(path)
                        .or_default()
                        .extend(raws.iter().map(String::as_str));
                }
                Ok(_) => {}
                Err(err) => {
                    if self.config.report_malformed_keys && raw_key_under(key, prefix) {
                        self.errors
                            .push(BindError::new(key, BindErrorKind::MalformedKey(err)));
                    } else {
                        tracing::trace!("ignoring malformed key {key:?}");
                    }
                }
            }
        }
    }

    fn bind_root(&mut self, shape: &'static Shape, prefix: KeyPath, instance: VObject) -> VObject {
        let mut instance = instance;
        let mut skip_identity = false;

        if self.config.resolve_root {
            if let Some(entity) = schema::entity(shape, self.config) {
                match self.resolve(&entity, &prefix) {
                    Some(Resolution::Found(record)) => {
                        instance = record;
                        skip_identity = true;
                    }
                    Some(Resolution::NotFound) => return instance,
                    Some(Resolution::NoIdentitySupplied) => {}
                    // the identity didn't convert; it's already reported
                    None => skip_identity = true,
                }
            }
        }

        let fallback = instance.clone();
        self.bind_child(shape, prefix, instance, skip_identity)
            .unwrap_or(fallback)
    }

    pub(crate) fn schema(&mut self, shape: &'static Shape) -> Option<Rc<schema::TypeSchema>> {
        if let Some(schema) = self.schemas.get(&shape.id) {
            return Some(schema.clone());
        }
        let schema = Rc::new(schema::describe(shape, self.config)?);
        self.schemas.insert(shape.id, schema.clone());
        Some(schema)
    }

    /// First raw value stored under exactly `path`.
    pub(crate) fn first(&self, path: &KeyPath) -> Option<&'a str> {
        self.entries
            .get(path)
            .and_then(|raws| raws.first().copied())
    }

    /// Every raw value stored under exactly `path`.
    pub(crate) fn all(&self, path: &KeyPath) -> &[&'a str] {
        self.entries.get(path).map_or(&[], Vec::as_slice)
    }

    /// Whether any key lies strictly below `path`.
    pub(crate) fn has_keys_below(&self, path: &KeyPath) -> bool {
        self.entries
            .keys()
            .any(|key| key.len() > path.len() && key.starts_with(path))
    }

    pub(crate) fn record(&mut self, path: &KeyPath, kind: BindErrorKind) {
        self.errors.push(BindError::new(path.to_string(), kind));
    }

    /// Resolve the identity submitted for an entity at `path`.
    ///
    /// The token is read from `<path>.<Id>`, or else from `<path>` itself.
    /// Returns `None` when the token didn't convert (the error is recorded).
    /// Misses are recorded too, and returned as [`Resolution::NotFound`].
    pub(crate) fn resolve(
        &mut self,
        entity: &EntityDescriptor,
        path: &KeyPath,
    ) -> Option<Resolution> {
        let identity_path = path.child(entity.identity_name);
        let (token_path, token) = match self.first(&identity_path) {
            Some(token) => (identity_path, Some(token)),
            None if !path.is_empty() => (path.clone(), self.first(path)),
            None => (identity_path, None),
        };
        self.resolve_token(entity, &token_path, token)
    }

    /// Resolve `token`, recording conversion failures and misses against `token_path`.
    pub(crate) fn resolve_token(
        &mut self,
        entity: &EntityDescriptor,
        token_path: &KeyPath,
        token: Option<&str>,
    ) -> Option<Resolution> {
        match self.resolver.resolve(entity, token) {
            Ok(Resolution::NotFound) => {
                self.record(
                    token_path,
                    BindErrorKind::IdentityNotFound {
                        entity: entity.shape.type_identifier,
                        identity: token.unwrap_or_default().to_owned(),
                    },
                );
                Some(Resolution::NotFound)
            }
            Ok(resolution) => Some(resolution),
            Err(err) => {
                self.record(token_path, BindErrorKind::Conversion(err));
                None
            }
        }
    }

    /// Open a frame for `shape` at `path` over `instance`, bind it, and close it.
    ///
    /// Returns `None` when the guard refuses the frame.
    pub(crate) fn bind_child(
        &mut self,
        shape: &'static Shape,
        path: KeyPath,
        instance: VObject,
        skip_identity: bool,
    ) -> Option<VObject> {
        if let Err(kind) = self.guard.enter(shape, &path) {
            self.record(&path, kind);
            return None;
        }
        let frame = BindingFrame {
            shape,
            prefix: path,
            instance,
        };
        let (prefix, instance) = self.bind_frame(frame, skip_identity);
        self.guard.leave(shape, &prefix);
        Some(instance)
    }

    fn bind_frame(&mut self, frame: BindingFrame, skip_identity: bool) -> (KeyPath, VObject) {
        let BindingFrame {
            shape,
            prefix,
            mut instance,
        } = frame;
        let Some(schema) = self.schema(shape) else {
            tracing::trace!("{shape} has no bindable properties");
            return (prefix, instance);
        };

        for property in &schema.properties {
            if property.is_identity && skip_identity {
                tracing::trace!("keeping resolved identity of {shape}");
                continue;
            }
            let path = prefix.child(property.name);
            self.bind_property(&mut instance, property, &path);
        }
        fill_zeros(&schema, &mut instance);
        (prefix, instance)
    }

    fn bind_property(
        &mut self,
        instance: &mut VObject,
        property: &PropertyDescriptor,
        path: &KeyPath,
    ) {
        match &property.kind {
            PropertyKind::Scalar(target) => {
                let Some(raw) = self.first(path) else {
                    return;
                };
                if property.is_identity
                    && raw.is_empty()
                    && !matches!(target.kind, ScalarKind::Uuid)
                {
                    tracing::trace!("`{path}`: empty identity left unset");
                    return;
                }
                match convert(raw, target, property.optional) {
                    Ok(value) => {
                        tracing::trace!("`{path}` = {value:?}");
                        instance.insert(property.name, value);
                    }
                    Err(err) => self.record(path, BindErrorKind::Conversion(err)),
                }
            }
            PropertyKind::Entity(entity) => {
                let existing = take_object(instance, property.name);
                if let Some(bound) = self.bind_entity(entity, path, existing) {
                    instance.insert(property.name, bound);
                }
            }
            PropertyKind::Component(shape) => {
                if !self.has_keys_below(path) {
                    return;
                }
                let existing = take_object(instance, property.name).unwrap_or_default();
                let fallback = existing.clone();
                let bound = self
                    .bind_child(*shape, path.clone(), existing, false)
                    .unwrap_or(fallback);
                instance.insert(property.name, bound);
            }
            PropertyKind::Collection(collection) => {
                if let Some(elements) = self.bind_collection(path, collection) {
                    instance.insert(property.name, elements);
                }
            }
            PropertyKind::Unsupported => {
                if self.entries.keys().any(|key| addresses(key, path)) {
                    self.record(
                        path,
                        BindErrorKind::UnsupportedPropertyKind {
                            type_identifier: property.shape.type_identifier,
                        },
                    );
                }
            }
        }
    }

    /// Bind an entity at `path`, starting from `existing` when nothing is
    /// resolved. Returns the object to store, or `None` to leave the slot as
    /// it was.
    pub(crate) fn bind_entity(
        &mut self,
        entity: &EntityDescriptor,
        path: &KeyPath,
        existing: Option<VObject>,
    ) -> Option<VObject> {
        match self.resolve(entity, path) {
            Some(Resolution::Found(record)) => {
                tracing::debug!("`{path}` resolved to a stored {}", entity.shape);
                self.bind_child(entity.shape, path.clone(), record, true)
                    .or(existing)
            }
            Some(Resolution::NoIdentitySupplied) => {
                if !self.has_keys_below(path) {
                    return existing;
                }
                let start = existing.clone().unwrap_or_default();
                self.bind_child(entity.shape, path.clone(), start, false)
                    .or(existing)
            }
            Some(Resolution::NotFound) | None => existing,
        }
    }
}

/// Give scalar properties that have no value yet, and no default to fall back
/// on, their zero value so the frame still materializes.
fn fill_zeros(schema: &TypeSchema, instance: &mut VObject) {
    for property in &schema.properties {
        if property.has_default || instance.contains_key(property.name) {
            continue;
        }
        let PropertyKind::Scalar(target) = &property.kind else {
            continue;
        };
        if let Some(value) = zero(target) {
            tracing::trace!("{}: `{}` starts at {value:?}", schema.shape, property.name);
            instance.insert(property.name, value);
        }
    }
}

/// Whether `key` lies at or below `path`, whatever index it carries on
/// `path`'s last segment.
fn addresses(key: &KeyPath, path: &KeyPath) -> bool {
    key.len() >= path.len()
        && key
            .segments()
            .iter()
            .zip(path.segments())
            .enumerate()
            .all(|(depth, (k, p))| {
                k.name == p.name && (depth + 1 == path.len() || k.index == p.index)
            })
}

/// Whether the unparseable `key` starts at a segment boundary under `prefix`.
fn raw_key_under(key: &str, prefix: &KeyPath) -> bool {
    if prefix.is_empty() {
        return true;
    }
    let prefix = prefix.to_string();
    key.strip_prefix(prefix.as_str())
        .is_some_and(|rest| rest.is_empty() || rest.starts_with(['.', '[']))
}

fn take_object(instance: &mut VObject, name: &str) -> Option<VObject> {
    match instance.remove(name)?.destructure() {
        Destructured::Object(object) => Some(object),
        _ => None,
    }
}
