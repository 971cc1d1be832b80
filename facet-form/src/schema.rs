//! Classification of a type's settable properties into scalars, entities,
//! components and collections, from facet [`Shape`]s.

use alloc::vec::Vec;

use facet_core::{
    Characteristic, Def, Field, KnownPointer, ScalarType, Shape, StructKind, Type, UserType,
    Variant,
};

use crate::BinderConfig;

/// The bindable surface of one struct type.
#[derive(Debug, Clone)]
pub struct TypeSchema {
    /// The described type.
    pub shape: &'static Shape,
    /// Settable properties, in declaration order.
    pub properties: Vec<PropertyDescriptor>,
    /// Index into `properties` of the identity property, for entities.
    pub identity: Option<usize>,
}

impl TypeSchema {
    /// The identity property, if this type is an entity.
    pub fn identity(&self) -> Option<&PropertyDescriptor> {
        self.identity.map(|idx| &self.properties[idx])
    }

    /// Whether this type carries an identity.
    pub fn is_entity(&self) -> bool {
        self.identity.is_some()
    }
}

/// A settable property and how it binds.
#[derive(Debug, Clone)]
pub struct PropertyDescriptor {
    /// The property's (possibly renamed) name, as it appears in form keys.
    pub name: &'static str,
    /// The declared type, before `Option`/`Box` wrappers are peeled.
    pub shape: &'static Shape,
    /// Whether the declared type is an `Option`.
    pub optional: bool,
    /// Whether materializing can fill this property in when it is absent,
    /// from a `#[facet(default)]` or the declared type's `Default`.
    pub has_default: bool,
    /// Whether this is the owning type's identity property.
    pub is_identity: bool,
    /// The binding strategy.
    pub kind: PropertyKind,
}

/// How a property binds.
#[derive(Debug, Clone)]
pub enum PropertyKind {
    /// Converted from a single raw value.
    Scalar(ScalarDescriptor),
    /// A type with an identity: resolved through the lookup, or built fresh.
    Entity(EntityDescriptor),
    /// A nested struct without identity: always built in place.
    Component(&'static Shape),
    /// A list or set of scalars, entities or components.
    Collection(CollectionDescriptor),
    /// No binding strategy exists for this type.
    Unsupported,
}

/// A scalar target type.
#[derive(Debug, Clone, Copy)]
pub struct ScalarDescriptor {
    /// The scalar's shape (wrappers peeled).
    pub shape: &'static Shape,
    /// How raw strings convert to it.
    pub kind: ScalarKind,
}

/// The conversion family of a scalar type.
#[derive(Debug, Clone, Copy)]
#[non_exhaustive]
pub enum ScalarKind {
    /// One of facet's built-in scalars: numbers, bool, char, strings.
    Primitive(ScalarType),
    /// `uuid::Uuid`; the empty string is the nil UUID.
    Uuid,
    /// A chrono date or timestamp.
    Date(DateKind),
    /// An enum whose variants all carry no data; matched by variant name.
    UnitEnum(&'static [Variant]),
    /// Some other scalar with its own parser; the raw string is handed to it as is.
    Parsed,
}

/// Supported chrono types.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DateKind {
    /// `chrono::NaiveDate`, as `YYYY-MM-DD`.
    NaiveDate,
    /// `chrono::NaiveDateTime`, as `YYYY-MM-DDTHH:MM[:SS]`.
    NaiveDateTime,
    /// `chrono::DateTime<Utc>`, as RFC 3339.
    DateTimeUtc,
}

/// An entity target type.
#[derive(Debug, Clone, Copy)]
pub struct EntityDescriptor {
    /// The entity's struct shape (wrappers peeled).
    pub shape: &'static Shape,
    /// Name of its identity property.
    pub identity_name: &'static str,
    /// Type of its identity property.
    pub identity: ScalarDescriptor,
}

/// A collection target type.
#[derive(Debug, Clone, Copy)]
pub struct CollectionDescriptor {
    /// The collection's shape (`Vec<T>`, `HashSet<T>`, ...).
    pub shape: &'static Shape,
    /// How each element binds.
    pub element: ElementKind,
}

/// How the elements of a collection bind.
#[derive(Debug, Clone, Copy)]
pub enum ElementKind {
    /// Each raw value converts to one element.
    Scalar(ScalarDescriptor),
    /// Elements are entities: resolved by identity, or bound from indexed keys.
    Entity(EntityDescriptor),
    /// Elements are plain structs bound from indexed keys.
    Component(&'static Shape),
}

/// Describe the settable properties of a struct type.
///
/// Returns `None` for types that aren't structs with named fields.
pub fn describe(shape: &'static Shape, config: &BinderConfig) -> Option<TypeSchema> {
    let fields = named_fields(shape)?;
    let identity_field = identity_field(fields, config);

    let mut properties = Vec::with_capacity(fields.len());
    let mut identity = None;
    for (idx, field) in fields.iter().enumerate() {
        if field.should_skip_deserializing() {
            tracing::trace!("{}: skipping read-only field {}", shape, field.effective_name());
            continue;
        }

        let declared = field.shape();
        let (peeled, optional) = peel(declared);
        let is_identity = identity_field == Some(idx);
        let kind = if field.is_flattened() {
            PropertyKind::Unsupported
        } else {
            classify(peeled, config)
        };

        if is_identity {
            identity = Some(properties.len());
        }
        properties.push(PropertyDescriptor {
            name: field.effective_name(),
            shape: declared,
            optional,
            has_default: field.has_default() || declared.is(Characteristic::Default),
            is_identity,
            kind,
        });
    }

    Some(TypeSchema {
        shape,
        properties,
        identity,
    })
}

/// The entity view of `shape`, if it is a struct with a scalar identity property.
pub fn entity(shape: &'static Shape, config: &BinderConfig) -> Option<EntityDescriptor> {
    let fields = named_fields(shape)?;
    let field = &fields[identity_field(fields, config)?];
    let identity = scalar(peel(field.shape()).0)?;
    Some(EntityDescriptor {
        shape,
        identity_name: field.effective_name(),
        identity,
    })
}

fn classify(shape: &'static Shape, config: &BinderConfig) -> PropertyKind {
    match &shape.def {
        Def::List(ld) => return collection(shape, ld.t(), config),
        Def::Set(sd) => return collection(shape, sd.t(), config),
        _ => {}
    }

    if let Some(scalar) = scalar(shape) {
        return PropertyKind::Scalar(scalar);
    }
    if let Some(entity) = entity(shape, config) {
        return PropertyKind::Entity(entity);
    }
    if named_fields(shape).is_some() {
        return PropertyKind::Component(shape);
    }
    PropertyKind::Unsupported
}

fn collection(
    shape: &'static Shape,
    element: &'static Shape,
    config: &BinderConfig,
) -> PropertyKind {
    let (element, _) = peel(element);
    let element = if let Some(scalar) = scalar(element) {
        ElementKind::Scalar(scalar)
    } else if let Some(entity) = entity(element, config) {
        ElementKind::Entity(entity)
    } else if named_fields(element).is_some() {
        ElementKind::Component(element)
    } else {
        return PropertyKind::Unsupported;
    };
    PropertyKind::Collection(CollectionDescriptor { shape, element })
}

/// Classify `shape` as a scalar, if it is one.
pub fn scalar(shape: &'static Shape) -> Option<ScalarDescriptor> {
    let kind = if shape.is_type::<uuid::Uuid>() {
        ScalarKind::Uuid
    } else if shape.is_type::<chrono::NaiveDate>() {
        ScalarKind::Date(DateKind::NaiveDate)
    } else if shape.is_type::<chrono::NaiveDateTime>() {
        ScalarKind::Date(DateKind::NaiveDateTime)
    } else if shape.is_type::<chrono::DateTime<chrono::Utc>>() {
        ScalarKind::Date(DateKind::DateTimeUtc)
    } else if let Some(scalar_type) = shape.scalar_type() {
        ScalarKind::Primitive(scalar_type)
    } else if let Type::User(UserType::Enum(ed)) = &shape.ty {
        if ed.variants.is_empty()
            || ed.variants.iter().any(|v| v.data.kind != StructKind::Unit)
        {
            return None;
        }
        ScalarKind::UnitEnum(ed.variants)
    } else if let (Type::User(UserType::Struct(_)), Some(inner)) = (&shape.ty, shape.inner) {
        // transparent newtypes bind as whatever they wrap
        return scalar(inner);
    } else if matches!(shape.def, Def::Scalar) {
        ScalarKind::Parsed
    } else {
        return None;
    };
    Some(ScalarDescriptor { shape, kind })
}

/// Strip `Option`, `Box`, `Arc` and `Rc` wrappers, noting whether an `Option` was seen.
pub fn peel(shape: &'static Shape) -> (&'static Shape, bool) {
    let mut shape = shape;
    let mut optional = false;
    loop {
        match &shape.def {
            Def::Option(od) => {
                optional = true;
                shape = od.t();
            }
            Def::Pointer(pd)
                if matches!(
                    pd.known,
                    Some(KnownPointer::Box | KnownPointer::Arc | KnownPointer::Rc)
                ) =>
            {
                match pd.pointee() {
                    Some(pointee) => shape = pointee,
                    None => break,
                }
            }
            _ => break,
        }
    }
    (shape, optional)
}

fn named_fields(shape: &'static Shape) -> Option<&'static [Field]> {
    match &shape.ty {
        Type::User(UserType::Struct(st)) if st.kind == StructKind::Struct => Some(st.fields),
        _ => None,
    }
}

fn identity_field(fields: &'static [Field], config: &BinderConfig) -> Option<usize> {
    fields
        .iter()
        .position(|field| field.has_attr(Some("form"), "id"))
        .or_else(|| {
            fields.iter().position(|field| {
                !field.should_skip_deserializing()
                    && field
                        .effective_name()
                        .eq_ignore_ascii_case(&config.identity_property)
            })
        })
}
