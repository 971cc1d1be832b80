//! Binding of list and set properties, from repeated keys (`Tags=a&Tags=b`)
//! and from indexed groups (`Reports[0].Name=...&Reports[1].Name=...`).

use alloc::collections::BTreeMap;

use facet_value::{VArray, VObject, Value};

use crate::binder::Walk;
use crate::convert::convert;
use crate::lookup::{IdentityLookup, Resolution};
use crate::schema::{CollectionDescriptor, ElementKind};
use crate::{BindErrorKind, KeyPath};

impl<L: IdentityLookup + ?Sized> Walk<'_, L> {
    /// Bind the collection at `path`.
    ///
    /// Repeated values under the exact key come first, in submission order;
    /// indexed groups follow in ascending index order. Returns `None` when no
    /// key addresses the collection, so an existing value is kept.
    pub(crate) fn bind_collection(
        &mut self,
        path: &KeyPath,
        collection: &CollectionDescriptor,
    ) -> Option<VArray> {
        let name = path.last()?.name.clone();
        let parent: KeyPath = path.segments()[..path.len() - 1].iter().cloned().collect();

        let indices: BTreeMap<usize, KeyPath> = self
            .entries
            .keys()
            .filter_map(|key| {
                let segment = key.strip_prefix(&parent)?.first()?;
                let index = segment.index.filter(|_| segment.name == name)?;
                Some((index, parent.indexed(&name, index)))
            })
            .collect();
        let raws = self.all(path).to_vec();
        if raws.is_empty() && indices.is_empty() {
            return None;
        }

        let mut elements = VArray::new();
        for raw in raws {
            if let Some(element) = self.unindexed_element(path, raw, collection) {
                elements.push(element);
            }
        }
        for (index, element_path) in indices {
            tracing::trace!("`{path}`: binding element {index}");
            if let Some(element) = self.indexed_element(&element_path, collection) {
                elements.push(element);
            }
        }
        Some(elements)
    }

    fn unindexed_element(
        &mut self,
        path: &KeyPath,
        raw: &str,
        collection: &CollectionDescriptor,
    ) -> Option<Value> {
        match &collection.element {
            ElementKind::Scalar(target) => match convert(raw, target, false) {
                Ok(value) => Some(value),
                Err(err) => {
                    self.record(path, BindErrorKind::Conversion(err));
                    None
                }
            },
            ElementKind::Entity(entity) => match self.resolve_token(entity, path, Some(raw))? {
                Resolution::Found(record) => Some(record.into()),
                Resolution::NotFound | Resolution::NoIdentitySupplied => None,
            },
            ElementKind::Component(shape) => {
                tracing::trace!("`{path}`: {shape} elements need indexed keys, ignoring {raw:?}");
                None
            }
        }
    }

    fn indexed_element(
        &mut self,
        path: &KeyPath,
        collection: &CollectionDescriptor,
    ) -> Option<Value> {
        match &collection.element {
            ElementKind::Scalar(target) => {
                let raw = self.first(path)?;
                match convert(raw, target, false) {
                    Ok(value) => Some(value),
                    Err(err) => {
                        self.record(path, BindErrorKind::Conversion(err));
                        None
                    }
                }
            }
            ElementKind::Entity(entity) => self.bind_entity(entity, path, None).map(Value::from),
            ElementKind::Component(shape) => self
                .bind_child(*shape, path.clone(), VObject::new(), false)
                .map(Value::from),
        }
    }
}
