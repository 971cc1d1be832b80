#![warn(missing_docs)]
#![warn(clippy::std_instead_of_core)]
#![warn(clippy::std_instead_of_alloc)]
#![forbid(unsafe_code)]
#![doc = include_str!("../README.md")]

extern crate alloc;

mod binder;
mod collection;
mod convert;
mod encode;
mod error;
mod form;
mod guard;
mod key_path;
pub mod lookup;
pub mod schema;
mod values;

#[cfg(feature = "axum")]
mod axum;

pub use binder::{Binder, BinderConfig, Binding, SharedBinder, bind, from_str};
pub use convert::{convert, parse_bool};
pub use encode::{identity_key, to_value};
pub use error::{
    BindError, BindErrorKind, BindErrors, BindFailure, BindFailureKind, ConversionError,
    EncodeError,
};
pub use form::Form;
pub use guard::RecursionGuard;
pub use key_path::{KeyPath, KeyPathError, KeyPathErrorKind, Segment};
pub use lookup::{IdentityLookup, InMemoryStore, NoLookup, Repositories, Repository};
pub use values::FlatValueSet;

#[cfg(feature = "axum")]
pub use axum::FormRejection;

// Form binding extension attributes for use with #[facet(form::attr)] syntax.
//
// After importing `use facet_form as form;`, users can write:
//   #[facet(form::id)]
facet::define_attr_grammar! {
    ns "form";
    crate_path ::facet_form;

    /// Form binding attribute types for field configuration.
    pub enum Attr {
        /// Marks a field as the entity's identity, whatever its name.
        ///
        /// Takes precedence over [`BinderConfig::identity_property`].
        Id,
    }
}
