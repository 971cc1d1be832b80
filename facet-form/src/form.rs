//! The `Form<T>` wrapper: a value that bound from form data without errors.

use core::fmt;
use core::ops::{Deref, DerefMut};

use crate::{BindErrors, Binding};

/// A value bound cleanly from form data.
///
/// With the `axum` feature, `Form<T>` is an extractor that binds the request
/// body and rejects the request if any property failed to bind. Use
/// [`Binding<T>`] instead to receive the errors alongside the value.
///
/// ```
/// use facet::Facet;
/// use facet_form::Form;
///
/// #[derive(Debug, Facet, Default)]
/// #[facet(rename_all = "PascalCase")]
/// struct Territory {
///     id: u32,
///     name: String,
/// }
///
/// let binding = facet_form::from_str::<Territory>("Territory", "Territory.Id=7&Territory.Name=North").unwrap();
/// let form = Form::try_from(binding).unwrap();
/// assert_eq!(form.name, "North");
///
/// let binding = facet_form::from_str::<Territory>("Territory", "Territory.Id=seven").unwrap();
/// let errors = Form::try_from(binding).unwrap_err();
/// assert_eq!(errors.len(), 1);
/// ```
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Form<T>(pub T);

impl<T> Form<T> {
    /// Consume the wrapper and return the inner value.
    #[inline]
    pub fn into_inner(self) -> T {
        self.0
    }
}

impl<T> TryFrom<Binding<T>> for Form<T> {
    type Error = BindErrors;

    fn try_from(binding: Binding<T>) -> Result<Self, Self::Error> {
        binding.into_result().map(Form)
    }
}

impl<T> Deref for Form<T> {
    type Target = T;

    #[inline]
    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl<T> DerefMut for Form<T> {
    #[inline]
    fn deref_mut(&mut self) -> &mut Self::Target {
        &mut self.0
    }
}

impl<T: fmt::Display> fmt::Display for Form<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}
