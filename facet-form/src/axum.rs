//! Axum extractors for `Form<T>` and `Binding<T>`.
//!
//! Both read an `application/x-www-form-urlencoded` body and bind it with the
//! [`SharedBinder`] found in the router state. Keys are read under the target
//! type's name (`Employee.Name`) when the body uses that prefix, and relative
//! to the type otherwise (`Name`).
//!
//! # Example
//!
//! ```ignore
//! use std::sync::Arc;
//! use axum::{Router, routing::post};
//! use facet::Facet;
//! use facet_form::{Binder, Binding, Form, IdentityLookup, InMemoryStore, SharedBinder};
//!
//! #[derive(Debug, Facet, Default)]
//! #[facet(rename_all = "PascalCase")]
//! struct Employee {
//!     id: u32,
//!     name: String,
//!     manager: Option<Box<Employee>>,
//! }
//!
//! async fn create(Form(employee): Form<Employee>) -> String {
//!     format!("created {}", employee.name)
//! }
//!
//! async fn preview(binding: Binding<Employee>) -> String {
//!     format!("{} error(s)", binding.errors.len())
//! }
//!
//! let lookup: Box<dyn IdentityLookup + Send + Sync> = Box::new(InMemoryStore::new());
//! let binder: SharedBinder = Arc::new(Binder::new(lookup));
//! let app = Router::new()
//!     .route("/employees", post(create))
//!     .route("/employees/preview", post(preview))
//!     .with_state(binder);
//! ```

use std::fmt;

use axum_core::{
    extract::{FromRef, FromRequest, Request},
    response::{IntoResponse, Response},
};
use facet_core::Facet;
use http::{StatusCode, header};
use http_body_util::BodyExt;

use crate::{BindErrors, BindFailure, Binding, FlatValueSet, Form, SharedBinder};

/// Rejection type for form binding.
#[derive(Debug)]
pub struct FormRejection {
    kind: FormRejectionKind,
}

#[derive(Debug)]
enum FormRejectionKind {
    /// Failed to buffer the request body.
    BodyError(axum_core::Error),
    /// Invalid UTF-8 in request body.
    InvalidUtf8,
    /// Missing or invalid `Content-Type` header.
    InvalidContentType,
    /// Some properties failed to bind.
    Binding(BindErrors),
    /// The bound value couldn't be built at all.
    Failure(BindFailure),
}

impl FormRejection {
    /// Returns the status code for this rejection.
    pub const fn status(&self) -> StatusCode {
        match &self.kind {
            FormRejectionKind::BodyError(_) => StatusCode::BAD_REQUEST,
            FormRejectionKind::InvalidUtf8 => StatusCode::BAD_REQUEST,
            FormRejectionKind::InvalidContentType => StatusCode::UNSUPPORTED_MEDIA_TYPE,
            FormRejectionKind::Binding(_) => StatusCode::UNPROCESSABLE_ENTITY,
            FormRejectionKind::Failure(_) => StatusCode::UNPROCESSABLE_ENTITY,
        }
    }

    /// The binding errors, when the rejection is due to them.
    pub fn errors(&self) -> Option<&BindErrors> {
        match &self.kind {
            FormRejectionKind::Binding(errors) => Some(errors),
            FormRejectionKind::Failure(failure) => Some(&failure.errors),
            _ => None,
        }
    }
}

impl fmt::Display for FormRejection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.kind {
            FormRejectionKind::BodyError(err) => {
                write!(f, "Failed to read request body: {err}")
            }
            FormRejectionKind::InvalidUtf8 => {
                write!(f, "Request body is not valid UTF-8")
            }
            FormRejectionKind::InvalidContentType => {
                write!(
                    f,
                    "Invalid `Content-Type` header: expected `application/x-www-form-urlencoded`"
                )
            }
            FormRejectionKind::Binding(errors) => {
                write!(f, "Failed to bind form data: {errors}")
            }
            FormRejectionKind::Failure(failure) => {
                write!(f, "Failed to bind form data: {failure}")
            }
        }
    }
}

impl std::error::Error for FormRejection {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match &self.kind {
            FormRejectionKind::BodyError(err) => Some(err),
            FormRejectionKind::Binding(errors) => Some(errors),
            FormRejectionKind::Failure(failure) => Some(failure),
            FormRejectionKind::InvalidUtf8 => None,
            FormRejectionKind::InvalidContentType => None,
        }
    }
}

impl IntoResponse for FormRejection {
    fn into_response(self) -> Response {
        let body = self.to_string();
        let status = self.status();
        (status, body).into_response()
    }
}

impl From<axum_core::Error> for FormRejection {
    fn from(err: axum_core::Error) -> Self {
        FormRejection {
            kind: FormRejectionKind::BodyError(err),
        }
    }
}

impl From<BindErrors> for FormRejection {
    fn from(errors: BindErrors) -> Self {
        FormRejection {
            kind: FormRejectionKind::Binding(errors),
        }
    }
}

impl From<BindFailure> for FormRejection {
    fn from(failure: BindFailure) -> Self {
        FormRejection {
            kind: FormRejectionKind::Failure(failure),
        }
    }
}

/// Checks if the content type is form-urlencoded.
fn is_form_content_type(req: &Request) -> bool {
    let Some(content_type) = req.headers().get(header::CONTENT_TYPE) else {
        return false;
    };

    let Ok(content_type) = content_type.to_str() else {
        return false;
    };

    content_type.starts_with("application/x-www-form-urlencoded")
}

async fn read_values(req: Request) -> Result<FlatValueSet, FormRejection> {
    if !is_form_content_type(&req) {
        return Err(FormRejection {
            kind: FormRejectionKind::InvalidContentType,
        });
    }

    let bytes = req
        .into_body()
        .collect()
        .await
        .map_err(axum_core::Error::new)?
        .to_bytes();

    let body_str = std::str::from_utf8(&bytes).map_err(|_| FormRejection {
        kind: FormRejectionKind::InvalidUtf8,
    })?;

    Ok(FlatValueSet::from_urlencoded(body_str))
}

/// The prefix keys are read under: the type's name if the form uses it.
fn prefix_for<T: Facet<'static>>(values: &FlatValueSet) -> &'static str {
    let name = T::SHAPE.type_identifier;
    if values.contains_prefix(name) {
        name
    } else {
        ""
    }
}

impl<T, S> FromRequest<S> for Binding<T>
where
    T: Facet<'static>,
    SharedBinder: FromRef<S>,
    S: Send + Sync,
{
    type Rejection = FormRejection;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let binder = SharedBinder::from_ref(state);
        let values = read_values(req).await?;
        let prefix = prefix_for::<T>(&values);
        tracing::debug!("binding {} from {} form keys", T::SHAPE, values.len());
        Ok(binder.bind::<T>(prefix, &values)?)
    }
}

impl<T, S> FromRequest<S> for Form<T>
where
    T: Facet<'static>,
    SharedBinder: FromRef<S>,
    S: Send + Sync,
{
    type Rejection = FormRejection;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let binding = Binding::<T>::from_request(req, state).await?;
        Ok(Form::try_from(binding)?)
    }
}
