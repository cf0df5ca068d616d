// Kiln - kiln-error
// Module: Error Kinds
//
// Copyright (c) 2025 Ralf Anton Beier
// Licensed under the MIT license.
// SPDX-License-Identifier: MIT

//! Error kinds and constructor helpers.
//!
//! Each kind is a small message wrapper that converts into [`Error`] with
//! the matching category and generic code. The lowercase functions are
//! shorthands for the same conversion.

use std::borrow::Cow;

use crate::{codes, Error, ErrorCategory};

macro_rules! define_kind {
    ($(#[$doc:meta])* $name:ident, $ctor:ident, $category:expr, $code:expr) => {
        $(#[$doc])*
        #[derive(Debug, Clone, PartialEq, Eq)]
        pub struct $name(pub Cow<'static, str>);

        impl From<$name> for Error {
            fn from(kind: $name) -> Self {
                Error::new($category, $code, kind.0)
            }
        }

        $(#[$doc])*
        #[must_use]
        pub fn $ctor(message: impl Into<Cow<'static, str>>) -> Error {
            $name(message.into()).into()
        }
    };
}

define_kind!(
    /// Malformed binary module (decode error)
    ParseError,
    parse_error,
    ErrorCategory::Parse,
    codes::PARSE_ERROR
);
define_kind!(
    /// Module failed validation
    ValidationError,
    validation_error,
    ErrorCategory::Validation,
    codes::VALIDATION_ERROR
);
define_kind!(
    /// Imports could not be resolved
    LinkError,
    link_error,
    ErrorCategory::Link,
    codes::LINK_ERROR
);
define_kind!(
    /// Values of the wrong type or count crossed the embedding boundary
    TypeError,
    type_error,
    ErrorCategory::Type,
    codes::ARGUMENT_TYPE_MISMATCH
);
define_kind!(
    /// A resource limit was reached
    ResourceError,
    resource_error,
    ErrorCategory::Resource,
    codes::RESOURCE_LIMIT
);
define_kind!(
    /// A named item does not exist
    NotFoundError,
    not_found_error,
    ErrorCategory::NotFound,
    codes::EXPORT_NOT_FOUND
);

/// Generic runtime failure outside of WebAssembly execution
#[must_use]
pub fn runtime_error(message: impl Into<Cow<'static, str>>) -> Error {
    Error::new(ErrorCategory::Runtime, codes::RUNTIME_ERROR, message)
}
