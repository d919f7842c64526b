//! In-place normalization of string fields on request values.
//!
//! Every request type implements [`Sanitize`], usually through
//! [`impl_sanitize!`](crate::impl_sanitize), listing the fields that carry
//! text or nested DTOs. Rules:
//!
//! - `String`: leading and trailing whitespace is trimmed.
//! - `Option<String>`: trimmed; an empty result becomes `None`.
//! - Nested DTOs, `Option<T>`, `Vec<T>`, `Box<T>` and map values recurse.
//!
//! Sanitization is idempotent: a second pass changes nothing.

use std::collections::BTreeMap;

/// A value whose text content can be normalized in place.
pub trait Sanitize {
    fn sanitize(&mut self);

    /// Whether the value is empty after sanitization and should collapse to
    /// `None` when held in an `Option`. Only strings are ever blank.
    fn is_blank(&self) -> bool {
        false
    }
}

impl Sanitize for String {
    fn sanitize(&mut self) {
        let trimmed = self.trim();
        if trimmed.len() != self.len() {
            *self = trimmed.to_string();
        }
    }

    fn is_blank(&self) -> bool {
        self.is_empty()
    }
}

impl<T: Sanitize> Sanitize for Option<T> {
    fn sanitize(&mut self) {
        if let Some(inner) = self {
            inner.sanitize();
            if inner.is_blank() {
                *self = None;
            }
        }
    }

    fn is_blank(&self) -> bool {
        self.as_ref().map_or(true, Sanitize::is_blank)
    }
}

impl<T: Sanitize> Sanitize for Vec<T> {
    fn sanitize(&mut self) {
        for item in self.iter_mut() {
            item.sanitize();
        }
    }
}

impl<T: Sanitize + ?Sized> Sanitize for Box<T> {
    fn sanitize(&mut self) {
        (**self).sanitize();
    }

    fn is_blank(&self) -> bool {
        (**self).is_blank()
    }
}

impl<K: Ord, V: Sanitize> Sanitize for BTreeMap<K, V> {
    fn sanitize(&mut self) {
        for value in self.values_mut() {
            value.sanitize();
        }
    }
}

/// Implements [`Sanitize`] for a struct by sanitizing the listed fields.
///
/// Fields left out of the list are not touched.
///
/// ```
/// use storefront_core::impl_sanitize;
///
/// struct RenameProduct {
///     name: String,
///     description: Option<String>,
///     price_cents: u64,
/// }
///
/// impl_sanitize!(RenameProduct { name, description });
/// ```
#[macro_export]
macro_rules! impl_sanitize {
    ($ty:ty { $($field:ident),* $(,)? }) => {
        impl $crate::sanitize::Sanitize for $ty {
            fn sanitize(&mut self) {
                $( $crate::sanitize::Sanitize::sanitize(&mut self.$field); )*
            }
        }
    };
}

/// Implements a no-op [`Sanitize`] for types with no text content.
#[macro_export]
macro_rules! impl_sanitize_noop {
    ($($ty:ty),* $(,)?) => {
        $(
            impl $crate::sanitize::Sanitize for $ty {
                fn sanitize(&mut self) {}
            }
        )*
    };
}

impl_sanitize_noop!(bool, u8, u16, u32, u64, usize, i8, i16, i32, i64, isize, f32, f64, uuid::Uuid, ());

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
