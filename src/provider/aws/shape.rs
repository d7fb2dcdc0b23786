//! Accessor normalization for SDK output shapes.
//!
//! The generated SDK returns `@required` members bare (`&str`, `bool`, `&[T]`)
//! and optional members wrapped (`Option<&str>`, `Option<bool>`). These
//! helpers fold both forms into one so the converters read the same way for
//! every service.

use aws_smithy_types::error::display::DisplayErrorContext;

use crate::provider::ProviderError;

pub(crate) trait Present<'a, T: ?Sized> {
    fn present(self) -> Option<&'a T>;
}

impl<'a, T: ?Sized> Present<'a, T> for &'a T {
    fn present(self) -> Option<&'a T> {
        Some(self)
    }
}

impl<'a, T: ?Sized> Present<'a, T> for Option<&'a T> {
    fn present(self) -> Option<&'a T> {
        self
    }
}

pub(crate) fn present<'a, T: ?Sized>(value: impl Present<'a, T>) -> Option<&'a T> {
    value.present()
}

/// Owned string, empty when absent.
pub(crate) fn text<'a>(value: impl Present<'a, str>) -> String {
    value.present().unwrap_or_default().to_string()
}

/// Owned string, `None` when absent or empty.
pub(crate) fn opt_text<'a>(value: impl Present<'a, str>) -> Option<String> {
    value
        .present()
        .filter(|s| !s.is_empty())
        .map(str::to_string)
}

pub(crate) trait Listed<'a, T> {
    fn listed(self) -> &'a [T];
}

impl<'a, T> Listed<'a, T> for &'a [T] {
    fn listed(self) -> &'a [T] {
        self
    }
}

impl<'a, T> Listed<'a, T> for Option<&'a [T]> {
    fn listed(self) -> &'a [T] {
        self.unwrap_or_default()
    }
}

pub(crate) fn listed<'a, T>(value: impl Listed<'a, T>) -> &'a [T] {
    value.listed()
}

pub(crate) trait Flag {
    fn flag(self) -> Option<bool>;
}

impl Flag for bool {
    fn flag(self) -> Option<bool> {
        Some(self)
    }
}

impl Flag for Option<bool> {
    fn flag(self) -> Option<bool> {
        self
    }
}

pub(crate) fn flag(value: impl Flag) -> Option<bool> {
    value.flag()
}

pub(crate) trait Number {
    fn number(self) -> Option<i32>;
}

impl Number for i32 {
    fn number(self) -> Option<i32> {
        Some(self)
    }
}

impl Number for Option<i32> {
    fn number(self) -> Option<i32> {
        self
    }
}

pub(crate) fn number(value: impl Number) -> Option<i32> {
    value.number()
}

/// Map an SDK error into a [`ProviderError`] tagged with the operation name,
/// keeping the full source chain in the message.
pub(crate) fn failed<E>(operation: &'static str) -> impl FnOnce(E) -> ProviderError
where
    E: std::error::Error,
{
    move |err| ProviderError::new(operation, DisplayErrorContext(&err).to_string())
}

/// Drop empty continuation tokens; some services echo `""` on the last page.
pub(crate) fn next_token<'a>(value: impl Present<'a, str>) -> Option<String> {
    opt_text(value)
}
