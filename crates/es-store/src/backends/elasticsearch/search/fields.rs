//! Logical to engine field name mapping.

use std::borrow::Cow;

use crate::types::ID_FIELD;

/// The engine's document identifier field.
pub const ENGINE_ID_FIELD: &str = "_id";

/// Suffix of the non-analyzed sub-field every text field carries.
pub const EXACT_SUFFIX: &str = ".keyword";

/// Translates a logical field name into an engine field name:
///
/// - `id` -> `_id`, whatever `exact` says
/// - `exact` -> appends `.keyword`, so term, terms and sort clauses hit the
///   non-analyzed representation instead of the tokenized text
pub fn map_field(name: &str, exact: bool) -> Cow<'_, str> {
    if name == ID_FIELD {
        Cow::Borrowed(ENGINE_ID_FIELD)
    } else if exact {
        Cow::Owned(format!("{name}{EXACT_SUFFIX}"))
    } else {
        Cow::Borrowed(name)
    }
}
