//! Record trait: uniform field access for every record shape.

use std::borrow::Cow;

/// A homogeneous record shape the query engine can filter and sort.
///
/// Field lookup never fails: unknown names read as `""`. Each shape declares
/// which of its fields carry numeric semantics so that sorting can compare
/// them as numbers instead of text.
pub trait Record {
    /// Field names compared numerically when used as a sort key.
    const NUMERIC_FIELDS: &'static [&'static str];

    fn field(&self, name: &str) -> Cow<'_, str>;

    fn is_numeric_field(name: &str) -> bool
    where
        Self: Sized,
    {
        Self::NUMERIC_FIELDS.contains(&name)
    }
}
