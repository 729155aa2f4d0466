//! Cross-module scenarios.

mod end_to_end;
pub(crate) mod support;
