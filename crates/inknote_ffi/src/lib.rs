//! Flutter bridge for InkNote core.

pub mod api;
