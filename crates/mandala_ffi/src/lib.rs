//! Flutter-facing bridge over the mandala chart core.

pub mod api;
