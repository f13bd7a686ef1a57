//! Dashboard aggregates.

pub mod kpi;
