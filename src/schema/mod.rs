// SPDX-License-Identifier: Apache-2.0

//! Schema snapshot cache used to ground query generation.

pub mod cache;
pub mod catalog;
pub mod types;

pub use cache::SchemaCache;
pub use catalog::{CatalogSource, StaticCatalog};
pub use types::{Column, ForeignKey, SchemaSnapshot, Table};
