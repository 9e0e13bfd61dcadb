#![forbid(unsafe_code)]
//! lcyield-store: the event-data access layer.
//!
//! An [`EventStore`] treats an ordered list of record files as one logical
//! table. Columns are read only once activated; each active column is bound
//! to a [`ColumnRef`] cell that the cursor rewrites in place on every row, so
//! selection code binds its columns once and then reads them per row without
//! lookups. Friend tables add row-aligned columns from other files.
//!
//! Cells are `Rc`-shared, so a store is `!Send`, and [`EventStore::iterate`]
//! takes `&mut self`: two iterations over one store cannot coexist.

pub mod cell;
pub mod cut;
pub mod error;
pub mod iter;
pub mod scoped;
pub mod store;

pub use cell::ColumnRef;
pub use cut::{BoundCut, Cut};
pub use error::{Error, Result};
pub use iter::Entries;
pub use scoped::ScopedStore;
pub use store::EventStore;
