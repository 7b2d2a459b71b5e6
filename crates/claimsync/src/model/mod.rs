//! Statement data model shared by every stage of a run.
//!
//! A [`Subject`] is the store's record for one real-world entity. It holds
//! [`Statement`]s grouped by [`PropertyKey`] in the order the store returned
//! them. Snapshots are read once per reconciliation and never cached beyond
//! that call.

mod statement;
mod subject;
mod value;

pub use statement::{Rank, Reference, Statement};
pub use subject::Subject;
pub use value::{AssetRef, PropertyKey, Quantity, Value};
