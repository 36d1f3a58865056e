pub mod interest_store;

pub use interest_store::{InterestListStore, ListKind, SharedInterestStore};
