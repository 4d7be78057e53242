//! rusty-forum/crates/rf-core/src/lib.rs
//!
//! The data layer and interface definitions for Rusty-Forum: a relational
//! forum schema (users, categories, subs, threads, posts, sessions) kept in
//! a schemaless key-value store.

pub mod error;
pub mod fields;
pub mod forum;
pub mod keys;
pub mod models;
pub mod page;
pub mod repos;
pub mod store;
pub mod traits;

// Re-exporting for easier access in other crates
pub use error::*;
pub use fields::{FieldMap, Record, StoredRecord, SystemClock};
pub use forum::Forum;
pub use keys::Collection;
pub use models::*;
pub use page::Page;
pub use repos::*;
pub use store::RecordStore;
pub use traits::*;

#[cfg(test)]
mod tests {
    use super::models::*;

    #[test]
    fn test_with_user_derefs_to_record() {
        let category = Category {
            id: Id(1),
            title: "General".to_string(),
        };
        let resolved = WithUser {
            record: category,
            user: None,
        };
        assert_eq!(resolved.title, "General");
        assert!(resolved.user.is_none());
    }
}
