//! # Key Naming
//!
//! Every key the data layer touches is built here. The layout is shared with
//! existing deployments and must stay bit-exact:
//!
//! | Key                               | Type       | Holds                         |
//! |-----------------------------------|------------|-------------------------------|
//! | `{collection}:{id}`               | hash       | one record's fields           |
//! | `{collection}:all`                | sorted set | every live id, by creation    |
//! | `{collection}:{collection}s`      | hash       | unique value → id             |
//! | `{collection}:{id}:{child}s`      | sorted set | child ids owned by a parent   |
//! | `next_id`                         | counter    | global id sequence            |
//!
//! Note the plural is a plain `s` suffix, so categories index under
//! `category:categorys`.

use std::fmt;

use crate::error::Entity;

/// Global id counter shared by every collection.
pub const NEXT_ID_KEY: &str = "next_id";

/// A named group of records of one entity kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Collection {
    User,
    Session,
    Category,
    Sub,
    Thread,
    Post,
}

impl Collection {
    pub const fn name(self) -> &'static str {
        match self {
            Collection::User => "user",
            Collection::Session => "session",
            Collection::Category => "category",
            Collection::Sub => "sub",
            Collection::Thread => "thread",
            Collection::Post => "post",
        }
    }

    pub const fn entity(self) -> Entity {
        match self {
            Collection::User => Entity::User,
            Collection::Session => Entity::Session,
            Collection::Category => Entity::Category,
            Collection::Sub => Entity::Sub,
            Collection::Thread => Entity::Thread,
            Collection::Post => Entity::Post,
        }
    }

    /// `{collection}:{id}`
    pub fn record_key(self, id: impl fmt::Display) -> String {
        format!("{}:{}", self.name(), id)
    }

    /// `{collection}:all`
    pub fn all_key(self) -> String {
        self.record_key("all")
    }

    /// `{collection}:{collection}s`
    pub fn index_key(self) -> String {
        format!("{}:{}s", self.name(), self.name())
    }

    /// `{collection}:{parent_id}:{child}s`
    pub fn children_key(self, parent_id: impl fmt::Display, child: Collection) -> String {
        format!("{}:{}:{}s", self.name(), parent_id, child.name())
    }
}

impl fmt::Display for Collection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}
