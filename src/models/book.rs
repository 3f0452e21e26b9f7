//! Catalog book model

use serde::{Deserialize, Serialize};

use super::borrow::BookRef;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Availability {
    Available,
    Borrowed,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Book {
    pub id: i32,
    pub title: String,
    pub author: String,
    pub availability: Availability,
}

impl Book {
    pub fn is_available(&self) -> bool {
        self.availability == Availability::Available
    }

    /// Snapshot stored on a borrow record
    pub fn snapshot(&self) -> BookRef {
        BookRef {
            id: self.id,
            title: self.title.clone(),
            author: self.author.clone(),
        }
    }
}
