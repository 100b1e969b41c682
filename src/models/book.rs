//! Book (catalog entry) model

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use validator::Validate;

/// Catalog entry as stored in the `books` collection.
///
/// The catalog code (`New NO.`) is the book's identity and doubles as the
/// document id. Availability is never stored here.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct Book {
    /// Document id
    #[serde(default)]
    pub id: String,
    #[serde(rename = "S.NO", default)]
    pub serial_no: i64,
    #[serde(rename = "New NO.")]
    pub catalog_no: String,
    #[serde(rename = "NAME OF THE BOOK")]
    pub title: String,
    #[serde(rename = "AUTHOR NAME", default)]
    pub author: String,
    #[serde(rename = "PUBLICATION", default)]
    pub publisher: String,
}

impl Book {
    /// Case-insensitive match on title, author or catalog code
    pub fn matches(&self, query: &str) -> bool {
        let query = query.trim().to_lowercase();
        query.is_empty()
            || self.title.to_lowercase().contains(&query)
            || self.author.to_lowercase().contains(&query)
            || self.catalog_no.to_lowercase().contains(&query)
    }
}

/// Create or replace a book
#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
pub struct BookInput {
    #[serde(rename = "S.NO", default)]
    #[validate(range(min = 0))]
    pub serial_no: i64,
    #[serde(rename = "New NO.")]
    #[validate(length(min = 1, message = "Catalog number is required"))]
    pub catalog_no: String,
    #[serde(rename = "NAME OF THE BOOK")]
    #[validate(length(min = 1, message = "Book name is required"))]
    pub title: String,
    #[serde(rename = "AUTHOR NAME")]
    #[validate(length(min = 1, message = "Author is required"))]
    pub author: String,
    #[serde(rename = "PUBLICATION")]
    #[validate(length(min = 1, message = "Publication is required"))]
    pub publisher: String,
}

impl From<BookInput> for Book {
    fn from(input: BookInput) -> Self {
        let catalog_no = input.catalog_no.trim().to_string();
        Self {
            id: catalog_no.clone(),
            serial_no: input.serial_no,
            catalog_no,
            title: input.title.trim().to_string(),
            author: input.author.trim().to_string(),
            publisher: input.publisher.trim().to_string(),
        }
    }
}
