//! Data models for SmartLib

pub mod book;
pub mod dates;
pub mod member;
pub mod session;
pub mod transaction;

// Re-export commonly used types
pub use book::{Book, BookInput};
pub use member::{Borrower, BorrowerType, Program, Staff, Student};
pub use session::{AdminClaims, AdminSession};
pub use transaction::{ReturnPerformance, Transaction, TransactionStatus};
