//! Library members: students and staff

use serde::{Deserialize, Serialize};
use std::fmt;
use utoipa::ToSchema;

/// Study program of a student
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
pub enum Program {
    UG,
    PG,
}

/// Student record from the `students` collection
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct Student {
    /// Document id
    #[serde(default)]
    pub id: String,
    #[serde(rename = "Regno")]
    pub regno: String,
    #[serde(rename = "Name")]
    pub name: String,
    #[serde(rename = "Email", default)]
    pub email: String,
    pub program: Program,
    /// Free-form grouping such as "B.Sc Computer Science - II"
    #[serde(rename = "Education", default)]
    pub education: String,
}

/// Staff record from the `staff` collection
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct Staff {
    /// Document id
    #[serde(default)]
    pub id: String,
    #[serde(rename = "StaffID")]
    pub staff_id: String,
    #[serde(rename = "Name")]
    pub name: String,
    #[serde(rename = "Email", default)]
    pub email: String,
    #[serde(rename = "Department", default)]
    pub department: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum BorrowerType {
    Student,
    Staff,
}

impl fmt::Display for BorrowerType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BorrowerType::Student => f.write_str("student"),
            BorrowerType::Staff => f.write_str("staff"),
        }
    }
}

/// Anyone who can hold a loan
#[derive(Debug, Clone, PartialEq, Eq, Serialize, ToSchema)]
pub struct Borrower {
    pub id: String,
    pub name: String,
    pub email: String,
    pub kind: BorrowerType,
}

impl From<&Student> for Borrower {
    fn from(s: &Student) -> Self {
        Self {
            id: s.regno.clone(),
            name: s.name.clone(),
            email: s.email.clone(),
            kind: BorrowerType::Student,
        }
    }
}

impl From<&Staff> for Borrower {
    fn from(s: &Staff) -> Self {
        Self {
            id: s.staff_id.clone(),
            name: s.name.clone(),
            email: s.email.clone(),
            kind: BorrowerType::Staff,
        }
    }
}

fn contains_ci(haystack: &str, needle: &str) -> bool {
    haystack.to_lowercase().contains(needle)
}

impl Student {
    /// Case-insensitive match on name or registration number
    pub fn matches(&self, query: &str) -> bool {
        let query = query.trim().to_lowercase();
        contains_ci(&self.name, &query) || contains_ci(&self.regno, &query)
    }
}

impl Staff {
    /// Case-insensitive match on name or staff id
    pub fn matches(&self, query: &str) -> bool {
        let query = query.trim().to_lowercase();
        contains_ci(&self.name, &query) || contains_ci(&self.staff_id, &query)
    }
}
