//! Member directory over the student and staff mirrors

use std::collections::BTreeSet;
use std::sync::Arc;

use serde::Deserialize;

use crate::{
    models::{Program, Staff, Student},
    services::library_store::LibraryStore,
};

#[derive(Debug, Clone, Default, Deserialize)]
pub struct StudentQuery {
    pub q: Option<String>,
    pub program: Option<Program>,
    pub education: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct StaffQuery {
    pub q: Option<String>,
}

#[derive(Clone)]
pub struct MembersService {
    library: Arc<LibraryStore>,
}

impl MembersService {
    pub fn new(library: Arc<LibraryStore>) -> Self {
        Self { library }
    }

    pub fn students(&self, query: &StudentQuery) -> Vec<Student> {
        self.library
            .students()
            .iter()
            .filter(|s| query.program.map_or(true, |p| s.program == p))
            .filter(|s| {
                query
                    .education
                    .as_deref()
                    .filter(|e| !e.is_empty())
                    .map_or(true, |e| s.education == e)
            })
            .filter(|s| query.q.as_deref().map_or(true, |q| s.matches(q)))
            .cloned()
            .collect()
    }

    pub fn staff(&self, query: &StaffQuery) -> Vec<Staff> {
        self.library
            .staff()
            .iter()
            .filter(|s| query.q.as_deref().map_or(true, |q| s.matches(q)))
            .cloned()
            .collect()
    }

    /// Distinct education levels, sorted
    pub fn education_levels(&self, program: Option<Program>) -> Vec<String> {
        self.library
            .students()
            .iter()
            .filter(|s| program.map_or(true, |p| s.program == p))
            .map(|s| s.education.trim())
            .filter(|e| !e.is_empty())
            .map(str::to_string)
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect()
    }
}
