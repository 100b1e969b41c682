//! Integration tests over the in-memory collection store

mod api;
mod circulation;
mod common;
mod library_sync;
