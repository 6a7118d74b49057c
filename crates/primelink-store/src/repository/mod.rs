//! # Repository Module
//!
//! SQL lives here and nowhere else.
//!
//! ## Available Repositories
//!
//! - [`KvRepository`] - String key/value rows in `kv_store`

pub mod kv;

pub use kv::KvRepository;
