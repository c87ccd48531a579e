//! Medical-data store adapter
//!
//! Trait-based so the HTTP store and the in-memory store are interchangeable.

pub mod factory;
pub mod http;
pub mod memory;
pub mod traits;

pub use factory::create_medical_data_store;
pub use http::HttpMedicalDataStore;
pub use memory::InMemoryMedicalDataStore;
pub use traits::{MedicalDataEntry, MedicalDataStore};
