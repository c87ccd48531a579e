//! Record-linkage adapter
//!
//! The service trait, its Mainzelliste implementation, a client factory and
//! the wire models.

pub mod client;
pub mod mainzelliste;
pub mod models;
mod traits;

pub use client::LinkageClient;
pub use mainzelliste::MainzellisteService;
pub use models::{
    CreateTokens, IdString, IdentityEntry, IdentityFields, IdentitySubmission, ReadGrant,
    SubmissionReply,
};
pub use traits::RecordLinkageService;
