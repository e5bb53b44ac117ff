//! Project API module
//!
//! The sync engine talks to projects exclusively through the
//! [`ProjectClient`](client::ProjectClient) trait. [`GraphqlClient`] is the production
//! implementation; [`Connection`] binds a client to a branch.

pub mod client;
pub mod connection;
pub mod error;
pub mod graphql;
pub mod models;
pub mod pagination;

#[cfg(test)]
pub mod memory;

pub use connection::{Connection, RevisionSelector};
pub use error::ApiError;
pub use graphql::GraphqlClient;
pub use models::{Migration, MigrationStatus, ProjectRef, RevisionInfo, RowRecord};
pub use pagination::DEFAULT_PAGE_SIZE;
