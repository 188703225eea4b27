//! Admin API transport for ferry.
//!
//! This crate is the request-forwarding collaborator of the migration engine:
//! it knows how to reach a store (URL + access token) over REST and GraphQL,
//! and nothing about what is being migrated.
//!
//! ## Features
//!
//! - **Connection**: store identity with URL normalization and token redaction
//! - **AdminApi**: the `get`/`post`/`put`/`graphql` capability trait the engine consumes
//! - **AdminClient**: reqwest implementation with status/429/GraphQL error mapping
//! - **GraphQL**: cursor-pagination and `userErrors` wire types

mod client;
mod config;
mod connection;
mod error;
pub mod graphql;

pub use client::{ACCESS_TOKEN_HEADER, AdminApi, AdminClient};
pub use config::{ClientConfig, ClientConfigBuilder, DEFAULT_API_VERSION};
pub use connection::Connection;
pub use error::AdminError;
pub use graphql::{Edge, Page, PageInfo, UserError};
