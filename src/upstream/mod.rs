//! Upstream Module
//!
//! Seams to the external collaborators: the document store that is the
//! system of record, and the authentication provider. The in-memory
//! implementations back local runs and tests.

mod auth;
mod documents;

pub use auth::{AuthError, Authenticator, StaticTokenAuthenticator, Subject};
pub use documents::{Document, DocumentStore, Filter, MemoryDocumentStore, StoreError};

// == Collections ==
pub const USERS: &str = "users";
pub const PAGES: &str = "pages";
