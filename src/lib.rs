//! Curator - pinned-product editing for commerce collections.
//!
//! Each collection has its own edit state (pinned products, applied
//! filters, remote fetch status) held in an [`collections::EditRegistry`].
//! An [`session::EditSession`] drives that registry against a
//! [`gateway::Gateway`], and the CLI keeps unsaved drafts between runs in a
//! [`storage::DraftStore`].

pub mod cli;
pub mod collections;
pub mod domain;
pub mod error;
pub mod gateway;
pub mod session;
pub mod storage;

pub use cli::{Cli, Command, Config, OutputFormat};
pub use collections::{CollectionEditState, Completion, EditRegistry, SaveTicket};
pub use error::{Error, GatewayError, Result, StorageError};
pub use session::EditSession;
