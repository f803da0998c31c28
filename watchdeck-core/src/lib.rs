//! watchdeck core library — project model, registry rules, config persistence.
//!
//! - [`types`] — newtypes and domain structs
//! - [`error`] — [`RegistryError`]
//! - [`registry`] — [`Registry`] add / remove / clean / list
//! - [`listing`] — structured field groups for renderers
//! - [`store`] — load / save of `~/.watchdeck/watchdeck.yaml`

pub mod error;
pub mod listing;
pub mod registry;
pub mod store;
pub mod types;

pub use error::RegistryError;
pub use listing::{Field, FieldGroup, FieldValue, Group, ProjectListing};
pub use registry::{AddRequest, Registry};
pub use store::ConfigFile;
pub use types::{Command, HookPoint, Legacy, Project, ProjectName, Settings, Streams, Watcher};
