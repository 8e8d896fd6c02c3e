pub mod backend;
pub mod capability;
pub mod config;
pub mod convert;
pub mod daylog;
pub mod error;
pub mod extract;
pub mod record;
pub mod station;
pub mod store;
