mod config;
mod error;
mod http_mapping;

pub use config::{InvalidationMode, RepositoryConfig};
pub use error::{translate_store_error, RepoError, Result};
pub use http_mapping::repo_error_to_status_code;
