// Library interface for testing

pub mod comments;
pub mod config;
pub mod constants;
pub mod db;
pub mod error;
pub mod export;
pub mod queries;
pub mod schema;
pub mod segments;
pub mod settings;
pub mod status;
pub mod store;

pub use comments::{NewComment, ResumeCursor};
pub use config::StoreConfig;
pub use error::StoreError;
pub use segments::SegmentUpdate;
pub use store::SessionStore;
