pub mod adapter;
pub mod attachments;
pub mod error;
pub mod mime;
pub mod poller;
pub mod reply;
pub mod summary;
pub mod thread;
pub mod transport;

pub use adapter::{EmailAdapter, EmailAdapterConfig};
pub use error::EmailError;
