pub mod http;
pub mod provider;
pub mod sse;
pub mod types;

pub use http::HttpBackend;
pub use provider::{Backend, BackendError};
pub use types::{FeedbackBody, MessageRecord, SessionRecord, TokenEvent};
