//! HTTP API handlers
//!
//! Every meeting route identifies the caller through the `X-User-Id` header
//! (see `context`).

pub mod context;
pub mod health;
pub mod meetings;
pub mod reports;
pub mod sse;
pub mod submissions;
pub mod tasks;
pub mod users;

pub use context::USER_ID_HEADER;
pub use health::health_routes;
pub use meetings::meeting_routes;
pub use reports::report_routes;
pub use sse::meeting_event_stream;
pub use submissions::submission_routes;
pub use tasks::task_routes;
pub use users::user_routes;
