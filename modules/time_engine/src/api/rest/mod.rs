pub mod dto;
pub mod error;
pub mod extract;
pub mod handlers;
pub mod openapi;
pub mod problem;
pub mod request_id;
pub mod routes;
pub mod sse;

pub use routes::{router, HttpOptions};
pub use sse::{SseBroadcaster, SseEventPublisher};
