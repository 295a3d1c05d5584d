pub mod client;
pub mod error;
pub mod model;

pub use client::TimeEngineApi;
pub use error::TimeEngineError;
pub use model::*;
