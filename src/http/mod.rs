pub mod payload;
pub mod routes;
pub mod server;

pub use payload::TranscriptPayload;
pub use server::{build_router, serve};
