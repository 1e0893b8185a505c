pub mod data_stream;
pub mod providers;
pub mod sse;

pub use providers::{ProviderError, ProviderStream, StreamChunk, TextProvider};
