mod error;
mod server;
mod streaming;
mod upstream;

pub use error::UpstreamError;
pub use server::{
    AppState, GatewayServer, UNEXPECTED_ERROR_MESSAGE, create_router, prompt_param,
};
pub use streaming::{SseRelayStream, data_event, error_event, relay_stream};
pub use upstream::{GeminiUpstream, GenerateRequest, INSTRUCTION_TEMPLATE, Upstream, UpstreamBody};
