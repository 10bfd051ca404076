pub mod cli;
pub mod error;
pub mod executor;
pub mod gateway;
pub mod mcp_server;
pub mod normalize;
pub mod operations;
pub mod registry;
pub mod schema;

pub use cli::CliClient;
pub use error::{GatewayError, RemoteErrorKind, ServerError};
pub use executor::{AwsClient, OperationHandler, ProviderFailure};
pub use gateway::{DispatchGateway, ToolInvocationRequest};
pub use mcp_server::McpServer;
pub use normalize::NormalizedResult;
pub use registry::{OperationDescriptor, OperationRegistry};
pub use schema::{ParamSchema, ParamSpec, ParamType};

/// Maximum size for tool response output
pub const MAX_TOOL_RESPONSE_SIZE: usize = 100_000;
