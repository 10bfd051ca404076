use std::path::Path;
use std::sync::Arc;

use aws_mcp::cli::CliClient;
use aws_mcp::gateway::DispatchGateway;
use aws_mcp::mcp_server::McpServer;
use aws_mcp::operations;

fn default_region() -> String {
    std::env::var("AWS_REGION")
        .or_else(|_| std::env::var("AWS_DEFAULT_REGION"))
        .unwrap_or_else(|_| operations::DEFAULT_REGION.to_string())
}

/// Cheap presence check only; actual credential resolution is the AWS CLI's
/// job.
fn credentials_present() -> bool {
    let has_env_creds = std::env::var_os("AWS_ACCESS_KEY_ID").is_some()
        && std::env::var_os("AWS_SECRET_ACCESS_KEY").is_some();
    let has_config = std::env::var_os("HOME")
        .map(|home| Path::new(&home).join(".aws").join("credentials").exists())
        .unwrap_or(false);
    has_env_creds || has_config
}

#[tokio::main]
async fn main() -> eyre::Result<()> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter("aws_mcp=info")
        .init();

    let region = default_region();
    tracing::info!("Starting AWS MCP gateway for region: {region}");

    if !credentials_present() {
        tracing::error!("AWS credentials not found. Configure them with 'aws configure' or environment variables.");
        std::process::exit(1);
    }

    let registry = Arc::new(operations::builtin_registry(&region)?);
    let client = match std::env::var("AWS_PROFILE") {
        Ok(profile) => CliClient::with_profile(profile),
        Err(_) => CliClient::new(),
    };
    let gateway = DispatchGateway::new(registry, Arc::new(client));
    let server = McpServer::new(gateway);

    if let Err(e) = server.run().await {
        tracing::error!("Server error: {}", e);
        std::process::exit(1);
    }

    Ok(())
}
