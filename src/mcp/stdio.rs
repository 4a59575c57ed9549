//! Runs the MCP server over stdio (`bombe serve`), the default transport
//! for editor/agent integrations that spawn `bombe` as a child process.

use super::BombeServer;
use crate::indexing::IndexFacade;
use rmcp::ServiceExt;
use rmcp::transport::stdio;

pub async fn run_stdio_server(facade: IndexFacade) -> anyhow::Result<()> {
    let server = BombeServer::new(facade);
    let service = server.serve(stdio()).await?;
    service.waiting().await?;
    Ok(())
}
