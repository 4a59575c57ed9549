//! `serve` subcommand: MCP over stdio (default) or the control-plane HTTP
//! server behind the `http-server` feature.

use crate::indexing::IndexFacade;

pub async fn run_stdio(facade: IndexFacade) -> anyhow::Result<()> {
    crate::mcp::stdio::run_stdio_server(facade).await
}

#[cfg(feature = "http-server")]
pub async fn run_http(facade: IndexFacade, bind: &str) -> anyhow::Result<()> {
    let token = facade.runtime().control_plane_token.clone();
    let root = facade.repo_root.join(".bombe");
    let control_plane = crate::mcp::http::ControlPlane::new(root, token);
    let router = control_plane.router();
    let listener = tokio::net::TcpListener::bind(bind).await?;
    tracing::info!(bind, "control-plane HTTP server listening");
    axum::serve(listener, router).await?;
    Ok(())
}

#[cfg(not(feature = "http-server"))]
pub async fn run_http(_facade: IndexFacade, _bind: &str) -> anyhow::Result<()> {
    anyhow::bail!("this build was compiled without the http-server feature")
}
