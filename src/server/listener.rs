use std::sync::Arc;

use anyhow::Context;
use tokio::net::TcpListener;
use tokio::sync::Semaphore;
use tracing::{info, warn};

use crate::config::Config;
use crate::http::connection::Connection;
use crate::portal::router::Router;
use crate::server::shutdown::ShutdownSignal;

pub async fn run(cfg: &Config, shutdown: Arc<dyn ShutdownSignal>) -> anyhow::Result<()> {
    let router = Arc::new(Router::from_config(cfg, shutdown)?);

    let listener = TcpListener::bind(&cfg.server.listen_addr)
        .await
        .with_context(|| format!("binding {}", cfg.server.listen_addr))?;
    info!("Listening on {}", cfg.server.listen_addr);
    info!(
        document_root = %cfg.portal.document_root.display(),
        redirect = router.redirect_location(),
        "Portal ready"
    );

    serve(listener, router, cfg.server.max_clients).await
}

/// Accepts connections until the listener fails, with at most `max_clients`
/// served at once.
pub async fn serve(
    listener: TcpListener,
    router: Arc<Router>,
    max_clients: usize,
) -> anyhow::Result<()> {
    let slots = Arc::new(Semaphore::new(max_clients));

    loop {
        let (socket, peer) = listener.accept().await?;

        let Ok(permit) = Arc::clone(&slots).try_acquire_owned() else {
            warn!(%peer, max_clients, "Too many clients, dropping connection");
            continue;
        };
        info!("Accepted connection from {}", peer);

        let router = Arc::clone(&router);
        tokio::spawn(async move {
            let _permit = permit;
            let mut conn = Connection::new(socket, router);
            if let Err(e) = conn.run().await {
                tracing::error!("Connection error from {}: {}", peer, e);
            }
        });
    }
}
