pub mod api;

use crate::cli::Args;
use std::error::Error;
use std::net::SocketAddr;
use log::{ error, info };

pub use api::{ router, AppState };

pub struct Server {
    args: Args,
    state: AppState,
}

impl Server {
    pub fn new(args: Args, state: AppState) -> Self {
        Self { args, state }
    }

    pub async fn run(self) -> Result<(), Box<dyn Error + Send + Sync>> {
        let addr = self.args.server_addr().parse::<SocketAddr>()?;
        let app = router(self.state);

        if self.args.enable_tls && self.args.tls_paths().is_none() {
            error!("Both --tls-cert-path and --tls-key-path must be provided to enable TLS.");
            return Err("Missing TLS certificate or key path".into());
        }

        match self.args.tls_paths() {
            Some((cert_path, key_path)) => {
                // No-op when a process-wide provider is already installed.
                let _ = rustls::crypto::ring::default_provider().install_default();
                info!(
                    "TLS enabled. Loading certificate from '{}' and key from '{}'",
                    cert_path,
                    key_path
                );
                let tls_config = axum_server::tls_rustls::RustlsConfig::from_pem_file(
                    cert_path,
                    key_path
                ).await?;

                info!("HTTPS server listening on: https://{}", addr);
                axum_server::bind_rustls(addr, tls_config).serve(app.into_make_service()).await?;
            }
            None => {
                let listener = tokio::net::TcpListener::bind(addr).await?;
                info!("HTTP server listening on: http://{}", addr);
                axum::serve(listener, app.into_make_service()).await?;
            }
        }

        Ok(())
    }
}
