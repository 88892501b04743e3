use anyhow::Context;
use std::net::SocketAddr;
use tracing::info;
use tracing_subscriber::EnvFilter;
use zomato_storage::{connect, ExplorerConfig, Session};

mod api;
mod metrics;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let cfg = ExplorerConfig::from_env();
    let gateway = connect(&cfg)
        .await
        .with_context(|| format!("opening {}", cfg.target))?;
    let session = Session::open(gateway, cfg.result_cache)
        .await
        .with_context(|| format!("starting session on {}", cfg.target))?
        .with_cache_capacity(cfg.cache_entries);
    let app = api::router(api::AppState::new(session));

    let http_addr: SocketAddr = std::env::var("HTTP_ADDR")
        .unwrap_or_else(|_| "0.0.0.0:8080".to_string())
        .parse()
        .context("HTTP_ADDR")?;

    let tls = std::env::var("TLS_CERT_PATH").ok().zip(std::env::var("TLS_KEY_PATH").ok());
    if let Some((cert_path, key_path)) = tls {
        let cert = std::fs::read(&cert_path).with_context(|| format!("read cert {cert_path}"))?;
        let key = std::fs::read(&key_path).with_context(|| format!("read key {key_path}"))?;
        let config = axum_server::tls_rustls::RustlsConfig::from_pem(cert, key)
            .await
            .context("tls")?;
        info!("https listening on {}", http_addr);
        axum_server::bind_rustls(http_addr, config)
            .serve(app.into_make_service())
            .await?;
    } else {
        info!("http listening on {}", http_addr);
        axum_server::bind(http_addr)
            .serve(app.into_make_service())
            .await?;
    }
    Ok(())
}
