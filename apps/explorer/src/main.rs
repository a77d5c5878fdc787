use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use explorer_core::{
    config::normalize_server_url,
    controller::Controller,
    load_settings,
    render::{FocusLayer, MemoryFocusLayer, MemoryTarget, RenderTarget},
    standard_router, HttpTransport, Settings, Surfaces,
};
use tracing::info;
use tracing_subscriber::EnvFilter;

/// Drives the sidebar router against a running explorer server and prints
/// what each navigation renders.
#[derive(Parser, Debug)]
struct Args {
    /// Overrides the configured server URL.
    #[arg(long)]
    server_url: Option<String>,
    /// Explorer URLs to navigate to, in order (e.g. `/way/123`).
    #[arg(required = true)]
    urls: Vec<String>,
}

/// Applies the command-line server URL on top of the loaded settings.
fn resolve_settings(mut settings: Settings, server_url: Option<&str>) -> Result<Settings> {
    if let Some(server_url) = server_url {
        settings.server_url = normalize_server_url(server_url)?;
    }
    Ok(settings)
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();
    let args = Args::parse();

    let settings = resolve_settings(load_settings()?, args.server_url.as_deref())?;
    info!(server_url = %settings.server_url, "explorer: starting");

    let transport = Arc::new(
        HttpTransport::new(&settings.server_url).context("failed to build HTTP transport")?,
    );
    let sidebar = Arc::new(MemoryTarget::new());
    let focus = Arc::new(MemoryFocusLayer::new());
    let mut router = standard_router(
        &settings,
        transport,
        Surfaces::new(sidebar.clone(), focus.clone()),
    )?;

    for url in &args.urls {
        let dispatch = router.dispatch(url).await;
        if let Some(controller) = router.active() {
            controller.settled().await;
        }
        println!(
            "== {url} -> {}",
            dispatch.route.as_deref().unwrap_or("index")
        );
        println!("{}", sidebar.html());
        if let Some(render) = focus.current() {
            println!("focus: {}", serde_json::to_string(&render)?);
        }
    }

    router.unload_active().await;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn server_url_override_is_normalized() {
        let settings =
            resolve_settings(Settings::default(), Some(" https://osm.example/ ")).unwrap();
        assert_eq!(settings.server_url, "https://osm.example");
        assert!(resolve_settings(Settings::default(), Some("osm.example")).is_err());
        assert_eq!(
            resolve_settings(Settings::default(), None).unwrap(),
            Settings::default()
        );
    }
}
