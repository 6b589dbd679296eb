mod app;
mod cli;
mod document_view;
mod logging;
mod logo;

use app::PortalApp;
use clap::Parser;
use cli::Cli;
use dp_api::HttpPortalApi;
use dp_core::PortalResult;
use dp_frame::HttpDocumentLoader;
use dp_net::NetStack;
use dp_portal::PortalConfig;
use dp_portal::PortalContext;
use dp_portal::PortalSession;
use eframe::egui;
use std::sync::Arc;

fn main() -> Result<(), eframe::Error> {
    let cli = Cli::parse();
    if let Err(error) = logging::init_logging(&cli.log_config()) {
        eprintln!("DocPortal logging disabled: {error}");
    }

    let (session, net) = match bootstrap(&cli) {
        Ok(value) => value,
        Err(error) => {
            tracing::error!(code = error.code(), %error, "startup failed");
            eprintln!("DocPortal startup error: {error}");
            return Ok(());
        }
    };

    let native_options = eframe::NativeOptions {
        viewport: egui::ViewportBuilder::default()
            .with_title(dp_portal::view::TEXT_LOGO)
            .with_inner_size([1200.0, 800.0])
            .with_min_inner_size([640.0, 480.0]),
        ..Default::default()
    };

    eframe::run_native(
        dp_portal::view::TEXT_LOGO,
        native_options,
        Box::new(|_cc| Ok(Box::new(PortalApp::new(session, net)))),
    )
}

fn bootstrap(cli: &Cli) -> PortalResult<(PortalSession, NetStack)> {
    let config = cli.apply(PortalConfig::from_env());
    tracing::info!(
        server_url = %config.server_url,
        ephemeral = config.ephemeral_storage,
        "starting docportal"
    );

    let net = NetStack::new(cli.net_config())?;
    let api = Arc::new(HttpPortalApi::new(net.clone(), &config.server_url)?);
    let loader = Arc::new(HttpDocumentLoader::new(net.clone()));
    let ctx = PortalContext::new(config, api, loader)?;
    Ok((PortalSession::new(ctx, &cli.initial_path()), net))
}
