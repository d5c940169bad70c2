use std::{process, sync::Arc};

use riquadro::{
    application::{fetch::UpstreamClient, relay::RelayService},
    config,
    infra::{
        error::InfraError,
        http::{self, RelayState},
        telemetry,
    },
};
use tracing::{Dispatch, Level, dispatcher, error, info};
use tracing_subscriber::fmt as tracing_fmt;

#[tokio::main]
async fn main() {
    if let Err(error) = run().await {
        report_application_error(&error);
        process::exit(1);
    }
}

fn report_application_error(error: &InfraError) {
    if dispatcher::has_been_set() {
        error!(error = %error, "application error");
        return;
    }

    let subscriber = tracing_fmt().with_max_level(Level::ERROR).finish();
    let dispatch = Dispatch::new(subscriber);
    dispatcher::with_default(&dispatch, || {
        error!(error = %error, "application error");
    });
}

async fn run() -> Result<(), InfraError> {
    let (_cli_args, settings) = config::load_with_cli()
        .map_err(|err| InfraError::configuration(format!("failed to load configuration: {err}")))?;

    telemetry::init(&settings.logging)?;

    let user_agent = format!("{}/{}", settings.app.name, settings.app.version);
    let upstream = UpstreamClient::new(settings.upstream.timeout, &user_agent)
        .map_err(|err| InfraError::configuration(format!("failed to build http client: {err}")))?;
    let relay = Arc::new(RelayService::new(&settings.upstream, upstream));

    let state = RelayState {
        relay,
        app_name: settings.app.name.clone(),
        app_version: settings.app.version.clone(),
        cache_max_age: settings.cache.max_age_seconds,
        public_base_url: settings.server.public_base_url.clone(),
    };

    let router = http::build_router(state, &settings.cors);

    let listener = tokio::net::TcpListener::bind(settings.server.addr).await?;
    info!(
        target = "riquadro::server",
        addr = %settings.server.addr,
        upstream = %settings.upstream.raw_base,
        "listening"
    );

    axum::serve(listener, router.into_make_service()).await?;
    Ok(())
}
