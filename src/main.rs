use std::{pin::pin, process, sync::Arc, time::Duration};

use jha_site::{
    application::{
        content::ContentService, error::AppError, fetch::ContentFetcher,
        revalidate::RevalidationService, sitemap::SitemapService,
    },
    cache::{CacheConfig, CacheInvalidator, SiteCache},
    config,
    infra::{
        error::InfraError,
        http::{self, HttpState, RevalidateState, RouterState},
        sanity::{ImageUrlBuilder, SanityClient},
        telemetry,
    },
    presentation::pages::PageRenderer,
};
use tokio::sync::Notify;
use tracing::{Dispatch, Level, dispatcher, error, info, warn};
use tracing_subscriber::fmt as tracing_fmt;

#[tokio::main]
async fn main() {
    if let Err(error) = run().await {
        report_application_error(&error);
        process::exit(1);
    }
}

fn report_application_error(error: &AppError) {
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

async fn run() -> Result<(), AppError> {
    let (cli_args, settings) = config::load_with_cli()
        .map_err(|err| AppError::unexpected(format!("failed to load configuration: {err}")))?;

    let command = cli_args
        .command
        .unwrap_or(config::Command::Serve(Box::<config::ServeArgs>::default()));

    telemetry::init(&settings.logging).map_err(AppError::from)?;

    match command {
        config::Command::Serve(_) => run_serve(settings).await,
    }
}

async fn run_serve(settings: config::Settings) -> Result<(), AppError> {
    let state = build_router_state(&settings)?;
    let router = http::build_router(state);

    let listener = tokio::net::TcpListener::bind(settings.server.addr)
        .await
        .map_err(|err| AppError::from(InfraError::from(err)))?;

    info!(
        addr = %settings.server.addr,
        environment = settings.site.environment.as_str(),
        dataset = %settings.cms.dataset,
        "serving site"
    );

    serve_until_shutdown(listener, router, settings.server.graceful_shutdown).await
}

fn build_router_state(settings: &config::Settings) -> Result<RouterState, AppError> {
    let cache = Arc::new(SiteCache::new(CacheConfig::from(&settings.cache)));
    let store = Arc::new(SanityClient::new(&settings.cms)?);
    let fetcher = ContentFetcher::new(store, Arc::clone(&cache));
    let content = ContentService::new(fetcher);

    let sitemap = Arc::new(SitemapService::new(content.clone(), settings.site.clone()));
    let images = ImageUrlBuilder::new(&settings.cms.project_id, &settings.cms.dataset);
    let pages = Arc::new(PageRenderer::new(settings.site.clone(), images));

    let invalidator: Arc<dyn CacheInvalidator> = cache.clone();
    let revalidation = RevalidationService::new(settings.revalidate.secret.clone(), invalidator);

    Ok(RouterState {
        http: HttpState {
            content,
            sitemap,
            pages,
            cache,
        },
        revalidate: RevalidateState {
            service: Arc::new(revalidation),
        },
    })
}

/// Stops accepting on ctrl-c or SIGTERM, then gives in-flight requests
/// `grace` to finish.
async fn serve_until_shutdown(
    listener: tokio::net::TcpListener,
    router: axum::Router,
    grace: Duration,
) -> Result<(), AppError> {
    let stop = Arc::new(Notify::new());
    let server = axum::serve(listener, router.into_make_service())
        .with_graceful_shutdown({
            let stop = Arc::clone(&stop);
            async move { stop.notified().await }
        })
        .into_future();
    let mut server = pin!(server);

    let result = tokio::select! {
        result = &mut server => result,
        () = shutdown_signal() => {
            info!(grace_seconds = grace.as_secs(), "shutdown requested");
            stop.notify_one();
            match tokio::time::timeout(grace, &mut server).await {
                Ok(result) => result,
                Err(_) => {
                    warn!("graceful shutdown timed out; dropping open connections");
                    Ok(())
                }
            }
        }
    };

    result.map_err(|err| AppError::unexpected(format!("server error: {err}")))
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(err) = tokio::signal::ctrl_c().await {
            warn!(error = %err, "failed to listen for ctrl-c");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(err) => {
                warn!(error = %err, "failed to listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {},
        () = terminate => {},
    }
}
