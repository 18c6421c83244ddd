use std::{path::Path, time::Duration};

use actix_web::{dev::Server, http::KeepAlive, middleware::Logger, web, App, HttpServer};
use gophermart_engine::{poller::PollQueue, AccountApi, AccrualClient, OrderPoller, RegistrationApi, SqliteDatabase};
use log::*;

use crate::{
    config::ServerConfig,
    errors::ServerError,
    routes::{health, MyBalanceRoute, MyOrdersRoute, MyWithdrawalsRoute, RegisterOrderRoute, WithdrawRoute},
};

/// Runs the whole service until the HTTP server stops.
///
/// Opens the settlement store and brings its schema up to date, starts the order poller (which picks up every order
/// that was still unsettled when the process last stopped), and serves HTTP. actix stops the server on SIGINT and
/// SIGTERM; once it has stopped, the poller is drained and the database pool is closed.
pub async fn run_server(config: ServerConfig) -> Result<(), ServerError> {
    let url = config.database_url.reveal();
    ensure_db_directory(url);
    let db = SqliteDatabase::new_with_url(url, config.db_max_connections)
        .await
        .map_err(|e| ServerError::InitializeError(e.to_string()))?;
    db.run_migrations().await.map_err(|e| ServerError::InitializeError(e.to_string()))?;
    let accrual = AccrualClient::new(&config.accrual_address, config.accrual_timeout)
        .map_err(|e| ServerError::ConfigurationError(e.to_string()))?;
    info!("🚀️ Using the accrual system at {}", accrual.base_url());
    let poller = OrderPoller::start(db.clone(), accrual, config.poller.clone());
    let result = match create_server_instance(&config, db.clone(), poller.queue()) {
        Ok(srv) => srv.await.map_err(ServerError::from),
        Err(e) => Err(e),
    };
    info!("🚀️ HTTP server stopped");
    poller.shutdown().await;
    db.close().await;
    result
}

pub fn create_server_instance(
    config: &ServerConfig,
    db: SqliteDatabase,
    queue: PollQueue,
) -> Result<Server, ServerError> {
    let srv = HttpServer::new(move || {
        let registration_api = RegistrationApi::new(db.clone(), queue.clone());
        let accounts_api = AccountApi::new(db.clone());
        App::new()
            .wrap(Logger::new("%t (%D ms) %s %a %{Host}i %U").log_target("gm::access_log"))
            .app_data(web::Data::new(registration_api))
            .app_data(web::Data::new(accounts_api))
            .configure(configure_routes)
    })
    .keep_alive(KeepAlive::Timeout(Duration::from_secs(600)))
    .bind((config.host.as_str(), config.port))?
    .run();
    info!("🚀️ Listening on {}:{}", config.host, config.port);
    Ok(srv)
}

/// Registers every route on the app, backed by [`SqliteDatabase`].
pub fn configure_routes(cfg: &mut web::ServiceConfig) {
    let user_scope = web::scope("/api/user")
        .service(RegisterOrderRoute::<SqliteDatabase>::new())
        .service(MyOrdersRoute::<SqliteDatabase>::new())
        .service(MyBalanceRoute::<SqliteDatabase>::new())
        .service(WithdrawRoute::<SqliteDatabase>::new())
        .service(MyWithdrawalsRoute::<SqliteDatabase>::new());
    cfg.service(health).service(user_scope);
}

/// SQLite creates the database file on demand, but not the directory it lives in.
fn ensure_db_directory(url: &str) {
    let Some(path) = url.strip_prefix("sqlite://").map(|p| p.split('?').next().unwrap_or(p)) else {
        return;
    };
    if path.is_empty() || path.starts_with(":memory:") {
        return;
    }
    if let Some(dir) = Path::new(path).parent().filter(|d| !d.as_os_str().is_empty()) {
        if let Err(e) = std::fs::create_dir_all(dir) {
            warn!("🚀️ Could not create the database directory {}. {e}", dir.display());
        }
    }
}
