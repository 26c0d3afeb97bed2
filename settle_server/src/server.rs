use std::time::Duration;

use actix_web::{dev::Server, http::KeepAlive, middleware::Logger, web, web::ServiceConfig, App, HttpServer};
use log::*;
use settle_engine::{
    events::{EventHandlers, EventHooks},
    BillStore,
    ChainClient,
    ConnectionHub,
    EventFeed,
    HubHandle,
    PaymentMonitor,
    SqliteDatabase,
};

use crate::{
    chain_relay::RelayChainClient,
    config::ServerConfig,
    errors::ServerError,
    middleware::HmacMiddlewareFactory,
    routes::{health, ws_connect, ChainEventsRoute, PaymentConfirmationRoute, SplitBillRoute},
};

const HOOK_BUFFER_SIZE: usize = 64;

pub async fn run_server(config: ServerConfig) -> Result<(), ServerError> {
    let db = SqliteDatabase::new_with_url(&config.database_url, 25)
        .await
        .map_err(|e| ServerError::InitializeError(e.to_string()))?;
    db.migrate().await.map_err(|e| ServerError::InitializeError(e.to_string()))?;
    let (hub, hub_task) = ConnectionHub::spawn(config.hub_config());
    let feed = EventFeed::new(config.event_buffer);
    let chain = RelayChainClient::new(&config.relay_url, feed.clone(), config.chain_query_timeout)?;
    let handlers = EventHandlers::new(HOOK_BUFFER_SIZE, bill_update_hooks());
    let producers = handlers.producers();
    handlers.start_handlers();
    let monitor = PaymentMonitor::new(db.clone(), chain, hub.clone(), producers, config.monitor_config());
    monitor.start().await.map_err(|e| ServerError::InitializeError(e.to_string()))?;
    info!("💰️ Payment monitor started. Reconciling every {}s", config.reconcile_interval.as_secs());

    let srv = create_server_instance(config, db, feed, hub.clone(), monitor.clone())?;
    let result = srv.await.map_err(|e| ServerError::Unspecified(e.to_string()));

    info!("🚀️ Server has stopped. Shutting down the payment monitor and connection hub");
    monitor.stop().await;
    hub.shutdown().await;
    if let Err(e) = hub_task.await {
        warn!("📡️ Connection hub task ended abnormally. {e}");
    }
    result
}

pub fn create_server_instance(
    config: ServerConfig,
    db: SqliteDatabase,
    feed: EventFeed,
    hub: HubHandle,
    monitor: PaymentMonitor<SqliteDatabase, RelayChainClient>,
) -> Result<Server, ServerError> {
    let hmac = HmacMiddlewareFactory::relay(config.relay_hmac_secret.clone());
    let srv = HttpServer::new(move || {
        App::new()
            .wrap(Logger::new("%t (%D ms) %s %a %{Host}i %U").log_target("settle::access_log"))
            .app_data(web::Data::new(db.clone()))
            .app_data(web::Data::new(feed.clone()))
            .app_data(web::Data::new(hub.clone()))
            .app_data(web::Data::new(monitor.clone()))
            .configure(configure_routes::<SqliteDatabase, RelayChainClient>(hmac.clone()))
    })
    .keep_alive(KeepAlive::Timeout(Duration::from_secs(600)))
    .bind((config.host.as_str(), config.port))?
    .run();
    Ok(srv)
}

/// Registers every route. The application must provide `web::Data` for the store `S`, the [`EventFeed`], the
/// [`HubHandle`] and the `PaymentMonitor<S, C>`.
pub fn configure_routes<S, C>(hmac: HmacMiddlewareFactory) -> impl FnOnce(&mut ServiceConfig)
where
    S: BillStore,
    C: ChainClient,
{
    move |cfg| {
        let chain_scope = web::scope("/chain").service(ChainEventsRoute::new(hmac.clone()));
        let api_scope = web::scope("/api")
            .service(SplitBillRoute::<S>::new())
            .service(PaymentConfirmationRoute::<S, C>::new(hmac));
        cfg.service(health).service(ws_connect).service(chain_scope).service(api_scope);
    }
}

fn bill_update_hooks() -> EventHooks {
    let mut hooks = EventHooks::default();
    hooks.on_bill_updated(|ev| async move {
        if ev.status_changed() {
            info!(
                "🪝️ Bill #{} is now {} ({} of {} paid)",
                ev.new_bill.id, ev.new_bill.status, ev.new_bill.paid_amount, ev.new_bill.total_amount
            );
        }
    });
    hooks
}
