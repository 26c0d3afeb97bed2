//! Request handler definitions
//!
//! Define each route and it handler here.
//! Handlers that are more than a line or two MUST go into a separate module. Keep this module neat and tidy 🙏
//!
//! A note about performance:
//! Since each worker thread processes its requests sequentially, handlers which block the current thread will cause the
//! current worker to stop processing new requests:
//! ```nocompile
//!     fn my_handler() -> impl Responder {
//!         std::thread::sleep(Duration::from_secs(5)); // <-- Bad practice! Will cause the current worker thread to
//! hang!
//!     }
//! ```
//! For this reason, any long, non-cpu-bound operation (e.g. I/O, database operations, etc.) should be expressed as
//! futures or asynchronous functions. Async handlers get executed concurrently by worker threads and thus don’t block
//! execution:
//!
//! ```nocompile
//!     async fn my_handler() -> impl Responder {
//!         tokio::time::sleep(Duration::from_secs(5)).await; // <-- Ok. Worker thread will handle other requests here
//!     }
//! ```
use actix_web::{get, web, HttpRequest, HttpResponse, Responder};
use log::*;
use settle_engine::{
    split::split,
    BillStore,
    ChainClient,
    EventFeed,
    HubHandle,
    PaymentEvent,
    PaymentMonitor,
    SplitRequest,
};

use crate::{
    data_objects::{ChainEventBatch, ChainEventsResult, ConfirmationRequest, ConfirmationResult, WsParams},
    errors::ServerError,
    helpers::parse_rooms,
    ws,
};

// Web-actix cannot handle generics in handlers, so it's implemented manually using the `route!` macro
#[macro_export]
macro_rules! route {
    // A route whose body must carry a valid relay signature
    ($name:ident => $method:ident $path:literal signed) => {
        paste::paste! { pub struct [<$name:camel Route>]($crate::middleware::HmacMiddlewareFactory);}
        paste::paste! {
            impl [<$name:camel Route>] {
                pub fn new(hmac: $crate::middleware::HmacMiddlewareFactory) -> Self { Self(hmac) }
            }
        }
        paste::paste! {
            impl actix_web::dev::HttpServiceFactory for [<$name:camel Route>] {
                fn register(self, config: &mut actix_web::dev::AppService) {
                    let res = actix_web::Resource::new($path)
                        .name(stringify!($name))
                        .guard(actix_web::guard::$method())
                        .to($name)
                        .wrap(self.0);
                    actix_web::dev::HttpServiceFactory::register(res, config);
                }
            }
        }
    };

    ($name:ident => $method:ident $path:literal impl $($bounds:ty),+) => {
        paste::paste! { pub struct [<$name:camel Route>]< $( [< T $bounds:camel> ],)+ >( $( core::marker::PhantomData<fn() -> [< T $bounds:camel> ] >,)+ );}
        paste::paste! { impl< $( [< T $bounds:camel> ],)+ > [<$name:camel Route>]< $( [< T $bounds:camel> ],)+ > {
            #[allow(clippy::new_without_default)]
            pub fn new() -> Self {
                Self($( core::marker::PhantomData::<fn() -> [< T $bounds:camel> ] >,)+)
            }
        }}
        paste::paste! { impl<$( [< T $bounds:camel >] , )+> actix_web::dev::HttpServiceFactory for [<$name:camel Route>]<$([<T $bounds:camel>],)+>
        where
            $([<T $bounds:camel>]: $bounds + 'static,)+
        {
            fn register(self, config: &mut actix_web::dev::AppService) {
                let res = actix_web::Resource::new($path)
                    .name(stringify!($name))
                    .guard(actix_web::guard::$method())
                    .to($name::< $( [< T $bounds:camel >], )+>);
                actix_web::dev::HttpServiceFactory::register(res, config);
            }
        }}
    };

    ($name:ident => $method:ident $path:literal impl $($bounds:ty),+ where signed) => {
        paste::paste! { pub struct [<$name:camel Route>]< $( [< T $bounds:camel> ],)+ >(
            $crate::middleware::HmacMiddlewareFactory,
            $( core::marker::PhantomData<fn() -> [< T $bounds:camel> ] >,)+
        );}
        paste::paste! { impl< $( [< T $bounds:camel> ],)+ > [<$name:camel Route>]< $( [< T $bounds:camel> ],)+ > {
            pub fn new(hmac: $crate::middleware::HmacMiddlewareFactory) -> Self {
                Self(hmac, $( core::marker::PhantomData::<fn() -> [< T $bounds:camel> ] >,)+)
            }
        }}
        paste::paste! { impl<$( [< T $bounds:camel >] , )+> actix_web::dev::HttpServiceFactory for [<$name:camel Route>]<$([<T $bounds:camel>],)+>
        where
            $([<T $bounds:camel>]: $bounds + 'static,)+
        {
            fn register(self, config: &mut actix_web::dev::AppService) {
                let res = actix_web::Resource::new($path)
                    .name(stringify!($name))
                    .guard(actix_web::guard::$method())
                    .to($name::< $( [< T $bounds:camel >], )+>)
                    .wrap(self.0);
                actix_web::dev::HttpServiceFactory::register(res, config);
            }
        }}
    };
}

// ----------------------------------------------   Health  ----------------------------------------------------
#[get("/health")]
pub async fn health() -> impl Responder {
    trace!("💻️ Received health check request");
    HttpResponse::Ok().body("👍️\n")
}

// ----------------------------------------------   Live updates  ----------------------------------------------
/// Upgrades the request to a WebSocket that receives every notification published to the requested rooms, e.g.
/// `/ws?rooms=business:1,bill:7`.
#[get("/ws")]
pub async fn ws_connect(
    req: HttpRequest,
    body: web::Payload,
    params: web::Query<WsParams>,
    hub: web::Data<HubHandle>,
) -> Result<HttpResponse, ServerError> {
    let rooms = parse_rooms(params.rooms.as_deref());
    debug!("💻️ WebSocket upgrade requested for rooms {rooms:?}");
    ws::connect(&req, body, hub.get_ref().clone(), rooms).await
}

// ----------------------------------------------   Chain relay  -----------------------------------------------
route!(chain_events => Post "/events" signed);
/// Route handler for the chain relay webhook.
///
/// The body is a single payment log or an array of them. Valid logs are queued for the payment monitor; invalid
/// ones are logged and counted as rejected. If the monitor has fallen far enough behind that the feed is full, the
/// call fails with a 503 and the relay should try again later. Logs the monitor has already applied are ignored, so
/// redelivering a whole batch is safe.
pub async fn chain_events(
    body: web::Json<ChainEventBatch>,
    feed: web::Data<EventFeed>,
) -> Result<HttpResponse, ServerError> {
    let logs = body.into_inner().into_logs();
    debug!("💻️ Received {} payment log(s) from the chain relay", logs.len());
    let mut result = ChainEventsResult::default();
    for log in logs {
        if let Err(e) = PaymentEvent::try_from(log.clone()) {
            warn!("💻️ Rejecting payment log for tx {}. {e}", log.tx_hash);
            result.rejected += 1;
            continue;
        }
        feed.publish(log)?;
        result.accepted += 1;
    }
    Ok(HttpResponse::Ok().json(result))
}

route!(payment_confirmation => Post "/bills/{id}/confirmation" impl BillStore, ChainClient where signed);
/// Route handler for transaction confirmations.
///
/// The relay calls this once a payment transaction has enough confirmations. The current bill status is broadcast to
/// the business's dashboards and to everyone watching the bill.
pub async fn payment_confirmation<S, C>(
    path: web::Path<i64>,
    body: web::Json<ConfirmationRequest>,
    monitor: web::Data<PaymentMonitor<S, C>>,
) -> Result<HttpResponse, ServerError>
where
    S: BillStore,
    C: ChainClient,
{
    let bill_id = path.into_inner();
    let ConfirmationRequest { tx_hash } = body.into_inner();
    debug!("💻️ Confirmation for bill #{bill_id}, tx {tx_hash}");
    let bill = monitor.notify_payment_confirmation(bill_id, &tx_hash).await?;
    Ok(HttpResponse::Ok().json(ConfirmationResult { bill_id, tx_hash, status: bill.status }))
}

// ----------------------------------------------   Splitting  -------------------------------------------------
route!(split_bill => Post "/bills/{id}/split" impl BillStore);
/// Route handler for bill splits.
///
/// The body selects the split method:
/// * `{ "method": "equal", "num_people": 3 }`
/// * `{ "method": "custom", "amounts": { "alice": "30.00", "bob": "25.00" }, "labels": { "alice": "Alice" } }`
/// * `{ "method": "items", "assignments": { "alice": [1, 2], "bob": [3] }, "labels": {} }`
///
/// Nothing is persisted. The response is the computed [`settle_engine::SplitResult`].
pub async fn split_bill<S: BillStore>(
    path: web::Path<i64>,
    body: web::Json<SplitRequest>,
    store: web::Data<S>,
) -> Result<HttpResponse, ServerError> {
    let bill_id = path.into_inner();
    let request = body.into_inner();
    debug!("💻️ {:?} split requested for bill #{bill_id}", request.method());
    let bill = store.fetch_bill_with_items(bill_id).await?;
    let result = split(&bill, &request)?;
    Ok(HttpResponse::Ok().json(result))
}
