use std::{net::TcpListener, time::Duration};

use actix_web::{http::StatusCode, test, test::TestRequest, web, App, HttpServer};
use log::debug;
use serde::Serialize;
use settle_common::{Money, Secret};
use settle_engine::{
    db_types::{Bill, NewBill},
    events::EventProducers,
    test_utils::MockChain,
    ConnectionHub,
    HubConfig,
    HubHandle,
    MemoryBillStore,
    MonitorConfig,
    PaymentMonitor,
};

use crate::{config::RELAY_HMAC_HEADER, helpers::calculate_hmac, middleware::HmacMiddlewareFactory, server};

pub const RELAY_SECRET: &str = "relay-test-secret";
pub const BUSINESS_ID: i64 = 1;
pub const TABLE_ID: i64 = 3;
pub const BILL_ID: i64 = 7;

pub struct TestApp {
    pub store: MemoryBillStore,
    pub chain: MockChain,
    pub hub: HubHandle,
    pub monitor: PaymentMonitor<MemoryBillStore, MockChain>,
    pub secret: Secret<String>,
}

/// A store holding bill #7: Pizza 50.00 (item 1), Salad 30.00 (item 2) and two Drinks at 10.00 (item 3), no tax.
pub fn test_app() -> TestApp {
    let _ = env_logger::try_init();
    let store = MemoryBillStore::new();
    store.add_table(TABLE_ID, BUSINESS_ID, "A12");
    store.add_bill(BILL_ID, dinner());
    let chain = MockChain::new();
    let (hub, _) = ConnectionHub::spawn(HubConfig::default());
    let config = MonitorConfig { reconcile_interval: Duration::from_secs(3600), ..MonitorConfig::default() };
    let monitor = PaymentMonitor::new(store.clone(), chain.clone(), hub.clone(), EventProducers::default(), config);
    TestApp { store, chain, hub, monitor, secret: Secret::new(RELAY_SECRET.to_string()) }
}

pub fn dinner() -> NewBill {
    NewBill::new(BUSINESS_ID, TABLE_ID)
        .with_item("Pizza", Money::from_units(50), 1)
        .with_item("Salad", Money::from_units(30), 1)
        .with_item("Drinks", Money::from_units(10), 2)
}

impl TestApp {
    pub fn without_hmac_checks(mut self) -> Self {
        self.secret = Secret::default();
        self
    }

    /// Sends the request through the full route table and returns the status and body.
    pub async fn call(&self, req: TestRequest) -> (StatusCode, String) {
        let app = App::new()
            .app_data(web::Data::new(self.store.clone()))
            .app_data(web::Data::new(self.chain.feed().clone()))
            .app_data(web::Data::new(self.hub.clone()))
            .app_data(web::Data::new(self.monitor.clone()))
            .configure(server::configure_routes::<MemoryBillStore, MockChain>(HmacMiddlewareFactory::relay(
                self.secret.clone(),
            )));
        let service = test::init_service(app).await;
        debug!("Making request");
        match test::try_call_service(&service, req.to_request()).await {
            Ok(res) => {
                let status = res.status();
                let body = test::read_body(res).await;
                (status, String::from_utf8_lossy(&body).into_owned())
            },
            Err(e) => {
                let status = e.error_response().status();
                (status, e.to_string())
            },
        }
    }

    /// Runs the full route table on a real socket, for clients that need more than a single request. Returns the
    /// address the server listens on.
    pub fn serve(&self) -> String {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();
        let (store, feed, hub) = (self.store.clone(), self.chain.feed().clone(), self.hub.clone());
        let (monitor, secret) = (self.monitor.clone(), self.secret.clone());
        let srv = HttpServer::new(move || {
            App::new()
                .app_data(web::Data::new(store.clone()))
                .app_data(web::Data::new(feed.clone()))
                .app_data(web::Data::new(hub.clone()))
                .app_data(web::Data::new(monitor.clone()))
                .configure(server::configure_routes::<MemoryBillStore, MockChain>(HmacMiddlewareFactory::relay(
                    secret.clone(),
                )))
        })
        .listen(listener)
        .unwrap()
        .workers(1)
        .run();
        actix_web::rt::spawn(srv);
        addr.to_string()
    }

    pub async fn post_json<T: Serialize>(&self, path: &str, body: &T) -> (StatusCode, String) {
        let req = TestRequest::post().uri(path).set_json(body);
        self.call(req).await
    }

    /// Posts `body` with a relay signature made with `secret`.
    pub async fn post_signed<T: Serialize>(&self, path: &str, body: &T, secret: &str) -> (StatusCode, String) {
        let bytes = serde_json::to_vec(body).unwrap();
        let signature = calculate_hmac(secret, &bytes).unwrap();
        let req = TestRequest::post()
            .uri(path)
            .insert_header(("Content-Type", "application/json"))
            .insert_header((RELAY_HMAC_HEADER, signature))
            .set_payload(bytes);
        self.call(req).await
    }

    pub fn bill(&self) -> Bill {
        self.store.bill(BILL_ID).unwrap()
    }

    /// Polls the store until the bill's paid amount matches, or gives up after two seconds.
    pub async fn wait_for_paid(&self, expected: Money) -> Bill {
        let deadline = tokio::time::Instant::now() + Duration::from_secs(2);
        loop {
            let bill = self.bill();
            if bill.paid_amount == expected || tokio::time::Instant::now() > deadline {
                return bill;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
    }
}

pub fn json(body: &str) -> serde_json::Value {
    serde_json::from_str(body).unwrap_or_else(|e| panic!("Response is not JSON ({e}): {body}"))
}
