//! A small orders service exercised end to end through the facade.
//!
//! Covers a secured resource, name-bound filters, a custom failure type with
//! its own mapper, property-bag hand-off between filters and
//! configuration-driven pipeline options.

use std::io::Write;
use std::sync::Arc;

use http::StatusCode;
use pylon::pipeline::DEFAULT_PRIORITY;
use pylon::prelude::*;
use pylon_test::TestClient;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use store::OrderStore;

static INSUFFICIENT_STOCK: ErrorType =
    ErrorType::new("insufficient_stock", &ErrorType::CLIENT_ERROR);

mod store {
    use std::collections::BTreeMap;
    use std::sync::Mutex;

    use super::Order;

    /// Orders keyed by id.
    #[derive(Default)]
    pub struct OrderStore {
        orders: Mutex<BTreeMap<u64, Order>>,
    }

    impl OrderStore {
        pub fn insert(&self, order: Order) -> Order {
            let mut orders = self.orders.lock().unwrap();
            let id = u64::try_from(orders.len()).unwrap() + 1;
            let order = Order { id, ..order };
            orders.insert(id, order.clone());
            order
        }

        pub fn get(&self, id: u64) -> Option<Order> {
            self.orders.lock().unwrap().get(&id).cloned()
        }

        pub fn list(&self, limit: usize) -> Vec<Order> {
            self.orders.lock().unwrap().values().take(limit).cloned().collect()
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
struct Order {
    #[serde(default)]
    id: u64,
    item: String,
    quantity: u32,
}

fn registry(store: &Arc<OrderStore>) -> Registry {
    let list_store = Arc::clone(store);
    let get_store = Arc::clone(store);
    let create_store = Arc::clone(store);

    let orders = Resource::new("/orders")
        .tag("secured")
        .produces("application/json")
        .operation(
            Operation::get("/")
                .id("listOrders")
                .param(
                    ParameterBinding::query("limit")
                        .scalar(ScalarType::U32)
                        .default_value("10"),
                )
                .to(move |args: Arguments| {
                    let store = Arc::clone(&list_store);
                    async move {
                        let limit: usize = args.get(0)?;
                        Ok(Json(store.list(limit)))
                    }
                }),
        )
        .operation(
            Operation::get("/{id: [0-9]+}")
                .id("getOrder")
                .param(ParameterBinding::path("id").scalar(ScalarType::U64))
                .to(move |args: Arguments| {
                    let store = Arc::clone(&get_store);
                    async move {
                        let id: u64 = args.get(0)?;
                        store
                            .get(id)
                            .map(Json)
                            .ok_or_else(|| PylonError::not_found(format!("order {id} not found")))
                    }
                }),
        )
        .operation(
            Operation::post("/")
                .id("createOrder")
                .consumes("application/json")
                .param(ParameterBinding::context(ContextKind::Security))
                .param(ParameterBinding::body_as::<Order>())
                .to(move |mut args: Arguments| {
                    let store = Arc::clone(&create_store);
                    async move {
                        let order: Order = args.take_body()?;
                        if order.quantity > 100 {
                            return Err(PylonError::new(
                                &INSUFFICIENT_STOCK,
                                format!("only 100 {} left", order.item),
                            )
                            .with_detail(100_u32));
                        }
                        let principal = args
                            .security()
                            .and_then(SecurityContext::principal)
                            .unwrap_or("anonymous")
                            .to_string();
                        let created = store.insert(order);
                        ResponseDescriptor::created(&format!("/orders/{}", created.id))
                            .header("x-created-by", &principal)
                            .json(&created)
                    }
                }),
        );

    Registry::builder()
        .pre_match_filter(
            FnRequestFilter::new("authenticate", |ctx| {
                if let Some(user) = ctx
                    .header("authorization")
                    .and_then(|v| v.strip_prefix("Bearer "))
                    .map(str::to_string)
                {
                    ctx.set_security(SecurityContext::authenticated(user, "Bearer"));
                }
                Ok(())
            }),
            100,
        )
        .request_filter(
            FnRequestFilter::new("require-user", |ctx| {
                if ctx.security().principal().is_none() {
                    ctx.abort_with(
                        ResponseDescriptor::status(StatusCode::UNAUTHORIZED)
                            .header("www-authenticate", "Bearer"),
                    );
                } else {
                    ctx.set_property("audited", json!(true));
                }
                Ok(())
            }),
            Registration::new().tag("secured").priority(1000),
        )
        .response_filter(
            FnResponseFilter::new("audit-header", |req, res| {
                if req.property("audited").is_some() {
                    res.append_header("x-audited", "true");
                }
                Ok(())
            }),
            Registration::new(),
        )
        .exception_mapper(
            &INSUFFICIENT_STOCK,
            |err: &PylonError| -> PylonResult<ResponseDescriptor> {
                let available = err.detail::<u32>().copied().unwrap_or_default();
                Ok(ResponseDescriptor::status(StatusCode::UNPROCESSABLE_ENTITY)
                    .entity(json!({ "message": err.message(), "available": available })))
            },
            DEFAULT_PRIORITY,
        )
        .resource(orders)
        .operation(Operation::get("/health").to(|_| async { Ok("ok") }))
        .operation(Operation::get("/boom").to(|_| async {
            Err::<(), _>(PylonError::internal("connection pool exhausted"))
        }))
        .build()
        .unwrap()
}

fn client(config: &PylonConfig) -> TestClient {
    let store = Arc::new(OrderStore::default());
    let pipeline = App::new(registry(&store), config.clone())
        .into_pipeline()
        .unwrap();
    TestClient::new(pipeline)
}

#[tokio::test]
async fn test_unauthenticated_requests_are_rejected() {
    let client = client(&PylonConfig::default());

    let response = client.get("/orders").send().await;
    response
        .assert_status(StatusCode::UNAUTHORIZED)
        .assert_header("www-authenticate", "Bearer");
    assert!(response.header("x-audited").is_none());

    // Unsecured operations skip the bound filter.
    client
        .get("/health")
        .send()
        .await
        .assert_status(StatusCode::OK);
}

#[tokio::test]
async fn test_create_then_fetch() {
    let client = client(&PylonConfig::default()).with_default_header("authorization", "Bearer ada");

    let created = client
        .post("/orders")
        .json(&json!({"item": "widget", "quantity": 3}))
        .send()
        .await;
    created
        .assert_status(StatusCode::CREATED)
        .assert_header("location", "/orders/1")
        .assert_header("x-created-by", "ada")
        .assert_header("x-audited", "true");

    let fetched: Order = client.get("/orders/1").send().await.json().unwrap();
    assert_eq!(
        fetched,
        Order {
            id: 1,
            item: "widget".into(),
            quantity: 3
        }
    );

    let listed: Vec<Order> = client
        .get("/orders")
        .query("limit", "5")
        .send()
        .await
        .json()
        .unwrap();
    assert_eq!(listed.len(), 1);
}

#[tokio::test]
async fn test_failures_map_to_responses() {
    let client = client(&PylonConfig::default()).with_default_header("authorization", "Bearer ada");

    let missing = client.get("/orders/9").send().await;
    missing.assert_status(StatusCode::NOT_FOUND);
    let body: Value = missing.json().unwrap();
    assert_eq!(body["error"]["code"], "NOT_FOUND");
    assert_eq!(body["error"]["message"], "order 9 not found");

    // The regex constraint keeps non-numeric ids from matching at all.
    client
        .get("/orders/abc")
        .send()
        .await
        .assert_status(StatusCode::NOT_FOUND);

    let limit = client.get("/orders").query("limit", "many").send().await;
    limit.assert_status(StatusCode::BAD_REQUEST);
    assert_eq!(limit.json::<Value>().unwrap()["error"]["code"], "PARAM_CONVERSION");

    let too_many = client
        .post("/orders")
        .json(&json!({"item": "widget", "quantity": 500}))
        .send()
        .await;
    too_many.assert_status(StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(
        too_many.json::<Value>().unwrap(),
        json!({"message": "only 100 widget left", "available": 100})
    );

    client
        .post("/orders")
        .content_type("text/plain")
        .body("widget")
        .send()
        .await
        .assert_status(StatusCode::UNSUPPORTED_MEDIA_TYPE);
}

#[tokio::test]
async fn test_internal_messages_follow_configuration() {
    let hidden = client(&PylonConfig::default()).get("/boom").send().await;
    hidden.assert_status(StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(
        hidden.json::<Value>().unwrap()["error"]["message"],
        "An internal error occurred"
    );

    let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
    writeln!(file, "[pipeline]\nexpose_internal_errors = true").unwrap();
    let config = ConfigLoader::new()
        .with_file(file.path())
        .unwrap()
        .load()
        .unwrap();

    let exposed = client(&config).get("/boom").send().await;
    let body: Value = exposed.json().unwrap();
    assert_eq!(body["error"]["message"], "connection pool exhausted");
    assert_eq!(body["error"]["status"], 500);
    assert!(body["request_id"].is_string());
}
