use backend::{BackendError, PretixBackend, PretixConfig, RetryConfig, TicketingBackend};
use serde_json::json;
use snapshot::SaleState;
use wiremock::matchers::{header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

const EVENT: &str = "/organizers/pyconde/events/2025";

fn backend(server: &MockServer) -> PretixBackend {
    let mut config = PretixConfig::new("pyconde", "2025", "tok").with_base_url(server.uri());
    config.http.retry = RetryConfig::none();
    PretixBackend::new(config).unwrap()
}

#[tokio::test]
async fn orders_become_positions_with_synthesized_references() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path(format!("{EVENT}/orders/")))
        .and(query_param("page", "1"))
        .and(header("authorization", "Token tok"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "next": "https://pretix.example/next",
            "results": [{
                "code": "HLL1H", "status": "p",
                "positions": [
                    {"order": "HLL1H", "positionid": 1, "item": 10,
                     "attendee_name": "Sam Smith", "attendee_email": "Sam@Example.com",
                     "secret": "s3cr3t", "canceled": false},
                    {"order": "HLL1H", "positionid": 2, "item": 11,
                     "attendee_name": "Gone", "canceled": true}
                ]
            }]
        })))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path(format!("{EVENT}/orders/")))
        .and(query_param("page", "2"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "next": null,
            "results": [{
                "code": "ZZ9ZZ", "status": "c",
                "positions": [{"order": "ZZ9ZZ", "positionid": 1, "item": 10}]
            }]
        })))
        .mount(&server)
        .await;

    let sales = backend(&server).load_all_tickets().await.unwrap();
    assert_eq!(sales.len(), 3);
    assert_eq!(sales[0].reference, "HLL1H-1");
    assert_eq!(sales[0].email, "sam@example.com");
    assert_eq!(sales[0].secret.as_deref(), Some("s3cr3t"));
    assert_eq!(sales[1].state, SaleState::Canceled);
    assert_eq!(sales[2].state, SaleState::Canceled);
}

#[tokio::test]
async fn items_get_their_categories() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path(format!("{EVENT}/categories/")))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "next": null,
            "results": [{"id": 3, "name": {"en": "Sponsors", "de": "Sponsoren"}, "internal_name": "spons"}]
        })))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path(format!("{EVENT}/items/")))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "next": null,
            "results": [
                {"id": 10, "name": {"en": "Sponsor Booth Staff"}, "category": 3},
                {"id": 11, "name": {"en": "Business"}, "category": null}
            ]
        })))
        .expect(1)
        .mount(&server)
        .await;

    let types = backend(&server).load_all_ticket_types().await.unwrap();
    assert_eq!(types[0].title, "Sponsor Booth Staff");
    let category = types[0].category.as_ref().unwrap();
    assert_eq!(category.name, "Sponsors");
    assert_eq!(category.internal_name, "spons");
    assert!(types[1].category.is_none());
}

#[tokio::test]
async fn secret_search_uses_position_filter() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path(format!("{EVENT}/orderpositions/")))
        .and(query_param("secret", "s3cr3t"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "next": null,
            "results": [{"order": "HLL1H", "positionid": 1, "item": 10,
                         "attendee_name": "Sam Smith", "secret": "s3cr3t"}]
        })))
        .mount(&server)
        .await;

    let sale = backend(&server).search_by_secret("s3cr3t").await.unwrap().unwrap();
    assert_eq!(sale.reference, "HLL1H-1");
    assert_eq!(sale.order, "HLL1H");
}

#[tokio::test]
async fn free_text_falls_back_to_name_search() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path(format!("{EVENT}/orderpositions/")))
        .and(query_param("attendee_email__icontains", "sam smith"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"next": null, "results": []})))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path(format!("{EVENT}/orderpositions/")))
        .and(query_param("attendee_name__icontains", "sam smith"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "next": null,
            "results": [{"order": "HLL1H", "positionid": 1, "item": 10, "attendee_name": "Sam Smith"}]
        })))
        .expect(1)
        .mount(&server)
        .await;

    let found = backend(&server).search_by_free_text("sam smith").await.unwrap();
    assert_eq!(found.len(), 1);
}

#[tokio::test]
async fn malformed_payload_is_reported() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path(format!("{EVENT}/orders/")))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"unexpected": true})))
        .mount(&server)
        .await;

    let err = backend(&server).load_all_tickets().await.unwrap_err();
    assert!(matches!(err, BackendError::Malformed { .. }));
}

#[tokio::test]
async fn server_error_is_not_retried_without_budget() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(502))
        .expect(1)
        .mount(&server)
        .await;

    let err = backend(&server).search_by_order("HLL1H").await.unwrap_err();
    assert!(err.is_retryable());
}

#[tokio::test]
async fn live_positions_of_canceled_orders_are_canceled() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path(format!("{EVENT}/orderpositions/")))
        .and(query_param("order__code", "ZZ9ZZ"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "next": null,
            "results": [
                {"order": "ZZ9ZZ", "positionid": 1, "item": 10, "attendee_name": "Pat Jones",
                 "secret": "gone1", "canceled": false, "order__status": "c"},
                {"order": "ZZ9ZZ", "positionid": 2, "item": 10, "attendee_name": "Kim Lee",
                 "canceled": false, "order__status": "n"}
            ]
        })))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path(format!("{EVENT}/orderpositions/")))
        .and(query_param("secret", "gone1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "next": null,
            "results": [{"order": "ZZ9ZZ", "positionid": 1, "item": 10, "attendee_name": "Pat Jones",
                         "secret": "gone1", "canceled": false, "order__status": "c"}]
        })))
        .mount(&server)
        .await;

    let backend = backend(&server);
    let sales = backend.search_by_order("zz9zz").await.unwrap();
    assert_eq!(sales.len(), 2);
    assert!(sales[0].is_canceled());
    assert_eq!(sales[1].state, SaleState::Pending);

    let by_reference = backend.search_by_reference("ZZ9ZZ-1").await.unwrap().unwrap();
    assert!(by_reference.is_canceled());

    let by_secret = backend.search_by_secret("gone1").await.unwrap().unwrap();
    assert!(by_secret.is_canceled());
}
