//! End-to-end scenarios: YAML event config + JSON fixture + validator.

use std::path::PathBuf;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use ticketcheck::{
    AttendeeClaim, Attribute, AttributeSource, BackendError, EventConfig, FixtureBackend, Outcome,
    Sale, TicketIdKind, TicketType, TicketingBackend, Validator,
};

const EVENT_CONFIG: &str = r#"
version: "1.0"
name: "Scenario Conf"
name_matching:
  exact_threshold: 0.95
  close_threshold: 0.8
exclude_ticket_patterns: ["childcare"]
overrides:
  combinations:
    - name: organizer_and_speaker
      references: ["hll1h-2"]
    - name: speaker_add_keynote
      references: ["SPK42-1"]
  organizer_speakers: ["ORG01-1", "HLL1H-1"]
"#;

/// Fixture backend whose free-text search also sees sales made after the
/// last refresh, and which counts live searches.
struct LiveFixture {
    inner: FixtureBackend,
    late_sales: Vec<Sale>,
    live_calls: AtomicUsize,
}

#[async_trait]
impl TicketingBackend for LiveFixture {
    fn name(&self) -> &'static str {
        self.inner.name()
    }

    fn ticket_id_kind(&self) -> TicketIdKind {
        self.inner.ticket_id_kind()
    }

    fn attribute_source(&self) -> AttributeSource {
        self.inner.attribute_source()
    }

    async fn load_all_ticket_types(&self) -> Result<Vec<TicketType>, BackendError> {
        self.inner.load_all_ticket_types().await
    }

    async fn load_all_tickets(&self) -> Result<Vec<Sale>, BackendError> {
        self.inner.load_all_tickets().await
    }

    async fn search_by_reference(&self, reference: &str) -> Result<Option<Sale>, BackendError> {
        self.live_calls.fetch_add(1, Ordering::SeqCst);
        self.inner.search_by_reference(reference).await
    }

    async fn search_by_order(&self, order: &str) -> Result<Vec<Sale>, BackendError> {
        self.live_calls.fetch_add(1, Ordering::SeqCst);
        self.inner.search_by_order(order).await
    }

    async fn search_by_secret(&self, secret: &str) -> Result<Option<Sale>, BackendError> {
        self.live_calls.fetch_add(1, Ordering::SeqCst);
        self.inner.search_by_secret(secret).await
    }

    async fn search_by_free_text(&self, text: &str) -> Result<Vec<Sale>, BackendError> {
        self.live_calls.fetch_add(1, Ordering::SeqCst);
        let mut found = self.inner.search_by_free_text(text).await?;
        found.extend(
            self.late_sales
                .iter()
                .filter(|sale| sale.email.contains(text))
                .cloned(),
        );
        Ok(found)
    }
}

struct Harness {
    validator: Validator,
    backend: Arc<LiveFixture>,
}

impl Harness {
    async fn new() -> Self {
        let event = EventConfig::from_yaml(EVENT_CONFIG).unwrap();
        let fixture = PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("fixtures/event.json");
        let backend = Arc::new(LiveFixture {
            inner: FixtureBackend::from_path(fixture).await.unwrap(),
            late_sales: vec![Sale::new(
                "LATE1-1",
                "LATE1",
                "Robin Late",
                "late@example.com",
                2i64,
            )],
            live_calls: AtomicUsize::new(0),
        });
        let validator = Validator::new(
            Arc::new(event.snapshot_store()),
            backend.clone(),
            event.mapper(),
            event.validation_policy(Duration::from_secs(5)),
        );
        validator.refresh().await.unwrap();
        Self { validator, backend }
    }

    fn live_calls(&self) -> usize {
        self.backend.live_calls.load(Ordering::SeqCst)
    }

    async fn order_claim(&self, order: &str, name: &str) -> ticketcheck::Verdict {
        let claim = AttendeeClaim::default().with_order(order).with_name(name);
        self.validator.validate_attendee(&claim).await.unwrap()
    }
}

#[tokio::test]
async fn exact_order_and_name_is_a_remote_online_attendee() {
    let harness = Harness::new().await;
    let verdict = harness.order_claim("HLL1H", "Sam Smith").await;

    assert!(verdict.is_attendee());
    assert_eq!(verdict.outcome.status_code(), 200);
    assert!(verdict.attributes.contains(Attribute::Remote));
    assert!(verdict.attributes.contains(Attribute::OnlineAccess));
    // Listed as organizer-speaker, but not an organizer.
    assert!(!verdict.attributes.contains(Attribute::Speaker));
    assert_eq!(harness.live_calls(), 0);
}

#[tokio::test]
async fn one_dropped_letter_is_close_but_not_exact() {
    let harness = Harness::new().await;
    let verdict = harness.order_claim("HLL1H", "Sam Smth").await;

    assert_eq!(verdict.outcome, Outcome::CloseNotExact);
    assert_eq!(verdict.outcome.status_code(), 406);
    assert!(verdict.hint.contains("close but not exact enough"));
}

#[tokio::test]
async fn unknown_order_is_an_invalid_order() {
    let harness = Harness::new().await;
    let verdict = harness.order_claim("ZZZZZ", "Sam Smith").await;

    assert_eq!(verdict.outcome.status_code(), 404);
    assert!(verdict.hint.starts_with("Invalid order ID"));
}

#[tokio::test]
async fn add_on_ticket_names_the_invalid_type() {
    let harness = Harness::new().await;
    let verdict = harness.order_claim("LUGG1", "Pat Jones").await;

    assert_eq!(verdict.outcome, Outcome::TypeOutOfScope);
    assert_eq!(verdict.outcome.status_code(), 406);
    assert!(verdict.hint.contains("Luggage Storage"));
}

#[tokio::test]
async fn email_only_on_the_live_system_costs_one_search() {
    let harness = Harness::new().await;

    assert!(!harness.validator.validate_email("ghost@example.com").await.unwrap());
    assert_eq!(harness.live_calls(), 1);

    assert!(harness.validator.validate_email("LATE@example.com").await.unwrap());
    assert_eq!(harness.live_calls(), 2);

    // Live hits are not merged into the snapshot.
    assert!(harness.validator.validate_email("late@example.com").await.unwrap());
    assert_eq!(harness.live_calls(), 3);

    assert!(harness.validator.validate_email("sam@example.com").await.unwrap());
    assert_eq!(harness.live_calls(), 3);
}

#[tokio::test]
async fn canceled_ticket_is_never_matched() {
    let harness = Harness::new().await;
    let verdict = harness.order_claim("CANC1", "Chris Gone").await;
    assert_eq!(verdict.outcome, Outcome::NotFound);

    assert!(!harness.validator.validate_email("chris@example.com").await.unwrap());
}

#[tokio::test]
async fn reference_overrides_decorate_the_verdict() {
    let harness = Harness::new().await;

    let alex = harness.order_claim("HLL1H", "Alex Doe").await;
    assert!(alex.attributes.contains(Attribute::Organizer));
    assert!(alex.attributes.contains(Attribute::Speaker));
    assert!(alex.attributes.contains(Attribute::Onsite));

    let jo = harness.order_claim("ORG01", "Jo Organa").await;
    assert!(jo.attributes.contains(Attribute::Organizer));
    assert!(jo.attributes.contains(Attribute::Speaker));

    let claim = AttendeeClaim::default()
        .with_ticket_id("spk42-1")
        .with_name("Jose Nunez");
    let jose = harness.validator.validate_attendee(&claim).await.unwrap();
    assert!(jose.is_attendee());
    assert!(jose.attributes.contains(Attribute::Speaker));
    assert!(jose.attributes.contains(Attribute::Keynote));
}

#[tokio::test]
async fn day_pass_holder_is_a_sponsor_on_site() {
    let harness = Harness::new().await;
    let verdict = harness.order_claim("DAYP1", "Kim Lee").await;

    assert!(verdict.is_attendee());
    assert!(verdict.attributes.contains(Attribute::Sponsor));
    assert!(verdict.attributes.contains(Attribute::Onsite));
}

#[tokio::test]
async fn coverage_report_lists_unmapped_types() {
    let harness = Harness::new().await;
    let report = harness.validator.coverage_report();

    assert_eq!(report.total_ticket_types, 6);
    assert!(report
        .unmapped_ticket_types
        .contains(&"Luggage Storage".to_string()));
}
