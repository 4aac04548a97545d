use std::future::Future;
use std::sync::Arc;
use std::time::Instant;

use backend::{BackendError, TicketIdKind, TicketingBackend};
use mapping::{AttributeMapper, CoverageReport};
use matching::NameMatcher;
use snapshot::{Sale, Snapshot, SnapshotStore, TicketType};
use tokio::sync::Mutex;
use tracing::{debug, error, info, warn};

use crate::types::{
    normalize_email, AttendeeClaim, Outcome, RefreshSummary, TicketKey, ValidatedClaim,
    ValidationError, ValidationPolicy, Verdict, INVALID_ORDER_HINT, INVALID_TICKET_HINT,
    MISMATCH_HINT,
};


/// Answers attendee claims from the current snapshot, falling back to the
/// provider's live search on a miss.
///
/// Each request works on the snapshot it read first; a refresh running at
/// the same time never changes what that request sees.
pub struct Validator {
    store: Arc<SnapshotStore>,
    backend: Arc<dyn TicketingBackend>,
    mapper: AttributeMapper,
    matcher: NameMatcher,
    policy: ValidationPolicy,
    refresh_lock: Mutex<()>,
}

impl Validator {
    pub fn new(
        store: Arc<SnapshotStore>,
        backend: Arc<dyn TicketingBackend>,
        mapper: AttributeMapper,
        policy: ValidationPolicy,
    ) -> Self {
        Self {
            store,
            backend,
            mapper,
            matcher: NameMatcher::new(policy.thresholds),
            policy,
            refresh_lock: Mutex::new(()),
        }
    }

    pub fn store(&self) -> &Arc<SnapshotStore> {
        &self.store
    }

    pub fn policy(&self) -> &ValidationPolicy {
        &self.policy
    }

    pub fn backend_name(&self) -> &'static str {
        self.backend.name()
    }

    pub fn ticket_id_kind(&self) -> TicketIdKind {
        self.backend.ticket_id_kind()
    }

    /// Reloads every ticket type and sale from the provider and swaps in a
    /// new snapshot.
    ///
    /// Refreshes run one at a time. Any failure leaves the snapshot in
    /// service untouched.
    pub async fn refresh(&self) -> Result<RefreshSummary, ValidationError> {
        let _guard = self.refresh_lock.lock().await;
        let started = Instant::now();
        match self.load_and_replace(started).await {
            Ok(summary) => {
                metrics::counter!("ticketcheck_refresh_total", "result" => "ok").increment(1);
                info!(
                    provider = summary.provider,
                    generation = summary.generation,
                    sales = summary.sales,
                    ticket_types = summary.ticket_types,
                    excluded_ticket_types = summary.excluded_ticket_types,
                    dropped_sales = summary.dropped_sales,
                    elapsed_ms = summary.elapsed_ms,
                    "refresh complete"
                );
                Ok(summary)
            }
            Err(err) => {
                metrics::counter!("ticketcheck_refresh_total", "result" => "error").increment(1);
                error!(provider = self.backend.name(), error = %err, "refresh failed, keeping previous snapshot");
                Err(err)
            }
        }
    }

    async fn load_and_replace(&self, started: Instant) -> Result<RefreshSummary, ValidationError> {
        let ticket_types = self
            .upstream("load_ticket_types", self.backend.load_all_ticket_types())
            .await?;
        let sales = self
            .upstream("load_tickets", self.backend.load_all_tickets())
            .await?;

        let fetched_types = ticket_types.len();
        let source = self.backend.attribute_source();
        let (kept, excluded): (Vec<TicketType>, Vec<TicketType>) = ticket_types
            .into_iter()
            .partition(|ticket_type| !self.policy.excludes(&ticket_type.title));
        for ticket_type in &excluded {
            debug!(ticket_type = %ticket_type.title, "ticket type excluded");
        }
        let ticket_types: Vec<TicketType> = kept
            .into_iter()
            .map(|ticket_type| self.mapper.annotate(ticket_type, source))
            .collect();

        let fetched_sales = sales.len();
        let sales: Vec<Sale> = sales
            .into_iter()
            .filter(|sale| {
                !excluded
                    .iter()
                    .any(|ticket_type| ticket_type.id == sale.ticket_type_id)
            })
            .collect();

        let stats = self.store.replace_snapshot_excluding(
            sales,
            ticket_types,
            excluded.into_iter().map(|ticket_type| ticket_type.id).collect(),
        )?;
        Ok(RefreshSummary {
            provider: self.backend.name(),
            generation: stats.generation,
            sales: stats.sales,
            ticket_types: stats.ticket_types,
            excluded_ticket_types: fetched_types - stats.ticket_types,
            dropped_sales: fetched_sales - stats.sales,
            elapsed_ms: started.elapsed().as_millis() as u64,
        })
    }

    /// Every ticket type of the current snapshot.
    pub fn ticket_types(&self) -> Vec<TicketType> {
        self.store.current().ticket_types().to_vec()
    }

    pub fn ticket_count(&self) -> usize {
        self.store.ticket_count()
    }

    /// Attribute coverage of the current ticket types.
    pub fn coverage_report(&self) -> CoverageReport {
        CoverageReport::compute(self.store.current().ticket_types())
    }

    /// Decides whether `claim` identifies a real, in-scope attendee.
    ///
    /// Expected outcomes (not found, close name, wrong type, mismatched
    /// identifiers) come back as a [`Verdict`]; only malformed claims,
    /// upstream failures and snapshot inconsistencies are errors.
    pub async fn validate_attendee(&self, claim: &AttendeeClaim) -> Result<Verdict, ValidationError> {
        let claim = claim.validate(self.backend.ticket_id_kind())?;
        let snapshot = self.store.current();

        let result = match (&claim.ticket, &claim.order, &claim.email) {
            (Some(key), _, _) => self.resolve_ticket(&snapshot, key, &claim).await,
            (None, Some(order), _) => self.resolve_order(&snapshot, order, &claim).await,
            (None, None, Some(email)) => self.resolve_email(&snapshot, email, &claim).await,
            (None, None, None) => Ok(Verdict::rejected(Outcome::NotFound, INVALID_TICKET_HINT)),
        };

        match &result {
            Ok(verdict) => {
                metrics::counter!("ticketcheck_validations_total", "outcome" => verdict.outcome.as_str())
                    .increment(1);
                debug!(outcome = verdict.outcome.as_str(), hint = %verdict.hint, "claim validated");
            }
            Err(err) => {
                metrics::counter!("ticketcheck_validations_total", "outcome" => "error").increment(1);
                warn!(error = %err, "claim validation failed");
            }
        }
        result
    }

    /// Whether `email` belongs to a sale of an in-scope ticket type.
    ///
    /// A snapshot miss triggers exactly one live free-text search.
    pub async fn validate_email(&self, email: &str) -> Result<bool, ValidationError> {
        let email = normalize_email(email)?;
        let snapshot = self.store.current();

        let cached = snapshot
            .find_by_email(&email)
            .into_iter()
            .any(|sale| snapshot.is_valid_ticket_type(&sale.ticket_type_id));
        if cached {
            metrics::counter!("ticketcheck_validations_total", "outcome" => "email_found").increment(1);
            return Ok(true);
        }

        debug!(email = %email, "email not in snapshot, searching live");
        let found = self
            .live("free_text", self.backend.search_by_free_text(&email))
            .await?
            .into_iter()
            .any(|sale| {
                !sale.is_canceled()
                    && sale.email == email
                    && snapshot.is_valid_ticket_type(&sale.ticket_type_id)
            });
        let outcome = if found { "email_found" } else { "email_not_found" };
        metrics::counter!("ticketcheck_validations_total", "outcome" => outcome).increment(1);
        Ok(found)
    }

    /// Reference or secret path: a single resolved ticket.
    async fn resolve_ticket(
        &self,
        snapshot: &Snapshot,
        key: &TicketKey,
        claim: &ValidatedClaim,
    ) -> Result<Verdict, ValidationError> {
        let sale = match key {
            TicketKey::Reference(reference) => match snapshot.find_by_reference(reference) {
                Some(sale) => Some(sale.clone()),
                None => {
                    debug!(reference = %reference, "reference not in snapshot, searching live");
                    self.live("reference", self.backend.search_by_reference(reference))
                        .await?
                }
            },
            TicketKey::Secret(secret) => match snapshot.find_by_secret(secret) {
                Some(sale) => Some(sale.clone()),
                None => {
                    debug!("secret not in snapshot, searching live");
                    self.live("secret", self.backend.search_by_secret(secret))
                        .await?
                }
            },
        };
        let Some(sale) = sale.filter(|sale| is_live_candidate(snapshot, sale)) else {
            return Ok(Verdict::rejected(Outcome::NotFound, INVALID_TICKET_HINT));
        };

        if let Some(order) = &claim.order {
            if !sale.order.eq_ignore_ascii_case(order) {
                debug!(order = %order, reference = %sale.reference, "order and ticket disagree");
                return Ok(Verdict::rejected(Outcome::IdentifierMismatch, MISMATCH_HINT));
            }
        }

        if let Some(name) = &claim.name {
            let assessed = self.matcher.compare(&sale.name, name);
            if assessed.is_close() {
                return Ok(Verdict::rejected(Outcome::CloseNotExact, assessed.hint));
            }
            if !assessed.is_match() {
                return Ok(Verdict::rejected(Outcome::NotFound, assessed.hint));
            }
        }

        self.admit(snapshot, &sale)
    }

    /// Order path: exact (order, name) hit, else fuzzy scoring across the
    /// order's positions.
    async fn resolve_order(
        &self,
        snapshot: &Snapshot,
        order: &str,
        claim: &ValidatedClaim,
    ) -> Result<Verdict, ValidationError> {
        let name = claim.name.as_deref().unwrap_or_default();

        if let Some(sale) = snapshot.find_by_order_and_name(order, name) {
            if snapshot.is_valid_ticket_type(&sale.ticket_type_id) {
                debug!(order = %order, reference = %sale.reference, "exact order/name hit");
                return self.admit(snapshot, sale);
            }
        }

        let mut candidates: Vec<Sale> = snapshot.find_by_order(order).into_iter().cloned().collect();
        if candidates.is_empty() {
            debug!(order = %order, "order not in snapshot, searching live");
            candidates = self
                .live("order", self.backend.search_by_order(order))
                .await?
                .into_iter()
                .filter(|sale| is_live_candidate(snapshot, sale))
                .collect();
        }
        if candidates.is_empty() {
            return Ok(Verdict::rejected(Outcome::NotFound, INVALID_ORDER_HINT));
        }

        self.assess_candidates(snapshot, &candidates, name, || {
            format!("No attendee named '{name}' found on order {order}")
        })
    }

    /// Email path of an attendee claim: the email's sales are the
    /// candidates.
    async fn resolve_email(
        &self,
        snapshot: &Snapshot,
        email: &str,
        claim: &ValidatedClaim,
    ) -> Result<Verdict, ValidationError> {
        let name = claim.name.as_deref().unwrap_or_default();

        let mut candidates: Vec<Sale> = snapshot.find_by_email(email).into_iter().cloned().collect();
        if candidates.is_empty() {
            debug!(email = %email, "email not in snapshot, searching live");
            candidates = self
                .live("free_text", self.backend.search_by_free_text(email))
                .await?
                .into_iter()
                .filter(|sale| sale.email == email && is_live_candidate(snapshot, sale))
                .collect();
        }
        if candidates.is_empty() {
            return Ok(Verdict::rejected(
                Outcome::NotFound,
                format!("No ticket found for {email}"),
            ));
        }

        self.assess_candidates(snapshot, &candidates, name, || {
            format!("No attendee named '{name}' found for {email}")
        })
    }

    /// An exact name match on an in-scope ticket type wins. Failing that,
    /// the first exact match goes through the type gate; otherwise any close
    /// match rejects with a spelling hint; otherwise not found.
    fn assess_candidates(
        &self,
        snapshot: &Snapshot,
        candidates: &[Sale],
        name: &str,
        not_found_hint: impl FnOnce() -> String,
    ) -> Result<Verdict, ValidationError> {
        let mut first_match = None;
        let mut close_hint = None;
        for candidate in candidates {
            let assessed = self.matcher.compare(&candidate.name, name);
            if assessed.is_match() {
                if snapshot.is_valid_ticket_type(&candidate.ticket_type_id) {
                    debug!(reference = %candidate.reference, ratio = assessed.ratio, "name matched");
                    return self.admit(snapshot, candidate);
                }
                first_match.get_or_insert(candidate);
            } else if assessed.is_close() && close_hint.is_none() {
                close_hint = Some(assessed.hint);
            }
        }
        if let Some(candidate) = first_match {
            return self.admit(snapshot, candidate);
        }
        Ok(match close_hint {
            Some(hint) => Verdict::rejected(Outcome::CloseNotExact, hint),
            None => Verdict::rejected(Outcome::NotFound, not_found_hint()),
        })
    }

    /// Type gate followed by attribute decoration.
    fn admit(&self, snapshot: &Snapshot, sale: &Sale) -> Result<Verdict, ValidationError> {
        let Some(ticket_type) = snapshot.get_ticket_type(&sale.ticket_type_id) else {
            error!(
                reference = %sale.reference,
                ticket_type_id = %sale.ticket_type_id,
                generation = snapshot.generation(),
                "ticket references a ticket type missing from the snapshot"
            );
            return Err(ValidationError::InternalInconsistency {
                reference: sale.reference.clone(),
                ticket_type_id: sale.ticket_type_id.clone(),
            });
        };

        if !snapshot.is_valid_ticket_type(&ticket_type.id) {
            return Ok(Verdict::rejected(
                Outcome::TypeOutOfScope,
                format!("invalid ticket type: {}", ticket_type.title),
            ));
        }

        let mut attributes = ticket_type.attributes.clone();
        self.mapper.apply_ticket_override(&ticket_type.id, &mut attributes);
        self.policy.overrides.apply(&sale.reference, &mut attributes);
        Ok(Verdict::accepted(sale, ticket_type, attributes))
    }

    /// A live search, bounded by the upstream timeout. A provider that
    /// cannot perform the search reports nothing found.
    async fn live<T, F>(&self, kind: &'static str, search: F) -> Result<T, ValidationError>
    where
        T: Default,
        F: Future<Output = Result<T, BackendError>>,
    {
        metrics::counter!("ticketcheck_live_search_total", "kind" => kind).increment(1);
        let search = async move {
            match search.await {
                Err(BackendError::Unsupported { provider, operation }) => {
                    debug!(provider, operation, "live search not supported by provider");
                    Ok(T::default())
                }
                other => other,
            }
        };
        self.upstream(kind, search).await
    }

    async fn upstream<T, F>(&self, operation: &'static str, call: F) -> Result<T, ValidationError>
    where
        F: Future<Output = Result<T, BackendError>>,
    {
        let provider = self.backend.name();
        match tokio::time::timeout(self.policy.upstream_timeout, call).await {
            Ok(Ok(value)) => Ok(value),
            Ok(Err(source)) => {
                error!(provider, operation, error = %source, "upstream call failed");
                Err(ValidationError::UpstreamUnavailable {
                    provider,
                    operation,
                    source,
                })
            }
            Err(_) => {
                error!(provider, operation, timeout = ?self.policy.upstream_timeout, "upstream call timed out");
                Err(ValidationError::UpstreamTimeout {
                    provider,
                    operation,
                    timeout: self.policy.upstream_timeout,
                })
            }
        }
    }
}

/// Whether a sale returned by the provider may be considered at all.
/// Canceled sales and sales of ticket types the snapshot excluded never are.
fn is_live_candidate(snapshot: &Snapshot, sale: &Sale) -> bool {
    !sale.is_canceled() && !snapshot.is_excluded_ticket_type(&sale.ticket_type_id)
}
