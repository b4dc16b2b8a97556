//! Cached facade over the API client used by the front ends.
//!
//! Reads go through the `QueryCache`; every mutation drops the cached
//! queries it affects so the next read refetches.

use std::future::Future;
use std::sync::Arc;

use anyhow::Result;
use serde::{de::DeserializeOwned, Serialize};
use tracing::{debug, info, warn};

use crate::api::ApiClient;
use crate::auth::{Session, SessionStatus};
use crate::cache::{CacheKey, CacheKind, QueryCache};
use crate::filter::ContributionFilter;
use crate::models::{
    Admin, Contribution, ContributionUpdate, GenericResponse, Location, LocationKind,
    LocationRequest, LoginRequest, LoginResponse, Payment, PaymentRequest, Person, PersonRequest,
    RegisterRequest,
};
use crate::stats::DashboardStats;

/// Maximum number of deletions in flight during a batch delete.
const MAX_CONCURRENT_DELETES: usize = 5;

/// Outcome of a batch delete. Failures do not stop the rest of the batch.
#[derive(Debug, Default)]
pub struct BatchDelete {
    pub deleted: Vec<String>,
    pub failed: Vec<(String, anyhow::Error)>,
}

#[derive(Clone)]
pub struct Console {
    api: ApiClient,
    cache: Arc<QueryCache>,
}

impl Console {
    pub fn new(api: ApiClient) -> Self {
        Self {
            api,
            cache: Arc::new(QueryCache::new()),
        }
    }

    pub fn api(&self) -> &ApiClient {
        &self.api
    }

    pub fn session(&self) -> &Session {
        self.api.session()
    }

    pub fn cache(&self) -> &QueryCache {
        &self.cache
    }

    fn session_active(&self) -> bool {
        self.session().status() == SessionStatus::Active
    }

    /// Serve `key` from the cache while fresh, otherwise fetch and store it.
    /// Cache failures are logged and never fail the read.
    ///
    /// Nothing cached survives the end of a session, including one ended by
    /// a failed token refresh.
    async fn cached<T, F, Fut>(&self, key: CacheKey, fetch: F) -> Result<T>
    where
        T: Serialize + DeserializeOwned,
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T>>,
    {
        if !self.session_active() && !self.cache.is_empty() {
            info!("Session no longer active, dropping cached queries");
            self.cache.clear();
        }

        match self.cache.fresh::<T>(&key) {
            Ok(Some(data)) => {
                debug!(?key, "Cache hit");
                return Ok(data);
            }
            Ok(None) => {}
            Err(e) => warn!(?key, error = %e, "Ignoring unreadable cache entry"),
        }

        let result = fetch().await;
        if !self.session_active() {
            self.cache.clear();
            return result;
        }
        let data = result?;
        if let Err(e) = self.cache.save(key.clone(), &data) {
            warn!(?key, error = %e, "Failed to cache query result");
        }
        Ok(data)
    }

    // ===== Session =====

    pub async fn login(&self, request: &LoginRequest) -> Result<LoginResponse> {
        let login = self.api.login(request).await?;
        self.cache.clear();
        Ok(login)
    }

    pub fn logout(&self) -> Result<()> {
        self.cache.clear();
        self.api.logout()
    }

    // ===== Members =====

    pub async fn members(&self) -> Result<Vec<Person>> {
        self.cached(CacheKey::Members, || self.api.list_members()).await
    }

    pub async fn children(&self, parent_id: &str) -> Result<Vec<Person>> {
        self.cached(CacheKey::Children(parent_id.to_string()), || {
            self.api.list_children(parent_id)
        })
        .await
    }

    pub async fn create_member(&self, request: &PersonRequest) -> Result<Person> {
        let person = self.api.create_member(request).await?;
        self.cache.invalidate_kind(CacheKind::Members);
        Ok(person)
    }

    pub async fn update_member(&self, id: &str, request: &PersonRequest) -> Result<Person> {
        let person = self.api.update_member(id, request).await?;
        self.invalidate_people();
        Ok(person)
    }

    pub async fn delete_member(&self, id: &str) -> Result<GenericResponse> {
        let response = self.api.delete_member(id).await?;
        self.invalidate_people();
        self.cache.invalidate_kind(CacheKind::Contributions);
        Ok(response)
    }

    /// Delete several members concurrently and report each outcome.
    pub async fn delete_members(&self, ids: &[String]) -> BatchDelete {
        let mut outcome = BatchDelete::default();

        for chunk in ids.chunks(MAX_CONCURRENT_DELETES) {
            let futures: Vec<_> = chunk
                .iter()
                .map(|id| {
                    let api = self.api.clone();
                    async move {
                        let result = api.delete_member(id).await;
                        (id.clone(), result)
                    }
                })
                .collect();

            for (id, result) in futures::future::join_all(futures).await {
                match result {
                    Ok(_) => outcome.deleted.push(id),
                    Err(e) => {
                        warn!(member_id = %id, error = %e, "Failed to delete member");
                        outcome.failed.push((id, e));
                    }
                }
            }
        }

        if !outcome.deleted.is_empty() {
            self.invalidate_people();
            self.cache.invalidate_kind(CacheKind::Contributions);
        }
        info!(
            deleted = outcome.deleted.len(),
            failed = outcome.failed.len(),
            "Batch delete finished"
        );
        outcome
    }

    pub async fn delete_all_members(&self) -> Result<GenericResponse> {
        let response = self.api.delete_all_members().await?;
        self.invalidate_people();
        self.cache.invalidate_kind(CacheKind::Contributions);
        Ok(response)
    }

    pub async fn promote_member(&self, id: &str) -> Result<Person> {
        let person = self.api.promote_member(id).await?;
        self.invalidate_people();
        Ok(person)
    }

    pub async fn add_child(&self, parent_id: &str, request: &PersonRequest) -> Result<Person> {
        let child = self.api.add_child(parent_id, request).await?;
        self.cache.invalidate(&CacheKey::Children(parent_id.to_string()));
        self.cache.invalidate(&CacheKey::Members);
        Ok(child)
    }

    fn invalidate_people(&self) {
        self.cache.invalidate_kind(CacheKind::Members);
        self.cache.invalidate_kind(CacheKind::Children);
    }

    // ===== Contributions =====

    /// Contributions filtered by person and year. With both given the
    /// server filters; otherwise the full list is filtered locally.
    pub async fn contributions(&self, person_id: Option<&str>, year: Option<i32>) -> Result<Vec<Contribution>> {
        let key = CacheKey::Contributions {
            person_id: person_id.map(String::from),
            year,
        };

        match (person_id, year) {
            (Some(person_id), Some(year)) => {
                self.cached(key, || self.api.contributions_for(person_id, year))
                    .await
            }
            _ => {
                let filter = ContributionFilter {
                    person_id: person_id.map(String::from),
                    year,
                    status: None,
                };
                self.cached(key, || async {
                    let all = self.api.list_contributions().await?;
                    Ok::<Vec<Contribution>, anyhow::Error>(
                        filter.apply(&all).into_iter().cloned().collect(),
                    )
                })
                .await
            }
        }
    }

    pub async fn generate_contributions(&self, year: i32) -> Result<Vec<Contribution>> {
        let generated = self.api.generate_contributions(year).await?;
        self.cache.invalidate_kind(CacheKind::Contributions);
        Ok(generated)
    }

    pub async fn update_contribution(&self, id: &str, update: &ContributionUpdate) -> Result<Contribution> {
        let contribution = self.api.update_contribution(id, update).await?;
        self.cache.invalidate_kind(CacheKind::Contributions);
        Ok(contribution)
    }

    pub async fn delete_contribution(&self, id: &str) -> Result<()> {
        self.api.delete_contribution(id).await?;
        self.cache.invalidate_kind(CacheKind::Contributions);
        self.cache.invalidate(&CacheKey::Payments(id.to_string()));
        Ok(())
    }

    // ===== Payments =====

    pub async fn payments(&self, contribution_id: &str) -> Result<Vec<Payment>> {
        self.cached(CacheKey::Payments(contribution_id.to_string()), || {
            self.api.payments_for(contribution_id)
        })
        .await
    }

    /// Record a payment; the contribution's totals change with it.
    pub async fn create_payment(&self, request: &PaymentRequest) -> Result<Payment> {
        let payment = self.api.create_payment(request).await?;
        self.invalidate_payment(&request.contribution_id);
        Ok(payment)
    }

    pub async fn update_payment(&self, id: &str, request: &PaymentRequest) -> Result<Payment> {
        let payment = self.api.update_payment(id, request).await?;
        self.invalidate_payment(&request.contribution_id);
        Ok(payment)
    }

    pub async fn delete_payment(&self, id: &str, contribution_id: &str) -> Result<()> {
        self.api.delete_payment(id).await?;
        self.invalidate_payment(contribution_id);
        Ok(())
    }

    fn invalidate_payment(&self, contribution_id: &str) {
        self.cache.invalidate_kind(CacheKind::Contributions);
        self.cache.invalidate(&CacheKey::Payments(contribution_id.to_string()));
    }

    // ===== Districts and tributes =====

    pub async fn locations(&self, kind: LocationKind) -> Result<Vec<Location>> {
        self.cached(CacheKey::Locations(kind), || self.api.list_locations(kind))
            .await
    }

    pub async fn districts(&self) -> Result<Vec<Location>> {
        self.locations(LocationKind::District).await
    }

    pub async fn tributes(&self) -> Result<Vec<Location>> {
        self.locations(LocationKind::Tribute).await
    }

    pub async fn create_location(&self, kind: LocationKind, request: &LocationRequest) -> Result<Location> {
        let location = self.api.create_location(kind, request).await?;
        self.cache.invalidate(&CacheKey::Locations(kind));
        Ok(location)
    }

    /// Renames show up in member records too
    pub async fn update_location(&self, kind: LocationKind, id: i64, request: &LocationRequest) -> Result<Location> {
        let location = self.api.update_location(kind, id, request).await?;
        self.cache.invalidate(&CacheKey::Locations(kind));
        self.invalidate_people();
        Ok(location)
    }

    pub async fn delete_location(&self, kind: LocationKind, id: i64) -> Result<GenericResponse> {
        let response = self.api.delete_location(kind, id).await?;
        self.cache.invalidate(&CacheKey::Locations(kind));
        self.invalidate_people();
        Ok(response)
    }

    pub async fn delete_all_locations(&self, kind: LocationKind) -> Result<GenericResponse> {
        let response = self.api.delete_all_locations(kind).await?;
        self.cache.invalidate(&CacheKey::Locations(kind));
        self.invalidate_people();
        Ok(response)
    }

    // ===== Administrators =====

    pub async fn admins(&self) -> Result<Vec<Admin>> {
        self.cached(CacheKey::Admins, || self.api.list_admins()).await
    }

    pub async fn register_admin(&self, request: &RegisterRequest) -> Result<Admin> {
        let admin = self.api.register(request).await?;
        self.cache.invalidate(&CacheKey::Admins);
        Ok(admin)
    }

    pub async fn delete_admin(&self, id: &str) -> Result<GenericResponse> {
        let response = self.api.delete_admin(id).await?;
        self.cache.invalidate(&CacheKey::Admins);
        Ok(response)
    }

    // ===== Dashboard =====

    /// Figures for one year: every member against that year's contributions
    pub async fn dashboard(&self, year: i32) -> Result<DashboardStats> {
        let (members, contributions) =
            futures::try_join!(self.members(), self.contributions(None, Some(year)))?;
        Ok(DashboardStats::compute(&members, &contributions))
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    use crate::api::{api_error, ApiError};

    use super::*;

    fn console(server: &MockServer) -> Console {
        let session = Session::in_memory();
        session.set_access_token("t").unwrap();
        Console::new(ApiClient::new(server.uri(), session).unwrap())
    }

    #[tokio::test]
    async fn test_reads_are_cached() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/admins/districts"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!([{"id": 1, "name": "Antsirabe"}])))
            .expect(1)
            .mount(&server)
            .await;

        let console = console(&server);
        assert_eq!(console.districts().await.unwrap().len(), 1);
        assert_eq!(console.districts().await.unwrap()[0].name, "Antsirabe");
    }

    #[tokio::test]
    async fn test_payment_invalidates_contributions_and_payments() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/admins/contributions"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!([
                {"id": "C1", "year": 2024, "amount": 20000.0, "totalPaid": 0.0}
            ])))
            .expect(2)
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/admins/payments/contribution/C1"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
            .expect(2)
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path("/admins/payments"))
            .respond_with(ResponseTemplate::new(201).set_body_json(json!(
                {"id": "PAY1", "amountPaid": 5000.0, "status": "COMPLETED", "contributionId": "C1"}
            )))
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/admins/districts"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
            .expect(1)
            .mount(&server)
            .await;

        let console = console(&server);
        console.contributions(None, None).await.unwrap();
        console.payments("C1").await.unwrap();
        console.districts().await.unwrap();

        console
            .create_payment(&PaymentRequest::completed("C1", 5000.0))
            .await
            .unwrap();
        assert!(console.cache().contains(&CacheKey::Locations(LocationKind::District)));

        console.contributions(None, None).await.unwrap();
        console.payments("C1").await.unwrap();
        console.districts().await.unwrap();
    }

    #[tokio::test]
    async fn test_contributions_filtered_locally_by_year() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/admins/contributions"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!([
                {"id": "C1", "year": 2024, "amount": 20000.0, "totalPaid": 20000.0, "memberId": "P1"},
                {"id": "C2", "year": 2024, "amount": 20000.0, "totalPaid": 5000.0, "memberId": "P2"},
                {"id": "C3", "year": 2023, "amount": 15000.0, "totalPaid": 0.0, "memberId": "P1"}
            ])))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/admins/persons"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!([
                {"id": "P1", "firstName": "Hery", "lastName": "Rakoto", "districtName": "Antsirabe"},
                {"id": "P2", "firstName": "Lova", "lastName": "Rasoa", "districtName": "Antsirabe"}
            ])))
            .mount(&server)
            .await;

        let console = console(&server);
        let for_p1 = console.contributions(Some("P1"), None).await.unwrap();
        assert_eq!(for_p1.len(), 2);

        let stats = console.dashboard(2024).await.unwrap();
        assert_eq!(stats.total_paid, 25000.0);
        assert_eq!(stats.total_remaining, 15000.0);
        assert_eq!(stats.up_to_date, 1);
        assert_eq!(stats.late, 1);
        assert_eq!(stats.top_district, Some(("Antsirabe".to_string(), 2)));
    }

    #[tokio::test]
    async fn test_delete_members_reports_each_outcome() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/admins/persons"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
            .expect(2)
            .mount(&server)
            .await;
        for id in ["P1", "P2"] {
            Mock::given(method("DELETE"))
                .and(path(format!("/admins/persons/{}", id)))
                .respond_with(ResponseTemplate::new(200).set_body_json(json!({"message": "Deleted", "success": true})))
                .expect(1)
                .mount(&server)
                .await;
        }
        Mock::given(method("DELETE"))
            .and(path("/admins/persons/P3"))
            .respond_with(ResponseTemplate::new(404).set_body_json(json!({"error": "Person not found"})))
            .expect(1)
            .mount(&server)
            .await;

        let console = console(&server);
        console.members().await.unwrap();

        let ids: Vec<String> = vec!["P1".into(), "P2".into(), "P3".into()];
        let outcome = console.delete_members(&ids).await;
        assert_eq!(outcome.deleted, vec!["P1", "P2"]);
        assert_eq!(outcome.failed.len(), 1);
        assert_eq!(outcome.failed[0].0, "P3");

        console.members().await.unwrap();
    }

    #[tokio::test]
    async fn test_logout_clears_cache() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/admins/tributes"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
            .mount(&server)
            .await;

        let console = console(&server);
        console.tributes().await.unwrap();
        assert!(!console.cache().is_empty());

        console.logout().unwrap();
        assert!(console.cache().is_empty());
        assert!(!console.session().is_authenticated());
    }

    #[tokio::test]
    async fn test_forced_logout_drops_cached_queries() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/admins/tributes"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!([{"id": 2, "name": "Zafimaniry"}])))
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/admins/districts"))
            .respond_with(ResponseTemplate::new(401))
            .mount(&server)
            .await;

        let console = console(&server);
        console.tributes().await.unwrap();
        assert!(!console.cache().is_empty());

        // No refresh token stored, so the 401 ends the session
        let err = console.districts().await.unwrap_err();
        assert!(matches!(api_error(&err), Some(ApiError::Unauthorized)));
        assert!(matches!(console.session().status(), SessionStatus::LoginRequired { .. }));
        assert!(console.cache().is_empty());
    }
}
