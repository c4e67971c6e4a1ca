// City search, request lifecycle and the featured-cities aggregate

use chrono::{DateTime, Duration, NaiveDate, Utc};
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::cache::{CacheEntry, FeaturedCache, FEATURED_CACHE_KEY};
use crate::client::{ApiError, ErrorKind, HotelApi};
use crate::config::ClientConfig;
use crate::filter::{apply_filters, FilterCriteria};
use crate::models::{FeaturedHotel, HotelSummary, SearchQuery};
use crate::validation::ValidationErrors;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum SearchError {
    #[error("{0}")]
    Validation(ValidationErrors),

    #[error(transparent)]
    Request(#[from] ApiError),
}

impl SearchError {
    // Request failures only; validation never left the client
    pub fn kind(&self) -> Option<ErrorKind> {
        match self {
            SearchError::Validation(_) => None,
            SearchError::Request(e) => Some(e.kind()),
        }
    }
}

impl From<ValidationErrors> for SearchError {
    fn from(errors: ValidationErrors) -> Self {
        SearchError::Validation(errors)
    }
}

pub struct SearchOrchestrator<A: HotelApi, C: FeaturedCache> {
    api: Arc<A>,
    cache: Arc<C>,
    config: ClientConfig,
}

impl<A: HotelApi, C: FeaturedCache> SearchOrchestrator<A, C> {
    pub fn new(api: Arc<A>, cache: Arc<C>, config: ClientConfig) -> Self {
        Self { api, cache, config }
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    pub async fn search(&self, query: &SearchQuery) -> Result<Vec<HotelSummary>, SearchError> {
        query.validate()?;

        debug!(
            "Dispatching search for {} ({} -> {}, {} adults)",
            query.city_name, query.check_in_date, query.check_out_date, query.adults
        );
        let hotels = self.api.search_hotels(query).await?;
        info!("Search for {} returned {} hotels", query.city_name, hotels.len());
        Ok(hotels)
    }

    pub async fn search_preset(
        &self,
        city_name: &str,
        today: NaiveDate,
    ) -> Result<Vec<HotelSummary>, SearchError> {
        self.search(&SearchQuery::preset(city_name, today)).await
    }

    pub async fn get_or_fetch_featured(&self, cities: &[String]) -> Vec<FeaturedHotel> {
        self.get_or_fetch_featured_at(cities, Utc::now()).await
    }

    pub async fn get_or_fetch_featured_at(
        &self,
        cities: &[String],
        now: DateTime<Utc>,
    ) -> Vec<FeaturedHotel> {
        let ttl = Duration::hours(self.config.featured_ttl_hours);

        if let Some(entry) = self.cache.get(FEATURED_CACHE_KEY) {
            if entry.is_fresh(now, ttl) {
                match serde_json::from_value::<Vec<FeaturedHotel>>(entry.data) {
                    Ok(hotels) => {
                        debug!("Featured cache hit ({} hotels)", hotels.len());
                        return hotels;
                    }
                    Err(e) => warn!("Discarding undecodable featured cache entry: {}", e),
                }
            } else {
                debug!("Featured cache entry from {} expired", entry.timestamp);
            }
            self.cache.remove(FEATURED_CACHE_KEY);
        }

        let today = now.date_naive();
        let images = image_permutation(cities, self.config.image_pool_size);
        let mut featured = Vec::new();

        for city in cities {
            match self.search_preset(city, today).await {
                Ok(hotels) => {
                    debug!("Featured fetch for {} returned {} hotels", city, hotels.len());
                    for hotel in hotels {
                        let image_index = images[featured.len() % images.len()];
                        featured.push(FeaturedHotel {
                            source_city: city.clone(),
                            image_index,
                            hotel,
                        });
                    }
                }
                Err(e) => warn!("Featured fetch for {} failed: {}", city, e),
            }
        }

        if featured.is_empty() {
            info!("No featured hotels fetched, nothing cached");
            return featured;
        }

        match serde_json::to_value(&featured) {
            Ok(data) => self
                .cache
                .set(FEATURED_CACHE_KEY, CacheEntry::new(now, data)),
            Err(e) => warn!("Could not encode featured hotels for caching: {}", e),
        }

        featured
    }
}

// Seeded shuffle of the image pool; the same city list always yields the same order
pub fn image_permutation(cities: &[String], pool_size: usize) -> Vec<usize> {
    let mut pool: Vec<usize> = (0..pool_size.max(1)).collect();
    let mut rng = StdRng::seed_from_u64(city_seed(cities));
    pool.shuffle(&mut rng);
    pool
}

// FNV-1a over the city names
fn city_seed(cities: &[String]) -> u64 {
    let mut hash: u64 = 0xcbf2_9ce4_8422_2325;
    for city in cities {
        for byte in city.bytes().chain(std::iter::once(b'|')) {
            hash ^= u64::from(byte);
            hash = hash.wrapping_mul(0x0100_0000_01b3);
        }
    }
    hash
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RequestTicket(u64);

#[derive(Debug, Clone, PartialEq)]
pub enum SearchState {
    Idle,
    Loading,
    Loaded(Vec<HotelSummary>),
    Empty,
    Failed(SearchError),
}

// Lifecycle of the results page. Only the newest ticket from `begin` may complete
// the session; a response for an older ticket is dropped. Also holds the active
// filter criteria and the filtered view of the current results.
#[derive(Debug)]
pub struct SearchSession {
    state: SearchState,
    latest: u64,
    criteria: FilterCriteria,
    filtered: Vec<HotelSummary>,
}

impl Default for SearchSession {
    fn default() -> Self {
        Self::new()
    }
}

impl SearchSession {
    pub fn new() -> Self {
        Self {
            state: SearchState::Idle,
            latest: 0,
            criteria: FilterCriteria::default(),
            filtered: Vec::new(),
        }
    }

    pub fn begin(&mut self) -> RequestTicket {
        self.latest += 1;
        self.state = SearchState::Loading;
        RequestTicket(self.latest)
    }

    // Returns false when the result belongs to a superseded request
    pub fn complete(
        &mut self,
        ticket: RequestTicket,
        result: Result<Vec<HotelSummary>, SearchError>,
    ) -> bool {
        if ticket.0 != self.latest {
            debug!("Dropping stale search result (ticket {} < {})", ticket.0, self.latest);
            return false;
        }

        self.state = match result {
            Ok(hotels) if hotels.is_empty() => SearchState::Empty,
            Ok(hotels) => SearchState::Loaded(hotels),
            Err(e) => SearchState::Failed(e),
        };
        self.refilter();
        true
    }

    pub fn state(&self) -> &SearchState {
        &self.state
    }

    pub fn is_loading(&self) -> bool {
        matches!(self.state, SearchState::Loading)
    }

    pub fn hotels(&self) -> &[HotelSummary] {
        match &self.state {
            SearchState::Loaded(hotels) => hotels,
            _ => &[],
        }
    }

    pub fn criteria(&self) -> &FilterCriteria {
        &self.criteria
    }

    pub fn set_criteria(&mut self, criteria: FilterCriteria) {
        self.criteria = criteria;
        self.refilter();
    }

    pub fn filtered(&self) -> &[HotelSummary] {
        &self.filtered
    }

    fn refilter(&mut self) {
        self.filtered = apply_filters(self.hotels(), &self.criteria);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::InMemoryCache;
    use crate::client::mock_server::MockHotelApi;
    use crate::payload::fixtures::{envelope, search_hotel};
    use crate::payload::parse_hotel_list;
    use chrono::TimeZone;
    use serde_json::json;
    use tokio_test::{assert_err, assert_ok};

    fn date(s: &str) -> NaiveDate {
        NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
    }

    fn hotels(prices: &[(&str, &str)]) -> Vec<HotelSummary> {
        let entries = prices
            .iter()
            .map(|(id, total)| search_hotel(id, total))
            .collect();
        parse_hotel_list(&envelope(entries))
    }

    fn cities(names: &[&str]) -> Vec<String> {
        names.iter().map(|c| c.to_string()).collect()
    }

    fn orchestrator() -> (
        Arc<MockHotelApi>,
        Arc<InMemoryCache>,
        SearchOrchestrator<MockHotelApi, InMemoryCache>,
    ) {
        let api = Arc::new(MockHotelApi::new());
        let cache = Arc::new(InMemoryCache::new());
        let orchestrator =
            SearchOrchestrator::new(api.clone(), cache.clone(), ClientConfig::default());
        (api, cache, orchestrator)
    }

    fn noon() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 3, 1, 12, 0, 0).unwrap()
    }

    #[tokio::test]
    async fn test_search_returns_hotels_in_order() {
        let (api, _, orchestrator) = orchestrator();
        api.add_search_response("Goa", Ok(hotels(&[("H1", "1500"), ("H2", "800"), ("H3", "999")])));

        let query = SearchQuery::new("Goa", date("2025-03-01"), date("2025-03-02"), 2, 0);
        let result = assert_ok!(orchestrator.search(&query).await);

        let ids: Vec<&str> = result.iter().map(|h| h.hotel_id.as_str()).collect();
        assert_eq!(ids, vec!["H1", "H2", "H3"]);
        assert_eq!(MockHotelApi::calls(&api.search_calls), 1);
    }

    #[tokio::test]
    async fn test_empty_search_is_success() {
        let (api, _, orchestrator) = orchestrator();
        api.add_search_response("Goa", Ok(vec![]));

        let query = SearchQuery::new("Goa", date("2025-03-01"), date("2025-03-02"), 2, 0);
        assert_eq!(orchestrator.search(&query).await, Ok(vec![]));
    }

    #[tokio::test]
    async fn test_invalid_query_is_rejected_before_dispatch() {
        let (api, _, orchestrator) = orchestrator();

        let query = SearchQuery::new(" ", date("2025-03-02"), date("2025-03-02"), 0, 0);
        let error = assert_err!(orchestrator.search(&query).await);

        match &error {
            SearchError::Validation(errors) => {
                assert!(errors.has_field("cityName"));
                assert!(errors.has_field("checkOutDate"));
                assert!(errors.has_field("adults"));
            }
            other => panic!("expected validation error, got {:?}", other),
        }
        assert_eq!(error.kind(), None);
        assert_eq!(MockHotelApi::calls(&api.search_calls), 0);
    }

    #[tokio::test]
    async fn test_request_failure_carries_kind() {
        let (api, _, orchestrator) = orchestrator();
        api.add_search_response("Goa", Err(ApiError::Timeout("deadline elapsed".to_string())));

        let error = assert_err!(orchestrator.search_preset("Goa", date("2025-03-01")).await);
        assert_eq!(error.kind(), Some(ErrorKind::Timeout));
    }

    #[tokio::test]
    async fn test_featured_skips_failed_cities() {
        let (api, cache, orchestrator) = orchestrator();
        api.add_search_response("Delhi", Ok(hotels(&[("D1", "3000"), ("D2", "4000")])));
        api.add_search_response(
            "Goa",
            Err(ApiError::Server {
                status_code: 502,
                message: "Bad gateway".to_string(),
            }),
        );

        let featured = orchestrator
            .get_or_fetch_featured_at(&cities(&["Delhi", "Goa"]), noon())
            .await;

        assert_eq!(featured.len(), 2);
        assert!(featured.iter().all(|f| f.source_city == "Delhi"));
        assert_eq!(*api.searched_cities.lock(), cities(&["Delhi", "Goa"]));
        assert!(cache.get(FEATURED_CACHE_KEY).is_some());
    }

    #[tokio::test]
    async fn test_featured_cache_hit_skips_network() {
        let (api, _, orchestrator) = orchestrator();
        api.add_search_response("Delhi", Ok(hotels(&[("D1", "3000")])));
        let list = cities(&["Delhi"]);

        let first = orchestrator.get_or_fetch_featured_at(&list, noon()).await;
        let second = orchestrator
            .get_or_fetch_featured_at(&list, noon() + Duration::hours(23))
            .await;

        assert_eq!(first, second);
        assert_eq!(MockHotelApi::calls(&api.search_calls), 1);
    }

    #[tokio::test]
    async fn test_featured_cache_expiry_refetches() {
        let (api, cache, orchestrator) = orchestrator();
        api.add_search_response("Delhi", Ok(hotels(&[("D1", "3000")])));
        let list = cities(&["Delhi"]);

        orchestrator.get_or_fetch_featured_at(&list, noon()).await;
        let later = noon() + Duration::hours(25);
        orchestrator.get_or_fetch_featured_at(&list, later).await;

        assert_eq!(MockHotelApi::calls(&api.search_calls), 2);
        assert_eq!(cache.get(FEATURED_CACHE_KEY).map(|e| e.timestamp), Some(later));
    }

    #[tokio::test]
    async fn test_undecodable_cache_entry_is_replaced() {
        let (api, cache, orchestrator) = orchestrator();
        api.add_search_response("Delhi", Ok(hotels(&[("D1", "3000")])));
        cache.set(FEATURED_CACHE_KEY, CacheEntry::new(noon(), json!({ "not": "a list" })));

        let featured = orchestrator
            .get_or_fetch_featured_at(&cities(&["Delhi"]), noon())
            .await;

        assert_eq!(featured.len(), 1);
        assert_eq!(MockHotelApi::calls(&api.search_calls), 1);
        assert!(cache.get(FEATURED_CACHE_KEY).map_or(false, |e| e.data.is_array()));
    }

    #[tokio::test]
    async fn test_empty_featured_result_is_not_cached() {
        let (api, cache, orchestrator) = orchestrator();
        api.add_search_response("Delhi", Err(ApiError::Network("offline".to_string())));

        let featured = orchestrator
            .get_or_fetch_featured_at(&cities(&["Delhi", "Agra"]), noon())
            .await;

        assert!(featured.is_empty());
        assert!(cache.get(FEATURED_CACHE_KEY).is_none());
    }

    #[test]
    fn test_image_permutation_is_deterministic() {
        let list = cities(&["Delhi", "Mumbai", "Goa"]);
        let first = image_permutation(&list, 4);
        let second = image_permutation(&list, 4);

        assert_eq!(first, second);
        let mut sorted = first.clone();
        sorted.sort_unstable();
        assert_eq!(sorted, vec![0, 1, 2, 3]);
        assert_eq!(image_permutation(&list, 0), vec![0]);
    }

    #[test]
    fn test_session_drops_stale_results() {
        let mut session = SearchSession::new();
        assert_eq!(session.state(), &SearchState::Idle);

        let first = session.begin();
        let second = session.begin();
        assert!(session.is_loading());

        assert!(!session.complete(first, Ok(hotels(&[("OLD", "100")]))));
        assert!(session.is_loading());

        assert!(session.complete(second, Ok(hotels(&[("NEW", "100")]))));
        assert_eq!(session.hotels()[0].hotel_id, "NEW");
        assert_eq!(session.filtered().len(), 1);
    }

    #[test]
    fn test_session_states() {
        let mut session = SearchSession::new();

        let ticket = session.begin();
        session.complete(ticket, Ok(vec![]));
        assert_eq!(session.state(), &SearchState::Empty);

        let ticket = session.begin();
        let failure = SearchError::Request(ApiError::Network("offline".to_string()));
        session.complete(ticket, Err(failure.clone()));
        assert_eq!(session.state(), &SearchState::Failed(failure));
        assert!(session.filtered().is_empty());
    }

    #[test]
    fn test_session_refilters_on_criteria_change() {
        let mut session = SearchSession::new();
        let ticket = session.begin();
        session.complete(ticket, Ok(hotels(&[("A", "800"), ("B", "1200"), ("C", "999")])));
        assert_eq!(session.filtered().len(), 3);

        session.set_criteria(FilterCriteria::default().with_price_range("under1000"));
        let ids: Vec<&str> = session.filtered().iter().map(|h| h.hotel_id.as_str()).collect();
        assert_eq!(ids, vec!["A", "C"]);
        assert_eq!(session.hotels().len(), 3);

        session.set_criteria(FilterCriteria::default());
        assert_eq!(session.filtered().len(), 3);
    }
}
