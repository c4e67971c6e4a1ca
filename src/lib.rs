// Client-side hotel booking core: city search, result filtering, detail
// resolution and the booking flow against a remote hotel API.

pub mod booking;
pub mod cache;
pub mod client;
pub mod config;
pub mod details;
pub mod filter;
pub mod logging;
pub mod models;
pub mod offer;
pub mod payload;
pub mod search;
pub mod validation;

// Re-export key types for convenience
pub use booking::{
    list_user_bookings, BookingDraft, BookingError, BookingRequest, BookingStatus, CardDetails,
    CardVendor, Confirmation, PaymentPlaceholder,
};
pub use cache::{CacheEntry, FeaturedCache, InMemoryCache, FEATURED_CACHE_KEY};
pub use client::{
    ApiError, ClientError, ClientStats, CredentialProvider, ErrorKind, HotelApi, HttpHotelApi,
    StaticToken,
};
pub use config::ClientConfig;
pub use details::{DateContext, DetailError, DetailOutcome, DetailResolver};
pub use filter::{apply_filters, FilterCriteria, PriceRange, PRICE_RANGES};
pub use models::{
    BoardType, BookingRecord, FeaturedHotel, Guest, HotelSummary, Offer, OfferGroup, Price,
    SearchForm, SearchQuery, Title,
};
pub use offer::{
    compute_per_night, derive_feature_tags, derive_refundability, extract_primary_offer,
    primary_offer, FeatureTag,
};
pub use search::{RequestTicket, SearchError, SearchOrchestrator, SearchSession, SearchState};
pub use validation::{FieldError, ValidationErrors};
