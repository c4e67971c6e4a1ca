// Client-side filtering of a search result set

use crate::models::{BoardType, HotelSummary, Offer};
use crate::offer::{derive_refundability, primary_offer};

#[derive(Debug, Clone, Default, PartialEq)]
pub struct FilterCriteria {
    pub price_min: Option<f64>,
    pub price_max: Option<f64>,
    pub board_type: Option<BoardType>,
    pub bed_type: Option<String>,
    pub refundable_only: bool,
}

// A fixed price bracket offered by the filter bar
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PriceRange {
    pub key: &'static str,
    pub label: &'static str,
    pub min: Option<f64>,
    pub max: Option<f64>,
}

pub const PRICE_RANGES: &[PriceRange] = &[
    PriceRange {
        key: "under1000",
        label: "Below ₹1000",
        min: None,
        max: Some(1000.0),
    },
    PriceRange {
        key: "1k-2k",
        label: "₹1000 - ₹2000",
        min: Some(1000.0),
        max: Some(2000.0),
    },
    PriceRange {
        key: "above2k",
        label: "Above ₹2000",
        min: Some(2000.0),
        max: None,
    },
    PriceRange {
        key: "above5k",
        label: "Above ₹5000",
        min: Some(5000.0),
        max: None,
    },
    PriceRange {
        key: "above10k",
        label: "Above ₹10000",
        min: Some(10000.0),
        max: None,
    },
    PriceRange {
        key: "10k-20k",
        label: "₹10000 - ₹20000",
        min: Some(10000.0),
        max: Some(20000.0),
    },
    PriceRange {
        key: "20k-30k",
        label: "₹20000 - ₹30000",
        min: Some(20000.0),
        max: Some(30000.0),
    },
    PriceRange {
        key: "above30k",
        label: "Above ₹30000",
        min: Some(30000.0),
        max: None,
    },
];

pub fn price_range(key: &str) -> Option<&'static PriceRange> {
    PRICE_RANGES.iter().find(|r| r.key == key)
}

impl FilterCriteria {
    pub fn is_empty(&self) -> bool {
        self.price_min.is_none()
            && self.price_max.is_none()
            && self.board_type.is_none()
            && self.bed_type.is_none()
            && !self.refundable_only
    }

    // Unknown keys clear the price bounds, like picking "All"
    pub fn with_price_range(mut self, key: &str) -> Self {
        let range = price_range(key);
        self.price_min = range.and_then(|r| r.min);
        self.price_max = range.and_then(|r| r.max);
        self
    }

    fn has_price_bound(&self) -> bool {
        self.price_min.is_some() || self.price_max.is_some()
    }

    pub fn matches(&self, offer: &Offer) -> bool {
        if self.has_price_bound() {
            // An unpriced offer is compared as 0
            let total = offer.price.as_ref().map_or(0.0, |price| price.total);
            if !self.price_min.map_or(true, |min| min <= total) {
                return false;
            }
            if !self.price_max.map_or(true, |max| total <= max) {
                return false;
            }
        }

        if !self
            .board_type
            .as_ref()
            .map_or(true, |board| offer.board_type.as_ref() == Some(board))
        {
            return false;
        }

        if !self.bed_type.as_ref().map_or(true, |bed| {
            offer
                .room
                .as_ref()
                .and_then(|r| r.bed_type.as_ref())
                .map_or(false, |b| b == bed)
        }) {
            return false;
        }

        if self.refundable_only && !derive_refundability(offer) {
            return false;
        }

        true
    }
}

// Keeps input order; hotels without a primary offer never pass
pub fn apply_filters(hotels: &[HotelSummary], criteria: &FilterCriteria) -> Vec<HotelSummary> {
    let mut filtered = Vec::with_capacity(hotels.len());

    for hotel in hotels {
        let offer = match primary_offer(hotel) {
            Some(offer) => offer,
            None => continue,
        };

        if criteria.matches(offer) {
            filtered.push(hotel.clone());
        }
    }

    filtered
}
