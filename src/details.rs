// Detail page resolution: reuse what the results page forwarded, otherwise
// fetch the hotel's full offer list for the stay being looked at.

use chrono::{Duration, NaiveDate};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, info};

use crate::client::{ApiError, HotelApi};
use crate::models::{HotelSummary, SearchQuery};

// Stay dates and occupancy a detail fetch is keyed by. Absent fields are not sent.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DateContext {
    pub check_in_date: Option<NaiveDate>,
    pub check_out_date: Option<NaiveDate>,
    pub adults: Option<u32>,
    pub children: Option<u32>,
}

impl DateContext {
    // Used when a detail page is opened without a search behind it:
    // a week out, four nights, one adult
    pub fn fallback(today: NaiveDate) -> Self {
        let check_in = today + Duration::days(7);
        Self {
            check_in_date: Some(check_in),
            check_out_date: Some(check_in + Duration::days(4)),
            adults: Some(1),
            children: Some(0),
        }
    }

    pub fn query_params(&self) -> Vec<(&'static str, String)> {
        let mut params = Vec::with_capacity(4);
        if let Some(date) = self.check_in_date {
            params.push(("checkInDate", date.format("%Y-%m-%d").to_string()));
        }
        if let Some(date) = self.check_out_date {
            params.push(("checkOutDate", date.format("%Y-%m-%d").to_string()));
        }
        if let Some(adults) = self.adults {
            params.push(("adults", adults.to_string()));
        }
        if let Some(children) = self.children {
            params.push(("children", children.to_string()));
        }
        params
    }

    pub fn nights(&self) -> Option<i64> {
        match (self.check_in_date, self.check_out_date) {
            (Some(check_in), Some(check_out)) => Some((check_out - check_in).num_days()),
            _ => None,
        }
    }
}

impl From<&SearchQuery> for DateContext {
    fn from(query: &SearchQuery) -> Self {
        Self {
            check_in_date: Some(query.check_in_date),
            check_out_date: Some(query.check_out_date),
            adults: Some(query.adults),
            children: Some(query.children),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum DetailOutcome {
    Found(HotelSummary),
    // The hotel exists but nothing is bookable for this context
    NoOffers,
}

#[derive(Error, Debug, Clone, PartialEq)]
pub enum DetailError {
    #[error("Hotel id is required")]
    MissingHotelId,

    #[error(transparent)]
    Request(#[from] ApiError),
}

pub struct DetailResolver<A: HotelApi> {
    api: Arc<A>,
}

impl<A: HotelApi> DetailResolver<A> {
    pub fn new(api: Arc<A>) -> Self {
        Self { api }
    }

    pub async fn resolve_details(
        &self,
        hotel_id: &str,
        context: &DateContext,
        forwarded: Option<HotelSummary>,
    ) -> Result<DetailOutcome, DetailError> {
        if hotel_id.trim().is_empty() {
            return Err(DetailError::MissingHotelId);
        }

        if let Some(record) = forwarded {
            if record.hotel_id == hotel_id {
                debug!("Reusing forwarded record for {}", hotel_id);
                return Ok(outcome_for(Some(record)));
            }
            debug!(
                "Forwarded record {} does not match {}, fetching",
                record.hotel_id, hotel_id
            );
        }

        info!("Fetching details for {}", hotel_id);
        let records = self.api.hotel_details(hotel_id, context).await?;
        Ok(outcome_for(records.into_iter().next()))
    }
}

fn outcome_for(record: Option<HotelSummary>) -> DetailOutcome {
    match record {
        Some(hotel) if hotel.offer_count() > 0 => DetailOutcome::Found(hotel),
        _ => DetailOutcome::NoOffers,
    }
}
