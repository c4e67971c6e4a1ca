// Domain types shared by the search, filter, detail and booking stages

use chrono::{Duration, NaiveDate};
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::validation::{FieldError, ValidationErrors};

// A city search as sent to the backend
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchQuery {
    pub city_name: String,
    pub check_in_date: NaiveDate,
    pub check_out_date: NaiveDate,
    pub adults: u32,
    #[serde(skip_serializing_if = "is_zero", default)]
    pub children: u32,
}

fn is_zero(value: &u32) -> bool {
    *value == 0
}

impl SearchQuery {
    pub fn new(
        city_name: impl Into<String>,
        check_in_date: NaiveDate,
        check_out_date: NaiveDate,
        adults: u32,
        children: u32,
    ) -> Self {
        Self {
            city_name: city_name.into(),
            check_in_date,
            check_out_date,
            adults,
            children,
        }
    }

    // One-click city search: tomorrow -> day after, two adults
    pub fn preset(city_name: impl Into<String>, today: NaiveDate) -> Self {
        let check_in_date = today + Duration::days(1);
        Self::new(
            city_name,
            check_in_date,
            check_in_date + Duration::days(1),
            2,
            0,
        )
    }

    pub fn nights(&self) -> i64 {
        (self.check_out_date - self.check_in_date).num_days()
    }

    // Client-side checks run before anything is dispatched
    pub fn validate(&self) -> Result<(), ValidationErrors> {
        let mut errors = ValidationErrors::default();

        if self.city_name.trim().is_empty() {
            errors.push(FieldError::new("cityName", "City name is required"));
        }
        if self.check_out_date <= self.check_in_date {
            errors.push(FieldError::new(
                "checkOutDate",
                "Check-out must be after check-in",
            ));
        }
        if self.adults < 1 {
            errors.push(FieldError::new("adults", "At least one adult is required"));
        }

        errors.into_result()
    }
}

// Raw search form input. Dates may still be unset while the user is typing.
#[derive(Debug, Clone, Default)]
pub struct SearchForm {
    pub city_name: String,
    pub check_in_date: Option<NaiveDate>,
    pub check_out_date: Option<NaiveDate>,
    pub adults: u32,
    pub children: u32,
}

impl SearchForm {
    pub fn build(&self) -> Result<SearchQuery, ValidationErrors> {
        let (check_in, check_out) = match (self.check_in_date, self.check_out_date) {
            (Some(check_in), Some(check_out)) => (check_in, check_out),
            (check_in, check_out) => {
                let mut errors = ValidationErrors::default();
                if self.city_name.trim().is_empty() {
                    errors.push(FieldError::new("cityName", "City name is required"));
                }
                if check_in.is_none() {
                    errors.push(FieldError::new("checkInDate", "Check-in date is required"));
                }
                if check_out.is_none() {
                    errors.push(FieldError::new("checkOutDate", "Check-out date is required"));
                }
                if self.adults < 1 {
                    errors.push(FieldError::new("adults", "At least one adult is required"));
                }
                return Err(errors);
            }
        };

        let query = SearchQuery::new(
            self.city_name.trim(),
            check_in,
            check_out,
            self.adults,
            self.children,
        );
        query.validate()?;
        Ok(query)
    }
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Address {
    pub lines: Vec<String>,
    pub city_name: Option<String>,
    pub country_code: Option<String>,
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut parts: Vec<&str> = self.lines.iter().map(String::as_str).collect();
        if let Some(city) = &self.city_name {
            parts.push(city);
        }
        parts.push(self.country_code.as_deref().unwrap_or("India"));
        write!(f, "{}", parts.join(", "))
    }
}

// One hotel of a search result set
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HotelSummary {
    pub hotel_id: String,
    pub name: String,
    pub address: Option<Address>,
    pub city_code: Option<String>,
    pub offer_groups: Vec<OfferGroup>,
}

impl HotelSummary {
    pub fn offer_count(&self) -> usize {
        self.offer_groups.iter().map(|g| g.offers.len()).sum()
    }

    pub fn all_offers(&self) -> impl Iterator<Item = &Offer> {
        self.offer_groups.iter().flat_map(|g| g.offers.iter())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OfferGroup {
    // Hotel id of the owning hotel, not an owning link
    pub hotel_ref: String,
    pub available: Option<bool>,
    pub offers: Vec<Offer>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Offer {
    pub id: String,
    pub check_in_date: Option<NaiveDate>,
    pub check_out_date: Option<NaiveDate>,
    pub price: Option<Price>,
    pub board_type: Option<BoardType>,
    pub room: Option<Room>,
    pub policies: Policies,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Price {
    pub total: f64,
    pub currency: Option<String>,
    pub per_night_average: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum BoardType {
    RoomOnly,
    Breakfast,
    HalfBoard,
    FullBoard,
    AllInclusive,
    Other(String),
}

impl BoardType {
    pub fn as_str(&self) -> &str {
        match self {
            BoardType::RoomOnly => "ROOM_ONLY",
            BoardType::Breakfast => "BREAKFAST",
            BoardType::HalfBoard => "HALF_BOARD",
            BoardType::FullBoard => "FULL_BOARD",
            BoardType::AllInclusive => "ALL_INCLUSIVE",
            BoardType::Other(raw) => raw,
        }
    }
}

impl From<&str> for BoardType {
    fn from(raw: &str) -> Self {
        match raw {
            "ROOM_ONLY" => BoardType::RoomOnly,
            "BREAKFAST" => BoardType::Breakfast,
            "HALF_BOARD" => BoardType::HalfBoard,
            "FULL_BOARD" => BoardType::FullBoard,
            "ALL_INCLUSIVE" => BoardType::AllInclusive,
            other => BoardType::Other(other.to_string()),
        }
    }
}

impl From<String> for BoardType {
    fn from(raw: String) -> Self {
        BoardType::from(raw.as_str())
    }
}

impl From<BoardType> for String {
    fn from(board: BoardType) -> Self {
        board.as_str().to_string()
    }
}

impl fmt::Display for BoardType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Room {
    pub bed_type: Option<String>,
    pub category: Option<String>,
    pub room_type: Option<String>,
    pub beds: Option<u32>,
    pub description: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Policies {
    pub cancellation_refund: Option<String>,
    pub payment_type: Option<String>,
    pub cancellations: Vec<CancellationPolicy>,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CancellationPolicy {
    pub policy_type: Option<String>,
    pub deadline: Option<String>,
    pub amount: Option<f64>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Title {
    #[default]
    Mr,
    Mrs,
    Ms,
    Mstr,
    Dr,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Guest {
    pub title: Title,
    pub first_name: String,
    pub last_name: String,
    pub phone: String,
    pub email: String,
}

// A hotel pre-fetched for the featured section, tagged with where it came from
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FeaturedHotel {
    pub source_city: String,
    pub image_index: usize,
    pub hotel: HotelSummary,
}

// One past booking of the signed-in user
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BookingRecord {
    pub id: String,
    pub hotel_name: Option<String>,
    pub city_code: Option<String>,
    pub status: String,
    pub total: Option<f64>,
    pub currency: Option<String>,
    pub check_in_date: Option<NaiveDate>,
    pub check_out_date: Option<NaiveDate>,
}

impl BookingRecord {
    pub fn is_confirmed(&self) -> bool {
        self.status == "CONFIRMED"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(s: &str) -> NaiveDate {
        NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
    }

    #[test]
    fn test_query_serializes_wire_shape() {
        let query = SearchQuery::new("Goa", date("2025-03-01"), date("2025-03-02"), 2, 0);
        let json = serde_json::to_value(&query).unwrap();

        assert_eq!(json["cityName"], "Goa");
        assert_eq!(json["checkInDate"], "2025-03-01");
        assert_eq!(json["checkOutDate"], "2025-03-02");
        assert_eq!(json["adults"], 2);
        assert!(json.get("children").is_none());
    }

    #[test]
    fn test_query_validation_lists_every_problem() {
        let query = SearchQuery::new("  ", date("2025-03-02"), date("2025-03-02"), 0, 0);
        let errors = query.validate().unwrap_err();

        assert!(errors.has_field("cityName"));
        assert!(errors.has_field("checkOutDate"));
        assert!(errors.has_field("adults"));
        assert_eq!(errors.len(), 3);
    }

    #[test]
    fn test_preset_query_uses_tomorrow_and_two_adults() {
        let query = SearchQuery::preset("Delhi", date("2025-06-10"));

        assert_eq!(query.check_in_date, date("2025-06-11"));
        assert_eq!(query.check_out_date, date("2025-06-12"));
        assert_eq!(query.adults, 2);
        assert_eq!(query.nights(), 1);
        assert!(query.validate().is_ok());
    }

    #[test]
    fn test_form_requires_both_dates() {
        let form = SearchForm {
            city_name: "Goa".to_string(),
            check_in_date: Some(date("2025-03-01")),
            check_out_date: None,
            adults: 1,
            children: 0,
        };
        let errors = form.build().unwrap_err();
        assert!(errors.has_field("checkOutDate"));
        assert!(!errors.has_field("checkInDate"));
    }

    #[test]
    fn test_form_trims_city_name() {
        let form = SearchForm {
            city_name: "  Goa ".to_string(),
            check_in_date: Some(date("2025-03-01")),
            check_out_date: Some(date("2025-03-03")),
            adults: 1,
            children: 1,
        };
        let query = form.build().unwrap();
        assert_eq!(query.city_name, "Goa");
        assert_eq!(query.nights(), 2);
    }

    #[test]
    fn test_board_type_keeps_unknown_codes() {
        assert_eq!(BoardType::from("BREAKFAST"), BoardType::Breakfast);
        let other = BoardType::from("DINNER");
        assert_eq!(other.as_str(), "DINNER");

        let json = serde_json::to_string(&BoardType::RoomOnly).unwrap();
        assert_eq!(json, "\"ROOM_ONLY\"");
    }

    #[test]
    fn test_address_display_defaults_country() {
        let address = Address {
            lines: vec!["12 Beach Road".to_string()],
            city_name: None,
            country_code: None,
        };
        assert_eq!(address.to_string(), "12 Beach Road, India");
    }
}
