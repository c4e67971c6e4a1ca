// Wire-level structures for the hotel API responses and their conversion
// into the domain model. The upstream shape is only loosely specified, so every
// field is optional and numbers may arrive as strings.

use chrono::NaiveDate;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use tracing::{debug, warn};

use crate::models::{
    Address, BoardType, BookingRecord, CancellationPolicy, HotelSummary, Offer, OfferGroup,
    Policies, Price, Room,
};

// Scalar or nested field of the wrong type: treated as absent
fn lenient<'de, D, T>(deserializer: D) -> Result<Option<T>, D::Error>
where
    D: Deserializer<'de>,
    T: DeserializeOwned,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(value.and_then(|v| serde_json::from_value(v).ok()))
}

// Identifiers may arrive as numbers
fn lenient_id<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(match value {
        Some(Value::String(s)) => Some(s),
        Some(Value::Number(n)) => Some(n.to_string()),
        _ => None,
    })
}

// Each element decodes on its own; a bad element only drops itself
fn lenient_vec<'de, D, T>(deserializer: D) -> Result<Vec<T>, D::Error>
where
    D: Deserializer<'de>,
    T: DeserializeOwned,
{
    let items = match Option::<Value>::deserialize(deserializer)? {
        Some(Value::Array(items)) => items,
        _ => return Ok(Vec::new()),
    };

    Ok(items
        .into_iter()
        .filter_map(|item| match serde_json::from_value(item) {
            Ok(decoded) => Some(decoded),
            Err(e) => {
                warn!("Skipping malformed list element: {}", e);
                None
            }
        })
        .collect())
}

fn lenient_f64<'de, D>(deserializer: D) -> Result<Option<f64>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(value.as_ref().and_then(number_from_value))
}

fn lenient_u32<'de, D>(deserializer: D) -> Result<Option<u32>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(value
        .as_ref()
        .and_then(number_from_value)
        .filter(|n| *n >= 0.0 && n.fract() == 0.0)
        .map(|n| n as u32))
}

fn number_from_value(value: &Value) -> Option<f64> {
    let number = match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    };
    number.filter(|n| n.is_finite())
}

fn parse_date(raw: Option<&str>) -> Option<NaiveDate> {
    raw.and_then(|s| NaiveDate::parse_from_str(s.get(..10).unwrap_or(s), "%Y-%m-%d").ok())
}

// Structures for JSON deserialization
#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct RawHotelEntry {
    #[serde(deserialize_with = "lenient_id")]
    pub hotel_id: Option<String>,
    #[serde(deserialize_with = "lenient")]
    pub name: Option<String>,
    #[serde(deserialize_with = "lenient")]
    pub available: Option<bool>,
    #[serde(deserialize_with = "lenient")]
    pub hotel: Option<RawHotelInfo>,
    // Offer groups (search shape), offers (detail shape), or a mix
    #[serde(deserialize_with = "lenient_vec")]
    pub offers: Vec<Value>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct RawHotelInfo {
    #[serde(deserialize_with = "lenient_id")]
    pub hotel_id: Option<String>,
    #[serde(deserialize_with = "lenient")]
    pub name: Option<String>,
    #[serde(deserialize_with = "lenient")]
    pub city_code: Option<String>,
    #[serde(deserialize_with = "lenient")]
    pub address: Option<RawAddress>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct RawAddress {
    #[serde(deserialize_with = "lenient_vec")]
    pub lines: Vec<String>,
    #[serde(deserialize_with = "lenient")]
    pub city_name: Option<String>,
    #[serde(deserialize_with = "lenient")]
    pub country_code: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct RawOfferGroup {
    #[serde(deserialize_with = "lenient")]
    pub available: Option<bool>,
    #[serde(deserialize_with = "lenient")]
    pub hotel: Option<RawHotelInfo>,
    #[serde(deserialize_with = "lenient_vec")]
    pub offers: Vec<RawOffer>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct RawOffer {
    #[serde(deserialize_with = "lenient_id")]
    pub id: Option<String>,
    #[serde(deserialize_with = "lenient")]
    pub check_in_date: Option<String>,
    #[serde(deserialize_with = "lenient")]
    pub check_out_date: Option<String>,
    #[serde(deserialize_with = "lenient")]
    pub price: Option<RawPrice>,
    #[serde(deserialize_with = "lenient")]
    pub board_type: Option<String>,
    #[serde(deserialize_with = "lenient")]
    pub room: Option<RawRoom>,
    #[serde(deserialize_with = "lenient")]
    pub room_information: Option<RawRoom>,
    #[serde(deserialize_with = "lenient")]
    pub policies: Option<RawPolicies>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct RawPrice {
    #[serde(deserialize_with = "lenient")]
    pub currency: Option<String>,
    #[serde(deserialize_with = "lenient_f64")]
    pub total: Option<f64>,
    #[serde(deserialize_with = "lenient")]
    pub variations: Option<RawPriceVariations>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct RawPriceVariations {
    #[serde(deserialize_with = "lenient")]
    pub average: Option<RawAveragePrice>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct RawAveragePrice {
    #[serde(deserialize_with = "lenient_f64")]
    pub base: Option<f64>,
    #[serde(deserialize_with = "lenient_f64")]
    pub total: Option<f64>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct RawRoom {
    #[serde(rename = "type", deserialize_with = "lenient")]
    pub room_type: Option<String>,
    #[serde(deserialize_with = "lenient")]
    pub type_estimated: Option<RawTypeEstimated>,
    #[serde(deserialize_with = "lenient")]
    pub description: Option<RawDescription>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct RawTypeEstimated {
    #[serde(deserialize_with = "lenient")]
    pub category: Option<String>,
    #[serde(deserialize_with = "lenient_u32")]
    pub beds: Option<u32>,
    #[serde(deserialize_with = "lenient")]
    pub bed_type: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct RawDescription {
    #[serde(deserialize_with = "lenient")]
    pub text: Option<String>,
    #[serde(deserialize_with = "lenient")]
    pub lang: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct RawPolicies {
    #[serde(deserialize_with = "lenient")]
    pub payment_type: Option<String>,
    #[serde(deserialize_with = "lenient")]
    pub refundable: Option<RawRefundable>,
    #[serde(deserialize_with = "lenient_vec")]
    pub cancellations: Vec<RawCancellation>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct RawRefundable {
    #[serde(deserialize_with = "lenient")]
    pub cancellation_refund: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct RawCancellation {
    #[serde(deserialize_with = "lenient")]
    pub policy_type: Option<String>,
    #[serde(deserialize_with = "lenient")]
    pub deadline: Option<String>,
    #[serde(deserialize_with = "lenient_f64")]
    pub amount: Option<f64>,
}

impl From<RawAddress> for Address {
    fn from(raw: RawAddress) -> Self {
        Address {
            lines: raw.lines,
            city_name: raw.city_name,
            country_code: raw.country_code,
        }
    }
}

impl From<RawRoom> for Room {
    fn from(raw: RawRoom) -> Self {
        let estimated = raw.type_estimated.unwrap_or_default();
        Room {
            bed_type: estimated.bed_type,
            category: estimated.category,
            room_type: raw.room_type,
            beds: estimated.beds,
            description: raw.description.and_then(|d| d.text),
        }
    }
}

impl From<RawPolicies> for Policies {
    fn from(raw: RawPolicies) -> Self {
        Policies {
            cancellation_refund: raw.refundable.and_then(|r| r.cancellation_refund),
            payment_type: raw.payment_type,
            cancellations: raw
                .cancellations
                .into_iter()
                .map(|c| CancellationPolicy {
                    policy_type: c.policy_type,
                    deadline: c.deadline,
                    amount: c.amount,
                })
                .collect(),
        }
    }
}

impl RawPrice {
    // A price without a usable total is treated as no price at all
    fn into_price(self) -> Option<Price> {
        let total = self.total?;
        let per_night_average = self
            .variations
            .and_then(|v| v.average)
            .and_then(|a| a.total.or(a.base));
        Some(Price {
            total,
            currency: self.currency,
            per_night_average,
        })
    }
}

impl RawOffer {
    fn into_offer(self) -> Option<Offer> {
        let id = match self.id.filter(|id| !id.is_empty()) {
            Some(id) => id,
            None => {
                debug!("Skipping offer without id");
                return None;
            }
        };

        Some(Offer {
            id,
            check_in_date: parse_date(self.check_in_date.as_deref()),
            check_out_date: parse_date(self.check_out_date.as_deref()),
            price: self.price.and_then(RawPrice::into_price),
            board_type: self
                .board_type
                .filter(|b| !b.is_empty())
                .map(BoardType::from),
            room: self.room.or(self.room_information).map(Room::from),
            policies: self.policies.map(Policies::from).unwrap_or_default(),
        })
    }
}

fn offers_from(raw: Vec<RawOffer>) -> Vec<Offer> {
    raw.into_iter().filter_map(RawOffer::into_offer).collect()
}

impl RawHotelEntry {
    pub fn into_summary(self) -> Option<HotelSummary> {
        let info = self.hotel.unwrap_or_default();
        let hotel_id = self.hotel_id.or(info.hotel_id).filter(|id| !id.is_empty());
        let hotel_id = match hotel_id {
            Some(id) => id,
            None => {
                warn!("Skipping hotel entry without hotelId");
                return None;
            }
        };

        let mut city_code = info.city_code;
        let mut address = info.address.map(Address::from);
        let mut offer_groups = Vec::new();
        let mut loose_offers = Vec::new();

        // Each element is either a group (has an `offers` array) or a bare offer
        for value in self.offers {
            let is_group = value.get("offers").map_or(false, Value::is_array);
            if is_group {
                let group = match serde_json::from_value::<RawOfferGroup>(value) {
                    Ok(group) => group,
                    Err(e) => {
                        warn!("Skipping malformed offer group for {}: {}", hotel_id, e);
                        continue;
                    }
                };
                // Search results carry the hotel block inside each group
                if let Some(group_hotel) = group.hotel {
                    city_code = city_code.or(group_hotel.city_code);
                    address = address.or(group_hotel.address.map(Address::from));
                }
                offer_groups.push(OfferGroup {
                    hotel_ref: hotel_id.clone(),
                    available: group.available,
                    offers: offers_from(group.offers),
                });
            } else {
                match serde_json::from_value::<RawOffer>(value) {
                    Ok(offer) => loose_offers.push(offer),
                    Err(e) => warn!("Skipping malformed offer for {}: {}", hotel_id, e),
                }
            }
        }

        if !loose_offers.is_empty() {
            offer_groups.push(OfferGroup {
                hotel_ref: hotel_id.clone(),
                available: self.available,
                offers: offers_from(loose_offers),
            });
        }

        Some(HotelSummary {
            name: self.name.or(info.name).unwrap_or_else(|| "Hotel".to_string()),
            hotel_id,
            address,
            city_code,
            offer_groups,
        })
    }
}

// Unwraps `{data: {hotelsWithOffers: [...]}}`; a missing list is an empty one
pub fn parse_hotel_list(envelope: &Value) -> Vec<HotelSummary> {
    let entries = match envelope
        .pointer("/data/hotelsWithOffers")
        .and_then(Value::as_array)
    {
        Some(entries) => entries,
        None => {
            debug!("Response carries no hotelsWithOffers list");
            return Vec::new();
        }
    };

    entries
        .iter()
        .filter_map(|entry| match RawHotelEntry::deserialize(entry) {
            Ok(raw) => raw.into_summary(),
            Err(e) => {
                warn!("Skipping malformed hotel entry: {}", e);
                None
            }
        })
        .collect()
}

// Reply of the offer availability check
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct OfferCheck {
    pub status: Option<String>,
    pub message: Option<String>,
}

impl OfferCheck {
    pub fn is_success(&self) -> bool {
        self.status.as_deref() == Some("success")
    }
}

// Reply of the booking commit
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct BookingReply {
    pub status: Option<String>,
    pub message: Option<String>,
    pub booking: Option<Value>,
}

impl BookingReply {
    pub fn is_success(&self) -> bool {
        self.status.as_deref() == Some("success")
    }
}

pub fn parse_offer_check(value: &Value) -> OfferCheck {
    OfferCheck::deserialize(value).unwrap_or_else(|e| {
        warn!("Malformed offer check reply: {}", e);
        OfferCheck::default()
    })
}

pub fn parse_booking_reply(value: &Value) -> BookingReply {
    BookingReply {
        status: value.get("status").and_then(Value::as_str).map(str::to_string),
        message: value.get("message").and_then(Value::as_str).map(str::to_string),
        booking: value.pointer("/data/booking").cloned(),
    }
}

fn str_at(value: &Value, pointer: &str) -> Option<String> {
    value.pointer(pointer).and_then(Value::as_str).map(str::to_string)
}

fn record_from(value: &Value) -> Option<BookingRecord> {
    let id = str_at(value, "/_id").or_else(|| str_at(value, "/id"))?;
    let hotel_booking = value
        .pointer("/bookingConfirmation/hotelBookings/0")
        .unwrap_or(&Value::Null);

    Some(BookingRecord {
        id,
        hotel_name: str_at(hotel_booking, "/hotel/name"),
        city_code: str_at(hotel_booking, "/hotel/cityCode"),
        status: str_at(hotel_booking, "/bookingStatus").unwrap_or_else(|| "UNKNOWN".to_string()),
        total: hotel_booking
            .pointer("/hotelOffer/price/total")
            .and_then(number_from_value),
        currency: str_at(hotel_booking, "/hotelOffer/price/currency"),
        check_in_date: parse_date(str_at(hotel_booking, "/hotelOffer/checkInDate").as_deref()),
        check_out_date: parse_date(str_at(hotel_booking, "/hotelOffer/checkOutDate").as_deref()),
    })
}

// Unwraps `{data: [...]}` of the booking history endpoint
pub fn parse_booking_records(envelope: &Value) -> Vec<BookingRecord> {
    envelope
        .get("data")
        .and_then(Value::as_array)
        .map(|records| {
            records
                .iter()
                .filter_map(|record| {
                    let parsed = record_from(record);
                    if parsed.is_none() {
                        warn!("Skipping booking record without id");
                    }
                    parsed
                })
                .collect()
        })
        .unwrap_or_default()
}

#[cfg(test)]
pub mod fixtures {
    use serde_json::{json, Value};

    // A search-shaped hotel entry with one offer group and one offer
    pub fn search_hotel(hotel_id: &str, total: &str) -> Value {
        json!({
            "hotelId": hotel_id,
            "name": format!("Hotel {}", hotel_id),
            "offers": [{
                "available": true,
                "hotel": {
                    "hotelId": hotel_id,
                    "cityCode": "GOI",
                    "address": { "lines": ["Beach Road"], "countryCode": "IN" }
                },
                "offers": [{
                    "id": format!("OFFER-{}", hotel_id),
                    "checkInDate": "2025-03-01",
                    "checkOutDate": "2025-03-02",
                    "boardType": "BREAKFAST",
                    "price": { "currency": "INR", "total": total },
                    "room": {
                        "type": "A1K",
                        "typeEstimated": {
                            "category": "DELUXE_ROOM",
                            "beds": 1,
                            "bedType": "KING"
                        },
                        "description": { "text": "Deluxe room, free wifi, 32 sqm", "lang": "EN" }
                    },
                    "policies": {
                        "paymentType": "prepay",
                        "refundable": { "cancellationRefund": "REFUNDABLE_UP_TO_DEADLINE" },
                        "cancellations": [{
                            "policyType": "CANCELLATION",
                            "deadline": "2025-02-27T23:59:00+05:30"
                        }]
                    }
                }]
            }]
        })
    }

    pub fn envelope(hotels: Vec<Value>) -> Value {
        json!({ "data": { "hotelsWithOffers": hotels } })
    }
}
