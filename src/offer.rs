// Offer normalization: the one place that decides which offer a hotel is shown
// with, plus the pure helpers the list and detail views render from.

use chrono::{DateTime, NaiveDate, Utc};
use regex::Regex;
use serde::Serialize;
use std::sync::OnceLock;

use crate::models::{BoardType, HotelSummary, Offer};

pub const NON_REFUNDABLE: &str = "NON_REFUNDABLE";

// First offer of the first offer group
pub fn primary_offer(hotel: &HotelSummary) -> Option<&Offer> {
    hotel.offer_groups.first()?.offers.first()
}

pub fn extract_primary_offer(hotel: &HotelSummary) -> Option<Offer> {
    primary_offer(hotel).cloned()
}

pub fn derive_refundability(offer: &Offer) -> bool {
    offer.policies.cancellation_refund.as_deref() != Some(NON_REFUNDABLE)
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FeatureTag {
    pub label: String,
    pub icon_key: Option<&'static str>,
}

impl FeatureTag {
    fn plain(label: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            icon_key: None,
        }
    }

    fn with_icon(label: impl Into<String>, icon_key: &'static str) -> Self {
        Self {
            label: label.into(),
            icon_key: Some(icon_key),
        }
    }
}

// (keyword, label, icon). Each keyword found in the description adds its tag.
const DESCRIPTION_KEYWORDS: &[(&str, &str, &str)] = &[
    ("wifi", "Free Wi-Fi", "wifi"),
    ("wi-fi", "Free Wi-Fi", "wifi"),
    ("bubble bath", "Bubble Bath", "bathtub"),
    ("bathtub", "Bubble Bath", "bathtub"),
    ("work area", "Work Area", "business_center"),
    ("desk", "Work Area", "business_center"),
    ("fitness", "Fitness Center", "fitness_center"),
    ("gym", "Fitness Center", "fitness_center"),
    ("pool", "Swimming Pool", "pool"),
];

fn room_size_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"(?i)(\d+)\s*sqm").expect("static regex"))
}

pub fn derive_feature_tags(offer: &Offer) -> Vec<FeatureTag> {
    let mut tags = Vec::new();

    if let Some(room) = &offer.room {
        if let Some(bed_type) = &room.bed_type {
            tags.push(FeatureTag::plain(format!("{} Bed", bed_type)));
        }
        if let Some(category) = &room.category {
            tags.push(FeatureTag::plain(category.replace('_', " ")));
        }
    }

    if let Some(board) = &offer.board_type {
        if *board != BoardType::RoomOnly {
            tags.push(FeatureTag::with_icon(
                board.as_str().replace('_', " "),
                "fastfood",
            ));
        }
    }

    let description = offer
        .room
        .as_ref()
        .and_then(|r| r.description.as_deref())
        .unwrap_or_default();
    let lowered = description.to_lowercase();

    for (keyword, label, icon) in DESCRIPTION_KEYWORDS {
        if lowered.contains(keyword) {
            tags.push(FeatureTag::with_icon(*label, *icon));
        }
    }

    if let Some(size) = room_size_pattern()
        .captures(description)
        .and_then(|c| c.get(1))
    {
        tags.push(FeatureTag::plain(format!("{} SqM", size.as_str())));
    }

    tags
}

pub fn compute_per_night(total: Option<f64>, nights: i64) -> Option<f64> {
    if nights <= 0 {
        return None;
    }
    total.map(|t| t / nights as f64)
}

fn currency_symbol(code: &str) -> String {
    match code {
        "INR" => "₹".to_string(),
        "USD" => "$".to_string(),
        "EUR" => "€".to_string(),
        "GBP" => "£".to_string(),
        other => format!("{} ", other),
    }
}

// Lakh/crore grouping: last three digits, then pairs
fn group_indian(digits: &str) -> String {
    if digits.len() <= 3 {
        return digits.to_string();
    }
    let (head, tail) = digits.split_at(digits.len() - 3);
    let mut groups = Vec::new();
    let mut end = head.len();
    while end > 0 {
        let start = end.saturating_sub(2);
        groups.push(&head[start..end]);
        end = start;
    }
    groups.reverse();
    format!("{},{}", groups.join(","), tail)
}

// en-IN currency display with 0-2 fractional digits
pub fn format_price(amount: f64, currency: Option<&str>) -> String {
    let symbol = currency_symbol(currency.unwrap_or("INR"));
    let cents = (amount.abs() * 100.0).round() as u64;
    let whole = group_indian(&(cents / 100).to_string());
    let fraction = cents % 100;
    let sign = if amount < 0.0 && cents > 0 { "-" } else { "" };

    let fraction = if fraction == 0 {
        String::new()
    } else if fraction % 10 == 0 {
        format!(".{}", fraction / 10)
    } else {
        format!(".{:02}", fraction)
    };

    format!("{}{}{}{}", sign, symbol, whole, fraction)
}

fn parse_deadline(raw: &str) -> Option<DateTime<Utc>> {
    if let Ok(parsed) = DateTime::parse_from_rfc3339(raw) {
        return Some(parsed.with_timezone(&Utc));
    }
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .map(|dt| dt.and_utc())
}

pub fn cancellation_policy_text(offer: &Offer, now: DateTime<Utc>) -> String {
    let cancellation = match offer.policies.cancellations.first() {
        Some(c) => c,
        None => return "Policy not specified".to_string(),
    };

    match cancellation.policy_type.as_deref() {
        Some("CANCELLATION") => {
            if !derive_refundability(offer) {
                return "Non-Refundable".to_string();
            }
            match cancellation.deadline.as_deref().map(parse_deadline) {
                Some(Some(deadline)) if deadline > now => format!(
                    "Free cancellation until {}",
                    deadline.format("%-d %b %Y")
                ),
                Some(_) => "Cancellation possible (fees may apply)".to_string(),
                None => "Cancellation possible".to_string(),
            }
        }
        Some("NO_CANCELLATION") => "No Cancellation Allowed".to_string(),
        _ => "Policy Details Available".to_string(),
    }
}

// Stable string hash so a hotel keeps the same placeholder image across renders
pub fn hotel_image_index(hotel_id: &str, pool_size: usize) -> usize {
    if pool_size == 0 {
        return 0;
    }
    let mut hash: i64 = 0;
    for unit in hotel_id.encode_utf16() {
        let shifted = (hash as i32).wrapping_shl(5) as i64;
        hash = unit as i64 + shifted - hash;
    }
    (hash.unsigned_abs() % pool_size as u64) as usize
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{CancellationPolicy, OfferGroup, Policies, Price, Room};
    use chrono::TimeZone;

    fn offer() -> Offer {
        Offer {
            id: "O1".to_string(),
            check_in_date: None,
            check_out_date: None,
            price: Some(Price {
                total: 1000.0,
                currency: Some("INR".to_string()),
                per_night_average: None,
            }),
            board_type: Some(BoardType::RoomOnly),
            room: None,
            policies: Policies::default(),
        }
    }

    fn hotel(groups: Vec<Vec<Offer>>) -> HotelSummary {
        HotelSummary {
            hotel_id: "H1".to_string(),
            name: "Test".to_string(),
            address: None,
            city_code: None,
            offer_groups: groups
                .into_iter()
                .map(|offers| OfferGroup {
                    hotel_ref: "H1".to_string(),
                    available: Some(true),
                    offers,
                })
                .collect(),
        }
    }

    #[test]
    fn test_primary_offer_is_first_of_first_group() {
        let mut second = offer();
        second.id = "O2".to_string();
        let h = hotel(vec![vec![offer(), second.clone()], vec![second]]);
        assert_eq!(primary_offer(&h).map(|o| o.id.as_str()), Some("O1"));

        let empty_first_group = hotel(vec![vec![], vec![offer()]]);
        assert!(primary_offer(&empty_first_group).is_none());
        assert!(extract_primary_offer(&hotel(vec![])).is_none());
    }

    #[test]
    fn test_refundability_only_false_for_non_refundable() {
        let mut o = offer();
        assert!(derive_refundability(&o));

        o.policies.cancellation_refund = Some("REFUNDABLE_UP_TO_DEADLINE".to_string());
        assert!(derive_refundability(&o));

        o.policies.cancellation_refund = Some(NON_REFUNDABLE.to_string());
        assert!(!derive_refundability(&o));
    }

    #[test]
    fn test_per_night() {
        assert_eq!(compute_per_night(Some(1000.0), 4), Some(250.0));
        assert_eq!(compute_per_night(Some(1000.0), 0), None);
        assert_eq!(compute_per_night(Some(1000.0), -2), None);
        assert_eq!(compute_per_night(None, 3), None);
    }

    #[test]
    fn test_feature_tags_from_structured_fields_and_description() {
        let mut o = offer();
        o.board_type = Some(BoardType::Breakfast);
        o.room = Some(Room {
            bed_type: Some("KING".to_string()),
            category: Some("DELUXE_ROOM".to_string()),
            room_type: None,
            beds: Some(1),
            description: Some("Free WiFi, writing DESK and 28 SQM of space".to_string()),
        });

        let labels: Vec<String> = derive_feature_tags(&o).into_iter().map(|t| t.label).collect();
        assert_eq!(
            labels,
            vec!["KING Bed", "DELUXE ROOM", "BREAKFAST", "Free Wi-Fi", "Work Area", "28 SqM"]
        );
    }

    #[test]
    fn test_feature_tags_keep_duplicates() {
        let mut o = offer();
        o.room = Some(Room {
            description: Some("Marble bathtub and a bubble bath kit".to_string()),
            ..Room::default()
        });

        let tags = derive_feature_tags(&o);
        let baths = tags.iter().filter(|t| t.label == "Bubble Bath").count();
        assert_eq!(baths, 2);
        assert!(tags.iter().all(|t| t.icon_key == Some("bathtub")));
    }

    #[test]
    fn test_room_only_board_is_not_a_tag() {
        assert!(derive_feature_tags(&offer()).is_empty());
    }

    #[test]
    fn test_format_price() {
        assert_eq!(format_price(1234567.0, Some("INR")), "₹12,34,567");
        assert_eq!(format_price(999.5, None), "₹999.5");
        assert_eq!(format_price(250.25, Some("USD")), "$250.25");
        assert_eq!(format_price(12.0, Some("CHF")), "CHF 12");
    }

    #[test]
    fn test_cancellation_policy_text() {
        let now = Utc.with_ymd_and_hms(2025, 2, 1, 0, 0, 0).unwrap();
        let mut o = offer();
        assert_eq!(cancellation_policy_text(&o, now), "Policy not specified");

        o.policies = Policies {
            cancellation_refund: None,
            payment_type: None,
            cancellations: vec![CancellationPolicy {
                policy_type: Some("CANCELLATION".to_string()),
                deadline: Some("2025-02-27T23:59:00+05:30".to_string()),
                amount: None,
            }],
        };
        assert_eq!(
            cancellation_policy_text(&o, now),
            "Free cancellation until 27 Feb 2025"
        );

        let later = Utc.with_ymd_and_hms(2025, 3, 1, 0, 0, 0).unwrap();
        assert_eq!(
            cancellation_policy_text(&o, later),
            "Cancellation possible (fees may apply)"
        );

        o.policies.cancellation_refund = Some(NON_REFUNDABLE.to_string());
        assert_eq!(cancellation_policy_text(&o, now), "Non-Refundable");

        o.policies.cancellations[0].policy_type = Some("NO_CANCELLATION".to_string());
        assert_eq!(cancellation_policy_text(&o, now), "No Cancellation Allowed");
    }

    #[test]
    fn test_image_index_is_stable_and_in_range() {
        let first = hotel_image_index("MCGOIHIL", 4);
        assert_eq!(first, hotel_image_index("MCGOIHIL", 4));
        assert!(first < 4);
        assert_eq!(hotel_image_index("anything", 0), 0);
    }
}
