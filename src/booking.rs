// Booking draft: guest and payment capture, local validation, and the
// revalidate-then-commit submission against the backend.

use chrono::{Datelike, NaiveDate};
use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;
use std::sync::OnceLock;
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::client::{ApiError, HotelApi};
use crate::models::{BookingRecord, Guest, HotelSummary, Offer};
use crate::offer::extract_primary_offer;
use crate::validation::{FieldError, ValidationErrors, ValidationResult};

pub const OFFER_UNAVAILABLE: &str = "Offer validation failed. It might be expired or unavailable.";
pub const UNKNOWN_BOOKING_FAILURE: &str = "Booking failed for an unknown reason.";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum BookingStatus {
    Draft,
    Validating,
    Submitted,
    Confirmed,
    Failed,
}

impl fmt::Display for BookingStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            BookingStatus::Draft => "DRAFT",
            BookingStatus::Validating => "VALIDATING",
            BookingStatus::Submitted => "SUBMITTED",
            BookingStatus::Confirmed => "CONFIRMED",
            BookingStatus::Failed => "FAILED",
        };
        f.write_str(s)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum CardVendor {
    #[default]
    Visa,
    Mastercard,
    Amex,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CardDetails {
    pub vendor_code: CardVendor,
    pub card_number: String,
    // YYYY-MM
    pub expiry_date: String,
    pub holder_name: String,
}

// Dummy payment data; nothing is charged
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentPlaceholder {
    pub method: String,
    pub card: CardDetails,
}

impl Default for PaymentPlaceholder {
    fn default() -> Self {
        Self {
            method: "CREDIT_CARD".to_string(),
            card: CardDetails::default(),
        }
    }
}

// Body of POST /book
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BookingRequest {
    pub user_id: Option<String>,
    pub offer_id: String,
    pub guests: Vec<Guest>,
    pub payment_info: PaymentPlaceholder,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HotelRef {
    pub hotel_id: String,
    pub name: String,
}

#[derive(Error, Debug, Clone, PartialEq)]
pub enum BookingError {
    #[error("{0}")]
    Validation(ValidationErrors),

    #[error("Cannot {action} a booking in {status} state")]
    InvalidState {
        status: BookingStatus,
        action: &'static str,
    },

    #[error("No guest at position {0}")]
    UnknownGuest(usize),

    #[error("{}", OFFER_UNAVAILABLE)]
    OfferUnavailable,

    #[error("{0}")]
    Rejected(String),

    #[error(transparent)]
    Request(#[from] ApiError),

    #[error("Sign in to see your bookings")]
    NotSignedIn,
}

impl BookingError {
    // Text kept on the draft and shown to the user
    pub fn user_message(&self) -> String {
        match self {
            BookingError::Request(e) => e.message().to_string(),
            other => other.to_string(),
        }
    }
}

// What the confirmation screen shows once the backend accepted the booking
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Confirmation {
    pub booking_id: Option<String>,
    pub hotel: HotelRef,
    pub offer: Offer,
    pub guests: Vec<Guest>,
    pub card_vendor: CardVendor,
    pub masked_card: String,
    pub booking: Option<Value>,
}

#[derive(Debug, Clone)]
pub struct BookingDraft {
    hotel: HotelRef,
    offer: Offer,
    guests: Vec<Guest>,
    payment: PaymentPlaceholder,
    status: BookingStatus,
    last_error: Option<String>,
}

impl BookingDraft {
    // One blank guest per adult, never fewer than one
    pub fn new(hotel: &HotelSummary, offer: Offer, adults: u32) -> Self {
        let count = adults.max(1) as usize;
        Self {
            hotel: HotelRef {
                hotel_id: hotel.hotel_id.clone(),
                name: hotel.name.clone(),
            },
            offer,
            guests: vec![Guest::default(); count],
            payment: PaymentPlaceholder::default(),
            status: BookingStatus::Draft,
            last_error: None,
        }
    }

    pub fn for_primary_offer(hotel: &HotelSummary, adults: u32) -> Option<Self> {
        extract_primary_offer(hotel).map(|offer| Self::new(hotel, offer, adults))
    }

    pub fn hotel(&self) -> &HotelRef {
        &self.hotel
    }

    pub fn offer(&self) -> &Offer {
        &self.offer
    }

    pub fn guests(&self) -> &[Guest] {
        &self.guests
    }

    pub fn payment(&self) -> &PaymentPlaceholder {
        &self.payment
    }

    pub fn status(&self) -> BookingStatus {
        self.status
    }

    pub fn last_error(&self) -> Option<&str> {
        self.last_error.as_deref()
    }

    fn ensure(&self, expected: BookingStatus, action: &'static str) -> Result<(), BookingError> {
        if self.status == expected {
            Ok(())
        } else {
            Err(BookingError::InvalidState {
                status: self.status,
                action,
            })
        }
    }

    pub fn update_guest(
        &mut self,
        index: usize,
        edit: impl FnOnce(&mut Guest),
    ) -> Result<(), BookingError> {
        self.ensure(BookingStatus::Draft, "edit")?;
        let guest = self
            .guests
            .get_mut(index)
            .ok_or(BookingError::UnknownGuest(index))?;
        edit(guest);
        Ok(())
    }

    pub fn update_payment(
        &mut self,
        edit: impl FnOnce(&mut CardDetails),
    ) -> Result<(), BookingError> {
        self.ensure(BookingStatus::Draft, "edit")?;
        edit(&mut self.payment.card);
        Ok(())
    }

    pub fn validate(&self, today: NaiveDate) -> ValidationResult {
        let mut errors = ValidationErrors::default();

        for (i, guest) in self.guests.iter().enumerate() {
            if guest.first_name.trim().is_empty() {
                errors.push(FieldError::new(
                    format!("guest-{}-firstName", i),
                    "First name is required",
                ));
            }
            if guest.last_name.trim().is_empty() {
                errors.push(FieldError::new(
                    format!("guest-{}-lastName", i),
                    "Last name is required",
                ));
            }
            if guest.phone.trim().is_empty() {
                errors.push(FieldError::new(
                    format!("guest-{}-phone", i),
                    "Phone is required",
                ));
            }
            if guest.email.trim().is_empty() || !email_pattern().is_match(&guest.email) {
                errors.push(FieldError::new(
                    format!("guest-{}-email", i),
                    "Valid email is required",
                ));
            }
        }

        let card = &self.payment.card;
        if card.card_number.trim().is_empty() {
            errors.push(FieldError::new("payment-cardNumber", "Card number is required"));
        } else if !card_pattern().is_match(&card.card_number) {
            errors.push(FieldError::new("payment-cardNumber", "Card number must be 16 digits"));
        }

        if card.expiry_date.trim().is_empty() {
            errors.push(FieldError::new(
                "payment-expiryDate",
                "Expiry date is required (YYYY-MM)",
            ));
        } else if !expiry_is_current(&card.expiry_date, today) {
            errors.push(FieldError::new(
                "payment-expiryDate",
                "Invalid or past expiry date (YYYY-MM)",
            ));
        }

        if card.holder_name.trim().is_empty() {
            errors.push(FieldError::new("payment-holderName", "Cardholder name is required"));
        }

        errors.into_result()
    }

    pub fn request(&self, user_id: Option<String>) -> BookingRequest {
        BookingRequest {
            user_id,
            offer_id: self.offer.id.clone(),
            guests: self.guests.clone(),
            payment_info: self.payment.clone(),
        }
    }

    // Invalid input returns the draft to DRAFT without a call. Otherwise the offer is
    // re-checked and only committed while still available; any later failure ends in
    // FAILED with the user-facing message stored.
    pub async fn submit<A: HotelApi>(
        &mut self,
        api: &A,
        user_id: Option<String>,
        today: NaiveDate,
    ) -> Result<Confirmation, BookingError> {
        self.ensure(BookingStatus::Draft, "submit")?;

        self.status = BookingStatus::Validating;
        if let Err(errors) = self.validate(today) {
            debug!("Booking draft for {} has {} invalid fields", self.hotel.hotel_id, errors.len());
            self.status = BookingStatus::Draft;
            self.last_error = Some(errors.to_string());
            return Err(BookingError::Validation(errors));
        }

        self.status = BookingStatus::Submitted;
        self.last_error = None;
        let request = self.request(user_id);

        match api.check_offer(&self.offer.id).await {
            Ok(check) if check.is_success() => {}
            Ok(_) => return Err(self.fail(BookingError::OfferUnavailable)),
            Err(e) => return Err(self.fail(BookingError::Request(e))),
        }

        let reply = match api.book(&request).await {
            Ok(reply) => reply,
            Err(e) => return Err(self.fail(BookingError::Request(e))),
        };
        if !reply.is_success() {
            let message = reply
                .message
                .filter(|m| !m.trim().is_empty())
                .unwrap_or_else(|| UNKNOWN_BOOKING_FAILURE.to_string());
            return Err(self.fail(BookingError::Rejected(message)));
        }

        self.status = BookingStatus::Confirmed;
        info!("Booking confirmed for offer {}", self.offer.id);

        let booking_id = reply.booking.as_ref().and_then(|b| {
            b.get("id")
                .or_else(|| b.get("_id"))
                .and_then(Value::as_str)
                .map(str::to_string)
        });

        Ok(Confirmation {
            booking_id,
            hotel: self.hotel.clone(),
            offer: self.offer.clone(),
            guests: self.guests.clone(),
            card_vendor: self.payment.card.vendor_code,
            masked_card: mask_card(&self.payment.card.card_number),
            booking: reply.booking,
        })
    }

    // Back to an editable draft with every input kept
    pub fn retry(&mut self) -> Result<(), BookingError> {
        self.ensure(BookingStatus::Failed, "retry")?;
        self.status = BookingStatus::Draft;
        Ok(())
    }

    fn fail(&mut self, error: BookingError) -> BookingError {
        warn!("Booking for offer {} failed: {}", self.offer.id, error);
        self.status = BookingStatus::Failed;
        self.last_error = Some(error.user_message());
        error
    }
}

fn email_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"\S+@\S+\.\S+").expect("static regex"))
}

fn card_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"^\d{16}$").expect("static regex"))
}

// YYYY-MM with a real month, not earlier than the current month
pub fn expiry_is_current(expiry: &str, today: NaiveDate) -> bool {
    let mut parts = expiry.trim().splitn(2, '-');
    let year = parts.next().and_then(|y| y.parse::<i32>().ok());
    let month = parts.next().and_then(|m| m.parse::<u32>().ok());

    match (year, month) {
        (Some(year), Some(month)) if (1..=12).contains(&month) => {
            (year, month) >= (today.year(), today.month())
        }
        _ => false,
    }
}

pub fn mask_card(card_number: &str) -> String {
    let digits: Vec<char> = card_number.chars().filter(char::is_ascii_digit).collect();
    let last_four: String = digits[digits.len().saturating_sub(4)..].iter().collect();
    format!("**** **** **** {}", last_four)
}

pub async fn list_user_bookings<A: HotelApi>(
    api: &A,
    user_id: Option<&str>,
) -> Result<Vec<BookingRecord>, BookingError> {
    let user_id = match user_id.map(str::trim).filter(|id| !id.is_empty()) {
        Some(id) => id,
        None => return Err(BookingError::NotSignedIn),
    };

    let records = api.user_bookings(user_id).await?;
    debug!("User {} has {} bookings", user_id, records.len());
    Ok(records)
}
