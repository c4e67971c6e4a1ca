use anyhow::{bail, Context, Result};
use chrono::{Local, NaiveDate};
use clap::{Parser, Subcommand};
use std::env;
use std::sync::Arc;
use tracing::{info, warn};

use hotel_booking::logging::init_logging;
use hotel_booking::offer::{
    cancellation_policy_text, compute_per_night, derive_feature_tags, derive_refundability,
    format_price, hotel_image_index, primary_offer,
};
use hotel_booking::{
    list_user_bookings, BoardType, ClientConfig, DateContext, DetailOutcome, DetailResolver,
    FilterCriteria, HotelSummary, HttpHotelApi, InMemoryCache, SearchForm, SearchOrchestrator,
    SearchSession, SearchState, StaticToken,
};

#[derive(Parser)]
#[command(name = "hotel-booking")]
#[command(about = "Search hotels, inspect offers and list bookings")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Search a city and print the (filtered) results
    Search {
        city: String,
        /// Check-in date, YYYY-MM-DD
        #[arg(long)]
        check_in: NaiveDate,
        /// Check-out date, YYYY-MM-DD
        #[arg(long)]
        check_out: NaiveDate,
        #[arg(long, default_value_t = 1)]
        adults: u32,
        #[arg(long, default_value_t = 0)]
        children: u32,
        /// Price bracket key, e.g. under1000, 1k-2k, above5k
        #[arg(long)]
        price_range: Option<String>,
        /// Board type, e.g. BREAKFAST or ROOM_ONLY
        #[arg(long)]
        board: Option<String>,
        /// Bed type, e.g. KING or TWIN
        #[arg(long)]
        bed: Option<String>,
        #[arg(long)]
        refundable: bool,
    },
    /// Print the featured hotels of the configured cities
    Featured,
    /// Show every offer of one hotel
    Details {
        hotel_id: String,
        #[arg(long)]
        check_in: Option<NaiveDate>,
        #[arg(long)]
        check_out: Option<NaiveDate>,
        #[arg(long)]
        adults: Option<u32>,
        #[arg(long)]
        children: Option<u32>,
    },
    /// List the bookings of a user
    Bookings {
        #[arg(long)]
        user_id: Option<String>,
    },
}

fn print_hotel(hotel: &HotelSummary, nights: i64, image_index: usize) {
    let offer = match primary_offer(hotel) {
        Some(offer) => offer,
        None => {
            println!("{} ({}) - no offers", hotel.name, hotel.hotel_id);
            return;
        }
    };

    let currency = offer.price.as_ref().and_then(|p| p.currency.as_deref());
    let total = offer.price.as_ref().map(|p| p.total);
    let price = match (total, compute_per_night(total, nights)) {
        (Some(total), Some(per_night)) => format!(
            "{} total, {} / night",
            format_price(total, currency),
            format_price(per_night, currency)
        ),
        (Some(total), None) => format!("{} total", format_price(total, currency)),
        _ => "price unavailable".to_string(),
    };

    let board = offer
        .board_type
        .as_ref()
        .map(BoardType::to_string)
        .unwrap_or_else(|| "-".to_string());
    let refund = if derive_refundability(offer) { "refundable" } else { "non-refundable" };

    println!("{} ({}) [image {}]", hotel.name, hotel.hotel_id, image_index);
    if let Some(address) = &hotel.address {
        println!("  {}", address);
    }
    println!("  {} | {} | {}", price, board, refund);

    let tags: Vec<String> = derive_feature_tags(offer).into_iter().map(|t| t.label).collect();
    if !tags.is_empty() {
        println!("  {}", tags.join(", "));
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    init_logging();

    let cli = Cli::parse();
    let config = ClientConfig::from_env();
    let token = StaticToken(env::var("HOTEL_API_TOKEN").ok());
    let api = Arc::new(
        HttpHotelApi::new(&config, Arc::new(token)).context("building HTTP client")?,
    );
    let today = Local::now().date_naive();

    match cli.command {
        Commands::Search {
            city,
            check_in,
            check_out,
            adults,
            children,
            price_range,
            board,
            bed,
            refundable,
        } => {
            let query = SearchForm {
                city_name: city,
                check_in_date: Some(check_in),
                check_out_date: Some(check_out),
                adults,
                children,
            }
            .build()?;

            let pool_size = config.image_pool_size;
            let orchestrator =
                SearchOrchestrator::new(api.clone(), Arc::new(InMemoryCache::new()), config);
            let mut session = SearchSession::new();
            let mut criteria = FilterCriteria {
                board_type: board.as_deref().map(BoardType::from),
                bed_type: bed,
                refundable_only: refundable,
                ..FilterCriteria::default()
            };
            if let Some(key) = price_range {
                criteria = criteria.with_price_range(&key);
            }
            session.set_criteria(criteria);

            let ticket = session.begin();
            let result = orchestrator.search(&query).await;
            session.complete(ticket, result);

            match session.state() {
                SearchState::Failed(e) => bail!("Search failed: {}", e),
                SearchState::Empty => println!("No hotels found in {}", query.city_name),
                _ => {
                    info!(
                        "{} of {} hotels match the filters",
                        session.filtered().len(),
                        session.hotels().len()
                    );
                    for hotel in session.filtered() {
                        let image_index = hotel_image_index(&hotel.hotel_id, pool_size);
                        print_hotel(hotel, query.nights(), image_index);
                    }
                }
            }
        }
        Commands::Featured => {
            let cities = config.featured_cities.clone();
            let orchestrator =
                SearchOrchestrator::new(api.clone(), Arc::new(InMemoryCache::new()), config);
            let featured = orchestrator.get_or_fetch_featured(&cities).await;
            if featured.is_empty() {
                warn!("No featured hotels available");
            }
            for entry in &featured {
                println!("[{}]", entry.source_city);
                print_hotel(&entry.hotel, 1, entry.image_index);
            }
        }
        Commands::Details {
            hotel_id,
            check_in,
            check_out,
            adults,
            children,
        } => {
            let context = if check_in.is_none() && check_out.is_none() {
                DateContext::fallback(today)
            } else {
                DateContext {
                    check_in_date: check_in,
                    check_out_date: check_out,
                    adults,
                    children,
                }
            };

            let resolver = DetailResolver::new(api.clone());
            match resolver.resolve_details(&hotel_id, &context, None).await? {
                DetailOutcome::NoOffers => println!("No offers available for {}", hotel_id),
                DetailOutcome::Found(hotel) => {
                    let nights = context.nights().unwrap_or(1);
                    println!("{} ({})", hotel.name, hotel.hotel_id);
                    let now = chrono::Utc::now();
                    for offer in hotel.all_offers() {
                        let currency = offer.price.as_ref().and_then(|p| p.currency.as_deref());
                        let total = offer.price.as_ref().map(|p| p.total);
                        let price = total
                            .map(|t| format_price(t, currency))
                            .unwrap_or_else(|| "price unavailable".to_string());
                        let per_night = compute_per_night(total, nights)
                            .map(|p| format!(" ({} / night)", format_price(p, currency)))
                            .unwrap_or_default();
                        println!(
                            "  {}: {}{} - {}",
                            offer.id,
                            price,
                            per_night,
                            cancellation_policy_text(offer, now)
                        );
                    }
                }
            }
        }
        Commands::Bookings { user_id } => {
            let records = list_user_bookings(api.as_ref(), user_id.as_deref()).await?;
            if records.is_empty() {
                println!("No bookings yet");
            }
            for record in records {
                let total = record
                    .total
                    .map(|t| format_price(t, record.currency.as_deref()))
                    .unwrap_or_else(|| "-".to_string());
                println!(
                    "{} | {} | {} | {}",
                    record.id,
                    record.hotel_name.as_deref().unwrap_or("Hotel"),
                    record.status,
                    total
                );
            }
        }
    }

    Ok(())
}
