#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! CLI entry point for the rental listing ingestion tool.

use std::path::PathBuf;
use std::time::Instant;

use clap::{Parser, Subcommand};
use rental_sync_geocoder::Geocoder;
use rental_sync_geocoder::nominatim::NominatimGeocoder;
use rental_sync_ingest::progress_bar::ImportProgressBar;
use rental_sync_ingest::{ImportOptions, import_csv, sync_from_api};
use rental_sync_models::ImportResult;
use rental_sync_source::api::{ListingsApiClient, ListingsQuery};
use rental_sync_source::csv;
use rental_sync_store::{JsonFileStore, ListingStore};

#[derive(Parser)]
#[command(name = "rental_sync_ingest", about = "Rental listing ingestion tool")]
struct Cli {
    /// Path to the JSON listing store.
    #[arg(long, default_value = "rental-sync.json")]
    store: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Sync listings from the rental listings API for one market
    Sync {
        /// API base URL (e.g., "https://api.example.com/v1/listings")
        #[arg(long)]
        base_url: String,
        /// API key sent as the `X-Api-Key` header
        #[arg(long)]
        api_key: Option<String>,
        /// City to search in
        #[arg(long)]
        city: String,
        /// Two-letter state abbreviation
        #[arg(long)]
        state: String,
        /// Property type filter (e.g., "Apartment")
        #[arg(long)]
        property_type: Option<String>,
        /// Maximum number of listings to fetch (for testing)
        #[arg(long)]
        limit: Option<u64>,
        /// Skip geocoding for properties without coordinates
        #[arg(long)]
        no_geocode: bool,
    },
    /// Import a CSV availability upload
    ImportCsv {
        /// Path to the CSV file
        file: PathBuf,
        /// Skip geocoding for properties without coordinates
        #[arg(long)]
        no_geocode: bool,
    },
    /// Print the CSV upload template to stdout
    Template,
    /// List stored properties with their floor plan and unit counts
    Properties,
}

fn build_geocoder(no_geocode: bool) -> Result<Option<Box<dyn Geocoder>>, Box<dyn std::error::Error>> {
    if no_geocode {
        return Ok(None);
    }
    Ok(Some(Box::new(NominatimGeocoder::new(
        rental_sync_geocoder::nominatim::DEFAULT_BASE_URL,
    )?)))
}

fn print_summary(result: &ImportResult) {
    println!("Properties created: {}", result.properties_created);
    println!("Properties skipped: {}", result.properties_skipped);
    println!("Floor plans created: {}", result.floor_plans_created);
    println!("Units created: {}", result.units_created);
    println!("Units skipped: {}", result.units_skipped);
    if result.geocoded > 0 || result.geocode_failed > 0 {
        println!(
            "Geocoded: {} ({} failed)",
            result.geocoded, result.geocode_failed
        );
    }
    if !result.errors.is_empty() {
        println!("Errors: {}", result.errors.len());
        for error in &result.errors {
            log::warn!("{}: {}", error.context, error.message);
        }
    }
    if !result.success {
        println!("Import was cancelled before completion");
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    pretty_env_logger::init();
    let cli = Cli::parse();

    match cli.command {
        Commands::Template => {
            print!("{}", csv::template());
        }
        Commands::Sync {
            base_url,
            api_key,
            city,
            state,
            property_type,
            limit,
            no_geocode,
        } => {
            let store = JsonFileStore::open(&cli.store).await?;
            let client = ListingsApiClient::new(&base_url, api_key.as_deref())?;
            let mut query = ListingsQuery::new(&city, &state);
            if let Some(property_type) = &property_type {
                query = query.with_property_type(property_type);
            }
            let geocoder = build_geocoder(no_geocode)?;
            let options = ImportOptions {
                limit,
                ..ImportOptions::default()
            };

            let start = Instant::now();
            let progress = ImportProgressBar::new();
            let result = sync_from_api(
                &store,
                geocoder.as_deref(),
                &client,
                &query,
                &options,
                &progress,
            )
            .await?;
            progress.finish();

            log::info!(
                "API sync for {city}, {state} complete in {:.1}s",
                start.elapsed().as_secs_f64()
            );
            print_summary(&result);
        }
        Commands::ImportCsv { file, no_geocode } => {
            let store = JsonFileStore::open(&cli.store).await?;
            let text = tokio::fs::read_to_string(&file).await?;
            let geocoder = build_geocoder(no_geocode)?;

            let start = Instant::now();
            let progress = ImportProgressBar::new();
            let result = import_csv(
                &store,
                geocoder.as_deref(),
                &text,
                &ImportOptions::default(),
                &progress,
            )
            .await?;
            progress.finish();

            log::info!(
                "CSV import of {} complete in {:.1}s",
                file.display(),
                start.elapsed().as_secs_f64()
            );
            print_summary(&result);
        }
        Commands::Properties => {
            let store = JsonFileStore::open(&cli.store).await?;
            let properties = store.list_properties().await?;
            let plans = store.list_floor_plans().await?;
            let units = store.list_units().await?;

            for property in &properties {
                let plan_count = plans
                    .iter()
                    .filter(|p| p.property_id == property.id)
                    .count();
                let unit_count = units
                    .iter()
                    .filter(|u| u.property_id == property.id)
                    .count();
                let rent = match (property.rent_min, property.rent_max) {
                    (Some(min), Some(max)) if (min - max).abs() > f64::EPSILON => {
                        format!("${min:.0}-${max:.0}")
                    }
                    (Some(min), _) => format!("${min:.0}"),
                    _ => "-".to_string(),
                };
                println!(
                    "{} | {} | {}, {} | {rent} | {plan_count} plans, {unit_count} units [{}]",
                    property.name, property.street_address, property.city, property.state,
                    property.source
                );
            }
            println!("{} properties total", properties.len());
        }
    }

    Ok(())
}
