//! Products Demo
//!
//! Pages through the `Products` entity set of a public OData V4 service
//! with a paginated data source and prints each page.
//!
//! ## Usage
//!
//! ```bash
//! cargo run -p products-demo
//! ```
//!
//! Settings are read from the environment (or a `.env` file):
//!
//! - `ODATA_RESOURCE_URL` (default: the public `OData.svc/Products` service)
//! - `ODATA_PAGE_SIZE` (default: 4)
//! - `ODATA_INITIAL_SORT` (default: `Rating desc,Name`)
//! - `ODATA_PAGES` (default: 3)
//! - `RUST_LOG` to see request and fetch logs, e.g. `odata_source_runtime=debug`

mod config;

use config::DemoConfig;
use odata_source_core::pagination::{PaginationSource, Paginator};
use odata_source_http::ODataHttpClient;
use odata_source_runtime::{DataSource, DataSourceConfig};
use serde::Deserialize;
use std::sync::Arc;
use std::time::Duration;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct Product {
    #[serde(rename = "ID")]
    id: u32,
    name: String,
    rating: u8,
    price: f64,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let _ = dotenvy::dotenv();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "products_demo=info,odata_source_runtime=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_target(false))
        .init();

    let config = DemoConfig::from_env()?;
    info!(url = %config.resource_url, page_size = config.page_size, "Starting products demo");

    let client = ODataHttpClient::builder()
        .timeout(Duration::from_secs(15))
        .user_agent(concat!("products-demo/", env!("CARGO_PKG_VERSION")))
        .build()?;

    let paginator = Arc::new(Paginator::new(config.page_size)?);
    let source: DataSource<Product> = DataSource::new(
        Arc::new(client),
        config.resource_url.clone(),
        DataSourceConfig::default().with_initial_sort(config.initial_sort.clone()),
    );
    source.set_paginator(Some(paginator.clone()));

    let mut connection = source.attach();
    for page in 0..config.pages {
        if page > 0 {
            paginator.set_page_index(page);
        }

        let Some(rows) = connection.next_rows().await else {
            break;
        };

        if let Some(error) = source.errors().borrow().clone() {
            eprintln!("Page {} failed: {error}", page + 1);
            break;
        }

        println!(
            "\n=== Page {} of {} ({} products) ===",
            page + 1,
            paginator.page_count(),
            paginator.total_count()
        );
        for product in rows.iter() {
            println!(
                "{:>4}  {:<24} rating {}  ${:.2}",
                product.id, product.name, product.rating, product.price
            );
        }

        if u64::from(page + 1) >= paginator.page_count() {
            break;
        }
    }

    connection.detach();
    Ok(())
}
