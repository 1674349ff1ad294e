//! Catalog Admin
//!
//! Operator CLI over the catalog core. Every command goes through the same
//! repositories as the service, so locks are honored and caches invalidated.

use clap::{Parser, Subcommand};
use core_config::tracing::{init_tracing, install_color_eyre};
use core_config::{Environment, FromEnv};
use domain_catalog::{
    CacheStore, Catalog, CatalogConfig, Category, InMemoryQueryEngine, Lookup, NewCategory,
    NewProduct, Product, ProductFilter, ProductQuery, ProductSort,
};
use eyre::{Result, WrapErr, eyre};
use serde_json::json;
use tracing::info;
use uuid::Uuid;

mod stock_spec;

#[derive(Parser)]
#[command(name = "catalog-admin")]
#[command(about = "Inspect and maintain the product catalog")]
struct Cli {
    /// Print Prometheus metrics to stderr after the command
    #[arg(long, global = true)]
    print_metrics: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Show one product
    Product { id: Uuid },

    /// Show one category
    Category { id: Uuid },

    /// List products with filters, sorting and pagination
    Products {
        /// Case-insensitive name substring
        #[arg(long)]
        name: Option<String>,

        /// Exact category label
        #[arg(long)]
        category: Option<String>,

        /// Inclusive lower price bound in cents (0 = unbounded)
        #[arg(long, default_value_t = 0)]
        min_price: i64,

        /// Inclusive upper price bound in cents (0 = unbounded)
        #[arg(long, default_value_t = 0)]
        max_price: i64,

        /// Sort field: name or price
        #[arg(long)]
        sort: Option<String>,

        /// Sort order: asc or desc
        #[arg(long, default_value = "asc")]
        order: String,

        #[arg(long, default_value_t = 1)]
        page: i64,

        /// Page size (0 = everything)
        #[arg(long, default_value_t = 10)]
        limit: i64,
    },

    /// List categories
    Categories,

    /// Create a product
    CreateProduct {
        #[arg(long)]
        name: String,
        /// Price in cents
        #[arg(long)]
        price: i64,
        #[arg(long, default_value_t = 0)]
        stock: i64,
        #[arg(long, default_value = "")]
        category: String,
        #[arg(long, default_value = "")]
        description: String,
        #[arg(long, default_value = "")]
        image_url: String,
    },

    /// Change fields of an existing product
    UpdateProduct {
        id: Uuid,
        #[arg(long)]
        name: Option<String>,
        #[arg(long)]
        price: Option<i64>,
        #[arg(long)]
        category: Option<String>,
        #[arg(long)]
        description: Option<String>,
        #[arg(long)]
        image_url: Option<String>,
    },

    /// Delete a product
    DeleteProduct { id: Uuid },

    /// Create a category
    CreateCategory {
        #[arg(long)]
        name: String,
        #[arg(long, default_value = "")]
        description: String,
    },

    /// Change fields of an existing category
    UpdateCategory {
        id: Uuid,
        #[arg(long)]
        name: Option<String>,
        #[arg(long)]
        description: Option<String>,
    },

    /// Delete a category
    DeleteCategory { id: Uuid },

    /// Apply stock deltas, e.g. `adjust-stock <id>=+3 <id>=-5`
    AdjustStock {
        #[arg(required = true)]
        adjustments: Vec<String>,
    },

    /// Delete cache keys, e.g. `invalidate products:all`
    Invalidate {
        #[arg(required = true)]
        keys: Vec<String>,
    },

    /// Probe Redis and MongoDB
    Health,
}

#[tokio::main]
async fn main() -> Result<()> {
    install_color_eyre();

    let environment = Environment::from_env();
    init_tracing(&environment);

    let cli = Cli::parse();
    if cli.print_metrics {
        observability::init_metrics()?;
    }

    let config = CatalogConfig::from_env()?;

    info!("Connecting to Redis and MongoDB...");
    let catalog = Catalog::connect(&config)
        .await
        .wrap_err("Catalog backends unavailable")?;

    run(&catalog, cli.command).await?;

    if cli.print_metrics {
        eprintln!("{}", observability::render_metrics());
    }
    Ok(())
}

async fn run(catalog: &Catalog, command: Commands) -> Result<()> {
    match command {
        Commands::Product { id } => {
            let product = found(catalog.products.find_by_id(id).await?, "product", id)?;
            print_json(&product)?;
        }

        Commands::Category { id } => {
            let category = found(catalog.categories.find_by_id(id).await?, "category", id)?;
            print_json(&category)?;
        }

        Commands::Products {
            name,
            category,
            min_price,
            max_price,
            sort,
            order,
            page,
            limit,
        } => {
            let query = ProductQuery::default()
                .with_filter(ProductFilter {
                    name,
                    category,
                    min_price,
                    max_price,
                })
                .with_sort(sort.and_then(|field| ProductSort::parse(&field, &order)))
                .with_page(page, limit);

            let page = catalog.products.query(&InMemoryQueryEngine, &query).await?;
            print_json(&json!({
                "products": page.items,
                "total": page.total,
                "page": page.page,
                "limit": page.page_size,
                "total_pages": page.total_pages(),
            }))?;
        }

        Commands::Categories => {
            let categories: Vec<Category> = catalog.categories.find_all().await?;
            print_json(&categories)?;
        }

        Commands::CreateProduct {
            name,
            price,
            stock,
            category,
            description,
            image_url,
        } => {
            if price < 0 || stock < 0 {
                return Err(eyre!("price and stock must not be negative"));
            }
            let product = Product::new(NewProduct {
                name,
                description,
                price,
                stock,
                image_url,
                category,
            });
            catalog.products.create(&product).await?;
            print_json(&product)?;
        }

        Commands::UpdateProduct {
            id,
            name,
            price,
            category,
            description,
            image_url,
        } => {
            let mut product = found(catalog.products.find_by_id(id).await?, "product", id)?;
            if let Some(name) = name {
                product.name = name;
            }
            if let Some(price) = price {
                if price < 0 {
                    return Err(eyre!("price must not be negative"));
                }
                product.price = price;
            }
            if let Some(category) = category {
                product.category = category;
            }
            if let Some(description) = description {
                product.description = description;
            }
            if let Some(image_url) = image_url {
                product.image_url = image_url;
            }
            catalog.products.update(&product).await?;
            print_json(&product)?;
        }

        Commands::DeleteProduct { id } => {
            catalog.products.delete(id).await?;
            info!(%id, "Product deleted");
        }

        Commands::CreateCategory { name, description } => {
            let category = Category::new(NewCategory { name, description });
            catalog.categories.create(&category).await?;
            print_json(&category)?;
        }

        Commands::UpdateCategory {
            id,
            name,
            description,
        } => {
            let mut category = found(catalog.categories.find_by_id(id).await?, "category", id)?;
            if let Some(name) = name {
                category.name = name;
            }
            if let Some(description) = description {
                category.description = description;
            }
            catalog.categories.update(&category).await?;
            print_json(&category)?;
        }

        Commands::DeleteCategory { id } => {
            catalog.categories.delete(id).await?;
            info!(%id, "Category deleted");
        }

        Commands::AdjustStock { adjustments } => {
            let updates = stock_spec::parse_adjustments(&adjustments)?;
            catalog.stock.bulk_adjust(&updates).await?;
            info!(count = updates.len(), "Stock adjusted");
        }

        Commands::Invalidate { keys } => {
            let cache: &dyn CacheStore = catalog.cache();
            for key in &keys {
                cache
                    .delete(key)
                    .await
                    .wrap_err_with(|| format!("failed to delete cache key '{key}'"))?;
                info!(key, "Cache key deleted");
            }
        }

        Commands::Health => {
            let health = catalog.health().await;
            print_json(&json!({
                "healthy": health.is_healthy(),
                "redis": {
                    "healthy": health.cache.healthy,
                    "message": health.cache.message,
                    "response_time_ms": health.cache.response_time_ms,
                },
                "mongodb": {
                    "healthy": health.store.healthy,
                    "message": health.store.message,
                    "response_time_ms": health.store.response_time_ms,
                },
            }))?;
            if !health.is_healthy() {
                return Err(eyre!("catalog backends unhealthy"));
            }
        }
    }

    Ok(())
}

fn found<T>(lookup: Lookup<T>, kind: &str, id: Uuid) -> Result<T> {
    lookup
        .into_option()
        .ok_or_else(|| eyre!("{kind} {id} not found"))
}

fn print_json<T: serde::Serialize + ?Sized>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
