//! Storefront CLI - browse the catalog, manage the cart, run admin actions.
//!
//! # Usage
//!
//! ```bash
//! # List the first page of products
//! sf products
//!
//! # Filter by category and price range
//! sf products --category cat-1 --min 10 --max 25.50 --page 2
//!
//! # Show one product
//! sf product doc-7
//!
//! # Log in, then delete a product
//! sf login -i admin@example.com -p secret
//! sf admin delete doc-7
//!
//! # Cart
//! sf cart add doc-7 --qty 2
//! sf cart show
//! ```
//!
//! # Environment Variables
//!
//! - `STOREFRONT_API_URL` - Backend base URL, e.g. `http://localhost:1337/api`
//! - `STOREFRONT_DATA_DIR` - Where the cart and token are stored
//! - `RUST_LOG` - Log filter (default `storefront_client=info,storefront_cli=info`)
//! - `STOREFRONT_LOG_JSON` - Set to `1` for JSON log lines

#![cfg_attr(not(test), forbid(unsafe_code))]

use clap::{Parser, Subcommand};
use rust_decimal::Decimal;
use storefront_client::{ClientConfig, Storefront};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod commands;

use commands::CliError;

#[derive(Parser)]
#[command(name = "sf")]
#[command(author, version, about = "Storefront CLI")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List products
    Products {
        /// Page number (1-indexed)
        #[arg(long, default_value_t = 1)]
        page: u32,

        /// Category document ID
        #[arg(long)]
        category: Option<String>,

        /// Minimum price
        #[arg(long)]
        min: Option<Decimal>,

        /// Maximum price
        #[arg(long)]
        max: Option<Decimal>,

        /// Case-insensitive title search
        #[arg(long)]
        search: Option<String>,

        /// Ordering (`price-asc`, `price-desc`, `title`, `newest`)
        #[arg(long)]
        sort: Option<String>,
    },
    /// Show one product
    Product {
        /// Product document ID
        document_id: String,
    },
    /// List categories
    Categories,
    /// Log in and store the session token
    Login {
        /// Username or email
        #[arg(short, long)]
        identifier: String,

        /// Password
        #[arg(short, long)]
        password: String,
    },
    /// Forget the stored session token
    Logout,
    /// Show the logged-in user
    Whoami,
    /// Manage the cart
    Cart {
        #[command(subcommand)]
        action: CartAction,
    },
    /// Admin product actions
    Admin {
        #[command(subcommand)]
        action: AdminAction,
    },
}

#[derive(Subcommand)]
enum CartAction {
    /// Show cart contents
    Show,
    /// Add a product
    Add {
        /// Product document ID
        document_id: String,

        /// Quantity to add
        #[arg(long, default_value_t = 1)]
        qty: u32,
    },
    /// Remove a product by numeric ID
    Remove {
        /// Product ID
        id: i32,
    },
    /// Set a product's quantity; 0 removes it
    Set {
        /// Product ID
        id: i32,

        /// New quantity
        qty: u32,
    },
    /// Empty the cart
    Clear,
}

#[derive(Subcommand)]
enum AdminAction {
    /// Delete a product
    Delete {
        /// Product document ID
        document_id: String,
    },
}

#[tokio::main]
async fn main() {
    // Logs go to stderr so command output on stdout stays pipeable
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "storefront_client=info,storefront_cli=info".into());
    let json = std::env::var("STOREFRONT_LOG_JSON").is_ok_and(|v| v == "1" || v == "true");

    let json_layer = json.then(|| {
        tracing_subscriber::fmt::layer()
            .json()
            .flatten_event(true)
            .with_writer(std::io::stderr)
    });
    let text_layer = (!json).then(|| tracing_subscriber::fmt::layer().with_writer(std::io::stderr));

    tracing_subscriber::registry()
        .with(env_filter)
        .with(json_layer)
        .with(text_layer)
        .init();

    let cli = Cli::parse();

    if let Err(e) = run(cli).await {
        tracing::error!("Command failed: {e}");
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> Result<(), CliError> {
    let config = ClientConfig::from_env()?;
    let app = Storefront::with_file_storage(config)?;

    match cli.command {
        Commands::Products {
            page,
            category,
            min,
            max,
            search,
            sort,
        } => {
            let filters = commands::catalog::ListFilters {
                page,
                category,
                min_price: min,
                max_price: max,
                search,
                sort,
            };
            commands::catalog::list_products(&app, filters).await?;
        }
        Commands::Product { document_id } => {
            commands::catalog::show_product(&app, &document_id).await?;
        }
        Commands::Categories => commands::catalog::list_categories(&app).await?,
        Commands::Login {
            identifier,
            password,
        } => commands::auth::login(&app, identifier, password).await?,
        Commands::Logout => commands::auth::logout(&app)?,
        Commands::Whoami => commands::auth::whoami(&app).await?,
        Commands::Cart { action } => match action {
            CartAction::Show => commands::cart::show(&app),
            CartAction::Add { document_id, qty } => {
                commands::cart::add(&app, &document_id, qty).await?;
            }
            CartAction::Remove { id } => commands::cart::remove(&app, id)?,
            CartAction::Set { id, qty } => commands::cart::set_quantity(&app, id, qty)?,
            CartAction::Clear => commands::cart::clear(&app)?,
        },
        Commands::Admin { action } => match action {
            AdminAction::Delete { document_id } => {
                commands::admin::delete_product(&app, &document_id).await?;
            }
        },
    }
    Ok(())
}
