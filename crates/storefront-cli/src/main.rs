// ============================================================================
// storefront — terminal front end for the storefront core
// ============================================================================
// Usage:
//   storefront browse [--category C] [--scrolls N]   List products
//                     [--limit N] [--remote]
//   storefront categories                            List categories
//   storefront show <ID>                             Product detail
//   storefront add <ID> | buy <ID>                   Add to cart / buy now
//   storefront cart                                  Cart page
//   storefront inc|dec|remove <ID>                   Edit a cart line
//   storefront clear --yes | checkout                Empty cart / demo order
//   storefront login <USER> --password P             Simulated sign-in
//   storefront logout | whoami                       Session
//   storefront export                                Dump persisted state as JSON
// ============================================================================

use anyhow::{Context, Result};
use chrono::{Local, Utc};
use clap::{Parser, Subcommand};
use std::sync::Arc;
use storefront_core::{
    format_price, open_storage, AddOutcome, CartPage, CartStore, CartView, CatalogClient,
    CatalogView, CatalogViewController, CategoryFilter, DetailState, HeaderSummary,
    LoginController, NavIntent, ProductDetailController, ProductId, ScopedCatalog, ScrollNotifier,
    SessionStore, StorefrontConfig, StorefrontDb, SystemClock,
};
use tracing::info;

/// Storefront command-line client
#[derive(Parser)]
#[command(name = "storefront", version, about = "Browse the catalog and manage your cart")]
struct Cli {
    /// Path to the database file (default: ~/.storefront/storefront.redb)
    #[arg(long, global = true)]
    db_path: Option<String>,

    /// Catalog service base URL (default: https://fakestoreapi.com)
    #[arg(long, global = true)]
    api_base: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List products, a page at a time
    Browse {
        /// Category to filter by ("all" for everything)
        #[arg(long, default_value = "all")]
        category: String,

        /// How many times to scroll to the end of the list
        #[arg(long, default_value = "0")]
        scrolls: u32,

        /// Fetch at most this many products from the service
        #[arg(long)]
        limit: Option<u32>,

        /// Ask the service for the category instead of filtering locally
        #[arg(long)]
        remote: bool,
    },

    /// List product categories
    Categories,

    /// Show one product
    Show { id: ProductId },

    /// Add a product to the cart (requires login)
    Add { id: ProductId },

    /// Add a product and go to the cart (requires login)
    Buy { id: ProductId },

    /// Show the cart
    Cart,

    /// Increase a line's quantity by one
    Inc { id: ProductId },

    /// Decrease a line's quantity by one (not below 1)
    Dec { id: ProductId },

    /// Remove a line from the cart
    Remove { id: ProductId },

    /// Empty the cart
    Clear {
        /// Confirm clearing the cart
        #[arg(long)]
        yes: bool,
    },

    /// Place a demo order
    Checkout,

    /// Sign in (any username, password of at least 6 characters)
    Login {
        username: String,

        #[arg(long)]
        password: String,

        /// Page to return to after signing in, e.g. /cart
        #[arg(long)]
        redirect: Option<String>,
    },

    /// Sign out
    Logout,

    /// Show who is signed in and the cart badge
    Whoami,

    /// Export persisted state as JSON
    Export,
}

/// Opened stores shared by the commands
struct App {
    config: StorefrontConfig,
    /// None when running on in-memory storage
    db: Option<Arc<StorefrontDb>>,
    session: SessionStore,
    cart: CartStore,
}

impl App {
    /// Open the database; if that fails, keep going on in-memory storage so
    /// browsing still works
    fn open(config: StorefrontConfig) -> Self {
        let (db, storage) = open_storage(config.db_path.as_deref());
        Self {
            session: SessionStore::load(storage.clone()),
            cart: CartStore::load(storage),
            config,
            db,
        }
    }

    fn catalog(&self) -> Result<CatalogClient> {
        CatalogClient::from_config(&self.config).context("Failed to create catalog client")
    }
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    // Load environment variables from .env file
    let _ = dotenvy::dotenv();

    // Initialize logging
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("storefront_core=info".parse()?)
                .add_directive("storefront=info".parse()?),
        )
        .init();

    let cli = Cli::parse();
    let config = StorefrontConfig::default()
        .with_api_base(cli.api_base)
        .with_db_path(cli.db_path);
    let mut app = App::open(config);

    match cli.command {
        Commands::Browse {
            category,
            scrolls,
            limit,
            remote,
        } => cmd_browse(&app, &category, scrolls, limit, remote).await,
        Commands::Categories => cmd_categories(&app).await,
        Commands::Show { id } => cmd_show(&app, id).await,
        Commands::Add { id } => cmd_add(&mut app, id, false).await,
        Commands::Buy { id } => cmd_add(&mut app, id, true).await,
        Commands::Cart => cmd_cart(&mut app),
        Commands::Inc { id } => cmd_edit(&mut app, id, Edit::Increment),
        Commands::Dec { id } => cmd_edit(&mut app, id, Edit::Decrement),
        Commands::Remove { id } => cmd_edit(&mut app, id, Edit::Remove),
        Commands::Clear { yes } => cmd_clear(&mut app, yes),
        Commands::Checkout => cmd_checkout(&mut app),
        Commands::Login {
            username,
            password,
            redirect,
        } => cmd_login(&mut app, &username, &password, redirect.as_deref()).await,
        Commands::Logout => cmd_logout(&mut app),
        Commands::Whoami => cmd_whoami(&app),
        Commands::Export => cmd_export(&app),
    }
}

fn print_next(intent: &NavIntent) {
    println!("\n→ next: {}", intent);
}

async fn cmd_browse(
    app: &App,
    category: &str,
    scrolls: u32,
    limit: Option<u32>,
    remote: bool,
) -> Result<()> {
    let client = app.catalog()?;
    let filter = CategoryFilter::parse(category);
    let remote_category = match &filter {
        CategoryFilter::Category(name) if remote => Some(name.clone()),
        _ => None,
    };
    let source = ScopedCatalog::new(&client)
        .category(remote_category)
        .limit(limit);

    let mut view = CatalogViewController::new(ScrollNotifier::new());
    view.activate(&source).await;

    if let Some(err) = view.last_error() {
        println!("Could not load the catalog: {}", err);
    }

    if filter != CategoryFilter::All {
        view.select_category(filter);
    }

    for _ in 0..scrolls {
        let Some(sentinel) = view.notifier_mut().scrolled_to_end() else {
            break;
        };
        view.on_boundary_visible(sentinel);
    }

    let mut categories = vec!["all".to_string()];
    categories.extend(view.categories().iter().cloned());
    println!(
        "Categories: {}  (selected: {})\n",
        categories.join(" | "),
        view.selected_category().label()
    );

    match view.view() {
        CatalogView::Loading => println!("Loading..."),
        CatalogView::Empty => println!("No products in this category."),
        CatalogView::Ready {
            products,
            has_more,
            total,
        } => {
            println!("{:<5}  {:>10}  {:>5}  {}", "ID", "PRICE", "RATE", "TITLE");
            println!("{}", "-".repeat(80));
            for product in products {
                let title = product.title.chars().take(55).collect::<String>();
                println!(
                    "{:<5}  {:>10}  {:>5.1}  {}",
                    product.id,
                    format_price(product.price),
                    product.rating.rate,
                    title
                );
            }

            if has_more {
                println!(
                    "\nShowing {} of {} - use --scrolls to load more",
                    products.len(),
                    total
                );
            } else {
                println!("\nShowing all {} products", total);
            }
        }
    }

    view.deactivate();
    Ok(())
}

async fn cmd_categories(app: &App) -> Result<()> {
    let client = app.catalog()?;
    let mut view = CatalogViewController::new(ScrollNotifier::new());
    view.activate(&client).await;

    if let Some(err) = view.last_error() {
        anyhow::bail!("Could not load categories: {}", err);
    }
    for category in view.categories() {
        println!("{}", category);
    }
    Ok(())
}

async fn open_detail(app: &App, id: ProductId) -> Result<ProductDetailController> {
    let client = app.catalog()?;
    let mut detail = ProductDetailController::new(Arc::new(SystemClock::new()));
    detail.open(&client, id).await;
    Ok(detail)
}

async fn cmd_show(app: &App, id: ProductId) -> Result<()> {
    let detail = open_detail(app, id).await?;

    match detail.state() {
        DetailState::Found(product) => {
            println!("{}", detail.page_title().unwrap_or_default());
            println!("{}", "=".repeat(60));
            println!("Category: {}", product.category);
            println!(
                "Rating:   ★ {} ({} reviews)",
                product.rating.rate, product.rating.count
            );
            println!("Price:    {}", format_price(product.price));
            println!("Image:    {}", product.image);
            println!();
            println!("{}", product.description);
        }
        DetailState::NotFound | DetailState::Loading => {
            println!("Product {} does not exist.", id);
            print_next(&NavIntent::Home);
        }
    }
    Ok(())
}

async fn cmd_add(app: &mut App, id: ProductId, buy_now: bool) -> Result<()> {
    let mut detail = open_detail(app, id).await?;
    if detail.product().is_none() {
        println!("Product {} does not exist.", id);
        return Ok(());
    }

    let immediate = if buy_now {
        detail.buy_now(&app.session, &mut app.cart)
    } else {
        match detail.add_to_cart(&app.session, &mut app.cart) {
            AddOutcome::Added => {
                println!("{}", detail.message().unwrap_or_default());
                println!("Cart: {} item(s)", app.cart.total_items());
                return Ok(());
            }
            AddOutcome::LoginRequired | AddOutcome::Unavailable => None,
        }
    };

    if let Some(intent) = immediate {
        print_next(&intent);
        return Ok(());
    }

    if let Some(message) = detail.message() {
        println!("{}", message);
    }

    // Wait out the redirect delay
    while let Some(wait) = detail.next_deadline() {
        tokio::time::sleep(wait).await;
        if let Some(intent) = detail.poll() {
            print_next(&intent);
            break;
        }
    }
    Ok(())
}

fn cmd_cart(app: &mut App) -> Result<()> {
    let view = CartView::new(&app.session, &mut app.cart);

    match view.page() {
        CartPage::LoginRequired(intent) => print_next(&intent),
        CartPage::Empty => {
            println!("Your cart is empty.");
            print_next(&NavIntent::Home);
        }
        CartPage::Lines(summary) => {
            println!(
                "{:<5}  {:<40}  {:>10}  {:>4}  {:>10}",
                "ID", "TITLE", "PRICE", "QTY", "SUBTOTAL"
            );
            println!("{}", "-".repeat(79));
            for line in &summary.lines {
                let title = line.item.title.chars().take(40).collect::<String>();
                println!(
                    "{:<5}  {:<40}  {:>10}  {:>4}  {:>10}",
                    line.item.id,
                    title,
                    format_price(line.item.price),
                    line.item.quantity,
                    format_price(line.line_total)
                );
            }
            println!("\nItems: {}", summary.total_items);
            println!("Total: {}", format_price(summary.total_price));
        }
    }
    Ok(())
}

enum Edit {
    Increment,
    Decrement,
    Remove,
}

fn cmd_edit(app: &mut App, id: ProductId, edit: Edit) -> Result<()> {
    let mut view = CartView::new(&app.session, &mut app.cart);
    if let CartPage::LoginRequired(intent) = view.page() {
        print_next(&intent);
        return Ok(());
    }

    let changed = match edit {
        Edit::Increment => view.increment(id),
        Edit::Decrement => view.decrement(id),
        Edit::Remove => view.remove(id),
    };
    if !changed {
        println!("Nothing changed for product {}.", id);
    }
    cmd_cart(app)
}

fn cmd_clear(app: &mut App, yes: bool) -> Result<()> {
    let mut view = CartView::new(&app.session, &mut app.cart);
    if let CartPage::LoginRequired(intent) = view.page() {
        print_next(&intent);
        return Ok(());
    }
    if !view.clear(yes) {
        println!("Pass --yes to confirm clearing the cart.");
        return Ok(());
    }
    println!("Cart cleared.");
    Ok(())
}

fn cmd_checkout(app: &mut App) -> Result<()> {
    let mut view = CartView::new(&app.session, &mut app.cart);
    if let CartPage::LoginRequired(intent) = view.page() {
        print_next(&intent);
        return Ok(());
    }

    let (receipt, next) = view.checkout()?;
    println!("Demo checkout: order submitted!");
    println!(
        "{} item(s), {} at {}",
        receipt.total_items,
        format_price(receipt.total_price),
        receipt.placed_at.with_timezone(&Local).format("%Y-%m-%d %H:%M:%S")
    );
    print_next(&next);
    Ok(())
}

async fn cmd_login(
    app: &mut App,
    username: &str,
    password: &str,
    redirect: Option<&str>,
) -> Result<()> {
    let mut form = LoginController::new(Arc::new(SystemClock::new()), redirect);
    if let Some(intent) = form.activate(&app.session) {
        println!("Already signed in.");
        print_next(&intent);
        return Ok(());
    }

    if let Err(e) = form.submit(username, password) {
        println!("{}", e);
        return Ok(());
    }

    println!("Signing in...");
    while let Some(wait) = form.next_deadline() {
        tokio::time::sleep(wait).await;
        if let Some(intent) = form.poll(&mut app.session) {
            println!("Welcome, {}!", username);
            print_next(&intent);
            return Ok(());
        }
    }

    if let Some(e) = form.error() {
        println!("{}", e);
    }
    Ok(())
}

fn cmd_logout(app: &mut App) -> Result<()> {
    if !app.session.is_authenticated() {
        println!("Not signed in.");
        return Ok(());
    }
    app.session.logout();
    println!("Signed out.");
    Ok(())
}

fn cmd_whoami(app: &App) -> Result<()> {
    let header = HeaderSummary::from_stores(&app.cart, &app.session);
    match &header.username {
        Some(name) => println!("Signed in as {}", name),
        None => println!("Not signed in"),
    }
    println!("Cart: {} item(s)", header.cart_count);
    Ok(())
}

fn cmd_export(app: &App) -> Result<()> {
    let Some(db) = &app.db else {
        anyhow::bail!("No database open; nothing to export");
    };

    let mut records = serde_json::Map::new();
    for (key, raw) in db.entries()? {
        let value = serde_json::from_str(&raw).unwrap_or(serde_json::Value::String(raw));
        records.insert(key, value);
    }

    let export = serde_json::json!({
        "exported_at": Utc::now().to_rfc3339(),
        "database": db.path().display().to_string(),
        "session": app.session.record(),
        "cart_total_items": app.cart.total_items(),
        "cart_total_price": app.cart.total_price(),
        "records": records,
    });

    info!("Exported {} record(s)", export["records"].as_object().map_or(0, |m| m.len()));
    println!("{}", serde_json::to_string_pretty(&export)?);
    Ok(())
}
