//! Command definitions and handlers.

use std::path::{Path, PathBuf};

use anyhow::{bail, Context};
use clap::{Args, Parser, Subcommand, ValueEnum};
use storefront_api::{ApiClient, ApiResult};
use storefront_core::{
    average_rating, Credentials, ListQuery, NewCategory, NewReview, Price, Product, Registration,
    ResourceId, Role, SortOrder, Upload,
};
use storefront_session::{SessionManager, SessionState, StorageScope, StorefrontConfig};
use tokio::sync::watch;
use tracing::info;

// =============================================================================
// Arguments
// =============================================================================

#[derive(Debug, Parser)]
#[command(name = "storefront", version, about = "Storefront client")]
pub struct Cli {
    /// Config file (default: platform config dir/storefront.toml)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Override the API base URL
    #[arg(long, global = true)]
    pub api_url: Option<String>,

    /// Debug logging on stderr
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Log in with email and password
    Login {
        email: String,
        password: String,
        /// Keep the session across runs
        #[arg(long)]
        remember: bool,
    },
    /// Create an account
    Register {
        name: String,
        email: String,
        password: String,
    },
    /// Finish an OAuth login from the callback URL
    Redirect { url: String },
    /// Print the URL that starts an OAuth login
    OauthUrl,
    Logout,
    /// Show the current session
    Whoami,
    /// Exchange the session token for a fresh one
    Refresh,
    /// Keep the session alive and print state changes until Ctrl+C
    Watch,
    /// API health check
    Status,
    Products(ProductArgs),
    /// Product details with reviews and related products
    Product { id: String },
    Categories,
    Articles {
        #[arg(long, default_value_t = 1)]
        page: u32,
        #[arg(long, default_value_t = 5)]
        limit: u32,
    },
    Article { id: String },
    /// Current hero banner
    Hero,
    #[command(subcommand)]
    Wishlist(WishlistCommand),
    #[command(subcommand)]
    Reviews(ReviewCommand),
    #[command(subcommand)]
    Admin(AdminCommand),
    #[command(subcommand)]
    Config(ConfigCommand),
}

#[derive(Debug, Args)]
pub struct ProductArgs {
    /// Free-text search
    #[arg(long)]
    pub search: Option<String>,
    #[arg(long)]
    pub category: Option<String>,
    /// Minimum price in rupiah
    #[arg(long)]
    pub min_price: Option<i64>,
    /// Maximum price in rupiah
    #[arg(long)]
    pub max_price: Option<i64>,
    /// Field to sort by, e.g. price or createdAt
    #[arg(long)]
    pub sort: Option<String>,
    #[arg(long, value_enum, default_value_t = OrderArg::Desc)]
    pub order: OrderArg,
    #[arg(long, default_value_t = 1)]
    pub page: u32,
    #[arg(long, default_value_t = 12)]
    pub limit: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OrderArg {
    Asc,
    Desc,
}

impl From<OrderArg> for SortOrder {
    fn from(order: OrderArg) -> Self {
        match order {
            OrderArg::Asc => SortOrder::Asc,
            OrderArg::Desc => SortOrder::Desc,
        }
    }
}

impl ProductArgs {
    fn to_query(&self) -> ListQuery {
        let mut query = ListQuery::new().page(self.page, self.limit);
        if let Some(search) = &self.search {
            query = query.search(search.as_str());
        }
        if let Some(category) = &self.category {
            query = query.category(category.as_str());
        }
        if self.min_price.is_some() || self.max_price.is_some() {
            query = query.price_range(
                self.min_price.map(Price::from_rupiah),
                self.max_price.map(Price::from_rupiah),
            );
        }
        if let Some(sort) = &self.sort {
            query = query.sort(sort.as_str(), self.order.into());
        }
        query
    }
}

#[derive(Debug, Subcommand)]
pub enum WishlistCommand {
    List,
    Add { product_id: String },
    Remove { item_id: String },
}

#[derive(Debug, Subcommand)]
pub enum ReviewCommand {
    /// Reviews written by the current user
    Mine,
    Add {
        product_id: String,
        #[arg(long)]
        rating: u8,
        #[arg(long)]
        comment: String,
    },
    Delete { id: String },
}

#[derive(Debug, Subcommand)]
pub enum AdminCommand {
    /// User, product and review counts
    Dashboard,
    DeleteProduct { id: String },
    CreateCategory {
        name: String,
        #[arg(long)]
        image: Option<PathBuf>,
    },
    UploadHero { image: PathBuf },
}

#[derive(Debug, Subcommand)]
pub enum ConfigCommand {
    /// Print the effective configuration
    Show,
    /// Write the effective configuration to the config file
    Init,
}

// =============================================================================
// Dispatch
// =============================================================================

/// Everything a command needs.
pub struct AppContext {
    pub config: StorefrontConfig,
    pub config_path: Option<PathBuf>,
    pub api: ApiClient,
    pub session: SessionManager,
}

pub async fn run(command: Command, ctx: &AppContext) -> anyhow::Result<()> {
    match command {
        Command::Login {
            email,
            password,
            remember,
        } => {
            let credentials = Credentials {
                email,
                password,
                remember_me: remember,
            };
            let session = ctx.session.login_with_credentials(&credentials).await?;
            println!("Logged in as {} ({})", session.profile.name, session.role);
            println!("Landing page: {}", session.role.landing_route());
            if StorageScope::from_remember_me(remember) == StorageScope::Tab {
                println!("Session ends with this command; pass --remember to keep it.");
            }
        }
        Command::Register {
            name,
            email,
            password,
        } => {
            ctx.session
                .register(&Registration {
                    name,
                    email: email.clone(),
                    password,
                })
                .await?;
            println!("Registered {}. You can now log in.", email);
        }
        Command::Redirect { url } => {
            let session = ctx.session.login_from_redirect(&url).await?;
            println!("Logged in as {} ({})", session.profile.name, session.role);
        }
        Command::OauthUrl => println!("{}", ctx.session.oauth_start_url()?),
        Command::Logout => {
            ctx.session.logout().await;
            println!("Logged out");
        }
        Command::Whoami => print_state(&ctx.session),
        Command::Refresh => {
            let session = ctx.session.refresh_now().await?;
            println!("Token refreshed, expires {}", session.expires_at);
        }
        Command::Watch => watch_session(&ctx.session).await?,
        Command::Status => println!("API {}: {}", ctx.api.base_url(), ctx.api.status().await),
        Command::Products(args) => list_products(ctx, &args).await?,
        Command::Product { id } => show_product(ctx, &ResourceId::new(id)).await?,
        Command::Categories => {
            for category in ctx.api.categories().list().await? {
                println!("{:>6}  {}", category.id, category.name);
            }
        }
        Command::Articles { page, limit } => {
            let articles = ctx.api.articles().list(&ListQuery::new().page(page, limit)).await?;
            for article in &articles.items {
                let author = article.author.as_deref().unwrap_or("-");
                println!("{:>6}  {}  ({})", article.id, article.title, author);
            }
            println!("Page {} of {}", page, articles.total_pages(limit).max(1));
        }
        Command::Article { id } => {
            let article = ctx.api.articles().get(&ResourceId::new(id)).await?;
            println!("{}\n", article.title);
            println!("{}", article.content);
        }
        Command::Hero => match ctx.api.hero_images().current().await? {
            Some(hero) => println!("{}", ctx.api.asset_url(&hero.image_url)?),
            None => println!("No hero image"),
        },
        Command::Wishlist(command) => wishlist(ctx, command).await?,
        Command::Reviews(command) => reviews(ctx, command).await?,
        Command::Admin(command) => admin(ctx, command).await?,
        Command::Config(ConfigCommand::Show) => println!("{:#?}", ctx.config),
        Command::Config(ConfigCommand::Init) => {
            ctx.config.save(ctx.config_path.clone())?;
            println!("Configuration written");
        }
    }
    Ok(())
}

/// Passes `result` through, ending the session first when the API says the
/// token is no longer accepted.
async fn guarded<T>(session: &SessionManager, result: ApiResult<T>) -> anyhow::Result<T> {
    match result {
        Ok(value) => Ok(value),
        Err(err) => {
            if session.handle_api_error(&err).await {
                println!("Session expired, please log in again.");
            }
            Err(err.into())
        }
    }
}

// =============================================================================
// Session
// =============================================================================

fn print_state(session: &SessionManager) {
    match session.state() {
        SessionState::Authenticated(s) | SessionState::RefreshScheduled(s) => {
            println!("{} <{}>", s.profile.name, s.profile.email);
            println!("Role:     {}", s.role);
            println!("Expires:  {}", s.expires_at);
            if let Some(due) = session.refresh_due_in() {
                println!("Refresh:  in {}s", due.as_secs());
            }
        }
        state => {
            println!("Not logged in ({})", state);
            if let Some(reason) = session.last_invalidation() {
                println!("Last session ended: {}", reason);
            }
        }
    }
    println!("Landing page: {}", session.landing_route());
}

async fn watch_session(session: &SessionManager) -> anyhow::Result<()> {
    if !session.state().is_authenticated() {
        bail!("not logged in");
    }
    let mut rx: watch::Receiver<SessionState> = session.subscribe();
    info!("Watching session, press Ctrl+C to stop");
    print_state(session);

    loop {
        tokio::select! {
            changed = rx.changed() => {
                if changed.is_err() {
                    break;
                }
                let state = rx.borrow_and_update().clone();
                println!("-> {}", state);
                if state.is_unauthenticated() {
                    break;
                }
            }
            _ = tokio::signal::ctrl_c() => {
                info!("Stopping");
                break;
            }
        }
    }
    Ok(())
}

// =============================================================================
// Catalogue
// =============================================================================

async fn list_products(ctx: &AppContext, args: &ProductArgs) -> anyhow::Result<()> {
    let page = ctx.api.products().list(&args.to_query()).await?;
    if page.is_empty() {
        println!("No products found");
        return Ok(());
    }
    for product in &page.items {
        print_product_line(product);
    }
    println!("Page {} of {}", args.page, page.total_pages(args.limit).max(1));
    Ok(())
}

fn print_product_line(product: &Product) {
    let stock = if product.in_stock() {
        format!("{} in stock", product.stock)
    } else {
        "sold out".to_string()
    };
    println!("{:>6}  {:<40} {:>16}  {}", product.id, product.title, product.price.to_string(), stock);
}

async fn show_product(ctx: &AppContext, id: &ResourceId) -> anyhow::Result<()> {
    let product = ctx.api.products().get(id).await?;
    println!("{}", product.title);
    println!("Price: {}", product.price);
    if let Some(description) = &product.description {
        println!("\n{}\n", description);
    }
    for image in product.image_paths() {
        println!("Image: {}", ctx.api.asset_url(&image)?);
    }

    let reviews = ctx.api.reviews().for_product(id).await?;
    match average_rating(&reviews) {
        Some(avg) => println!("Rating: {:.1} from {} reviews", avg, reviews.len()),
        None => println!("No reviews yet"),
    }
    for review in reviews.iter().take(5) {
        let author = review
            .user
            .as_ref()
            .and_then(|user| user.name.as_deref())
            .unwrap_or("anonymous");
        println!("  {}/5  {}: {}", review.rating, author, review.comment);
    }

    let related = ctx.api.products().related(&product, 4).await?;
    if !related.is_empty() {
        println!("\nRelated:");
        for product in &related {
            print_product_line(product);
        }
    }
    Ok(())
}

// =============================================================================
// Shopper
// =============================================================================

async fn wishlist(ctx: &AppContext, command: WishlistCommand) -> anyhow::Result<()> {
    let api = ctx.session.authorized(&ctx.api, Role::User)?;
    match command {
        WishlistCommand::List => {
            let items = guarded(&ctx.session, api.wishlist().list().await).await?;
            for item in &items {
                print!("{:>6}  ", item.id);
                print_product_line(&item.product);
            }
        }
        WishlistCommand::Add { product_id } => {
            guarded(&ctx.session, api.wishlist().add(&ResourceId::new(product_id)).await).await?;
            println!("Added to wishlist");
        }
        WishlistCommand::Remove { item_id } => {
            guarded(&ctx.session, api.wishlist().remove(&ResourceId::new(item_id)).await).await?;
            println!("Removed from wishlist");
        }
    }
    Ok(())
}

async fn reviews(ctx: &AppContext, command: ReviewCommand) -> anyhow::Result<()> {
    let api = ctx.session.authorized(&ctx.api, Role::User)?;
    match command {
        ReviewCommand::Mine => {
            for review in guarded(&ctx.session, api.reviews().mine().await).await? {
                let product = review
                    .product
                    .as_ref()
                    .and_then(|product| product.title.as_deref())
                    .unwrap_or("-");
                println!("{:>6}  {}/5  {}: {}", review.id, review.rating, product, review.comment);
            }
        }
        ReviewCommand::Add {
            product_id,
            rating,
            comment,
        } => {
            let review = NewReview {
                rating,
                comment,
                product_id: ResourceId::new(product_id),
            };
            guarded(&ctx.session, api.reviews().create(&review).await).await?;
            println!("Review posted");
        }
        ReviewCommand::Delete { id } => {
            guarded(&ctx.session, api.reviews().delete(&ResourceId::new(id)).await).await?;
            println!("Review deleted");
        }
    }
    Ok(())
}

// =============================================================================
// Admin
// =============================================================================

async fn admin(ctx: &AppContext, command: AdminCommand) -> anyhow::Result<()> {
    let api = ctx.session.authorized(&ctx.api, Role::Admin)?;
    match command {
        AdminCommand::Dashboard => {
            let stats = guarded(&ctx.session, api.admin().dashboard().await).await?;
            println!("Users:    {}", stats.user_count);
            println!("Products: {}", stats.product_count);
            println!("Reviews:  {}", stats.review_count);
        }
        AdminCommand::DeleteProduct { id } => {
            guarded(&ctx.session, api.products().delete(&ResourceId::new(id)).await).await?;
            println!("Product deleted");
        }
        AdminCommand::CreateCategory { name, image } => {
            let image = image.as_deref().map(read_upload).transpose()?;
            let category = NewCategory { name, image };
            guarded(&ctx.session, api.categories().create(&category).await).await?;
            println!("Category created");
        }
        AdminCommand::UploadHero { image } => {
            let upload = read_upload(&image)?;
            guarded(&ctx.session, api.hero_images().upload(&upload).await).await?;
            println!("Hero image uploaded");
        }
    }
    Ok(())
}

/// Reads an image file into a multipart part.
fn read_upload(path: &Path) -> anyhow::Result<Upload> {
    let mime = mime_for(path)
        .with_context(|| format!("unsupported image type: {}", path.display()))?;
    let bytes = std::fs::read(path).with_context(|| format!("failed to read {}", path.display()))?;
    let file_name = path
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| "upload".to_string());
    Ok(Upload::new(file_name, mime, bytes))
}

fn mime_for(path: &Path) -> Option<&'static str> {
    let ext = path.extension()?.to_str()?.to_ascii_lowercase();
    match ext.as_str() {
        "png" => Some("image/png"),
        "jpg" | "jpeg" => Some("image/jpeg"),
        "gif" => Some("image/gif"),
        "webp" => Some("image/webp"),
        _ => None,
    }
}
