//! Argument parsing and command dispatch.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum};
use makkah_api_models::{Blog, EventListing, Package, Product, Review};
use makkah_config::{ConfigLoader, SiteConfig, validate_config};
use makkah_session::Route;
use makkah_telemetry::{LogFormat, LoggingConfig, new_request_id, with_request_context};
use url::Url;

use crate::client::{AppContext, CliResult};
use crate::commands::{auth, catalog, content, leads, media};

/// Parses CLI arguments, executes the requested command and reports errors.
/// Returns the process exit code.
pub async fn run() -> i32 {
    let cli = Cli::parse();
    init_tracing(&cli);
    let trace_id = new_request_id();
    let label = command_label(&cli.command);

    let result = with_request_context(trace_id.clone(), label, execute(cli)).await;
    match result {
        Ok(()) => 0,
        Err(err) => {
            tracing::debug!(trace_id = %trace_id, command = label, "command failed");
            eprintln!("error: {}", err.display_message());
            err.exit_code()
        }
    }
}

fn init_tracing(cli: &Cli) {
    let format = match cli.log_format.as_deref().map(str::parse::<LogFormat>) {
        Some(Ok(format)) => format,
        Some(Err(err)) => {
            eprintln!("warning: {err}; using default log format");
            LogFormat::infer()
        }
        None => LogFormat::infer(),
    };
    let config = LoggingConfig {
        level: &cli.log_level,
        format,
        build_sha: option_env!("MAKKAH_BUILD_SHA").unwrap_or("dev"),
    };
    if let Err(err) = makkah_telemetry::init_logging(&config) {
        eprintln!("warning: logging disabled: {err}");
    }
}

async fn execute(cli: Cli) -> CliResult<()> {
    let config = load_config(&cli)?;
    let ctx = AppContext::build(config, cli.output)?;
    dispatch(cli.command, &ctx).await
}

pub(crate) fn load_config(cli: &Cli) -> CliResult<SiteConfig> {
    let mut config = ConfigLoader::new().with_file(cli.config.clone()).load()?;
    if let Some(url) = &cli.api_url {
        config.api.base_url = url.as_str().trim_end_matches('/').to_string();
    }
    if let Some(timeout) = cli.timeout {
        config.http.timeout_secs = timeout;
    }
    validate_config(&config)?;
    Ok(config)
}

pub(crate) async fn dispatch(command: Command, ctx: &AppContext) -> CliResult<()> {
    match command {
        Command::Auth(command) => match command {
            AuthCommand::Login(args) => auth::handle_login(ctx, args).await,
            AuthCommand::Register(args) => auth::handle_register(ctx, args).await,
            AuthCommand::Logout => auth::handle_logout(ctx).await,
            AuthCommand::Whoami => auth::handle_whoami(ctx).await,
            AuthCommand::VerifyEmail => auth::handle_verify_email(ctx).await,
            AuthCommand::ResetPassword(args) => auth::handle_reset_password(ctx, args).await,
            AuthCommand::Profile(args) => auth::handle_profile(ctx, args).await,
        },
        Command::View(args) => auth::handle_view(ctx, args).await,
        Command::Packages(packages) => match packages {
            PackageCommand::List(args) => catalog::handle_packages(ctx, args).await,
            PackageCommand::Show(args) => catalog::handle_package(ctx, args).await,
        },
        Command::Blogs(blogs) => match blogs {
            BlogCommand::List => catalog::handle_blogs(ctx).await,
            BlogCommand::Show(args) => catalog::handle_blog(ctx, args).await,
        },
        Command::Reviews => catalog::handle_reviews(ctx).await,
        Command::Events => catalog::handle_events(ctx).await,
        Command::Shop(args) => catalog::handle_shop(ctx, args).await,
        Command::Admin(admin) => match admin {
            AdminCommand::Packages(cmd) => {
                content::handle_records::<Package>(ctx, &Route::AdminPackages, cmd).await
            }
            AdminCommand::Blogs(cmd) => {
                content::handle_records::<Blog>(ctx, &Route::AdminBlogs, cmd).await
            }
            AdminCommand::Reviews(cmd) => {
                content::handle_records::<Review>(ctx, &Route::AdminReviews, cmd).await
            }
            AdminCommand::Events(cmd) => {
                content::handle_records::<EventListing>(ctx, &Route::AdminEvents, cmd).await
            }
            AdminCommand::Products(cmd) => {
                content::handle_records::<Product>(ctx, &Route::AdminProducts, cmd).await
            }
            AdminCommand::Users(cmd) => content::handle_users(ctx, cmd).await,
        },
        Command::Upload(args) => media::handle_upload(ctx, args).await,
        Command::Contact(args) => leads::handle_contact(ctx, args).await,
        Command::Book(args) => leads::handle_booking(ctx, args).await,
    }
}

const fn command_label(command: &Command) -> &'static str {
    match command {
        Command::Auth(_) => "auth",
        Command::View(_) => "view",
        Command::Packages(_) => "packages",
        Command::Blogs(_) => "blogs",
        Command::Reviews => "reviews",
        Command::Events => "events",
        Command::Shop(_) => "shop",
        Command::Admin(_) => "admin",
        Command::Upload(_) => "upload",
        Command::Contact(_) => "contact",
        Command::Book(_) => "book",
    }
}

pub(crate) fn parse_url(input: &str) -> Result<Url, String> {
    let url = input
        .parse::<Url>()
        .map_err(|err| format!("invalid URL '{input}': {err}"))?;
    match url.scheme() {
        "http" | "https" => Ok(url),
        other => Err(format!("unsupported scheme '{other}' in '{input}'")),
    }
}

#[derive(Parser)]
#[command(name = "makkah", about = "Travel site client: sign-in, catalog, admin boards and leads")]
pub(crate) struct Cli {
    #[arg(long, global = true, env = "MAKKAH_CONFIG", help = "JSON configuration document")]
    pub(crate) config: Option<PathBuf>,
    #[arg(long, global = true, value_parser = parse_url, help = "Backend API base URL")]
    pub(crate) api_url: Option<Url>,
    #[arg(long, global = true, help = "HTTP timeout in seconds")]
    pub(crate) timeout: Option<u64>,
    #[arg(
        long = "output",
        alias = "format",
        global = true,
        value_enum,
        default_value_t = OutputFormat::Table,
        help = "Select output format for commands that render structured data"
    )]
    pub(crate) output: OutputFormat,
    #[arg(
        long,
        global = true,
        env = "MAKKAH_LOG_LEVEL",
        default_value = makkah_telemetry::DEFAULT_LOG_LEVEL
    )]
    pub(crate) log_level: String,
    #[arg(long, global = true, env = "MAKKAH_LOG_FORMAT")]
    pub(crate) log_format: Option<String>,
    #[command(subcommand)]
    pub(crate) command: Command,
}

#[derive(Subcommand)]
pub(crate) enum Command {
    /// Sign-in, registration and account maintenance.
    #[command(subcommand)]
    Auth(AuthCommand),
    /// Show what the current session sees at a site path.
    View(ViewArgs),
    /// Hajj and Umrah packages.
    #[command(subcommand)]
    Packages(PackageCommand),
    /// Blog posts.
    #[command(subcommand)]
    Blogs(BlogCommand),
    /// Customer reviews.
    Reviews,
    /// Agency events.
    Events,
    /// Shop products.
    Shop(ShopArgs),
    /// Back-office boards (admin role required).
    #[command(subcommand)]
    Admin(AdminCommand),
    /// Upload an image and print its public URL.
    Upload(UploadArgs),
    /// Send a general contact inquiry.
    Contact(ContactArgs),
    /// Send a booking request for a package.
    Book(BookArgs),
}

#[derive(Subcommand)]
pub(crate) enum AuthCommand {
    Login(LoginArgs),
    Register(CredentialArgs),
    Logout,
    Whoami,
    VerifyEmail,
    ResetPassword(ResetArgs),
    Profile(ProfileArgs),
}

#[derive(Args)]
pub(crate) struct CredentialArgs {
    #[arg(long)]
    pub(crate) email: String,
    #[arg(long, env = "MAKKAH_PASSWORD", hide_env_values = true)]
    pub(crate) password: Option<String>,
}

#[derive(Args)]
pub(crate) struct LoginArgs {
    #[command(flatten)]
    pub(crate) credentials: CredentialArgs,
    #[arg(long, help = "Path to continue at after signing in")]
    pub(crate) redirect: Option<String>,
}

#[derive(Args)]
pub(crate) struct ResetArgs {
    #[arg(long)]
    pub(crate) email: String,
}

#[derive(Args)]
pub(crate) struct ProfileArgs {
    #[arg(long)]
    pub(crate) name: Option<String>,
    #[arg(long)]
    pub(crate) photo_url: Option<String>,
    #[arg(long, conflicts_with = "photo_url", help = "Upload a local image as the avatar")]
    pub(crate) photo: Option<PathBuf>,
}

#[derive(Args)]
pub(crate) struct ViewArgs {
    pub(crate) path: String,
}

#[derive(Subcommand)]
pub(crate) enum PackageCommand {
    List(PackageListArgs),
    Show(IdArgs),
}

#[derive(Args)]
pub(crate) struct PackageListArgs {
    #[arg(long, value_enum, default_value_t = CategoryArg::Hajj)]
    pub(crate) category: CategoryArg,
}

#[derive(Copy, Clone, Debug, ValueEnum)]
pub(crate) enum CategoryArg {
    Hajj,
    Umrah,
}

#[derive(Subcommand)]
pub(crate) enum BlogCommand {
    List,
    Show(IdArgs),
}

#[derive(Args)]
pub(crate) struct ShopArgs {
    #[arg(long, default_value = "All")]
    pub(crate) category: String,
}

#[derive(Subcommand)]
pub(crate) enum AdminCommand {
    #[command(subcommand)]
    Packages(RecordCommand),
    #[command(subcommand)]
    Blogs(RecordCommand),
    #[command(subcommand)]
    Reviews(RecordCommand),
    #[command(subcommand)]
    Events(RecordCommand),
    #[command(subcommand)]
    Products(RecordCommand),
    #[command(subcommand)]
    Users(UserCommand),
}

#[derive(Subcommand)]
pub(crate) enum RecordCommand {
    List,
    Create(RecordFileArgs),
    Update(RecordUpdateArgs),
    Delete(IdArgs),
}

#[derive(Args)]
pub(crate) struct RecordFileArgs {
    #[arg(long, help = "JSON document describing the record")]
    pub(crate) file: PathBuf,
}

#[derive(Args)]
pub(crate) struct RecordUpdateArgs {
    pub(crate) id: String,
    #[arg(long, help = "JSON document describing the record")]
    pub(crate) file: PathBuf,
}

#[derive(Subcommand)]
pub(crate) enum UserCommand {
    List,
    ToggleRole(IdArgs),
}

#[derive(Args)]
pub(crate) struct IdArgs {
    pub(crate) id: String,
}

#[derive(Args)]
pub(crate) struct UploadArgs {
    pub(crate) path: PathBuf,
}

#[derive(Args)]
pub(crate) struct ContactArgs {
    #[arg(long)]
    pub(crate) name: String,
    #[arg(long)]
    pub(crate) mobile: String,
    #[arg(long)]
    pub(crate) email: String,
    #[arg(long)]
    pub(crate) message: String,
}

#[derive(Args)]
pub(crate) struct BookArgs {
    pub(crate) package_id: String,
    #[arg(long)]
    pub(crate) name: String,
    #[arg(long)]
    pub(crate) mobile: String,
    #[arg(long)]
    pub(crate) email: String,
    #[arg(long)]
    pub(crate) passport: String,
    #[arg(long)]
    pub(crate) message: Option<String>,
}

#[derive(Copy, Clone, Debug, Default, ValueEnum)]
pub(crate) enum OutputFormat {
    #[default]
    Table,
    Json,
}
