//! Galleria client - command-line entry point.

use std::path::PathBuf;

use clap::{Parser, Subcommand, ValueEnum};
use galleria_app::App;
use galleria_application::views::ViewKind;
use galleria_domain::SourceFile;
use galleria_infrastructure::load_config;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

#[derive(Parser, Debug)]
#[command(name = "galleria", version, about = "Galleria gallery and forum client")]
struct Cli {
    /// JSON configuration file.
    #[arg(long, env = "GALLERIA_CONFIG")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Sign in and persist the session.
    Login {
        /// Login name.
        #[arg(long)]
        username: String,
        /// Password.
        #[arg(long, env = "GALLERIA_PASSWORD", hide_env_values = true)]
        password: String,
    },
    /// Sign out and forget the session.
    Logout,
    /// Upload images, optionally rewriting a content file that embeds their preview URLs.
    Upload {
        /// Image files.
        #[arg(required = true)]
        files: Vec<PathBuf>,
        /// Content file whose preview URLs are rewritten and printed.
        #[arg(long)]
        content: Option<PathBuf>,
        /// Print the first permanent URL only.
        #[arg(long)]
        register: bool,
        /// Skip saving image metadata.
        #[arg(long)]
        no_metadata: bool,
    },
    /// Print notifications until interrupted.
    Listen,
    /// Record a view of an image or forum post.
    View {
        /// Entity kind.
        #[arg(value_enum)]
        kind: Kind,
        /// Entity id.
        id: i64,
    },
}

#[derive(ValueEnum, Clone, Copy, Debug)]
enum Kind {
    Image,
    Forum,
}

impl From<Kind> for ViewKind {
    fn from(kind: Kind) -> Self {
        match kind {
            Kind::Image => Self::Image,
            Kind::Forum => Self::Forum,
        }
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();
    let config = load_config(cli.config.as_deref()).await?;
    tracing::debug!("Starting Galleria client v{}", env!("CARGO_PKG_VERSION"));

    let app = App::init(config).await?;
    let result = run(&app, cli.command).await;
    app.teardown();
    result
}

async fn run(app: &App, command: Command) -> Result<(), Box<dyn std::error::Error>> {
    match command {
        Command::Login { username, password } => {
            let user = app.session().login(&username, &password).await?;
            println!("Logged in as {} (#{})", user.username, user.id);
        }
        Command::Logout => {
            if !app.session().logout().await {
                eprintln!("Local session cleared; the server did not confirm logout");
            }
        }
        Command::Upload {
            files,
            content,
            register,
            no_metadata,
        } => upload(app, files, content, register, no_metadata).await?,
        Command::Listen => listen(app).await?,
        Command::View { kind, id } => {
            let tracker = app.view_tracker(kind.into()).await?;
            let counted = tracker.record_view(id).await?;
            println!("{}", if counted { "counted" } else { "already viewed" });
        }
    }
    Ok(())
}

async fn upload(
    app: &App,
    paths: Vec<PathBuf>,
    content: Option<PathBuf>,
    register: bool,
    no_metadata: bool,
) -> Result<(), Box<dyn std::error::Error>> {
    let mut files = Vec::with_capacity(paths.len());
    for path in &paths {
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        files.push(SourceFile::new(name, tokio::fs::read(path).await?));
    }

    let pipeline = app.upload_pipeline();
    let previews = pipeline.stage_files(files).await;
    if previews.is_empty() {
        return Err("no files could be staged".into());
    }

    let primary = pipeline.upload_all(register).await?;
    if !no_metadata {
        pipeline.persist_metadata().await?;
    }

    if let Some(primary) = primary {
        println!("{primary}");
    } else {
        let mut urls = Vec::new();
        pipeline.collect_permanent_urls(&mut urls);
        for url in urls {
            println!("{url}");
        }
    }

    if let Some(path) = content {
        // Content written against this batch uses `{preview:N}` placeholders
        // for the N-th file.
        let mut text = tokio::fs::read_to_string(&path).await?;
        for (index, preview) in previews.iter().enumerate() {
            text = text.replace(&format!("{{preview:{index}}}"), preview);
        }
        println!("{}", pipeline.rewrite_content(&text));
    }

    pipeline.cleanup();
    Ok(())
}

async fn listen(app: &App) -> Result<(), Box<dyn std::error::Error>> {
    if !app.connect_notifications().await {
        return Err("not logged in".into());
    }
    let mut events = app.notifications().subscribe();
    loop {
        tokio::select! {
            event = events.recv() => match event {
                Ok(notification) => println!("[{}] {}", notification.kind, notification.message),
                Err(tokio::sync::broadcast::error::RecvError::Lagged(skipped)) => {
                    tracing::warn!(skipped, "Dropped notifications");
                }
                Err(tokio::sync::broadcast::error::RecvError::Closed) => break,
            },
            _ = tokio::signal::ctrl_c() => break,
        }
    }
    Ok(())
}
