//! mediasorter: browse, play and sort a folder of media from the browser

mod daemon;
mod filesystem;
mod gallery;
mod protocol;
mod qr;
mod streaming;

use std::net::IpAddr;
use std::path::PathBuf;

use clap::{Parser, Subcommand};
use colored::Colorize;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

use daemon::{ServerConfig, DEFAULT_FRONTEND, DEFAULT_PORT};
use filesystem::config::{LibraryConfig, ShortcutMode};

/// Local media triage server
#[derive(Parser, Debug)]
#[command(name = "mediasorter", version, about)]
struct Cli {
    #[arg(
        short = 'd',
        long,
        env = "MEDIASORTER_ROOT",
        default_value = ".",
        help = "Directory to browse and sort"
    )]
    root: PathBuf,

    #[arg(
        short = 'p',
        long,
        env = "MEDIASORTER_PORT",
        default_value_t = DEFAULT_PORT,
        help = "HTTP port"
    )]
    port: u16,

    #[arg(
        short = 'b',
        long,
        env = "MEDIASORTER_BIND",
        default_value = "127.0.0.1",
        help = "Bind address"
    )]
    host: IpAddr,

    #[arg(
        long,
        env = "MEDIASORTER_TRASH_DIR",
        default_value = "trash",
        help = "Folder deleted files are moved into"
    )]
    trash_dir: String,

    #[arg(
        long,
        env = "MEDIASORTER_DELETION_DIR",
        default_value = "deleteVideos",
        help = "Folder hidden from the destination list"
    )]
    deletion_dir: String,

    #[arg(
        long,
        env = "MEDIASORTER_FRONTEND",
        default_value = DEFAULT_FRONTEND,
        help = "Front-end document served at /"
    )]
    frontend: PathBuf,

    #[arg(
        long,
        env = "MEDIASORTER_STABLE_SHORTCUTS",
        help = "Keep folder shortcuts stable until restart"
    )]
    stable_shortcuts: bool,

    #[arg(long, help = "Print a QR code of the server URL")]
    qr: bool,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Run the HTTP server (default)
    Serve,
    /// Write a standalone paginated gallery of the videos in the root
    Gallery {
        /// Output file, defaults to gallery.html inside the root
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
}

#[tokio::main]
async fn main() -> std::io::Result<()> {
    let cli = Cli::parse();
    init_logging();

    let root = cli.root.canonicalize().map_err(|e| {
        eprintln!(
            "{} cannot open {}: {}",
            "Error:".red().bold(),
            cli.root.display(),
            e
        );
        e
    })?;

    match cli.command {
        Some(Command::Gallery { output }) => {
            let output = output.unwrap_or_else(|| root.join(gallery::DEFAULT_OUTPUT));
            let count = gallery::write_gallery(&root, &output)?;
            println!(
                "{} {} with {} videos",
                "Wrote".green(),
                output.display(),
                count
            );
            Ok(())
        }
        Some(Command::Serve) | None => {
            let library = LibraryConfig {
                trash_dir: cli.trash_dir,
                deletion_dir: cli.deletion_dir,
                shortcut_mode: if cli.stable_shortcuts {
                    ShortcutMode::Session
                } else {
                    ShortcutMode::PerRequest
                },
                ..LibraryConfig::with_root(root.clone())
            };
            let server = ServerConfig {
                host: cli.host,
                port: cli.port,
                frontend: cli.frontend,
                ..Default::default()
            };

            qr::display_server_banner(server.addr(), &root, cli.qr);
            daemon::run(library, server).await
        }
    }
}

fn init_logging() {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                format!("{}=info,tower_http=info", env!("CARGO_CRATE_NAME")).into()
            }),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();
}
