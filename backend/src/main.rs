//! Keeper CLI - accession submission server
//!
//! # Main Commands
//!
//! ```bash
//! keeper serve                      # Start HTTP server (port 3000)
//! keeper serve --debug              # ... without reCAPTCHA verification
//! ```
//!
//! # Debug Commands (for development)
//!
//! ```bash
//! keeper check-file scan.pdf        # Run the server's file checks on a local file
//! keeper accepted-types             # Show accepted MIME patterns and icons
//! ```

use clap::{Parser, Subcommand};
use keeper::config::{icon_for, Settings, ACCEPTED_FILE_TYPES};
use keeper::validation::{validate_file, SNIFF_LEN};
use keeper::UploadedFile;
use std::fs;
use std::io::Read;
use std::path::{Path, PathBuf};

#[derive(Parser)]
#[command(name = "keeper")]
#[command(about = "Accession submission server for library digital collections", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Start HTTP server
    Serve {
        /// Port to listen on (default: KEEPER_PORT or 3000)
        #[arg(short, long)]
        port: Option<u16>,

        /// Storage root for accessions (default: KEEPER_UPLOAD_DIR or ./media)
        #[arg(long)]
        upload_dir: Option<PathBuf>,

        /// Built frontend to serve (default: KEEPER_STATIC_DIR or ./frontend/dist)
        #[arg(long)]
        static_dir: Option<PathBuf>,

        /// Skip reCAPTCHA verification
        #[arg(long)]
        debug: bool,
    },

    /// Check a local file the way submissions are checked
    CheckFile {
        /// File to check
        input: PathBuf,

        /// Size limit in bytes (default: KEEPER_MAX_UPLOAD_SIZE or 4 GB)
        #[arg(long)]
        max_size: Option<u64>,
    },

    /// Show accepted MIME patterns and their icons
    AcceptedTypes,
}

#[tokio::main]
async fn main() {
    // Load .env file (if present)
    dotenvy::dotenv().ok();

    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Serve {
            port,
            upload_dir,
            static_dir,
            debug,
        } => cmd_serve(port, upload_dir, static_dir, debug).await,

        Commands::CheckFile { input, max_size } => cmd_check_file(&input, max_size),

        Commands::AcceptedTypes => cmd_accepted_types(),
    };

    if let Err(e) = result {
        eprintln!("❌ Error: {}", e);
        std::process::exit(1);
    }
}

async fn cmd_serve(
    port: Option<u16>,
    upload_dir: Option<PathBuf>,
    static_dir: Option<PathBuf>,
    debug: bool,
) -> Result<(), Box<dyn std::error::Error>> {
    let mut settings = Settings::from_env()?;
    if let Some(port) = port {
        settings.port = port;
    }
    if let Some(dir) = upload_dir {
        settings.upload_dir = dir;
    }
    if let Some(dir) = static_dir {
        settings.static_dir = dir;
    }
    settings.debug |= debug;

    keeper::server::start_server(settings).await
}

fn cmd_check_file(input: &Path, max_size: Option<u64>) -> Result<(), Box<dyn std::error::Error>> {
    eprintln!("🔍 Checking: {}", input.display());

    let max_size = match max_size {
        Some(size) => size,
        None => Settings::from_env()?.max_upload_size,
    };

    let size = fs::metadata(input)?.len();
    let mut head = Vec::with_capacity(SNIFF_LEN);
    fs::File::open(input)?
        .take(SNIFF_LEN as u64)
        .read_to_end(&mut head)?;

    let upload = UploadedFile {
        file_name: input
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_default(),
        declared_type: String::new(),
        size,
        head,
        staged_path: input.to_path_buf(),
        description: String::new(),
    };

    match validate_file(&upload, max_size) {
        Ok(mime) => {
            eprintln!("   Size: {} bytes", size);
            eprintln!("   Type: {} (icon: {})", mime, icon_for(mime));
            eprintln!("✅ File would be accepted");
            Ok(())
        }
        Err(messages) => {
            for message in &messages {
                eprintln!("   - {}", message);
            }
            Err(format!("{} would be rejected", upload.file_name).into())
        }
    }
}

fn cmd_accepted_types() -> Result<(), Box<dyn std::error::Error>> {
    println!("📋 Accepted file types ({}):\n", ACCEPTED_FILE_TYPES.len());
    for (pattern, icon) in ACCEPTED_FILE_TYPES {
        println!("  {:<22} {}", pattern, icon);
    }
    Ok(())
}
