// ============================================================================
// stylegen — command-line front end for the StyleGen workflow
// ============================================================================
// Usage:
//   stylegen verify <key>                       Validate and store an API key
//   stylegen status                             Show authentication status
//   stylegen logout                             Erase the stored API key
//   stylegen generate --image photo.jpg \
//       --style oil | --prompt "ink wash"       Run a style transfer
// ============================================================================

use anyhow::{anyhow, Context, Result};
use base64::{engine::general_purpose::STANDARD, Engine};
use clap::{Parser, Subcommand};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use stylegen_core::{
    redact_credential, AppConfig, AuthSession, AuthStatus, CredentialStore, ImageRef,
    RedbCredentialStore, StyleChoice, StyleTransferExecutor, WorkflowController, WorkflowStep,
};

/// StyleGen: AI image style transfer from the command line
#[derive(Parser)]
#[command(name = "stylegen", version, about = "Apply AI style transfer to local images")]
struct Cli {
    /// Path to the credential database (default: ~/.stylegen/stylegen.redb)
    #[arg(long, global = true)]
    db_path: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Validate an API key and store it for later runs
    Verify {
        /// Raw key, `sk-...` or `sk:...`
        key: String,
    },

    /// Show the current authentication status
    Status,

    /// Erase the stored API key
    Logout,

    /// Run a style transfer on a local image
    Generate {
        /// Source image file (jpg, png, webp)
        #[arg(long)]
        image: PathBuf,

        /// Catalog style identifier
        #[arg(long, conflicts_with = "prompt")]
        style: Option<String>,

        /// Free-text style prompt
        #[arg(long)]
        prompt: Option<String>,

        /// Download the generated image to this path
        #[arg(long)]
        out: Option<PathBuf>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();
    let store: Arc<dyn CredentialStore> =
        Arc::new(RedbCredentialStore::open(cli.db_path.as_deref())?);

    match cli.command {
        Commands::Verify { key } => cmd_verify(store, &key),
        Commands::Status => cmd_status(store),
        Commands::Logout => cmd_logout(store),
        Commands::Generate {
            image,
            style,
            prompt,
            out,
        } => cmd_generate(store, &image, style, prompt, out).await,
    }
}

fn cmd_verify(store: Arc<dyn CredentialStore>, key: &str) -> Result<()> {
    let mut session = AuthSession::resume(store);

    if session.verify(key) {
        let stored = session
            .current_credential()
            .unwrap_or_default();
        println!("Key accepted. Stored as {}", redact_credential(&stored));
        Ok(())
    } else {
        anyhow::bail!("Invalid key format: keys must start with `sk-` or `sk:`");
    }
}

fn cmd_status(store: Arc<dyn CredentialStore>) -> Result<()> {
    let session = AuthSession::resume(store);

    match session.status() {
        AuthStatus::Success => {
            let stored = session.current_credential().unwrap_or_default();
            println!("Authenticated ({})", redact_credential(&stored));
        }
        _ => println!("Not authenticated. Run `stylegen verify <key>` first."),
    }
    Ok(())
}

fn cmd_logout(store: Arc<dyn CredentialStore>) -> Result<()> {
    let mut session = AuthSession::resume(store);
    session.logout();
    println!("Logged out; stored key erased.");
    Ok(())
}

async fn cmd_generate(
    store: Arc<dyn CredentialStore>,
    image_path: &Path,
    style: Option<String>,
    prompt: Option<String>,
    out: Option<PathBuf>,
) -> Result<()> {
    let choice = match (style, prompt) {
        (Some(id), None) => StyleChoice::Catalog(id),
        (None, Some(text)) => StyleChoice::Custom(text),
        _ => anyhow::bail!("Choose a style with --style <id> or --prompt <text>"),
    };

    let config = AppConfig::default();
    if store.get()?.is_none() && config.demo_api_key.is_none() {
        anyhow::bail!("No API key stored. Run `stylegen verify <key>` first.");
    }

    let image = load_image(image_path)?;
    let executor = StyleTransferExecutor::new(config, store)?;
    let mut controller = WorkflowController::new(executor);

    controller.upload_image(image);
    controller.choose_style(choice);
    if !controller.can_generate() {
        anyhow::bail!("Workflow refused the generation request");
    }

    println!("Generating (step {}/4)...", WorkflowStep::Generating.ordinal());
    let state = controller
        .run_generation(|progress| {
            print!("\rPROCESSING {:>3}%", progress);
            let _ = std::io::stdout().flush();
        })
        .await;
    println!();

    match (&state.generated, &state.error) {
        (Some(generated), _) => {
            if generated.demo_fallback {
                println!("Demo mode: returning the source image as a placeholder result.");
            }
            println!("Result: {}", generated.url);
            if let Some(out_path) = out {
                save_result(&generated.url, &out_path).await?;
                println!("Saved to {}", out_path.display());
            }
            Ok(())
        }
        (None, Some(message)) => {
            eprintln!("Re-run the command to retry.");
            Err(anyhow!("Generation failed: {}", message))
        }
        (None, None) => Err(anyhow!("Generation settled without a result")),
    }
}

/// Read a local file into a data-URL image reference
fn load_image(path: &Path) -> Result<ImageRef> {
    let bytes = std::fs::read(path)
        .with_context(|| format!("Failed to read image {}", path.display()))?;
    let mime = mime_guess::from_path(path)
        .first_or_octet_stream()
        .to_string();
    Ok(ImageRef::from_bytes(&mime, &bytes))
}

/// Write the generated image to disk. Demo-mode placeholders come back as
/// data URLs, everything else as a retrievable https reference.
async fn save_result(url: &str, out_path: &Path) -> Result<()> {
    let bytes: Vec<u8> = if let Some(b64) = data_url_base64(url) {
        STANDARD
            .decode(b64)
            .map_err(|e| anyhow!("Failed to decode data URL: {}", e))?
    } else {
        reqwest::get(url)
            .await
            .with_context(|| format!("Failed to download {}", url))?
            .error_for_status()
            .context("Download returned an error status")?
            .bytes()
            .await
            .context("Failed to read download body")?
            .to_vec()
    };

    if let Some(parent) = out_path.parent() {
        tokio::fs::create_dir_all(parent)
            .await
            .map_err(|e| anyhow!("Failed to create directory: {}", e))?;
    }
    tokio::fs::write(out_path, &bytes)
        .await
        .map_err(|e| anyhow!("Failed to save image: {}", e))?;

    Ok(())
}

/// Extract the base64 payload of a data URL, if `url` is one
fn data_url_base64(url: &str) -> Option<&str> {
    if !url.starts_with("data:") {
        return None;
    }
    let comma_idx = url.find(',')?;
    Some(&url[(comma_idx + 1)..])
}
