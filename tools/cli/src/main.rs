//! InkVault CLI - Command line interface for encrypted note vaults.
//!
//! This tool creates vaults, runs edit sessions (unlock, hand the
//! workspace to an editor, lock), and recovers from crashed sessions.

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::mpsc;
use std::thread;
use std::time::Duration;
use tracing::{info, Level};
use tracing_subscriber::FmtSubscriber;

use inkvault_common::{Error, NodeId, SecretBytes};
use inkvault_crypto::{derive_master_key, derive_vault_key, Container};
use inkvault_io::DEFAULT_PASSES;
use inkvault_session::{
    find_stale_workspaces, launch_editor, purge_stale_workspaces, SessionConfig, SessionManager,
};
use inkvault_vault::{discover_vaults, IndexNode, NodeKind, VaultIndex, VaultLayout, VaultManager};

#[derive(Parser)]
#[command(name = "inkvault")]
#[command(about = "InkVault - Notes that stay encrypted at rest")]
#[command(version)]
struct Cli {
    /// Enable verbose logging.
    #[arg(short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Create a new vault.
    Create {
        /// Vault display name.
        #[arg(short, long)]
        name: String,

        /// Path for the new vault directory.
        #[arg(short, long)]
        path: PathBuf,
    },

    /// Unlock a vault into a workspace, edit, and lock it again.
    Edit {
        /// Path to the vault.
        #[arg(short, long)]
        path: PathBuf,

        /// Editor command to launch on the workspace.
        #[arg(short, long)]
        editor: Option<String>,

        /// Directory for plaintext workspaces.
        #[arg(long)]
        scratch_dir: Option<PathBuf>,

        /// Overwrite passes used when destroying plaintext.
        #[arg(long, default_value_t = DEFAULT_PASSES)]
        passes: u32,

        /// Lock automatically after this many seconds.
        #[arg(long)]
        auto_lock: Option<u64>,
    },

    /// Show the note tree of a vault.
    Tree {
        /// Path to the vault.
        #[arg(short, long)]
        path: PathBuf,
    },

    /// Find vaults under a directory.
    Discover {
        /// Root directory to scan.
        #[arg(short, long, default_value = ".")]
        root: PathBuf,
    },

    /// Show vault information.
    Info {
        /// Path to the vault.
        #[arg(short, long)]
        path: PathBuf,
    },

    /// Purge workspaces left behind by a crashed session.
    Recover {
        /// Directory for plaintext workspaces.
        #[arg(long)]
        scratch_dir: Option<PathBuf>,

        /// Overwrite passes used when destroying plaintext.
        #[arg(long, default_value_t = DEFAULT_PASSES)]
        passes: u32,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Setup logging
    let level = if cli.verbose {
        Level::DEBUG
    } else {
        Level::INFO
    };

    let subscriber = FmtSubscriber::builder()
        .with_max_level(level)
        .with_target(false)
        .compact()
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    match cli.command {
        Commands::Create { name, path } => cmd_create(&name, &path),

        Commands::Edit {
            path,
            editor,
            scratch_dir,
            passes,
            auto_lock,
        } => cmd_edit(&path, session_config(scratch_dir, passes, auto_lock, editor)),

        Commands::Tree { path } => cmd_tree(&path),

        Commands::Discover { root } => cmd_discover(&root),

        Commands::Info { path } => cmd_info(&path),

        Commands::Recover {
            scratch_dir,
            passes,
        } => cmd_recover(session_config(scratch_dir, passes, None, None)),
    }
}

/// Prompt for a password without echoing it.
fn prompt_password(prompt: &str) -> Result<SecretBytes> {
    let password = rpassword::prompt_password(prompt).context("Failed to read password")?;
    Ok(SecretBytes::new(password.into_bytes()))
}

fn session_config(
    scratch_dir: Option<PathBuf>,
    passes: u32,
    auto_lock: Option<u64>,
    editor: Option<String>,
) -> SessionConfig {
    let mut config = SessionConfig::default();
    if let Some(dir) = scratch_dir {
        config.scratch_dir = dir;
    }
    config.secure_delete_passes = passes;
    config.auto_lock_timeout = auto_lock.map(Duration::from_secs);
    config.editor_command = editor;
    config
}

/// Decrypt a vault's index in memory, without creating a workspace.
fn open_index(path: &Path, password: &SecretBytes) -> Result<VaultIndex> {
    let layout = VaultLayout::new(path);
    let vault_id = layout
        .vault_id()
        .with_context(|| format!("No vault at {}", path.display()))?;

    let raw = fs::read(layout.index_path()).context("Failed to read vault index")?;
    let container = Container::decode(&raw).context("Failed to decode vault index")?;

    let (master_key, _) = derive_master_key(password.as_bytes(), Some(&container.header.salt))?;
    let vault_key = derive_vault_key(&master_key, &vault_id);

    let index = VaultIndex::decrypt_from_storage(
        &container.ciphertext,
        &vault_key,
        container.header.nonce.as_bytes(),
    )
    .context("Failed to decrypt vault index")?;
    Ok(index)
}

/// Create a new vault.
fn cmd_create(name: &str, path: &Path) -> Result<()> {
    info!("Creating new vault: {}", name);

    let password = prompt_password("Enter password: ")?;
    let confirm = prompt_password("Confirm password: ")?;

    if password.as_bytes() != confirm.as_bytes() {
        bail!("Passwords do not match");
    }

    let vault_id = VaultManager::new()
        .create_vault(path, password.as_bytes(), name)
        .context("Failed to create vault")?;

    println!("Vault created successfully!");
    println!("  ID: {}", vault_id);
    println!("  Location: {}", path.display());

    Ok(())
}

/// Run a full edit session: unlock, edit, lock.
fn cmd_edit(path: &Path, config: SessionConfig) -> Result<()> {
    info!("Opening edit session for vault at {}", path.display());

    // Crashed sessions first; their workspaces still hold plaintext
    let stale = purge_stale_workspaces(&config).context("Failed to purge stale workspaces")?;
    if !stale.is_empty() {
        println!("Purged {} stale workspace(s) from a previous session.", stale.len());
    }

    let password = prompt_password("Enter password: ")?;

    let mut manager = SessionManager::new(path, config.clone());
    manager
        .unlock(password.as_bytes())
        .context("Failed to unlock vault")?;

    let workspace = manager
        .workspace_root()
        .context("No workspace after unlock")?
        .to_path_buf();
    println!("Vault unlocked.");
    println!("  Workspace: {}", workspace.display());

    if let Some(command) = &config.editor_command {
        // The child is deliberately not awaited; GUI editors detach
        match launch_editor(command, &workspace) {
            Ok(_child) => println!("  Editor: {}", command),
            Err(e) => eprintln!("Could not launch editor: {}", e),
        }
    }

    match config.auto_lock_timeout {
        Some(timeout) => {
            println!(
                "Press Enter to lock (auto-lock in {} seconds)...",
                timeout.as_secs()
            );
            if !wait_for_enter(Some(timeout)) {
                println!("Auto-lock timeout reached; locking.");
            }
        }
        None => {
            println!("Press Enter to lock...");
            wait_for_enter(None);
        }
    }

    match manager.lock() {
        Ok(report) => {
            println!("Vault locked.");
            println!(
                "  {} re-encrypted, {} new, {} removed",
                report.reencrypted, report.added, report.removed
            );
            Ok(())
        }
        Err(Error::DeletionBlocked(blocked)) => {
            eprintln!("Some plaintext could not be erased:");
            for (path, reason) in blocked.entries() {
                eprintln!("  {} ({})", path.display(), reason);
            }
            bail!("Vault saved, but the workspace was not fully destroyed; fix the paths above and run `inkvault recover`");
        }
        Err(e) => Err(e).context("Failed to lock vault"),
    }
}

/// Block until the user presses Enter, or until `timeout` elapses.
/// Returns false on timeout.
fn wait_for_enter(timeout: Option<Duration>) -> bool {
    let (tx, rx) = mpsc::channel();
    thread::spawn(move || {
        let mut line = String::new();
        let _ = io::stdin().read_line(&mut line);
        let _ = tx.send(());
    });

    match timeout {
        Some(timeout) => rx.recv_timeout(timeout).is_ok(),
        None => {
            let _ = rx.recv();
            true
        }
    }
}

/// Print the note tree without materializing any plaintext.
fn cmd_tree(path: &Path) -> Result<()> {
    let password = prompt_password("Enter password: ")?;
    let index = open_index(path, &password)?;

    let root = index
        .root_id()
        .context("Vault index has no root folder")?;
    if let Some(node) = index.node(root) {
        println!("{}/", node.name);
    }
    print_subtree(&index, root, 1);

    Ok(())
}

fn print_subtree(index: &VaultIndex, id: &NodeId, depth: usize) {
    let mut children: Vec<&IndexNode> = index
        .children(id)
        .iter()
        .filter_map(|child| index.node(child))
        .collect();
    children.sort_by_key(|node| (node.kind != NodeKind::Folder, node.name.clone()));

    for node in children {
        let indent = "  ".repeat(depth);
        match node.kind {
            NodeKind::Folder => {
                println!("{}{}/", indent, node.name);
                print_subtree(index, &node.id, depth + 1);
            }
            NodeKind::File => println!("{}{}", indent, node.name),
        }
    }
}

/// Find vaults under a directory.
fn cmd_discover(root: &Path) -> Result<()> {
    let found = discover_vaults(root).context("Failed to scan for vaults")?;

    if found.is_empty() {
        println!("No vaults found under {}", root.display());
    } else {
        println!("Found {} vault(s):", found.len());
        for path in found {
            println!("  {}", path.display());
        }
    }

    Ok(())
}

/// Show vault information. Reads only public header fields; no password
/// is required and nothing is decrypted.
fn cmd_info(path: &Path) -> Result<()> {
    let layout = VaultLayout::new(path);
    let vault_id = layout
        .vault_id()
        .with_context(|| format!("No vault at {}", path.display()))?;

    let raw = fs::read(layout.index_path()).context("Failed to read vault index")?;
    let container = Container::decode(&raw).context("Failed to decode vault index")?;
    let header = &container.header;

    let blobs = layout.list_blobs().context("Failed to list vault contents")?;
    let total_bytes: u64 = blobs
        .iter()
        .filter_map(|blob| fs::metadata(blob).ok())
        .map(|meta| meta.len())
        .sum();

    println!("Vault information:");
    println!("  ID: {}", vault_id);
    println!("  Location: {}", layout.root().display());
    println!("  Format: {} v{}", header.magic, header.version);
    println!("  Cipher: {}", header.cipher);
    println!("  KDF: {}", header.kdf);
    println!("    Memory: {} KiB", header.kdf_params.memory_cost);
    println!("    Time: {} iterations", header.kdf_params.time_cost);
    println!("    Parallelism: {}", header.kdf_params.parallelism);
    println!("  Notes: {} encrypted blob(s), {} bytes", blobs.len(), total_bytes);

    Ok(())
}

/// Purge stale workspaces.
fn cmd_recover(config: SessionConfig) -> Result<()> {
    let stale = find_stale_workspaces(&config).context("Failed to scan scratch directory")?;
    if stale.is_empty() {
        println!(
            "No stale workspaces under {}",
            config.scratch_dir.display()
        );
        return Ok(());
    }

    match purge_stale_workspaces(&config) {
        Ok(purged) => {
            println!("Purged {} workspace(s):", purged.len());
            for path in purged {
                println!("  {}", path.display());
            }
            Ok(())
        }
        Err(Error::DeletionBlocked(blocked)) => {
            eprintln!("Some plaintext could not be erased:");
            for (path, reason) in blocked.entries() {
                eprintln!("  {} ({})", path.display(), reason);
            }
            bail!("Remove the paths above manually, then run `inkvault recover` again");
        }
        Err(e) => Err(e).context("Failed to purge stale workspaces"),
    }
}
