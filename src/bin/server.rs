use anyhow::Context;
use clap::Parser;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

use passkeep::{KdfParams, Server, ServerConfig, ShutdownToken};

#[derive(Debug, clap::Args)]
struct Argon2Args {
    /// Argon2 memory cost in KiB (default: 65536)
    #[arg(long = "argon-mem")]
    mem_cost_kib: Option<u32>,

    /// Argon2 time cost / iterations (default: 3)
    #[arg(long = "argon-time")]
    time_cost: Option<u32>,

    /// Argon2 parallelism (default: 1)
    #[arg(long = "argon-parallelism")]
    parallelism: Option<u32>,
}

impl Argon2Args {
    fn to_kdf_params(&self) -> anyhow::Result<KdfParams> {
        let default = KdfParams::default();
        Ok(KdfParams::new(
            self.mem_cost_kib.unwrap_or(default.mem_cost_kib()),
            self.time_cost.unwrap_or(default.time_cost()),
            self.parallelism.unwrap_or(default.parallelism()),
        )?)
    }
}

#[derive(Debug, Parser)]
#[command(name = "passkeep-server")]
#[command(version, about = "passkeep vault server")]
struct Cli {
    /// Address to listen on
    #[arg(long, value_name = "ADDR", env = "PASSKEEP_LISTEN", default_value = "0.0.0.0:8080")]
    listen: String,

    /// Data directory holding the record file and vault blobs.
    /// Defaults to the platform data directory.
    #[arg(long, value_name = "PATH", env = "PASSKEEP_DATA_DIR")]
    data_dir: Option<PathBuf>,

    /// Mnemonic dictionary: 2048 newline-separated words
    #[arg(long, value_name = "PATH", env = "PASSKEEP_WORDLIST", default_value = "english.txt")]
    wordlist: PathBuf,

    #[command(flatten)]
    argon2: Argon2Args,
}

fn default_data_dir() -> anyhow::Result<PathBuf> {
    let project_dirs = directories::ProjectDirs::from("", "", "passkeep")
        .context("could not determine platform directories")?;
    Ok(project_dirs.data_dir().to_path_buf())
}

fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive("info".parse()?))
        .init();

    let cli = Cli::parse();
    let kdf = cli.argon2.to_kdf_params()?;
    let data_dir = match cli.data_dir {
        Some(path) => path,
        None => default_data_dir()?,
    };

    let config = ServerConfig {
        bind_addr: cli.listen,
        users_file: data_dir.join("users.json"),
        vault_dir: data_dir.join("vaults"),
        wordlist: cli.wordlist,
        kdf,
    };

    let shutdown = ShutdownToken::new();
    let handle = shutdown.clone();
    ctrlc::set_handler(move || {
        tracing::info!("interrupt received, shutting down");
        handle.trigger();
    })
    .context("failed to install interrupt handler")?;

    let server = Server::bind(config, shutdown)?;
    server.run()?;
    Ok(())
}
