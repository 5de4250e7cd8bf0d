use std::{path::PathBuf, time::Duration};

use clap::{Parser, Subcommand};
use dotsym::{symbols::config::parse_servers, ResolverConfig};

/// dotsym - locate portable PDBs and Source Link documents for .NET executables
#[derive(Debug, Parser)]
#[command(name = "dotsym", version, about, long_about = None)]
pub struct Cli {
    #[command(flatten)]
    pub global: GlobalOptions,

    #[command(subcommand)]
    pub command: Command,
}

/// Options shared across all subcommands.
#[derive(Debug, Parser)]
pub struct GlobalOptions {
    /// Emit output as JSON instead of human-readable text.
    #[arg(long, global = true)]
    pub json: bool,

    /// Enable verbose (debug-level) logging output.
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Emit log records as JSON lines.
    #[arg(long, global = true)]
    pub log_json: bool,

    /// Cache directory (overrides DOTSYM_CACHE_DIR).
    #[arg(long, global = true, value_name = "DIR")]
    pub cache_dir: Option<PathBuf>,

    /// Symbol server base url; repeat for several (overrides DOTSYM_SYMBOL_SERVERS).
    #[arg(long = "server", global = true, value_name = "URL")]
    pub servers: Vec<String>,

    /// Per-request timeout in seconds (overrides DOTSYM_TIMEOUT_SECS).
    #[arg(long, global = true, value_name = "SECS")]
    pub timeout: Option<u64>,
}

impl GlobalOptions {
    /// The environment configuration with command line overrides applied.
    pub fn config(&self) -> anyhow::Result<ResolverConfig> {
        let mut config = ResolverConfig::from_env()?;

        if let Some(dir) = &self.cache_dir {
            config = config.with_cache_root(dir);
        }
        if !self.servers.is_empty() {
            config = config.with_servers(parse_servers(&self.servers.join(";"))?);
        }
        if let Some(secs) = self.timeout {
            config = config.with_timeout(Duration::from_secs(secs));
        }

        Ok(config)
    }
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Show the debug directory of an executable: PDB id, path, index and checksums.
    Info {
        /// Path to the .NET executable.
        #[arg(value_name = "FILE")]
        path: PathBuf,
    },

    /// Resolve the portable PDB of an executable to a local file.
    Resolve {
        /// Path to the .NET executable.
        #[arg(value_name = "FILE")]
        path: PathBuf,

        /// Only consult the local cache.
        #[arg(long)]
        offline: bool,
    },

    /// Check a PDB file against the checksums recorded in an executable.
    Validate {
        /// Path to the portable PDB.
        #[arg(value_name = "PDB")]
        pdb: PathBuf,

        /// Path to the .NET executable the PDB belongs to.
        #[arg(short, long, value_name = "FILE")]
        image: PathBuf,
    },

    /// Download a source document through a Source Link mapping.
    Source {
        /// Path to the Source Link JSON document.
        #[arg(value_name = "SOURCELINK")]
        source_link: PathBuf,

        /// Build-time path of the document, as recorded in the PDB.
        #[arg(value_name = "DOCUMENT")]
        document: String,
    },
}
