use std::path::{Path, PathBuf};

use anyhow::Context;
use dotsym::{CancellationToken, DebugDirectory, SymbolResolver};
use serde::Serialize;

use crate::{app::GlobalOptions, output::print_output};

#[derive(Debug, Serialize)]
pub struct Resolution {
    pub image: PathBuf,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pdb: Option<PathBuf>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}

pub async fn run(
    path: &Path,
    allow_remote: bool,
    opts: &GlobalOptions,
    cancel: &CancellationToken,
) -> anyhow::Result<()> {
    let resolver = SymbolResolver::new(opts.config()?)?;
    let debug = DebugDirectory::from_path(path)
        .with_context(|| format!("failed to read debug directory: {}", path.display()))?;

    let outcome = resolver
        .try_resolve_symbol_file(&debug, allow_remote, cancel)
        .await;

    let resolution = Resolution {
        image: path.to_path_buf(),
        reason: outcome.as_ref().err().map(ToString::to_string),
        pdb: outcome.ok(),
    };

    print_output(&resolution, opts, |resolution| match &resolution.pdb {
        Some(pdb) => println!("{}", pdb.display()),
        None => println!(
            "No PDB found: {}",
            resolution.reason.as_deref().unwrap_or("unknown")
        ),
    })
}
