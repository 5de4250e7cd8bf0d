use std::path::Path;

use anyhow::Context;
use dotsym::{DebugDirectory, SymbolIndex};
use serde::Serialize;

use crate::{app::GlobalOptions, output::print_output};

#[derive(Debug, Serialize)]
pub struct DebugInfo {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pdb_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub original_path: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub symbol_index: Option<String>,
    pub checksums: Vec<String>,
}

pub fn run(path: &Path, opts: &GlobalOptions) -> anyhow::Result<()> {
    let debug = DebugDirectory::from_path(path)
        .with_context(|| format!("failed to read debug directory: {}", path.display()))?;

    let info = DebugInfo {
        pdb_id: debug.info.as_ref().map(|info| info.identifier.to_string()),
        original_path: debug.info.as_ref().map(|info| info.original_path.clone()),
        symbol_index: debug
            .info
            .as_ref()
            .and_then(SymbolIndex::new)
            .map(|index| index.to_string()),
        checksums: debug.checksums.iter().map(ToString::to_string).collect(),
    };

    print_output(&info, opts, |info| {
        match (&info.pdb_id, &info.original_path, &info.symbol_index) {
            (Some(id), Some(original), Some(index)) => {
                println!("PDB id:        {id}");
                println!("Original path: {original}");
                println!("Symbol index:  {index}");
            }
            _ => println!("No portable PDB CodeView record"),
        }
        if !info.checksums.is_empty() {
            println!("\nChecksums:");
            for checksum in &info.checksums {
                println!("  {checksum}");
            }
        }
    })
}
