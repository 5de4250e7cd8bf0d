use std::path::{Path, PathBuf};

use anyhow::Context;
use dotsym::{CancellationToken, SourceLink, SymbolResolver};
use serde::Serialize;

use crate::{app::GlobalOptions, output::print_output};

#[derive(Debug, Serialize)]
pub struct SourceDocument {
    pub document: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub path: Option<PathBuf>,
}

pub async fn run(
    source_link: &Path,
    document: &str,
    opts: &GlobalOptions,
    cancel: &CancellationToken,
) -> anyhow::Result<()> {
    let json = std::fs::read_to_string(source_link)
        .with_context(|| format!("failed to read: {}", source_link.display()))?;
    let link = SourceLink::from_json(&json)?;
    let resolver = SymbolResolver::new(opts.config()?)?;

    let source = SourceDocument {
        document: document.to_string(),
        url: link.resolve(document),
        path: resolver.resolve_source_link(&link, document, cancel).await,
    };

    print_output(&source, opts, |source| match (&source.url, &source.path) {
        (Some(_), Some(path)) => println!("{}", path.display()),
        (Some(url), None) => println!("Could not download {url}"),
        (None, _) => println!("{} is not covered by the Source Link document", source.document),
    })
}
