use anyhow::{bail, Context, Result};
use std::path::Path;
use tokio::io::AsyncReadExt as _;

pub async fn read_file_to_string_async(path: &Path) -> Result<String> {
    if !path.exists() {
        bail!("file not found: {}", path.display());
    }
    let data = tokio::fs::read_to_string(path)
        .await
        .with_context(|| format!("reading file: {}", path.display()))?;
    Ok(data)
}

/// Document text from `path`, or from stdin when the path is absent or `-`.
pub async fn read_document(path: Option<&Path>) -> Result<String> {
    match path {
        Some(p) if p != Path::new("-") => read_file_to_string_async(p).await,
        _ => {
            let mut text = String::new();
            tokio::io::stdin()
                .read_to_string(&mut text)
                .await
                .context("reading document from stdin")?;
            Ok(text)
        }
    }
}
