use ragserve_core::{RagError, RagResult};
use std::path::Path;
use tracing::info;

/// Split a text blob into documents: one per non-empty trimmed line.
pub fn split_documents(text: &str) -> Vec<String> {
    text.lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(str::to_string)
        .collect()
}

/// Read a UTF-8 corpus file and split it into documents.
///
/// Fails with [`RagError::SourceNotFound`] when the file does not exist and
/// [`RagError::EmptyCorpus`] when it holds no non-empty lines.
pub async fn load_corpus(path: &Path) -> RagResult<Vec<String>> {
    let text = match tokio::fs::read_to_string(path).await {
        Ok(text) => text,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            return Err(RagError::SourceNotFound(path.to_path_buf()));
        }
        Err(e) => return Err(e.into()),
    };

    let documents = split_documents(&text);
    if documents.is_empty() {
        return Err(RagError::EmptyCorpus(format!(
            "{} has no non-empty lines",
            path.display()
        )));
    }

    info!(path = %path.display(), documents = documents.len(), "Corpus loaded");
    Ok(documents)
}
