//! Blocklist ingestion.
//!
//! A source is either a local file path or an http(s) URL serving one
//! domain per line. Each load builds a complete [`Blocklist`] or fails
//! without touching the currently installed rules.

use thiserror::Error;

use super::Blocklist;

/// The blocklist source could not be read; previous rules stay live.
#[derive(Debug, Error)]
pub enum SourceError {
    #[error("cannot read blocklist file '{path}': {source}")]
    File {
        path: String,
        source: std::io::Error,
    },
    #[error("cannot fetch blocklist from '{url}': {source}")]
    Fetch {
        url: String,
        source: reqwest::Error,
    },
}

/// Load and parse a full rule set from `source`.
pub async fn load_rules(source: &str) -> Result<Blocklist, SourceError> {
    let text = if source.starts_with("http://") || source.starts_with("https://") {
        fetch_url(source).await?
    } else {
        tokio::fs::read_to_string(source)
            .await
            .map_err(|e| SourceError::File {
                path: source.to_string(),
                source: e,
            })?
    };

    Ok(Blocklist::parse(&text))
}

async fn fetch_url(url: &str) -> Result<String, SourceError> {
    let wrap = |source| SourceError::Fetch {
        url: url.to_string(),
        source,
    };

    reqwest::get(url)
        .await
        .map_err(wrap)?
        .error_for_status()
        .map_err(wrap)?
        .text()
        .await
        .map_err(wrap)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn load_rules_reads_file() {
        let dir = std::env::temp_dir().join("sinkhole-source-test");
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join("list.txt");
        std::fs::write(&path, "ads.example.com\ntracker.net\n").unwrap();

        let rules = load_rules(path.to_str().unwrap()).await.unwrap();

        assert_eq!(rules.len(), 2);
        assert_eq!(rules.matches("ads.example.com."), Some(1));
    }

    #[tokio::test]
    async fn missing_file_is_source_error() {
        let err = load_rules("/nonexistent/sinkhole-list.txt")
            .await
            .unwrap_err();

        assert!(matches!(err, SourceError::File { .. }));
    }
}
