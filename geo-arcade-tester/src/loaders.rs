//! Country data sources: the bundled asset, a local file, or a one-shot HTTP fetch.
use geo_arcade_game::{BUNDLED_COUNTRIES_JSON, DataLoader, RawCountry};
use std::fs;
use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

const FETCH_TIMEOUT: Duration = Duration::from_secs(15);

#[derive(Debug, Error)]
pub enum LoadError {
    #[error("failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse country records: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("country data unavailable: {0}")]
    Unavailable(String),
}

/// Where the tester gets its country records from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DatasetSource {
    Bundled,
    File(PathBuf),
    Fetch(String),
}

impl DatasetSource {
    #[must_use]
    pub fn describe(&self) -> String {
        match self {
            Self::Bundled => "bundled asset".to_string(),
            Self::File(path) => path.display().to_string(),
            Self::Fetch(url) => url.clone(),
        }
    }
}

/// Loader handed to the engine once the source has been resolved.
#[derive(Debug, Clone)]
pub enum SourceLoader {
    Bundled,
    File(PathBuf),
    Fetched(Vec<RawCountry>),
    /// The fetch failed; loading reports the reason and the game starts empty.
    Unavailable(String),
}

impl DataLoader for SourceLoader {
    type Error = LoadError;

    fn load_countries(&self) -> Result<Vec<RawCountry>, Self::Error> {
        match self {
            Self::Bundled => Ok(serde_json::from_str(BUNDLED_COUNTRIES_JSON)?),
            Self::File(path) => {
                let text = fs::read_to_string(path).map_err(|source| LoadError::Io {
                    path: path.clone(),
                    source,
                })?;
                Ok(serde_json::from_str(&text)?)
            }
            Self::Fetched(records) => Ok(records.clone()),
            Self::Unavailable(reason) => Err(LoadError::Unavailable(reason.clone())),
        }
    }
}

/// Resolve `source` into a loader, performing the HTTP fetch if needed.
/// A failed fetch is not an error here; it surfaces when the data is loaded.
pub async fn resolve_loader(source: &DatasetSource) -> SourceLoader {
    match source {
        DatasetSource::Bundled => SourceLoader::Bundled,
        DatasetSource::File(path) => SourceLoader::File(path.clone()),
        DatasetSource::Fetch(url) => match fetch_countries(url).await {
            Ok(records) => {
                log::info!("fetched {} country records from {url}", records.len());
                SourceLoader::Fetched(records)
            }
            Err(err) => {
                log::warn!("country fetch from {url} failed: {err}");
                SourceLoader::Unavailable(err.to_string())
            }
        },
    }
}

async fn fetch_countries(url: &str) -> Result<Vec<RawCountry>, reqwest::Error> {
    let client = reqwest::Client::builder().timeout(FETCH_TIMEOUT).build()?;
    client
        .get(url)
        .send()
        .await?
        .error_for_status()?
        .json::<Vec<RawCountry>>()
        .await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::util::temp_path;
    use geo_arcade_game::Dataset;

    #[test]
    fn bundled_loader_yields_playable_records() {
        let records = SourceLoader::Bundled.load_countries().unwrap();
        assert!(Dataset::from_records(&records).is_playable());
    }

    #[test]
    fn file_loader_reads_api_shape() {
        let path = temp_path("countries.json");
        fs::write(
            &path,
            r#"[{"name":{"common":"Iceland"},"population":393600,"area":103000,"region":"Europe","flags":{"png":"is.png"}},
               {"name":{"common":"Malta"},"population":542051,"area":316,"region":"Europe","flags":{"png":"mt.png"}}]"#,
        )
        .unwrap();
        let records = SourceLoader::File(path).load_countries().unwrap();
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].name.common, "Iceland");
    }

    #[test]
    fn missing_file_and_bad_json_are_errors() {
        let missing = SourceLoader::File(temp_path("absent.json")).load_countries();
        assert!(matches!(missing, Err(LoadError::Io { .. })));

        let path = temp_path("broken.json");
        fs::write(&path, "{").unwrap();
        let broken = SourceLoader::File(path).load_countries();
        assert!(matches!(broken, Err(LoadError::Parse(_))));
    }

    #[test]
    fn unreachable_fetch_resolves_to_unavailable() {
        let source = DatasetSource::Fetch("http://127.0.0.1:9/countries".to_string());
        let loader = tokio_test::block_on(resolve_loader(&source));
        assert!(matches!(loader, SourceLoader::Unavailable(_)));
        assert!(matches!(
            loader.load_countries(),
            Err(LoadError::Unavailable(_))
        ));
    }
}
