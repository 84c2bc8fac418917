//! Download of a single file.
//!
//! [`crate::scheduler`] wraps this module to download many files at once.

use std::future::Future;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use reqwest::Client;
use thiserror::Error;
use tokio::fs::{create_dir, File};
use tokio::io::{AsyncWriteExt, BufWriter};
use url::Url;

use crate::api::data::Record;
use crate::tool::file_name_from_url;

/// Errors of downloading the file of a single record.
#[non_exhaustive]
#[derive(Error, Debug)]
pub enum DownloadError {
    /// The field is absent or `null`.
    #[error("record has no `file_url`")]
    MissingFileUrl,
    /// The field holds a number, an object or anything else but a string.
    #[error("`file_url` is not a string: {0}")]
    FileUrlNotString(serde_json::Value),
    /// The field is a string, but not an absolute url.
    #[error("invalid file url `{url}`: {source}")]
    InvalidUrl {
        /// The raw field value.
        url: String,
        /// Why it failed to parse.
        source: url::ParseError,
    },
    /// The url path has no last segment to name the file after.
    #[error("no file name in url {0}")]
    NoFileName(Url),
    /// Creating or writing the file failed.
    #[error(transparent)]
    Io(#[from] std::io::Error),
    /// The request failed or the status is not a success.
    #[error(transparent)]
    Reqwest(#[from] reqwest::Error),
}

/// A finished download.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Downloaded {
    /// Where the file was written.
    pub path: PathBuf,
    /// Number of bytes written.
    pub bytes: u64,
    /// Time from sending the request to flushing the file.
    pub elapsed: Duration,
}

/// Parse the `file_url` of `record`.
///
/// # Errors
///
/// If the field is missing, not a string or not a valid url.
pub fn file_url(record: &Record) -> Result<Url, DownloadError> {
    let raw = match record.get("file_url") {
        None | Some(serde_json::Value::Null) => return Err(DownloadError::MissingFileUrl),
        Some(serde_json::Value::String(raw)) => raw,
        Some(other) => return Err(DownloadError::FileUrlNotString(other.clone())),
    };
    Url::parse(raw).map_err(|source| DownloadError::InvalidUrl {
        url: raw.to_owned(),
        source,
    })
}

/// A prepared download, see [`Downloader::future`].
pub struct DownloadFutureBuilder {
    client: Client,
    url: Url,
    file_path: PathBuf,
}

impl DownloadFutureBuilder {
    fn new(client: Client, url: Url, file_path: PathBuf) -> Self {
        Self {
            client,
            url,
            file_path,
        }
    }

    /// The future streams the response body into the file and measures the whole round trip.
    ///
    /// A non-success status code is an error, the file is created only after the response arrived.
    pub fn build(self) -> impl Future<Output = Result<Downloaded, DownloadError>> {
        let Self {
            client,
            url,
            file_path,
        } = self;

        async move {
            let start = Instant::now();
            let mut response = client.get(url).send().await?.error_for_status()?;
            let mut file_buf = BufWriter::new(File::create(&file_path).await?);

            let mut bytes: u64 = 0;
            while let Some(mut chunk) = response.chunk().await? {
                bytes += chunk.len() as u64;
                file_buf.write_all_buf(&mut chunk).await?;
            }

            file_buf.flush().await?;
            Ok::<Downloaded, DownloadError>(Downloaded {
                path: file_path,
                bytes,
                elapsed: start.elapsed(),
            })
        }
    }
}

/// Downloads files into one directory with a shared client.
pub struct Downloader {
    client: Client,
    download_dir: PathBuf,
}

impl Downloader {
    /// Nothing is touched on disk until [`Self::create`].
    pub fn session(client: Client, download_dir: impl Into<PathBuf>) -> Self {
        let download_dir = download_dir.into();
        Self {
            client,
            download_dir,
        }
    }

    /// Create the download directory.
    ///
    /// Unlike `create_dir_all`, this fails if the directory already exists.
    #[inline]
    pub async fn create(self) -> std::io::Result<Self> {
        create_dir(&self.download_dir).await?;
        Ok(self)
    }

    /// The directory files are written into.
    #[inline]
    pub fn download_dir(&self) -> &Path {
        &self.download_dir
    }

    /// Prepare the download of `url` into the download directory.
    ///
    /// # Errors
    ///
    /// If the file name can't be taken from the last path segment of `url`.
    pub fn future(&self, url: Url) -> Result<DownloadFutureBuilder, DownloadError> {
        let file_path = match file_name_from_url(&url) {
            Some(filename) => self.download_dir.join(filename),
            None => return Err(DownloadError::NoFileName(url)),
        };
        Ok(DownloadFutureBuilder::new(
            self.client.clone(),
            url,
            file_path,
        ))
    }
}
