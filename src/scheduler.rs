//! A core module to download images of the search results.
//!
//! See [`Scheduler`] for more information.
//!
//! Following is the low-level module wrapped by this module:
//! - [`crate::download`]
//! - [`crate::tool`]

use std::fmt;
use std::num::NonZeroUsize;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use indicatif::{HumanBytes, ProgressBar, ProgressFinish, ProgressStyle};
use reqwest::Client;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;

use crate::api::data::Record;
use crate::download::{self, Downloaded, Downloader};

const PB_FINISH_MODE: ProgressFinish = ProgressFinish::Abandon;
const PB_TICK_SECS: u64 = 1;

/// The report of a single download.
#[derive(Debug)]
pub enum DownloadOutcome {
    /// The file was written completely.
    Done {
        /// The downloaded url.
        url: String,
        /// Where the file was written.
        path: PathBuf,
        /// Size of the file.
        bytes: u64,
        /// Time taken by the request and the write.
        elapsed: Duration,
    },
    /// Nothing or only part of the file was written.
    Failed {
        /// The file url, or the record's `id` if it has no usable url.
        source: String,
        /// What went wrong, with context.
        error: anyhow::Error,
    },
}

impl DownloadOutcome {
    /// Whether the download succeeded.
    pub fn is_done(&self) -> bool {
        matches!(self, DownloadOutcome::Done { .. })
    }
}

impl fmt::Display for DownloadOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DownloadOutcome::Done {
                url,
                bytes,
                elapsed,
                ..
            } => write!(
                f,
                "{:.2}s {:>10} {url}",
                elapsed.as_secs_f64(),
                HumanBytes(*bytes).to_string()
            ),
            // why `{:#}`: https://docs.rs/anyhow/1.0.86/anyhow/struct.Error.html#display-representations
            DownloadOutcome::Failed { source, error } => write!(f, "{source}: {error:#}"),
        }
    }
}

/// current download number status
#[derive(Default)]
struct DownloadStatus {
    done: u64,
    failed: u64,
}

/** The scheduler to download the images of search results.

- This struct will wrap a [`Downloader`] to download the `file_url` of every record
    into the download directory. The file is named after the last path segment of the url.

- One task is spawned per record. Use [`Self::with_jobs`] to cap the number of concurrent downloads.

- A failed download doesn't affect the others, [`Self::launch`] returns one
    [`DownloadOutcome`] per record.

# Example
```no_run
use reqwest::Client;
use multibooru::api::QueryBuilder;
use multibooru::config::Config;
use multibooru::provider::{Provider, SearchKind};
use multibooru::scheduler::Scheduler;

#[tokio::main]
async fn main() {
    let client = Client::new();

    let records = QueryBuilder::new(Config::default())
        .build_search(Provider::Konachan, SearchKind::Post, 10)
        .add_post_params("cat", false)
        .send(&client)
        .await
        .expect("Failed to get data from API");

    let scheduler = Scheduler::build(client, "cat", records).await.unwrap();
    for outcome in scheduler.launch().await {
        println!("{outcome}");
    }
}
```
*/
pub struct Scheduler {
    downloader: Downloader,
    records: Vec<Record>,
    jobs: Option<NonZeroUsize>,
}

impl Scheduler {
    /// Create a new scheduler.
    ///
    /// # Errors
    ///
    /// If `download_dir` cannot be created, including when it already exists.
    /// Nothing is downloaded in that case.
    pub async fn build(
        client: Client,
        download_dir: impl Into<PathBuf>,
        records: impl Into<Vec<Record>>,
    ) -> std::io::Result<Self> {
        let downloader = Downloader::session(client, download_dir).create().await?;
        Ok(Scheduler {
            downloader,
            records: records.into(),
            jobs: None,
        })
    }

    /// Limit the number of concurrent downloads, `None` for no limit.
    pub fn with_jobs(mut self, jobs: Option<NonZeroUsize>) -> Self {
        self.jobs = jobs;
        self
    }

    /// Return the formated download status message
    #[inline]
    fn pb_msg(status: &DownloadStatus) -> String {
        let DownloadStatus { done, failed } = status;
        format!("[done:{done}\tfailed:{failed}]")
    }

    /// Build a process bar with a specific length and custom style.
    #[inline]
    fn build_process_bar(len: u64) -> ProgressBar {
        // see: https://docs.rs/indicatif/latest/indicatif/#templates
        const PROCESS_CHARS: &str = "#>-";
        const TEMPLATE: &str =
            "[{elapsed_precise}] [{wide_bar:.cyan/blue}] {msg} {human_pos}/{human_len} ({eta})";

        let style = ProgressStyle::with_template(TEMPLATE)
            .expect("progress bar template is valid")
            .progress_chars(PROCESS_CHARS);

        ProgressBar::new(len)
            .with_style(style)
            .with_message(Self::pb_msg(&DownloadStatus::default()))
            .with_finish(PB_FINISH_MODE)
    }

    /// Download the file of a single record.
    ///
    /// - `semaphore`: limit the number of concurrent downloads, if any.
    async fn single_download(
        semaphore: Option<Arc<Semaphore>>,
        downloader: Arc<Downloader>,
        record: Record,
    ) -> DownloadOutcome {
        let _permit = match semaphore {
            Some(ref semaphore) => Some(
                semaphore
                    .acquire()
                    .await
                    .expect("semaphore was closed too early"),
            ),
            None => None,
        };

        let url = match download::file_url(&record) {
            Ok(url) => url,
            Err(err) => {
                let source = match record.get("id") {
                    Some(id) => format!("record {id}"),
                    None => String::from("record without id"),
                };
                return DownloadOutcome::Failed {
                    source,
                    error: err.into(),
                };
            }
        };

        tracing::debug!("downloading {url}");
        let result = match downloader.future(url.clone()) {
            Ok(builder) => builder.build().await,
            Err(err) => Err(err),
        };

        let result = result.with_context(|| {
            format!(
                "Failed to download into {}",
                downloader.download_dir().display()
            )
        });
        match result {
            Ok(Downloaded {
                path,
                bytes,
                elapsed,
            }) => DownloadOutcome::Done {
                url: url.into(),
                path,
                bytes,
                elapsed,
            },
            Err(error) => DownloadOutcome::Failed {
                source: url.into(),
                error,
            },
        }
    }

    /// Collect the outcomes of `download_join_set` in completion order,
    /// printing every outcome line and updating `process_bar`.
    ///
    /// # Panics
    ///
    /// If a task panic, the panic will be resumed when `join` the task.
    async fn collect(
        process_bar: ProgressBar,
        mut download_join_set: JoinSet<DownloadOutcome>,
    ) -> Vec<DownloadOutcome> {
        let mut status = DownloadStatus::default();
        let mut outcomes = Vec::with_capacity(download_join_set.len());

        while let Some(task_result) = download_join_set.join_next().await {
            let outcome = match task_result {
                Ok(outcome) => outcome,
                Err(join_error) => {
                    if let Ok(reason) = join_error.try_into_panic() {
                        std::panic::resume_unwind(reason)
                    }
                    // nothing aborts the tasks
                    panic!("Unexpected task cancelled");
                }
            };

            if outcome.is_done() {
                status.done += 1;
            } else {
                status.failed += 1;
                tracing::warn!("{outcome}");
            }
            // why `suspend`: https://docs.rs/indicatif/0.17.8/indicatif/struct.ProgressBar.html#method.suspend
            process_bar.suspend(|| println!("{outcome}"));
            process_bar.set_message(Self::pb_msg(&status));
            process_bar.inc(1);

            outcomes.push(outcome);
        }
        process_bar.finish();

        tracing::info!(
            "downloads finished, done: {}, failed: {}",
            status.done,
            status.failed
        );
        outcomes
    }

    /// Launch the scheduler and download the files of all records.
    ///
    /// Returns once every record has reported, in completion order.
    ///
    /// # Panics
    ///
    /// If one of the download tasks panic, the panic will be resumed when `join` the task.
    pub async fn launch(self) -> Vec<DownloadOutcome> {
        let Self {
            downloader,
            records,
            jobs,
        } = self;

        let process_bar = Self::build_process_bar(records.len() as u64);
        process_bar.enable_steady_tick(Duration::from_secs(PB_TICK_SECS));

        let downloader = Arc::new(downloader);
        let semaphore = jobs.map(|jobs| Arc::new(Semaphore::new(jobs.get())));
        let mut download_join_set = JoinSet::new();
        for record in records {
            download_join_set.spawn(Self::single_download(
                semaphore.clone(),
                downloader.clone(),
                record,
            ));
        }
        tracing::debug!("spawned {} download tasks", download_join_set.len());

        Self::collect(process_bar, download_join_set).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use serde_json::json;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    const CONTENT: &str = "The quick brown fox jumps over the lazy dog";

    async fn mock_image_server() -> MockServer {
        let mock_server = MockServer::start().await;
        for name in ["1.jpg", "2.png"] {
            Mock::given(method("GET"))
                .and(path(format!("/data/{name}")))
                .respond_with(ResponseTemplate::new(200).set_body_string(CONTENT))
                .expect(1)
                .mount(&mock_server)
                .await;
        }
        mock_server
    }

    fn records(server: &MockServer) -> Vec<Record> {
        let uri = server.uri();
        serde_json::from_value(json!([
            {"id": 1, "file_url": format!("{uri}/data/1.jpg")},
            {"id": 2},
            {"id": 3, "file_url": format!("{uri}/data/2.png")},
        ]))
        .unwrap()
    }

    #[tokio::test]
    async fn test_launch() {
        let mock_server = mock_image_server().await;
        let temp_dir = tempfile::tempdir().unwrap();
        let download_dir = temp_dir.path().join("a,b,c");

        let scheduler = Scheduler::build(Client::new(), &download_dir, records(&mock_server))
            .await
            .unwrap();
        let outcomes = scheduler.launch().await;

        assert_eq!(outcomes.len(), 3);
        let mut done: Vec<_> = outcomes
            .iter()
            .filter_map(|outcome| match outcome {
                DownloadOutcome::Done { path, bytes, .. } => Some((path.clone(), *bytes)),
                DownloadOutcome::Failed { .. } => None,
            })
            .collect();
        done.sort();
        assert_eq!(
            done,
            [
                (download_dir.join("1.jpg"), CONTENT.len() as u64),
                (download_dir.join("2.png"), CONTENT.len() as u64),
            ]
        );

        let failed: Vec<_> = outcomes.iter().filter(|o| !o.is_done()).collect();
        assert_eq!(failed.len(), 1);
        assert!(failed[0].to_string().starts_with("record 2: "), "{}", failed[0]);

        assert_eq!(
            std::fs::read_to_string(download_dir.join("2.png")).unwrap(),
            CONTENT
        );
    }

    #[tokio::test]
    async fn test_launch_with_jobs() {
        let mock_server = mock_image_server().await;
        let temp_dir = tempfile::tempdir().unwrap();

        let outcomes = Scheduler::build(
            Client::new(),
            temp_dir.path().join("capped"),
            records(&mock_server),
        )
        .await
        .unwrap()
        .with_jobs(NonZeroUsize::new(1))
        .launch()
        .await;

        assert_eq!(outcomes.len(), 3);
        assert_eq!(outcomes.iter().filter(|o| o.is_done()).count(), 2);
    }

    #[tokio::test]
    async fn test_failed_download_does_not_abort() {
        let mock_server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/ok.jpg"))
            .respond_with(ResponseTemplate::new(200).set_body_string(CONTENT))
            .mount(&mock_server)
            .await;
        let uri = mock_server.uri();
        let records: Vec<Record> = serde_json::from_value(json!([
            {"file_url": format!("{uri}/ok.jpg")},
            {"file_url": format!("{uri}/missing.jpg")},
            {"file_url": format!("{uri}/")},
        ]))
        .unwrap();

        let temp_dir = tempfile::tempdir().unwrap();
        let outcomes = Scheduler::build(Client::new(), temp_dir.path().join("mixed"), records)
            .await
            .unwrap()
            .launch()
            .await;

        assert_eq!(outcomes.len(), 3);
        assert_eq!(outcomes.iter().filter(|o| o.is_done()).count(), 1);
        assert!(outcomes
            .iter()
            .any(|o| o.to_string().starts_with(&format!("{uri}/missing.jpg: "))));
    }

    #[tokio::test]
    async fn test_existing_dir_is_fatal() {
        let mock_server = MockServer::start().await;
        let temp_dir = tempfile::tempdir().unwrap();

        let result = Scheduler::build(Client::new(), temp_dir.path(), records(&mock_server)).await;
        assert!(result.is_err());
        // no download was attempted
        assert!(mock_server
            .received_requests()
            .await
            .unwrap_or_default()
            .is_empty());
    }

    #[test]
    fn test_outcome_display() {
        let outcome = DownloadOutcome::Done {
            url: String::from("https://example.com/1.jpg"),
            path: PathBuf::from("cat/1.jpg"),
            bytes: 2048,
            elapsed: Duration::from_millis(1500),
        };
        assert_eq!(
            outcome.to_string(),
            "1.50s   2.00 KiB https://example.com/1.jpg"
        );
    }
}
