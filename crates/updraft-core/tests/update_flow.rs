//! End-to-end session behavior against scripted transports: changelog
//! delivery, redirect handling, staging file contents, progress reporting,
//! and overlap rejection.

use std::collections::VecDeque;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use futures_util::stream;
use tokio::sync::Notify;

use updraft_core::{
    AutoUpdater, ChangeLog, Transport, TransportError, TransportResponse, UpdateError,
    UpdateStatusListener, UpdaterConfig, VersionComparator,
};
use updraft_platform::Installer;

#[derive(Debug, Clone, PartialEq)]
enum Event {
    Available(usize),
    Progress(f32),
    Finished,
    Error(String),
}

#[derive(Default)]
struct Recorder {
    events: Mutex<Vec<Event>>,
    changelogs: Mutex<Vec<ChangeLog>>,
}

impl Recorder {
    fn events(&self) -> Vec<Event> {
        self.events.lock().expect("events lock").clone()
    }

    fn last_changelog(&self) -> ChangeLog {
        self.changelogs
            .lock()
            .expect("changelog lock")
            .last()
            .cloned()
            .expect("a changelog was delivered")
    }
}

impl UpdateStatusListener for Recorder {
    fn on_update_available(&self, changelog: ChangeLog) {
        self.events
            .lock()
            .expect("events lock")
            .push(Event::Available(changelog.len()));
        self.changelogs.lock().expect("changelog lock").push(changelog);
    }

    fn on_update_download_progress(&self, percent: f32) {
        self.events
            .lock()
            .expect("events lock")
            .push(Event::Progress(percent));
    }

    fn on_update_download_finished(&self) {
        self.events.lock().expect("events lock").push(Event::Finished);
    }

    fn on_update_error(&self, message: String) {
        self.events.lock().expect("events lock").push(Event::Error(message));
    }
}

enum Scripted {
    Redirect { status: u16, target: String },
    Body {
        status: u16,
        content_length: Option<u64>,
        chunks: Vec<Vec<u8>>,
    },
    Fail(TransportError),
}

struct ScriptedTransport {
    replies: Mutex<VecDeque<Scripted>>,
    requests: Mutex<Vec<String>>,
}

impl ScriptedTransport {
    fn new(replies: Vec<Scripted>) -> Self {
        Self {
            replies: Mutex::new(replies.into()),
            requests: Mutex::new(Vec::new()),
        }
    }

    fn requests(&self) -> Vec<String> {
        self.requests.lock().expect("requests lock").clone()
    }
}

#[async_trait]
impl Transport for ScriptedTransport {
    async fn fetch(
        &self,
        url: &str,
        _accept: Option<&'static str>,
    ) -> Result<TransportResponse, TransportError> {
        self.requests
            .lock()
            .expect("requests lock")
            .push(url.to_string());

        match self
            .replies
            .lock()
            .expect("replies lock")
            .pop_front()
            .expect("unexpected extra request")
        {
            Scripted::Redirect { status, target } => Ok(TransportResponse {
                status,
                redirect_target: Some(target),
                content_length: None,
                body: Box::pin(stream::iter(vec![Ok::<_, TransportError>(
                    bytes::Bytes::from_static(b"<html>moved</html>"),
                )])),
            }),
            Scripted::Body {
                status,
                content_length,
                chunks,
            } => Ok(TransportResponse {
                status,
                redirect_target: None,
                content_length,
                body: Box::pin(stream::iter(
                    chunks
                        .into_iter()
                        .map(|chunk| Ok::<_, TransportError>(bytes::Bytes::from(chunk)))
                        .collect::<Vec<_>>(),
                )),
            }),
            Scripted::Fail(error) => Err(error),
        }
    }
}

/// Transport that parks the first request until released, so a second
/// operation can be attempted while one is provably in flight.
struct GatedTransport {
    started: Arc<Notify>,
    release: Arc<Notify>,
    payload: Vec<u8>,
}

#[async_trait]
impl Transport for GatedTransport {
    async fn fetch(
        &self,
        _url: &str,
        _accept: Option<&'static str>,
    ) -> Result<TransportResponse, TransportError> {
        self.started.notify_one();
        self.release.notified().await;

        Ok(TransportResponse {
            status: 200,
            redirect_target: None,
            content_length: Some(self.payload.len() as u64),
            body: Box::pin(stream::iter(vec![Ok::<_, TransportError>(
                bytes::Bytes::from(self.payload.clone()),
            )])),
        })
    }
}

#[derive(Default)]
struct RecordingInstaller {
    calls: Mutex<Vec<PathBuf>>,
    fail: bool,
}

impl RecordingInstaller {
    fn failing() -> Self {
        Self {
            calls: Mutex::new(Vec::new()),
            fail: true,
        }
    }

    fn calls(&self) -> Vec<PathBuf> {
        self.calls.lock().expect("calls lock").clone()
    }
}

impl Installer for RecordingInstaller {
    fn install(&self, file_path: &Path) -> bool {
        self.calls
            .lock()
            .expect("calls lock")
            .push(file_path.to_path_buf());
        !self.fail
    }
}

struct Harness {
    updater: Arc<AutoUpdater>,
    recorder: Arc<Recorder>,
    installer: Arc<RecordingInstaller>,
    staging_dir: tempfile::TempDir,
}

impl Harness {
    fn new(transport: Arc<dyn Transport>, installer: RecordingInstaller) -> Self {
        let staging_dir = tempfile::tempdir().expect("staging dir");
        let mut config = UpdaterConfig::new("acme/app", "v1.0.0", "app");
        config.staging_dir = staging_dir.path().to_path_buf();
        config.target_extension = ".exe".to_string();

        let installer = Arc::new(installer);
        let updater = Arc::new(
            AutoUpdater::with_collaborators(
                config,
                VersionComparator::natural(),
                transport,
                installer.clone(),
            )
            .expect("valid config"),
        );

        let recorder = Arc::new(Recorder::default());
        updater.set_listener(recorder.clone());

        Self {
            updater,
            recorder,
            installer,
            staging_dir,
        }
    }

    fn staging_path(&self) -> PathBuf {
        self.staging_dir.path().join("app.exe")
    }
}

fn progress_values(events: &[Event]) -> Vec<f32> {
    events
        .iter()
        .filter_map(|event| match event {
            Event::Progress(percent) => Some(*percent),
            _ => None,
        })
        .collect()
}

const FEED: &str = r#"[
    {
        "tag_name": "v2.0.0",
        "html_url": "https://github.com/acme/app/releases/tag/v2.0.0",
        "draft": false,
        "prerelease": false,
        "created_at": "2026-05-02T08:00:00Z",
        "body": "Big release",
        "assets": [
            {"name": "app-2.0.0.AppImage", "browser_download_url": "https://dl.example.com/app-2.0.0.AppImage"},
            {"name": "app-2.0.0.exe", "browser_download_url": "https://dl.example.com/app-2.0.0.exe"}
        ]
    },
    {
        "tag_name": "v1.5.0",
        "html_url": "https://github.com/acme/app/releases/tag/v1.5.0",
        "draft": false,
        "prerelease": true,
        "created_at": "2026-03-20T08:00:00Z",
        "body": "",
        "assets": []
    },
    {
        "tag_name": "v1.0.0",
        "html_url": "https://github.com/acme/app/releases/tag/v1.0.0",
        "draft": false,
        "prerelease": false,
        "created_at": "2026-01-10T08:00:00Z",
        "body": "Initial",
        "assets": []
    }
]"#;

#[tokio::test]
async fn check_reports_newer_releases_with_selected_urls() {
    let transport = Arc::new(ScriptedTransport::new(vec![Scripted::Body {
        status: 200,
        content_length: None,
        chunks: vec![FEED.as_bytes().to_vec()],
    }]));
    let harness = Harness::new(transport.clone(), RecordingInstaller::default());

    harness
        .updater
        .check_for_updates()
        .await
        .expect("check starts");

    assert_eq!(
        transport.requests(),
        ["https://api.github.com/repos/acme/app/releases"]
    );

    let changelog = harness.recorder.last_changelog();
    assert_eq!(changelog.len(), 2);
    assert_eq!(changelog[0].version, "2.0.0");
    assert_eq!(
        changelog[0].update_url,
        "https://dl.example.com/app-2.0.0.exe"
    );
    assert!(!changelog[0].is_prerelease);
    assert_eq!(changelog[1].version, "1.5.0");
    assert!(changelog[1].is_prerelease);
    assert_eq!(
        changelog[1].update_url,
        "https://github.com/acme/app/releases/tag/v1.5.0"
    );
    assert_eq!(harness.recorder.events(), [Event::Available(2)]);
}

#[tokio::test]
async fn download_streams_to_the_staging_file_and_installs() {
    let transport = Arc::new(ScriptedTransport::new(vec![Scripted::Body {
        status: 200,
        content_length: Some(10),
        chunks: vec![b"12345".to_vec(), b"67890".to_vec()],
    }]));
    let harness = Harness::new(transport, RecordingInstaller::default());

    harness
        .updater
        .download_and_install("https://dl.example.com/app-2.0.0.exe")
        .await
        .expect("download starts");

    assert_eq!(
        std::fs::read(harness.staging_path()).expect("staging file exists"),
        b"1234567890"
    );
    assert_eq!(harness.installer.calls(), [harness.staging_path()]);

    let events = harness.recorder.events();
    assert_eq!(events.last(), Some(&Event::Finished));
    assert_eq!(progress_values(&events), [50.0, 100.0]);
}

#[tokio::test]
async fn redirected_download_keeps_only_the_final_bytes() {
    let transport = Arc::new(ScriptedTransport::new(vec![
        Scripted::Redirect {
            status: 302,
            target: "https://cdn.example.com/app-2.0.0.exe".to_string(),
        },
        Scripted::Body {
            status: 200,
            content_length: Some(7),
            chunks: vec![b"payload".to_vec()],
        },
    ]));
    let harness = Harness::new(transport.clone(), RecordingInstaller::default());

    harness
        .updater
        .download_and_install("https://dl.example.com/app-2.0.0.exe")
        .await
        .expect("download starts");

    assert_eq!(
        transport.requests(),
        [
            "https://dl.example.com/app-2.0.0.exe",
            "https://cdn.example.com/app-2.0.0.exe"
        ]
    );
    assert_eq!(
        std::fs::read(harness.staging_path()).expect("staging file exists"),
        b"payload"
    );

    let finishes = harness
        .recorder
        .events()
        .iter()
        .filter(|event| **event == Event::Finished)
        .count();
    assert_eq!(finishes, 1);
}

#[tokio::test]
async fn exceeding_the_redirect_bound_fails_without_installing() {
    let hops = (0..6)
        .map(|hop| Scripted::Redirect {
            status: 302,
            target: format!("https://cdn.example.com/hop-{hop}"),
        })
        .collect();
    let harness = Harness::new(
        Arc::new(ScriptedTransport::new(hops)),
        RecordingInstaller::default(),
    );

    harness
        .updater
        .download_and_install("https://dl.example.com/app-2.0.0.exe")
        .await
        .expect("download starts");

    let events = harness.recorder.events();
    let errors: Vec<_> = events
        .iter()
        .filter(|event| matches!(event, Event::Error(_)))
        .collect();
    assert_eq!(errors.len(), 1);
    assert!(!events.contains(&Event::Finished));
    assert!(harness.installer.calls().is_empty());
}

#[tokio::test]
async fn insecure_redirects_are_refused() {
    let transport = Arc::new(ScriptedTransport::new(vec![Scripted::Redirect {
        status: 302,
        target: "http://cdn.example.com/app-2.0.0.exe".to_string(),
    }]));
    let harness = Harness::new(transport, RecordingInstaller::default());

    harness
        .updater
        .download_and_install("https://dl.example.com/app-2.0.0.exe")
        .await
        .expect("download starts");

    let events = harness.recorder.events();
    assert_eq!(events.len(), 1);
    assert!(
        matches!(&events[0], Event::Error(message) if message.contains("insecure")),
        "unexpected events: {events:?}"
    );
    assert!(harness.installer.calls().is_empty());
}

#[tokio::test]
async fn mid_flight_transport_failure_abandons_the_download() {
    let transport = Arc::new(ScriptedTransport::new(vec![Scripted::Fail(
        TransportError::Failed("connection reset by peer".to_string()),
    )]));
    let harness = Harness::new(transport, RecordingInstaller::default());

    harness
        .updater
        .download_and_install("https://dl.example.com/app-2.0.0.exe")
        .await
        .expect("download starts");

    assert_eq!(
        harness.recorder.events(),
        [Event::Error("connection reset by peer".to_string())]
    );
    assert!(harness.installer.calls().is_empty());
}

#[tokio::test]
async fn failed_installer_launch_is_reported_after_the_finish() {
    let transport = Arc::new(ScriptedTransport::new(vec![Scripted::Body {
        status: 200,
        content_length: Some(4),
        chunks: vec![b"data".to_vec()],
    }]));
    let harness = Harness::new(transport, RecordingInstaller::failing());

    harness
        .updater
        .download_and_install("https://dl.example.com/app-2.0.0.exe")
        .await
        .expect("download starts");

    let events = harness.recorder.events();
    assert_eq!(
        events.last(),
        Some(&Event::Error(
            "Failed to launch the downloaded update.".to_string()
        ))
    );
    let finished_at = events
        .iter()
        .position(|event| *event == Event::Finished)
        .expect("download itself finished");
    assert!(finished_at < events.len() - 1);
}

#[tokio::test]
async fn overlapping_download_is_rejected_without_touching_the_staging_file() {
    let started = Arc::new(Notify::new());
    let release = Arc::new(Notify::new());
    let transport = Arc::new(GatedTransport {
        started: started.clone(),
        release: release.clone(),
        payload: b"final artifact".to_vec(),
    });
    let harness = Harness::new(transport, RecordingInstaller::default());

    let updater = harness.updater.clone();
    let in_flight = tokio::spawn(async move {
        updater
            .download_and_install("https://dl.example.com/app-2.0.0.exe")
            .await
    });

    started.notified().await;

    let rejected = harness
        .updater
        .download_and_install("https://dl.example.com/other.exe")
        .await;
    assert!(matches!(rejected, Err(UpdateError::Busy { .. })));

    release.notify_one();
    in_flight
        .await
        .expect("task join")
        .expect("first download starts");

    assert_eq!(
        std::fs::read(harness.staging_path()).expect("staging file exists"),
        b"final artifact"
    );
    assert_eq!(harness.installer.calls(), [harness.staging_path()]);
}

#[tokio::test]
async fn progress_is_monotone_and_bounded() {
    let transport = Arc::new(ScriptedTransport::new(vec![Scripted::Body {
        status: 200,
        content_length: Some(100),
        chunks: vec![
            vec![0_u8; 10],
            vec![0_u8; 20],
            vec![0_u8; 30],
            vec![0_u8; 40],
        ],
    }]));
    let harness = Harness::new(transport, RecordingInstaller::default());

    harness
        .updater
        .download_and_install("https://dl.example.com/app-2.0.0.exe")
        .await
        .expect("download starts");

    let percents = progress_values(&harness.recorder.events());
    assert_eq!(percents, [10.0, 30.0, 60.0, 100.0]);
    assert!(percents.windows(2).all(|pair| pair[0] <= pair[1]));
    assert!(percents.iter().all(|percent| *percent <= 100.0));
}

#[tokio::test]
async fn unknown_content_length_reports_one_hundred() {
    let transport = Arc::new(ScriptedTransport::new(vec![Scripted::Body {
        status: 200,
        content_length: None,
        chunks: vec![b"chunk".to_vec()],
    }]));
    let harness = Harness::new(transport, RecordingInstaller::default());

    harness
        .updater
        .download_and_install("https://dl.example.com/app-2.0.0.exe")
        .await
        .expect("download starts");

    assert_eq!(progress_values(&harness.recorder.events()), [100.0]);
}
