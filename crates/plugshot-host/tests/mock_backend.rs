//! Path-selection rules, exercised over a scripted backend with no native
//! windows involved.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use parking_lot::Mutex;
use plugshot_host::abi;
use plugshot_host::{
    CaptureBackend, ClassId, HostError, HostSession, ScreenshotHost, ScreenshotOptions,
};

#[derive(Clone, Debug, PartialEq, Eq)]
enum Event {
    Resolve(String),
    OpenRunner(Option<String>),
    OpenDirect(Option<String>),
    Capture(PathBuf),
    Close,
}

type Log = Arc<Mutex<Vec<Event>>>;

struct MockSession {
    log: Log,
    label: &'static str,
    capture_fails: bool,
}

impl HostSession for MockSession {
    fn label(&self) -> &'static str {
        self.label
    }

    fn capture_png(&mut self, output: &Path) -> Result<(), HostError> {
        self.log.lock().push(Event::Capture(output.to_path_buf()));
        if self.capture_fails {
            Err(HostError::CaptureRender("scripted capture failure".into()))
        } else {
            Ok(())
        }
    }

    fn close(&mut self) {
        self.log.lock().push(Event::Close);
    }
}

struct MockBackend {
    log: Log,
    resolve_ok: bool,
    runner_opens: bool,
    direct_opens: bool,
    capture_fails: bool,
}

impl MockBackend {
    fn new() -> Self {
        Self {
            log: Log::default(),
            resolve_ok: true,
            runner_opens: true,
            direct_opens: true,
            capture_fails: false,
        }
    }

    fn session(&self, label: &'static str) -> MockSession {
        MockSession {
            log: Arc::clone(&self.log),
            label,
            capture_fails: self.capture_fails,
        }
    }
}

impl CaptureBackend for MockBackend {
    type Session = MockSession;

    fn resolve_class(&mut self, bundle: &Path, name: &str) -> Result<ClassId, HostError> {
        self.log.lock().push(Event::Resolve(name.to_owned()));
        if self.resolve_ok {
            Ok(ClassId::from_tuid(abi::uid(0xA, 0xB, 0xC, 0xD)))
        } else {
            Err(HostError::ClassNotFound {
                name: name.to_owned(),
                path: bundle.to_path_buf(),
            })
        }
    }

    fn open_runner(
        &mut self,
        _bundle: &Path,
        class: Option<&ClassId>,
        _opts: &ScreenshotOptions,
    ) -> Result<MockSession, HostError> {
        self.log
            .lock()
            .push(Event::OpenRunner(class.map(ToString::to_string)));
        if self.runner_opens {
            Ok(self.session("runner"))
        } else {
            Err(HostError::NoWindow)
        }
    }

    fn open_direct(
        &mut self,
        _bundle: &Path,
        class: Option<&ClassId>,
        _opts: &ScreenshotOptions,
    ) -> Result<MockSession, HostError> {
        self.log
            .lock()
            .push(Event::OpenDirect(class.map(ToString::to_string)));
        if self.direct_opens {
            Ok(self.session("direct"))
        } else {
            Err(HostError::UnsupportedWindowType)
        }
    }
}

#[test]
fn runner_success_never_touches_the_direct_path() {
    let backend = MockBackend::new();
    let log = Arc::clone(&backend.log);
    let mut host = ScreenshotHost::with_backend(backend);

    let result = host.capture_plugin(
        Path::new("/tmp/Mock.vst3"),
        Path::new("/tmp/mock.png"),
        &ScreenshotOptions::default(),
    );

    assert!(result.is_ok());
    assert_eq!(
        *log.lock(),
        vec![
            Event::OpenRunner(None),
            Event::Capture(PathBuf::from("/tmp/mock.png")),
            Event::Close,
        ]
    );
}

#[test]
fn direct_path_gets_one_attempt_when_the_runner_cannot_open() {
    let mut backend = MockBackend::new();
    backend.runner_opens = false;
    let log = Arc::clone(&backend.log);
    let mut host = ScreenshotHost::with_backend(backend);

    let result = host.capture_plugin(
        Path::new("/tmp/Mock.vst3"),
        Path::new("/tmp/mock.png"),
        &ScreenshotOptions::default(),
    );

    assert!(result.is_ok());
    assert_eq!(
        *log.lock(),
        vec![
            Event::OpenRunner(None),
            Event::OpenDirect(None),
            Event::Capture(PathBuf::from("/tmp/mock.png")),
            Event::Close,
        ]
    );
}

#[test]
fn direct_open_failure_is_final_and_surfaces_its_own_error() {
    let mut backend = MockBackend::new();
    backend.runner_opens = false;
    backend.direct_opens = false;
    let log = Arc::clone(&backend.log);
    let mut host = ScreenshotHost::with_backend(backend);

    let result = host.capture_plugin(
        Path::new("/tmp/Mock.vst3"),
        Path::new("/tmp/mock.png"),
        &ScreenshotOptions::default(),
    );

    assert!(matches!(result, Err(HostError::UnsupportedWindowType)));
    assert_eq!(
        *log.lock(),
        vec![Event::OpenRunner(None), Event::OpenDirect(None)]
    );
}

#[test]
fn class_resolution_failure_stops_before_any_session() {
    let mut backend = MockBackend::new();
    backend.resolve_ok = false;
    let log = Arc::clone(&backend.log);
    let mut host = ScreenshotHost::with_backend(backend);

    let opts = ScreenshotOptions {
        class_name: Some("Ghost".to_owned()),
        ..ScreenshotOptions::default()
    };
    let result = host.capture_plugin(
        Path::new("/tmp/Mock.vst3"),
        Path::new("/tmp/mock.png"),
        &opts,
    );

    assert!(matches!(
        result,
        Err(HostError::ClassNotFound { name, .. }) if name == "Ghost"
    ));
    assert_eq!(*log.lock(), vec![Event::Resolve("Ghost".to_owned())]);
}

#[test]
fn resolved_class_reaches_both_open_calls() {
    let mut backend = MockBackend::new();
    backend.runner_opens = false;
    let log = Arc::clone(&backend.log);
    let mut host = ScreenshotHost::with_backend(backend);

    let opts = ScreenshotOptions {
        class_name: Some("Tuner XL".to_owned()),
        ..ScreenshotOptions::default()
    };
    host.capture_plugin(
        Path::new("/tmp/Mock.vst3"),
        Path::new("/tmp/mock.png"),
        &opts,
    )
    .expect("direct path still opens");

    let cid = ClassId::from_tuid(abi::uid(0xA, 0xB, 0xC, 0xD)).to_string();
    let events = log.lock().clone();
    assert_eq!(events[0], Event::Resolve("Tuner XL".to_owned()));
    assert_eq!(events[1], Event::OpenRunner(Some(cid.clone())));
    assert_eq!(events[2], Event::OpenDirect(Some(cid)));
}

#[test]
fn capture_failure_closes_the_session_and_never_retries() {
    let mut backend = MockBackend::new();
    backend.capture_fails = true;
    let log = Arc::clone(&backend.log);
    let mut host = ScreenshotHost::with_backend(backend);

    let result = host.capture_plugin(
        Path::new("/tmp/Mock.vst3"),
        Path::new("/tmp/mock.png"),
        &ScreenshotOptions::default(),
    );

    assert!(matches!(result, Err(HostError::CaptureRender(_))));
    // The runner opened, so its capture failure is final: no direct
    // attempt, but the session is still closed.
    assert_eq!(
        *log.lock(),
        vec![
            Event::OpenRunner(None),
            Event::Capture(PathBuf::from("/tmp/mock.png")),
            Event::Close,
        ]
    );
}
