use crate::converter::HtmlConverter;
use std::ops::Deref;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::Semaphore;

pub struct AppStateInner {
    pub converter: Arc<dyn HtmlConverter>,
    pub app_name: String,
    pub workers: usize,
    pub request_timeout: Option<Duration>,
    /// One permit per running conversion, held until it finishes.
    pub slots: Arc<Semaphore>,
    ready: AtomicBool,
    started: Instant,
}

/// Shared, cheaply clonable handler state.
#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
}

impl AppState {
    pub fn new(
        converter: Arc<dyn HtmlConverter>,
        app_name: impl Into<String>,
        workers: usize,
        request_timeout: Option<Duration>,
    ) -> Self {
        let workers = workers.max(1);
        Self {
            inner: Arc::new(AppStateInner {
                converter,
                app_name: app_name.into(),
                workers,
                request_timeout,
                slots: Arc::new(Semaphore::new(workers)),
                ready: AtomicBool::new(false),
                started: Instant::now(),
            }),
        }
    }

    pub fn is_ready(&self) -> bool {
        self.inner.ready.load(Ordering::Acquire)
    }

    pub fn mark_ready(&self) {
        self.inner.ready.store(true, Ordering::Release);
    }

    pub fn uptime(&self) -> Duration {
        self.inner.started.elapsed()
    }
}

impl Deref for AppState {
    type Target = AppStateInner;

    fn deref(&self) -> &Self::Target {
        &self.inner
    }
}

impl std::fmt::Debug for AppState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppState")
            .field("app_name", &self.app_name)
            .field("converter", &self.converter.kind())
            .field("workers", &self.workers)
            .field("ready", &self.is_ready())
            .finish()
    }
}
