//! Navigation boundary

use std::sync::atomic::{AtomicUsize, Ordering};

use tracing::info;

pub trait Navigator: Send + Sync {
    fn navigate_to_login(&self);
}

/// Navigator for hosts without a router: logs the request and counts it.
#[derive(Debug, Default)]
pub struct NavigationLog {
    login_requests: AtomicUsize,
}

impl NavigationLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn login_requests(&self) -> usize {
        self.login_requests.load(Ordering::SeqCst)
    }
}

impl Navigator for NavigationLog {
    fn navigate_to_login(&self) {
        self.login_requests.fetch_add(1, Ordering::SeqCst);
        info!("Navigation to login requested");
    }
}
