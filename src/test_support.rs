//! Mock weather site for tests of the blocking HTTP code paths

use tokio::runtime::Runtime;
use wiremock::{Mock, MockServer};

/// A wiremock server driven from synchronous tests.
///
/// wiremock serves from its own thread; the runtime here only drives the
/// async setup calls, so blocking reqwest clients can be used freely.
pub struct MockSite {
    server: MockServer,
    runtime: Runtime,
}

impl MockSite {
    pub fn start() -> Self {
        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .unwrap();
        let server = runtime.block_on(MockServer::start());
        Self { server, runtime }
    }

    pub fn uri(&self) -> String {
        self.server.uri()
    }

    pub fn mount(&self, mock: Mock) {
        self.runtime.block_on(mock.mount(&self.server));
    }

    /// Paths of every request the site has seen, in arrival order.
    pub fn requested_paths(&self) -> Vec<String> {
        self.runtime
            .block_on(self.server.received_requests())
            .unwrap_or_default()
            .into_iter()
            .map(|request| request.url.path().to_string())
            .collect()
    }
}
