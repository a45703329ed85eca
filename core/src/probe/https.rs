use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, redirect};
use reachr_common::config::ProbeTarget;

use super::{FailureKind, FailureTable, ProbeOutcome, Prober};

/// Probes the target over HTTPS, pinning its hostname to the candidate
/// address instead of whatever DNS would answer.
///
/// Every probe builds its own client with pooling disabled. The client and
/// its connection are dropped before `probe` returns, on every path, so the
/// number of open sockets never exceeds the number of running probes.
pub struct HttpsProber {
    target: ProbeTarget,
    url: String,
    timeout: Duration,
    failures: FailureTable,
}

impl HttpsProber {
    pub fn new(target: ProbeTarget, timeout: Duration, failures: FailureTable) -> Self {
        let url: String = target.url();
        Self {
            target,
            url,
            timeout,
            failures,
        }
    }

    pub fn target(&self) -> &ProbeTarget {
        &self.target
    }

    fn client_for(&self, addr: Ipv4Addr) -> reqwest::Result<Client> {
        let pinned = SocketAddr::new(IpAddr::V4(addr), self.target.port);
        Client::builder()
            .resolve(&self.target.hostname, pinned)
            .timeout(self.timeout)
            .connect_timeout(self.timeout)
            .pool_max_idle_per_host(0)
            .redirect(redirect::Policy::none())
            .https_only(true)
            .no_proxy()
            .build()
    }

    fn failed(&self, addr: Ipv4Addr, err: &reqwest::Error) -> ProbeOutcome {
        let kind: FailureKind = self.failures.classify(err);
        self.failures.report(addr, kind, err);
        ProbeOutcome::failed(kind)
    }
}

#[async_trait]
impl Prober for HttpsProber {
    async fn probe(&self, addr: Ipv4Addr) -> ProbeOutcome {
        let client: Client = match self.client_for(addr) {
            Ok(client) => client,
            Err(e) => return self.failed(addr, &e),
        };

        match client.get(&self.url).send().await {
            Ok(response) if response.status().as_u16() == self.target.expected_status => {
                ProbeOutcome::Good
            }
            Ok(response) => ProbeOutcome::status(response.status().as_u16()),
            Err(e) => self.failed(addr, &e),
        }
    }
}

// ╔════════════════════════════════════════════╗
// ║ ████████╗███████╗███████╗████████╗███████╗ ║
// ║ ╚══██╔══╝██╔════╝██╔════╝╚══██╔══╝██╔════╝ ║
// ║    ██║   █████╗  ███████╗   ██║   ███████╗ ║
// ║    ██║   ██╔══╝  ╚════██║   ██║   ╚════██║ ║
// ║    ██║   ███████╗███████║   ██║   ███████║ ║
// ║    ╚═╝   ╚══════╝╚══════╝   ╚═╝   ╚══════╝ ║
// ╚════════════════════════════════════════════╝
