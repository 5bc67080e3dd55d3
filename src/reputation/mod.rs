//! Rate-limited reputation lookups for recovered payloads.
//!
//! The external service enforces a strict request budget, so lookups are
//! serialized behind one shared client: the mutex is held for the full
//! throttle-plus-request window, capping system-wide throughput at one
//! lookup per `delay_secs` regardless of worker count. A lookup never
//! fails the caller; misses and transport errors both collapse to the
//! neutral not-found pair.

use std::sync::Mutex;
use std::time::{Duration, Instant};

use serde::Deserialize;
use tracing::{debug, warn};

use crate::config::ReputationConfig;
use crate::core::attempt::Reputation;

#[derive(Debug, Deserialize)]
struct ReputationResponse {
    #[serde(default)]
    positives: Option<u64>,
    #[serde(default)]
    total: Option<u64>,
    #[serde(default)]
    permalink: Option<String>,
}

pub struct ReputationClient {
    cfg: ReputationConfig,
    http: reqwest::blocking::Client,
    /// Start instant of the last request; guards the throttle window.
    last_call: Mutex<Option<Instant>>,
}

impl ReputationClient {
    pub fn new(cfg: ReputationConfig) -> Self {
        let http = reqwest::blocking::Client::builder()
            .timeout(Duration::from_secs(cfg.timeout_secs))
            .build()
            .unwrap_or_else(|_| reqwest::blocking::Client::new());
        Self {
            cfg,
            http,
            last_call: Mutex::new(None),
        }
    }

    /// Look up a content digest. Blocks for the remainder of the throttle
    /// window before issuing the request.
    pub fn lookup(&self, digest: &str) -> Reputation {
        if self.cfg.url.is_empty() {
            return Reputation::not_found();
        }

        let mut last = match self.last_call.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        if let Some(started) = *last {
            let window = Duration::from_secs(self.cfg.delay_secs);
            let elapsed = started.elapsed();
            if elapsed < window {
                std::thread::sleep(window - elapsed);
            }
        }
        *last = Some(Instant::now());

        match self.request(digest) {
            Ok(reputation) => reputation,
            Err(err) => {
                warn!(digest, error = %err, "reputation lookup failed");
                Reputation::not_found()
            }
        }
    }

    fn request(&self, digest: &str) -> Result<Reputation, reqwest::Error> {
        let response = self
            .http
            .post(&self.cfg.url)
            .form(&[("resource", digest), ("apikey", self.cfg.api_key.as_str())])
            .send()?;
        let info: ReputationResponse = response.json()?;
        match (info.positives, info.total, info.permalink) {
            (Some(positives), Some(total), Some(permalink)) => {
                debug!(digest, positives, total, "reputation hit");
                Ok(Reputation {
                    detection: format!("{}/{}", positives, total),
                    permalink,
                })
            }
            _ => Ok(Reputation::not_found()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::{Read, Write};
    use std::net::TcpListener;

    fn client(url: &str, delay_secs: u64) -> ReputationClient {
        ReputationClient::new(ReputationConfig {
            url: url.to_string(),
            api_key: "test-key".to_string(),
            delay_secs,
            timeout_secs: 5,
        })
    }

    /// Serve one canned HTTP response on a local listener.
    fn one_shot_server(body: &'static str) -> String {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();
        std::thread::spawn(move || {
            if let Ok((mut stream, _)) = listener.accept() {
                let mut buf = [0u8; 4096];
                let _ = stream.read(&mut buf);
                let response = format!(
                    "HTTP/1.1 200 OK\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
                    body.len(),
                    body
                );
                let _ = stream.write_all(response.as_bytes());
            }
        });
        format!("http://{}", addr)
    }

    #[test]
    fn disabled_url_short_circuits() {
        let client = client("", 0);
        assert_eq!(client.lookup("deadbeef"), Reputation::not_found());
    }

    #[test]
    fn transport_failure_is_neutral() {
        // Nothing listens on this port; connection is refused.
        let client = client("http://127.0.0.1:9/report", 0);
        assert_eq!(client.lookup("deadbeef"), Reputation::not_found());
    }

    #[test]
    fn known_digest_parses_detection() {
        let url = one_shot_server(
            r#"{"positives": 17, "total": 70, "permalink": "https://example.invalid/r/1"}"#,
        );
        let client = client(&url, 0);
        let reputation = client.lookup("deadbeef");
        assert_eq!(reputation.detection, "17/70");
        assert_eq!(reputation.permalink, "https://example.invalid/r/1");
    }

    #[test]
    fn missing_permalink_is_neutral() {
        let url = one_shot_server(r#"{"response_code": 0}"#);
        let client = client(&url, 0);
        assert_eq!(client.lookup("deadbeef"), Reputation::not_found());
    }

    #[test]
    fn throttle_spaces_consecutive_calls() {
        let client = client("http://127.0.0.1:9/report", 1);
        let start = Instant::now();
        client.lookup("one");
        client.lookup("two");
        // The second call must wait out the 1s window opened by the first.
        assert!(start.elapsed() >= Duration::from_secs(1));
    }
}
