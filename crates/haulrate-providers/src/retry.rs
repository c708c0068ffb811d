//! Retry with exponential backoff for provider HTTP calls.
//!
//! Retries only on transport errors that failed fast (connection refused,
//! reset). A timeout is returned immediately so one call never waits longer
//! than its configured timeout. Non-2xx responses and decode failures are
//! returned immediately too; a provider that answered is not asked again.

use std::time::Duration;

/// Base delay between retries (doubles each attempt: 200ms, 400ms, 800ms).
const BASE_DELAY_MS: u64 = 200;

/// Send an HTTP request, retrying up to `max_retries` times on transport
/// errors other than timeouts.
///
/// The closure `f` is called at most `max_retries + 1` times. The caller is
/// responsible for inspecting the response status code.
pub(crate) async fn retry_send<F, Fut>(
    provider: &str,
    max_retries: u32,
    f: F,
) -> Result<reqwest::Response, reqwest::Error>
where
    F: Fn() -> Fut,
    Fut: std::future::Future<Output = Result<reqwest::Response, reqwest::Error>>,
{
    for attempt in 0..max_retries {
        match f().await {
            Ok(resp) => return Ok(resp),
            Err(e) if e.is_timeout() => {
                let e = e.without_url();
                tracing::warn!(provider, attempt = attempt + 1, "provider request timed out: {e}");
                return Err(e);
            }
            Err(e) => {
                // Query strings can carry API keys; never log the URL.
                let e = e.without_url();
                let delay = Duration::from_millis(BASE_DELAY_MS * 2u64.pow(attempt.min(6)));
                tracing::warn!(
                    provider,
                    attempt = attempt + 1,
                    max_retries,
                    "provider request failed, retrying in {delay:?}: {e}"
                );
                tokio::time::sleep(delay).await;
            }
        }
    }
    f().await
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::sync::Arc;

    async fn closed_port(count: Arc<AtomicU32>) -> Result<reqwest::Response, reqwest::Error> {
        count.fetch_add(1, Ordering::SeqCst);
        // Request to a guaranteed-closed port → connection refused.
        reqwest::Client::builder()
            .timeout(Duration::from_millis(50))
            .build()
            .unwrap()
            .get("http://127.0.0.1:1/")
            .send()
            .await
    }

    #[tokio::test]
    async fn retry_exhausts_all_attempts_on_transport_failure() {
        let call_count = Arc::new(AtomicU32::new(0));
        let cc = call_count.clone();

        let result = retry_send("test", 2, || closed_port(cc.clone())).await;

        assert!(result.is_err(), "request to closed port must fail");
        assert_eq!(call_count.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn timeout_is_not_retried() {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        // Accept and never answer.
        let _server = tokio::spawn(async move {
            let mut held = Vec::new();
            while let Ok((socket, _)) = listener.accept().await {
                held.push(socket);
            }
        });

        let call_count = Arc::new(AtomicU32::new(0));
        let cc = call_count.clone();
        let client = reqwest::Client::new();
        let url = format!("http://{addr}/");

        let result = retry_send("test", 2, || {
            cc.fetch_add(1, Ordering::SeqCst);
            client.get(&url).timeout(Duration::from_millis(100)).send()
        })
        .await;

        assert!(result.unwrap_err().is_timeout());
        assert_eq!(call_count.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn zero_retries_means_single_attempt() {
        let call_count = Arc::new(AtomicU32::new(0));
        let cc = call_count.clone();

        let result = retry_send("test", 0, || closed_port(cc.clone())).await;

        assert!(result.is_err());
        assert_eq!(call_count.load(Ordering::SeqCst), 1);
    }
}
