use reqwest::header::{ACCEPT, ACCEPT_LANGUAGE, USER_AGENT};
use reqwest::{Client, ClientBuilder, StatusCode};
use tokio::time::sleep;
use tracing::{debug, info, warn};
use url::Url;

use crate::config::HttpConfig;
use crate::error::FetchError;

const ACCEPT_HTML: &str = "text/html,application/xhtml+xml,application/xml;q=0.9,*/*;q=0.8";
const ACCEPT_LANGUAGES: &str = "en-US,en;q=0.9,ka;q=0.8,ru;q=0.7";

#[derive(Debug, Clone)]
pub struct FetchedPage {
    /// URL the body was finally served from, after redirects.
    pub url: Url,
    pub status: StatusCode,
    pub html: String,
    pub attempts: u32,
}

pub fn create_client(http: &HttpConfig) -> Result<Client, reqwest::Error> {
    let mut builder = ClientBuilder::new()
        .timeout(http.timeout())
        .pool_max_idle_per_host(http.pool_max_idle_per_host)
        .cookie_store(true);

    if let Some(user_agent) = http.user_agents.first() {
        builder = builder.user_agent(user_agent.as_str());
    }

    builder.build()
}

/// Turns user input into an absolute http(s) URL. Input without a scheme is
/// treated as https.
pub fn normalize_url(input: &str) -> Result<Url, FetchError> {
    let trimmed = input.trim();
    if trimmed.is_empty() {
        return Err(FetchError::InvalidUrl(input.to_string()));
    }

    let candidate = if trimmed.contains("://") {
        trimmed.to_string()
    } else {
        format!("https://{}", trimmed)
    };

    let url = Url::parse(&candidate).map_err(|_| FetchError::InvalidUrl(input.to_string()))?;

    match url.scheme() {
        "http" | "https" => {}
        other => return Err(FetchError::UnsupportedScheme(other.to_string())),
    }

    if url.host_str().map_or(true, str::is_empty) {
        return Err(FetchError::InvalidUrl(input.to_string()));
    }

    Ok(url)
}

/// The URL as given, then the same URL over the other protocol.
pub fn candidate_urls(url: &Url) -> Vec<Url> {
    let mut candidates = vec![url.clone()];

    let switched = match url.scheme() {
        "https" => Some("http"),
        "http" => Some("https"),
        _ => None,
    };

    if let Some(scheme) = switched {
        let mut alternate = url.clone();
        if alternate.set_scheme(scheme).is_ok() {
            candidates.push(alternate);
        }
    }

    candidates
}

/// Fetches a page, walking protocol variants and User-Agents until one
/// attempt returns a success status or `max_attempts` is used up. A permanent
/// HTTP error skips the remaining User-Agents for that URL variant.
pub async fn fetch_html(client: &Client, url: &Url, http: &HttpConfig) -> Result<FetchedPage, FetchError> {
    let mut attempts = 0u32;
    let mut last_error = FetchError::NoAttempts;

    'candidates: for candidate in candidate_urls(url) {
        for user_agent in &http.user_agents {
            if attempts >= http.max_attempts {
                break 'candidates;
            }

            if attempts > 0 {
                let delay = http.retry_delay();
                debug!("Retrying in {:?}... (attempt {}/{})", delay, attempts + 1, http.max_attempts);
                sleep(delay).await;
            }
            attempts += 1;

            debug!(url = %candidate, attempt = attempts, user_agent = %user_agent, "Fetching page");

            let request = client
                .get(candidate.clone())
                .header(USER_AGENT, user_agent.as_str())
                .header(ACCEPT, ACCEPT_HTML)
                .header(ACCEPT_LANGUAGE, ACCEPT_LANGUAGES);

            match request.send().await {
                Ok(response) if response.status().is_success() => {
                    let status = response.status();
                    let final_url = response.url().clone();

                    match response.text().await {
                        Ok(html) => {
                            info!(url = %final_url, attempts, bytes = html.len(), "Fetched page");
                            return Ok(FetchedPage {
                                url: final_url,
                                status,
                                html,
                                attempts,
                            });
                        }
                        Err(source) => {
                            warn!(url = %candidate, "Failed to read response body: {}", source);
                            last_error = FetchError::Request {
                                url: candidate.clone(),
                                source,
                            };
                        }
                    }
                }
                Ok(response) => {
                    let status = response.status();
                    warn!(url = %candidate, attempt = attempts, "HTTP error {}", status);

                    let error = FetchError::Status {
                        url: candidate.clone(),
                        status,
                    };
                    let permanent = !error.is_transient();
                    last_error = error;

                    if permanent {
                        continue 'candidates;
                    }
                }
                Err(source) => {
                    warn!(url = %candidate, attempt = attempts, "Request failed: {}", source);
                    last_error = FetchError::Request {
                        url: candidate.clone(),
                        source,
                    };
                }
            }
        }
    }

    Err(FetchError::Exhausted {
        url: url.clone(),
        attempts,
        last: Box::new(last_error),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn normalize_adds_https_when_scheme_missing() {
        let url = normalize_url("shop.example.ge/catalog").unwrap();
        assert_eq!(url.as_str(), "https://shop.example.ge/catalog");
    }

    #[test]
    fn normalize_keeps_http() {
        let url = normalize_url("  http://shop.example.ge  ").unwrap();
        assert_eq!(url.scheme(), "http");
    }

    #[test]
    fn normalize_rejects_other_schemes() {
        match normalize_url("ftp://files.example.ge/list") {
            Err(FetchError::UnsupportedScheme(scheme)) => assert_eq!(scheme, "ftp"),
            other => panic!("expected unsupported scheme, got {:?}", other),
        }
    }

    #[test]
    fn normalize_rejects_garbage() {
        assert!(matches!(normalize_url(""), Err(FetchError::InvalidUrl(_))));
        assert!(matches!(normalize_url("http://"), Err(FetchError::InvalidUrl(_))));
        assert!(matches!(normalize_url("exa mple"), Err(FetchError::InvalidUrl(_))));
    }

    #[test]
    fn candidates_switch_protocol() {
        let url = Url::parse("https://shop.example.ge/a?b=1").unwrap();
        let candidates: Vec<String> = candidate_urls(&url).iter().map(|u| u.to_string()).collect();
        assert_eq!(
            candidates,
            vec![
                "https://shop.example.ge/a?b=1".to_string(),
                "http://shop.example.ge/a?b=1".to_string(),
            ]
        );
    }
}
