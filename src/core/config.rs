use std::env;
use std::time::Duration;

#[derive(Clone, Debug)]
pub struct AppConfig {
    pub api_url: String,
    pub typing_delay: Duration,
    pub request_timeout: Duration,
    pub accepted_extensions: Vec<String>,
}

impl AppConfig {
    pub fn with_api_url(mut self, api_url: &str) -> Self {
        self.api_url = api_url.trim_end_matches('/').to_string();
        self
    }

    /// Whether a document with this name may be uploaded. An empty
    /// list of extensions accepts everything.
    pub fn accepts(&self, file_name: &str) -> bool {
        if self.accepted_extensions.is_empty() {
            return true;
        }
        let Some((_, ext)) = file_name.rsplit_once('.') else {
            return false;
        };
        self.accepted_extensions
            .iter()
            .any(|accepted| accepted.eq_ignore_ascii_case(ext))
    }
}

fn parse_millis(var: &str, default: u64) -> Duration {
    let millis = env::var(var)
        .ok()
        .and_then(|v| v.trim().parse::<u64>().ok())
        .unwrap_or(default);
    Duration::from_millis(millis)
}

impl Default for AppConfig {
    fn default() -> Self {
        let api_url = env::var("DOCCHAT_API_URL")
            .unwrap_or_else(|_| "http://127.0.0.1:8000".to_string())
            .trim_end_matches('/')
            .to_string();
        let typing_delay = parse_millis("DOCCHAT_TYPING_DELAY_MS", 10);
        let request_timeout_secs = env::var("DOCCHAT_REQUEST_TIMEOUT_SECS")
            .ok()
            .and_then(|v| v.trim().parse::<u64>().ok())
            .unwrap_or(60 * 5);
        let accepted_extensions = env::var("DOCCHAT_ACCEPTED_EXTENSIONS")
            .unwrap_or_else(|_| "pdf".to_string())
            .split(',')
            .map(|ext| ext.trim().trim_start_matches('.').to_lowercase())
            .filter(|ext| !ext.is_empty())
            .collect();

        Self {
            api_url,
            typing_delay,
            request_timeout: Duration::from_secs(request_timeout_secs),
            accepted_extensions,
        }
    }
}
