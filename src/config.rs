//! Build-time configuration for the console.

pub const DEFAULT_API_BASE: &str = "/api/v1";

#[derive(Clone, Debug, PartialEq)]
pub struct AppConfig {
    pub api_base_url: String,
    /// Show demo data when list fetches fail. Development builds only.
    pub dev_fallback: bool,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            api_base_url: DEFAULT_API_BASE.to_string(),
            dev_fallback: cfg!(debug_assertions),
        }
    }
}

impl AppConfig {
    pub fn from_env() -> Self {
        Self::from_values(option_env!("ODONTO_API_BASE"), option_env!("ODONTO_DEV_FALLBACK"))
    }

    fn from_values(base: Option<&str>, fallback: Option<&str>) -> Self {
        let mut config = Self::default();
        if let Some(b) = base.map(str::trim).filter(|b| !b.is_empty()) {
            config.api_base_url = b.trim_end_matches('/').to_string();
        }
        match fallback.map(str::trim) {
            Some("1") | Some("true") => config.dev_fallback = true,
            Some("0") | Some("false") => config.dev_fallback = false,
            _ => {}
        }
        config
    }

    /// reqwest on wasm only accepts absolute URLs, so a relative base is
    /// joined onto the page origin.
    pub fn resolved_base(&self, origin: &str) -> String {
        resolve_base(origin, &self.api_base_url)
    }
}

pub fn resolve_base(origin: &str, base: &str) -> String {
    if base.starts_with("http://") || base.starts_with("https://") {
        return base.trim_end_matches('/').to_string();
    }
    let origin = origin.trim_end_matches('/');
    let path = base.trim_start_matches('/').trim_end_matches('/');
    if path.is_empty() {
        origin.to_string()
    } else {
        format!("{}/{}", origin, path)
    }
}

#[cfg(target_arch = "wasm32")]
pub fn page_origin() -> String {
    web_sys::window()
        .and_then(|w| w.location().origin().ok())
        .unwrap_or_default()
}

#[cfg(not(target_arch = "wasm32"))]
pub fn page_origin() -> String {
    "http://localhost:8080".to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn env_overrides() {
        let c = AppConfig::from_values(Some("https://ords.example/api/v1/"), Some("0"));
        assert_eq!(c.api_base_url, "https://ords.example/api/v1");
        assert!(!c.dev_fallback);

        let d = AppConfig::from_values(Some("  "), None);
        assert_eq!(d.api_base_url, DEFAULT_API_BASE);
    }

    #[test]
    fn relative_base_joins_origin() {
        assert_eq!(resolve_base("http://localhost:8080/", "/api/v1"), "http://localhost:8080/api/v1");
        assert_eq!(resolve_base("http://x", "https://y/ords/"), "https://y/ords");
        assert_eq!(resolve_base("http://x", "/"), "http://x");
    }
}
