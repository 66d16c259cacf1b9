use crate::config::WireConfig;
use crate::html::inject_assets;
use crate::request::RequestScope;

/// Splice the request's pooled page assets into a full HTML document.
///
/// Runs once per response; the pool is drained so a second call is a no-op.
/// Fragments (no `</html>`) pass through untouched and keep the pool.
pub fn finish_response(config: &WireConfig, request: &RequestScope, html: String) -> String {
    if !config.inject_assets || !html.contains("</html>") || !request.has_pooled_assets() {
        return html;
    }

    let head: String = request
        .drain_assets()
        .into_iter()
        .map(|asset| asset + "\n")
        .collect();
    tracing::debug!(request = %request.id(), "injected pooled assets");
    inject_assets(&html, &head, "")
}

#[cfg(test)]
mod tests {
    use super::*;

    const PAGE: &str = "<html><head></head><body><div>x</div></body></html>";

    #[test]
    fn injects_once_into_head() {
        let config = WireConfig::default();
        let request = RequestScope::new("/");
        request.pool_asset("a", "<link rel=\"stylesheet\" href=\"/a.css\">");

        let html = finish_response(&config, &request, PAGE.to_string());
        assert_eq!(
            html,
            "<html><head><link rel=\"stylesheet\" href=\"/a.css\">\n</head><body><div>x</div></body></html>"
        );
        assert_eq!(finish_response(&config, &request, PAGE.to_string()), PAGE);
    }

    #[test]
    fn fragments_and_disabled_config_pass_through() {
        let request = RequestScope::new("/");
        request.pool_asset("a", "<script></script>");

        let fragment = "<div>x</div>".to_string();
        assert_eq!(finish_response(&WireConfig::default(), &request, fragment.clone()), fragment);

        let config = WireConfig {
            inject_assets: false,
            ..WireConfig::default()
        };
        assert_eq!(finish_response(&config, &request, PAGE.to_string()), PAGE);
        assert!(request.has_pooled_assets());
    }
}
