//! Query string helpers

use url::form_urlencoded;

/// First value of query parameter `key`, percent-decoded
pub fn query_param(query: Option<&str>, key: &str) -> Option<String> {
    form_urlencoded::parse(query?.as_bytes())
        .find(|(k, _)| k == key)
        .map(|(_, v)| v.into_owned())
}

/// UI root address, without a trailing slash doubling up
pub fn ui_root(ui_address: &str) -> String {
    format!("{}/", ui_address.trim_end_matches('/'))
}

/// UI address asking the UI to show its waiting state for `name`
pub fn watch_target(ui_address: &str, name: &str) -> String {
    let query = form_urlencoded::Serializer::new(String::new())
        .append_pair("watch", name)
        .finish();
    format!("{}?{query}", ui_root(ui_address))
}
