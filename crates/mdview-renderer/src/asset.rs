//! Local path to renderer-loadable resource URL conversion.

use percent_encoding::{AsciiSet, NON_ALPHANUMERIC, utf8_percent_encode};

/// URL scheme served by the desktop runtime for local files.
pub const ASSET_SCHEME: &str = "asset";

/// Characters left unescaped by JavaScript's `encodeURIComponent`.
const URI_COMPONENT: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'_')
    .remove(b'.')
    .remove(b'!')
    .remove(b'~')
    .remove(b'*')
    .remove(b'\'')
    .remove(b'(')
    .remove(b')');

/// Converts a contained, normalized local path into a resource URL.
///
/// Called only after the image path passed the containment check. Implemented
/// for plain closures so hosts can inject their runtime's conversion.
pub trait AssetUrlConverter: Send + Sync {
    /// Convert an absolute, normalized path.
    fn to_asset_url(&self, path: &str) -> String;
}

impl<F> AssetUrlConverter for F
where
    F: Fn(&str) -> String + Send + Sync,
{
    fn to_asset_url(&self, path: &str) -> String {
        self(path)
    }
}

/// Default converter producing `asset://<host>/<encoded path>`.
#[derive(Clone, Debug)]
pub struct AssetProtocol {
    host: String,
}

impl AssetProtocol {
    /// Converter for `asset://localhost/`.
    #[must_use]
    pub fn new() -> Self {
        Self {
            host: "localhost".to_owned(),
        }
    }

    /// Use a different host.
    #[must_use]
    pub fn with_host(mut self, host: impl Into<String>) -> Self {
        self.host = host.into();
        self
    }
}

impl Default for AssetProtocol {
    fn default() -> Self {
        Self::new()
    }
}

impl AssetUrlConverter for AssetProtocol {
    fn to_asset_url(&self, path: &str) -> String {
        format!(
            "{ASSET_SCHEME}://{}/{}",
            self.host,
            utf8_percent_encode(path, URI_COMPONENT)
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_asset_protocol_encodes_path() {
        let url = AssetProtocol::new().to_asset_url("/docs/my image.png");
        assert_eq!(url, "asset://localhost/%2Fdocs%2Fmy%20image.png");
    }

    #[test]
    fn test_asset_protocol_keeps_uri_component_chars() {
        let url = AssetProtocol::new().to_asset_url("a-b_c.d!e~f*g'h(i)");
        assert_eq!(url, "asset://localhost/a-b_c.d!e~f*g'h(i)");
    }

    #[test]
    fn test_asset_protocol_custom_host() {
        let url = AssetProtocol::new()
            .with_host("asset.localhost")
            .to_asset_url("/x.png");
        assert_eq!(url, "asset://asset.localhost/%2Fx.png");
    }

    #[test]
    fn test_closure_converter() {
        let converter = |path: &str| format!("file-handle:{path}");
        assert_eq!(converter.to_asset_url("/a.png"), "file-handle:/a.png");
    }
}
