//! Connection parameters for the storage network gateway.

use base64::{Engine as _, engine::general_purpose};
use std::fmt;

/// Where the gateway lives and which project credentials to present.
///
/// Credentials are not validated here. Missing or wrong values only show up
/// as an authorization failure from the gateway.
#[derive(Clone)]
pub struct ConnectionParams {
    pub host: String,
    pub port: u16,
    pub protocol: String,
    pub project_id: String,
    pub project_secret: String,
}

impl ConnectionParams {
    pub fn new(
        host: impl Into<String>,
        port: u16,
        protocol: impl Into<String>,
        project_id: impl Into<String>,
        project_secret: impl Into<String>,
    ) -> Self {
        Self {
            host: host.into(),
            port,
            protocol: protocol.into(),
            project_id: project_id.into(),
            project_secret: project_secret.into(),
        }
    }

    /// `protocol://host:port`, without a trailing slash.
    pub fn base_url(&self) -> String {
        format!("{}://{}:{}", self.protocol, self.host, self.port)
    }

    /// Value for the `Authorization` header: `Basic base64(id:secret)`.
    pub fn authorization(&self) -> String {
        let pair = format!("{}:{}", self.project_id, self.project_secret);
        format!("Basic {}", general_purpose::STANDARD.encode(pair))
    }
}

impl fmt::Debug for ConnectionParams {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConnectionParams")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("protocol", &self.protocol)
            .field("project_id", &self.project_id)
            .field("project_secret", &"<redacted>")
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn authorization_is_basic_base64_of_id_and_secret() {
        let params = ConnectionParams::new("ipfs.infura.io", 5001, "https", "proj", "s3cret");
        // base64("proj:s3cret")
        assert_eq!(params.authorization(), "Basic cHJvajpzM2NyZXQ=");
    }

    #[test]
    fn empty_credentials_still_encode() {
        let params = ConnectionParams::new("localhost", 5001, "http", "", "");
        assert_eq!(params.authorization(), "Basic Og==");
    }

    #[test]
    fn base_url_joins_scheme_host_and_port() {
        let params = ConnectionParams::new("ipfs.infura.io", 5001, "https", "a", "b");
        assert_eq!(params.base_url(), "https://ipfs.infura.io:5001");
    }

    #[test]
    fn debug_output_hides_the_secret() {
        let params = ConnectionParams::new("h", 1, "http", "id", "topsecret");
        let rendered = format!("{:?}", params);
        assert!(!rendered.contains("topsecret"));
        assert!(rendered.contains("<redacted>"));
    }
}
