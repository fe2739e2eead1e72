use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::NodeError;

/// A node address, canonically `host:port`. Two addresses are equal iff
/// their string forms are equal.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct NodeAddress(String);

impl NodeAddress {
    pub fn new(host: &str, port: u16) -> Self {
        NodeAddress(format!("{host}:{port}"))
    }

    /// Parse a `host:port` string, rejecting anything else.
    pub fn parse(s: &str) -> Result<Self, NodeError> {
        let trimmed = s.trim();
        let (host, port) = trimmed
            .rsplit_once(':')
            .ok_or_else(|| NodeError::ProtocolMisuse(format!("not host:port: {trimmed}")))?;
        if host.is_empty() {
            return Err(NodeError::ProtocolMisuse(format!("empty host in {trimmed}")));
        }
        port.parse::<u16>()
            .map_err(|_| NodeError::ProtocolMisuse(format!("bad port in {trimmed}")))?;
        Ok(NodeAddress(trimmed.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn to_url(&self) -> String {
        format!("http://{}", self.0)
    }
}

impl fmt::Display for NodeAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_host_port() {
        let a = NodeAddress::parse("localhost:8080").unwrap();
        assert_eq!(a.as_str(), "localhost:8080");
        assert_eq!(a.to_url(), "http://localhost:8080");
    }

    #[test]
    fn rejects_missing_port() {
        assert!(NodeAddress::parse("localhost").is_err());
    }

    #[test]
    fn rejects_bad_port() {
        assert!(NodeAddress::parse("localhost:notaport").is_err());
    }
}
