//! Outbound HTTP calls this node makes to its peers: data-path forwarding,
//! the Accept RPC, and the stabilization probes. Every call here carries a
//! finite timeout — an unreachable peer must never wedge the caller.

use std::time::Duration;

use actix_web::HttpResponse;
use actix_web::http::StatusCode;
use actix_web::web::Bytes as ActixBytes;
use bytes::Bytes;
use reqwest::Client;

use crate::addr::NodeAddress;
use crate::error::NodeError;
use crate::wire::{NetworkView, NodeInfoView, NodeView};

pub fn build_client(timeout: Duration) -> Client {
    Client::builder()
        .timeout(timeout)
        .build()
        .expect("reqwest client configuration is always valid")
}

/// Forward a GET `/storage/{key}` to `target`, returning its response
/// verbatim. No local retries on the data path.
pub async fn forward_get(
    client: &Client,
    target: &NodeAddress,
    key: &str,
    hop_count: u32,
) -> HttpResponse {
    let url = format!("{}/storage/{}", target.to_url(), key);
    relay(
        client
            .get(&url)
            .header("X-Chord-Hop-Count", hop_count.to_string())
            .send()
            .await,
    )
    .await
}

/// Forward a PUT `/storage/{key}` to `target`, returning its response
/// verbatim.
pub async fn forward_put(
    client: &Client,
    target: &NodeAddress,
    key: &str,
    value: ActixBytes,
    hop_count: u32,
) -> HttpResponse {
    let url = format!("{}/storage/{}", target.to_url(), key);
    relay(
        client
            .put(&url)
            .header("X-Chord-Hop-Count", hop_count.to_string())
            .body(value.to_vec())
            .send()
            .await,
    )
    .await
}

async fn relay(response: Result<reqwest::Response, reqwest::Error>) -> HttpResponse {
    match response {
        Ok(r) => {
            let status =
                StatusCode::from_u16(r.status().as_u16()).unwrap_or(StatusCode::BAD_GATEWAY);
            let body = r
                .bytes()
                .await
                .unwrap_or_else(|_| Bytes::from_static(b"error reading forwarded body"));
            HttpResponse::build(status).body(body)
        }
        Err(e) => HttpResponse::BadGateway().body(format!("forward error: {e}")),
    }
}

/// GET `/node-info` on `addr`. Used both for the data path (never) and the
/// stabilization liveness probe.
pub async fn probe_node_info(client: &Client, addr: &NodeAddress) -> Result<NodeInfoView, NodeError> {
    let url = format!("{}/node-info", addr.to_url());
    let resp = client
        .get(&url)
        .send()
        .await
        .map_err(|e| NodeError::Forwarding(e.to_string()))?;
    if !resp.status().is_success() {
        return Err(NodeError::Forwarding(format!(
            "{addr} returned {}",
            resp.status()
        )));
    }
    resp.json::<NodeInfoView>()
        .await
        .map_err(|e| NodeError::Forwarding(e.to_string()))
}

/// GET `/network` on `addr`, used while repairing a lost predecessor.
pub async fn probe_network(client: &Client, addr: &NodeAddress) -> Result<NetworkView, NodeError> {
    let url = format!("{}/network", addr.to_url());
    let resp = client
        .get(&url)
        .send()
        .await
        .map_err(|e| NodeError::Forwarding(e.to_string()))?;
    if !resp.status().is_success() {
        return Err(NodeError::Forwarding(format!(
            "{addr} returned {}",
            resp.status()
        )));
    }
    resp.json::<NetworkView>()
        .await
        .map_err(|e| NodeError::Forwarding(e.to_string()))
}

/// GET `/node` on `addr`, used while tightening a repaired finger toward the
/// true successor.
pub async fn probe_node(client: &Client, addr: &NodeAddress) -> Result<NodeView, NodeError> {
    let url = format!("{}/node", addr.to_url());
    let resp = client
        .get(&url)
        .send()
        .await
        .map_err(|e| NodeError::Forwarding(e.to_string()))?;
    if !resp.status().is_success() {
        return Err(NodeError::Forwarding(format!(
            "{addr} returned {}",
            resp.status()
        )));
    }
    resp.json::<NodeView>()
        .await
        .map_err(|e| NodeError::Forwarding(e.to_string()))
}

/// PUT `/API/join` on `target` carrying `loner,nprime`; the response body is
/// a comma-separated membership list (possibly empty).
pub async fn send_accept(
    client: &Client,
    target: &NodeAddress,
    loner: &NodeAddress,
    nprime: &NodeAddress,
) -> Result<Vec<NodeAddress>, NodeError> {
    let url = format!("{}/API/join", target.to_url());
    let body = format!("{loner},{nprime}");
    let resp = client
        .put(&url)
        .header("Content-Type", "text/plain")
        .body(body)
        .send()
        .await
        .map_err(|e| NodeError::Forwarding(e.to_string()))?;
    if !resp.status().is_success() {
        return Err(NodeError::Forwarding(format!(
            "{target} returned {}",
            resp.status()
        )));
    }
    let text = resp
        .text()
        .await
        .map_err(|e| NodeError::Forwarding(e.to_string()))?;
    parse_membership_list(&text)
}

pub fn parse_membership_list(text: &str) -> Result<Vec<NodeAddress>, NodeError> {
    text.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(NodeAddress::parse)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_empty_membership_list() {
        assert_eq!(parse_membership_list("").unwrap(), Vec::new());
    }

    #[test]
    fn parses_comma_separated_members() {
        let members = parse_membership_list("a:1,b:2,c:3").unwrap();
        assert_eq!(
            members,
            vec![
                NodeAddress::parse("a:1").unwrap(),
                NodeAddress::parse("b:2").unwrap(),
                NodeAddress::parse("c:3").unwrap(),
            ]
        );
    }
}
