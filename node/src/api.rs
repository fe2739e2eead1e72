//! The HTTP surface: the request demultiplexer that maps URL + method to
//! one of the ring operations.

use std::collections::HashMap;
use std::sync::Arc;

use actix_web::{HttpRequest, HttpResponse, Responder, get, put, web};

use crate::addr::NodeAddress;
use crate::config::Config;
use crate::crash::CrashState;
use crate::error::NodeError;
use crate::ident;
use crate::join;
use crate::ring::Ring;
use crate::store::KvStore;
use crate::transport;
use crate::wire::{NetworkView, NodeInfoView, NodeView};

pub struct AppState {
    pub ring: Arc<Ring>,
    pub store: KvStore,
    pub crash: Arc<CrashState>,
    pub client: reqwest::Client,
    pub config: Config,
}

fn hop_count(req: &HttpRequest) -> u32 {
    req.headers()
        .get("X-Chord-Hop-Count")
        .and_then(|h| h.to_str().ok())
        .and_then(|s| s.parse::<u32>().ok())
        .unwrap_or(0)
}

#[get("/helloworld")]
pub async fn helloworld(state: web::Data<AppState>) -> impl Responder {
    HttpResponse::Ok()
        .content_type("text/plain")
        .body(state.ring.me.as_str().to_string())
}

#[get("/storage/{key}")]
pub async fn get_storage(
    req: HttpRequest,
    key: web::Path<String>,
    state: web::Data<AppState>,
) -> Result<HttpResponse, NodeError> {
    let key = key.into_inner();
    let hops = hop_count(&req);
    if hops >= state.config.hop_limit {
        return Err(NodeError::HopLimitExceeded);
    }

    if state.ring.is_responsible(&key).await {
        return match state.store.get(&key).await {
            Some(value) => Ok(HttpResponse::Ok().content_type("text/plain").body(value)),
            None => Err(NodeError::NotFound),
        };
    }

    let target_id = ident::hash_to_id(&key, state.ring.bits);
    let fingers = state.ring.snapshot().await.fingers;
    let target = state.ring.select_forward(&fingers, target_id);
    Ok(transport::forward_get(&state.client, &target, &key, hops + 1).await)
}

#[put("/storage/{key}")]
pub async fn put_storage(
    req: HttpRequest,
    key: web::Path<String>,
    body: web::Bytes,
    state: web::Data<AppState>,
) -> Result<HttpResponse, NodeError> {
    let key = key.into_inner();
    let hops = hop_count(&req);
    if hops >= state.config.hop_limit {
        return Err(NodeError::HopLimitExceeded);
    }

    if state.ring.is_responsible(&key).await {
        state.store.put(key, body.into()).await;
        return Ok(HttpResponse::Ok().content_type("text/plain").body("Stored"));
    }

    let target_id = ident::hash_to_id(&key, state.ring.bits);
    let fingers = state.ring.snapshot().await.fingers;
    let target = state.ring.select_forward(&fingers, target_id);
    Ok(transport::forward_put(&state.client, &target, &key, body, hops + 1).await)
}

#[get("/network")]
pub async fn get_network(state: web::Data<AppState>) -> impl Responder {
    let snap = state.ring.snapshot().await;
    HttpResponse::Ok().json(NetworkView {
        successor: snap.successor.as_str().to_string(),
        predecessor: snap.predecessor.as_str().to_string(),
        finger_table: snap.fingers.iter().map(|f| f.as_str().to_string()).collect(),
    })
}

#[get("/node")]
pub async fn get_node(state: web::Data<AppState>) -> Result<HttpResponse, NodeError> {
    let snap = state.ring.snapshot().await;
    let view = NodeView {
        node_name: state.config.host.clone(),
        node_port: state.config.port,
        successor: snap.successor.as_str().to_string(),
        predecessor: snap.predecessor.as_str().to_string(),
        finger_table: snap.fingers.iter().map(|f| f.as_str().to_string()).collect(),
        key_value_store: state.store.snapshot_lossy().await,
        node_id: state.ring.me_id,
    };
    // A JSON body, but text/plain on the wire — a quirk carried over
    // unchanged because clients already depend on it.
    let body = serde_json::to_string(&view)
        .map_err(|e| NodeError::ProtocolMisuse(format!("failed to encode node view: {e}")))?;
    Ok(HttpResponse::Ok().content_type("text/plain").body(body))
}

#[get("/node-info")]
pub async fn get_node_info(state: web::Data<AppState>) -> impl Responder {
    let snap = state.ring.snapshot().await;
    let mut others: Vec<String> = vec![snap.predecessor.as_str().to_string()];
    for f in &snap.fingers {
        if *f != snap.successor && *f != snap.predecessor {
            let s = f.as_str().to_string();
            if !others.contains(&s) {
                others.push(s);
            }
        }
    }
    HttpResponse::Ok().json(NodeInfoView {
        node_hash: state.ring.me_id,
        successor: snap.successor.as_str().to_string(),
        others,
    })
}

#[put("/join")]
pub async fn post_join(
    query: web::Query<HashMap<String, String>>,
    state: web::Data<AppState>,
) -> Result<HttpResponse, NodeError> {
    let nprime = query
        .get("nprime")
        .ok_or_else(|| NodeError::ProtocolMisuse("Missing nprime parameter".to_string()))?;
    let seed = NodeAddress::parse(nprime)?;
    join::join_via_seed(&state.ring, &state.client, &seed).await?;
    Ok(HttpResponse::Ok().content_type("text/plain").body("Joined network successfully"))
}

#[put("/API/join")]
pub async fn api_join(
    body: web::Bytes,
    state: web::Data<AppState>,
) -> Result<HttpResponse, NodeError> {
    let text = std::str::from_utf8(&body)
        .map_err(|_| NodeError::ProtocolMisuse("body must be valid UTF-8".to_string()))?;
    let (loner_s, nprime_s) = text
        .split_once(',')
        .ok_or_else(|| NodeError::ProtocolMisuse("expected loner,nprime".to_string()))?;
    let loner = NodeAddress::parse(loner_s)?;
    let nprime = NodeAddress::parse(nprime_s)?;

    let members = join::handle_accept(&state.ring, &state.client, loner, nprime).await?;
    let body = members
        .iter()
        .map(|m| m.as_str().to_string())
        .collect::<Vec<_>>()
        .join(",");
    Ok(HttpResponse::Ok().content_type("text/plain").body(body))
}

#[put("/leave")]
pub async fn post_leave(state: web::Data<AppState>) -> impl Responder {
    state.ring.leave().await;
    state.ring.clear_loners().await;
    HttpResponse::Ok()
        .content_type("text/plain")
        .body("Node has left the network successfully")
}

#[put("/sim-crash")]
pub async fn post_sim_crash(state: web::Data<AppState>) -> impl Responder {
    state.crash.crash();
    HttpResponse::Ok().content_type("text/plain").body("Node has crashed")
}

#[put("/sim-recover")]
pub async fn post_sim_recover(state: web::Data<AppState>) -> impl Responder {
    state.crash.recover();
    state.ring.clear_loners().await;

    // No known peers means this node is already isolated, not mid-recovery.
    let snap = state.ring.snapshot().await;
    let mut peers = snap.known_addresses();
    peers.remove(&state.ring.me);

    if peers.is_empty() {
        return HttpResponse::Ok().content_type("text/plain").body("Node has recovered");
    }

    for peer in &peers {
        if join::join_via_seed(&state.ring, &state.client, peer).await.is_ok() {
            return HttpResponse::Ok()
                .content_type("text/plain")
                .body("Joined network successfully");
        }
    }
    HttpResponse::InternalServerError()
        .content_type("text/plain")
        .body("Node has NOT recovered")
}

pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.service(helloworld)
        .service(get_storage)
        .service(put_storage)
        .service(get_network)
        .service(get_node)
        .service(get_node_info)
        .service(post_join)
        .service(api_join)
        .service(post_leave)
        .service(post_sim_crash)
        .service(post_sim_recover);
}
