//! Wire-format records for the JSON-bearing endpoints. Field names and
//! shapes are plain address strings rather than id+address composites, so
//! existing clients keep working unmodified.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NetworkView {
    pub successor: String,
    pub predecessor: String,
    pub finger_table: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NodeView {
    pub node_name: String,
    pub node_port: u16,
    pub successor: String,
    pub predecessor: String,
    pub finger_table: Vec<String>,
    pub key_value_store: HashMap<String, String>,
    pub node_id: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NodeInfoView {
    pub node_hash: u64,
    pub successor: String,
    pub others: Vec<String>,
}
