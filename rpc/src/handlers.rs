//! RPC request handlers.

use std::sync::Arc;

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::Json;
use serde::{Deserialize, Serialize};

use lattice_instructions::Instruction;
use lattice_types::{AccountAddress, ClusterId, InstructionId};

use crate::handle::{AccountView, NodeHandle};

/// Shared state for every handler.
#[derive(Clone)]
pub struct RpcState {
    pub node: Arc<dyn NodeHandle>,
}

// ── Submit ───────────────────────────────────────────────────────────────

#[derive(Deserialize)]
pub struct SubmitRequest {
    pub cluster_id: String,
    pub instruction: Instruction,
}

#[derive(Serialize)]
pub struct SubmitResponse {
    pub accepted: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fee: Option<u128>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}

pub async fn submit(
    State(state): State<RpcState>,
    Json(request): Json<SubmitRequest>,
) -> (StatusCode, Json<SubmitResponse>) {
    let cluster = ClusterId::new(request.cluster_id);
    match state.node.submit(&cluster, request.instruction) {
        Ok(receipt) => (
            StatusCode::OK,
            Json(SubmitResponse {
                accepted: true,
                id: Some(receipt.id.to_hex()),
                fee: Some(receipt.fee),
                reason: None,
            }),
        ),
        Err(reason) => (
            StatusCode::UNPROCESSABLE_ENTITY,
            Json(SubmitResponse {
                accepted: false,
                id: None,
                fee: None,
                reason: Some(reason),
            }),
        ),
    }
}

// ── Status ───────────────────────────────────────────────────────────────

#[derive(Serialize)]
pub struct StatusResponse {
    pub id: String,
    pub status: String,
}

pub async fn instruction_status(
    State(state): State<RpcState>,
    Path((cluster_id, id)): Path<(String, String)>,
) -> Result<Json<StatusResponse>, StatusCode> {
    let cluster = ClusterId::new(cluster_id);
    let id = InstructionId::from_hex(&id).ok_or(StatusCode::BAD_REQUEST)?;
    let status = state
        .node
        .instruction_status(&cluster, &id)
        .ok_or(StatusCode::NOT_FOUND)?;
    Ok(Json(StatusResponse {
        id: id.to_hex(),
        status: format!("{status:?}"),
    }))
}

// ── Account ──────────────────────────────────────────────────────────────

pub async fn account(
    State(state): State<RpcState>,
    Path((cluster_id, address)): Path<(String, String)>,
) -> Result<Json<AccountView>, StatusCode> {
    if !address.starts_with(AccountAddress::PREFIX) {
        return Err(StatusCode::BAD_REQUEST);
    }
    let cluster = ClusterId::new(cluster_id);
    let address = AccountAddress::new(address);
    state
        .node
        .account(&cluster, &address)
        .map(Json)
        .ok_or(StatusCode::NOT_FOUND)
}

// ── Health ───────────────────────────────────────────────────────────────

pub async fn health() -> &'static str {
    "ok"
}
