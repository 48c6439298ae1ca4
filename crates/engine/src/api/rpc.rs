//! JSON-RPC 2.0 endpoint.
//!
//! Single POST endpoint at `/rpc` dispatching on the `method` field, plus a
//! plain `/health` probe. Error codes follow the JSON-RPC 2.0 reserved range
//! with two server-defined codes:
//! - `-32001` user not found
//! - `-32002` concurrent update conflict (client should retry)

use std::sync::Arc;

use axum::extract::State;
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use playvault_domain::entities::Item;

use crate::app::App;
use crate::application::ServiceError;

const INVALID_REQUEST: i64 = -32600;
const METHOD_NOT_FOUND: i64 = -32601;
const INVALID_PARAMS: i64 = -32602;
const INTERNAL_ERROR: i64 = -32603;
const USER_NOT_FOUND: i64 = -32001;
const UPDATE_CONFLICT: i64 = -32002;

pub fn routes() -> Router<Arc<App>> {
    Router::new()
        .route("/rpc", post(handle_rpc))
        .route("/health", get(health))
}

async fn health() -> Json<Value> {
    Json(json!({ "status": "ok" }))
}

#[derive(Debug, Deserialize)]
struct RpcRequest {
    jsonrpc: String,
    method: String,
    #[serde(default)]
    params: Value,
    #[serde(default)]
    id: Value,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GetParams {
    user_id: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct CreateParams {
    user_id: String,
    nickname: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct AddExpParams {
    user_id: String,
    amount: u64,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct AddItemParams {
    user_id: String,
    item: Item,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PurchaseParams {
    user_id: String,
    item: Item,
    #[serde(default)]
    gold_cost: u64,
    #[serde(default)]
    gem_cost: u64,
}

async fn handle_rpc(State(app): State<Arc<App>>, Json(body): Json<Value>) -> Json<Value> {
    let request: RpcRequest = match serde_json::from_value(body) {
        Ok(request) => request,
        Err(e) => {
            return Json(error_response(
                Value::Null,
                INVALID_REQUEST,
                &format!("Invalid request: {e}"),
            ));
        }
    };
    if request.jsonrpc != "2.0" {
        return Json(error_response(
            request.id,
            INVALID_REQUEST,
            "Expected jsonrpc \"2.0\"",
        ));
    }

    let id = request.id;
    match dispatch(&app, &request.method, request.params).await {
        Ok(result) => Json(json!({ "jsonrpc": "2.0", "result": result, "id": id })),
        Err((code, message)) => {
            tracing::debug!(method = %request.method, code, %message, "RPC error");
            Json(error_response(id, code, &message))
        }
    }
}

async fn dispatch(app: &App, method: &str, params: Value) -> Result<Value, (i64, String)> {
    match method {
        "user.get" => {
            let p: GetParams = parse(params)?;
            to_result(app.users.get_user(&p.user_id).await.map_err(map_err)?)
        }
        "user.create" => {
            let p: CreateParams = parse(params)?;
            to_result(
                app.users
                    .create_user(&p.user_id, &p.nickname)
                    .await
                    .map_err(map_err)?,
            )
        }
        "user.addExp" => {
            let p: AddExpParams = parse(params)?;
            to_result(
                app.users
                    .add_exp(&p.user_id, p.amount)
                    .await
                    .map_err(map_err)?,
            )
        }
        "user.addItem" => {
            let p: AddItemParams = parse(params)?;
            to_result(
                app.users
                    .add_item(&p.user_id, p.item)
                    .await
                    .map_err(map_err)?,
            )
        }
        "user.purchase" => {
            let p: PurchaseParams = parse(params)?;
            to_result(
                app.users
                    .purchase(&p.user_id, p.item, p.gold_cost, p.gem_cost)
                    .await
                    .map_err(map_err)?,
            )
        }
        _ => Err((METHOD_NOT_FOUND, format!("Unknown method: {method}"))),
    }
}

fn parse<T: DeserializeOwned>(params: Value) -> Result<T, (i64, String)> {
    serde_json::from_value(params).map_err(|e| (INVALID_PARAMS, format!("Invalid params: {e}")))
}

fn to_result<T: Serialize>(value: T) -> Result<Value, (i64, String)> {
    serde_json::to_value(value).map_err(|e| (INTERNAL_ERROR, e.to_string()))
}

fn map_err(e: ServiceError) -> (i64, String) {
    let code = match &e {
        ServiceError::Validation(_) | ServiceError::Domain(_) | ServiceError::AlreadyExists(_) => {
            INVALID_PARAMS
        }
        ServiceError::NotFound(_) => USER_NOT_FOUND,
        ServiceError::Conflict { .. } => UPDATE_CONFLICT,
        ServiceError::Internal(_) => INTERNAL_ERROR,
    };
    (code, e.to_string())
}

fn error_response(id: Value, code: i64, message: &str) -> Value {
    json!({
        "jsonrpc": "2.0",
        "error": { "code": code, "message": message },
        "id": id,
    })
}
