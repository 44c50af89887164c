//! JSON-RPC envelope construction
//!
//! Maps results and [`ProtocolFault`]s onto JSON-RPC 2.0 response objects.
//! Ids the SDK cannot represent (null, absent, fractional) are echoed as raw JSON.

use rust_mcp_sdk::schema::{
    JsonrpcErrorResponse, JsonrpcResultResponse, RequestId, Result as McpResult, RpcError,
};
use serde_json::{json, Value};

use crate::errors::ProtocolFault;

pub fn is_json_rpc_error(value: &Value) -> bool {
    value.get("error").is_some()
}

pub fn fault_to_json_rpc(id: Option<Value>, fault: &ProtocolFault) -> Value {
    json_rpc_error_with_data(id, fault.code(), &fault.public_message(), fault.data())
}

pub fn json_rpc_error(id: Option<Value>, code: i64, message: &str) -> Value {
    json_rpc_error_with_data(id, code, message, None)
}

pub fn json_rpc_error_with_data(
    id: Option<Value>,
    code: i64,
    message: &str,
    data: Option<Value>,
) -> Value {
    let fallback = |id: Option<Value>, data: Option<Value>| {
        let mut error = json!({ "code": code, "message": message });
        if let Some(data) = data {
            error["data"] = data;
        }
        json!({
            "jsonrpc": "2.0",
            "id": id.unwrap_or(Value::Null),
            "error": error
        })
    };

    let Some(request_id) = id.as_ref().and_then(value_to_request_id) else {
        return fallback(id, data);
    };

    let response = JsonrpcErrorResponse::new(
        RpcError {
            code,
            data: data.clone(),
            message: message.to_string(),
        },
        Some(request_id),
    );
    serde_json::to_value(response).unwrap_or_else(|_| fallback(id, data))
}

pub fn json_rpc_result(id: Option<Value>, result: Value) -> Value {
    let fallback = |id: Option<Value>, result: Value| {
        json!({
            "jsonrpc": "2.0",
            "id": id.unwrap_or(Value::Null),
            "result": result
        })
    };

    let (Some(request_id), Some(extra)) = (
        id.as_ref().and_then(value_to_request_id),
        result.as_object().cloned(),
    ) else {
        return fallback(id, result);
    };

    let response = JsonrpcResultResponse::new(
        request_id,
        McpResult {
            meta: None,
            extra: Some(extra),
        },
    );
    serde_json::to_value(response).unwrap_or_else(|_| fallback(id, result))
}

pub fn value_to_request_id(value: &Value) -> Option<RequestId> {
    if let Some(string_id) = value.as_str() {
        return Some(RequestId::String(string_id.to_string()));
    }

    value.as_i64().map(RequestId::Integer)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_echoes_numeric_id() {
        let response = json_rpc_error(Some(json!(7)), -32601, "Method not found");

        assert_eq!(response["jsonrpc"], "2.0");
        assert_eq!(response["id"], 7);
        assert_eq!(response["error"]["code"], -32601);
        assert_eq!(response["error"]["message"], "Method not found");
        assert!(response.get("result").is_none());
    }

    #[test]
    fn error_without_id_uses_null() {
        let response = json_rpc_error(None, -32600, "Invalid Request");

        assert!(response["id"].is_null());
        assert!(response.as_object().expect("object").contains_key("id"));
    }

    #[test]
    fn error_carries_data() {
        let fault = ProtocolFault::invalid_params("Resource not found");
        let response = fault_to_json_rpc(Some(json!("abc")), &fault);

        assert_eq!(response["id"], "abc");
        assert_eq!(response["error"]["code"], -32602);
        assert_eq!(response["error"]["message"], "Invalid params");
        assert_eq!(response["error"]["data"]["message"], "Resource not found");
    }

    #[test]
    fn result_echoes_string_id() {
        let response = json_rpc_result(Some(json!("req-1")), json!({ "tools": [] }));

        assert_eq!(response["jsonrpc"], "2.0");
        assert_eq!(response["id"], "req-1");
        assert_eq!(response["result"]["tools"], json!([]));
        assert!(!is_json_rpc_error(&response));
    }

    #[test]
    fn result_keeps_unusual_ids_verbatim() {
        let response = json_rpc_result(Some(json!(1.5)), json!({}));
        assert_eq!(response["id"], json!(1.5));
        assert_eq!(response["result"], json!({}));

        let response = json_rpc_result(Some(Value::Null), json!({}));
        assert!(response["id"].is_null());
    }
}
