use serde_json::{json, Value};
use thiserror::Error;

pub const INVALID_REQUEST: i64 = -32600;
pub const METHOD_NOT_FOUND: i64 = -32601;
pub const INVALID_PARAMS: i64 = -32602;
pub const INTERNAL_ERROR: i64 = -32603;

/// Faults that end a request with a JSON-RPC `error` envelope.
#[derive(Debug, Error)]
pub enum ProtocolFault {
    #[error("invalid request: {0}")]
    InvalidRequest(&'static str),
    #[error("method not found: {0}")]
    MethodNotFound(String),
    #[error("invalid params: {0}")]
    InvalidParams(String),
    #[error("internal error: {0}")]
    Internal(String),
    #[error("{message}")]
    Custom {
        code: i64,
        message: String,
        data: Option<Value>,
    },
}

impl ProtocolFault {
    pub fn invalid_params(reason: impl Into<String>) -> Self {
        Self::InvalidParams(reason.into())
    }

    pub fn internal(cause: impl Into<String>) -> Self {
        Self::Internal(cause.into())
    }

    pub fn custom(code: i64, message: impl Into<String>) -> Self {
        Self::Custom {
            code,
            message: message.into(),
            data: None,
        }
    }

    pub fn code(&self) -> i64 {
        match self {
            Self::InvalidRequest(_) => INVALID_REQUEST,
            Self::MethodNotFound(_) => METHOD_NOT_FOUND,
            Self::InvalidParams(_) => INVALID_PARAMS,
            Self::Internal(_) => INTERNAL_ERROR,
            Self::Custom { code, .. } => *code,
        }
    }

    /// Message placed in `error.message`. Internal causes never leave the process.
    pub fn public_message(&self) -> String {
        match self {
            Self::InvalidRequest(_) => "Invalid Request".to_string(),
            Self::MethodNotFound(_) => "Method not found".to_string(),
            Self::InvalidParams(_) => "Invalid params".to_string(),
            Self::Internal(_) => "Internal error".to_string(),
            Self::Custom { message, .. } => message.clone(),
        }
    }

    pub fn data(&self) -> Option<Value> {
        match self {
            Self::InvalidRequest(reason) => Some(json!({ "message": reason })),
            Self::MethodNotFound(method) => Some(json!({ "method": method })),
            Self::InvalidParams(reason) if !reason.is_empty() => {
                Some(json!({ "message": reason }))
            }
            Self::InvalidParams(_) | Self::Internal(_) => None,
            Self::Custom { data, .. } => data.clone(),
        }
    }
}

#[derive(Debug, Error)]
pub enum ToolError {
    #[error("Tool not found: {0}")]
    NotFound(String),
    #[error("Missing required parameter: {0}")]
    MissingParameter(String),
    #[error("parameter `{name}` {reason}")]
    InvalidArgument { name: String, reason: String },
    #[error("{0}")]
    Execution(String),
}

impl ToolError {
    pub fn invalid_argument(name: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidArgument {
            name: name.into(),
            reason: reason.into(),
        }
    }

    pub fn execution(message: impl Into<String>) -> Self {
        Self::Execution(message.into())
    }
}

/// Result of a tool invocation as seen by `tools/call`.
#[derive(Debug, Clone, PartialEq)]
pub enum ToolOutcome {
    Ok(Value),
    SoftError(String),
}

impl ToolOutcome {
    pub fn is_error(&self) -> bool {
        matches!(self, Self::SoftError(_))
    }
}

impl From<Result<Value, ToolError>> for ToolOutcome {
    fn from(result: Result<Value, ToolError>) -> Self {
        match result {
            Ok(value) => Self::Ok(value),
            Err(ToolError::NotFound(name)) => Self::SoftError(format!("Tool not found: {name}")),
            Err(err @ (ToolError::MissingParameter(_) | ToolError::InvalidArgument { .. })) => {
                Self::SoftError(format!("Invalid arguments: {err}"))
            }
            Err(ToolError::Execution(message)) => {
                Self::SoftError(format!("Error calling tool: {message}"))
            }
        }
    }
}

#[derive(Debug, Error)]
pub enum ResourceError {
    #[error("Invalid URI format")]
    InvalidUri,
    #[error("Access denied: path outside resource directory")]
    AccessDenied,
    #[error("Resource not found")]
    NotFound,
    #[error("Resource is not a file")]
    NotAFile,
    #[error("resource directory unavailable: {0}")]
    RootUnavailable(String),
    #[error("resource io failure: {0}")]
    Io(#[from] std::io::Error),
}

impl From<ResourceError> for ProtocolFault {
    fn from(err: ResourceError) -> Self {
        match err {
            ResourceError::RootUnavailable(_) | ResourceError::Io(_) => {
                ProtocolFault::internal(err.to_string())
            }
            _ => ProtocolFault::invalid_params(err.to_string()),
        }
    }
}

#[derive(Debug, Error, PartialEq)]
pub enum PromptError {
    #[error("prompt metadata requires a non-empty name")]
    MissingName,
    #[error("prompt metadata requires a non-empty description")]
    MissingDescription,
    #[error("prompt arguments must be a list")]
    InvalidArguments,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn internal_fault_hides_cause() {
        let fault = ProtocolFault::internal("disk exploded at /var/secret");

        assert_eq!(fault.code(), INTERNAL_ERROR);
        assert_eq!(fault.public_message(), "Internal error");
        assert!(fault.data().is_none());
    }

    #[test]
    fn custom_fault_is_propagated_verbatim() {
        let fault = ProtocolFault::custom(-32050, "quota exceeded");

        assert_eq!(fault.code(), -32050);
        assert_eq!(fault.public_message(), "quota exceeded");
    }

    #[test]
    fn resource_errors_map_to_invalid_params() {
        let fault = ProtocolFault::from(ResourceError::AccessDenied);

        assert_eq!(fault.code(), INVALID_PARAMS);
        assert_eq!(
            fault.data(),
            Some(json!({ "message": "Access denied: path outside resource directory" }))
        );
    }

    #[test]
    fn tool_errors_become_soft_messages() {
        let missing = ToolOutcome::from(Err(ToolError::MissingParameter("a".to_string())));
        assert_eq!(
            missing,
            ToolOutcome::SoftError("Invalid arguments: Missing required parameter: a".to_string())
        );

        let unknown = ToolOutcome::from(Err(ToolError::NotFound("nope".to_string())));
        assert_eq!(unknown, ToolOutcome::SoftError("Tool not found: nope".to_string()));
        assert!(unknown.is_error());
    }
}
