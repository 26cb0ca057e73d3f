//! Engine protocol message types. 64-bit numbers travel as `0x` hex strings.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::ServiceError;

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(tag = "req", rename_all = "camelCase")]
pub enum EngineRequest {
    Open { seq: u64, path: String },
    Execute { seq: u64, command: String },
    DisassembleFunction { seq: u64, address: String },
    Shutdown { seq: u64 },
}

impl EngineRequest {
    pub fn seq(&self) -> u64 {
        match self {
            EngineRequest::Open { seq, .. }
            | EngineRequest::Execute { seq, .. }
            | EngineRequest::DisassembleFunction { seq, .. }
            | EngineRequest::Shutdown { seq } => *seq,
        }
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum FailureKind {
    Undecodable,
    Failed,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct EngineFailure {
    pub kind: FailureKind,
    pub message: String,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct EngineReply {
    pub seq: u64,
    #[serde(default)]
    pub result: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<EngineFailure>,
}

impl EngineReply {
    pub fn ok(seq: u64, result: Value) -> Self {
        Self {
            seq,
            result: Some(result),
            error: None,
        }
    }

    pub fn failed(seq: u64, error: &ServiceError) -> Self {
        let kind = match error {
            ServiceError::Undecodable(_) => FailureKind::Undecodable,
            _ => FailureKind::Failed,
        };
        Self {
            seq,
            result: None,
            error: Some(EngineFailure {
                kind,
                message: error.to_string(),
            }),
        }
    }

    /// The result payload, or the engine's failure as a `ServiceError`.
    /// `address` is the subject of a `disassembleFunction` request, if any.
    pub fn into_result(self, address: Option<u64>) -> Result<Value, ServiceError> {
        match (self.error, address) {
            (None, _) => Ok(self.result.unwrap_or(Value::Null)),
            (Some(f), Some(addr)) if f.kind == FailureKind::Undecodable => {
                Err(ServiceError::Undecodable(addr))
            }
            (Some(f), _) => Err(ServiceError::Remote(f.message)),
        }
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct ExecuteResult {
    pub output: String,
}

/// Parse hex address from string (supports "0x1234" or "1234" format)
pub fn parse_hex_address(input: &str) -> Option<u64> {
    let trimmed = input.trim();
    let hex_str = trimmed.strip_prefix("0x").unwrap_or(trimmed);
    u64::from_str_radix(hex_str, 16).ok()
}
