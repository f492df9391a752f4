use crate::config;
use crate::error::{AppError, AppResult};
use serde::Deserialize;
use std::collections::HashMap;

/// Leaf element name to text, for one `<item>`.
pub type RawItem = HashMap<String, String>;

// Both envelopes are read through one root: the service's own
// `<response>` and the portal gateway's `<OpenAPI_ServiceResponse>`.
#[derive(Deserialize, Debug, Default)]
struct RawResponse {
    #[serde(default)]
    header: Option<ResponseHeader>,
    #[serde(default)]
    body: Option<ResponseBody>,
    #[serde(default, rename = "cmmMsgHeader")]
    gateway: Option<GatewayHeader>,
}

#[derive(Deserialize, Debug, Default)]
#[serde(rename_all = "camelCase")]
struct ResponseHeader {
    #[serde(default)]
    result_code: Option<String>,
    #[serde(default)]
    result_msg: Option<String>,
}

#[derive(Deserialize, Debug, Default)]
#[serde(rename_all = "camelCase")]
struct ResponseBody {
    #[serde(default)]
    items: Option<ResponseItems>,
    #[serde(default)]
    total_count: Option<String>,
}

#[derive(Deserialize, Debug, Default)]
struct ResponseItems {
    #[serde(default)]
    item: Vec<RawItem>,
}

#[derive(Deserialize, Debug, Default)]
#[serde(rename_all = "camelCase")]
struct GatewayHeader {
    #[serde(default)]
    err_msg: Option<String>,
    #[serde(default)]
    return_auth_msg: Option<String>,
    #[serde(default)]
    return_reason_code: Option<String>,
}

#[derive(Debug, Default, Clone, PartialEq)]
pub struct ApiEnvelope {
    pub result_code: Option<String>,
    pub result_msg: Option<String>,
    pub total_count: Option<String>,
    pub reason_code: Option<String>,
    pub auth_msg: Option<String>,
    pub err_msg: Option<String>,
    pub items: Vec<RawItem>,
}

impl From<RawResponse> for ApiEnvelope {
    fn from(raw: RawResponse) -> Self {
        let header = raw.header.unwrap_or_default();
        let body = raw.body.unwrap_or_default();
        let gateway = raw.gateway.unwrap_or_default();
        ApiEnvelope {
            result_code: header.result_code,
            result_msg: header.result_msg,
            total_count: body.total_count,
            reason_code: gateway.return_reason_code,
            auth_msg: gateway.return_auth_msg,
            err_msg: gateway.err_msg,
            items: body.items.map(|items| items.item).unwrap_or_default(),
        }
    }
}

impl ApiEnvelope {
    pub fn parse(bytes: &[u8]) -> AppResult<ApiEnvelope> {
        quick_xml::de::from_reader::<_, RawResponse>(bytes)
            .map(ApiEnvelope::from)
            .map_err(|e| AppError::Parse(format!("XML error: {}", e)))
    }

    /// Checks the result status, mapping any non-success code to `AppError::Api`.
    pub fn ensure_success(self) -> AppResult<ApiEnvelope> {
        match self.result_code.as_deref() {
            Some(config::RESULT_CODE_SUCCESS) => Ok(self),
            Some(code) => Err(AppError::api_error(
                code,
                self.result_msg.clone().unwrap_or_default(),
            )),
            None => match self.reason_code.as_deref() {
                Some(code) => {
                    let message = self
                        .auth_msg
                        .clone()
                        .or_else(|| self.err_msg.clone())
                        .unwrap_or_default();
                    Err(AppError::api_error(code, message))
                }
                None => Err(AppError::Parse(
                    "response has no resultCode element".to_string(),
                )),
            },
        }
    }

    pub fn total_count(&self) -> AppResult<u64> {
        let raw = self
            .total_count
            .as_deref()
            .ok_or_else(|| AppError::Parse("response has no totalCount element".to_string()))?;
        raw.trim()
            .parse::<u64>()
            .map_err(|e| AppError::Parse(format!("invalid totalCount '{}': {}", raw, e)))
    }
}
