//! Networked etcd v3 backend.
//!
//! Talks to the etcd gRPC gateway (`/v3/kv/*`) with blocking HTTP requests.
//! Keys and values travel base64-encoded, as the gateway requires.

use std::time::Duration;

use base64::{engine::general_purpose::STANDARD, Engine as _};
use serde::{Deserialize, Serialize};
use url::Url;

use super::Backend;
use crate::error::{ConfigError, ConfigResult};

const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

pub struct EtcdBackend {
    base: Url,
    http: reqwest::blocking::Client,
}

#[derive(Serialize)]
struct KeyRequest {
    key: String,
}

#[derive(Serialize)]
struct PutRequest {
    key: String,
    value: String,
}

/// One operation of a `/v3/kv/txn` request.
#[derive(Serialize)]
#[serde(rename_all = "snake_case")]
enum TxnOp {
    RequestPut(PutRequest),
    RequestDeleteRange(KeyRequest),
}

/// A transaction without compares: the `success` branch always runs.
#[derive(Serialize)]
struct TxnRequest {
    success: Vec<TxnOp>,
}

#[derive(Deserialize)]
struct TxnResponse {
    #[serde(default)]
    succeeded: bool,
}

#[derive(Deserialize)]
struct RangeResponse {
    #[serde(default)]
    kvs: Vec<KeyValue>,
}

#[derive(Deserialize)]
struct KeyValue {
    #[serde(default)]
    value: String,
}

#[derive(Deserialize)]
struct DeleteResponse {
    // int64 fields are rendered as strings by the gateway
    #[serde(default)]
    deleted: Option<String>,
}

impl EtcdBackend {
    pub fn connect(host: &str, port: u16) -> ConfigResult<Self> {
        let base = Url::parse(&format!("http://{host}:{port}/"))
            .map_err(|e| {
                ConfigError::backend(format!("invalid etcd endpoint {host}:{port}: {e}"))
            })?;
        let http = reqwest::blocking::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .map_err(|e| ConfigError::backend(format!("failed to build http client: {e}")))?;
        Ok(Self { base, http })
    }

    fn post<B, R>(&self, path: &str, body: &B) -> ConfigResult<R>
    where
        B: Serialize,
        R: for<'de> Deserialize<'de>,
    {
        let url = self
            .base
            .join(path)
            .map_err(|e| ConfigError::backend(format!("invalid etcd path {path}: {e}")))?;
        let resp = self
            .http
            .post(url)
            .json(body)
            .send()
            .map_err(|e| ConfigError::backend(format!("etcd request failed: {e}")))?;

        let status = resp.status();
        if !status.is_success() {
            return Err(ConfigError::backend(format!("etcd http error: {status}")));
        }
        resp.json::<R>()
            .map_err(|e| ConfigError::backend(format!("invalid etcd response: {e}")))
    }
}

impl Backend for EtcdBackend {
    fn name(&self) -> &str {
        "etcd3"
    }

    fn get(&self, key: &str) -> ConfigResult<Option<String>> {
        let req = KeyRequest { key: STANDARD.encode(key) };
        let resp: RangeResponse = self.post("v3/kv/range", &req)?;
        let Some(kv) = resp.kvs.into_iter().next() else {
            return Ok(None);
        };
        let raw = STANDARD
            .decode(kv.value.as_bytes())
            .map_err(|e| ConfigError::backend(format!("invalid base64 value for {key}: {e}")))?;
        let text = String::from_utf8(raw)
            .map_err(|e| ConfigError::backend(format!("non utf-8 value for {key}: {e}")))?;
        Ok(Some(text))
    }

    fn put(&self, key: &str, value: &str) -> ConfigResult<()> {
        let _: serde_json::Value = self.post(
            "v3/kv/put",
            &PutRequest {
                key: STANDARD.encode(key),
                value: STANDARD.encode(value),
            },
        )?;
        Ok(())
    }

    fn delete(&self, key: &str) -> ConfigResult<bool> {
        let req = KeyRequest { key: STANDARD.encode(key) };
        let resp: DeleteResponse = self.post("v3/kv/deleterange", &req)?;
        let n = resp
            .deleted
            .as_deref()
            .and_then(|s| s.parse::<u64>().ok())
            .unwrap_or(0);
        Ok(n > 0)
    }

    fn apply(&self, writes: &[(String, Option<String>)]) -> ConfigResult<()> {
        let req = txn_request(writes);
        let resp: TxnResponse = self.post("v3/kv/txn", &req)?;
        if !resp.succeeded {
            return Err(ConfigError::backend("etcd transaction was not applied"));
        }
        Ok(())
    }
}

fn txn_request(writes: &[(String, Option<String>)]) -> TxnRequest {
    let success = writes
        .iter()
        .map(|(key, value)| match value {
            Some(v) => TxnOp::RequestPut(PutRequest {
                key: STANDARD.encode(key),
                value: STANDARD.encode(v),
            }),
            None => TxnOp::RequestDeleteRange(KeyRequest { key: STANDARD.encode(key) }),
        })
        .collect();
    TxnRequest { success }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn connect_builds_base_url() {
        let b = EtcdBackend::connect("localhost", 2379).unwrap();
        assert_eq!(b.base.as_str(), "http://localhost:2379/");
        assert_eq!(
            b.base.join("v3/kv/range").unwrap().as_str(),
            "http://localhost:2379/v3/kv/range"
        );
    }

    #[test]
    fn range_response_without_kvs_is_empty() {
        let r: RangeResponse = serde_json::from_str(r#"{"header":{"revision":"7"}}"#).unwrap();
        assert!(r.kvs.is_empty());
    }

    #[test]
    fn batch_becomes_single_txn_request() {
        let req = txn_request(&[
            ("/pb/x".to_string(), Some("{}".to_string())),
            ("/eb/y".to_string(), None),
        ]);
        let body = serde_json::to_value(&req).unwrap();
        assert_eq!(
            body,
            serde_json::json!({
                "success": [
                    {"request_put": {
                        "key": STANDARD.encode("/pb/x"),
                        "value": STANDARD.encode("{}")
                    }},
                    {"request_delete_range": {"key": STANDARD.encode("/eb/y")}}
                ]
            })
        );
    }
}
