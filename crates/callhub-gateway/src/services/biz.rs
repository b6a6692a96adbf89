use async_trait::async_trait;
use serde_json::{json, Value};

use callhub_core::error::{HubError, Result};

use crate::dispatch::{CallMeta, UnaryService};

/// Business endpoints. Each method echoes its request (`{}` when empty).
#[derive(Default)]
pub struct BizService;

impl BizService {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl UnaryService for BizService {
    fn service(&self) -> &'static str {
        "Biz"
    }

    async fn call(&self, meta: &CallMeta, method: &str, req: Value) -> Result<Value> {
        match method {
            "Check" | "Add" | "Test" => Ok(if req.is_null() { json!({}) } else { req }),
            _ => Err(HubError::UnknownMethod(meta.method.clone())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use crate::dispatch::Dispatcher;

    fn meta(method: &str) -> CallMeta {
        CallMeta::new(Some("biz_user".into()), method, "127.0.0.1:1")
    }

    #[tokio::test]
    async fn biz_methods_echo_the_request() {
        let d = Dispatcher::new();
        d.register_unary(Arc::new(BizService::new()));

        let out = d.dispatch_unary(&meta("Biz/Add"), json!({"n": 1})).await.unwrap();
        assert_eq!(out, json!({"n": 1}));

        let out = d.dispatch_unary(&meta("Biz/Check"), Value::Null).await.unwrap();
        assert_eq!(out, json!({}));
    }

    #[tokio::test]
    async fn unknown_service_or_method_is_unimplemented() {
        let d = Dispatcher::new();
        d.register_unary(Arc::new(BizService::new()));

        for m in ["Biz/Nope", "Other/Check"] {
            let err = d.dispatch_unary(&meta(m), Value::Null).await.unwrap_err();
            assert_eq!(err.client_code().as_str(), "UNIMPLEMENTED", "method={m}");
        }
        let err = d.dispatch_unary(&meta("Check"), Value::Null).await.unwrap_err();
        assert_eq!(err.client_code().as_str(), "BAD_REQUEST");
    }
}
