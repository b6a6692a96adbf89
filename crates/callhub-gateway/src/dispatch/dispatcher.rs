use std::sync::Arc;

use async_trait::async_trait;
use dashmap::DashMap;
use serde_json::Value;

use callhub_core::error::{HubError, Result};

use crate::dispatch::CallMeta;

/// Request/response services, addressed as `Service/Method`.
#[async_trait]
pub trait UnaryService: Send + Sync {
    fn service(&self) -> &'static str;
    async fn call(&self, meta: &CallMeta, method: &str, req: Value) -> Result<Value>;
}

/// `Biz/Check` -> (`Biz`, `Check`).
pub fn split_method(full: &str) -> Result<(&str, &str)> {
    match full.split_once('/') {
        Some((svc, m)) if !svc.is_empty() && !m.is_empty() => Ok((svc, m)),
        _ => Err(HubError::BadRequest(format!(
            "invalid method name: {full} (expected Service/Method)"
        ))),
    }
}

/// Registry and dispatcher for unary services.
#[derive(Default)]
pub struct Dispatcher {
    unary: DashMap<&'static str, Arc<dyn UnaryService>>,
}

impl Dispatcher {
    pub fn new() -> Self {
        Self {
            unary: DashMap::new(),
        }
    }

    pub fn register_unary(&self, svc: Arc<dyn UnaryService>) {
        self.unary.insert(svc.service(), svc);
    }

    pub fn registered_services(&self) -> Vec<&'static str> {
        self.unary.iter().map(|e| *e.key()).collect()
    }

    pub async fn dispatch_unary(&self, meta: &CallMeta, req: Value) -> Result<Value> {
        let (svc, method) = split_method(&meta.method)?;
        let handler = self
            .unary
            .get(svc)
            .ok_or_else(|| HubError::UnknownMethod(meta.method.clone()))?
            .value()
            .clone();
        handler.call(meta, method, req).await
    }
}
