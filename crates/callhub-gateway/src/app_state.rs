//! Shared application state for the callhub gateway.
//!
//! Compiles the ACL, creates the hub registries, wires the interceptor and
//! dispatcher, and registers the built-in services. Startup errors are
//! returned, never panicked on.

use std::sync::Arc;

use callhub_core::acl::MethodPattern;
use callhub_core::error::{HubError, Result};

use crate::config::HubConfig;
use crate::dispatch::{split_method, CallInterceptor, Dispatcher};
use crate::hub::Hub;
use crate::obs::HubMetrics;
use crate::policy::AclStore;
use crate::services::{admin, BizService};

#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
    hub: Arc<Hub>,
    interceptor: Arc<CallInterceptor>,
    dispatcher: Arc<Dispatcher>,
}

struct AppStateInner {
    metrics: Arc<HubMetrics>,
}

impl AppState {
    pub fn new(cfg: HubConfig) -> Result<Self> {
        // 1) Compile the ACL (fatal on malformed patterns)
        let acl = Arc::new(AclStore::from_map(&cfg.acl)?);

        // 2) Core components
        let metrics = Arc::new(HubMetrics::default());
        let hub = Arc::new(Hub::new(&cfg.hub, Arc::clone(&metrics)));
        let interceptor = Arc::new(CallInterceptor::new(Arc::clone(&acl), Arc::clone(&hub)));
        let dispatcher = Dispatcher::new();

        // 3) Built-in services
        dispatcher.register_unary(Arc::new(BizService::new()));

        // acl <-> dispatcher sanity check (exact patterns only)
        let services = dispatcher.registered_services();
        for consumer in acl.consumers() {
            for pattern in acl.patterns(consumer).unwrap_or_default() {
                if references_unknown_service(pattern, &services) {
                    tracing::warn!(consumer = %consumer, pattern = %pattern.as_str(), "acl refers to unregistered service");
                    if cfg.hub.strict_acl {
                        return Err(HubError::ConfigInvalid(format!(
                            "consumer {consumer} acl references unregistered service: {}",
                            pattern.as_str()
                        )));
                    }
                }
            }
        }

        tracing::info!(consumers = acl.len(), "acl compiled");

        Ok(Self {
            inner: Arc::new(AppStateInner { metrics }),
            hub,
            interceptor,
            dispatcher: Arc::new(dispatcher),
        })
    }

    pub fn metrics(&self) -> &HubMetrics {
        &self.inner.metrics
    }

    pub fn hub(&self) -> Arc<Hub> {
        Arc::clone(&self.hub)
    }

    pub fn interceptor(&self) -> Arc<CallInterceptor> {
        Arc::clone(&self.interceptor)
    }

    pub fn dispatcher(&self) -> Arc<Dispatcher> {
        Arc::clone(&self.dispatcher)
    }

    pub fn is_draining(&self) -> bool {
        self.hub.is_shutting_down()
    }
}

fn references_unknown_service(pattern: &MethodPattern, services: &[&'static str]) -> bool {
    let raw = pattern.as_str();
    if raw.contains('*') {
        return false;
    }
    match split_method(raw) {
        Ok((svc, _)) => svc != admin::SERVICE && !services.contains(&svc),
        // bare method names apply to every service
        Err(_) => false,
    }
}
