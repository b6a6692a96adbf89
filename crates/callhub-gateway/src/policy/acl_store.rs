use std::collections::{BTreeMap, HashMap};

use callhub_core::acl::{compile_patterns, is_method_allowed, MethodPattern};
use callhub_core::error::{HubError, Result};

/// Compiled ACL: consumer -> method patterns.
/// Construct once at startup, then share via Arc.
#[derive(Debug, Default)]
pub struct AclStore {
    rules: HashMap<String, Vec<MethodPattern>>,
}

impl AclStore {
    pub fn from_map(raw: &BTreeMap<String, Vec<String>>) -> Result<Self> {
        let mut rules = HashMap::with_capacity(raw.len());
        for (consumer, patterns) in raw {
            if consumer.is_empty() {
                return Err(HubError::ConfigInvalid("acl consumer name must not be empty".into()));
            }
            let compiled = compile_patterns(patterns).map_err(|e| {
                HubError::ConfigInvalid(format!("acl compile failed (consumer={consumer}): {e}"))
            })?;
            rules.insert(consumer.clone(), compiled);
        }
        Ok(Self { rules })
    }

    /// Parse the `{"consumer": ["pattern", ...]}` blob form.
    pub fn from_json(blob: &str) -> Result<Self> {
        Self::from_map(&acl_map_from_json(blob)?)
    }

    /// Gate one call.
    ///
    /// - missing or empty consumer => `Unauthenticated`
    /// - consumer without an entry => `Unauthenticated`
    /// - no pattern matches `method` => `Forbidden`
    pub fn authorize(&self, consumer: Option<&str>, method: &str) -> Result<()> {
        let consumer = match consumer {
            Some(c) if !c.is_empty() => c,
            _ => return Err(HubError::Unauthenticated("empty consumer".into())),
        };

        let rules = self
            .rules
            .get(consumer)
            .ok_or_else(|| HubError::Unauthenticated(format!("unknown consumer: {consumer}")))?;

        if !is_method_allowed(rules, method) {
            return Err(HubError::Forbidden(format!(
                "method {method} is forbidden for consumer {consumer}"
            )));
        }

        Ok(())
    }

    pub fn is_authorized(&self, consumer: Option<&str>, method: &str) -> bool {
        self.authorize(consumer, method).is_ok()
    }

    pub fn patterns(&self, consumer: &str) -> Option<&[MethodPattern]> {
        self.rules.get(consumer).map(Vec::as_slice)
    }

    pub fn consumers(&self) -> impl Iterator<Item = &str> {
        self.rules.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }
}

pub fn acl_map_from_json(blob: &str) -> Result<BTreeMap<String, Vec<String>>> {
    serde_json::from_str(blob).map_err(|e| HubError::ConfigInvalid(format!("invalid acl json: {e}")))
}

#[cfg(test)]
mod tests {
    use super::*;

    const ACL: &str = r#"{
        "logger":     ["Admin/Logging"],
        "stat":       ["Admin/Statistics"],
        "biz_user":   ["Check", "Add"],
        "biz_admin":  ["Biz*"],
        "locked_out": []
    }"#;

    fn store() -> AclStore {
        AclStore::from_json(ACL).expect("acl must parse")
    }

    #[test]
    fn missing_or_empty_consumer_is_unauthenticated() {
        let acl = store();
        for consumer in [None, Some("")] {
            let err = acl.authorize(consumer, "Biz/Check").expect_err("must reject");
            assert_eq!(err.client_code().as_str(), "UNAUTHENTICATED");
        }
    }

    #[test]
    fn unknown_consumer_is_unauthenticated() {
        let err = store().authorize(Some("stranger"), "Biz/Check").expect_err("must reject");
        assert!(matches!(err, HubError::Unauthenticated(_)));
    }

    #[test]
    fn known_consumer_wrong_method_is_forbidden() {
        let acl = store();
        let err = acl.authorize(Some("biz_user"), "Biz/Test").expect_err("must reject");
        assert!(matches!(err, HubError::Forbidden(_)));

        let err = acl.authorize(Some("locked_out"), "Biz/Check").expect_err("must reject");
        assert!(matches!(err, HubError::Forbidden(_)));
    }

    #[test]
    fn exact_and_wildcard_grants() {
        let acl = store();
        assert_eq!(acl.len(), 5);
        assert!(!acl.is_empty());
        assert!(acl.is_authorized(Some("biz_user"), "Check"));
        assert!(acl.is_authorized(Some("biz_user"), "Biz/Check"));
        assert!(acl.is_authorized(Some("biz_user"), "Biz/Add"));
        assert!(!acl.is_authorized(Some("biz_user"), "Biz/CheckAll"));
        assert!(acl.is_authorized(Some("biz_admin"), "Biz/Check"));
        assert!(acl.is_authorized(Some("biz_admin"), "Biz/Test"));
        assert!(!acl.is_authorized(Some("biz_admin"), "Admin/Logging"));
    }

    #[test]
    fn malformed_blob_is_config_invalid() {
        for bad in [r#"{"a": "not-a-list"}"#, "{", r#"{"": ["x"]}"#, r#"{"a": [""]}"#] {
            let err = AclStore::from_json(bad).expect_err("must fail");
            assert_eq!(err.client_code().as_str(), "CONFIG_INVALID", "blob={bad}");
        }
    }
}
