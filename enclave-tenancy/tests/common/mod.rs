//! Shared test helpers for tenancy tests.

#![allow(dead_code)]

use enclave_tenancy::{NamespaceName, SchemaBackend, TenancyError, TenancyResult};
use std::collections::HashSet;
use std::sync::Mutex;

/// A backend that records every directive it receives and can be told to
/// reject specific namespaces.
#[derive(Default)]
pub struct RecordingBackend {
    directives: Mutex<Vec<String>>,
    failing: Mutex<HashSet<String>>,
    fail_reset: Mutex<bool>,
}

impl RecordingBackend {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn fail_on(&self, namespace: &str) {
        self.failing.lock().unwrap().insert(namespace.to_string());
    }

    pub fn fail_reset(&self, fail: bool) {
        *self.fail_reset.lock().unwrap() = fail;
    }

    pub fn directives(&self) -> Vec<String> {
        self.directives.lock().unwrap().clone()
    }

    /// The schema the last directive left active.
    pub fn active(&self) -> Option<String> {
        self.directives.lock().unwrap().last().cloned()
    }
}

impl SchemaBackend for RecordingBackend {
    fn set_search_path(&self, namespace: &NamespaceName) -> TenancyResult<()> {
        if self.failing.lock().unwrap().contains(namespace.as_str()) {
            return Err(TenancyError::SchemaSwitchFailed {
                namespace: namespace.to_string(),
                reason: "backend unavailable".into(),
            });
        }
        self.directives.lock().unwrap().push(namespace.to_string());
        Ok(())
    }

    fn reset_search_path(&self) -> TenancyResult<()> {
        if *self.fail_reset.lock().unwrap() {
            return Err(TenancyError::SchemaSwitchFailed {
                namespace: "public".into(),
                reason: "backend unavailable".into(),
            });
        }
        self.directives.lock().unwrap().push("public".to_string());
        Ok(())
    }
}

pub fn ns(name: &str) -> NamespaceName {
    NamespaceName::new(name).unwrap()
}
