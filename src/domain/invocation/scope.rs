//! Per-call inputs supplied by the service adapter

use std::collections::HashMap;
use std::sync::Arc;

use serde_json::Value;
use tokio_util::sync::CancellationToken;

/// Caller data visible to selection modes: an optional identity plus free-form attributes
#[derive(Debug, Clone, Default)]
pub struct CallScope {
    identity: Option<String>,
    attributes: HashMap<String, String>,
}

impl CallScope {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_identity(mut self, identity: impl Into<String>) -> Self {
        self.identity = Some(identity.into());
        self
    }

    pub fn with_attribute(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.attributes.insert(name.into(), value.into());
        self
    }

    pub fn identity(&self) -> Option<&str> {
        self.identity.as_deref()
    }

    pub fn attribute(&self, name: &str) -> Option<&str> {
        self.attributes.get(name).map(String::as_str)
    }

    pub fn attributes(&self) -> &HashMap<String, String> {
        &self.attributes
    }
}

/// One intercepted call: method name, arguments, scope and cancellation signal
#[derive(Debug, Clone)]
pub struct Invocation {
    method: String,
    arguments: Arc<[Value]>,
    scope: Arc<CallScope>,
    cancellation: CancellationToken,
}

impl Invocation {
    pub fn new(method: impl Into<String>) -> Self {
        Self {
            method: method.into(),
            arguments: Arc::from(Vec::new()),
            scope: Arc::new(CallScope::default()),
            cancellation: CancellationToken::new(),
        }
    }

    /// Arguments as JSON, for decorators that record them
    pub fn with_arguments(mut self, arguments: Vec<Value>) -> Self {
        self.arguments = Arc::from(arguments);
        self
    }

    pub fn with_scope(mut self, scope: CallScope) -> Self {
        self.scope = Arc::new(scope);
        self
    }

    pub fn with_identity(self, identity: impl Into<String>) -> Self {
        let scope = (*self.scope).clone().with_identity(identity);
        self.with_scope(scope)
    }

    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancellation = token;
        self
    }

    pub fn method(&self) -> &str {
        &self.method
    }

    pub fn arguments(&self) -> &Arc<[Value]> {
        &self.arguments
    }

    pub fn scope(&self) -> &Arc<CallScope> {
        &self.scope
    }

    pub fn cancellation(&self) -> &CancellationToken {
        &self.cancellation
    }
}
