//! Node types: the trait, descriptors, and the registry.
//!
//! The engine never hardcodes node behavior; a [`NodeRegistry`] maps
//! node-type names to [`NodeDescriptor`]s late-bound at execution time.
//! Registration is expected to happen before any run starts; `resolve` is
//! safe to call concurrently while runs are in flight.

use async_trait::async_trait;
use parking_lot::RwLock;
use std::collections::{HashMap, HashSet};
use std::sync::{Arc, OnceLock};

use crate::core::value::ValueMap;
use crate::error::{NodeError, RegistryError};

/// Trait for node execution. Each node type implements this.
#[async_trait]
pub trait Node: Send + Sync {
    /// Execute with fully resolved inputs, returning the output bag.
    async fn run(&self, inputs: ValueMap) -> Result<ValueMap, NodeError>;
}

/// A registered node type: its parameter contract plus the implementation.
pub struct NodeDescriptor {
    pub type_name: String,
    pub required_params: Vec<String>,
    pub optional_params: Vec<String>,
    node: Arc<dyn Node>,
}

impl NodeDescriptor {
    pub fn new(
        type_name: impl Into<String>,
        required_params: Vec<String>,
        optional_params: Vec<String>,
        node: Arc<dyn Node>,
    ) -> Self {
        Self {
            type_name: type_name.into(),
            required_params,
            optional_params,
            node,
        }
    }

    pub fn node(&self) -> Arc<dyn Node> {
        self.node.clone()
    }
}

impl std::fmt::Debug for NodeDescriptor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NodeDescriptor")
            .field("type_name", &self.type_name)
            .field("required_params", &self.required_params)
            .field("optional_params", &self.optional_params)
            .finish()
    }
}

/// Adapter turning a plain closure into a [`Node`].
struct FnNode<F>(F);

#[async_trait]
impl<F> Node for FnNode<F>
where
    F: Fn(ValueMap) -> Result<ValueMap, NodeError> + Send + Sync,
{
    async fn run(&self, inputs: ValueMap) -> Result<ValueMap, NodeError> {
        (self.0)(inputs)
    }
}

/// Registry of node types, keyed by type name.
#[derive(Default)]
pub struct NodeRegistry {
    entries: RwLock<HashMap<String, Arc<NodeDescriptor>>>,
}

impl NodeRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// The process-wide default instance, for callers that want ambient
    /// registration. Prefer an owned registry in tests.
    pub fn global() -> Arc<NodeRegistry> {
        static GLOBAL: OnceLock<Arc<NodeRegistry>> = OnceLock::new();
        GLOBAL.get_or_init(|| Arc::new(NodeRegistry::new())).clone()
    }

    /// Register a node type, overwriting any existing registration.
    pub fn register(&self, descriptor: NodeDescriptor) {
        self.entries
            .write()
            .insert(descriptor.type_name.clone(), Arc::new(descriptor));
    }

    /// Strict registration: fails instead of overwriting.
    pub fn try_register(&self, descriptor: NodeDescriptor) -> Result<(), RegistryError> {
        let mut entries = self.entries.write();
        if entries.contains_key(&descriptor.type_name) {
            return Err(RegistryError::DuplicateType(descriptor.type_name.clone()));
        }
        entries.insert(descriptor.type_name.clone(), Arc::new(descriptor));
        Ok(())
    }

    /// Register a closure-backed node type.
    pub fn register_fn<F>(
        &self,
        type_name: impl Into<String>,
        required_params: &[&str],
        optional_params: &[&str],
        f: F,
    ) where
        F: Fn(ValueMap) -> Result<ValueMap, NodeError> + Send + Sync + 'static,
    {
        self.register(NodeDescriptor::new(
            type_name,
            required_params.iter().map(|s| s.to_string()).collect(),
            optional_params.iter().map(|s| s.to_string()).collect(),
            Arc::new(FnNode(f)),
        ));
    }

    pub fn resolve(&self, type_name: &str) -> Result<Arc<NodeDescriptor>, RegistryError> {
        self.entries
            .read()
            .get(type_name)
            .cloned()
            .ok_or_else(|| RegistryError::UnknownType(type_name.to_string()))
    }

    /// Declared required parameter names; empty for unknown types so
    /// validation degrades gracefully instead of raising.
    pub fn required_parameters(&self, type_name: &str) -> HashSet<String> {
        self.entries
            .read()
            .get(type_name)
            .map(|d| d.required_params.iter().cloned().collect())
            .unwrap_or_default()
    }

    pub fn registered_types(&self) -> Vec<String> {
        self.entries.read().keys().cloned().collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::value::Value;

    fn echo_descriptor(type_name: &str) -> NodeDescriptor {
        NodeDescriptor::new(
            type_name,
            vec!["input".to_string()],
            vec![],
            Arc::new(FnNode(|inputs: ValueMap| Ok(inputs))),
        )
    }

    #[test]
    fn test_register_and_resolve() {
        let registry = NodeRegistry::new();
        registry.register(echo_descriptor("echo"));
        assert!(registry.resolve("echo").is_ok());
        assert!(matches!(
            registry.resolve("missing"),
            Err(RegistryError::UnknownType(_))
        ));
    }

    #[test]
    fn test_lenient_overwrite_and_strict_duplicate() {
        let registry = NodeRegistry::new();
        registry.register(echo_descriptor("echo"));
        // Lenient default: silently overwrites.
        registry.register(echo_descriptor("echo"));
        assert_eq!(registry.registered_types().len(), 1);

        assert!(matches!(
            registry.try_register(echo_descriptor("echo")),
            Err(RegistryError::DuplicateType(_))
        ));
        assert!(registry.try_register(echo_descriptor("other")).is_ok());
    }

    #[test]
    fn test_required_parameters_fallback() {
        let registry = NodeRegistry::new();
        registry.register(echo_descriptor("echo"));
        assert!(registry.required_parameters("echo").contains("input"));
        assert!(registry.required_parameters("unknown").is_empty());
    }

    #[tokio::test]
    async fn test_fn_node_runs() {
        let registry = NodeRegistry::new();
        registry.register_fn("double", &["n"], &[], |inputs| {
            let n = inputs
                .get("n")
                .and_then(Value::as_i64)
                .ok_or_else(|| NodeError::MissingInput("n".into()))?;
            let mut out = ValueMap::new();
            out.insert("n".to_string(), Value::Int(n * 2));
            Ok(out)
        });

        let descriptor = registry.resolve("double").unwrap();
        let mut inputs = ValueMap::new();
        inputs.insert("n".to_string(), Value::Int(21));
        let out = descriptor.node().run(inputs).await.unwrap();
        assert_eq!(out.get("n"), Some(&Value::Int(42)));
    }
}
