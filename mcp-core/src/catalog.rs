//! Local cache of the server's tools, used to vet calls before sending them.
//!
//! The catalog is replaced wholesale by every successful tool listing and
//! emptied when the server announces `notifications/tools/list_changed` or
//! the session closes. Input schemas are compiled lazily, on the first call
//! to each tool, and the compiled validator is kept until the next refresh.

use std::collections::HashMap;
use std::sync::{Arc, OnceLock, PoisonError, RwLock};

use serde_json::Value;
use tracing::debug;

use crate::error::{McpResult, ValidationError};
use crate::messages::Tool;
use crate::validation::ArgumentValidator;

struct CatalogEntry {
    tool: Tool,
    validator: OnceLock<Result<Arc<ArgumentValidator>, String>>,
}

/// Cached tool definitions keyed by name.
#[derive(Default)]
pub struct ToolCatalog {
    entries: RwLock<HashMap<String, CatalogEntry>>,
}

impl ToolCatalog {
    /// Create an empty catalog.
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the whole catalog. Later duplicates of a name win.
    pub fn replace(&self, tools: impl IntoIterator<Item = Tool>) {
        let entries: HashMap<String, CatalogEntry> = tools
            .into_iter()
            .map(|tool| {
                (
                    tool.name.clone(),
                    CatalogEntry {
                        tool,
                        validator: OnceLock::new(),
                    },
                )
            })
            .collect();

        debug!(tools = entries.len(), "Tool catalog replaced");
        *self.entries.write().unwrap_or_else(PoisonError::into_inner) = entries;
    }

    /// Drop every cached tool.
    pub fn invalidate(&self) {
        let mut entries = self.entries.write().unwrap_or_else(PoisonError::into_inner);
        if !entries.is_empty() {
            debug!(tools = entries.len(), "Tool catalog invalidated");
            entries.clear();
        }
    }

    /// Whether no tools are cached.
    pub fn is_empty(&self) -> bool {
        self.entries
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .is_empty()
    }

    /// Number of cached tools.
    pub fn len(&self) -> usize {
        self.entries
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    /// Look up a tool by name.
    pub fn get(&self, name: &str) -> Option<Tool> {
        self.entries
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(name)
            .map(|entry| entry.tool.clone())
    }

    /// Cached tools ordered by name.
    pub fn tools(&self) -> Vec<Tool> {
        let mut tools: Vec<Tool> = self
            .entries
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .values()
            .map(|entry| entry.tool.clone())
            .collect();
        tools.sort_by(|a, b| a.name.cmp(&b.name));
        tools
    }

    /// Check a prospective call against the cache.
    ///
    /// Fails with [`ValidationError::UnknownTool`] when the name is not
    /// cached, [`ValidationError::InvalidSchema`] when the tool's schema does
    /// not compile and [`ValidationError::InvalidArguments`] when the
    /// arguments violate it. Tools without a schema accept anything.
    pub fn check_call(&self, name: &str, arguments: &Value) -> McpResult<()> {
        let validator = {
            let entries = self.entries.read().unwrap_or_else(PoisonError::into_inner);
            let entry = entries.get(name).ok_or_else(|| ValidationError::UnknownTool {
                tool: name.to_string(),
            })?;

            let Some(schema) = entry.tool.input_schema.as_ref() else {
                return Ok(());
            };

            entry
                .validator
                .get_or_init(|| ArgumentValidator::compile(schema).map(Arc::new))
                .clone()
                .map_err(|reason| ValidationError::InvalidSchema {
                    tool: name.to_string(),
                    reason,
                })?
        };

        validator.validate(arguments).map_err(|errors| {
            ValidationError::InvalidArguments {
                tool: name.to_string(),
                reason: errors.join("; "),
            }
            .into()
        })
    }
}
