//! The frozen set of tools, resources and prompts a server exposes.

use std::sync::Arc;

use crate::prompts::{ExplainCode, PromptHandler, PromptRegistry, ReviewCode};
use crate::resources::{ApiDocs, ResourceHandler, ResourceRegistry};
use crate::tools::{AnalyzeCode, GenerateCode, ToolHandler, ToolRegistry};
use crate::types::ServerCapabilities;

/// Tools, resources and prompts, immutable once built.
#[derive(Default)]
pub struct CapabilityRegistry {
    pub tools: ToolRegistry,
    pub resources: ResourceRegistry,
    pub prompts: PromptRegistry,
}

impl CapabilityRegistry {
    pub fn builder() -> CapabilityRegistryBuilder {
        CapabilityRegistryBuilder::default()
    }

    /// The standard set: code analysis and generation tools, the API
    /// documentation resource, and the review and explain prompts.
    pub fn with_defaults() -> Self {
        Self::builder()
            .tool(AnalyzeCode)
            .tool(GenerateCode)
            .resource(ApiDocs)
            .prompt(ReviewCode)
            .prompt(ExplainCode)
            .build()
    }

    /// Advertised feature flags. Sampling is never offered.
    pub fn server_capabilities(&self) -> ServerCapabilities {
        ServerCapabilities {
            tools: !self.tools.is_empty(),
            resources: !self.resources.is_empty(),
            prompts: !self.prompts.is_empty(),
            sampling: false,
        }
    }
}

#[derive(Default)]
pub struct CapabilityRegistryBuilder {
    registry: CapabilityRegistry,
}

impl CapabilityRegistryBuilder {
    pub fn tool(mut self, handler: impl ToolHandler + 'static) -> Self {
        self.registry.tools.register(Arc::new(handler));
        self
    }

    pub fn resource(mut self, handler: impl ResourceHandler + 'static) -> Self {
        self.registry.resources.register(Arc::new(handler));
        self
    }

    pub fn prompt(mut self, handler: impl PromptHandler + 'static) -> Self {
        self.registry.prompts.register(Arc::new(handler));
        self
    }

    pub fn build(self) -> CapabilityRegistry {
        self.registry
    }
}
