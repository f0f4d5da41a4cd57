//! Name-indexed tool catalog for one run.

use super::{SharedTool, ToolCategory, ToolDescriptor};
use crate::model::ToolSpec;
use crate::{Error, Result};
use std::collections::HashMap;

/// The tools available to one run, in category order.
#[derive(Clone, Default)]
pub struct ToolCatalog {
    tools: Vec<SharedTool>,
    index: HashMap<String, usize>,
}

impl ToolCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Flatten the tools of `categories` into one catalog.
    ///
    /// Tool names must be unique across all categories.
    pub fn from_categories<'a>(
        categories: impl IntoIterator<Item = &'a ToolCategory>,
    ) -> Result<Self> {
        let mut catalog = Self::new();
        for category in categories {
            for tool in &category.tools {
                catalog.insert(tool.clone())?;
            }
        }
        Ok(catalog)
    }

    pub fn insert(&mut self, tool: SharedTool) -> Result<()> {
        let name = tool.describe().name.clone();
        if self.index.contains_key(&name) {
            return Err(Error::DuplicateTool(name));
        }
        self.index.insert(name, self.tools.len());
        self.tools.push(tool);
        Ok(())
    }

    pub fn get(&self, name: &str) -> Option<&SharedTool> {
        self.index.get(name).map(|&i| &self.tools[i])
    }

    pub fn contains(&self, name: &str) -> bool {
        self.index.contains_key(name)
    }

    pub fn descriptors(&self) -> impl Iterator<Item = &ToolDescriptor> {
        self.tools.iter().map(|t| t.describe())
    }

    pub fn specs(&self) -> Vec<ToolSpec> {
        self.descriptors().map(ToolDescriptor::spec).collect()
    }

    pub fn len(&self) -> usize {
        self.tools.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }
}
