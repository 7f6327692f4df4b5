use crate::config::Config;

#[derive(Debug, Clone)]
pub struct Category {
    pub name: String,
    pub sources: Vec<String>,
}

/// Ordered, read-only mapping from category name to feed source URLs.
///
/// Built once at startup. Lookups of unknown names resolve to the default category.
#[derive(Debug, Clone)]
pub struct CategoryRegistry {
    categories: Vec<Category>,
    default_index: usize,
}

impl CategoryRegistry {
    pub fn from_config(config: &Config) -> anyhow::Result<Self> {
        config.validate()?;

        let categories: Vec<Category> = config
            .categories
            .iter()
            .map(|c| Category {
                name: c.name.clone(),
                sources: c.sources.clone(),
            })
            .collect();

        let default_index = categories
            .iter()
            .position(|c| c.name == config.default_category)
            .ok_or_else(|| {
                anyhow::anyhow!("default category '{}' not found", config.default_category)
            })?;

        Ok(Self {
            categories,
            default_index,
        })
    }

    /// Resolves `name`, falling back to the default category when it is not registered.
    pub fn resolve(&self, name: &str) -> &Category {
        self.get(name).unwrap_or_else(|| self.default_category())
    }

    pub fn get(&self, name: &str) -> Option<&Category> {
        self.categories.iter().find(|c| c.name == name)
    }

    pub fn default_category(&self) -> &Category {
        &self.categories[self.default_index]
    }

    pub fn names(&self) -> Vec<String> {
        self.categories.iter().map(|c| c.name.clone()).collect()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Category> {
        self.categories.iter()
    }
}
