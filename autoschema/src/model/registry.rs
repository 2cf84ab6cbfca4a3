use crate::error::{Error, Result};

use super::{Model, ModelMeta};

/// The set of models a schema is generated from, in registration order.
#[derive(Debug, Clone, Default)]
pub struct ModelRegistry {
    models: Vec<ModelMeta>,
}

impl ModelRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a model implementing [`Model`] (usually via `#[derive(Model)]`).
    pub fn register<M: Model>(&mut self) -> Result<&mut Self> {
        self.register_meta(M::model_meta())
    }

    /// Register a hand-written or reflected model description.
    pub fn register_meta(&mut self, meta: ModelMeta) -> Result<&mut Self> {
        if self.get(&meta.name).is_some() {
            return Err(Error::DuplicateModel(meta.name));
        }
        tracing::debug!(model = %meta.name, table = %meta.table, "Registered model");
        self.models.push(meta);
        Ok(self)
    }

    pub fn models(&self) -> &[ModelMeta] {
        &self.models
    }

    pub fn get(&self, name: &str) -> Option<&ModelMeta> {
        self.models.iter().find(|m| m.name == name)
    }

    pub fn len(&self) -> usize {
        self.models.len()
    }

    pub fn is_empty(&self) -> bool {
        self.models.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use assert_matches::assert_matches;

    use super::*;
    use crate::model::{ColumnKind, ColumnMeta};

    fn meta(name: &str) -> ModelMeta {
        ModelMeta::new(name, name.to_lowercase())
            .column(ColumnMeta::new("id", ColumnKind::Integer).primary_key(true))
    }

    #[test]
    fn test_registration_order_is_kept() {
        let mut registry = ModelRegistry::new();
        registry.register_meta(meta("Zebra")).unwrap();
        registry.register_meta(meta("Apple")).unwrap();

        let names: Vec<&str> = registry.models().iter().map(|m| m.name.as_str()).collect();
        assert_eq!(names, vec!["Zebra", "Apple"]);
        assert_eq!(registry.len(), 2);
        assert!(registry.get("Apple").is_some());
        assert!(registry.get("Pear").is_none());
    }

    #[test]
    fn test_duplicate_model_rejected() {
        let mut registry = ModelRegistry::new();
        registry.register_meta(meta("User")).unwrap();
        assert_matches!(
            registry.register_meta(meta("User")),
            Err(Error::DuplicateModel(name)) if name == "User"
        );
    }
}
