//! Field-kind registry boundary.

use kurbo::Size;
use std::collections::HashMap;

/// Resolves a field kind tag to its label and default placement size.
pub trait FieldKindRegistry {
    /// Human-readable label, if the kind is known.
    fn label(&self, kind: &str) -> Option<String>;

    /// Default size for newly placed fields of this kind.
    fn default_size(&self, kind: &str) -> Option<Size>;
}

/// Registry entry.
#[derive(Debug, Clone, PartialEq)]
pub struct KindInfo {
    pub label: String,
    pub default_size: Size,
}

impl KindInfo {
    pub fn new(label: impl Into<String>, default_size: Size) -> Self {
        Self {
            label: label.into(),
            default_size,
        }
    }
}

/// In-memory registry, preloaded with the built-in kinds.
#[derive(Debug, Clone)]
pub struct StaticRegistry {
    kinds: HashMap<String, KindInfo>,
}

impl Default for StaticRegistry {
    fn default() -> Self {
        let mut registry = Self::empty();
        registry.register("text", KindInfo::new("Text", Size::new(150.0, 40.0)));
        registry.register("signature", KindInfo::new("Signature", Size::new(200.0, 60.0)));
        registry.register("date", KindInfo::new("Date", Size::new(120.0, 30.0)));
        registry.register("checkbox", KindInfo::new("Checkbox", Size::new(20.0, 20.0)));
        registry
    }
}

impl StaticRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry with no kinds at all.
    pub fn empty() -> Self {
        Self {
            kinds: HashMap::new(),
        }
    }

    /// Add or replace a kind.
    pub fn register(&mut self, kind: impl Into<String>, info: KindInfo) {
        self.kinds.insert(kind.into(), info);
    }

    pub fn get(&self, kind: &str) -> Option<&KindInfo> {
        self.kinds.get(kind)
    }
}

impl FieldKindRegistry for StaticRegistry {
    fn label(&self, kind: &str) -> Option<String> {
        self.kinds.get(kind).map(|info| info.label.clone())
    }

    fn default_size(&self, kind: &str) -> Option<Size> {
        self.kinds.get(kind).map(|info| info.default_size)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builtin_kinds() {
        let registry = StaticRegistry::new();
        assert_eq!(registry.label("signature").as_deref(), Some("Signature"));
        assert_eq!(registry.default_size("checkbox"), Some(Size::new(20.0, 20.0)));
        assert_eq!(registry.label("initials"), None);
    }

    #[test]
    fn test_register_overrides() {
        let mut registry = StaticRegistry::empty();
        registry.register("initials", KindInfo::new("Initials", Size::new(60.0, 30.0)));
        registry.register("initials", KindInfo::new("Init.", Size::new(40.0, 30.0)));
        assert_eq!(registry.label("initials").as_deref(), Some("Init."));
        assert_eq!(registry.get("initials").map(|info| info.default_size.width), Some(40.0));
    }
}
