//! Area and category tree nodes.
//!
//! Messages embed the leaf node they belong to; each node owns its parent
//! chain, which is therefore acyclic and finite by construction. The
//! chains are walked leaf-to-root by the filter engine.

use serde::{Deserialize, Serialize};

use super::Localized;

/// Localized area name.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AreaDesc {
    pub lang: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
}

impl AreaDesc {
    pub fn new(lang: impl Into<String>, name: impl Into<String>) -> Self {
        Self { lang: lang.into(), name: Some(name.into()) }
    }
}

/// A node in the area tree, owning its parent chain.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Area {
    pub id: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent: Option<Box<Area>>,
    /// Deterministic display ordering among siblings.
    #[serde(default)]
    pub sort_order: f64,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub descs: Vec<AreaDesc>,
}

impl Area {
    pub fn new(id: i64) -> Self {
        Self { id, parent: None, sort_order: 0.0, descs: Vec::new() }
    }

    pub fn with_parent(mut self, parent: Area) -> Self {
        self.parent = Some(Box::new(parent));
        self
    }

    /// Walks the chain from this node to the root.
    pub fn chain(&self) -> Chain<'_, Area> {
        Chain { next: Some(self) }
    }

    /// Whether this node or any ancestor carries the given id.
    pub fn chain_contains(&self, id: i64) -> bool {
        self.chain().any(|a| a.id == id)
    }

    /// Sorts descriptions of every node in the chain.
    pub fn sort_chain_descs(&mut self, lang: &str) {
        self.sort_descs(lang);
        if let Some(parent) = &mut self.parent {
            parent.sort_chain_descs(lang);
        }
    }
}

impl Localized for Area {
    type Desc = AreaDesc;

    fn descs(&self) -> &[AreaDesc] {
        &self.descs
    }

    fn descs_mut(&mut self) -> &mut Vec<AreaDesc> {
        &mut self.descs
    }

    fn desc_lang(desc: &AreaDesc) -> &str {
        &desc.lang
    }
}

/// Localized category name.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CategoryDesc {
    pub lang: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
}

impl CategoryDesc {
    pub fn new(lang: impl Into<String>, name: impl Into<String>) -> Self {
        Self { lang: lang.into(), name: Some(name.into()) }
    }
}

/// A node in a category tree, owning its parent chain.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Category {
    pub id: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent: Option<Box<Category>>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub descs: Vec<CategoryDesc>,
}

impl Category {
    pub fn new(id: i64) -> Self {
        Self { id, parent: None, descs: Vec::new() }
    }

    pub fn with_parent(mut self, parent: Category) -> Self {
        self.parent = Some(Box::new(parent));
        self
    }

    /// Walks the chain from this node to the root.
    pub fn chain(&self) -> Chain<'_, Category> {
        Chain { next: Some(self) }
    }

    /// Whether this node or any ancestor carries the given id.
    pub fn chain_contains(&self, id: i64) -> bool {
        self.chain().any(|c| c.id == id)
    }

    /// Sorts descriptions of every node in the chain.
    pub fn sort_chain_descs(&mut self, lang: &str) {
        self.sort_descs(lang);
        if let Some(parent) = &mut self.parent {
            parent.sort_chain_descs(lang);
        }
    }
}

impl Localized for Category {
    type Desc = CategoryDesc;

    fn descs(&self) -> &[CategoryDesc] {
        &self.descs
    }

    fn descs_mut(&mut self) -> &mut Vec<CategoryDesc> {
        &mut self.descs
    }

    fn desc_lang(desc: &CategoryDesc) -> &str {
        &desc.lang
    }
}

/// Leaf-to-root iterator over a parent chain.
pub struct Chain<'a, T> {
    next: Option<&'a T>,
}

impl<'a> Iterator for Chain<'a, Area> {
    type Item = &'a Area;

    fn next(&mut self) -> Option<&'a Area> {
        let node = self.next?;
        self.next = node.parent.as_deref();
        Some(node)
    }
}

impl<'a> Iterator for Chain<'a, Category> {
    type Item = &'a Category;

    fn next(&mut self) -> Option<&'a Category> {
        let node = self.next?;
        self.next = node.parent.as_deref();
        Some(node)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn area_chain() -> Area {
        // Leaf(5) -> Mid(3) -> Root(1)
        Area::new(5).with_parent(Area::new(3).with_parent(Area::new(1)))
    }

    #[test]
    fn test_area_chain_order() {
        let ids: Vec<i64> = area_chain().chain().map(|a| a.id).collect();
        assert_eq!(ids, vec![5, 3, 1]);
    }

    #[test]
    fn test_area_chain_contains() {
        let area = area_chain();
        assert!(area.chain_contains(5));
        assert!(area.chain_contains(3));
        assert!(area.chain_contains(1));
        assert!(!area.chain_contains(9));
    }

    #[test]
    fn test_category_chain_contains() {
        let cat = Category::new(20).with_parent(Category::new(10));
        assert!(cat.chain_contains(10));
        assert!(!cat.chain_contains(30));
    }

    #[test]
    fn test_sort_chain_descs() {
        let mut area = Area::new(1);
        area.descs.push(AreaDesc::new("da", "Østersøen"));
        area.descs.push(AreaDesc::new("en", "The Baltic Sea"));
        area.sort_chain_descs("en");
        assert_eq!(area.descs[0].lang, "en");
    }
}
