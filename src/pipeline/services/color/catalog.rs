use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::matcher::ColorMatcher;

/// Catalog color. Roots have no parent; manufacturer-specific sub-colors point
/// at a root and borrow its hex code when they have none of their own.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PrimaryColor {
    #[serde(default = "Uuid::new_v4")]
    pub id: Uuid,
    pub name: String,
    #[serde(default)]
    pub hex_code: Option<String>,
    #[serde(default)]
    pub parent_id: Option<Uuid>,
    #[serde(default)]
    pub manufacturer_id: Option<Uuid>,
}

impl PrimaryColor {
    pub fn root(name: impl Into<String>, hex_code: Option<&str>) -> Self {
        Self {
            id: Uuid::new_v4(),
            name: name.into(),
            hex_code: hex_code.map(str::to_string),
            parent_id: None,
            manufacturer_id: None,
        }
    }

    pub fn child_of(parent: &PrimaryColor, name: impl Into<String>, hex_code: Option<&str>) -> Self {
        Self {
            parent_id: Some(parent.id),
            ..Self::root(name, hex_code)
        }
    }

    pub fn is_root(&self) -> bool {
        self.parent_id.is_none()
    }
}

/// Owning id -> color map, in insertion order.
#[derive(Debug, Clone, Default)]
pub struct PrimaryColorCatalog {
    colors: IndexMap<Uuid, PrimaryColor>,
    matcher: ColorMatcher,
}

impl PrimaryColorCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_colors(colors: impl IntoIterator<Item = PrimaryColor>) -> Self {
        let mut catalog = Self::new();
        for color in colors {
            catalog.insert(color);
        }
        catalog
    }

    /// Reads a JSON array of colors.
    pub fn from_json_slice(bytes: &[u8]) -> Result<Self, serde_json::Error> {
        let colors: Vec<PrimaryColor> = serde_json::from_slice(bytes)?;
        Ok(Self::from_colors(colors))
    }

    pub fn insert(&mut self, color: PrimaryColor) {
        self.colors.insert(color.id, color);
    }

    pub fn get(&self, id: &Uuid) -> Option<&PrimaryColor> {
        self.colors.get(id)
    }

    pub fn len(&self) -> usize {
        self.colors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.colors.is_empty()
    }

    pub fn roots(&self) -> impl Iterator<Item = &PrimaryColor> {
        self.colors.values().filter(|c| c.is_root())
    }

    pub fn children<'a>(&'a self, parent: &'a Uuid) -> impl Iterator<Item = &'a PrimaryColor> + 'a {
        self.colors
            .values()
            .filter(move |c| c.parent_id.as_ref() == Some(parent))
    }

    /// Own hex code, else the parent's. Hierarchies are one level deep.
    pub fn effective_hex(&self, id: &Uuid) -> Option<&str> {
        let color = self.colors.get(id)?;
        color.hex_code.as_deref().or_else(|| {
            color
                .parent_id
                .and_then(|parent| self.colors.get(&parent))
                .and_then(|parent| parent.hex_code.as_deref())
        })
    }

    /// "Bleu Marine" for sub-color "Marine" of root "Bleu".
    pub fn full_name(&self, id: &Uuid) -> Option<String> {
        let color = self.colors.get(id)?;
        match color.parent_id.and_then(|parent| self.colors.get(&parent)) {
            Some(parent) => Some(format!("{} {}", parent.name, color.name)),
            None => Some(color.name.clone()),
        }
    }

    /// Closest root color, the candidate set used for automatic variants.
    pub fn closest_root(&self, hex: &str) -> Option<&PrimaryColor> {
        let roots: Vec<PrimaryColor> = self.roots().cloned().collect();
        let closest = self.matcher.find_closest_primary_color(hex, &roots)?;
        self.colors.get(&closest.id)
    }

    /// Closest color of the whole catalog, sub-colors without a hex code
    /// competing with their parent's.
    pub fn closest_with_inheritance(&self, hex: &str) -> Option<&PrimaryColor> {
        let candidates: Vec<PrimaryColor> = self
            .colors
            .values()
            .map(|color| PrimaryColor {
                hex_code: self.effective_hex(&color.id).map(str::to_string),
                ..color.clone()
            })
            .collect();
        let closest = self.matcher.find_closest_primary_color(hex, &candidates)?;
        self.colors.get(&closest.id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn catalog() -> (PrimaryColorCatalog, Uuid, Uuid) {
        let bleu = PrimaryColor::root("Bleu", Some("#0000FF"));
        let rouge = PrimaryColor::root("Rouge", Some("#FF0000"));
        let marine = PrimaryColor::child_of(&bleu, "Marine", None);
        let (bleu_id, marine_id) = (bleu.id, marine.id);
        (
            PrimaryColorCatalog::from_colors([bleu, rouge, marine]),
            bleu_id,
            marine_id,
        )
    }

    #[test]
    fn sub_colors_inherit_parent_hex() {
        let (catalog, bleu_id, marine_id) = catalog();
        assert_eq!(catalog.effective_hex(&marine_id), Some("#0000FF"));
        assert_eq!(catalog.full_name(&marine_id).as_deref(), Some("Bleu Marine"));
        assert_eq!(catalog.children(&bleu_id).count(), 1);
        assert_eq!(catalog.roots().count(), 2);
    }

    #[test]
    fn closest_root_skips_sub_colors() {
        let (catalog, bleu_id, _) = catalog();
        assert_eq!(catalog.closest_root("#1010a0").map(|c| c.id), Some(bleu_id));
    }

    #[test]
    fn inheritance_lets_first_match_win() {
        let (catalog, bleu_id, _) = catalog();
        // Marine inherits Bleu's hex and ties with it; Bleu comes first
        assert_eq!(
            catalog.closest_with_inheritance("#0000ff").map(|c| c.id),
            Some(bleu_id)
        );
    }

    #[test]
    fn loads_palette_from_json() {
        let json = br##"[{"name": "Vert", "hex_code": "#00FF00"}, {"name": "Noir"}]"##;
        let catalog = PrimaryColorCatalog::from_json_slice(json).unwrap();
        assert_eq!(catalog.len(), 2);
        assert_eq!(catalog.closest_root("#10f010").unwrap().name, "Vert");
    }
}
