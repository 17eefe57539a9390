//! In-memory menu lookup, loaded from a JSON array of menu items.

use std::path::Path;

use async_trait::async_trait;

use super::{LookupOutcome, MATCH_LIMIT, MenuError, MenuItem, MenuLookup, SUGGESTION_LIMIT};

/// Menu lookup over a fixed list, with the same predicate and limits as
/// [`super::queries::PgMenu`].
#[derive(Debug, Clone, Default)]
pub struct InMemoryMenu {
    items: Vec<MenuItem>,
}

impl InMemoryMenu {
    pub fn new(mut items: Vec<MenuItem>) -> Self {
        items.sort_by(|a, b| a.id.cmp(&b.id));
        Self { items }
    }

    /// Load items from a JSON file containing an array of menu items.
    pub fn from_json_file(path: &Path) -> Result<Self, MenuError> {
        let raw = std::fs::read_to_string(path)?;
        let items: Vec<MenuItem> = serde_json::from_str(&raw)?;
        Ok(Self::new(items))
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

#[async_trait]
impl MenuLookup for InMemoryMenu {
    async fn find_menu_items(&self, term: &str) -> Result<LookupOutcome, MenuError> {
        let rows: Vec<MenuItem> = self
            .items
            .iter()
            .filter(|item| item.matches(term))
            .take(MATCH_LIMIT as usize)
            .cloned()
            .collect();
        if !rows.is_empty() {
            return Ok(LookupOutcome::Matches(rows));
        }
        let sample = self
            .items
            .iter()
            .take(SUGGESTION_LIMIT as usize)
            .cloned()
            .collect();
        Ok(LookupOutcome::Suggestions(sample))
    }
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use super::*;

    fn item(id: &str, nombre: &str, categoria: &str, descripcion: &str) -> MenuItem {
        MenuItem {
            id: id.to_string(),
            nombre: nombre.to_string(),
            categoria: categoria.to_string(),
            descripcion: descripcion.to_string(),
            precio: 5.0,
        }
    }

    fn menu() -> InMemoryMenu {
        InMemoryMenu::new(vec![
            item("01", "Cachapa con queso", "Desayunos", "Maíz tierno y queso de mano"),
            item("02", "Empanada de carne", "Desayunos", "Frita, con guasacaca"),
            item("03", "Arepa reina pepiada", "Desayunos", "Pollo y aguacate"),
            item("04", "Perico", "Desayunos", "Huevos revueltos con tomate"),
            item("05", "Empanada de queso", "Desayunos", "Frita"),
            item("06", "Empanada de pabellón", "Desayunos", "Caraotas, carne y tajada"),
            item("07", "Empanada de cazón", "Desayunos", "Tiburón guisado"),
            item("20", "Cachama frita", "Almuerzos", "Con tostones y ensalada"),
            item("21", "Pabellón criollo", "Almuerzos", "Carne mechada, caraotas, arroz"),
        ])
    }

    #[tokio::test]
    async fn matching_term_returns_only_matching_rows() {
        let outcome = menu().find_menu_items("almuerzo").await.unwrap();
        let LookupOutcome::Matches(rows) = outcome else {
            panic!("expected matches");
        };
        let ids: Vec<&str> = rows.iter().map(|r| r.id.as_str()).collect();
        assert_eq!(ids, vec!["20", "21"]);
        assert!(rows.iter().all(|r| r.matches("almuerzo")));
    }

    #[tokio::test]
    async fn matches_are_capped_at_limit() {
        let outcome = menu().find_menu_items("desayunos").await.unwrap();
        let LookupOutcome::Matches(rows) = outcome else {
            panic!("expected matches");
        };
        assert_eq!(rows.len(), MATCH_LIMIT as usize);
        assert!(rows.iter().all(|r| r.matches("desayunos")));
    }

    #[tokio::test]
    async fn description_only_match_is_found() {
        let outcome = menu().find_menu_items("GUASACACA").await.unwrap();
        assert_eq!(
            outcome,
            LookupOutcome::Matches(vec![item(
                "02",
                "Empanada de carne",
                "Desayunos",
                "Frita, con guasacaca"
            )])
        );
    }

    #[tokio::test]
    async fn no_match_returns_fixed_size_sample() {
        let outcome = menu().find_menu_items("sushi").await.unwrap();
        let LookupOutcome::Suggestions(rows) = outcome else {
            panic!("expected suggestions");
        };
        assert_eq!(rows.len(), SUGGESTION_LIMIT as usize);
    }

    #[tokio::test]
    async fn empty_menu_yields_empty_suggestions() {
        let outcome = InMemoryMenu::default().find_menu_items("x").await.unwrap();
        assert_eq!(outcome, LookupOutcome::Suggestions(vec![]));
    }

    #[test]
    fn loads_items_from_json_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(
            file,
            r#"[{{"id":"01","nombre":"Cachapa","categoria":"Desayunos","precio":3.5}}]"#
        )
        .unwrap();
        let menu = InMemoryMenu::from_json_file(file.path()).unwrap();
        assert_eq!(menu.len(), 1);
    }

    #[test]
    fn invalid_json_file_is_an_error() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, "not json").unwrap();
        assert!(matches!(
            InMemoryMenu::from_json_file(file.path()),
            Err(MenuError::Parse(_))
        ));
    }
}
