//! PostgreSQL-backed menu lookup.

use async_trait::async_trait;
use sqlx::PgPool;

use super::{LookupOutcome, MATCH_LIMIT, MenuError, MenuItem, MenuLookup, SUGGESTION_LIMIT};

// Columns are coerced so that externally managed tables with numeric ids,
// NUMERIC prices or nullable text still decode into `MenuItem`.
const SELECT_COLUMNS: &str = r#"
    id::text AS id,
    COALESCE(nombre, '') AS nombre,
    COALESCE(categoria, '') AS categoria,
    COALESCE(descripcion, '') AS descripcion,
    COALESCE(precio, 0)::double precision AS precio
"#;

/// Menu lookup over the `menu_items` table.
#[derive(Debug, Clone)]
pub struct PgMenu {
    pool: PgPool,
}

impl PgMenu {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl MenuLookup for PgMenu {
    async fn find_menu_items(&self, term: &str) -> Result<LookupOutcome, MenuError> {
        let rows = search_items(&self.pool, term, MATCH_LIMIT).await?;
        if !rows.is_empty() {
            return Ok(LookupOutcome::Matches(rows));
        }
        let sample = sample_items(&self.pool, SUGGESTION_LIMIT).await?;
        Ok(LookupOutcome::Suggestions(sample))
    }
}

/// Rows whose name, category or description contains `term`, case-insensitive.
pub async fn search_items(
    pool: &PgPool,
    term: &str,
    limit: i64,
) -> Result<Vec<MenuItem>, sqlx::Error> {
    let sql = format!(
        r#"
        SELECT {SELECT_COLUMNS}
        FROM menu_items
        WHERE nombre ILIKE $1 ESCAPE '\'
           OR categoria ILIKE $1 ESCAPE '\'
           OR descripcion ILIKE $1 ESCAPE '\'
        ORDER BY id
        LIMIT $2
        "#
    );
    sqlx::query_as::<_, MenuItem>(&sql)
        .bind(like_pattern(term))
        .bind(limit)
        .fetch_all(pool)
        .await
}

/// Unfiltered sample of rows, used as suggestions.
pub async fn sample_items(pool: &PgPool, limit: i64) -> Result<Vec<MenuItem>, sqlx::Error> {
    let sql = format!("SELECT {SELECT_COLUMNS} FROM menu_items ORDER BY id LIMIT $1");
    sqlx::query_as::<_, MenuItem>(&sql)
        .bind(limit)
        .fetch_all(pool)
        .await
}

/// Build a `%term%` pattern, escaping LIKE metacharacters in the term.
pub fn like_pattern(term: &str) -> String {
    let mut pattern = String::with_capacity(term.len() + 2);
    pattern.push('%');
    for c in term.chars() {
        if matches!(c, '%' | '_' | '\\') {
            pattern.push('\\');
        }
        pattern.push(c);
    }
    pattern.push('%');
    pattern
}

#[cfg(test)]
mod tests {
    use sqlx::postgres::PgPoolOptions;

    use super::*;

    #[test]
    fn like_pattern_wraps_term() {
        assert_eq!(like_pattern("cachapa"), "%cachapa%");
    }

    #[test]
    fn like_pattern_empty_term_matches_all() {
        assert_eq!(like_pattern(""), "%%");
    }

    #[test]
    fn like_pattern_escapes_metacharacters() {
        assert_eq!(like_pattern("50%_off\\"), r"%50\%\_off\\%");
    }

    // The tests below run against the database named by `DATABASE_URL`, each
    // in its own schema, and are skipped when the variable is unset.

    struct Scratch {
        pool: PgPool,
        schema: String,
    }

    impl Scratch {
        async fn open(name: &str) -> Option<Self> {
            let Ok(url) = std::env::var("DATABASE_URL") else {
                eprintln!("DATABASE_URL not set; skipping {name}");
                return None;
            };
            let schema = format!("menu_test_{name}_{}", std::process::id());
            let create = format!("CREATE SCHEMA IF NOT EXISTS {schema}");
            let search_path = format!("SET search_path TO {schema}");
            let pool = PgPoolOptions::new()
                .max_connections(1)
                .after_connect(move |conn, _meta| {
                    let create = create.clone();
                    let search_path = search_path.clone();
                    Box::pin(async move {
                        sqlx::query(&create).execute(&mut *conn).await?;
                        sqlx::query(&search_path).execute(&mut *conn).await?;
                        Ok(())
                    })
                })
                .connect(&url)
                .await
                .expect("connect to DATABASE_URL");
            Some(Self { pool, schema })
        }

        async fn migrated(name: &str) -> Option<Self> {
            let scratch = Self::open(name).await?;
            crate::migrate::migrate(&scratch.pool)
                .await
                .expect("run migrations");
            Some(scratch)
        }

        async fn insert(&self, id: &str, nombre: &str, categoria: &str, descripcion: &str) {
            sqlx::query(
                "INSERT INTO menu_items (id, nombre, categoria, descripcion, precio) \
                 VALUES ($1, $2, $3, $4, $5)",
            )
            .bind(id)
            .bind(nombre)
            .bind(categoria)
            .bind(descripcion)
            .bind(4.5_f64)
            .execute(&self.pool)
            .await
            .expect("insert menu item");
        }

        async fn drop_schema(self) {
            sqlx::query(&format!("DROP SCHEMA IF EXISTS {} CASCADE", self.schema))
                .execute(&self.pool)
                .await
                .expect("drop scratch schema");
            self.pool.close().await;
        }
    }

    fn ids(items: &[MenuItem]) -> Vec<&str> {
        items.iter().map(|i| i.id.as_str()).collect()
    }

    #[tokio::test]
    async fn matches_are_capped_and_all_satisfy_the_predicate() {
        let Some(db) = Scratch::migrated("capped").await else {
            return;
        };
        for (id, nombre) in [
            ("01", "Cachapa"),
            ("02", "Empanada de carne"),
            ("03", "Arepa reina pepiada"),
            ("04", "Perico"),
            ("05", "Empanada de queso"),
            ("06", "Empanada de cazón"),
            ("07", "Tequeños"),
        ] {
            db.insert(id, nombre, "Desayunos", "").await;
        }
        db.insert("20", "Cachama frita", "Almuerzos", "Con tostones").await;
        db.insert("21", "Pabellón", "Almuerzos", "Ideal después del desayuno")
            .await;

        let outcome = PgMenu::new(db.pool.clone())
            .find_menu_items("desayuno")
            .await
            .unwrap();
        let LookupOutcome::Matches(rows) = outcome else {
            panic!("expected matches");
        };
        assert_eq!(rows.len(), MATCH_LIMIT as usize);
        assert_eq!(ids(&rows), vec!["01", "02", "03", "04", "05"]);
        assert!(rows.iter().all(|r| r.matches("desayuno")));

        let all = search_items(&db.pool, "DESAYUNO", 100).await.unwrap();
        assert_eq!(all.len(), 8);
        assert!(all.iter().all(|r| r.matches("desayuno")));

        db.drop_schema().await;
    }

    #[tokio::test]
    async fn like_metacharacters_match_literally() {
        let Some(db) = Scratch::migrated("literal").await else {
            return;
        };
        db.insert("01", "Combo 50% off", "Promos", "").await;
        db.insert("02", "Combo 500 off", "Promos", "").await;
        db.insert("03", "pan_de_jamón", "Panes", "").await;
        db.insert("04", "pan de jamón", "Panes", "").await;

        let percent = search_items(&db.pool, "50%", MATCH_LIMIT).await.unwrap();
        assert_eq!(ids(&percent), vec!["01"]);

        let underscore = search_items(&db.pool, "pan_de", MATCH_LIMIT).await.unwrap();
        assert_eq!(ids(&underscore), vec!["03"]);

        db.drop_schema().await;
    }

    #[tokio::test]
    async fn miss_suggests_first_rows_by_id() {
        let Some(db) = Scratch::migrated("miss").await else {
            return;
        };
        for id in ["05", "03", "01", "04", "02"] {
            db.insert(id, &format!("Plato {id}"), "Almuerzos", "").await;
        }

        let outcome = PgMenu::new(db.pool.clone())
            .find_menu_items("sushi")
            .await
            .unwrap();
        let LookupOutcome::Suggestions(rows) = outcome else {
            panic!("expected suggestions");
        };
        assert_eq!(rows.len(), SUGGESTION_LIMIT as usize);
        assert_eq!(ids(&rows), vec!["01", "02", "03"]);

        db.drop_schema().await;
    }

    #[tokio::test]
    async fn externally_managed_columns_are_coerced() {
        let Some(db) = Scratch::open("coerced").await else {
            return;
        };
        sqlx::query(
            "CREATE TABLE menu_items (
                id          INTEGER PRIMARY KEY,
                nombre      TEXT,
                categoria   TEXT,
                descripcion TEXT,
                precio      NUMERIC(8, 2)
            )",
        )
        .execute(&db.pool)
        .await
        .unwrap();
        sqlx::query(
            "INSERT INTO menu_items VALUES \
             (1, NULL, 'Almuerzos', NULL, 7.50), \
             (2, 'Cachama', NULL, NULL, NULL)",
        )
        .execute(&db.pool)
        .await
        .unwrap();

        let outcome = PgMenu::new(db.pool.clone())
            .find_menu_items("almuerzos")
            .await
            .unwrap();
        assert_eq!(
            outcome,
            LookupOutcome::Matches(vec![MenuItem {
                id: "1".to_string(),
                nombre: String::new(),
                categoria: "Almuerzos".to_string(),
                descripcion: String::new(),
                precio: 7.5,
            }])
        );

        let sample = sample_items(&db.pool, SUGGESTION_LIMIT).await.unwrap();
        assert_eq!(ids(&sample), vec!["1", "2"]);
        assert_eq!(sample[1].precio, 0.0);

        db.drop_schema().await;
    }
}
