use crate::dataset::{CompanyDataset, MatchCase, Row};
use anyhow::Context;
use serde_json::Value;

/// A company table read through Postgres. Every row is fetched as `to_jsonb(t)` so the
/// column set does not need to be known at compile time.
#[derive(Debug, Clone)]
pub struct PgDataset {
    pool: sqlx::PgPool,
    table: String,
    source: String,
}

impl PgDataset {
    pub fn new(pool: sqlx::PgPool, table: impl Into<String>) -> anyhow::Result<Self> {
        let table = table.into();
        anyhow::ensure!(
            !table.trim().is_empty(),
            "dataset table name must be non-empty"
        );
        let source = format!("postgres:{table}");
        Ok(Self {
            pool,
            table,
            source,
        })
    }

    pub async fn connect(database_url: &str, table: impl Into<String>) -> anyhow::Result<Self> {
        let pool = sqlx::postgres::PgPoolOptions::new()
            .max_connections(5)
            .connect(database_url)
            .await
            .context("connect DATABASE_URL failed")?;
        Self::new(pool, table)
    }

    fn table_ref(&self) -> String {
        match self.table.split_once('.') {
            Some((schema, name)) => format!("{}.{}", quote_ident(schema), quote_ident(name)),
            None => quote_ident(&self.table),
        }
    }

    async fn fetch_rows(&self, sql: &str, bind: String) -> anyhow::Result<Vec<Row>> {
        let values: Vec<Value> = sqlx::query_scalar(sql)
            .persistent(false)
            .bind(bind)
            .fetch_all(&self.pool)
            .await
            .with_context(|| format!("dataset query failed on {}", self.source))?;

        values.into_iter().map(json_to_row).collect()
    }
}

#[async_trait::async_trait]
impl CompanyDataset for PgDataset {
    fn source_name(&self) -> &str {
        &self.source
    }

    async fn columns(&self) -> anyhow::Result<Vec<String>> {
        let (schema, name) = match self.table.split_once('.') {
            Some((schema, name)) => (Some(schema.to_string()), name.to_string()),
            None => (None, self.table.clone()),
        };

        let columns: Vec<String> = sqlx::query_scalar(
            "SELECT column_name::text FROM information_schema.columns \
             WHERE table_name = $1 AND ($2::text IS NULL OR table_schema = $2) \
             ORDER BY ordinal_position",
        )
        .persistent(false)
        .bind(name)
        .bind(schema)
        .fetch_all(&self.pool)
        .await
        .with_context(|| format!("failed to list columns of {}", self.source))?;

        anyhow::ensure!(!columns.is_empty(), "table {} not found", self.source);
        Ok(columns)
    }

    async fn find_exact(&self, column: &str, value: &str) -> anyhow::Result<Vec<Row>> {
        let sql = format!(
            "SELECT to_jsonb(t) FROM {} t WHERE btrim(t.{}::text) = $1",
            self.table_ref(),
            quote_ident(column)
        );
        self.fetch_rows(&sql, value.to_string()).await
    }

    async fn find_containing(
        &self,
        column: &str,
        fragment: &str,
        case: MatchCase,
    ) -> anyhow::Result<Vec<Row>> {
        let op = match case {
            MatchCase::Sensitive => "LIKE",
            MatchCase::Insensitive => "ILIKE",
        };
        let sql = format!(
            "SELECT to_jsonb(t) FROM {} t WHERE t.{}::text {op} $1 ESCAPE '\\'",
            self.table_ref(),
            quote_ident(column)
        );
        self.fetch_rows(&sql, like_pattern(fragment)).await
    }
}

fn quote_ident(ident: &str) -> String {
    format!("\"{}\"", ident.replace('"', "\"\""))
}

/// `%fragment%` with LIKE metacharacters escaped.
fn like_pattern(fragment: &str) -> String {
    let mut out = String::with_capacity(fragment.len() + 2);
    out.push('%');
    for c in fragment.chars() {
        if matches!(c, '%' | '_' | '\\') {
            out.push('\\');
        }
        out.push(c);
    }
    out.push('%');
    out
}

fn json_to_row(value: Value) -> anyhow::Result<Row> {
    let Value::Object(map) = value else {
        anyhow::bail!("expected a JSON object row, got {value}");
    };
    Ok(map
        .into_iter()
        .map(|(k, v)| {
            let cell = match v {
                Value::Null => String::new(),
                Value::String(s) => s,
                other => other.to_string(),
            };
            (k, cell)
        })
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn quotes_identifiers_with_spaces_and_quotes() {
        assert_eq!(
            quote_ident("NSE Code (Ticker symbol)"),
            "\"NSE Code (Ticker symbol)\""
        );
        assert_eq!(quote_ident("a\"b"), "\"a\"\"b\"");
    }

    #[test]
    fn escapes_like_wildcards() {
        assert_eq!(like_pattern("Reliance"), "%Reliance%");
        assert_eq!(like_pattern("100%_A\\B"), "%100\\%\\_A\\\\B%");
    }

    #[test]
    fn converts_jsonb_rows_to_cell_text() {
        let row = json_to_row(json!({
            "Name": "Reliance Industries",
            "Current Price": 2950.5,
            "PEG": null,
        }))
        .unwrap();
        assert_eq!(row["Name"], "Reliance Industries");
        assert_eq!(row["Current Price"], "2950.5");
        assert_eq!(row["PEG"], "");

        assert!(json_to_row(json!([1, 2])).is_err());
    }
}
