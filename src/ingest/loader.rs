//! Row insertion with key-prefix duplicate detection.

use serde::Serialize;
use tracing::warn;

use crate::category::Category;
use crate::util::db::{quote_ident, Db};

use super::columns::unique_column_names;
use super::row::SheetRow;

/// Number of leading columns compared when looking for an existing row.
pub const KEY_PREFIX_LEN: usize = 4;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct LoadStats {
    pub inserted: usize,
    pub skipped: usize,
    pub errors: usize,
}

/// Prepared statement text for one load call.
#[derive(Debug, Clone)]
pub struct LoadPlan {
    pub columns: Vec<String>,
    pub key_len: usize,
    pub exists_sql: String,
    pub insert_sql: String,
}

impl LoadPlan {
    pub fn new(table: &str, columns: Vec<String>) -> Self {
        let key_len = columns.len().min(KEY_PREFIX_LEN);
        let table_q = quote_ident(table);

        let conditions = columns[..key_len]
            .iter()
            .map(|c| format!("{} = ?", quote_ident(c)))
            .collect::<Vec<_>>()
            .join(" AND ");
        let exists_sql = format!("SELECT id FROM {table_q} WHERE {conditions} LIMIT 1");

        let column_list = columns
            .iter()
            .map(|c| quote_ident(c))
            .collect::<Vec<_>>()
            .join(", ");
        let placeholders = vec!["?"; columns.len()].join(", ");
        let insert_sql = format!("INSERT INTO {table_q} ({column_list}) VALUES ({placeholders})");

        Self {
            columns,
            key_len,
            exists_sql,
            insert_sql,
        }
    }
}

/// Trimmed text for each header of the sample row, in header order.
/// Headers missing from `row` yield an empty string.
pub fn row_values<'a, I>(headers: I, row: &SheetRow) -> Vec<String>
where
    I: IntoIterator<Item = &'a str>,
{
    headers
        .into_iter()
        .map(|h| row.get(h).map(|v| v.to_text()).unwrap_or_default())
        .collect()
}

enum RowOutcome {
    Inserted,
    Duplicate,
}

/// Insert `rows` into the category's table, one row at a time.
///
/// Column naming is re-derived from `rows[0]` exactly as `ensure_table` does.
/// Rows whose values are all empty, or whose first [`KEY_PREFIX_LEN`] values
/// match an existing row, are skipped. A failing row is counted in `errors`
/// and never stops the rest of the batch; earlier inserts stay committed.
pub async fn load_rows(db: &Db, category: Category, rows: &[SheetRow]) -> LoadStats {
    let mut stats = LoadStats::default();
    let Some(sample) = rows.first() else {
        return stats;
    };
    let table = category.table_name();
    let headers: Vec<&str> = sample.keys().map(String::as_str).collect();
    let plan = LoadPlan::new(table, unique_column_names(headers.iter().copied()));

    for (idx, row) in rows.iter().enumerate() {
        let values = row_values(headers.iter().copied(), row);

        if values.iter().all(String::is_empty) {
            stats.skipped += 1;
            continue;
        }

        match load_one(db, &plan, &values).await {
            Ok(RowOutcome::Inserted) => stats.inserted += 1,
            Ok(RowOutcome::Duplicate) => stats.skipped += 1,
            Err(sqlx::Error::Database(e)) if e.is_unique_violation() => {
                // a failed row that is also a duplicate
                warn!(table, row = idx, error = %e, "unique violation on insert");
                stats.errors += 1;
                stats.skipped += 1;
            }
            Err(e) => {
                if stats.errors == 0 {
                    warn!(
                        table,
                        columns = ?plan.columns,
                        "first row failure in this upload; the sheet may not match the existing table layout"
                    );
                }
                warn!(table, row = idx, error = %e, "failed to process row");
                stats.errors += 1;
            }
        }
    }

    stats
}

async fn load_one(db: &Db, plan: &LoadPlan, values: &[String]) -> Result<RowOutcome, sqlx::Error> {
    let mut exists = sqlx::query_scalar::<_, i64>(&plan.exists_sql);
    for v in &values[..plan.key_len] {
        exists = exists.bind(v);
    }
    if exists.fetch_optional(&db.pool).await?.is_some() {
        return Ok(RowOutcome::Duplicate);
    }

    let mut insert = sqlx::query(&plan.insert_sql);
    for v in values {
        insert = insert.bind(v);
    }
    insert.execute(&db.pool).await?;
    Ok(RowOutcome::Inserted)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ingest::row::CellValue;
    use crate::ingest::schema::ensure_table;

    fn row(pairs: &[(&str, &str)]) -> SheetRow {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), CellValue::from(*v)))
            .collect()
    }

    async fn load(db: &Db, category: Category, rows: &[SheetRow]) -> LoadStats {
        ensure_table(db, category, rows.first()).await.unwrap();
        load_rows(db, category, rows).await
    }

    #[test]
    fn plan_uses_first_four_columns_as_key() {
        let cols: Vec<String> = ["a", "b", "c", "d", "e"].iter().map(|s| s.to_string()).collect();
        let plan = LoadPlan::new("in_stok", cols);
        assert_eq!(plan.key_len, 4);
        assert_eq!(
            plan.exists_sql,
            "SELECT id FROM \"in_stok\" WHERE \"a\" = ? AND \"b\" = ? AND \"c\" = ? AND \"d\" = ? LIMIT 1"
        );
        assert_eq!(
            plan.insert_sql,
            "INSERT INTO \"in_stok\" (\"a\", \"b\", \"c\", \"d\", \"e\") VALUES (?, ?, ?, ?, ?)"
        );
    }

    #[test]
    fn plan_key_shrinks_with_narrow_tables() {
        let plan = LoadPlan::new("so_ulang", vec!["only".into()]);
        assert_eq!(plan.key_len, 1);
    }

    #[test]
    fn row_values_fill_missing_with_empty_and_trim() {
        let r = row(&[("SKU", " A1 "), ("Name", "Widget")]);
        let values = row_values(["SKU", "Name", "Qty"], &r);
        assert_eq!(values, vec!["A1", "Widget", ""]);
    }

    #[actix_web::test]
    async fn second_identical_row_is_skipped() {
        let db = Db::in_memory().await.unwrap();
        let rows = vec![
            row(&[("SKU", "A1"), ("Name", "Widget")]),
            row(&[("SKU", "A1"), ("Name", "Widget")]),
        ];
        let stats = load(&db, Category::MasterProduk, &rows).await;
        assert_eq!(stats, LoadStats { inserted: 1, skipped: 1, errors: 0 });
        assert_eq!(db.count_rows("master_produk").await.unwrap(), 1);
    }

    #[actix_web::test]
    async fn reloading_the_same_sheet_inserts_nothing() {
        let db = Db::in_memory().await.unwrap();
        let rows = vec![
            row(&[("SKU", "A1"), ("Name", "Widget")]),
            row(&[("SKU", "B2"), ("Name", "Gadget")]),
        ];
        let first = load(&db, Category::InStok, &rows).await;
        assert_eq!(first.inserted, 2);
        let second = load(&db, Category::InStok, &rows).await;
        assert_eq!(second, LoadStats { inserted: 0, skipped: 2, errors: 0 });
    }

    #[actix_web::test]
    async fn only_key_prefix_decides_duplicates() {
        let db = Db::in_memory().await.unwrap();
        let headers = ["a", "b", "c", "d", "note"];
        let mk = |vals: [&str; 5]| {
            let pairs: Vec<(&str, &str)> = headers.iter().copied().zip(vals).collect();
            row(&pairs)
        };
        let rows = vec![
            mk(["1", "2", "3", "4", "first"]),
            // same prefix, different trailing column
            mk(["1", "2", "3", "4", "second"]),
            // prefix differs in the 4th column
            mk(["1", "2", "3", "5", "third"]),
            // whitespace is trimmed before comparison
            mk([" 1", "2 ", "3", "4", "fourth"]),
        ];
        let stats = load(&db, Category::Pengembalian, &rows).await;
        assert_eq!(stats, LoadStats { inserted: 2, skipped: 2, errors: 0 });
    }

    #[actix_web::test]
    async fn empty_rows_never_reach_the_database() {
        let db = Db::in_memory().await.unwrap();
        let rows = vec![
            row(&[("SKU", ""), ("Name", "  "), ("Qty", "")]),
            row(&[("SKU", "A1"), ("Name", "Widget"), ("Qty", "3")]),
            row(&[("SKU", ""), ("Name", ""), ("Qty", "")]),
        ];
        let stats = load(&db, Category::GagalKirim, &rows).await;
        assert_eq!(stats, LoadStats { inserted: 1, skipped: 2, errors: 0 });
    }

    #[actix_web::test]
    async fn schema_drift_counts_errors_and_continues() {
        let db = Db::in_memory().await.unwrap();
        let original = vec![row(&[("SKU", "A1"), ("Name", "Widget")])];
        load(&db, Category::SoUlang, &original).await;

        // table keeps (sku, name); this sheet has a column it does not know
        let drifted = vec![
            row(&[("SKU", "B2"), ("Colour", "red")]),
            row(&[("SKU", "C3"), ("Colour", "blue")]),
        ];
        let stats = load(&db, Category::SoUlang, &drifted).await;
        assert_eq!(stats, LoadStats { inserted: 0, skipped: 0, errors: 2 });
        assert_eq!(db.count_rows("so_ulang").await.unwrap(), 1);
    }

    #[actix_web::test]
    async fn failure_does_not_roll_back_earlier_rows() {
        let db = Db::in_memory().await.unwrap();
        let rows = vec![
            row(&[("SKU", "A1"), ("Name", "Widget")]),
            row(&[("SKU", "B2"), ("Name", "Gadget")]),
        ];
        load(&db, Category::ReturDiterima, &rows).await;
        sqlx::query("CREATE UNIQUE INDEX name_unique ON retur_diterima(name)")
            .execute(&db.pool)
            .await
            .unwrap();

        let more = vec![
            row(&[("SKU", "C3"), ("Name", "Gizmo")]),
            // different key, but violates the unique index on name
            row(&[("SKU", "D4"), ("Name", "Widget")]),
            row(&[("SKU", "E5"), ("Name", "Doohickey")]),
        ];
        let stats = load(&db, Category::ReturDiterima, &more).await;
        assert_eq!(stats, LoadStats { inserted: 2, skipped: 1, errors: 1 });
        assert_eq!(db.count_rows("retur_diterima").await.unwrap(), 4);
    }

    #[actix_web::test]
    async fn unique_violation_counts_as_error_and_skip() {
        let db = Db::in_memory().await.unwrap();
        load(&db, Category::InStok, &[row(&[("SKU", "A1"), ("Name", "Widget")])]).await;
        sqlx::query("CREATE UNIQUE INDEX in_stok_name ON in_stok(name)")
            .execute(&db.pool)
            .await
            .unwrap();

        let stats = load(&db, Category::InStok, &[row(&[("SKU", "Z9"), ("Name", "Widget")])]).await;
        assert_eq!(stats, LoadStats { inserted: 0, skipped: 1, errors: 1 });
        assert_eq!(db.count_rows("in_stok").await.unwrap(), 1);
    }

    #[actix_web::test]
    async fn numbers_are_stored_as_text() {
        let db = Db::in_memory().await.unwrap();
        let mut r = SheetRow::new();
        r.insert("Qty".into(), CellValue::Number(12.0));
        r.insert("Price".into(), CellValue::Number(1.5));
        let stats = load(&db, Category::PesananDiterima, &[r]).await;
        assert_eq!(stats.inserted, 1);
        let rows = db.fetch_table("pesanan_diterima").await.unwrap();
        assert_eq!(rows[0]["qty"], serde_json::Value::from("12"));
        assert_eq!(rows[0]["price"], serde_json::Value::from("1.5"));
    }
}
