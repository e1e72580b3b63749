use tracing::debug;

use crate::category::Category;
use crate::util::db::{quote_ident, Db};

use super::columns::{unique_column_names, IDENTITY_COLUMN};
use super::row::SheetRow;

/// `CREATE TABLE IF NOT EXISTS` for `table`: identity column plus one
/// nullable TEXT column per name, in order.
pub fn build_create_table_sql(table: &str, columns: &[String]) -> String {
    let mut defs = vec![format!(
        "{} INTEGER PRIMARY KEY AUTOINCREMENT",
        quote_ident(IDENTITY_COLUMN)
    )];
    defs.extend(columns.iter().map(|c| format!("{} TEXT", quote_ident(c))));
    format!(
        "CREATE TABLE IF NOT EXISTS {} ({})",
        quote_ident(table),
        defs.join(", ")
    )
}

/// Make sure the category's table exists, shaped after `sample`'s headers.
///
/// An existing table is left exactly as it is, even when `sample` carries a
/// different header set.
pub async fn ensure_table(
    db: &Db,
    category: Category,
    sample: Option<&SheetRow>,
) -> Result<(), sqlx::Error> {
    let Some(sample) = sample else {
        return Ok(());
    };
    let columns = unique_column_names(sample.keys().map(String::as_str));
    let sql = build_create_table_sql(category.table_name(), &columns);
    debug!(table = category.table_name(), %sql, "ensuring table");
    sqlx::query(&sql).execute(&db.pool).await?;
    Ok(())
}
