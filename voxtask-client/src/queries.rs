/// SQL queries for client database operations
pub struct Queries;

impl Queries {
    pub const GET_VALUE: &'static str = "SELECT value FROM local_store WHERE key = ?1";

    pub const UPSERT_VALUE: &'static str = r#"
        INSERT INTO local_store (key, value, updated_at)
        VALUES (?1, ?2, ?3)
        ON CONFLICT(key) DO UPDATE SET
            value = excluded.value,
            updated_at = excluded.updated_at
    "#;

    pub const DELETE_VALUE: &'static str = "DELETE FROM local_store WHERE key = ?1";

    pub const COUNT_VALUES: &'static str = "SELECT COUNT(*) as count FROM local_store";
}
