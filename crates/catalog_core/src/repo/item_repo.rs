//! Item repository contract and SQLite implementation.
//!
//! # Responsibility
//! - Provide the catalog's create/read/update/delete APIs over `items`.
//! - Express every read as an [`ItemQuery`] filter rendered to SQL.
//! - Keep SQL details inside the persistence boundary.
//!
//! # Invariants
//! - Write paths validate input before touching storage.
//! - Read paths reject invalid persisted rows instead of masking them.
//! - Not-found is an empty result (`None` / empty `Vec`), never an error.
//! - Store failures are forwarded unchanged inside `RepoError::Db`.

use crate::db::DbError;
use crate::model::item::{Item, ItemId, ItemUpdate, ItemValidationError, NewItem, Rating, Track};
use log::{debug, info, warn};
use rusqlite::types::{ToSqlOutput, Value};
use rusqlite::vtab::array::Array;
use rusqlite::{params, params_from_iter, Connection, ErrorCode, Row, ToSql};
use std::collections::BTreeSet;
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::rc::Rc;

const ITEM_COLUMNS: &str = "id,
    item_name,
    artist,
    year,
    record_label,
    catalog_category,
    description,
    rating_value,
    rating_actual_value,
    rating_votes,
    tracks";

pub type RepoResult<T> = Result<T, RepoError>;

/// Repository error for item persistence and query operations.
#[derive(Debug)]
pub enum RepoError {
    Validation(ItemValidationError),
    Db(DbError),
    /// An item with the derived id is already stored.
    DuplicateId(ItemId),
    /// Raised only by callers that ask for a distinguished not-found case.
    NotFound(ItemId),
    InvalidData(String),
    /// The connection has not been bootstrapped with the item schema.
    SchemaNotReady,
}

impl Display for RepoError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Validation(err) => write!(f, "{err}"),
            Self::Db(err) => write!(f, "{err}"),
            Self::DuplicateId(id) => write!(f, "duplicate key: item `{id}` already exists"),
            Self::NotFound(id) => write!(f, "item not found: {id}"),
            Self::InvalidData(message) => write!(f, "invalid persisted item data: {message}"),
            Self::SchemaNotReady => {
                write!(f, "items table is missing; open the database with db::open_db")
            }
        }
    }
}

impl RepoError {
    /// Stable, content-free identifier for logs.
    pub fn code(&self) -> &'static str {
        match self {
            Self::Validation(_) => "validation_failed",
            Self::Db(_) => "db_error",
            Self::DuplicateId(_) => "duplicate_id",
            Self::NotFound(_) => "not_found",
            Self::InvalidData(_) => "invalid_data",
            Self::SchemaNotReady => "schema_not_ready",
        }
    }
}

impl Error for RepoError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Validation(err) => Some(err),
            Self::Db(err) => Some(err),
            Self::DuplicateId(_)
            | Self::NotFound(_)
            | Self::InvalidData(_)
            | Self::SchemaNotReady => None,
        }
    }
}

impl From<ItemValidationError> for RepoError {
    fn from(value: ItemValidationError) -> Self {
        Self::Validation(value)
    }
}

impl From<DbError> for RepoError {
    fn from(value: DbError) -> Self {
        Self::Db(value)
    }
}

impl From<rusqlite::Error> for RepoError {
    fn from(value: rusqlite::Error) -> Self {
        Self::Db(DbError::Sqlite(value))
    }
}

/// Which ids a query accepts.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum IdSelection {
    #[default]
    Any,
    /// Matches only ids in the set; an empty set matches nothing.
    In(Vec<ItemId>),
    /// Matches only ids outside the set; an empty set matches everything.
    NotIn(Vec<ItemId>),
}

/// Positional value bound into a rendered [`ItemQuery`].
#[derive(Debug, Clone, PartialEq)]
enum QueryBind {
    Value(Value),
    /// Whole id set, read back through `rarray(?)`.
    Ids(Array),
}

impl ToSql for QueryBind {
    fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
        match self {
            Self::Value(value) => value.to_sql(),
            Self::Ids(ids) => ids.to_sql(),
        }
    }
}

/// Filter over the item collection.
///
/// All present conditions are combined with `AND`. Results are ordered by
/// `id` so repeated reads are deterministic.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ItemQuery {
    pub ids: IdSelection,
    pub catalog_category: Option<String>,
    pub artist: Option<String>,
}

impl ItemQuery {
    /// Query matching every stored item.
    pub fn all() -> Self {
        Self::default()
    }

    pub fn with_ids<I, S>(mut self, ids: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<ItemId>,
    {
        self.ids = IdSelection::In(ids.into_iter().map(Into::into).collect());
        self
    }

    pub fn without_ids<I, S>(mut self, ids: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<ItemId>,
    {
        self.ids = IdSelection::NotIn(ids.into_iter().map(Into::into).collect());
        self
    }

    pub fn in_category(mut self, category: impl Into<String>) -> Self {
        self.catalog_category = Some(category.into());
        self
    }

    pub fn by_artist(mut self, artist: impl Into<String>) -> Self {
        self.artist = Some(artist.into());
        self
    }

    /// Renders the filter as a `WHERE` clause (empty when unfiltered) plus
    /// positional bind values in clause order.
    ///
    /// An id set is bound as a single `rarray` value, so its size is not
    /// limited by SQLite's bound-variable cap.
    fn to_where_clause(&self) -> (String, Vec<QueryBind>) {
        let mut conditions: Vec<&'static str> = Vec::new();
        let mut binds: Vec<QueryBind> = Vec::new();

        match &self.ids {
            IdSelection::Any => {}
            IdSelection::In(ids) if ids.is_empty() => conditions.push("0 = 1"),
            IdSelection::In(ids) => {
                conditions.push("id IN rarray(?)");
                binds.push(id_set(ids));
            }
            IdSelection::NotIn(ids) if ids.is_empty() => {}
            IdSelection::NotIn(ids) => {
                conditions.push("id NOT IN rarray(?)");
                binds.push(id_set(ids));
            }
        }

        if let Some(category) = &self.catalog_category {
            conditions.push("catalog_category = ?");
            binds.push(QueryBind::Value(Value::Text(category.clone())));
        }

        if let Some(artist) = &self.artist {
            conditions.push("artist = ?");
            binds.push(QueryBind::Value(Value::Text(artist.clone())));
        }

        if conditions.is_empty() {
            return (String::new(), binds);
        }
        (format!(" WHERE {}", conditions.join(" AND ")), binds)
    }
}

/// Repository interface for catalog items.
///
/// The filtered reads are provided on top of [`ItemRepository::find_items`].
pub trait ItemRepository {
    /// Exact id match.
    fn get_item(&self, id: &str) -> RepoResult<Option<Item>>;
    fn find_items(&self, query: &ItemQuery) -> RepoResult<Vec<Item>>;
    /// Stores a new item under its derived id with a seeded rating.
    ///
    /// Fails with [`RepoError::DuplicateId`] when the id is taken; the
    /// stored item is left untouched in that case.
    fn add_item(&self, new_item: NewItem) -> RepoResult<Item>;
    /// Applies a partial update and returns the item as stored afterwards.
    fn update_item(&self, id: &str, update: &ItemUpdate) -> RepoResult<Option<Item>>;
    /// Removes the item and returns what was stored.
    fn delete_item(&self, id: &str) -> RepoResult<Option<Item>>;
    fn does_item_exist(&self, id: &str) -> RepoResult<bool>;

    fn get_items_by_category(&self, category: &str) -> RepoResult<Vec<Item>> {
        self.find_items(&ItemQuery::all().in_category(category))
    }

    fn get_items_by_artist(&self, artist: &str) -> RepoResult<Vec<Item>> {
        self.find_items(&ItemQuery::all().by_artist(artist))
    }

    fn get_items(&self, ids: &[ItemId]) -> RepoResult<Vec<Item>> {
        self.find_items(&ItemQuery::all().with_ids(ids.iter().cloned()))
    }

    fn get_items_not_in_array(&self, ids: &[ItemId]) -> RepoResult<Vec<Item>> {
        self.find_items(&ItemQuery::all().without_ids(ids.iter().cloned()))
    }

    /// Items of `category` whose id is not in `ids`, e.g. the part of a
    /// category a user does not own yet.
    fn get_items_not_owned_by_category(
        &self,
        ids: &[ItemId],
        category: &str,
    ) -> RepoResult<Vec<Item>> {
        self.find_items(
            &ItemQuery::all()
                .without_ids(ids.iter().cloned())
                .in_category(category),
        )
    }
}

/// SQLite-backed item repository over a borrowed connection.
pub struct SqliteItemRepository<'conn> {
    conn: &'conn Connection,
}

impl<'conn> SqliteItemRepository<'conn> {
    /// Wraps a connection returned by `db::open_db*`.
    ///
    /// Fails with [`RepoError::SchemaNotReady`] when the item schema has not
    /// been applied.
    pub fn try_new(conn: &'conn Connection) -> RepoResult<Self> {
        ensure_item_schema_ready(conn)?;
        Ok(Self { conn })
    }

    /// Skips the schema probe for connections already checked by the caller.
    pub(crate) fn from_ready(conn: &'conn Connection) -> Self {
        Self { conn }
    }
}

impl ItemRepository for SqliteItemRepository<'_> {
    fn get_item(&self, id: &str) -> RepoResult<Option<Item>> {
        let mut stmt = self
            .conn
            .prepare(&format!("SELECT {ITEM_COLUMNS} FROM items WHERE id = ?1;"))?;
        let mut rows = stmt.query([id])?;
        match rows.next()? {
            Some(row) => Ok(Some(parse_item_row(row)?)),
            None => Ok(None),
        }
    }

    fn find_items(&self, query: &ItemQuery) -> RepoResult<Vec<Item>> {
        let (where_clause, binds) = query.to_where_clause();
        let sql = format!("SELECT {ITEM_COLUMNS} FROM items{where_clause} ORDER BY id ASC;");

        let mut stmt = self.conn.prepare(&sql)?;
        let mut rows = stmt.query(params_from_iter(binds))?;
        let mut items = Vec::new();
        while let Some(row) = rows.next()? {
            items.push(parse_item_row(row)?);
        }

        debug!(
            "event=item_query module=repo status=ok rows={}",
            items.len()
        );
        Ok(items)
    }

    fn add_item(&self, new_item: NewItem) -> RepoResult<Item> {
        let item = new_item.into_item();
        item.validate()?;

        let inserted = self.conn.execute(
            "INSERT INTO items (
                id,
                item_name,
                artist,
                year,
                record_label,
                catalog_category,
                description,
                rating_value,
                rating_actual_value,
                rating_votes,
                tracks
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11);",
            params![
                item.id.as_str(),
                item.item_name.as_str(),
                item.artist.as_str(),
                item.year,
                item.record_label.as_deref(),
                item.catalog_category.as_str(),
                item.description.as_deref(),
                item.rating.value,
                item.rating.actual_value,
                item.rating.number_of_votes,
                encode_tracks(&item.tracks)?,
            ],
        );

        match inserted {
            Ok(_) => {
                info!("event=item_add module=repo status=ok");
                Ok(item)
            }
            Err(err) if is_primary_key_violation(&err) => {
                warn!("event=item_add module=repo status=error error_code=duplicate_id");
                Err(RepoError::DuplicateId(item.id))
            }
            Err(err) => Err(err.into()),
        }
    }

    fn update_item(&self, id: &str, update: &ItemUpdate) -> RepoResult<Option<Item>> {
        update.validate()?;
        if update.is_empty() {
            return self.get_item(id);
        }

        let (assignments, mut binds) = update_assignments(update)?;
        binds.push(Value::Text(id.to_string()));
        let sql = format!(
            "UPDATE items SET {} WHERE id = ? RETURNING {ITEM_COLUMNS};",
            assignments.join(", ")
        );

        let mut stmt = self.conn.prepare(&sql)?;
        let mut rows = stmt.query(params_from_iter(binds))?;
        let updated = match rows.next()? {
            Some(row) => Some(parse_item_row(row)?),
            None => None,
        };

        info!(
            "event=item_update module=repo status=ok found={} fields={}",
            updated.is_some(),
            assignments.len()
        );
        Ok(updated)
    }

    fn delete_item(&self, id: &str) -> RepoResult<Option<Item>> {
        let mut stmt = self
            .conn
            .prepare(&format!("DELETE FROM items WHERE id = ?1 RETURNING {ITEM_COLUMNS};"))?;
        let mut rows = stmt.query([id])?;
        let deleted = match rows.next()? {
            Some(row) => Some(parse_item_row(row)?),
            None => None,
        };

        info!(
            "event=item_delete module=repo status=ok found={}",
            deleted.is_some()
        );
        Ok(deleted)
    }

    fn does_item_exist(&self, id: &str) -> RepoResult<bool> {
        let exists: i64 = self.conn.query_row(
            "SELECT EXISTS(SELECT 1 FROM items WHERE id = ?1);",
            [id],
            |row| row.get(0),
        )?;
        Ok(exists == 1)
    }
}

fn ensure_item_schema_ready(conn: &Connection) -> RepoResult<()> {
    let exists: i64 = conn.query_row(
        "SELECT EXISTS(
            SELECT 1
            FROM sqlite_master
            WHERE type = 'table' AND name = 'items'
        );",
        [],
        |row| row.get(0),
    )?;
    if exists == 0 {
        return Err(RepoError::SchemaNotReady);
    }
    Ok(())
}

/// Column assignments (one per `?`) and their bind values for an update.
fn update_assignments(update: &ItemUpdate) -> RepoResult<(Vec<&'static str>, Vec<Value>)> {
    let mut assignments = Vec::new();
    let mut binds = Vec::new();

    if let Some(item_name) = &update.item_name {
        assignments.push("item_name = ?");
        binds.push(Value::Text(item_name.clone()));
    }
    if let Some(artist) = &update.artist {
        assignments.push("artist = ?");
        binds.push(Value::Text(artist.clone()));
    }
    if let Some(year) = update.year {
        assignments.push("year = ?");
        binds.push(Value::Integer(i64::from(year)));
    }
    if let Some(record_label) = &update.record_label {
        assignments.push("record_label = ?");
        binds.push(optional_text(record_label));
    }
    if let Some(category) = &update.catalog_category {
        assignments.push("catalog_category = ?");
        binds.push(Value::Text(category.clone()));
    }
    if let Some(description) = &update.description {
        assignments.push("description = ?");
        binds.push(optional_text(description));
    }
    if let Some(rating) = update.rating {
        assignments.push("rating_value = ?");
        binds.push(Value::Integer(i64::from(rating.value)));
        assignments.push("rating_actual_value = ?");
        binds.push(Value::Real(rating.actual_value));
        assignments.push("rating_votes = ?");
        binds.push(Value::Integer(i64::from(rating.number_of_votes)));
    }
    if let Some(tracks) = &update.tracks {
        assignments.push("tracks = ?");
        binds.push(Value::Text(encode_tracks(tracks)?));
    }

    Ok((assignments, binds))
}

fn parse_item_row(row: &Row<'_>) -> RepoResult<Item> {
    let id: String = row.get("id")?;

    let tracks_json: String = row.get("tracks")?;
    let tracks: Vec<Track> = serde_json::from_str(&tracks_json).map_err(|err| {
        RepoError::InvalidData(format!("invalid tracks document for item `{id}`: {err}"))
    })?;

    let item = Item {
        item_name: row.get("item_name")?,
        artist: row.get("artist")?,
        year: row.get("year")?,
        record_label: row.get("record_label")?,
        catalog_category: row.get("catalog_category")?,
        description: row.get("description")?,
        rating: Rating {
            value: row.get("rating_value")?,
            actual_value: row.get("rating_actual_value")?,
            number_of_votes: row.get("rating_votes")?,
        },
        tracks,
        id,
    };
    item.validate().map_err(|err| {
        RepoError::InvalidData(format!("stored item `{}` violates schema: {err}", item.id))
    })?;
    Ok(item)
}

fn encode_tracks(tracks: &[Track]) -> RepoResult<String> {
    serde_json::to_string(tracks)
        .map_err(|err| RepoError::InvalidData(format!("cannot encode tracks: {err}")))
}

fn optional_text(value: &Option<String>) -> Value {
    value.clone().map_or(Value::Null, Value::Text)
}

fn is_primary_key_violation(err: &rusqlite::Error) -> bool {
    matches!(
        err,
        rusqlite::Error::SqliteFailure(failure, _)
            if failure.code == ErrorCode::ConstraintViolation
                && failure.extended_code == rusqlite::ffi::SQLITE_CONSTRAINT_PRIMARYKEY
    )
}

fn id_set(ids: &[ItemId]) -> QueryBind {
    let unique: BTreeSet<&str> = ids.iter().map(String::as_str).collect();
    let values: Vec<Value> = unique
        .into_iter()
        .map(|id| Value::Text(id.to_string()))
        .collect();
    QueryBind::Ids(Rc::new(values))
}

#[cfg(test)]
mod tests {
    use super::{ItemQuery, QueryBind, Value};
    use std::rc::Rc;

    fn text(value: &str) -> QueryBind {
        QueryBind::Value(Value::Text(value.to_string()))
    }

    fn id_set(values: &[&str]) -> QueryBind {
        QueryBind::Ids(Rc::new(
            values
                .iter()
                .map(|value| Value::Text(value.to_string()))
                .collect(),
        ))
    }

    #[test]
    fn unfiltered_query_renders_no_where_clause() {
        let (sql, binds) = ItemQuery::all().to_where_clause();
        assert!(sql.is_empty());
        assert!(binds.is_empty());
    }

    #[test]
    fn empty_inclusion_set_matches_nothing() {
        let (sql, binds) = ItemQuery::all()
            .with_ids(Vec::<String>::new())
            .to_where_clause();
        assert_eq!(sql, " WHERE 0 = 1");
        assert!(binds.is_empty());
    }

    #[test]
    fn empty_exclusion_set_keeps_remaining_conditions() {
        let (sql, binds) = ItemQuery::all()
            .without_ids(Vec::<String>::new())
            .in_category("Rock")
            .to_where_clause();
        assert_eq!(sql, " WHERE catalog_category = ?");
        assert_eq!(binds, vec![text("Rock")]);
    }

    #[test]
    fn exclusion_and_category_are_combined_in_bind_order() {
        let (sql, binds) = ItemQuery::all()
            .without_ids(["b", "a", "b"])
            .in_category("Jazz")
            .to_where_clause();
        assert_eq!(sql, " WHERE id NOT IN rarray(?) AND catalog_category = ?");
        assert_eq!(binds, vec![id_set(&["a", "b"]), text("Jazz")]);
    }

    #[test]
    fn inclusion_set_binds_as_one_value() {
        let ids: Vec<String> = (0..40_000).map(|n| format!("Artist-{n}")).collect();
        let (sql, binds) = ItemQuery::all().with_ids(ids).to_where_clause();
        assert_eq!(sql, " WHERE id IN rarray(?)");
        assert_eq!(binds.len(), 1);
        assert!(matches!(&binds[0], QueryBind::Ids(values) if values.len() == 40_000));
    }

    #[test]
    fn artist_filter_binds_exact_value() {
        let (sql, binds) = ItemQuery::all().by_artist("Beatles").to_where_clause();
        assert_eq!(sql, " WHERE artist = ?");
        assert_eq!(binds, vec![text("Beatles")]);
    }
}
