//! Shared blog fixture: schema, tables and a statement-counting store.

#![allow(dead_code)]

use lazyrow_core::{
    open_db_in_memory, DbResult, Entity, Row, SchemaBuilder, Session, SqliteStore, Store,
    TypeRegistry, Value,
};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

pub const BLOG_DDL: &str = r#"
CREATE TABLE section (
    section_id INTEGER PRIMARY KEY,
    section_title TEXT
);
CREATE TABLE category (
    category_id INTEGER PRIMARY KEY,
    category_title TEXT,
    section_id INTEGER REFERENCES section(section_id)
);
CREATE TABLE "user" (
    user_id INTEGER PRIMARY KEY,
    user_name TEXT,
    user_email TEXT
);
CREATE TABLE post (
    post_id INTEGER PRIMARY KEY,
    post_title TEXT,
    post_content TEXT,
    post_created INTEGER NOT NULL DEFAULT 1700000000,
    post_updated INTEGER NOT NULL DEFAULT 1700000000,
    category_id INTEGER REFERENCES category(category_id),
    user_id INTEGER REFERENCES "user"(user_id)
);
CREATE TABLE comment (
    comment_id INTEGER PRIMARY KEY,
    comment_text TEXT,
    post_id INTEGER REFERENCES post(post_id),
    user_id INTEGER REFERENCES "user"(user_id)
);
CREATE TABLE tag (
    tag_id INTEGER PRIMARY KEY,
    tag_value TEXT
);
CREATE TABLE post__tag (
    post_id INTEGER NOT NULL REFERENCES post(post_id),
    tag_id INTEGER NOT NULL REFERENCES tag(tag_id),
    PRIMARY KEY (post_id, tag_id)
);
CREATE TRIGGER post_touch AFTER UPDATE OF post_title, post_content ON post
BEGIN
    UPDATE post SET post_updated = post_updated + 1 WHERE post_id = NEW.post_id;
END;
"#;

pub struct Section;
pub struct Category;
pub struct User;
pub struct Post;
pub struct Comment;
pub struct Tag;

impl Entity for Section {
    const TYPE_NAME: &'static str = "Section";

    fn describe(schema: SchemaBuilder) -> SchemaBuilder {
        schema.column("title").child("categories", "Category")
    }
}

impl Entity for Category {
    const TYPE_NAME: &'static str = "Category";

    fn describe(schema: SchemaBuilder) -> SchemaBuilder {
        schema
            .column("title")
            .parent("section", "Section")
            .child("posts", "Post")
    }
}

impl Entity for User {
    const TYPE_NAME: &'static str = "User";

    fn describe(schema: SchemaBuilder) -> SchemaBuilder {
        schema
            .columns(["name", "email"])
            .child("posts", "Post")
            .child("comments", "Comment")
    }
}

impl Entity for Post {
    const TYPE_NAME: &'static str = "Post";

    fn describe(schema: SchemaBuilder) -> SchemaBuilder {
        schema
            .columns(["title", "content"])
            .timestamps()
            .parent("category", "Category")
            .parent("user", "User")
            .child("comments", "Comment")
            .sibling("tags", "Tag")
    }
}

impl Entity for Comment {
    const TYPE_NAME: &'static str = "Comment";

    fn describe(schema: SchemaBuilder) -> SchemaBuilder {
        schema
            .column("text")
            .parent("post", "Post")
            .parent("user", "User")
    }
}

impl Entity for Tag {
    const TYPE_NAME: &'static str = "Tag";

    fn describe(schema: SchemaBuilder) -> SchemaBuilder {
        schema.column("value").sibling("posts", "Post")
    }
}

pub fn blog_registry() -> TypeRegistry {
    let mut registry = TypeRegistry::new();
    registry.register_entity::<Section>().unwrap();
    registry.register_entity::<Category>().unwrap();
    registry.register_entity::<User>().unwrap();
    registry.register_entity::<Post>().unwrap();
    registry.register_entity::<Comment>().unwrap();
    registry.register_entity::<Tag>().unwrap();
    registry
}

/// Statement and commit counters shared with a `CountingStore`.
#[derive(Debug, Clone, Default)]
pub struct Counters {
    statements: Arc<AtomicUsize>,
    commits: Arc<AtomicUsize>,
}

impl Counters {
    pub fn statements(&self) -> usize {
        self.statements.load(Ordering::SeqCst)
    }

    pub fn commits(&self) -> usize {
        self.commits.load(Ordering::SeqCst)
    }
}

/// Wraps a SQLite store and counts every statement that reaches it.
pub struct CountingStore {
    inner: SqliteStore,
    counters: Counters,
}

impl Store for CountingStore {
    fn execute(&self, sql: &str, params: &[Value]) -> DbResult<usize> {
        self.counters.statements.fetch_add(1, Ordering::SeqCst);
        self.inner.execute(sql, params)
    }

    fn query_row(&self, sql: &str, params: &[Value]) -> DbResult<Option<Row>> {
        self.counters.statements.fetch_add(1, Ordering::SeqCst);
        self.inner.query_row(sql, params)
    }

    fn query_rows(&self, sql: &str, params: &[Value]) -> DbResult<Vec<Row>> {
        self.counters.statements.fetch_add(1, Ordering::SeqCst);
        self.inner.query_rows(sql, params)
    }

    fn commit(&self) -> DbResult<()> {
        self.counters.commits.fetch_add(1, Ordering::SeqCst);
        self.inner.commit()
    }

    fn rollback(&self) -> DbResult<()> {
        self.inner.rollback()
    }
}

/// In-memory blog database behind a counting store.
pub fn blog_session() -> (Session, Counters) {
    let store = open_db_in_memory().unwrap();
    store.execute_batch(BLOG_DDL).unwrap();
    let counters = Counters::default();
    let store = CountingStore {
        inner: store,
        counters: counters.clone(),
    };
    (Session::new(store, blog_registry()).unwrap(), counters)
}

/// Runs fixture SQL through the session store and commits it.
pub fn seed(session: &Session, sql: &str, params: &[Value]) {
    session.store().execute(sql, params).unwrap();
    session.store().commit().unwrap();
}

pub fn text(value: &str) -> Value {
    Value::Text(value.to_string())
}

pub fn count_rows(session: &Session, table: &str) -> i64 {
    let row = session
        .store()
        .query_row(&format!("SELECT COUNT(*) AS n FROM \"{table}\";"), &[])
        .unwrap()
        .unwrap();
    match row.get("n") {
        Some(Value::Integer(n)) => *n,
        other => panic!("unexpected count value: {other:?}"),
    }
}
