//! Scripted in-memory connection shared by the integration tests.
#![allow(dead_code)]

use sqlmapper::{
    ColumnInfo, Connection, ExecResult, Mapper, MapperConfig, MapperError, MapperResult,
    QueryOutput, Row,
};
use std::collections::HashMap;
use std::sync::Mutex;

/// Replies to exact SQL strings with canned outputs and records everything it runs.
///
/// Unscripted SELECTs return no rows; other unscripted statements report zero
/// affected rows.
#[derive(Default)]
pub struct ScriptedConn {
    tables: HashMap<String, Vec<ColumnInfo>>,
    responses: Mutex<HashMap<String, MapperResult<QueryOutput>>>,
    executed: Mutex<Vec<String>>,
    information_queries: Mutex<Vec<String>>,
}

impl ScriptedConn {
    pub fn new() -> Self {
        Self::default()
    }

    /// Declare a table returned by the information query.
    pub fn with_table(mut self, name: &str, primary_key: &str, columns: &[&str]) -> Self {
        let infos = columns
            .iter()
            .map(|column| {
                let mut info = ColumnInfo::named(*column);
                if *column == primary_key {
                    info.column_key = "PRI".to_string();
                }
                info
            })
            .collect();
        self.tables.insert(name.to_string(), infos);
        self
    }

    pub fn respond(&self, sql: &str, output: impl Into<QueryOutput>) {
        self.responses
            .lock()
            .unwrap()
            .insert(sql.to_string(), Ok(output.into()));
    }

    pub fn fail(&self, sql: &str, err: MapperError) {
        self.responses
            .lock()
            .unwrap()
            .insert(sql.to_string(), Err(err));
    }

    pub fn executed(&self) -> Vec<String> {
        self.executed.lock().unwrap().clone()
    }

    pub fn information_queries(&self) -> Vec<String> {
        self.information_queries.lock().unwrap().clone()
    }
}

impl Connection for ScriptedConn {
    async fn execute(&self, sql: &str) -> MapperResult<QueryOutput> {
        self.executed.lock().unwrap().push(sql.to_string());
        if let Some(response) = self.responses.lock().unwrap().get(sql) {
            return response.clone();
        }
        if sql.starts_with("SELECT") {
            Ok(QueryOutput::Rows(Vec::new()))
        } else {
            Ok(QueryOutput::Mutation(ExecResult::new(0)))
        }
    }

    async fn information_query(&self, table: &str) -> MapperResult<Vec<ColumnInfo>> {
        self.information_queries
            .lock()
            .unwrap()
            .push(table.to_string());
        Ok(self.tables.get(table).cloned().unwrap_or_default())
    }
}

/// posts, comments, users, tags and the post_tags link table.
pub fn blog() -> ScriptedConn {
    ScriptedConn::new()
        .with_table("posts", "id", &["id", "title", "author_id"])
        .with_table("comments", "id", &["id", "post_id", "user_id", "body"])
        .with_table("users", "id", &["id", "name"])
        .with_table("tags", "id", &["id", "label"])
        .with_table("post_tags", "id", &["id", "post_id", "tag_id"])
}

pub fn mapper(conn: ScriptedConn) -> Mapper<ScriptedConn> {
    Mapper::new(conn, MapperConfig::new())
}

pub fn strict_mapper(conn: ScriptedConn) -> Mapper<ScriptedConn> {
    Mapper::new(conn, MapperConfig::new().with_strict(true))
}

pub fn rows(rows: impl IntoIterator<Item = Row>) -> QueryOutput {
    QueryOutput::Rows(rows.into_iter().collect())
}

pub fn affected(n: u64) -> QueryOutput {
    QueryOutput::Mutation(ExecResult::new(n))
}
