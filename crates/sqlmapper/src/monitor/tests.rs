use super::*;

#[test]
fn query_type_from_leading_keyword() {
    assert_eq!(QueryType::from_sql("SELECT * FROM `t`;"), QueryType::Select);
    assert_eq!(QueryType::from_sql("  insert into t values (1)"), QueryType::Insert);
    assert_eq!(QueryType::from_sql("UPDATE `t` SET a = 1"), QueryType::Update);
    assert_eq!(QueryType::from_sql("DELETE FROM `t`"), QueryType::Delete);
    assert_eq!(QueryType::from_sql("TRUNCATE `t`;"), QueryType::Truncate);
    assert_eq!(QueryType::from_sql("(SELECT 1)"), QueryType::Select);
    assert_eq!(QueryType::from_sql("SHOW TABLES"), QueryType::Other);
    assert_eq!(QueryType::from_sql(""), QueryType::Other);
}

#[test]
fn context_builder() {
    let ctx = QueryContext::new("SELECT 1")
        .with_table("posts")
        .with_tag("comments");
    assert_eq!(ctx.query_type, QueryType::Select);
    assert_eq!(ctx.table.as_deref(), Some("posts"));
    assert_eq!(ctx.tag.as_deref(), Some("comments"));
}

#[test]
fn default_hook_continues() {
    struct Noop;
    impl QueryHook for Noop {}

    assert_eq!(
        Noop.before_query(&QueryContext::new("SELECT 1")),
        HookAction::Continue
    );
}

#[test]
fn tracing_hook_truncates_on_char_boundary() {
    let hook = TracingSqlHook::new().max_sql_length(5);
    assert_eq!(hook.truncate_sql("SELECT 1"), "SELEC...");
    assert_eq!(hook.truncate_sql("SEL"), "SEL");

    let hook = TracingSqlHook::new().max_sql_length(2);
    assert_eq!(hook.truncate_sql("é1"), "é...");

    let hook = TracingSqlHook::new().no_truncate();
    assert_eq!(hook.truncate_sql(&"x".repeat(500)).len(), 500);
}

#[test]
fn tracing_hook_never_blocks() {
    let hook = TracingSqlHook::new().level(tracing::Level::TRACE);
    assert_eq!(
        hook.before_query(&QueryContext::new("DELETE FROM `t`;")),
        HookAction::Continue
    );
}

#[test]
fn error_result_is_truncated() {
    let result = QueryResult::error("e".repeat(600));
    match result {
        QueryResult::Error(msg) => assert_eq!(msg.len(), 515),
        other => panic!("unexpected {other:?}"),
    }
    assert_eq!(QueryResult::Rows(3).to_string(), "3 rows");
}
