//! Relation loading against a scripted connection.

mod common;

use common::{blog, mapper, rows};
use sqlmapper::{Customize, MapperError, Row, Value, row};

const POSTS: &str = "SELECT * FROM `posts`;";
const COMMENTS_OF_1_2: &str = "SELECT `comments`.`post_id` AS __id, `comments`.* FROM `comments` \
                               WHERE `comments`.`post_id` IN (1,2);";
const AUTHORS_OF_1_2: &str = "SELECT `posts`.`id` AS __id, `users`.* FROM `users` \
                              INNER JOIN `posts` ON `users`.`id` = `posts`.`author_id` \
                              WHERE `posts`.`id` IN (1,2);";

fn two_posts() -> Vec<Row> {
    vec![
        row! { "id" => 1, "title" => "first", "author_id" => 7 },
        row! { "id" => 2, "title" => "second", "author_id" => 8 },
    ]
}

fn comment(post: i64, id: i64, body: &str) -> Row {
    row! { "__id" => post, "id" => id, "post_id" => post, "body" => body }
}

fn ids(value: Option<&Value>) -> Vec<i64> {
    value
        .and_then(Value::as_list)
        .unwrap_or_default()
        .iter()
        .filter_map(|v| v.as_row())
        .filter_map(|r| r.get("id").and_then(Value::as_i64))
        .collect()
}

#[tokio::test]
async fn has_many_attaches_lists_and_strips_join_column() {
    let conn = blog();
    conn.respond(POSTS, rows(two_posts()));
    conn.respond(
        COMMENTS_OF_1_2,
        rows([comment(1, 10, "a"), comment(1, 11, "b"), comment(2, 12, "c")]),
    );
    let mapper = mapper(conn);
    let posts = mapper.table("posts").await.unwrap();
    let comments = mapper.table("comments").await.unwrap();
    posts.has_many("comments", &comments, "post_id");

    let result = posts.load("comments").all().await.unwrap();

    assert_eq!(ids(result[0].get("comments")), vec![10, 11]);
    assert_eq!(ids(result[1].get("comments")), vec![12]);
    let first = result[0].get("comments").and_then(Value::as_list).unwrap();
    assert!(!first[0].as_row().unwrap().contains_key("__id"));
    assert_eq!(mapper.connection().executed(), vec![POSTS, COMMENTS_OF_1_2]);
}

#[tokio::test]
async fn one_sub_query_for_the_whole_result_set() {
    let conn = blog();
    conn.respond(
        POSTS,
        rows((1..=4).map(|id| row! { "id" => id, "title" => "t" })),
    );
    let mapper = mapper(conn);
    let posts = mapper.table("posts").await.unwrap();
    let comments = mapper.table("comments").await.unwrap();
    posts.has_many("comments", &comments, "post_id");

    let result = posts.load("comments").all().await.unwrap();

    assert_eq!(result.len(), 4);
    let executed = mapper.connection().executed();
    assert_eq!(executed.len(), 2);
    assert!(executed[1].ends_with("WHERE `comments`.`post_id` IN (1,2,3,4);"));
    // no related rows: the key stays absent
    assert!(result.iter().all(|r| !r.contains_key("comments")));
}

#[tokio::test]
async fn belongs_to_attaches_a_single_row() {
    let conn = blog();
    conn.respond(POSTS, rows(two_posts()));
    conn.respond(
        AUTHORS_OF_1_2,
        rows([
            row! { "__id" => 1, "id" => 7, "name" => "ann" },
            row! { "__id" => 2, "id" => 8, "name" => "bob" },
        ]),
    );
    let mapper = mapper(conn);
    let posts = mapper.table("posts").await.unwrap();
    let users = mapper.table("users").await.unwrap();
    posts.belongs_to("author", &users, "author_id");

    let result = posts.load("author").all().await.unwrap();

    let author = result[1].get("author").and_then(Value::as_row).unwrap();
    assert_eq!(author.get("name").and_then(Value::as_str), Some("bob"));
    assert!(!author.contains_key("__id"));
}

#[tokio::test]
async fn has_one_takes_the_first_match() {
    let conn = blog();
    conn.respond(POSTS, rows(two_posts()));
    conn.respond(
        "SELECT `comments`.`post_id` AS __id, `comments`.* FROM `comments` \
         WHERE `comments`.`post_id` IN (1,2) ORDER BY `comments`.`id` DESC;",
        rows([comment(1, 11, "newest"), comment(1, 10, "older")]),
    );
    let mapper = mapper(conn);
    let posts = mapper.table("posts").await.unwrap();
    let comments = mapper.table("comments").await.unwrap();
    posts.has_one("latest_comment", &comments, "post_id");

    let result = posts
        .load_with(
            "latest_comment",
            Customize::sync(|q| {
                q.order(["-id"]);
            }),
        )
        .all()
        .await
        .unwrap();

    let latest = result[0].get("latest_comment").and_then(Value::as_row).unwrap();
    assert_eq!(latest.get("body").and_then(Value::as_str), Some("newest"));
    assert!(result[1].get("latest_comment").is_none());
}

#[tokio::test]
async fn has_many_through_joins_the_link_table() {
    let conn = blog();
    conn.respond(POSTS, rows(two_posts()));
    conn.respond(
        "SELECT `post_tags`.`post_id` AS __id, `tags`.* FROM `tags` \
         INNER JOIN `post_tags` ON `tags`.`id` = `post_tags`.`tag_id` \
         WHERE `post_tags`.`post_id` IN (1,2);",
        rows([
            row! { "__id" => 1, "id" => 3, "label" => "rust" },
            row! { "__id" => 2, "id" => 3, "label" => "rust" },
            row! { "__id" => 2, "id" => 4, "label" => "sql" },
        ]),
    );
    let mapper = mapper(conn);
    let posts = mapper.table("posts").await.unwrap();
    let tags = mapper.table("tags").await.unwrap();
    let post_tags = mapper.table("post_tags").await.unwrap();
    posts.has_many_through("tags", &tags, "tag_id", &post_tags, "post_id");

    let result = posts.load("tags").all().await.unwrap();

    assert_eq!(ids(result[0].get("tags")), vec![3]);
    assert_eq!(ids(result[1].get("tags")), vec![3, 4]);
}

#[tokio::test]
async fn nested_loads_resolve_depth_first() {
    let conn = blog();
    conn.respond(POSTS, rows(two_posts()));
    conn.respond(
        COMMENTS_OF_1_2,
        rows([
            row! { "__id" => 1, "id" => 10, "post_id" => 1, "user_id" => 7 },
            row! { "__id" => 2, "id" => 11, "post_id" => 2, "user_id" => 8 },
        ]),
    );
    conn.respond(
        "SELECT `comments`.`id` AS __id, `users`.* FROM `users` \
         INNER JOIN `comments` ON `users`.`id` = `comments`.`user_id` \
         WHERE `comments`.`id` IN (10,11);",
        rows([
            row! { "__id" => 10, "id" => 7, "name" => "ann" },
            row! { "__id" => 11, "id" => 8, "name" => "bob" },
        ]),
    );
    let mapper = mapper(conn);
    let posts = mapper.table("posts").await.unwrap();
    let comments = mapper.table("comments").await.unwrap();
    let users = mapper.table("users").await.unwrap();
    posts.has_many("comments", &comments, "post_id");
    comments.belongs_to("user", &users, "user_id");

    let result = posts
        .load_with(
            "comments",
            Customize::sync(|q| {
                q.load("user");
            }),
        )
        .all()
        .await
        .unwrap();

    let list = result[1].get("comments").and_then(Value::as_list).unwrap();
    let comment = list[0].as_row().unwrap();
    let user = comment.get("user").and_then(Value::as_row).unwrap();
    assert_eq!(user.get("name").and_then(Value::as_str), Some("bob"));
    assert_eq!(mapper.connection().executed().len(), 3);
}

#[tokio::test]
async fn async_customization_narrows_the_sub_query() {
    let conn = blog();
    conn.respond(POSTS, rows(two_posts()));
    let mapper = mapper(conn);
    let posts = mapper.table("posts").await.unwrap();
    let comments = mapper.table("comments").await.unwrap();
    posts.has_many("comments", &comments, "post_id");

    posts
        .load_with(
            "comments",
            Customize::future(|mut q| async move {
                q.select(["id", "body"]).filter(row! { "body !=" => "" }).limit(20);
                Ok(q)
            }),
        )
        .all()
        .await
        .unwrap();

    assert_eq!(
        mapper.connection().executed()[1],
        "SELECT `comments`.`post_id` AS __id, `comments`.`id`,`comments`.`body` \
         FROM `comments` \
         WHERE `comments`.`post_id` IN (1,2) AND (`comments`.`body` != '') LIMIT 20;"
    );
}

#[tokio::test]
async fn failing_load_leaves_rows_untouched() {
    let conn = blog();
    conn.respond(
        COMMENTS_OF_1_2,
        rows([comment(1, 10, "a"), comment(2, 12, "c")]),
    );
    conn.fail(
        AUTHORS_OF_1_2,
        MapperError::Connection("connection reset".to_string()),
    );
    let mapper = mapper(conn);
    let posts = mapper.table("posts").await.unwrap();
    let comments = mapper.table("comments").await.unwrap();
    let users = mapper.table("users").await.unwrap();
    posts.has_many("comments", &comments, "post_id");
    posts.belongs_to("author", &users, "author_id");

    let mut loaded = two_posts();
    let err = posts
        .query()
        .load("comments")
        .load("author")
        .load_into(&mut loaded)
        .await
        .unwrap_err();

    assert!(matches!(err, MapperError::Connection(_)), "{err:?}");
    assert_eq!(loaded, two_posts());
}

#[tokio::test]
async fn unknown_relation_fails_before_any_sql() {
    let mapper = mapper(blog());
    let posts = mapper.table("posts").await.unwrap();

    let err = posts.load("nope").all().await.unwrap_err();

    assert!(
        matches!(&err, MapperError::UnknownRelation { table, relation } if table == "posts" && relation == "nope"),
        "{err:?}"
    );
    assert!(mapper.connection().executed().is_empty());
}

#[tokio::test]
async fn no_parent_keys_means_no_sub_query() {
    let mapper = mapper(blog());
    let posts = mapper.table("posts").await.unwrap();
    let comments = mapper.table("comments").await.unwrap();
    posts.has_many("comments", &comments, "post_id");

    let result = posts.load("comments").all().await.unwrap();

    assert!(result.is_empty());
    assert_eq!(mapper.connection().executed(), vec![POSTS]);
}

#[tokio::test]
async fn text_and_integer_ids_match() {
    let conn = blog();
    conn.respond(POSTS, rows(two_posts()));
    conn.respond(
        COMMENTS_OF_1_2,
        rows([row! { "__id" => "2", "id" => 12, "post_id" => "2" }]),
    );
    let mapper = mapper(conn);
    let posts = mapper.table("posts").await.unwrap();
    let comments = mapper.table("comments").await.unwrap();
    posts.has_many("comments", &comments, "post_id");

    let result = posts.load("comments").all().await.unwrap();

    assert_eq!(ids(result[1].get("comments")), vec![12]);
}

#[tokio::test]
async fn belongs_to_customization_qualifies_target_columns() {
    let conn = blog();
    conn.respond(POSTS, rows(two_posts()));
    let mapper = mapper(conn);
    let posts = mapper.table("posts").await.unwrap();
    let users = mapper.table("users").await.unwrap();
    posts.belongs_to("author", &users, "author_id");

    posts
        .load_with(
            "author",
            Customize::sync(|q| {
                q.select(["id", "name"]).filter(row! { "id >" => 5 });
            }),
        )
        .all()
        .await
        .unwrap();

    assert_eq!(
        mapper.connection().executed()[1],
        "SELECT `posts`.`id` AS __id, `users`.`id`,`users`.`name` FROM `users` \
         INNER JOIN `posts` ON `users`.`id` = `posts`.`author_id` \
         WHERE `posts`.`id` IN (1,2) AND (`users`.`id` > 5);"
    );
}
