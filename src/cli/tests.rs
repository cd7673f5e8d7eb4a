use httpmock::MockServer;
use shelfmark::application::error::AppError;
use shelfmark::config::{BooksCmd, BorrowArgs, GenreArg, SummaryArgs};
use shelfmark::infra::http::ApiError;
use time::macros::date;

use crate::cli::Ctx;
use crate::cli::handlers::{books, borrow, summary};

const BOOK_B1: &str = r#"{"_id":"b1","title":"Cosmos","author":"Carl Sagan","genre":"SCIENCE","isbn":"9780345539434","copies":3,"available":true}"#;

fn ctx(server: &MockServer) -> Ctx {
    Ctx::for_base_url(&server.base_url()).expect("ctx")
}

fn envelope(data: &str) -> String {
    format!(r#"{{"success":true,"message":"ok","data":{data}}}"#)
}

#[tokio::test]
async fn books_list_hits_endpoint() -> Result<(), AppError> {
    let server = MockServer::start();
    let mock = server.mock(|when, then| {
        when.method("GET").path("/api/books");
        then.status(200)
            .header("content-type", "application/json")
            .body(envelope(&format!("[{BOOK_B1}]")));
    });

    books::handle(&ctx(&server), BooksCmd::List { json: true }).await?;
    mock.assert();
    Ok(())
}

#[tokio::test]
async fn books_add_posts_input() -> Result<(), AppError> {
    let server = MockServer::start();
    let mock = server.mock(|when, then| {
        when.method("POST")
            .path("/api/books")
            .json_body_includes(r#"{"title":"Dune","genre":"FICTION","copies":0}"#);
        then.status(201)
            .header("content-type", "application/json")
            .body(envelope(
                r#"{"_id":"b7","title":"Dune","author":"Frank Herbert","genre":"FICTION","isbn":"9780441013593","copies":0,"available":true}"#,
            ));
    });

    books::handle(
        &ctx(&server),
        BooksCmd::Add {
            title: "Dune".into(),
            author: "Frank Herbert".into(),
            genre: GenreArg::Fiction,
            isbn: "9780441013593".into(),
            copies: 0,
            description: None,
        },
    )
    .await?;
    mock.assert();
    Ok(())
}

#[tokio::test]
async fn books_add_rejects_blank_title_without_request() {
    let server = MockServer::start();

    let err = books::handle(
        &ctx(&server),
        BooksCmd::Add {
            title: " ".into(),
            author: "Anon".into(),
            genre: GenreArg::Fiction,
            isbn: "1".into(),
            copies: 1,
            description: None,
        },
    )
    .await
    .expect_err("blank title");

    // Validation runs before any request; the server has no mocks to answer one.
    assert!(matches!(err, AppError::Api(ApiError::Validation(_))));
    assert_eq!(err.user_message(), "Title is required");
}

#[tokio::test]
async fn books_update_merges_patch_into_current_record() -> Result<(), AppError> {
    let server = MockServer::start();
    let get = server.mock(|when, then| {
        when.method("GET").path("/api/books/b1");
        then.status(200)
            .header("content-type", "application/json")
            .body(envelope(BOOK_B1));
    });
    let put = server.mock(|when, then| {
        when.method("PUT")
            .path("/api/books/b1")
            .json_body_includes(r#"{"title":"Cosmos","author":"Carl Sagan","copies":5}"#);
        then.status(200)
            .header("content-type", "application/json")
            .body(envelope(&BOOK_B1.replace(r#""copies":3"#, r#""copies":5"#)));
    });

    books::handle(
        &ctx(&server),
        BooksCmd::Update {
            id: "b1".into(),
            title: None,
            author: None,
            genre: None,
            isbn: None,
            copies: Some(5),
            description: None,
            clear_description: false,
        },
    )
    .await?;
    get.assert();
    put.assert();
    Ok(())
}

#[tokio::test]
async fn books_get_maps_404_to_not_found() {
    let server = MockServer::start();
    let mock = server.mock(|when, then| {
        when.method("GET").path("/api/books/missing");
        then.status(404)
            .header("content-type", "application/json")
            .body(r#"{"success":false,"message":"Book not found"}"#);
    });

    let err = books::handle(&ctx(&server), BooksCmd::Get { id: "missing".into() })
        .await
        .expect_err("missing book");

    assert!(matches!(err, AppError::Api(ApiError::NotFound { .. })));
    mock.assert();
}

#[tokio::test]
async fn books_delete_with_yes_skips_prompt() -> Result<(), AppError> {
    let server = MockServer::start();
    let mock = server.mock(|when, then| {
        when.method("DELETE").path("/api/books/b1");
        then.status(200)
            .header("content-type", "application/json")
            .body(r#"{"success":true,"message":"Book deleted successfully","data":null}"#);
    });

    books::handle(
        &ctx(&server),
        BooksCmd::Delete {
            id: "b1".into(),
            yes: true,
        },
    )
    .await?;
    mock.assert();
    Ok(())
}

#[tokio::test]
async fn borrow_posts_request_then_shows_summary() -> Result<(), AppError> {
    let server = MockServer::start();
    let get = server.mock(|when, then| {
        when.method("GET").path("/api/books/b1");
        then.status(200)
            .header("content-type", "application/json")
            .body(envelope(BOOK_B1));
    });
    let post = server.mock(|when, then| {
        when.method("POST")
            .path("/api/borrow")
            .json_body_includes(r#"{"book":"b1","quantity":2,"dueDate":"2026-11-02"}"#);
        then.status(201)
            .header("content-type", "application/json")
            .body(r#"{"success":true,"message":"Book borrowed successfully","data":{}}"#);
    });
    let summary = server.mock(|when, then| {
        when.method("GET").path("/api/borrow");
        then.status(200)
            .header("content-type", "application/json")
            .body(envelope(
                r#"[{"book":{"title":"Cosmos","isbn":"9780345539434"},"totalQuantity":2}]"#,
            ));
    });

    borrow::handle(
        &ctx(&server),
        BorrowArgs {
            book_id: "b1".into(),
            quantity: 2,
            due_date: Some(date!(2026 - 11 - 02)),
        },
    )
    .await?;
    get.assert();
    post.assert();
    summary.assert();
    Ok(())
}

#[tokio::test]
async fn borrow_over_copies_never_posts() {
    let server = MockServer::start();
    let get = server.mock(|when, then| {
        when.method("GET").path("/api/books/b1");
        then.status(200)
            .header("content-type", "application/json")
            .body(envelope(BOOK_B1));
    });
    let err = borrow::handle(
        &ctx(&server),
        BorrowArgs {
            book_id: "b1".into(),
            quantity: 4,
            due_date: None,
        },
    )
    .await
    .expect_err("too many copies");

    assert!(matches!(err, AppError::Api(ApiError::Validation(_))));
    get.assert();
}

#[tokio::test]
async fn summary_surfaces_backend_message() {
    let server = MockServer::start();
    let mock = server.mock(|when, then| {
        when.method("GET").path("/api/borrow");
        then.status(500)
            .header("content-type", "application/json")
            .body(r#"{"success":false,"message":"Aggregation failed"}"#);
    });

    let err = summary::handle(&ctx(&server), SummaryArgs::default())
        .await
        .expect_err("server error");

    assert_eq!(err.user_message(), "Aggregation failed");
    mock.assert();
}
