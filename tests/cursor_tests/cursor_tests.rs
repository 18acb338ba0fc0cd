//! Cursor Tests
//!
//! These tests verify:
//! - Every document is produced once, in order, across batches
//! - Server cursors are released on every early exit and never twice
//! - Limits, skips and batch sizes shape the requests
//! - Server errors end iteration

#[path = "../common/mod.rs"]
mod common;

use common::{connect, fence, numbered, paging_server, MockServer, CURSOR_ID};
use docwire::protocol::{Message, Reply};
use docwire::{doc, Cursor, Document, DriverError};

fn collect(cursor: Cursor<'_, docwire::Connection>) -> Vec<Document> {
    cursor.map(|d| d.unwrap()).collect()
}

fn get_more_sizes(server: &MockServer) -> Vec<i32> {
    server
        .messages()
        .iter()
        .filter_map(|m| match m {
            Message::GetMore(g) => Some(g.number_to_return),
            _ => None,
        })
        .collect()
}

// =============================================================================
// Completeness
// =============================================================================

#[test]
fn test_all_documents_in_order() {
    let server = paging_server(10, 100);
    let connection = connect(server.address());

    let documents = collect(Cursor::new(&connection, "db.c", doc! {}).batch_size(3));

    assert_eq!(documents, numbered(0..10));
    assert_eq!(server.queries(), 1);
    assert_eq!(server.get_mores(), 3);

    fence(&connection);
    assert_eq!(server.kill_cursors(), 0);
}

#[test]
fn test_single_batch_result() {
    let server = paging_server(4, 100);
    let connection = connect(server.address());

    let documents = collect(Cursor::new(&connection, "db.c", doc! {}));

    assert_eq!(documents.len(), 4);
    assert_eq!(server.get_mores(), 0);
}

#[test]
fn test_empty_result() {
    let server = paging_server(0, 100);
    let connection = connect(server.address());

    let mut cursor = Cursor::new(&connection, "db.c", doc! {});
    assert!(cursor.next().is_none());
    assert!(cursor.is_exhausted());
    assert_eq!(cursor.cursor_id(), 0);
}

#[test]
fn test_exhausted_cursor_makes_no_more_calls() {
    let server = paging_server(5, 2);
    let connection = connect(server.address());

    let mut cursor = Cursor::new(&connection, "db.c", doc! {});
    let count = cursor.by_ref().count();
    assert_eq!(count, 5);
    assert_eq!(cursor.produced(), 5);

    let before = server.messages().len();
    assert!(cursor.next().is_none());
    assert!(cursor.next().is_none());
    drop(cursor);

    fence(&connection);
    assert_eq!(server.messages().len(), before);
}

#[test]
fn test_nothing_sent_before_first_next() {
    let server = paging_server(5, 2);
    let connection = connect(server.address());

    let mut cursor = Cursor::new(&connection, "db.c", doc! {});
    fence(&connection);
    assert_eq!(server.queries(), 0);

    assert_eq!(cursor.next().unwrap().unwrap(), doc! { "n" => 0 });
    assert_eq!(server.queries(), 1);
}

// =============================================================================
// Release
// =============================================================================

#[test]
fn test_abandoned_cursor_is_killed_once() {
    let server = paging_server(10, 3);
    let connection = connect(server.address());

    {
        let mut cursor = Cursor::new(&connection, "db.c", doc! {});
        for _ in 0..4 {
            cursor.next().unwrap().unwrap();
        }
        assert_eq!(cursor.cursor_id(), CURSOR_ID);
    }

    fence(&connection);
    assert_eq!(server.kill_cursors(), 1);
    match server.messages().last() {
        Some(Message::KillCursors(k)) => assert_eq!(k.cursor_ids, vec![CURSOR_ID]),
        other => panic!("Expected KillCursors, got {:?}", other),
    }
}

#[test]
fn test_break_out_of_loop_kills_cursor() {
    let server = paging_server(10, 2);
    let connection = connect(server.address());

    for document in Cursor::new(&connection, "db.c", doc! {}) {
        if document.unwrap().get_i32("n").unwrap() == 2 {
            break;
        }
    }

    fence(&connection);
    assert_eq!(server.kill_cursors(), 1);
}

#[test]
fn test_explicit_close() {
    let server = paging_server(10, 3);
    let connection = connect(server.address());

    let mut cursor = Cursor::new(&connection, "db.c", doc! {});
    cursor.next().unwrap().unwrap();
    cursor.close();

    fence(&connection);
    assert_eq!(server.kill_cursors(), 1);
}

#[test]
fn test_close_before_first_next_sends_nothing() {
    let server = paging_server(10, 3);
    let connection = connect(server.address());

    Cursor::new(&connection, "db.c", doc! {}).close();

    fence(&connection);
    assert!(server.messages().is_empty());
}

// =============================================================================
// Limits, Skip, Batch Size
// =============================================================================

#[test]
fn test_hard_limit_returns_single_batch() {
    let server = paging_server(10, 3);
    let connection = connect(server.address());

    let documents = collect(Cursor::new(&connection, "db.c", doc! {}).limit(-4));

    assert_eq!(documents, numbered(0..4));
    assert_eq!(server.get_mores(), 0);
    match &server.messages()[0] {
        Message::Query(q) => assert_eq!(q.number_to_return, -4),
        other => panic!("Expected Query, got {:?}", other),
    }

    fence(&connection);
    assert_eq!(server.kill_cursors(), 0);
}

#[test]
fn test_positive_limit_caps_requests() {
    let server = paging_server(10, 100);
    let connection = connect(server.address());

    let documents = collect(
        Cursor::new(&connection, "db.c", doc! {})
            .limit(5)
            .batch_size(2),
    );

    assert_eq!(documents, numbered(0..5));
    assert_eq!(get_more_sizes(&server), vec![2, 1]);

    // The server still holds the rest of the result set
    fence(&connection);
    assert_eq!(server.kill_cursors(), 1);
}

#[test]
fn test_limit_without_batch_size_requests_the_limit() {
    let server = paging_server(10, 100);
    let connection = connect(server.address());

    let documents = collect(Cursor::new(&connection, "db.c", doc! {}).limit(3));

    assert_eq!(documents.len(), 3);
    match &server.messages()[0] {
        Message::Query(q) => assert_eq!(q.number_to_return, 3),
        other => panic!("Expected Query, got {:?}", other),
    }
}

#[test]
fn test_skip_applies_to_initial_query_only() {
    let server = paging_server(10, 2);
    let connection = connect(server.address());

    let documents = collect(Cursor::new(&connection, "db.c", doc! {}).skip(7));

    assert_eq!(documents, numbered(7..10));
    assert_eq!(server.queries(), 1);
    match &server.messages()[0] {
        Message::Query(q) => assert_eq!(q.number_to_skip, 7),
        other => panic!("Expected Query, got {:?}", other),
    }
}

#[test]
fn test_query_fields_reach_the_server() {
    let server = paging_server(1, 10);
    let connection = connect(server.address());

    let mut cursor = Cursor::new(&connection, "db.c", doc! { "n" => doc! { "$gte" => 0 } })
        .fields(doc! { "n" => 1 });
    cursor.next().unwrap().unwrap();

    match &server.messages()[0] {
        Message::Query(q) => {
            assert_eq!(q.namespace, "db.c");
            assert_eq!(q.fields, Some(doc! { "n" => 1 }));
            assert!(q.query.contains_key("n"));
        }
        other => panic!("Expected Query, got {:?}", other),
    }
}

// =============================================================================
// Errors
// =============================================================================

#[test]
fn test_query_failure_ends_iteration() {
    let server = MockServer::start(|message| match message {
        Message::Query(_) => Some(Reply::failure("unknown operator: $bogus")),
        _ => None,
    });
    let connection = connect(server.address());

    let mut cursor = Cursor::new(&connection, "db.c", doc! {});
    match cursor.next() {
        Some(Err(DriverError::CommandFailure(message))) => {
            assert_eq!(message, "unknown operator: $bogus")
        }
        other => panic!("Expected CommandFailure, got {:?}", other),
    }
    assert!(cursor.next().is_none());
}

#[test]
fn test_invalidated_cursor_is_surfaced() {
    let server = MockServer::start(|message| match message {
        Message::Query(_) => Some(Reply::new(77, numbered(0..2))),
        Message::GetMore(_) => Some(Reply::cursor_not_found()),
        _ => None,
    });
    let connection = connect(server.address());

    let mut cursor = Cursor::new(&connection, "db.c", doc! {});
    assert!(cursor.next().unwrap().is_ok());
    assert!(cursor.next().unwrap().is_ok());
    match cursor.next() {
        Some(Err(DriverError::CursorInvalidated { cursor_id })) => assert_eq!(cursor_id, 77),
        other => panic!("Expected CursorInvalidated, got {:?}", other),
    }
    assert!(cursor.next().is_none());
    drop(cursor);

    // The server already dropped the cursor; nothing to kill
    fence(&connection);
    assert_eq!(server.kill_cursors(), 0);
}
