//! Integration tests for editor crate

use coedit_editor::{
    apply_batch, commit, transform_batch, ApplyFailure, Document, EditSession, Node, Operation,
    OperationBatch, OtError, RevisionLog,
};
use serde_json::{json, Value};

fn doc(content: Value) -> Document {
    Document::from_content(content).unwrap()
}

fn insert_text(path: Vec<usize>, offset: usize, text: &str) -> Operation {
    Operation::InsertText {
        path,
        offset,
        text: text.to_string(),
    }
}

fn remove_text(path: Vec<usize>, offset: usize, text: &str) -> Operation {
    Operation::RemoveText {
        path,
        offset,
        text: text.to_string(),
    }
}

/// Apply B1 then B2' and B2 then B1' and compare the trees.
fn assert_converges(content: Value, first: Vec<Operation>, second: Vec<Operation>) -> Value {
    let b1 = OperationBatch::new(0, first);
    let b2 = OperationBatch::new(0, second);

    let mut left = doc(content.clone());
    left.apply_all(&b1.operations).unwrap();
    left.apply_all(&transform_batch(&b2, &b1).unwrap().operations).unwrap();

    let mut right = doc(content);
    right.apply_all(&b2.operations).unwrap();
    right.apply_all(&transform_batch(&b1, &b2).unwrap().operations).unwrap();

    assert_eq!(left.content_json(), right.content_json());
    left.content_json()
}

#[test]
fn test_concurrent_text_edits_converge() {
    let result = assert_converges(
        json!([{ "text": "abcde" }]),
        vec![insert_text(vec![0], 1, "X")],
        vec![remove_text(vec![0], 3, "d")],
    );
    assert_eq!(result, json!([{ "text": "aXbce" }]));
}

#[test]
fn test_concurrent_insert_node_and_text_converge() {
    let result = assert_converges(
        json!([
            { "type": "p", "children": [{ "text": "one" }] },
            { "type": "p", "children": [{ "text": "two" }] }
        ]),
        vec![Operation::InsertNode {
            path: vec![1],
            node: Node::element(vec![Node::text("new")]).with_attribute("type", "p"),
        }],
        vec![insert_text(vec![1, 0], 0, "Z")],
    );
    assert_eq!(result[2]["children"][0]["text"], "Ztwo");
    assert_eq!(result[1]["children"][0]["text"], "new");
}

#[test]
fn test_concurrent_split_and_insert_converge() {
    let result = assert_converges(
        json!([{ "type": "p", "children": [{ "text": "hello" }] }]),
        vec![Operation::SplitNode {
            path: vec![0, 0],
            position: 2,
            properties: Default::default(),
        }],
        vec![insert_text(vec![0, 0], 4, "X")],
    );
    assert_eq!(
        result,
        json!([{ "type": "p", "children": [{ "text": "he" }, { "text": "llXo" }] }])
    );
}

#[test]
fn test_concurrent_merge_and_insert_converge() {
    let result = assert_converges(
        json!([{ "type": "p", "children": [{ "text": "ab" }, { "text": "cd" }] }]),
        vec![Operation::MergeNode {
            path: vec![0, 1],
            position: 2,
            properties: Default::default(),
        }],
        vec![insert_text(vec![0, 1], 1, "X")],
    );
    assert_eq!(result, json!([{ "type": "p", "children": [{ "text": "abcXd" }] }]));
}

#[test]
fn test_concurrent_move_and_insert_converge() {
    let result = assert_converges(
        json!([{ "text": "a" }, { "text": "b" }, { "text": "c" }]),
        vec![Operation::MoveNode {
            path: vec![0],
            new_path: vec![2],
        }],
        vec![insert_text(vec![1], 0, "X")],
    );
    assert_eq!(result, json!([{ "text": "Xb" }, { "text": "c" }, { "text": "a" }]));
}

#[test]
fn test_concurrent_remove_and_edit_converge() {
    let result = assert_converges(
        json!([{ "text": "gone" }, { "text": "kept" }]),
        vec![Operation::RemoveNode {
            path: vec![0],
            node: None,
        }],
        vec![insert_text(vec![0], 0, "x"), insert_text(vec![1], 4, "!")],
    );
    assert_eq!(result, json!([{ "text": "kept!" }]));
}

#[test]
fn test_deletion_propagates_to_descendants() {
    let batch = OperationBatch::new(
        0,
        vec![
            insert_text(vec![0, 2, 1], 0, "x"),
            Operation::SetNode {
                path: vec![0],
                properties: Default::default(),
                new_properties: json!({ "type": "h1" }).as_object().cloned().unwrap(),
            },
            Operation::MoveNode {
                path: vec![0, 1],
                new_path: vec![3],
            },
        ],
    );
    let against = OperationBatch::new(
        0,
        vec![Operation::RemoveNode {
            path: vec![0],
            node: None,
        }],
    );

    let result = transform_batch(&batch, &against).unwrap();
    assert!(result.is_empty());
    assert_eq!(result.document_revision, 1);
}

#[test]
fn test_stale_revision_replay() {
    // two clients type at different offsets of "ab" against revision 0
    let mut document = doc(json!([{ "text": "ab" }]));
    let mut log = RevisionLog::new();

    let first = commit(
        &mut document,
        OperationBatch::new(0, vec![insert_text(vec![0], 0, "X")]),
        &mut log,
    )
    .unwrap();
    assert_eq!(first.document_revision, 0);

    let second = commit(
        &mut document,
        OperationBatch::new(0, vec![insert_text(vec![0], 1, "Y")]),
        &mut log,
    )
    .unwrap();

    assert_eq!(second.document_revision, 1);
    assert_eq!(second.operations, vec![insert_text(vec![0], 2, "Y")]);
    assert_eq!(document.revision, 2);
    assert_eq!(document.content_json(), json!([{ "text": "XaYb" }]));
}

#[test]
fn test_idempotent_revision() {
    let mut document = doc(json!([{ "text": "" }]));
    let mut log = RevisionLog::new();

    for revision in 0..5 {
        commit(
            &mut document,
            OperationBatch::new(revision, vec![insert_text(vec![0], 0, "z")]),
            &mut log,
        )
        .unwrap();
        assert_eq!(document.revision, revision + 1);
    }
    assert_eq!(log.len(), 5);
}

#[test]
fn test_cyclic_move_rejects_whole_batch() {
    let mut document = doc(json!([{ "children": [{ "text": "a" }] }, { "text": "b" }]));
    let log = RevisionLog::new();
    let before = document.clone();

    let batch = OperationBatch::new(
        0,
        vec![
            insert_text(vec![1], 0, "ok"),
            Operation::MoveNode {
                path: vec![0],
                new_path: vec![0, 0, 1],
            },
        ],
    );

    let result = apply_batch(&mut document, batch, &log);
    assert_eq!(
        result,
        Err(OtError::ApplyFailed {
            variant: "move_node",
            reason: ApplyFailure::CyclicMove
        })
    );
    assert_eq!(document, before);
}

#[test]
fn test_split_then_merge_restores_tree() {
    let content = json!([{ "type": "p", "children": [{ "text": "hello", "isBold": true }] }]);
    let mut document = doc(content.clone());

    document
        .apply_all(&[
            Operation::SplitNode {
                path: vec![0, 0],
                position: 3,
                properties: json!({ "isBold": true }).as_object().cloned().unwrap(),
            },
            Operation::MergeNode {
                path: vec![0, 1],
                position: 3,
                properties: json!({ "isBold": true }).as_object().cloned().unwrap(),
            },
        ])
        .unwrap();

    assert_eq!(document.content_json(), content);
}

#[test]
fn test_wire_batch_round_trip() {
    let mut document = doc(json!([{ "type": "p", "children": [{ "text": "hi" }] }]));
    let mut log = RevisionLog::new();

    let inbound = json!({
        "documentRevision": 0,
        "operations": [
            { "type": "insert_text", "path": [0, 0], "offset": 2, "text": "!" },
            { "type": "set_node", "path": [0, 0], "properties": {}, "newProperties": { "isItalic": true } }
        ]
    });

    let applied = commit(&mut document, OperationBatch::decode(inbound).unwrap(), &mut log).unwrap();
    let outbound = serde_json::to_value(OperationBatch::new(document.revision, applied.operations)).unwrap();

    assert_eq!(outbound["documentRevision"], 1);
    assert_eq!(outbound["operations"][1]["newProperties"]["isItalic"], true);
    assert_eq!(
        document.content_json(),
        json!([{ "type": "p", "children": [{ "text": "hi!", "isItalic": true }] }])
    );
}

struct Server {
    document: Document,
    log: RevisionLog,
}

impl Server {
    fn new(content: Value) -> Self {
        Self {
            document: doc(content),
            log: RevisionLog::new(),
        }
    }

    fn client(&self, id: &str) -> EditSession {
        EditSession::new(id, self.document.snapshot())
    }

    /// Returns the outbound batch, stamped with the resulting revision.
    fn submit(&mut self, batch: OperationBatch) -> OperationBatch {
        let applied = commit(&mut self.document, batch, &mut self.log).unwrap();
        OperationBatch::new(self.document.revision, applied.operations)
    }
}

#[test]
fn test_client_sessions_converge_on_tied_inserts() {
    let mut server = Server::new(json!([{ "text": "ab" }]));
    let mut alice = server.client("alice");
    let mut bob = server.client("bob");

    alice.apply_local(insert_text(vec![0], 1, "X")).unwrap();
    bob.apply_local(insert_text(vec![0], 1, "Y")).unwrap();

    let from_alice = server.submit(alice.flush().unwrap());
    let from_bob = server.submit(bob.flush().unwrap());

    alice.acknowledge(from_alice.document_revision);
    alice.receive_remote(&from_bob).unwrap();

    bob.receive_remote(&from_alice).unwrap();
    bob.acknowledge(from_bob.document_revision);

    assert_eq!(server.document.content_json(), json!([{ "text": "aXYb" }]));
    assert_eq!(alice.document().content_json(), server.document.content_json());
    assert_eq!(bob.document().content_json(), server.document.content_json());
    assert_eq!(alice.server_revision(), 2);
    assert_eq!(bob.server_revision(), 2);
}

#[test]
fn test_client_edit_on_concurrently_removed_node_is_dropped() {
    let mut server = Server::new(json!([{ "text": "gone" }, { "text": "kept" }]));
    let mut alice = server.client("alice");
    let mut bob = server.client("bob");

    alice
        .apply_local(Operation::RemoveNode {
            path: vec![0],
            node: None,
        })
        .unwrap();
    bob.apply_local(insert_text(vec![0], 4, "!")).unwrap();
    bob.apply_local(insert_text(vec![1], 0, ">")).unwrap();

    let from_alice = server.submit(alice.flush().unwrap());
    let from_bob = server.submit(bob.flush().unwrap());
    assert_eq!(from_bob.operations, vec![insert_text(vec![0], 0, ">")]);

    alice.acknowledge(from_alice.document_revision);
    alice.receive_remote(&from_bob).unwrap();

    bob.receive_remote(&from_alice).unwrap();
    assert_eq!(bob.pending_count(), 1);
    bob.acknowledge(from_bob.document_revision);

    let expected = json!([{ "text": ">kept" }]);
    assert_eq!(server.document.content_json(), expected);
    assert_eq!(alice.document().content_json(), expected);
    assert_eq!(bob.document().content_json(), expected);
}
