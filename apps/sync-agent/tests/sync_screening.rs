//! Screening questionnaire tree sync tests.

mod common;

use library_core::Family;
use pretty_assertions::assert_eq;
use serde_json::{json, Value};

use rehab_library_sync::db::FileOwner;

use common::fixtures;
use common::TestContext;

/// Questionnaire 1 with one section of two questions; the first question,
/// its first option and the description each carry a file.
fn with_files() -> Value {
    let mut record = fixtures::screening_questionnaire(1, 1, 2);
    record["description"] = json!({"en": "<img src=\"/file/42\">"});
    record["sections"][0]["questions"][0]["file_id"] = json!(40);
    record["sections"][0]["questions"][0]["options"][0]["file_id"] = json!(41);
    record
}

fn add_tree_files(ctx: &TestContext) {
    for id in [40, 41, 42] {
        ctx.global.add_image(id);
    }
}

/// Test every node lands under the right parent.
#[tokio::test]
async fn test_tree_integrity() {
    let ctx = TestContext::new();
    ctx.global.set_collection(
        Family::ScreeningQuestionnaires,
        json!([fixtures::screening_questionnaire(1, 2, 2)]),
    );

    let report = ctx.engine.sync_screening_questionnaires().await.unwrap();
    assert_eq!(report.created, 1);

    assert_eq!(ctx.rows("screening_sections"), 2);
    assert_eq!(ctx.rows("screening_questions"), 4);
    assert_eq!(ctx.rows("screening_options"), 8);
    assert_eq!(ctx.rows("screening_logics"), 4);

    let repo = ctx.repo();
    assert_eq!(repo.screening_parent("screening_sections", 102).unwrap(), Some(1));
    assert_eq!(repo.screening_parent("screening_questions", 10201).unwrap(), Some(102));
    assert_eq!(repo.screening_parent("screening_options", 102012).unwrap(), Some(10201));
    assert_eq!(
        repo.screening_logics(10201).unwrap(),
        vec![(102010, Some(10201), Some(102011))]
    );

    let again = ctx.engine.sync_screening_questionnaires().await.unwrap();
    assert_eq!((again.created, again.updated), (0, 1));
    assert_eq!(repo.screening_subtree(1).unwrap().node_count(), 2 + 4 + 8 + 4);
}

/// Test nodes removed globally are pruned while their parents survive.
#[tokio::test]
async fn test_leaf_pruning() {
    let ctx = TestContext::new();
    add_tree_files(&ctx);
    ctx.global
        .set_collection(Family::ScreeningQuestionnaires, json!([with_files()]));
    ctx.engine.sync_screening_questionnaires().await.unwrap();
    assert_eq!(ctx.rows("files"), 3);

    // Drop the first question (and its file) plus one option of the second
    let mut trimmed = with_files();
    let questions = trimmed["sections"][0]["questions"].as_array_mut().unwrap();
    questions.remove(0);
    questions[0]["options"].as_array_mut().unwrap().pop();
    ctx.global
        .set_collection(Family::ScreeningQuestionnaires, json!([trimmed]));

    let report = ctx.engine.sync_screening_questionnaires().await.unwrap();
    assert_eq!((report.updated, report.deleted, report.failed), (1, 0, 0));

    let subtree = ctx.repo().screening_subtree(1).unwrap();
    assert_eq!(subtree.sections.into_iter().collect::<Vec<_>>(), vec![101]);
    assert_eq!(subtree.questions.into_iter().collect::<Vec<_>>(), vec![10102]);
    assert_eq!(subtree.options.into_iter().collect::<Vec<_>>(), vec![101021]);
    assert_eq!(subtree.logics.into_iter().collect::<Vec<_>>(), vec![101020]);

    // Only the description file remains
    let files = ctx.repo().all_files().unwrap();
    assert_eq!(files.len(), 1);
    assert_eq!(files[0].global_file_id, Some(42));
    assert_eq!(ctx.blob_count(), 1);
}

/// Test a second run reuses every file of the tree.
#[tokio::test]
async fn test_tree_files_idempotent() {
    let ctx = TestContext::new();
    add_tree_files(&ctx);
    ctx.global
        .set_collection(Family::ScreeningQuestionnaires, json!([with_files()]));
    ctx.engine.sync_screening_questionnaires().await.unwrap();
    let before: Vec<i64> = ctx.repo().all_files().unwrap().iter().map(|f| f.id).collect();

    ctx.engine.sync_screening_questionnaires().await.unwrap();

    let after: Vec<i64> = ctx.repo().all_files().unwrap().iter().map(|f| f.id).collect();
    assert_eq!(after, before);
    assert_eq!(ctx.global.downloads(), 3);
    assert_eq!(ctx.blob_count(), 3);
}

/// Test deleting a questionnaire removes its subtree, files and blobs.
#[tokio::test]
async fn test_hard_prune_removes_subtree_files() {
    let ctx = TestContext::new();
    add_tree_files(&ctx);
    ctx.global.set_collection(
        Family::ScreeningQuestionnaires,
        json!([with_files(), fixtures::screening_questionnaire(2, 1, 1)]),
    );
    ctx.engine.sync_screening_questionnaires().await.unwrap();

    ctx.global.set_collection(
        Family::ScreeningQuestionnaires,
        json!([fixtures::screening_questionnaire(2, 1, 1)]),
    );
    let report = ctx.engine.sync_screening_questionnaires().await.unwrap();

    assert_eq!(report.deleted, 1);
    assert_eq!(ctx.rows("screening_questionnaires"), 1);
    assert_eq!(ctx.rows("screening_sections"), 1);
    assert_eq!(ctx.rows("screening_questions"), 1);
    assert_eq!(ctx.rows("screening_options"), 2);
    assert_eq!(ctx.rows("screening_logics"), 1);
    assert_eq!(ctx.rows("files"), 0);
    assert_eq!(ctx.blob_count(), 0);
}

/// Test a section moved to another questionnaire keeps its question file.
#[tokio::test]
async fn test_moved_section_keeps_file() {
    let ctx = TestContext::new();
    ctx.global.add_image(70);
    let mut first = fixtures::screening_questionnaire(1, 1, 1);
    first["sections"][0]["questions"][0]["file_id"] = json!(70);
    let second = fixtures::screening_questionnaire(2, 1, 1);
    ctx.global.set_collection(
        Family::ScreeningQuestionnaires,
        json!([first.clone(), second.clone()]),
    );
    ctx.engine.sync_screening_questionnaires().await.unwrap();
    let before = ctx.repo().all_files().unwrap();
    assert_eq!(before.len(), 1);

    // Section 101 now belongs to questionnaire 2, which is listed first
    let mut receiver = second;
    let moved = first["sections"][0].clone();
    receiver["sections"].as_array_mut().unwrap().push(moved);
    first["sections"] = json!([]);
    ctx.global.set_collection(
        Family::ScreeningQuestionnaires,
        json!([receiver, first]),
    );

    let report = ctx.engine.sync_screening_questionnaires().await.unwrap();
    assert_eq!((report.updated, report.failed), (2, 0));
    let repo = ctx.repo();
    assert_eq!(repo.screening_parent("screening_sections", 101).unwrap(), Some(2));
    let owned = repo
        .files_owned_by(FileOwner::SCREENING_QUESTION, &[10101])
        .unwrap();
    assert_eq!(owned.len(), 1);
    assert_eq!(owned[0].id, before[0].id);
    assert_eq!(ctx.rows("files"), 1);
    assert_eq!(ctx.blob_count(), 1);
    assert_eq!(ctx.global.downloads(), 1);

    ctx.engine.sync_screening_questionnaires().await.unwrap();
    let after: Vec<i64> = ctx.repo().all_files().unwrap().iter().map(|f| f.id).collect();
    assert_eq!(after, vec![before[0].id]);
    assert_eq!(ctx.global.downloads(), 1);
    assert_eq!(ctx.blob_count(), 1);
}
