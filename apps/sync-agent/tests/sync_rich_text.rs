//! Rich-text and file lifecycle tests (FAQs, tutorials, assistive technologies).

mod common;

use std::collections::BTreeMap;

use library_core::{Family, LocalizedText};
use pretty_assertions::assert_eq;
use serde_json::json;

use common::fixtures;
use common::TestContext;

fn stored_content(ctx: &TestContext, table: &str, id: i64) -> LocalizedText {
    ctx.repo().read_json(table, "content", id).unwrap().unwrap()
}

fn two_language_content() -> serde_json::Value {
    json!({
        "en": "<p><img src=\"/api/file/77\"></p>",
        "km": "<p><img src=\"/api/file/77\"><a href=\"/file/78\">PDF</a></p>"
    })
}

/// Test every language variant points at the migrated local files.
#[tokio::test]
async fn test_faq_rewrites_all_languages() {
    let ctx = TestContext::new();
    ctx.global.add_image(77);
    ctx.global.add_file(78, "guide.pdf", "application/pdf", b"%PDF");
    ctx.global
        .set_collection(Family::Faqs, json!([fixtures::faq(1, two_language_content())]));

    let report = ctx.engine.sync_faqs().await.unwrap();
    assert_eq!(report.created, 1);

    let files = ctx.repo().all_files().unwrap();
    assert_eq!(files.len(), 2);
    let by_global: BTreeMap<i64, i64> = files
        .iter()
        .map(|f| (f.global_file_id.unwrap(), f.id))
        .collect();
    let image = by_global[&77];
    let pdf = by_global[&78];

    let content = stored_content(&ctx, "faqs", 1);
    assert_eq!(content["en"], format!("<p><img src=\"/api/file/{}\"></p>", image));
    assert_eq!(
        content["km"],
        format!("<p><img src=\"/api/file/{}\"><a href=\"/file/{}\">PDF</a></p>", image, pdf)
    );

    // Shared file is migrated once and stored under the family directory
    assert_eq!(ctx.global.downloads(), 2);
    assert_eq!(ctx.blob(&format!("faq/{}/image-77.png", image)), b"png-77");
    assert_eq!(ctx.blob(&format!("faq/{}/guide.pdf", pdf)), b"%PDF");
}

/// Test repeated runs neither duplicate files nor change content.
#[tokio::test]
async fn test_faq_sync_idempotent() {
    let ctx = TestContext::new();
    ctx.global.add_image(77);
    ctx.global.add_image(78);
    ctx.global
        .set_collection(Family::Faqs, json!([fixtures::faq(1, two_language_content())]));

    ctx.engine.sync_faqs().await.unwrap();
    let content = stored_content(&ctx, "faqs", 1);

    for _ in 0..2 {
        let report = ctx.engine.sync_faqs().await.unwrap();
        assert_eq!((report.created, report.updated, report.failed), (0, 1, 0));
    }

    assert_eq!(stored_content(&ctx, "faqs", 1), content);
    assert_eq!(ctx.rows("files"), 2);
    assert_eq!(ctx.blob_count(), 2);
    assert_eq!(ctx.global.downloads(), 2);
}

/// Test files dropped from the content are released after the update.
#[tokio::test]
async fn test_faq_update_releases_replaced_files() {
    let ctx = TestContext::new();
    for id in [77, 78, 79] {
        ctx.global.add_image(id);
    }
    ctx.global
        .set_collection(Family::Faqs, json!([fixtures::faq(1, two_language_content())]));
    ctx.engine.sync_faqs().await.unwrap();

    let old_pdf = ctx
        .repo()
        .all_files()
        .unwrap()
        .into_iter()
        .find(|f| f.global_file_id == Some(78))
        .unwrap();

    ctx.global.set_collection(
        Family::Faqs,
        json!([fixtures::faq(1, json!({"en": "<img src=\"/file/77\"><img src=\"/file/79\">"}))]),
    );
    ctx.engine.sync_faqs().await.unwrap();

    let files = ctx.repo().all_files().unwrap();
    let mut globals: Vec<i64> = files.iter().filter_map(|f| f.global_file_id).collect();
    globals.sort();
    assert_eq!(globals, vec![77, 79]);
    assert!(ctx.repo().get_file(old_pdf.id).unwrap().is_none());
    assert!(!ctx.blob_exists(&old_pdf.path));
    assert_eq!(ctx.blob_count(), 2);
}

/// Test deleting a FAQ removes its files and blobs.
#[tokio::test]
async fn test_faq_delete_releases_files() {
    let ctx = TestContext::new();
    ctx.global.add_image(77);
    ctx.global.add_image(78);
    ctx.global.set_collection(
        Family::Faqs,
        json!([
            fixtures::faq(1, two_language_content()),
            fixtures::faq(2, json!({"en": "No attachments"}))
        ]),
    );
    ctx.engine.sync_faqs().await.unwrap();
    assert_eq!(ctx.blob_count(), 2);

    ctx.global.set_collection(
        Family::Faqs,
        json!([fixtures::faq(2, json!({"en": "No attachments"}))]),
    );
    let report = ctx.engine.sync_faqs().await.unwrap();

    assert_eq!(report.deleted, 1);
    assert_eq!(ctx.rows("faqs"), 1);
    assert_eq!(ctx.rows("files"), 0);
    assert_eq!(ctx.blob_count(), 0);
}

/// Test references to unknown files are left as they are.
#[tokio::test]
async fn test_unmapped_reference_kept() {
    let ctx = TestContext::new();
    ctx.global.add_image(77);
    ctx.global.set_collection(
        Family::Faqs,
        json!([fixtures::faq(1, json!({"en": "<img src=\"/file/77\"><img src=\"/file/99\">"}))]),
    );

    let report = ctx.engine.sync_faqs().await.unwrap();
    assert_eq!((report.created, report.failed), (1, 0));

    let local = ctx.repo().all_files().unwrap()[0].id;
    assert_eq!(
        stored_content(&ctx, "faqs", 1)["en"],
        format!("<img src=\"/file/{}\"><img src=\"/file/99\">", local)
    );
}

/// Test a failed download does not fail the record.
#[tokio::test]
async fn test_download_failure_not_fatal() {
    let ctx = TestContext::new();
    ctx.global.add_image(77);
    ctx.global.add_image(78);
    ctx.global.fail_download(78);
    ctx.global
        .set_collection(Family::Faqs, json!([fixtures::faq(1, two_language_content())]));

    let report = ctx.engine.sync_faqs().await.unwrap();
    assert_eq!((report.created, report.failed), (1, 0));
    assert_eq!(ctx.rows("files"), 1);
    assert!(stored_content(&ctx, "faqs", 1)["km"].contains("/file/78"));
}

/// Test tutorials share the FAQ rewrite path under their own directory.
#[tokio::test]
async fn test_tutorial_rewrite() {
    let ctx = TestContext::new();
    ctx.global.add_image(5);
    ctx.global.set_collection(
        Family::Tutorials,
        json!([{"id": 3, "title": {"en": "Getting started"},
                "content": {"en": "<video src=\"/file/5\"></video>"}, "platform": "mobile"}]),
    );

    ctx.engine.sync_tutorials().await.unwrap();

    let file = &ctx.repo().all_files().unwrap()[0];
    assert_eq!(file.path, format!("tutorial/{}/image-5.png", file.id));
    assert_eq!(file.owner_kind.as_deref(), Some("tutorial"));
    assert_eq!(file.owner_id, Some(3));
    assert_eq!(
        stored_content(&ctx, "tutorials", 3)["en"],
        format!("<video src=\"/file/{}\"></video>", file.id)
    );
}

/// Test an assistive technology swaps its attachment without leaking the old one.
#[tokio::test]
async fn test_assistive_technology_file_swap() {
    let ctx = TestContext::new();
    ctx.global.add_image(10);
    ctx.global.add_image(11);
    ctx.global.set_collection(
        Family::AssistiveTechnologies,
        json!([{"id": 2, "code": "WC-1", "name": {"en": "Wheelchair"}, "file_id": 10}]),
    );
    ctx.engine.sync_assistive_technologies().await.unwrap();
    let first = ctx.repo().assistive_technology_file(2).unwrap().unwrap();

    // Unchanged attachment is reused
    ctx.engine.sync_assistive_technologies().await.unwrap();
    assert_eq!(ctx.repo().assistive_technology_file(2).unwrap(), Some(first));

    ctx.global.set_collection(
        Family::AssistiveTechnologies,
        json!([{"id": 2, "code": "WC-1", "name": {"en": "Wheelchair"}, "file_id": 11}]),
    );
    ctx.engine.sync_assistive_technologies().await.unwrap();

    let second = ctx.repo().assistive_technology_file(2).unwrap().unwrap();
    assert_ne!(first, second);
    assert!(ctx.repo().get_file(first).unwrap().is_none());
    assert_eq!(ctx.blob_count(), 1);

    // Clearing the attachment releases it
    ctx.global.set_collection(
        Family::AssistiveTechnologies,
        json!([{"id": 2, "code": "WC-1", "name": {"en": "Wheelchair"}, "file_id": null}]),
    );
    ctx.engine.sync_assistive_technologies().await.unwrap();
    assert_eq!(ctx.repo().assistive_technology_file(2).unwrap(), None);
    assert_eq!(ctx.rows("files"), 0);
}
