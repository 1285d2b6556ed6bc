#![allow(clippy::unwrap_used, clippy::expect_used)]
//! Integration tests for the content editor and content deletion.

mod common;

use axum::http::StatusCode;
use common::{TestApp, body_string, form_token, short_id, skip_without_database};
use corso::models::{Content, ContentItem, ItemKind, Module};

#[tokio::test]
async fn creating_content_links_item_and_redirects() {
    if skip_without_database("creating_content_links_item_and_redirects") {
        return;
    }
    let app = TestApp::new().await;

    let (user_id, cookies) = app
        .create_and_login_instructor(&format!("cc-{}", short_id()))
        .await;
    let subject = app.create_subject("Content").await;
    let course = app.create_course(user_id, subject.id, "Writing").await;
    let module = Module::create(&app.db, course.id, "Intro", "").await.unwrap();

    let path = format!("/module/{}/content/text/create/", module.id);
    let token = form_token(&app, &path, &cookies).await;

    let response = app
        .post_form(
            &path,
            format!("_token={token}&title=Welcome&payload=Hello+class"),
            &cookies,
        )
        .await;

    // Creation redirects to the module content list
    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert_eq!(
        response.headers().get("location").unwrap(),
        &format!("/module/{}/content/", module.id)
    );

    let contents = Content::list_by_module(&app.db, module.id).await.unwrap();
    assert_eq!(contents.len(), 1);
    assert_eq!(contents[0].title, "Welcome");
    assert_eq!(contents[0].kind, ItemKind::Text);
    assert_eq!(contents[0].position, 0);

    // The item was stamped with the acting user as owner
    let item = ContentItem::find_by_id(&app.db, contents[0].item_id)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(item.owner_id, user_id);
}

#[tokio::test]
async fn editing_content_saves_but_rerenders_in_place() {
    if skip_without_database("editing_content_saves_but_rerenders_in_place") {
        return;
    }
    let app = TestApp::new().await;

    let (user_id, cookies) = app
        .create_and_login_instructor(&format!("ce-{}", short_id()))
        .await;
    let subject = app.create_subject("Edits").await;
    let course = app.create_course(user_id, subject.id, "Revisions").await;
    let module = Module::create(&app.db, course.id, "Draft", "").await.unwrap();

    let item = ContentItem::create(&app.db, user_id, ItemKind::Video, "Old title", "http://v")
        .await
        .unwrap();
    Content::create(&app.db, module.id, item.id).await.unwrap();

    let path = format!("/module/{}/content/video/{}/", module.id, item.id);
    let token = form_token(&app, &path, &cookies).await;

    let response = app
        .post_form(
            &path,
            format!("_token={token}&title=New+title&payload=http%3A%2F%2Fv2"),
            &cookies,
        )
        .await;

    // Unlike creation, editing re-renders the form instead of redirecting
    assert_eq!(response.status(), StatusCode::OK);
    let html = body_string(response).await;
    assert!(html.contains("New title"));

    let updated = ContentItem::find_by_id(&app.db, item.id).await.unwrap().unwrap();
    assert_eq!(updated.title, "New title");
    assert_eq!(updated.payload, "http://v2");
}

#[tokio::test]
async fn unknown_kind_fails_before_persistence() {
    if skip_without_database("unknown_kind_fails_before_persistence") {
        return;
    }
    let app = TestApp::new().await;

    let (user_id, cookies) = app
        .create_and_login_instructor(&format!("uk-{}", short_id()))
        .await;
    let subject = app.create_subject("Kinds").await;
    let course = app.create_course(user_id, subject.id, "Strict kinds").await;
    let module = Module::create(&app.db, course.id, "Only four", "").await.unwrap();

    let response = app
        .get(
            &format!("/module/{}/content/audio/create/", module.id),
            &cookies,
        )
        .await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn content_positions_increment_per_module() {
    if skip_without_database("content_positions_increment_per_module") {
        return;
    }
    let app = TestApp::new().await;

    let (user_id, _) = app
        .create_and_login_instructor(&format!("cp-{}", short_id()))
        .await;
    let subject = app.create_subject("Positions").await;
    let course = app.create_course(user_id, subject.id, "Ordered").await;
    let module_a = Module::create(&app.db, course.id, "A", "").await.unwrap();
    let module_b = Module::create(&app.db, course.id, "B", "").await.unwrap();

    let first = ContentItem::create(&app.db, user_id, ItemKind::Text, "1", "x").await.unwrap();
    let second = ContentItem::create(&app.db, user_id, ItemKind::Text, "2", "x").await.unwrap();
    let third = ContentItem::create(&app.db, user_id, ItemKind::Text, "3", "x").await.unwrap();

    let link_one = Content::create(&app.db, module_a.id, first.id).await.unwrap();
    let link_two = Content::create(&app.db, module_a.id, second.id).await.unwrap();
    assert_eq!(link_one.position, 0);
    assert_eq!(link_two.position, 1);

    // Independent of the other module's ordering
    let link_other = Content::create(&app.db, module_b.id, third.id).await.unwrap();
    assert_eq!(link_other.position, 0);
}

#[tokio::test]
async fn deleting_content_removes_item_then_link() {
    if skip_without_database("deleting_content_removes_item_then_link") {
        return;
    }
    let app = TestApp::new().await;

    let (user_id, cookies) = app
        .create_and_login_instructor(&format!("cd-{}", short_id()))
        .await;
    let subject = app.create_subject("Deletions").await;
    let course = app.create_course(user_id, subject.id, "Cleanup").await;
    let module = Module::create(&app.db, course.id, "Old", "").await.unwrap();

    let item = ContentItem::create(&app.db, user_id, ItemKind::File, "Syllabus", "s.pdf")
        .await
        .unwrap();
    let content = Content::create(&app.db, module.id, item.id).await.unwrap();

    // No confirmation step: a single POST from the content list deletes
    let token = form_token(&app, &format!("/module/{}/content/", module.id), &cookies).await;
    let response = app
        .post_form(
            &format!("/content/{}/delete/", content.id),
            format!("_token={token}"),
            &cookies,
        )
        .await;
    assert_eq!(response.status(), StatusCode::SEE_OTHER);

    // The linked item is gone along with the link row
    assert!(ContentItem::find_by_id(&app.db, item.id).await.unwrap().is_none());
    assert!(Content::list_by_module(&app.db, module.id).await.unwrap().is_empty());
}

#[tokio::test]
async fn foreign_content_delete_is_not_found() {
    if skip_without_database("foreign_content_delete_is_not_found") {
        return;
    }
    let app = TestApp::new().await;

    let (owner_id, _) = app
        .create_and_login_instructor(&format!("own-{}", short_id()))
        .await;
    let (_, intruder_cookies) = app
        .create_and_login_instructor(&format!("int-{}", short_id()))
        .await;

    let subject = app.create_subject("Joins").await;
    let course = app.create_course(owner_id, subject.id, "Guarded").await;
    let module = Module::create(&app.db, course.id, "M", "").await.unwrap();
    let item = ContentItem::create(&app.db, owner_id, ItemKind::Text, "T", "x").await.unwrap();
    let content = Content::create(&app.db, module.id, item.id).await.unwrap();

    let token = form_token(&app, "/course/create/", &intruder_cookies).await;
    let response = app
        .post_form(
            &format!("/content/{}/delete/", content.id),
            format!("_token={token}"),
            &intruder_cookies,
        )
        .await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);

    // Nothing was deleted through the failed attempt
    assert!(ContentItem::find_by_id(&app.db, item.id).await.unwrap().is_some());
}
