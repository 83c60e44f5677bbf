//! Hook entry points: identity resolution, sign-in sync, logout cancellation,
//! account linking and the registration gate.

mod common;

use std::{
    collections::HashMap,
    sync::atomic::{AtomicBool, Ordering},
};

use async_trait::async_trait;
use db::models::user_meta::UserMeta;
use serde_json::json;
use services::services::{
    affiliation::Viewer,
    cancellation::SessionTerminator,
    profile_sync::HookOutcome,
    settings::keys,
    user_store::{UserStoreError, attributes},
};
use url::Url;
use utils::api::hooks::RegistrationMode;
use wiremock::ResponseTemplate;

use common::*;

#[derive(Default)]
struct RecordingSession {
    ended: AtomicBool,
}

#[async_trait]
impl SessionTerminator for RecordingSession {
    async fn logout(&self) -> Result<(), UserStoreError> {
        self.ended.store(true, Ordering::SeqCst);
        Ok(())
    }
}

fn params(pairs: &[(&str, &str)]) -> HashMap<String, String> {
    pairs
        .iter()
        .map(|(key, value)| (key.to_string(), value.to_string()))
        .collect()
}

async fn mount_ann(server: &wiremock::MockServer) {
    mount_profile_json(server, json!({"DisplayName": "Ann", "AvatarVersion": "3"})).await;
    mount_avatar(
        server,
        "Ann",
        "3",
        ResponseTemplate::new(200).set_body_string("\"QUJD\""),
    )
    .await;
}

#[tokio::test]
async fn resolves_identity_by_stored_puid() {
    let (_server, sync) = setup(&[]).await;
    let user = create_user(&sync, "ann").await;
    UserMeta::set(&sync.store().pool, user.id, attributes::USER_PUID, PUID)
        .await
        .unwrap();

    let resolved = sync
        .on_resolve_identity(&format!("  {CLAIM} "))
        .await
        .unwrap()
        .expect("user should resolve");

    assert_eq!(resolved.id, user.id);
    assert_eq!(
        attribute(&sync, user.id, attributes::SSO_ALTSECID).await.as_deref(),
        Some(CLAIM)
    );
}

#[tokio::test]
async fn unknown_puids_resolve_to_nobody() {
    let (_server, sync) = setup(&[]).await;
    let user = create_user(&sync, "ann").await;

    let resolved = sync.on_resolve_identity(CLAIM).await.unwrap();

    assert!(resolved.is_none());
    assert_eq!(attribute(&sync, user.id, attributes::SSO_ALTSECID).await, None);
}

#[tokio::test]
async fn user_found_stores_the_puid_and_syncs() {
    let (server, sync) = setup(&[]).await;
    let user = create_user(&sync, "ann").await;
    mount_ann(&server).await;

    let outcome = sync.on_user_found(user.id, CLAIM, None).await.unwrap();

    assert_eq!(outcome, HookOutcome::Continue);
    assert_eq!(
        attribute(&sync, user.id, attributes::USER_PUID).await.as_deref(),
        Some(PUID)
    );
    assert_eq!(
        attribute(&sync, user.id, attributes::USER_PROFILE_AVATAR_BASE64).await.as_deref(),
        Some("QUJD")
    );
}

#[tokio::test]
async fn new_user_without_profile_is_redirected() {
    let (server, sync) = setup(&[]).await;
    let user = create_user(&sync, "ann").await;
    mount_profile(&server, ResponseTemplate::new(404)).await;
    let return_to = Url::parse("https://blogs.example.com/wp-admin/?code=abc").unwrap();

    let outcome = sync
        .on_new_user(user.id, CLAIM, Some(&return_to))
        .await
        .unwrap();

    let HookOutcome::Redirect(target) = outcome else {
        panic!("expected a redirect, got {outcome:?}");
    };
    let query: HashMap<String, String> = target.query_pairs().into_owned().collect();
    assert_eq!(
        query.get("referrer").map(String::as_str),
        Some("https://blogs.example.com/wp-admin/")
    );
    assert_eq!(
        attribute(&sync, user.id, attributes::USER_PUID).await.as_deref(),
        Some(PUID)
    );
}

#[tokio::test]
async fn sync_failures_do_not_block_sign_in() {
    let (server, sync) = setup(&[]).await;
    let user = create_user(&sync, "ann").await;
    mount_profile(&server, ResponseTemplate::new(500)).await;

    let outcome = sync.on_user_found(user.id, CLAIM, None).await.unwrap();

    assert_eq!(outcome, HookOutcome::Continue);
    assert_eq!(
        attribute(&sync, user.id, attributes::USER_PUID).await.as_deref(),
        Some(PUID)
    );
}

#[tokio::test]
async fn a_puid_stays_bound_to_its_first_owner() {
    let (server, sync) = setup(&[]).await;
    let ann = create_user(&sync, "ann").await;
    let bob = create_user(&sync, "bob").await;
    mount_profile(&server, ResponseTemplate::new(404)).await;

    sync.on_user_found(ann.id, CLAIM, None).await.unwrap();
    let requests_before = server.received_requests().await.unwrap().len();

    let outcome = sync.on_new_user(bob.id, CLAIM, None).await.unwrap();

    assert_eq!(outcome, HookOutcome::Continue);
    assert_eq!(
        attribute(&sync, ann.id, attributes::USER_PUID).await.as_deref(),
        Some(PUID)
    );
    assert_eq!(attribute(&sync, bob.id, attributes::USER_PUID).await, None);
    assert_eq!(
        server.received_requests().await.unwrap().len(),
        requests_before
    );

    let resolved = sync.on_resolve_identity(CLAIM).await.unwrap();
    assert_eq!(resolved.map(|user| user.id), Some(ann.id));
}

#[tokio::test]
async fn the_owner_of_a_puid_keeps_syncing() {
    let (server, sync) = setup(&[]).await;
    let user = create_user(&sync, "ann").await;
    UserMeta::set(&sync.store().pool, user.id, attributes::USER_PUID, PUID)
        .await
        .unwrap();
    mount_ann(&server).await;

    let outcome = sync.on_user_found(user.id, CLAIM, None).await.unwrap();

    assert_eq!(outcome, HookOutcome::Continue);
    assert_eq!(
        attribute(&sync, user.id, attributes::NICKNAME).await.as_deref(),
        Some("Ann")
    );
}

#[tokio::test]
async fn claims_without_a_puid_are_ignored() {
    let (server, sync) = setup(&[]).await;
    let user = create_user(&sync, "ann").await;

    let outcome = sync.on_user_found(user.id, "live.com:", None).await.unwrap();

    assert_eq!(outcome, HookOutcome::Continue);
    assert!(attribute_keys(&sync, user.id).await.is_empty());
    assert!(server.received_requests().await.unwrap().is_empty());
}

#[tokio::test]
async fn cancelled_profile_creation_ends_the_session() {
    let (_server, sync) = setup(&[(keys::SITE_URL, "https://blogs.example.com/")]).await;
    let session = RecordingSession::default();
    let request = params(&[
        ("action", "logout"),
        ("amp;amp;profile-cancel", "1"),
        ("amp;amp;redirect_to", "https://blogs.example.com/welcome"),
    ]);

    let target = sync.on_logout_request(&request, &session).await.unwrap();

    assert_eq!(target.as_deref(), Some("https://blogs.example.com/welcome"));
    assert!(session.ended.load(Ordering::SeqCst));
}

#[tokio::test]
async fn ordinary_logouts_are_left_alone() {
    let (_server, sync) = setup(&[]).await;
    let session = RecordingSession::default();
    let request = params(&[("action", "logout"), ("redirect_to", "/")]);

    let target = sync.on_logout_request(&request, &session).await.unwrap();

    assert_eq!(target, None);
    assert!(!session.ended.load(Ordering::SeqCst));
}

#[tokio::test]
async fn linking_moves_profile_attributes_to_the_kept_account() {
    let (_server, sync) = setup(&[]).await;
    let duplicate = create_user(&sync, "ann-work").await;
    let kept = create_user(&sync, "ann").await;
    let pool = &sync.store().pool;
    UserMeta::set(pool, duplicate.id, attributes::NICKNAME, "Ann")
        .await
        .unwrap();
    UserMeta::set(
        pool,
        duplicate.id,
        attributes::USER_PROFILE_DATA,
        r#"{"DisplayName":"Ann Lee"}"#,
    )
    .await
    .unwrap();
    UserMeta::set(pool, kept.id, attributes::USER_PUID, "kept-puid")
        .await
        .unwrap();

    let moved = sync.on_link_accounts(duplicate.id, kept.id).await.unwrap();

    assert_eq!(moved.len(), 2);
    assert_eq!(
        attribute(&sync, kept.id, attributes::NICKNAME).await.as_deref(),
        Some("Ann")
    );
    assert_eq!(
        attribute(&sync, kept.id, attributes::USER_PUID).await.as_deref(),
        Some("kept-puid")
    );
    assert!(attribute_keys(&sync, duplicate.id).await.is_empty());
    assert_eq!(
        reload_user(&sync, kept.id).await.display_name.as_deref(),
        Some("Ann Lee")
    );
}

#[tokio::test]
async fn linking_an_account_to_itself_changes_nothing() {
    let (_server, sync) = setup(&[]).await;
    let user = create_user(&sync, "ann").await;
    UserMeta::set(&sync.store().pool, user.id, attributes::NICKNAME, "Ann")
        .await
        .unwrap();

    let moved = sync.on_link_accounts(user.id, user.id).await.unwrap();

    assert!(moved.is_empty());
    assert_eq!(
        attribute(&sync, user.id, attributes::NICKNAME).await.as_deref(),
        Some("Ann")
    );
}

#[tokio::test]
async fn registration_follows_the_stored_affiliation() {
    let (_server, sync) = setup(&[(keys::AFFILIATION, "west")]).await;
    let member = create_user(&sync, "ann").await;
    let outsider = create_user(&sync, "bob").await;
    let pool = &sync.store().pool;
    UserMeta::set(
        pool,
        member.id,
        attributes::USER_PROFILE_DATA,
        r#"{"Affiliations":["west"]}"#,
    )
    .await
    .unwrap();
    UserMeta::set(pool, outsider.id, attributes::USER_PROFILE_DATA, "not json")
        .await
        .unwrap();

    let viewer = |user_id| Viewer {
        user_id,
        super_admin: false,
    };

    assert_eq!(
        sync.registration_mode(viewer(member.id)).await.unwrap(),
        RegistrationMode::Blog
    );
    assert_eq!(
        sync.registration_mode(viewer(outsider.id)).await.unwrap(),
        RegistrationMode::None
    );
    assert_eq!(
        sync.registration_mode(Viewer {
            user_id: outsider.id,
            super_admin: true,
        })
        .await
        .unwrap(),
        RegistrationMode::Blog
    );
}

#[tokio::test]
async fn registration_is_closed_without_a_configured_affiliation() {
    let (_server, sync) = setup(&[]).await;
    let user = create_user(&sync, "ann").await;
    UserMeta::set(
        &sync.store().pool,
        user.id,
        attributes::USER_PROFILE_DATA,
        r#"{"Affiliations":"west"}"#,
    )
    .await
    .unwrap();

    let mode = sync
        .registration_mode(Viewer {
            user_id: user.id,
            super_admin: false,
        })
        .await
        .unwrap();

    assert_eq!(mode, RegistrationMode::None);
}
