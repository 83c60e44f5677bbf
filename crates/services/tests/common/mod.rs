//! Shared fixtures for the profile sync integration tests.

#![allow(dead_code)]

use std::{collections::HashMap, sync::Arc};

use db::{
    DBService,
    models::{user::User, user_meta::UserMeta},
};
use serde_json::Value;
use services::services::{
    profile_sync::ProfileSync,
    settings::{ProfileSettings, keys},
};
use wiremock::matchers::{header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

pub const APPLICATION_KEY: &str = "test-application-key";
pub const PUID: &str = "0003BFFD8A5C4F27";
pub const CLAIM: &str = "live.com:0003BFFD8A5C4F27";

pub fn settings(server: &MockServer, extra: &[(&str, &str)]) -> Arc<ProfileSettings> {
    let mut values: HashMap<String, String> = [
        (keys::PROFILE_API_ENDPOINT, format!("{}/profile/", server.uri())),
        (keys::PROFILE_AVATAR_API_ENDPOINT, format!("{}/avatar", server.uri())),
        (keys::CREATE_PROFILE_ENDPOINT, format!("{}/create", server.uri())),
        (keys::PROFILE_API_REQUEST_HEADER, APPLICATION_KEY.to_string()),
    ]
    .into_iter()
    .map(|(key, value)| (key.to_string(), value))
    .collect();

    for (key, value) in extra {
        values.insert(key.to_string(), value.to_string());
    }

    Arc::new(ProfileSettings::load(&values).expect("valid test settings"))
}

pub async fn setup(extra: &[(&str, &str)]) -> (MockServer, ProfileSync<DBService>) {
    let server = MockServer::start().await;
    let db = DBService::new_in_memory().await.expect("in-memory database");
    let sync = ProfileSync::new(settings(&server, extra), db).expect("profile client");
    (server, sync)
}

pub async fn create_user(sync: &ProfileSync<DBService>, login: &str) -> User {
    User::create(&sync.store().pool, login, "subscriber")
        .await
        .expect("create user")
}

pub async fn reload_user(sync: &ProfileSync<DBService>, user_id: i64) -> User {
    User::find_by_id(&sync.store().pool, user_id)
        .await
        .expect("load user")
        .expect("user exists")
}

pub async fn attribute(sync: &ProfileSync<DBService>, user_id: i64, key: &str) -> Option<String> {
    UserMeta::get(&sync.store().pool, user_id, key)
        .await
        .expect("read attribute")
}

pub async fn attribute_keys(sync: &ProfileSync<DBService>, user_id: i64) -> Vec<String> {
    UserMeta::find_by_user(&sync.store().pool, user_id)
        .await
        .expect("read attributes")
        .into_iter()
        .map(|meta| meta.meta_key)
        .collect()
}

/// Profile lookup for [`PUID`]; only matches when both required headers are sent.
pub async fn mount_profile(server: &MockServer, response: ResponseTemplate) {
    Mock::given(method("GET"))
        .and(path(format!("/profile/puid:{PUID}")))
        .and(header("x-ms-applicationKey", APPLICATION_KEY))
        .and(header("accept", "application/json"))
        .respond_with(response)
        .mount(server)
        .await;
}

pub async fn mount_profile_json(server: &MockServer, body: Value) {
    mount_profile(server, ResponseTemplate::new(200).set_body_json(body)).await;
}

pub async fn mount_avatar(server: &MockServer, display_name: &str, version: &str, response: ResponseTemplate) {
    Mock::given(method("GET"))
        .and(path("/avatar"))
        .and(query_param("displayname", display_name))
        .and(query_param("size", "extralarge"))
        .and(query_param("version", version))
        .and(header("x-ms-applicationKey", APPLICATION_KEY))
        .and(header("accept", "application/json"))
        .respond_with(response)
        .mount(server)
        .await;
}

/// Fails the test on drop if the avatar endpoint is hit at all.
pub async fn forbid_avatar(server: &MockServer) {
    Mock::given(method("GET"))
        .and(path("/avatar"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(server)
        .await;
}
