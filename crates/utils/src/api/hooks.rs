use serde::{Deserialize, Serialize};

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct SignInRequest {
    pub altsecid: String,
    pub login: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub return_to: Option<String>,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct SignInResponse {
    pub user_id: i64,
    pub new_user: bool,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct UserHookRequest {
    pub user_id: i64,
    pub altsecid: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub return_to: Option<String>,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct ResolveIdentityRequest {
    pub altsecid: String,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct ResolveIdentityResponse {
    pub user_id: Option<i64>,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct LinkAccountsRequest {
    pub user_to_link: i64,
    pub user_to_keep: i64,
}

#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum RegistrationMode {
    Blog,
    None,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct RegistrationResponse {
    pub user_id: i64,
    pub registration: RegistrationMode,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct SettingsField {
    pub id: String,
    pub label: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}
