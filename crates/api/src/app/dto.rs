use serde::Serialize;

use smbridge_auth::LocalAccount;

/// Body of `GET /`.
#[derive(Debug, Serialize)]
pub struct WhoamiResponse {
    pub authenticated: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub account: Option<AccountView>,
}

#[derive(Debug, Serialize)]
pub struct AccountView {
    pub id: String,
    pub username: String,
    pub email: Option<String>,
    pub roles: Vec<String>,
    pub authname: Option<String>,
}

impl From<&LocalAccount> for AccountView {
    fn from(account: &LocalAccount) -> Self {
        Self {
            id: account.id.to_string(),
            username: account.username.clone(),
            email: account.email.clone(),
            roles: account.roles.iter().map(|r| r.as_str().to_string()).collect(),
            authname: account.external_link.as_ref().map(|l| l.authname.clone()),
        }
    }
}
