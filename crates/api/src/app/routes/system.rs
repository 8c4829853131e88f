use axum::{Json, extract::Extension, http::StatusCode};

use crate::app::AppServices;
use crate::app::dto::{AccountView, WhoamiResponse};
use crate::middleware::CurrentSession;

pub async fn health() -> StatusCode {
    StatusCode::OK
}

pub async fn whoami(
    Extension(services): Extension<AppServices>,
    Extension(session): Extension<CurrentSession>,
) -> Json<WhoamiResponse> {
    let account = session
        .record
        .and_then(|record| services.directory.get(record.account_id));

    Json(WhoamiResponse {
        authenticated: account.is_some(),
        account: account.as_ref().map(AccountView::from),
    })
}
