use axum::{
    extract::Extension,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use axum_extra::extract::cookie::CookieJar;

use smbridge_auth::{APPLICATION_ROOT, LocalSession, RequestOrigin};
use smbridge_infra::SessionHandle;

use crate::app::{AppServices, errors};
use crate::context::{expired_cookie, session_cookie};
use crate::middleware::apply_session_change;

/// Authentication entrypoint. The bridge has already run, and whether it
/// logged anyone in or not the flow ends at the application root; failures
/// travel as notice headers.
pub async fn login() -> Response {
    errors::redirect(APPLICATION_ROOT)
}

/// Ends the local session, expires the SSO cookie and hands off to the
/// configured logout URL.
pub async fn logout(
    Extension(services): Extension<AppServices>,
    Extension(origin): Extension<RequestOrigin>,
    jar: CookieJar,
) -> Response {
    let mut session = SessionHandle::load(services.sessions.clone(), session_cookie(&jar));
    session.destroy();

    let mut jar = apply_session_change(jar, session.change());
    if let Some(name) = services.settings.siteminder_cookie() {
        jar = jar.add(expired_cookie(name));
    }

    let response = match services.bridge.logout(&origin) {
        Some(target) => errors::redirect(target.location()),
        None => StatusCode::NO_CONTENT.into_response(),
    };
    tracing::info!(origin = %origin.application_url(), "local session ended");
    (jar, response).into_response()
}
