use std::sync::Arc;

use axum::{
    extract::{Extension, State},
    middleware::Next,
    response::{IntoResponse, Response},
};
use axum_extra::extract::cookie::CookieJar;

use smbridge_auth::{BridgeDecision, RequestContext, Settings};
use smbridge_infra::{SessionChange, SessionHandle, SessionRecord};

use crate::app::{AppServices, errors};
use crate::context::{
    SESSION_COOKIE, expired_cookie, request_context, request_origin, session_cookie,
    session_set_cookie,
};

/// Derives the trusted [`smbridge_auth::RequestContext`] and the request origin
/// from the incoming headers and stores them as request extensions.
pub async fn identity_middleware(
    State(settings): State<Arc<Settings>>,
    mut req: axum::http::Request<axum::body::Body>,
    next: Next,
) -> Response {
    let ctx = request_context(req.headers(), &settings);
    let origin = request_origin(req.headers());

    tracing::debug!(
        method = %req.method(),
        path = %req.uri().path(),
        attributes = ctx.len(),
        "identity context attached"
    );

    req.extensions_mut().insert(ctx);
    req.extensions_mut().insert(origin);

    next.run(req).await
}

/// Local session as it stands after the bridge ran for this request.
#[derive(Debug, Clone, Default)]
pub struct CurrentSession {
    pub record: Option<SessionRecord>,
}

/// Reconciles the local session with the asserted identity before the handler runs.
///
/// A mismatch destroys the session and redirects to the authentication
/// entrypoint without reaching the handler.
pub async fn bridge_middleware(
    Extension(services): Extension<AppServices>,
    Extension(ctx): Extension<RequestContext>,
    jar: CookieJar,
    mut req: axum::http::Request<axum::body::Body>,
    next: Next,
) -> Response {
    let mut session = SessionHandle::load(services.sessions.clone(), session_cookie(&jar));
    let outcome = services.bridge.authenticate(&ctx, &mut session);
    let change = session.change();

    let mut response = if outcome.decision == BridgeDecision::SessionMismatch {
        errors::redirect(outcome.redirect.location())
    } else {
        req.extensions_mut().insert(CurrentSession {
            record: session.record().cloned(),
        });
        next.run(req).await
    };

    errors::append_notices(&mut response, &outcome.notices);
    (apply_session_change(jar, change), response).into_response()
}

/// Add the cookie matching what happened to the session.
pub fn apply_session_change(jar: CookieJar, change: SessionChange) -> CookieJar {
    match change {
        SessionChange::Unchanged => jar,
        SessionChange::Established(id) => jar.add(session_set_cookie(id)),
        SessionChange::Destroyed => jar.add(expired_cookie(SESSION_COOKIE)),
    }
}
