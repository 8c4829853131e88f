//! Request-scoped values derived from HTTP headers.
//!
//! Everything here trusts the headers as delivered: the reverse proxy is
//! expected to strip client-supplied identity headers before forwarding.

use std::collections::BTreeMap;

use axum::http::{HeaderMap, header};
use axum_extra::extract::cookie::{Cookie, CookieJar, SameSite};

use smbridge_auth::{AttributeValue, RequestContext, RequestOrigin, Settings};
use smbridge_core::SessionId;

/// Cookie carrying the local session id.
pub const SESSION_COOKIE: &str = "smbridge_session";

/// Context key for a header: `sm-user` becomes `HTTP_SM_USER`.
pub fn context_key(header_name: &str) -> String {
    format!("HTTP_{}", header_name.to_ascii_uppercase().replace('-', "_"))
}

/// Build the trusted attribute context from request headers.
///
/// A header sent once is scalar; a repeated header is multi-valued. The
/// configured prefix/domain stripping is applied to the authname attribute.
pub fn request_context(headers: &HeaderMap, settings: &Settings) -> RequestContext {
    let mut grouped: BTreeMap<String, Vec<String>> = BTreeMap::new();
    for (name, value) in headers.iter() {
        // Proxies forward UTF-8 attribute values; `to_str` would reject them.
        let Ok(value) = std::str::from_utf8(value.as_bytes()) else {
            tracing::warn!(header = %name, "dropping header that is not valid UTF-8");
            continue;
        };
        grouped
            .entry(context_key(name.as_str()))
            .or_default()
            .push(value.to_string());
    }

    let mut ctx: RequestContext = grouped
        .into_iter()
        .map(|(key, mut values)| {
            let value = if values.len() == 1 {
                AttributeValue::Single(values.remove(0))
            } else {
                AttributeValue::Multi(values)
            };
            (key, value)
        })
        .collect();

    if let Some(key) = settings.username_mapping() {
        if let Some(value) = ctx.get_mut(key) {
            strip_authname(value, settings);
        }
    }
    ctx
}

fn strip_authname(value: &mut AttributeValue, settings: &Settings) {
    match value {
        AttributeValue::Single(v) => *v = settings.normalize_authname(v).to_string(),
        AttributeValue::Multi(vs) => {
            for v in vs.iter_mut() {
                *v = settings.normalize_authname(v).to_string();
            }
        }
    }
}

pub fn request_origin(headers: &HeaderMap) -> RequestOrigin {
    let scheme = headers
        .get("x-forwarded-proto")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.split(',').next())
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .unwrap_or("http");
    let host = headers
        .get(header::HOST)
        .and_then(|v| v.to_str().ok())
        .unwrap_or("localhost");
    RequestOrigin::new(scheme, host)
}

/// The local session id named by the request's cookies.
pub fn session_cookie(jar: &CookieJar) -> Option<SessionId> {
    jar.get(SESSION_COOKIE)?.value().parse().ok()
}

/// Cookie issuing the local session.
pub fn session_set_cookie(id: SessionId) -> Cookie<'static> {
    Cookie::build((SESSION_COOKIE, id.to_string()))
        .path("/")
        .http_only(true)
        .same_site(SameSite::Lax)
        .build()
}

/// Cookie that makes the client drop cookie `name`.
pub fn expired_cookie(name: &str) -> Cookie<'static> {
    let mut cookie = Cookie::build((name.to_owned(), "")).path("/").build();
    cookie.make_removal();
    cookie
}
