//! One-shot status messages carried across a redirect in a cookie.

use axum_extra::extract::cookie::{Cookie, CookieJar};
use serde::Serialize;

const COOKIE_NAME: &str = "rollcall_flash";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Level {
    Success,
    Error,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Flash {
    pub level: Level,
    pub message: String,
}

impl Flash {
    pub fn success(message: impl Into<String>) -> Self {
        Self {
            level: Level::Success,
            message: message.into(),
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self {
            level: Level::Error,
            message: message.into(),
        }
    }

    fn encode(&self) -> String {
        let level = match self.level {
            Level::Success => "success",
            Level::Error => "error",
        };
        format!("{}:{}", level, urlencoding::encode(&self.message))
    }

    fn decode(raw: &str) -> Option<Self> {
        let (level, message) = raw.split_once(':')?;
        let level = match level {
            "success" => Level::Success,
            "error" => Level::Error,
            _ => return None,
        };
        let message = urlencoding::decode(message).ok()?.into_owned();
        Some(Self { level, message })
    }
}

/// Queues `flash` for the next page the browser renders.
pub fn set(jar: CookieJar, flash: Flash) -> CookieJar {
    jar.add(
        Cookie::build((COOKIE_NAME, flash.encode()))
            .path("/")
            .http_only(true),
    )
}

/// Pops the pending message, if there is one, and clears the cookie.
pub fn take(jar: CookieJar) -> (CookieJar, Option<Flash>) {
    let flash = jar
        .get(COOKIE_NAME)
        .and_then(|cookie| Flash::decode(cookie.value()));

    match flash {
        Some(flash) => (jar.remove(Cookie::build(COOKIE_NAME).path("/")), Some(flash)),
        None => (jar, None),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn messages_survive_the_cookie() {
        let flash = Flash::error("Excel file must contain columns: Student Name; 100% sure");
        assert_eq!(Flash::decode(&flash.encode()), Some(flash));
    }

    #[test]
    fn garbage_cookies_are_ignored() {
        assert_eq!(Flash::decode("nonsense"), None);
        assert_eq!(Flash::decode("warning:hello"), None);
    }

    #[test]
    fn take_clears_what_set_stored() {
        let jar = set(CookieJar::new(), Flash::success("Successfully imported 3 students"));
        let (_, flash) = take(jar);
        assert_eq!(flash, Some(Flash::success("Successfully imported 3 students")));

        let (_, flash) = take(CookieJar::new());
        assert_eq!(flash, None);
    }
}
