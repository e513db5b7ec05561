use crate::dictionary::Dictionary;
use crate::http::Cookie;
use rayon::ThreadPool;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LoginEvent {
    /// Carries the accepted cookie as JSON
    Success(String),
    Failed,
}

/// Check a session cookie against the dictionary on the pool
pub fn check_login<F>(pool: &ThreadPool, dict: &dyn Dictionary, cookie: &Cookie, on_event: F) -> bool
where
    F: Fn(LoginEvent) + Sync,
{
    let valid = pool.install(|| match dict.check_cookie(cookie) {
        Ok(valid) => valid,
        Err(e) => {
            log::error!("Login check with {} failed: {}", dict.name(), e);
            false
        }
    });

    if valid {
        let json = serde_json::to_string(cookie).unwrap_or_default();
        on_event(LoginEvent::Success(json));
    } else {
        on_event(LoginEvent::Failed);
    }
    valid
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::workers::fetch::tests::FakeDictionary;
    use crate::workers::build_pool;
    use std::sync::Mutex;

    #[test]
    fn test_login_events() {
        let pool = build_pool("test", 1).unwrap();
        let dict = FakeDictionary::new(vec![]);
        let events = Mutex::new(Vec::new());

        let mut cookie = Cookie::new();
        assert!(!check_login(&pool, &dict, &cookie, |e| events.lock().unwrap().push(e)));

        cookie.insert("session".to_string(), "ok".to_string());
        assert!(check_login(&pool, &dict, &cookie, |e| events.lock().unwrap().push(e)));

        assert_eq!(
            events.into_inner().unwrap(),
            vec![
                LoginEvent::Failed,
                LoginEvent::Success(r#"{"session":"ok"}"#.to_string()),
            ]
        );
    }
}
