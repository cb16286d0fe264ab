//! Session environment construction.
//!
//! Every shell spawned by the session manager carries the control-plane URL
//! so tools running inside it can call back into `/review`.

use std::collections::HashMap;

/// Name of the variable that carries the control-plane URL into sessions.
pub const URL_ENV_VAR: &str = "HEGEL_IDE_URL";

/// Loopback URL for a control-plane port.
pub fn control_plane_url(port: u16) -> String {
    format!("http://localhost:{port}")
}

/// Return a copy of `base` with [`URL_ENV_VAR`] set to the control-plane URL.
///
/// `base` is left untouched. An existing `HEGEL_IDE_URL` in `base` is
/// overwritten in the result.
pub fn build_env(base: &HashMap<String, String>, port: u16) -> HashMap<String, String> {
    let mut env = base.clone();
    env.insert(URL_ENV_VAR.to_string(), control_plane_url(port));
    env
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_base_yields_single_key() {
        let env = build_env(&HashMap::new(), 4000);
        assert_eq!(env.len(), 1);
        assert_eq!(env[URL_ENV_VAR], "http://localhost:4000");
    }

    #[test]
    fn test_base_is_preserved_and_unmodified() {
        let mut base = HashMap::new();
        base.insert("PATH".to_string(), "/usr/bin:/bin".to_string());
        base.insert("HOME".to_string(), "/home/test".to_string());
        let snapshot = base.clone();

        let env = build_env(&base, 51234);

        assert_eq!(base, snapshot);
        assert_eq!(env.len(), 3);
        assert_eq!(env["PATH"], "/usr/bin:/bin");
        assert_eq!(env["HOME"], "/home/test");
        assert_eq!(env[URL_ENV_VAR], "http://localhost:51234");
    }

    #[test]
    fn test_port_zero_is_not_special_cased() {
        let env = build_env(&HashMap::new(), 0);
        assert_eq!(env[URL_ENV_VAR], "http://localhost:0");
    }

    #[test]
    fn test_existing_url_is_replaced() {
        let mut base = HashMap::new();
        base.insert(URL_ENV_VAR.to_string(), "http://localhost:1".to_string());
        let env = build_env(&base, 2);
        assert_eq!(env[URL_ENV_VAR], "http://localhost:2");
        assert_eq!(base[URL_ENV_VAR], "http://localhost:1");
    }
}
