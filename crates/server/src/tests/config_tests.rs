use super::*;

use std::collections::HashMap;

fn env_of(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
    let vars: HashMap<String, String> = pairs
        .iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect();
    move |key: &str| vars.get(key).cloned()
}

#[test]
fn defaults_match_the_client_endpoint() {
    let settings = settings_from(None, env_of(&[]));
    assert_eq!(settings, Settings::default());
    assert_eq!(settings.server_bind, "127.0.0.1:8000");
}

#[test]
fn file_values_override_defaults() {
    let settings = settings_from(
        Some("bind_addr = \"0.0.0.0:5002\"\nbody_limit_bytes = 1024\n"),
        env_of(&[]),
    );
    assert_eq!(settings.server_bind, "0.0.0.0:5002");
    assert_eq!(settings.body_limit_bytes, 1024);
}

#[test]
fn environment_overrides_file() {
    let settings = settings_from(
        Some("bind_addr = \"0.0.0.0:5002\""),
        env_of(&[("SERVER_BIND", "127.0.0.1:9000"), ("APP__BODY_LIMIT_BYTES", "2048")]),
    );
    assert_eq!(settings.server_bind, "127.0.0.1:9000");
    assert_eq!(settings.body_limit_bytes, 2048);
}

#[test]
fn app_prefixed_bind_wins_over_plain_variable() {
    let settings = settings_from(
        None,
        env_of(&[("SERVER_BIND", "127.0.0.1:9000"), ("APP__BIND_ADDR", "127.0.0.1:9100")]),
    );
    assert_eq!(settings.server_bind, "127.0.0.1:9100");
}

#[test]
fn unreadable_file_and_bad_numbers_are_ignored() {
    let settings = settings_from(
        Some("bind_addr = [1, 2"),
        env_of(&[("APP__BODY_LIMIT_BYTES", "lots")]),
    );
    assert_eq!(settings, Settings::default());
}
