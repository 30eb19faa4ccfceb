#![allow(clippy::unwrap_used)]
#![allow(clippy::expect_used)]
#![allow(clippy::panic)]

use hubwire_gateway::config;

#[test]
fn deny_unknown_fields_nested() {
    let bad = r#"
version: 1
gateway:
  listen: "0.0.0.0:8080"
  pingz_interval_ms: 1000 # typo should fail
"#;

    let err = config::load_from_str(bad).expect_err("must fail");
    assert_eq!(err.client_code().as_str(), "PROTOCOL_ERROR");
}

#[test]
fn ok_minimal_config() {
    let cfg = config::load_from_str("version: 1\n").expect("must parse");
    assert_eq!(cfg.version, 1);
    assert_eq!(cfg.gateway.path, "/v1/ws");
    assert_eq!(cfg.gateway.token_param, "auth_token");
    assert_eq!(cfg.gateway.outbound_queue, 1024);
    assert!(cfg.auth.tokens.is_empty());
}

#[test]
fn token_table_parses_identity_claims() {
    let ok = r#"
version: 1
auth:
  tokens:
    dev:
      sub: "user:dev"
      roles: ["user", "admin"]
"#;
    let cfg = config::load_from_str(ok).expect("must parse");
    let claims = &cfg.auth.tokens["dev"];
    assert_eq!(claims["sub"], "user:dev");
    assert_eq!(claims["roles"][1], "admin");
}

#[test]
fn rejects_bad_versions_and_ranges() {
    assert!(config::load_from_str("version: 2\n").is_err());

    let bad_idle = r#"
version: 1
gateway:
  ping_interval_ms: 30000
  idle_timeout_ms: 20000
"#;
    assert!(config::load_from_str(bad_idle).is_err());

    let bad_claims = r#"
version: 1
auth:
  tokens:
    dev: "not-a-map"
"#;
    assert!(config::load_from_str(bad_claims).is_err());
}
