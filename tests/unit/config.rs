use super::*;

#[test]
fn empty_file_yields_defaults() {
    let cfg = Config::from_toml("").unwrap();
    assert_eq!(cfg, Config::default());
    assert_eq!(cfg.listen.port(), 80);
    assert_eq!(cfg.forward_timeout(), Duration::from_secs(5));
    assert!(cfg.max_body_bytes > 2 * 1024 * 1024);
    cfg.validate().unwrap();
}

#[test]
fn parse_full_config() {
    let cfg = Config::from_toml(
        r#"
            listen = "127.0.0.1:8080"
            image_dir = "/srv/images"
            forward_scheme = "https"
            forward_timeout_secs = 2
            matte_on_origination = true
            register_on_start = false
            max_body_bytes = 1048576

            [store]
            kind = "memory"

            [identity]
            source = "static"
            name = "us-west1-a"
            private = "10.0.0.3"
        "#,
    )
    .unwrap();

    assert_eq!(cfg.listen, "127.0.0.1:8080".parse().unwrap());
    assert_eq!(cfg.image_dir, PathBuf::from("/srv/images"));
    assert_eq!(cfg.forward_scheme, "https");
    assert_eq!(cfg.forward_timeout_secs, 2);
    assert_eq!(cfg.task_timeout_secs, 5);
    assert!(cfg.matte_on_origination);
    assert!(!cfg.register_on_start);
    assert_eq!(cfg.max_body_bytes, 1 << 20);
    assert_eq!(cfg.store.kind, StoreKind::Memory);
    assert_eq!(cfg.identity.source, IdentitySource::Static);
    assert_eq!(cfg.identity.private, "10.0.0.3");
    cfg.validate().unwrap();
}

#[test]
fn unknown_keys_are_rejected() {
    assert!(matches!(
        Config::from_toml("lisen = \"0.0.0.0:80\""),
        Err(ConfigError::Parse(_))
    ));
}

#[test]
fn env_overrides_win() {
    let mut cfg = Config::default();
    cfg.apply_env_with(|k| match k {
        ENV_LISTEN => Some("127.0.0.1:9000".to_string()),
        ENV_IMAGE_DIR => Some("/tmp/images".to_string()),
        ENV_LOG_DIR => Some(String::new()),
        _ => None,
    })
    .unwrap();

    assert_eq!(cfg.listen.port(), 9000);
    assert_eq!(cfg.image_dir, PathBuf::from("/tmp/images"));
    assert_eq!(cfg.log_dir, None);
}

#[test]
fn bad_listen_override_is_reported() {
    let mut cfg = Config::default();
    let err = cfg
        .apply_env_with(|k| (k == ENV_LISTEN).then(|| "not-an-addr".to_string()))
        .unwrap_err();
    assert!(matches!(err, ConfigError::Invalid { key: ENV_LISTEN, .. }));
}

#[test]
fn validate_rejects_bad_values() {
    let zero_forward = Config {
        forward_timeout_secs: 0,
        ..Config::default()
    };
    assert!(zero_forward.validate().is_err());

    let zero_task = Config {
        task_timeout_secs: 0,
        ..Config::default()
    };
    assert!(zero_task.validate().is_err());

    let no_scheme = Config {
        forward_scheme: " ".to_string(),
        ..Config::default()
    };
    assert!(no_scheme.validate().is_err());

    let no_body = Config {
        max_body_bytes: 0,
        ..Config::default()
    };
    let err = no_body.validate().unwrap_err();
    assert!(err.to_string().contains("max_body_bytes"));

    let nameless = Config {
        identity: IdentityConfig {
            source: IdentitySource::Static,
            ..IdentityConfig::default()
        },
        ..Config::default()
    };
    let err = nameless.validate().unwrap_err();
    assert!(err.to_string().contains("identity.name"));
}
