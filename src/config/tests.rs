use super::*;

#[test]
fn cli_overrides_take_highest_precedence() {
    let mut raw = RawSettings::default();
    raw.server.public_port = Some(4000);
    raw.logging.level = Some("info".to_string());
    raw.cms.base_url = Some("http://cms.internal:1337".to_string());

    let overrides = ServeOverrides {
        public_port: Some(4321),
        log_level: Some("debug".to_string()),
        cms: CmsOverrides {
            cms_base_url: Some("https://cms.example.com".to_string()),
            ..Default::default()
        },
        ..Default::default()
    };

    raw.apply_serve_overrides(&overrides);
    let settings = Settings::from_raw(raw).expect("valid settings");

    assert_eq!(settings.server.public_addr.port(), 4321);
    assert_eq!(settings.logging.level, LevelFilter::DEBUG);
    assert_eq!(settings.cms.base_url.as_str(), "https://cms.example.com/");
}

#[test]
fn defaults_are_applied() {
    let settings = Settings::from_raw(RawSettings::default()).expect("valid settings");

    assert_eq!(settings.server.public_addr.port(), DEFAULT_PUBLIC_PORT);
    assert_eq!(settings.server.admin_addr.port(), DEFAULT_ADMIN_PORT);
    assert_eq!(settings.cms.base_url.as_str(), "http://127.0.0.1:1337/");
    assert_eq!(settings.cms.request_timeout, Duration::from_secs(10));
    assert_eq!(settings.cms.probe_path, "/_health");
    assert_eq!(settings.cms.probe_timeout, Duration::from_secs(2));
    assert!(settings.cms.read_api_key.is_empty());
    assert_eq!(settings.health.ttl, Duration::from_secs(5));
    assert_eq!(settings.health.probe_interval, Duration::from_secs(15));
    assert!(!settings.maintenance.enabled);
    assert_eq!(
        settings.maintenance.excluded_prefixes.len(),
        DEFAULT_EXCLUDED_PREFIXES.len()
    );
    assert_eq!(settings.cache.max_entries, 1000);
    assert_eq!(settings.cache.sweep_interval, Duration::from_secs(60));
    assert!(matches!(settings.logging.format, LogFormat::Compact));
}

#[test]
fn cli_json_logging_enforces_format() {
    let mut raw = RawSettings::default();
    let overrides = ServeOverrides {
        log_json: Some(true),
        ..Default::default()
    };

    raw.apply_serve_overrides(&overrides);
    let settings = Settings::from_raw(raw).expect("valid settings");

    assert!(matches!(settings.logging.format, LogFormat::Json));
}

#[test]
fn maintenance_flag_seeds_switch() {
    let mut raw = RawSettings::default();
    raw.apply_serve_overrides(&ServeOverrides {
        maintenance: Some(true),
        ..Default::default()
    });

    let settings = Settings::from_raw(raw).expect("valid settings");
    assert!(settings.maintenance.enabled);
}

#[test]
fn api_keys_are_trimmed_and_redacted() {
    let mut raw = RawSettings::default();
    raw.cms.read_api_key = Some("  read-token \n".to_string());
    raw.cms.write_api_key = Some("write-token".to_string());

    let settings = Settings::from_raw(raw).expect("valid settings");
    assert_eq!(settings.cms.read_api_key, "read-token");

    let debug = format!("{:?}", settings.cms);
    assert!(!debug.contains("read-token"));
    assert!(!debug.contains("write-token"));
    assert!(debug.contains("<redacted>"));
}

#[test]
fn rejects_non_http_base_url() {
    let mut raw = RawSettings::default();
    raw.cms.base_url = Some("ftp://cms.example.com".to_string());

    let err = Settings::from_raw(raw).expect_err("ftp scheme should be rejected");
    assert!(matches!(err, LoadError::Invalid { key: "cms.base_url", .. }));
}

#[test]
fn rejects_unparseable_base_url() {
    let mut raw = RawSettings::default();
    raw.cms.base_url = Some("not a url".to_string());

    assert!(Settings::from_raw(raw).is_err());
}

#[test]
fn rejects_zero_request_timeout() {
    let mut raw = RawSettings::default();
    raw.cms.request_timeout_seconds = Some(0);

    let err = Settings::from_raw(raw).expect_err("zero timeout should be rejected");
    assert!(matches!(
        err,
        LoadError::Invalid {
            key: "cms.request_timeout_seconds",
            ..
        }
    ));
}

#[test]
fn rejects_zero_health_ttl() {
    let mut raw = RawSettings::default();
    raw.health.ttl_seconds = Some(0);

    let err = Settings::from_raw(raw).expect_err("zero ttl would probe on every request");
    assert!(matches!(
        err,
        LoadError::Invalid {
            key: "health.ttl_seconds",
            ..
        }
    ));
}

#[test]
fn rejects_shared_listener_address() {
    let mut raw = RawSettings::default();
    raw.server.public_port = Some(8080);
    raw.server.admin_port = Some(8080);

    assert!(Settings::from_raw(raw).is_err());
}

#[test]
fn rejects_relative_exclusion_prefix() {
    let mut raw = RawSettings::default();
    raw.maintenance.excluded_prefixes = Some(vec!["/static".to_string(), "assets".to_string()]);

    let err = Settings::from_raw(raw).expect_err("relative prefix should be rejected");
    assert!(err.to_string().contains("assets"));
}

#[test]
fn default_to_serve_command() {
    let args = CliArgs::parse_from(["vitrine"]);
    let command = args
        .command
        .unwrap_or(Command::Serve(Box::<ServeArgs>::default()));
    assert!(matches!(command, Command::Serve(_)));
}

#[test]
fn parse_serve_arguments() {
    let args = CliArgs::parse_from([
        "vitrine",
        "serve",
        "--server-public-port",
        "8000",
        "--maintenance",
        "yes",
        "--cms-base-url",
        "http://cms:1337",
        "--cache-max-entries",
        "50",
    ]);

    match args.command.expect("serve command") {
        Command::Serve(args) => {
            let overrides = args.overrides;
            assert_eq!(overrides.public_port, Some(8000));
            assert_eq!(overrides.maintenance, Some(true));
            assert_eq!(overrides.cms.cms_base_url.as_deref(), Some("http://cms:1337"));
            assert_eq!(overrides.cache_max_entries, Some(50));
        }
        other => panic!("unexpected command: {other:?}"),
    }
}

#[test]
fn parse_probe_arguments() {
    let args = CliArgs::parse_from([
        "vitrine",
        "probe",
        "--cms-probe-path",
        "/api/health",
        "--cms-request-timeout-seconds",
        "3",
    ]);

    match args.command.expect("probe command") {
        Command::Probe(args) => {
            assert_eq!(args.cms.cms_probe_path.as_deref(), Some("/api/health"));
            assert_eq!(args.cms.cms_request_timeout_seconds, Some(3));
        }
        other => panic!("unexpected command: {other:?}"),
    }
}

#[test]
fn probe_overrides_only_touch_cms() {
    let mut raw = RawSettings::default();
    raw.apply_cms_overrides(&CmsOverrides {
        cms_probe_path: Some("/api/health".to_string()),
        ..Default::default()
    });

    let settings = Settings::from_raw(raw).expect("valid settings");
    assert_eq!(settings.cms.probe_path, "/api/health");
    assert_eq!(settings.server.public_addr.port(), DEFAULT_PUBLIC_PORT);
}
