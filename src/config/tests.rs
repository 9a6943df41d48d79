use std::io::Write;

use serial_test::serial;

use super::*;

fn raw_with_project() -> RawSettings {
    let mut raw = RawSettings::default();
    raw.cms.project_id = Some("abc123".to_string());
    raw
}

#[test]
fn cli_overrides_take_highest_precedence() {
    let mut raw = raw_with_project();
    raw.server.port = Some(4000);
    raw.logging.level = Some("info".to_string());
    raw.cms.dataset = Some("staging".to_string());

    let overrides = ServeOverrides {
        server_port: Some(4321),
        log_level: Some("debug".to_string()),
        cms_dataset: Some("production".to_string()),
        ..Default::default()
    };

    raw.apply_serve_overrides(&overrides);
    let settings = Settings::from_raw(raw).expect("valid settings");

    assert_eq!(settings.server.addr.port(), 4321);
    assert_eq!(settings.logging.level, LevelFilter::DEBUG);
    assert_eq!(settings.cms.dataset, "production");
}

#[test]
fn defaults_match_the_hosted_site() {
    let settings = Settings::from_raw(raw_with_project()).expect("valid settings");

    assert_eq!(settings.server.addr, "127.0.0.1:3000".parse::<SocketAddr>().unwrap());
    assert_eq!(settings.site.base_url.as_str(), "https://jha.kr/");
    assert_eq!(settings.site.name, "JHA (Korea)");
    assert_eq!(settings.site.environment, SiteEnvironment::Production);
    assert_eq!(settings.cms.dataset, "production");
    assert_eq!(settings.cms.api_version, "2024-12-03");
    assert!(!settings.cms.use_cdn);
    assert!(settings.revalidate.secret.is_none());
    assert_eq!(settings.cache.query_ttl, Duration::from_secs(3600));
}

#[test]
fn missing_project_id_fails_fast() {
    let err = Settings::from_raw(RawSettings::default()).expect_err("project id is required");
    assert!(matches!(
        err,
        LoadError::Invalid {
            key: "cms.project_id",
            ..
        }
    ));
}

#[test]
fn empty_secret_is_treated_as_unset() {
    let mut raw = raw_with_project();
    raw.revalidate.secret = Some(String::new());
    let settings = Settings::from_raw(raw).expect("valid settings");
    assert!(settings.revalidate.secret.is_none());
}

#[test]
fn secret_is_kept_verbatim() {
    let mut raw = raw_with_project();
    raw.revalidate.secret = Some("  padded ".to_string());
    let settings = Settings::from_raw(raw).expect("valid settings");
    assert_eq!(settings.revalidate.secret.as_deref(), Some("  padded "));
}

#[test]
fn secret_is_redacted_in_debug_output() {
    let mut raw = raw_with_project();
    raw.revalidate.secret = Some("abc123-secret".to_string());
    let settings = Settings::from_raw(raw).expect("valid settings");
    let rendered = format!("{:?}", settings.revalidate);
    assert!(!rendered.contains("abc123-secret"));
    assert!(rendered.contains("redacted"));
}

#[test]
fn development_environment_shortens_cache_ttl() {
    let mut raw = raw_with_project();
    raw.site.environment = Some("development".to_string());
    let settings = Settings::from_raw(raw).expect("valid settings");

    assert_eq!(settings.site.environment, SiteEnvironment::Development);
    assert_eq!(settings.cache.query_ttl, Duration::from_secs(30));
    assert_eq!(settings.cache.response_ttl, Duration::from_secs(30));
}

#[test]
fn explicit_ttl_wins_over_environment_default() {
    let mut raw = raw_with_project();
    raw.site.environment = Some("development".to_string());
    raw.apply_serve_overrides(&ServeOverrides {
        cache_query_ttl_seconds: Some(5),
        ..Default::default()
    });
    let settings = Settings::from_raw(raw).expect("valid settings");
    assert_eq!(settings.cache.query_ttl, Duration::from_secs(5));
    assert_eq!(settings.cache.response_ttl, Duration::from_secs(30));
}

#[test]
fn invalid_values_name_the_offending_key() {
    let cases: [(fn(&mut RawSettings), &str); 5] = [
        (|raw| raw.server.port = Some(0), "server.port"),
        (|raw| raw.site.base_url = Some("jha.kr".to_string()), "site.base_url"),
        (|raw| raw.site.environment = Some("staging".to_string()), "site.environment"),
        (|raw| raw.cms.api_version = Some("2024-13-40".to_string()), "cms.api_version"),
        (|raw| raw.cms.project_id = Some("Bad Id".to_string()), "cms.project_id"),
    ];

    for (mutate, expected) in cases {
        let mut raw = raw_with_project();
        mutate(&mut raw);
        match Settings::from_raw(raw) {
            Err(LoadError::Invalid { key, .. }) => assert_eq!(key, expected),
            other => panic!("expected invalid {expected}, got {other:?}"),
        }
    }
}

#[test]
fn api_version_accepts_leading_v() {
    let mut raw = raw_with_project();
    raw.cms.api_version = Some("v2025-02-19".to_string());
    let settings = Settings::from_raw(raw).expect("valid settings");
    assert_eq!(settings.cms.api_version, "2025-02-19");
}

#[test]
fn absolute_url_joins_paths_onto_the_origin() {
    let mut raw = raw_with_project();
    raw.site.base_url = Some("https://example.org/".to_string());
    let settings = Settings::from_raw(raw).expect("valid settings");

    assert_eq!(settings.site.absolute_url("/"), "https://example.org/");
    assert_eq!(settings.site.absolute_url("/news/a"), "https://example.org/news/a");
    assert_eq!(settings.site.absolute_url("faq"), "https://example.org/faq");
}

#[test]
fn cli_json_logging_enforces_format() {
    let mut raw = raw_with_project();
    raw.apply_serve_overrides(&ServeOverrides {
        log_json: Some(true),
        ..Default::default()
    });
    let settings = Settings::from_raw(raw).expect("valid settings");

    assert!(matches!(settings.logging.format, LogFormat::Json));
}

#[test]
fn default_to_serve_command() {
    let args = CliArgs::parse_from(["jha-site"]);
    let command = args
        .command
        .unwrap_or(Command::Serve(Box::<ServeArgs>::default()));
    assert!(matches!(command, Command::Serve(_)));
}

#[test]
#[serial]
fn parse_serve_overrides() {
    let args = CliArgs::parse_from([
        "jha-site",
        "serve",
        "--server-host",
        "0.0.0.0",
        "--revalidate-secret",
        "abc123",
        "--cache-enable-response",
        "false",
    ]);

    match args.command.expect("serve command") {
        Command::Serve(serve) => {
            assert_eq!(serve.overrides.server_host.as_deref(), Some("0.0.0.0"));
            assert_eq!(serve.overrides.revalidate_secret.as_deref(), Some("abc123"));
            assert_eq!(serve.overrides.cache_enable_response, Some(false));
        }
    }
}

#[test]
#[serial]
fn conventional_variables_feed_cli_overrides() {
    // SAFETY: serialized with every other test that touches the environment.
    unsafe {
        std::env::set_var("SANITY_REVALIDATE_SECRET", "from-env");
        std::env::set_var("SANITY_PROJECT_ID", "envproject");
    }

    let args = CliArgs::parse_from(["jha-site", "serve"]);

    unsafe {
        std::env::remove_var("SANITY_REVALIDATE_SECRET");
        std::env::remove_var("SANITY_PROJECT_ID");
    }

    let Some(Command::Serve(serve)) = args.command else {
        panic!("serve command expected");
    };
    assert_eq!(serve.overrides.revalidate_secret.as_deref(), Some("from-env"));
    assert_eq!(serve.overrides.cms_project_id.as_deref(), Some("envproject"));
}

#[test]
#[serial]
fn load_reads_config_file_then_prefixed_environment() {
    let path = std::env::temp_dir().join(format!("jha-site-config-{}.toml", uuid::Uuid::new_v4()));
    {
        let mut file = std::fs::File::create(&path).expect("config file should be created");
        writeln!(
            file,
            "[cms]\nproject_id = \"fileproject\"\ndataset = \"staging\"\n\n[site]\nenvironment = \"development\""
        )
        .expect("config file should be written");
    }

    // SAFETY: serialized with every other test that touches the environment.
    unsafe {
        std::env::set_var("JHA__CMS__DATASET", "envdataset");
    }

    let cli = CliArgs {
        config_file: Some(path.clone()),
        command: None,
    };
    let result = load(&cli);

    unsafe {
        std::env::remove_var("JHA__CMS__DATASET");
    }
    let _ = std::fs::remove_file(&path);

    let settings = result.expect("settings should load");
    assert_eq!(settings.cms.project_id, "fileproject");
    assert_eq!(settings.cms.dataset, "envdataset");
    assert_eq!(settings.site.environment, SiteEnvironment::Development);
}
