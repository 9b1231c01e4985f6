use product_lister::config::Config;

#[test]
fn parse_example_config() {
    let raw = include_str!("../product-lister.example.toml");
    let cfg: Config = toml::from_str(raw).expect("parse TOML");
    assert!(cfg.limits.max_images_per_batch >= 1);
    assert!(!cfg.paths.out_dir.is_empty());
    assert_eq!(cfg.llm.api_key_env, "AKASH_API_KEY");
    assert_eq!(cfg.ocr.env.get("FLAGS_allocator_strategy").map(String::as_str), Some("auto_growth"));
}

#[test]
fn missing_sections_fall_back_to_defaults() {
    let cfg: Config = toml::from_str("[llm]\nbase_url = \"http://localhost:8080/v1\"\nmodel = \"m\"\napi_key_env = \"K\"\nrequest_timeout_seconds = 5\n")
        .expect("parse TOML");
    assert_eq!(cfg.llm.model, "m");
    assert_eq!(cfg.llm.temperature, None);
    assert_eq!(cfg.ocr.lang, "en");
    assert!(!cfg.ocr.use_angle_cls);
    assert_eq!(cfg.output.export_filename, "product_listings.json");
}

#[test]
fn default_config_round_trips_through_toml() {
    let cfg = Config::default();
    let raw = cfg.normalized_for_hash();
    let back: Config = toml::from_str(&raw).expect("reparse");
    assert_eq!(back.normalized_for_hash(), raw);
}

#[test]
fn api_key_is_read_from_named_variable() {
    let mut cfg = Config::default();
    cfg.llm.api_key_env = "PRODUCT_LISTER_TEST_KEY_THAT_IS_NEVER_SET".into();
    let err = cfg.llm.resolve_api_key().unwrap_err();
    assert!(err.to_string().contains("PRODUCT_LISTER_TEST_KEY_THAT_IS_NEVER_SET"));
}
