use mcp_chat_client::ClientError;
use mcp_chat_client::config::{AppConfig, Cli, load_llm_settings, resolve_server_target};
use mcp_chat_client::llm::Provider;
use mcp_chat_client::mcp::ServerTarget;
use serial_test::serial;
use std::env;
use std::fs;

// Helper to clear environment variables that might interfere with tests
fn clear_env_vars() {
    unsafe {
        for var in [
            "MCP_CHAT__LLM__MODEL",
            "MCP_CHAT__CHAT__MAX_ROUNDS",
            "MCP_CHAT__RESOURCES__RELEVANCE_THRESHOLD",
            "CONFIG_FILE",
            "MCP_CONFIG",
            "LLM_MODEL",
            "LLM_BASE_URL",
            "LLM_API_KEY",
            "OPENROUTER_API_KEY",
            "AZURE_DEPLOYMENT_NAME",
            "AZURE_API_VERSION",
        ] {
            env::remove_var(var);
        }
    }
}

#[test]
#[serial]
fn test_default_config() {
    clear_env_vars();

    let config = AppConfig::load_from_args(["mcp-chat"]).expect("defaults should load");
    assert_eq!(config.llm.base_url, "https://openrouter.ai/api");
    assert_eq!(config.llm.model, "anthropic/claude-3-5-sonnet-20241022");
    assert_eq!(config.llm.max_tokens, 1000);
    assert_eq!(config.chat.max_rounds, 10);
    assert!(!config.chat.auto_resources);

    let options = config.client_options();
    assert!(options.relevance.threshold.abs() < f64::EPSILON);
    assert_eq!(options.relevance.max_resources, 3);
    assert_eq!(options.relevance.max_context_chars, 1000);
}

#[test]
#[serial]
fn test_env_override() {
    clear_env_vars();
    unsafe {
        env::set_var("MCP_CHAT__LLM__MODEL", "openai/gpt-4o");
        env::set_var("MCP_CHAT__CHAT__MAX_ROUNDS", "4");
    }

    let config = AppConfig::load_from_args(["mcp-chat"]).expect("Failed to load config");
    assert_eq!(config.llm.model, "openai/gpt-4o");
    assert_eq!(config.chat.max_rounds, 4);

    clear_env_vars();
}

#[test]
#[serial]
fn test_cli_beats_env() {
    clear_env_vars();
    unsafe {
        env::set_var("MCP_CHAT__LLM__MODEL", "from-env");
    }

    let config = AppConfig::load_from_args(["mcp-chat", "--model", "from-cli", "--max-rounds", "2"])
        .expect("Failed to load config");
    assert_eq!(config.llm.model, "from-cli");
    assert_eq!(config.chat.max_rounds, 2);

    clear_env_vars();
}

#[test]
#[serial]
fn test_file_load() {
    clear_env_vars();

    let dir = tempfile::tempdir().unwrap();
    let file_path = dir.path().join("chat.yaml");
    fs::write(
        &file_path,
        r"
llm:
  model: meta-llama/llama-3-70b
chat:
  auto_resources: true
resources:
  max_auto_resources: 5
",
    )
    .expect("Failed to write temp config");

    unsafe {
        env::set_var("CONFIG_FILE", &file_path);
    }

    let config = AppConfig::load_from_args(["mcp-chat"]).expect("Failed to load config from file");
    assert_eq!(config.llm.model, "meta-llama/llama-3-70b");
    assert!(config.chat.auto_resources);
    assert_eq!(config.resources.max_auto_resources, 5);
    // Untouched keys keep their defaults.
    assert_eq!(config.chat.max_rounds, 10);

    clear_env_vars();
}

#[test]
#[serial]
fn test_missing_explicit_file_fails() {
    clear_env_vars();

    let err = AppConfig::load_from_args(["mcp-chat", "--config", "/nonexistent/chat.yaml"])
        .unwrap_err();
    assert!(matches!(err, ClientError::Config(_)));
}

#[test]
#[serial]
fn test_invalid_values_rejected() {
    clear_env_vars();
    unsafe {
        env::set_var("MCP_CHAT__RESOURCES__RELEVANCE_THRESHOLD", "1.5");
    }

    let err = AppConfig::load_from_args(["mcp-chat"]).unwrap_err();
    assert!(err.to_string().contains("relevance_threshold"));

    clear_env_vars();

    let err = AppConfig::load_from_args(["mcp-chat", "--base-url", "not a url"]).unwrap_err();
    assert!(matches!(err, ClientError::Config(_)));
}

#[test]
#[serial]
fn test_cwd_config_fallback() {
    clear_env_vars();

    let dir = tempfile::tempdir().unwrap();
    fs::write(dir.path().join("config.toml"), "[chat]\nmax_rounds = 7\n").unwrap();

    let previous = env::current_dir().unwrap();
    env::set_current_dir(dir.path()).unwrap();
    let config = AppConfig::load_from_args(["mcp-chat"]);
    env::set_current_dir(previous).unwrap();

    assert_eq!(config.expect("Failed to load config").chat.max_rounds, 7);
}

#[test]
#[serial]
fn test_llm_settings_from_env() {
    clear_env_vars();
    unsafe {
        env::set_var("OPENROUTER_API_KEY", "sk-or-test");
    }

    let config = AppConfig::load_from_args(["mcp-chat"]).unwrap();
    let settings = load_llm_settings(&config);
    assert_eq!(settings.api_key.as_deref(), Some("sk-or-test"));
    assert_eq!(settings.provider, Provider::OpenRouter);

    unsafe {
        env::set_var("LLM_API_KEY", "sk-primary");
        env::set_var("AZURE_DEPLOYMENT_NAME", "gpt4o-prod");
    }
    let config =
        AppConfig::load_from_args(["mcp-chat", "--base-url", "https://res.openai.azure.com"]).unwrap();
    let settings = load_llm_settings(&config);
    assert_eq!(settings.api_key.as_deref(), Some("sk-primary"));
    assert!(matches!(
        settings.provider,
        Provider::AzureOpenAI { ref deployment_name, .. } if deployment_name == "gpt4o-prod"
    ));

    clear_env_vars();
}

#[test]
#[serial]
fn test_server_target_resolution() {
    clear_env_vars();

    let cli = Cli {
        server: Some("servers/weather/weather.py".into()),
        ..Cli::default()
    };
    assert!(matches!(
        resolve_server_target(&cli).unwrap(),
        ServerTarget::Stdio { ref command, .. } if command == "python"
    ));

    let dir = tempfile::tempdir().unwrap();
    let mcp_json = dir.path().join("mcp.json");
    fs::write(
        &mcp_json,
        r#"{"mcpServers": {"remote": {"url": "https://mcp.example.com/mcp"}}}"#,
    )
    .unwrap();
    let cli = Cli {
        mcp_config: Some(mcp_json.to_string_lossy().into_owned()),
        ..Cli::default()
    };
    assert!(matches!(
        resolve_server_target(&cli).unwrap(),
        ServerTarget::Http { .. }
    ));

    let err = resolve_server_target(&Cli::default()).unwrap_err();
    assert!(matches!(err, ClientError::Config(_)));
}
