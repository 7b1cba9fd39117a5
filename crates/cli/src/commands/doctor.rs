//! `gitbuddy doctor`: Diagnose configuration.

use gitbuddy_config::AppConfig;
use gitbuddy_core::Provider;
use gitbuddy_providers::OpenAiCompatProvider;

pub async fn run() -> Result<(), Box<dyn std::error::Error>> {
    println!("🩺 Git Buddy Doctor: Configuration Check");
    println!("=========================================\n");

    let mut issues = 0;

    let config_path = AppConfig::config_path();
    if config_path.exists() {
        println!("  ✅ Config file: {}", config_path.display());
    } else {
        println!(
            "  ℹ️  No config file at {}, using defaults and environment",
            config_path.display()
        );
        println!("     Run `gitbuddy init` to write one.");
    }

    let config = match AppConfig::load() {
        Ok(config) => {
            println!("  ✅ Configuration valid");
            config
        }
        Err(e) => {
            println!("  ❌ Configuration invalid: {e}");
            println!();
            println!("  ⚠️  1 issue found. Fix the configuration and run again.");
            return Ok(());
        }
    };

    for (name, value) in [
        ("OPENAI_API_KEY", &config.openai_api_key),
        ("PINECONE_API_KEY", &config.pinecone_api_key),
    ] {
        if value.as_deref().is_some_and(|v| !v.trim().is_empty()) {
            println!("  ✅ {name} set");
        } else {
            println!("  ❌ {name} missing");
            issues += 1;
        }
    }

    if config.index.host.trim().is_empty() {
        println!(
            "  ❌ Pinecone index host missing: set index.host or GITBUDDY_PINECONE_HOST"
        );
        issues += 1;
    } else {
        println!("  ✅ Index: {} at {}", config.index.name, config.index.host);
    }

    println!("  ✅ Model: {} (temperature {})", config.model, config.temperature);
    println!("  ✅ Embeddings: {}", config.embeddings_model);

    if let Some(key) = config.openai_api_key.as_deref().filter(|k| !k.trim().is_empty()) {
        let provider = OpenAiCompatProvider::new("openai", config.api_url.clone(), key)?;
        match provider.health_check().await {
            Ok(true) => println!("  ✅ Model API reachable at {}", config.api_url),
            Ok(false) => {
                println!("  ❌ Model API at {} returned an error status", config.api_url);
                issues += 1;
            }
            Err(e) => {
                println!("  ❌ Model API unreachable: {e}");
                issues += 1;
            }
        }
    }

    println!();
    if issues == 0 {
        println!("  🎉 All checks passed!");
    } else {
        println!("  ⚠️  {issues} issue(s) found. See above for details.");
    }

    Ok(())
}
