//! `validate` command implementation.

use anyhow::{Context, Result};
use contracts::{ServerConfig, StorageKind};
use serde::Serialize;
use tracing::info;

use crate::cli::ValidateArgs;

/// Validation result for JSON output
#[derive(Serialize)]
struct ValidationResult {
    valid: bool,
    config_path: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    warnings: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    summary: Option<ConfigSummary>,
}

#[derive(Serialize)]
struct ConfigSummary {
    ingest_addr: String,
    tail_addr: String,
    internal_app: String,
    token_count: usize,
    storage: StorageKind,
    batch_size: usize,
    flush_interval_ms: u64,
}

/// Execute the `validate` command
pub fn run_validate(args: &ValidateArgs) -> Result<()> {
    info!(config = %args.config.display(), "Validating configuration");

    let result = validate_config(args);

    if args.json {
        let json = serde_json::to_string_pretty(&result)
            .context("Failed to serialize validation result")?;
        println!("{}", json);
    } else {
        print_validation_result(&result);
    }

    if result.valid {
        Ok(())
    } else {
        anyhow::bail!("Configuration validation failed")
    }
}

fn validate_config(args: &ValidateArgs) -> ValidationResult {
    let config_path = args.config.display().to_string();

    if !args.config.exists() {
        return ValidationResult {
            valid: false,
            config_path,
            error: Some(format!("File not found: {}", args.config.display())),
            warnings: None,
            summary: None,
        };
    }

    match config_loader::ConfigLoader::load_from_path(&args.config) {
        Ok(config) => {
            let warnings = collect_warnings(&config);
            ValidationResult {
                valid: true,
                config_path,
                error: None,
                warnings: if warnings.is_empty() {
                    None
                } else {
                    Some(warnings)
                },
                summary: Some(ConfigSummary {
                    ingest_addr: config.server.ingest_addr.clone(),
                    tail_addr: config.server.tail_addr.clone(),
                    internal_app: config.auth.internal_app.clone(),
                    token_count: config.auth.tokens.len(),
                    storage: config.storage.kind,
                    batch_size: config.pipeline.batch_size,
                    flush_interval_ms: config.pipeline.flush_interval_ms,
                }),
            }
        }
        Err(e) => ValidationResult {
            valid: false,
            config_path,
            error: Some(e.to_string()),
            warnings: None,
            summary: None,
        },
    }
}

/// Collect configuration warnings (non-fatal issues)
fn collect_warnings(config: &ServerConfig) -> Vec<String> {
    let mut warnings = Vec::new();

    if !config
        .auth
        .tokens
        .values()
        .any(|app| *app == config.auth.internal_app)
    {
        warnings.push(format!(
            "No token maps to internal app '{}' - every ingest connection will be rejected",
            config.auth.internal_app
        ));
    }

    if config.storage.kind == StorageKind::Memory {
        warnings.push("storage.kind is memory - logs are lost on exit".to_string());
    }

    if config.pipeline.flush_interval_ms > 60_000 {
        warnings.push(format!(
            "pipeline.flush_interval_ms is {} - partial batches may wait over a minute",
            config.pipeline.flush_interval_ms
        ));
    }

    warnings
}

fn print_validation_result(result: &ValidationResult) {
    if result.valid {
        println!("✓ Configuration is valid: {}", result.config_path);

        if let Some(ref summary) = result.summary {
            println!("\n  Ingest: {}", summary.ingest_addr);
            println!("  Tail: {}", summary.tail_addr);
            println!("  Internal app: {}", summary.internal_app);
            println!("  Tokens: {}", summary.token_count);
            println!("  Storage: {:?}", summary.storage);
            println!(
                "  Batching: {} entries / {}ms idle",
                summary.batch_size, summary.flush_interval_ms
            );
        }

        if let Some(ref warnings) = result.warnings {
            println!("\n⚠ Warnings:");
            for warning in warnings {
                println!("  - {}", warning);
            }
        }
    } else {
        println!("✗ Configuration is invalid: {}", result.config_path);
        if let Some(ref error) = result.error {
            println!("\n  Error: {}", error);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    fn write_config(content: &str) -> (tempfile::TempDir, PathBuf) {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("logpipe.toml");
        std::fs::write(&path, content).unwrap();
        (dir, path)
    }

    #[test]
    fn test_valid_config_with_warnings() {
        let (_dir, path) = write_config("[storage]\nkind = \"memory\"\n");
        let result = validate_config(&ValidateArgs {
            config: path,
            json: true,
        });

        assert!(result.valid);
        let warnings = result.warnings.unwrap();
        assert_eq!(warnings.len(), 2);
        assert!(warnings[0].contains("internal app 'tsr'"));
        assert_eq!(result.summary.unwrap().storage, StorageKind::Memory);
    }

    #[test]
    fn test_invalid_config_reports_error() {
        let (_dir, path) = write_config("[pipeline]\nbatch_size = 0\n");
        let result = validate_config(&ValidateArgs {
            config: path.clone(),
            json: false,
        });

        assert!(!result.valid);
        assert!(result.error.unwrap().contains("batch_size"));
        assert!(run_validate(&ValidateArgs { config: path, json: true }).is_err());
    }

    #[test]
    fn test_missing_file() {
        let result = validate_config(&ValidateArgs {
            config: PathBuf::from("/nonexistent/logpipe.toml"),
            json: false,
        });
        assert!(!result.valid);
        assert!(result.error.unwrap().starts_with("File not found"));
    }
}
