// src/config/validate.rs

use globset::Glob;

use crate::config::model::{ConfigFile, WatchBindingConfig};
use crate::errors::{PipelineError, Result};
use crate::registry::{TaskKind, TaskRegistry};

/// Semantic validation of a loaded config.
///
/// Task-graph invariants (unknown prerequisites, cycles) are checked by
/// [`TaskRegistry::validate`]; this covers everything that can be judged from
/// the config alone.
pub fn validate_config(cfg: &ConfigFile) -> Result<()> {
    ensure_has_vendor_scripts(cfg)?;
    validate_naming(cfg)?;
    validate_styles(cfg)?;
    validate_server(cfg)?;
    validate_deploy(cfg)?;
    validate_watch(cfg)?;
    Ok(())
}

/// Cross-check watch bindings against the task registry.
///
/// Binding tasks must exist and be plain build tasks; composite tasks like
/// `default` would re-enter the orchestrator from inside a reaction.
pub fn validate_watch_tasks(cfg: &ConfigFile, registry: &TaskRegistry) -> Result<()> {
    for binding in &cfg.watch.bindings {
        for name in &binding.tasks {
            match registry.get(name) {
                None => {
                    return Err(PipelineError::Config(format!(
                        "watch binding {:?} references unknown task '{}'",
                        binding.patterns, name
                    )));
                }
                Some(task) if !matches!(task.kind, TaskKind::Action(_)) => {
                    return Err(PipelineError::Config(format!(
                        "watch binding {:?} references task '{}', which is not a plain build task",
                        binding.patterns, name
                    )));
                }
                Some(_) => {}
            }
        }
    }
    Ok(())
}

fn ensure_has_vendor_scripts(cfg: &ConfigFile) -> Result<()> {
    if cfg.paths.vendor_scripts.is_empty() {
        return Err(PipelineError::Config(
            "[paths].vendor_scripts must list at least one script".to_string(),
        ));
    }
    Ok(())
}

fn validate_naming(cfg: &ConfigFile) -> Result<()> {
    ensure_bare_name("[output].bundle_name", &cfg.output.bundle_name)?;
    ensure_bare_name("[output].vendor_bundle", &cfg.output.vendor_bundle)?;

    let ext = &cfg.paths.script_extension;
    if ext.is_empty() || ext.starts_with('.') || ext.contains('/') {
        return Err(PipelineError::Config(format!(
            "[paths].script_extension must be a bare extension like \"js\" (got {ext:?})"
        )));
    }
    Ok(())
}

/// File names configured as names, not paths.
fn ensure_bare_name(key: &str, value: &str) -> Result<()> {
    if value.is_empty() || value.contains('/') || value.contains('\\') {
        return Err(PipelineError::Config(format!(
            "{key} must be a plain file name (got {value:?})"
        )));
    }
    Ok(())
}

fn validate_styles(cfg: &ConfigFile) -> Result<()> {
    if cfg.styles.browsers.is_empty() {
        return Err(PipelineError::Config(
            "[styles].browsers must list at least one browserslist query".to_string(),
        ));
    }
    Ok(())
}

fn validate_server(cfg: &ConfigFile) -> Result<()> {
    if cfg.server.port == 0 {
        return Err(PipelineError::Config(
            "[server].port must be >= 1 (got 0)".to_string(),
        ));
    }
    if cfg.server.host.parse::<std::net::IpAddr>().is_err() {
        return Err(PipelineError::Config(format!(
            "[server].host must be an IP address (got {:?})",
            cfg.server.host
        )));
    }
    Ok(())
}

fn validate_deploy(cfg: &ConfigFile) -> Result<()> {
    if cfg.deploy.remote.is_empty() {
        return Err(PipelineError::Config(
            "[deploy].remote must not be empty".to_string(),
        ));
    }
    if cfg.deploy.branch.is_empty() {
        return Err(PipelineError::Config(
            "[deploy].branch must not be empty".to_string(),
        ));
    }
    Ok(())
}

fn validate_watch(cfg: &ConfigFile) -> Result<()> {
    ensure_globs_compile("[watch].exclude", &cfg.watch.exclude)?;

    for binding in &cfg.watch.bindings {
        validate_binding(binding)?;
    }
    Ok(())
}

fn validate_binding(binding: &WatchBindingConfig) -> Result<()> {
    if binding.patterns.is_empty() {
        return Err(PipelineError::Config(
            "watch binding must list at least one pattern".to_string(),
        ));
    }

    match binding.action.as_deref() {
        None => {}
        Some("reload") => {
            if !binding.tasks.is_empty() {
                return Err(PipelineError::Config(format!(
                    "watch binding {:?} sets both `tasks` and `action`; pick one",
                    binding.patterns
                )));
            }
        }
        Some(other) => {
            return Err(PipelineError::Config(format!(
                "watch binding {:?} has unknown action {other:?} (only \"reload\" is supported)",
                binding.patterns
            )));
        }
    }

    ensure_globs_compile("watch binding patterns", &binding.patterns)?;
    ensure_globs_compile("watch binding exclude", &binding.exclude)?;
    Ok(())
}

fn ensure_globs_compile(key: &str, patterns: &[String]) -> Result<()> {
    for pat in patterns {
        if let Err(e) = Glob::new(pat) {
            return Err(PipelineError::Config(format!(
                "{key}: invalid glob pattern {pat:?}: {e}"
            )));
        }
    }
    Ok(())
}
