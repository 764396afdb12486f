//! Config subcommand handlers.

use std::collections::BTreeMap;

use dialoguer::{Input, Select};
use serde::Serialize;

use jablonet_config::{Profile, SecretKind, store_secret};

use crate::cli::{ConfigArgs, ConfigCommand, GlobalOpts};
use crate::config::{self, Config};
use crate::error::CliError;
use crate::output;

// ── Helpers ─────────────────────────────────────────────────────────

/// Map a dialoguer / interactive I/O failure into CliError.
fn prompt_err(e: impl std::fmt::Display) -> CliError {
    CliError::Validation {
        field: "interactive".into(),
        reason: format!("prompt failed: {e}"),
    }
}

fn profile_not_found(name: String, cfg: &Config) -> CliError {
    let mut available: Vec<_> = cfg.profiles.keys().cloned().collect();
    available.sort();
    CliError::ProfileNotFound {
        name,
        available: if available.is_empty() {
            "(none)".into()
        } else {
            available.join(", ")
        },
    }
}

/// Ask where a secret should live. Returns it when it belongs in the file.
fn place_secret(kind: SecretKind, profile_name: &str, value: String) -> Result<Option<String>, CliError> {
    let choices = &[
        "Store in system keyring (recommended)",
        "Save to config file (plaintext)",
    ];
    let selection = Select::new()
        .with_prompt(format!("Where to store the {kind}?"))
        .items(choices)
        .default(0)
        .interact()
        .map_err(prompt_err)?;

    if selection == 0 {
        store_secret(kind, profile_name, &value)?;
        eprintln!("   ✓ {kind} stored in system keyring");
        Ok(None)
    } else {
        Ok(Some(value))
    }
}

fn prompt_secret(kind: SecretKind) -> Result<String, CliError> {
    let label = match kind {
        SecretKind::Password => "Password: ",
        SecretKind::ControlCode => "Control code: ",
    };
    let value = rpassword::prompt_password(label).map_err(prompt_err)?;
    if value.is_empty() {
        return Err(CliError::Validation {
            field: kind.to_string(),
            reason: format!("{kind} cannot be empty"),
        });
    }
    Ok(value)
}

// ── Redacted view ───────────────────────────────────────────────────

#[derive(Serialize)]
struct ProfileView<'a> {
    username: Option<&'a str>,
    password: Option<&'static str>,
    service_id: Option<&'a str>,
    control_code: Option<&'static str>,
    base_url: Option<&'a str>,
    timeout: Option<u64>,
    retry_cooldown: Option<u64>,
    names: &'a BTreeMap<String, String>,
}

#[derive(Serialize)]
struct ConfigView<'a> {
    default_profile: Option<&'a str>,
    timeout: u64,
    retry_cooldown: u64,
    profiles: BTreeMap<&'a str, ProfileView<'a>>,
}

fn mask(secret: Option<&String>) -> Option<&'static str> {
    secret.map(|_| "********")
}

fn redacted(cfg: &Config) -> ConfigView<'_> {
    ConfigView {
        default_profile: cfg.default_profile.as_deref(),
        timeout: cfg.defaults.timeout,
        retry_cooldown: cfg.defaults.retry_cooldown,
        profiles: cfg
            .profiles
            .iter()
            .map(|(name, p)| {
                (
                    name.as_str(),
                    ProfileView {
                        username: p.username.as_deref(),
                        password: mask(p.password.as_ref()),
                        service_id: p.service_id.as_deref(),
                        control_code: mask(p.control_code.as_ref()),
                        base_url: p.base_url.as_deref(),
                        timeout: p.timeout,
                        retry_cooldown: p.retry_cooldown,
                        names: &p.names,
                    },
                )
            })
            .collect(),
    }
}

fn detail(view: &ConfigView<'_>) -> String {
    let mut lines = vec![
        format!("Default profile: {}", view.default_profile.unwrap_or("-")),
        format!("Timeout:         {}s", view.timeout),
        format!("Retry cooldown:  {}s", view.retry_cooldown),
    ];
    for (name, p) in &view.profiles {
        lines.push(String::new());
        lines.push(format!("[{name}]"));
        lines.push(format!("  Username:     {}", p.username.unwrap_or("-")));
        lines.push(format!("  Password:     {}", p.password.unwrap_or("(keyring/env)")));
        lines.push(format!("  Service id:   {}", p.service_id.unwrap_or("-")));
        lines.push(format!("  Control code: {}", p.control_code.unwrap_or("(keyring/env)")));
        if let Some(url) = p.base_url {
            lines.push(format!("  Base URL:     {url}"));
        }
        for (id, label) in p.names {
            lines.push(format!("  Name {id}: {label}"));
        }
    }
    lines.join("\n")
}

// ── Handler ─────────────────────────────────────────────────────────

pub fn handle(args: ConfigArgs, global: &GlobalOpts) -> Result<(), CliError> {
    match args.command {
        // ── Init: interactive wizard ────────────────────────────────
        ConfigCommand::Init => {
            let config_path = config::config_path();
            eprintln!("jablonet configuration wizard");
            eprintln!("   Config path: {}\n", config_path.display());

            let profile_name: String = Input::new()
                .with_prompt("Profile name")
                .default("default".into())
                .interact_text()
                .map_err(prompt_err)?;

            let username: String = Input::new()
                .with_prompt("JabloNET login (e-mail)")
                .interact_text()
                .map_err(prompt_err)?;
            if username.is_empty() {
                return Err(CliError::Validation {
                    field: "username".into(),
                    reason: "username cannot be empty".into(),
                });
            }

            let password = prompt_secret(SecretKind::Password)?;
            let password = place_secret(SecretKind::Password, &profile_name, password)?;

            let service_id: String = Input::new()
                .with_prompt("Service id (blank if the account has one panel)")
                .allow_empty(true)
                .interact_text()
                .map_err(prompt_err)?;

            let control_code = if dialoguer::Confirm::new()
                .with_prompt("Store a PGM control code now?")
                .default(false)
                .interact()
                .map_err(prompt_err)?
            {
                let code = prompt_secret(SecretKind::ControlCode)?;
                place_secret(SecretKind::ControlCode, &profile_name, code)?
            } else {
                None
            };

            let mut cfg = config::load_config_or_default();
            cfg.profiles.insert(
                profile_name.clone(),
                Profile {
                    username: Some(username),
                    password,
                    service_id: (!service_id.is_empty()).then_some(service_id),
                    control_code,
                    ..Profile::default()
                },
            );
            cfg.default_profile = Some(profile_name.clone());
            config::save_config(&cfg)?;

            eprintln!("\n✓ Configuration written to {}", config_path.display());
            eprintln!("  Active profile: {profile_name}");
            eprintln!("\n  Test it: jablonet login");
            Ok(())
        }

        // ── Show ────────────────────────────────────────────────────
        ConfigCommand::Show => {
            let cfg = config::load_config_or_default();
            let view = redacted(&cfg);
            let out = output::render_single(&global.output, &view, detail, |_| {
                config::config_path().display().to_string()
            });
            output::print_output(&out, global.quiet);
            Ok(())
        }

        // ── Profiles ────────────────────────────────────────────────
        ConfigCommand::Profiles => {
            let cfg = config::load_config_or_default();
            let default = cfg.default_profile.as_deref().unwrap_or("default");
            if cfg.profiles.is_empty() {
                eprintln!("No profiles configured. Run: jablonet config init");
            } else {
                let mut names: Vec<_> = cfg.profiles.keys().collect();
                names.sort();
                for name in names {
                    let marker = if name == default { " *" } else { "" };
                    println!("{name}{marker}");
                }
            }
            Ok(())
        }

        // ── Use <name> ─────────────────────────────────────────────
        ConfigCommand::Use { name } => {
            let mut cfg = config::load_config_or_default();
            if !cfg.profiles.contains_key(&name) {
                return Err(profile_not_found(name, &cfg));
            }
            cfg.default_profile = Some(name.clone());
            config::save_config(&cfg)?;
            eprintln!("✓ Default profile set to '{name}'");
            Ok(())
        }

        // ── Secrets ─────────────────────────────────────────────────
        ConfigCommand::SetPassword { profile } => set_secret(SecretKind::Password, profile, global),
        ConfigCommand::SetCode { profile } => set_secret(SecretKind::ControlCode, profile, global),
    }
}

fn set_secret(kind: SecretKind, profile: Option<String>, global: &GlobalOpts) -> Result<(), CliError> {
    let cfg = config::load_config_or_default();
    let profile_name = profile.unwrap_or_else(|| config::active_profile_name(global, &cfg));
    if !cfg.profiles.contains_key(&profile_name) {
        return Err(profile_not_found(profile_name, &cfg));
    }

    let value = prompt_secret(kind)?;
    store_secret(kind, &profile_name, &value)?;
    eprintln!("✓ {kind} stored in system keyring for profile '{profile_name}'");
    Ok(())
}
