use anyhow::Result;
use fleetrun_core::{FleetrunConfig, Role};

/// Command-line overrides layered over file/env configuration.
#[derive(Debug, Clone, Default)]
pub struct CliOverrides {
    pub server: Option<String>,
    pub token: Option<String>,
    pub project: Option<i64>,
}

/// Resolve the effective configuration: defaults, config file, FLEETRUN_*
/// environment, then explicit flags.
pub fn resolve(overrides: &CliOverrides) -> Result<FleetrunConfig> {
    let mut config = FleetrunConfig::load()?;

    if let Some(server) = &overrides.server {
        config.server.base_url = server.clone();
    }
    if let Some(token) = &overrides.token {
        config.server.token = token.clone();
    }
    if let Some(project) = overrides.project {
        config.server.project_id = Some(project);
    }

    Ok(config)
}

/// The acting role, as granted by the session that issued the token. The
/// server enforces it regardless; the client checks it first so privileged
/// actions short-circuit without a request.
pub fn resolve_role() -> Role {
    match std::env::var("FLEETRUN_ROLE").as_deref() {
        Ok("user") => Role::User,
        _ => Role::Admin,
    }
}
