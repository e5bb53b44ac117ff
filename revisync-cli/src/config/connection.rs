//! Connection strings, profiles and tokens

use anyhow::{Context, Result, bail};
use reqwest::Url;
use std::sync::Arc;

use super::{Config, ConnectionProfile};
use crate::api::{Connection, GraphqlClient, ProjectRef, RevisionSelector};

pub const URL_SCHEME: &str = "revisync";

/// Token used when no role-specific one is set
pub const TOKEN_ENV: &str = "REVISYNC_TOKEN";

const DEFAULT_BRANCH: &str = "master";

/// Which side of a command a connection is on
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionRole {
    Source,
    Target,
}

impl ConnectionRole {
    pub fn label(&self) -> &'static str {
        match self {
            Self::Source => "source",
            Self::Target => "target",
        }
    }

    pub fn token_env(&self) -> &'static str {
        match self {
            Self::Source => "REVISYNC_SOURCE_TOKEN",
            Self::Target => "REVISYNC_TARGET_TOKEN",
        }
    }
}

/// Everything needed to open a [`Connection`]
#[derive(Clone, PartialEq)]
pub struct ConnectionConfig {
    pub endpoint: String,
    pub project: ProjectRef,
    pub revision: RevisionSelector,
    pub token: Option<String>,
}

impl std::fmt::Debug for ConnectionConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConnectionConfig")
            .field("endpoint", &self.endpoint)
            .field("project", &self.project)
            .field("revision", &self.revision)
            .field("token", &self.token.as_ref().map(|_| "<redacted>"))
            .finish()
    }
}

impl ConnectionConfig {
    /// Resolve a `--source` / `--target` argument
    ///
    /// `arg` is either a `revisync://` URL or the name of a configured
    /// profile. A token given in the URL or profile wins over the role's
    /// environment variable, which wins over [`TOKEN_ENV`].
    pub fn resolve(
        arg: &str,
        config: &Config,
        role: ConnectionRole,
        env: impl Fn(&str) -> Option<String>,
    ) -> Result<Self> {
        let mut resolved = if arg.starts_with(&format!("{}://", URL_SCHEME)) {
            Self::parse_url(arg)
                .with_context(|| format!("Invalid {} connection URL", role.label()))?
        } else if let Some(profile) = config.profile(arg) {
            Self::from_profile(arg, profile, config)?
        } else {
            bail!(
                "Unknown {} connection '{}': expected a {}:// URL or one of the configured profiles ({})",
                role.label(),
                arg,
                URL_SCHEME,
                profile_names(config)
            );
        };

        if resolved.token.is_none() {
            resolved.token = env(role.token_env())
                .or_else(|| env(TOKEN_ENV))
                .filter(|t| !t.is_empty());
        }
        Ok(resolved)
    }

    /// `revisync://host[:port]/org/project/branch[:revision][?token=..&secure=false]`
    pub fn parse_url(arg: &str) -> Result<Self> {
        let url = Url::parse(arg).context("Malformed URL")?;
        if url.scheme() != URL_SCHEME {
            bail!("Expected scheme '{}', got '{}'", URL_SCHEME, url.scheme());
        }
        let host = url
            .host_str()
            .filter(|h| !h.is_empty())
            .context("Missing host")?;

        let mut secure = true;
        let mut token = None;
        for (key, value) in url.query_pairs() {
            match key.as_ref() {
                "token" => token = Some(value.into_owned()),
                "secure" => secure = !matches!(value.as_ref(), "false" | "0" | "no"),
                other => bail!("Unknown connection option '{}'", other),
            }
        }

        let segments: Vec<&str> = url
            .path_segments()
            .map(|s| s.filter(|seg| !seg.is_empty()).collect())
            .unwrap_or_default();
        let [organization, project, branch] = segments.as_slice() else {
            bail!("Expected path /organization/project/branch[:revision]");
        };
        let (branch, revision) = match branch.split_once(':') {
            Some((branch, revision)) => (branch, RevisionSelector::parse(revision)),
            None => (*branch, RevisionSelector::Draft),
        };
        if branch.is_empty() {
            bail!("Missing branch name");
        }

        let endpoint = match url.port() {
            Some(port) => format!("{}://{}:{}/graphql", scheme(secure), host, port),
            None => format!("{}://{}/graphql", scheme(secure), host),
        };

        Ok(Self {
            endpoint,
            project: ProjectRef {
                organization: organization.to_string(),
                project: project.to_string(),
                branch: branch.to_string(),
            },
            revision,
            token,
        })
    }

    fn from_profile(name: &str, profile: &ConnectionProfile, config: &Config) -> Result<Self> {
        let endpoint = profile
            .endpoint
            .clone()
            .or_else(|| config.defaults.endpoint.clone())
            .with_context(|| {
                format!(
                    "Profile '{}' has no endpoint and no default endpoint is configured",
                    name
                )
            })?;

        Ok(Self {
            endpoint,
            project: ProjectRef {
                organization: profile.organization.clone(),
                project: profile.project.clone(),
                branch: profile
                    .branch
                    .clone()
                    .unwrap_or_else(|| DEFAULT_BRANCH.to_string()),
            },
            revision: profile
                .revision
                .as_deref()
                .map(RevisionSelector::parse)
                .unwrap_or_default(),
            token: profile.token.clone(),
        })
    }
}

fn scheme(secure: bool) -> &'static str {
    if secure { "https" } else { "http" }
}

fn profile_names(config: &Config) -> String {
    if config.connections.is_empty() {
        "none configured".to_string()
    } else {
        config
            .connections
            .keys()
            .cloned()
            .collect::<Vec<_>>()
            .join(", ")
    }
}

/// Open a GraphQL-backed connection
pub async fn open_connection(config: &ConnectionConfig, page_size: usize) -> Result<Connection> {
    let client = GraphqlClient::new(&config.endpoint, config.token.clone())
        .context("Failed to create HTTP client")?;
    let connection = Connection::open(
        Arc::new(client),
        config.project.clone(),
        config.revision.clone(),
    )
    .await
    .with_context(|| format!("Failed to connect to {} at {}", config.project, config.endpoint))?;
    Ok(connection.with_page_size(page_size))
}
