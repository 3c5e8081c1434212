//! Registry location checks.
//!
//! Validation runs in two phases: a pure format check and, for HTTPS
//! locations, a reachability probe against the usual git HTTP endpoints.
//! SSH shorthand locations are never probed since key based access cannot be
//! verified without credentials.

use std::time::Duration;

use once_cell::sync::Lazy;
use regex::Regex;
use reqwest::{redirect, Client, StatusCode};
use tracing::{debug, info};
use url::{ParseError, Url};

use crate::config::ClientConfig;
use crate::error::{Result, UrlError};
use crate::logging::Logger;

static SSH_URL: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^git@([^:/\s]+):([^/\s].*)$").expect("ssh pattern is valid"));

static REPO_NAME: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[A-Za-z0-9._-]+$").expect("repository name pattern is valid"));

/// Transport of a location that passed the format check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UrlKind {
    Https,
    Ssh,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum KnownHost {
    GitHub,
    GitLab,
    Bitbucket,
}

impl KnownHost {
    fn detect(host: &str) -> Option<Self> {
        if host.contains("github.com") {
            Some(KnownHost::GitHub)
        } else if host.contains("gitlab") {
            Some(KnownHost::GitLab)
        } else if host.contains("bitbucket.org") {
            Some(KnownHost::Bitbucket)
        } else {
            None
        }
    }

    fn label(&self) -> &'static str {
        match self {
            KnownHost::GitHub => "GitHub",
            KnownHost::GitLab => "GitLab",
            KnownHost::Bitbucket => "Bitbucket",
        }
    }

    fn expected_shape(&self) -> &'static str {
        match self {
            KnownHost::GitHub => "owner/repository",
            KnownHost::GitLab => "group[/subgroup]/repository",
            KnownHost::Bitbucket => "workspace/repository",
        }
    }
}

/// Syntactic check of a registry location. Performs no I/O.
pub fn validate_url_format(raw: &str) -> std::result::Result<UrlKind, UrlError> {
    if raw.is_empty() {
        return Err(UrlError::MissingScheme {
            url: raw.to_string(),
        });
    }

    if raw.starts_with("git@") {
        return validate_ssh(raw).map(|_| UrlKind::Ssh);
    }

    if let Some(rest) = raw.strip_prefix("https://") {
        if rest.is_empty() || rest.starts_with('/') {
            return Err(UrlError::MissingHost {
                url: raw.to_string(),
            });
        }
    }

    let parsed = Url::parse(raw).map_err(|err| match err {
        ParseError::RelativeUrlWithoutBase => UrlError::MissingScheme {
            url: raw.to_string(),
        },
        ParseError::EmptyHost => UrlError::MissingHost {
            url: raw.to_string(),
        },
        other => UrlError::Malformed {
            url: raw.to_string(),
            reason: other.to_string(),
        },
    })?;

    if parsed.scheme() != "https" {
        return Err(UrlError::UnsupportedScheme {
            url: raw.to_string(),
            scheme: parsed.scheme().to_string(),
        });
    }

    let host = match parsed.host_str() {
        Some(host) if !host.is_empty() => host,
        _ => {
            return Err(UrlError::MissingHost {
                url: raw.to_string(),
            })
        }
    };

    let path = parsed.path();
    if path.is_empty() || path == "/" {
        return Err(UrlError::MissingPath {
            url: raw.to_string(),
        });
    }

    let trimmed = path.trim_end_matches('/');
    let trimmed = trimmed.strip_suffix(".git").unwrap_or(trimmed);
    let segments: Vec<&str> = trimmed.trim_matches('/').split('/').collect();

    match KnownHost::detect(host) {
        Some(known) => validate_known_host(raw, known, &segments),
        None => {
            if segments.last().map_or(true, |repo| repo.is_empty()) {
                return Err(UrlError::MissingPath {
                    url: raw.to_string(),
                });
            }
            Ok(())
        }
    }?;

    Ok(UrlKind::Https)
}

fn validate_ssh(raw: &str) -> std::result::Result<(), UrlError> {
    match SSH_URL.captures(raw) {
        Some(caps) if !caps[1].is_empty() && !caps[2].is_empty() => Ok(()),
        _ => Err(UrlError::InvalidSsh {
            url: raw.to_string(),
        }),
    }
}

fn validate_known_host(
    raw: &str,
    known: KnownHost,
    segments: &[&str],
) -> std::result::Result<(), UrlError> {
    if segments.len() < 2 {
        return Err(UrlError::InsufficientPath {
            url: raw.to_string(),
            expected: known.expected_shape(),
        });
    }

    let owner = segments[0];
    let repository = match known {
        KnownHost::GitLab => segments[segments.len() - 1],
        KnownHost::GitHub | KnownHost::Bitbucket => segments[1],
    };

    if !REPO_NAME.is_match(owner) {
        return Err(UrlError::InvalidOwner {
            url: raw.to_string(),
            host: known.label(),
            owner: owner.to_string(),
        });
    }
    if !REPO_NAME.is_match(repository) {
        return Err(UrlError::InvalidRepository {
            url: raw.to_string(),
            repository: repository.to_string(),
        });
    }
    Ok(())
}

/// Endpoints probed for an HTTPS location, in order and without duplicates.
pub fn candidate_endpoints(raw: &str) -> Vec<String> {
    let base = raw.trim_end_matches('/');
    let base = base.strip_suffix(".git").unwrap_or(base);

    let mut candidates = vec![raw.to_string()];
    if !raw.ends_with(".git") {
        candidates.push(format!("{base}.git"));
    }
    candidates.push(format!("{base}.git/info/refs"));
    candidates.push(format!("{base}/info/refs"));
    candidates.push(base.to_string());

    let mut unique = Vec::with_capacity(candidates.len());
    for candidate in candidates {
        if !unique.contains(&candidate) {
            unique.push(candidate);
        }
    }
    unique
}

/// Two phase validator for registry locations.
#[derive(Debug, Clone)]
pub struct UrlValidator {
    client: Option<Client>,
    log: Logger,
}

impl UrlValidator {
    pub fn new(timeout: Duration, user_agent: &str, log: Logger) -> Result<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .user_agent(user_agent)
            .redirect(redirect::Policy::none())
            .build()?;

        Ok(Self {
            client: Some(client),
            log,
        })
    }

    pub fn from_config(config: &ClientConfig, log: Logger) -> Result<Self> {
        Self::new(config.http_timeout, &config.user_agent, log)
    }

    /// A validator that checks format only and never touches the network.
    pub fn format_only(log: Logger) -> Self {
        Self { client: None, log }
    }

    /// Format check followed by the reachability probe for HTTPS locations.
    pub async fn validate_url(&self, raw: &str) -> std::result::Result<UrlKind, UrlError> {
        let kind = validate_url_format(raw)?;

        match kind {
            UrlKind::Ssh => {
                self.log
                    .in_scope(|| debug!("Skipping reachability check for SSH location {}", raw));
            }
            UrlKind::Https => {
                let endpoint = self.check_accessibility(raw).await?;
                self.log
                    .in_scope(|| info!("Registry location {} is reachable via {}", raw, endpoint));
            }
        }

        Ok(kind)
    }

    /// Probe each candidate endpoint in turn. Returns the first endpoint that
    /// answered with an accepted status, or the last failure.
    pub async fn check_accessibility(&self, raw: &str) -> std::result::Result<String, UrlError> {
        let Some(client) = &self.client else {
            return Ok(raw.to_string());
        };

        let mut last_failure = None;
        for endpoint in candidate_endpoints(raw) {
            match self.probe(client, &endpoint).await {
                Ok(()) => return Ok(endpoint),
                Err(err) => {
                    self.log.in_scope(|| debug!("Endpoint {} rejected: {}", endpoint, err));
                    last_failure = Some(err);
                }
            }
        }

        Err(last_failure.unwrap_or_else(|| UrlError::Unreachable {
            endpoint: raw.to_string(),
            reason: "no endpoints to probe".to_string(),
        }))
    }

    async fn probe(&self, client: &Client, endpoint: &str) -> std::result::Result<(), UrlError> {
        let response = client
            .get(endpoint)
            .send()
            .await
            .map_err(|err| UrlError::Unreachable {
                endpoint: endpoint.to_string(),
                reason: err.to_string(),
            })?;

        // 401 still proves the repository exists behind auth.
        match response.status() {
            StatusCode::OK
            | StatusCode::MOVED_PERMANENTLY
            | StatusCode::FOUND
            | StatusCode::UNAUTHORIZED => Ok(()),
            StatusCode::NOT_FOUND => Err(UrlError::NotFound {
                endpoint: endpoint.to_string(),
            }),
            StatusCode::FORBIDDEN => Err(UrlError::Forbidden {
                endpoint: endpoint.to_string(),
            }),
            other => Err(UrlError::UnexpectedStatus {
                endpoint: endpoint.to_string(),
                status: other.as_u16(),
            }),
        }
    }
}

/// Suggest a registry name for a location: the repository part of the path
/// with `.git` removed, reduced to `[A-Za-z0-9._-]`.
pub fn derive_registry_name(raw: &str) -> String {
    let candidate = if let Some(caps) = SSH_URL.captures(raw) {
        last_segment(&caps[2]).to_string()
    } else if let Ok(parsed) = Url::parse(raw) {
        let from_path = last_segment(parsed.path());
        if from_path.is_empty() || from_path == "." {
            parsed.host_str().unwrap_or_default().to_string()
        } else {
            from_path.to_string()
        }
    } else {
        raw.to_string()
    };

    let candidate = candidate.strip_suffix(".git").unwrap_or(&candidate);
    sanitize_name(candidate)
}

fn last_segment(path: &str) -> &str {
    path.trim_end_matches('/').rsplit('/').next().unwrap_or_default()
}

fn sanitize_name(name: &str) -> String {
    let replaced: String = name
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | '-') {
                c
            } else {
                '-'
            }
        })
        .collect();

    let mut collapsed = String::with_capacity(replaced.len());
    for c in replaced.chars() {
        if c == '-' && collapsed.ends_with('-') {
            continue;
        }
        collapsed.push(c);
    }

    let trimmed = collapsed
        .trim_start_matches(|c| c == '-' || c == '.')
        .trim_end_matches('-');

    if trimmed.is_empty() {
        "registry".to_string()
    } else {
        trimmed.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_missing_scheme() {
        for raw in ["", "github.com/user/repo", "user/repo"] {
            assert!(
                matches!(validate_url_format(raw), Err(UrlError::MissingScheme { .. })),
                "{raw:?} should need a scheme"
            );
        }
    }

    #[test]
    fn test_unsupported_scheme() {
        for raw in [
            "ftp://github.com/user/repo",
            "http://github.com/user/repo",
            "file:///tmp/registry",
            "ssh://git@github.com/user/repo",
        ] {
            assert!(
                matches!(validate_url_format(raw), Err(UrlError::UnsupportedScheme { .. })),
                "{raw} should be rejected as unsupported"
            );
        }
    }

    #[test]
    fn test_https_shapes() {
        assert_eq!(
            validate_url_format("https://github.com/user/repo"),
            Ok(UrlKind::Https)
        );
        assert_eq!(
            validate_url_format("https://github.com/user/repo.git"),
            Ok(UrlKind::Https)
        );
        assert_eq!(
            validate_url_format("https://gitlab.com/group/sub/repo"),
            Ok(UrlKind::Https)
        );
        assert_eq!(
            validate_url_format("https://git.example.com/repo"),
            Ok(UrlKind::Https)
        );

        assert!(matches!(
            validate_url_format("https://github.com/user"),
            Err(UrlError::InsufficientPath { .. })
        ));
        assert!(matches!(
            validate_url_format("https://github.com/user/repo@bad"),
            Err(UrlError::InvalidRepository { ref repository, .. }) if repository == "repo@bad"
        ));
        assert!(matches!(
            validate_url_format("https://bitbucket.org/te am/repo"),
            Err(UrlError::InvalidOwner { .. })
        ));
        assert!(matches!(
            validate_url_format("https://github.com/"),
            Err(UrlError::MissingPath { .. })
        ));
        assert!(matches!(
            validate_url_format("https:///user/repo"),
            Err(UrlError::MissingHost { .. })
        ));
    }

    #[test]
    fn test_ssh_shapes() {
        assert_eq!(
            validate_url_format("git@github.com:user/repo.git"),
            Ok(UrlKind::Ssh)
        );
        assert_eq!(
            validate_url_format("git@git.internal:team/registry"),
            Ok(UrlKind::Ssh)
        );

        for raw in ["git@github.com/user/repo", "git@:user/repo", "git@github.com:"] {
            assert!(
                matches!(validate_url_format(raw), Err(UrlError::InvalidSsh { .. })),
                "{raw} should be rejected"
            );
        }
    }

    #[test]
    fn test_candidate_endpoints() {
        assert_eq!(
            candidate_endpoints("https://github.com/user/repo"),
            vec![
                "https://github.com/user/repo",
                "https://github.com/user/repo.git",
                "https://github.com/user/repo.git/info/refs",
                "https://github.com/user/repo/info/refs",
            ]
        );

        assert_eq!(
            candidate_endpoints("https://github.com/user/repo.git"),
            vec![
                "https://github.com/user/repo.git",
                "https://github.com/user/repo.git/info/refs",
                "https://github.com/user/repo/info/refs",
                "https://github.com/user/repo",
            ]
        );
    }

    #[tokio::test]
    async fn test_format_only_skips_network() {
        let validator = UrlValidator::format_only(Logger::disabled());

        assert_eq!(
            validator
                .validate_url("https://github.com/shellify/does-not-matter")
                .await,
            Ok(UrlKind::Https)
        );
        assert!(validator.validate_url("ftp://host/repo").await.is_err());
    }

    #[test]
    fn test_derive_registry_name() {
        assert_eq!(derive_registry_name("https://github.com/user/my-modules.git"), "my-modules");
        assert_eq!(derive_registry_name("https://github.com/user/my-modules/"), "my-modules");
        assert_eq!(derive_registry_name("git@github.com:user/dotfiles.git"), "dotfiles");
        assert_eq!(derive_registry_name("https://git.example.com"), "git.example.com");
        assert_eq!(derive_registry_name("https://host/team/my_repo@v2"), "my_repo-v2");
        assert_eq!(derive_registry_name("--"), "registry");
        assert_eq!(derive_registry_name("https://github.com/user/.hidden"), "hidden");
    }
}
