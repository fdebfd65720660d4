//! GitHub token classification
//!
//! GitHub installation tokens and user tokens need different `Authorization`
//! schemes. The only reliable signal GitHub gives is the token prefix, so the
//! check lives here and nowhere else. Revisit if GitHub changes its token
//! formats.

use relaygate_domain::constants::GITHUB_INSTALLATION_TOKEN_PREFIX;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GitHubTokenKind {
    /// OAuth user-to-server token (`gho_`, `ghu_`, legacy hex).
    UserToken,
    /// GitHub App installation access token (`ghs_`).
    InstallationToken,
}

impl GitHubTokenKind {
    /// Scheme for the `Authorization` header.
    pub fn auth_scheme(self) -> &'static str {
        match self {
            Self::UserToken => "Bearer",
            Self::InstallationToken => "token",
        }
    }

    /// Full `Authorization` header value for `token`.
    pub fn authorization(self, token: &str) -> String {
        format!("{} {token}", self.auth_scheme())
    }
}

pub fn classify_github_token(token: &str) -> GitHubTokenKind {
    if token.starts_with(GITHUB_INSTALLATION_TOKEN_PREFIX) {
        GitHubTokenKind::InstallationToken
    } else {
        GitHubTokenKind::UserToken
    }
}
