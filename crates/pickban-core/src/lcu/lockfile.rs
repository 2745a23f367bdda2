// Lockfile discovery and parsing.
//
// While running, the game client writes `name:pid:port:password:protocol`
// into a lockfile in its install directory. The port and password are all we
// need to reach its local API.

use base64::engine::general_purpose;
use base64::Engine;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// File names the client has used for its lockfile, in lookup order.
pub const LOCKFILE_NAMES: [&str; 3] = ["lockfile", "LeagueClientUx.lockfile", "LeagueClient.lockfile"];

/// User name the local API expects in Basic auth.
const AUTH_USER: &str = "riot";

#[derive(Debug, Error)]
pub enum LockfileError {
    #[error("no lockfile found in {dir} (is the client running?)")]
    NotFound { dir: PathBuf },

    #[error("malformed lockfile {path}: {message}")]
    Malformed { path: PathBuf, message: String },
}

/// Connection details read from a lockfile.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LockfileCredentials {
    pub process_name: String,
    pub pid: u32,
    pub port: u16,
    pub password: String,
    pub protocol: String,
    /// Where the credentials were read from; the file disappears when the
    /// client exits.
    pub path: PathBuf,
}

impl LockfileCredentials {
    /// Parse the content of a lockfile.
    pub fn parse(content: &str, path: &Path) -> Result<Self, LockfileError> {
        let malformed = |message: String| LockfileError::Malformed {
            path: path.to_path_buf(),
            message,
        };

        let parts: Vec<&str> = content.trim().split(':').collect();
        if parts.len() < 5 {
            return Err(malformed(format!(
                "expected 5 colon-separated fields, got {}",
                parts.len()
            )));
        }

        let pid = parts[1]
            .parse::<u32>()
            .map_err(|e| malformed(format!("invalid pid `{}`: {e}", parts[1])))?;
        let port = parts[2]
            .parse::<u16>()
            .map_err(|e| malformed(format!("invalid port `{}`: {e}", parts[2])))?;
        if parts[3].is_empty() {
            return Err(malformed("empty password".into()));
        }

        Ok(Self {
            process_name: parts[0].to_string(),
            pid,
            port,
            password: parts[3].to_string(),
            protocol: parts[4].to_string(),
            path: path.to_path_buf(),
        })
    }

    /// Value for the `Authorization` header.
    pub fn auth_header(&self) -> String {
        let token = general_purpose::STANDARD.encode(format!("{AUTH_USER}:{}", self.password));
        format!("Basic {token}")
    }

    /// Base URL of the local REST API.
    pub fn base_url(&self) -> String {
        format!("https://127.0.0.1:{}", self.port)
    }

    /// URL of the local WebSocket endpoint.
    pub fn ws_url(&self) -> String {
        format!("wss://127.0.0.1:{}/", self.port)
    }
}

/// Read the first lockfile found in `install_dir`.
pub fn read_lockfile(install_dir: &Path) -> Result<LockfileCredentials, LockfileError> {
    for name in LOCKFILE_NAMES {
        let path = install_dir.join(name);
        if let Ok(content) = std::fs::read_to_string(&path) {
            return LockfileCredentials::parse(&content, &path);
        }
    }
    Err(LockfileError::NotFound {
        dir: install_dir.to_path_buf(),
    })
}
