use std::fs;
use std::path::Path;
use url::Url;

/// Basic-auth credentials read from the auth config file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BasicAuth {
    pub username: String,
    pub password: String,
}

/// Connection settings for one job invocation, built once from the command
/// line and never mutated afterwards.
#[derive(Debug, Clone)]
pub struct ClusterConnectionConfig {
    pub host: String,
    pub port: u16,
    pub protocol: String,
    pub credentials: Option<BasicAuth>,
}

impl ClusterConnectionConfig {
    pub fn base_url(&self) -> anyhow::Result<Url> {
        let url =
            format!("{}://{}:{}", self.protocol, self.host, self.port);
        Ok(Url::parse(&url)?)
    }

    pub fn endpoint(&self) -> String {
        format!("{}://{}:{}", self.protocol, self.host, self.port)
    }
}

/// Read USERNAME/PASSWORD from a key-value config file.
///
/// An unreadable file or a file missing either key means an unauthenticated
/// connection, which is the normal case on clusters without security
/// enabled. Never fatal.
pub fn load_auth_file(path: &Path) -> Option<BasicAuth> {
    let contents = match fs::read_to_string(path) {
        Ok(contents) => contents,
        Err(e) => {
            log::debug!(
                "auth config {} not readable ({}), connecting without \
                 credentials",
                path.display(),
                e
            );
            return None;
        }
    };
    let auth = parse_auth_file(&contents);
    if auth.is_none() {
        log::debug!(
            "auth config {} is missing USERNAME or PASSWORD, connecting \
             without credentials",
            path.display()
        );
    }
    auth
}

fn parse_auth_file(contents: &str) -> Option<BasicAuth> {
    let mut username = None;
    let mut password = None;

    for line in contents.lines() {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        let (key, value) = match line.split_once('=') {
            Some(pair) => pair,
            None => continue,
        };
        let value =
            value.trim().trim_matches('"').trim_matches('\'').to_string();
        match key.trim() {
            "USERNAME" => username = Some(value),
            "PASSWORD" => password = Some(value),
            _ => {}
        }
    }

    Some(BasicAuth {
        username: username?,
        password: password?,
    })
}
