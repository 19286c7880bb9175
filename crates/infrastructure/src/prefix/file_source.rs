use async_trait::async_trait;
use nat64dns_application::ports::PrefixSource;
use nat64dns_domain::config::Dns64Config;
use nat64dns_domain::{DomainError, Nat64Prefix};
use std::path::{Path, PathBuf};
use tokio::fs::File;
use tokio::io::{AsyncBufReadExt, AsyncReadExt, BufReader};
use tracing::{debug, warn};

/// Reads the NAT64 prefix from a text file confined to an allowed root.
///
/// Every load canonicalizes both the root and the configured path, so a
/// symlink swapped in after startup is caught the same way a `../` path is.
/// At most `max_file_bytes` are read; a line cut off by that bound is
/// ignored.
pub struct FilePrefixSource {
    path: PathBuf,
    allowed_root: PathBuf,
    max_file_bytes: u64,
}

impl FilePrefixSource {
    pub fn new(
        path: impl Into<PathBuf>,
        allowed_root: impl Into<PathBuf>,
        max_file_bytes: u64,
    ) -> Self {
        Self {
            path: path.into(),
            allowed_root: allowed_root.into(),
            max_file_bytes,
        }
    }

    pub fn from_config(config: &Dns64Config) -> Self {
        Self::new(
            config.prefix_file_path.clone(),
            config.allowed_root.clone(),
            config.max_file_bytes,
        )
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Canonical path of the prefix file, or `PathTraversalRejected` when it
    /// lies outside the canonical allowed root.
    pub async fn resolve_path(&self) -> Result<PathBuf, DomainError> {
        let root = tokio::fs::canonicalize(&self.allowed_root)
            .await
            .map_err(|e| read_error(&self.allowed_root, e))?;
        let resolved = tokio::fs::canonicalize(&self.path)
            .await
            .map_err(|e| read_error(&self.path, e))?;

        if !resolved.starts_with(&root) {
            return Err(DomainError::PathTraversalRejected {
                path: resolved.display().to_string(),
                root: root.display().to_string(),
            });
        }
        Ok(resolved)
    }
}

#[async_trait]
impl PrefixSource for FilePrefixSource {
    async fn load(&self) -> Result<Nat64Prefix, DomainError> {
        let path = self.resolve_path().await?;
        let file = File::open(&path).await.map_err(|e| read_error(&path, e))?;
        // One byte past the limit tells a cut line from a file that ends there.
        let mut reader = BufReader::new(file.take(self.max_file_bytes.saturating_add(1)));

        let mut buf = Vec::new();
        let mut consumed: u64 = 0;
        let mut line_number = 0usize;

        loop {
            buf.clear();
            let n = reader
                .read_until(b'\n', &mut buf)
                .await
                .map_err(|e| read_error(&path, e))?;
            if n == 0 {
                break;
            }
            consumed += n as u64;
            line_number += 1;

            if consumed > self.max_file_bytes {
                let only_newline_over =
                    consumed - self.max_file_bytes == 1 && buf.ends_with(b"\n");
                if !only_newline_over {
                    debug!(
                        path = %path.display(),
                        line = line_number,
                        max_bytes = self.max_file_bytes,
                        "Discarding line cut off by read limit"
                    );
                    break;
                }
            }

            let line = std::str::from_utf8(&buf).map_err(|e| DomainError::PrefixFileRead {
                path: path.display().to_string(),
                reason: format!("line {}: {}", line_number, e),
            })?;

            match Nat64Prefix::parse_line(line) {
                Ok(Some(prefix)) => {
                    debug!(
                        path = %path.display(),
                        line = line_number,
                        prefix = %prefix,
                        "NAT64 prefix read"
                    );
                    return Ok(prefix);
                }
                Ok(None) => {}
                Err(e) if looks_like_prefix(line) => {
                    warn!(
                        path = %path.display(),
                        line = line_number,
                        error = %e,
                        "Skipping invalid prefix line"
                    );
                }
                Err(e) => {
                    debug!(
                        path = %path.display(),
                        line = line_number,
                        error = %e,
                        "Skipping non-prefix line"
                    );
                }
            }
        }

        Err(DomainError::NoPrefixFound(path.display().to_string()))
    }

    fn describe(&self) -> String {
        self.path.display().to_string()
    }
}

/// Lines worth a warning when they fail to parse: a `prefix` directive or a
/// bare IPv6 token. Other tayga directives are expected in the file.
fn looks_like_prefix(line: &str) -> bool {
    match line.split_whitespace().next() {
        Some("prefix") => true,
        Some(token) => token.contains(':'),
        None => false,
    }
}

fn read_error(path: &Path, e: std::io::Error) -> DomainError {
    DomainError::PrefixFileRead {
        path: path.display().to_string(),
        reason: e.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tayga_directives_are_not_prefix_candidates() {
        for line in [
            "tun-device nat64\n",
            "ipv4-addr 192.168.255.1",
            "dynamic-pool 192.168.255.0/24",
            "data-dir /var/db/tayga",
        ] {
            assert!(!looks_like_prefix(line), "{}", line);
        }
    }

    #[test]
    fn test_prefix_shaped_lines_are_candidates() {
        assert!(looks_like_prefix("prefix 64:ff9b::"));
        assert!(looks_like_prefix("  2001:db8::/129"));
        assert!(looks_like_prefix("prefix"));
    }
}
