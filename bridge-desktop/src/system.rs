//! System description via `uname -a`

use async_trait::async_trait;
use bridge_traits::{
    error::{BridgeError, Result},
    metadata::SystemInfoProvider,
};
use tokio::process::Command;
use tokio::sync::OnceCell;
use tracing::debug;

/// Runs `uname -a` once and reuses the answer for the rest of the process.
#[derive(Debug, Default)]
pub struct UnameSystemInfo {
    cached: OnceCell<String>,
}

impl UnameSystemInfo {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl SystemInfoProvider for UnameSystemInfo {
    async fn describe(&self) -> Result<String> {
        let value = self
            .cached
            .get_or_try_init(|| async {
                let output = Command::new("uname")
                    .arg("-a")
                    .kill_on_drop(true)
                    .output()
                    .await?;

                if !output.status.success() {
                    return Err(BridgeError::OperationFailed(format!(
                        "uname exited with {}",
                        output.status
                    )));
                }

                let text = String::from_utf8_lossy(&output.stdout).trim().to_string();
                debug!(system_info = %text, "Cached system description");
                Ok(text)
            })
            .await?;

        Ok(value.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[cfg(unix)]
    #[tokio::test]
    async fn test_describe_is_cached() {
        let info = UnameSystemInfo::new();
        let first = info.describe().await.unwrap();
        let second = info.describe().await.unwrap();

        assert!(!first.is_empty());
        assert_eq!(first, second);
    }
}
