// MemGator timemap lookups through `docker container run`.

use std::time::Duration;

use async_trait::async_trait;
use tracing::{debug, warn};

use crate::error::LookupError;
use crate::timemap::TimemapLookup;

/// Upper bound on one MemGator run. Aggregating every archive for a popular
/// URI is slow; past this point the URI gets a placeholder.
const LOOKUP_TIMEOUT: Duration = Duration::from_secs(120);

pub struct MemgatorLookup {
    program: String,
    image: String,
    timeout: Duration,
}

impl MemgatorLookup {
    pub fn new(image: &str) -> Self {
        Self {
            program: "docker".to_string(),
            image: image.to_string(),
            timeout: LOOKUP_TIMEOUT,
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Replace `docker` with another launcher. The image/format/uri arguments
    /// are passed unchanged.
    pub fn with_program(mut self, program: &str) -> Self {
        self.program = program.to_string();
        self
    }

    fn args<'a>(&'a self, uri: &'a str) -> Vec<&'a str> {
        vec![
            "container",
            "run",
            "--rm",
            self.image.as_str(),
            "--format=JSON",
            uri,
        ]
    }
}

#[async_trait]
impl TimemapLookup for MemgatorLookup {
    async fn lookup(&self, uri: &str) -> Result<String, LookupError> {
        debug!(uri, image = self.image.as_str(), "memgator: running lookup");

        let result = tokio::time::timeout(
            self.timeout,
            tokio::process::Command::new(&self.program)
                .args(self.args(uri))
                .kill_on_drop(true)
                .output(),
        )
        .await;

        match result {
            Ok(Ok(output)) if output.status.success() => {
                Ok(String::from_utf8_lossy(&output.stdout).into_owned())
            }
            Ok(Ok(output)) => {
                let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();
                warn!(uri, code = ?output.status.code(), stderr = %stderr, "memgator exited with error");
                Err(LookupError::Exit {
                    code: output.status.code(),
                    stderr,
                })
            }
            Ok(Err(e)) => Err(LookupError::Spawn(e)),
            Err(_) => Err(LookupError::Timeout(self.timeout)),
        }
    }
}

/// Cut the JSON document out of MemGator's stdout, which may carry log lines
/// before and after it. `None` when there is no `{ ... }` span.
pub fn extract_json(output: &str) -> Option<&str> {
    let start = output.find('{')?;
    let end = output.rfind('}')?;
    if end < start {
        return None;
    }
    Some(&output[start..=end])
}
