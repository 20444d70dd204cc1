// Copyright 2026 The ChromiumOS Authors
// Use of this source code is governed by a BSD-style license that can be
// found in the LICENSE file.

use std::fs;
use std::path::Path;
use std::path::PathBuf;
use std::time::Duration;

use serde::Deserialize;
use serde::Serialize;

use crate::error::Error;
use crate::error::Result;

/// Who allocates the memory behind the buffers of non-tunneled ports.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BufferSource {
    /// The driver allocates and lends it with `UseBuffer`.
    #[default]
    Driver,
    /// The component allocates it in `AllocateBuffer`.
    Component,
}

/// Tunables shared by every scenario.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct TestConfig {
    /// Bound on waits that are expected to complete.
    pub success_timeout_ms: u64,
    /// Bound on waits that are expected to expire.
    pub failure_timeout_ms: u64,
    /// Longest tolerated silence while buffers are in flight.
    pub traffic_timeout_ms: u64,
    /// Completed buffer exchanges required per traffic run.
    pub traffic_quota: u64,
    /// Most instances created by the multi-instance scenarios.
    pub max_instances: usize,
    /// Unload/reload cycles run at the resource boundary.
    pub exhaustion_iterations: usize,
    pub buffer_source: BufferSource,
    /// Input stream fed to input ports; a generated pattern is used when absent.
    pub input_file: Option<PathBuf>,
}

impl Default for TestConfig {
    fn default() -> TestConfig {
        TestConfig {
            success_timeout_ms: 500,
            failure_timeout_ms: 1000,
            traffic_timeout_ms: 5000,
            traffic_quota: 100,
            max_instances: 16,
            exhaustion_iterations: 4,
            buffer_source: BufferSource::Driver,
            input_file: None,
        }
    }
}

impl TestConfig {
    /// Reads a JSON config file. Missing fields take their default values.
    pub fn load(path: &Path) -> Result<TestConfig> {
        let contents = fs::read_to_string(path).map_err(|source| Error::ConfigRead {
            path: path.to_owned(),
            source,
        })?;
        serde_json::from_str(&contents).map_err(Error::ConfigParse)
    }

    pub fn success_timeout(&self) -> Duration {
        Duration::from_millis(self.success_timeout_ms)
    }

    pub fn failure_timeout(&self) -> Duration {
        Duration::from_millis(self.failure_timeout_ms)
    }

    pub fn traffic_timeout(&self) -> Duration {
        Duration::from_millis(self.traffic_timeout_ms)
    }
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use tempfile::NamedTempFile;

    use super::*;

    #[test]
    fn partial_file_keeps_defaults() {
        let mut file = NamedTempFile::new().unwrap();
        write!(
            file,
            r#"{{"traffic_quota": 7, "buffer_source": "component"}}"#
        )
        .unwrap();
        let config = TestConfig::load(file.path()).unwrap();
        assert_eq!(config.traffic_quota, 7);
        assert_eq!(config.buffer_source, BufferSource::Component);
        assert_eq!(config.success_timeout(), Duration::from_millis(500));
        assert_eq!(config.max_instances, 16);
    }

    #[test]
    fn unknown_field_is_rejected() {
        let mut file = NamedTempFile::new().unwrap();
        write!(file, r#"{{"traffic_qouta": 7}}"#).unwrap();
        assert!(matches!(
            TestConfig::load(file.path()),
            Err(Error::ConfigParse(_))
        ));
    }

    #[test]
    fn missing_file() {
        let dir = tempfile::tempdir().unwrap();
        assert!(matches!(
            TestConfig::load(&dir.path().join("absent.json")),
            Err(Error::ConfigRead { .. })
        ));
    }
}
