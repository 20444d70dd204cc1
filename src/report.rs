// Copyright 2026 The ChromiumOS Authors
// Use of this source code is governed by a BSD-style license that can be
// found in the LICENSE file.

use std::fmt;
use std::time::Duration;

use serde::Serialize;

use crate::error::Error;
use crate::error::ErrorKind;

/// Result of running one test against one component.
#[derive(Clone, Debug, Serialize)]
pub struct TestOutcome {
    pub component: String,
    pub test: String,
    pub passed: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub kind: Option<ErrorKind>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    pub duration_ms: u128,
}

impl TestOutcome {
    pub fn new(
        component: &str,
        test: &str,
        result: &Result<(), Error>,
        elapsed: Duration,
    ) -> TestOutcome {
        let (kind, message) = match result {
            Ok(()) => (None, None),
            Err(e) => (Some(e.kind()), Some(e.to_string())),
        };
        TestOutcome {
            component: component.to_owned(),
            test: test.to_owned(),
            passed: result.is_ok(),
            kind,
            message,
            duration_ms: elapsed.as_millis(),
        }
    }
}

impl fmt::Display for TestOutcome {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let verdict = if self.passed { "PASS" } else { "FAIL" };
        write!(
            f,
            "{} {} {} ({} ms)",
            verdict, self.component, self.test, self.duration_ms
        )?;
        if let (Some(kind), Some(message)) = (self.kind, &self.message) {
            write!(f, ": {:?}: {}", kind, message)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn failure_is_classified() {
        let outcome = TestOutcome::new(
            "OMX.vendor.dec",
            "PortCommunicationTest",
            &Err(Error::Timeout("StateSet(Idle)")),
            Duration::from_millis(12),
        );
        assert!(!outcome.passed);
        assert_eq!(outcome.kind, Some(ErrorKind::Timeout));
        assert_eq!(
            outcome.to_string(),
            "FAIL OMX.vendor.dec PortCommunicationTest (12 ms): Timeout: timed out waiting for StateSet(Idle)"
        );
        let json = serde_json::to_value(&outcome).unwrap();
        assert_eq!(json["kind"], "timeout");
    }

    #[test]
    fn pass_omits_details() {
        let outcome = TestOutcome::new("c", "t", &Ok(()), Duration::ZERO);
        let json = serde_json::to_value(&outcome).unwrap();
        assert_eq!(json["passed"], true);
        assert!(json.get("kind").is_none());
        assert_eq!(outcome.to_string(), "PASS c t (0 ms)");
    }
}
