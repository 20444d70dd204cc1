// Copyright 2026 The ChromiumOS Authors
// Use of this source code is governed by a BSD-style license that can be
// found in the LICENSE file.

use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::Context;
use anyhow::Result;
use argh::FromArgs;
use log::LevelFilter;
use omx::fake::FakeCore;
use omx::native::OmxCore;
use omx::Core;
use omx_conformance::config::TestConfig;
use omx_conformance::report::TestOutcome;
use omx_conformance::scenarios;

#[derive(Debug, FromArgs)]
/// omx_conformance
pub struct Args {
    /// path of the OpenMAX IL core library. The built-in fake core is used when omitted.
    #[argh(option)]
    pub core: Option<PathBuf>,
    /// component to test. May be repeated. (default: every component of the core)
    #[argh(option, short = 'c')]
    pub component: Vec<String>,
    /// test to run. May be repeated. (default: all tests)
    #[argh(option, short = 't')]
    pub test: Vec<String>,
    /// JSON file overriding the default timeouts and limits
    #[argh(option)]
    pub cfg: Option<PathBuf>,
    /// list the components and tests instead of running them
    #[argh(switch)]
    pub list: bool,
    /// whether or not to print in json format
    #[argh(switch)]
    pub json: bool,
    /// whether or not to print the debug messages
    #[argh(switch)]
    pub debug: bool,
}

fn init_logging(debug: bool) {
    let mut builder = env_logger::Builder::new();
    if debug {
        builder.filter_level(LevelFilter::Debug);
    } else {
        builder.filter_level(LevelFilter::Info);
        if let Ok(filters) = std::env::var("RUST_LOG") {
            builder.parse_filters(&filters);
        }
    }
    builder.init();
}

fn open_core(path: Option<&PathBuf>) -> Result<Box<dyn Core>> {
    Ok(match path {
        Some(path) => Box::new(
            OmxCore::load(path)
                .with_context(|| format!("failed to load core {}", path.display()))?,
        ),
        None => Box::new(FakeCore::default()),
    })
}

fn print_outcomes(outcomes: &[TestOutcome], json: bool) -> Result<()> {
    if json {
        println!("{}", serde_json::to_string_pretty(outcomes)?);
    } else {
        for outcome in outcomes {
            println!("{}", outcome);
        }
        let failed = outcomes.iter().filter(|o| !o.passed).count();
        println!("{} passed, {} failed", outcomes.len() - failed, failed);
    }
    Ok(())
}

fn run(args: Args) -> Result<bool> {
    let config = match &args.cfg {
        Some(path) => TestConfig::load(path)?,
        None => TestConfig::default(),
    };
    let core = open_core(args.core.as_ref())?;
    let components = if args.component.is_empty() {
        core.component_names()
            .context("failed to enumerate components")?
    } else {
        args.component
    };

    if args.list {
        println!("components:");
        for name in &components {
            println!("  {}", name);
        }
        println!("tests:");
        for case in scenarios::TESTS {
            println!("  {:<24} {}", case.name, case.description);
        }
        return Ok(true);
    }

    let tests: Vec<String> = if args.test.is_empty() {
        scenarios::TESTS.iter().map(|t| t.name.to_owned()).collect()
    } else {
        args.test
    };
    let mut outcomes = Vec::new();
    for component in &components {
        for test in &tests {
            outcomes.push(scenarios::run_one(core.as_ref(), component, test, &config));
        }
    }
    print_outcomes(&outcomes, args.json)?;
    Ok(outcomes.iter().all(|o| o.passed))
}

fn main() -> Result<ExitCode> {
    let args: Args = argh::from_env();
    init_logging(args.debug);
    Ok(if run(args)? {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    })
}
