// Copyright 2026 The ChromiumOS Authors
// Use of this source code is governed by a BSD-style license that can be
// found in the LICENSE file.

use std::sync::Arc;
use std::time::Duration;

use log::debug;
use log::error;
use log::warn;
use omx::Command;
use omx::Component;
use omx::Core;
use omx::Direction;
use omx::OmxError;
use omx::PortDefinition;
use omx::PortDomain;
use omx::PortParam;
use omx::State;

use crate::allocation::deinit_buffers;
use crate::callbacks::CallbackAdapter;
use crate::callbacks::SharedState;
use crate::config::TestConfig;
use crate::error::CallResult;
use crate::error::Error;
use crate::error::Result;
use crate::transition::transition_to;
use crate::ttc::TunnelTestComponent;
use crate::ttc::TTC_PORT;
use crate::wait::Expect;

/// Keeps the first error of a sequence of steps and logs the ones it masks.
#[derive(Default)]
pub struct FirstError(Option<Error>);

impl FirstError {
    pub fn note(&mut self, result: Result<()>) {
        if let Err(e) = result {
            if self.0.is_none() {
                self.0 = Some(e);
            } else {
                warn!("masked by an earlier failure: {}", e);
            }
        }
    }

    pub fn into_result(self) -> Result<()> {
        match self.0 {
            None => Ok(()),
            Some(e) => Err(e),
        }
    }
}

struct Tunnel {
    port: u32,
    peer: Arc<TunnelTestComponent>,
}

/// Everything one test holds for one instance of the component under test.
pub struct TestContext {
    pub component: Arc<dyn Component>,
    pub shared: Arc<SharedState>,
    pub config: TestConfig,
    /// Port range of every domain, as reported when the context was created.
    pub params: Vec<(PortDomain, PortParam)>,
    ports: Vec<PortDefinition>,
    tunnels: Vec<Tunnel>,
    torn_down: bool,
}

impl TestContext {
    /// Instantiates `name` on `core` and discovers its ports.
    pub fn new(core: &dyn Core, name: &str, config: &TestConfig) -> Result<TestContext> {
        let shared = Arc::new(SharedState::new());
        let adapter = Arc::new(CallbackAdapter::new(Arc::clone(&shared)));
        let component = core.get_handle(name, adapter).call("GetHandle")?;
        shared.bind(component.id());

        let mut params = Vec::new();
        for domain in PortDomain::ALL {
            match component.port_param(domain) {
                Ok(param) => params.push((domain, param)),
                // Components are free not to implement domains they have no ports in.
                Err(OmxError::UnsupportedIndex) | Err(OmxError::NotImplemented) => {
                    params.push((domain, PortParam::default()))
                }
                Err(error) => {
                    return Err(Error::ComponentCall {
                        call: "GetParameter(PortInit)",
                        error,
                    })
                }
            }
        }
        let mut context = TestContext {
            component,
            shared,
            config: config.clone(),
            params,
            ports: Vec::new(),
            tunnels: Vec::new(),
            torn_down: false,
        };
        context.refresh_ports()?;
        debug!(
            "{}: {} ports: {:?}",
            name,
            context.ports.len(),
            context.ports.iter().map(|p| p.index).collect::<Vec<_>>()
        );
        Ok(context)
    }

    pub fn name(&self) -> &str {
        self.component.name()
    }

    /// Re-reads every port definition from the component.
    pub fn refresh_ports(&mut self) -> Result<()> {
        let mut ports = Vec::new();
        for (_, param) in &self.params {
            for index in param.ports() {
                ports.push(
                    self.component
                        .port_definition(index)
                        .call("GetParameter(PortDefinition)")?,
                );
            }
        }
        self.ports = ports;
        Ok(())
    }

    pub fn ports(&self) -> &[PortDefinition] {
        &self.ports
    }

    /// Indices of the ports facing `direction`.
    pub fn ports_in(&self, direction: Direction) -> Vec<u32> {
        self.ports
            .iter()
            .filter(|p| p.direction == direction)
            .map(|p| p.index)
            .collect()
    }

    pub fn timeout(&self, expect: Expect) -> Duration {
        match expect {
            Expect::Success => self.config.success_timeout(),
            Expect::Failure => self.config.failure_timeout(),
        }
    }

    pub fn state(&self) -> Result<State> {
        self.component.get_state().call("GetState")
    }

    pub fn exchanges(&self) -> u64 {
        self.shared.status.lock().exchanges
    }

    /// Tunnels output `port` to `peer`. The component supplies the buffers of that port from now
    /// on, so the driver no longer allocates any for it.
    pub fn tunnel_to(
        &mut self,
        core: &dyn Core,
        port: u32,
        peer: Arc<TunnelTestComponent>,
    ) -> Result<()> {
        let input: Arc<dyn Component> = peer.clone();
        core.setup_tunnel(&self.component, port, &input, TTC_PORT)
            .call("SetupTunnel")?;
        self.tunnels.push(Tunnel { port, peer });
        Ok(())
    }

    pub fn is_tunneled(&self, port: u32) -> bool {
        self.tunnels.iter().any(|t| t.port == port)
    }

    /// Makes every tunnel peer return the buffers it is holding and stop withholding.
    pub fn release_peers(&self) {
        for tunnel in &self.tunnels {
            tunnel.peer.set_withhold(false);
            match tunnel.peer.release_held() {
                Ok(0) => {}
                Ok(n) => debug!("peer of port {} released {} buffers", tunnel.port, n),
                Err(e) => warn!("peer of port {} failed to release buffers: {}", tunnel.port, e),
            }
        }
    }

    /// Returns the component to Loaded and frees every buffer. Every step is attempted; the
    /// first failure is returned. Calling it again does nothing.
    pub fn teardown(&mut self) -> Result<()> {
        if self.torn_down {
            return Ok(());
        }
        self.torn_down = true;
        debug!("{}: teardown", self.name());
        let mut first = FirstError::default();
        self.release_peers();

        if let Ok(State::Executing) | Ok(State::Pause) = self.state() {
            first.note(transition_to(self, State::Idle));
        }
        if let Ok(State::Idle) | Ok(State::WaitForResources) = self.state() {
            first.note(transition_to(self, State::Loaded));
        }
        match self.state() {
            Ok(State::Loaded) | Ok(State::Invalid) => {}
            Ok(state) => {
                error!("{}: stuck in {}, forcing Invalid", self.name(), state);
                if let Err(e) = self
                    .component
                    .send_command(Command::StateSet(State::Invalid))
                {
                    warn!("{}: StateSet(Invalid) failed: {}", self.name(), e);
                }
            }
            Err(e) => first.note(Err(e)),
        }
        first.note(deinit_buffers(self));
        first.into_result()
    }

    /// Tears down and returns `result`, or the teardown failure if `result` is `Ok`.
    pub fn finish(mut self, result: Result<()>) -> Result<()> {
        let cleanup = self.teardown();
        if let (Err(e), Err(c)) = (&result, &cleanup) {
            warn!("{}: teardown failed after \"{}\": {}", self.name(), e, c);
        }
        result.and(cleanup)
    }
}

impl Drop for TestContext {
    fn drop(&mut self) {
        if let Err(e) = self.teardown() {
            warn!("{}: teardown on drop failed: {}", self.name(), e);
        }
    }
}
