//! `cf dev stop`: tear down every component of the local environment.
//!
//! All six steps always run, in order. A failing step is logged and
//! recorded; the first failure in step order is what the caller sees.

use crate::analytics::{self, Analytics, EventLog};
use crate::cfdevd::CfdevdClient;
use crate::config::Config;
use crate::error::{BoxError, StepError, StopError, TeardownStep};
use crate::hostnet::HostNet;
use crate::linuxkit::LinuxKit;
use crate::vpnkit::VpnKit;
use std::error::Error;

pub trait Hypervisor {
    fn stop(&self) -> Result<(), BoxError>;
    fn destroy(&self) -> Result<(), BoxError>;
}

pub trait Proxy {
    fn stop(&self) -> Result<(), BoxError>;
    fn destroy(&self) -> Result<(), BoxError>;
}

pub trait DaemonClient {
    /// Returns a diagnostic string from the daemon.
    fn uninstall(&self) -> Result<String, BoxError>;
}

pub trait AliasManager {
    fn remove_loopback_aliases(&self, director_ip: &str, router_ip: &str) -> Result<(), BoxError>;
}

pub fn run() -> Result<(), Box<dyn Error>> {
    let config = Config::load()?;
    let linuxkit = LinuxKit::new(&config.state_dir);
    let vpnkit = VpnKit::new(&config.state_dir);
    let cfdevd = CfdevdClient::default();
    let analytics = EventLog::new(&config);

    log::info!("Stopping cf dev...");
    let stop = Stop {
        config: &config,
        linuxkit: &linuxkit,
        vpnkit: &vpnkit,
        cfdevd: &cfdevd,
        hostnet: &HostNet,
        analytics: &analytics,
    };
    if let Err(err) = stop.execute() {
        log::debug!("Teardown finished; first failed step: {:?}", err.step());
        return Err(err.into());
    }
    log::info!("cf dev stopped");
    Ok(())
}

pub struct Stop<'a> {
    pub config: &'a Config,
    pub linuxkit: &'a dyn Hypervisor,
    pub vpnkit: &'a dyn Proxy,
    pub cfdevd: &'a dyn DaemonClient,
    pub hostnet: &'a dyn AliasManager,
    pub analytics: &'a dyn Analytics,
}

impl Stop<'_> {
    pub fn execute(&self) -> Result<(), StopError> {
        self.analytics.event(analytics::STOP);

        let mut outcome = Outcome::default();
        for step in TeardownStep::ALL {
            log::debug!("Running step: {}", step);
            let result = self.run_step(step);
            if let Err(err) = &result {
                log::warn!("Failed to {}: {}", step, err);
            }
            outcome.record(step, result);
        }
        outcome.resolve()
    }

    fn run_step(&self, step: TeardownStep) -> Result<(), BoxError> {
        match step {
            TeardownStep::StopLinuxKit => self.linuxkit.stop(),
            TeardownStep::DestroyLinuxKit => self.linuxkit.destroy(),
            TeardownStep::StopVpnKit => self.vpnkit.stop(),
            TeardownStep::DestroyVpnKit => self.vpnkit.destroy(),
            TeardownStep::UninstallCfdevd => self
                .cfdevd
                .uninstall()
                .map(|out| log::debug!("cfdevd uninstall: {}", out)),
            TeardownStep::RemoveAliases => self.hostnet.remove_loopback_aliases(
                &self.config.bosh_director_ip,
                &self.config.cf_router_ip,
            ),
        }
    }
}

/// Per-step results, indexed by step.
#[derive(Default)]
struct Outcome {
    errors: [Option<BoxError>; TeardownStep::ALL.len()],
}

impl Outcome {
    fn record(&mut self, step: TeardownStep, result: Result<(), BoxError>) {
        self.errors[step.index()] = result.err();
    }

    /// First failure in step order, if any.
    fn resolve(self) -> Result<(), StopError> {
        let first = TeardownStep::ALL
            .into_iter()
            .zip(self.errors)
            .find_map(|(step, err)| err.map(|source| StepError { step, source }));
        match first {
            Some(err) => Err(err.into()),
            None => Ok(()),
        }
    }
}
