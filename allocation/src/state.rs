use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::time::Duration;

use rand::seq::SliceRandom;
use rand::Rng;

use crate::{
    calculate_metrics, cover, Candidate, Device, DeviceId, DeviceRow, Error, Inputs, Metrics,
    Result, Server, ServerKind, ServerRow, Technology,
};

/// Share of a cloud server's memory and storage demanded by a bottleneck device.
const BOTTLENECK_SHARE: f64 = 0.999_999;

/// Non-service cost of a bottleneck device.
const BOTTLENECK_COST: f64 = 9.9;

/// Complete state of a single run: devices, servers, covered devices, and metrics.
///
/// Cloning produces an independent copy. Only data that never changes after
/// [`State::prepare`] (candidate lists, covered positions, the ID lookup) is shared between
/// clones.
#[derive(Debug, Clone)]
pub struct State {
    devices: Vec<Device>,
    servers: Vec<Server>,
    covered: Arc<[usize]>,
    positions: Arc<HashMap<DeviceId, usize>>,
    metrics: Metrics,
}

fn check_server_ids(rows: &[ServerRow]) -> Result<()> {
    let mut seen = HashSet::new();
    match rows.iter().find(|row| !seen.insert(row.id)) {
        Some(row) => Err(Error::DuplicateServerId(row.id)),
        None => Ok(()),
    }
}

impl State {
    /// Builds the entities from the input tables and runs the coverage engine.
    ///
    /// Edge servers come first in [`State::servers`], followed by cloud servers, each in input
    /// order. The returned state has no assignments, and its metrics are already computed.
    ///
    /// # Errors
    ///
    /// Returns an error if any of the tables is empty, or if IDs repeat within one table.
    pub fn prepare<S: Into<String>>(
        algorithm: S,
        devices: Vec<DeviceRow>,
        edge_servers: Vec<ServerRow>,
        cloud_servers: Vec<ServerRow>,
        technology: Technology,
    ) -> Result<Self> {
        if devices.is_empty() {
            return Err(Error::ZeroDevices);
        }
        if edge_servers.is_empty() {
            return Err(Error::ZeroEdgeServers);
        }
        if cloud_servers.is_empty() {
            return Err(Error::ZeroCloudServers);
        }
        let mut positions = HashMap::with_capacity(devices.len());
        for (position, row) in devices.iter().enumerate() {
            if positions.insert(row.id, position).is_some() {
                return Err(Error::DuplicateDeviceId(row.id));
            }
        }
        check_server_ids(&edge_servers)?;
        check_server_ids(&cloud_servers)?;

        let inputs = Inputs {
            devices: devices.len(),
            servers_ec: edge_servers.len(),
            servers_cc: cloud_servers.len(),
            technology,
        };
        let mut devices: Vec<Device> = devices.into_iter().map(Device::from).collect();
        let mut servers: Vec<Server> = edge_servers
            .into_iter()
            .map(|row| Server::new(row, ServerKind::Edge))
            .chain(
                cloud_servers
                    .into_iter()
                    .map(|row| Server::new(row, ServerKind::Cloud)),
            )
            .collect();
        let coverage = cover(&mut devices, &mut servers, technology);

        let mut metrics = Metrics::new(algorithm, inputs);
        metrics.outputs.devices_covered = coverage.covered.len();
        metrics.outputs.cost_of_non_coverage = coverage.non_coverage_cost;
        calculate_metrics(&devices, &servers, &mut metrics);
        log::info!(
            "Prepared {} devices ({} covered) and {} servers with {}",
            inputs.devices,
            coverage.covered.len(),
            inputs.servers(),
            technology
        );
        Ok(Self {
            devices,
            servers,
            covered: Arc::from(coverage.covered),
            positions: Arc::new(positions),
            metrics,
        })
    }

    /// All devices in input order.
    #[must_use]
    pub fn devices(&self) -> &[Device] {
        &self.devices
    }

    /// Edge servers followed by cloud servers.
    #[must_use]
    pub fn servers(&self) -> &[Server] {
        &self.servers
    }

    /// Positions of covered devices in [`State::devices`].
    #[must_use]
    pub fn covered(&self) -> &[usize] {
        &self.covered
    }

    /// Position of the device with the given ID.
    #[must_use]
    pub fn device_position(&self, id: DeviceId) -> Option<usize> {
        self.positions.get(&id).copied()
    }

    /// Metrics as of the last recalculation.
    #[must_use]
    pub fn metrics(&self) -> &Metrics {
        &self.metrics
    }

    /// Mutable access to metrics, e.g., to change the reported variant.
    pub fn metrics_mut(&mut self) -> &mut Metrics {
        &mut self.metrics
    }

    /// Recomputes metrics from the current allocation.
    pub fn recalculate_metrics(&mut self) {
        calculate_metrics(&self.devices, &self.servers, &mut self.metrics);
    }

    pub(crate) fn add_execution_time(&mut self, elapsed: Duration) {
        self.metrics.outputs.execution_time += elapsed;
    }

    pub(crate) fn device(&self, position: usize) -> &Device {
        &self.devices[position]
    }

    pub(crate) fn server(&self, position: usize) -> &Server {
        &self.servers[position]
    }

    /// Checks capacity of the candidate's server for the device at `device`.
    pub(crate) fn can_serve(&self, device: usize, candidate: &Candidate) -> bool {
        self.servers[candidate.server].can_serve(&self.devices[device])
    }

    /// Assigns the device at position `device` through `candidate`.
    pub(crate) fn assign(&mut self, device: usize, candidate: Candidate) -> bool {
        self.servers[candidate.server].assign(&mut self.devices[device], candidate)
    }

    /// Releases the device at position `device` from its server, if served.
    pub(crate) fn release(&mut self, device: usize) -> bool {
        match self.devices[device].assignment().map(|c| c.server) {
            Some(server) => self.servers[server].release(&mut self.devices[device]),
            None => false,
        }
    }

    /// Overwrites a device and a server with previously taken copies.
    pub(crate) fn restore(&mut self, device: (usize, Device), servers: &[(usize, Server)]) {
        self.devices[device.0] = device.1;
        for (position, server) in servers {
            self.servers[*position] = server.clone();
        }
    }

    /// Drops every assignment.
    pub(crate) fn clear(&mut self) {
        for position in 0..self.devices.len() {
            self.release(position);
        }
    }

    /// Turns one covered device per cloud server into a device that nearly fills that
    /// server's memory and storage, with a high non-service cost.
    ///
    /// The i-th cloud server is matched with the i-th covered device. If `rng` is given, the
    /// covered devices are shuffled first. Must be called before any allocation.
    pub fn create_bottleneck<R: Rng + ?Sized>(&mut self, rng: Option<&mut R>) {
        let mut targets = self.covered.to_vec();
        if let Some(rng) = rng {
            targets.shuffle(rng);
        }
        let clouds = self
            .servers
            .iter()
            .filter(|server| server.kind() == ServerKind::Cloud);
        let mut saturated = 0;
        for (server, &target) in clouds.zip(&targets) {
            let capacity = server.capacity();
            self.devices[target].saturate(
                capacity.memory * BOTTLENECK_SHARE,
                capacity.storage * BOTTLENECK_SHARE,
                BOTTLENECK_COST,
            );
            saturated += 1;
        }
        if saturated < self.metrics.inputs.servers_cc {
            log::warn!(
                "Only {} covered devices available to saturate {} cloud servers",
                saturated,
                self.metrics.inputs.servers_cc
            );
        }
        self.recalculate_metrics();
    }
}
