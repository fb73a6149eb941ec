use std::collections::BTreeSet;
use std::sync::Arc;

use derive_more::{Display, From, Into};
use serde::{Deserialize, Serialize};

/// Device ID, as given in the input table.
#[derive(
    From,
    Into,
    Debug,
    PartialEq,
    PartialOrd,
    Eq,
    Ord,
    Serialize,
    Deserialize,
    Copy,
    Clone,
    Hash,
    Display,
)]
pub struct DeviceId(u32);

/// Server ID, as given in the input table. IDs are unique only within one server kind.
#[derive(
    From,
    Into,
    Debug,
    PartialEq,
    PartialOrd,
    Eq,
    Ord,
    Serialize,
    Deserialize,
    Copy,
    Clone,
    Hash,
    Display,
)]
pub struct ServerId(u32);

/// Edge (EC) or cloud (CC) server.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, strum::Display)]
pub enum ServerKind {
    /// Edge server; only edge servers provide radio coverage.
    #[strum(serialize = "EC")]
    Edge,
    /// Cloud server, reached through the closest covering edge server.
    #[strum(serialize = "CC")]
    Cloud,
}

/// Geographic position in decimal degrees.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Location {
    /// Latitude.
    pub lat: f64,
    /// Longitude.
    pub lon: f64,
}

impl Location {
    /// Constructs a location from latitude and longitude.
    #[must_use]
    pub fn new(lat: f64, lon: f64) -> Self {
        Self { lat, lon }
    }
}

/// Amounts on the five resource axes checked for every assignment.
///
/// The same type describes a device requirement, a server capacity, and the aggregated demand
/// on a server.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Resources {
    /// Processing capacity.
    pub processing: f64,
    /// Number of processing cores.
    pub cores: u32,
    /// Memory.
    pub memory: f64,
    /// Storage.
    pub storage: f64,
    /// Bandwidth in Mbps.
    pub bandwidth: f64,
}

impl Resources {
    /// Returns `true` if adding `requirement` to `self` stays within `capacity` on every axis.
    #[must_use]
    pub fn fits(&self, requirement: &Resources, capacity: &Resources) -> bool {
        self.processing + requirement.processing <= capacity.processing
            && self.cores + requirement.cores <= capacity.cores
            && self.memory + requirement.memory <= capacity.memory
            && self.storage + requirement.storage <= capacity.storage
            && self.bandwidth + requirement.bandwidth <= capacity.bandwidth
    }

    fn add(&mut self, other: &Resources) {
        self.processing += other.processing;
        self.cores += other.cores;
        self.memory += other.memory;
        self.storage += other.storage;
        self.bandwidth += other.bandwidth;
    }

    fn subtract(&mut self, other: &Resources) {
        self.processing -= other.processing;
        self.cores -= other.cores;
        self.memory -= other.memory;
        self.storage -= other.storage;
        self.bandwidth -= other.bandwidth;
    }
}

/// A row of the device input table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeviceRow {
    /// Device ID.
    pub id: DeviceId,
    /// Latitude.
    pub lat: f64,
    /// Longitude.
    pub lon: f64,
    /// Cost incurred when the device is not served.
    #[serde(rename = "cnd")]
    pub non_service_cost: f64,
    /// Required processing capacity.
    #[serde(rename = "pcc")]
    pub processing: f64,
    /// Required number of cores.
    #[serde(rename = "pcn")]
    pub cores: u32,
    /// Required memory.
    #[serde(rename = "mem")]
    pub memory: f64,
    /// Required storage.
    #[serde(rename = "sto")]
    pub storage: f64,
    /// Size of the task payload sent to the server.
    #[serde(rename = "s_d")]
    pub payload: f64,
    /// Service ID, kept for reference only.
    #[serde(rename = "svc")]
    pub service: u32,
}

/// A row of an edge or cloud server input table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ServerRow {
    /// Server ID.
    pub id: ServerId,
    /// Latitude.
    pub lat: f64,
    /// Longitude.
    pub lon: f64,
    /// Cost of using the server at all.
    #[serde(rename = "csc")]
    pub activation_cost: f64,
    /// Processing capacity of a single core.
    #[serde(rename = "pcc")]
    pub processing_per_core: f64,
    /// Number of cores.
    #[serde(rename = "pcn")]
    pub cores: u32,
    /// Memory.
    #[serde(rename = "mem")]
    pub memory: f64,
    /// Storage.
    #[serde(rename = "sto")]
    pub storage: f64,
    /// Time to process a unit of payload.
    #[serde(rename = "t_p")]
    pub unit_processing_time: f64,
}

/// A potential pairing of a device with a server, with precomputed timing.
///
/// All times are in milliseconds and distances in kilometers.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Candidate {
    /// Position of the server in the server list of the run.
    pub server: usize,
    /// For cloud candidates, the position of the edge server the traffic is routed through.
    pub routing: Option<usize>,
    /// Distance covered by the signal: direct for edge servers, through the routing edge server
    /// for cloud servers.
    pub distance: f64,
    /// Transmission plus propagation time, including inter-datacenter latency for the cloud.
    pub connection_time: f64,
    /// Time to process the payload on the server.
    pub processing_time: f64,
    /// Connection time plus processing time.
    pub response_time: f64,
}

impl Candidate {
    pub(crate) fn new(server: usize, distance: f64) -> Self {
        Self {
            server,
            routing: None,
            distance,
            connection_time: 0.0,
            processing_time: 0.0,
            response_time: 0.0,
        }
    }
}

/// A client device with its requirements and allocation state.
#[derive(Debug, Clone, PartialEq)]
pub struct Device {
    id: DeviceId,
    location: Location,
    non_service_cost: f64,
    pub(crate) requirement: Resources,
    payload: f64,
    service: u32,
    pub(crate) covered: bool,
    served: bool,
    assignment: Option<Candidate>,
    pub(crate) candidates: Arc<[Candidate]>,
}

impl From<DeviceRow> for Device {
    fn from(row: DeviceRow) -> Self {
        Self {
            id: row.id,
            location: Location::new(row.lat, row.lon),
            non_service_cost: row.non_service_cost,
            requirement: Resources {
                processing: row.processing,
                cores: row.cores,
                memory: row.memory,
                storage: row.storage,
                bandwidth: 0.0,
            },
            payload: row.payload,
            service: row.service,
            covered: false,
            served: false,
            assignment: None,
            candidates: Arc::from(Vec::new()),
        }
    }
}

impl Device {
    /// Device ID.
    #[must_use]
    pub fn id(&self) -> DeviceId {
        self.id
    }

    /// Device location.
    #[must_use]
    pub fn location(&self) -> Location {
        self.location
    }

    /// Penalty for leaving the device unserved (or uncovered).
    #[must_use]
    pub fn non_service_cost(&self) -> f64 {
        self.non_service_cost
    }

    /// Resources the device needs from a server. Bandwidth is the data rate assigned by the
    /// coverage engine.
    #[must_use]
    pub fn requirement(&self) -> &Resources {
        &self.requirement
    }

    /// Payload size.
    #[must_use]
    pub fn payload(&self) -> f64 {
        self.payload
    }

    /// Service ID.
    #[must_use]
    pub fn service(&self) -> u32 {
        self.service
    }

    /// Whether any edge server covers the device.
    #[must_use]
    pub fn is_covered(&self) -> bool {
        self.covered
    }

    /// Whether the device is currently served by a server.
    #[must_use]
    pub fn is_served(&self) -> bool {
        self.served
    }

    /// The candidate the device is assigned to, if served.
    #[must_use]
    pub fn assignment(&self) -> Option<&Candidate> {
        self.assignment.as_ref()
    }

    /// All servers that could serve this device.
    #[must_use]
    pub fn candidates(&self) -> &[Candidate] {
        &self.candidates
    }

    /// Overrides the requirement and cost of an unserved device; used to set up stress
    /// scenarios between coverage and allocation.
    pub(crate) fn saturate(&mut self, memory: f64, storage: f64, non_service_cost: f64) {
        debug_assert!(!self.served, "cannot change requirements of a served device");
        self.requirement.memory = memory;
        self.requirement.storage = storage;
        self.non_service_cost = non_service_cost;
    }
}

/// A server with its capacity and the aggregated demand of the devices it serves.
#[derive(Debug, Clone, PartialEq)]
pub struct Server {
    id: ServerId,
    kind: ServerKind,
    location: Location,
    activation_cost: f64,
    processing_per_core: f64,
    unit_processing_time: f64,
    pub(crate) capacity: Resources,
    active: bool,
    demand: Resources,
    served: BTreeSet<DeviceId>,
}

impl Server {
    /// Constructs an inactive server of the given kind. Total processing capacity is the
    /// per-core capacity times the number of cores; bandwidth is set by the coverage engine.
    #[must_use]
    pub fn new(row: ServerRow, kind: ServerKind) -> Self {
        Self {
            id: row.id,
            kind,
            location: Location::new(row.lat, row.lon),
            activation_cost: row.activation_cost,
            processing_per_core: row.processing_per_core,
            unit_processing_time: row.unit_processing_time,
            capacity: Resources {
                processing: row.processing_per_core * f64::from(row.cores),
                cores: row.cores,
                memory: row.memory,
                storage: row.storage,
                bandwidth: 0.0,
            },
            active: false,
            demand: Resources::default(),
            served: BTreeSet::new(),
        }
    }

    /// Server ID.
    #[must_use]
    pub fn id(&self) -> ServerId {
        self.id
    }

    /// Edge or cloud.
    #[must_use]
    pub fn kind(&self) -> ServerKind {
        self.kind
    }

    /// Server location.
    #[must_use]
    pub fn location(&self) -> Location {
        self.location
    }

    /// Cost of using the server.
    #[must_use]
    pub fn activation_cost(&self) -> f64 {
        self.activation_cost
    }

    /// Processing capacity of one core.
    #[must_use]
    pub fn processing_per_core(&self) -> f64 {
        self.processing_per_core
    }

    /// Time to process a unit of payload.
    #[must_use]
    pub fn unit_processing_time(&self) -> f64 {
        self.unit_processing_time
    }

    /// Total capacity on all five axes.
    #[must_use]
    pub fn capacity(&self) -> &Resources {
        &self.capacity
    }

    /// Sum of the requirements of all served devices.
    #[must_use]
    pub fn demand(&self) -> &Resources {
        &self.demand
    }

    /// IDs of the served devices.
    #[must_use]
    pub fn served(&self) -> &BTreeSet<DeviceId> {
        &self.served
    }

    /// A server is active iff it serves at least one device.
    #[must_use]
    pub fn is_active(&self) -> bool {
        self.active
    }

    /// Checks whether the device fits into the remaining capacity on all five axes.
    #[must_use]
    pub fn can_serve(&self, device: &Device) -> bool {
        self.demand.fits(&device.requirement, &self.capacity)
    }

    /// Starts serving `device` through `candidate`, which must point at this server.
    ///
    /// Returns `false` and does nothing if the device is already served here.
    /// Capacity is not checked; call [`Server::can_serve`] first.
    pub fn assign(&mut self, device: &mut Device, candidate: Candidate) -> bool {
        if !self.served.insert(device.id) {
            return false;
        }
        self.active = true;
        self.demand.add(&device.requirement);
        device.served = true;
        device.assignment = Some(candidate);
        true
    }

    /// Stops serving `device`, exactly reversing [`Server::assign`].
    ///
    /// Returns `false` and does nothing if the device is not served here.
    pub fn release(&mut self, device: &mut Device) -> bool {
        if !self.served.remove(&device.id) {
            return false;
        }
        self.demand.subtract(&device.requirement);
        device.served = false;
        device.assignment = None;
        if self.served.is_empty() {
            self.active = false;
        }
        true
    }

    pub(crate) fn set_bandwidth(&mut self, bandwidth: f64) {
        self.capacity.bandwidth = bandwidth;
    }
}
