//! Input builders shared by unit tests.

use float_cmp::approx_eq;

use crate::{DeviceId, DeviceRow, ServerId, ServerRow, State, Technology, EARTH_RADIUS};

/// Degrees of latitude spanning `km` kilometers along a meridian.
pub(crate) fn km_to_degrees(km: f64) -> f64 {
    (km / EARTH_RADIUS).to_degrees()
}

pub(crate) fn device_row(id: u32, processing: f64, cores: u32, memory: f64) -> DeviceRow {
    DeviceRow {
        id: DeviceId::from(id),
        lat: 0.0,
        lon: 0.0,
        non_service_cost: 1.0,
        processing,
        cores,
        memory,
        storage: 1.0,
        payload: 1.0,
        service: 1,
    }
}

/// A small device located `km` kilometers north of the origin.
pub(crate) fn device_at(id: u32, km: f64, non_service_cost: f64) -> DeviceRow {
    DeviceRow {
        lat: km_to_degrees(km),
        non_service_cost,
        ..device_row(id, 1.0, 1, 1.0)
    }
}

/// A server with plenty of capacity located `km` kilometers north of the origin.
pub(crate) fn server_at(id: u32, km: f64) -> ServerRow {
    ServerRow {
        id: ServerId::from(id),
        lat: km_to_degrees(km),
        lon: 0.0,
        activation_cost: 1.0,
        processing_per_core: 10.0,
        cores: 16,
        memory: 100.0,
        storage: 1000.0,
        unit_processing_time: 1.0,
    }
}

/// A server that cannot fit any device with a non-zero requirement.
pub(crate) fn empty_server_at(id: u32, km: f64) -> ServerRow {
    ServerRow {
        processing_per_core: 0.0,
        cores: 0,
        memory: 0.0,
        storage: 0.0,
        ..server_at(id, km)
    }
}

pub(crate) const TECH: Technology = Technology::G4;

/// Checks the bookkeeping invariants between devices and servers.
pub(crate) fn assert_consistent(state: &State) {
    for (position, server) in state.servers().iter().enumerate() {
        assert_eq!(server.is_active(), !server.served().is_empty());
        let served: Vec<_> = state
            .devices()
            .iter()
            .filter(|d| d.assignment().map(|c| c.server) == Some(position))
            .collect();
        assert_eq!(served.len(), server.served().len());
        let mut cores = 0;
        let (mut processing, mut memory, mut storage, mut bandwidth) = (0.0, 0.0, 0.0, 0.0);
        for device in served {
            assert!(server.served().contains(&device.id()));
            let requirement = device.requirement();
            processing += requirement.processing;
            cores += requirement.cores;
            memory += requirement.memory;
            storage += requirement.storage;
            bandwidth += requirement.bandwidth;
        }
        let demand = server.demand();
        assert_eq!(demand.cores, cores);
        assert!(approx_eq!(f64, demand.processing, processing, epsilon = 1e-6));
        assert!(approx_eq!(f64, demand.memory, memory, epsilon = 1e-6));
        assert!(approx_eq!(f64, demand.storage, storage, epsilon = 1e-6));
        assert!(approx_eq!(f64, demand.bandwidth, bandwidth, epsilon = 1e-6));
        assert!(demand.fits(&Default::default(), server.capacity()));
    }
    for device in state.devices() {
        assert_eq!(device.is_served(), device.assignment().is_some());
        if let Some(candidate) = device.assignment() {
            assert!(device.is_covered());
            assert!(device.candidates().contains(candidate));
        }
    }
}

/// Random instance in a 10 by 10 km square around the origin, with tight server capacities.
pub(crate) fn instance<R: rand::Rng>(rng: &mut R, devices: u32, edge: u32, cloud: u32) -> State {
    let mut coordinate = |rng: &mut R| km_to_degrees(rng.gen_range(-5.0..5.0));
    let devices = (0..devices)
        .map(|id| DeviceRow {
            id: DeviceId::from(id),
            lat: coordinate(rng),
            lon: coordinate(rng),
            non_service_cost: rng.gen_range(0.1..10.0),
            processing: rng.gen_range(1.0..10.0),
            cores: rng.gen_range(1..4),
            memory: rng.gen_range(1.0..16.0),
            storage: rng.gen_range(1.0..32.0),
            payload: rng.gen_range(1.0..5.0),
            service: rng.gen_range(0..3),
        })
        .collect();
    let mut server = |rng: &mut R, id: u32| ServerRow {
        id: ServerId::from(id),
        lat: coordinate(rng),
        lon: coordinate(rng),
        activation_cost: rng.gen_range(1.0..20.0),
        processing_per_core: rng.gen_range(2.0..10.0),
        cores: rng.gen_range(4..16),
        memory: rng.gen_range(16.0..64.0),
        storage: rng.gen_range(64.0..256.0),
        unit_processing_time: rng.gen_range(0.01..1.0),
    };
    let edge = (0..edge).map(|id| server(rng, id)).collect();
    let cloud = (0..cloud).map(|id| server(rng, id)).collect();
    State::prepare("Random", devices, edge, cloud, TECH).unwrap()
}
