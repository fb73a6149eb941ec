use std::sync::Arc;

use crate::{distance, Candidate, Device, Server, ServerKind, Technology, EARTH_RADIUS};

/// Data rate in Mbps of the backbone link every server is attached to.
pub const BACKBONE_RATE: f64 = 100_000.0;

/// Speed of light in km/s.
pub const SPEED_OF_LIGHT: f64 = 299_792.458;

/// Fixed latency in milliseconds added to every route that reaches a cloud datacenter.
pub const INTER_DC_LATENCY: f64 = 111.86;

/// Outcome of the coverage phase.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Coverage {
    /// Positions of the covered devices, in input order.
    pub covered: Vec<usize>,
    /// Sum of the non-service costs of all devices that no edge server covers.
    pub non_coverage_cost: f64,
}

/// Runs the coverage and timing engine.
///
/// Every device gets the technology's data rate as its bandwidth requirement and every server
/// the backbone rate as its bandwidth capacity. A device is covered by each edge server within
/// the technology's radius; covered devices additionally get every cloud server as a
/// candidate. Uncovered devices keep no candidates and count toward the non-coverage cost.
pub fn cover(devices: &mut [Device], servers: &mut [Server], technology: Technology) -> Coverage {
    let profile = technology.profile();
    for server in servers.iter_mut() {
        server.set_bandwidth(BACKBONE_RATE);
    }
    let servers: &[Server] = servers;
    let mut coverage = Coverage::default();
    for (position, device) in devices.iter_mut().enumerate() {
        device.requirement.bandwidth = profile.data_rate;
        let mut candidates: Vec<Candidate> = servers
            .iter()
            .enumerate()
            .filter(|(_, server)| server.kind() == ServerKind::Edge)
            .filter_map(|(idx, server)| {
                let distance = distance(device.location(), server.location());
                if distance <= profile.radius {
                    Some(Candidate::new(idx, distance))
                } else {
                    None
                }
            })
            .collect();
        device.covered = !candidates.is_empty();
        if device.covered {
            coverage.covered.push(position);
            let closest = closest_edge(&candidates);
            candidates.extend(
                servers
                    .iter()
                    .enumerate()
                    .filter(|(_, server)| server.kind() == ServerKind::Cloud)
                    .map(|(idx, cloud)| cloud_candidate(idx, cloud, closest, servers)),
            );
            for candidate in &mut candidates {
                time(device, candidate, &servers[candidate.server]);
            }
        } else {
            coverage.non_coverage_cost += device.non_service_cost();
        }
        device.candidates = Arc::from(candidates);
    }
    log::debug!(
        "Covered {} out of {} devices",
        coverage.covered.len(),
        devices.len()
    );
    coverage
}

/// Position of and distance to the nearest covering edge server. The first one wins a tie.
///
/// Without any edge candidate, there is no routing server and the distance is the Earth
/// radius.
fn closest_edge(candidates: &[Candidate]) -> (Option<usize>, f64) {
    candidates
        .iter()
        .fold((None, EARTH_RADIUS), |closest, candidate| {
            if candidate.distance < closest.1 {
                (Some(candidate.server), candidate.distance)
            } else {
                closest
            }
        })
}

fn cloud_candidate(
    idx: usize,
    cloud: &Server,
    (routing, edge_distance): (Option<usize>, f64),
    servers: &[Server],
) -> Candidate {
    let backbone = routing.map_or(0.0, |edge| {
        distance(servers[edge].location(), cloud.location())
    });
    Candidate {
        routing,
        ..Candidate::new(idx, edge_distance + backbone)
    }
}

fn time(device: &Device, candidate: &mut Candidate, server: &Server) {
    let transmission = device.payload() / device.requirement().bandwidth * 1000.0;
    let propagation = candidate.distance / SPEED_OF_LIGHT * 1000.0;
    candidate.connection_time = transmission + propagation;
    if server.kind() == ServerKind::Cloud {
        candidate.connection_time += INTER_DC_LATENCY;
    }
    candidate.processing_time = device.payload() * server.unit_processing_time();
    candidate.response_time = candidate.connection_time + candidate.processing_time;
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::fixtures::{device_at, server_at, TECH};
    use crate::{DeviceRow, ServerRow};
    use float_cmp::approx_eq;
    use proptest::prelude::*;

    fn build(
        devices: Vec<DeviceRow>,
        edge: Vec<ServerRow>,
        cloud: Vec<ServerRow>,
    ) -> (Vec<Device>, Vec<Server>) {
        let devices = devices.into_iter().map(Device::from).collect();
        let servers = edge
            .into_iter()
            .map(|row| Server::new(row, ServerKind::Edge))
            .chain(cloud.into_iter().map(|row| Server::new(row, ServerKind::Cloud)))
            .collect();
        (devices, servers)
    }

    #[test]
    fn test_single_device_timing() {
        let (mut devices, mut servers) = build(
            vec![device_at(0, 0.0, 1.0)],
            vec![server_at(0, 0.5)],
            vec![server_at(0, 100.0), server_at(1, 200.0)],
        );
        let coverage = cover(&mut devices, &mut servers, TECH);
        assert_eq!(coverage.covered, vec![0]);
        assert_eq!(coverage.non_coverage_cost, 0.0);

        let device = &devices[0];
        assert!(device.is_covered());
        assert_eq!(device.requirement().bandwidth, 100.0);
        assert!(servers.iter().all(|s| s.capacity().bandwidth == BACKBONE_RATE));
        let positions: Vec<_> = device.candidates().iter().map(|c| c.server).collect();
        assert_eq!(positions, vec![0, 1, 2]);

        let edge = &device.candidates()[0];
        assert_eq!(edge.routing, None);
        assert!(approx_eq!(f64, edge.distance, 0.5, epsilon = 1e-9));
        let transmission = 1.0 / 100.0 * 1000.0;
        assert!(approx_eq!(
            f64,
            edge.connection_time,
            transmission + 0.5 / SPEED_OF_LIGHT * 1000.0,
            epsilon = 1e-9
        ));
        assert_eq!(edge.processing_time, 1.0);
        assert_eq!(edge.response_time, edge.connection_time + edge.processing_time);

        let cloud = &device.candidates()[2];
        assert_eq!(cloud.routing, Some(0));
        assert!(approx_eq!(f64, cloud.distance, 200.0, epsilon = 1e-6));
        assert!(approx_eq!(
            f64,
            cloud.connection_time,
            transmission + 200.0 / SPEED_OF_LIGHT * 1000.0 + INTER_DC_LATENCY,
            epsilon = 1e-6
        ));
        assert!(cloud.response_time > edge.response_time);
    }

    #[test]
    fn test_routes_through_closest_edge() {
        let (mut devices, mut servers) = build(
            vec![device_at(0, 0.0, 1.0)],
            vec![server_at(0, 2.0), server_at(1, -1.0), server_at(2, 1.2)],
            vec![server_at(0, 50.0)],
        );
        cover(&mut devices, &mut servers, TECH);
        let cloud = devices[0].candidates().last().cloned().unwrap();
        assert_eq!(cloud.routing, Some(1));
        assert!(approx_eq!(f64, cloud.distance, 1.0 + 51.0, epsilon = 1e-6));
    }

    #[test]
    fn test_uncovered_devices() {
        let (mut devices, mut servers) = build(
            vec![
                device_at(0, 0.0, 1.5),
                device_at(1, 10.0, 2.5),
                device_at(2, 2.9, 4.0),
                device_at(3, -3.5, 8.0),
            ],
            vec![server_at(0, 0.0)],
            vec![server_at(0, 100.0)],
        );
        let coverage = cover(&mut devices, &mut servers, TECH);
        assert_eq!(coverage.covered, vec![0, 2]);
        assert_eq!(coverage.non_coverage_cost, 10.5);
        assert!(devices[1].candidates().is_empty());
        assert!(devices[3].candidates().is_empty());
        assert_eq!(devices[2].candidates().len(), 2);
    }

    #[test]
    fn test_radius_depends_on_technology() {
        let (mut devices, mut servers) = build(
            vec![device_at(0, 0.0, 1.0)],
            vec![server_at(0, 1.0)],
            vec![server_at(0, 100.0)],
        );
        assert!(cover(&mut devices, &mut servers, Technology::G5).covered.is_empty());
        let (mut devices, mut servers) = build(
            vec![device_at(0, 0.0, 1.0)],
            vec![server_at(0, 1.0)],
            vec![server_at(0, 100.0)],
        );
        assert_eq!(cover(&mut devices, &mut servers, Technology::G3).covered, vec![0]);
        assert_eq!(devices[0].requirement().bandwidth, 2.0);
    }

    proptest! {
        #[test]
        fn test_coverage_matches_radius(
            device_km in prop::collection::vec((-10.0..10.0_f64, 0.0..10.0_f64), 1..20),
            edge_km in prop::collection::vec(-10.0..10.0_f64, 1..5),
        ) {
            let (mut devices, mut servers) = build(
                device_km
                    .iter()
                    .enumerate()
                    .map(|(id, &(km, cost))| device_at(id as u32, km, cost))
                    .collect(),
                edge_km
                    .iter()
                    .enumerate()
                    .map(|(id, &km)| server_at(id as u32, km))
                    .collect(),
                vec![server_at(0, 300.0)],
            );
            let coverage = cover(&mut devices, &mut servers, TECH);
            let radius = TECH.profile().radius;
            let mut expected_cost = 0.0;
            for device in &devices {
                let in_range = servers
                    .iter()
                    .filter(|s| s.kind() == ServerKind::Edge)
                    .any(|s| distance(device.location(), s.location()) <= radius);
                prop_assert_eq!(device.is_covered(), in_range);
                if !in_range {
                    expected_cost += device.non_service_cost();
                }
            }
            prop_assert!(approx_eq!(f64, coverage.non_coverage_cost, expected_cost, epsilon = 1e-9));
        }
    }
}
