use std::path::PathBuf;
use std::time::Duration;

use serde::Serialize;

use crate::{Device, Server, ServerKind, Technology};

const BASE_HEADER: [&str; 16] = [
    "Devices",
    "Servers",
    "Tech",
    "ExeTime",
    "DCovered",
    "DServed",
    "DServedEC",
    "DServedCC",
    "SUsed",
    "SUsedEC",
    "SUsedCC",
    "TotalCost",
    "CostNCoverage",
    "CostNService",
    "CostS",
    "Avg.RTime",
];

/// Size of the problem instance, echoed in every result row.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Inputs {
    /// Number of devices.
    pub devices: usize,
    /// Number of edge servers.
    pub servers_ec: usize,
    /// Number of cloud servers.
    pub servers_cc: usize,
    /// Radio technology.
    pub technology: Technology,
}

impl Inputs {
    /// Total number of servers.
    #[must_use]
    pub fn servers(&self) -> usize {
        self.servers_ec + self.servers_cc
    }
}

/// Statistics computed from a final allocation.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Outputs {
    /// Accumulated wall time of the algorithms that produced the allocation.
    pub execution_time: Duration,
    /// Devices covered by at least one edge server; set once by the coverage phase.
    pub devices_covered: usize,
    /// Devices served by any server.
    pub devices_served: usize,
    /// Devices served by an edge server.
    pub devices_served_ec: usize,
    /// Devices served by a cloud server.
    pub devices_served_cc: usize,
    /// Active servers.
    pub servers_used: usize,
    /// Active edge servers.
    pub servers_used_ec: usize,
    /// Active cloud servers.
    pub servers_used_cc: usize,
    /// Sum of activation costs of active servers.
    pub cost_of_servers_used: f64,
    /// Sum of non-service costs of uncovered devices; set once by the coverage phase.
    pub cost_of_non_coverage: f64,
    /// Sum of non-service costs of covered but unserved devices.
    pub cost_of_non_service: f64,
    /// Sum of the three cost components.
    pub total_cost: f64,
    /// Mean response time over served devices, or zero if none is served.
    pub average_response_time: f64,
}

/// Algorithm family that produced the metrics, with its specific fields.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "simulation")]
pub enum Variant {
    /// Random or greedy heuristic.
    Heuristic,
    /// External exact solver.
    Mathematical {
        /// Solver status, e.g., `Optimal`.
        status: String,
        /// Objective value reported by the solver.
        objective: f64,
        /// Relative optimality gap.
        gap: f64,
    },
    /// Simulated annealing.
    MetaHeuristic {
        /// Algorithm used to compute the initial solution.
        heuristic: String,
        /// Initial temperature.
        temperature: f64,
        /// Cooling rate.
        cooling_rate: f64,
    },
}

impl Variant {
    /// Mathematical variant before the solver reports back.
    #[must_use]
    pub fn unsolved() -> Self {
        Self::Mathematical {
            status: String::from("Unknown"),
            objective: 0.0,
            gap: 1.0,
        }
    }
}

/// Metrics of one run or trial.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Metrics {
    /// Algorithm name, e.g., `Greedy_DescAsc`.
    pub algorithm: String,
    /// Algorithm family.
    #[serde(flatten)]
    pub variant: Variant,
    /// Echoed inputs.
    pub inputs: Inputs,
    /// Computed outputs.
    pub outputs: Outputs,
}

impl Metrics {
    /// Empty heuristic metrics.
    #[must_use]
    pub fn new<S: Into<String>>(algorithm: S, inputs: Inputs) -> Self {
        Self {
            algorithm: algorithm.into(),
            variant: Variant::Heuristic,
            inputs,
            outputs: Outputs::default(),
        }
    }

    /// Name of the algorithm family.
    #[must_use]
    pub fn simulation(&self) -> &'static str {
        match self.variant {
            Variant::Heuristic => "Heuristic",
            Variant::Mathematical { .. } => "Mathematical",
            Variant::MetaHeuristic { .. } => "MetaHeuristic",
        }
    }
}

/// Recomputes all outputs that depend on the allocation. Execution time and the coverage
/// outputs are carried over unchanged. Calling it twice on the same state gives the same
/// result.
pub fn calculate_metrics(devices: &[Device], servers: &[Server], metrics: &mut Metrics) {
    let outputs = &mut metrics.outputs;
    outputs.devices_served = 0;
    outputs.devices_served_ec = 0;
    outputs.devices_served_cc = 0;
    outputs.servers_used_ec = 0;
    outputs.servers_used_cc = 0;
    outputs.cost_of_servers_used = 0.0;
    outputs.cost_of_non_service = 0.0;
    let mut response_time = 0.0;
    for device in devices {
        if let Some(candidate) = device.assignment() {
            outputs.devices_served += 1;
            response_time += candidate.response_time;
            match servers[candidate.server].kind() {
                ServerKind::Edge => outputs.devices_served_ec += 1,
                ServerKind::Cloud => outputs.devices_served_cc += 1,
            }
        } else if device.is_covered() {
            outputs.cost_of_non_service += device.non_service_cost();
        }
    }
    for server in servers.iter().filter(|s| s.is_active()) {
        outputs.cost_of_servers_used += server.activation_cost();
        match server.kind() {
            ServerKind::Edge => outputs.servers_used_ec += 1,
            ServerKind::Cloud => outputs.servers_used_cc += 1,
        }
    }
    outputs.servers_used = outputs.servers_used_ec + outputs.servers_used_cc;
    outputs.average_response_time = if outputs.devices_served > 0 {
        response_time / outputs.devices_served as f64
    } else {
        0.0
    };
    outputs.total_cost =
        outputs.cost_of_non_coverage + outputs.cost_of_non_service + outputs.cost_of_servers_used;
}

/// Column names of a result file.
#[must_use]
pub fn header(metrics: &Metrics) -> Vec<&'static str> {
    let mut header = BASE_HEADER.to_vec();
    match metrics.variant {
        Variant::Heuristic => {}
        Variant::Mathematical { .. } => header.extend(&["Status", "OF", "GAP"]),
        Variant::MetaHeuristic { .. } => header.extend(&["Temperature", "Alpha", "Heuristic"]),
    }
    header
}

fn float(value: f64) -> String {
    format!("{:.6}", value)
}

fn percentage(numerator: usize, denominator: usize) -> String {
    if denominator == 0 {
        format!("{:.4}", 0.0)
    } else {
        format!("{:.4}", numerator as f64 / denominator as f64 * 100.0)
    }
}

/// Result row matching [`header`].
#[must_use]
pub fn row(metrics: &Metrics) -> Vec<String> {
    let Metrics {
        inputs, outputs, ..
    } = metrics;
    let mut row = vec![
        inputs.devices.to_string(),
        inputs.servers().to_string(),
        inputs.technology.id().to_string(),
        float(outputs.execution_time.as_secs_f64()),
        percentage(outputs.devices_covered, inputs.devices),
        percentage(outputs.devices_served, inputs.devices),
        percentage(outputs.devices_served_ec, outputs.devices_served),
        percentage(outputs.devices_served_cc, outputs.devices_served),
        percentage(outputs.servers_used, inputs.servers()),
        percentage(outputs.servers_used_ec, inputs.servers_ec),
        percentage(outputs.servers_used_cc, inputs.servers_cc),
        float(outputs.total_cost),
        float(outputs.cost_of_non_coverage),
        float(outputs.cost_of_non_service),
        float(outputs.cost_of_servers_used),
        float(outputs.average_response_time),
    ];
    match &metrics.variant {
        Variant::Heuristic => {}
        Variant::Mathematical {
            status,
            objective,
            gap,
        } => row.extend(vec![status.clone(), float(*objective), float(*gap)]),
        Variant::MetaHeuristic {
            heuristic,
            temperature,
            cooling_rate,
        } => row.extend(vec![float(*temperature), float(*cooling_rate), heuristic.clone()]),
    }
    row
}

/// Directory of the result file, relative to the results root:
/// `{simulation}/{algorithm}`, followed by `/{heuristic}` for simulated annealing.
#[must_use]
pub fn directory(metrics: &Metrics) -> PathBuf {
    let mut path = PathBuf::from(metrics.simulation());
    path.push(&metrics.algorithm);
    if let Variant::MetaHeuristic { heuristic, .. } = &metrics.variant {
        path.push(heuristic);
    }
    path
}

/// Name of the result file: `D{devices}_S{servers}_{tech}G.txt`.
#[must_use]
pub fn file_name(metrics: &Metrics) -> String {
    format!(
        "D{}_S{}_{}.txt",
        metrics.inputs.devices,
        metrics.inputs.servers(),
        metrics.inputs.technology
    )
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::fixtures::{device_at, empty_server_at, server_at, TECH};
    use crate::{Greedy, SortOrder, State};
    use rstest::{fixture, rstest};

    fn inputs() -> Inputs {
        Inputs {
            devices: 300,
            servers_ec: 100,
            servers_cc: 5,
            technology: TECH,
        }
    }

    #[fixture]
    fn state() -> State {
        // Device 2 fits only on the cloud; device 3 is uncovered.
        let mut devices = vec![
            device_at(0, 0.0, 1.0),
            device_at(1, 0.2, 2.0),
            device_at(2, 0.4, 4.0),
            device_at(3, 50.0, 8.0),
        ];
        devices[2].memory = 500.0;
        let cloud = crate::ServerRow {
            memory: 1000.0,
            activation_cost: 10.0,
            ..server_at(0, 100.0)
        };
        State::prepare(
            "Greedy_AscAsc",
            devices,
            vec![server_at(0, 0.1), empty_server_at(1, 0.3)],
            vec![cloud],
            TECH,
        )
        .unwrap()
    }

    #[test]
    fn test_header_and_paths() {
        let mut metrics = Metrics::new("Random", inputs());
        assert_eq!(metrics.simulation(), "Heuristic");
        assert_eq!(header(&metrics).len(), 16);
        assert_eq!(row(&metrics).len(), 16);
        assert_eq!(directory(&metrics), PathBuf::from("Heuristic/Random"));
        assert_eq!(file_name(&metrics), "D300_S105_4G.txt");

        metrics.algorithm = String::from("SA");
        metrics.variant = Variant::MetaHeuristic {
            heuristic: String::from("Greedy_DescAsc"),
            temperature: 100.0,
            cooling_rate: 0.95,
        };
        assert_eq!(
            &header(&metrics)[16..],
            &["Temperature", "Alpha", "Heuristic"]
        );
        assert_eq!(
            &row(&metrics)[16..],
            &["100.000000", "0.950000", "Greedy_DescAsc"]
        );
        assert_eq!(
            directory(&metrics),
            PathBuf::from("MetaHeuristic/SA/Greedy_DescAsc")
        );

        metrics.algorithm = String::from("Minimize_Cost");
        metrics.variant = Variant::unsolved();
        assert_eq!(&header(&metrics)[16..], &["Status", "OF", "GAP"]);
        assert_eq!(&row(&metrics)[16..], &["Unknown", "0.000000", "1.000000"]);
        assert_eq!(
            directory(&metrics),
            PathBuf::from("Mathematical/Minimize_Cost")
        );
    }

    #[test]
    fn test_row_formatting() {
        let mut metrics = Metrics::new("Random", inputs());
        metrics.outputs = Outputs {
            execution_time: Duration::from_millis(1500),
            devices_covered: 150,
            devices_served: 3,
            devices_served_ec: 1,
            devices_served_cc: 2,
            servers_used: 2,
            servers_used_ec: 2,
            servers_used_cc: 0,
            cost_of_servers_used: 2.5,
            cost_of_non_coverage: 1.0,
            cost_of_non_service: 0.25,
            total_cost: 3.75,
            average_response_time: 12.125,
        };
        assert_eq!(
            row(&metrics),
            vec![
                "300", "105", "4", "1.500000", "50.0000", "1.0000", "33.3333", "66.6667",
                "1.9048", "2.0000", "0.0000", "3.750000", "1.000000", "0.250000", "2.500000",
                "12.125000"
            ]
        );
    }

    #[test]
    fn test_zero_denominators() {
        let metrics = Metrics::new(
            "Random",
            Inputs {
                devices: 0,
                servers_ec: 0,
                servers_cc: 0,
                technology: TECH,
            },
        );
        let row = row(&metrics);
        assert!(row[4..11].iter().all(|v| v == "0.0000"));
    }

    #[rstest]
    fn test_calculate_metrics(mut state: State) {
        Greedy::new(SortOrder::Ascending, SortOrder::Ascending).run(&mut state);
        let outputs = &state.metrics().outputs;
        assert_eq!(outputs.devices_covered, 3);
        assert_eq!(outputs.devices_served, 3);
        assert_eq!(outputs.devices_served_ec, 2);
        assert_eq!(outputs.devices_served_cc, 1);
        assert_eq!(outputs.servers_used_ec, 1);
        assert_eq!(outputs.servers_used_cc, 1);
        assert_eq!(outputs.servers_used, 2);
        assert_eq!(outputs.cost_of_servers_used, 11.0);
        assert_eq!(outputs.cost_of_non_coverage, 8.0);
        assert_eq!(outputs.cost_of_non_service, 0.0);
        assert_eq!(outputs.total_cost, 19.0);
        let served: Vec<f64> = state
            .devices()
            .iter()
            .filter_map(|d| d.assignment())
            .map(|c| c.response_time)
            .collect();
        let mean = served.iter().sum::<f64>() / 3.0;
        assert!(float_cmp::approx_eq!(
            f64,
            outputs.average_response_time,
            mean,
            epsilon = 1e-9
        ));
    }

    #[rstest]
    fn test_calculate_metrics_unserved(state: State) {
        let outputs = &state.metrics().outputs;
        assert_eq!(outputs.devices_served, 0);
        assert_eq!(outputs.average_response_time, 0.0);
        assert_eq!(outputs.cost_of_non_service, 7.0);
        assert_eq!(outputs.total_cost, 15.0);
    }

    #[rstest]
    fn test_idempotent(mut state: State) {
        Greedy::new(SortOrder::Ascending, SortOrder::Ascending).run(&mut state);
        let before = state.metrics().clone();
        state.recalculate_metrics();
        state.recalculate_metrics();
        assert_eq!(state.metrics(), &before);
    }
}
