use super::*;

use log::*;
use std::collections::BTreeMap;

/// A stable circuit settles within this many evaluation passes per device.
pub const OSCILLATION_FACTOR: usize = 2;

/// How a call to [`Network::execute_cycle`] went.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CycleResult {
    Ok,
    /// The combinational logic did not settle. Device state is left as it was after the last pass.
    Oscillating,
    /// Some input has no driver. Nothing was evaluated.
    InputsUnconnected,
}

impl CycleResult {
    pub fn is_ok(&self) -> bool {
        *self == CycleResult::Ok
    }
}

/// The connections between devices.
///
/// Each input port records its driver on the [`Device`] itself.
/// The network additionally keeps the reverse direction: which inputs each output drives.
#[derive(Debug, Clone, Default)]
pub struct Network {
    fanout: BTreeMap<Driver, Vec<(DeviceId, PortId)>>,
}

impl Network {
    pub fn new() -> Network {
        Network::default()
    }

    /// Connects an output to an input. The two ends may be given in either order.
    pub fn make_connection(
        &mut self,
        devices: &mut Devices,
        first_id: DeviceId,
        first_port: Option<PortId>,
        second_id: DeviceId,
        second_port: Option<PortId>,
    ) -> Result<(), NetworkError> {
        let first = devices.get_device(first_id).ok_or(NetworkError::DeviceAbsent)?;
        let second = devices.get_device(second_id).ok_or(NetworkError::DeviceAbsent)?;

        let (input, output) = match (first_port, second_port) {
            (Some(port), _) if first.has_input(first_port) => {
                if first.driver(port).flatten().is_some() {
                    return Err(NetworkError::InputConnected);
                } else if second.has_input(second_port) {
                    return Err(NetworkError::InputToInput);
                } else if !second.has_output(second_port) {
                    return Err(NetworkError::PortAbsent);
                }
                ((first_id, port), (second_id, second_port))
            },
            _ if first.has_output(first_port) => {
                if second.has_output(second_port) {
                    return Err(NetworkError::OutputToOutput);
                }
                let port = match second_port {
                    Some(port) if second.has_input(second_port) => port,
                    _ => return Err(NetworkError::PortAbsent),
                };
                if second.driver(port).flatten().is_some() {
                    return Err(NetworkError::InputConnected);
                }
                ((second_id, port), (first_id, first_port))
            },
            _ => return Err(NetworkError::PortAbsent),
        };

        let (input_id, input_port) = input;
        devices.connect(input_id, input_port, output);
        self.fanout.entry(output).or_default().push(input);
        debug!("make_connection: {:?} > {input_id}.{input_port}", output);
        Ok(())
    }

    /// The output driving input `port` of `id`, if it is connected.
    pub fn connected_output(&self, devices: &Devices, id: DeviceId, port: PortId) -> Option<Driver> {
        devices.get_device(id)?.driver(port)?
    }

    /// Every input driven by the given output.
    pub fn fanout(&self, id: DeviceId, port: Option<PortId>) -> &[(DeviceId, PortId)] {
        self.fanout.get(&(id, port)).map(|inputs| inputs.as_slice()).unwrap_or(&[])
    }

    /// Whether every input of every device is connected.
    pub fn check_network(&self, devices: &Devices) -> bool {
        devices.iter().all(|device| device.is_fully_connected())
    }

    /// Advances the circuit by one cycle.
    ///
    /// Stateful devices step first: DTYPEs sample `DATA`, then clocks, RCs and signal generators
    /// move to their next value. The combinational logic is then re-evaluated, in device order,
    /// until a whole pass changes nothing. If that has not happened after
    /// [`OSCILLATION_FACTOR`] passes per device the circuit is oscillating.
    pub fn execute_cycle(&self, devices: &mut Devices) -> CycleResult {
        if !self.check_network(devices) {
            warn!("Cannot execute a cycle: some inputs are unconnected");
            return CycleResult::InputsUnconnected;
        }

        let ports = devices.ports().clone();
        let ids = devices.ids();

        // DTYPE data and RC triggers are read as they stood at the end of the last cycle.
        let sampled: Vec<(DeviceId, Signal)> = devices
            .iter()
            .filter_map(|device| {
                let port = match device.kind() {
                    DeviceKind::Dtype => ports.data,
                    DeviceKind::Rc => ports.inputs[0],
                    _ => return None,
                };
                Some((device.id(), input_or_low(devices, device.id(), port)))
            })
            .collect();
        let mut triggers: BTreeMap<DeviceId, Signal> = BTreeMap::new();
        for (id, value) in sampled {
            if let Some(device) = devices.get_device_mut(id) {
                if device.kind() == DeviceKind::Dtype {
                    device.sampled = value;
                } else {
                    triggers.insert(id, value);
                }
            }
        }

        for id in &ids {
            let trigger = triggers.get(id).copied().unwrap_or(Signal::Low);
            if let Some(device) = devices.get_device_mut(*id) {
                step_source(device, trigger);
            }
        }

        let bound = OSCILLATION_FACTOR * devices.len().max(1);
        for pass in 0..bound {
            let mut changed = false;
            for id in &ids {
                for (port, value) in evaluate(devices, &ports, *id) {
                    if let Some(device) = devices.get_device_mut(*id) {
                        changed |= device.set_output(port, value);
                    }
                }
            }

            if !changed {
                trace!("Settled after {} passes", pass + 1);
                latch_dtypes(devices, &ports);
                return CycleResult::Ok;
            }
        }

        warn!("Circuit is oscillating: no stable state after {bound} passes");
        for combinational_loop in self.feedback_loops(devices) {
            debug!("Feedback loop through {combinational_loop:?}");
        }
        CycleResult::Oscillating
    }

    /// Groups of combinational devices that feed back into themselves.
    /// Such a loop is the only way a circuit can fail to settle.
    pub fn feedback_loops(&self, devices: &Devices) -> Vec<Vec<DeviceId>> {
        use petgraph::algo::tarjan_scc;
        use petgraph::graph::{DiGraph, NodeIndex};

        let mut graph = DiGraph::new();
        let mut nodes: BTreeMap<DeviceId, NodeIndex> = BTreeMap::new();
        for device in devices.iter() {
            if device.kind().is_combinational() {
                nodes.insert(device.id(), graph.add_node(device.id()));
            }
        }

        for (driver, inputs) in &self.fanout {
            let (driver_id, _port) = driver;
            for (input_id, _port) in inputs {
                if let (Some(from), Some(to)) = (nodes.get(driver_id), nodes.get(input_id)) {
                    graph.add_edge(*from, *to, ());
                }
            }
        }

        let mut loops: Vec<Vec<DeviceId>> = tarjan_scc(&graph)
            .into_iter()
            .filter(|component| component.len() > 1 || graph.find_edge(component[0], component[0]).is_some())
            .map(|component| {
                let mut ids: Vec<DeviceId> = component.into_iter().map(|node| graph[node]).collect();
                ids.sort();
                ids
            })
            .collect();
        loops.sort();
        loops
    }
}

fn input_or_low(devices: &Devices, id: DeviceId, port: PortId) -> Signal {
    devices.input_signal(id, port).unwrap_or(Signal::Low)
}

fn step_source(device: &mut Device, trigger: Signal) {
    match device.qualifier().clone() {
        Qualifier::HalfPeriod(half_period) => {
            device.counter += 1;
            if device.counter >= half_period {
                device.counter = 0;
                let output = device.output(None).unwrap_or(Signal::Low);
                device.set_output(None, !output);
            }
        },
        Qualifier::HighPeriod(high_period) => {
            if trigger.is_high() && !device.last_edge_input.is_high() {
                device.counter = high_period;
            }
            device.last_edge_input = trigger;
            device.set_output(None, (device.counter > 0).into());
            device.counter = device.counter.saturating_sub(1);
        },
        Qualifier::Sequence(sequence) => {
            let position = device.counter as usize % sequence.len();
            device.set_output(None, sequence[position]);
            device.counter = ((position + 1) % sequence.len()) as u64;
        },
        _ => (),
    }
}

fn evaluate(devices: &Devices, ports: &PortNames, id: DeviceId) -> Vec<(Option<PortId>, Signal)> {
    let device = match devices.get_device(id) {
        Some(device) => device,
        None => return vec![],
    };

    if device.kind().is_combinational() {
        let inputs: Vec<Signal> = device.inputs().keys().map(|port| input_or_low(devices, id, *port)).collect();
        return device.kind().evaluate(&inputs).map(|value| vec![(None, value)]).unwrap_or_default();
    }

    if device.kind() == DeviceKind::Dtype {
        let clk = input_or_low(devices, id, ports.clk);
        let q = if input_or_low(devices, id, ports.clear).is_high() {
            Signal::Low
        } else if input_or_low(devices, id, ports.set).is_high() {
            Signal::High
        } else if clk.is_high() && !device.last_edge_input.is_high() {
            device.sampled
        } else {
            device.memory
        };
        return vec![(Some(ports.q), q), (Some(ports.qbar), !q)];
    }

    vec![]
}

fn latch_dtypes(devices: &mut Devices, ports: &PortNames) {
    for id in devices.find_devices(Some(DeviceKind::Dtype)) {
        let clk = input_or_low(devices, id, ports.clk);
        if let Some(device) = devices.get_device_mut(id) {
            device.memory = device.output(Some(ports.q)).unwrap_or(Signal::Low);
            device.last_edge_input = clk;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Fixture {
        names: Names,
        devices: Devices,
        network: Network,
    }

    impl Fixture {
        fn new() -> Fixture {
            let mut names = Names::new();
            let devices = Devices::new(&mut names);
            Fixture { names, devices, network: Network::new() }
        }

        fn device(&mut self, name: &str, kind: DeviceKind, qualifier: Option<u64>) -> DeviceId {
            let id = self.names.intern(name);
            self.devices.make_device(id, kind, qualifier.map(RawQualifier::Number)).unwrap();
            id
        }

        fn port(&mut self, name: &str) -> Option<PortId> {
            Some(self.names.intern(name))
        }
    }

    #[test]
    fn connections_go_either_way() {
        let mut fx = Fixture::new();
        let sw1 = fx.device("SW1", DeviceKind::Switch, Some(1));
        let sw2 = fx.device("SW2", DeviceKind::Switch, Some(0));
        let g1 = fx.device("G1", DeviceKind::And, Some(2));
        let i1 = fx.port("I1");
        let i2 = fx.port("I2");

        assert_eq!(fx.network.make_connection(&mut fx.devices, sw1, None, g1, i1), Ok(()));
        assert_eq!(fx.network.make_connection(&mut fx.devices, g1, i2, sw2, None), Ok(()));
        assert_eq!(fx.network.connected_output(&fx.devices, g1, i1.unwrap()), Some((sw1, None)));
        assert_eq!(fx.network.connected_output(&fx.devices, g1, i2.unwrap()), Some((sw2, None)));
        assert_eq!(fx.network.fanout(sw1, None), &[(g1, i1.unwrap())]);
        assert!(fx.network.check_network(&fx.devices));
    }

    #[test]
    fn connection_errors() {
        let mut fx = Fixture::new();
        let sw1 = fx.device("SW1", DeviceKind::Switch, Some(1));
        let sw2 = fx.device("SW2", DeviceKind::Switch, Some(1));
        let g1 = fx.device("G1", DeviceKind::And, Some(2));
        let g2 = fx.device("G2", DeviceKind::Or, Some(2));
        let i1 = fx.port("I1");
        let i3 = fx.port("I3");
        let nowhere = fx.names.intern("NOWHERE");

        let mut connect = |a, ap, b, bp| fx.network.make_connection(&mut fx.devices, a, ap, b, bp);
        assert_eq!(connect(nowhere, None, g1, i1), Err(NetworkError::DeviceAbsent));
        assert_eq!(connect(sw1, None, nowhere, i1), Err(NetworkError::DeviceAbsent));
        assert_eq!(connect(sw1, None, sw2, None), Err(NetworkError::OutputToOutput));
        assert_eq!(connect(g1, i1, g2, i1), Err(NetworkError::InputToInput));
        assert_eq!(connect(sw1, None, g1, i3), Err(NetworkError::PortAbsent));
        assert_eq!(connect(g1, i3, sw1, None), Err(NetworkError::PortAbsent));
        assert_eq!(connect(g1, i1, g2, i3), Err(NetworkError::PortAbsent));

        assert_eq!(connect(sw1, None, g1, i1), Ok(()));
        assert_eq!(connect(sw2, None, g1, i1), Err(NetworkError::InputConnected));
        assert_eq!(connect(g1, i1, sw2, None), Err(NetworkError::InputConnected));
    }

    #[test]
    fn unconnected_inputs_stop_the_cycle() {
        let mut fx = Fixture::new();
        let sw1 = fx.device("SW1", DeviceKind::Switch, Some(1));
        let g1 = fx.device("G1", DeviceKind::Nand, Some(2));
        let i1 = fx.port("I1");
        fx.network.make_connection(&mut fx.devices, sw1, None, g1, i1).unwrap();

        assert!(!fx.network.check_network(&fx.devices));
        assert_eq!(fx.network.execute_cycle(&mut fx.devices), CycleResult::InputsUnconnected);
        assert_eq!(fx.devices.output_signal(g1, None), Some(Signal::Low));
    }

    #[test]
    fn inverter_ring_oscillates() {
        let mut fx = Fixture::new();
        let sw1 = fx.device("SW1", DeviceKind::Switch, Some(1));
        let g1 = fx.device("G1", DeviceKind::Nand, Some(2));
        let i1 = fx.port("I1");
        let i2 = fx.port("I2");
        fx.network.make_connection(&mut fx.devices, sw1, None, g1, i1).unwrap();
        fx.network.make_connection(&mut fx.devices, g1, None, g1, i2).unwrap();

        assert_eq!(fx.network.execute_cycle(&mut fx.devices), CycleResult::Oscillating);
        assert_eq!(fx.network.feedback_loops(&fx.devices), vec![vec![g1]]);

        // opening the loop lets it settle
        fx.devices.set_switch(sw1, Signal::Low);
        assert_eq!(fx.network.execute_cycle(&mut fx.devices), CycleResult::Ok);
        assert_eq!(fx.devices.output_signal(g1, None), Some(Signal::High));
    }

    #[test]
    fn cross_coupled_nands_hold_state() {
        let mut fx = Fixture::new();
        let set = fx.device("SETN", DeviceKind::Switch, Some(0));
        let reset = fx.device("RESETN", DeviceKind::Switch, Some(1));
        let g1 = fx.device("G1", DeviceKind::Nand, Some(2));
        let g2 = fx.device("G2", DeviceKind::Nand, Some(2));
        let i1 = fx.port("I1");
        let i2 = fx.port("I2");
        fx.network.make_connection(&mut fx.devices, set, None, g1, i1).unwrap();
        fx.network.make_connection(&mut fx.devices, reset, None, g2, i1).unwrap();
        fx.network.make_connection(&mut fx.devices, g2, None, g1, i2).unwrap();
        fx.network.make_connection(&mut fx.devices, g1, None, g2, i2).unwrap();

        assert_eq!(fx.network.execute_cycle(&mut fx.devices), CycleResult::Ok);
        assert_eq!(fx.devices.output_signal(g1, None), Some(Signal::High));
        assert_eq!(fx.devices.output_signal(g2, None), Some(Signal::Low));

        fx.devices.set_switch(set, Signal::High);
        assert_eq!(fx.network.execute_cycle(&mut fx.devices), CycleResult::Ok);
        assert_eq!(fx.devices.output_signal(g1, None), Some(Signal::High));

        assert_eq!(fx.network.feedback_loops(&fx.devices), vec![vec![g1, g2]]);
    }

    #[test]
    fn clock_toggles_every_half_period() {
        let mut fx = Fixture::new();
        let ck = fx.device("CK", DeviceKind::Clock, Some(2));
        let mut outputs = vec![];
        for _ in 0..8 {
            assert!(fx.network.execute_cycle(&mut fx.devices).is_ok());
            outputs.push(fx.devices.output_signal(ck, None).unwrap());
        }
        use Signal::*;
        assert_eq!(outputs, vec![Low, High, High, Low, Low, High, High, Low]);
    }
}
