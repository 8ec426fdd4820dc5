use super::*;

use log::*;
use std::collections::BTreeMap;

/// One recorded value in a monitor's history.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Sample {
    /// The monitor did not exist yet during this cycle.
    Blank,
    Low,
    High,
}

impl From<Signal> for Sample {
    fn from(signal: Signal) -> Sample {
        match signal {
            Signal::Low => Sample::Low,
            Signal::High => Sample::High,
        }
    }
}

impl std::fmt::Display for Sample {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        match self {
            Sample::Blank => write!(f, "x"),
            Sample::Low => write!(f, "0"),
            Sample::High => write!(f, "1"),
        }
    }
}

/// The outputs being watched, and what they have done so far.
///
/// Every history is as long as the number of cycles recorded.
/// A monitor added part way through a run starts with [`Sample::Blank`]s
/// for the cycles it missed.
#[derive(Debug, Clone, Default)]
pub struct Monitors {
    monitors: BTreeMap<Driver, Vec<Sample>>,
    cycles: usize,
}

impl Monitors {
    pub fn new() -> Monitors {
        Monitors::default()
    }

    pub fn make_monitor(&mut self, devices: &Devices, id: DeviceId, port: Option<PortId>) -> Result<(), MonitorError> {
        let device = devices.get_device(id).ok_or(MonitorError::DeviceAbsent)?;
        if device.has_input(port) {
            return Err(MonitorError::NotOutput);
        } else if !device.has_output(port) {
            return Err(MonitorError::PortAbsent);
        } else if self.monitors.contains_key(&(id, port)) {
            return Err(MonitorError::MonitorPresent);
        }

        debug!("make_monitor: {id} {port:?}");
        self.monitors.insert((id, port), vec![Sample::Blank; self.cycles]);
        Ok(())
    }

    /// Stops watching an output. Returns `false` if it was not being watched.
    pub fn remove_monitor(&mut self, id: DeviceId, port: Option<PortId>) -> bool {
        debug!("remove_monitor: {id} {port:?}");
        self.monitors.remove(&(id, port)).is_some()
    }

    pub fn is_monitored(&self, id: DeviceId, port: Option<PortId>) -> bool {
        self.monitors.contains_key(&(id, port))
    }

    /// Appends the current value of every monitored output to its history.
    pub fn record_signals(&mut self, devices: &Devices) {
        for ((id, port), history) in self.monitors.iter_mut() {
            let sample = devices.output_signal(*id, *port).map(Sample::from).unwrap_or(Sample::Blank);
            history.push(sample);
        }
        self.cycles += 1;
    }

    /// Clears every history, keeping the monitors themselves.
    pub fn reset_monitors(&mut self) {
        for history in self.monitors.values_mut() {
            history.clear();
        }
        self.cycles = 0;
    }

    /// The number of times [`Monitors::record_signals`] was called since the last reset.
    pub fn cycles(&self) -> usize {
        self.cycles
    }

    pub fn len(&self) -> usize {
        self.monitors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.monitors.is_empty()
    }

    pub fn monitors_dictionary(&self) -> &BTreeMap<Driver, Vec<Sample>> {
        &self.monitors
    }

    pub fn trace(&self, id: DeviceId, port: Option<PortId>) -> Option<&[Sample]> {
        self.monitors.get(&(id, port)).map(|history| history.as_slice())
    }

    /// The names of the monitored outputs, and of every other output in the circuit.
    pub fn signal_names(&self, names: &Names, devices: &Devices) -> (Vec<String>, Vec<String>) {
        let mut monitored = vec![];
        let mut unmonitored = vec![];
        for device in devices.iter() {
            for port in device.outputs().keys() {
                if let Some(name) = devices.signal_name(names, device.id(), *port) {
                    if self.is_monitored(device.id(), *port) {
                        monitored.push(name);
                    } else {
                        unmonitored.push(name);
                    }
                }
            }
        }
        (monitored, unmonitored)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn monitor_errors() {
        let mut names = Names::new();
        let mut devices = Devices::new(&mut names);
        let mut monitors = Monitors::new();
        let [g1, d1, nowhere] = ["G1", "D1", "NOWHERE"].map(|name| names.intern(name));
        devices.make_device(g1, DeviceKind::Or, Some(RawQualifier::Number(2))).unwrap();
        devices.make_device(d1, DeviceKind::Dtype, None).unwrap();
        let ports = devices.ports().clone();

        assert_eq!(monitors.make_monitor(&devices, nowhere, None), Err(MonitorError::DeviceAbsent));
        assert_eq!(monitors.make_monitor(&devices, g1, Some(ports.inputs[0])), Err(MonitorError::NotOutput));
        assert_eq!(monitors.make_monitor(&devices, d1, None), Err(MonitorError::PortAbsent));
        assert_eq!(monitors.make_monitor(&devices, d1, Some(ports.data)), Err(MonitorError::NotOutput));
        assert_eq!(monitors.make_monitor(&devices, g1, Some(ports.q)), Err(MonitorError::PortAbsent));
        assert_eq!(monitors.make_monitor(&devices, d1, Some(ports.qbar)), Ok(()));
        assert_eq!(monitors.make_monitor(&devices, d1, Some(ports.qbar)), Err(MonitorError::MonitorPresent));
        assert_eq!(monitors.len(), 1);

        let (monitored, unmonitored) = monitors.signal_names(&names, &devices);
        assert_eq!(monitored, vec!["D1.QBAR".to_string()]);
        assert_eq!(unmonitored, vec!["G1".to_string(), "D1.Q".to_string()]);

        assert!(monitors.remove_monitor(d1, Some(ports.qbar)));
        assert!(!monitors.remove_monitor(d1, Some(ports.qbar)));
        assert!(monitors.is_empty());
    }

    #[test]
    fn late_monitors_are_padded() {
        let mut names = Names::new();
        let mut devices = Devices::new(&mut names);
        let mut monitors = Monitors::new();
        let [sw1, sw2] = ["SW1", "SW2"].map(|name| names.intern(name));
        devices.make_device(sw1, DeviceKind::Switch, Some(RawQualifier::Number(1))).unwrap();
        devices.make_device(sw2, DeviceKind::Switch, Some(RawQualifier::Number(0))).unwrap();

        monitors.make_monitor(&devices, sw1, None).unwrap();
        monitors.record_signals(&devices);
        monitors.record_signals(&devices);
        monitors.make_monitor(&devices, sw2, None).unwrap();
        monitors.record_signals(&devices);

        assert_eq!(monitors.cycles(), 3);
        assert_eq!(monitors.trace(sw1, None), Some(&[Sample::High, Sample::High, Sample::High][..]));
        assert_eq!(monitors.trace(sw2, None), Some(&[Sample::Blank, Sample::Blank, Sample::Low][..]));

        monitors.reset_monitors();
        assert_eq!(monitors.cycles(), 0);
        assert_eq!(monitors.trace(sw2, None), Some(&[][..]));
    }
}
