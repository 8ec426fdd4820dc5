use super::*;

use log::*;
use std::collections::BTreeMap;

/// A complete circuit: its devices, the connections between them, and the monitors watching them.
#[derive(Debug, Clone)]
pub struct Circuit {
    devices: Devices,
    network: Network,
    monitors: Monitors,
}

impl Circuit {
    pub fn new(names: &mut Names) -> Circuit {
        Circuit {
            devices: Devices::new(names),
            network: Network::new(),
            monitors: Monitors::new(),
        }
    }

    pub fn devices(&self) -> &Devices {
        &self.devices
    }

    pub fn network(&self) -> &Network {
        &self.network
    }

    pub fn monitors(&self) -> &Monitors {
        &self.monitors
    }

    pub fn make_device(&mut self, id: DeviceId, kind: DeviceKind, qualifier: Option<RawQualifier>) -> Result<(), DeviceError> {
        self.devices.make_device(id, kind, qualifier)
    }

    pub fn make_connection(
        &mut self,
        first_id: DeviceId,
        first_port: Option<PortId>,
        second_id: DeviceId,
        second_port: Option<PortId>,
    ) -> Result<(), NetworkError> {
        self.network.make_connection(&mut self.devices, first_id, first_port, second_id, second_port)
    }

    pub fn make_monitor(&mut self, id: DeviceId, port: Option<PortId>) -> Result<(), MonitorError> {
        self.monitors.make_monitor(&self.devices, id, port)
    }

    pub fn remove_monitor(&mut self, id: DeviceId, port: Option<PortId>) -> bool {
        self.monitors.remove_monitor(id, port)
    }

    pub fn find_devices(&self, kind: Option<DeviceKind>) -> Vec<DeviceId> {
        self.devices.find_devices(kind)
    }

    pub fn get_device(&self, id: DeviceId) -> Option<&Device> {
        self.devices.get_device(id)
    }

    pub fn set_switch(&mut self, id: DeviceId, value: Signal) -> bool {
        self.devices.set_switch(id, value)
    }

    pub fn monitors_dictionary(&self) -> &BTreeMap<Driver, Vec<Sample>> {
        self.monitors.monitors_dictionary()
    }

    pub fn execute_cycle(&mut self) -> CycleResult {
        self.network.execute_cycle(&mut self.devices)
    }

    pub fn record_signals(&mut self) {
        self.monitors.record_signals(&self.devices)
    }

    pub fn cold_startup(&mut self) {
        self.devices.cold_startup()
    }

    pub fn reset_monitors(&mut self) {
        self.monitors.reset_monitors()
    }

    /// Starts over from the initial state and runs `cycles` cycles.
    pub fn run(&mut self, cycles: usize) -> CycleResult {
        info!("Running for {cycles} cycles");
        self.cold_startup();
        self.reset_monitors();
        self.continue_run(cycles)
    }

    /// Runs `cycles` more cycles, recording after each one.
    /// Stops at the first cycle that does not complete.
    pub fn continue_run(&mut self, cycles: usize) -> CycleResult {
        for _ in 0..cycles {
            let result = self.execute_cycle();
            if !result.is_ok() {
                warn!("Stopped after {} cycles: {result:?}", self.monitors.cycles());
                return result;
            }
            self.record_signals();
        }
        CycleResult::Ok
    }
}
