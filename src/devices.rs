use super::*;

use log::*;
use std::collections::BTreeMap;

pub type DeviceId = NameId;
pub type PortId = NameId;

pub const MIN_GATE_INPUTS: u64 = 2;
pub const MAX_GATE_INPUTS: u64 = 16;

/// The value on a single-bit port.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub enum Signal {
    #[default]
    Low,
    High,
}

impl Signal {
    pub fn is_high(&self) -> bool {
        *self == Signal::High
    }
}

impl From<bool> for Signal {
    fn from(x: bool) -> Signal {
        if x {
            Signal::High
        } else {
            Signal::Low
        }
    }
}

impl std::ops::Not for Signal {
    type Output = Signal;

    fn not(self) -> Signal {
        match self {
            Signal::Low => Signal::High,
            Signal::High => Signal::Low,
        }
    }
}

impl std::fmt::Display for Signal {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        match self {
            Signal::Low => write!(f, "0"),
            Signal::High => write!(f, "1"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum DeviceKind {
    And,
    Nand,
    Or,
    Nor,
    Xor,
    Dtype,
    Switch,
    Clock,
    Rc,
    Siggen,
}

impl DeviceKind {
    pub const ALL: [DeviceKind; 10] = [
        DeviceKind::And,
        DeviceKind::Nand,
        DeviceKind::Or,
        DeviceKind::Nor,
        DeviceKind::Xor,
        DeviceKind::Dtype,
        DeviceKind::Switch,
        DeviceKind::Clock,
        DeviceKind::Rc,
        DeviceKind::Siggen,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            DeviceKind::And => "AND",
            DeviceKind::Nand => "NAND",
            DeviceKind::Or => "OR",
            DeviceKind::Nor => "NOR",
            DeviceKind::Xor => "XOR",
            DeviceKind::Dtype => "DTYPE",
            DeviceKind::Switch => "SWITCH",
            DeviceKind::Clock => "CLOCK",
            DeviceKind::Rc => "RC",
            DeviceKind::Siggen => "SIGGEN",
        }
    }

    /// The device kind a statement keyword declares, if any.
    pub fn from_keyword(keyword: Keyword) -> Option<DeviceKind> {
        match keyword {
            Keyword::And => Some(DeviceKind::And),
            Keyword::Nand => Some(DeviceKind::Nand),
            Keyword::Or => Some(DeviceKind::Or),
            Keyword::Nor => Some(DeviceKind::Nor),
            Keyword::Xor => Some(DeviceKind::Xor),
            Keyword::Dtype => Some(DeviceKind::Dtype),
            Keyword::Switch => Some(DeviceKind::Switch),
            Keyword::Clock => Some(DeviceKind::Clock),
            Keyword::Rc => Some(DeviceKind::Rc),
            Keyword::Siggen => Some(DeviceKind::Siggen),
            Keyword::Connect | Keyword::Monitor => None,
        }
    }

    pub fn is_gate(&self) -> bool {
        matches!(self, DeviceKind::And | DeviceKind::Nand | DeviceKind::Or | DeviceKind::Nor)
    }

    /// Gates and XORs, whose outputs are a pure function of their inputs.
    pub fn is_combinational(&self) -> bool {
        self.is_gate() || *self == DeviceKind::Xor
    }

    pub fn takes_qualifier(&self) -> bool {
        !matches!(self, DeviceKind::Xor | DeviceKind::Dtype)
    }

    /// Output of a gate or XOR for the given inputs.
    pub fn evaluate(&self, inputs: &[Signal]) -> Option<Signal> {
        let all_high = inputs.iter().all(|input| input.is_high());
        let any_high = inputs.iter().any(|input| input.is_high());
        match self {
            DeviceKind::And => Some(all_high.into()),
            DeviceKind::Nand => Some((!all_high).into()),
            DeviceKind::Or => Some(any_high.into()),
            DeviceKind::Nor => Some((!any_high).into()),
            DeviceKind::Xor => Some((inputs.iter().filter(|input| input.is_high()).count() % 2 == 1).into()),
            _ => None,
        }
    }
}

impl std::str::FromStr for DeviceKind {
    type Err = DeviceError;

    fn from_str(s: &str) -> Result<DeviceKind, DeviceError> {
        DeviceKind::ALL
            .iter()
            .copied()
            .find(|kind| kind.as_str() == s)
            .ok_or(DeviceError::BadDevice)
    }
}

impl std::fmt::Display for DeviceKind {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A qualifier as written, before it has been checked against the device kind.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RawQualifier {
    Number(u64),
    /// The digits of a number token, kept as written.
    Sequence(String),
}

/// A checked, kind-specific device configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Qualifier {
    None,
    Inputs(usize),
    InitialState(Signal),
    HalfPeriod(u64),
    HighPeriod(u64),
    Sequence(Vec<Signal>),
}

impl Qualifier {
    fn validate(kind: DeviceKind, raw: Option<RawQualifier>) -> Result<Qualifier, DeviceError> {
        let raw = match (kind.takes_qualifier(), raw) {
            (true, None) => return Err(DeviceError::NoQualifier),
            (false, Some(_raw)) => return Err(DeviceError::QualifierPresent),
            (false, None) => return Ok(Qualifier::None),
            (true, Some(raw)) => raw,
        };

        match (kind, raw) {
            (kind, RawQualifier::Number(n)) if kind.is_gate() => {
                if (MIN_GATE_INPUTS..=MAX_GATE_INPUTS).contains(&n) {
                    Ok(Qualifier::Inputs(n as usize))
                } else {
                    Err(DeviceError::InvalidQualifier)
                }
            },
            (DeviceKind::Switch, RawQualifier::Number(0)) => Ok(Qualifier::InitialState(Signal::Low)),
            (DeviceKind::Switch, RawQualifier::Number(1)) => Ok(Qualifier::InitialState(Signal::High)),
            (DeviceKind::Clock, RawQualifier::Number(n)) if n >= 1 => Ok(Qualifier::HalfPeriod(n)),
            (DeviceKind::Rc, RawQualifier::Number(n)) if n >= 1 => Ok(Qualifier::HighPeriod(n)),
            (DeviceKind::Siggen, RawQualifier::Sequence(bits)) => {
                let sequence: Option<Vec<Signal>> = bits
                    .chars()
                    .map(|bit| match bit {
                        '0' => Some(Signal::Low),
                        '1' => Some(Signal::High),
                        _ => None,
                    })
                    .collect();
                match sequence {
                    Some(sequence) if !sequence.is_empty() => Ok(Qualifier::Sequence(sequence)),
                    _ => Err(DeviceError::InvalidQualifier),
                }
            },
            _ => Err(DeviceError::InvalidQualifier),
        }
    }
}

/// Where an input port gets its value from: a device and one of its outputs.
pub type Driver = (DeviceId, Option<PortId>);

/// The ids of the fixed port names every circuit uses.
#[derive(Debug, Clone)]
pub struct PortNames {
    /// `I1` to `I16`.
    pub inputs: Vec<PortId>,
    pub data: PortId,
    pub clk: PortId,
    pub set: PortId,
    pub clear: PortId,
    pub q: PortId,
    pub qbar: PortId,
}

impl PortNames {
    fn new(names: &mut Names) -> PortNames {
        let inputs = (1..=MAX_GATE_INPUTS).map(|i| names.intern(&format!("I{i}"))).collect();
        PortNames {
            inputs,
            data: names.intern("DATA"),
            clk: names.intern("CLK"),
            set: names.intern("SET"),
            clear: names.intern("CLEAR"),
            q: names.intern("Q"),
            qbar: names.intern("QBAR"),
        }
    }
}

#[derive(Debug, Clone)]
pub struct Device {
    id: DeviceId,
    kind: DeviceKind,
    qualifier: Qualifier,
    inputs: BTreeMap<PortId, Option<Driver>>,
    outputs: BTreeMap<Option<PortId>, Signal>,

    // CLOCK: cycles since the last toggle. RC: cycles left high. SIGGEN: next bit.
    pub(crate) counter: u64,
    // DTYPE: the stored bit.
    pub(crate) memory: Signal,
    // DTYPE: CLK, and RC: I1, as they were at the end of the last cycle.
    pub(crate) last_edge_input: Signal,
    // DTYPE: DATA as it was at the start of this cycle.
    pub(crate) sampled: Signal,
}

impl Device {
    pub fn id(&self) -> DeviceId {
        self.id
    }

    pub fn kind(&self) -> DeviceKind {
        self.kind
    }

    pub fn qualifier(&self) -> &Qualifier {
        &self.qualifier
    }

    pub fn inputs(&self) -> &BTreeMap<PortId, Option<Driver>> {
        &self.inputs
    }

    pub fn outputs(&self) -> &BTreeMap<Option<PortId>, Signal> {
        &self.outputs
    }

    pub fn has_input(&self, port: Option<PortId>) -> bool {
        port.map(|port| self.inputs.contains_key(&port)).unwrap_or(false)
    }

    pub fn has_output(&self, port: Option<PortId>) -> bool {
        self.outputs.contains_key(&port)
    }

    /// The driver of input `port`. `None` if there is no such input.
    pub fn driver(&self, port: PortId) -> Option<Option<Driver>> {
        self.inputs.get(&port).copied()
    }

    pub fn output(&self, port: Option<PortId>) -> Option<Signal> {
        self.outputs.get(&port).copied()
    }

    pub fn is_fully_connected(&self) -> bool {
        self.inputs.values().all(|driver| driver.is_some())
    }

    pub(crate) fn set_output(&mut self, port: Option<PortId>, value: Signal) -> bool {
        match self.outputs.get_mut(&port) {
            Some(current) if *current != value => {
                *current = value;
                true
            },
            _ => false,
        }
    }

    fn cold_startup(&mut self, ports: &PortNames) {
        self.counter = 0;
        self.memory = Signal::Low;
        self.last_edge_input = Signal::Low;
        self.sampled = Signal::Low;

        for value in self.outputs.values_mut() {
            *value = Signal::Low;
        }
        if let Qualifier::InitialState(state) = self.qualifier {
            self.outputs.insert(None, state);
        }
        if self.kind == DeviceKind::Dtype {
            self.outputs.insert(Some(ports.qbar), Signal::High);
        }
    }
}

/// All the devices of a circuit, in the order their names were first seen.
#[derive(Debug, Clone)]
pub struct Devices {
    devices: BTreeMap<DeviceId, Device>,
    ports: PortNames,
}

impl Devices {
    pub fn new(names: &mut Names) -> Devices {
        Devices {
            devices: BTreeMap::new(),
            ports: PortNames::new(names),
        }
    }

    pub fn ports(&self) -> &PortNames {
        &self.ports
    }

    pub fn len(&self) -> usize {
        self.devices.len()
    }

    pub fn is_empty(&self) -> bool {
        self.devices.is_empty()
    }

    pub fn ids(&self) -> Vec<DeviceId> {
        self.devices.keys().copied().collect()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Device> {
        self.devices.values()
    }

    pub fn get_device(&self, id: DeviceId) -> Option<&Device> {
        self.devices.get(&id)
    }

    pub(crate) fn get_device_mut(&mut self, id: DeviceId) -> Option<&mut Device> {
        self.devices.get_mut(&id)
    }

    /// The ids of every device of `kind`, or of every device when `kind` is `None`.
    pub fn find_devices(&self, kind: Option<DeviceKind>) -> Vec<DeviceId> {
        self.devices
            .values()
            .filter(|device| kind.map(|kind| device.kind == kind).unwrap_or(true))
            .map(|device| device.id)
            .collect()
    }

    /// Creates a device with unconnected inputs and its outputs at their initial values.
    pub fn make_device(&mut self, id: DeviceId, kind: DeviceKind, qualifier: Option<RawQualifier>) -> Result<(), DeviceError> {
        if self.devices.contains_key(&id) {
            return Err(DeviceError::DevicePresent);
        }
        let qualifier = Qualifier::validate(kind, qualifier)?;

        let input_ports: Vec<PortId> = match (&kind, &qualifier) {
            (_, Qualifier::Inputs(n)) => self.ports.inputs[..*n].to_vec(),
            (DeviceKind::Xor, _) => self.ports.inputs[..2].to_vec(),
            (DeviceKind::Rc, _) => self.ports.inputs[..1].to_vec(),
            (DeviceKind::Dtype, _) => vec![self.ports.data, self.ports.clk, self.ports.set, self.ports.clear],
            _ => vec![],
        };
        let output_ports: Vec<Option<PortId>> = match kind {
            DeviceKind::Dtype => vec![Some(self.ports.q), Some(self.ports.qbar)],
            _ => vec![None],
        };

        let mut device = Device {
            id,
            kind,
            qualifier,
            inputs: input_ports.into_iter().map(|port| (port, None)).collect(),
            outputs: output_ports.into_iter().map(|port| (port, Signal::Low)).collect(),
            counter: 0,
            memory: Signal::Low,
            last_edge_input: Signal::Low,
            sampled: Signal::Low,
        };
        device.cold_startup(&self.ports);

        debug!("make_device: {id} {kind} {:?}", device.qualifier);
        self.devices.insert(id, device);
        Ok(())
    }

    /// Sets the output of switch `id`. Returns `false` if `id` is not a switch.
    pub fn set_switch(&mut self, id: DeviceId, value: Signal) -> bool {
        match self.devices.get_mut(&id) {
            Some(device) if device.kind == DeviceKind::Switch => {
                device.outputs.insert(None, value);
                debug!("set_switch: {id} = {value}");
                true
            },
            _ => false,
        }
    }

    /// Puts every device back in its declared initial state. Connections are untouched.
    pub fn cold_startup(&mut self) {
        debug!("cold_startup");
        let ports = &self.ports;
        for device in self.devices.values_mut() {
            device.cold_startup(ports);
        }
    }

    pub fn output_signal(&self, id: DeviceId, port: Option<PortId>) -> Option<Signal> {
        self.devices.get(&id)?.output(port)
    }

    /// The value arriving at input `port` of `id`, read from whatever drives it.
    pub fn input_signal(&self, id: DeviceId, port: PortId) -> Option<Signal> {
        let (driver_id, driver_port) = self.devices.get(&id)?.driver(port)??;
        self.output_signal(driver_id, driver_port)
    }

    pub(crate) fn connect(&mut self, id: DeviceId, port: PortId, driver: Driver) {
        if let Some(device) = self.devices.get_mut(&id) {
            device.inputs.insert(port, Some(driver));
        }
    }

    /// `DEV` for an unnamed output, `DEV.PORT` otherwise.
    pub fn signal_name(&self, names: &Names, id: DeviceId, port: Option<PortId>) -> Option<String> {
        self.devices.get(&id)?;
        let device_name = names.resolve(id)?;
        match port {
            None => Some(device_name.to_string()),
            Some(port) => Some(format!("{device_name}.{}", names.resolve(port)?)),
        }
    }

    /// The inverse of [`Devices::signal_name`].
    pub fn signal_ids(&self, names: &Names, signal_name: &str) -> Option<(DeviceId, Option<PortId>)> {
        let (device_name, port_name) = match signal_name.split_once('.') {
            Some((device_name, port_name)) => (device_name, Some(port_name)),
            None => (signal_name, None),
        };
        let id = names.query(device_name)?;
        let device = self.devices.get(&id)?;
        let port = match port_name {
            Some(port_name) => Some(names.query(port_name)?),
            None => None,
        };
        if device.has_output(port) || device.has_input(port) {
            Some((id, port))
        } else {
            None
        }
    }
}
