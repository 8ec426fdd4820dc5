use super::*;

/// Why [`Devices::make_device`] refused to create a device.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeviceError {
    DevicePresent,
    BadDevice,
    NoQualifier,
    InvalidQualifier,
    QualifierPresent,
}

/// Why [`Network::make_connection`] refused to connect two ports.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NetworkError {
    DeviceAbsent,
    PortAbsent,
    InputToInput,
    OutputToOutput,
    InputConnected,
}

/// Why [`Monitors::make_monitor`] refused to place a monitor.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MonitorError {
    DeviceAbsent,
    PortAbsent,
    NotOutput,
    MonitorPresent,
}

/// Every kind of load-time error, syntactic or semantic.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum ErrorKind {
    NameExpected,
    SemicolonExpected,
    KeywordExpected,
    NumberExpected,
    ArrowExpected,

    DevicePresent,
    BadDevice,
    NoQualifier,
    InvalidQualifier,
    QualifierPresent,

    DeviceAbsent,
    PortAbsent,
    InputToInput,
    OutputToOutput,
    InputConnected,

    NotOutput,
    MonitorPresent,
}

impl From<DeviceError> for ErrorKind {
    fn from(error: DeviceError) -> ErrorKind {
        match error {
            DeviceError::DevicePresent => ErrorKind::DevicePresent,
            DeviceError::BadDevice => ErrorKind::BadDevice,
            DeviceError::NoQualifier => ErrorKind::NoQualifier,
            DeviceError::InvalidQualifier => ErrorKind::InvalidQualifier,
            DeviceError::QualifierPresent => ErrorKind::QualifierPresent,
        }
    }
}

impl From<NetworkError> for ErrorKind {
    fn from(error: NetworkError) -> ErrorKind {
        match error {
            NetworkError::DeviceAbsent => ErrorKind::DeviceAbsent,
            NetworkError::PortAbsent => ErrorKind::PortAbsent,
            NetworkError::InputToInput => ErrorKind::InputToInput,
            NetworkError::OutputToOutput => ErrorKind::OutputToOutput,
            NetworkError::InputConnected => ErrorKind::InputConnected,
        }
    }
}

impl From<MonitorError> for ErrorKind {
    fn from(error: MonitorError) -> ErrorKind {
        match error {
            MonitorError::DeviceAbsent => ErrorKind::DeviceAbsent,
            MonitorError::PortAbsent => ErrorKind::PortAbsent,
            MonitorError::NotOutput => ErrorKind::NotOutput,
            MonitorError::MonitorPresent => ErrorKind::MonitorPresent,
        }
    }
}

impl std::fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        match self {
            ErrorKind::NameExpected => write!(f, "Expected a name"),
            ErrorKind::SemicolonExpected => write!(f, "Expected a semicolon or comma"),
            ErrorKind::KeywordExpected => write!(f, "Expected a keyword"),
            ErrorKind::NumberExpected => write!(f, "Expected a number"),
            ErrorKind::ArrowExpected => write!(f, "Expected an arrow"),
            ErrorKind::DevicePresent => write!(f, "A device with this name already exists"),
            ErrorKind::BadDevice => write!(f, "Unknown device kind"),
            ErrorKind::NoQualifier => write!(f, "This device needs a qualifier"),
            ErrorKind::InvalidQualifier => write!(f, "Qualifier is out of range for this device"),
            ErrorKind::QualifierPresent => write!(f, "This device does not take a qualifier"),
            ErrorKind::DeviceAbsent => write!(f, "No such device"),
            ErrorKind::PortAbsent => write!(f, "No such port on this device"),
            ErrorKind::InputToInput => write!(f, "Cannot connect an input to an input"),
            ErrorKind::OutputToOutput => write!(f, "Cannot connect an output to an output"),
            ErrorKind::InputConnected => write!(f, "Input is already connected"),
            ErrorKind::NotOutput => write!(f, "Only outputs can be monitored"),
            ErrorKind::MonitorPresent => write!(f, "This output is already monitored"),
        }
    }
}

impl std::fmt::Display for DeviceError {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        write!(f, "{}", ErrorKind::from(*self))
    }
}

impl std::fmt::Display for NetworkError {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        write!(f, "{}", ErrorKind::from(*self))
    }
}

impl std::fmt::Display for MonitorError {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        write!(f, "{}", ErrorKind::from(*self))
    }
}

impl std::error::Error for DeviceError {}
impl std::error::Error for NetworkError {}
impl std::error::Error for MonitorError {}

/// A load-time error and the symbol it was reported at.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Diagnostic {
    pub kind: ErrorKind,
    pub span: Span,
}

impl Diagnostic {
    pub fn new(kind: ErrorKind, span: Span) -> Diagnostic {
        Diagnostic { kind, span }
    }
}

impl HasSpan for Diagnostic {
    fn span(&self) -> Span {
        self.span
    }
}

impl std::fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        if self.span.is_unknown() {
            write!(f, "Error: {}", self.kind)
        } else {
            write!(f, "{}: Error: {}", self.span, self.kind)
        }
    }
}

impl std::error::Error for Diagnostic {}

/// Why a circuit could not be loaded.
#[derive(Debug)]
pub enum LoadError {
    Io(std::io::Error),
    Invalid(Vec<Diagnostic>),
}

impl From<std::io::Error> for LoadError {
    fn from(error: std::io::Error) -> LoadError {
        LoadError::Io(error)
    }
}

impl std::fmt::Display for LoadError {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        match self {
            LoadError::Io(error) => write!(f, "{error}"),
            LoadError::Invalid(diagnostics) => write!(f, "Circuit has {} errors.", diagnostics.len()),
        }
    }
}

impl std::error::Error for LoadError {}
