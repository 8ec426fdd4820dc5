use super::*;

use log::*;

pub fn load_circuit_from_file<P: AsRef<std::path::Path>>(path: P, names: &mut Names) -> Result<Circuit, LoadError> {
    let circuit = Circuit::new(names);
    let scanner = Scanner::open(path, names)?;
    circuit_from_scanner(scanner, circuit).map_err(LoadError::Invalid)
}

pub fn load_circuit_from_string(text: &str, names: &mut Names) -> Result<Circuit, Vec<Diagnostic>> {
    let circuit = Circuit::new(names);
    let scanner = Scanner::from_str(text, names);
    circuit_from_scanner(scanner, circuit)
}

fn circuit_from_scanner(scanner: Scanner<'_>, mut circuit: Circuit) -> Result<Circuit, Vec<Diagnostic>> {
    let diagnostics = {
        let mut parser = Parser::new(scanner, &mut circuit);
        parser.parse();
        parser.into_diagnostics()
    };
    if diagnostics.is_empty() {
        Ok(circuit)
    } else {
        Err(diagnostics)
    }
}

/// What the items of a statement declare.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Statement {
    Device(DeviceKind),
    Connect,
    Monitor,
}

impl From<Keyword> for Statement {
    fn from(keyword: Keyword) -> Statement {
        match (keyword, DeviceKind::from_keyword(keyword)) {
            (_, Some(kind)) => Statement::Device(kind),
            (Keyword::Monitor, None) => Statement::Monitor,
            _ => Statement::Connect,
        }
    }
}

/// A recursive descent parser for circuit definitions.
///
/// ```text
/// file        = { statement } ;
/// statement   = keyword item { "," item } ";" ;
/// device      = [ NUMBER ] NAME ;
/// connection  = node ">" node ;
/// monitor     = node ;
/// node        = NAME [ "." NAME ] ;
/// ```
///
/// Devices, connections and monitors are built as soon as each item is read.
/// On an error the parser skips to the next `,` or `;`.
/// After a `,` it carries on with the rest of the statement.
pub struct Parser<'a> {
    scanner: Scanner<'a>,
    circuit: &'a mut Circuit,
    symbol: Symbol,
    diagnostics: Vec<Diagnostic>,
}

impl<'a> Parser<'a> {
    pub fn new(scanner: Scanner<'a>, circuit: &'a mut Circuit) -> Parser<'a> {
        Parser {
            scanner,
            circuit,
            symbol: Symbol::new(Token::Eof, Span::unknown()),
            diagnostics: vec![],
        }
    }

    /// Parses the whole input, building the circuit as it goes.
    /// Returns `true` if no errors were found.
    pub fn parse(&mut self) -> bool {
        self.advance();
        while !self.symbol.is_eof() {
            match self.symbol.token {
                Token::Keyword(keyword, _id) => self.statement(keyword.into()),
                _ => {
                    self.error::<()>(ErrorKind::KeywordExpected);
                },
            }
        }

        info!("Parsed with {} errors", self.error_count());
        self.diagnostics.is_empty()
    }

    pub fn error_count(&self) -> usize {
        self.diagnostics.len()
    }

    pub fn diagnostics(&self) -> &[Diagnostic] {
        &self.diagnostics
    }

    pub fn into_diagnostics(self) -> Vec<Diagnostic> {
        self.diagnostics
    }

    pub fn source_info(&self) -> &SourceInfo {
        self.scanner.source_info()
    }

    pub fn names(&self) -> &Names {
        self.scanner.names()
    }

    fn advance(&mut self) {
        self.symbol = self.scanner.next_symbol();
    }

    fn statement(&mut self, statement: Statement) {
        debug!("{statement:?} statement at {}", self.symbol.span);
        self.scanner.hold(self.symbol.clone());
        self.advance();

        if self.item(statement).is_none() {
            return;
        }
        while self.symbol.token == Token::Comma {
            self.advance();
            if self.item(statement).is_none() {
                return;
            }
        }

        if self.symbol.token == Token::Semicolon {
            self.scanner.release();
            self.advance();
        } else {
            self.error::<()>(ErrorKind::SemicolonExpected);
        }
    }

    fn item(&mut self, statement: Statement) -> Option<()> {
        match statement {
            Statement::Device(kind) => self.device(kind),
            Statement::Connect => self.connection(),
            Statement::Monitor => self.monitor(),
        }
    }

    fn device(&mut self, kind: DeviceKind) -> Option<()> {
        let qualifier = match kind {
            DeviceKind::Xor | DeviceKind::Dtype => None,
            DeviceKind::Siggen => {
                let (_value, digits, span) = self.number()?;
                Some((RawQualifier::Sequence(digits), span))
            },
            _ => {
                let (value, _digits, span) = self.number()?;
                Some((RawQualifier::Number(value), span))
            },
        };
        let (id, name_span) = self.new_device_name()?;

        let (qualifier, qualifier_span) = match qualifier {
            Some((qualifier, span)) => (Some(qualifier), span),
            None => (None, name_span),
        };
        match self.circuit.make_device(id, kind, qualifier) {
            Ok(()) => Some(()),
            Err(DeviceError::InvalidQualifier) => self.error_at(DeviceError::InvalidQualifier.into(), qualifier_span),
            Err(error) => self.error_at(error.into(), name_span),
        }
    }

    fn connection(&mut self) -> Option<()> {
        let (first_id, first_port, first_span) = self.node()?;
        self.arrow()?;
        let (second_id, second_port, second_span) = self.node()?;

        match self.circuit.make_connection(first_id, first_port, second_id, second_port) {
            Ok(()) => Some(()),
            Err(error) => self.error_at(error.into(), first_span.to(second_span)),
        }
    }

    fn monitor(&mut self) -> Option<()> {
        let (id, port, span) = self.node()?;
        match self.circuit.make_monitor(id, port) {
            Ok(()) => Some(()),
            Err(error) => self.error_at(error.into(), span),
        }
    }

    /// `DEVICE` or `DEVICE.PORT`. A bare device name is only a node if the device has an unnamed output.
    fn node(&mut self) -> Option<(DeviceId, Option<PortId>, Span)> {
        let (id, device_span) = self.existing_device_name()?;

        if self.symbol.token == Token::Dot {
            self.advance();
            let port_span = self.symbol.span;
            let port = match self.symbol.token {
                Token::Name(port) => port,
                _ => return self.error(ErrorKind::NameExpected),
            };
            let is_port = self
                .circuit
                .get_device(id)
                .map(|device| device.has_input(Some(port)) || device.has_output(Some(port)))
                .unwrap_or(false);
            if !is_port {
                return self.error(ErrorKind::PortAbsent);
            }
            self.advance();
            Some((id, Some(port), device_span.to(port_span)))
        } else {
            let has_unnamed_output = self.circuit.get_device(id).map(|device| device.has_output(None)).unwrap_or(false);
            if !has_unnamed_output {
                return self.error_at(ErrorKind::PortAbsent, device_span);
            }
            Some((id, None, device_span))
        }
    }

    fn existing_device_name(&mut self) -> Option<(DeviceId, Span)> {
        let span = self.symbol.span;
        match self.symbol.token {
            Token::Name(id) if self.circuit.get_device(id).is_some() => {
                self.advance();
                Some((id, span))
            },
            Token::Name(_id) => self.error(ErrorKind::DeviceAbsent),
            _ => self.error(ErrorKind::NameExpected),
        }
    }

    fn new_device_name(&mut self) -> Option<(DeviceId, Span)> {
        let span = self.symbol.span;
        match self.symbol.token {
            Token::Name(id) if self.circuit.get_device(id).is_some() => self.error(ErrorKind::DevicePresent),
            Token::Name(id) => {
                self.advance();
                Some((id, span))
            },
            _ => self.error(ErrorKind::NameExpected),
        }
    }

    fn number(&mut self) -> Option<(u64, String, Span)> {
        let span = self.symbol.span;
        match &self.symbol.token {
            Token::Number(value, digits) => {
                let number = (*value, digits.clone(), span);
                self.advance();
                Some(number)
            },
            _ => self.error(ErrorKind::NumberExpected),
        }
    }

    fn arrow(&mut self) -> Option<()> {
        if self.symbol.token == Token::Arrow {
            self.advance();
            Some(())
        } else {
            self.error(ErrorKind::ArrowExpected)
        }
    }

    fn error<T>(&mut self, kind: ErrorKind) -> Option<T> {
        self.error_at(kind, self.symbol.span)
    }

    /// Records an error, then skips to the end of the current item.
    fn error_at<T>(&mut self, kind: ErrorKind, span: Span) -> Option<T> {
        let diagnostic = Diagnostic::new(kind, span);
        debug!("{diagnostic}");
        self.diagnostics.push(diagnostic);

        while !matches!(self.symbol.token, Token::Semicolon | Token::Comma | Token::Eof) {
            self.advance();
        }
        match self.symbol.token {
            Token::Comma => {
                // the rest of the list is read as a statement of its own
                self.scanner.replay_held();
                self.advance();
            },
            Token::Semicolon => {
                self.scanner.release();
                self.advance();
            },
            _ => self.scanner.release(),
        }
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(text: &str) -> (Names, Circuit, Vec<Diagnostic>) {
        let mut names = Names::new();
        let mut circuit = Circuit::new(&mut names);
        let diagnostics = {
            let scanner = Scanner::from_str(text, &mut names);
            let mut parser = Parser::new(scanner, &mut circuit);
            parser.parse();
            parser.into_diagnostics()
        };
        (names, circuit, diagnostics)
    }

    fn kinds(diagnostics: &[Diagnostic]) -> Vec<ErrorKind> {
        diagnostics.iter().map(|diagnostic| diagnostic.kind).collect()
    }

    #[test]
    fn empty_input() {
        let (_names, circuit, diagnostics) = parse("");
        assert!(diagnostics.is_empty());
        assert!(circuit.devices().is_empty());
    }

    #[test]
    fn well_formed() {
        let (names, circuit, diagnostics) = parse("
            SWITCH 1 SW1, 0 SW2;
            AND 2 G1;
            DTYPE D1;
            SIGGEN 0110 S1;
            CONNECT SW1 > G1.I1, G1.I2 > SW2;
            CONNECT G1 > D1.DATA, S1 > D1.CLK, SW2 > D1.SET, SW2 > D1.CLEAR;
            MONITOR G1, D1.Q;
        ");
        assert_eq!(diagnostics, vec![]);
        assert_eq!(circuit.devices().len(), 5);
        assert_eq!(circuit.monitors().len(), 2);
        assert!(circuit.network().check_network(circuit.devices()));

        let s1 = names.query("S1").unwrap();
        use Signal::*;
        assert_eq!(
            circuit.get_device(s1).unwrap().qualifier(),
            &Qualifier::Sequence(vec![Low, High, High, Low]),
        );
    }

    #[test]
    fn one_error_per_bad_statement() {
        let (_names, circuit, diagnostics) = parse("
            AND 2;
            SWITCH SW1;
            OR 2 G2
            CONNECT > G2.I1;
            G3;
            XOR X1;
        ");
        assert_eq!(
            kinds(&diagnostics),
            vec![ErrorKind::NameExpected, ErrorKind::NumberExpected, ErrorKind::SemicolonExpected, ErrorKind::KeywordExpected],
        );
        // `OR 2 G2` was created before its missing semicolon was noticed
        assert_eq!(circuit.devices().len(), 2);
    }

    #[test]
    fn semantic_errors() {
        let (_names, circuit, diagnostics) = parse("
            NAND 17 G1;
            XOR 2 X1;
            CLOCK C1;
            SWITCH 1 SW1, 1 SW1;
        ");
        assert_eq!(
            kinds(&diagnostics),
            vec![ErrorKind::InvalidQualifier, ErrorKind::NameExpected, ErrorKind::NumberExpected, ErrorKind::DevicePresent],
        );
        assert_eq!(diagnostics[0].span, Span::new(2, 18, 19));
        assert_eq!(circuit.devices().len(), 1);
    }

    #[test]
    fn keywords_are_not_names() {
        let (_names, circuit, diagnostics) = parse("AND 2 MONITOR;");
        assert_eq!(kinds(&diagnostics), vec![ErrorKind::NameExpected]);
        assert!(circuit.devices().is_empty());
    }

    #[test]
    fn comma_recovery_keeps_the_rest_of_the_list() {
        let (names, circuit, diagnostics) = parse("AND 17 G1, 2 G2, 3 G3;");
        assert_eq!(kinds(&diagnostics), vec![ErrorKind::InvalidQualifier]);
        assert!(circuit.get_device(names.query("G1").unwrap()).is_none());
        assert!(circuit.get_device(names.query("G2").unwrap()).is_some());
        assert!(circuit.get_device(names.query("G3").unwrap()).is_some());

        let (_names, circuit, diagnostics) = parse("SWITCH 1 A, B, 0 C; OR 2 D;");
        assert_eq!(kinds(&diagnostics), vec![ErrorKind::NumberExpected]);
        assert_eq!(circuit.devices().len(), 3);
    }

    #[test]
    fn node_errors() {
        let (_names, _circuit, diagnostics) = parse("
            SWITCH 1 SW1;
            AND 2 G1;
            DTYPE D1;
            CONNECT SW9 > G1.I1;
            CONNECT SW1 > G1.I3;
            CONNECT SW1 > D1;
            CONNECT SW1 G1.I1;
            CONNECT SW1 > G1.5;
            MONITOR 5;
        ");
        assert_eq!(
            kinds(&diagnostics),
            vec![
                ErrorKind::DeviceAbsent,
                ErrorKind::PortAbsent,
                ErrorKind::PortAbsent,
                ErrorKind::ArrowExpected,
                ErrorKind::NameExpected,
                ErrorKind::NameExpected,
            ],
        );
    }

    #[test]
    fn connection_and_monitor_errors() {
        let (_names, circuit, diagnostics) = parse("
            SWITCH 1 SW1, 0 SW2;
            AND 2 G1;
            CONNECT SW1 > G1.I1, SW2 > G1.I1, SW1 > SW2, G1.I2 > G1.I1;
            MONITOR G1.I1, G1, G1;
        ");
        assert_eq!(
            kinds(&diagnostics),
            vec![
                ErrorKind::InputConnected,
                ErrorKind::OutputToOutput,
                ErrorKind::InputToInput,
                ErrorKind::NotOutput,
                ErrorKind::MonitorPresent,
            ],
        );
        assert_eq!(circuit.monitors().len(), 1);
    }

    #[test]
    fn missing_semicolon_at_end_of_file() {
        let (_names, circuit, diagnostics) = parse("SWITCH 1 SW1");
        assert_eq!(kinds(&diagnostics), vec![ErrorKind::SemicolonExpected]);
        assert_eq!(circuit.devices().len(), 1);
    }
}
