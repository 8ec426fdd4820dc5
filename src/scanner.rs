use super::*;

use log::*;
use std::collections::VecDeque;

/// The reserved words of the definition language.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Keyword {
    Connect,
    Switch,
    Monitor,
    Clock,
    And,
    Nand,
    Or,
    Nor,
    Dtype,
    Xor,
    Rc,
    Siggen,
}

impl Keyword {
    pub const ALL: [Keyword; 12] = [
        Keyword::Connect,
        Keyword::Switch,
        Keyword::Monitor,
        Keyword::Clock,
        Keyword::And,
        Keyword::Nand,
        Keyword::Or,
        Keyword::Nor,
        Keyword::Dtype,
        Keyword::Xor,
        Keyword::Rc,
        Keyword::Siggen,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Keyword::Connect => "CONNECT",
            Keyword::Switch => "SWITCH",
            Keyword::Monitor => "MONITOR",
            Keyword::Clock => "CLOCK",
            Keyword::And => "AND",
            Keyword::Nand => "NAND",
            Keyword::Or => "OR",
            Keyword::Nor => "NOR",
            Keyword::Dtype => "DTYPE",
            Keyword::Xor => "XOR",
            Keyword::Rc => "RC",
            Keyword::Siggen => "SIGGEN",
        }
    }

    pub fn from_text(text: &str) -> Option<Keyword> {
        Keyword::ALL.iter().copied().find(|keyword| keyword.as_str() == text)
    }
}

impl std::fmt::Display for Keyword {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Token {
    Dot,
    Semicolon,
    /// `>`
    Arrow,
    Comma,
    Keyword(Keyword, NameId),
    /// The value and the digits as written. Values too large for a `u64` saturate.
    Number(u64, String),
    Name(NameId),
    Eof,
}

/// A token together with where it was read from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Symbol {
    pub token: Token,
    pub span: Span,
}

impl Symbol {
    pub fn new(token: Token, span: Span) -> Symbol {
        Symbol { token, span }
    }

    /// The interned id of a keyword or name.
    pub fn id(&self) -> Option<NameId> {
        match &self.token {
            Token::Keyword(_keyword, id) => Some(*id),
            Token::Name(id) => Some(*id),
            _ => None,
        }
    }

    pub fn is_eof(&self) -> bool {
        self.token == Token::Eof
    }
}

impl HasSpan for Symbol {
    fn span(&self) -> Span {
        self.span
    }
}

/// Turns the characters of a definition file into [`Symbol`]s, one at a time.
///
/// Whitespace, and any character that cannot start a symbol, is consumed silently.
/// Once the end of input is reached every further call returns [`Token::Eof`].
///
/// The scanner also keeps two small queues for the parser's error recovery:
/// symbols pushed back with [`Scanner::push_back`] are returned before any fresh input,
/// and the *held* symbols are the head of the statement being parsed,
/// which can be replayed with [`Scanner::replay_held`].
pub struct Scanner<'a> {
    names: &'a mut Names,
    source_info: SourceInfo,
    chars: Vec<char>,
    pos: usize,
    line: u32,
    col: u32,
    pushed_back: VecDeque<Symbol>,
    held: Vec<Symbol>,
}

impl<'a> Scanner<'a> {
    pub fn open<P: AsRef<std::path::Path>>(path: P, names: &'a mut Names) -> std::io::Result<Scanner<'a>> {
        let text = std::fs::read_to_string(path.as_ref())?;
        info!("Scanning {}", path.as_ref().display());
        let source_info = SourceInfo::from_file(path.as_ref(), &text);
        Ok(Scanner::new(&text, source_info, names))
    }

    pub fn from_str(text: &str, names: &'a mut Names) -> Scanner<'a> {
        Scanner::new(text, SourceInfo::from_string(text), names)
    }

    fn new(text: &str, source_info: SourceInfo, names: &'a mut Names) -> Scanner<'a> {
        // Keywords are interned up front so they can be queried before they are scanned.
        for keyword in Keyword::ALL {
            names.intern(keyword.as_str());
        }

        Scanner {
            names,
            source_info,
            chars: text.chars().collect(),
            pos: 0,
            line: 1,
            col: 1,
            pushed_back: VecDeque::new(),
            held: vec![],
        }
    }

    pub fn names(&self) -> &Names {
        self.names
    }

    pub fn names_mut(&mut self) -> &mut Names {
        self.names
    }

    pub fn source_info(&self) -> &SourceInfo {
        &self.source_info
    }

    pub fn next_symbol(&mut self) -> Symbol {
        if let Some(symbol) = self.pushed_back.pop_front() {
            trace!("replayed {:?} at {}", symbol.token, symbol.span);
            return symbol;
        }

        self.skip_ignored();

        let line = self.line;
        let col_start = self.col;

        let token = match self.current() {
            None => {
                let symbol = Symbol::new(Token::Eof, Span::new(line, col_start, col_start));
                trace!("scanned {:?} at {}", symbol.token, symbol.span);
                return symbol;
            },
            Some(ch) if ch.is_ascii_alphabetic() => {
                let text = self.take_while(|ch| ch.is_ascii_alphanumeric());
                let id = self.names.intern(&text);
                match Keyword::from_text(&text) {
                    Some(keyword) => Token::Keyword(keyword, id),
                    None => Token::Name(id),
                }
            },
            Some(ch) if ch.is_ascii_digit() => {
                let digits = self.take_while(|ch| ch.is_ascii_digit());
                let value = digits.parse::<u64>().unwrap_or(u64::MAX);
                Token::Number(value, digits)
            },
            Some(ch) => {
                self.advance();
                match ch {
                    '.' => Token::Dot,
                    ';' => Token::Semicolon,
                    '>' => Token::Arrow,
                    ',' => Token::Comma,
                    _ => unreachable!("skip_ignored stops only at symbol starts"),
                }
            },
        };

        let col_end = self.col.saturating_sub(1).max(col_start);
        let symbol = Symbol::new(token, Span::new(line, col_start, col_end));
        trace!("scanned {:?} at {}", symbol.token, symbol.span);
        symbol
    }

    /// Queues `symbols` to be returned, in order, before anything else.
    pub fn push_back(&mut self, symbols: Vec<Symbol>) {
        for symbol in symbols.into_iter().rev() {
            self.pushed_back.push_front(symbol);
        }
    }

    /// Remembers `symbol` as part of the head of the current statement.
    pub fn hold(&mut self, symbol: Symbol) {
        self.held.push(symbol);
    }

    /// Forgets the held symbols. Called at the end of every statement.
    pub fn release(&mut self) {
        self.held.clear();
    }

    /// Pushes the held symbols back so the statement head is read again.
    pub fn replay_held(&mut self) {
        let held = std::mem::take(&mut self.held);
        self.push_back(held);
    }

    fn current(&self) -> Option<char> {
        self.chars.get(self.pos).copied()
    }

    fn advance(&mut self) {
        if let Some(ch) = self.current() {
            if ch == '\n' {
                self.line += 1;
                self.col = 1;
            } else {
                self.col += 1;
            }
            self.pos += 1;
        }
    }

    fn skip_ignored(&mut self) {
        while let Some(ch) = self.current() {
            if starts_symbol(ch) {
                break;
            }
            self.advance();
        }
    }

    fn take_while<F: Fn(char) -> bool>(&mut self, pred: F) -> String {
        let mut text = String::new();
        while let Some(ch) = self.current() {
            if !pred(ch) {
                break;
            }
            text.push(ch);
            self.advance();
        }
        text
    }
}

fn starts_symbol(ch: char) -> bool {
    ch.is_ascii_alphanumeric() || matches!(ch, '.' | ';' | '>' | ',')
}

/// Yields symbols up to, but not including, the end of input.
impl<'a> Iterator for Scanner<'a> {
    type Item = Symbol;

    fn next(&mut self) -> Option<Symbol> {
        let symbol = self.next_symbol();
        if symbol.is_eof() {
            None
        } else {
            Some(symbol)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tokens(text: &str) -> Vec<Symbol> {
        let mut names = Names::new();
        Scanner::from_str(text, &mut names).collect()
    }

    #[test]
    fn keywords_and_names() {
        let mut names = Names::new();
        let mut scanner = Scanner::from_str("SWITCH 1 SW1, 0 SW2;", &mut names);

        let switch = scanner.next_symbol();
        assert!(matches!(switch.token, Token::Keyword(Keyword::Switch, _)));
        assert_eq!(switch.span, Span::new(1, 1, 6));

        let one = scanner.next_symbol();
        assert_eq!(one.token, Token::Number(1, "1".to_string()));
        assert_eq!(one.span, Span::new(1, 8, 8));

        let sw1 = scanner.next_symbol();
        assert_eq!(sw1.span, Span::new(1, 10, 12));
        assert_eq!(scanner.next_symbol().token, Token::Comma);
        assert_eq!(scanner.next_symbol().token, Token::Number(0, "0".to_string()));
        let sw2 = scanner.next_symbol();
        assert_eq!(scanner.next_symbol().token, Token::Semicolon);
        assert!(scanner.next_symbol().is_eof());
        assert!(scanner.next_symbol().is_eof());

        let sw1_id = sw1.id().unwrap();
        let sw2_id = sw2.id().unwrap();
        assert_eq!(scanner.names().resolve(sw1_id), Some("SW1"));
        assert_eq!(scanner.names().resolve(sw2_id), Some("SW2"));
        assert_eq!(sw1.token, Token::Name(sw1_id));
    }

    #[test]
    fn keywords_share_the_name_space() {
        let mut names = Names::new();
        let symbols: Vec<Symbol> = Scanner::from_str("AND AND", &mut names).collect();
        assert_eq!(symbols.len(), 2);
        assert_eq!(symbols[0].id(), symbols[1].id());
        assert_eq!(symbols[0].id(), names.query("AND"));
        for keyword in Keyword::ALL {
            assert!(names.query(keyword.as_str()).is_some());
        }
    }

    #[test]
    fn punctuation_and_positions() {
        let symbols = tokens("CONNECT SW1 > G1.I1,\n  SW2 > G1.I2;");
        let kinds: Vec<Token> = symbols.iter().map(|symbol| symbol.token.clone()).collect();
        assert!(matches!(kinds[0], Token::Keyword(Keyword::Connect, _)));
        assert_eq!(kinds[2], Token::Arrow);
        assert_eq!(kinds[4], Token::Dot);
        assert_eq!(kinds[6], Token::Comma);
        assert_eq!(kinds[12], Token::Semicolon);

        let arrows: Vec<Span> = symbols
            .iter()
            .filter(|symbol| symbol.token == Token::Arrow)
            .map(|symbol| symbol.span)
            .collect();
        assert_eq!(arrows, vec![Span::new(1, 13, 13), Span::new(2, 7, 7)]);
    }

    #[test]
    fn numbers_keep_their_digits() {
        let symbols = tokens("SIGGEN 0011 S1;");
        assert_eq!(symbols[1].token, Token::Number(11, "0011".to_string()));
        assert_eq!(symbols[1].span, Span::new(1, 8, 11));

        let huge = tokens("101010101010101010101010101010101");
        assert_eq!(huge[0].token, Token::Number(u64::MAX, "101010101010101010101010101010101".to_string()));
    }

    #[test]
    fn unknown_characters_are_skipped() {
        let symbols = tokens("NAND G!;\nSWITCH 0 SW@\nCONNECT SW1 > G1.I1;");
        let spans: Vec<Span> = symbols.iter().map(|symbol| symbol.span).collect();
        // `!` and `@` produce nothing but still take up a column
        assert_eq!(spans[1], Span::new(1, 6, 6));
        assert_eq!(spans[2], Span::new(1, 8, 8));
        assert_eq!(spans[5], Span::new(2, 10, 11));
        assert_eq!(spans[6], Span::new(3, 1, 7));
        assert_eq!(symbols.len(), 13);
    }

    #[test]
    fn rescanning_is_deterministic() {
        let text = "SWITCH 1 SW1, 0 SW2; AND 2 G1;\nCONNECT SW1 > G1.I1, SW2 > G1.I2; MONITOR G1;";
        assert_eq!(tokens(text), tokens(text));
    }

    #[test]
    fn push_back_and_replay() {
        let mut names = Names::new();
        let mut scanner = Scanner::from_str("AND 2 G1, 3 G2;", &mut names);
        let and = scanner.next_symbol();
        scanner.hold(and.clone());
        let two = scanner.next_symbol();

        scanner.push_back(vec![two.clone()]);
        assert_eq!(scanner.next_symbol(), two);

        scanner.replay_held();
        assert_eq!(scanner.next_symbol(), and);
        // nothing left held after a replay
        scanner.replay_held();
        assert_eq!(scanner.next_symbol().token, Token::Name(names_id(&scanner, "G1")));

        scanner.hold(and.clone());
        scanner.release();
        scanner.replay_held();
        assert_eq!(scanner.next_symbol().token, Token::Comma);
    }

    fn names_id(scanner: &Scanner, name: &str) -> NameId {
        scanner.names().query(name).unwrap()
    }

    #[test]
    fn open_reads_a_file() {
        use std::io::Write;

        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, "XOR X1;").unwrap();

        let mut names = Names::new();
        let symbols: Vec<Symbol> = Scanner::open(file.path(), &mut names).unwrap().collect();
        assert_eq!(symbols.len(), 3);
        assert!(matches!(symbols[0].token, Token::Keyword(Keyword::Xor, _)));

        let mut names = Names::new();
        assert!(Scanner::open("/nonexistent/definition.txt", &mut names).is_err());
    }
}
