use std::collections::BTreeMap;
use std::ops::Range;

/// An interned name. Stable for the lifetime of the [`Names`] table that issued it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct NameId(usize);

impl NameId {
    pub fn index(&self) -> usize {
        self.0
    }
}

impl std::fmt::Display for NameId {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// A unique error code handed out by [`Names::unique_error_codes`].
pub type ErrorCode = usize;

/// The name table.
///
/// Maps strings to [`NameId`]s and back. Keywords, device names and port names
/// all share this one namespace, so a device can never be named like a keyword.
/// It also issues error codes so that independent components can number
/// their own error kinds without colliding.
#[derive(Debug, Clone, Default)]
pub struct Names {
    names: Vec<String>,
    ids: BTreeMap<String, NameId>,
    error_code_count: ErrorCode,
}

impl Names {
    pub fn new() -> Names {
        Names::default()
    }

    /// Returns the id for `name`, adding it to the table if it is new.
    pub fn intern(&mut self, name: &str) -> NameId {
        if let Some(id) = self.ids.get(name) {
            return *id;
        }
        let id = NameId(self.names.len());
        self.names.push(name.to_string());
        self.ids.insert(name.to_string(), id);
        id
    }

    /// Interns every name in `names`, in order.
    pub fn lookup<S: AsRef<str>>(&mut self, names: &[S]) -> Vec<NameId> {
        names.iter().map(|name| self.intern(name.as_ref())).collect()
    }

    /// Returns the id for `name` without adding it.
    pub fn query(&self, name: &str) -> Option<NameId> {
        self.ids.get(name).copied()
    }

    /// The string `id` was interned from.
    pub fn resolve(&self, id: NameId) -> Option<&str> {
        self.names.get(id.0).map(|name| name.as_str())
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }

    /// Reserves `count` error codes never handed out before.
    pub fn unique_error_codes(&mut self, count: usize) -> Range<ErrorCode> {
        let start = self.error_code_count;
        self.error_code_count += count;
        start..self.error_code_count
    }
}

#[test]
fn interning() {
    let mut names = Names::new();
    let g1 = names.intern("G1");
    let sw1 = names.intern("SW1");
    assert_ne!(g1, sw1);
    assert_eq!(names.intern("G1"), g1);
    assert_eq!(names.resolve(g1), Some("G1"));
    assert_eq!(names.resolve(sw1), Some("SW1"));
    assert_eq!(names.query("SW1"), Some(sw1));
    assert_eq!(names.query("SW2"), None);
    assert_eq!(names.len(), 2);

    let ids = names.lookup(&["SW1", "I1", "G1"]);
    assert_eq!(ids, vec![sw1, names.query("I1").unwrap(), g1]);
}

#[test]
fn error_codes_do_not_collide() {
    let mut names = Names::new();
    let parser_codes = names.unique_error_codes(5);
    let device_codes = names.unique_error_codes(3);
    assert_eq!(parser_codes.len(), 5);
    assert_eq!(device_codes.len(), 3);
    assert_eq!(parser_codes.end, device_codes.start);
}
