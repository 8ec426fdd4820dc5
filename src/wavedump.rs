use super::*;

use std::collections::BTreeMap;
use std::fmt::Write;

/// Writes the recorded monitor histories of a [`Circuit`] as a VCD file.
///
/// Each cycle is one time step. [`Sample::Blank`] is written as `x`.
pub struct Wavedump<'a> {
    names: &'a Names,
    circuit: &'a Circuit,
    shortnames: BTreeMap<Driver, String>,
    i: usize,
}

impl<'a> Wavedump<'a> {
    pub fn new(names: &'a Names, circuit: &'a Circuit) -> Wavedump<'a> {
        let mut wavedump = Wavedump {
            names,
            circuit,
            shortnames: BTreeMap::new(),
            i: 0,
        };
        for signal in circuit.monitors_dictionary().keys() {
            let shortname = wavedump.gen_shortname();
            wavedump.shortnames.insert(*signal, shortname);
        }
        wavedump
    }

    fn gen_shortname(&mut self) -> String {
        self.i += 1;
        let mut i = self.i;

        let mut shortname = Vec::new();

        // Allowed characters: ! to ~ (decimal 33 to 126)
        while i > 0 {
            shortname.push(((i % 94) + 33) as u8);
            i /= 94;
        }

        String::from_utf8_lossy(shortname.as_slice()).into()
    }

    pub fn write(&self, f: &mut dyn Write) -> std::fmt::Result {
        self.write_header(f)?;
        self.write_changes(f)
    }

    fn write_header(&self, f: &mut dyn Write) -> std::fmt::Result {
        writeln!(f, "$date")?;
        writeln!(f, "    {}", chrono::Local::now().format("%a %b %e %T %Y"))?;
        writeln!(f, "$end")?;

        writeln!(f, "$version")?;
        writeln!(f, "    logsim {}", env!("CARGO_PKG_VERSION"))?;
        writeln!(f, "$end")?;

        writeln!(f, "$timescale 1s $end")?;

        writeln!(f, "$scope module circuit $end")?;
        for (signal, shortname) in &self.shortnames {
            let (id, port) = *signal;
            let name = self.circuit.devices().signal_name(self.names, id, port).unwrap_or_else(|| format!("{id}"));
            writeln!(f, "    $var wire 1 {shortname} {name} $end")?;
        }
        writeln!(f, "$upscope $end")?;
        writeln!(f, "$enddefinitions $end")?;
        Ok(())
    }

    fn write_changes(&self, f: &mut dyn Write) -> std::fmt::Result {
        let cycles = self.circuit.monitors().cycles();
        let histories = self.circuit.monitors_dictionary();

        for cycle in 0..cycles {
            let mut changes = vec![];
            for (signal, shortname) in &self.shortnames {
                let history = &histories[signal];
                let sample = history.get(cycle).copied().unwrap_or(Sample::Blank);
                let previous = cycle.checked_sub(1).and_then(|previous| history.get(previous).copied());
                if previous != Some(sample) {
                    changes.push(format!("{sample}{shortname}"));
                }
            }

            if cycle == 0 {
                writeln!(f, "#0")?;
                writeln!(f, "$dumpvars")?;
                for change in &changes {
                    writeln!(f, "{change}")?;
                }
                writeln!(f, "$end")?;
            } else if !changes.is_empty() {
                writeln!(f, "#{cycle}")?;
                for change in &changes {
                    writeln!(f, "{change}")?;
                }
            }
        }
        writeln!(f, "#{cycles}")?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn vcd() {
        let mut names = Names::new();
        let mut circuit = load_circuit_from_string("
            CLOCK 1 CK;
            SWITCH 1 SW;
            MONITOR CK;
        ", &mut names).unwrap();
        circuit.run(2);
        let sw = names.query("SW").unwrap();
        circuit.make_monitor(sw, None).unwrap();
        circuit.continue_run(2);

        let mut vcd = String::new();
        Wavedump::new(&names, &circuit).write(&mut vcd).unwrap();

        assert!(vcd.contains("$var wire 1 \" CK $end"));
        assert!(vcd.contains("$var wire 1 # SW $end"));
        let changes = vcd.split("$enddefinitions $end\n").nth(1).unwrap();
        assert_eq!(changes, "#0\n$dumpvars\n1\"\nx#\n$end\n#1\n0\"\n#2\n1\"\n1#\n#3\n0\"\n#4\n");
    }
}
