use itertools::Itertools;
use owo_colors::OwoColorize;
use tabled::{builder::Builder, settings::Style};

use crate::{semiring::Semiring, state::State, Show};

use super::{TiedAutomaton, WeightedAutomaton};

impl<S: Semiring> Show for State<S> {
    fn show(&self) -> String {
        let arcs = self
            .arc_table()
            .iter()
            .map(|(label, (dest, weight))| {
                format!("{} -> {dest} | {}", label.show(), weight.show())
            })
            .join(", ");
        format!("{} [stop {}] {{{arcs}}}", self.name(), self.stop().show())
    }
}

impl<S: Semiring> Show for WeightedAutomaton<S> {
    /// Renders the compact arc tables of all states, one row per state and label. The start
    /// state is printed in bold.
    fn show(&self) -> String {
        let (start, start_weight) = self.start();
        let mut builder = Builder::default();
        builder.push_record(["State", "Stop", "Label", "Target", "Weight"]);
        for state in self.states() {
            let name = if state.name() == start {
                state.name().bold().to_string()
            } else {
                state.name().to_string()
            };
            let table = state.arc_table();
            if table.is_empty() {
                builder.push_record([
                    name,
                    state.stop().show(),
                    "-".into(),
                    "-".into(),
                    "-".into(),
                ]);
                continue;
            }
            for (i, (label, (dest, weight))) in table.iter().enumerate() {
                let (name, stop) = if i == 0 {
                    (name.clone(), state.stop().show())
                } else {
                    (String::new(), String::new())
                };
                builder.push_record([name, stop, label.show(), dest.clone(), weight.show()]);
            }
        }
        format!(
            "{} automaton over {}, start weight {}\n{}",
            S::NAME,
            self.alphabet().show(),
            start_weight.show(),
            builder.build().with(Style::ascii())
        )
    }
}

impl Show for TiedAutomaton {
    fn show(&self) -> String {
        let parameters = self
            .parameters()
            .iter()
            .enumerate()
            .map(|(i, value)| format!("p{i} = {}", value.blue()))
            .join(", ");
        format!("{}\nparameters: {parameters}", (**self).show())
    }
}
