use std::{
    ops::{Deref, DerefMut},
    rc::Rc,
};

use tracing::debug;

use crate::{
    error::WfaError, label::ArcLabel, math::integer_code_len, natural_class::NaturalClassSet,
    precision::Precision,
};

use super::{
    builder::Declaration,
    tied::{quantized, tied_states},
    AutomatonBuilder, TiedAutomaton,
};

/// A tied automaton whose arcs are labelled with natural classes. The compact arc table of every
/// state expresses its transitions through the classes of a shared [`NaturalClassSet`], and the
/// complexity of a label depends on how much of the class mass it uses.
///
/// Declared labels must be classes of the set; they are expanded into their symbols when the
/// automaton is built.
#[derive(Debug, Clone, PartialEq)]
pub struct ClassAutomaton {
    tied: TiedAutomaton,
    classes: Rc<NaturalClassSet>,
}

impl ClassAutomaton {
    pub(crate) fn from_declaration(
        declaration: Declaration<Option<usize>>,
        classes: Rc<NaturalClassSet>,
        parameters: Vec<f64>,
        precision: Precision,
    ) -> Result<Self, WfaError> {
        let parameters = quantized(parameters, &precision)?;
        let states = tied_states(&declaration, &parameters, Some(&classes))?;
        let tied = TiedAutomaton::from_states(
            declaration.alphabet,
            declaration.start,
            states,
            parameters,
            precision,
        );
        debug!(
            "built class automaton with {} states over {} classes",
            tied.size(),
            classes.len()
        );
        Ok(Self { tied, classes })
    }

    /// Builds the automaton with the single parameter `1.0`, which counts how often the arcs
    /// tied to it are taken. Neither the number of parameters nor the parameter itself has to
    /// be encoded, so its complexity is lower by `icl(1)` and one weight.
    pub fn counting(
        builder: AutomatonBuilder<ArcLabel, Option<usize>>,
        start: impl Into<String>,
        classes: Rc<NaturalClassSet>,
    ) -> Result<Self, WfaError> {
        let precision = Precision::default();
        let mut counting = builder.into_class_automaton(start, classes, vec![1.0], precision)?;
        let complexity =
            counting.complexity() - integer_code_len(1) - counting.precision().weight_len();
        counting.tied.set_complexity(complexity);
        Ok(counting)
    }

    /// The natural classes labelling the arcs.
    pub fn classes(&self) -> &Rc<NaturalClassSet> {
        &self.classes
    }

    /// The underlying tied automaton.
    pub fn tied(&self) -> &TiedAutomaton {
        &self.tied
    }
}

impl Deref for ClassAutomaton {
    type Target = TiedAutomaton;

    fn deref(&self) -> &Self::Target {
        &self.tied
    }
}

impl DerefMut for ClassAutomaton {
    fn deref_mut(&mut self) -> &mut Self::Target {
        &mut self.tied
    }
}

#[cfg(test)]
mod tests {
    use std::rc::Rc;

    use crate::{prelude::*, tests::assert_close};

    fn classes() -> Rc<NaturalClassSet> {
        Rc::new(NaturalClassSet::new(
            "aeuptkbdszh",
            ["aeu", "ptkbdzsh", "ptkbd", "szh", "bdz", "ptksh", "ptbdsz"].map(|c| c.chars()),
        ))
    }

    type ClassArc = (&'static str, ArcLabel, &'static str, Option<usize>);

    fn voice_voiceless_arcs() -> Vec<ClassArc> {
        vec![
            ("#", ArcLabel::class("bd"), "VStop", None),
            ("#", ArcLabel::Other, "#", None),
            ("VStop", ArcLabel::class("sh"), "#", Some(0)),
            ("VStop", ArcLabel::Other, "#", None),
        ]
    }

    fn voice_voiceless() -> ClassAutomaton {
        AutomatonBuilder::new(classes().alphabet().clone())
            .with_stops([("#", None), ("VStop", None)])
            .with_arcs(voice_voiceless_arcs())
            .into_class_automaton("#", classes(), vec![1.5], Precision::default())
            .unwrap()
    }

    fn ccvcc() -> ClassAutomaton {
        let c = || ArcLabel::class("ptkbdzsh");
        AutomatonBuilder::new(classes().alphabet().clone())
            .with_stops(["#", "1", "2", "3", "4"].map(|name| (name, None)))
            .with_arcs([
                ("#", c(), "1", None),
                ("#", ArcLabel::Other, "#", None),
                ("1", c(), "2", None),
                ("1", ArcLabel::Other, "#", None),
                ("2", ArcLabel::class("aeu"), "3", None),
                ("2", c(), "2", None),
                ("3", c(), "4", None),
                ("3", ArcLabel::Other, "#", None),
                ("4", c(), "2", Some(0)),
                ("4", ArcLabel::Other, "#", Some(0)),
            ])
            .into_class_automaton("#", classes(), vec![3.0], Precision::default())
            .unwrap()
    }

    #[test]
    fn class_labels_are_expanded() {
        let fsa = voice_voiceless();
        assert_eq!(fsa.weight("abstakt"), Tropical::new(1.5));
        assert_eq!(fsa.weight("skap"), Tropical::new(0.0));
        assert_eq!(fsa.transition("#", 'd'), Some(("VStop", Tropical::one())));

        let fsa = ccvcc();
        assert_eq!(fsa.weight("abstakt"), Tropical::new(3.0));
        assert_eq!(fsa.weight("ppeskutt"), Tropical::new(6.0));
    }

    #[test]
    fn intersection_of_class_automata() {
        let product = voice_voiceless().intersect(&ccvcc()).unwrap();
        assert_eq!(product.weight("abstakt"), Tropical::new(4.5));
        assert_eq!(product.parameters(), &[1.5, 3.0]);
        assert_close(
            product.complexity(),
            voice_voiceless().complexity() + ccvcc().complexity(),
        );
    }

    #[test]
    fn parameters_of_class_automata_can_be_set() {
        let mut fsa = ccvcc();
        fsa.set_parameter(0, 1.0).unwrap();
        assert_eq!(fsa.weight("ppeskutt"), Tropical::new(2.0));
    }

    #[test]
    fn overlapping_classes_conflict() {
        let result = AutomatonBuilder::new(classes().alphabet().clone())
            .with_arcs(voice_voiceless_arcs())
            .with_arc("#", ArcLabel::class("b"), "#", None)
            .into_class_automaton("#", classes(), vec![1.5], Precision::default());
        assert!(matches!(
            result,
            Err(WfaError::LabelingConflict { symbol: 'b', .. })
        ));
    }

    #[test]
    fn unknown_class() {
        let result = AutomatonBuilder::new(classes().alphabet().clone())
            .with_arcs(voice_voiceless_arcs())
            .with_arc("#", ArcLabel::class("bg"), "#", None)
            .into_class_automaton("#", classes(), vec![1.5], Precision::default());
        assert_eq!(
            result,
            Err(WfaError::UnknownClass {
                class: "bg".to_string()
            })
        );
    }

    #[test]
    fn class_automaton_complexity() {
        let fsa = voice_voiceless();
        let states = fsa.size();
        let parameter_cost = 2f64.log2();
        let expected = integer_code_len(states)
            + integer_code_len(fsa.num_arcs())
            + integer_code_len(1)
            + 64.0
            + fsa
                .states()
                .map(|state| state.complexity(states, |_| parameter_cost))
                .sum::<f64>();
        assert_close(fsa.complexity(), expected);
    }

    #[test]
    fn counting_automaton() {
        let builder = AutomatonBuilder::new(classes().alphabet().clone())
            .with_stops([("#", None), ("VStop", None)])
            .with_arcs(voice_voiceless_arcs());
        let counting = ClassAutomaton::counting(builder, "#", classes()).unwrap();
        assert_eq!(counting.weight("abstabs"), Tropical::new(2.0));
        assert_eq!(counting.parameters(), &[1.0]);
        assert_close(
            counting.complexity(),
            voice_voiceless().complexity() - integer_code_len(1) - 64.0,
        );
    }
}
