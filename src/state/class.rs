use std::collections::BTreeSet;

use crate::{
    arc_set::{ArcSet, ClassArcSet},
    label::ArcLabel,
    natural_class::NaturalClassSet,
    semiring::Semiring,
};

use super::ArcTable;

/// Builds the compact arc table of a class-labelled state. Every arc set is expressed through
/// its covering labels. If the arc sets cover the whole alphabet, the arc set whose labels have
/// the lowest joint probability (the first one on ties) is replaced by the fallback entry.
pub fn class_arc_table<S: Semiring>(
    classes: &NaturalClassSet,
    arcsets: Vec<ArcSet<S>>,
) -> ArcTable<S> {
    let arcsets: Vec<ClassArcSet<S>> = arcsets
        .into_iter()
        .map(|arcs| ClassArcSet::new(arcs, classes))
        .collect();

    let covered: BTreeSet<char> = arcsets
        .iter()
        .flat_map(|a| a.arcs.letters.iter().copied())
        .collect();
    let mut lowest = 1.0;
    let mut fallback = None;
    for (i, arcset) in arcsets.iter().enumerate() {
        let probability = arcset.label_probability(classes);
        if probability < lowest {
            lowest = probability;
            fallback = Some(i);
        }
    }
    let fallback = fallback.filter(|_| &covered == classes.alphabet().symbols());

    let mut arcs = ArcTable::new();
    for (i, arcset) in arcsets.into_iter().enumerate() {
        let ClassArcSet { arcs: set, labels } = arcset;
        if Some(i) == fallback {
            arcs.insert(ArcLabel::Other, (set.dest, set.weight));
        } else {
            for label in labels {
                arcs.insert(ArcLabel::Class(label), (set.dest.clone(), set.weight));
            }
        }
    }
    arcs
}

/// The bits needed for each label of `arcs`, in table order. A label of size `k` costs
/// `-log2(k / remaining)`, after which `remaining` shrinks by `k`; it starts out as the label
/// mass of the class set.
pub(super) fn label_costs<S: Semiring>(
    classes: &NaturalClassSet,
    arcs: &ArcTable<S>,
) -> impl Iterator<Item = f64> {
    let alphabet_size = classes.alphabet().size();
    let mut remaining = classes.labels_len() as f64;
    arcs.keys()
        .map(|label| {
            let size = label.size(alphabet_size) as f64;
            let cost = -(size / remaining).log2();
            remaining -= size;
            cost
        })
        .collect::<Vec<_>>()
        .into_iter()
}
