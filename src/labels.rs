//! Naming of the external terminals.
//!
//! Names are handed out in creation order, never by screen position, so moving a terminal keeps
//! its name and a freshly placed one takes the first name nobody holds.

use std::collections::HashSet;

use crate::catalog::ComponentKind;
use crate::component::{ComponentId, Components};

/// Expected terminal names, in the order they should be assigned.
#[derive(serde::Deserialize, serde::Serialize, Debug, Clone, PartialEq, Eq, Default)]
pub struct LabelPlan {
    pub inputs: Vec<String>,
    pub outputs: Vec<String>,
}

impl LabelPlan {
    pub fn new<I, O>(inputs: I, outputs: O) -> Self
    where
        I: IntoIterator,
        I::Item: Into<String>,
        O: IntoIterator,
        O::Item: Into<String>,
    {
        Self {
            inputs: inputs.into_iter().map(Into::into).collect(),
            outputs: outputs.into_iter().map(Into::into).collect(),
        }
    }
}

fn terminals(components: &Components, kind: ComponentKind) -> Vec<ComponentId> {
    let mut ids: Vec<(u32, ComponentId)> = components
        .iter()
        .filter(|(_, c)| c.kind == kind)
        .map(|(id, c)| (c.serial, id))
        .collect();
    ids.sort_unstable();
    ids.into_iter().map(|(_, id)| id).collect()
}

fn assign_kind(components: &mut Components, kind: ComponentKind, names: &[String]) {
    let ids = terminals(components, kind);
    let used: HashSet<&str> = ids
        .iter()
        .filter_map(|&id| components[id].label.as_deref())
        .collect();
    let mut free: Vec<String> = names
        .iter()
        .filter(|n| !used.contains(n.as_str()))
        .cloned()
        .collect();
    free.reverse();

    for id in ids {
        let c = &mut components[id];
        if c.label.is_none() {
            match free.pop() {
                Some(name) => c.label = Some(name),
                None => break,
            }
        }
    }
}

pub fn clear(components: &mut Components) {
    for c in components.values_mut() {
        if !c.kind.is_gate() {
            c.label = None;
        }
    }
}

/// Give unlabeled terminals the unused names of `plan`, keeping labels already set.
/// Without a plan every terminal label is cleared.
pub fn assign(components: &mut Components, plan: Option<&LabelPlan>) {
    let Some(plan) = plan else {
        clear(components);
        return;
    };
    assign_kind(components, ComponentKind::Input, &plan.inputs);
    assign_kind(components, ComponentKind::Output, &plan.outputs);
}

/// Drop every terminal label and assign from scratch.
pub fn reset(components: &mut Components, plan: Option<&LabelPlan>) {
    clear(components);
    assign(components, plan);
}

pub fn find(components: &Components, kind: ComponentKind, label: &str) -> Option<ComponentId> {
    components
        .iter()
        .find_map(|(id, c)| (c.kind == kind && c.label.as_deref() == Some(label)).then_some(id))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::GateRegistry;
    use crate::component::{Component, GridPos};

    fn add(components: &mut Components, serial: u32, kind: ComponentKind, x: i32) -> ComponentId {
        let registry = GateRegistry::default();
        components.insert(Component::new(
            serial,
            kind,
            GridPos::new(x, 0),
            registry.spec(kind),
        ))
    }

    fn label(components: &Components, id: ComponentId) -> Option<&str> {
        components[id].label.as_deref()
    }

    #[test]
    fn names_follow_creation_order_not_position() {
        let mut components = Components::with_key();
        let first = add(&mut components, 1, ComponentKind::Input, 50);
        let second = add(&mut components, 2, ComponentKind::Input, 0);
        let out = add(&mut components, 3, ComponentKind::Output, 20);
        let gate = add(&mut components, 4, ComponentKind::And, 30);

        let plan = LabelPlan::new(["A", "B"], ["Q"]);
        assign(&mut components, Some(&plan));
        assert_eq!(label(&components, first), Some("A"));
        assert_eq!(label(&components, second), Some("B"));
        assert_eq!(label(&components, out), Some("Q"));
        assert_eq!(label(&components, gate), None);
    }

    #[test]
    fn existing_labels_are_kept_and_gaps_filled() {
        let mut components = Components::with_key();
        let plan = LabelPlan::new(["A", "B", "C"], Vec::<String>::new());
        let a = add(&mut components, 1, ComponentKind::Input, 0);
        let b = add(&mut components, 2, ComponentKind::Input, 5);
        assign(&mut components, Some(&plan));
        assert_eq!(label(&components, b), Some("B"));

        components.remove(a);
        let c = add(&mut components, 3, ComponentKind::Input, 10);
        assign(&mut components, Some(&plan));
        assert_eq!(label(&components, b), Some("B"), "B keeps its name");
        assert_eq!(label(&components, c), Some("A"), "first free name is reused");
    }

    #[test]
    fn surplus_terminals_stay_unlabeled() {
        let mut components = Components::with_key();
        let plan = LabelPlan::new(["A"], ["Q"]);
        let a = add(&mut components, 1, ComponentKind::Input, 0);
        let extra = add(&mut components, 2, ComponentKind::Input, 5);
        assign(&mut components, Some(&plan));
        assert_eq!(label(&components, a), Some("A"));
        assert_eq!(label(&components, extra), None);
    }

    #[test]
    fn reset_reassigns_and_no_plan_clears() {
        let mut components = Components::with_key();
        let a = add(&mut components, 1, ComponentKind::Input, 0);
        let b = add(&mut components, 2, ComponentKind::Input, 5);
        components[a].label = Some("Y".into());
        components[b].label = Some("X".into());

        let plan = LabelPlan::new(["X", "Y"], Vec::<String>::new());
        assign(&mut components, Some(&plan));
        assert_eq!(label(&components, a), Some("Y"), "assign preserves");

        reset(&mut components, Some(&plan));
        assert_eq!(label(&components, a), Some("X"));
        assert_eq!(label(&components, b), Some("Y"));
        assert_eq!(find(&components, ComponentKind::Input, "Y"), Some(b));

        assign(&mut components, None);
        assert_eq!(label(&components, a), None);
        assert_eq!(label(&components, b), None);
    }
}
