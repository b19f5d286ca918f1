//! Truth-table driving and circuit statistics.
//!
//! This only supplies the mechanism: set the named inputs, run one step, read the named outputs.
//! Whether a report counts as solved is up to the caller.

use std::collections::BTreeMap;

use crate::catalog::ComponentKind;
use crate::labels::{self, LabelPlan};
use crate::session::Session;

#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum ValidateError {
    #[error("expected {expected} {kind} components, found {found}")]
    TerminalCount {
        kind: ComponentKind,
        expected: usize,
        found: usize,
    },
}

/// One row of a truth table, keyed by terminal label.
#[derive(serde::Deserialize, serde::Serialize, Debug, Clone, PartialEq, Eq, Default)]
pub struct TestCase {
    pub inputs: BTreeMap<String, bool>,
    pub outputs: BTreeMap<String, bool>,
}

impl TestCase {
    pub fn new<'a>(
        inputs: impl IntoIterator<Item = (&'a str, bool)>,
        outputs: impl IntoIterator<Item = (&'a str, bool)>,
    ) -> Self {
        Self {
            inputs: inputs.into_iter().map(|(k, v)| (k.to_owned(), v)).collect(),
            outputs: outputs.into_iter().map(|(k, v)| (k.to_owned(), v)).collect(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CaseOutcome {
    /// Observed value of every output named in the plan. A missing terminal reads as low.
    pub actual: BTreeMap<String, bool>,
    pub passed: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ValidationReport {
    pub cases: Vec<CaseOutcome>,
}

impl ValidationReport {
    pub fn passed(&self) -> bool {
        self.cases.iter().all(|c| c.passed)
    }

    pub fn failed_count(&self) -> usize {
        self.cases.iter().filter(|c| !c.passed).count()
    }
}

fn count(session: &Session, kind: ComponentKind) -> usize {
    session
        .components()
        .values()
        .filter(|c| c.kind == kind)
        .count()
}

fn check_count(
    session: &Session,
    kind: ComponentKind,
    expected: usize,
) -> Result<(), ValidateError> {
    let found = count(session, kind);
    if found != expected {
        return Err(ValidateError::TerminalCount {
            kind,
            expected,
            found,
        });
    }
    Ok(())
}

/// Drive every case through the circuit, one simulation step per case.
///
/// Terminals are matched by label; the session's labels must already follow `plan`.
/// Inputs the case does not mention are driven low.
pub fn run_cases(
    session: &mut Session,
    plan: &LabelPlan,
    cases: &[TestCase],
) -> Result<ValidationReport, ValidateError> {
    check_count(session, ComponentKind::Input, plan.inputs.len())?;
    check_count(session, ComponentKind::Output, plan.outputs.len())?;

    let mut report = ValidationReport::default();
    for case in cases {
        for name in &plan.inputs {
            if let Some(id) = labels::find(session.components(), ComponentKind::Input, name) {
                let value = case.inputs.get(name).copied().unwrap_or(false);
                session.set_manual_value(id, value);
            }
        }

        session.run_simulation_step();

        let mut passed = true;
        let mut actual = BTreeMap::new();
        for name in &plan.outputs {
            let value = labels::find(session.components(), ComponentKind::Output, name)
                .and_then(|id| session.component(id))
                .is_some_and(|c| c.input_value(0));
            if case.outputs.get(name).copied() != Some(value) {
                passed = false;
            }
            actual.insert(name.clone(), value);
        }
        report.cases.push(CaseOutcome { actual, passed });
    }

    log::debug!(
        "Validated {} cases, {} failed",
        report.cases.len(),
        report.failed_count()
    );
    Ok(report)
}

/// Gate usage of a circuit. Terminals are not gates.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct CircuitStats {
    pub total_gates: usize,
    pub wire_count: usize,
    pub by_kind: BTreeMap<ComponentKind, usize>,
}

impl CircuitStats {
    pub fn of(session: &Session) -> Self {
        let mut stats = Self {
            wire_count: session.connections().len(),
            ..Default::default()
        };
        for c in session.components().values().filter(|c| c.kind.is_gate()) {
            *stats.by_kind.entry(c.kind).or_default() += 1;
            stats.total_gates += 1;
        }
        stats
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::GateRegistry;
    use crate::component::GridPos;
    use crate::config::SessionConfig;
    use crate::wire::PinRef;

    fn half_adder() -> (Session, LabelPlan) {
        let mut s = Session::new(GateRegistry::default(), SessionConfig::default());
        let plan = LabelPlan::new(["A", "B"], ["S", "C"]);
        s.apply_labels(Some(&plan));

        let a = s.place(ComponentKind::Input, GridPos::new(0, 0)).expect("A");
        let b = s.place(ComponentKind::Input, GridPos::new(0, 3)).expect("B");
        let xor = s.place(ComponentKind::Xor, GridPos::new(6, 0)).expect("XOR");
        let and = s.place(ComponentKind::And, GridPos::new(6, 4)).expect("AND");
        let sum = s.place(ComponentKind::Output, GridPos::new(14, 0)).expect("S");
        let carry = s.place(ComponentKind::Output, GridPos::new(14, 4)).expect("C");
        for (from, to, pin) in [(a, xor, 0), (b, xor, 1), (a, and, 0), (b, and, 1)] {
            s.connect(PinRef::new(from, 0), PinRef::new(to, pin)).expect("input wire");
        }
        s.connect(PinRef::new(xor, 0), PinRef::new(sum, 0)).expect("XOR->S");
        s.connect(PinRef::new(and, 0), PinRef::new(carry, 0)).expect("AND->C");
        (s, plan)
    }

    fn truth_table() -> Vec<TestCase> {
        [(false, false), (false, true), (true, false), (true, true)]
            .into_iter()
            .map(|(a, b)| TestCase::new([("A", a), ("B", b)], [("S", a ^ b), ("C", a && b)]))
            .collect()
    }

    #[test]
    fn half_adder_passes_its_truth_table() {
        let (mut s, plan) = half_adder();
        let report = run_cases(&mut s, &plan, &truth_table()).expect("terminal counts match");
        assert_eq!(report.cases.len(), 4);
        assert!(report.passed(), "{report:?}");
        assert!(report.cases[3].actual["C"]);
    }

    #[test]
    fn mismatches_are_counted() {
        let (mut s, plan) = half_adder();
        let mut cases = truth_table();
        cases[1].outputs.insert("S".to_owned(), false);
        cases[2].outputs.insert("C".to_owned(), true);

        let report = run_cases(&mut s, &plan, &cases).expect("terminal counts match");
        assert!(!report.passed());
        assert_eq!(report.failed_count(), 2);
        assert!(!report.cases[1].passed);
        assert!(report.cases[3].passed);
    }

    #[test]
    fn terminal_count_must_match_plan() {
        let (mut s, _) = half_adder();
        let plan = LabelPlan::new(["A", "B", "Cin"], ["S", "C"]);
        assert_eq!(
            run_cases(&mut s, &plan, &truth_table()),
            Err(ValidateError::TerminalCount {
                kind: ComponentKind::Input,
                expected: 3,
                found: 2
            })
        );
    }

    #[test]
    fn unlabeled_output_reads_low() {
        let (mut s, plan) = half_adder();
        s.apply_labels(None);
        let report = run_cases(&mut s, &plan, &truth_table()).expect("counts still match");
        // Every output reads low, so only the all-zero row passes.
        assert_eq!(report.failed_count(), 3);
        assert!(report.cases[0].passed);
    }

    #[test]
    fn test_cases_deserialize_from_json() {
        let case: TestCase =
            serde_json::from_str(r#"{"inputs": {"A": true}, "outputs": {"Q": false}}"#)
                .expect("parse");
        assert_eq!(case, TestCase::new([("A", true)], [("Q", false)]));
    }

    #[test]
    fn stats_skip_terminals() {
        let (s, _) = half_adder();
        let stats = CircuitStats::of(&s);
        assert_eq!(stats.total_gates, 2);
        assert_eq!(stats.wire_count, 6);
        assert_eq!(stats.by_kind.get(&ComponentKind::Xor), Some(&1));
        assert_eq!(stats.by_kind.get(&ComponentKind::Input), None);
    }
}
