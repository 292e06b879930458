use crate::{Counter, Diagnostic, Dummy, Handler, Issue, Report, Severity, Storage};

#[derive(Debug, Clone, PartialEq, Eq)]
struct Missing {
    name: String,
}

impl Report for Missing {
    fn report(&self) -> Diagnostic {
        Diagnostic::new(
            Severity::Warning,
            format!("`{}` is missing", self.name),
            Some("MAIN".to_owned()),
            None,
        )
    }
}

fn missing(name: &str) -> Missing { Missing { name: name.to_owned() } }

#[test]
fn storage_keeps_issues_in_order() {
    let storage = Storage::<Box<dyn Issue>>::new();
    assert!(storage.is_empty());

    storage.receive(missing("A"));
    storage.receive(Box::new(missing("B")) as Box<dyn Issue>);
    assert_eq!(storage.len(), 2);

    let names = storage
        .into_vec()
        .iter()
        .filter_map(|issue| issue.as_any().downcast_ref::<Missing>())
        .map(|missing| missing.name.clone())
        .collect::<Vec<_>>();
    assert_eq!(names, ["A", "B"]);
}

#[test]
fn counter_and_dummy_accept_anything() {
    let counter = Counter::default();
    counter.receive(missing("A"));
    counter.receive(42);
    assert_eq!(counter.count(), 2);

    Dummy.receive(missing("A"));
}

#[test]
fn diagnostic_display_carries_location() {
    colored::control::set_override(false);

    let rendered = missing("X").report().to_string();
    assert_eq!(rendered, "[warning]: `X` is missing\n  --> MAIN");
}
