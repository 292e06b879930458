use cobflow_abort::{Abort, Cancellation};
use cobflow_arena::ID;
use cobflow_diagnostic::{Issue, Report, Severity, Storage};
use cobflow_element::{
    Element, Jump, Kind, Library, LoopHeader, Sequence, Tier, Tree,
};
use cobflow_extract::{
    diagnostic::{SealedModule, UnsupportedExit},
    Config,
};
use cobflow_record::{
    diagnostic::AmbiguousFieldReference, FieldDeclaration, ValueEntry, Visibility,
};
use proptest::{prop_assert_eq, proptest, strategy::Strategy};

use crate::{
    diagnostic::UnbalancedBlock, translate, Event, ExitKind, Options, Translation,
    UnitTranslator,
};

fn run(
    name: &str,
    nested_in: Option<&str>,
    events: Vec<Event>,
    options: Options,
    library: &mut Library,
) -> (Translation, Vec<Box<dyn Issue>>) {
    let storage = Storage::<Box<dyn Issue>>::new();
    let translation = translate(
        name,
        nested_in,
        events,
        options,
        library,
        &storage,
        &Cancellation::new(),
    )
    .expect("not cancelled");

    (translation, storage.into_vec())
}

fn run_alone(
    name: &str,
    events: Vec<Event>,
) -> (Translation, Vec<Box<dyn Issue>>) {
    run(name, None, events, Options::default(), &mut Library::new())
}

fn find<T: 'static>(diagnostics: &[Box<dyn Issue>]) -> Vec<&T> {
    diagnostics.iter().filter_map(|issue| issue.as_any().downcast_ref::<T>()).collect()
}

fn rendered(translation: &Translation, unit: &str) -> String {
    translation
        .outlines()
        .into_iter()
        .find(|outline| outline.name == unit)
        .map(|outline| outline.to_string())
        .expect("unit should exist")
}

fn descendants(tree: &Tree, sequence: ID<Sequence>) -> Vec<ID<Element>> {
    let mut found = Vec::new();
    let mut pending = vec![sequence];

    while let Some(current) = pending.pop() {
        for element in tree.sequence(current) {
            found.push(*element);
            pending.extend(tree.element(*element).kind().blocks());
        }
    }

    found
}

fn field(level: u8, name: &str) -> Event {
    Event::DeclareField(FieldDeclaration::builder().level(level).name(name).build())
}

fn scalar(level: u8, name: &str, picture: &str) -> Event {
    Event::DeclareField(
        FieldDeclaration::builder().level(level).name(name).picture(picture).build(),
    )
}

fn paragraph(name: &str) -> Event { Event::EnterParagraph(name.to_owned()) }

fn section(name: &str) -> Event { Event::EnterSection(name.to_owned()) }

fn statement(text: &str) -> Event { Event::Statement(text.to_owned()) }

fn call(target: &str) -> Event {
    Event::Call { target: target.to_owned(), arguments: Vec::new() }
}

#[test]
fn level_jumps_get_two_fillers() {
    let (translation, diagnostics) = run_alone("A", vec![
        field(1, "A"),
        field(5, "B"),
        scalar(10, "C", "X"),
        Event::EndOfUnit,
    ]);

    assert!(diagnostics.is_empty());

    let fillers = translation
        .symbols
        .fields()
        .filter(|(_, field)| field.synthesized())
        .map(|(_, field)| (field.name().clone(), field.level().number()))
        .collect::<Vec<_>>();
    assert_eq!(fillers, [("FILLER_1".to_owned(), 4), ("FILLER_2".to_owned(), 9)]);
}

#[test]
fn forward_call_resolves_to_the_extracted_paragraph() {
    let (translation, diagnostics) = run_alone("B", vec![
        paragraph("MAIN-PARA"),
        call("P1"),
        Event::Stop,
        paragraph("P1"),
        statement("DISPLAY X"),
        Event::BeginAlternative("X = 1".to_owned()),
        Event::Exit(ExitKind::LeaveParagraph),
        Event::End,
        statement("MOVE 1 TO X"),
        Event::EndOfUnit,
    ]);

    assert!(diagnostics.is_empty());
    assert_eq!(translation.subroutines.len(), 1);

    let tree = &translation.tree;
    let call = tree.sequence(tree.unit(translation.program).body())[0];
    assert!(!tree.element(call).disabled());
    assert_eq!(tree.element(call).kind(), &Kind::call("P1"));

    assert_eq!(rendered(&translation, "B"), "\
program B
  call P1
  stop
end
");
    assert_eq!(rendered(&translation, "P1"), "\
sub P1
  DISPLAY X
  if X = 1 then
    return
  end
  MOVE 1 TO X
end
");
}

#[test]
fn referenced_section_and_paragraph_are_extracted_separately() {
    let (translation, diagnostics) = run_alone("C", vec![
        paragraph("MAIN"),
        call("S1"),
        Event::Stop,
        section("S1"),
        statement("S1-INIT"),
        paragraph("P1"),
        statement("P1-BODY"),
        paragraph("P2"),
        statement("P2-BODY"),
        call("P1"),
        Event::EndOfUnit,
    ]);

    assert!(diagnostics.is_empty());

    let names = translation
        .subroutines
        .iter()
        .map(|unit| translation.tree.unit(*unit).name().clone())
        .collect::<Vec<_>>();
    assert_eq!(names, ["P1", "S1"]);

    assert_eq!(rendered(&translation, "C"), "program C\n  call S1\n  stop\nend\n");
    assert_eq!(rendered(&translation, "P1"), "sub P1\n  P1-BODY\nend\n");
    assert_eq!(rendered(&translation, "S1"), "\
sub S1
  S1-INIT
  call P1
  P2-BODY
  call P1
end
");
}

#[test]
fn empty_section_stays_in_front_of_the_extracted_one() {
    let (translation, diagnostics) = run_alone("D", vec![
        paragraph("MAIN"),
        call("S1"),
        Event::Stop,
        section("S0"),
        section("S1"),
        statement("S1-BODY"),
        Event::EndOfUnit,
    ]);

    assert!(diagnostics.is_empty());
    assert_eq!(rendered(&translation, "D"), "\
program D
  call S1
  stop
  // call S0  -- the section `S0` is empty
end
");
    assert_eq!(rendered(&translation, "S1"), "sub S1\n  S1-BODY\nend\n");
}

#[test]
fn consecutive_empty_paragraphs_keep_their_order() {
    let (translation, diagnostics) = run_alone("E", vec![
        paragraph("MAIN"),
        statement("A"),
        paragraph("P0"),
        paragraph("P1"),
        paragraph("P2"),
        statement("B"),
        Event::EndOfUnit,
    ]);

    assert!(diagnostics.is_empty());
    assert!(translation.subroutines.is_empty());
    assert_eq!(rendered(&translation, "E"), "\
program E
  A
  // call P0  -- the paragraph `P0` is empty
  // call P1  -- the paragraph `P1` is empty
  B
end
");
}

#[test]
fn section_exit_without_a_section_is_marked() {
    let (translation, diagnostics) = run_alone("D", vec![
        paragraph("P"),
        statement("A"),
        Event::Exit(ExitKind::LeaveSection),
        Event::EndOfUnit,
    ]);

    let unsupported = find::<UnsupportedExit>(&diagnostics);
    assert_eq!(unsupported.len(), 1);
    assert_eq!(unsupported[0].procedure.as_deref(), Some("P"));

    assert_eq!(rendered(&translation, "D"), "\
program D
  A
  // leave section  -- unsupported: no section encloses the exit
end
");
}

#[test]
fn leaving_the_unit_is_a_plain_return() {
    let mut library = Library::new();
    let storage = Storage::<Box<dyn Issue>>::new();
    let mut translator =
        UnitTranslator::new("R", None, Options::default(), &mut library, &storage);

    translator.enter_paragraph("P");
    let exit = translator.emit_exit(ExitKind::LeaveUnit);

    assert_eq!(translator.tree().element(exit).kind(), &Kind::Jump(Jump::Return));
    assert_eq!(translator.tracker().escapes().len(), 0);
}

#[test]
fn declarations_split_off_before_nested_extraction() {
    let events = || {
        vec![
            Event::DeclareField(
                FieldDeclaration::builder()
                    .level(77)
                    .name("COUNTER")
                    .picture("S9(4)")
                    .values(vec![ValueEntry::Single("ZERO".to_owned())])
                    .build(),
            ),
            Event::EndOfDeclarations,
            paragraph("MAIN"),
            call("S"),
            call("P"),
            Event::Stop,
            section("S"),
            statement("I0"),
            paragraph("P"),
            statement("I1"),
            statement("I2"),
            Event::EndOfUnit,
        ]
    };

    let mut library = Library::new();
    let (translation, diagnostics) =
        run("SPLIT", None, events(), Options::default(), &mut library);

    assert!(diagnostics.is_empty());
    assert_eq!(translation.modules, ["SPLIT_DATA"]);

    let module = library.module("SPLIT_DATA").expect("module should exist");
    assert!(module.sealed());
    assert_eq!(module.tier(), Tier::Local);
    assert_eq!(module.to_string(), "\
include SPLIT_DATA (local)
  var COUNTER: short := 0
end
");

    assert_eq!(rendered(&translation, "SPLIT"), "\
program SPLIT
  include SPLIT_DATA
  call S
  call P
  stop
end
");
    assert_eq!(rendered(&translation, "S"), "\
sub S
  include SPLIT_DATA
  I0
  call P
end
");
    assert_eq!(rendered(&translation, "P"), "\
sub P
  include SPLIT_DATA
  I1
  I2
end
");

    let options = Options::builder()
        .extraction(Config::builder().split_declarations(false).build())
        .build();
    let (kept, _) = run("KEEP", None, events(), options, &mut Library::new());
    assert!(kept.modules.is_empty());
    assert_eq!(rendered(&kept, "KEEP"), "\
program KEEP
  var COUNTER: short := 0
  call S
  call P
  stop
end
");
}

#[test]
fn global_and_external_records_are_shared_across_units() {
    let mut library = Library::new();

    let global = |name: &str| {
        Event::DeclareField(
            FieldDeclaration::builder().level(1).name(name).visibility(Visibility::Global).build(),
        )
    };
    let external = |name: &str| {
        Event::DeclareField(
            FieldDeclaration::builder()
                .level(1)
                .name(name)
                .visibility(Visibility::External)
                .build(),
        )
    };

    let (outer, diagnostics) = run(
        "OUTER",
        None,
        vec![
            global("SHARED"),
            scalar(2, "FLAG", "X"),
            external("EXT-REC"),
            scalar(2, "CODE", "9(3)"),
            scalar(77, "LOCAL-COUNT", "9"),
            paragraph("MAIN"),
            statement("DISPLAY FLAG"),
            Event::EndOfUnit,
        ],
        Options::default(),
        &mut library,
    );
    assert!(diagnostics.is_empty());
    assert_eq!(outer.modules, ["OUTER_GLOBAL", "EXT-REC_EXTERNAL"]);

    let shared = library.module("OUTER_GLOBAL").expect("module should exist");
    assert!(shared.sealed());
    assert_eq!(shared.to_string(), "\
include OUTER_GLOBAL (global)
  type T_SHARED = record
    FLAG: char
  end
  var SHARED: T_SHARED
end
");

    assert_eq!(rendered(&outer, "OUTER"), "\
program OUTER
  include OUTER_GLOBAL
  include EXT-REC_EXTERNAL
  var LOCAL-COUNT: unsigned short
  DISPLAY FLAG
end
");

    let (inner, diagnostics) = run(
        "INNER",
        Some("OUTER"),
        vec![
            external("EXT-REC"),
            scalar(2, "CODE", "9(3)"),
            paragraph("MAIN"),
            call("OUTER"),
            Event::EndOfUnit,
        ],
        Options::default(),
        &mut library,
    );
    assert!(diagnostics.is_empty());
    assert!(inner.modules.is_empty());
    assert_eq!(
        library.module("EXT-REC_EXTERNAL").map(|module| module.declarations().len()),
        Some(2)
    );
    assert_eq!(rendered(&inner, "INNER"), "\
program INNER
  include OUTER_GLOBAL
  include EXT-REC_EXTERNAL
  call OUTER
end
");

    let (_, diagnostics) = run(
        "OUTER",
        None,
        vec![global("AGAIN"), Event::EndOfUnit],
        Options::default(),
        &mut library,
    );
    let sealed = find::<SealedModule>(&diagnostics);
    assert_eq!(sealed.len(), 1);
    assert_eq!(sealed[0].module, "OUTER_GLOBAL");
    assert_eq!(sealed[0].report().severity, Severity::Error);
}

#[test]
fn condition_names_expand_in_conditions() {
    let (translation, diagnostics) = run_alone("E", vec![
        field(1, "STATUS-REC"),
        scalar(2, "STATUS", "X"),
        Event::DeclareField(
            FieldDeclaration::builder()
                .level(88)
                .name("DONE")
                .values(vec![ValueEntry::Single("'Y'".to_owned())])
                .build(),
        ),
        paragraph("MAIN"),
        Event::BeginAlternative("DONE".to_owned()),
        statement("DISPLAY 'FINISHED'"),
        Event::Otherwise,
        statement("PERFORM-WORK"),
        Event::End,
        Event::BeginLoop(LoopHeader::Until("DONE".to_owned())),
        statement("READ-NEXT"),
        Event::End,
        Event::EndOfUnit,
    ]);

    assert!(diagnostics.is_empty());
    assert_eq!(rendered(&translation, "E"), "\
program E
  type T_STATUS_REC = record
    STATUS: char
  end
  var STATUS-REC: T_STATUS_REC
  if STATUS-REC.STATUS = \"Y\" then
    DISPLAY 'FINISHED'
  else
    PERFORM-WORK
  end
  repeat
    READ-NEXT
  until STATUS-REC.STATUS = \"Y\"
end
");
}

#[test]
fn unbalanced_blocks_are_reported() {
    let (translation, diagnostics) = run_alone("U", vec![
        paragraph("P"),
        Event::End,
        Event::Otherwise,
        Event::BeginSelection("X".to_owned()),
        Event::When(vec!["1".to_owned()]),
        statement("ONE"),
        Event::When(vec!["OTHER".to_owned()]),
        statement("ELSE"),
        Event::End,
        Event::BeginLoop(LoopHeader::Forever),
        statement("SPIN"),
        paragraph("Q"),
        statement("Q"),
        Event::EndOfUnit,
        statement("LATE"),
    ]);

    let unbalanced = find::<UnbalancedBlock>(&diagnostics);
    assert_eq!(unbalanced, [
        &UnbalancedBlock::Unmatched { unit: "U".to_owned(), event: "end".to_owned() },
        &UnbalancedBlock::Unmatched { unit: "U".to_owned(), event: "otherwise".to_owned() },
        &UnbalancedBlock::Unclosed { unit: "U".to_owned(), blocks: 1 },
    ]);

    assert_eq!(rendered(&translation, "U"), "\
program U
  case X of
    when 1:
      ONE
    other:
      ELSE
  end
  loop
    SPIN
  end
  Q
end
");
}

#[test]
fn lookups_report_ambiguity() {
    let mut library = Library::new();
    let storage = Storage::<Box<dyn Issue>>::new();
    let mut translator =
        UnitTranslator::new("L", None, Options::default(), &mut library, &storage);

    translator.declare_field(&FieldDeclaration::builder().level(1).name("A").build());
    let first = translator
        .declare_field(&FieldDeclaration::builder().level(2).name("X").picture("9").build());
    translator.declare_field(&FieldDeclaration::builder().level(1).name("B").build());
    let second = translator
        .declare_field(&FieldDeclaration::builder().level(2).name("X").picture("9").build());

    assert_eq!(translator.lookup_field("X OF B"), second);
    assert!(storage.is_empty());

    assert_eq!(translator.lookup_field("X"), first);
    assert_eq!(translator.lookup_field("NOPE"), None);

    let ambiguous = storage.as_vec();
    assert_eq!(ambiguous.len(), 1);
    let reported = ambiguous[0]
        .as_any()
        .downcast_ref::<AmbiguousFieldReference>()
        .expect("ambiguity should be reported");
    assert_eq!(reported.candidates, ["A.X", "B.X"]);
}

#[test]
fn cancellation_aborts_the_translation() {
    let cancellation = Cancellation::new();
    cancellation.cancel();

    let result = translate(
        "X",
        None,
        vec![paragraph("P"), statement("A")],
        Options::default(),
        &mut Library::new(),
        &cobflow_diagnostic::Dummy,
        &cancellation,
    );

    assert!(matches!(result, Err(Abort)));
}

#[derive(Debug, Clone, Copy)]
struct Procedure {
    section: bool,
    statements: usize,
    referenced: bool,
}

fn procedure() -> impl proptest::strategy::Strategy<Value = Procedure> {
    (proptest::bool::weighted(0.3), 1_usize..4, proptest::bool::ANY).prop_map(
        |(section, statements, referenced)| Procedure { section, statements, referenced },
    )
}

proptest! {
    #[test]
    fn every_statement_survives_extraction(
        procedures in proptest::collection::vec(procedure(), 1..10)
    ) {
        let mut events = vec![paragraph("MAIN")];
        for (index, procedure) in procedures.iter().enumerate() {
            if procedure.referenced {
                events.push(call(&format!("PROC-{index}")));
            }
        }
        events.push(Event::Stop);

        let mut expected = Vec::new();
        for (index, procedure) in procedures.iter().enumerate() {
            let name = format!("PROC-{index}");
            events.push(if procedure.section { section(&name) } else { paragraph(&name) });

            for line in 0..procedure.statements {
                let text = format!("{name}.{line}");
                events.push(statement(&text));
                expected.push(text);
            }
        }
        events.push(Event::EndOfUnit);

        let (translation, diagnostics) = run_alone("PROP", events);
        prop_assert_eq!(diagnostics.len(), 0);
        prop_assert_eq!(
            translation.subroutines.len(),
            procedures.iter().filter(|procedure| procedure.referenced).count()
        );

        let tree = &translation.tree;
        let mut found = tree
            .units()
            .flat_map(|(_, unit)| descendants(tree, unit.body()))
            .filter_map(|element| match tree.element(element).kind() {
                Kind::Instruction(text) => Some(text.clone()),
                _ => None,
            })
            .collect::<Vec<_>>();
        found.sort();
        expected.sort();

        prop_assert_eq!(found, expected);
    }
}
