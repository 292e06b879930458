use cobflow_diagnostic::{Issue, Storage};
use proptest::{prop_assert, prop_assert_eq, prop_oneof, proptest, strategy::Just};

use crate::{
    condition::normalize_literal,
    diagnostic::{
        AmbiguousFieldReference, InvalidLevelNumber, InvalidPicture, UnknownUsage,
    },
    Category, Cursor, FieldDeclaration, Level, Lookup, NewField, Occurs,
    Picture, PictureError, Precision, Primitive, Reference, SymbolTable, Type,
    Usage, ValueEntry, Visibility, Width,
};

fn declare_all(
    table: &mut SymbolTable,
    declarations: &[FieldDeclaration],
) -> Vec<crate::Insertion> {
    let storage = Storage::<Box<dyn Issue>>::new();
    let mut cursor = Cursor::default();
    let mut insertions = Vec::new();

    for declaration in declarations {
        let insertion = table
            .declare(cursor, declaration, &storage)
            .expect("declaration should be accepted");
        cursor = insertion.cursor;
        insertions.push(insertion);
    }

    insertions
}

fn field(level: u8, name: &str) -> FieldDeclaration {
    FieldDeclaration::builder().level(level).name(name).build()
}

fn scalar(level: u8, name: &str, picture: &str) -> FieldDeclaration {
    FieldDeclaration::builder().level(level).name(name).picture(picture).build()
}

#[test]
fn level_jumps_synthesise_two_fillers() {
    let mut table = SymbolTable::default();
    let insertions = declare_all(&mut table, &[
        field(1, "A"),
        field(5, "B"),
        scalar(10, "C", "X"),
    ]);

    let synthesized = insertions
        .iter()
        .flat_map(|insertion| insertion.synthesized.iter().copied())
        .collect::<Vec<_>>();
    assert_eq!(synthesized.len(), 2);

    let [a, b, c] = [insertions[0].field, insertions[1].field, insertions[2].field];

    let b_parent = table[b].parent().expect("B has a parent");
    assert!(table[b_parent].synthesized());
    assert_eq!(table[b_parent].level().number(), 4);
    assert_eq!(table[b_parent].parent(), Some(a));

    let c_parent = table[c].parent().expect("C has a parent");
    assert!(table[c_parent].synthesized());
    assert_eq!(table[c_parent].level().number(), 9);
    assert_eq!(table[c_parent].parent(), Some(b));

    assert_eq!(table[b_parent].name(), "FILLER_1");
    assert_eq!(table[c_parent].name(), "FILLER_2");
}

#[test]
fn siblings_share_their_parent() {
    let mut table = SymbolTable::default();
    let insertions = declare_all(&mut table, &[
        field(1, "CUSTOMER"),
        field(2, "ADDRESS"),
        scalar(3, "STREET", "X(30)"),
        scalar(3, "CITY", "X(20)"),
        scalar(2, "BALANCE", "S9(7)V99"),
        field(1, "OTHER"),
    ]);

    let ids = insertions.iter().map(|insertion| insertion.field).collect::<Vec<_>>();
    assert!(insertions.iter().all(|insertion| insertion.synthesized.is_empty()));

    assert_eq!(table.children(ids[0]).collect::<Vec<_>>(), [ids[1], ids[4]]);
    assert_eq!(table.children(ids[1]).collect::<Vec<_>>(), [ids[2], ids[3]]);
    assert_eq!(table.records(), [ids[0], ids[5]]);
    assert_eq!(table[ids[0]].next_sibling(), Some(ids[5]));
}

#[test]
fn conditions_and_aliases_attach_to_their_anchor() {
    let mut table = SymbolTable::default();
    let insertions = declare_all(&mut table, &[
        field(1, "REC"),
        scalar(2, "STATUS", "X"),
        FieldDeclaration::builder()
            .level(88)
            .name("OK")
            .values(vec![ValueEntry::Single("'Y'".to_owned())])
            .build(),
        FieldDeclaration::builder()
            .level(88)
            .name("FAILED")
            .values(vec![ValueEntry::Single("'N'".to_owned())])
            .build(),
        scalar(2, "CODE", "9(3)"),
        FieldDeclaration::builder().level(66).name("ALL-CODE").redefines("CODE").build(),
    ]);

    let [rec, status, ok, failed, code, alias] =
        std::array::from_fn(|index| insertions[index].field);

    assert_eq!(table[ok].parent(), Some(status));
    assert_eq!(table[failed].parent(), Some(status));
    assert_eq!(table[code].parent(), Some(rec));
    assert_eq!(table[alias].parent(), Some(rec));
    assert_eq!(table[alias].redefines(), Some(code));

    assert!(!table.is_group(status));
    assert_eq!(table.type_of(ok), None);
    assert_eq!(table.type_of(alias), table.type_of(code));
}

#[test]
fn standalone_items_are_records() {
    let mut table = SymbolTable::default();
    let insertions = declare_all(&mut table, &[
        scalar(77, "COUNTER", "9(4)"),
        FieldDeclaration::builder()
            .level(78)
            .name("LIMIT")
            .values(vec![ValueEntry::Single("-12.50".to_owned())])
            .build(),
        scalar(5, "LOST", "X"),
    ]);

    assert_eq!(table.records().len(), 3);
    assert_eq!(insertions[2].synthesized.len(), 2);

    assert_eq!(
        table.type_of(insertions[1].field).map(|ty| ty.base),
        Some(Type::Primitive(Primitive::Numeral { digits: 4, scale: 2, signed: true }))
    );
}

#[test]
fn lookup_uses_qualifiers() {
    let mut table = SymbolTable::default();
    let insertions = declare_all(&mut table, &[
        field(1, "IN-REC"),
        scalar(2, "AMOUNT", "9(5)"),
        field(1, "OUT-REC"),
        field(2, "TOTALS"),
        scalar(3, "AMOUNT", "9(7)"),
        scalar(2, "UNIQUE-ONE", "X"),
    ]);

    let first = insertions[1].field;
    let second = insertions[4].field;

    assert_eq!(table.lookup("amount", &["in-rec"]), Lookup::Unique(first));
    assert_eq!(table.lookup("AMOUNT", &["TOTALS", "OUT-REC"]), Lookup::Unique(second));
    assert_eq!(table.lookup("AMOUNT", &["OUT-REC"]), Lookup::Unique(second));
    assert_eq!(table.lookup("UNIQUE-ONE", &["WHATEVER"]), Lookup::Unique(insertions[5].field));
    assert_eq!(table.lookup("MISSING", &[] as &[&str]), Lookup::NotFound);

    // wrong order of the qualifiers
    assert_eq!(
        table.lookup("AMOUNT", &["OUT-REC", "TOTALS"]),
        Lookup::Ambiguous { chosen: first, candidates: vec![first, second] }
    );
}

#[test]
fn ambiguous_reference_is_reported() {
    let mut table = SymbolTable::default();
    let insertions = declare_all(&mut table, &[
        field(1, "A"),
        scalar(2, "X", "9"),
        field(1, "B"),
        scalar(2, "X", "9"),
    ]);

    let storage = Storage::<Box<dyn Issue>>::new();
    let (chosen, reference) = table.resolve("X", &storage).expect("resolved");

    assert_eq!(chosen, insertions[1].field);
    assert_eq!(reference.name, "X");

    let diagnostics = storage.into_vec();
    assert_eq!(diagnostics.len(), 1);

    let ambiguity = diagnostics[0]
        .as_any()
        .downcast_ref::<AmbiguousFieldReference>()
        .expect("an ambiguity");
    assert_eq!(ambiguity.chosen, "A.X");
    assert_eq!(ambiguity.candidates, ["A.X", "B.X"]);

    let storage = Storage::<Box<dyn Issue>>::new();
    assert_eq!(
        table.resolve("X IN B", &storage).map(|(id, _)| id),
        Some(insertions[3].field)
    );
    assert!(storage.is_empty());
}

#[test]
fn qualified_names_carry_array_placeholders() {
    let mut table = SymbolTable::default();
    let insertions = declare_all(&mut table, &[
        field(1, "TABLE"),
        FieldDeclaration::builder()
            .level(2)
            .name("ROW")
            .occurs(Occurs { count: 10, indices: vec!["ROW-IDX".to_owned()] })
            .build(),
        FieldDeclaration::builder()
            .level(3)
            .name("CELL")
            .picture("9(3)")
            .occurs(Occurs { count: 4, indices: Vec::new() })
            .build(),
    ]);

    let row = insertions[1].field;
    let cell = insertions[2].field;

    assert_eq!(table.qualified_name(cell), "TABLE.ROW[%1].CELL");
    assert_eq!(table.access_path(cell, &["I"]), "TABLE.ROW[I].CELL");
    assert_eq!(table.access_path(cell, &["I", "J"]), "TABLE.ROW[I].CELL[J]");
    assert_eq!(table.access_path(row, &[]), "TABLE.ROW");

    assert_eq!(table.indices_within(insertions[0].field), ["ROW-IDX"]);

    let cell_type = table.type_of(cell).expect("typed");
    assert_eq!(cell_type.occurs, Some(4));
    assert_eq!(cell_type.base.name().as_deref(), Some("unsigned short"));
}

#[test]
fn group_types_are_deterministic() {
    let mut table = SymbolTable::default();
    let insertions = declare_all(&mut table, &[
        field(1, "CUSTOMER-REC"),
        field(2, "ADDRESS"),
        scalar(3, "STREET", "X(30)"),
        scalar(2, "AGE", "99"),
    ]);

    let record = insertions[0].field;
    let address = insertions[1].field;

    let first = table.type_of(address);
    let second = table.type_of(address);
    assert_eq!(first, second);
    assert_eq!(
        first.map(|ty| ty.base),
        Some(Type::Record("T_CUSTOMER_REC_ADDRESS".to_owned()))
    );

    let types = table.nested_record_types(record);
    let names = types.iter().map(|ty| ty.name.as_str()).collect::<Vec<_>>();
    assert_eq!(names, ["T_CUSTOMER_REC_ADDRESS", "T_CUSTOMER_REC"]);

    let components = &types[1].components;
    assert_eq!(components.len(), 2);
    assert_eq!(components[1].name, "AGE");
    assert_eq!(
        components[1].field_type.base,
        Type::Primitive(Primitive::Numeral { digits: 2, scale: 0, signed: false })
    );
}

#[test]
fn primitive_types_follow_usage_and_picture() {
    let mut table = SymbolTable::default();
    let with_usage = |name: &str, picture: Option<&str>, usage: &str| {
        let mut declaration =
            FieldDeclaration::builder().level(77).name(name).usage(usage).build();
        declaration.picture = picture.map(str::to_owned);
        declaration
    };

    let insertions = declare_all(&mut table, &[
        scalar(77, "FLAG", "X"),
        scalar(77, "TEXT", "X(12)"),
        scalar(77, "PRICE", "S9(5)V99"),
        with_usage("HALF", Some("S9(4)"), "COMP"),
        with_usage("BIG", Some("9(12)"), "COMP-5"),
        with_usage("PACKED", Some("S9(3)V9"), "COMP-3"),
        with_usage("SINGLE", None, "COMP-1"),
        with_usage("WIDE", None, "FLOAT-EXTENDED"),
        with_usage("PTR", None, "PROCEDURE-POINTER"),
        with_usage("IDX", None, "INDEX"),
        with_usage("TINY", None, "BINARY-CHAR UNSIGNED"),
        FieldDeclaration::builder().level(77).name("UNKNOWN").build(),
    ]);

    let names = insertions
        .iter()
        .map(|insertion| table.type_of(insertion.field).and_then(|ty| ty.base.name()))
        .collect::<Vec<_>>();

    assert_eq!(names, [
        Some("char".to_owned()),
        Some("string".to_owned()),
        Some("double".to_owned()),
        Some("short".to_owned()),
        Some("unsigned long".to_owned()),
        Some("double".to_owned()),
        Some("float".to_owned()),
        Some("long double".to_owned()),
        Some("pointer".to_owned()),
        Some("int".to_owned()),
        Some("unsigned byte".to_owned()),
        None,
    ]);

    assert_eq!(
        table.type_of(insertions[3].field).map(|ty| ty.base),
        Some(Type::Primitive(Primitive::Binary { width: Width::Short, signed: true }))
    );
    assert_eq!(
        table.type_of(insertions[6].field).map(|ty| ty.base),
        Some(Type::Primitive(Primitive::Float(Precision::Single)))
    );
}

#[test]
fn pictures_are_expanded() {
    let price = Picture::parse("s9(5)v99").expect("valid");
    assert_eq!(price.category(), Category::Numeric);
    assert_eq!(price.digits(), 7);
    assert_eq!(price.scale(), 2);
    assert_eq!(price.length(), 7);
    assert!(price.signed());

    let edited = Picture::parse("$ZZ,ZZ9.99CR").expect("valid");
    assert_eq!(edited.category(), Category::NumericEdited);
    assert_eq!(edited.digits(), 7);
    assert_eq!(edited.scale(), 2);
    assert_eq!(edited.length(), 12);

    assert_eq!(Picture::parse("X(8)").map(|p| p.length()), Ok(8));
    assert_eq!(Picture::parse("AAA").map(|p| p.category()), Ok(Category::Alphabetic));
    assert_eq!(Picture::parse("N(4)").map(|p| p.category()), Ok(Category::National));
    assert_eq!(
        Picture::parse("XX/XX").map(|p| p.category()),
        Ok(Category::AlphanumericEdited)
    );

    assert_eq!(Picture::parse("  "), Err(PictureError::Empty));
    assert_eq!(Picture::parse("9(3"), Err(PictureError::UnclosedRepetition('9')));
    assert_eq!(
        Picture::parse("X(0)"),
        Err(PictureError::InvalidRepetition("0".to_owned()))
    );
    assert_eq!(Picture::parse("9Q"), Err(PictureError::UnknownSymbol('Q')));
}

#[test]
fn usages_accept_every_spelling() {
    assert_eq!(Usage::parse("comp"), Ok(Usage::Binary));
    assert_eq!(Usage::parse("COMPUTATIONAL-4"), Ok(Usage::Binary));
    assert_eq!(Usage::parse("usage is packed-decimal"), Ok(Usage::PackedDecimal));
    assert_eq!(Usage::parse("COMP-2"), Ok(Usage::Double));
    assert_eq!(Usage::parse("binary-long   unsigned"), Ok(Usage::UnsignedBinaryLong));
    assert_eq!(Usage::parse("BINARY-SHORT SIGNED"), Ok(Usage::BinaryShort));
    assert_eq!(Usage::parse("FUNCTION-POINTER"), Ok(Usage::Pointer));
    assert!(Usage::parse("COMP-9").is_err());

    assert_eq!(Usage::PackedDecimal.to_string(), "PACKED-DECIMAL");
}

#[test]
fn condition_expressions_compare_the_parent() {
    let mut table = SymbolTable::default();
    let insertions = declare_all(&mut table, &[
        field(1, "REC"),
        FieldDeclaration::builder()
            .level(2)
            .name("GRADE")
            .picture("X")
            .occurs(Occurs { count: 3, indices: Vec::new() })
            .build(),
        FieldDeclaration::builder()
            .level(88)
            .name("PASSED")
            .values(vec![
                ValueEntry::Thru("'A'".to_owned(), "'C'".to_owned()),
                ValueEntry::Single("SPACE".to_owned()),
            ])
            .build(),
        scalar(2, "SCORE", "999"),
        FieldDeclaration::builder()
            .level(88)
            .name("NONE")
            .values(vec![ValueEntry::Single("ZEROES".to_owned())])
            .build(),
    ]);

    assert_eq!(
        table.condition_expression(insertions[2].field, &["I"]).as_deref(),
        Some("(REC.GRADE[I] >= \"A\" and REC.GRADE[I] <= \"C\") or (REC.GRADE[I] = \" \")")
    );
    assert_eq!(
        table.condition_expression(insertions[4].field, &[]).as_deref(),
        Some("REC.SCORE = 0")
    );
    assert_eq!(table.condition_expression(insertions[3].field, &[]), None);
}

#[test]
fn literals_are_normalised() {
    assert_eq!(normalize_literal("'IT''S'"), "\"IT'S\"");
    assert_eq!(normalize_literal("\"A\""), "\"A\"");
    assert_eq!(normalize_literal("HIGH-VALUES"), "'\\uffff'");
    assert_eq!(normalize_literal(" 42 "), "42");
}

#[test]
fn references_are_parsed() {
    let reference = Reference::parse("X OF B IN A (I, 2)").expect("valid");
    assert_eq!(reference.name, "X");
    assert_eq!(reference.qualifiers, ["B", "A"]);
    assert_eq!(reference.subscripts, ["I", "2"]);

    let modified = Reference::parse("NAME(1:3)").expect("valid");
    assert_eq!(modified.name, "NAME");
    assert!(modified.subscripts.is_empty());

    assert_eq!(Reference::parse(""), None);
    assert_eq!(Reference::parse("X AND Y"), None);
    assert_eq!(Reference::parse("X OF"), None);
}

#[test]
fn invalid_declarations_are_reported() {
    let mut table = SymbolTable::default();
    let storage = Storage::<Box<dyn Issue>>::new();

    assert!(table.declare(Cursor::default(), &field(50, "BAD"), &storage).is_none());

    let insertion = table
        .declare(
            Cursor::default(),
            &FieldDeclaration::builder()
                .level(1)
                .name("ODD")
                .picture("9(2")
                .usage("COMP-42")
                .build(),
            &storage,
        )
        .expect("still declared");

    assert_eq!(table[insertion.field].picture(), &None);
    assert_eq!(table[insertion.field].usage(), Usage::Display);

    let diagnostics = storage.into_vec();
    assert_eq!(diagnostics.len(), 3);
    assert!(diagnostics[0].as_any().downcast_ref::<InvalidLevelNumber>().is_some());
    assert!(diagnostics[2].as_any().downcast_ref::<UnknownUsage>().is_some());
}

#[test]
fn oversized_repetitions_are_rejected() {
    let huge = format!("X({})X", usize::MAX);
    assert_eq!(Picture::parse(&huge), Err(PictureError::TooLong));
    assert_eq!(
        Picture::parse(&format!("9({})V9", usize::MAX)),
        Err(PictureError::TooLong)
    );
    assert_eq!(
        Picture::parse(&format!("X({})", usize::MAX)).map(|p| p.length()),
        Ok(usize::MAX)
    );

    let mut table = SymbolTable::default();
    let storage = Storage::<Box<dyn Issue>>::new();
    let insertion = table
        .declare(Cursor::default(), &scalar(1, "WIDE", &huge), &storage)
        .expect("still declared");

    assert_eq!(table[insertion.field].picture(), &None);

    let diagnostics = storage.into_vec();
    let invalid = diagnostics
        .iter()
        .find_map(|issue| issue.as_any().downcast_ref::<InvalidPicture>())
        .expect("the picture should be reported");
    assert_eq!(invalid.error, PictureError::TooLong);
}

#[test]
fn fillers_and_visibility() {
    let mut table = SymbolTable::new("ANON");
    let first = table.insert(
        Cursor::default(),
        NewField::builder().level(Level::RECORD).visibility(Visibility::Global).build(),
    );
    let child = table.insert(
        first.cursor,
        NewField::builder().level(Level::new(2).expect("valid")).build(),
    );

    assert_eq!(table[first.field].name(), "ANON_1");
    assert!(table[first.field].anonymous());
    assert!(!table[first.field].synthesized());
    assert_eq!(table[child.field].visibility(), Visibility::Global);
    assert_eq!(table.lookup("ANON_1", &[] as &[&str]), Lookup::NotFound);
}

fn level_number() -> impl proptest::strategy::Strategy<Value = u8> {
    prop_oneof![
        Just(1u8),
        2u8..=49,
        2u8..=12,
        Just(66u8),
        Just(77u8),
        Just(78u8),
        Just(88u8),
    ]
}

proptest! {
    #[test]
    fn random_levels_keep_the_tree_consistent(
        levels in proptest::collection::vec(level_number(), 1..64)
    ) {
        let mut table = SymbolTable::default();
        let mut cursor = Cursor::default();

        for level in levels {
            let insertion = table.insert(
                cursor,
                NewField::builder().level(Level::new(level).expect("valid")).build(),
            );
            cursor = insertion.cursor;
        }

        for (id, field) in table.fields() {
            let Some(parent) = field.parent() else {
                prop_assert!(table.records().contains(&id));
                continue;
            };

            let parent = &table[parent];
            prop_assert!(parent.level() < field.level());
            prop_assert!(!parent.level().is_condition());

            if field.level().is_nested() && !field.synthesized() {
                prop_assert_eq!(parent.level().number() + 1, field.level().number());
            }

            if field.level().is_condition() {
                prop_assert!(field.first_child().is_none());
            }
        }

        for (id, _) in table.fields() {
            for child in table.children(id) {
                prop_assert_eq!(table[child].parent(), Some(id));
            }
        }
    }
}
