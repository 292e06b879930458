//! Turns the records of the data division into declaration elements once the
//! procedure division starts.

use cobflow_arena::ID;
use cobflow_element::{Constant, Declaration, Element, Kind, Tier, Variable};
use cobflow_extract::diagnostic::SealedModule;
use cobflow_record::{
    condition::normalize_literal, Field, Primitive, SymbolTable, Type,
    ValueEntry, Visibility,
};
use log::debug;

use crate::UnitTranslator;

/// Returns the declarations of a top-level field: the record types it needs
/// (the innermost first), the field itself, then its `INDEXED BY` aliases.
pub(crate) fn declarations_of(
    symbols: &SymbolTable,
    record: ID<Field>,
) -> Vec<Declaration> {
    let field = &symbols[record];
    let level = field.level();

    if level.is_condition() || level.is_renames() {
        return Vec::new();
    }

    let mut declarations = symbols
        .nested_record_types(record)
        .into_iter()
        .map(Declaration::from)
        .collect::<Vec<_>>();

    let field_type = symbols.type_of(record);
    let type_name = field_type.as_ref().and_then(|field_type| field_type.base.name());
    let initial = field.values().first().and_then(|value| match value {
        ValueEntry::Single(literal) => Some(normalize_literal(literal)),
        ValueEntry::Thru(..) => None,
    });

    if level.is_constant() {
        declarations.push(Declaration::from(Constant {
            name: field.name().clone(),
            type_name,
            value: initial.unwrap_or_default(),
        }));
    } else {
        declarations.push(Declaration::from(Variable {
            name: field.name().clone(),
            type_name,
            occurs: field_type.and_then(|field_type| field_type.occurs),
            initial,
        }));
    }

    let index_type = Type::Primitive(Primitive::Index).name();
    declarations.extend(symbols.indices_within(record).into_iter().map(|index| {
        Declaration::from(Variable {
            name: index,
            type_name: index_type.clone(),
            occurs: None,
            initial: None,
        })
    }));

    declarations
}

impl UnitTranslator<'_> {
    /// Hoists the records declared so far. Only the first call does anything.
    ///
    /// Local records go to the head of the program body and the position after
    /// them is recorded as the declarations end. `GLOBAL` records go to
    /// `<UNIT>_GLOBAL` and every `EXTERNAL` record to its own
    /// `<RECORD>_EXTERNAL` module.
    pub fn end_of_declarations(&mut self) {
        if self.declarations_flushed {
            return;
        }
        self.declarations_flushed = true;

        let mut local = 0;

        for record in self.symbols.records().to_vec() {
            let declarations = declarations_of(&self.symbols, record);
            if declarations.is_empty() {
                continue;
            }

            match self.symbols[record].visibility() {
                Visibility::Local => {
                    for declaration in declarations {
                        self.tree.push(
                            self.body,
                            Element::new(Kind::Declaration(declaration)),
                        );
                        local += 1;
                    }
                }
                Visibility::Global => {
                    let module = format!("{}_GLOBAL", self.name);
                    self.share(&module, Tier::Global, declarations);
                }
                Visibility::External => {
                    let module = format!("{}_EXTERNAL", self.symbols[record].name());
                    self.share(&module, Tier::External, declarations);
                }
            }
        }

        self.tracker.mark_declarations_end(self.body, local);
        debug!("`{}` declares {local} local element(s)", self.name);
    }

    fn share(
        &mut self,
        module: &str,
        tier: Tier,
        declarations: Vec<Declaration>,
    ) {
        let (id, created) = self.library.get_or_create(module, tier);

        if created {
            self.created_modules.push(module.to_owned());
        }

        // an external record is laid out once, by the first unit declaring it
        if created || tier != Tier::External {
            for declaration in declarations {
                let name = declaration.name().to_owned();

                if let Err(error) = self.library.append(id, declaration) {
                    self.handler.receive(Box::new(SealedModule {
                        module: error.name,
                        declaration: name,
                    }));
                }
            }
        }

        self.tree.unit_mut(self.program).include(module);
    }
}
