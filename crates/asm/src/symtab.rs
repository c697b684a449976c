//! The symbol table.
//!
//! Symbols live in a packed array; a hash index over a composite
//! `(scope, name)` key gives amortized O(1) lookup. Local labels (names
//! starting with `@`) key on the current scope number, every other name
//! keys on scope 0 — no string mangling is involved.

use std::collections::HashMap;

use braze_object::ez8o::{Binding, Section};

use crate::{assembler::Pass, error::AsmError};

/// Index of a symbol in the packed array.
pub type SymbolId = usize;

/// One symbol.
#[derive(Debug, Clone)]
pub struct Symbol {
    /// Source spelling, `@` prefix included for locals.
    pub name: String,
    /// Scope number the symbol was defined under (0 for non-locals).
    pub scope: u32,
    /// Section-relative value.
    pub value: i32,
    /// The section the symbol belongs to.
    pub section: Section,
    /// Visibility.
    pub binding: Binding,
    /// Whether a definition has been seen.
    pub defined: bool,
    /// Value recorded during pass 1, authoritative in pass 2.
    pub pass1_value: i32,
    /// Position in the externals table, for externals only.
    pub ext_index: Option<u16>,
}

/// Composite lookup key: `(scope, name)`. Locals key on the scope
/// current at use time, every other name on scope 0.
type SymbolKey = (u32, String);

/// The assembler's symbol table.
#[derive(Debug, Default)]
pub struct SymbolTable {
    symbols: Vec<Symbol>,
    index: HashMap<SymbolKey, SymbolId>,
    externals: Vec<SymbolId>,
    scope: u32,
}

impl SymbolTable {
    /// Create an empty table.
    pub fn new() -> Self {
        Self::default()
    }

    fn key_for(&self, name: &str) -> SymbolKey {
        let scope = if name.starts_with('@') { self.scope } else { 0 };

        (scope, name.to_owned())
    }

    /// Look a name up in the current scope.
    pub fn find(&self, name: &str) -> Option<SymbolId> {
        self.index.get(&self.key_for(name)).copied()
    }

    /// Append a new, undefined symbol.
    pub(crate) fn add(&mut self, name: &str) -> SymbolId {
        let key = self.key_for(name);
        let id = self.symbols.len();

        self.symbols.push(Symbol {
            name: name.to_owned(),
            scope: key.0,
            value: 0,
            section: Section::Absolute,
            binding: Binding::Local,
            defined: false,
            pass1_value: 0,
            ext_index: None,
        });
        self.index.insert(key, id);

        id
    }

    fn find_or_add(&mut self, name: &str) -> SymbolId {
        self.find(name).unwrap_or_else(|| self.add(name))
    }

    /// Define `name` to `value` in `section`.
    ///
    /// Redefinition is an error in pass 1. In pass 2 every label is
    /// redefined as the passes replay the same lines; the pass-1 value is
    /// authoritative then and stays in place.
    pub(crate) fn define(
        &mut self,
        name: &str,
        value: i32,
        section: Section,
        pass: Pass,
    ) -> Result<SymbolId, AsmError> {
        let id = self.find_or_add(name);
        let symbol = &mut self.symbols[id];

        if symbol.binding == Binding::Extern {
            return Err(AsmError::DefineExternal(name.to_owned()));
        }

        if symbol.defined {
            if pass == Pass::First {
                return Err(AsmError::DuplicateDefinition(name.to_owned()));
            }

            return Ok(id);
        }

        symbol.value = value;
        symbol.pass1_value = value;
        symbol.section = section;
        symbol.defined = true;

        Ok(id)
    }

    /// Mark `name` as exported.
    pub(crate) fn set_export(&mut self, name: &str) -> Result<SymbolId, AsmError> {
        let id = self.find_or_add(name);
        let symbol = &mut self.symbols[id];

        if symbol.binding == Binding::Extern {
            return Err(AsmError::ExportExternal(name.to_owned()));
        }

        symbol.binding = Binding::Export;

        Ok(id)
    }

    /// Mark `name` as external, appending it to the externals list on
    /// first sight.
    pub(crate) fn set_extern(&mut self, name: &str) -> Result<SymbolId, AsmError> {
        let id = self.find_or_add(name);
        let symbol = &mut self.symbols[id];

        if symbol.binding == Binding::Extern {
            // Seen before (or replayed in pass 2); the list is already
            // in its final order.
            return Ok(id);
        }

        if symbol.defined {
            return Err(AsmError::ExternAfterDefinition(name.to_owned()));
        }

        symbol.binding = Binding::Extern;
        symbol.section = Section::Absolute;
        symbol.ext_index = Some(self.externals.len() as u16);
        self.externals.push(id);

        Ok(id)
    }

    /// Open a fresh local-label scope. Called after every non-local
    /// label definition.
    pub(crate) fn open_scope(&mut self) {
        self.scope += 1;
    }

    /// Rewind the scope counter for the second pass, so locals resolve
    /// to the same scopes again.
    pub(crate) fn rewind_scope(&mut self) {
        self.scope = 0;
    }

    /// The symbol behind an id.
    pub fn get(&self, id: SymbolId) -> &Symbol {
        &self.symbols[id]
    }

    /// All symbols, in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = &Symbol> {
        self.symbols.iter()
    }

    /// The externals, in `ext_index` order.
    pub fn externals(&self) -> impl Iterator<Item = &Symbol> {
        self.externals.iter().map(|&id| &self.symbols[id])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_redefinition_is_a_pass1_error() {
        let mut table = SymbolTable::new();

        table.define("x", 1, Section::Code, Pass::First).unwrap();
        assert!(matches!(
            table.define("x", 2, Section::Code, Pass::First),
            Err(AsmError::DuplicateDefinition(_))
        ));
    }

    #[test]
    fn test_pass1_value_is_authoritative() {
        let mut table = SymbolTable::new();

        let id = table.define("x", 1, Section::Code, Pass::First).unwrap();
        table.define("x", 9, Section::Code, Pass::Second).unwrap();

        assert_eq!(table.get(id).value, 1);
    }

    #[test]
    fn test_local_scoping() {
        let mut table = SymbolTable::new();

        let first = table.define("@loop", 1, Section::Code, Pass::First).unwrap();
        table.open_scope();
        let second = table.define("@loop", 2, Section::Code, Pass::First).unwrap();

        assert_ne!(first, second);
        assert_eq!(table.find("@loop"), Some(second));

        table.rewind_scope();
        assert_eq!(table.find("@loop"), Some(first));
    }

    #[test]
    fn test_externals_are_ordered_and_deduplicated() {
        let mut table = SymbolTable::new();

        table.set_extern("b").unwrap();
        table.set_extern("a").unwrap();
        table.set_extern("b").unwrap();

        let names: Vec<_> = table.externals().map(|symbol| symbol.name.as_str()).collect();
        assert_eq!(names, vec!["b", "a"]);

        assert_eq!(table.get(table.find("b").unwrap()).ext_index, Some(0));
        assert_eq!(table.get(table.find("a").unwrap()).ext_index, Some(1));
    }

    #[test]
    fn test_extern_definition_conflicts() {
        let mut table = SymbolTable::new();

        table.set_extern("x").unwrap();
        assert!(matches!(
            table.define("x", 0, Section::Code, Pass::First),
            Err(AsmError::DefineExternal(_))
        ));

        table.define("y", 0, Section::Code, Pass::First).unwrap();
        assert!(matches!(table.set_extern("y"), Err(AsmError::ExternAfterDefinition(_))));
    }
}
