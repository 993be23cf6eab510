//! Operation binding.
//!
//! Resolves every selection and variable of the operation documents against
//! a frozen registry. Fragments are global to a run: each fragment body is
//! bound once against its type condition, then operations are bound in
//! parallel and reuse those bodies wherever they are spread.
//!
//! Binding produces:
//! - a [`BoundSelection`] tree where every field carries its resolved type,
//! - a [`ResultShape`] describing the response a code generator decodes,
//! - the transitive fragment set and the printed request document.

use crate::hir::{
    deprecation, Argument, DirectiveUsage, FieldDefinition, FieldSelection, FragmentDefinition,
    FragmentSpread, HirDocument, InlineFragment, OperationDocument, Selection, TypeDefinition,
    TypeKind, TypeReference, Value,
};
use crate::printer;
use crate::types::{SemanticError, TypeRegistry};
use crate::values::{is_variable_usage_allowed, ValueChecker, VariableUsage};
use gqlbind_core::{diagnostics::codes, DiagnosticBag, Location};
use gqlbind_syntax::{DirectiveLocation, OperationType};
use indexmap::map::Entry;
use indexmap::IndexMap;
use rayon::prelude::*;
use rustc_hash::{FxHashMap, FxHashSet};
use std::collections::{BTreeMap, BTreeSet};

/// The meta field available on every composite type.
pub const TYPENAME: &str = "__typename";

/// A variable declared by an operation.
#[derive(Debug, Clone, PartialEq)]
pub struct BoundVariable {
    pub name: String,
    pub ty: TypeReference,
    pub default_value: Option<Value>,
    pub location: Location,
}

/// A field with its resolved type.
#[derive(Debug, Clone, PartialEq)]
pub struct BoundField {
    pub response_key: String,
    pub field_name: String,
    pub alias: Option<String>,
    pub ty: TypeReference,
    pub arguments: Vec<Argument>,
    pub directives: Vec<DirectiveUsage>,
    /// Carries `@skip` or `@include`.
    pub conditional: bool,
    pub selections: Vec<BoundSelection>,
    pub location: Location,
}

/// An inline fragment, or a spread with the named fragment's bound body.
#[derive(Debug, Clone, PartialEq)]
pub struct BoundFragment {
    /// `None` for an inline fragment without a type condition.
    pub type_condition: Option<String>,
    /// Set for spreads.
    pub fragment_name: Option<String>,
    pub directives: Vec<DirectiveUsage>,
    pub conditional: bool,
    pub selections: Vec<BoundSelection>,
    pub location: Location,
}

#[derive(Debug, Clone, PartialEq)]
pub enum BoundSelection {
    Field(BoundField),
    Fragment(BoundFragment),
}

/// A named fragment bound against its type condition.
#[derive(Debug, Clone, PartialEq)]
pub struct BoundFragmentDefinition {
    pub name: String,
    pub type_condition: String,
    pub directives: Vec<DirectiveUsage>,
    pub selections: Vec<BoundSelection>,
    /// Variable usages of this fragment and every fragment it spreads.
    pub usages: Vec<VariableUsage>,
    /// Fragments spread from this one, transitively.
    pub spreads: BTreeSet<String>,
    pub location: Location,
}

/// One key of a response object.
#[derive(Debug, Clone, PartialEq)]
pub struct ShapeField {
    pub response_key: String,
    pub field_name: String,
    /// Nullable when every selection of the key is conditional.
    pub ty: TypeReference,
    /// Present for composite fields.
    pub shape: Option<Box<ResultShape>>,
}

/// Fields present when the value is of one concrete object type.
#[derive(Debug, Clone, PartialEq)]
pub struct ShapeVariant {
    pub type_name: String,
    pub fields: Vec<ShapeField>,
}

/// The decoded form of a selection set.
///
/// For an abstract type `fields` holds the keys every variant shares and
/// `variants` holds one entry per possible object type, ordered by name.
#[derive(Debug, Clone, PartialEq)]
pub struct ResultShape {
    pub type_name: String,
    pub fields: Vec<ShapeField>,
    pub variants: Vec<ShapeVariant>,
}

impl ResultShape {
    #[must_use]
    pub fn is_polymorphic(&self) -> bool {
        !self.variants.is_empty()
    }

    #[must_use]
    pub fn field(&self, response_key: &str) -> Option<&ShapeField> {
        self.fields.iter().find(|f| f.response_key == response_key)
    }
}

/// An operation resolved against the registry.
#[derive(Debug, Clone, PartialEq)]
pub struct BoundOperation {
    pub name: String,
    pub operation_type: OperationType,
    pub root_type: String,
    pub variables: Vec<BoundVariable>,
    pub directives: Vec<DirectiveUsage>,
    pub selections: Vec<BoundSelection>,
    pub result_shape: ResultShape,
    /// Every fragment the operation uses, transitively, ordered by name.
    pub fragments: Vec<String>,
    /// The request document sent to the server.
    pub document: String,
    pub location: Location,
}

impl BoundOperation {
    #[must_use]
    pub fn variable(&self, name: &str) -> Option<&BoundVariable> {
        self.variables.iter().find(|v| v.name == name)
    }
}

/// Result of binding every operation of a run.
#[derive(Debug, Default)]
pub struct BindResult {
    /// Ordered by name.
    pub operations: Vec<BoundOperation>,
    pub fragments: BTreeMap<String, BoundFragmentDefinition>,
    pub diagnostics: DiagnosticBag,
}

/// Binds every operation and fragment of `documents`.
///
/// The registry is expected to be frozen and free of fatal diagnostics.
pub fn bind(registry: &TypeRegistry, documents: &[HirDocument]) -> BindResult {
    let mut diagnostics = DiagnosticBag::new();

    let table = FragmentTable::bind(registry, documents, &mut diagnostics);

    let mut operations: Vec<&OperationDocument> =
        documents.iter().flat_map(|d| &d.operations).collect();
    operations.sort_by_key(|op| op.location);
    let mut names: FxHashSet<&str> = FxHashSet::default();
    operations.retain(|op| match op.name.as_deref() {
        Some(name) if !names.insert(name) => {
            diagnostics.add(
                SemanticError::DuplicateName {
                    what: "operation",
                    name: name.to_string(),
                    location: op.location,
                }
                .into(),
            );
            false
        }
        _ => true,
    });

    let results: Vec<(Option<BoundOperation>, DiagnosticBag)> = operations
        .par_iter()
        .map(|op| bind_operation(registry, &table, op))
        .collect();

    let mut bound = Vec::with_capacity(results.len());
    for (operation, op_diagnostics) in results {
        diagnostics.append(op_diagnostics);
        bound.extend(operation);
    }
    bound.sort_by(|a, b| a.name.cmp(&b.name));

    let used: BTreeSet<&str> = bound
        .iter()
        .flat_map(|op| op.fragments.iter().map(String::as_str))
        .collect();
    for (name, def) in &table.declared {
        if !used.contains(name) {
            diagnostics.warning(
                codes::UNUSED_FRAGMENT,
                "unused fragment",
                def.location,
                format!("fragment `{name}` is never used"),
            );
        }
    }

    tracing::debug!(
        operations = bound.len(),
        fragments = table.bound.len(),
        "bound operations"
    );

    BindResult {
        operations: bound,
        fragments: table.bound,
        diagnostics,
    }
}

struct FragmentTable<'h> {
    declared: BTreeMap<&'h str, &'h FragmentDefinition>,
    bound: BTreeMap<String, BoundFragmentDefinition>,
}

impl<'h> FragmentTable<'h> {
    fn bind(
        registry: &TypeRegistry,
        documents: &'h [HirDocument],
        diagnostics: &mut DiagnosticBag,
    ) -> Self {
        let mut all: Vec<&FragmentDefinition> =
            documents.iter().flat_map(|d| &d.fragments).collect();
        all.sort_by_key(|f| f.location);

        let mut declared = BTreeMap::new();
        for fragment in all {
            if declared.contains_key(fragment.name.as_str()) {
                diagnostics.add(
                    SemanticError::DuplicateName {
                        what: "fragment",
                        name: fragment.name.clone(),
                        location: fragment.location,
                    }
                    .into(),
                );
                continue;
            }
            declared.insert(fragment.name.as_str(), fragment);
        }

        let mut table = Self {
            declared,
            bound: BTreeMap::new(),
        };
        for name in dependency_order(&table.declared, diagnostics) {
            let Some(def) = table.declared.get(name).copied() else {
                continue;
            };
            if let Some(bound) = bind_fragment(registry, &table, def, diagnostics) {
                table.bound.insert(bound.name.clone(), bound);
            }
        }
        table
    }
}

/// Orders fragments so every fragment follows the fragments it spreads,
/// reporting each cycle found on the way.
fn dependency_order<'h>(
    declared: &BTreeMap<&'h str, &'h FragmentDefinition>,
    diagnostics: &mut DiagnosticBag,
) -> Vec<&'h str> {
    struct Walk<'h, 'd> {
        declared: &'d BTreeMap<&'h str, &'h FragmentDefinition>,
        // false while on the stack, true once finished
        marks: FxHashMap<&'h str, bool>,
        stack: Vec<&'h str>,
        order: Vec<&'h str>,
    }

    impl<'h> Walk<'h, '_> {
        fn visit(&mut self, name: &'h str, diagnostics: &mut DiagnosticBag) {
            let declared = self.declared;
            let Some(def) = declared.get(name).copied() else {
                return;
            };
            self.marks.insert(name, false);
            self.stack.push(name);

            let mut spreads = Vec::new();
            collect_spreads(&def.selection_set, &mut spreads);
            for spread in spreads {
                let Some((&target, _)) = declared.get_key_value(spread.name.as_str()) else {
                    continue;
                };
                match self.marks.get(target).copied() {
                    Some(false) => {
                        let start = self.stack.iter().position(|n| *n == target).unwrap_or(0);
                        let mut path = self.stack[start..].to_vec();
                        path.push(target);
                        diagnostics.error(
                            codes::FRAGMENT_CYCLE,
                            "fragment cycle",
                            spread.location,
                            format!("fragments spread each other: {}", path.join(" -> ")),
                        );
                    }
                    Some(true) => {}
                    None => self.visit(target, diagnostics),
                }
            }

            self.stack.pop();
            self.marks.insert(name, true);
            self.order.push(name);
        }
    }

    let mut walk = Walk {
        declared,
        marks: FxHashMap::default(),
        stack: Vec::new(),
        order: Vec::new(),
    };
    for name in declared.keys() {
        if !walk.marks.contains_key(name) {
            walk.visit(name, diagnostics);
        }
    }
    walk.order
}

fn collect_spreads<'h>(selections: &'h [Selection], out: &mut Vec<&'h FragmentSpread>) {
    for selection in selections {
        match selection {
            Selection::Field(field) => collect_spreads(&field.selection_set, out),
            Selection::InlineFragment(inline) => collect_spreads(&inline.selection_set, out),
            Selection::FragmentSpread(spread) => out.push(spread),
        }
    }
}

fn bind_fragment(
    registry: &TypeRegistry,
    table: &FragmentTable<'_>,
    def: &FragmentDefinition,
    diagnostics: &mut DiagnosticBag,
) -> Option<BoundFragmentDefinition> {
    let condition = &def.type_condition;
    match registry.kind_of(&condition.name) {
        None => {
            diagnostics.add(
                SemanticError::UnknownType {
                    name: condition.name.clone(),
                    location: condition.location,
                }
                .into(),
            );
            return None;
        }
        Some(kind) if !kind.is_composite() => {
            diagnostics.error(
                codes::FRAGMENT_CONDITION,
                "invalid fragment condition",
                condition.location,
                format!(
                    "fragment `{}` cannot be declared on {kind} `{}`",
                    def.name, condition.name
                ),
            );
            return None;
        }
        Some(_) => {}
    }

    let mut binder = SelectionBinder::new(registry, table, diagnostics);
    binder.check_directives(&def.directives, DirectiveLocation::FragmentDefinition);
    let selections = binder.bind_selections(&condition.name, &def.selection_set);

    Some(BoundFragmentDefinition {
        name: def.name.clone(),
        type_condition: condition.name.clone(),
        directives: def.directives.clone(),
        selections,
        usages: binder.usages,
        spreads: binder.spreads,
        location: def.location,
    })
}

fn bind_operation(
    registry: &TypeRegistry,
    table: &FragmentTable<'_>,
    op: &OperationDocument,
) -> (Option<BoundOperation>, DiagnosticBag) {
    let mut diagnostics = DiagnosticBag::new();

    let Some(name) = op.name.clone() else {
        diagnostics.error(
            codes::ANONYMOUS_OPERATION,
            "anonymous operation",
            op.location,
            "operations need a name to generate code for",
        );
        return (None, diagnostics);
    };
    let Some(root_type) = registry.root_type(op.operation_type).map(str::to_string) else {
        diagnostics.error(
            codes::MISSING_ROOT,
            "missing root type",
            op.location,
            format!("the schema has no {} root type", op.operation_type.as_str()),
        );
        return (None, diagnostics);
    };

    let variables = bind_variables(registry, op, &mut diagnostics);

    let mut binder = SelectionBinder::new(registry, table, &mut diagnostics);
    let placement = match op.operation_type {
        OperationType::Query => DirectiveLocation::Query,
        OperationType::Mutation => DirectiveLocation::Mutation,
        OperationType::Subscription => DirectiveLocation::Subscription,
    };
    binder.check_directives(&op.directives, placement);
    let selections = binder.bind_selections(&root_type, &op.selection_set);
    let usages = binder.usages;
    let fragments: Vec<String> = binder.spreads.into_iter().collect();

    check_variable_usages(&variables, &usages, &mut diagnostics);

    let result_shape = ShapeBuilder::new(registry, &mut diagnostics).build(&root_type, &selections);

    let mut operation = BoundOperation {
        name,
        operation_type: op.operation_type,
        root_type,
        variables,
        directives: op.directives.clone(),
        selections,
        result_shape,
        fragments,
        document: String::new(),
        location: op.location,
    };
    operation.document = printer::print_operation(&operation, &table.bound);

    (Some(operation), diagnostics)
}

fn bind_variables(
    registry: &TypeRegistry,
    op: &OperationDocument,
    diagnostics: &mut DiagnosticBag,
) -> Vec<BoundVariable> {
    let mut variables: Vec<BoundVariable> = Vec::with_capacity(op.variables.len());
    for variable in &op.variables {
        if variables.iter().any(|v| v.name == variable.name) {
            diagnostics.add(
                SemanticError::DuplicateName {
                    what: "variable",
                    name: format!("${}", variable.name),
                    location: variable.location,
                }
                .into(),
            );
            continue;
        }

        let mut usages = Vec::new();
        let mut checker = ValueChecker {
            registry,
            diagnostics: &mut *diagnostics,
            usages: &mut usages,
        };
        checker.check_directives(&variable.directives, DirectiveLocation::VariableDefinition);

        match registry.kind_of(&variable.ty.name) {
            None => checker.diagnostics.add(
                SemanticError::UnknownType {
                    name: variable.ty.name.clone(),
                    location: variable.location,
                }
                .into(),
            ),
            Some(found) if !found.is_input() => checker.diagnostics.add(
                SemanticError::KindMismatch {
                    name: variable.ty.name.clone(),
                    expected: "an input type".to_string(),
                    found,
                    location: variable.location,
                }
                .into(),
            ),
            Some(_) => {
                if let Some(default) = &variable.default_value {
                    checker.check_value(default, &variable.ty, false, variable.location);
                }
            }
        }

        variables.push(BoundVariable {
            name: variable.name.clone(),
            ty: variable.ty.clone(),
            default_value: variable.default_value.clone(),
            location: variable.location,
        });
    }
    variables
}

fn check_variable_usages(
    variables: &[BoundVariable],
    usages: &[VariableUsage],
    diagnostics: &mut DiagnosticBag,
) {
    let mut used = FxHashSet::default();
    for usage in usages {
        used.insert(usage.name.as_str());
        let Some(variable) = variables.iter().find(|v| v.name == usage.name) else {
            diagnostics.error(
                codes::UNDEFINED_VARIABLE,
                "undefined variable",
                usage.location,
                format!("variable `${}` is not declared by the operation", usage.name),
            );
            continue;
        };
        let has_default = variable
            .default_value
            .as_ref()
            .is_some_and(|v| *v != Value::Null);
        if !is_variable_usage_allowed(
            &variable.ty,
            has_default,
            &usage.expected,
            usage.has_location_default,
        ) {
            diagnostics.error(
                codes::VARIABLE_MISMATCH,
                "variable type mismatch",
                usage.location,
                format!(
                    "variable `${}` of type `{}` cannot be used where `{}` is expected",
                    usage.name, variable.ty, usage.expected
                ),
            );
        }
    }

    for variable in variables {
        if !used.contains(variable.name.as_str()) {
            diagnostics.warning(
                codes::UNUSED_VARIABLE,
                "unused variable",
                variable.location,
                format!("variable `${}` is never used", variable.name),
            );
        }
    }
}

fn is_conditional(directives: &[DirectiveUsage]) -> bool {
    directives.iter().any(|d| d.name == "skip" || d.name == "include")
}

struct SelectionBinder<'a, 'h> {
    registry: &'a TypeRegistry,
    fragments: &'a FragmentTable<'h>,
    diagnostics: &'a mut DiagnosticBag,
    usages: Vec<VariableUsage>,
    spreads: BTreeSet<String>,
}

impl<'a, 'h> SelectionBinder<'a, 'h> {
    fn new(
        registry: &'a TypeRegistry,
        fragments: &'a FragmentTable<'h>,
        diagnostics: &'a mut DiagnosticBag,
    ) -> Self {
        Self {
            registry,
            fragments,
            diagnostics,
            usages: Vec::new(),
            spreads: BTreeSet::new(),
        }
    }

    fn values(&mut self) -> ValueChecker<'_> {
        ValueChecker {
            registry: self.registry,
            diagnostics: &mut *self.diagnostics,
            usages: &mut self.usages,
        }
    }

    fn check_directives(&mut self, directives: &[DirectiveUsage], placement: DirectiveLocation) {
        self.values().check_directives(directives, placement);
    }

    fn bind_selections(&mut self, parent: &str, selections: &[Selection]) -> Vec<BoundSelection> {
        let mut bound = Vec::with_capacity(selections.len() + 1);
        for selection in selections {
            let next = match selection {
                Selection::Field(field) => self.bind_field(parent, field).map(BoundSelection::Field),
                Selection::InlineFragment(inline) => {
                    self.bind_inline(parent, inline).map(BoundSelection::Fragment)
                }
                Selection::FragmentSpread(spread) => {
                    self.bind_spread(parent, spread).map(BoundSelection::Fragment)
                }
            };
            bound.extend(next);
        }

        // Decoders of abstract types discriminate on `__typename`.
        let is_abstract = self.registry.kind_of(parent).is_some_and(TypeKind::is_abstract);
        let has_typename = bound
            .iter()
            .any(|s| matches!(s, BoundSelection::Field(f) if f.response_key == TYPENAME));
        if is_abstract && !has_typename {
            let location = selections
                .first()
                .map_or_else(Location::builtin, selection_location);
            bound.insert(0, BoundSelection::Field(typename_field(location)));
        }
        bound
    }

    fn bind_field(&mut self, parent: &str, field: &FieldSelection) -> Option<BoundField> {
        self.check_directives(&field.directives, DirectiveLocation::Field);
        let conditional = is_conditional(&field.directives);

        if field.name == TYPENAME {
            if !field.selection_set.is_empty() {
                self.shape_error(
                    field.location,
                    format!("`{TYPENAME}` is a leaf and cannot have a selection set"),
                );
            }
            if !field.arguments.is_empty() {
                self.diagnostics.error(
                    codes::UNKNOWN_ARGUMENT,
                    "unknown argument",
                    field.location,
                    format!("`{TYPENAME}` takes no arguments"),
                );
            }
            let mut typename = typename_field(field.location);
            typename.response_key = field.response_key().to_string();
            typename.alias = field.alias.clone();
            typename.directives = field.directives.clone();
            typename.conditional = conditional;
            return Some(typename);
        }

        let Some(def) = self.field_definition(parent, &field.name) else {
            self.diagnostics.add(
                SemanticError::UnknownField {
                    type_name: parent.to_string(),
                    field: field.name.clone(),
                    location: field.location,
                }
                .into(),
            );
            return None;
        };

        if let Some(usage) = deprecation(&def.directives) {
            let reason = match usage.argument("reason") {
                Some(Value::String(reason)) => format!(": {reason}"),
                _ => String::new(),
            };
            self.diagnostics.warning(
                codes::DEPRECATED_USAGE,
                "deprecated field",
                field.location,
                format!("`{parent}.{}` is deprecated{reason}", field.name),
            );
        }

        let owner = format!("{parent}.{}", field.name);
        self.values()
            .check_arguments(&owner, &def.arguments, &field.arguments, field.location);

        let composite = self
            .registry
            .kind_of(&def.ty.name)
            .is_some_and(TypeKind::is_composite);
        let selections = match (composite, field.selection_set.is_empty()) {
            (true, true) => {
                self.shape_error(
                    field.location,
                    format!("`{owner}` has type `{}` and needs a selection set", def.ty),
                );
                Vec::new()
            }
            (false, false) => {
                self.shape_error(
                    field.location,
                    format!("`{owner}` has leaf type `{}` and cannot have a selection set", def.ty),
                );
                Vec::new()
            }
            (true, false) => self.bind_selections(&def.ty.name, &field.selection_set),
            (false, true) => Vec::new(),
        };

        Some(BoundField {
            response_key: field.response_key().to_string(),
            field_name: field.name.clone(),
            alias: field.alias.clone(),
            ty: def.ty.clone(),
            arguments: field.arguments.clone(),
            directives: field.directives.clone(),
            conditional,
            selections,
            location: field.location,
        })
    }

    /// Looks a field up on an object or interface. On a union only fields
    /// every member declares with the same type can be selected directly.
    fn field_definition(&self, parent: &str, name: &str) -> Option<&'a FieldDefinition> {
        let registry = self.registry;
        match registry.get(parent)? {
            TypeDefinition::Object(object) | TypeDefinition::Interface(object) => object.field(name),
            TypeDefinition::Union(_) => {
                let members = registry.possible_types(parent);
                let (first, rest) = members.split_first()?;
                let def = registry.field(first, name)?;
                rest.iter()
                    .all(|m| registry.field(m, name).is_some_and(|f| f.ty == def.ty))
                    .then_some(def)
            }
            _ => None,
        }
    }

    fn bind_inline(&mut self, parent: &str, inline: &InlineFragment) -> Option<BoundFragment> {
        self.check_directives(&inline.directives, DirectiveLocation::InlineFragment);

        let condition = match &inline.type_condition {
            Some(condition) => {
                match self.registry.kind_of(&condition.name) {
                    None => {
                        self.diagnostics.add(
                            SemanticError::UnknownType {
                                name: condition.name.clone(),
                                location: condition.location,
                            }
                            .into(),
                        );
                        return None;
                    }
                    Some(kind) if !kind.is_composite() => {
                        self.diagnostics.error(
                            codes::FRAGMENT_CONDITION,
                            "invalid fragment condition",
                            condition.location,
                            format!(
                                "inline fragment cannot be declared on {kind} `{}`",
                                condition.name
                            ),
                        );
                        return None;
                    }
                    Some(_) => {}
                }
                if !self.check_applicable(parent, &condition.name, inline.location) {
                    return None;
                }
                Some(condition.name.clone())
            }
            None => None,
        };

        let target = condition.as_deref().unwrap_or(parent).to_string();
        let selections = self.bind_selections(&target, &inline.selection_set);
        Some(BoundFragment {
            type_condition: condition,
            fragment_name: None,
            directives: inline.directives.clone(),
            conditional: is_conditional(&inline.directives),
            selections,
            location: inline.location,
        })
    }

    fn bind_spread(&mut self, parent: &str, spread: &FragmentSpread) -> Option<BoundFragment> {
        self.check_directives(&spread.directives, DirectiveLocation::FragmentSpread);

        if !self.fragments.declared.contains_key(spread.name.as_str()) {
            self.diagnostics.error(
                codes::UNKNOWN_FRAGMENT,
                "unknown fragment",
                spread.location,
                format!("fragment `{}` is not defined", spread.name),
            );
            return None;
        }
        self.spreads.insert(spread.name.clone());

        // Missing when the fragment sits on a cycle or its condition is
        // invalid; both are reported already.
        let fragments = self.fragments;
        let def = fragments.bound.get(&spread.name)?;
        if !self.check_applicable(parent, &def.type_condition, spread.location) {
            return None;
        }

        self.usages.extend(def.usages.iter().cloned());
        self.spreads.extend(def.spreads.iter().cloned());

        Some(BoundFragment {
            type_condition: Some(def.type_condition.clone()),
            fragment_name: Some(def.name.clone()),
            directives: spread.directives.clone(),
            conditional: is_conditional(&spread.directives),
            selections: def.selections.clone(),
            location: spread.location,
        })
    }

    /// A fragment applies when its condition and the enclosing type share a
    /// possible type.
    fn check_applicable(&mut self, parent: &str, condition: &str, location: Location) -> bool {
        if parent == condition {
            return true;
        }
        let parent_types = self.registry.possible_types(parent);
        let applicable = self
            .registry
            .possible_types(condition)
            .iter()
            .any(|t| parent_types.contains(t));
        if !applicable {
            self.diagnostics.error(
                codes::FRAGMENT_CONDITION,
                "fragment can never apply",
                location,
                format!("a fragment on `{condition}` can never match a `{parent}`"),
            );
        }
        applicable
    }

    fn shape_error(&mut self, location: Location, message: String) {
        self.diagnostics
            .error(codes::SELECTION_SHAPE, "invalid selection", location, message);
    }
}

fn selection_location(selection: &Selection) -> Location {
    match selection {
        Selection::Field(field) => field.location,
        Selection::FragmentSpread(spread) => spread.location,
        Selection::InlineFragment(inline) => inline.location,
    }
}

fn typename_field(location: Location) -> BoundField {
    BoundField {
        response_key: TYPENAME.to_string(),
        field_name: TYPENAME.to_string(),
        alias: None,
        ty: TypeReference::named("String").non_null(),
        arguments: Vec::new(),
        directives: Vec::new(),
        conditional: false,
        selections: Vec::new(),
        location,
    }
}

struct Group<'s> {
    fields: Vec<&'s BoundField>,
    conditional: bool,
}

/// Flattens bound selections into result shapes.
struct ShapeBuilder<'a> {
    registry: &'a TypeRegistry,
    diagnostics: &'a mut DiagnosticBag,
    reported: FxHashSet<Location>,
}

impl<'a> ShapeBuilder<'a> {
    fn new(registry: &'a TypeRegistry, diagnostics: &'a mut DiagnosticBag) -> Self {
        Self {
            registry,
            diagnostics,
            reported: FxHashSet::default(),
        }
    }

    fn build(&mut self, type_name: &str, selections: &[BoundSelection]) -> ResultShape {
        let selections: Vec<&BoundSelection> = selections.iter().collect();
        self.shape(type_name, &selections)
    }

    fn shape(&mut self, type_name: &str, selections: &[&BoundSelection]) -> ResultShape {
        let registry = self.registry;
        let is_abstract = registry.kind_of(type_name).is_some_and(TypeKind::is_abstract);
        let possible = if is_abstract {
            registry.possible_types(type_name)
        } else {
            Vec::new()
        };
        if possible.is_empty() {
            return ResultShape {
                type_name: type_name.to_string(),
                fields: self.fields(selections, type_name),
                variants: Vec::new(),
            };
        }

        let variants: Vec<ShapeVariant> = possible
            .iter()
            .map(|object| ShapeVariant {
                type_name: (*object).to_string(),
                fields: self.fields(selections, object),
            })
            .collect();
        let fields = match variants.split_first() {
            Some((first, rest)) => first
                .fields
                .iter()
                .filter(|f| rest.iter().all(|v| v.fields.contains(f)))
                .cloned()
                .collect(),
            None => Vec::new(),
        };
        ResultShape {
            type_name: type_name.to_string(),
            fields,
            variants,
        }
    }

    fn fields(&mut self, selections: &[&BoundSelection], object: &str) -> Vec<ShapeField> {
        let mut groups = IndexMap::new();
        self.collect(selections, object, false, &mut groups);
        groups
            .into_values()
            .map(|group| self.shape_field(&group))
            .collect()
    }

    fn collect<'s>(
        &mut self,
        selections: &[&'s BoundSelection],
        object: &str,
        conditional: bool,
        groups: &mut IndexMap<&'s str, Group<'s>>,
    ) {
        for selection in selections {
            match *selection {
                BoundSelection::Field(field) => {
                    let conditional = conditional || field.conditional;
                    match groups.entry(field.response_key.as_str()) {
                        Entry::Occupied(mut entry) => {
                            let group = entry.get_mut();
                            self.check_mergeable(group.fields[0], field);
                            group.fields.push(field);
                            group.conditional &= conditional;
                        }
                        Entry::Vacant(entry) => {
                            entry.insert(Group {
                                fields: vec![field],
                                conditional,
                            });
                        }
                    }
                }
                BoundSelection::Fragment(fragment) => {
                    if self.applies(fragment.type_condition.as_deref(), object) {
                        let children: Vec<&BoundSelection> = fragment.selections.iter().collect();
                        self.collect(&children, object, conditional || fragment.conditional, groups);
                    }
                }
            }
        }
    }

    fn applies(&self, condition: Option<&str>, object: &str) -> bool {
        condition.map_or(true, |c| c == object || self.registry.is_possible_type(c, object))
    }

    fn check_mergeable(&mut self, first: &BoundField, other: &BoundField) {
        let same = first.field_name == other.field_name
            && same_arguments(&first.arguments, &other.arguments);
        if !same && self.reported.insert(other.location) {
            self.diagnostics.error(
                codes::FIELD_CONFLICT,
                "conflicting fields",
                other.location,
                format!(
                    "`{}` selects `{}` and `{}` with different arguments or fields",
                    first.response_key, first.field_name, other.field_name
                ),
            );
        }
    }

    fn shape_field(&mut self, group: &Group<'_>) -> ShapeField {
        let first = group.fields[0];
        let ty = if group.conditional {
            first.ty.nullable()
        } else {
            first.ty.clone()
        };
        let children: Vec<&BoundSelection> =
            group.fields.iter().flat_map(|f| &f.selections).collect();
        let shape = if children.is_empty() {
            None
        } else {
            Some(Box::new(self.shape(&first.ty.name, &children)))
        };
        ShapeField {
            response_key: first.response_key.clone(),
            field_name: first.field_name.clone(),
            ty,
            shape,
        }
    }
}

fn same_arguments(a: &[Argument], b: &[Argument]) -> bool {
    fn sorted(arguments: &[Argument]) -> Vec<(&str, &Value)> {
        let mut pairs: Vec<_> = arguments
            .iter()
            .map(|a| (a.name.as_str(), &a.value))
            .collect();
        pairs.sort_by(|x, y| x.0.cmp(y.0));
        pairs
    }
    sorted(a) == sorted(b)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::{analyze, SourceDocument};

    const SCHEMA: &str = r#"
        interface Node { id: ID! }
        type User implements Node {
            id: ID!
            name: String
            email: String @deprecated(reason: "use contact")
            friends(first: Int = 10): [User!]!
        }
        type Post implements Node { id: ID! title: String! author: User }
        union SearchResult = User | Post
        enum Role { ADMIN MEMBER }
        input UserFilter { role: Role! name: String }
        type Query {
            user(id: ID!): User
            node(id: ID!): Node
            search(term: String!): [SearchResult!]!
            users(filter: UserFilter): [User!]!
        }
    "#;

    fn bind_source(operations: &str) -> (BindResult, DiagnosticBag) {
        let analysis = analyze(&[
            SourceDocument::new(0, "schema.graphql", SCHEMA),
            SourceDocument::new(1, "operations.graphql", operations),
        ]);
        let diagnostics = analysis.diagnostics.clone();
        (
            BindResult {
                operations: analysis.operations,
                fragments: analysis.fragments,
                diagnostics: analysis.diagnostics,
            },
            diagnostics,
        )
    }

    fn codes_of(diagnostics: &DiagnosticBag) -> Vec<&str> {
        diagnostics.iter().map(|d| d.code.as_str()).collect()
    }

    #[test]
    fn test_get_user_binding() {
        let (result, diagnostics) =
            bind_source("query GetUser($id: ID!) { user(id: $id) { id name } }");
        assert!(diagnostics.is_empty(), "{diagnostics:?}");

        let op = &result.operations[0];
        assert_eq!(op.name, "GetUser");
        assert_eq!(op.root_type, "Query");
        assert_eq!(op.variables[0].ty.to_string(), "ID!");

        let user = op.result_shape.field("user").unwrap();
        assert_eq!(user.ty.to_string(), "User");
        let fields: Vec<_> = user
            .shape
            .as_ref()
            .unwrap()
            .fields
            .iter()
            .map(|f| (f.response_key.as_str(), f.ty.to_string()))
            .collect();
        assert_eq!(
            fields,
            vec![("id", "ID!".to_string()), ("name", "String".to_string())]
        );
    }

    #[test]
    fn test_unknown_field() {
        let (_, diagnostics) = bind_source("query Q { user(id: 1) { nope } }");
        assert_eq!(codes_of(&diagnostics), vec![codes::UNKNOWN_FIELD]);
    }

    #[test]
    fn test_leaf_and_composite_selections() {
        let (_, diagnostics) = bind_source("query Q { user(id: 1) { id { x } friends } }");
        assert_eq!(
            codes_of(&diagnostics),
            vec![codes::SELECTION_SHAPE, codes::SELECTION_SHAPE]
        );
    }

    #[test]
    fn test_variable_rules() {
        let (_, diagnostics) = bind_source(
            "query Q($id: ID, $unused: Int) { user(id: $id) { id } node(id: $missing) { id } }",
        );
        let mut codes = codes_of(&diagnostics);
        codes.sort_unstable();
        assert_eq!(
            codes,
            vec![
                codes::UNDEFINED_VARIABLE,
                codes::VARIABLE_MISMATCH,
                codes::UNUSED_VARIABLE
            ]
        );
    }

    #[test]
    fn test_default_value_relaxes_non_null() {
        let (_, diagnostics) = bind_source(r#"query Q($id: ID = "1") { user(id: $id) { id } }"#);
        assert!(diagnostics.is_empty(), "{diagnostics:?}");
    }

    #[test]
    fn test_argument_literals() {
        let (_, diagnostics) = bind_source(
            r#"query Q { users(filter: { role: GUEST, extra: 1 }) { id } user { id } }"#,
        );
        let mut codes = codes_of(&diagnostics);
        codes.sort_unstable();
        assert_eq!(
            codes,
            vec![codes::MISSING_ARGUMENT, codes::INVALID_VALUE, codes::INVALID_VALUE]
        );
    }

    #[test]
    fn test_abstract_selection_gets_typename() {
        let (result, diagnostics) = bind_source(
            "query Search { search(term: \"a\") { ... on User { id name } ... on Post { id title } } }",
        );
        assert!(diagnostics.is_empty(), "{diagnostics:?}");
        let op = &result.operations[0];
        assert!(op.document.contains("search(term: \"a\") {\n    __typename"));

        let search = op.result_shape.field("search").unwrap().shape.as_ref().unwrap();
        assert!(search.is_polymorphic());
        let variants: Vec<_> = search.variants.iter().map(|v| v.type_name.as_str()).collect();
        assert_eq!(variants, vec!["Post", "User"]);
        let common: Vec<_> = search.fields.iter().map(|f| f.response_key.as_str()).collect();
        assert_eq!(common, vec!["__typename", "id"]);
    }

    #[test]
    fn test_union_allows_only_shared_fields() {
        let (_, diagnostics) = bind_source("query Q { search(term: \"a\") { id title } }");
        let errors: Vec<_> = diagnostics.iter().map(ToString::to_string).collect();
        assert_eq!(errors.len(), 1);
        assert!(errors[0].contains("`SearchResult` has no field `title`"), "{errors:?}");
    }

    #[test]
    fn test_fragment_condition_must_apply() {
        let (_, diagnostics) =
            bind_source("query Q { user(id: 1) { ... on Post { title } } }");
        assert_eq!(codes_of(&diagnostics), vec![codes::FRAGMENT_CONDITION]);
    }

    #[test]
    fn test_fragments_are_shared_and_transitive() {
        let (result, diagnostics) = bind_source(
            r#"
            query A { user(id: 1) { ...UserFields } }
            query B { node(id: 1) { ...NodeFields } }
            fragment UserFields on User { name ...NodeFields }
            fragment NodeFields on Node { id }
            fragment Unused on Post { title }
            "#,
        );
        assert_eq!(codes_of(&diagnostics), vec![codes::UNUSED_FRAGMENT]);
        assert_eq!(result.operations[0].fragments, vec!["NodeFields", "UserFields"]);
        assert_eq!(result.operations[1].fragments, vec!["NodeFields"]);
        assert!(result.operations[0].document.contains("fragment NodeFields on Node"));
    }

    #[test]
    fn test_fragment_cycle_and_unknown_fragment() {
        let (_, diagnostics) = bind_source(
            r#"
            query Q { user(id: 1) { ...A ...Missing } }
            fragment A on User { ...B }
            fragment B on User { ...A }
            "#,
        );
        let mut codes = codes_of(&diagnostics);
        codes.sort_unstable();
        assert_eq!(codes, vec![codes::UNKNOWN_FRAGMENT, codes::FRAGMENT_CYCLE]);
    }

    #[test]
    fn test_conditional_fields_are_nullable() {
        let (result, diagnostics) = bind_source(
            "query Q($withPosts: Boolean!) { user(id: 1) { id @include(if: $withPosts) } }",
        );
        assert!(diagnostics.is_empty(), "{diagnostics:?}");
        let user = result.operations[0].result_shape.field("user").unwrap();
        let id = user.shape.as_ref().unwrap().field("id").unwrap();
        assert_eq!(id.ty.to_string(), "ID");
    }

    #[test]
    fn test_field_conflict() {
        let (_, diagnostics) = bind_source("query Q { user(id: 1) { name: id name } }");
        assert_eq!(codes_of(&diagnostics), vec![codes::FIELD_CONFLICT]);
    }

    #[test]
    fn test_deprecated_field_warns() {
        let (result, diagnostics) = bind_source("query Q { user(id: 1) { email } }");
        assert_eq!(codes_of(&diagnostics), vec![codes::DEPRECATED_USAGE]);
        assert!(!diagnostics.has_errors());
        assert_eq!(result.operations.len(), 1);
    }

    #[test]
    fn test_anonymous_and_duplicate_operations() {
        let (_, diagnostics) = bind_source("{ user(id: 1) { id } } query Q { node(id: 1) { id } } query Q { node(id: 2) { id } }");
        let mut codes = codes_of(&diagnostics);
        codes.sort_unstable();
        assert_eq!(codes, vec![codes::DUPLICATE_NAME, codes::ANONYMOUS_OPERATION]);
    }

    #[test]
    fn test_missing_root() {
        let (_, diagnostics) = bind_source("mutation M { user(id: 1) { id } }");
        assert_eq!(codes_of(&diagnostics), vec![codes::MISSING_ROOT]);
    }
}
