//! Flattens result shapes into named response types.
//!
//! The root type of operation `GetUser` is `GetUserResult`. Every nested
//! selection becomes its own type named after its owner and response key
//! (`GetUser` -> `GetUserUser` -> `GetUserUserFriends`).
//! A polymorphic shape becomes a union whose variants append the concrete
//! type name (`SearchSearch` -> `SearchSearchPost`). A name that is already
//! taken gets the smallest free numeric suffix (`SaveResult2`).

use crate::naming::pascal_case;
use gqlbind_semantic::binder::TYPENAME;
use gqlbind_semantic::{ResultShape, ShapeField};
use std::collections::BTreeSet;

#[derive(Debug)]
pub(crate) struct FieldPlan<'s> {
    pub field: &'s ShapeField,
    /// Name of the nested response type, for composite fields.
    pub nested: Option<String>,
    /// Also declared by the enclosing union.
    pub inherited: bool,
}

impl FieldPlan<'_> {
    /// The `__typename` key that a tagged union consumes as its discriminator.
    pub(crate) fn is_discriminator(&self) -> bool {
        self.field.response_key == TYPENAME && self.field.field_name == TYPENAME
    }
}

#[derive(Debug)]
pub(crate) struct ObjectPlan<'s> {
    pub name: String,
    /// Concrete type name when this object is a union variant.
    pub typename: Option<&'s str>,
    /// The union this object is a variant of.
    pub parent: Option<String>,
    pub fields: Vec<FieldPlan<'s>>,
}

#[derive(Debug)]
pub(crate) struct UnionPlan<'s> {
    pub name: String,
    pub common: Vec<FieldPlan<'s>>,
    /// `(type name, plan name)` pairs ordered by type name.
    pub variants: Vec<(&'s str, String)>,
}

#[derive(Debug)]
pub(crate) enum ShapePlan<'s> {
    Object(ObjectPlan<'s>),
    Union(UnionPlan<'s>),
}

impl ShapePlan<'_> {
    pub(crate) fn name(&self) -> &str {
        match self {
            Self::Object(object) => &object.name,
            Self::Union(union) => &union.name,
        }
    }
}

/// Every declared name of one generated package.
///
/// Response types claim names here after the fixed names are reserved, so
/// two declarations never share a name in a file or across the index.
#[derive(Debug, Default)]
pub(crate) struct Names {
    taken: BTreeSet<String>,
}

impl Names {
    /// Takes `name` as is; false if it was already taken.
    pub(crate) fn reserve(&mut self, name: impl Into<String>) -> bool {
        self.taken.insert(name.into())
    }

    /// Takes `base`, or `base` followed by the smallest free number from 2.
    pub(crate) fn claim(&mut self, base: String) -> String {
        if !self.taken.contains(&base) {
            self.taken.insert(base.clone());
            return base;
        }
        let mut n = 2;
        loop {
            let candidate = format!("{base}{n}");
            if self.taken.insert(candidate.clone()) {
                return candidate;
            }
            n += 1;
        }
    }
}

/// Preferred name of the root response type of an operation.
fn root_name(operation: &str) -> String {
    format!("{operation}Result")
}

/// Plans every response type of an operation, root first, in pre-order.
pub(crate) fn plan<'s>(operation: &str, shape: &'s ResultShape, names: &mut Names) -> Vec<ShapePlan<'s>> {
    let mut planner = Planner {
        names,
        plans: Vec::new(),
    };
    let root = planner.names.claim(root_name(operation));
    planner.shape(root, operation, shape);
    planner.plans
}

fn nested_name(owner: &str, field: &ShapeField) -> String {
    format!("{owner}{}", pascal_case(&field.response_key))
}

struct Planner<'n, 's> {
    names: &'n mut Names,
    plans: Vec<ShapePlan<'s>>,
}

impl<'s> Planner<'_, 's> {
    fn field(&mut self, owner: &str, field: &'s ShapeField) -> FieldPlan<'s> {
        FieldPlan {
            field,
            nested: field.shape.as_ref().map(|_| self.names.claim(nested_name(owner, field))),
            inherited: false,
        }
    }

    fn fields(&mut self, owner: &str, fields: &'s [ShapeField]) -> Vec<FieldPlan<'s>> {
        fields.iter().map(|f| self.field(owner, f)).collect()
    }

    fn children(&mut self, children: Vec<(String, &'s ResultShape)>) {
        for (name, shape) in children {
            let owner = name.clone();
            self.shape(name, &owner, shape);
        }
    }

    /// Plans `shape` as type `name`; nested types are named after `owner`.
    fn shape(&mut self, name: String, owner: &str, shape: &'s ResultShape) {
        if !shape.is_polymorphic() {
            let fields = self.fields(owner, &shape.fields);
            let children = nested_of(&fields);
            self.plans.push(ShapePlan::Object(ObjectPlan {
                name,
                typename: None,
                parent: None,
                fields,
            }));
            self.children(children);
            return;
        }

        let common = self.fields(owner, &shape.fields);
        let variants: Vec<(&'s str, String)> = shape
            .variants
            .iter()
            .map(|v| (v.type_name.as_str(), self.names.claim(format!("{name}{}", v.type_name))))
            .collect();
        let shared: Vec<(&'s ShapeField, Option<String>)> =
            common.iter().map(|f| (f.field, f.nested.clone())).collect();
        let children = nested_of(&common);
        self.plans.push(ShapePlan::Union(UnionPlan {
            name: name.clone(),
            common,
            variants: variants.clone(),
        }));
        self.children(children);

        for (variant, (typename, variant_name)) in shape.variants.iter().zip(variants) {
            // Common fields reuse the union's nested types.
            let fields: Vec<FieldPlan<'s>> = variant
                .fields
                .iter()
                .map(|f| match shared.iter().find(|(common, _)| *common == f) {
                    Some((_, nested)) => FieldPlan {
                        field: f,
                        nested: nested.clone(),
                        inherited: true,
                    },
                    None => self.field(&variant_name, f),
                })
                .collect();
            let own = fields
                .iter()
                .filter(|f| !f.inherited)
                .filter_map(|f| Some((f.nested.clone()?, f.field.shape.as_deref()?)))
                .collect();
            self.plans.push(ShapePlan::Object(ObjectPlan {
                name: variant_name,
                typename: Some(typename),
                parent: Some(name.clone()),
                fields,
            }));
            self.children(own);
        }
    }
}

fn nested_of<'s>(fields: &[FieldPlan<'s>]) -> Vec<(String, &'s ResultShape)> {
    fields
        .iter()
        .filter_map(|f| Some((f.nested.clone()?, f.field.shape.as_deref()?)))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use gqlbind_semantic::{analyze, SourceDocument};

    #[test]
    fn test_plan_names_nested_and_variant_types() {
        let analysis = analyze(&[SourceDocument::new(
            0,
            "a.graphql",
            r#"
            type Query { search(term: String!): [SearchResult!]! }
            union SearchResult = User | Post
            type User { id: ID! friend: User }
            type Post { id: ID! author: User! }
            query Search {
              search(term: "a") {
                ... on User { id friend { id } }
                ... on Post { id author { id } }
              }
            }
            "#,
        )]);
        assert!(analysis.is_ok(), "{:?}", analysis.diagnostics);

        let operation = &analysis.operations[0];
        let plans = plan(&operation.name, &operation.result_shape, &mut Names::default());
        let names: Vec<_> = plans.iter().map(ShapePlan::name).collect();
        assert_eq!(
            names,
            vec![
                "SearchResult",
                "SearchSearch",
                "SearchSearchPost",
                "SearchSearchPostAuthor",
                "SearchSearchUser",
                "SearchSearchUserFriend",
            ]
        );

        let ShapePlan::Union(union) = &plans[1] else {
            panic!("expected a union plan");
        };
        assert_eq!(union.variants[0], ("Post", "SearchSearchPost".to_string()));

        let ShapePlan::Object(post) = &plans[2] else {
            panic!("expected an object plan");
        };
        assert_eq!(post.typename, Some("Post"));
        assert!(post.fields.iter().any(|f| f.inherited && f.is_discriminator()));
    }

    fn plan_names(source: &str) -> Vec<String> {
        let analysis = analyze(&[SourceDocument::new(0, "a.graphql", source)]);
        assert!(analysis.is_ok(), "{:?}", analysis.diagnostics);
        let operation = &analysis.operations[0];
        plan(&operation.name, &operation.result_shape, &mut Names::default())
            .iter()
            .map(|p| p.name().to_string())
            .collect()
    }

    #[test]
    fn test_field_named_result_does_not_take_root_name() {
        let names = plan_names(
            "type Query { result: Payload } type Payload { ok: Boolean! }
             query Save { result { ok } }",
        );
        assert_eq!(names, vec!["SaveResult", "SaveResult2"]);
    }

    #[test]
    fn test_nested_and_flat_keys_get_distinct_names() {
        let names = plan_names(
            "type Query { user: User userFriends: [User!]! } type User { id: ID! friends: [User!]! }
             query GetUser { user { friends { id } } userFriends { id } }",
        );
        assert_eq!(
            names,
            vec!["GetUserResult", "GetUserUser", "GetUserUserFriends2", "GetUserUserFriends"]
        );
    }

    #[test]
    fn test_variant_and_common_field_get_distinct_names() {
        let names = plan_names(
            r#"type Query { node(id: ID!): Node }
               interface Node { id: ID! owner: User }
               type User implements Node { id: ID! owner: User }
               type Post implements Node { id: ID! owner: User title: String! }
               query Find { node(id: "1") { post: owner { id } ... on Post { title } } }"#,
        );
        assert_eq!(
            names,
            vec!["FindResult", "FindNode", "FindNodePost", "FindNodePost2", "FindNodeUser"]
        );
    }

    #[test]
    fn test_claim_skips_reserved_names() {
        let mut names = Names::default();
        assert!(names.reserve("User"));
        assert!(!names.reserve("User"));
        assert_eq!(names.claim("User".to_string()), "User2");
        assert_eq!(names.claim("User".to_string()), "User3");
        assert_eq!(names.claim("Post".to_string()), "Post");
    }
}
