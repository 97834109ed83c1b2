/// Class, interface, trait, and enum lowering.
///
/// Each class-like declaration is tagged with a [`ClassLikeKind`] and its
/// members (methods, properties, constants, enum cases, trait uses and
/// their `insteadof` / `as` adaptations) are copied into a
/// [`ClassLikeNode`].  Names stay exactly as written; resolution against
/// the namespace context happens in the reflection layer.
use mago_syntax::ast::class_like::trait_use::{
    TraitUseAdaptation, TraitUseMethodReference, TraitUseSpecification,
};
use mago_syntax::ast::*;

use crate::types::*;

use super::Lowering;
use super::generators::body_yields;

/// Members collected from a class-like body.
#[derive(Default)]
struct Members {
    methods: Vec<FunctionLikeNode>,
    properties: Vec<PropertyNode>,
    constants: Vec<ClassConstantNode>,
    traits: Vec<String>,
    trait_precedences: Vec<TraitPrecedence>,
    trait_aliases: Vec<TraitAlias>,
}

fn identifier_list<'s>(types: impl Iterator<Item = &'s Identifier<'s>>) -> Vec<String> {
    types.map(|ident| ident.value().to_string()).collect()
}

impl<'a> Lowering<'a> {
    /// Lower a class-like statement.  Returns `None` for any other
    /// statement kind.
    pub(crate) fn lower_class_like<'s>(&self, statement: &'s Statement<'s>) -> Option<ClassLikeNode> {
        let node = match statement {
            Statement::Class(class) => {
                let members = self.lower_members(class.members.iter());
                ClassLikeNode {
                    kind: ClassLikeKind::Class,
                    name: class.name.value.to_string(),
                    is_abstract: class.modifiers.contains_abstract(),
                    is_final: class.modifiers.contains_final(),
                    is_readonly: class
                        .modifiers
                        .iter()
                        .any(|m| matches!(m, Modifier::Readonly(_))),
                    parent: class
                        .extends
                        .as_ref()
                        .and_then(|ext| ext.types.first().map(|ident| ident.value().to_string())),
                    interfaces: class
                        .implements
                        .as_ref()
                        .map(|imp| identifier_list(imp.types.iter()))
                        .unwrap_or_default(),
                    enum_backing: None,
                    doc_comment: self.doc_comment_for(class),
                    lines: self.line_span(class),
                    ..Self::with_members(members)
                }
            }
            Statement::Interface(iface) => {
                let members = self.lower_members(iface.members.iter());
                ClassLikeNode {
                    kind: ClassLikeKind::Interface,
                    name: iface.name.value.to_string(),
                    // Interfaces list their parents with `extends`; all of
                    // them are reported as interfaces.
                    interfaces: iface
                        .extends
                        .as_ref()
                        .map(|ext| identifier_list(ext.types.iter()))
                        .unwrap_or_default(),
                    doc_comment: self.doc_comment_for(iface),
                    lines: self.line_span(iface),
                    ..Self::with_members(members)
                }
            }
            Statement::Trait(trait_def) => {
                let members = self.lower_members(trait_def.members.iter());
                ClassLikeNode {
                    kind: ClassLikeKind::Trait,
                    name: trait_def.name.value.to_string(),
                    doc_comment: self.doc_comment_for(trait_def),
                    lines: self.line_span(trait_def),
                    ..Self::with_members(members)
                }
            }
            Statement::Enum(enum_def) => {
                let members = self.lower_members(enum_def.members.iter());
                ClassLikeNode {
                    kind: ClassLikeKind::Enum,
                    name: enum_def.name.value.to_string(),
                    // Enums are implicitly final and cannot be extended.
                    is_final: true,
                    interfaces: enum_def
                        .implements
                        .as_ref()
                        .map(|imp| identifier_list(imp.types.iter()))
                        .unwrap_or_default(),
                    enum_backing: enum_def
                        .backing_type_hint
                        .as_ref()
                        .map(|backing| Self::lower_hint(&backing.hint)),
                    doc_comment: self.doc_comment_for(enum_def),
                    lines: self.line_span(enum_def),
                    ..Self::with_members(members)
                }
            }
            _ => return None,
        };
        Some(node)
    }

    /// A blank class-like node carrying only the collected members; the
    /// caller fills in the declaration-level fields.
    fn with_members(members: Members) -> ClassLikeNode {
        ClassLikeNode {
            kind: ClassLikeKind::Class,
            name: String::new(),
            is_abstract: false,
            is_final: false,
            is_readonly: false,
            parent: None,
            interfaces: Vec::new(),
            traits: members.traits,
            trait_precedences: members.trait_precedences,
            trait_aliases: members.trait_aliases,
            methods: members.methods,
            properties: members.properties,
            constants: members.constants,
            enum_backing: None,
            doc_comment: None,
            lines: LineSpan::default(),
        }
    }

    fn lower_members<'s>(
        &self,
        members: impl Iterator<Item = &'s ClassLikeMember<'s>>,
    ) -> Members {
        let mut out = Members::default();

        for member in members {
            match member {
                ClassLikeMember::Method(method) => {
                    let (has_body, is_generator, static_variables) = match &method.body {
                        MethodBody::Concrete(block) => (
                            true,
                            body_yields(block),
                            self.lower_static_variables(block.statements.iter()),
                        ),
                        MethodBody::Abstract(_) => (false, false, Vec::new()),
                    };

                    let parameters = self.lower_parameters(&method.parameter_list);

                    // Promoted constructor parameters are also properties.
                    if method.name.value.eq_ignore_ascii_case("__construct") {
                        for param in parameters.iter() {
                            let Some(visibility) = param.promoted else {
                                continue;
                            };
                            out.properties.push(PropertyNode {
                                name: param.name.clone(),
                                type_hint: param.type_hint.clone(),
                                default: None,
                                default_source: None,
                                modifiers: MemberModifiers {
                                    visibility,
                                    is_readonly: param.is_readonly,
                                    ..MemberModifiers::default()
                                },
                                is_promoted: true,
                                doc_comment: None,
                                lines: param.lines,
                            });
                        }
                    }

                    out.methods.push(FunctionLikeNode {
                        name: method.name.value.to_string(),
                        parameters,
                        return_type: method
                            .return_type_hint
                            .as_ref()
                            .map(|rth| Self::lower_hint(&rth.hint)),
                        returns_reference: method.ampersand.is_some(),
                        modifiers: Self::extract_modifiers(method.modifiers.iter()),
                        has_body,
                        is_generator,
                        static_variables,
                        doc_comment: self.doc_comment_for(method),
                        lines: self.line_span(method),
                    });
                }
                ClassLikeMember::Property(property) => {
                    let modifiers = Self::extract_modifiers(property.modifiers().iter());
                    let type_hint = property.hint().map(|h| Self::lower_hint(h));
                    let doc_comment = self.doc_comment_for(member);
                    let lines = self.line_span(member);

                    let items: Vec<&PropertyItem> = match property {
                        Property::Plain(plain) => plain.items.iter().collect(),
                        Property::Hooked(hooked) => vec![&hooked.item],
                    };

                    for item in items {
                        let (raw_name, value) = match item {
                            PropertyItem::Abstract(abs) => (abs.variable.name, None),
                            PropertyItem::Concrete(concrete) => {
                                (concrete.variable.name, Some(concrete.value))
                            }
                        };
                        out.properties.push(PropertyNode {
                            name: raw_name.strip_prefix('$').unwrap_or(raw_name).to_string(),
                            type_hint: type_hint.clone(),
                            default: value.map(|v| self.lower_expression(v)),
                            default_source: value.map(|v| self.source_of(v).trim().to_string()),
                            modifiers,
                            is_promoted: false,
                            doc_comment: doc_comment.clone(),
                            lines,
                        });
                    }
                }
                ClassLikeMember::Constant(constant) => {
                    let visibility = Self::extract_visibility(constant.modifiers.iter());
                    let is_final = constant
                        .modifiers
                        .iter()
                        .any(|m| matches!(m, Modifier::Final(_)));
                    let doc_comment = self.doc_comment_for(member);
                    let lines = self.line_span(member);
                    for item in constant.items.iter() {
                        out.constants.push(ClassConstantNode {
                            name: item.name.value.to_string(),
                            value: Some(self.lower_expression(item.value)),
                            visibility,
                            is_final,
                            is_enum_case: false,
                            doc_comment: doc_comment.clone(),
                            lines,
                        });
                    }
                }
                ClassLikeMember::EnumCase(enum_case) => {
                    let value = match &enum_case.item {
                        EnumCaseItem::Backed(backed) => Some(self.lower_expression(backed.value)),
                        EnumCaseItem::Unit(_) => None,
                    };
                    out.constants.push(ClassConstantNode {
                        name: enum_case.item.name().value.to_string(),
                        value,
                        visibility: Visibility::Public,
                        is_final: true,
                        is_enum_case: true,
                        doc_comment: self.doc_comment_for(member),
                        lines: self.line_span(member),
                    });
                }
                ClassLikeMember::TraitUse(trait_use) => {
                    out.traits
                        .extend(identifier_list(trait_use.trait_names.iter()));

                    if let TraitUseSpecification::Concrete(spec) = &trait_use.specification {
                        for adaptation in spec.adaptations.iter() {
                            match adaptation {
                                TraitUseAdaptation::Precedence(prec) => {
                                    out.trait_precedences.push(TraitPrecedence {
                                        trait_name: prec
                                            .method_reference
                                            .trait_name
                                            .value()
                                            .to_string(),
                                        method_name: prec
                                            .method_reference
                                            .method_name
                                            .value
                                            .to_string(),
                                        insteadof: identifier_list(prec.trait_names.iter()),
                                    });
                                }
                                TraitUseAdaptation::Alias(alias_adapt) => {
                                    let (trait_name, method_name) =
                                        match &alias_adapt.method_reference {
                                            TraitUseMethodReference::Identifier(ident) => {
                                                (None, ident.value.to_string())
                                            }
                                            TraitUseMethodReference::Absolute(abs) => (
                                                Some(abs.trait_name.value().to_string()),
                                                abs.method_name.value.to_string(),
                                            ),
                                        };
                                    let visibility = alias_adapt
                                        .visibility
                                        .as_ref()
                                        .map(|m| Self::extract_visibility(std::iter::once(m)));
                                    out.trait_aliases.push(TraitAlias {
                                        trait_name,
                                        method_name,
                                        alias: alias_adapt
                                            .alias
                                            .as_ref()
                                            .map(|a| a.value.to_string()),
                                        visibility,
                                    });
                                }
                            }
                        }
                    }
                }
            }
        }

        out
    }
}
