//! Dependency inference for render functions
//!
//! Walks the body of a render function and collects the top-level state
//! fields it reads through its state parameter. Recognized reads:
//!
//! - `state.field`, `state["field"]`, `state.get("field")` (also through `&`,
//!   `*` and parentheses)
//! - struct patterns over the state: `let S { a, b: x, .. } = state;`,
//!   `if let`, `match` arms, and patterns in the parameter itself
//! - arguments of function-like macros such as `format!`
//! - plain rebinding, `let s = &state;`, after which `s` counts as the state
//!
//! Anything else (passing the state to another function, computed keys,
//! serde renames) is invisible. The result is best effort.

use std::collections::{BTreeSet, HashSet};

use syn::ext::IdentExt;
use syn::punctuated::Punctuated;
use syn::visit::{self, Visit};
use syn::{Expr, FnArg, ItemFn, Lit, Member, Pat, Token};

/// Collects field reads rooted at the state parameter
#[derive(Debug, Default)]
struct FieldReads {
    roots: HashSet<String>,
    fields: BTreeSet<String>,
}

impl FieldReads {
    fn is_root(&self, expr: &Expr) -> bool {
        match expr {
            Expr::Reference(r) => self.is_root(&r.expr),
            Expr::Unary(u) if matches!(u.op, syn::UnOp::Deref(_)) => self.is_root(&u.expr),
            Expr::Paren(p) => self.is_root(&p.expr),
            Expr::Group(g) => self.is_root(&g.expr),
            Expr::Path(p) if p.qself.is_none() => p
                .path
                .get_ident()
                .is_some_and(|ident| self.roots.contains(&ident.unraw().to_string())),
            _ => false,
        }
    }

    /// Record the fields a pattern binds out of the state
    fn bind_pattern(&mut self, pat: &Pat) {
        match pat {
            Pat::Struct(s) => {
                for field in &s.fields {
                    if let Member::Named(ident) = &field.member {
                        self.fields.insert(ident.unraw().to_string());
                    }
                }
            }
            Pat::Ident(p) => match &p.subpat {
                Some((_, sub)) => {
                    self.roots.insert(p.ident.unraw().to_string());
                    self.bind_pattern(sub);
                }
                None => {
                    self.roots.insert(p.ident.unraw().to_string());
                }
            },
            Pat::Reference(r) => self.bind_pattern(&r.pat),
            Pat::Paren(p) => self.bind_pattern(&p.pat),
            Pat::Type(t) => self.bind_pattern(&t.pat),
            Pat::Or(or) => {
                for case in &or.cases {
                    self.bind_pattern(case);
                }
            }
            _ => {}
        }
    }
}

fn string_literal(expr: &Expr) -> Option<String> {
    match expr {
        Expr::Lit(lit) => match &lit.lit {
            Lit::Str(s) => Some(s.value()),
            _ => None,
        },
        Expr::Reference(r) => string_literal(&r.expr),
        Expr::Paren(p) => string_literal(&p.expr),
        _ => None,
    }
}

impl<'ast> Visit<'ast> for FieldReads {
    // format!-style macros: walk arguments that parse as expressions
    fn visit_macro(&mut self, node: &'ast syn::Macro) {
        if let Ok(args) = node.parse_body_with(Punctuated::<Expr, Token![,]>::parse_terminated) {
            for arg in &args {
                <Self as Visit<'_>>::visit_expr(self, arg);
            }
        }
        visit::visit_macro(self, node);
    }

    fn visit_expr_field(&mut self, node: &'ast syn::ExprField) {
        if self.is_root(&node.base) {
            if let Member::Named(ident) = &node.member {
                self.fields.insert(ident.unraw().to_string());
            }
        }
        visit::visit_expr_field(self, node);
    }

    fn visit_expr_index(&mut self, node: &'ast syn::ExprIndex) {
        if self.is_root(&node.expr) {
            if let Some(key) = string_literal(&node.index) {
                self.fields.insert(key);
            }
        }
        visit::visit_expr_index(self, node);
    }

    fn visit_expr_method_call(&mut self, node: &'ast syn::ExprMethodCall) {
        if node.method == "get" && node.args.len() == 1 && self.is_root(&node.receiver) {
            if let Some(key) = node.args.first().and_then(string_literal) {
                self.fields.insert(key);
            }
        }
        visit::visit_expr_method_call(self, node);
    }

    fn visit_local(&mut self, node: &'ast syn::Local) {
        if let Some(init) = &node.init {
            if self.is_root(&init.expr) {
                self.bind_pattern(&node.pat);
            }
        }
        visit::visit_local(self, node);
    }

    fn visit_expr_let(&mut self, node: &'ast syn::ExprLet) {
        if self.is_root(&node.expr) {
            self.bind_pattern(&node.pat);
        }
        visit::visit_expr_let(self, node);
    }

    fn visit_expr_match(&mut self, node: &'ast syn::ExprMatch) {
        if self.is_root(&node.expr) {
            for arm in &node.arms {
                self.bind_pattern(&arm.pat);
            }
        }
        visit::visit_expr_match(self, node);
    }
}

/// Fields of the state read by `func`
///
/// `func` must take exactly one parameter, the state.
pub(crate) fn infer(func: &ItemFn) -> syn::Result<BTreeSet<String>> {
    let mut reads = FieldReads::default();
    match state_param(func)? {
        Pat::Wild(_) => {}
        pat => reads.bind_pattern(pat),
    }
    reads.visit_block(&func.block);
    Ok(reads.fields)
}

fn state_param(func: &ItemFn) -> syn::Result<&Pat> {
    let mut inputs = func.sig.inputs.iter();
    match (inputs.next(), inputs.next()) {
        (Some(FnArg::Typed(param)), None) => Ok(param.pat.as_ref()),
        (Some(FnArg::Receiver(receiver)), _) => Err(syn::Error::new_spanned(
            receiver,
            "component render functions cannot take self",
        )),
        _ => Err(syn::Error::new_spanned(
            &func.sig.inputs,
            "component render functions take exactly one parameter: the state",
        )),
    }
}
