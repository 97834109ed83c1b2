//! Generator detection.
//!
//! A function is a generator when its own body contains a `yield`
//! expression.  Closures, arrow functions, and class-likes declared inside
//! the body have their own bodies and are not entered.

use mago_syntax::ast::{
    AnonymousClass, ArrowFunction, Block, Class, Closure, Enum, Function, Interface, Trait, Yield,
};
use mago_syntax::walker::Walker;

struct YieldFinder;

impl<'ast, 'arena> Walker<'ast, 'arena, bool> for YieldFinder {
    fn walk_in_yield(&self, _yield: &'ast Yield<'arena>, found: &mut bool) {
        *found = true;
    }

    fn walk_closure(&self, _closure: &'ast Closure<'arena>, _found: &mut bool) {}

    fn walk_arrow_function(&self, _arrow: &'ast ArrowFunction<'arena>, _found: &mut bool) {}

    fn walk_anonymous_class(&self, _class: &'ast AnonymousClass<'arena>, _found: &mut bool) {}

    fn walk_function(&self, _function: &'ast Function<'arena>, _found: &mut bool) {}

    fn walk_class(&self, _class: &'ast Class<'arena>, _found: &mut bool) {}

    fn walk_interface(&self, _interface: &'ast Interface<'arena>, _found: &mut bool) {}

    fn walk_trait(&self, _trait: &'ast Trait<'arena>, _found: &mut bool) {}

    fn walk_enum(&self, _enum: &'ast Enum<'arena>, _found: &mut bool) {}
}

/// Whether `body` yields, not counting nested function bodies.
pub(crate) fn body_yields<'ast, 'arena>(body: &'ast Block<'arena>) -> bool {
    let mut found = false;
    YieldFinder.walk_block(body, &mut found);
    found
}
