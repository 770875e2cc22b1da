
mod collapse_literals_tests;
mod deindex_tests;
mod inline_tests;
mod scope_stack_tests;
mod static_resolver_tests;
mod unroll_tests;
