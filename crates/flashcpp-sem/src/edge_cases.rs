//! Edge case tests for flashcpp-sem, exercising the full analyzer entry
//! point over small translation units rather than one table method at a
//! time.

#[cfg(test)]
mod tests {
    use flashcpp_par::{BuiltinKind, Parser};
    use flashcpp_util::{Handler, StringInterner};

    use crate::analyze;

    fn analyze_source(source: &str) -> (flashcpp_par::Ast, crate::TypeTable, bool) {
        let mut interner = StringInterner::new();
        let mut handler = Handler::new();
        let mut ast = {
            let parser = Parser::new(source, &mut handler, &mut interner);
            parser.parse()
        };
        let (table, _env) = analyze(&mut ast, &interner, &handler);
        let had_errors = handler.has_errors();
        (ast, table, had_errors)
    }

    #[test]
    fn empty_translation_unit_analyzes_cleanly() {
        let (_ast, _table, errors) = analyze_source("");
        assert!(!errors);
    }

    #[test]
    fn nested_struct_members_are_laid_out() {
        let (ast, table, errors) = analyze_source(
            "struct Inner { int a; }; struct Outer { Inner i; char c; };",
        );
        assert!(!errors);
        let outer_decl = ast.top_level[1];
        let info = table.struct_info(outer_decl).unwrap();
        assert!(info.is_frozen());
        assert_eq!(info.members.len(), 2);
    }

    #[test]
    fn base_class_members_are_reachable() {
        let (ast, table, errors) = analyze_source(
            "struct Base { int x; }; struct Derived : Base { int y; };",
        );
        assert!(!errors);
        let derived_decl = ast.top_level[1];
        let info = table.struct_info(derived_decl).unwrap();
        assert_eq!(info.bases.len(), 1);
        // `Base`'s 4-byte `int` comes first, `Derived::y` is laid out after it.
        assert_eq!(info.size, 8);
    }

    #[test]
    fn virtual_function_marks_class_polymorphic() {
        let (ast, table, errors) = analyze_source("struct Shape { virtual int area(); };");
        assert!(!errors);
        let decl = ast.top_level[0];
        assert!(table.struct_info(decl).unwrap().is_polymorphic);
    }

    #[test]
    fn user_destructor_is_recorded() {
        let (ast, table, errors) = analyze_source("struct Resource { ~Resource(); };");
        assert!(!errors);
        let decl = ast.top_level[0];
        assert!(table.struct_info(decl).unwrap().has_user_destructor);
    }

    #[test]
    fn member_function_sees_a_sibling_declared_later() {
        // `first` refers to `second`, which is declared after it; the
        // two-pass class analysis must have bound `second`'s name before
        // `first`'s body is walked.
        let (_ast, _table, errors) = analyze_source(
            "struct S { int first() { return second; } int second; };",
        );
        assert!(!errors);
    }

    #[test]
    fn auto_variable_deduces_arithmetic_type() {
        let (ast, table, errors) = analyze_source("auto total = 1 + 2 * 3;");
        assert!(!errors);
        let decl = ast.top_level[0];
        assert_eq!(table.type_of_decl(decl), Some(table.builtin(BuiltinKind::Int)));
    }

    #[test]
    fn auto_without_initializer_is_an_error() {
        let (_ast, _table, errors) = analyze_source("auto x;");
        assert!(errors);
    }

    #[test]
    fn enum_without_explicit_values_is_sequential() {
        let (ast, table, errors) = analyze_source("enum Color { Red, Green, Blue };");
        assert!(!errors);
        let decl = ast.top_level[0];
        assert!(table.type_of_decl(decl).is_some());
    }

    #[test]
    fn scoped_enum_underlying_type_is_resolved() {
        let (ast, table, errors) = analyze_source("enum class Flag : char { On, Off };");
        assert!(!errors);
        let decl = ast.top_level[0];
        assert_eq!(table.enum_underlying(decl), Some(table.builtin(BuiltinKind::Char)));
    }

    #[test]
    fn passing_static_assert_reports_nothing() {
        let (_ast, _table, errors) = analyze_source("static_assert(1 + 1 == 2, \"math still works\");");
        assert!(!errors);
    }

    #[test]
    fn failing_static_assert_is_reported() {
        let (_ast, _table, errors) = analyze_source("static_assert(1 == 2, \"never\");");
        assert!(errors);
    }

    #[test]
    fn constexpr_variable_with_non_constant_initializer_is_reported() {
        let (_ast, _table, errors) = analyze_source("int f(); constexpr int x = f();");
        assert!(errors);
    }

    #[test]
    fn function_parameters_are_visible_in_the_body() {
        let (_ast, _table, errors) = analyze_source("int add(int a, int b) { return a + b; }");
        assert!(!errors);
    }

    #[test]
    fn deeply_nested_blocks_still_resolve_parameters() {
        let (_ast, _table, errors) = analyze_source(
            "int f(int n) { { { { { return n; } } } } }",
        );
        assert!(!errors);
    }

    #[test]
    fn catch_parameter_is_visible_in_its_handler() {
        let (_ast, _table, errors) = analyze_source(
            "void f() { try { g(); } catch (int e) { h(e); } }",
        );
        assert!(!errors);
    }

    #[test]
    fn namespace_members_are_processed_in_source_order() {
        let (_ast, _table, errors) = analyze_source(
            "namespace n { int a = 1; int b = a + 1; }",
        );
        assert!(!errors);
    }

    #[test]
    fn range_for_loop_variable_is_declared() {
        let (_ast, _table, errors) = analyze_source(
            "void f(int xs) { for (int x : xs) { g(x); } }",
        );
        assert!(!errors);
    }
}
