//! Edge case tests for flashcpp-par, exercising the full `parse()` entry
//! point rather than a single production rule at a time.

#[cfg(test)]
mod tests {
    use flashcpp_util::{Handler, StringInterner};

    use crate::{Ast, DeclKind, Parser};

    fn parse_source(source: &str) -> (Ast, bool) {
        let mut handler = Handler::new();
        let mut interner = StringInterner::new();
        let parser = Parser::new(source, &mut handler, &mut interner);
        let ast = parser.parse();
        (ast, handler.has_errors())
    }

    #[test]
    fn empty_source_produces_no_declarations() {
        let (ast, errors) = parse_source("");
        assert!(ast.top_level.is_empty());
        assert!(!errors);
    }

    #[test]
    fn whitespace_and_comments_only() {
        let (ast, errors) = parse_source("   \n\t // a comment\n /* block */ \n");
        assert!(ast.top_level.is_empty());
        assert!(!errors);
    }

    #[test]
    fn single_function_declaration() {
        let (ast, errors) = parse_source("int main() { }");
        assert_eq!(ast.top_level.len(), 1);
        assert!(!errors);
    }

    #[test]
    fn deeply_nested_blocks() {
        let (ast, errors) = parse_source("void f() { { { { { int x = 1; } } } } }");
        assert_eq!(ast.top_level.len(), 1);
        assert!(!errors);
    }

    #[test]
    fn multiple_statements_in_one_body() {
        let (_ast, errors) = parse_source("void f() { int a = 1; int b = 2; int c = 3; }");
        assert!(!errors);
    }

    #[test]
    fn if_without_else() {
        let (_ast, errors) = parse_source("void f() { if (true) { int x = 1; } }");
        assert!(!errors);
    }

    #[test]
    fn nested_if_else() {
        let (_ast, errors) = parse_source("void f() { if (true) { if (false) { a(); } else { b(); } } else { c(); } }");
        assert!(!errors);
    }

    #[test]
    fn while_and_do_while_loops() {
        let (_ast, errors) = parse_source("void f() { while (true) { g(); } do { h(); } while (false); }");
        assert!(!errors);
    }

    #[test]
    fn for_and_range_for_loops() {
        let (_ast, errors) = parse_source("void f() { for (int i = 0; i < 10; i = i + 1) { g(i); } for (int x : xs) { h(x); } }");
        assert!(!errors);
    }

    #[test]
    fn break_and_continue() {
        let (_ast, errors) = parse_source("void f() { while (true) { break; } while (true) { continue; } }");
        assert!(!errors);
    }

    #[test]
    fn return_with_and_without_value() {
        let (_ast, errors) = parse_source("int f() { return 42; } void g() { return; }");
        assert!(!errors);
    }

    #[test]
    fn binary_and_comparison_expressions() {
        let (_ast, errors) = parse_source("void f() { int x = 1 + 2 * 3 - 4 / 2; bool y = x == 2; bool z = x != 2 && x < 2; }");
        assert!(!errors);
    }

    #[test]
    fn unary_operators() {
        let (_ast, errors) = parse_source("void f() { int x = -5; bool y = !true; int* p = &x; int z = *p; }");
        assert!(!errors);
    }

    #[test]
    fn struct_with_fields_and_method() {
        let (ast, errors) = parse_source("struct Point { int x; int y; int sum() { return x + y; } };");
        assert_eq!(ast.top_level.len(), 1);
        assert!(!errors);
    }

    #[test]
    fn empty_struct() {
        let (ast, errors) = parse_source("struct Empty { };");
        assert_eq!(ast.top_level.len(), 1);
        assert!(!errors);
    }

    #[test]
    fn scoped_enum_with_underlying_type() {
        let (ast, errors) = parse_source("enum class Color : int { Red, Green, Blue };");
        assert_eq!(ast.top_level.len(), 1);
        assert!(!errors);
    }

    #[test]
    fn plain_enum_with_explicit_values() {
        let (ast, errors) = parse_source("enum Flags { A = 1, B = 2, C = 4 };");
        assert_eq!(ast.top_level.len(), 1);
        assert!(!errors);
    }

    #[test]
    fn function_calls_nested() {
        let (_ast, errors) = parse_source("void f() { foo(); bar(1, 2); baz(quux(1)); }");
        assert!(!errors);
    }

    #[test]
    fn all_literal_kinds() {
        let source = "void f() { int a = 42; double b = 3.14; const char* c = \"hello\"; bool d = true; char e = 'x'; void* n = nullptr; }";
        let (_ast, errors) = parse_source(source);
        assert!(!errors);
    }

    #[test]
    fn class_template_with_member_function() {
        let (ast, errors) = parse_source("template <typename T> class Box { public: T get() { return value; } private: T value; };");
        assert_eq!(ast.top_level.len(), 1);
        assert!(!errors);
    }

    #[test]
    fn namespace_with_using_directive() {
        let (ast, errors) = parse_source("namespace a { namespace b { int x; } } using namespace a::b;");
        assert_eq!(ast.top_level.len(), 2);
        assert!(!errors);
    }

    #[test]
    fn derived_class_with_virtual_override() {
        let source = "struct Base { virtual void f(); }; struct Derived : public Base { void f() override { } };";
        let (ast, errors) = parse_source(source);
        assert_eq!(ast.top_level.len(), 2);
        assert!(!errors);
    }

    #[test]
    fn missing_semicolon_reports_error_but_keeps_parsing() {
        let (ast, errors) = parse_source("int x = 1 int y = 2;");
        assert!(errors);
        assert_eq!(ast.top_level.len(), 1, "resync should still recover the second declaration");
    }

    #[test]
    fn missing_closing_brace_reports_error() {
        let (_ast, errors) = parse_source("void f() { int x = 1;");
        assert!(errors);
    }

    #[test]
    fn missing_opening_brace_reports_error() {
        let (_ast, errors) = parse_source("void f() int x = 1; }");
        assert!(errors);
    }

    #[test]
    fn incomplete_if_reports_error() {
        let (_ast, errors) = parse_source("void f() { if (true) }");
        assert!(errors);
    }

    #[test]
    fn incomplete_struct_reports_error() {
        let (_ast, errors) = parse_source("struct Point { int x;");
        assert!(errors);
    }

    #[test]
    fn unbalanced_parens_report_error() {
        let (_ast, errors) = parse_source("void f() { foo((1, 2); }");
        assert!(errors);
    }

    #[test]
    fn unterminated_string_reports_error() {
        let (_ast, errors) = parse_source("void f() { const char* x = \"unterminated; }");
        assert!(errors);
    }

    #[test]
    fn multiple_malformed_declarations_each_recover() {
        let source = "int a = ; struct { int; }; int b = 1;";
        let (ast, errors) = parse_source(source);
        assert!(errors);
        assert!(ast.top_level.len() >= 1);
    }

    #[test]
    fn trailing_comma_in_enum_is_accepted() {
        let (ast, errors) = parse_source("enum Color { Red, Green, Blue, };");
        assert_eq!(ast.top_level.len(), 1);
        assert!(!errors);
    }

    #[test]
    fn complex_parenthesized_expression() {
        let (_ast, errors) = parse_source("void f() { int x = (1 + 2) * (3 - 4) / (5 % 6); }");
        assert!(!errors);
    }

    #[test]
    fn static_assert_at_namespace_scope() {
        let (ast, errors) = parse_source("namespace n { static_assert(sizeof(int) == 4, \"bad size\"); }");
        assert_eq!(ast.top_level.len(), 1);
        assert!(!errors);
        match &ast.decls[ast.top_level[0]].kind {
            DeclKind::Namespace(n) => assert_eq!(n.members.len(), 1),
            _ => panic!("expected a namespace"),
        }
    }
}
