//! Tree-walking evaluator for pscript.
//!
//! The evaluator is direct recursive descent over the AST facade:
//! - [`Context`] owns the memory pool and the context-scoped tables
//!   (globals, functions, structs, import cache).
//! - `exec` dispatches statements and control flow; non-local return is
//!   an explicit outcome type rather than a shared return slot.
//! - Expression evaluation resolves lvalues to places and dispatches
//!   operators on the operand tag pair with numeric widening.

mod call;
mod context;
mod exec;
mod expr;
mod methods;
mod operators;
mod scope;

pub use context::Context;

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::ErrorKind;
    use crate::runtime::ExecutionContext;
    use crate::script::Script;
    use crate::value::{Type, Value};

    fn run(source: &str) -> (Context, String) {
        let mut ctx = Context::new(1024 * 1024);
        let (mut runtime, out, _err) = ExecutionContext::captured();
        let script = Script::parse(source).expect("parse failed");
        ctx.try_execute(&script, &mut runtime).expect("execution failed");
        (ctx, out.contents())
    }

    fn run_err(source: &str) -> crate::errors::Error {
        let mut ctx = Context::new(1024 * 1024);
        let (mut runtime, _out, _err) = ExecutionContext::captured();
        let script = Script::parse(source).expect("parse failed");
        ctx.try_execute(&script, &mut runtime)
            .expect_err("expected execution error")
    }

    fn global_int(ctx: &Context, name: &str) -> i32 {
        ctx.global(name)
            .unwrap_or_else(|| panic!("global {name} missing"))
            .as_int()
            .expect("global is not an int")
    }

    #[test]
    fn test_declaration_binds_global() {
        let (ctx, _) = run("let x = 41 + 1;");
        assert_eq!(global_int(&ctx, "x"), 42);
    }

    #[test]
    fn test_shadowing_declaration_changes_type() {
        let (ctx, _) = run("let x = 5; let x = 2.5;");
        let x = ctx.global("x").unwrap();
        assert_eq!(x.type_of(), Type::Real);
    }

    #[test]
    fn test_assignment_and_compound_assignment() {
        let (ctx, _) = run("let x = 1; x = 4; x += 2; x *= 3;");
        assert_eq!(global_int(&ctx, "x"), 18);
    }

    #[test]
    fn test_assignment_coerces_numeric_to_slot_tag() {
        let (ctx, _) = run("let x = 1; x = 2.9;");
        let x = ctx.global("x").unwrap();
        assert_eq!(x.type_of(), Type::Int);
        assert_eq!(x.as_int().unwrap(), 2);
    }

    #[test]
    fn test_struct_assignment_name_mismatch_fails() {
        let err = run_err(
            "struct A { x: int; };
             struct B { x: int; };
             let a = A { 1 };
             a = B { 2 };",
        );
        assert_eq!(err.kind, ErrorKind::Type);
    }

    #[test]
    fn test_if_else_branches() {
        let (ctx, _) = run("let x = 0; if (1 < 2) { x = 1; } else { x = 2; }");
        assert_eq!(global_int(&ctx, "x"), 1);
        let (ctx, _) = run("let x = 0; if (1 > 2) { x = 1; } else { x = 2; }");
        assert_eq!(global_int(&ctx, "x"), 2);
    }

    #[test]
    fn test_while_triangle_sum() {
        let (ctx, _) = run(
            "let sum = 0;
             let i = 1;
             while (i <= 5) {
                 sum += i;
                 i += 1;
             }",
        );
        assert_eq!(global_int(&ctx, "sum"), 15);
    }

    #[test]
    fn test_for_manual_loop() {
        let (ctx, _) = run(
            "let sum = 0;
             for (let i = 0; i < 4; i += 1) {
                 sum += i;
             }",
        );
        assert_eq!(global_int(&ctx, "sum"), 6);
    }

    #[test]
    fn test_for_each_over_list() {
        let (ctx, _) = run(
            "let sum = 0;
             for (let x : [1, 2, 3]) {
                 sum += x;
             }",
        );
        assert_eq!(global_int(&ctx, "sum"), 6);
    }

    #[test]
    fn test_block_scope_does_not_leak() {
        let err = run_err("if (true) { let inner = 1; } let y = inner;");
        assert_eq!(err.kind, ErrorKind::UndefinedVariable);
    }

    #[test]
    fn test_function_call_and_return() {
        let (ctx, _) = run(
            "fn add(a: int, b: int) -> int { return a + b; }
             let x = add(2, 3);",
        );
        assert_eq!(global_int(&ctx, "x"), 5);
    }

    #[test]
    fn test_function_early_return() {
        let (ctx, _) = run(
            "fn pick(flag: int) -> int {
                 if (flag == 1) {
                     return 10;
                 }
                 return 20;
             }
             let a = pick(1);
             let b = pick(0);",
        );
        assert_eq!(global_int(&ctx, "a"), 10);
        assert_eq!(global_int(&ctx, "b"), 20);
    }

    #[test]
    fn test_function_scope_cannot_see_caller_locals() {
        let err = run_err(
            "fn peek() -> int { return hidden; }
             fn caller() -> int {
                 let hidden = 7;
                 return peek();
             }
             let x = caller();",
        );
        assert_eq!(err.kind, ErrorKind::UndefinedVariable);
    }

    #[test]
    fn test_function_sees_globals() {
        let (ctx, _) = run(
            "let base = 100;
             fn bump(n: int) -> int { return base + n; }
             let x = bump(1);",
        );
        assert_eq!(global_int(&ctx, "x"), 101);
    }

    #[test]
    fn test_arity_check() {
        let err = run_err("fn f(a: int) -> int { return a; } let x = f(1, 2);");
        assert_eq!(err.kind, ErrorKind::Arity);
        let err = run_err("fn f(a: int) -> int { return a; } let x = f();");
        assert_eq!(err.kind, ErrorKind::Arity);
    }

    #[test]
    fn test_argument_numeric_coercion() {
        let (ctx, _) = run("fn f(a: float) -> float { return a; } let x = f(3);");
        let x = ctx.global("x").unwrap();
        assert_eq!(x.type_of(), Type::Real);
        assert_eq!(x.as_real().unwrap(), 3.0);
    }

    #[test]
    fn test_argument_type_mismatch() {
        let err = run_err(r#"fn f(a: int) -> int { return a; } let x = f("no");"#);
        assert_eq!(err.kind, ErrorKind::Type);
    }

    #[test]
    fn test_recursive_fibonacci() {
        let (ctx, _) = run(
            "fn fib(n: int) -> int {
                 if (n < 2) {
                     return n;
                 }
                 return fib(n - 1) + fib(n - 2);
             }
             let x = fib(11);",
        );
        assert_eq!(global_int(&ctx, "x"), 89);
    }

    #[test]
    fn test_reference_parameter_list_mutation() {
        let (ctx, _) = run(
            "fn poke(x: &list) -> int {
                 x[1] = 3;
                 return 0;
             }
             let l = [1, 2];
             poke(l);
             let second = l[1];",
        );
        assert_eq!(global_int(&ctx, "second"), 3);
    }

    #[test]
    fn test_list_copy_shares_identity() {
        let (ctx, _) = run(
            "let a = [1, 2];
             let b = a;
             b[0] = 9;
             let first = a[0];",
        );
        assert_eq!(global_int(&ctx, "first"), 9);
    }

    #[test]
    fn test_index_out_of_range() {
        let err = run_err("let l = [1]; let x = l[5];");
        assert_eq!(err.kind, ErrorKind::Index);
    }

    #[test]
    fn test_index_requires_list() {
        let err = run_err("let s = 5; let x = s[0];");
        assert_eq!(err.kind, ErrorKind::Type);
    }

    #[test]
    fn test_member_access_read_write() {
        let (ctx, _) = run(
            "struct Point { x: int; y: int = 7; };
             let p = Point { 1 };
             p->x = p->y + 1;
             let px = p->x;",
        );
        assert_eq!(global_int(&ctx, "px"), 8);
    }

    #[test]
    fn test_member_access_requires_struct() {
        let err = run_err("let x = 1; let y = x->field;");
        assert_eq!(err.kind, ErrorKind::Type);
    }

    #[test]
    fn test_unknown_member_errors() {
        let err = run_err(
            "struct P { x: int; };
             let p = P { 1 };
             let y = p->z;",
        );
        assert_eq!(err.kind, ErrorKind::Type);
    }

    #[test]
    fn test_struct_constructor_defaults_and_roundtrip() {
        let (ctx, _) = run(
            "struct V { a: int; b: int = 5; c: float = 1.5; };
             let v = V { 9 };
             let a = v->a;
             let b = v->b;",
        );
        assert_eq!(global_int(&ctx, "a"), 9);
        assert_eq!(global_int(&ctx, "b"), 5);
    }

    #[test]
    fn test_undefined_struct_constructor() {
        let err = run_err("let p = Ghost { 1 };");
        assert_eq!(err.kind, ErrorKind::UndefinedStruct);
    }

    #[test]
    fn test_builtin_cast_constructors() {
        let (ctx, _) = run("let x = int { 2.9 }; let u = uint { true };");
        assert_eq!(global_int(&ctx, "x"), 2);
        assert_eq!(ctx.global("u").unwrap().as_uint().unwrap(), 1);
    }

    #[test]
    fn test_cast_constructor_rejects_string() {
        let err = run_err(r#"let x = int { "5" };"#);
        assert_eq!(err.kind, ErrorKind::Type);
    }

    #[test]
    fn test_unary_operators() {
        let (ctx, _) = run("let a = -5; let b = !false; let c = 1; ++c; --c; ++c;");
        assert_eq!(global_int(&ctx, "a"), -5);
        assert!(ctx.global("b").unwrap().as_bool().unwrap());
        assert_eq!(global_int(&ctx, "c"), 2);
    }

    #[test]
    fn test_reference_alias_via_amp() {
        let (ctx, _) = run("let x = 1; let r = &x; r = 5; let y = x;");
        assert_eq!(global_int(&ctx, "y"), 5);
    }

    #[test]
    fn test_not_assignable() {
        let err = run_err("1 = 2;");
        assert_eq!(err.kind, ErrorKind::NotAssignable);
    }

    #[test]
    fn test_undefined_variable() {
        let err = run_err("let x = missing;");
        assert_eq!(err.kind, ErrorKind::UndefinedVariable);
    }

    #[test]
    fn test_undefined_function() {
        let err = run_err("let x = missing();");
        assert_eq!(err.kind, ErrorKind::UndefinedFunction);
    }

    #[test]
    fn test_namespace_definitions() {
        let (ctx, _) = run(
            "namespace math {
                 fn square(x: int) -> int { return x * x; }
             }
             let x = math.square(6);",
        );
        assert_eq!(global_int(&ctx, "x"), 36);
    }

    #[test]
    fn test_namespace_sibling_calls() {
        let (ctx, _) = run(
            "namespace util {
                 fn twice(x: int) -> int { return x * 2; }
                 fn quad(x: int) -> int { return twice(twice(x)); }
             }
             let x = util.quad(3);",
        );
        assert_eq!(global_int(&ctx, "x"), 12);
    }

    #[test]
    fn test_print_builtin() {
        let (_ctx, out) = run("__print(42); __print([1, 2, 3]);");
        assert_eq!(out, "42\n[1, 2, 3]\n");
    }

    #[test]
    fn test_print_arity() {
        let err = run_err("__print(1, 2);");
        assert_eq!(err.kind, ErrorKind::Arity);
    }

    #[test]
    fn test_readln_builtin() {
        let mut ctx = Context::new(1024 * 1024);
        let (mut runtime, out, _err) = ExecutionContext::captured();
        runtime.input = crate::runtime::InputSource::buffer("pengu\n");
        let script = Script::parse("__print(__readln());").expect("parse failed");
        ctx.try_execute(&script, &mut runtime).expect("execution failed");
        assert_eq!(out.contents(), "pengu\n");
    }

    #[test]
    fn test_time_builtin_returns_uint() {
        let (ctx, _) = run("let t = __time();");
        assert_eq!(ctx.global("t").unwrap().type_of(), Type::Uint);
    }

    #[test]
    fn test_ref_builtin() {
        let (ctx, _) = run("let x = 2; let r = __ref(x); r = 9; let y = x;");
        assert_eq!(global_int(&ctx, "y"), 9);
    }

    #[test]
    fn test_member_function_on_variable() {
        let (ctx, out) = run(
            "let l = [1, 2];
             l.append(3);
             __print(l.size());",
        );
        assert_eq!(out, "3\n");
        let _ = ctx;
    }

    #[test]
    fn test_string_member_functions() {
        let (ctx, _) = run(
            r#"let s = "12";
             let n = s.parse_int();
             let f = "2.5".parse_float();"#,
        );
        assert_eq!(global_int(&ctx, "n"), 12);
        assert_eq!(ctx.global("f").unwrap().as_real().unwrap(), 2.5);
    }

    #[test]
    fn test_logical_and_comparison_chain() {
        let (ctx, _) = run("let a = true && false; let b = 1 <= 2 && 3 > 2;");
        assert!(!ctx.global("a").unwrap().as_bool().unwrap());
        assert!(ctx.global("b").unwrap().as_bool().unwrap());
    }

    #[test]
    fn test_division_by_zero_reported() {
        let err = run_err("let x = 1 / 0;");
        assert_eq!(err.kind, ErrorKind::DivisionByZero);
    }

    #[test]
    fn test_error_carries_location() {
        let err = run_err("let a = 1;\nlet x = missing;");
        assert_eq!(err.line, Some(2));
    }

    #[test]
    fn test_execute_reports_to_error_sink_and_continues() {
        let mut ctx = Context::new(1024 * 1024);
        let (mut runtime, _out, err) = ExecutionContext::captured();
        let script = Script::parse("let x = missing;").expect("parse failed");
        ctx.execute(&script, &mut runtime);
        assert!(err
            .contents()
            .starts_with("execution terminated due to unexpected exception:"));

        // The context survives and keeps serving executions.
        let script = Script::parse("let y = 1;").expect("parse failed");
        ctx.execute(&script, &mut runtime);
        assert_eq!(global_int(&ctx, "y"), 1);
    }

    #[test]
    fn test_persistent_context_across_scripts() {
        let mut ctx = Context::new(1024 * 1024);
        let (mut runtime, out, _err) = ExecutionContext::captured();
        let first = Script::parse("fn hello() -> int { return 7; }").expect("parse");
        ctx.try_execute(&first, &mut runtime).expect("first run");
        drop(first);
        // The function body's AST is shared, so it outlives its script.
        let second = Script::parse("__print(hello());").expect("parse");
        ctx.try_execute(&second, &mut runtime).expect("second run");
        assert_eq!(out.contents(), "7\n");
    }

    #[test]
    fn test_extern_function_roundtrip() {
        use crate::externs::ExternLibrary;

        let mut ctx = Context::new(1024 * 1024);
        let (mut runtime, _out, _err) = ExecutionContext::captured();
        let pool = ctx.pool().clone();
        let mut library = ExternLibrary::new();
        library.register_function("host_add", 2, move |args| {
            let a = args[0].as_int().unwrap_or(0);
            let b = args[1].as_int().unwrap_or(0);
            Value::int(&pool, a + b).unwrap_or(Value::Null)
        });
        runtime.externs = Some(library);

        let script = Script::parse(
            "extern fn host_add(a: int, b: int) -> int;
             let x = host_add(20, 22);",
        )
        .expect("parse failed");
        ctx.try_execute(&script, &mut runtime).expect("execution failed");
        assert_eq!(global_int(&ctx, "x"), 42);
    }

    #[test]
    fn test_extern_without_bridge() {
        let err = run_err(
            "extern fn ghost() -> int;
             let x = ghost();",
        );
        assert_eq!(err.kind, ErrorKind::NoExternBridge);
    }

    #[test]
    fn test_extern_not_found() {
        use crate::externs::ExternLibrary;

        let mut ctx = Context::new(1024 * 1024);
        let (mut runtime, _out, _err) = ExecutionContext::captured();
        runtime.externs = Some(ExternLibrary::new());
        let script = Script::parse(
            "extern fn ghost() -> int;
             let x = ghost();",
        )
        .expect("parse failed");
        let err = ctx
            .try_execute(&script, &mut runtime)
            .expect_err("expected error");
        assert_eq!(err.kind, ErrorKind::ExternNotFound);
    }

    #[test]
    fn test_extern_variable_binding() {
        use crate::externs::ExternLibrary;
        use std::ffi::c_void;

        let mut host_value = 5i32;
        let mut ctx = Context::new(1024 * 1024);
        let (mut runtime, out, _err) = ExecutionContext::captured();
        let mut library = ExternLibrary::new();
        library.register_variable("speed", &mut host_value as *mut i32 as *mut c_void);
        runtime.externs = Some(library);

        let script = Script::parse(
            "extern let speed -> int;
             __print(speed);",
        )
        .expect("parse failed");
        ctx.try_execute(&script, &mut runtime).expect("execution failed");
        assert!(out.contents().starts_with("[external object at "));
        assert_eq!(ctx.global("speed").unwrap().type_of(), Type::External);
    }

    #[test]
    fn test_missing_module() {
        let err = run_err("import no.such.module;");
        assert_eq!(err.kind, ErrorKind::ModuleNotFound);
    }
}
