//! Sample modules served by `bertrpc serve` and the bundled examples.

use bertrpc_rpc::{CallError, Module, ModuleRegistry};
use bertrpc_term::Term;

/// Names accepted by [`registry`].
pub const DEMO_MODULES: &[&str] = &["math", "echo", "say"];

/// `math:sum([N])` and `math:avg([N])` over one list of numbers.
pub fn math() -> Module {
    Module::new()
        .function("sum", |args| sum(numbers(&args)?))
        .function("avg", |args| {
            let values = numbers(&args)?;
            if values.is_empty() {
                return Err(CallError::bad_args("avg of an empty list"));
            }
            let count = values.len() as f64;
            let total = sum(values)?.as_f64().unwrap_or_default();
            Ok(Term::Float(total / count))
        })
}

/// `echo:hello(_)` always answers `"hello"`; `echo:echo(...)` answers its
/// arguments as a list.
pub fn echo() -> Module {
    Module::new()
        .function("hello", |_| Ok(Term::from("hello")))
        .function("echo", |args| Ok(Term::List(args)))
}

/// `say:hello(Who)` answers `"Hello <Who>"`.
pub fn say() -> Module {
    Module::new().function("hello", |args| match args.as_slice() {
        [who] => {
            let name = who
                .as_str()
                .map(str::to_string)
                .or_else(|| who.as_atom_name().map(str::to_string))
                .unwrap_or_else(|| who.to_string());
            Ok(Term::from(format!("Hello {name}")))
        }
        _ => Err(CallError::bad_args("hello expects one argument")),
    })
}

/// A registry exposing the named demo modules; `None` selects all of them.
pub fn registry(only: Option<&[String]>) -> Result<ModuleRegistry, String> {
    let mut registry = ModuleRegistry::new();
    let wanted: Vec<&str> = match only {
        Some(names) => names.iter().map(String::as_str).collect(),
        None => DEMO_MODULES.to_vec(),
    };
    for name in wanted {
        let module = match name {
            "math" => math(),
            "echo" => echo(),
            "say" => say(),
            other => return Err(format!("unknown demo module '{other}'")),
        };
        registry.expose(name, module);
    }
    Ok(registry)
}

fn numbers(args: &[Term]) -> Result<Vec<Term>, CallError> {
    let [list] = args else {
        return Err(CallError::bad_args("expected one list argument"));
    };
    let items = list
        .as_list()
        .ok_or_else(|| CallError::bad_args("expected a list of numbers"))?;
    if let Some(bad) = items
        .iter()
        .find(|item| !matches!(item, Term::Integer(_) | Term::Float(_)))
    {
        return Err(CallError::bad_args(format!("not a number: {bad}")));
    }
    Ok(items.to_vec())
}

fn sum(values: Vec<Term>) -> Result<Term, CallError> {
    let mut int_total = 0i64;
    let mut float_total = 0f64;
    let mut saw_float = false;
    for value in values {
        match value {
            Term::Integer(n) => {
                int_total = int_total
                    .checked_add(n)
                    .ok_or_else(|| CallError::with_class("RangeError", "sum overflows i64"))?;
            }
            Term::Float(f) => {
                float_total += f;
                saw_float = true;
            }
            _ => {}
        }
    }
    if saw_float {
        Ok(Term::Float(int_total as f64 + float_total))
    } else {
        Ok(Term::Integer(int_total))
    }
}
